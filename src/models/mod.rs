pub mod profile;
pub mod remote;

pub use profile::{
    valid_rating, Gender, NewProfile, Profile, WatchlistEntry, RATING_MAX, RATING_MIN,
};
pub use remote::{
    CreatedUser, FeedbackAck, FeedbackEvent, NewRemoteUser, RecommendationSet, RemoteRatingRecord,
    RemoteUserRecord,
};
