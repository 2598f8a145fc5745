use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed rating interval accepted at every entry point, reconciliation and
/// feedback alike.
pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 5.0;

pub fn valid_rating(rating: f64) -> bool {
    rating.is_finite() && (RATING_MIN..=RATING_MAX).contains(&rating)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Gender {
    M,
    F,
}

impl Gender {
    /// Coerces a raw remote gender value. Anything that is not exactly "M"
    /// is treated as "F".
    pub fn from_remote(raw: &str) -> Self {
        if raw == "M" {
            Gender::M
        } else {
            Gender::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::M => "M",
            Gender::F => "F",
        }
    }
}

impl std::fmt::Display for Gender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally persisted user profile mirroring a remote user
#[derive(Debug, Clone, Serialize)]
pub struct Profile {
    pub id: i64,
    /// Key assigned by the remote recommendation service; unique and immutable
    pub external_id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub age: i32,
    pub gender: Gender,
    pub occupation: String,
    pub zip_code: String,
    pub created_at: DateTime<Utc>,
}

/// Raw row shape for `profiles`; converted into [`Profile`] so the rest of the
/// code never sees an unparsed gender column.
#[derive(Debug, sqlx::FromRow)]
pub struct ProfileRow {
    pub id: i64,
    pub external_id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub gender: String,
    pub occupation: String,
    pub zip_code: String,
    pub created_at: DateTime<Utc>,
}

impl From<ProfileRow> for Profile {
    fn from(row: ProfileRow) -> Self {
        Profile {
            id: row.id,
            external_id: row.external_id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            age: row.age,
            gender: Gender::from_remote(&row.gender),
            occupation: row.occupation,
            zip_code: row.zip_code,
            created_at: row.created_at,
        }
    }
}

/// Field set for inserting or upserting a profile.
///
/// `username`, `email` and `password_hash` are creation-only: the store applies
/// them on insert and leaves them untouched when the profile already exists.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
    pub external_id: i64,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub age: i32,
    pub gender: Gender,
    pub occupation: String,
    pub zip_code: String,
}

/// One rated movie on a profile's watchlist. At most one entry exists per
/// (profile, movie); rating and timestamp are replaced on rewrite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WatchlistEntry {
    pub movie_id: i64,
    pub rating: f64,
    pub rated_at: DateTime<Utc>,
}
