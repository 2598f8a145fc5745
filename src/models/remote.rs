use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// One user as reported by the remote service's full snapshot.
///
/// The remote payload is loosely typed: ages arrive as numbers or strings,
/// fields go missing. Everything except the key deserializes leniently here
/// and is normalized by the user reconciler before it touches the store.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteUserRecord {
    #[serde(alias = "external_key")]
    pub user_id: i64,
    #[serde(default)]
    pub age: Option<serde_json::Value>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub occupation: Option<String>,
    #[serde(default)]
    pub zip_code: Option<String>,
}

/// One rating event from the remote service's full snapshot. The same
/// (user, movie) pair may appear many times across the snapshot.
#[derive(Debug, Clone, Deserialize)]
pub struct RemoteRatingRecord {
    #[serde(alias = "external_key")]
    pub user_id: i64,
    #[serde(alias = "movie_id")]
    pub item_id: i64,
    pub rating: f64,
    /// Unix seconds; absent or unrepresentable values fall back to "now"
    #[serde(default)]
    pub timestamp: Option<i64>,
}

impl RemoteRatingRecord {
    pub fn rated_at(&self) -> DateTime<Utc> {
        self.timestamp
            .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
            .unwrap_or_else(Utc::now)
    }
}

/// Body for registering a user with the remote service
#[derive(Debug, Clone, Serialize)]
pub struct NewRemoteUser {
    pub age: i32,
    pub gender: String,
    pub occupation: String,
    pub zip_code: String,
}

/// Remote acknowledgement of a user registration
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedUser {
    #[serde(alias = "external_key")]
    pub user_id: i64,
}

/// Recommendation set for one user, as returned by the remote service
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecommendationSet {
    #[serde(default)]
    pub recommended_items: Vec<i64>,
}

/// A rating fact forwarded to the remote service
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeedbackEvent {
    pub user_id: i64,
    pub item_id: i64,
    pub rating: f64,
}

/// Remote acknowledgement of a feedback event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackAck {
    #[serde(default)]
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_record_lenient_age() {
        let rec: RemoteUserRecord =
            serde_json::from_str(r#"{"user_id": 3, "age": 42, "gender": "M"}"#).unwrap();
        assert_eq!(rec.user_id, 3);
        assert_eq!(rec.age, Some(serde_json::json!(42)));

        let rec: RemoteUserRecord =
            serde_json::from_str(r#"{"user_id": 4, "age": "29", "occupation": "Doctor"}"#).unwrap();
        assert_eq!(rec.age, Some(serde_json::json!("29")));
        assert_eq!(rec.gender, None);
    }

    #[test]
    fn test_user_record_external_key_alias() {
        let rec: RemoteUserRecord = serde_json::from_str(r#"{"external_key": 11}"#).unwrap();
        assert_eq!(rec.user_id, 11);
    }

    #[test]
    fn test_rating_record_timestamp_conversion() {
        let rec: RemoteRatingRecord = serde_json::from_str(
            r#"{"user_id": 1, "item_id": 5, "rating": 4.0, "timestamp": 881250949}"#,
        )
        .unwrap();
        assert_eq!(rec.rated_at().timestamp(), 881_250_949);
    }

    #[test]
    fn test_rating_record_missing_timestamp_falls_back_to_now() {
        let rec: RemoteRatingRecord =
            serde_json::from_str(r#"{"user_id": 1, "movie_id": 5, "rating": 4.0}"#).unwrap();
        assert_eq!(rec.item_id, 5);
        let age = Utc::now().signed_duration_since(rec.rated_at());
        assert!(age.num_seconds().abs() < 5);
    }

    #[test]
    fn test_recommendation_set_tolerates_empty_payload() {
        let set: RecommendationSet = serde_json::from_str("{}").unwrap();
        assert!(set.recommended_items.is_empty());
    }
}
