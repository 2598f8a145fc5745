use crate::{
    error::AppResult,
    models::{Gender, NewProfile, RemoteUserRecord},
    services::catalog::CatalogClient,
    store::ProfileStore,
};

/// Closed list of occupations accepted from the remote service; anything else
/// normalizes to "other".
const VALID_OCCUPATIONS: &[&str] = &[
    "administrator",
    "artist",
    "doctor",
    "educator",
    "engineer",
    "entertainment",
    "executive",
    "healthcare",
    "homemaker",
    "lawyer",
    "librarian",
    "marketing",
    "none",
    "other",
    "programmer",
    "retired",
    "salesman",
    "scientist",
    "student",
    "technician",
    "writer",
];

const DEFAULT_AGE: i32 = 25;
const DEFAULT_ZIP: &str = "00000";

/// Sentinel stored for profiles created by reconciliation. It is not a valid
/// bcrypt hash, so these accounts cannot sign in until claimed through signup.
pub const UNUSABLE_PASSWORD: &str = "!sync";

/// Aggregate result of one user reconciliation pass
#[derive(Debug, Clone, Copy, Default)]
pub struct UserSyncOutcome {
    /// Upsert operations attempted (not necessarily all successful)
    pub attempted: u64,
    /// Records whose store write failed; siblings still committed
    pub failed: u64,
}

/// Coerces one raw remote user record into a storable profile upsert.
///
/// Ages outside 1..=120 (or unparseable) fall back to 25, gender collapses to
/// M/F, occupations are matched case-insensitively against the closed list,
/// and the postal code defaults to the "00000" sentinel.
pub(crate) fn normalize_user(record: &RemoteUserRecord) -> NewProfile {
    NewProfile {
        external_id: record.user_id,
        username: format!("user{}", record.user_id),
        email: format!("user{}@example.com", record.user_id),
        password_hash: UNUSABLE_PASSWORD.to_string(),
        age: normalize_age(record.age.as_ref()),
        gender: Gender::from_remote(record.gender.as_deref().unwrap_or("")),
        occupation: normalize_occupation(record.occupation.as_deref().unwrap_or("")),
        zip_code: record
            .zip_code
            .clone()
            .filter(|zip| !zip.is_empty())
            .unwrap_or_else(|| DEFAULT_ZIP.to_string()),
    }
}

fn normalize_age(raw: Option<&serde_json::Value>) -> i32 {
    let parsed = match raw {
        Some(serde_json::Value::Number(n)) => n.as_i64(),
        Some(serde_json::Value::String(s)) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        Some(age) if (1..=120).contains(&age) => age as i32,
        _ => DEFAULT_AGE,
    }
}

/// Also used by the signup path so both entry points accept the same list
pub(crate) fn normalize_occupation(raw: &str) -> String {
    let lowered = raw.trim().to_lowercase();
    if VALID_OCCUPATIONS.contains(&lowered.as_str()) {
        lowered
    } else {
        "other".to_string()
    }
}

/// Pulls the full remote user snapshot and merges it into the profile store.
///
/// Record order carries no meaning: one record failing to persist does not
/// stop the rest. Only a failed snapshot fetch aborts the pass.
pub async fn sync_users(
    catalog: &dyn CatalogClient,
    store: &dyn ProfileStore,
) -> AppResult<UserSyncOutcome> {
    let records = catalog.list_users().await?;

    let mut outcome = UserSyncOutcome::default();
    for record in &records {
        let profile = normalize_user(record);
        outcome.attempted += 1;

        if let Err(e) = store.upsert_remote_user(&profile).await {
            outcome.failed += 1;
            tracing::warn!(
                external_id = record.user_id,
                error = %e,
                "User upsert failed, continuing with remaining records"
            );
        }
    }

    tracing::info!(
        attempted = outcome.attempted,
        failed = outcome.failed,
        "User reconciliation finished"
    );

    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use crate::services::catalog::MockCatalogClient;
    use crate::store::MockProfileStore;
    use serde_json::json;

    fn record(user_id: i64, age: serde_json::Value, gender: &str, occupation: &str) -> RemoteUserRecord {
        RemoteUserRecord {
            user_id,
            age: Some(age),
            gender: Some(gender.to_string()),
            occupation: Some(occupation.to_string()),
            zip_code: None,
        }
    }

    #[test]
    fn test_normalize_age_number_and_string() {
        assert_eq!(normalize_age(Some(&json!(33))), 33);
        assert_eq!(normalize_age(Some(&json!("29"))), 29);
        assert_eq!(normalize_age(Some(&json!(" 18 "))), 18);
    }

    #[test]
    fn test_normalize_age_falls_back_to_default() {
        assert_eq!(normalize_age(None), 25);
        assert_eq!(normalize_age(Some(&json!("not a number"))), 25);
        assert_eq!(normalize_age(Some(&json!(0))), 25);
        assert_eq!(normalize_age(Some(&json!(121))), 25);
        assert_eq!(normalize_age(Some(&json!(-4))), 25);
    }

    #[test]
    fn test_normalize_occupation_case_insensitive() {
        assert_eq!(normalize_occupation("engineer"), "engineer");
        assert_eq!(normalize_occupation("Engineer"), "engineer");
        assert_eq!(normalize_occupation("DOCTOR"), "doctor");
    }

    #[test]
    fn test_normalize_occupation_unknown_becomes_other() {
        assert_eq!(normalize_occupation("astronaut"), "other");
        assert_eq!(normalize_occupation(""), "other");
    }

    #[test]
    fn test_normalize_user_defaults() {
        let rec = RemoteUserRecord {
            user_id: 9,
            age: None,
            gender: None,
            occupation: None,
            zip_code: None,
        };

        let profile = normalize_user(&rec);
        assert_eq!(profile.external_id, 9);
        assert_eq!(profile.username, "user9");
        assert_eq!(profile.age, 25);
        assert_eq!(profile.gender, Gender::F);
        assert_eq!(profile.occupation, "other");
        assert_eq!(profile.zip_code, "00000");
        assert_eq!(profile.password_hash, UNUSABLE_PASSWORD);
    }

    #[tokio::test]
    async fn test_sync_users_fails_fast_when_snapshot_unavailable() {
        let mut catalog = MockCatalogClient::new();
        catalog
            .expect_list_users()
            .returning(|| Err(AppError::RemoteUnavailable("down".to_string())));
        let store = MockProfileStore::new();

        let result = sync_users(&catalog, &store).await;
        assert!(matches!(result, Err(AppError::RemoteUnavailable(_))));
    }

    #[tokio::test]
    async fn test_sync_users_isolates_per_record_failures() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_list_users().returning(|| {
            Ok(vec![
                record(1, json!(24), "M", "student"),
                record(2, json!(30), "F", "doctor"),
                record(3, json!(45), "M", "writer"),
            ])
        });

        let mut store = MockProfileStore::new();
        store
            .expect_upsert_remote_user()
            .times(3)
            .returning(|profile| {
                if profile.external_id == 2 {
                    Err(AppError::Internal("write failed".to_string()))
                } else {
                    Ok(())
                }
            });

        let outcome = sync_users(&catalog, &store).await.unwrap();
        assert_eq!(outcome.attempted, 3);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_sync_users_normalizes_before_writing() {
        let mut catalog = MockCatalogClient::new();
        catalog.expect_list_users().returning(|| {
            Ok(vec![record(7, json!("not-an-age"), "x", "Astronaut")])
        });

        let mut store = MockProfileStore::new();
        store
            .expect_upsert_remote_user()
            .withf(|profile| {
                profile.external_id == 7
                    && profile.age == 25
                    && profile.gender == Gender::F
                    && profile.occupation == "other"
            })
            .times(1)
            .returning(|_| Ok(()));

        let outcome = sync_users(&catalog, &store).await.unwrap();
        assert_eq!(outcome.attempted, 1);
        assert_eq!(outcome.failed, 0);
    }
}
