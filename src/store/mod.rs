use async_trait::async_trait;
use sqlx::PgPool;

use crate::{
    error::{AppError, AppResult},
    models::profile::ProfileRow,
    models::{NewProfile, Profile, WatchlistEntry},
};

/// Result of a bulk watchlist merge for one external user id
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    /// Entries were inserted or replaced
    Applied(u64),
    /// No profile exists for the external id yet; nothing was written
    Deferred,
}

/// Result of a single targeted watchlist upsert
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Applied,
    ProfileMissing,
}

/// Persistent collection of user profiles and their watchlists.
///
/// Reconciliation and the feedback path go through this seam; the concrete
/// implementation is Postgres, with uniqueness of (external id) and of
/// (profile, movie) enforced by the schema itself.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Inserts a brand-new profile (signup path). Fails on duplicate email.
    async fn create_profile(&self, profile: &NewProfile) -> AppResult<Profile>;

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>>;

    async fn find_by_external_id(&self, external_id: i64) -> AppResult<Option<Profile>>;

    /// Upserts a profile keyed by external id: demographic fields are
    /// refreshed on every call, identity fields only applied on first insert.
    async fn upsert_remote_user(&self, profile: &NewProfile) -> AppResult<()>;

    /// Reconciles one user's watchlist with a deduplicated entry set in a
    /// single statement: present entries have rating/timestamp replaced,
    /// absent ones are inserted. Never creates the profile.
    async fn merge_watchlist(
        &self,
        external_id: i64,
        entries: &[WatchlistEntry],
    ) -> AppResult<MergeOutcome>;

    /// Replaces or inserts a single watchlist entry. Atomic with respect to
    /// concurrent upserts on the same profile; never creates the profile.
    async fn upsert_watchlist_entry(
        &self,
        external_id: i64,
        entry: &WatchlistEntry,
    ) -> AppResult<UpsertOutcome>;

    /// The profile's watchlist, most recently rated first
    async fn fetch_watchlist(&self, external_id: i64) -> AppResult<Vec<WatchlistEntry>>;
}

/// Postgres-backed [`ProfileStore`]
#[derive(Clone)]
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProfileStore for PgProfileStore {
    async fn create_profile(&self, profile: &NewProfile) -> AppResult<Profile> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            INSERT INTO profiles
                (external_id, username, email, password_hash, age, gender, occupation, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id, external_id, username, email, password_hash,
                      age, gender, occupation, zip_code, created_at
            "#,
        )
        .bind(profile.external_id)
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.password_hash)
        .bind(profile.age)
        .bind(profile.gender.as_str())
        .bind(&profile.occupation)
        .bind(&profile.zip_code)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match &e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                AppError::InvalidInput("email or user already registered".to_string())
            }
            _ => AppError::Database(e),
        })?;

        Ok(row.into())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, external_id, username, email, password_hash,
                   age, gender, occupation, zip_code, created_at
            FROM profiles
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    async fn find_by_external_id(&self, external_id: i64) -> AppResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT id, external_id, username, email, password_hash,
                   age, gender, occupation, zip_code, created_at
            FROM profiles
            WHERE external_id = $1
            "#,
        )
        .bind(external_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Profile::from))
    }

    async fn upsert_remote_user(&self, profile: &NewProfile) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO profiles
                (external_id, username, email, password_hash, age, gender, occupation, zip_code)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (external_id) DO UPDATE
            SET age        = EXCLUDED.age,
                gender     = EXCLUDED.gender,
                occupation = EXCLUDED.occupation,
                zip_code   = EXCLUDED.zip_code
            "#,
        )
        .bind(profile.external_id)
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(&profile.password_hash)
        .bind(profile.age)
        .bind(profile.gender.as_str())
        .bind(&profile.occupation)
        .bind(&profile.zip_code)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn merge_watchlist(
        &self,
        external_id: i64,
        entries: &[WatchlistEntry],
    ) -> AppResult<MergeOutcome> {
        if entries.is_empty() {
            return Ok(MergeOutcome::Applied(0));
        }

        let movie_ids: Vec<i64> = entries.iter().map(|e| e.movie_id).collect();
        let ratings: Vec<f64> = entries.iter().map(|e| e.rating).collect();
        let rated_ats: Vec<chrono::DateTime<chrono::Utc>> =
            entries.iter().map(|e| e.rated_at).collect();

        let result = sqlx::query(
            r#"
            INSERT INTO watchlist_entries (profile_id, movie_id, rating, rated_at)
            SELECT p.id, e.movie_id, e.rating, e.rated_at
            FROM profiles p
            CROSS JOIN UNNEST($2::bigint[], $3::double precision[], $4::timestamptz[])
                AS e(movie_id, rating, rated_at)
            WHERE p.external_id = $1
            ON CONFLICT (profile_id, movie_id)
            DO UPDATE SET rating = EXCLUDED.rating, rated_at = EXCLUDED.rated_at
            "#,
        )
        .bind(external_id)
        .bind(&movie_ids)
        .bind(&ratings)
        .bind(&rated_ats)
        .execute(&self.pool)
        .await?;

        // Zero rows with a non-empty entry set means the WHERE clause matched
        // no profile: the user has not been reconciled yet.
        if result.rows_affected() == 0 {
            Ok(MergeOutcome::Deferred)
        } else {
            Ok(MergeOutcome::Applied(result.rows_affected()))
        }
    }

    async fn upsert_watchlist_entry(
        &self,
        external_id: i64,
        entry: &WatchlistEntry,
    ) -> AppResult<UpsertOutcome> {
        let result = sqlx::query(
            r#"
            INSERT INTO watchlist_entries (profile_id, movie_id, rating, rated_at)
            SELECT id, $2, $3, $4 FROM profiles WHERE external_id = $1
            ON CONFLICT (profile_id, movie_id)
            DO UPDATE SET rating = EXCLUDED.rating, rated_at = EXCLUDED.rated_at
            "#,
        )
        .bind(external_id)
        .bind(entry.movie_id)
        .bind(entry.rating)
        .bind(entry.rated_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            Ok(UpsertOutcome::ProfileMissing)
        } else {
            Ok(UpsertOutcome::Applied)
        }
    }

    async fn fetch_watchlist(&self, external_id: i64) -> AppResult<Vec<WatchlistEntry>> {
        let entries = sqlx::query_as::<_, WatchlistEntry>(
            r#"
            SELECT w.movie_id, w.rating, w.rated_at
            FROM watchlist_entries w
            JOIN profiles p ON p.id = w.profile_id
            WHERE p.external_id = $1
            ORDER BY w.rated_at DESC
            "#,
        )
        .bind(external_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
