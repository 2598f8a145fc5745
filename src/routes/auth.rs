use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{Gender, NewProfile, NewRemoteUser, Profile},
    services::sync::users::normalize_occupation,
    state::AppState,
};

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub age: i32,
    pub gender: Gender,
    pub occupation: String,
    #[serde(default)]
    pub zip_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SigninRequest {
    pub email: String,
    pub password: String,
}

/// Handler for account creation.
///
/// The user is registered with the remote recommendation service first; the
/// external key it assigns becomes the local profile's key. Without that key
/// the profile cannot participate in reconciliation, so a remote failure here
/// fails the whole signup.
pub async fn signup(
    State(state): State<AppState>,
    Json(request): Json<SignupRequest>,
) -> AppResult<(StatusCode, Json<Profile>)> {
    if request.username.trim().is_empty() {
        return Err(AppError::InvalidInput("username cannot be empty".to_string()));
    }
    if request.email.trim().is_empty() || !request.email.contains('@') {
        return Err(AppError::InvalidInput("a valid email is required".to_string()));
    }
    if request.password.is_empty() {
        return Err(AppError::InvalidInput("password cannot be empty".to_string()));
    }
    if !(1..=120).contains(&request.age) {
        return Err(AppError::InvalidInput(
            "age must be between 1 and 120".to_string(),
        ));
    }

    if state.store.find_by_email(&request.email).await?.is_some() {
        return Err(AppError::InvalidInput("email already registered".to_string()));
    }

    let password_hash = bcrypt::hash(&request.password, bcrypt::DEFAULT_COST)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    let occupation = normalize_occupation(&request.occupation);
    let zip_code = request
        .zip_code
        .filter(|zip| !zip.is_empty())
        .unwrap_or_else(|| "00000".to_string());

    let external_id = state
        .catalog
        .create_user(&NewRemoteUser {
            age: request.age,
            gender: request.gender.as_str().to_string(),
            occupation: occupation.clone(),
            zip_code: zip_code.clone(),
        })
        .await?;

    let profile = state
        .store
        .create_profile(&NewProfile {
            external_id,
            username: request.username,
            email: request.email,
            password_hash,
            age: request.age,
            gender: request.gender,
            occupation,
            zip_code,
        })
        .await?;

    tracing::info!(external_id, "Signed up new user");

    Ok((StatusCode::CREATED, Json(profile)))
}

/// Handler for signing in with email and password
pub async fn signin(
    State(state): State<AppState>,
    Json(request): Json<SigninRequest>,
) -> AppResult<Json<Profile>> {
    let profile = state
        .store
        .find_by_email(&request.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_string()))?;

    // verify also fails for reconciler-created profiles, whose stored marker
    // is not a valid hash; those accounts cannot sign in.
    let matches = bcrypt::verify(&request.password, &profile.password_hash).unwrap_or(false);
    if !matches {
        return Err(AppError::Unauthorized("invalid credentials".to_string()));
    }

    Ok(Json(profile))
}
