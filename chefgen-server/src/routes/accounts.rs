use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::Engine;
use chefgen::basic_models::FieldError;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ApiResponse, AppState};
use crate::auth::{AuthKeys, AuthUser};
use crate::database::{is_constraint_violation, Database};
use crate::errors::{WebError, WebResult};
use crate::models::{ProfileUpdate, User};

pub const MAX_PICTURE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_BIO_CHARS: usize = 500;
pub const MAX_CUISINE_CHARS: usize = 200;

lazy_static::lazy_static! {
    static ref EMAIL: Regex =
        Regex::new(r"^\w+([.-]?\w+)*@\w+([.-]?\w+)*(\.\w{2,3})+$").unwrap();
    static ref PICTURE_PREFIX: Regex =
        Regex::new(r"^data:image/(jpeg|jpg|png|webp);base64,").unwrap();
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/profile", get(get_profile).put(update_profile))
        .route(
            "/profile/picture",
            post(upload_profile_picture).delete(remove_profile_picture),
        )
        .route("/logout", post(logout))
}

#[derive(Serialize, Debug)]
pub struct UserEnvelope {
    pub user: User,
}

/// A user together with a fresh bearer token.
#[derive(Serialize, Debug)]
pub struct Session {
    pub user: User,
    pub token: String,
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn check_name(name: &str, errors: &mut Vec<FieldError>) {
    if !(2..=50).contains(&name.chars().count()) {
        errors.push(FieldError::new(
            "name",
            "Name must be between 2 and 50 characters",
        ));
    }
}

fn check_email(email: &str, errors: &mut Vec<FieldError>) {
    if !EMAIL.is_match(email) {
        errors.push(FieldError::new(
            "email",
            "Please provide a valid email address",
        ));
    }
}

#[derive(Deserialize, Debug, Default)]
struct RegisterBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl RegisterBody {
    /// Trimmed name and normalized email, or every problem with the body.
    fn validate(self) -> Result<(String, String, String), Vec<FieldError>> {
        let mut errors = Vec::new();
        let name = self.name.trim().to_string();
        let email = normalize_email(&self.email);
        check_name(&name, &mut errors);
        check_email(&email, &mut errors);
        if self.password.chars().count() < 6 {
            errors.push(FieldError::new(
                "password",
                "Password must be at least 6 characters long",
            ));
        }
        let has = |f: fn(&char) -> bool| self.password.chars().any(|c| f(&c));
        if !(has(char::is_ascii_lowercase) && has(char::is_ascii_uppercase) && has(char::is_ascii_digit)) {
            errors.push(FieldError::new(
                "password",
                "Password must contain at least one uppercase letter, one lowercase letter, and one number",
            ));
        }
        if errors.is_empty() {
            Ok((name, email, self.password))
        } else {
            Err(errors)
        }
    }
}

async fn register(
    State(db): State<Database>,
    State(keys): State<AuthKeys>,
    body: Result<Json<RegisterBody>, JsonRejection>,
) -> WebResult<(StatusCode, Json<ApiResponse<Session>>)> {
    let Json(body) = body?;
    let (name, email, password) = body.validate().map_err(WebError::Validation)?;
    let duplicate = || WebError::Conflict("User with this email already exists".into());
    if User::find_by_email(&db, &email)?.is_some() {
        return Err(duplicate());
    }
    let password_hash = keys.hash_password(&password)?;
    // Two registrations can race past the check above
    let user = match User::create(&db, &name, &email, &password_hash) {
        Ok(user) => user,
        Err(e) if is_constraint_violation(&e) => return Err(duplicate()),
        Err(e) => return Err(e.into()),
    };
    tracing::info!(user_id = user.user_id, "Registered user");
    let token = keys.issue_token(&user)?;
    Ok((
        StatusCode::CREATED,
        ApiResponse::with_message("User registered successfully", Session { user, token }),
    ))
}

#[derive(Deserialize, Debug, Default)]
struct LoginBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

async fn login(
    State(db): State<Database>,
    State(keys): State<AuthKeys>,
    body: Result<Json<LoginBody>, JsonRejection>,
) -> WebResult<Json<ApiResponse<Session>>> {
    let Json(body) = body?;
    let email = normalize_email(&body.email);
    let mut errors = vec![];
    check_email(&email, &mut errors);
    if body.password.is_empty() {
        errors.push(FieldError::new("password", "Password is required"));
    }
    if !errors.is_empty() {
        return Err(WebError::Validation(errors));
    }

    let invalid = || WebError::Auth("Invalid email or password".into());
    let user = User::find_by_email(&db, &email)?.ok_or_else(invalid)?;
    if !user.is_active {
        return Err(WebError::Auth("User account is deactivated".into()));
    }
    if !keys.verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }
    User::touch_last_login(&db, user.user_id)?;
    let user = User::get_by_id(&db, user.user_id)?.ok_or(WebError::NotFound("User not found"))?;
    let token = keys.issue_token(&user)?;
    Ok(ApiResponse::with_message(
        "Login successful",
        Session { user, token },
    ))
}

async fn get_profile(AuthUser(user): AuthUser) -> Json<ApiResponse<UserEnvelope>> {
    ApiResponse::data(UserEnvelope { user })
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct ProfileBody {
    name: Option<String>,
    bio: Option<String>,
    favorites_cuisine: Option<String>,
}

impl ProfileBody {
    fn validate(self) -> Result<ProfileUpdate, Vec<FieldError>> {
        let mut errors = vec![];
        // An empty name leaves the current one in place
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        if let Some(name) = &name {
            check_name(name, &mut errors);
        }
        let bio = self.bio.map(|b| b.trim().to_string());
        if bio.as_ref().is_some_and(|b| b.chars().count() > MAX_BIO_CHARS) {
            errors.push(FieldError::new("bio", "Bio cannot exceed 500 characters"));
        }
        let favorites_cuisine = self.favorites_cuisine.map(|c| c.trim().to_string());
        if favorites_cuisine
            .as_ref()
            .is_some_and(|c| c.chars().count() > MAX_CUISINE_CHARS)
        {
            errors.push(FieldError::new(
                "favoritesCuisine",
                "Favorite cuisines cannot exceed 200 characters",
            ));
        }
        if errors.is_empty() {
            Ok(ProfileUpdate {
                name,
                bio,
                favorites_cuisine,
            })
        } else {
            Err(errors)
        }
    }
}

async fn update_profile(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    body: Result<Json<ProfileBody>, JsonRejection>,
) -> WebResult<Json<ApiResponse<UserEnvelope>>> {
    let Json(body) = body?;
    let update = body.validate().map_err(WebError::Validation)?;
    let user = User::update_profile(&db, user.user_id, &update)?
        .ok_or(WebError::NotFound("User not found"))?;
    Ok(ApiResponse::with_message(
        "Profile updated successfully",
        UserEnvelope { user },
    ))
}

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
struct PictureBody {
    profile_picture: Option<String>,
}

/// Accept a `data:image/...;base64,` URL of a supported type that decodes to at most 5MB.
fn check_picture(picture: &str) -> Result<(), WebError> {
    let Some(prefix) = PICTURE_PREFIX.find(picture) else {
        return Err(WebError::BadRequest(
            "Invalid image format. Only JPEG, PNG, and WebP are supported.".into(),
        ));
    };
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(&picture[prefix.end()..])
        .map_err(|_| WebError::BadRequest("Image data is not valid base64.".into()))?;
    if bytes.len() > MAX_PICTURE_BYTES {
        return Err(WebError::BadRequest(
            "Image size too large. Maximum size is 5MB.".into(),
        ));
    }
    Ok(())
}

async fn upload_profile_picture(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
    body: Result<Json<PictureBody>, JsonRejection>,
) -> WebResult<Json<ApiResponse<UserEnvelope>>> {
    let Json(body) = body?;
    let picture = body
        .profile_picture
        .filter(|p| !p.is_empty())
        .ok_or_else(|| WebError::BadRequest("Profile picture data is required".into()))?;
    check_picture(&picture)?;
    let user = User::set_profile_picture(&db, user.user_id, Some(&picture))?
        .ok_or(WebError::NotFound("User not found"))?;
    Ok(ApiResponse::with_message(
        "Profile picture updated successfully",
        UserEnvelope { user },
    ))
}

async fn remove_profile_picture(
    State(db): State<Database>,
    AuthUser(user): AuthUser,
) -> WebResult<Json<ApiResponse<UserEnvelope>>> {
    let user = User::set_profile_picture(&db, user.user_id, None)?
        .ok_or(WebError::NotFound("User not found"))?;
    Ok(ApiResponse::with_message(
        "Profile picture removed successfully",
        UserEnvelope { user },
    ))
}

/// Tokens are stateless, so the client just forgets theirs.
async fn logout(_: AuthUser) -> Json<ApiResponse<()>> {
    ApiResponse::message("Logout successful")
}
