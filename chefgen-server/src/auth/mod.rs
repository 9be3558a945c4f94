use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2, Params,
};
use jsonwebtoken::{errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

pub mod extract;

pub use extract::{AuthUser, MaybeAuthUser};

pub type AuthResult<X> = Result<X, AuthError>;

use crate::config::AuthConfig;
use crate::errors::WebError;
use crate::models::User;

#[derive(thiserror::Error, Debug)]
pub enum AuthError {
    #[error("Access denied. No token provided.")]
    MissingToken,
    #[error("Token expired")]
    Expired,
    #[error("Invalid token")]
    InvalidToken(#[source] jsonwebtoken::errors::Error),
    #[error("Invalid token. User not found.")]
    UnknownUser,
    #[error("User account is deactivated")]
    Deactivated,
    #[error("Password hashing error: {0}")]
    Hashing(argon2::password_hash::Error),
    #[error("Token signing error: {0}")]
    Signing(jsonwebtoken::errors::Error),
}

impl From<AuthError> for WebError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::Hashing(_) | AuthError::Signing(_) => WebError::Internal(e.into()),
            other => WebError::Auth(other.to_string()),
        }
    }
}

/// What a bearer token says about its holder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// The user id, as a string.
    pub sub: String,
    pub email: String,
    pub name: String,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> AuthResult<i64> {
        self.sub.parse().map_err(|_| AuthError::UnknownUser)
    }
}

/// Signing keys and password hashing parameters, shared by every request.
#[derive(Clone)]
pub struct AuthKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    lifetime: chrono::Duration,
    argon2: Argon2<'static>,
}

impl AuthKeys {
    pub fn new(secret: &[u8], lifetime: chrono::Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            lifetime,
            argon2: Argon2::default(),
        }
    }

    pub fn from_config(conf: &AuthConfig) -> anyhow::Result<Self> {
        anyhow::ensure!(
            !conf.jwt_secret.is_empty(),
            "No JWT secret configured; set auth.jwt_secret or JWT_SECRET"
        );
        let keys = Self::new(
            conf.jwt_secret.as_bytes(),
            chrono::Duration::days(conf.token_lifetime_days),
        );
        Ok(if conf.insecure_fast_hashing {
            tracing::warn!("Using insecure password hashing parameters");
            keys.with_fast_hashing()
        } else {
            keys
        })
    }

    /// Minimal Argon2 cost, for development and tests only.
    pub fn with_fast_hashing(mut self) -> Self {
        if let Ok(params) = Params::new(Params::MIN_M_COST, 1, 1, None) {
            self.argon2 = Argon2::new(argon2::Algorithm::Argon2id, argon2::Version::V0x13, params);
        }
        self
    }

    pub fn hash_password(&self, password: &str) -> AuthResult<String> {
        let salt = SaltString::generate(&mut OsRng);
        let hash = self
            .argon2
            .hash_password(password.as_bytes(), &salt)
            .map_err(AuthError::Hashing)?;
        Ok(hash.to_string())
    }

    /// False for a wrong password and for a hash that doesn't parse.
    pub fn verify_password(&self, password: &str, hash: &str) -> bool {
        let parsed_hash = match PasswordHash::new(hash) {
            Ok(h) => h,
            Err(_) => return false,
        };
        self.argon2
            .verify_password(password.as_bytes(), &parsed_hash)
            .is_ok()
    }

    pub fn issue_token(&self, user: &User) -> AuthResult<String> {
        let now = chrono::Utc::now();
        let claims = Claims {
            sub: user.user_id.to_string(),
            email: user.email.clone(),
            name: user.name.clone(),
            iat: now.timestamp(),
            exp: (now + self.lifetime).timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(AuthError::Signing)
    }

    pub fn verify_token(&self, token: &str) -> AuthResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e),
            })
    }
}
