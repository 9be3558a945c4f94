use axum::extract::FromRef;
use axum::http::header;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

use super::{AuthError, AuthKeys};
use crate::database::Database;
use crate::errors::WebError;
use crate::models::User;

/// The authenticated, active user making the request.
/// Use this as a request guard on routes that need an account.
pub struct AuthUser(pub User);

/// Like [`AuthUser`], but anonymous requests (or bad tokens) get `None` instead of a 401.
pub struct MaybeAuthUser(pub Option<User>);

/// Accepts both `Bearer <token>` and a bare token.
fn bearer_token(parts: &Parts) -> Option<&str> {
    let value = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let token = value.strip_prefix("Bearer ").unwrap_or(value).trim();
    (!token.is_empty()).then_some(token)
}

fn authenticate(keys: &AuthKeys, db: &Database, token: &str) -> Result<User, WebError> {
    let claims = keys.verify_token(token)?;
    let user = User::get_by_id(db, claims.user_id()?)?.ok_or(AuthError::UnknownUser)?;
    if !user.is_active {
        return Err(AuthError::Deactivated.into());
    }
    Ok(user)
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    AuthKeys: FromRef<S>,
    Database: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AuthError::MissingToken)?;
        let user = authenticate(&AuthKeys::from_ref(state), &Database::from_ref(state), token)?;
        Ok(AuthUser(user))
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for MaybeAuthUser
where
    AuthKeys: FromRef<S>,
    Database: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(parts) else {
            return Ok(MaybeAuthUser(None));
        };
        match authenticate(&AuthKeys::from_ref(state), &Database::from_ref(state), token) {
            Ok(user) => Ok(MaybeAuthUser(Some(user))),
            Err(e) => {
                tracing::debug!("Ignoring unusable token on optional auth: {}", e);
                Ok(MaybeAuthUser(None))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    fn parts(authorization: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = authorization {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(()).unwrap().into_parts().0
    }

    #[test]
    fn token_with_or_without_scheme() {
        assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("abc.def"))), Some("abc.def"));
        assert_eq!(bearer_token(&parts(Some("Bearer "))), None);
        assert_eq!(bearer_token(&parts(None)), None);
    }
}
