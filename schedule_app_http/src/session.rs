use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use time::{Duration, OffsetDateTime};
use uuid::Uuid;

use schedule_app_lib::{
    models::{Session, User},
    pgpool::PgPool,
};

use crate::{app::AppState, errors::ServiceError};

pub const SESSION_COOKIE: &str = "session-key";
pub const SESSION_TTL_DAYS: i64 = 7;

pub const LOGIN_HTML: &str =
    "<script>window.location.replace('/schedule/login')</script>";

/// Authenticated requester, resolved from the session cookie.
#[derive(Clone, Debug)]
pub struct LoggedUser {
    pub session_id: Uuid,
    pub user: User,
}

/// Creates the session row and the cookie carrying its token.
///
/// # Errors
/// Returns error on database failure
pub async fn begin_session(user: &User, pool: &PgPool) -> Result<Cookie<'static>, ServiceError> {
    let now = OffsetDateTime::now_utc();
    let session = Session {
        id: Uuid::new_v4(),
        user_id: user.id,
        created_at: now,
        expires_at: now + Duration::days(SESSION_TTL_DAYS),
    };
    session.insert(pool).await?;
    let cookie = Cookie::build((SESSION_COOKIE, session.id.to_string()))
        .path("/")
        .http_only(true)
        .max_age(Duration::days(SESSION_TTL_DAYS))
        .build();
    Ok(cookie)
}

/// # Errors
/// Returns error on database failure
pub async fn end_session(session_id: Uuid, pool: &PgPool) -> Result<(), ServiceError> {
    if let Some(session) = Session::get_by_id(session_id, pool).await? {
        session.delete(pool).await?;
    }
    Ok(())
}

impl FromRequestParts<AppState> for LoggedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_request_parts(parts, state)
            .await
            .map_err(|_| ServiceError::Unauthorized)?;
        let token = jar
            .get(SESSION_COOKIE)
            .ok_or(ServiceError::Unauthorized)?
            .value()
            .to_string();
        let session_id: Uuid = token.parse().map_err(|_| ServiceError::Unauthorized)?;
        let pool = &state.planner.pool;
        let Some(session) = Session::get_by_id(session_id, pool).await? else {
            return Err(ServiceError::Unauthorized);
        };
        if session.is_expired() {
            session.delete(pool).await?;
            return Err(ServiceError::Unauthorized);
        }
        let Some(user) = User::get_by_id(session.user_id, pool).await? else {
            return Err(ServiceError::Unauthorized);
        };
        Ok(Self {
            session_id: session.id,
            user,
        })
    }
}
