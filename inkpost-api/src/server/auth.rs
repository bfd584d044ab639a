use crate::server::{ServerError, SessionSettings};
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::TypedHeader;
use headers::Cookie;
use inkpost_common::{
    config::SiteConfig,
    model::{
        auth::{SessionToken, SessionTokenHash},
        role::{Permission, Role},
        user::User,
    },
};
use inkpost_db::store::Store;
use std::sync::Arc;
use time::UtcDateTime;
use tracing::debug;

pub const SESSION_COOKIE: &str = "inkpost_session";

type CookieHeader = TypedHeader<Cookie>;

/// Whoever sent the request: a logged-in user or a guest.
///
/// A missing, malformed, unknown or expired session cookie yields a guest
/// rather than an error, so stale cookies never break public pages.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct Viewer {
    user: Option<User>,
    role: Role,
    token_hash: Option<SessionTokenHash>,
}

impl Viewer {
    #[must_use]
    pub fn guest(config: &SiteConfig) -> Self {
        Self {
            user: None,
            role: config.guest(),
            token_hash: None,
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    #[must_use]
    pub fn token_hash(&self) -> Option<&SessionTokenHash> {
        self.token_hash.as_ref()
    }

    #[must_use]
    pub fn allows(&self, permission: Permission) -> bool {
        self.role.allows(permission)
    }

    /// 401 for guests and 403 for logged-in users lacking the permission.
    pub fn require(&self, permission: Permission) -> Result<(), ServerError> {
        if self.allows(permission) {
            return Ok(());
        }

        match &self.user {
            Some(user) => Err(ServerError::MissingPermission {
                username: user.username.clone(),
                permission,
            }),
            None => Err(ServerError::NotLoggedIn(permission)),
        }
    }

    /// Like [`Viewer::require`], but also insists on a logged-in user.
    pub fn require_user(&self, permission: Permission) -> Result<&User, ServerError> {
        self.require(permission)?;
        self.user
            .as_ref()
            .ok_or(ServerError::NotLoggedIn(permission))
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    Arc<Store>: FromRef<S>,
    Arc<SiteConfig>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let config = Arc::<SiteConfig>::from_ref(state);
        let guest = Self::guest(&config);

        let Ok(TypedHeader(cookie)) = CookieHeader::from_request_parts(parts, state).await else {
            return Ok(guest);
        };
        let Some(token) = cookie.get(SESSION_COOKIE) else {
            return Ok(guest);
        };
        let token: SessionToken = match token.parse() {
            Ok(token) => token,
            Err(err) => {
                debug!(error = %err, "Ignoring malformed session cookie");
                return Ok(guest);
            }
        };

        let token_hash = token.hash()?;
        let Some((session, user)) = Arc::<Store>::from_ref(state)
            .db()
            .fetch_session(&token_hash)
            .await?
        else {
            debug!("Ignoring unknown session cookie");
            return Ok(guest);
        };

        if session.is_expired_at(UtcDateTime::now()) {
            debug!(username = %user.username, "Ignoring expired session");
            return Ok(guest);
        }

        let role = config.role(&user.role);
        Ok(Self {
            user: Some(user),
            role,
            token_hash: Some(token_hash),
        })
    }
}

/// `Set-Cookie` value handing `token` to the browser.
#[must_use]
pub fn session_cookie(token: &SessionToken, settings: SessionSettings) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={}; Path=/; HttpOnly; SameSite=Lax",
        token.as_token_str()
    );
    if let Some(lifetime) = settings.lifetime {
        cookie.push_str(&format!("; Max-Age={}", lifetime.whole_seconds()));
    }
    if settings.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that makes the browser drop the session cookie.
#[must_use]
pub fn expired_session_cookie(settings: SessionSettings) -> String {
    let mut cookie = format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if settings.secure_cookies {
        cookie.push_str("; Secure");
    }
    cookie
}
