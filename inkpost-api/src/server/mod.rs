use axum::{
    Router,
    extract::{
        FromRef, Request,
        multipart::{MultipartError, MultipartRejection},
        rejection::{FormRejection, JsonRejection, PathRejection},
    },
    http::{StatusCode, Uri},
    response::{IntoResponse, Response},
};
use inkpost_common::{
    config::SiteConfig,
    model::{
        auth::{PasswordHashError, SessionTokenHashError},
        file::FileId,
        post::PostId,
        role::Permission,
        user::{InvalidUsernameError, Username},
    },
    util::PositiveDuration,
};
use inkpost_db::{
    client::DbError,
    store::{Store, StoreError},
};
use body::Json;
use serde::{Deserialize, Serialize};
use std::{path::Path, sync::Arc};
use thiserror::Error;
use tower_http::services::ServeDir;
use tracing::error;

mod auth;
mod body;
mod routes;

pub type ServerRouter = Router<ServerState>;

#[derive(Clone, Debug, FromRef)]
pub struct ServerState {
    pub store: Arc<Store>,
    pub config: Arc<SiteConfig>,
    pub sessions: SessionSettings,
}

/// How session cookies are issued.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct SessionSettings {
    /// `None` keeps sessions until logout.
    pub lifetime: Option<PositiveDuration>,
    pub secure_cookies: bool,
}

/// All routes; `static_dir`, if given, is served below `/static`.
pub fn routes(static_dir: Option<&Path>) -> ServerRouter {
    let router = routes::routes().fallback(fallback);

    match static_dir {
        Some(dir) => router.nest_service("/static", ServeDir::new(dir)),
        None => router,
    }
}

pub async fn fallback(request: Request) -> ServerError {
    ServerError::UnknownRoute(request.into_parts().0.uri)
}

pub type Result<T, E = ServerError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unknown route requested: {0}")]
    UnknownRoute(Uri),
    #[error("Path rejected: {0}")]
    PathRejection(#[from] PathRejection),
    #[error("Incoming JSON rejected: {0}")]
    JsonRejection(#[from] JsonRejection),
    #[error("Incoming form rejected: {0}")]
    FormRejection(#[from] FormRejection),
    #[error("Multipart body rejected: {0}")]
    MultipartRejection(#[from] MultipartRejection),
    #[error("Reading multipart body failed: {0}")]
    Multipart(#[from] MultipartError),
    #[error("The upload had no file field")]
    MissingUpload,
    #[error("JSON response could not be serialized: {0}")]
    JsonResponse(#[from] serde_json::Error),
    #[error("The session token could not be hashed: {0}")]
    SessionTokenHash(#[from] SessionTokenHashError),
    #[error(transparent)]
    PasswordHash(#[from] PasswordHashError),
    #[error(transparent)]
    InvalidUsername(#[from] InvalidUsernameError),
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Post with id {0} was not found.")]
    PostByIdNotFound(PostId),
    #[error("File with id {0} was not found.")]
    FileByIdNotFound(FileId),
    #[error("User {0} was not found.")]
    UserNotFound(Username),
    #[error("User {0} already exists.")]
    UsernameTaken(Username),
    #[error("The password must not be empty.")]
    EmptyPassword,
    #[error("Wrong password for user {0}.")]
    WrongPassword(Username),
    #[error("Logging in is required for {0}.")]
    NotLoggedIn(Permission),
    #[error("User {username} lacks the {permission} permission.")]
    MissingPermission {
        username: Username,
        permission: Permission,
    },
    #[error("The first user was already created.")]
    AlreadyBootstrapped,
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::UnknownRoute(_)
            | ServerError::PathRejection(_)
            | ServerError::PostByIdNotFound(_)
            | ServerError::FileByIdNotFound(_)
            | ServerError::UserNotFound(_) => StatusCode::NOT_FOUND,
            ServerError::JsonRejection(_)
            | ServerError::FormRejection(_)
            | ServerError::MultipartRejection(_)
            | ServerError::Multipart(_)
            | ServerError::MissingUpload
            | ServerError::InvalidUsername(_)
            | ServerError::EmptyPassword
            | ServerError::WrongPassword(_)
            | ServerError::Store(
                StoreError::InvalidPost(_)
                | StoreError::InvalidFileName(_)
                | StoreError::ExtensionNotAllowed(_),
            ) => StatusCode::BAD_REQUEST,
            ServerError::NotLoggedIn(_) => StatusCode::UNAUTHORIZED,
            ServerError::MissingPermission { .. } => StatusCode::FORBIDDEN,
            ServerError::UsernameTaken(_)
            | ServerError::AlreadyBootstrapped
            | ServerError::Database(DbError::Conflict)
            | ServerError::Store(
                StoreError::PostExists(_) | StoreError::Database(DbError::Conflict),
            ) => StatusCode::CONFLICT,
            ServerError::JsonResponse(_)
            | ServerError::SessionTokenHash(_)
            | ServerError::PasswordHash(_)
            | ServerError::Database(_)
            | ServerError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
struct ErrorResponse {
    status: u16,
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();

        error!(error = %self, %status, "Replying with error");

        let error_response = ErrorResponse {
            status: status.as_u16(),
        };
        (status, Json(error_response)).into_response()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::server::{ServerState, SessionSettings, routes};
    use axum::{
        Router,
        body::Body,
        http::{Request, Response, StatusCode, header},
    };
    use http_body_util::BodyExt;
    use inkpost_common::config::SiteConfig;
    use inkpost_db::{client::DbClient, store::Store};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    pub(crate) const TEST_CONFIG: &str = r##"
site_name = "Inkpost Test"
footnote = "Handwritten."

[site_colors]
background = "#fafafa"
background_accent = "#f0f0f0"
text = "#111111"
text_light = "#555555"
accent = "#9900cc"
accent_hover = "#7a00a3"
accent_text = "#ffffff"
code = "#eeeeee"
preformatted = "#f5f5f5"
disabled = "#999999"

[roles.guest]
permissions = []

[roles.user]
permissions = ["CAN_LOGIN", "CAN_LIKE"]

[roles.admin]
permissions = ["CAN_LOGIN", "CAN_LIKE", "CAN_WRITE_POSTS", "CAN_REGISTER", "CAN_UPLOAD_FILES"]

[roles.banned]
permissions = []

[allowed_clean]
html_tags = ["h1", "h2", "p", "strong", "em", "a", "code", "pre", "ul", "li"]
letters = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ"
characters = " 0123456789!?.,:'"
allowed_file_extensions = ["png", "txt"]

[allowed_clean.html_attributes]
a = ["href", "title"]

[link_badges.rust]
name = "Rust"
link = "https://www.rust-lang.org"
image = "/static/rust.png"
"##;

    pub(crate) struct TestApp {
        pub _dir: tempfile::TempDir,
        pub state: ServerState,
        pub router: Router,
    }

    impl TestApp {
        pub(crate) async fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let db = DbClient::in_memory().await.unwrap();
            let store = Store::open(db, dir.path().join("instance")).await.unwrap();

            let state = ServerState {
                store: Arc::new(store),
                config: Arc::new(SiteConfig::from_toml_str(TEST_CONFIG).unwrap()),
                sessions: SessionSettings::default(),
            };
            let router = routes(None).with_state(state.clone());

            Self {
                _dir: dir,
                state,
                router,
            }
        }

        pub(crate) async fn send(&self, request: Request<Body>) -> Response<Body> {
            self.router.clone().oneshot(request).await.unwrap()
        }

        pub(crate) async fn get(&self, uri: &str, cookie: Option<&str>) -> Response<Body> {
            let mut request = Request::get(uri);
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }
            self.send(request.body(Body::empty()).unwrap()).await
        }

        pub(crate) async fn post_json(
            &self,
            uri: &str,
            body: &Value,
            cookie: Option<&str>,
        ) -> Response<Body> {
            let mut request = Request::post(uri).header(header::CONTENT_TYPE, "application/json");
            if let Some(cookie) = cookie {
                request = request.header(header::COOKIE, cookie);
            }
            self.send(request.body(Body::from(body.to_string())).unwrap())
                .await
        }

        /// Creates the first admin through the startup route and logs them in.
        pub(crate) async fn admin_cookie(&self) -> String {
            let credentials = serde_json::json!({"username": "admin", "password": "hunter22"});
            let response = self.post_json("/api/v0/startup", &credentials, None).await;
            assert_eq!(response.status(), StatusCode::OK);

            self.login("admin", "hunter22").await
        }

        pub(crate) async fn login(&self, username: &str, password: &str) -> String {
            let credentials = serde_json::json!({"username": username, "password": password});
            let response = self
                .post_json("/api/v0/users/login", &credentials, None)
                .await;
            assert_eq!(response.status(), StatusCode::OK);

            cookie_pair(&response)
        }
    }

    /// The `name=value` part of the response's `Set-Cookie` header.
    pub(crate) fn cookie_pair(response: &Response<Body>) -> String {
        let set_cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        set_cookie.split(';').next().unwrap().to_owned()
    }

    pub(crate) async fn body_string(response: Response<Body>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    pub(crate) async fn body_json(response: Response<Body>) -> Value {
        serde_json::from_str(&body_string(response).await).unwrap()
    }

    #[tokio::test]
    async fn unknown_route_is_json_404() {
        let app = TestApp::new().await;

        let response = app.get("/does/not/exist", None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/json"
        );
        assert_eq!(body_json(response).await, serde_json::json!({"status": 404}));
    }

    #[tokio::test]
    async fn static_directory_is_served() {
        let app = TestApp::new().await;
        let assets = tempfile::tempdir().unwrap();
        std::fs::write(assets.path().join("robots.txt"), "User-agent: *").unwrap();
        let router = routes(Some(assets.path())).with_state(app.state.clone());

        let response = router
            .clone()
            .oneshot(Request::get("/static/robots.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_string(response).await, "User-agent: *");

        let response = router
            .oneshot(Request::get("/static/style.css").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_string(response).await.contains("--accent: #9900cc"));
    }
}
