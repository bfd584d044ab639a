use crate::{
    render::{PageContext, forms},
    server::{
        Result, ServerError, ServerRouter, SessionSettings,
        auth::{Viewer, expired_session_cookie, session_cookie},
        body::{Json, Payload},
    },
};
use axum::{
    extract::State,
    http::header::SET_COOKIE,
    response::{AppendHeaders, IntoResponse, Redirect},
};
use axum_extra::routing::{RouterExt, TypedPath};
use inkpost_common::{
    config::SiteConfig,
    model::{
        auth::{HashedPassword, Session, SessionToken},
        role::Permission,
        user::{User, UserCredentials, Username},
    },
    util::now_seconds,
};
use inkpost_db::{client::DbError, store::Store};
use maud::Markup;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use time::UtcDateTime;
use tracing::{debug, info};

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_post(api_register)
        .typed_post(api_login)
        .typed_post(api_logout)
        .typed_post(startup)
        .typed_get(get_register_page)
        .typed_post(submit_register_page)
        .typed_get(get_login_page)
        .typed_post(submit_login_page)
        .typed_get(get_logout_page)
        .typed_post(submit_logout_page)
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Serialize)]
struct LogoutResponse {
    logged_out: bool,
}

/// Scrubs the username to the free-text alphabet; nothing may be left empty.
fn parse_credentials(
    config: &SiteConfig,
    credentials: UserCredentials,
) -> Result<(Username, String)> {
    let username = Username::new(config.scrub(&credentials.username))?;
    if credentials.password.is_empty() {
        return Err(ServerError::EmptyPassword);
    }

    Ok((username, credentials.password))
}

async fn register(
    viewer: &Viewer,
    store: &Store,
    config: &SiteConfig,
    credentials: UserCredentials,
) -> Result<User> {
    viewer.require(Permission::CanRegister)?;
    let (username, password) = parse_credentials(config, credentials)?;
    let password = HashedPassword::hash(&password)?;

    match store
        .db()
        .create_user(&username, &password, &config.default_role)
        .await
    {
        Ok(user) => {
            info!(username = %user.username, role = %user.role, "User registered");
            Ok(user)
        }
        Err(DbError::Conflict) => Err(ServerError::UsernameTaken(username)),
        Err(err) => Err(err.into()),
    }
}

/// Checks the credentials and opens a session, returning the `Set-Cookie` value for it.
async fn login(
    store: &Store,
    config: &SiteConfig,
    settings: SessionSettings,
    credentials: UserCredentials,
) -> Result<(User, String)> {
    let (username, password) = parse_credentials(config, credentials)?;

    let Some(found) = store.db().fetch_user(&username).await? else {
        return Err(ServerError::UserNotFound(username));
    };
    if !found.password.verify(&password)? {
        return Err(ServerError::WrongPassword(username));
    }
    if !config.role_allows(&found.user.role, Permission::CanLogin) {
        return Err(ServerError::MissingPermission {
            username,
            permission: Permission::CanLogin,
        });
    }

    let purged = store
        .db()
        .delete_expired_sessions(UtcDateTime::now())
        .await?;
    if purged > 0 {
        debug!(purged, "Removed expired sessions");
    }

    let token = SessionToken::generate_random();
    let session = Session {
        username,
        token_hash: token.hash()?,
        created_at: now_seconds(),
        expires_after: settings.lifetime,
    };
    store.db().create_session(&session).await?;
    info!(username = %session.username, "User logged in");

    Ok((found.user, session_cookie(&token, settings)))
}

/// Ends the viewer's session, if any, returning whether one was deleted.
async fn logout(viewer: &Viewer, store: &Store) -> Result<bool> {
    let Some(token_hash) = viewer.token_hash() else {
        return Ok(false);
    };

    let deleted = store.db().delete_session(token_hash).await?;
    if let Some(user) = viewer.user() {
        info!(username = %user.username, "User logged out");
    }

    Ok(deleted)
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/users/register", rejection(ServerError))]
struct RegisterPath();

async fn api_register(
    RegisterPath(): RegisterPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
    Payload(credentials): Payload<UserCredentials>,
) -> Result<Json<User>> {
    let user = register(&viewer, &store, &config, credentials).await?;

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/users/login", rejection(ServerError))]
struct LoginPath();

async fn api_login(
    LoginPath(): LoginPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    State(settings): State<SessionSettings>,
    Payload(credentials): Payload<UserCredentials>,
) -> Result<impl IntoResponse> {
    let (user, cookie) = login(&store, &config, settings, credentials).await?;

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Json(user)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/users/logout", rejection(ServerError))]
struct LogoutPath();

async fn api_logout(
    LogoutPath(): LogoutPath,
    State(store): State<Arc<Store>>,
    State(settings): State<SessionSettings>,
    viewer: Viewer,
) -> Result<impl IntoResponse> {
    let logged_out = logout(&viewer, &store).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, expired_session_cookie(settings))]),
        Json(LogoutResponse { logged_out }),
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/startup", rejection(ServerError))]
struct StartupPath();

/// Creates the first user, with the admin role. Refused once any user exists.
async fn startup(
    StartupPath(): StartupPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    Payload(credentials): Payload<UserCredentials>,
) -> Result<Json<User>> {
    if store.db().user_count().await? > 0 {
        return Err(ServerError::AlreadyBootstrapped);
    }

    let (username, password) = parse_credentials(&config, credentials)?;
    let password = HashedPassword::hash(&password)?;
    let user = store
        .db()
        .create_first_user(&username, &password, &config.admin_role)
        .await?
        .ok_or(ServerError::AlreadyBootstrapped)?;
    info!(username = %user.username, role = %user.role, "First user created");

    Ok(Json(user))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/register", rejection(ServerError))]
struct RegisterPagePath();

async fn get_register_page(
    RegisterPagePath(): RegisterPagePath,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Result<Markup> {
    viewer.require(Permission::CanRegister)?;
    let viewing = viewer.user().map(|user| &user.username);

    Ok(forms::register_page(PageContext::live(&config, viewing)))
}

async fn submit_register_page(
    RegisterPagePath(): RegisterPagePath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
    Payload(credentials): Payload<UserCredentials>,
) -> Result<Redirect> {
    register(&viewer, &store, &config, credentials).await?;

    Ok(Redirect::to("/"))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/login", rejection(ServerError))]
struct LoginPagePath();

async fn get_login_page(
    LoginPagePath(): LoginPagePath,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Markup {
    let viewing = viewer.user().map(|user| &user.username);

    forms::login_page(PageContext::live(&config, viewing))
}

async fn submit_login_page(
    LoginPagePath(): LoginPagePath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    State(settings): State<SessionSettings>,
    Payload(credentials): Payload<UserCredentials>,
) -> Result<impl IntoResponse> {
    let (_, cookie) = login(&store, &config, settings, credentials).await?;

    Ok((AppendHeaders([(SET_COOKIE, cookie)]), Redirect::to("/")))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/users/logout", rejection(ServerError))]
struct LogoutPagePath();

async fn get_logout_page(
    LogoutPagePath(): LogoutPagePath,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Markup {
    let viewing = viewer.user().map(|user| &user.username);

    forms::logout_page(PageContext::live(&config, viewing))
}

async fn submit_logout_page(
    LogoutPagePath(): LogoutPagePath,
    State(store): State<Arc<Store>>,
    State(settings): State<SessionSettings>,
    viewer: Viewer,
) -> Result<impl IntoResponse> {
    logout(&viewer, &store).await?;

    Ok((
        AppendHeaders([(SET_COOKIE, expired_session_cookie(settings))]),
        Redirect::to("/"),
    ))
}

#[cfg(test)]
mod tests {
    use crate::server::{
        auth::SESSION_COOKIE,
        tests::{TestApp, body_json, body_string, cookie_pair},
    };
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use inkpost_common::model::{auth::HashedPassword, user::Username};
    use serde_json::json;

    #[tokio::test]
    async fn startup_only_once() {
        let app = TestApp::new().await;

        let credentials = json!({"username": "root", "password": "pw"});
        let response = app.post_json("/api/v0/startup", &credentials, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"username": "root", "role": "admin"})
        );

        let again = json!({"username": "intruder", "password": "pw"});
        let response = app.post_json("/api/v0/startup", &again, None).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn register_requires_permission_and_unique_name() {
        let app = TestApp::new().await;
        let newcomer = json!({"username": "bob", "password": "secret"});

        let response = app
            .post_json("/api/v0/users/register", &newcomer, None)
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let admin = app.admin_cookie().await;
        let response = app
            .post_json("/api/v0/users/register", &newcomer, Some(&admin))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"username": "bob", "role": "user"})
        );

        let response = app
            .post_json("/api/v0/users/register", &newcomer, Some(&admin))
            .await;
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let bob = app.login("bob", "secret").await;
        let eve = json!({"username": "eve", "password": "x"});
        let response = app
            .post_json("/api/v0/users/register", &eve, Some(&bob))
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn usernames_are_scrubbed() {
        let app = TestApp::new().await;
        let admin = app.admin_cookie().await;

        let marked_up = json!({"username": "<b>bob</b>;--", "password": "secret"});
        let response = app
            .post_json("/api/v0/users/register", &marked_up, Some(&admin))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            body_json(response).await,
            json!({"username": "bbobb", "role": "user"})
        );

        let cleaned = json!({"username": "bbobb", "password": "secret"});
        let response = app.post_json("/api/v0/users/login", &cleaned, None).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["username"], "bbobb");

        let nothing_left = json!({"username": "<>;", "password": "secret"});
        let response = app
            .post_json("/api/v0/users/register", &nothing_left, Some(&admin))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn startup_rejects_empty_scrubbed_name() {
        let app = TestApp::new().await;

        let credentials = json!({"username": "<>;", "password": "pw"});
        let response = app.post_json("/api/v0/startup", &credentials, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(app.state.store.db().user_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn login_failures() {
        let app = TestApp::new().await;
        app.admin_cookie().await;

        let unknown = json!({"username": "nobody", "password": "pw"});
        let response = app.post_json("/api/v0/users/login", &unknown, None).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let wrong = json!({"username": "admin", "password": "wrong"});
        let response = app.post_json("/api/v0/users/login", &wrong, None).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(header::SET_COOKIE).is_none());

        let banned = Username::new("mallory".to_owned()).unwrap();
        let password = HashedPassword::hash("pw").unwrap();
        app.state
            .store
            .db()
            .create_user(&banned, &password, "banned")
            .await
            .unwrap();
        let response = app
            .post_json(
                "/api/v0/users/login",
                &json!({"username": "mallory", "password": "pw"}),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn login_sets_cookie_and_logout_clears_it() {
        let app = TestApp::new().await;
        let admin = app.admin_cookie().await;
        assert!(admin.starts_with(&format!("{SESSION_COOKIE}=")));

        let page = body_string(app.get("/", Some(&admin)).await).await;
        assert!(page.contains("/users/logout"));

        let request = Request::post("/api/v0/users/logout")
            .header(header::COOKIE, &admin)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(cookie_pair(&response), format!("{SESSION_COOKIE}="));
        assert_eq!(body_json(response).await, json!({"logged_out": true}));

        let page = body_string(app.get("/", Some(&admin)).await).await;
        assert!(page.contains("/users/login"));

        let request = Request::post("/api/v0/users/logout")
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await, json!({"logged_out": false}));
    }

    #[tokio::test]
    async fn html_login_redirects_home() {
        let app = TestApp::new().await;
        app.admin_cookie().await;

        let response = app.get("/users/login", None).await;
        assert_eq!(response.status(), StatusCode::OK);

        let request = Request::post("/users/login")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from("username=admin&password=hunter22"))
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/");
        let cookie = cookie_pair(&response);

        let request = Request::post("/users/logout")
            .header(header::COOKIE, &cookie)
            .body(Body::empty())
            .unwrap();
        let response = app.send(request).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert!(
            response.headers()[header::SET_COOKIE]
                .to_str()
                .unwrap()
                .contains("Max-Age=0")
        );
    }

    #[tokio::test]
    async fn guests_cannot_open_register_page() {
        let app = TestApp::new().await;

        let response = app.get("/users/register", None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let admin = app.admin_cookie().await;
        let response = app.get("/users/register", Some(&admin)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}
