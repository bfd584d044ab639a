use inkpost_api::{
    install_tracing, load_dotenv,
    server::{self, ServerState, SessionSettings},
};
use inkpost_common::{
    config::{ConfigError, SiteConfig},
    util::{NonPositiveDurationError, PositiveDuration},
};
use inkpost_db::{
    client::{DbClient, DbError},
    store::{Store, StoreError},
};
use serde::Deserialize;
use std::{
    net::{IpAddr, SocketAddr},
    path::PathBuf,
    sync::Arc,
};
use thiserror::Error;
use time::Duration;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error parsing environment: {0}")]
    Envy(#[from] envy::Error),
    #[error("Invalid session lifetime: {0}")]
    SessionLifetime(#[from] NonPositiveDurationError),
    #[error("Error loading site config: {0}")]
    Config(#[from] ConfigError),
    #[error("Error connecting to database: {0}")]
    Database(#[from] DbError),
    #[error("Error opening instance directory: {0}")]
    Store(#[from] StoreError),
    #[error("Error binding tcp listener: {0}")]
    TcpBind(std::io::Error),
    #[error("Error serving server: {0}")]
    TcpServe(std::io::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, Deserialize)]
struct Env {
    server_address: IpAddr,
    server_port: u16,
    database_url: String,
    site_config: PathBuf,
    instance_dir: PathBuf,
    static_dir: Option<PathBuf>,
    session_lifetime_seconds: Option<i64>,
    #[serde(default)]
    secure_cookies: bool,
}

impl Env {
    fn session_settings(&self) -> Result<SessionSettings, InitError> {
        let lifetime = self
            .session_lifetime_seconds
            .map(|seconds| PositiveDuration::try_from(Duration::seconds(seconds)))
            .transpose()?;

        Ok(SessionSettings {
            lifetime,
            secure_cookies: self.secure_cookies,
        })
    }
}

fn get_env() -> Result<Env, InitError> {
    load_dotenv()?;
    envy::from_env().map_err(InitError::from)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Could not listen for ctrl-c, shutting down");
        return;
    }
    info!("Received ctrl-c, shutting down");
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    let env = get_env()?;
    let sessions = env.session_settings()?;

    let config = SiteConfig::load(&env.site_config)?;
    let db = DbClient::connect(&env.database_url).await?;
    let store = Store::open(db, &env.instance_dir).await?;

    let state = ServerState {
        store: Arc::new(store),
        config: Arc::new(config),
        sessions,
    };

    let tracing_layer = TraceLayer::new_for_http();
    let app = server::routes(env.static_dir.as_deref())
        .layer(tracing_layer)
        .with_state(state);

    let server_address = SocketAddr::new(env.server_address, env.server_port);
    let listener = tokio::net::TcpListener::bind(server_address)
        .await
        .map_err(InitError::TcpBind)?;
    info!(%server_address, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(InitError::TcpServe)?;

    Ok(())
}
