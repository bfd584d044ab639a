use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod export;
pub mod render;
pub mod server;

pub fn install_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "inkpost_api=debug,\
                inkpost_db=debug,\
                inkpost_common=debug,\
                inkpost_export=debug,\
                tower_http=debug,axum::rejection=trace,sqlx=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Loads `.env` into the process environment if there is one.
pub fn load_dotenv() -> Result<(), dotenvy::Error> {
    match dotenvy::dotenv() {
        Ok(path) => {
            debug!(path = %path.display(), "Loaded .env file");
            Ok(())
        }
        Err(err) if err.not_found() => {
            debug!("No .env file found");
            Ok(())
        }
        Err(err) => Err(err),
    }
}
