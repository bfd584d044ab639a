use clap::Parser;
use inkpost_api::{
    export::{ExportError, Exporter},
    install_tracing, load_dotenv,
};
use inkpost_common::config::{ConfigError, SiteConfig};
use inkpost_db::{
    client::{DbClient, DbError},
    store::{Store, StoreError},
};
use std::path::PathBuf;
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
enum InitError {
    #[error("Error parsing .env file: {0}")]
    Dotenv(#[from] dotenvy::Error),
    #[error("Error loading site config: {0}")]
    Config(#[from] ConfigError),
    #[error("Error connecting to database: {0}")]
    Database(#[from] DbError),
    #[error("Error opening instance directory: {0}")]
    Store(#[from] StoreError),
    #[error("Error exporting site: {0}")]
    Export(#[from] ExportError),
}

/// Renders every page of an inkpost instance into a directory of static files.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    #[arg(long, env = "DATABASE_URL")]
    database_url: String,
    #[arg(long, env = "SITE_CONFIG")]
    site_config: PathBuf,
    #[arg(long, env = "INSTANCE_DIR")]
    instance_dir: PathBuf,
    /// Copied to `static/` in the output.
    #[arg(long, env = "STATIC_DIR")]
    static_dir: Option<PathBuf>,
    /// Replaced wholesale on every run.
    #[arg(short, long, default_value = "export")]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), InitError> {
    install_tracing();
    load_dotenv()?;
    let args = Args::parse();

    let config = SiteConfig::load(&args.site_config)?;
    let db = DbClient::connect(&args.database_url).await?;
    let store = Store::open(db, &args.instance_dir).await?;

    let summary = Exporter::new(&store, &config, args.static_dir.as_deref(), &args.output)
        .run()
        .await?;
    info!(
        posts = summary.posts,
        files = summary.files,
        output = %args.output.display(),
        "Site exported"
    );

    Ok(())
}
