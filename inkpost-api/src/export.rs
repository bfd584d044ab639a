//! Snapshot of the whole site as flat HTML files.
//!
//! The export always starts from an empty output directory and stops at the
//! first error; there is no incremental mode.

use crate::render::{
    PageContext,
    posts::{body_html, homepage, post_index, post_page},
    stylesheet,
};
use inkpost_common::config::SiteConfig;
use inkpost_db::{
    client::DbError,
    store::{Store, StoreError},
};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

pub const INDEX_FILE: &str = "index.html";
pub const POSTS_DIR: &str = "posts";
pub const FILES_DIR: &str = "files";
pub const STATIC_DIR: &str = "static";
pub const STYLESHEET_FILE: &str = "style.css";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ExportError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| ExportError::Io {
            path: path.to_owned(),
            source,
        }
    }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Hash)]
pub struct ExportSummary {
    pub posts: usize,
    pub files: usize,
}

pub struct Exporter<'a> {
    store: &'a Store,
    config: &'a SiteConfig,
    static_dir: Option<&'a Path>,
    output: &'a Path,
}

impl<'a> Exporter<'a> {
    #[must_use]
    pub fn new(
        store: &'a Store,
        config: &'a SiteConfig,
        static_dir: Option<&'a Path>,
        output: &'a Path,
    ) -> Self {
        Self {
            store,
            config,
            static_dir,
            output,
        }
    }

    pub async fn run(&self) -> Result<ExportSummary, ExportError> {
        info!(output = %self.output.display(), "Starting export");

        self.reset_output().await?;
        self.export_static().await?;
        self.export_pages().await?;
        let posts = self.export_posts().await?;
        let files = self.export_files().await?;

        let summary = ExportSummary { posts, files };
        info!(posts, files, "Export finished");
        Ok(summary)
    }

    async fn reset_output(&self) -> Result<(), ExportError> {
        match fs::remove_dir_all(self.output).await {
            Ok(()) => debug!("Removed previous export"),
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => return Err(ExportError::io(self.output)(err)),
        }

        create_dir(self.output).await
    }

    async fn export_static(&self) -> Result<(), ExportError> {
        let target = self.output.join(STATIC_DIR);
        match self.static_dir {
            Some(source) => copy_dir(source, &target).await?,
            None => create_dir(&target).await?,
        }

        write(
            &target.join(STYLESHEET_FILE),
            stylesheet(&self.config.site_colors).as_bytes(),
        )
        .await
    }

    async fn export_pages(&self) -> Result<(), ExportError> {
        let context = PageContext::export(self.config);
        let db = self.store.db();

        let recent = db
            .fetch_recent_posts(self.config.homepage_post_count)
            .await?;
        let html = homepage(context, &recent).into_string();
        write(&self.output.join(INDEX_FILE), html.as_bytes()).await?;

        let posts = db.fetch_posts().await?;
        let html = post_index(context, &posts).into_string();
        let dir = self.output.join(POSTS_DIR);
        create_dir(&dir).await?;
        write(&dir.join(INDEX_FILE), html.as_bytes()).await
    }

    async fn export_posts(&self) -> Result<usize, ExportError> {
        let context = PageContext::export(self.config);
        let posts = self.store.db().fetch_posts().await?;

        for post in &posts {
            let markdown = self.store.read_body(post).await?;
            let html =
                post_page(context, post, &body_html(self.config, &markdown)).into_string();

            let dir = self.output.join(POSTS_DIR).join(post.id.get());
            create_dir(&dir).await?;
            write(&dir.join(INDEX_FILE), html.as_bytes()).await?;
            debug!(post_id = %post.id, "Exported post");
        }

        Ok(posts.len())
    }

    async fn export_files(&self) -> Result<usize, ExportError> {
        let files = self.store.db().fetch_files().await?;
        let dir = self.output.join(FILES_DIR);
        create_dir(&dir).await?;

        for file in &files {
            let source = self.store.file_path(&file.id);
            let target = dir.join(file.id.get());
            fs::copy(&source, &target)
                .await
                .map_err(ExportError::io(&source))?;
        }

        Ok(files.len())
    }
}

async fn create_dir(path: &Path) -> Result<(), ExportError> {
    fs::create_dir_all(path)
        .await
        .map_err(ExportError::io(path))
}

async fn write(path: &Path, contents: &[u8]) -> Result<(), ExportError> {
    fs::write(path, contents)
        .await
        .map_err(ExportError::io(path))
}

/// Recursively copies the contents of `source` into `target`.
async fn copy_dir(source: &Path, target: &Path) -> Result<(), ExportError> {
    let mut pending = vec![(source.to_owned(), target.to_owned())];

    while let Some((from, to)) = pending.pop() {
        create_dir(&to).await?;

        let mut entries = fs::read_dir(&from).await.map_err(ExportError::io(&from))?;
        while let Some(entry) = entries.next_entry().await.map_err(ExportError::io(&from))? {
            let path = entry.path();
            let destination = to.join(entry.file_name());
            let file_type = entry.file_type().await.map_err(ExportError::io(&path))?;

            if file_type.is_dir() {
                pending.push((path, destination));
            } else {
                fs::copy(&path, &destination)
                    .await
                    .map_err(ExportError::io(&path))?;
            }
        }
    }

    Ok(())
}
