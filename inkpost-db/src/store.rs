//! Post bodies and uploads on disk, kept in step with their rows.

use crate::client::{DbClient, DbError};
use inkpost_common::{
    config::SiteConfig,
    model::{
        file::{FileId, InvalidFileNameError, StoredFile, extension_of},
        post::{CreatePost, InvalidPostError, Post, PostId},
        user::Username,
    },
    util::now_seconds,
};
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tokio::{fs, io::AsyncWriteExt};
use tracing::{debug, info, warn};

pub const POSTS_DIR: &str = "posts";
pub const FILES_DIR: &str = "files";

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error(transparent)]
    InvalidPost(#[from] InvalidPostError),
    #[error(transparent)]
    InvalidFileName(#[from] InvalidFileNameError),
    #[error("Post with id {0} already exists")]
    PostExists(PostId),
    #[error("Files with extension {0:?} are not allowed")]
    ExtensionNotAllowed(String),
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl StoreError {
    fn io(path: &Path) -> impl FnOnce(std::io::Error) -> Self + '_ {
        move |source| StoreError::Io {
            path: path.to_owned(),
            source,
        }
    }
}

/// The database plus the instance directory holding post bodies and uploads.
#[derive(Clone, Debug)]
pub struct Store {
    db: DbClient,
    root: PathBuf,
}

impl Store {
    /// Creates the instance directory layout if it is missing.
    pub async fn open(db: DbClient, root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        for dir in [root.join(POSTS_DIR), root.join(FILES_DIR)] {
            fs::create_dir_all(&dir).await.map_err(StoreError::io(&dir))?;
        }
        info!(instance = %root.display(), "instance directory ready");

        Ok(Self { db, root })
    }

    #[must_use]
    pub fn db(&self) -> &DbClient {
        &self.db
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn post_path(&self, content_link: &str) -> PathBuf {
        self.root.join(POSTS_DIR).join(content_link)
    }

    #[must_use]
    pub fn file_path(&self, file_id: &FileId) -> PathBuf {
        self.root.join(FILES_DIR).join(file_id.get())
    }

    /// Writes the body with create-new semantics, then inserts the row.
    ///
    /// An existing body file or row is a [`StoreError::PostExists`]. If the
    /// row can't be inserted the body file is removed again.
    pub async fn create_post(
        &self,
        request: CreatePost,
        author: &Username,
        config: &SiteConfig,
    ) -> Result<Post> {
        let new_post = request.prepare(author, config)?;
        let path = self.post_path(&new_post.content_link);

        let mut file = match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::AlreadyExists => {
                return Err(StoreError::PostExists(new_post.id));
            }
            Err(err) => return Err(StoreError::io(&path)(err)),
        };

        let written = async {
            file.write_all(new_post.body.as_bytes()).await?;
            file.flush().await
        }
        .await;
        if let Err(err) = written {
            self.discard_body(&path).await;
            return Err(StoreError::io(&path)(err));
        }

        match self.db.insert_post(&new_post).await {
            Ok(post) => {
                info!(post_id = %post.id, author = %post.author, "post created");
                Ok(post)
            }
            Err(err) => {
                self.discard_body(&path).await;
                match err {
                    DbError::Conflict => Err(StoreError::PostExists(new_post.id)),
                    err => Err(err.into()),
                }
            }
        }
    }

    async fn discard_body(&self, path: &Path) {
        if let Err(err) = fs::remove_file(path).await {
            warn!(path = %path.display(), error = %err, "could not remove orphaned post body");
        }
    }

    pub async fn read_body(&self, post: &Post) -> Result<String> {
        let path = self.post_path(&post.content_link);
        fs::read_to_string(&path).await.map_err(StoreError::io(&path))
    }

    /// Validates the extension, writes the blob and records it.
    pub async fn store_file(
        &self,
        filename: &str,
        contents: &[u8],
        config: &SiteConfig,
    ) -> Result<StoredFile> {
        let extension = extension_of(filename)?;
        if !config.allows_file_extension(&extension) {
            return Err(StoreError::ExtensionNotAllowed(extension));
        }

        let file = StoredFile {
            id: FileId::generate(),
            filename: config.scrub(filename),
            extension,
            created_at: now_seconds(),
        };

        let path = self.file_path(&file.id);
        fs::write(&path, contents)
            .await
            .map_err(StoreError::io(&path))?;

        if let Err(err) = self.db.insert_file(&file).await {
            self.discard_body(&path).await;
            return Err(err.into());
        }

        debug!(file_id = %file.id, bytes = contents.len(), "file stored");
        Ok(file)
    }

    pub async fn read_file(&self, file: &StoredFile) -> Result<Vec<u8>> {
        let path = self.file_path(&file.id);
        fs::read(&path).await.map_err(StoreError::io(&path))
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        client::DbClient,
        store::{POSTS_DIR, Store, StoreError},
    };
    use inkpost_common::{
        config::SiteConfig,
        model::{post::CreatePost, user::Username},
    };

    const CONFIG: &str = r##"
site_name = "Test"
footnote = ""

[site_colors]
background = "#fff"
background_accent = "#eee"
text = "#000"
text_light = "#333"
accent = "#90c"
accent_hover = "#70a"
accent_text = "#fff"
code = "#eee"
preformatted = "#f5f5f5"
disabled = "#999"

[roles.guest]
permissions = []

[allowed_clean]
html_tags = ["p"]
letters = "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ"
characters = " !"
allowed_file_extensions = ["png", "txt"]
"##;

    async fn store() -> (tempfile::TempDir, Store, SiteConfig) {
        let dir = tempfile::tempdir().unwrap();
        let db = DbClient::in_memory().await.unwrap();
        let store = Store::open(db, dir.path().join("instance")).await.unwrap();
        let config = SiteConfig::from_toml_str(CONFIG).unwrap();
        (dir, store, config)
    }

    fn request(title: &str) -> CreatePost {
        CreatePost {
            title: title.to_owned(),
            description: "desc".to_owned(),
            content: "# Body".to_owned(),
        }
    }

    fn author() -> Username {
        Username::new("admin".to_owned()).unwrap()
    }

    #[tokio::test]
    async fn create_post_writes_body_and_row() {
        let (_dir, store, config) = store().await;

        let post = store
            .create_post(request("Hello World"), &author(), &config)
            .await
            .unwrap();

        assert_eq!(post.id.get(), "hello-world");
        assert!(store.root().join(POSTS_DIR).join("hello-world").is_file());
        assert_eq!(store.read_body(&post).await.unwrap(), "# Body");
        assert!(store.db().fetch_post(&post.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn existing_slug_conflicts_and_keeps_original_body() {
        let (_dir, store, config) = store().await;

        let original = store
            .create_post(request("Hello World"), &author(), &config)
            .await
            .unwrap();

        let mut second = request("hello   world");
        second.content = "overwritten".to_owned();
        let result = store.create_post(second, &author(), &config).await;

        assert!(matches!(result, Err(StoreError::PostExists(id)) if id.get() == "hello-world"));
        assert_eq!(store.read_body(&original).await.unwrap(), "# Body");
    }

    #[tokio::test]
    async fn row_conflict_removes_fresh_body() {
        let (_dir, store, config) = store().await;

        store
            .create_post(request("Orphan"), &author(), &config)
            .await
            .unwrap();
        std::fs::remove_file(store.post_path("orphan")).unwrap();

        let result = store.create_post(request("Orphan"), &author(), &config).await;
        assert!(matches!(result, Err(StoreError::PostExists(_))));
        assert!(!store.post_path("orphan").exists());
    }

    #[tokio::test]
    async fn untitled_post_is_rejected() {
        let (_dir, store, config) = store().await;

        let result = store.create_post(request("123"), &author(), &config).await;
        assert!(matches!(result, Err(StoreError::InvalidPost(_))));
    }

    #[tokio::test]
    async fn files_are_checked_and_stored() {
        let (_dir, store, config) = store().await;

        let file = store.store_file("cat.PNG", b"png", &config).await.unwrap();
        assert_eq!(file.extension, "png");
        assert_eq!(store.read_file(&file).await.unwrap(), b"png");
        assert_eq!(store.db().fetch_files().await.unwrap(), [file]);

        assert!(matches!(
            store.store_file("run.exe", b"MZ", &config).await,
            Err(StoreError::ExtensionNotAllowed(extension)) if extension == "exe"
        ));
        assert!(matches!(
            store.store_file("noextension", b"", &config).await,
            Err(StoreError::InvalidFileName(_))
        ));
    }
}
