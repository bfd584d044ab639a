use crate::record::{FileRecord, PostRecord, SessionRecord, UserRecord};
use inkpost_common::model::{
    ModelValidationError,
    auth::{HashedPassword, Session, SessionTokenHash},
    file::{FileId, StoredFile},
    post::{NewPost, Post, PostId},
    user::{User, UserWithPassword, Username},
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use std::str::FromStr;
use thiserror::Error;
use time::UtcDateTime;
use tracing::{debug, info};

pub type Result<T, E = DbError> = std::result::Result<T, E>;

const POST_COLUMNS: &str = "id, title, author, description, content_link, like_count, created_at";

#[derive(Debug, Error)]
pub enum DbError {
    #[error("An object in the database was invalid: {0}")]
    Data(#[from] ModelValidationError),
    #[error("A row with the same key already exists")]
    Conflict,
    #[error(transparent)]
    Sqlx(sqlx::Error),
    #[error("Applying migrations failed: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),
}

impl From<sqlx::Error> for DbError {
    fn from(value: sqlx::Error) -> Self {
        match &value {
            sqlx::Error::Database(err) if err.is_unique_violation() => DbError::Conflict,
            _ => DbError::Sqlx(value),
        }
    }
}

#[derive(Clone, Debug)]
pub struct DbClient {
    pool: SqlitePool,
}

impl DbClient {
    #[must_use]
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Opens (creating if needed) the database at `url` and applies pending migrations.
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;

        let client = Self::new(pool);
        client.migrate().await?;
        info!(url, "database ready");

        Ok(client)
    }

    /// A private in-memory database. Limited to one connection, since every
    /// connection to `:memory:` would otherwise see its own empty database.
    pub async fn in_memory() -> Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;

        let client = Self::new(pool);
        client.migrate().await?;

        Ok(client)
    }

    pub async fn migrate(&self) -> Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    pub async fn fetch_post(&self, post_id: &PostId) -> Result<Option<Post>> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = ?"
        ))
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let post = record.map(Post::try_from).transpose()?;
        Ok(post)
    }

    /// Every post, newest first.
    pub async fn fetch_posts(&self) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Post::try_from(record).map_err(DbError::from))
            .collect()
    }

    /// The `limit` newest posts, newest first.
    pub async fn fetch_recent_posts(&self, limit: u32) -> Result<Vec<Post>> {
        let records = sqlx::query_as::<_, PostRecord>(&format!(
            "SELECT {POST_COLUMNS} FROM posts ORDER BY created_at DESC, rowid DESC LIMIT ?"
        ))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| Post::try_from(record).map_err(DbError::from))
            .collect()
    }

    /// Inserts the post row; the body file is the caller's business.
    pub async fn insert_post(&self, post: &NewPost) -> Result<Post> {
        let record = sqlx::query_as::<_, PostRecord>(&format!(
            "
            INSERT INTO posts (id, title, author, description, content_link, like_count, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            RETURNING {POST_COLUMNS}
            "
        ))
        .bind(post.id.get())
        .bind(&post.title)
        .bind(post.author.get())
        .bind(&post.description)
        .bind(&post.content_link)
        .bind(UtcDateTime::now().unix_timestamp())
        .fetch_one(&self.pool)
        .await?;

        debug!(post_id = %post.id, "post row inserted");
        Ok(Post::try_from(record)?)
    }

    /// Adds one like and returns the new count, or `None` if there is no such post.
    pub async fn like_post(&self, post_id: &PostId) -> Result<Option<u64>> {
        let like_count = sqlx::query_scalar::<_, i64>(
            "
            UPDATE posts SET like_count = like_count + 1
            WHERE id = ?
            RETURNING like_count
            ",
        )
        .bind(post_id.get())
        .fetch_optional(&self.pool)
        .await?;

        like_count
            .map(|count| {
                u64::try_from(count)
                    .map_err(|_| DbError::from(ModelValidationError::NegativeLikeCount(count)))
            })
            .transpose()
    }

    pub async fn fetch_user(&self, username: &Username) -> Result<Option<UserWithPassword>> {
        let record = sqlx::query_as::<_, UserRecord>(
            "SELECT username, password, role FROM users WHERE username = ?",
        )
        .bind(username.get())
        .fetch_optional(&self.pool)
        .await?;

        let user = record.map(UserWithPassword::try_from).transpose()?;
        Ok(user)
    }

    pub async fn user_count(&self) -> Result<u64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok(count.unsigned_abs())
    }

    /// Fails with [`DbError::Conflict`] if the username is taken.
    pub async fn create_user(
        &self,
        username: &Username,
        password: &HashedPassword,
        role: &str,
    ) -> Result<User> {
        sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
            .bind(username.get())
            .bind(password.as_phc())
            .bind(role)
            .execute(&self.pool)
            .await?;

        Ok(User {
            username: username.clone(),
            role: role.to_owned(),
        })
    }

    /// Creates the user only while the users table is still empty.
    ///
    /// Returns `None` once any user exists.
    pub async fn create_first_user(
        &self,
        username: &Username,
        password: &HashedPassword,
        role: &str,
    ) -> Result<Option<User>> {
        let inserted = sqlx::query(
            "
            INSERT INTO users (username, password, role)
            SELECT ?, ?, ?
            WHERE NOT EXISTS (SELECT 1 FROM users)
            ",
        )
        .bind(username.get())
        .bind(password.as_phc())
        .bind(role)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok((inserted == 1).then(|| User {
            username: username.clone(),
            role: role.to_owned(),
        }))
    }

    pub async fn create_session(&self, session: &Session) -> Result<()> {
        sqlx::query(
            "
            INSERT INTO sessions (token_hash, username, created_at, expires_after_seconds)
            VALUES (?, ?, ?, ?)
            ",
        )
        .bind(&session.token_hash.0[..])
        .bind(session.username.get())
        .bind(session.created_at.unix_timestamp())
        .bind(session.expires_after.map(|duration| duration.whole_seconds()))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Looks a session up by token hash, together with the user it belongs to.
    pub async fn fetch_session(
        &self,
        token_hash: &SessionTokenHash,
    ) -> Result<Option<(Session, User)>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            "
            SELECT
                sessions.token_hash,
                sessions.username,
                sessions.created_at,
                sessions.expires_after_seconds,
                users.role
            FROM
                sessions JOIN users ON users.username = sessions.username
            WHERE
                sessions.token_hash = ?
            ",
        )
        .bind(&token_hash.0[..])
        .fetch_optional(&self.pool)
        .await?;

        let session = record.map(<(Session, User)>::try_from).transpose()?;
        Ok(session)
    }

    pub async fn delete_session(&self, token_hash: &SessionTokenHash) -> Result<bool> {
        let deleted = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(&token_hash.0[..])
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    pub async fn delete_expired_sessions(&self, now: UtcDateTime) -> Result<u64> {
        let deleted = sqlx::query(
            "
            DELETE FROM sessions
            WHERE expires_after_seconds IS NOT NULL
                AND created_at + expires_after_seconds < ?
            ",
        )
        .bind(now.unix_timestamp())
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted)
    }

    pub async fn insert_file(&self, file: &StoredFile) -> Result<()> {
        sqlx::query(
            "INSERT INTO file_storage (id, filename, extension, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(file.id.get())
        .bind(&file.filename)
        .bind(&file.extension)
        .bind(file.created_at.unix_timestamp())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn fetch_file(&self, file_id: &FileId) -> Result<Option<StoredFile>> {
        let record = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, extension, created_at FROM file_storage WHERE id = ?",
        )
        .bind(file_id.get())
        .fetch_optional(&self.pool)
        .await?;

        let file = record.map(StoredFile::try_from).transpose()?;
        Ok(file)
    }

    pub async fn fetch_files(&self) -> Result<Vec<StoredFile>> {
        let records = sqlx::query_as::<_, FileRecord>(
            "SELECT id, filename, extension, created_at FROM file_storage ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await?;

        records
            .into_iter()
            .map(|record| StoredFile::try_from(record).map_err(DbError::from))
            .collect()
    }
}
