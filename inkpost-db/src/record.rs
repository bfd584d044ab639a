use inkpost_common::{
    model::{
        ModelValidationError,
        auth::{HashedPassword, Session},
        file::StoredFile,
        post::Post,
        user::{User, UserWithPassword, Username},
    },
    util::{PositiveDuration, from_unix_seconds},
};
use time::Duration;

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct UserRecord {
    pub username: String,
    pub password: String,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct PostRecord {
    pub id: String,
    pub title: String,
    pub author: String,
    pub description: String,
    pub content_link: String,
    pub like_count: i64,
    pub created_at: i64,
}

#[derive(Clone, Eq, PartialEq, Debug, Hash, sqlx::FromRow)]
pub(crate) struct SessionRecord {
    pub token_hash: Vec<u8>,
    pub username: String,
    pub created_at: i64,
    pub expires_after_seconds: Option<i64>,
    pub role: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, sqlx::FromRow)]
pub(crate) struct FileRecord {
    pub id: String,
    pub filename: String,
    pub extension: String,
    pub created_at: i64,
}

impl TryFrom<UserRecord> for UserWithPassword {
    type Error = ModelValidationError;

    fn try_from(value: UserRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            user: User {
                username: Username::new(value.username)?,
                role: value.role,
            },
            password: HashedPassword::from_phc(value.password),
        })
    }
}

impl TryFrom<PostRecord> for Post {
    type Error = ModelValidationError;

    fn try_from(value: PostRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            title: value.title,
            author: Username::new(value.author)?,
            description: value.description,
            content_link: value.content_link,
            like_count: u64::try_from(value.like_count)
                .map_err(|_| ModelValidationError::NegativeLikeCount(value.like_count))?,
            created_at: from_unix_seconds(value.created_at)?,
        })
    }
}

impl TryFrom<SessionRecord> for (Session, User) {
    type Error = ModelValidationError;

    fn try_from(value: SessionRecord) -> Result<Self, Self::Error> {
        let username = Username::new(value.username)?;

        let session = Session {
            username: username.clone(),
            token_hash: value.token_hash.try_into()?,
            created_at: from_unix_seconds(value.created_at)?,
            expires_after: value
                .expires_after_seconds
                .map(|seconds| PositiveDuration::try_from(Duration::seconds(seconds)))
                .transpose()?,
        };
        let user = User {
            username,
            role: value.role,
        };

        Ok((session, user))
    }
}

impl TryFrom<FileRecord> for StoredFile {
    type Error = ModelValidationError;

    fn try_from(value: FileRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: value.id.into(),
            filename: value.filename,
            extension: value.extension,
            created_at: from_unix_seconds(value.created_at)?,
        })
    }
}
