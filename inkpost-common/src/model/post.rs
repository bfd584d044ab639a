use crate::{
    config::SiteConfig,
    model::{
        Id,
        user::{InvalidUsernameError, Username},
    },
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use time::UtcDateTime;

#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Default, Hash)]
pub struct PostMarker;

pub type PostId = Id<PostMarker>;

#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct Post {
    pub id: PostId,
    pub title: String,
    pub author: Username,
    pub description: String,
    /// Name of the Markdown file holding the body.
    pub content_link: String,
    pub like_count: u64,
    pub created_at: UtcDateTime,
}

/// Incoming request body for post creation, before any cleaning.
#[derive(Clone, Eq, PartialEq, Debug, Default, Hash, Deserialize, Serialize)]
pub struct CreatePost {
    pub title: String,
    pub description: String,
    pub content: String,
}

/// A post that passed slugging and scrubbing and is ready to be stored.
#[derive(Clone, Eq, PartialEq, Debug, Hash)]
pub struct NewPost {
    pub id: PostId,
    pub title: String,
    pub author: Username,
    pub description: String,
    pub content_link: String,
    pub body: String,
}

#[derive(Clone, Eq, PartialEq, Ord, PartialOrd, Debug, Hash, Error)]
pub enum InvalidPostError {
    #[error("The post title {0:?} does not produce a usable id")]
    Title(String),
    #[error("The author is empty after scrubbing: {0}")]
    Author(#[from] InvalidUsernameError),
}

impl CreatePost {
    /// Derives the id from the title and scrubs the free-text fields and the author.
    ///
    /// The body is stored as written; it is only cleaned when rendered.
    pub fn prepare(
        self,
        author: &Username,
        config: &SiteConfig,
    ) -> Result<NewPost, InvalidPostError> {
        let slug = config.slugify(&self.title);
        if !is_file_safe(&slug) {
            return Err(InvalidPostError::Title(self.title));
        }
        let author = Username::new(config.scrub(author.get()))?;

        Ok(NewPost {
            id: PostId::new(slug.clone()),
            title: config.scrub(&self.title),
            author,
            description: config.scrub(&self.description),
            content_link: slug,
            body: self.content,
        })
    }
}

fn is_file_safe(slug: &str) -> bool {
    !slug.is_empty()
        && slug.chars().any(|c| c != '-' && c != '.')
        && !slug.contains(['/', '\\'])
}
