use crate::{
    render::posts::body_html,
    server::{
        Result, ServerError, ServerRouter,
        auth::Viewer,
        body::{Json, Payload},
    },
};
use axum::extract::State;
use axum_extra::routing::{RouterExt, TypedPath};
use inkpost_common::{
    config::SiteConfig,
    model::{
        post::{CreatePost, Post, PostId},
        role::Permission,
        user::Username,
    },
};
use inkpost_db::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_post)
        .typed_get(like_post)
        .typed_post(create_post)
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct PostResponse {
    id: PostId,
    title: String,
    author: Username,
    description: String,
    /// Cleaned HTML.
    content: String,
    like_count: u64,
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct CreatedPostResponse {
    id: PostId,
    title: String,
    author: Username,
    description: String,
    link: String,
}

impl From<Post> for CreatedPostResponse {
    fn from(post: Post) -> Self {
        Self {
            link: format!("/posts/{}", post.id),
            id: post.id,
            title: post.title,
            author: post.author,
            description: post.description,
        }
    }
}

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
struct LikeResponse {
    id: PostId,
    like_count: u64,
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/posts/{id}", rejection(ServerError))]
struct GetPostPath {
    id: PostId,
}

async fn get_post(
    GetPostPath { id }: GetPostPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
) -> Result<Json<PostResponse>> {
    let Some(post) = store.db().fetch_post(&id).await? else {
        return Err(ServerError::PostByIdNotFound(id));
    };
    let markdown = store.read_body(&post).await?;

    Ok(Json(PostResponse {
        content: body_html(&config, &markdown),
        id: post.id,
        title: post.title,
        author: post.author,
        description: post.description,
        like_count: post.like_count,
    }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/posts/{id}/like", rejection(ServerError))]
struct LikePostPath {
    id: PostId,
}

async fn like_post(
    LikePostPath { id }: LikePostPath,
    State(store): State<Arc<Store>>,
    viewer: Viewer,
) -> Result<Json<LikeResponse>> {
    viewer.require(Permission::CanLike)?;

    let Some(like_count) = store.db().like_post(&id).await? else {
        return Err(ServerError::PostByIdNotFound(id));
    };

    Ok(Json(LikeResponse { id, like_count }))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/api/v0/posts/create", rejection(ServerError))]
struct CreatePostPath();

async fn create_post(
    CreatePostPath(): CreatePostPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
    Payload(request): Payload<CreatePost>,
) -> Result<Json<CreatedPostResponse>> {
    let author = viewer.require_user(Permission::CanWritePosts)?;
    let post = store.create_post(request, &author.username, &config).await?;

    Ok(Json(post.into()))
}
