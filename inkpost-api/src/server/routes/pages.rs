use crate::{
    render::{
        PageContext, forms,
        posts::{body_html, homepage, post_index, post_link, post_page},
        stylesheet,
    },
    server::{Result, ServerError, ServerRouter, auth::Viewer, body::Payload},
};
use axum::{
    extract::State,
    http::header::CONTENT_TYPE,
    response::{IntoResponse, Redirect},
};
use axum_extra::routing::{RouterExt, TypedPath};
use inkpost_common::{
    config::SiteConfig,
    model::{
        post::{CreatePost, PostId},
        role::Permission,
    },
};
use inkpost_db::store::Store;
use maud::Markup;
use serde::Deserialize;
use std::sync::Arc;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .typed_get(get_homepage)
        .typed_get(get_post_index)
        .typed_get(get_post_page)
        .typed_get(get_create_post_page)
        .typed_post(submit_create_post_page)
        .typed_get(get_stylesheet)
}

fn context<'a>(config: &'a SiteConfig, viewer: &'a Viewer) -> PageContext<'a> {
    PageContext::live(config, viewer.user().map(|user| &user.username))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/", rejection(ServerError))]
struct HomepagePath();

async fn get_homepage(
    HomepagePath(): HomepagePath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Result<Markup> {
    let recent = store
        .db()
        .fetch_recent_posts(config.homepage_post_count)
        .await?;

    Ok(homepage(context(&config, &viewer), &recent))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/", rejection(ServerError))]
struct PostIndexPath();

async fn get_post_index(
    PostIndexPath(): PostIndexPath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Result<Markup> {
    let posts = store.db().fetch_posts().await?;

    Ok(post_index(context(&config, &viewer), &posts))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/{id}", rejection(ServerError))]
struct PostPagePath {
    id: PostId,
}

async fn get_post_page(
    PostPagePath { id }: PostPagePath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Result<Markup> {
    let Some(post) = store.db().fetch_post(&id).await? else {
        return Err(ServerError::PostByIdNotFound(id));
    };
    let markdown = store.read_body(&post).await?;

    Ok(post_page(
        context(&config, &viewer),
        &post,
        &body_html(&config, &markdown),
    ))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/posts/create", rejection(ServerError))]
struct CreatePostPagePath();

async fn get_create_post_page(
    CreatePostPagePath(): CreatePostPagePath,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
) -> Result<Markup> {
    viewer.require(Permission::CanWritePosts)?;

    Ok(forms::create_post_page(context(&config, &viewer)))
}

async fn submit_create_post_page(
    CreatePostPagePath(): CreatePostPagePath,
    State(store): State<Arc<Store>>,
    State(config): State<Arc<SiteConfig>>,
    viewer: Viewer,
    Payload(request): Payload<CreatePost>,
) -> Result<Redirect> {
    let author = viewer.require_user(Permission::CanWritePosts)?;
    let post = store.create_post(request, &author.username, &config).await?;

    Ok(Redirect::to(&post_link(&post)))
}

#[derive(TypedPath, Deserialize)]
#[typed_path("/static/style.css", rejection(ServerError))]
struct StylesheetPath();

async fn get_stylesheet(
    StylesheetPath(): StylesheetPath,
    State(config): State<Arc<SiteConfig>>,
) -> impl IntoResponse {
    (
        [(CONTENT_TYPE, "text/css; charset=utf-8")],
        stylesheet(&config.site_colors),
    )
}
