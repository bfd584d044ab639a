use crate::render::{PageContext, page};
use inkpost_common::{
    config::SiteConfig,
    markdown::{HtmlCleaner, minify_html},
    model::post::Post,
};
use maud::{Markup, PreEscaped, html};

/// Stored Markdown to the cleaned, minified HTML that goes into a post page.
#[must_use]
pub fn body_html(config: &SiteConfig, markdown: &str) -> String {
    minify_html(&HtmlCleaner::new(&config.allowed_clean).render(markdown))
}

#[must_use]
pub fn post_link(post: &Post) -> String {
    format!("/posts/{}", post.id)
}

fn post_meta(post: &Post) -> Markup {
    html! {
        p class="post-meta" {
            "by " (post.author.get())
            " on " (post.created_at.date().to_string())
            " · " (post.like_count) @if post.like_count == 1 { " like" } @else { " likes" }
        }
    }
}

fn post_summary(post: &Post) -> Markup {
    html! {
        article class="post-summary" {
            h2 { a href=(post_link(post)) { (post.title) } }
            (post_meta(post))
            @if !post.description.is_empty() {
                p { (post.description) }
            }
        }
    }
}

fn post_list(posts: &[Post]) -> Markup {
    html! {
        @if posts.is_empty() {
            p class="empty" { "Nothing has been posted yet." }
        } @else {
            @for post in posts {
                (post_summary(post))
            }
        }
    }
}

/// The landing page with the newest posts.
#[must_use]
pub fn homepage(context: PageContext<'_>, recent: &[Post]) -> Markup {
    let content = html! {
        h1 { (context.config.site_name) }
        section class="recent-posts" {
            h2 { "Latest posts" }
            (post_list(recent))
        }
        p { a href="/posts/" { "All posts" } }
    };

    page(context, "Homepage", &content)
}

#[must_use]
pub fn post_index(context: PageContext<'_>, posts: &[Post]) -> Markup {
    let content = html! {
        h1 { "Posts" }
        (post_list(posts))
    };

    page(context, "Posts", &content)
}

/// A single post; `body_html` must already be cleaned.
#[must_use]
pub fn post_page(context: PageContext<'_>, post: &Post, body_html: &str) -> Markup {
    let content = html! {
        article class="post" {
            h1 { (post.title) }
            (post_meta(post))
            @if !post.description.is_empty() {
                p class="post-description" { em { (post.description) } }
            }
            div class="post-content" { (PreEscaped(body_html)) }
            @if context.live {
                p {
                    a class="button like" href={ "/api/v0/posts/" (post.id.get()) "/like" } { "Like" }
                }
            }
        }
    };

    page(context, &post.title, &content)
}
