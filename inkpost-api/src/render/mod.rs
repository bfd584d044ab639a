//! HTML pages, shared by the live server and the static exporter.
//!
//! Everything is built with [maud], so titles, descriptions and other
//! user-supplied text are escaped. Post bodies are the one exception: they are
//! inserted pre-escaped after going through the allow-list cleaner.

pub mod forms;
pub mod posts;
mod style;

use inkpost_common::{config::SiteConfig, model::user::Username};
use maud::{DOCTYPE, Markup, html};

pub use style::stylesheet;

pub const STYLESHEET_PATH: &str = "/static/style.css";

/// What every page needs to know about where and for whom it is rendered.
#[derive(Copy, Clone, Debug)]
pub struct PageContext<'a> {
    pub config: &'a SiteConfig,
    pub viewer: Option<&'a Username>,
    /// Static exports leave out everything that needs the server.
    pub live: bool,
}

impl<'a> PageContext<'a> {
    #[must_use]
    pub fn live(config: &'a SiteConfig, viewer: Option<&'a Username>) -> Self {
        Self {
            config,
            viewer,
            live: true,
        }
    }

    #[must_use]
    pub fn export(config: &'a SiteConfig) -> Self {
        Self {
            config,
            viewer: None,
            live: false,
        }
    }
}

/// Wraps `content` in the document shell: head, navigation and footer.
#[must_use]
pub fn page(context: PageContext<'_>, page_name: &str, content: &Markup) -> Markup {
    let config = context.config;

    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="utf-8";
                meta name="viewport" content="width=device-width, initial-scale=1";
                title { (page_name) " | " (config.site_name) }
                link rel="stylesheet" href=(STYLESHEET_PATH);
            }
            body {
                header class="site-header" {
                    a class="site-name" href="/" { (config.site_name) }
                    nav {
                        a href="/posts/" { "Posts" }
                        @if context.live {
                            @match context.viewer {
                                Some(username) => {
                                    a href="/posts/create" { "Write" }
                                    span class="viewer" { (username.get()) }
                                    a href="/users/logout" { "Log out" }
                                }
                                None => {
                                    a href="/users/login" { "Log in" }
                                    a href="/users/register" { "Register" }
                                }
                            }
                        }
                    }
                }
                main { (content) }
                (footer(config))
            }
        }
    }
}

fn footer(config: &SiteConfig) -> Markup {
    html! {
        footer class="site-footer" {
            p class="footnote" { (config.footnote) }
            @if !config.link_badges.is_empty() {
                div class="badges" {
                    @for badge in config.link_badges() {
                        a href=(badge.link) title=(badge.name) {
                            img src=(badge.image) alt=(badge.name);
                        }
                    }
                }
            }
        }
    }
}
