use crate::render::{PageContext, page};
use maud::{Markup, html};

fn credentials_form(action: &str, submit: &str) -> Markup {
    html! {
        form method="post" action=(action) {
            label {
                "Username"
                input type="text" name="username" required autocomplete="username";
            }
            label {
                "Password"
                input type="password" name="password" required autocomplete="current-password";
            }
            button type="submit" { (submit) }
        }
    }
}

#[must_use]
pub fn login_page(context: PageContext<'_>) -> Markup {
    let content = html! {
        h1 { "Log in" }
        (credentials_form("/users/login", "Log in"))
    };
    page(context, "Login", &content)
}

#[must_use]
pub fn register_page(context: PageContext<'_>) -> Markup {
    let content = html! {
        h1 { "Register a user" }
        (credentials_form("/users/register", "Register"))
    };
    page(context, "Register", &content)
}

#[must_use]
pub fn logout_page(context: PageContext<'_>) -> Markup {
    let content = html! {
        h1 { "Log out" }
        @if let Some(username) = context.viewer {
            p { "Logged in as " (username.get()) "." }
        }
        form method="post" action="/users/logout" {
            button type="submit" { "Log out" }
        }
    };
    page(context, "Logout", &content)
}

#[must_use]
pub fn create_post_page(context: PageContext<'_>) -> Markup {
    let content = html! {
        h1 { "Write a post" }
        form method="post" action="/posts/create" {
            label {
                "Title"
                input type="text" name="title" required;
            }
            label {
                "Description"
                input type="text" name="description";
            }
            label {
                "Content (Markdown)"
                textarea name="content" {}
            }
            button type="submit" { "Publish" }
        }
    };
    page(context, "Create post", &content)
}
