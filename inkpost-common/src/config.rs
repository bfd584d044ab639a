//! Site configuration, loaded once from a TOML file and shared read-only.

use crate::{
    model::role::{Permission, Role},
    sanitize,
};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::info;

pub const DEFAULT_GUEST_ROLE: &str = "guest";
pub const DEFAULT_USER_ROLE: &str = "user";
pub const DEFAULT_ADMIN_ROLE: &str = "admin";
pub const DEFAULT_HOMEPAGE_POST_COUNT: u32 = 3;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Error reading config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Error parsing config file: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct SiteConfig {
    pub site_name: String,
    pub footnote: String,
    pub site_colors: SiteColors,
    pub roles: BTreeMap<String, Role>,
    pub allowed_clean: AllowedClean,
    #[serde(default)]
    pub link_badges: BTreeMap<String, LinkBadge>,
    #[serde(default = "default_guest_role")]
    pub guest_role: String,
    #[serde(default = "default_user_role")]
    pub default_role: String,
    #[serde(default = "default_admin_role")]
    pub admin_role: String,
    #[serde(default = "default_homepage_post_count")]
    pub homepage_post_count: u32,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct SiteColors {
    pub background: String,
    pub background_accent: String,
    pub text: String,
    pub text_light: String,
    pub accent: String,
    pub accent_hover: String,
    pub accent_text: String,
    pub code: String,
    pub preformatted: String,
    pub disabled: String,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct AllowedClean {
    pub html_tags: BTreeSet<String>,
    /// Attributes allowed per tag; the `*` key applies to every tag.
    #[serde(default)]
    pub html_attributes: BTreeMap<String, BTreeSet<String>>,
    pub letters: String,
    pub characters: String,
    pub allowed_file_extensions: BTreeSet<String>,
}

#[derive(Clone, Eq, PartialEq, Debug, Deserialize)]
pub struct LinkBadge {
    pub name: String,
    pub link: String,
    pub image: String,
}

fn default_guest_role() -> String {
    DEFAULT_GUEST_ROLE.to_owned()
}

fn default_user_role() -> String {
    DEFAULT_USER_ROLE.to_owned()
}

fn default_admin_role() -> String {
    DEFAULT_ADMIN_ROLE.to_owned()
}

fn default_homepage_post_count() -> u32 {
    DEFAULT_HOMEPAGE_POST_COUNT
}

impl SiteConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;

        let config = Self::from_toml_str(&contents)?;
        info!(
            path = %path.display(),
            site_name = %config.site_name,
            roles = config.roles.len(),
            "site configuration loaded"
        );

        Ok(config)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(ConfigError::from)
    }

    /// Looks up a role by name. Unknown roles have no permissions.
    #[must_use]
    pub fn role(&self, name: &str) -> Role {
        self.roles.get(name).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn guest(&self) -> Role {
        self.role(&self.guest_role)
    }

    #[must_use]
    pub fn role_allows(&self, name: &str, permission: Permission) -> bool {
        self.roles
            .get(name)
            .is_some_and(|role| role.allows(permission))
    }

    /// Characters kept in free-text fields: the letters followed by the extra characters.
    #[must_use]
    pub fn free_text_characters(&self) -> String {
        let allowed = &self.allowed_clean;
        format!("{}{}", allowed.letters, allowed.characters)
    }

    #[must_use]
    pub fn slugify(&self, title: &str) -> String {
        sanitize::slugify(title, &self.allowed_clean.letters)
    }

    #[must_use]
    pub fn scrub(&self, text: &str) -> String {
        sanitize::scrub(text, &self.free_text_characters())
    }

    pub fn link_badges(&self) -> impl Iterator<Item = &LinkBadge> {
        self.link_badges.values()
    }

    #[must_use]
    pub fn allows_file_extension(&self, extension: &str) -> bool {
        self.allowed_clean
            .allowed_file_extensions
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(extension))
    }
}
