pub mod config;
pub mod markdown;
pub mod model;
pub mod sanitize;
pub mod util;
