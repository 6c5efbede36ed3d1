//! CLI commands

pub mod inspect_images;
pub mod mirror;
pub mod version;
