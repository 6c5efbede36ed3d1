//! Chart repository mirroring
//!
//! This crate copies a Helm-compatible chart repository into a local
//! directory:
//!
//! - **Index**: fetch and parse `index.yaml`
//! - **Selection**: regex on chart names, exact version, latest or all versions
//! - **Archives**: download every selected record's URLs to `<name>-<version>.tgz`
//! - **Relocation**: optionally point the index at a new root URL, then move it
//!   into the destination
//!
//! ## Example
//!
//! ```rust,no_run
//! use chartmirror_repo::{MirrorOptions, MirrorSelection, MirrorService, RepositoryConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = RepositoryConfig::new("https://charts.example.com/stable", "/srv/mirror")?;
//! let selection = MirrorSelection::new("^nginx$").all_versions(true);
//! let options = MirrorOptions {
//!     new_root_url: Some("https://mirror.internal/stable".to_string()),
//!     ..MirrorOptions::default()
//! };
//!
//! let report = MirrorService::new(config, selection, options)?.run().await?;
//! println!("{} archives", report.downloaded.len());
//! # Ok(())
//! # }
//! ```
//!
//! ## Security Notes
//!
//! - Credentials are only sent to the origin and NEVER after cross-origin redirects

pub mod config;
pub mod credentials;
pub mod error;
pub mod index;
pub mod mirror;
pub mod selection;

// Re-exports for convenience
pub use config::{INDEX_FILE, RepositoryConfig, TlsFiles, validate_http_url};
pub use credentials::{Credentials, ScopedCredentials, SecureHttpClient};
pub use error::{ErrorCategory, RepoError, Result};
pub use index::{IndexEntry, RepositoryIndex};
pub use mirror::{MirrorOptions, MirrorReport, MirrorService, relocate_file};
pub use selection::{EntryFilter, MirrorSelection, VersionRanking};
