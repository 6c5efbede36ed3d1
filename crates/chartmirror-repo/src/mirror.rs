//! Mirror a chart repository into a local directory
//!
//! A run fetches the remote index, selects records, downloads their archives
//! and finally moves the (optionally rewritten) index next to them.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tempfile::TempPath;

use crate::config::{RepositoryConfig, validate_http_url};
use crate::credentials::{ScopedCredentials, SecureHttpClient};
use crate::error::{RepoError, Result};
use crate::index::{IndexEntry, RepositoryIndex};
use crate::selection::{EntryFilter, MirrorSelection};

const TEMP_INDEX_PREFIX: &str = "chartmirror-index-";

/// Per-run settings for mirroring
#[derive(Debug, Clone, Default)]
pub struct MirrorOptions {
    /// Log every download at info level
    pub verbose: bool,

    /// Warn and continue when an archive cannot be fetched or written
    pub ignore_errors: bool,

    /// Replace the origin URL with this root in the mirrored index
    pub new_root_url: Option<String>,

    /// Check archive SHA-256 against the index digest
    pub verify_digest: bool,
}

impl MirrorOptions {
    fn replacement_root(&self) -> Option<&str> {
        self.new_root_url
            .as_deref()
            .map(|root| root.trim_end_matches('/'))
            .filter(|root| !root.is_empty())
    }
}

/// Outcome of a mirror run
#[derive(Debug, Clone, Default)]
pub struct MirrorReport {
    /// Records in the remote index
    pub index_entries: usize,

    /// Records that passed the selection
    pub selected: usize,

    /// Archives written, in download order
    pub downloaded: Vec<PathBuf>,

    /// Fetch or write attempts skipped under ignore-errors
    pub failures: usize,

    /// Final location of the mirrored index
    pub index_path: PathBuf,
}

/// Index bytes kept on disk until relocation
struct FetchedIndex {
    index: RepositoryIndex,
    temp: TempPath,
}

/// One mirror run
pub struct MirrorService {
    config: RepositoryConfig,
    filter: EntryFilter,
    options: MirrorOptions,
    client: SecureHttpClient,
}

impl MirrorService {
    /// Validate everything that can be validated without I/O
    pub fn new(
        config: RepositoryConfig,
        selection: MirrorSelection,
        options: MirrorOptions,
    ) -> Result<Self> {
        let filter = EntryFilter::new(selection)?;

        if let Some(root) = options.replacement_root() {
            validate_http_url(root)?;
        }

        let mut scoped = ScopedCredentials::default();
        if let Some(credentials) = &config.credentials {
            scoped.add(&config.url, credentials.clone());
        }
        let client = SecureHttpClient::new(scoped, &config.tls)?;

        Ok(Self {
            config,
            filter,
            options,
            client,
        })
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    /// Run the mirror to completion
    pub async fn run(&self) -> Result<MirrorReport> {
        let destination = self.config.destination();
        tokio::fs::create_dir_all(destination)
            .await
            .map_err(|source| RepoError::Write {
                path: destination.to_path_buf(),
                source,
            })?;

        let fetched = self.fetch_index().await?;
        let entries = self.filter.filter(&fetched.index);

        let mut report = MirrorReport {
            index_entries: fetched.index.len(),
            selected: entries.len(),
            ..MirrorReport::default()
        };

        if entries.is_empty() {
            self.check_requested_version()?;
        }

        self.fetch_archives(&entries, &mut report).await?;
        report.index_path = self.prepare_index_file(fetched.temp)?;

        Ok(report)
    }

    /// Download the index, keep its raw bytes in a temporary file
    async fn fetch_index(&self) -> Result<FetchedIndex> {
        let index_url = self.config.index_url();
        tracing::debug!(url = %index_url, "fetching repository index");

        let bytes = self.client.get_bytes(&index_url).await.inspect_err(|e| {
            tracing::error!(url = %index_url, error = %e, "cannot fetch repository index");
        })?;

        let index = RepositoryIndex::from_bytes(&bytes)?;
        let temp = write_temp_index(&bytes)?;

        tracing::debug!(
            path = %temp.display(),
            charts = index.entries.len(),
            records = index.len(),
            "index stored"
        );

        Ok(FetchedIndex { index, temp })
    }

    fn check_requested_version(&self) -> Result<()> {
        let selection = self.filter.selection();
        let Some(version) = selection.requested_version() else {
            return Ok(());
        };

        if self.options.ignore_errors {
            tracing::warn!(
                chart = %selection.name_pattern,
                version,
                "requested version not found in index"
            );
            Ok(())
        } else {
            Err(RepoError::VersionNotFound {
                name: selection.name_pattern.clone(),
                version: version.to_string(),
            })
        }
    }

    async fn fetch_archives(&self, entries: &[&IndexEntry], report: &mut MirrorReport) -> Result<()> {
        for entry in entries {
            for url in &entry.urls {
                match self.fetch_archive(entry, url).await {
                    Ok(path) => report.downloaded.push(path),
                    Err(e) if self.options.ignore_errors => {
                        tracing::warn!(
                            chart = %entry.name,
                            version = %entry.version,
                            url = %url,
                            error = %e,
                            "skipping archive"
                        );
                        report.failures += 1;
                    }
                    Err(e) => {
                        tracing::error!(
                            chart = %entry.name,
                            version = %entry.version,
                            url = %url,
                            "cannot mirror archive"
                        );
                        return Err(e);
                    }
                }
            }
        }
        Ok(())
    }

    async fn fetch_archive(&self, entry: &IndexEntry, url: &str) -> Result<PathBuf> {
        let path = self.config.archive_path(&entry.name, &entry.version)?;
        let url = self.config.resolve_url(url)?;
        if self.options.verbose {
            tracing::info!(chart = %entry.name, version = %entry.version, url = %url, "downloading");
        } else {
            tracing::debug!(chart = %entry.name, version = %entry.version, url = %url, "downloading");
        }

        let data = self.client.get_bytes(&url).await?;

        if self.options.verify_digest
            && let Some(expected) = entry.digest.as_deref().filter(|d| !d.is_empty())
        {
            let actual = compute_digest(&data);
            if !digest_matches(expected, &actual) {
                return Err(RepoError::IntegrityCheckFailed {
                    name: format!("{}-{}", entry.name, entry.version),
                    expected: expected.to_string(),
                    actual,
                });
            }
        }

        tokio::fs::write(&path, &data)
            .await
            .map_err(|source| RepoError::Write {
                path: path.clone(),
                source,
            })?;

        Ok(path)
    }

    /// Rewrite the origin URL if asked, then move the index into place.
    /// Failures here are fatal whatever the tolerance policy.
    ///
    /// The origin is replaced exactly as the user typed it; the new root
    /// takes the same trailing slash so rewritten URLs stay well formed.
    fn prepare_index_file(&self, temp: TempPath) -> Result<PathBuf> {
        if let Some(root) = self.options.replacement_root() {
            let origin = self.config.origin.as_str();
            let root = if origin.ends_with('/') {
                format!("{}/", root)
            } else {
                root.to_string()
            };

            let content = fs::read_to_string(&temp).map_err(|source| RepoError::Write {
                path: temp.to_path_buf(),
                source,
            })?;
            let rewritten = content.replace(origin, &root);
            fs::write(&temp, rewritten).map_err(|source| RepoError::Write {
                path: temp.to_path_buf(),
                source,
            })?;
            tracing::debug!(from = origin, to = %root, "index URLs rewritten");
        }

        let index_path = self.config.index_path();
        relocate_file(&temp, &index_path).map_err(|source| {
            tracing::error!(path = %index_path.display(), "cannot relocate index");
            RepoError::Relocate {
                from: temp.to_path_buf(),
                to: index_path.clone(),
                source,
            }
        })?;

        Ok(index_path)
    }
}

fn write_temp_index(bytes: &[u8]) -> Result<TempPath> {
    let mut file = tempfile::Builder::new()
        .prefix(TEMP_INDEX_PREFIX)
        .suffix(".yaml")
        .tempfile()?;
    let path = file.path().to_path_buf();
    let write_err = |source| RepoError::Write {
        path: path.clone(),
        source,
    };

    file.write_all(bytes).map_err(write_err)?;
    file.flush().map_err(write_err)?;

    // permissions travel with the file on relocation
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).map_err(write_err)?;
    }

    Ok(file.into_temp_path())
}

/// Move `src` to `dst` by copying, so it works across filesystems.
///
/// The destination gets the source's permissions. Moving a file onto itself
/// is a no-op.
pub fn relocate_file(src: &Path, dst: &Path) -> io::Result<()> {
    if src == dst {
        return Ok(());
    }
    if let (Ok(a), Ok(b)) = (src.canonicalize(), dst.canonicalize())
        && a == b
    {
        return Ok(());
    }

    let mut input = File::open(src)?;
    let mut output = File::create(dst)?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()?;

    let permissions = input.metadata()?.permissions();
    drop(input);
    fs::remove_file(src)?;
    fs::set_permissions(dst, permissions)?;

    Ok(())
}

/// Hex SHA-256 of `data`
pub fn compute_digest(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

/// Compare digests, tolerating case and a `sha256:` prefix
pub fn digest_matches(expected: &str, actual: &str) -> bool {
    let normalize = |d: &str| {
        let d = d.trim().to_lowercase();
        d.strip_prefix("sha256:").map(str::to_string).unwrap_or(d)
    };
    normalize(expected) == normalize(actual)
}
