//! Version command

/// Commit hash, compiled in by release builds
const GIT_COMMIT: Option<&str> = option_env!("CHARTMIRROR_GIT_COMMIT");

/// `<version>` or `<version>~git<commit>`
pub fn version_string(version: &str, commit: Option<&str>) -> String {
    match commit.filter(|c| !c.is_empty()) {
        Some(commit) => format!("{}~git{}", version, commit),
        None => version.to_string(),
    }
}

pub fn run() {
    println!("{}", version_string(env!("CARGO_PKG_VERSION"), GIT_COMMIT));
}
