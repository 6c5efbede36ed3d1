//! Mirror command - copy a chart repository into a local folder

use console::style;

use chartmirror_repo::{
    Credentials, MirrorOptions, MirrorSelection, MirrorService, RepositoryConfig, TlsFiles,
};

use crate::error::{CliError, Result};
use crate::{GlobalArgs, MirrorArgs};

/// Build the run context from the command line
fn prepare(args: MirrorArgs, global: GlobalArgs) -> Result<MirrorService> {
    let (Some(repo_url), Some(destination)) = (args.repo_url, args.destination) else {
        return Err(CliError::usage(
            "requires a repository URL and a destination folder",
            "chartmirror <REPO_URL> <DESTINATION>",
        ));
    };

    let mut config = RepositoryConfig::new(repo_url, destination)?.with_tls(TlsFiles {
        ca_file: args.ca_file,
        cert_file: args.cert_file,
        key_file: args.key_file,
    });

    if args.username.is_some() || args.password.is_some() {
        config = config.with_credentials(Credentials::basic(
            args.username.unwrap_or_default(),
            args.password.unwrap_or_default(),
        ));
    }

    let mut selection =
        MirrorSelection::new(args.chart_name.unwrap_or_default()).all_versions(global.all_versions);
    if let Some(version) = args.chart_version {
        selection = selection.with_version(version);
    }

    let options = MirrorOptions {
        verbose: global.verbose,
        ignore_errors: global.ignore_errors,
        new_root_url: args.new_root_url,
        verify_digest: args.verify_digest,
    };

    Ok(MirrorService::new(config, selection, options)?)
}

pub async fn run(args: MirrorArgs, global: GlobalArgs) -> Result<()> {
    let service = prepare(args, global)?;

    println!(
        "{} {}",
        style("Mirroring").cyan().bold(),
        service.config().url
    );

    let report = service.run().await?;

    println!(
        "  {} {} of {} index records",
        style("Selected").dim(),
        report.selected,
        report.index_entries
    );
    for path in &report.downloaded {
        println!("  {} {}", style("✓").green().bold(), path.display());
    }
    if report.failures > 0 {
        println!(
            "  {} {} archive(s) skipped",
            style("○").yellow(),
            report.failures
        );
    }
    println!(
        "  {} {}",
        style("Index").green().bold(),
        report.index_path.display()
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;

    fn global() -> GlobalArgs {
        GlobalArgs {
            verbose: false,
            ignore_errors: false,
            all_versions: false,
        }
    }

    fn args(url: &str, dest: &str) -> MirrorArgs {
        MirrorArgs {
            repo_url: Some(url.to_string()),
            destination: Some(dest.into()),
            ..MirrorArgs::default()
        }
    }

    fn exit_code(args: MirrorArgs) -> u8 {
        match prepare(args, global()) {
            Ok(_) => exit_codes::SUCCESS,
            Err(e) => e.exit_code(),
        }
    }

    #[test]
    fn test_missing_positionals() {
        assert_eq!(exit_code(MirrorArgs::default()), exit_codes::USAGE_ERROR);
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(exit_code(args("ftp://x", "/tmp/m")), exit_codes::VALIDATION_ERROR);
        assert_eq!(
            exit_code(args("https://x", "relative")),
            exit_codes::VALIDATION_ERROR
        );

        let mut version_only = args("https://x", "/tmp/m");
        version_only.chart_version = Some("1.0.0".to_string());
        assert_eq!(exit_code(version_only), exit_codes::VALIDATION_ERROR);

        let mut bad_root = args("https://x", "/tmp/m");
        bad_root.new_root_url = Some("mirror.local".to_string());
        assert_eq!(exit_code(bad_root), exit_codes::VALIDATION_ERROR);

        let mut bad_pattern = args("https://x", "/tmp/m");
        bad_pattern.chart_name = Some("^(?:(?:aa)|.$".to_string());
        assert_eq!(exit_code(bad_pattern), exit_codes::VALIDATION_ERROR);
    }

    #[test]
    fn test_tls_errors_are_network_class() {
        let mut tls = args("https://x", "/tmp/m");
        tls.ca_file = Some("/no/such/ca.pem".into());
        assert_eq!(exit_code(tls), exit_codes::NETWORK_ERROR);
    }

    #[test]
    fn test_valid_arguments() {
        let mut full = args("https://charts.example.com/", "/tmp/m");
        full.chart_name = Some("nginx".to_string());
        full.chart_version = Some("1.0.0".to_string());
        full.username = Some("u".to_string());
        full.new_root_url = Some("https://mirror.local/charts".to_string());

        let service = prepare(full, global()).unwrap();
        assert_eq!(service.config().url, "https://charts.example.com");
        assert!(service.config().credentials.is_some());
    }
}
