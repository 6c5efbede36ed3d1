//! chartmirror CLI - mirror Helm chart repositories and inspect chart images

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod error;
mod exit_codes;
mod output;

use error::CliError;

const ROOT_LONG_ABOUT: &str = "\
Mirror Helm charts from a repository index into a local folder.

    chartmirror https://charts.example.com/stable /srv/charts

downloads https://charts.example.com/stable/index.yaml, every chart archive
it lists (latest version of each chart unless --all-versions is given) and
stores the archives together with index.yaml in /srv/charts.";

#[derive(Parser)]
#[command(name = "chartmirror")]
#[command(version)]
#[command(about = "Mirror Helm chart repositories and list the images their charts use")]
#[command(long_about = ROOT_LONG_ABOUT)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    mirror: MirrorArgs,

    #[command(flatten)]
    global: GlobalArgs,
}

/// Flags shared by every command
#[derive(Args, Debug, Clone, Copy)]
pub struct GlobalArgs {
    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Ignore errors while downloading or processing charts
    #[arg(short, long, global = true)]
    pub ignore_errors: bool,

    /// Mirror every version of each chart, not only the latest
    #[arg(short, long, global = true)]
    pub all_versions: bool,
}

/// Arguments of the default mirror command
#[derive(Args, Debug, Clone, Default)]
pub struct MirrorArgs {
    /// Chart repository URL
    #[arg(value_name = "REPO_URL")]
    pub repo_url: Option<String>,

    /// Destination folder, as a full path
    #[arg(value_name = "DESTINATION")]
    pub destination: Option<PathBuf>,

    /// Regular expression matched against chart names
    #[arg(long)]
    pub chart_name: Option<String>,

    /// Exact chart version to mirror (requires --chart-name)
    #[arg(long)]
    pub chart_version: Option<String>,

    /// Chart repository username
    #[arg(long, env = "CHARTMIRROR_USERNAME")]
    pub username: Option<String>,

    /// Chart repository password
    #[arg(long, env = "CHARTMIRROR_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Verify certificates of HTTPS-enabled servers using this CA bundle
    #[arg(long)]
    pub ca_file: Option<PathBuf>,

    /// Identify the HTTPS client using this certificate file
    #[arg(long)]
    pub cert_file: Option<PathBuf>,

    /// Identify the HTTPS client using this key file
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// New root URL written into the mirrored index (eg: https://mirror.local.lan/charts)
    #[arg(long)]
    pub new_root_url: Option<String>,

    /// Check each archive against the digest recorded in the index
    #[arg(long)]
    pub verify_digest: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract all the container images listed in each chart
    #[command(long_about = commands::inspect_images::LONG_ABOUT)]
    InspectImages {
        /// Chart folder, chart archive or folder of archives, as a full path
        target: PathBuf,

        /// Output KIND[=FILE]: file, json, yaml, skopeo or stdout
        #[arg(short, long, default_value = "stdout")]
        output: String,
    },

    /// Show the chartmirror version
    Version,
}

/// Install the global subscriber; RUST_LOG wins over --verbose
fn init_tracing(verbose: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    miette::set_panic_hook();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            return ExitCode::from(exit_codes::USAGE_ERROR);
        }
        Err(e) => {
            // --help and --version
            let _ = e.print();
            return ExitCode::from(exit_codes::SUCCESS);
        }
    };

    init_tracing(cli.global.verbose);

    let result = match cli.command {
        Some(Commands::InspectImages { target, output }) => {
            commands::inspect_images::run(&target, &output, cli.global)
        }
        Some(Commands::Version) => {
            commands::version::run();
            Ok(())
        }
        None => commands::mirror::run(cli.mirror, cli.global).await,
    };

    match result {
        Ok(()) => ExitCode::from(exit_codes::SUCCESS),
        Err(e) => {
            let code = e.exit_code();
            eprintln!("{:?}", miette::Report::new(e));
            ExitCode::from(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_mirror_flags() {
        let cli = Cli::try_parse_from([
            "chartmirror",
            "https://charts.example.com",
            "/srv/charts",
            "-v",
            "-a",
            "--chart-name",
            "nginx",
            "--new-root-url",
            "https://mirror.local/charts",
        ])
        .unwrap();

        assert!(cli.command.is_none());
        assert!(cli.global.verbose);
        assert!(cli.global.all_versions);
        assert!(!cli.global.ignore_errors);
        assert_eq!(cli.mirror.repo_url.as_deref(), Some("https://charts.example.com"));
        assert_eq!(cli.mirror.chart_name.as_deref(), Some("nginx"));
    }

    #[test]
    fn test_parse_inspect_images() {
        let cli = Cli::try_parse_from(["chartmirror", "inspect-images", "/tmp/charts", "-i", "-o", "json=x.json"])
            .unwrap();

        assert!(cli.global.ignore_errors);
        match cli.command {
            Some(Commands::InspectImages { target, output }) => {
                assert_eq!(target, PathBuf::from("/tmp/charts"));
                assert_eq!(output, "json=x.json");
            }
            _ => panic!("expected inspect-images"),
        }
    }

    #[test]
    fn test_unknown_flag_is_usage_error() {
        let err = Cli::try_parse_from(["chartmirror", "--bogus"]).err().unwrap();
        assert!(err.use_stderr());
    }

    #[test]
    fn test_error_maps_to_exit_code() {
        let err = CliError::usage("missing", "help");
        assert_eq!(err.exit_code(), exit_codes::USAGE_ERROR);
    }
}
