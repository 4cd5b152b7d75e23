//! Exporter CLI - export projects from GitLab to GitHub.

use clap::Parser;
use exporter_core::{ConflictPolicy, Visibility};
use std::path::PathBuf;

mod commands;
mod logging;

/// Tool for exporting projects from FIT CTU GitLab to GitHub
#[derive(Parser, Debug)]
#[command(name = "exporter")]
#[command(author, version, long_about = None)]
struct Cli {
    /// Exporter configuration file
    #[arg(short, long, value_name = "FILE")]
    config: PathBuf,

    /// File with the projects to export, one per line
    #[arg(short, long, value_name = "FILE")]
    projects: PathBuf,

    /// Visibility of projects that don't specify one
    #[arg(long, value_enum, default_value_t = Visibility::Private)]
    visibility: Visibility,

    /// What to do when the GitHub repository already exists
    #[arg(long, value_enum, default_value_t = ConflictPolicy::Skip)]
    conflict_policy: ConflictPolicy,

    /// Temporary directory for clones; must not exist
    #[arg(long, value_name = "DIR", default_value = "tmp")]
    tmp_dir: PathBuf,

    /// Seconds to wait for running exports to stop before rolling back
    #[arg(long, value_name = "SECS", default_value_t = 10)]
    task_timeout: u64,

    /// Number of projects exported concurrently
    #[arg(long, value_name = "N", default_value_t = 5, value_parser = clap::value_parser!(u32).range(1..))]
    parallel: u32,

    /// Directory for log files
    #[arg(long, value_name = "DIR", default_value = "logs")]
    log_dir: PathBuf,

    /// Verbose logging; the first failing project aborts the run
    #[arg(long)]
    debug: bool,

    /// Show what would be exported without doing it
    #[arg(long)]
    dry_run: bool,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn export_args(&self) -> commands::ExportArgs {
        commands::ExportArgs {
            config: self.config.clone(),
            projects: self.projects.clone(),
            visibility: self.visibility,
            conflict_policy: self.conflict_policy,
            tmp_dir: self.tmp_dir.clone(),
            task_timeout: self.task_timeout,
            parallel: self.parallel as usize,
            debug: self.debug,
            dry_run: self.dry_run,
            json: self.json,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init_logging(&cli.log_dir, cli.debug) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }

    let code = match commands::export(&cli.export_args()).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{e:#}");
            eprintln!("Error: {e:#}");
            1
        }
    };
    std::process::exit(code);
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
    fn test_defaults() {
        let cli = Cli::try_parse_from(["exporter", "-c", "config.ini", "-p", "projects.txt"]).unwrap();

        assert_eq!(cli.config, PathBuf::from("config.ini"));
        assert_eq!(cli.visibility, Visibility::Private);
        assert_eq!(cli.conflict_policy, ConflictPolicy::Skip);
        assert_eq!(cli.tmp_dir, PathBuf::from("tmp"));
        assert_eq!(cli.task_timeout, 10);
        assert_eq!(cli.parallel, 5);
        assert!(!cli.debug && !cli.dry_run && !cli.json);
    }

    #[test]
    fn test_all_options() {
        let cli = Cli::try_parse_from([
            "exporter",
            "--config",
            "c.ini",
            "--projects",
            "p.txt",
            "--visibility",
            "public",
            "--conflict-policy",
            "porcelain",
            "--parallel",
            "2",
            "--debug",
            "--dry-run",
        ])
        .unwrap();

        assert_eq!(cli.visibility, Visibility::Public);
        assert_eq!(cli.conflict_policy, ConflictPolicy::Porcelain);
        assert_eq!(cli.export_args().parallel, 2);
        assert!(cli.debug && cli.dry_run);
    }

    #[test]
    fn test_rejects_invalid_values() {
        assert!(Cli::try_parse_from(["exporter", "-p", "p.txt"]).is_err());
        assert!(
            Cli::try_parse_from(["exporter", "-c", "c", "-p", "p", "--parallel", "0"]).is_err()
        );
        assert!(
            Cli::try_parse_from(["exporter", "-c", "c", "-p", "p", "--visibility", "internal"])
                .is_err()
        );
    }

    #[test]
    fn test_about_text() {
        let about = Cli::command().get_about().map(|a| a.to_string());
        assert_eq!(
            about.as_deref(),
            Some("Tool for exporting projects from FIT CTU GitLab to GitHub")
        );
    }
}
