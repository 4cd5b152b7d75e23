//! Command implementations.

use anyhow::{anyhow, Context, Result};
use exporter_core::{
    load_projects, ConflictPolicy, ExportOptions, Exporter, ExporterConfig, FailureMode, GitCli,
    GitHubClient, GitLabClient, Visibility,
};
use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Arguments of an export run.
#[derive(Debug, Clone)]
pub struct ExportArgs {
    pub config: PathBuf,
    pub projects: PathBuf,
    pub visibility: Visibility,
    pub conflict_policy: ConflictPolicy,
    pub tmp_dir: PathBuf,
    pub task_timeout: u64,
    pub parallel: usize,
    pub debug: bool,
    pub dry_run: bool,
    pub json: bool,
}

impl ExportArgs {
    fn options(&self) -> ExportOptions {
        ExportOptions::default()
            .with_conflict_policy(self.conflict_policy)
            .with_tmp_dir(&self.tmp_dir)
            .with_batch_size(self.parallel)
            .with_stop_timeout(Duration::from_secs(self.task_timeout))
            .with_dry_run(self.dry_run)
            .with_failure_mode(if self.debug {
                FailureMode::Abort
            } else {
                FailureMode::Isolate
            })
            .with_progress(!self.dry_run && !self.json && std::io::stderr().is_terminal())
    }
}

/// Export every listed project and return the process exit code.
pub async fn export(args: &ExportArgs) -> Result<i32> {
    let config = ExporterConfig::load(&args.config)
        .map_err(|e| anyhow!("Invalid value for '-c' / '--config': {e}"))?;
    let projects = load_projects(&args.projects, args.visibility)
        .map_err(|e| anyhow!("Invalid value for '-p' / '--projects': {e}"))?;
    info!(
        projects = projects.len(),
        gitlab = %config.gitlab.url,
        conflict_policy = %args.conflict_policy,
        "Configuration loaded"
    );

    let gitlab = GitLabClient::new(&config.gitlab.url, &config.gitlab.token)
        .context("Failed to create GitLab client")?;
    let github = GitHubClient::new(
        &config.github.api_url,
        &config.github.web_url,
        &config.github.token,
    )
    .context("Failed to create GitHub client")?;
    let exporter = Exporter::new(Arc::new(gitlab), Arc::new(github), Arc::new(GitCli::new()));

    let cancel = exporter.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("===STOPPING===");
            warn!("Interrupt received, stopping export");
            cancel.cancel();
        }
    });

    let report = exporter
        .run(&projects, &args.options())
        .await
        .context("Export failed")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print_summary();
    }

    Ok(if report.is_successful() { 0 } else { 1 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn file_with(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn args(config: &NamedTempFile, projects: &NamedTempFile, tmp: &TempDir) -> ExportArgs {
        ExportArgs {
            config: config.path().to_path_buf(),
            projects: projects.path().to_path_buf(),
            visibility: Visibility::Private,
            conflict_policy: ConflictPolicy::Skip,
            tmp_dir: tmp.path().join("tmp"),
            task_timeout: 1,
            parallel: 2,
            debug: false,
            dry_run: true,
            json: true,
        }
    }

    #[test]
    fn test_debug_selects_abort_mode() {
        let config = file_with("");
        let projects = file_with("");
        let tmp = TempDir::new().unwrap();
        let mut args = args(&config, &projects, &tmp);

        assert_eq!(args.options().failure_mode, FailureMode::Isolate);
        args.debug = true;
        assert_eq!(args.options().failure_mode, FailureMode::Abort);
        assert_eq!(args.options().batch_size, 2);
        assert!(!args.options().show_progress);
    }

    #[tokio::test]
    async fn test_project_list_errors_name_the_option() {
        let config = file_with("[gitlab]\ntoken = gl\n[github]\ntoken = gh\n");
        let projects = file_with("a\na\n");
        let tmp = TempDir::new().unwrap();

        let err = export(&args(&config, &projects, &tmp)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for '-p' / '--projects': GitHub names must be unique."
        );
    }

    #[tokio::test]
    async fn test_config_errors_name_the_option() {
        let config = file_with("[gitlab]\ntoken = gl\n");
        let projects = file_with("a\n");
        let tmp = TempDir::new().unwrap();

        let err = export(&args(&config, &projects, &tmp)).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid value for '-c' / '--config': No section: 'github'"
        );
    }

    #[tokio::test]
    async fn test_dry_run_succeeds_without_network() {
        let config = file_with("[gitlab]\ntoken = gl\n[github]\ntoken = gh\n");
        let projects = file_with("a\nb -> c public\n");
        let tmp = TempDir::new().unwrap();

        let code = export(&args(&config, &projects, &tmp)).await.unwrap();
        assert_eq!(code, 0);
        assert!(!tmp.path().join("tmp").exists());
    }
}
