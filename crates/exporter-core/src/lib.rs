//! # Exporter Core
//!
//! This crate provides the task engine for exporting projects from GitLab to
//! GitHub.
//!
//! ## Features
//!
//! - **Batched export**: projects run concurrently in fixed-size batches
//! - **Conflict policies**: skip or overwrite repositories that already exist
//! - **Cooperative cancellation**: running exports stop at their next checkpoint
//! - **Rollback**: repositories created by an interrupted or aborted run are deleted
//! - **Progress tracking**: one progress bar per project
//!
//! ## Example
//!
//! ```rust,ignore
//! use exporter_core::{ExportOptions, Exporter, GitCli, GitHubClient, GitLabClient};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let projects = exporter_core::parse_projects("tool -> tool-mirror public", Default::default())?;
//!
//!     let exporter = Exporter::new(
//!         Arc::new(GitLabClient::new("https://gitlab.com", "glpat-xxx")?),
//!         Arc::new(GitHubClient::github_com("ghp_xxx")?),
//!         Arc::new(GitCli::new()),
//!     );
//!     let report = exporter.run(&projects, &ExportOptions::default()).await?;
//!
//!     report.print_summary();
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod export;
pub mod fetch;
pub mod git;
pub mod github;
pub mod gitlab;
pub mod orchestrator;
pub mod progress;
pub mod projects;
pub mod push;
pub mod remote;
pub mod report;
pub mod status;
pub mod task;
pub mod types;

// Re-export main types
pub use crate::config::ExporterConfig;
pub use error::{ConfigError, ExportError, RemoteError, Result};
pub use export::{ExportContext, ExportTask};
pub use git::GitCli;
pub use github::GitHubClient;
pub use gitlab::GitLabClient;
pub use orchestrator::{ExportOptions, Exporter};
pub use projects::{load_projects, parse_projects};
pub use remote::{DestinationHost, SourceHost, VersionControl};
pub use report::{ExportReport, ProjectReport};
pub use status::{Status, StatusSet};
pub use task::{FailureMode, Task};
pub use types::*;

/// Version of the exporter.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
