//! Outcome of an export run.

use crate::status::{Status, StatusSet};
use crate::types::{ProjectDescriptor, Visibility};

use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;

/// Outcome of one project.
#[derive(Debug, Clone, Serialize)]
pub struct ProjectReport {
    /// Task identity, `<source>-><destination>`.
    pub id: String,
    pub source: String,
    pub destination: String,
    pub visibility: Visibility,
    /// Whether the project's batch was started.
    pub ran: bool,
    pub status: StatusSet,
    /// Captured failures, rendered.
    pub failures: Vec<String>,
}

impl ProjectReport {
    pub fn new(project: &ProjectDescriptor, ran: bool, status: StatusSet) -> Self {
        Self {
            id: project.id(),
            source: project.source.clone(),
            destination: project.destination.clone(),
            visibility: project.visibility,
            ran,
            status,
            failures: Vec::new(),
        }
    }

    pub fn with_failures(mut self, failures: Vec<String>) -> Self {
        self.failures = failures;
        self
    }

    /// Short human-readable outcome derived from the status markers.
    pub fn outcome(&self) -> String {
        let status = &self.status;
        let base = if status.contains(Status::DryRun) {
            "DRY RUN"
        } else if !self.ran {
            "NOT STARTED"
        } else if status.contains(Status::NoSourceProject) {
            "NO SOURCE PROJECT"
        } else if status.contains(Status::MultipleSourceProjects) {
            "MULTIPLE SOURCE PROJECTS"
        } else if status.contains(Status::Error) {
            "ERROR"
        } else if status.contains(Status::Interrupted) {
            "INTERRUPTED"
        } else if status.contains(Status::Skipped) {
            "SKIPPED"
        } else if status.contains(Status::Success) && status.contains(Status::Overwritten) {
            "OVERWRITTEN"
        } else if status.contains(Status::Success) {
            "SUCCESS"
        } else {
            "INCOMPLETE"
        };

        if status.contains(Status::RollbackedError) {
            format!("{base} (ROLLBACK ERROR)")
        } else if status.contains(Status::Rollbacked) {
            format!("{base} (ROLLBACKED)")
        } else {
            base.to_string()
        }
    }

    /// Whether the project reached its intended end state.
    pub fn is_success(&self) -> bool {
        let status = &self.status;
        (status.contains(Status::Success) || status.contains(Status::Skipped))
            && !status.contains(Status::Rollbacked)
            && !status.contains(Status::RollbackedError)
    }
}

/// Report of a whole export run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportReport {
    /// Every project of the run, in input order.
    pub projects: Vec<ProjectReport>,

    /// The run was cancelled from outside.
    pub interrupted: bool,

    /// Identity of the task whose failure aborted the run.
    pub aborted_by: Option<String>,

    /// Rollback failures, rendered.
    pub rollback_failures: Vec<String>,

    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ExportReport {
    pub fn new() -> Self {
        Self {
            started_at: Some(Utc::now()),
            ..Default::default()
        }
    }

    pub fn complete(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// False if a failure escaped a task or a rollback failed.
    ///
    /// Failures isolated inside a single project do not count.
    pub fn is_successful(&self) -> bool {
        self.aborted_by.is_none() && self.rollback_failures.is_empty()
    }

    pub fn project(&self, id: &str) -> Option<&ProjectReport> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.completed_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    pub fn print_summary(&self) {
        println!("\n=== Export Summary ===\n");

        let width = self
            .projects
            .iter()
            .map(|p| p.id.len())
            .max()
            .unwrap_or(0);
        for project in &self.projects {
            let outcome = project.outcome();
            let outcome = if project.is_success() || project.status.contains(Status::DryRun) {
                style(outcome).green()
            } else if project.ran {
                style(outcome).red().bold()
            } else {
                style(outcome).dim()
            };
            println!("  {:<width$}  {outcome}", project.id);
            for failure in &project.failures {
                println!("  {:<width$}    {}", "", style(failure).red());
            }
        }

        let succeeded = self.projects.iter().filter(|p| p.is_success()).count();
        println!("\n{succeeded}/{} projects exported", self.projects.len());

        if self.interrupted {
            println!("{}", style("Run was interrupted").yellow().bold());
        }
        if let Some(task) = &self.aborted_by {
            println!("{}", style(format!("Run aborted by '{task}'")).red().bold());
        }
        if !self.rollback_failures.is_empty() {
            println!("\nRollback errors ({}):", self.rollback_failures.len());
            for failure in &self.rollback_failures {
                println!("  {}", style(failure).red());
            }
        }

        if let Some(duration) = self.duration() {
            println!("\nCompleted in {} seconds", duration.num_seconds());
        }
    }
}
