//! Project list parsing.
//!
//! One project per line, fields separated by single spaces:
//!
//! ```text
//! tool
//! tool public
//! tool -> tool-mirror
//! tool -> tool-mirror private
//! ```
//!
//! Lines without a visibility use the default passed to [`parse_projects`].

use crate::error::ConfigError;
use crate::types::{ProjectDescriptor, Visibility};

use std::collections::HashSet;
use std::path::Path;

const RENAME_SEPARATOR: &str = "->";

/// Read and parse a project list file.
pub fn load_projects(
    path: &Path,
    default_visibility: Visibility,
) -> Result<Vec<ProjectDescriptor>, ConfigError> {
    let text = std::fs::read_to_string(path)?;
    parse_projects(&text, default_visibility)
}

/// Parse a project list.
///
/// Destination names must be unique across the list.
pub fn parse_projects(
    text: &str,
    default_visibility: Visibility,
) -> Result<Vec<ProjectDescriptor>, ConfigError> {
    let lines: Vec<&str> = text.lines().map(str::trim).collect();
    if lines.is_empty() {
        return Err(ConfigError::ProjectList("File is empty.".into()));
    }

    let projects = lines
        .into_iter()
        .map(|line| parse_line(line, default_visibility))
        .collect::<Result<Vec<_>, _>>()?;

    let mut seen = HashSet::new();
    if !projects.iter().all(|p| seen.insert(p.destination.as_str())) {
        return Err(ConfigError::ProjectList(
            "GitHub names must be unique.".into(),
        ));
    }
    Ok(projects)
}

fn parse_line(line: &str, default_visibility: Visibility) -> Result<ProjectDescriptor, ConfigError> {
    let fields: Vec<&str> = line.split(' ').collect();
    let invalid = |message: String| ConfigError::ProjectList(message);

    let (source, destination, visibility) = match fields.as_slice() {
        [""] => return Err(invalid("Empty line is not allowed.".into())),
        [name] => (*name, *name, None),
        [name, visibility] => (*name, *name, Some(*visibility)),
        [source, separator, destination] => (
            *source,
            renamed(source, separator, destination, line)?,
            None,
        ),
        [source, separator, destination, visibility] => (
            *source,
            renamed(source, separator, destination, line)?,
            Some(*visibility),
        ),
        _ => {
            return Err(invalid(format!(
                "Invalid number of entries on line '{line}'"
            )))
        }
    };

    if source.is_empty() {
        return Err(invalid(format!("Empty project name on line '{line}'")));
    }
    let visibility = match visibility {
        Some(specifier) => specifier.parse::<Visibility>().map_err(invalid)?,
        None => default_visibility,
    };
    Ok(ProjectDescriptor::new(source, destination, visibility))
}

fn renamed<'a>(
    source: &str,
    separator: &str,
    destination: &'a str,
    line: &str,
) -> Result<&'a str, ConfigError> {
    if separator != RENAME_SEPARATOR {
        return Err(ConfigError::ProjectList(format!(
            "Invalid separator '{separator}'"
        )));
    }
    if source.is_empty() || destination.is_empty() {
        return Err(ConfigError::ProjectList(format!(
            "Empty project name on line '{line}'"
        )));
    }
    Ok(destination)
}
