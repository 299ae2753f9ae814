// SPDX-FileCopyrightText: 2026 Portal Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration diagnostics.
//!
//! Figment extraction errors are turned into [`ConfigError`]s that point at
//! the offending line of `portal.toml`. Unknown sections and keys get a
//! Jaro-Winkler "did you mean" hint; a key that is valid in a different
//! section (`[heartbeat] retention_secs`) is pointed at the section it
//! belongs to.

#![allow(unused_assignments)] // miette's Diagnostic derive generates code triggering this lint

use std::path::Path;

use miette::{Diagnostic, GraphicalReportHandler, GraphicalTheme, NamedSource, SourceSpan};
use thiserror::Error;

use crate::model::PortalConfig;

/// Minimum Jaro-Winkler score for a suggestion.
const SUGGESTION_THRESHOLD: f64 = 0.8;

/// Name under which an in-memory TOML string is reported.
pub const INLINE_SOURCE: &str = "<inline>";

/// A configuration problem, ready for miette rendering.
#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    /// A top-level table that is not part of the portal config.
    #[error("unknown section `[{section}]`")]
    #[diagnostic(code(portal::config::unknown_section), help("{hint}"))]
    UnknownSection {
        section: String,
        suggestion: Option<String>,
        hint: String,
        #[label("not a portal config section")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A key the section does not accept.
    #[error("unknown key `{key}` in `[{section}]`")]
    #[diagnostic(code(portal::config::unknown_key), help("{hint}"))]
    UnknownKey {
        section: String,
        key: String,
        suggestion: Option<String>,
        hint: String,
        #[label("unknown key")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A value of the wrong TOML type.
    #[error("`{key}` has the wrong type: found {found}")]
    #[diagnostic(code(portal::config::invalid_type), help("expected {expected}"))]
    InvalidType {
        key: String,
        found: String,
        expected: String,
        #[label("wrong type")]
        span: Option<SourceSpan>,
        #[source_code]
        src: Option<NamedSource<String>>,
    },

    /// A well-typed value that breaks a semantic rule.
    #[error("invalid value for `{key}`: {reason}")]
    #[diagnostic(code(portal::config::invalid_value))]
    InvalidValue { key: String, reason: String },

    /// Anything else figment reports (unreadable file, bad env value).
    #[error("{0}")]
    #[diagnostic(code(portal::config::load))]
    Load(String),
}

impl ConfigError {
    pub(crate) fn invalid(key: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// Converts every error inside a figment error into a diagnostic.
///
/// `sources` holds `(name, content)` pairs for the TOML files that were
/// merged; a file-backed error whose file is listed gets a source span.
pub fn from_figment(err: figment::Error, sources: &[(String, String)]) -> Vec<ConfigError> {
    use figment::error::Kind;

    err.into_iter()
        .map(|error| {
            let sources = candidates(&error, sources);
            let mut path: Vec<String> = error.path.clone();
            match &error.kind {
                Kind::UnknownField(field, expected) => {
                    if path.last() == Some(field) {
                        path.pop();
                    }
                    match path.first() {
                        None => unknown_section(field, expected, &sources),
                        Some(section) => unknown_key(section, field, expected, &sources),
                    }
                }
                Kind::InvalidType(actual, expected) => {
                    let key = path.join(".");
                    let (section, field) = match path.as_slice() {
                        [section, field, ..] => (Some(section.as_str()), field.as_str()),
                        [field] => (None, field.as_str()),
                        [] => (None, ""),
                    };
                    let (span, src) = attach(&sources, |content| {
                        locate_key(content, section, field).map(|at| (at, field.len()))
                    });
                    ConfigError::InvalidType {
                        key,
                        found: actual.to_string(),
                        expected: expected.clone(),
                        span,
                        src,
                    }
                }
                _ => ConfigError::Load(error.to_string()),
            }
        })
        .collect()
}

fn unknown_section(
    section: &str,
    expected: &[&str],
    sources: &[(&str, &str)],
) -> ConfigError {
    let suggestion = closest(section, expected.iter().copied()).map(str::to_string);
    let hint = match &suggestion {
        Some(s) => format!("did you mean `[{s}]`?"),
        None => format!("sections: {}", expected.join(", ")),
    };
    let (span, src) = attach(sources, |content| {
        locate_section(content, section).map(|at| (at, section.len() + 2))
    });
    ConfigError::UnknownSection {
        section: section.to_string(),
        suggestion,
        hint,
        span,
        src,
    }
}

fn unknown_key(
    section: &str,
    key: &str,
    expected: &[&str],
    sources: &[(&str, &str)],
) -> ConfigError {
    let suggestion = closest(key, expected.iter().copied()).map(str::to_string);
    let hint = match (home_section(key, section), &suggestion) {
        (Some(home), _) => format!("`{key}` belongs in `[{home}]`, not `[{section}]`"),
        (None, Some(s)) => format!("did you mean `{s}`?"),
        (None, None) => format!("`[{section}]` accepts: {}", expected.join(", ")),
    };
    let (span, src) = attach(sources, |content| {
        locate_key(content, Some(section), key).map(|at| (at, key.len()))
    });
    ConfigError::UnknownKey {
        section: section.to_string(),
        key: key.to_string(),
        suggestion,
        hint,
        span,
        src,
    }
}

/// Orders `sources` so the one the error came from is tried first.
///
/// File-backed errors match by path and in-memory strings by
/// [`INLINE_SOURCE`]. Merged tables often carry the metadata of the
/// defaults layer, so the remaining sources stay on as fallbacks.
fn candidates<'a>(
    error: &figment::Error,
    sources: &'a [(String, String)],
) -> Vec<(&'a str, &'a str)> {
    let origin = error.metadata.as_ref().and_then(|m| m.source.as_ref());
    let matches = |name: &str| match origin {
        Some(figment::Source::File(path)) => Path::new(name) == path.as_path(),
        _ => name == INLINE_SOURCE,
    };
    let mut ordered: Vec<(&str, &str)> = sources
        .iter()
        .map(|(name, content)| (name.as_str(), content.as_str()))
        .collect();
    ordered.sort_by_key(|(name, _)| !matches(*name));
    ordered
}

fn attach(
    sources: &[(&str, &str)],
    find: impl Fn(&str) -> Option<(usize, usize)>,
) -> (Option<SourceSpan>, Option<NamedSource<String>>) {
    sources
        .iter()
        .find_map(|(name, content)| {
            find(*content).map(|(at, len)| {
                (
                    Some(SourceSpan::new(at.into(), len)),
                    Some(NamedSource::new(*name, content.to_string())),
                )
            })
        })
        .unwrap_or((None, None))
}

/// Byte offset of `key = ...` inside `[section]`, or in the root table
/// when `section` is `None`. Keys under other headers are not matched.
pub fn locate_key(content: &str, section: Option<&str>, key: &str) -> Option<usize> {
    let mut current: Option<&str> = None;
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        let indent = line.len() - body.len();
        if let Some(header) = table_header(body) {
            current = Some(header);
        } else if current == section {
            let is_key = body
                .strip_prefix(key)
                .is_some_and(|rest| rest.trim_start().starts_with('='));
            if is_key {
                return Some(offset + indent);
            }
        }
        offset += line.len();
    }
    None
}

/// Byte offset of the `[section]` header.
pub fn locate_section(content: &str, section: &str) -> Option<usize> {
    let mut offset = 0;
    for line in content.split_inclusive('\n') {
        let body = line.trim_start();
        if table_header(body) == Some(section) {
            return Some(offset + line.len() - body.len());
        }
        offset += line.len();
    }
    None
}

fn table_header(line: &str) -> Option<&str> {
    let inner = line.strip_prefix('[')?;
    let end = inner.find(']')?;
    Some(inner[..end].trim())
}

fn closest<'a>(input: &str, candidates: impl IntoIterator<Item = &'a str>) -> Option<&'a str> {
    candidates
        .into_iter()
        .map(|candidate| (candidate, strsim::jaro_winkler(input, candidate)))
        .filter(|(_, score)| *score >= SUGGESTION_THRESHOLD)
        .max_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(candidate, _)| candidate)
}

/// The section of [`PortalConfig`] that declares `key`, if it is not `current`.
fn home_section(key: &str, current: &str) -> Option<String> {
    let Ok(toml::Value::Table(root)) = toml::Value::try_from(PortalConfig::default()) else {
        return None;
    };
    root.into_iter()
        .filter(|(name, _)| name != current)
        .find(|(_, value)| value.as_table().is_some_and(|t| t.contains_key(key)))
        .map(|(name, _)| name)
}

/// Renders `errors` as plain-text miette reports.
pub fn render_report(errors: &[ConfigError]) -> String {
    let handler = GraphicalReportHandler::new_themed(GraphicalTheme::unicode_nocolor());
    let mut out = format!("portal: {} configuration error(s)\n\n", errors.len());
    for error in errors {
        if handler.render_report(&mut out, error).is_err() {
            out.push_str(&format!("  x {error}\n"));
        }
    }
    out
}

/// Prints every error to stderr.
pub fn render_errors(errors: &[ConfigError]) {
    eprint!("{}", render_report(errors));
}
