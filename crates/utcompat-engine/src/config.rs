//! Run configuration.
//!
//! Defaults come from the environment and are overridden by the command line:
//! - `UTCOMPAT_REPORTER`: `console` (default), `json`, or `markdown`.
//! - `UTCOMPAT_LOG`: path of a JSONL event log to write.
//! - `UTCOMPAT_NOTHROW`: when truthy, throws-style assertions are skipped.

use std::path::PathBuf;
use std::str::FromStr;

use crate::error::EngineError;
use crate::registry::TestSpec;

/// Output format of a run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReporterKind {
    /// Failures as they happen plus a summary line.
    #[default]
    Console,
    /// One JSON document written when the run ends.
    Json,
    /// One markdown table written when the run ends.
    Markdown,
}

impl ReporterKind {
    /// Parse from string (case-insensitive), falling back to console.
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }
}

impl FromStr for ReporterKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "console" | "text" | "compact" => Ok(Self::Console),
            "json" => Ok(Self::Json),
            "markdown" | "md" => Ok(Self::Markdown),
            _ => Err(EngineError::UnknownReporter(s.to_string())),
        }
    }
}

/// Everything a session needs to know to run.
#[derive(Debug, Clone, Default)]
pub struct RunConfig {
    pub test_spec: TestSpec,
    pub list_tests: bool,
    /// Report passing assertions as well as failures.
    pub include_successful: bool,
    /// Stop the run once this many assertions have failed.
    pub abort_after: Option<u64>,
    /// Skip evaluation of throws-style assertions.
    pub no_throw: bool,
    pub reporter: ReporterKind,
    /// Report destination; stdout when unset.
    pub out: Option<PathBuf>,
    /// JSONL event log destination.
    pub log: Option<PathBuf>,
}

impl RunConfig {
    /// Configuration with environment defaults applied.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(reporter) = lookup("UTCOMPAT_REPORTER") {
            config.reporter = ReporterKind::from_str_loose(&reporter);
        }
        if let Some(log) = lookup("UTCOMPAT_LOG").filter(|p| !p.trim().is_empty()) {
            config.log = Some(PathBuf::from(log));
        }
        if let Some(flag) = lookup("UTCOMPAT_NOTHROW") {
            config.no_throw = parse_flag(&flag);
        }
        config
    }

    #[must_use]
    pub fn with_test_spec(mut self, spec: TestSpec) -> Self {
        self.test_spec = spec;
        self
    }

    #[must_use]
    pub fn with_successes(mut self, include: bool) -> Self {
        self.include_successful = include;
        self
    }

    #[must_use]
    pub fn with_abort_after(mut self, failures: u64) -> Self {
        self.abort_after = Some(failures);
        self
    }

    #[must_use]
    pub fn with_no_throw(mut self, no_throw: bool) -> Self {
        self.no_throw = no_throw;
        self
    }

    #[must_use]
    pub fn with_reporter(mut self, reporter: ReporterKind) -> Self {
        self.reporter = reporter;
        self
    }

    #[must_use]
    pub fn with_out(mut self, path: impl Into<PathBuf>) -> Self {
        self.out = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.log = Some(path.into());
        self
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_reporter_kinds() {
        assert_eq!(ReporterKind::from_str_loose("console"), ReporterKind::Console);
        assert_eq!(ReporterKind::from_str_loose("JSON"), ReporterKind::Json);
        assert_eq!(ReporterKind::from_str_loose("md"), ReporterKind::Markdown);
        assert_eq!(ReporterKind::from_str_loose("bogus"), ReporterKind::Console);
        assert!("bogus".parse::<ReporterKind>().is_err());
    }

    #[test]
    fn default_config_runs_everything_to_console() {
        let config = RunConfig::default();
        assert_eq!(config.reporter, ReporterKind::Console);
        assert!(!config.no_throw);
        assert!(!config.include_successful);
        assert_eq!(config.abort_after, None);
        assert!(config.out.is_none());
    }

    #[test]
    fn environment_defaults() {
        let config = RunConfig::from_lookup(|key| match key {
            "UTCOMPAT_REPORTER" => Some("json".to_string()),
            "UTCOMPAT_LOG" => Some("/tmp/run.jsonl".to_string()),
            "UTCOMPAT_NOTHROW" => Some("yes".to_string()),
            _ => None,
        });
        assert_eq!(config.reporter, ReporterKind::Json);
        assert_eq!(config.log, Some(PathBuf::from("/tmp/run.jsonl")));
        assert!(config.no_throw);
    }

    #[test]
    fn blank_log_path_is_ignored() {
        let config = RunConfig::from_lookup(|key| (key == "UTCOMPAT_LOG").then(|| " ".to_string()));
        assert!(config.log.is_none());
    }
}
