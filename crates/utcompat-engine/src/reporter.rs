//! Run reporters.

use std::io::Write;
use std::path::Path;

use serde::Serialize;

use crate::assertion::AssertionResult;
use crate::config::ReporterKind;
use crate::error::EngineError;
use crate::registry::TestCaseInfo;
use crate::totals::{Counts, Totals};

/// Receives run events from the session and the run context.
pub trait Reporter: Send {
    fn run_starting(&mut self) {}

    fn test_case_starting(&mut self, _info: &TestCaseInfo) {}

    fn assertion_ended(&mut self, result: &AssertionResult, include_successful: bool);

    fn test_case_ended(&mut self, info: &TestCaseInfo, counts: Counts, duration_ms: u64);

    /// Write whatever is still pending. Write errors seen earlier surface here.
    fn run_ended(&mut self, totals: &Totals) -> Result<(), EngineError>;
}

/// Build the reporter selected by `kind`, writing to `out`.
#[must_use]
pub fn make_reporter(kind: ReporterKind, out: Box<dyn Write + Send>, run_id: &str) -> Box<dyn Reporter> {
    match kind {
        ReporterKind::Console => Box::new(ConsoleReporter::new(out)),
        ReporterKind::Json | ReporterKind::Markdown => {
            Box::new(DocumentReporter::new(out, kind, run_id))
        }
    }
}

/// Open a report destination, creating parent directories as needed.
pub fn open_output(path: &Path) -> Result<Box<dyn Write + Send>, EngineError> {
    let open = || -> std::io::Result<std::fs::File> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::File::create(path)
    };
    let file = open().map_err(|source| EngineError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Box::new(std::io::BufWriter::new(file)))
}

// ---------------------------------------------------------------------------
// Console
// ---------------------------------------------------------------------------

const RULE: &str =
    "-------------------------------------------------------------------------------";

/// Streams failures as they happen and prints a summary at the end.
pub struct ConsoleReporter {
    out: Box<dyn Write + Send>,
    error: Option<std::io::Error>,
    header_printed: bool,
    current: Option<TestCaseInfo>,
}

impl ConsoleReporter {
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out,
            error: None,
            header_printed: false,
            current: None,
        }
    }

    fn write(&mut self, text: &str) {
        if self.error.is_some() {
            return;
        }
        if let Err(err) = self.out.write_all(text.as_bytes()) {
            self.error = Some(err);
        }
    }

    fn print_test_header(&mut self) {
        if self.header_printed {
            return;
        }
        self.header_printed = true;
        let Some(info) = self.current.as_ref() else {
            return;
        };
        let mut header = format!("{RULE}\n{}\n", info.name);
        if !info.description.is_empty() {
            header.push_str(&format!("  {}\n", info.description));
        }
        header.push_str(&format!("{RULE}\n{}\n\n", info.line_info));
        self.write(&header);
    }
}

impl Reporter for ConsoleReporter {
    fn test_case_starting(&mut self, info: &TestCaseInfo) {
        self.current = Some(info.clone());
        self.header_printed = false;
    }

    fn assertion_ended(&mut self, result: &AssertionResult, include_successful: bool) {
        if result.succeeded() && !include_successful {
            return;
        }
        self.print_test_header();
        let text = format!("{}\n", result.render());
        self.write(&text);
    }

    fn test_case_ended(&mut self, _info: &TestCaseInfo, _counts: Counts, _duration_ms: u64) {
        self.current = None;
    }

    fn run_ended(&mut self, totals: &Totals) -> Result<(), EngineError> {
        let a = totals.assertions;
        let t = totals.test_cases;
        let summary = if a.total() == 0 && t.total() == 0 {
            "No tests ran\n".to_string()
        } else if a.all_passed() && t.all_passed() {
            format!(
                "{}\nAll tests passed ({} assertions in {} test cases)\n",
                "=".repeat(RULE.len()),
                a.passed,
                t.total()
            )
        } else {
            format!(
                "{}\ntest cases: {} | {} passed | {} failed\nassertions: {} | {} passed | {} failed\n",
                "=".repeat(RULE.len()),
                t.total(),
                t.passed,
                t.failed,
                a.total(),
                a.passed,
                a.failed
            )
        };
        self.write(&summary);
        if let Some(err) = self.error.take() {
            return Err(err.into());
        }
        self.out.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Whole-run documents (JSON / markdown)
// ---------------------------------------------------------------------------

/// Per-test section of a [`RunReport`].
#[derive(Debug, Clone, Serialize)]
pub struct TestCaseReport {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub file: String,
    pub line: u32,
    pub passed: bool,
    pub assertions: Counts,
    pub duration_ms: u64,
    /// Recorded results: failures always, passes only with `--success`.
    pub results: Vec<AssertionResult>,
}

/// A whole run, rendered once the session ends.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub title: String,
    pub run_id: String,
    /// Timestamp (UTC).
    pub timestamp: String,
    pub totals: Totals,
    pub test_cases: Vec<TestCaseReport>,
}

impl RunReport {
    #[must_use]
    pub fn new(run_id: &str) -> Self {
        Self {
            title: "utcompat test run".to_string(),
            run_id: run_id.to_string(),
            timestamp: crate::structured_log::now_utc(),
            totals: Totals::default(),
            test_cases: Vec::new(),
        }
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let a = self.totals.assertions;
        let t = self.totals.test_cases;
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Run: {}\n", self.run_id));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!(
            "- Test cases: {} ({} passed, {} failed)\n",
            t.total(),
            t.passed,
            t.failed
        ));
        out.push_str(&format!(
            "- Assertions: {} ({} passed, {} failed)\n\n",
            a.total(),
            a.passed,
            a.failed
        ));

        out.push_str("| Test case | Location | Assertions | Status |\n");
        out.push_str("|-----------|----------|------------|--------|\n");
        for case in &self.test_cases {
            let status = if case.passed { "PASS" } else { "FAIL" };
            out.push_str(&format!(
                "| {} | {}:{} | {}/{} | {} |\n",
                case.name,
                case.file,
                case.line,
                case.assertions.passed,
                case.assertions.total(),
                status
            ));
        }

        let failures: Vec<&AssertionResult> = self
            .test_cases
            .iter()
            .flat_map(|case| case.results.iter())
            .filter(|r| !r.succeeded())
            .collect();
        if !failures.is_empty() {
            out.push_str("\n## Failures\n\n");
            for failure in failures {
                out.push_str(&format!("```\n{}```\n", failure.render()));
            }
        }
        out
    }

    /// Render the report as JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Collects a [`RunReport`] and writes it when the run ends.
pub struct DocumentReporter {
    out: Box<dyn Write + Send>,
    kind: ReporterKind,
    report: RunReport,
    pending: Vec<AssertionResult>,
}

impl DocumentReporter {
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>, kind: ReporterKind, run_id: &str) -> Self {
        Self {
            out,
            kind,
            report: RunReport::new(run_id),
            pending: Vec::new(),
        }
    }
}

impl Reporter for DocumentReporter {
    fn test_case_starting(&mut self, _info: &TestCaseInfo) {
        self.pending.clear();
    }

    fn assertion_ended(&mut self, result: &AssertionResult, include_successful: bool) {
        if include_successful || !result.succeeded() {
            self.pending.push(result.clone());
        }
    }

    fn test_case_ended(&mut self, info: &TestCaseInfo, counts: Counts, duration_ms: u64) {
        self.report.test_cases.push(TestCaseReport {
            name: info.name.clone(),
            description: info.description.clone(),
            tags: info.tags.clone(),
            file: info.line_info.file.to_string(),
            line: info.line_info.line,
            passed: counts.all_passed(),
            assertions: counts,
            duration_ms,
            results: std::mem::take(&mut self.pending),
        });
    }

    fn run_ended(&mut self, totals: &Totals) -> Result<(), EngineError> {
        self.report.totals = *totals;
        let document = match self.kind {
            ReporterKind::Markdown => self.report.to_markdown(),
            _ => self.report.to_json()?,
        };
        self.out.write_all(document.as_bytes())?;
        self.out.write_all(b"\n")?;
        self.out.flush()?;
        Ok(())
    }
}
