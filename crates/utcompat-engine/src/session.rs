//! Session entry point: command line, test selection and the run loop.

use std::ffi::OsString;
use std::fmt::Write as _;
use std::io::Write;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use clap::Parser;
use parking_lot::Mutex;

use crate::assertion::ResultDisposition;
use crate::builder::ResultBuilder;
use crate::capture::{CapturedPanic, capture_unwind, install_quiet_hook};
use crate::config::{ReporterKind, RunConfig};
use crate::context;
use crate::error::EngineError;
use crate::registry::{TestCase, TestSpec};
use crate::reporter::{make_reporter, open_output};
use crate::structured_log::LogEmitter;
use crate::totals::Totals;

/// Largest process status a run reports; also used for command-line errors.
pub const MAX_EXIT_CODE: i32 = 255;

/// One session at a time per process.
static SESSION: Mutex<()> = parking_lot::const_mutex(());

/// Test runner command line.
#[derive(Debug, Parser)]
#[command(name = "utcompat")]
#[command(about = "Run registered unit tests")]
struct Cli {
    /// Test names (`*` wildcards at either end), `[tag]` patterns, `~` to exclude.
    test_spec: Vec<String>,
    /// List matching tests and exit.
    #[arg(short = 'l', long)]
    list_tests: bool,
    /// Report passing assertions as well as failures.
    #[arg(short = 's', long)]
    success: bool,
    /// Stop after the first failed assertion.
    #[arg(short = 'a', long)]
    abort: bool,
    /// Stop after N failed assertions.
    #[arg(short = 'x', long, value_name = "N")]
    abort_after: Option<u64>,
    /// Skip evaluation of throws-style assertions.
    #[arg(short = 'e', long)]
    nothrow: bool,
    /// Report format: console, json or markdown.
    #[arg(short = 'r', long, value_name = "KIND")]
    reporter: Option<ReporterKind>,
    /// Write the report to this file instead of stdout.
    #[arg(short = 'o', long, value_name = "PATH")]
    out: Option<PathBuf>,
    /// Write a JSONL event log.
    #[arg(long, value_name = "PATH")]
    log: Option<PathBuf>,
}

impl Cli {
    fn apply(self, mut config: RunConfig) -> RunConfig {
        config.test_spec = TestSpec::parse(&self.test_spec);
        config.list_tests = self.list_tests;
        config.include_successful |= self.success;
        if self.abort {
            config.abort_after = Some(1);
        }
        if self.abort_after.is_some() {
            config.abort_after = self.abort_after;
        }
        config.no_throw |= self.nothrow;
        if let Some(reporter) = self.reporter {
            config.reporter = reporter;
        }
        if self.out.is_some() {
            config.out = self.out;
        }
        if self.log.is_some() {
            config.log = self.log;
        }
        config
    }
}

/// Runs a set of test cases and reports the outcome.
#[derive(Default)]
pub struct Session {
    output: Option<Box<dyn Write + Send>>,
}

impl Session {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Send the report here instead of stdout when no `--out` is given.
    #[must_use]
    pub fn with_output(mut self, output: Box<dyn Write + Send>) -> Self {
        self.output = Some(output);
        self
    }

    /// Parse `args` (program name first) and run the selected cases.
    ///
    /// Returns the process status: the number of failed assertions capped
    /// at [`MAX_EXIT_CODE`], `0` for `--help` or `--list-tests`, and
    /// [`MAX_EXIT_CODE`] for command-line or output errors.
    pub fn run<I, T>(self, args: I, cases: &[TestCase]) -> i32
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let cli = match Cli::try_parse_from(args) {
            Ok(cli) => cli,
            Err(err) => {
                let code = if err.use_stderr() { MAX_EXIT_CODE } else { 0 };
                let _ = err.print();
                return code;
            }
        };
        let config = cli.apply(RunConfig::from_env());
        match self.run_with_config(&config, cases) {
            Ok(totals) => totals.exit_code(),
            Err(err) => {
                eprintln!("error: {err}");
                MAX_EXIT_CODE
            }
        }
    }

    /// Run the cases selected by `config`.
    pub fn run_with_config(
        mut self,
        config: &RunConfig,
        cases: &[TestCase],
    ) -> Result<Totals, EngineError> {
        let _session = SESSION.lock();
        install_quiet_hook();

        let mut out = match (&config.out, self.output.take()) {
            (Some(path), _) => open_output(path)?,
            (None, Some(output)) => output,
            (None, None) => Box::new(std::io::stdout()),
        };
        let selected: Vec<&TestCase> = cases
            .iter()
            .filter(|case| config.test_spec.matches(&case.info))
            .collect();

        if config.list_tests {
            list_tests(out.as_mut(), &selected)?;
            return Ok(Totals::default());
        }

        let run_id = new_run_id();
        let log = match &config.log {
            Some(path) => Some(LogEmitter::to_file(path, &run_id).map_err(|source| {
                EngineError::Open {
                    path: path.clone(),
                    source,
                }
            })?),
            None => None,
        };
        let reporter = make_reporter(config.reporter, out, &run_id);

        context::begin_run(config.clone(), reporter, log);
        let run = RunGuard { finished: false };
        for case in selected {
            if context::aborting() {
                context::test_case_skipped(&case.info);
                continue;
            }
            run_test_case(case);
        }
        run.finish()
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("custom_output", &self.output.is_some())
            .finish()
    }
}

/// Ends the run context even if the run loop unwinds.
struct RunGuard {
    finished: bool,
}

impl RunGuard {
    fn finish(mut self) -> Result<Totals, EngineError> {
        self.finished = true;
        Ok(context::end_run()?.unwrap_or_default())
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.finished {
            let _ = context::end_run();
        }
    }
}

fn run_test_case(case: &TestCase) {
    context::test_case_starting(&case.info);
    // A hard failure on a worker thread comes back here as the worker's
    // join panic; it was already recorded.
    if let Err(panic) = capture_unwind(|| case.invoke())
        && !panic.is_test_aborted()
        && !context::test_aborted()
    {
        record_unexpected_panic(case, &panic);
    }
    context::test_case_ended();
}

/// A panic that escaped the test body outside any assertion.
fn record_unexpected_panic(case: &TestCase, panic: &CapturedPanic) {
    let line_info = context::last_known_location().unwrap_or(case.info.line_info);
    let mut builder = ResultBuilder::new(
        "{unexpected panic}",
        line_info,
        "",
        ResultDisposition::Normal,
    );
    builder.use_active_exception(panic, ResultDisposition::Normal);
    if let Some(location) = panic.location() {
        let _ = write!(builder, " (panicked at {location})");
    }
    // The test body is already gone; nothing left to abort.
    let _ = context::handle_result(builder.build());
}

fn list_tests(out: &mut dyn Write, cases: &[&TestCase]) -> Result<(), EngineError> {
    writeln!(out, "Matching test cases:")?;
    for case in cases {
        writeln!(out, "  {}", case.name())?;
        if !case.info.description.is_empty() {
            writeln!(out, "      {}", case.info.description)?;
        }
        if !case.info.tags.is_empty() {
            let tags: String = case.info.tags.iter().map(|t| format!("[{t}]")).collect();
            writeln!(out, "      {tags}")?;
        }
    }
    let noun = if cases.len() == 1 { "test case" } else { "test cases" };
    writeln!(out, "\n{} matching {noun}", cases.len())?;
    out.flush()?;
    Ok(())
}

fn new_run_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis())
        .unwrap_or_default();
    format!("utcompat-{}-{millis}", std::process::id())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> RunConfig {
        let cli = Cli::try_parse_from(std::iter::once("prog").chain(args.iter().copied())).unwrap();
        cli.apply(RunConfig::default())
    }

    #[test]
    fn flags_map_onto_config() {
        let config = parse(&["-s", "-e", "-r", "json", "-o", "report.json", "--log", "run.jsonl"]);
        assert!(config.include_successful);
        assert!(config.no_throw);
        assert_eq!(config.reporter, ReporterKind::Json);
        assert_eq!(config.out, Some(PathBuf::from("report.json")));
        assert_eq!(config.log, Some(PathBuf::from("run.jsonl")));
    }

    #[test]
    fn abort_flags() {
        assert_eq!(parse(&["-a"]).abort_after, Some(1));
        assert_eq!(parse(&["-x", "3"]).abort_after, Some(3));
        assert_eq!(parse(&[]).abort_after, None);
    }

    #[test]
    fn positional_arguments_become_test_spec() {
        let config = parse(&["alpha", "~[slow]"]);
        assert!(config.test_spec.has_filters());
    }

    #[test]
    fn unknown_reporter_is_a_usage_error() {
        let err = Cli::try_parse_from(["prog", "-r", "xml"]).unwrap_err();
        assert!(err.use_stderr());
    }

    #[test]
    fn help_is_not_an_error_status() {
        let code = Session::new()
            .with_output(Box::new(std::io::sink()))
            .run(["prog", "--help"], &[]);
        assert_eq!(code, 0);
    }

    #[test]
    fn bad_option_exits_with_max_code() {
        let code = Session::new().run(["prog", "--no-such-flag"], &[]);
        assert_eq!(code, MAX_EXIT_CODE);
    }
}
