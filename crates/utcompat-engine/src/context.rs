//! Process-wide run context.
//!
//! A session installs one [`RunState`] for the duration of a run. Only
//! threads that belong to that session record into it: the session thread
//! itself, and any thread that entered the session with [`SessionId::adopt`].
//! Every other caller is detached. Each step is guarded by a mutex, but the
//! builder protocol as a whole is not atomic: concurrent callers serialize
//! it themselves.

use std::cell::Cell;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::assertion::{AssertionInfo, AssertionResult, MessageInfo, SourceLineInfo};
use crate::config::RunConfig;
use crate::error::EngineError;
use crate::registry::TestCaseInfo;
use crate::reporter::Reporter;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel, Outcome};
use crate::totals::{Counts, Totals};

/// What the builder must do after a result has been handled.
#[derive(Debug)]
pub(crate) enum Reaction {
    Continue,
    /// A failure under a hard disposition, or the abort-after limit was hit.
    AbortTest,
    /// The calling thread belongs to no run; the result was not recorded.
    Detached(AssertionResult),
}

/// Identifies one running session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    /// Record the calling thread's assertions into this session until the
    /// returned scope is dropped.
    ///
    /// Threads spawned by a test body are detached until they adopt the
    /// session of the thread that spawned them:
    ///
    /// ```ignore
    /// let session = utcompat_engine::current_session();
    /// std::thread::scope(|s| {
    ///     s.spawn(move || {
    ///         let _scope = session.map(SessionId::adopt);
    ///         // assertions here count towards the running test
    ///     });
    /// });
    /// ```
    #[must_use = "the thread leaves the session when the scope is dropped"]
    pub fn adopt(self) -> SessionScope {
        let previous = OWNER.with(|owner| owner.replace(Some(self)));
        SessionScope {
            previous,
            _thread_bound: PhantomData,
        }
    }
}

/// Membership of the current thread in a session; see [`SessionId::adopt`].
#[derive(Debug)]
pub struct SessionScope {
    previous: Option<SessionId>,
    _thread_bound: PhantomData<*const ()>,
}

impl Drop for SessionScope {
    fn drop(&mut self) {
        OWNER.with(|owner| owner.set(self.previous));
    }
}

thread_local! {
    static OWNER: Cell<Option<SessionId>> = const { Cell::new(None) };
}

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// The session the calling thread records into, if any.
#[must_use]
pub fn current_session() -> Option<SessionId> {
    let owner = OWNER.with(Cell::get)?;
    RUN.lock()
        .as_ref()
        .is_some_and(|run| run.id == owner)
        .then_some(owner)
}

struct ActiveTest {
    info: TestCaseInfo,
    counts: Counts,
    messages: Vec<MessageInfo>,
    last_assertion: Option<SourceLineInfo>,
    /// A hard failure already unwound (or is unwinding) this test.
    aborted: bool,
    started: Instant,
}

struct RunState {
    id: SessionId,
    config: RunConfig,
    current: Option<ActiveTest>,
    totals: Totals,
    reporter: Box<dyn Reporter>,
    log: Option<LogEmitter>,
    log_error: Option<std::io::Error>,
    aborting: bool,
}

impl RunState {
    fn log(&mut self, entry: LogEntry) {
        if let Some(log) = self.log.as_mut()
            && let Err(err) = log.emit_entry(entry)
        {
            self.log_error.get_or_insert(err);
        }
    }

    fn test_name(&self) -> Option<&str> {
        self.current.as_ref().map(|t| t.info.name.as_str())
    }
}

static RUN: Mutex<Option<RunState>> = parking_lot::const_mutex(None);

/// The run, if the calling thread belongs to it.
fn owned(slot: &mut Option<RunState>) -> Option<&mut RunState> {
    let owner = OWNER.with(Cell::get)?;
    slot.as_mut().filter(|run| run.id == owner)
}

pub(crate) fn begin_run(config: RunConfig, mut reporter: Box<dyn Reporter>, log: Option<LogEmitter>) {
    reporter.run_starting();
    let id = SessionId(NEXT_SESSION.fetch_add(1, Ordering::Relaxed));
    let mut state = RunState {
        id,
        config,
        current: None,
        totals: Totals::default(),
        reporter,
        log,
        log_error: None,
        aborting: false,
    };
    let details = serde_json::json!({
        "reporter": format!("{:?}", state.config.reporter).to_ascii_lowercase(),
        "include_successful": state.config.include_successful,
        "abort_after": state.config.abort_after,
        "no_throw": state.config.no_throw,
    });
    state.log(LogEntry::new(String::new(), LogLevel::Info, "session_start").with_details(details));
    *RUN.lock() = Some(state);
    OWNER.with(|owner| owner.set(Some(id)));
}

/// Tear the run down, flush the reporter and the log, and return the totals.
///
/// Returns `Ok(None)` if the calling thread owns no active run.
pub(crate) fn end_run() -> Result<Option<Totals>, EngineError> {
    let taken = {
        let mut slot = RUN.lock();
        let is_owner = owned(&mut slot).is_some();
        if is_owner { slot.take() } else { None }
    };
    let Some(mut state) = taken else {
        return Ok(None);
    };
    OWNER.with(|owner| owner.set(None));
    let totals = state.totals;
    let entry = LogEntry::new(String::new(), LogLevel::Info, "session_end")
        .with_exit_code(totals.exit_code())
        .with_outcome(if totals.assertions.all_passed() {
            Outcome::Pass
        } else {
            Outcome::Fail
        })
        .with_details(serde_json::to_value(totals)?);
    state.log(entry);

    state.reporter.run_ended(&totals)?;
    if let Some(mut log) = state.log.take()
        && let Err(err) = log.flush()
    {
        state.log_error.get_or_insert(err);
    }
    match state.log_error {
        Some(err) => Err(err.into()),
        None => Ok(Some(totals)),
    }
}

pub(crate) fn test_case_starting(info: &TestCaseInfo) {
    let mut guard = RUN.lock();
    let Some(run) = owned(&mut guard) else {
        return;
    };
    run.reporter.test_case_starting(info);
    run.current = Some(ActiveTest {
        info: info.clone(),
        counts: Counts::default(),
        messages: Vec::new(),
        last_assertion: None,
        aborted: false,
        started: Instant::now(),
    });
    let entry = LogEntry::new(String::new(), LogLevel::Info, "test_case_start")
        .with_test_case(info.name.clone())
        .with_location(info.line_info.file, info.line_info.line);
    run.log(entry);
}

/// Close the running test and count it as passed or failed.
pub(crate) fn test_case_ended() -> Option<Counts> {
    let mut guard = RUN.lock();
    let run = owned(&mut guard)?;
    let test = run.current.take()?;
    let duration_ms = u64::try_from(test.started.elapsed().as_millis()).unwrap_or(u64::MAX);

    run.totals.test_cases.record(test.counts.all_passed());
    run.reporter
        .test_case_ended(&test.info, test.counts, duration_ms);
    let entry = LogEntry::new(String::new(), LogLevel::Info, "test_case_end")
        .with_test_case(test.info.name.clone())
        .with_outcome(if test.counts.all_passed() {
            Outcome::Pass
        } else {
            Outcome::Fail
        })
        .with_duration_ms(duration_ms)
        .with_details(serde_json::json!({
            "passed": test.counts.passed,
            "failed": test.counts.failed,
        }));
    run.log(entry);
    Some(test.counts)
}

/// Log a selected test that never ran because the run was aborted.
pub(crate) fn test_case_skipped(info: &TestCaseInfo) {
    let mut guard = RUN.lock();
    if let Some(run) = owned(&mut guard) {
        let entry = LogEntry::new(String::new(), LogLevel::Warn, "test_case_skipped")
            .with_test_case(info.name.clone())
            .with_location(info.line_info.file, info.line_info.line)
            .with_outcome(Outcome::Skip)
            .with_message("abort-after limit reached");
        run.log(entry);
    }
}

pub(crate) fn assertion_started(info: &AssertionInfo) {
    let mut guard = RUN.lock();
    if let Some(test) = owned(&mut guard).and_then(|run| run.current.as_mut()) {
        test.last_assertion = Some(info.line_info);
    }
}

/// Location of the most recent assertion in the running test, falling back
/// to the test case itself.
pub(crate) fn last_known_location() -> Option<SourceLineInfo> {
    let mut guard = RUN.lock();
    let test = owned(&mut guard)?.current.as_ref()?;
    Some(test.last_assertion.unwrap_or(test.info.line_info))
}

/// Returns true if a hard failure has already aborted the running test.
pub(crate) fn test_aborted() -> bool {
    let mut guard = RUN.lock();
    owned(&mut guard)
        .and_then(|run| run.current.as_ref())
        .is_some_and(|test| test.aborted)
}

pub(crate) fn handle_result(mut result: AssertionResult) -> Reaction {
    let mut guard = RUN.lock();
    let Some(run) = owned(&mut guard) else {
        return Reaction::Detached(result);
    };

    let ok = result.succeeded();
    run.totals.assertions.record(ok);
    if let Some(test) = run.current.as_mut() {
        test.counts.record(ok);
        result.info_messages.clone_from(&test.messages);
    }

    let include_successful = run.config.include_successful;
    run.reporter.assertion_ended(&result, include_successful);
    let entry = LogEntry::for_assertion(&result, run.test_name());
    run.log(entry);

    if ok {
        return Reaction::Continue;
    }
    if run
        .config
        .abort_after
        .is_some_and(|limit| run.totals.assertions.failed >= limit)
    {
        run.aborting = true;
    }
    if run.aborting || result.info.disposition.aborts_on_failure() {
        if let Some(test) = run.current.as_mut() {
            test.aborted = true;
        }
        Reaction::AbortTest
    } else {
        Reaction::Continue
    }
}

/// Attach an informational message to the running test.
///
/// The message is reported with every later assertion result of that test.
/// Outside a run this does nothing.
pub fn add_info_message(macro_name: &'static str, line_info: SourceLineInfo, message: impl Into<String>) {
    let mut guard = RUN.lock();
    let Some(run) = owned(&mut guard) else {
        return;
    };
    let message = message.into();
    let entry = LogEntry::new(String::new(), LogLevel::Info, "info_message")
        .with_location(line_info.file, line_info.line)
        .with_message(message.clone());
    let entry = match run.test_name() {
        Some(name) => entry.with_test_case(name.to_string()),
        None => entry,
    };
    run.log(entry);

    if let Some(test) = run.current.as_mut() {
        test.messages.push(MessageInfo {
            macro_name,
            line_info,
            message,
        });
    }
}

/// Returns false when the run was started with `--nothrow`.
#[must_use]
pub fn allow_throws() -> bool {
    let mut guard = RUN.lock();
    owned(&mut guard).is_none_or(|run| !run.config.no_throw)
}

/// Returns true while the calling thread belongs to a running session.
#[must_use]
pub fn is_running() -> bool {
    current_session().is_some()
}

/// Returns true once the abort-after limit was reached.
pub(crate) fn aborting() -> bool {
    let mut guard = RUN.lock();
    owned(&mut guard).is_some_and(|run| run.aborting)
}
