//! Host assertion engine for utcompat.
//!
//! This crate provides:
//! - Result recording: [`ResultBuilder`] drives one assertion from start to
//!   reaction (record, then abort the test for failed hard dispositions)
//! - Panic capture: quiet `catch_unwind` with payload translation
//! - Test registry: [`TestCase`] descriptors, tags, and name/tag filtering
//! - Sessions: command-line entry point returning a process status
//! - Reporting: console, JSON and markdown reporters plus a JSONL event log
//!
//! The run context that assertions record into is process-wide, but only
//! threads that belong to the running session record into it; see
//! [`SessionId::adopt`]. Recording an assertion is a multi-step protocol, so
//! callers that assert from several threads must serialize the whole
//! sequence themselves.

#![forbid(unsafe_code)]

pub mod assertion;
pub mod builder;
pub mod capture;
pub mod config;
pub mod context;
pub mod error;
pub mod registry;
pub mod reporter;
pub mod session;
pub mod structured_log;
pub mod totals;

pub use assertion::{
    AssertionInfo, AssertionResult, MessageInfo, ResultDisposition, ResultWas, SourceLineInfo,
};
pub use builder::ResultBuilder;
pub use capture::{
    CapturedPanic, TestAborted, capture_unwind, raise_test_aborted,
    register_exception_translator,
};
pub use config::{ReporterKind, RunConfig};
pub use context::{
    SessionId, SessionScope, add_info_message, allow_throws, current_session, is_running,
};
pub use error::EngineError;
pub use registry::{TestCase, TestCaseInfo, TestSpec};
pub use session::{MAX_EXIT_CODE, Session};
pub use totals::{Counts, Totals};
