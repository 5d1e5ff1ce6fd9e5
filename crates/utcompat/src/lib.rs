//! Legacy unit-test vocabulary on top of the utcompat host engine.
//!
//! Test code written against `BOOST_CHECK`-style macros runs unchanged in
//! meaning: every macro becomes one host-engine assertion, recorded under a
//! process-wide lock so that assertions from many threads never interleave.
//!
//! ```ignore
//! use utcompat::prelude::*;
//!
//! #[utcompat::unit_test]
//! mod tests {
//!     use super::*;
//!
//!     boost_auto_test_case!(arithmetic, "[math]", {
//!         boost_check!(1 + 1 == 2);
//!         boost_require!(2 * 2 == 4);
//!     });
//! }
//! ```
//!
//! Threads spawned inside a test body record into the running test only
//! after joining its session with [`SessionId::adopt`] (the id comes from
//! [`current_session`] on the test thread); until then their assertions are
//! detached, and a detached failure panics on that thread.
//!
//! `#[unit_test]` generates `fn main()`; use `#[unit_test(custom_main)]` and
//! call [`default_main`] (or drive a [`Session`] directly) to supply your own.

#![forbid(unsafe_code)]

extern crate self as utcompat;

mod macros;
pub mod translate;

pub use utcompat_engine as engine;
pub use utcompat_engine::{
    AssertionResult, EngineError, ReporterKind, ResultDisposition, ResultWas, RunConfig,
    Session, SessionId, SourceLineInfo, TestCase, TestSpec, Totals, current_session,
    register_exception_translator,
};
pub use utcompat_lock::{LazyGlobal, LockHandle, acquire_global_lock, global_lock};
pub use utcompat_macros::unit_test;

/// Run `cases` with the process command line and return the exit status.
#[must_use]
pub fn default_main(cases: Vec<TestCase>) -> i32 {
    Session::new().run(std::env::args_os(), &cases)
}

/// Everything a legacy-style test module needs.
pub mod prelude {
    pub use crate::{
        boost_auto_test_case, boost_auto_test_suite, boost_auto_test_suite_end, boost_check,
        boost_check_message, boost_check_no_throw, boost_check_require, boost_check_throw,
        boost_check_throws, boost_fail, boost_require, boost_require_no_throw,
        boost_require_throw, boost_require_throws, boost_test_message,
    };
    pub use crate::{TestCase, unit_test};
}
