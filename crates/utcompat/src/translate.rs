//! Translation of legacy assertions onto the host engine.
//!
//! Each function performs one complete assertion while holding the global
//! lock: start a [`ResultBuilder`], evaluate the expression under
//! [`capture_unwind`], record the outcome, react. The lock handle is a scoped
//! guard, so it is released on every exit path including the unwind a failed
//! hard assertion starts.
//!
//! The engine's own test-abort signal coming out of an evaluated expression
//! (a nested hard assertion failed) is never recorded here; it keeps
//! unwinding with its original payload.

use std::any::Any;
use std::fmt::Write as _;

use utcompat_engine::{
    CapturedPanic, ResultBuilder, ResultDisposition, ResultWas, SourceLineInfo, add_info_message,
    capture_unwind,
};
use utcompat_lock::acquire_global_lock;

fn record_unexpected(builder: &mut ResultBuilder, panic: CapturedPanic, disposition: ResultDisposition) {
    if panic.is_test_aborted() {
        panic.resume();
    }
    builder.use_active_exception(&panic, disposition);
}

/// Boolean assertion (`CHECK`, `REQUIRE`).
///
/// Passes iff `predicate` returns true. A panic while evaluating is recorded
/// as an unexpected exception under the same disposition.
pub fn assert_that(
    macro_name: &'static str,
    line_info: SourceLineInfo,
    expression: &'static str,
    disposition: ResultDisposition,
    predicate: impl FnOnce() -> bool,
) {
    let _lock = acquire_global_lock();
    let mut builder = ResultBuilder::new(macro_name, line_info, expression, disposition);
    match capture_unwind(predicate) {
        Ok(value) => builder.capture_expression(value),
        Err(panic) => record_unexpected(&mut builder, panic, disposition),
    }
    builder.react();
}

/// Expect-throws assertion (`CHECK_THROWS`, `REQUIRE_THROWS`).
///
/// Passes iff `f` panics. Skipped (recorded as a pass) when the run does not
/// allow throws.
pub fn expect_throws<R>(
    macro_name: &'static str,
    line_info: SourceLineInfo,
    expression: &'static str,
    disposition: ResultDisposition,
    f: impl FnOnce() -> R,
) {
    let _lock = acquire_global_lock();
    let mut builder = ResultBuilder::new(macro_name, line_info, expression, disposition);
    if builder.allow_throws() {
        match capture_unwind(f) {
            Ok(_) => builder.capture_result(ResultWas::DidntThrowException),
            Err(panic) if panic.is_test_aborted() => panic.resume(),
            Err(_) => builder.capture_result(ResultWas::Ok),
        }
    }
    builder.react();
}

/// Typed expect-throws assertion (`CHECK_THROWS_AS`, `REQUIRE_THROWS_AS`).
///
/// Passes iff `f` panics with a payload of type `E`. Any other payload is
/// recorded as an unexpected exception; no panic at all is a failure.
pub fn expect_throws_as<E: Any, R>(
    macro_name: &'static str,
    line_info: SourceLineInfo,
    expression: &'static str,
    disposition: ResultDisposition,
    f: impl FnOnce() -> R,
) {
    let _lock = acquire_global_lock();
    let mut builder = ResultBuilder::new(macro_name, line_info, expression, disposition);
    if builder.allow_throws() {
        match capture_unwind(f) {
            Ok(_) => builder.capture_result(ResultWas::DidntThrowException),
            Err(panic) if panic.is::<E>() => builder.capture_result(ResultWas::Ok),
            Err(panic) => record_unexpected(&mut builder, panic, disposition),
        }
    }
    builder.react();
}

/// No-throw assertion (`CHECK_NOTHROW`, `REQUIRE_NOTHROW`).
pub fn expect_no_throw<R>(
    macro_name: &'static str,
    line_info: SourceLineInfo,
    expression: &'static str,
    disposition: ResultDisposition,
    f: impl FnOnce() -> R,
) {
    let _lock = acquire_global_lock();
    let mut builder = ResultBuilder::new(macro_name, line_info, expression, disposition);
    match capture_unwind(f) {
        Ok(_) => builder.capture_result(ResultWas::Ok),
        Err(panic) => record_unexpected(&mut builder, panic, disposition),
    }
    builder.react();
}

/// Informational message (`INFO`) attached to the running test.
pub fn message(macro_name: &'static str, line_info: SourceLineInfo, text: String) {
    let _lock = acquire_global_lock();
    add_info_message(macro_name, line_info, text);
}

/// Explicit hard failure (`FAIL`).
pub fn fail(line_info: SourceLineInfo, text: &str) {
    let _lock = acquire_global_lock();
    let mut builder = ResultBuilder::new("FAIL", line_info, "", ResultDisposition::Normal);
    let _ = builder.write_str(text);
    builder.capture_result(ResultWas::ExplicitFailure);
    builder.react();
}
