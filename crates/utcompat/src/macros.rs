//! The legacy assertion and test-declaration vocabulary.
//!
//! | Macro | Host assertion | On failure |
//! |---|---|---|
//! | [`boost_check!`] | `CHECK` | record, continue |
//! | [`boost_require!`] | `REQUIRE` | record, abort test |
//! | [`boost_check_throws!`] | `CHECK_THROWS` | record, continue |
//! | [`boost_require_throws!`] | `REQUIRE_THROWS` | record, abort test |
//! | [`boost_check_throw!`] | `CHECK_THROWS_AS` | record, continue |
//! | [`boost_check_require!`], [`boost_require_throw!`] | `REQUIRE_THROWS_AS` | record, abort test |
//! | [`boost_check_no_throw!`] | `CHECK_NOTHROW` | record, continue |
//! | [`boost_require_no_throw!`] | `REQUIRE_NOTHROW` | record, abort test |
//! | [`boost_test_message!`], [`boost_check_message!`] | `INFO` | n/a |
//! | [`boost_fail!`] | `FAIL` | always fails, abort test |

#[doc(hidden)]
#[macro_export]
macro_rules! __source_line {
    () => {
        $crate::SourceLineInfo::new(::core::file!(), ::core::line!())
    };
}

/// Soft boolean check: a false (or panicking) expression is recorded and the
/// test keeps running.
#[macro_export]
macro_rules! boost_check {
    ($e:expr $(,)?) => {
        $crate::translate::assert_that(
            "CHECK",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::ContinueOnFailure,
            || $e,
        )
    };
}

/// Hard boolean check: a false (or panicking) expression is recorded and the
/// rest of the test body is skipped.
#[macro_export]
macro_rules! boost_require {
    ($e:expr $(,)?) => {
        $crate::translate::assert_that(
            "REQUIRE",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::Normal,
            || $e,
        )
    };
}

/// Passes if evaluating the expression panics.
#[macro_export]
macro_rules! boost_check_throws {
    ($e:expr $(,)?) => {
        $crate::translate::expect_throws(
            "CHECK_THROWS",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::ContinueOnFailure,
            || {
                let _ = $e;
            },
        )
    };
}

/// Hard variant of [`boost_check_throws!`].
#[macro_export]
macro_rules! boost_require_throws {
    ($e:expr $(,)?) => {
        $crate::translate::expect_throws(
            "REQUIRE_THROWS",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::Normal,
            || {
                let _ = $e;
            },
        )
    };
}

/// Passes if evaluating the expression panics with a payload of type `$t`
/// (raised with `std::panic::panic_any`).
#[macro_export]
macro_rules! boost_check_throw {
    ($e:expr, $t:ty $(,)?) => {
        $crate::translate::expect_throws_as::<$t, _>(
            "CHECK_THROWS_AS",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::ContinueOnFailure,
            || {
                let _ = $e;
            },
        )
    };
}

/// Hard typed throws check.
#[macro_export]
macro_rules! boost_check_require {
    ($e:expr, $t:ty $(,)?) => {
        $crate::translate::expect_throws_as::<$t, _>(
            "REQUIRE_THROWS_AS",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::Normal,
            || {
                let _ = $e;
            },
        )
    };
}

/// Same as [`boost_check_require!`].
#[macro_export]
macro_rules! boost_require_throw {
    ($e:expr, $t:ty $(,)?) => {
        $crate::boost_check_require!($e, $t)
    };
}

/// Passes if evaluating the expression does not panic.
#[macro_export]
macro_rules! boost_check_no_throw {
    ($e:expr $(,)?) => {
        $crate::translate::expect_no_throw(
            "CHECK_NOTHROW",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::ContinueOnFailure,
            || {
                let _ = $e;
            },
        )
    };
}

/// Hard variant of [`boost_check_no_throw!`].
#[macro_export]
macro_rules! boost_require_no_throw {
    ($e:expr $(,)?) => {
        $crate::translate::expect_no_throw(
            "REQUIRE_NOTHROW",
            $crate::__source_line!(),
            ::core::stringify!($e),
            $crate::ResultDisposition::Normal,
            || {
                let _ = $e;
            },
        )
    };
}

/// Attach a `format!`-style message to the running test.
#[macro_export]
macro_rules! boost_test_message {
    ($($arg:tt)+) => {
        $crate::translate::message("INFO", $crate::__source_line!(), ::std::format!($($arg)+))
    };
}

/// Attach a message to the running test.
///
/// The predicate is type-checked but never evaluated and does not affect the
/// outcome; only the message is recorded.
#[macro_export]
macro_rules! boost_check_message {
    ($p:expr, $($arg:tt)+) => {{
        let _unevaluated = || $p;
        $crate::translate::message("INFO", $crate::__source_line!(), ::std::format!($($arg)+))
    }};
}

/// Fail the running test with a `format!`-style message.
#[macro_export]
macro_rules! boost_fail {
    ($($arg:tt)+) => {
        $crate::translate::fail($crate::__source_line!(), &::std::format!($($arg)+))
    };
}

/// Declare a test case.
///
/// Expands to `pub fn $name() -> TestCase`. The description may carry
/// `[tag]` groups.
///
/// ```ignore
/// boost_auto_test_case!(parses_numbers, "number parsing [parser]", {
///     boost_check!("42".parse::<u32>().is_ok());
/// });
/// ```
#[macro_export]
macro_rules! boost_auto_test_case {
    ($name:ident, $description:literal, $body:block $(,)?) => {
        #[allow(dead_code)]
        pub fn $name() -> $crate::TestCase {
            fn body() $body
            $crate::TestCase::new(
                ::core::stringify!($name),
                $description,
                $crate::__source_line!(),
                body,
            )
        }
    };
    ($name:ident, $body:block $(,)?) => {
        $crate::boost_auto_test_case!($name, "", $body);
    };
}

/// Open a test suite. Only valid inside a `#[utcompat::unit_test]` module,
/// which rewrites it together with the matching [`boost_auto_test_suite_end!`].
#[macro_export]
macro_rules! boost_auto_test_suite {
    ($($tokens:tt)*) => {
        ::core::compile_error!(
            "boost_auto_test_suite! must be used inside a #[utcompat::unit_test] module"
        );
    };
}

/// Close the innermost open test suite. Only valid inside a
/// `#[utcompat::unit_test]` module.
#[macro_export]
macro_rules! boost_auto_test_suite_end {
    ($($tokens:tt)*) => {
        ::core::compile_error!(
            "boost_auto_test_suite_end! must be used inside a #[utcompat::unit_test] module"
        );
    };
}
