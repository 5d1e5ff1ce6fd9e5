//! End-to-end tests: legacy macros declared in `#[unit_test]` modules, run
//! through a session, inspected through the JSON report.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use utcompat::{ReporterKind, RunConfig, Session, TestCase, Totals};

#[derive(Debug)]
struct IntError(i32);

#[derive(Debug)]
struct StringError(String);

fn throw_int_error() -> i32 {
    std::panic::panic_any(IntError(7))
}

fn throw_string_error() -> String {
    std::panic::panic_any(StringError("bad".to_string()))
}

static AFTER_SOFT_FAILURE: AtomicBool = AtomicBool::new(false);
static AFTER_HARD_FAILURE: AtomicBool = AtomicBool::new(false);
static AFTER_NESTED_REQUIRE: AtomicBool = AtomicBool::new(false);
static AFTER_FAIL: AtomicBool = AtomicBool::new(false);
static MESSAGE_PREDICATE_RAN: AtomicBool = AtomicBool::new(false);

#[utcompat::unit_test(custom_main)]
mod sample {
    use super::*;
    use utcompat::prelude::*;

    boost_auto_test_case!(check_continues, "soft checks [e2e]", {
        boost_check!(1 + 1 == 2);
        boost_check!(1 + 1 == 3);
        AFTER_SOFT_FAILURE.store(true, Ordering::SeqCst);
    });

    boost_auto_test_case!(require_stops, "[e2e]", {
        boost_require!(false);
        AFTER_HARD_FAILURE.store(true, Ordering::SeqCst);
    });

    boost_auto_test_suite!(typed_throws);

    boost_auto_test_case!(matching_type, "[e2e]", {
        boost_check_throw!(throw_int_error(), IntError);
    });

    boost_auto_test_case!(other_type, "[e2e]", {
        boost_check_throw!(throw_int_error(), StringError);
    });

    boost_auto_test_suite_end!();
}

#[utcompat::unit_test(custom_main)]
mod vocabulary {
    use super::*;
    use utcompat::prelude::*;

    boost_auto_test_case!(throws_any, {
        boost_check_throws!(panic!("expected"));
        boost_check_throws!(throw_string_error());
        boost_check_throws!(1 + 1);
    });

    boost_auto_test_case!(no_throw, {
        boost_check_no_throw!(1 + 1);
        boost_check_no_throw!(throw_int_error());
        boost_require_no_throw!(2 + 2);
    });

    boost_auto_test_case!(hard_throw_forms, {
        boost_require_throws!(throw_string_error());
        boost_require_throw!(throw_int_error(), IntError);
        boost_check_require!(throw_string_error(), StringError);
    });

    boost_auto_test_case!(require_throws_without_panic, {
        boost_require_throws!(0);
        boost_check!(true);
    });

    boost_auto_test_case!(messages, {
        boost_test_message!("iteration {}", 3);
        boost_check_message!(
            {
                MESSAGE_PREDICATE_RAN.store(true, Ordering::SeqCst);
                false
            },
            "predicate {}",
            "ignored"
        );
        boost_check!(false);
    });

    boost_auto_test_case!(explicit_failure, {
        boost_fail!("giving up after {} tries", 2);
        AFTER_FAIL.store(true, Ordering::SeqCst);
    });

    boost_auto_test_case!(nested_require, {
        boost_check!({
            boost_require!(1 == 2);
            true
        });
        AFTER_NESTED_REQUIRE.store(true, Ordering::SeqCst);
    });

    boost_auto_test_case!(panicking_check, {
        boost_check!(throw_int_error() == 7);
        boost_check!(true);
    });
}

#[utcompat::unit_test(custom_main)]
mod suites {
    use utcompat::prelude::*;

    boost_auto_test_suite!(same);
    boost_auto_test_case!(case, { boost_check!(true); });
    boost_auto_test_suite_end!();

    boost_auto_test_suite!(same);
    boost_auto_test_case!(case, { boost_check!(true); });
    boost_auto_test_suite!(inner);
    boost_auto_test_case!(deep, "[.hidden]", { boost_check!(true); });
    boost_auto_test_suite_end!();
    boost_auto_test_suite_end!();
}

#[derive(Clone, Default)]
struct Shared(Arc<Mutex<Vec<u8>>>);

impl Write for Shared {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn run_json(config: RunConfig, cases: &[TestCase]) -> (Totals, serde_json::Value) {
    let buf = Shared::default();
    let totals = Session::new()
        .with_output(Box::new(buf.clone()))
        .run_with_config(&config.with_reporter(ReporterKind::Json), cases)
        .expect("session runs");
    let text = String::from_utf8_lossy(&buf.0.lock()).into_owned();
    (totals, serde_json::from_str(&text).expect("JSON report"))
}

fn case<'a>(report: &'a serde_json::Value, name: &str) -> &'a serde_json::Value {
    report["test_cases"]
        .as_array()
        .and_then(|cases| cases.iter().find(|c| c["name"] == name))
        .unwrap_or_else(|| panic!("test case {name} in report"))
}

fn counts(report: &serde_json::Value, name: &str) -> (u64, u64) {
    let a = &case(report, name)["assertions"];
    (
        a["passed"].as_u64().unwrap_or_default(),
        a["failed"].as_u64().unwrap_or_default(),
    )
}

fn result_types(report: &serde_json::Value, name: &str) -> Vec<String> {
    case(report, name)["results"]
        .as_array()
        .map(|results| {
            results
                .iter()
                .filter_map(|r| r["result_type"].as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[test]
fn end_to_end_sample() {
    let cases = sample::registered_test_cases();
    let names: Vec<&str> = cases.iter().map(TestCase::name).collect();
    assert_eq!(
        names,
        ["check_continues", "require_stops", "matching_type", "other_type"]
    );

    let (totals, report) = run_json(RunConfig::default(), &cases);

    assert_eq!(counts(&report, "check_continues"), (1, 1));
    assert!(AFTER_SOFT_FAILURE.load(Ordering::SeqCst));

    assert_eq!(counts(&report, "require_stops"), (0, 1));
    assert!(!AFTER_HARD_FAILURE.load(Ordering::SeqCst));

    assert_eq!(counts(&report, "matching_type"), (1, 0));
    assert_eq!(counts(&report, "other_type"), (0, 1));
    assert_eq!(result_types(&report, "other_type"), ["threw_exception"]);
    let typed = &case(&report, "other_type")["results"][0]["info"];
    assert_eq!(typed["macro_name"], "CHECK_THROWS_AS");
    assert_eq!(typed["captured_expression"], "throw_int_error()");

    assert_eq!(totals.assertions.passed, 2);
    assert_eq!(totals.assertions.failed, 3);
    assert_eq!(totals.test_cases.passed, 1);
    assert_eq!(totals.exit_code(), 3);

    let check = &case(&report, "check_continues");
    assert_eq!(check["description"], "soft checks");
    assert_eq!(check["tags"][0], "e2e");
    let failure = &check["results"][0];
    assert_eq!(failure["info"]["macro_name"], "CHECK");
    assert_eq!(failure["info"]["captured_expression"], "1 + 1 == 3");
    assert_eq!(failure["info"]["line_info"]["file"], file!());
}

#[test]
fn full_vocabulary() {
    let (totals, report) = run_json(RunConfig::default(), &vocabulary::registered_test_cases());

    assert_eq!(counts(&report, "throws_any"), (2, 1));
    assert_eq!(
        result_types(&report, "throws_any"),
        ["didnt_throw_exception"]
    );

    assert_eq!(counts(&report, "no_throw"), (2, 1));
    assert_eq!(result_types(&report, "no_throw"), ["threw_exception"]);

    assert_eq!(counts(&report, "hard_throw_forms"), (3, 0));

    // The hard throws failure stops the body before the trailing check.
    assert_eq!(counts(&report, "require_throws_without_panic"), (0, 1));

    // Messages never count as assertions; the predicate is not evaluated.
    assert_eq!(counts(&report, "messages"), (0, 1));
    assert!(!MESSAGE_PREDICATE_RAN.load(Ordering::SeqCst));
    let infos: Vec<&str> = case(&report, "messages")["results"][0]["info_messages"]
        .as_array()
        .map(|m| m.iter().filter_map(|i| i["message"].as_str()).collect())
        .unwrap_or_default();
    assert_eq!(infos, ["iteration 3", "predicate ignored"]);

    assert_eq!(counts(&report, "explicit_failure"), (0, 1));
    assert_eq!(
        case(&report, "explicit_failure")["results"][0]["message"],
        "giving up after 2 tries"
    );
    assert!(!AFTER_FAIL.load(Ordering::SeqCst));

    // Only the inner require is recorded; its abort is not swallowed by the
    // enclosing check.
    assert_eq!(counts(&report, "nested_require"), (0, 1));
    assert_eq!(
        case(&report, "nested_require")["results"][0]["info"]["macro_name"],
        "REQUIRE"
    );
    assert!(!AFTER_NESTED_REQUIRE.load(Ordering::SeqCst));

    // A panicking soft check is recorded and the body continues.
    assert_eq!(counts(&report, "panicking_check"), (1, 1));

    assert_eq!(totals.assertions.failed, 7);
}

#[test]
fn nothrow_skips_throws_assertions() {
    let config = RunConfig::default().with_no_throw(true);
    let cases = vocabulary::registered_test_cases();
    let (_, report) = run_json(config, &cases);

    // Every throws-style form passes without evaluating.
    assert_eq!(counts(&report, "throws_any"), (3, 0));
    assert_eq!(counts(&report, "require_throws_without_panic"), (2, 0));
    // No-throw forms are still evaluated.
    assert_eq!(counts(&report, "no_throw"), (2, 1));
}

#[test]
fn same_named_suites_are_distinct_modules() {
    let first = suites::boost_catch_auto_test_suite_0::case();
    let second = suites::boost_catch_auto_test_suite_1::case();
    assert_eq!(first.name(), second.name());
    assert_ne!(first.info.line_info, second.info.line_info);

    let deep = suites::boost_catch_auto_test_suite_1::boost_catch_auto_test_suite_2::deep();
    assert!(deep.info.is_hidden());
    assert_eq!(suites::registered_test_cases().len(), 3);
}

#[test]
fn hidden_cases_are_skipped_unless_named() {
    let cases = suites::registered_test_cases();
    let (totals, _) = run_json(RunConfig::default(), &cases);
    assert_eq!(totals.test_cases.total(), 2);

    let spec = utcompat::TestSpec::parse(&["deep"]);
    let (totals, _) = run_json(RunConfig::default().with_test_spec(spec), &cases);
    assert_eq!(totals.test_cases.total(), 1);
    assert_eq!(totals.assertions.passed, 1);
}

#[test]
fn session_exit_status_counts_failures() {
    let code = Session::new()
        .with_output(Box::new(std::io::sink()))
        .run(["sample", "*_stops"], &sample::registered_test_cases());
    assert_eq!(code, 1);

    let code = Session::new()
        .with_output(Box::new(std::io::sink()))
        .run(["sample", "--list-tests"], &sample::registered_test_cases());
    assert_eq!(code, 0);
}
