//! Many threads asserting at once inside one running test.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use utcompat::{RunConfig, Session, SessionId, TestCase, Totals, current_session};

const THREADS: usize = 8;
const CHECKS_PER_THREAD: usize = 1000;

static IN_EXPRESSION: AtomicBool = AtomicBool::new(false);
static OVERLAPS: AtomicUsize = AtomicUsize::new(0);
static AFTER_WORKER_REQUIRE: AtomicBool = AtomicBool::new(false);

/// Evaluated inside an assertion; notices if another thread is evaluating
/// an assertion at the same time.
fn exclusive(value: usize) -> bool {
    if IN_EXPRESSION.swap(true, Ordering::SeqCst) {
        OVERLAPS.fetch_add(1, Ordering::SeqCst);
    }
    std::hint::spin_loop();
    IN_EXPRESSION.store(false, Ordering::SeqCst);
    value < THREADS * CHECKS_PER_THREAD
}

#[utcompat::unit_test(custom_main)]
mod stress {
    use super::*;
    use utcompat::prelude::*;

    boost_auto_test_case!(every_check_is_counted, {
        let session = current_session();
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                scope.spawn(move || {
                    let _session = session.map(SessionId::adopt);
                    for i in 0..CHECKS_PER_THREAD {
                        boost_check!(exclusive(t * CHECKS_PER_THREAD + i));
                    }
                });
            }
        });
    });

    boost_auto_test_case!(mixed_outcomes, {
        let session = current_session();
        std::thread::scope(|scope| {
            for t in 0..THREADS {
                scope.spawn(move || {
                    let _session = session.map(SessionId::adopt);
                    for i in 0..CHECKS_PER_THREAD {
                        boost_check!((t + i) % 2 == 0);
                    }
                });
            }
        });
    });

    boost_auto_test_case!(worker_require_fails_once, {
        let session = current_session();
        std::thread::scope(|scope| {
            scope.spawn(move || {
                let _session = session.map(SessionId::adopt);
                boost_require!(1 == 2);
            });
        });
        AFTER_WORKER_REQUIRE.store(true, Ordering::SeqCst);
    });
}

fn run(name: &str) -> Totals {
    let cases: Vec<TestCase> = stress::registered_test_cases()
        .into_iter()
        .filter(|case| case.name() == name)
        .collect();
    Session::new()
        .with_output(Box::new(std::io::sink()))
        .run_with_config(&RunConfig::default(), &cases)
        .expect("session runs")
}

#[test]
fn concurrent_checks_are_tallied_exactly() {
    let totals = run("every_check_is_counted");
    assert_eq!(totals.assertions.passed, (THREADS * CHECKS_PER_THREAD) as u64);
    assert_eq!(totals.assertions.failed, 0);
    assert_eq!(totals.test_cases.passed, 1);
    assert_eq!(OVERLAPS.load(Ordering::SeqCst), 0);
}

#[test]
fn concurrent_failures_are_tallied_and_capped_in_status() {
    let totals = run("mixed_outcomes");
    let half = (THREADS * CHECKS_PER_THREAD / 2) as u64;
    assert_eq!(totals.assertions.passed, half);
    assert_eq!(totals.assertions.failed, half);
    assert_eq!(totals.test_cases.failed, 1);
    assert_eq!(totals.exit_code(), utcompat::engine::MAX_EXIT_CODE);
}

#[test]
fn hard_failure_on_a_worker_is_recorded_once() {
    let totals = run("worker_require_fails_once");
    assert_eq!(totals.assertions.failed, 1);
    assert_eq!(totals.assertions.passed, 0);
    assert_eq!(totals.test_cases.failed, 1);
    assert!(!AFTER_WORKER_REQUIRE.load(Ordering::SeqCst));
}
