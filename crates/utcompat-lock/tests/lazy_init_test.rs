//! Concurrent first-use of the lazy global cell.
//!
//! Run: cargo test -p utcompat-lock --test lazy_init_test

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};

use parking_lot::Mutex;
use utcompat_lock::{LazyGlobal, acquire_global_lock, global_lock};

const THREADS: usize = 16;

static CONSTRUCTIONS: AtomicUsize = AtomicUsize::new(0);

fn counted_mutex() -> Mutex<u64> {
    CONSTRUCTIONS.fetch_add(1, Ordering::SeqCst);
    // Widen the construction window so losers really do observe INITIALIZING.
    std::thread::sleep(std::time::Duration::from_millis(20));
    Mutex::new(0)
}

static COUNTED: LazyGlobal<Mutex<u64>> = LazyGlobal::new(counted_mutex);

#[test]
fn concurrent_first_access_constructs_exactly_once() {
    let barrier = Arc::new(Barrier::new(THREADS));
    let in_section = Arc::new(AtomicBool::new(false));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let in_section = Arc::clone(&in_section);
            std::thread::spawn(move || {
                barrier.wait();
                let mutex: *const Mutex<u64> = COUNTED.get();
                let mut guard = COUNTED.get().lock();
                assert!(
                    !in_section.swap(true, Ordering::SeqCst),
                    "two threads inside the critical section"
                );
                *guard += 1;
                in_section.store(false, Ordering::SeqCst);
                mutex as usize
            })
        })
        .collect();

    let addrs: Vec<usize> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread"))
        .collect();

    assert_eq!(CONSTRUCTIONS.load(Ordering::SeqCst), 1);
    assert!(addrs.windows(2).all(|w| w[0] == w[1]), "addrs={addrs:?}");
    assert_eq!(*COUNTED.get().lock(), THREADS as u64);
}

#[test]
fn global_lock_serializes_threads() {
    let barrier = Arc::new(Barrier::new(THREADS));
    let in_section = Arc::new(AtomicBool::new(false));
    let entries = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let barrier = Arc::clone(&barrier);
            let in_section = Arc::clone(&in_section);
            let entries = Arc::clone(&entries);
            std::thread::spawn(move || {
                barrier.wait();
                for _ in 0..100 {
                    let _handle = acquire_global_lock();
                    assert!(!in_section.swap(true, Ordering::SeqCst));
                    entries.fetch_add(1, Ordering::SeqCst);
                    in_section.store(false, Ordering::SeqCst);
                }
                global_lock() as *const _ as usize
            })
        })
        .collect();

    let addrs: Vec<usize> = handles
        .into_iter()
        .map(|h| h.join().expect("worker thread"))
        .collect();

    assert!(addrs.windows(2).all(|w| w[0] == w[1]));
    assert_eq!(entries.load(Ordering::SeqCst), THREADS * 100);
}
