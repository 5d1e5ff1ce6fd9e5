//! Panic capture and translation.
//!
//! Panics play the role of exceptions: evaluating an asserted expression
//! under [`capture_unwind`] turns a panic into a [`CapturedPanic`] instead of
//! unwinding further. The engine's own test-abort signal is a
//! [`TestAborted`] payload raised with `resume_unwind`, which never reaches
//! the panic hook.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::panic::AssertUnwindSafe;
use std::sync::Once;

use parking_lot::RwLock;

/// Unwind payload used to abort the running test after a hard failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestAborted;

/// Unwind the current test body with the abort signal.
pub fn raise_test_aborted() -> ! {
    std::panic::resume_unwind(Box::new(TestAborted))
}

/// A panic caught by [`capture_unwind`].
pub struct CapturedPanic {
    payload: Box<dyn Any + Send>,
    message: String,
    location: Option<String>,
}

impl CapturedPanic {
    fn new(payload: Box<dyn Any + Send>, location: Option<String>) -> Self {
        let message = translate_payload(payload.as_ref());
        Self {
            payload,
            message,
            location,
        }
    }

    /// Returns true if the payload is a value of type `T`.
    #[must_use]
    pub fn is<T: Any>(&self) -> bool {
        self.payload.is::<T>()
    }

    /// Returns true if this is the engine's test-abort signal.
    #[must_use]
    pub fn is_test_aborted(&self) -> bool {
        self.is::<TestAborted>()
    }

    /// Translated, human-readable panic message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// `file:line` of the panic site, if the hook saw it.
    #[must_use]
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send) {
        self.payload.as_ref()
    }

    /// Give the payload back, e.g. to continue unwinding with it.
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any + Send> {
        self.payload
    }

    /// Continue unwinding with the original payload.
    pub fn resume(self) -> ! {
        std::panic::resume_unwind(self.payload)
    }
}

impl std::fmt::Debug for CapturedPanic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapturedPanic")
            .field("message", &self.message)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

thread_local! {
    static QUIET_DEPTH: Cell<u32> = const { Cell::new(0) };
    static LAST_LOCATION: RefCell<Option<String>> = const { RefCell::new(None) };
}

static HOOK_INSTALLED: Once = Once::new();

/// Install the process-wide panic hook that silences captured panics.
///
/// Panics on threads that are not inside [`capture_unwind`] are forwarded to
/// whatever hook was installed before.
pub fn install_quiet_hook() {
    HOOK_INSTALLED.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            if QUIET_DEPTH.with(Cell::get) > 0 {
                let location = info
                    .location()
                    .map(|loc| format!("{}:{}", loc.file(), loc.line()));
                LAST_LOCATION.with(|slot| *slot.borrow_mut() = location);
            } else {
                previous(info);
            }
        }));
    });
}

struct QuietScope;

impl QuietScope {
    fn enter() -> Self {
        QUIET_DEPTH.with(|depth| depth.set(depth.get() + 1));
        Self
    }
}

impl Drop for QuietScope {
    fn drop(&mut self) {
        QUIET_DEPTH.with(|depth| depth.set(depth.get().saturating_sub(1)));
    }
}

/// Run `f`, converting a panic into a [`CapturedPanic`].
pub fn capture_unwind<R>(f: impl FnOnce() -> R) -> Result<R, CapturedPanic> {
    install_quiet_hook();
    let scope = QuietScope::enter();
    LAST_LOCATION.with(|slot| slot.borrow_mut().take());
    let outcome = std::panic::catch_unwind(AssertUnwindSafe(f));
    drop(scope);

    outcome.map_err(|payload| {
        let location = LAST_LOCATION.with(|slot| slot.borrow_mut().take());
        CapturedPanic::new(payload, location)
    })
}

type Translator = Box<dyn Fn(&(dyn Any + Send)) -> Option<String> + Send + Sync>;

static TRANSLATORS: RwLock<Vec<Translator>> = parking_lot::const_rwlock(Vec::new());

/// Teach the engine how to render panic payloads of type `T`.
///
/// Translators are consulted in registration order before the built-in
/// string payload handling.
pub fn register_exception_translator<T: Any>(render: fn(&T) -> String) {
    TRANSLATORS
        .write()
        .push(Box::new(move |payload: &(dyn Any + Send)| {
            payload.downcast_ref::<T>().map(render)
        }));
}

/// Render a panic payload as text.
#[must_use]
pub fn translate_payload(payload: &(dyn Any + Send)) -> String {
    if let Some(text) = TRANSLATORS
        .read()
        .iter()
        .find_map(|translate| translate(payload))
    {
        return text;
    }
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    if let Some(s) = payload.downcast_ref::<String>() {
        return s.clone();
    }
    if payload.is::<TestAborted>() {
        return "test aborted".to_string();
    }
    "unknown panic payload".to_string()
}
