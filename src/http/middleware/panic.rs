//! Panic payload inspection and panic-site backtraces.

use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::RefCell;
use std::io;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Once;

/// Substrings identifying a peer that went away mid-request.
const CONNECTION_ABORT_MARKERS: [&str; 2] = ["broken pipe", "connection reset by peer"];

static CAPTURE_ENABLED: AtomicBool = AtomicBool::new(false);
static INSTALL_HOOK: Once = Once::new();

thread_local! {
    static LAST_BACKTRACE: RefCell<Option<String>> = const { RefCell::new(None) };
}

/// How a recovered panic is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanicKind {
    /// The client connection is gone; nothing can be written back.
    ConnectionAbort,
    /// Any other failure.
    Generic,
}

/// Classify a panic payload.
///
/// `io::Error` payloads are classified by kind; everything else falls back
/// to a case-insensitive match on the payload text.
pub fn classify(payload: &(dyn Any + Send)) -> PanicKind {
    if let Some(err) = payload.downcast_ref::<io::Error>() {
        if matches!(
            err.kind(),
            io::ErrorKind::BrokenPipe | io::ErrorKind::ConnectionReset
        ) {
            return PanicKind::ConnectionAbort;
        }
    }

    if is_connection_abort_text(&panic_message(payload)) {
        PanicKind::ConnectionAbort
    } else {
        PanicKind::Generic
    }
}

pub fn is_connection_abort_text(text: &str) -> bool {
    let text = text.to_lowercase();
    CONNECTION_ABORT_MARKERS.iter().any(|marker| text.contains(marker))
}

/// Render a panic payload as text.
pub fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(err) = payload.downcast_ref::<io::Error>() {
        err.to_string()
    } else if let Some(err) = payload.downcast_ref::<Box<dyn std::error::Error + Send + Sync>>() {
        err.to_string()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Start recording a backtrace of every panic on the panicking thread.
///
/// Installs a hook that chains to the previously installed one. Idempotent.
pub fn enable_backtrace_capture() {
    CAPTURE_ENABLED.store(true, Ordering::Relaxed);
    INSTALL_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_ENABLED.load(Ordering::Relaxed) {
                let trace = Backtrace::force_capture().to_string();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(trace));
            }
            previous(info);
        }));
    });
}

/// Take the backtrace recorded for the last panic on this thread.
pub fn take_backtrace() -> Option<String> {
    LAST_BACKTRACE.with(|slot| slot.borrow_mut().take())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload<T: Any + Send>(value: T) -> Box<dyn Any + Send> {
        Box::new(value)
    }

    #[test]
    fn test_classify_io_error_kinds() {
        let broken = payload(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"));
        let reset = payload(io::Error::from(io::ErrorKind::ConnectionReset));
        let other = payload(io::Error::new(io::ErrorKind::Other, "disk full"));

        assert_eq!(classify(&*broken), PanicKind::ConnectionAbort);
        assert_eq!(classify(&*reset), PanicKind::ConnectionAbort);
        assert_eq!(classify(&*other), PanicKind::Generic);
    }

    #[test]
    fn test_classify_text_fallback() {
        let reset = payload("write tcp 10.0.0.1:80: Connection Reset By Peer");
        let broken = payload(String::from("writev: BROKEN PIPE"));
        let plain = payload("index out of bounds");

        assert_eq!(classify(&*reset), PanicKind::ConnectionAbort);
        assert_eq!(classify(&*broken), PanicKind::ConnectionAbort);
        assert_eq!(classify(&*plain), PanicKind::Generic);
    }

    #[test]
    fn test_panic_message() {
        assert_eq!(panic_message(&*payload("boom")), "boom");
        assert_eq!(panic_message(&*payload(String::from("kaboom"))), "kaboom");
        assert_eq!(panic_message(&*payload(42u8)), "unknown panic payload");
    }

    #[test]
    fn test_backtrace_recorded_at_panic_site() {
        enable_backtrace_capture();
        let _ = take_backtrace();

        let result = panic::catch_unwind(|| {
            panic!("traced");
        });
        assert!(result.is_err());

        let trace = take_backtrace().expect("hook should record a backtrace");
        assert!(!trace.is_empty());
        assert!(take_backtrace().is_none());
    }
}
