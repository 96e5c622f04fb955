use parking_lot::Mutex;
use std::{
    future::Future,
    sync::atomic::{AtomicBool, Ordering},
};
use vol_port::types::v0::transport::CompletionResult;

/// Continuation supplied by the caller when constructing an operation.
/// Invoked exactly once with the terminal result, whichever stage produced
/// it.
pub type FinalCallback = Box<dyn FnOnce(CompletionResult) + Send + 'static>;

/// Single-delivery wrapper around an operation's final callback.
pub struct Completer {
    on_finish: Mutex<Option<FinalCallback>>,
}

impl Completer {
    /// Return a new `Self` wrapping the caller's callback.
    pub fn new(on_finish: FinalCallback) -> Self {
        Self {
            on_finish: Mutex::new(Some(on_finish)),
        }
    }

    /// Deliver the terminal result.
    /// A second delivery is a programming error: the result is dropped,
    /// logged and asserted on rather than silently swallowed.
    pub fn complete(&self, result: CompletionResult) {
        let callback = self.on_finish.lock().take();
        match callback {
            Some(callback) => callback(result),
            None => {
                tracing::error!(?result, "terminal result delivered more than once");
                debug_assert!(false, "terminal result delivered more than once");
            }
        }
    }

    /// Whether the terminal result has already been delivered.
    pub fn completed(&self) -> bool {
        self.on_finish.lock().is_none()
    }
}

impl std::fmt::Debug for Completer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Completer")
            .field("completed", &self.completed())
            .finish()
    }
}

/// Bridges an asynchronous remote call into exactly one invocation of the
/// corresponding stage handler. One call may be outstanding at a time per
/// dispatcher; issuing the next call from the code consuming the previous
/// result is the normal way to chain stages.
///
/// A failed call is never retried at this layer: retry policy, if any,
/// belongs to the transport beneath it.
#[derive(Debug, Default)]
pub struct CompletionDispatcher {
    outstanding: AtomicBool,
}

impl CompletionDispatcher {
    /// Drive `call` to completion and hand its result to `handler`, exactly
    /// once.
    pub async fn dispatch<C, R, H, T>(&self, call: C, handler: H) -> T
    where
        C: Future<Output = R> + Send,
        H: FnOnce(R) -> T,
    {
        let registered = self.outstanding.swap(true, Ordering::AcqRel);
        debug_assert!(!registered, "one remote call may be outstanding at a time");
        let result = call.await;
        self.outstanding.store(false, Ordering::Release);
        handler(result)
    }
}
