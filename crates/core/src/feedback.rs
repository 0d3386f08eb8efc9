//! Cooperative cancellation and progress reporting.
//!
//! A [`Feedback`] is handed explicitly to long-running operations. It never
//! interrupts anything: callers poll [`Feedback::is_canceled`] between units
//! of work.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

type ProgressFn = Box<dyn Fn(f64) + Send + Sync>;

/// Per-run feedback channel: a cancellation token plus an optional
/// progress callback receiving percentages in `0.0..=100.0`.
#[derive(Default)]
pub struct Feedback {
    token: CancellationToken,
    progress: Option<ProgressFn>,
}

impl Feedback {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use an externally owned token (e.g. one shared with a UI thread).
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn with_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.progress = Some(Box::new(callback));
        self
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    pub fn is_canceled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn set_progress(&self, percent: f64) {
        if let Some(cb) = &self.progress {
            cb(percent.clamp(0.0, 100.0));
        }
    }
}

impl fmt::Debug for Feedback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Feedback")
            .field("token", &self.token)
            .field("progress", &self.progress.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn test_token_shared_between_clones() {
        let token = CancellationToken::new();
        let feedback = Feedback::new().with_cancellation(token.clone());
        assert!(!feedback.is_canceled());
        token.cancel();
        assert!(feedback.is_canceled());
    }

    #[test]
    fn test_progress_is_clamped() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let feedback = Feedback::new().with_progress(move |p| sink.lock().unwrap().push(p));

        feedback.set_progress(-5.0);
        feedback.set_progress(50.0);
        feedback.set_progress(250.0);

        assert_eq!(*seen.lock().unwrap(), vec![0.0, 50.0, 100.0]);
    }

    #[test]
    fn test_progress_without_callback_is_noop() {
        Feedback::new().set_progress(10.0);
    }
}
