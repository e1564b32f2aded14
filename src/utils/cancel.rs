use log::info;
use std::fmt;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// One-shot cancellation latch owned by a single monitoring session
///
/// Starts out clear, flips to cancelled exactly once and never resets.
/// Clones share the same latch.
#[derive(Debug, Clone, Default)]
pub struct CancellationLatch {
    inner: Arc<LatchInner>,
}

#[derive(Debug, Default)]
struct LatchInner {
    cancelled: AtomicBool,
    notify: Notify,
}

impl CancellationLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trip the latch. Returns false if it was already tripped.
    pub fn cancel(&self) -> bool {
        let first = !self.inner.cancelled.swap(true, Ordering::SeqCst);
        if first {
            self.inner.notify.notify_waiters();
        }
        first
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once the latch has been tripped
    pub async fn cancelled(&self) {
        let notified = self.inner.notify.notified();
        tokio::pin!(notified);
        // Register before checking the flag so a concurrent cancel is not missed
        notified.as_mut().enable();
        if self.is_cancelled() {
            return;
        }
        notified.await;
    }
}

/// Which process-level request asked the worker to stop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownKind {
    Interrupt,
    Terminate,
}

impl fmt::Display for ShutdownKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShutdownKind::Interrupt => write!(f, "interrupt"),
            ShutdownKind::Terminate => write!(f, "termination request"),
        }
    }
}

/// Interrupt/termination listeners handed to the sampling worker
///
/// Registering them replaces the default "exit immediately" disposition for
/// the rest of the process lifetime, so a signal only trips the session
/// latch and the worker finishes its current sample.
pub struct ShutdownSignals {
    #[cfg(unix)]
    listeners: Option<(
        tokio::signal::unix::Signal,
        tokio::signal::unix::Signal,
    )>,
    #[cfg(windows)]
    listeners: Option<(
        tokio::signal::windows::CtrlC,
        tokio::signal::windows::CtrlBreak,
    )>,
}

impl ShutdownSignals {
    /// Register the listeners. Must be called from within a tokio runtime.
    #[cfg(unix)]
    pub fn install() -> io::Result<Self> {
        use tokio::signal::unix::{SignalKind, signal};
        let interrupt = signal(SignalKind::interrupt())?;
        let terminate = signal(SignalKind::terminate())?;
        info!("Installed SIGINT/SIGTERM handlers for graceful shutdown");
        Ok(Self {
            listeners: Some((interrupt, terminate)),
        })
    }

    /// Register the listeners. Must be called from within a tokio runtime.
    #[cfg(windows)]
    pub fn install() -> io::Result<Self> {
        let interrupt = tokio::signal::windows::ctrl_c()?;
        let terminate = tokio::signal::windows::ctrl_break()?;
        info!("Installed Ctrl-C/Ctrl-Break handlers for graceful shutdown");
        Ok(Self {
            listeners: Some((interrupt, terminate)),
        })
    }

    /// Listeners that never fire
    pub fn disabled() -> Self {
        Self { listeners: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.listeners.is_some()
    }

    /// Wait for the next shutdown request. Pends forever when disabled.
    pub async fn received(&mut self) -> ShutdownKind {
        let Some((interrupt, terminate)) = self.listeners.as_mut() else {
            return std::future::pending().await;
        };
        tokio::select! {
            Some(()) = interrupt.recv() => ShutdownKind::Interrupt,
            Some(()) = terminate.recv() => ShutdownKind::Terminate,
            else => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_latch_trips_once() {
        let latch = CancellationLatch::new();
        assert!(!latch.is_cancelled());
        assert!(latch.cancel());
        assert!(latch.is_cancelled());
        // Later requests are no-ops
        assert!(!latch.cancel());
        assert!(latch.is_cancelled());
    }

    #[test]
    fn test_clones_share_state() {
        let latch = CancellationLatch::new();
        let other = latch.clone();
        other.cancel();
        assert!(latch.is_cancelled());
    }

    #[tokio::test(start_paused = true)]
    async fn test_waiter_wakes_on_cancel() {
        let latch = CancellationLatch::new();
        let waiter = {
            let latch = latch.clone();
            tokio::spawn(async move { latch.cancelled().await })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(!waiter.is_finished());
        latch.cancel();
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter did not wake")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_returns_immediately_when_tripped() {
        let latch = CancellationLatch::new();
        latch.cancel();
        latch.cancelled().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_signals_never_fire() {
        let mut signals = ShutdownSignals::disabled();
        assert!(!signals.is_enabled());
        let result = tokio::time::timeout(Duration::from_secs(5), signals.received()).await;
        assert!(result.is_err());
    }
}
