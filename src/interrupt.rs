//! Cooperative cancellation
//!
//! `Running -> InterruptRequested -> Stopping -> Stopped`
//!
//! The console handler only flips the state and wakes the supervising
//! thread; the notice line and the engine stop request are issued by the
//! supervisor in normal execution context.

use crate::error::{ExtractError, Result};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use tracing::{debug, warn};

/// Lifecycle of one run with respect to cancellation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptState {
    Running = 0,
    InterruptRequested = 1,
    Stopping = 2,
    Stopped = 3,
}

impl InterruptState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => InterruptState::Running,
            1 => InterruptState::InterruptRequested,
            2 => InterruptState::Stopping,
            _ => InterruptState::Stopped,
        }
    }
}

/// Atomic interrupt state plus a single wake-up channel
#[derive(Debug)]
pub struct InterruptController {
    state: AtomicU8,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
    handler_installed: AtomicBool,
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptController {
    pub fn new() -> Self {
        // one slot: only the first request ever sends
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            state: AtomicU8::new(InterruptState::Running as u8),
            wake_tx,
            wake_rx,
            handler_installed: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> InterruptState {
        InterruptState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Ask the run to stop. Returns true only for the first request.
    pub fn request(&self) -> bool {
        let transitioned = self
            .state
            .compare_exchange(
                InterruptState::Running as u8,
                InterruptState::InterruptRequested as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();

        if transitioned {
            let _ = self.wake_tx.try_send(());
        }
        transitioned
    }

    pub fn is_requested(&self) -> bool {
        self.state() != InterruptState::Running
    }

    /// Receiver that fires once when an interrupt is requested
    pub fn wakeups(&self) -> &Receiver<()> {
        &self.wake_rx
    }

    /// Supervisor has forwarded the request to the engine
    pub fn begin_stopping(&self) {
        let _ = self.state.compare_exchange(
            InterruptState::InterruptRequested as u8,
            InterruptState::Stopping as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Engine acknowledged the stop by returning from `start`
    pub fn mark_stopped(&self) {
        let _ = self.state.compare_exchange(
            InterruptState::Stopping as u8,
            InterruptState::Stopped as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        );
    }

    /// Route Ctrl-C to `request` for the rest of the process lifetime
    ///
    /// Installs at most one listener per controller; returns false when one
    /// is already running. Until it is installed Ctrl-C keeps its default
    /// behavior and ends the process.
    pub fn install_console_handler(self: &Arc<Self>) -> Result<bool> {
        if self.handler_installed.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_io()
            .build()
            .map_err(|e| {
                self.handler_installed.store(false, Ordering::Release);
                ExtractError::config(format!("cannot start signal listener: {}", e))
            })?;

        let controller = Arc::clone(self);
        thread::Builder::new()
            .name("sacd-interrupt".to_string())
            .spawn(move || {
                runtime.block_on(async move {
                    loop {
                        if let Err(e) = tokio::signal::ctrl_c().await {
                            warn!("Failed to listen for Ctrl-C: {}", e);
                            return;
                        }
                        if !controller.request() {
                            debug!("Ignoring repeated interrupt");
                        }
                    }
                });
            })
            .map_err(|e| {
                self.handler_installed.store(false, Ordering::Release);
                ExtractError::Io(e)
            })?;

        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_first_request_wins() {
        let controller = InterruptController::new();
        assert_eq!(controller.state(), InterruptState::Running);
        assert!(controller.request());
        assert!(!controller.request());
        assert!(!controller.request());
        assert_eq!(controller.state(), InterruptState::InterruptRequested);

        assert!(controller.wakeups().try_recv().is_ok());
        assert!(controller.wakeups().try_recv().is_err());
    }

    #[test]
    fn test_full_state_sequence() {
        let controller = InterruptController::new();
        // stopping before a request is a no-op
        controller.begin_stopping();
        assert_eq!(controller.state(), InterruptState::Running);

        controller.request();
        controller.begin_stopping();
        assert_eq!(controller.state(), InterruptState::Stopping);
        controller.mark_stopped();
        assert_eq!(controller.state(), InterruptState::Stopped);
        assert!(!controller.request());
    }

    #[test]
    fn test_console_handler_installs_once() {
        let controller = Arc::new(InterruptController::new());
        assert!(controller.install_console_handler().unwrap());
        assert!(!controller.install_console_handler().unwrap());
        assert_eq!(controller.state(), InterruptState::Running);
    }

    #[test]
    fn test_request_from_other_thread_wakes_receiver() {
        let controller = Arc::new(InterruptController::new());
        let remote = Arc::clone(&controller);
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            remote.request()
        });

        assert!(controller
            .wakeups()
            .recv_timeout(Duration::from_secs(5))
            .is_ok());
        assert!(handle.join().unwrap());
    }
}
