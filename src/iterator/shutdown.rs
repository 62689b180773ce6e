//! Signal-driven shutdown
//!
//! SIGTERM and SIGINT do not kill the process directly. The OS handler only
//! records which signal arrived; the driver checks for it at tick
//! boundaries, notifies every hook through the same path used for failures,
//! and then exits with a success status. A fetch that is already running is
//! not interrupted.

use crate::error::{Error, Result};
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[cfg(unix)]
const SIGINT: i32 = signal_hook::consts::SIGINT;
#[cfg(unix)]
const SIGTERM: i32 = signal_hook::consts::SIGTERM;
#[cfg(not(unix))]
const SIGINT: i32 = 2;
#[cfg(not(unix))]
const SIGTERM: i32 = 15;

/// A request to stop iterating, raised by a termination signal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShutdownRequest {
    signal: i32,
}

impl ShutdownRequest {
    /// Create a request for signal number `signal`
    pub fn new(signal: i32) -> Self {
        Self { signal }
    }

    /// Signal number that triggered the request
    pub fn signal(&self) -> i32 {
        self.signal
    }

    /// Conventional name of the signal
    pub fn signal_name(&self) -> &'static str {
        match self.signal {
            SIGINT => "SIGINT",
            SIGTERM => "SIGTERM",
            _ => "signal",
        }
    }
}

impl fmt::Display for ShutdownRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Shutdown requested by {} ({})", self.signal_name(), self.signal)
    }
}

/// Requests a shutdown from code, as if a signal had arrived
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    pending: Arc<AtomicUsize>,
}

impl ShutdownHandle {
    /// Request a shutdown attributed to `signal`.
    ///
    /// Signal 0 is not a termination signal and is recorded as SIGTERM.
    pub fn request(&self, signal: i32) {
        let signal = if signal == 0 { SIGTERM } else { signal };
        // 0 means "nothing pending"; the cast keeps negative numbers distinct
        self.pending.store(signal as u32 as usize, Ordering::SeqCst);
    }

    /// Request a shutdown attributed to SIGTERM
    pub fn terminate(&self) {
        self.request(SIGTERM);
    }
}

/// Converts termination signals into a synchronous shutdown path
#[derive(Debug)]
pub struct ShutdownController {
    pending: Arc<AtomicUsize>,
    exit_process: bool,
    #[cfg(unix)]
    registrations: Vec<signal_hook::SigId>,
}

impl ShutdownController {
    /// Install handlers for SIGTERM and SIGINT.
    ///
    /// After hooks have been notified the process exits with status 0,
    /// unless [`exit_on_shutdown(false)`](Self::exit_on_shutdown) is set.
    pub fn install() -> Result<Self> {
        let mut controller = Self::manual();
        controller.exit_process = true;

        #[cfg(unix)]
        for signal in [SIGTERM, SIGINT] {
            let id = signal_hook::flag::register_usize(
                signal,
                Arc::clone(&controller.pending),
                signal as usize,
            )
            .map_err(|e| Error::Config(format!("Failed to install handler for signal {signal}: {e}")))?;
            controller.registrations.push(id);
        }

        log::debug!("Shutdown handlers installed for SIGTERM and SIGINT");
        Ok(controller)
    }

    /// A controller without OS handlers, triggered only through its handle
    pub fn manual() -> Self {
        Self {
            pending: Arc::new(AtomicUsize::new(0)),
            exit_process: false,
            #[cfg(unix)]
            registrations: Vec::new(),
        }
    }

    /// Whether to exit the process once hooks have been notified
    pub fn exit_on_shutdown(mut self, exit: bool) -> Self {
        self.exit_process = exit;
        self
    }

    /// Whether the process exits after a shutdown
    pub fn exits_process(&self) -> bool {
        self.exit_process
    }

    /// A handle that can request a shutdown from code
    pub fn handle(&self) -> ShutdownHandle {
        ShutdownHandle { pending: Arc::clone(&self.pending) }
    }

    /// Take the pending request, if any
    pub fn poll(&self) -> Option<ShutdownRequest> {
        match self.pending.swap(0, Ordering::SeqCst) {
            0 => None,
            signal => Some(ShutdownRequest::new(signal as u32 as i32)),
        }
    }

    /// Fail with [`Error::Shutdown`] if a request is pending
    pub fn check(&self) -> Result<()> {
        match self.poll() {
            Some(request) => {
                log::warn!("{request}, notifying hooks");
                Err(Error::Shutdown(request))
            }
            None => Ok(()),
        }
    }
}

impl Drop for ShutdownController {
    fn drop(&mut self) {
        #[cfg(unix)]
        for id in self.registrations.drain(..) {
            signal_hook::low_level::unregister(id);
        }
    }
}
