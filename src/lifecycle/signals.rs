//! Process-wide handlers.
//!
//! # Responsibilities
//! - Register SIGTERM/SIGINT listeners
//! - Install the uncaught-panic observer
//! - Tear both down as one unit at the start of shutdown
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Every received signal is forwarded; deduplication is the caller's job
//! - Panics are logged, never escalated to process exit
//! - The panic observer is shared by every live installation; the hook that
//!   was in place before the first one is restored when the last is removed
//! - Once a Tokio listener is registered the OS default action stays replaced,
//!   so signals arriving after teardown are ignored

use std::fmt;
use std::io;
use std::panic::{self, PanicHookInfo};
use std::sync::{Mutex, MutexGuard};

use tokio::task::JoinHandle;

/// Signals that request a graceful shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    Terminate,
    Interrupt,
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Terminate => f.write_str("SIGTERM"),
            Self::Interrupt => f.write_str("SIGINT"),
        }
    }
}

/// Installed signal listeners and panic observer.
#[derive(Debug)]
pub struct ProcessHandlers {
    listeners: Vec<JoinHandle<()>>,
    panic_observer: bool,
}

impl ProcessHandlers {
    /// Install the panic observer and signal listeners.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn install<F>(on_signal: F) -> io::Result<Self>
    where
        F: Fn(Signal) + Clone + Send + Sync + 'static,
    {
        install_panic_observer();
        let mut handlers = Self {
            listeners: Vec::new(),
            panic_observer: true,
        };

        match spawn_listeners(on_signal) {
            Ok(listeners) => {
                handlers.listeners = listeners;
                Ok(handlers)
            }
            Err(e) => {
                handlers.remove();
                Err(e)
            }
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Abort the listeners and release the panic observer.
    pub fn remove(mut self) {
        for listener in self.listeners.drain(..) {
            listener.abort();
        }
        if self.panic_observer {
            release_panic_observer();
            self.panic_observer = false;
        }
        tracing::debug!("Process handlers removed");
    }
}

type PanicHook = Box<dyn Fn(&PanicHookInfo<'_>) + Sync + Send + 'static>;

struct ObserverSlot {
    installs: usize,
    previous: Option<PanicHook>,
}

static OBSERVER: Mutex<ObserverSlot> = Mutex::new(ObserverSlot {
    installs: 0,
    previous: None,
});

fn observer_slot() -> MutexGuard<'static, ObserverSlot> {
    // The slot stays consistent even if a holder panicked.
    OBSERVER.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn install_panic_observer() {
    let mut slot = observer_slot();
    if slot.installs == 0 {
        slot.previous = Some(panic::take_hook());
        panic::set_hook(Box::new(|info| {
            tracing::error!(panic = %info, "Uncaught panic");
        }));
    }
    slot.installs += 1;
}

fn release_panic_observer() {
    let mut slot = observer_slot();
    slot.installs = slot.installs.saturating_sub(1);
    if slot.installs == 0 {
        if let Some(previous) = slot.previous.take() {
            panic::set_hook(previous);
        }
    }
}

/// Number of live installations sharing the panic observer.
pub fn panic_observer_installs() -> usize {
    observer_slot().installs
}

#[cfg(unix)]
fn spawn_listeners<F>(on_signal: F) -> io::Result<Vec<JoinHandle<()>>>
where
    F: Fn(Signal) + Clone + Send + Sync + 'static,
{
    use tokio::signal::unix::{signal, SignalKind};

    let mut listeners = Vec::with_capacity(2);
    for (kind, sig) in [
        (SignalKind::terminate(), Signal::Terminate),
        (SignalKind::interrupt(), Signal::Interrupt),
    ] {
        let mut stream = match signal(kind) {
            Ok(stream) => stream,
            Err(e) => {
                listeners.iter().for_each(JoinHandle::abort);
                return Err(e);
            }
        };
        let on_signal = on_signal.clone();
        listeners.push(tokio::spawn(async move {
            while stream.recv().await.is_some() {
                tracing::info!("Received {sig}");
                on_signal(sig);
            }
        }));
    }
    Ok(listeners)
}

#[cfg(not(unix))]
fn spawn_listeners<F>(on_signal: F) -> io::Result<Vec<JoinHandle<()>>>
where
    F: Fn(Signal) + Clone + Send + Sync + 'static,
{
    Ok(vec![tokio::spawn(async move {
        while tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received {}", Signal::Interrupt);
            on_signal(Signal::Interrupt);
        }
    })])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_names() {
        assert_eq!(Signal::Terminate.to_string(), "SIGTERM");
        assert_eq!(Signal::Interrupt.to_string(), "SIGINT");
    }

    #[tokio::test]
    async fn test_install_and_remove() {
        let handlers = ProcessHandlers::install(|_| {}).unwrap();
        assert!(handlers.listener_count() >= 1);
        assert!(panic_observer_installs() >= 1);
        handlers.remove();
    }
}
