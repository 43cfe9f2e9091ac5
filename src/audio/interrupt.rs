use std::future::Future;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::bridge::CaptureBridge;
use crate::error::Result;

/// Future that resolves when the scoped interrupt fires
pub type Interrupted = BoxFuture<'static, ()>;

#[cfg(unix)]
mod scope {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::{Arc, Mutex, PoisonError};
    use std::thread;

    use signal_hook::consts::SIGINT;
    use signal_hook::flag;
    use signal_hook::iterator::{Handle, Signals};
    use tokio::sync::oneshot;
    use tracing::debug;

    use super::Interrupted;
    use crate::error::{Result, StreamError};

    /// Runs the default SIGINT action whenever no scope is active
    struct Fallback {
        default_action: Arc<AtomicBool>,
        scopes: usize,
    }

    static FALLBACK: Mutex<Option<Fallback>> = Mutex::new(None);

    fn enter() -> Result<()> {
        let mut fallback = FALLBACK.lock().unwrap_or_else(PoisonError::into_inner);

        if fallback.is_none() {
            let default_action = Arc::new(AtomicBool::new(false));
            flag::register_conditional_default(SIGINT, Arc::clone(&default_action))
                .map_err(|e| StreamError::interrupt(format!("failed to hook SIGINT: {}", e)))?;
            *fallback = Some(Fallback {
                default_action,
                scopes: 0,
            });
        }

        if let Some(fallback) = fallback.as_mut() {
            fallback.scopes += 1;
            fallback.default_action.store(false, Ordering::SeqCst);
        }
        Ok(())
    }

    fn leave() {
        let mut fallback = FALLBACK.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(fallback) = fallback.as_mut() {
            fallback.scopes = fallback.scopes.saturating_sub(1);
            if fallback.scopes == 0 {
                fallback.default_action.store(true, Ordering::SeqCst);
            }
        }
    }

    /// SIGINT registration that lives as long as the value
    ///
    /// While any scope is alive SIGINT only resolves the scope's future.
    /// Once the last scope is dropped SIGINT terminates the process again.
    pub struct SigintScope {
        handle: Handle,
    }

    impl std::fmt::Debug for SigintScope {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("SigintScope").finish_non_exhaustive()
        }
    }

    impl SigintScope {
        pub fn register() -> Result<(Self, Interrupted)> {
            enter()?;

            let mut signals = match Signals::new([SIGINT]) {
                Ok(signals) => signals,
                Err(e) => {
                    leave();
                    return Err(StreamError::interrupt(format!(
                        "failed to listen for SIGINT: {}",
                        e
                    )));
                }
            };
            let handle = signals.handle();
            let (tx, rx) = oneshot::channel::<()>();

            let spawned = thread::Builder::new()
                .name("sigint".to_string())
                .spawn(move || {
                    if signals.forever().next().is_some() {
                        debug!("SIGINT received");
                        let _ = tx.send(());
                    }
                });

            if let Err(e) = spawned {
                handle.close();
                leave();
                return Err(StreamError::interrupt(format!(
                    "failed to spawn SIGINT listener: {}",
                    e
                )));
            }

            let interrupted: Interrupted = Box::pin(async move {
                // Sender gone without a signal: the scope ended first
                if rx.await.is_err() {
                    std::future::pending::<()>().await;
                }
            });

            Ok((Self { handle }, interrupted))
        }
    }

    impl Drop for SigintScope {
        fn drop(&mut self) {
            self.handle.close();
            leave();
        }
    }
}

#[cfg(not(unix))]
mod scope {
    use tracing::warn;

    use super::Interrupted;
    use crate::error::Result;

    /// Ctrl-C listener; the console handler stays installed after drop
    #[derive(Debug)]
    pub struct SigintScope {
        _private: (),
    }

    impl SigintScope {
        pub fn register() -> Result<(Self, Interrupted)> {
            let interrupted: Interrupted = Box::pin(async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Unable to listen for Ctrl-C: {}", e);
                    std::future::pending::<()>().await;
                }
            });
            Ok((Self { _private: () }, interrupted))
        }
    }
}

pub use scope::SigintScope;

/// Closes a capture bridge when an interrupt arrives
///
/// The listener lives as long as the guard. A guard built with
/// [`InterruptGuard::ctrl_c`] also owns its [`SigintScope`], so dropping it
/// hands SIGINT back to the default action.
#[derive(Debug)]
pub struct InterruptGuard {
    listener: JoinHandle<()>,
    scope: Option<SigintScope>,
}

impl InterruptGuard {
    /// Close `bridge` on Ctrl-C for as long as the guard lives
    pub fn ctrl_c(bridge: CaptureBridge) -> Result<Self> {
        let (scope, interrupted) = SigintScope::register()?;
        let mut guard = Self::install(bridge, interrupted);
        guard.scope = Some(scope);
        Ok(guard)
    }

    /// Close `bridge` once `interrupt` resolves
    pub fn install<F>(bridge: CaptureBridge, interrupt: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = tokio::spawn(async move {
            interrupt.await;
            info!("Interrupt received, shutting down audio stream");

            // close() joins the worker thread, keep it off the async workers
            if let Err(e) = tokio::task::spawn_blocking(move || bridge.close()).await {
                warn!("Interrupt teardown task failed: {}", e);
            }
        });

        Self {
            listener,
            scope: None,
        }
    }

    /// Whether the interrupt already fired and teardown completed
    pub fn is_finished(&self) -> bool {
        self.listener.is_finished()
    }
}

impl Drop for InterruptGuard {
    fn drop(&mut self) {
        self.listener.abort();
        // Unregister only after the listener can no longer act on the bridge
        drop(self.scope.take());
    }
}
