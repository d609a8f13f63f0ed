//! Single-flight credential refresh
//!
//! Any number of callers may ask for a refreshed credential at once; at most
//! one refresh call is in flight and everyone who asked while it ran gets
//! its outcome.
//!
//! State machine (one `Mutex` guards both the phase and the queue):
//! - Idle → Refreshing: first caller; it spawns the refresh cycle, then
//!   queues itself like every other caller
//! - Refreshing: later callers only append to the queue
//! - Refreshing → Idle: the cycle commits (or tears down) the session, then
//!   drains the queue under the lock and resolves each waiter once
//!
//! The cycle runs in its own task so a caller dropping its future cannot
//! strand the rest of the queue. Each waiter is a `oneshot::Sender`, which
//! `send` consumes: a waiter cannot be resolved twice.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use session::{Credential, CredentialStore, TenantContextProvider};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use transport::Transport;

use crate::error::{NormalizedError, Result};
use crate::events::{SessionEvent, SessionEvents};
use crate::metrics;

type Waiter = oneshot::Sender<Result<Credential>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Refreshing,
}

struct RefreshState {
    phase: Phase,
    waiters: Vec<Waiter>,
}

struct Inner {
    state: Mutex<RefreshState>,
    credentials: Arc<CredentialStore>,
    tenant: Arc<TenantContextProvider>,
    transport: Arc<dyn Transport>,
    events: SessionEvents,
    refresh_timeout: Duration,
}

/// Cheap to clone; all clones share one state machine.
#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<Inner>,
}

impl RefreshCoordinator {
    pub fn new(
        credentials: Arc<CredentialStore>,
        tenant: Arc<TenantContextProvider>,
        transport: Arc<dyn Transport>,
        events: SessionEvents,
        refresh_timeout: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(RefreshState {
                    phase: Phase::Idle,
                    waiters: Vec::new(),
                }),
                credentials,
                tenant,
                transport,
                events,
                refresh_timeout,
            }),
        }
    }

    /// Wait for the outcome of a refresh cycle, starting one if none is running.
    pub async fn await_refreshed_credential(&self) -> Result<Credential> {
        self.await_refreshed_credential_after(None).await
    }

    /// Like `await_refreshed_credential`, for a caller whose request was
    /// rejected while carrying `rejected_access`.
    ///
    /// If no cycle is running and the store already holds a different access
    /// token, a cycle finished while that request was on the wire; the
    /// current credential is returned without refreshing again.
    pub async fn await_refreshed_credential_after(
        &self,
        rejected_access: Option<&str>,
    ) -> Result<Credential> {
        let rx = {
            let mut state = self.lock_state();

            // A cycle commits to the store before returning to Idle, so an
            // Idle coordinator reading a different token here means that
            // token is the newest one.
            if state.phase == Phase::Idle
                && let Some(rejected) = rejected_access
                && let Some(current) = self.inner.credentials.get()
                && !current.access_token.matches(rejected)
            {
                debug!("credential already replaced since the request was sent");
                return Ok(current);
            }

            let (tx, rx) = oneshot::channel();
            state.waiters.push(tx);

            match state.phase {
                Phase::Refreshing => {
                    debug!(waiters = state.waiters.len(), "refresh in flight, queued");
                    metrics::record_refresh_waiter();
                }
                Phase::Idle => {
                    state.phase = Phase::Refreshing;
                    debug!("starting refresh cycle");
                    tokio::spawn(self.clone().run_cycle());
                }
            }
            rx
        };

        rx.await.unwrap_or_else(|_| Err(NormalizedError::session_expired()))
    }

    /// Tear the session down after a terminal 401 seen outside a refresh
    /// cycle. Only the caller that actually clears a credential signals
    /// logout, so concurrent terminal 401s produce one event.
    pub fn force_logout(&self, reason: &str) -> bool {
        let cleared = self.clear_session();
        if cleared {
            self.signal_logout(reason);
        }
        cleared
    }

    pub fn phase(&self) -> Phase {
        self.lock_state().phase
    }

    /// Number of callers queued on the in-flight cycle.
    pub fn waiting(&self) -> usize {
        self.lock_state().waiters.len()
    }

    async fn run_cycle(self) {
        let mut guard = CycleGuard {
            coordinator: self.clone(),
            drained: false,
        };

        match self.refresh_once().await {
            Ok(credential) => {
                // Committed before any waiter can observe it.
                self.inner.credentials.set(credential.clone());
                let waiters = self.finish();
                guard.drained = true;
                metrics::record_refresh("success");
                info!(waiters = waiters.len(), "credential refreshed");
                for waiter in waiters {
                    let _ = waiter.send(Ok(credential.clone()));
                }
            }
            Err(e) => {
                let reason = e.to_string();
                warn!(error = %reason, "credential refresh failed, ending session");
                // A late 401 from a session that is already gone lands here
                // with an empty store; only the cycle that ends a session
                // announces it.
                if self.clear_session() {
                    self.signal_logout(&reason);
                }
                let waiters = self.finish();
                guard.drained = true;
                metrics::record_refresh("failure");
                let terminal = NormalizedError::session_expired();
                for waiter in waiters {
                    let _ = waiter.send(Err(terminal.clone()));
                }
            }
        }
    }

    async fn refresh_once(&self) -> session::Result<Credential> {
        let refresh = self
            .inner
            .credentials
            .refresh_token()
            .ok_or(session::Error::MissingRefreshToken)?;

        let response = tokio::time::timeout(
            self.inner.refresh_timeout,
            session::refresh_token(self.inner.transport.as_ref(), refresh.expose_str()),
        )
        .await
        .map_err(|_| {
            session::Error::Http(format!(
                "token refresh timed out after {:?}",
                self.inner.refresh_timeout
            ))
        })??;

        Ok(Credential::from_token_response(response, &refresh))
    }

    /// Back to Idle, handing the queue to the caller.
    fn finish(&self) -> Vec<Waiter> {
        let mut state = self.lock_state();
        state.phase = Phase::Idle;
        std::mem::take(&mut state.waiters)
    }

    fn clear_session(&self) -> bool {
        let cleared = self.inner.credentials.clear();
        self.inner.tenant.clear();
        cleared
    }

    fn signal_logout(&self, reason: &str) {
        metrics::record_teardown();
        let receivers = self.inner.events.publish(SessionEvent::LoggedOut {
            reason: reason.to_string(),
        });
        warn!(reason, receivers, "session torn down");
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        // The lock is never held across an await or user code; a poisoned
        // lock still holds a consistent state.
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Releases the queue if the cycle task is dropped or panics before draining.
struct CycleGuard {
    coordinator: RefreshCoordinator,
    drained: bool,
}

impl Drop for CycleGuard {
    fn drop(&mut self) {
        if self.drained {
            return;
        }
        let waiters = self.coordinator.finish();
        warn!(waiters = waiters.len(), "refresh cycle aborted");
        for waiter in waiters {
            let _ = waiter.send(Err(NormalizedError::session_expired()));
        }
    }
}
