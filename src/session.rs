//! Session lifecycle and single-flight establishment.
//!
//! [`SessionManager`] is the sole owner of the process-wide
//! [`Transport`]. It guarantees two invariants:
//!
//! - at most one live Transport/[`Session`] pair exists at any instant
//! - concurrent callers never race to create a second one: while an
//!   establishment is in flight, later callers register as waiters and
//!   receive the leader's outcome
//!
//! # State Machine
//!
//! ```text
//!            ensure_session (leader)
//!   Closed ─────────────────────────► Establishing ──► Open
//!     ▲                                    │             │
//!     │            failure                 │             │ teardown
//!     └────────────────────────────────────┘◄────────────┘
//! ```
//!
//! Transitions happen under one short `parking_lot` lock, never held
//! across an await. The establishment body itself runs unlocked; only
//! the leader executes it.

// ============================================================================
// Imports
// ============================================================================

use std::mem;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::identifiers::VendorId;
use crate::operations;
use crate::operations::AppConfiguration;
use crate::transport::apdu::{Apdu, ApduResponse};
use crate::transport::{DeviceBackend, Transport, TransportKind};

// ============================================================================
// Session
// ============================================================================

/// A thin capability wrapper over an open [`Transport`].
///
/// Created and destroyed together with its transport (1:1, same
/// lifetime). Operations borrow it per-call and never retain it.
pub struct Session {
    transport: Transport,
}

impl Session {
    /// Wraps a freshly opened transport.
    #[must_use]
    pub(crate) fn new(transport: Transport) -> Self {
        Self { transport }
    }

    /// Sends one APDU through the owned transport.
    ///
    /// # Errors
    ///
    /// Propagates transport and framing failures unchanged.
    pub async fn exchange(&self, apdu: &Apdu) -> Result<ApduResponse> {
        self.transport.exchange(apdu).await
    }

    /// Cheap liveness probe: asks the app for its configuration.
    pub(crate) async fn probe(&self) -> Result<AppConfiguration> {
        operations::get_app_configuration(self).await
    }

    /// Closes the underlying transport (idempotent, errors swallowed).
    pub(crate) async fn close(&self) {
        self.transport.close().await;
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session").finish_non_exhaustive()
    }
}

// ============================================================================
// SessionState
// ============================================================================

/// Shared outcome handed to every waiter of one establishment.
type Outcome = Result<Arc<Session>>;

/// The per-process session state.
enum SessionState {
    /// No session, no establishment in flight.
    Closed,
    /// One leader is establishing; waiters share its outcome.
    Establishing {
        waiters: Vec<oneshot::Sender<Outcome>>,
    },
    /// A session is open and may be reused after a liveness probe.
    Open(Arc<Session>),
}

// ============================================================================
// SessionManager
// ============================================================================

/// Owner of the single Transport/Session pair.
pub struct SessionManager {
    backend: Arc<dyn DeviceBackend>,
    vendor_id: VendorId,
    preference: Mutex<TransportKind>,
    state: Mutex<SessionState>,
}

impl SessionManager {
    /// Creates a manager in the `Closed` state.
    #[must_use]
    pub fn new(backend: Arc<dyn DeviceBackend>, vendor_id: VendorId) -> Self {
        Self {
            backend,
            vendor_id,
            preference: Mutex::new(TransportKind::default()),
            state: Mutex::new(SessionState::Closed),
        }
    }

    /// Returns the vendor id this manager filters by.
    #[inline]
    #[must_use]
    pub const fn vendor_id(&self) -> VendorId {
        self.vendor_id
    }

    /// Returns the preferred physical transport.
    #[must_use]
    pub fn transport_preference(&self) -> TransportKind {
        *self.preference.lock()
    }

    /// Changes the preferred physical transport.
    ///
    /// Takes effect at the next establishment; the per-request teardown
    /// ensures that is the next request.
    pub fn set_transport_preference(&self, kind: TransportKind) {
        debug!(?kind, "transport preference updated");
        *self.preference.lock() = kind;
    }

    /// Returns a ready session, reusing, rebuilding or newly opening
    /// the transport as needed.
    ///
    /// Single-flight: for any number of concurrent callers, exactly one
    /// establishment runs; all callers resolve to its outcome.
    ///
    /// # Errors
    ///
    /// - [`Error::UnsupportedEnvironment`] if the platform has no
    ///   hardware transport capability
    /// - [`Error::NoPermittedDevice`] if no authorized matching device
    ///   exists (the host must run its permission flow and retry)
    /// - [`Error::Transport`] for open failures
    ///
    /// No retries happen here; retry policy belongs to the caller.
    pub async fn ensure_session(&self) -> Result<Arc<Session>> {
        // Leader election. Non-leaders park on a oneshot and are done.
        let existing = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, SessionState::Closed) {
                SessionState::Establishing { mut waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    *state = SessionState::Establishing { waiters };
                    drop(state);
                    return rx
                        .await
                        .map_err(|_| Error::transport("session establishment interrupted"))?;
                }
                SessionState::Open(session) => {
                    *state = SessionState::Establishing {
                        waiters: Vec::new(),
                    };
                    Some(session)
                }
                SessionState::Closed => {
                    *state = SessionState::Establishing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        let outcome = self.establish(existing).await;

        // Publish the outcome and wake every waiter, win or lose.
        let waiters = {
            let mut state = self.state.lock();
            let waiters = match mem::replace(&mut *state, SessionState::Closed) {
                SessionState::Establishing { waiters } => waiters,
                // A teardown raced us; nothing registered against this
                // attempt anymore.
                other => {
                    *state = other;
                    Vec::new()
                }
            };
            if let Ok(session) = &outcome {
                *state = SessionState::Open(Arc::clone(session));
            }
            waiters
        };
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }

        outcome
    }

    /// The establishment body. Only the leader runs this.
    async fn establish(&self, existing: Option<Arc<Session>>) -> Outcome {
        // Reuse path: a live session answers the probe and is returned
        // unchanged; a stale one is torn down before reopening.
        if let Some(session) = existing {
            match session.probe().await {
                Ok(config) => {
                    debug!(version = %config.version, "reusing live session");
                    return Ok(session);
                }
                Err(e) => {
                    debug!(error = %e, "liveness probe failed; rebuilding session");
                    session.close().await;
                }
            }
        }

        if !self.backend.is_supported() {
            return Err(Error::UnsupportedEnvironment);
        }

        let preference = self.transport_preference();

        // Gesture-free path first: the connection the platform already
        // remembers as connected.
        if let Some(channel) = self.backend.open_remembered(preference).await? {
            debug!("reopened remembered device connection");
            return Ok(Arc::new(Session::new(Transport::new(channel))));
        }

        // Otherwise any already-authorized device of our vendor.
        let descriptor = self
            .backend
            .authorized_devices()
            .await?
            .into_iter()
            .find(|descriptor| descriptor.vendor_id == self.vendor_id)
            .ok_or(Error::NoPermittedDevice)?;

        debug!(device = %descriptor.product_id, "opening authorized device");
        let channel = self.backend.open(&descriptor, preference).await?;
        Ok(Arc::new(Session::new(Transport::new(channel))))
    }

    /// Tears down any live Transport/Session pair.
    ///
    /// Idempotent. The state is swapped to `Closed` *before* the close
    /// runs, so a concurrent reader never observes a half-closed
    /// handle. Close-time errors are swallowed by the transport.
    ///
    /// An establishment in flight is left to finish on its own; its
    /// session will be probed (and replaced if dead) on the next
    /// request.
    pub async fn teardown(&self) {
        let session = {
            let mut state = self.state.lock();
            match mem::replace(&mut *state, SessionState::Closed) {
                SessionState::Open(session) => Some(session),
                establishing @ SessionState::Establishing { .. } => {
                    *state = establishing;
                    warn!("teardown requested during establishment; deferring to next probe");
                    None
                }
                SessionState::Closed => None,
            }
        };

        if let Some(session) = session {
            debug!("tearing down session");
            session.close().await;
        }
    }

    /// Returns `true` if a session is currently open.
    #[must_use]
    pub fn has_session(&self) -> bool {
        matches!(*self.state.lock(), SessionState::Open(_))
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("vendor_id", &self.vendor_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
