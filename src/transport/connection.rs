//! The live device transport.
//!
//! [`Transport`] wraps one open [`DeviceChannel`] and is the only type
//! in the crate allowed to touch it. It serializes device commands
//! behind an async mutex (two logical requests may overlap in the
//! event loop; the device itself handles one command at a time) and
//! makes `close` idempotent and failure-tolerant.
//!
//! # Lifecycle
//!
//! Created by [`SessionManager`](crate::session::SessionManager) during
//! session establishment and destroyed by its teardown. At most one
//! live `Transport` exists process-wide at any instant.

// ============================================================================
// Imports
// ============================================================================

use tokio::sync::Mutex;
use tracing::{trace, warn};

use crate::error::{Error, Result};

use super::apdu::{Apdu, ApduResponse};
use super::backend::DeviceChannel;

// ============================================================================
// Transport
// ============================================================================

/// One open physical connection to the signing device.
pub struct Transport {
    /// The channel slot; `None` once closed.
    ///
    /// The async mutex is held across the exchange so concurrent
    /// callers queue instead of interleaving device commands.
    channel: Mutex<Option<Box<dyn DeviceChannel>>>,
}

impl Transport {
    /// Wraps a freshly opened channel.
    #[must_use]
    pub fn new(channel: Box<dyn DeviceChannel>) -> Self {
        Self {
            channel: Mutex::new(Some(channel)),
        }
    }

    /// Sends one APDU and parses the response frame.
    ///
    /// # Errors
    ///
    /// - [`Error::Transport`] if the transport is already closed or the
    ///   exchange fails at the channel level
    /// - [`Error::Transport`] if the response frame is malformed
    pub async fn exchange(&self, apdu: &Apdu) -> Result<ApduResponse> {
        let mut slot = self.channel.lock().await;
        let channel = slot
            .as_mut()
            .ok_or_else(|| Error::transport("transport is closed"))?;

        trace!(%apdu, "sending command");
        let raw = channel.exchange(&apdu.to_bytes()).await?;
        let response = ApduResponse::parse(raw)?;
        trace!(status = format_args!("0x{:04x}", response.status()), "response received");

        Ok(response)
    }

    /// Closes the transport.
    ///
    /// Idempotent: the second and later calls are no-ops. Close-time
    /// channel errors are swallowed at `warn!` level; a failed close
    /// must never mask a primary result.
    pub async fn close(&self) {
        let channel = self.channel.lock().await.take();
        if let Some(mut channel) = channel {
            if let Err(e) = channel.close().await {
                warn!(error = %e, "error closing device channel");
            }
        }
    }

    /// Returns `true` if the transport has been closed.
    pub async fn is_closed(&self) -> bool {
        self.channel.lock().await.is_none()
    }
}

impl std::fmt::Debug for Transport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transport").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
