//! RPC message boundary.
//!
//! [`RpcDispatcher`] is the single entry point for host requests. It
//! claims envelopes addressed to the bridge target, validates
//! parameters before any device I/O, routes each action to its
//! operation, and serializes results and failures into one
//! [`ActionResponse`] per handled request.
//!
//! # Request States
//!
//! ```text
//! Received ──► Routed ──► Executing ──► Responded
//!                 │                        ▲
//!                 └──── Rejected ──────────┘
//! ```
//!
//! Whatever happens, the transport is torn down after the response
//! body is built, so every request leaves the device connection
//! closed. The response is built first; a slow close never delays the
//! reply.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::operations;
use crate::protocol::{ActionKind, ActionRequest, ActionResponse, Params};
use crate::session::SessionManager;
use crate::transport::TransportKind;

// ============================================================================
// Constants
// ============================================================================

/// Default well-known envelope target of the bridge.
pub const DEFAULT_TARGET: &str = "signer-bridge";

// ============================================================================
// RpcDispatcher
// ============================================================================

/// Routes inbound envelopes to signing operations.
pub struct RpcDispatcher {
    sessions: Arc<SessionManager>,
    target: String,
}

impl RpcDispatcher {
    /// Creates a dispatcher claiming envelopes addressed to `target`.
    #[must_use]
    pub fn new(sessions: Arc<SessionManager>, target: impl Into<String>) -> Self {
        Self {
            sessions,
            target: target.into(),
        }
    }

    /// Returns the envelope target this dispatcher claims.
    #[inline]
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Handles one envelope.
    ///
    /// Returns `None` when the envelope is addressed elsewhere, so
    /// other consumers of the shared channel can claim it. For a
    /// claimed envelope this always returns exactly one response and
    /// tears the transport down afterwards, win or lose.
    pub async fn handle_message(&self, message: &Value) -> Option<ActionResponse> {
        let target = message.get("target").and_then(Value::as_str)?;
        if target != self.target {
            trace!(target, "envelope addressed elsewhere; not handled");
            return None;
        }

        let request = serde_json::from_value::<ActionRequest>(message.clone())
            .map_err(|_| Error::missing_parameter("action"));

        let response = match request {
            Ok(request) => match self.execute(&request).await {
                Ok(payload) => ActionResponse::ok(payload),
                Err(e) => {
                    debug!(error = %e, "request failed");
                    ActionResponse::fail(&e)
                }
            },
            Err(e) => ActionResponse::fail(&e),
        };

        // Always leave the transport closed, only after the response
        // body exists.
        self.sessions.teardown().await;

        Some(response)
    }

    /// Routes and runs one claimed request.
    async fn execute(&self, request: &ActionRequest) -> Result<Value> {
        let kind = ActionKind::from_name(&request.action)
            .ok_or_else(|| Error::unknown_action(&request.action))?;
        let params = Params::new(request.params.as_ref());

        debug!(action = %request.action, "dispatching request");

        match kind {
            ActionKind::MakeSession => {
                self.sessions.ensure_session().await?;
                Ok(Value::Bool(true))
            }

            ActionKind::UpdateTransport => {
                let name = params.require_str("transportType")?;
                let preference = TransportKind::from_name(name).ok_or_else(|| {
                    Error::validation(format!("Unsupported transportType: {name}"))
                })?;
                self.sessions.set_transport_preference(preference);
                Ok(Value::Bool(true))
            }

            ActionKind::GetAppNameAndVersion => {
                let session = self.sessions.ensure_session().await?;
                to_payload(&operations::get_app_name_and_version(&session).await?)
            }

            ActionKind::GetAppConfiguration => {
                let session = self.sessions.ensure_session().await?;
                to_payload(&operations::get_app_configuration(&session).await?)
            }

            ActionKind::GetPublicKey => {
                let hd_path = params.require_hd_path()?;
                let session = self.sessions.ensure_session().await?;
                to_payload(&operations::get_address(&session, hd_path).await?)
            }

            ActionKind::SignTransaction => {
                let hd_path = params.require_hd_path()?;
                let tx = params.require_str("tx")?;
                let session = self.sessions.ensure_session().await?;
                to_payload(&operations::sign_transaction(&session, hd_path, tx).await?)
            }

            ActionKind::SignPersonalMessage => {
                let hd_path = params.require_hd_path()?;
                let message = params.require_str("message")?;
                let session = self.sessions.ensure_session().await?;
                to_payload(&operations::sign_personal_message(&session, hd_path, message).await?)
            }

            ActionKind::SignTypedData => {
                let hd_path = params.require_hd_path()?;
                let typed = params.require_typed_data()?;
                let session = self.sessions.ensure_session().await?;
                to_payload(&operations::sign_typed_data(&session, hd_path, &typed).await?)
            }
        }
    }
}

impl std::fmt::Debug for RpcDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcDispatcher")
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn to_payload<T: Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value)
        .map_err(|e| Error::transport(format!("failed to encode payload: {e}")))
}

// ============================================================================
// Tests
// ============================================================================
