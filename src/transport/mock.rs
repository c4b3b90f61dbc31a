//! Scripted backend and channel doubles for tests.
//!
//! [`MockChannel`] replays canned response frames and records every
//! command frame it is given. [`MockBackend`] hands out such channels,
//! counts opens, and can simulate missing platform support, failing
//! opens, empty enumerations and hotplug feeds.

// ============================================================================
// Imports
// ============================================================================

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{Error, Result};
use crate::identifiers::{ProductId, VendorId};

use super::backend::{
    DeviceBackend, DeviceChannel, DeviceDescriptor, HotplugEvent, TransportKind,
};

// ============================================================================
// MockChannel
// ============================================================================

/// A device channel that replays scripted response frames.
pub(crate) struct MockChannel {
    script: Arc<Mutex<VecDeque<Vec<u8>>>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    closes: Arc<Mutex<usize>>,
    fail_close: bool,
    fail_exchange: Option<Error>,
}

impl MockChannel {
    /// Creates a channel replaying `responses` in order.
    pub(crate) fn scripted(responses: Vec<Vec<u8>>) -> Self {
        Self {
            script: Arc::new(Mutex::new(responses.into())),
            sent: Arc::new(Mutex::new(Vec::new())),
            closes: Arc::new(Mutex::new(0)),
            fail_close: false,
            fail_exchange: None,
        }
    }

    fn shared(
        script: Arc<Mutex<VecDeque<Vec<u8>>>>,
        sent: Arc<Mutex<Vec<Vec<u8>>>>,
        closes: Arc<Mutex<usize>>,
        fail_exchange: Option<Error>,
    ) -> Self {
        Self {
            script,
            sent,
            closes,
            fail_close: false,
            fail_exchange,
        }
    }

    /// Makes `close` return an error (it must still be swallowed).
    pub(crate) fn failing_close(mut self) -> Self {
        self.fail_close = true;
        self
    }

    /// Makes every exchange fail with `error`.
    pub(crate) fn failing(mut self, error: Error) -> Self {
        self.fail_exchange = Some(error);
        self
    }

    /// Shared close counter, usable after the channel is boxed away.
    pub(crate) fn close_count(&self) -> Arc<Mutex<usize>> {
        Arc::clone(&self.closes)
    }

    /// Shared log of every command frame sent.
    pub(crate) fn sent_log(&self) -> Arc<Mutex<Vec<Vec<u8>>>> {
        Arc::clone(&self.sent)
    }
}

#[async_trait]
impl DeviceChannel for MockChannel {
    async fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>> {
        self.sent.lock().push(command.to_vec());
        if let Some(error) = &self.fail_exchange {
            return Err(error.clone());
        }
        self.script
            .lock()
            .pop_front()
            .ok_or_else(|| Error::transport("mock script exhausted"))
    }

    async fn close(&mut self) -> Result<()> {
        *self.closes.lock() += 1;
        if self.fail_close {
            Err(Error::transport("mock close failure"))
        } else {
            Ok(())
        }
    }
}

// ============================================================================
// MockBackend
// ============================================================================

/// A scripted platform backend.
///
/// All opened channels share one response script and one command log,
/// so a test can script a whole session sequence up front and assert
/// on every frame afterwards.
pub(crate) struct MockBackend {
    supported: bool,
    devices: Mutex<Vec<DeviceDescriptor>>,
    script: Arc<Mutex<VecDeque<Vec<u8>>>>,
    sent: Arc<Mutex<Vec<Vec<u8>>>>,
    opens: Arc<Mutex<usize>>,
    attempts: Arc<Mutex<usize>>,
    closes: Arc<Mutex<usize>>,
    open_delay: Option<Duration>,
    fail_open: bool,
    fail_enumerate: bool,
    fail_exchange: Option<Error>,
    remembered: bool,
    hotplug_tx: mpsc::UnboundedSender<HotplugEvent>,
    hotplug_rx: Mutex<Option<mpsc::UnboundedReceiver<HotplugEvent>>>,
    no_hotplug: bool,
}

impl MockBackend {
    /// Default test vendor id (matches the bridge default).
    pub(crate) const VENDOR: VendorId = VendorId::new(0x2c97);

    /// Creates a supported backend with no devices and no script.
    pub(crate) fn new() -> Self {
        let (hotplug_tx, hotplug_rx) = mpsc::unbounded_channel();
        Self {
            supported: true,
            devices: Mutex::new(Vec::new()),
            script: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            opens: Arc::new(Mutex::new(0)),
            attempts: Arc::new(Mutex::new(0)),
            closes: Arc::new(Mutex::new(0)),
            open_delay: None,
            fail_open: false,
            fail_enumerate: false,
            fail_exchange: None,
            remembered: false,
            hotplug_tx,
            hotplug_rx: Mutex::new(Some(hotplug_rx)),
            no_hotplug: false,
        }
    }

    /// Creates a backend with one authorized device of the default vendor.
    pub(crate) fn with_default_device() -> Self {
        let backend = Self::new();
        backend.devices.lock().push(
            DeviceDescriptor::new(Self::VENDOR, ProductId::new(0x4011)).with_name("Test Signer"),
        );
        backend
    }

    /// Adds an authorized device.
    pub(crate) fn add_device(&self, descriptor: DeviceDescriptor) {
        self.devices.lock().push(descriptor);
    }

    /// Creates a backend reporting no hardware capability at all.
    pub(crate) fn unsupported() -> Self {
        let mut backend = Self::new();
        backend.supported = false;
        backend
    }

    /// Makes the platform remember an already-open connection.
    pub(crate) fn remembered(mut self) -> Self {
        self.remembered = true;
        self
    }

    /// Removes the hotplug API entirely.
    pub(crate) fn without_hotplug(mut self) -> Self {
        self.no_hotplug = true;
        self
    }

    /// Makes every open fail.
    pub(crate) fn failing_opens(mut self) -> Self {
        self.fail_open = true;
        self
    }

    /// Makes device enumeration fail.
    pub(crate) fn failing_enumeration(mut self) -> Self {
        self.fail_enumerate = true;
        self
    }

    /// Makes every exchange on opened channels fail with `error`.
    pub(crate) fn failing_exchanges(mut self, error: Error) -> Self {
        self.fail_exchange = Some(error);
        self
    }

    /// Delays every open, widening the single-flight race window.
    pub(crate) fn with_open_delay(mut self, delay: Duration) -> Self {
        self.open_delay = Some(delay);
        self
    }

    /// Appends one response frame to the shared script.
    pub(crate) fn push_response(&self, response: Vec<u8>) {
        self.script.lock().push_back(response);
    }

    /// Number of channels opened so far (remembered opens included).
    pub(crate) fn open_count(&self) -> usize {
        *self.opens.lock()
    }

    /// Number of open attempts, successful or not.
    pub(crate) fn attempt_count(&self) -> usize {
        *self.attempts.lock()
    }

    /// Number of channel closes so far.
    pub(crate) fn close_count(&self) -> usize {
        *self.closes.lock()
    }

    /// Every command frame sent across all opened channels.
    pub(crate) fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.lock().clone()
    }

    /// Sender feeding the hotplug subscription.
    pub(crate) fn hotplug_sender(&self) -> mpsc::UnboundedSender<HotplugEvent> {
        self.hotplug_tx.clone()
    }

    fn make_channel(&self) -> Box<dyn DeviceChannel> {
        Box::new(MockChannel::shared(
            Arc::clone(&self.script),
            Arc::clone(&self.sent),
            Arc::clone(&self.closes),
            self.fail_exchange.clone(),
        ))
    }
}

#[async_trait]
impl DeviceBackend for MockBackend {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn authorized_devices(&self) -> Result<Vec<DeviceDescriptor>> {
        if self.fail_enumerate {
            return Err(Error::transport("mock enumeration failure"));
        }
        Ok(self.devices.lock().clone())
    }

    async fn open_remembered(
        &self,
        _kind: TransportKind,
    ) -> Result<Option<Box<dyn DeviceChannel>>> {
        if !self.remembered {
            return Ok(None);
        }
        *self.attempts.lock() += 1;
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        *self.opens.lock() += 1;
        Ok(Some(self.make_channel()))
    }

    async fn open(
        &self,
        _descriptor: &DeviceDescriptor,
        _kind: TransportKind,
    ) -> Result<Box<dyn DeviceChannel>> {
        *self.attempts.lock() += 1;
        if let Some(delay) = self.open_delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_open {
            return Err(Error::transport("mock open failure"));
        }
        *self.opens.lock() += 1;
        Ok(self.make_channel())
    }

    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<HotplugEvent>> {
        if self.no_hotplug {
            return None;
        }
        self.hotplug_rx.lock().take()
    }
}

// ============================================================================
// Canned Frames
// ============================================================================

/// App configuration response: flags=0x01, version 1.2.0.
pub(crate) fn app_config_frame() -> Vec<u8> {
    vec![0x01, 0x01, 0x02, 0x00, 0x90, 0x00]
}

/// Signature response: v, then 32-byte r of `fill_r`, 32-byte s of `fill_s`.
pub(crate) fn signature_frame(v: u8, fill_r: u8, fill_s: u8) -> Vec<u8> {
    let mut frame = Vec::with_capacity(67);
    frame.push(v);
    frame.extend_from_slice(&[fill_r; 32]);
    frame.extend_from_slice(&[fill_s; 32]);
    frame.extend_from_slice(&[0x90, 0x00]);
    frame
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_channel_replays_in_order() {
        let mut channel = MockChannel::scripted(vec![vec![0x90, 0x00], vec![0x69, 0x85]]);
        assert_eq!(channel.exchange(&[0x01]).await.expect("first"), vec![0x90, 0x00]);
        assert_eq!(channel.exchange(&[0x02]).await.expect("second"), vec![0x69, 0x85]);
        assert!(channel.exchange(&[0x03]).await.is_err());
    }

    #[tokio::test]
    async fn test_backend_counts_opens() {
        let backend = MockBackend::with_default_device();
        let devices = backend.authorized_devices().await.expect("devices");
        backend
            .open(&devices[0], TransportKind::Hid)
            .await
            .expect("open");
        assert_eq!(backend.open_count(), 1);
    }

    #[tokio::test]
    async fn test_backend_shared_command_log() {
        let backend = MockBackend::with_default_device();
        backend.push_response(vec![0x90, 0x00]);

        let devices = backend.authorized_devices().await.expect("devices");
        let mut channel = backend
            .open(&devices[0], TransportKind::Hid)
            .await
            .expect("open");
        channel.exchange(&[0xE0, 0x06]).await.expect("exchange");

        assert_eq!(backend.sent(), vec![vec![0xE0, 0x06]]);
    }

    #[test]
    fn test_subscribe_consumed_once() {
        let backend = MockBackend::new();
        assert!(backend.subscribe().is_some());
        assert!(backend.subscribe().is_none());
    }
}
