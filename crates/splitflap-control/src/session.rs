//! The single owned connection to the display.
//!
//! # Architecture
//!
//! ```text
//!   set_text ─┐                       ┌──────────────────────────┐
//!   adjust   ─┼─► acquire() ─────────►│ Mutex<SessionInner>      │
//!   save     ─┘   (bounded wait,      │  link, module_count,     │──► device
//!                  else Busy)         │  alphabet, calibration   │
//!                                     └────────────┬─────────────┘
//!                                                  │ publish
//!   get_status ◄── snapshot() ◄── watch channel ◄──┘
//! ```
//!
//! Every command that touches the link runs through a [`SessionGuard`],
//! which holds the command lock for its whole lifetime. Dropping the guard
//! releases the lock on every exit path, including cancellation.
//!
//! Status reads never take the lock. Metadata is republished as a whole
//! [`SessionSnapshot`] each time it changes under the lock, so readers see
//! either the old snapshot or the new one.
//!
//! Each device round trip is bounded by the command timeout. A timed-out or
//! link-level failure tears the link down: the wire state is unknown, so the
//! next command needs a fresh connection. A command whose future was dropped
//! mid-flight is detected on the next acquire and handled the same way.

use std::time::Duration;

use serde::Serialize;
use splitflap_core::{DeviceAlphabet, DisplayMessage};
use splitflap_hardware::{
    AnyDisplayConnector, AnyDisplayLink, CalibrationCommand, DisplayConnector, DisplayLink,
    ForceMovement, PersistOutcome, Probe, TransportError,
};
use tokio::sync::{Mutex, MutexGuard, watch};
use tokio::time::error::Elapsed;
use tracing::{debug, error, info, trace, warn};

use crate::calibration::CalibrationState;
use crate::config::ControllerConfig;
use crate::error::{ControlError, Result};

/// Point-in-time view of the session metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSnapshot {
    pub connected: bool,
    pub module_count: usize,
    pub alphabet: DeviceAlphabet,
    pub transport_identifier: Option<String>,
    /// Connected, but module count or alphabet is a fallback.
    pub degraded: bool,
}

impl SessionSnapshot {
    pub fn disconnected(module_count: usize, alphabet: DeviceAlphabet) -> Self {
        Self {
            connected: false,
            module_count,
            alphabet,
            transport_identifier: None,
            degraded: false,
        }
    }
}

#[derive(Debug)]
struct SessionInner {
    link: Option<AnyDisplayLink>,
    module_count: usize,
    alphabet: DeviceAlphabet,
    module_count_known: bool,
    alphabet_known: bool,
    calibration: CalibrationState,
    /// Set while a round trip is awaiting the device.
    command_pending: bool,
}

impl SessionInner {
    fn degraded(&self) -> bool {
        !(self.module_count_known && self.alphabet_known)
    }
}

/// Owner of the display connection and the command lock.
#[derive(Debug)]
pub struct DeviceSession {
    connector: AnyDisplayConnector,
    port: String,
    lock_timeout: Duration,
    command_timeout: Duration,
    fallback_module_count: usize,
    inner: Mutex<SessionInner>,
    snapshot: watch::Sender<SessionSnapshot>,
}

impl DeviceSession {
    pub fn new(connector: AnyDisplayConnector, config: &ControllerConfig) -> Self {
        let module_count = config.fallback_module_count;
        let alphabet = DeviceAlphabet::default();
        let (snapshot, _) = watch::channel(SessionSnapshot::disconnected(
            module_count,
            alphabet.clone(),
        ));

        Self {
            connector,
            port: config.serial_port.clone(),
            lock_timeout: config.lock_timeout(),
            command_timeout: config.command_timeout(),
            fallback_module_count: module_count,
            inner: Mutex::new(SessionInner {
                link: None,
                module_count,
                alphabet,
                module_count_known: false,
                alphabet_known: false,
                calibration: CalibrationState::new(module_count),
                command_pending: false,
            }),
            snapshot,
        }
    }

    pub fn port(&self) -> &str {
        &self.port
    }

    /// Latest published metadata. Never waits on the command lock.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    /// Watch metadata changes as they are published.
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.subscribe()
    }

    /// Take the command lock, waiting at most the configured lock timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Busy`] if another command holds the lock for
    /// longer than the timeout.
    pub async fn acquire(&self) -> Result<SessionGuard<'_>> {
        let inner = match tokio::time::timeout(self.lock_timeout, self.inner.lock()).await {
            Ok(inner) => inner,
            Err(_) => {
                let waited_ms = self.lock_timeout.as_millis() as u64;
                warn!(port = %self.port, waited_ms, "Command lock busy, rejecting caller");
                return Err(ControlError::busy(waited_ms));
            }
        };
        trace!(port = %self.port, "Command lock acquired");

        let mut guard = SessionGuard {
            session: self,
            inner,
        };
        if guard.inner.command_pending {
            warn!(port = %self.port, "Previous command was abandoned mid-flight, dropping link");
            guard.inner.command_pending = false;
            guard.close_link().await;
        }
        Ok(guard)
    }

    /// Open the link and learn the device configuration.
    ///
    /// An already open link is closed first.
    ///
    /// # Errors
    ///
    /// - [`ControlError::Busy`] if the lock is not available in time
    /// - [`ControlError::Transport`] with `ConnectionFailed` if the handshake
    ///   fails or times out
    pub async fn connect(&self) -> Result<SessionSnapshot> {
        self.acquire().await?.establish().await
    }

    /// Close the link. Succeeds whether or not a link was open.
    pub async fn disconnect(&self) -> Result<()> {
        let mut guard = self.acquire().await?;
        if guard.close_link().await {
            info!(port = %self.port, "Display disconnected");
        } else {
            debug!(port = %self.port, "Disconnect requested with no open link");
        }
        Ok(())
    }

    fn publish(&self, inner: &SessionInner) {
        let connected = inner.link.is_some();
        self.snapshot.send_replace(SessionSnapshot {
            connected,
            module_count: inner.module_count,
            alphabet: inner.alphabet.clone(),
            transport_identifier: inner.link.as_ref().map(|l| l.identifier().to_string()),
            degraded: connected && inner.degraded(),
        });
    }
}

/// Exclusive access to the display for the duration of one operation.
///
/// Holds the command lock until dropped.
#[derive(Debug)]
pub struct SessionGuard<'a> {
    session: &'a DeviceSession,
    inner: MutexGuard<'a, SessionInner>,
}

impl SessionGuard<'_> {
    pub fn is_connected(&self) -> bool {
        self.inner.link.is_some()
    }

    pub fn module_count(&self) -> usize {
        self.inner.module_count
    }

    pub fn alphabet(&self) -> &DeviceAlphabet {
        &self.inner.alphabet
    }

    pub fn is_degraded(&self) -> bool {
        self.inner.degraded()
    }

    pub fn calibration(&self) -> &CalibrationState {
        &self.inner.calibration
    }

    pub fn calibration_mut(&mut self) -> &mut CalibrationState {
        &mut self.inner.calibration
    }

    /// Connect (or reconnect) while already holding the lock.
    pub async fn establish(&mut self) -> Result<SessionSnapshot> {
        if self.close_link().await {
            debug!(port = %self.session.port, "Closed previous link before reconnecting");
        }

        let session = self.session;
        let port = session.port.as_str();
        let timeout = session.command_timeout;
        let link = match tokio::time::timeout(timeout, session.connector.connect(port)).await {
            Ok(Ok(link)) => link,
            Ok(Err(e)) => {
                error!(port = %port, error = %e, "Failed to connect to display");
                return Err(e.into());
            }
            Err(_) => {
                error!(port = %port, timeout_ms = timeout.as_millis() as u64, "Display handshake timed out");
                return Err(TransportError::connection_failed(
                    port,
                    format!("handshake timed out after {}ms", timeout.as_millis()),
                )
                .into());
            }
        };
        // Pending until published: a handshake dropped while probing is torn
        // down by the next acquire.
        self.inner.link = Some(link);
        self.inner.command_pending = true;

        let (count, alphabet) = self.probe().await;
        if !self.adopt_module_count(count) {
            let fallback = session.fallback_module_count;
            warn!(port = %port, fallback, "Module count not yet known, using fallback");
            self.inner.module_count = fallback;
            self.inner.module_count_known = false;
            self.inner.calibration.resize(fallback);
        }
        if !self.adopt_alphabet(alphabet) {
            warn!(port = %port, "Alphabet not yet known, using built-in default");
            self.inner.alphabet = DeviceAlphabet::default();
            self.inner.alphabet_known = false;
        }

        info!(
            port = %port,
            module_count = self.inner.module_count,
            degraded = self.inner.degraded(),
            "Display connected"
        );
        self.inner.command_pending = false;
        session.publish(&self.inner);
        Ok(session.snapshot())
    }

    /// Re-ask a degraded device for its configuration.
    ///
    /// Returns `true` if anything the device reported was adopted.
    pub async fn refresh_configuration(&mut self) -> bool {
        if self.inner.link.is_none() || !self.inner.degraded() {
            return false;
        }

        let (count, alphabet) = self.probe().await;
        let mut changed = false;
        if !self.inner.module_count_known {
            changed |= self.adopt_module_count(count);
        }
        if !self.inner.alphabet_known {
            changed |= self.adopt_alphabet(alphabet);
        }

        if changed {
            info!(
                module_count = self.inner.module_count,
                degraded = self.inner.degraded(),
                "Device configuration discovered"
            );
            self.session.publish(&self.inner);
        }
        changed
    }

    /// Module count as the device reports it right now.
    pub async fn query_module_count(&mut self) -> Probe<usize> {
        let timeout = self.session.command_timeout;
        match self.inner.link.as_mut() {
            Some(link) => tokio::time::timeout(timeout, link.module_count())
                .await
                .unwrap_or(Probe::NotYetKnown),
            None => Probe::NotYetKnown,
        }
    }

    /// Alphabet as the device reports it right now.
    pub async fn query_alphabet(&mut self) -> Probe<Vec<char>> {
        let timeout = self.session.command_timeout;
        match self.inner.link.as_mut() {
            Some(link) => tokio::time::timeout(timeout, link.alphabet())
                .await
                .unwrap_or(Probe::NotYetKnown),
            None => Probe::NotYetKnown,
        }
    }

    /// Put a normalized message on the display.
    ///
    /// `message` must have been normalized against this session's current
    /// module count and alphabet.
    pub async fn send_text(&mut self, message: &DisplayMessage, force: ForceMovement) -> Result<()> {
        let timeout = self.session.command_timeout;
        let link = self.link_mut()?;
        debug!(text = %message, ?force, "Writing text to display");

        let outcome = tokio::time::timeout(timeout, link.write_text(message.chars(), force)).await;
        self.finish("write_text", outcome).await
    }

    pub async fn send_calibration_command(
        &mut self,
        module_id: usize,
        command: CalibrationCommand,
    ) -> Result<()> {
        let timeout = self.session.command_timeout;
        let link = self.link_mut()?;
        debug!(module_id, ?command, "Writing calibration command");

        let outcome =
            tokio::time::timeout(timeout, link.write_calibration(module_id, command)).await;
        self.finish("write_calibration", outcome).await
    }

    pub async fn persist_offsets(&mut self) -> Result<Vec<PersistOutcome>> {
        let timeout = self.session.command_timeout;
        let link = self.link_mut()?;
        debug!("Requesting offset persistence");

        let outcome = tokio::time::timeout(timeout, link.persist_offsets()).await;
        self.finish("persist_offsets", outcome).await
    }

    pub async fn reset_modules(&mut self) -> Result<()> {
        let timeout = self.session.command_timeout;
        let link = self.link_mut()?;
        debug!("Resetting all modules");

        let outcome = tokio::time::timeout(timeout, link.reset_modules()).await;
        self.finish("reset_modules", outcome).await
    }

    fn link_mut(&mut self) -> Result<&mut AnyDisplayLink> {
        let inner = &mut *self.inner;
        let link = inner.link.as_mut().ok_or(ControlError::NotConnected)?;
        inner.command_pending = true;
        Ok(link)
    }

    async fn finish<T>(
        &mut self,
        operation: &'static str,
        outcome: std::result::Result<splitflap_hardware::Result<T>, Elapsed>,
    ) -> Result<T> {
        self.inner.command_pending = false;
        match outcome {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) if e.is_link_lost() => {
                error!(operation, error = %e, "Display link lost, tearing down");
                self.close_link().await;
                Err(e.into())
            }
            Ok(Err(e)) => {
                warn!(operation, error = %e, "Display rejected command");
                Err(e.into())
            }
            Err(_) => {
                let timeout_ms = self.session.command_timeout.as_millis() as u64;
                error!(operation, timeout_ms, "Display round trip timed out, tearing down link");
                self.close_link().await;
                Err(TransportError::timeout(timeout_ms).into())
            }
        }
    }

    async fn probe(&mut self) -> (Probe<usize>, Probe<Vec<char>>) {
        let count = self.query_module_count().await;
        let alphabet = self.query_alphabet().await;
        (count, alphabet)
    }

    fn adopt_module_count(&mut self, probe: Probe<usize>) -> bool {
        match probe {
            Probe::Known(0) => {
                warn!("Device reported zero modules, ignoring");
                false
            }
            Probe::Known(count) => {
                self.inner.module_count = count;
                self.inner.module_count_known = true;
                self.inner.calibration.resize(count);
                true
            }
            Probe::NotYetKnown => false,
        }
    }

    fn adopt_alphabet(&mut self, probe: Probe<Vec<char>>) -> bool {
        let Probe::Known(chars) = probe else {
            return false;
        };
        match DeviceAlphabet::new(chars) {
            Ok(alphabet) => {
                self.inner.alphabet = alphabet;
                self.inner.alphabet_known = true;
                true
            }
            Err(e) => {
                warn!(error = %e, "Device reported an unusable alphabet, ignoring");
                false
            }
        }
    }

    /// Close and drop the link if there is one, then publish.
    ///
    /// Close failures are logged and swallowed; the link is gone either way.
    async fn close_link(&mut self) -> bool {
        let Some(mut link) = self.inner.link.take() else {
            self.session.publish(&self.inner);
            return false;
        };

        match tokio::time::timeout(self.session.command_timeout, link.close()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!(error = %e, "Error while closing display link"),
            Err(_) => warn!("Timed out closing display link"),
        }
        self.session.publish(&self.inner);
        true
    }
}
