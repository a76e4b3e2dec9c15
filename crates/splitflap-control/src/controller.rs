//! The display controller: every externally visible operation in one place.
//!
//! [`DisplayController`] composes the normalizer, the calibration ledger and
//! the device session. It is `Send + Sync`; share it behind an `Arc` between
//! the HTTP handlers and the console.
//!
//! # Examples
//!
//! ```
//! use splitflap_control::{ControllerConfig, DisplayController};
//! use splitflap_hardware::mock::MockConnector;
//!
//! #[tokio::main]
//! async fn main() -> splitflap_control::Result<()> {
//!     let (connector, handle) = MockConnector::new();
//!     let controller = DisplayController::new(connector, ControllerConfig::default())?;
//!
//!     controller.connect().await?;
//!     let shown = controller.set_text("hello", false).await?;
//!
//!     assert_eq!(shown.message.as_string(), "HELLO ");
//!     assert_eq!(handle.shown_text(), "HELLO ");
//!     Ok(())
//! }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};

use splitflap_core::{DisplayMessage, NormalizedMessage, module_marker_text, normalize};
use splitflap_hardware::{AnyDisplayConnector, CalibrationCommand, ForceMovement};
use tracing::{debug, error, info, warn};

use crate::api::{HealthResponse, ModuleSaveResult, StatusResponse};
use crate::calibration::{CalibrationState, device_steps, save_report};
use crate::config::ControllerConfig;
use crate::error::{ControlError, Result};
use crate::session::{DeviceSession, SessionGuard, SessionSnapshot};

pub struct DisplayController {
    session: DeviceSession,
    config: ControllerConfig,
    display_enabled: AtomicBool,
}

impl DisplayController {
    /// Build a controller around a connector. Does not connect.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Config`] if `config` fails validation.
    pub fn new(
        connector: impl Into<AnyDisplayConnector>,
        config: ControllerConfig,
    ) -> Result<Self> {
        config.validate()?;
        let session = DeviceSession::new(connector.into(), &config);
        Ok(Self {
            session,
            config,
            display_enabled: AtomicBool::new(true),
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    /// The underlying session, for callers that need to hold the lock
    /// across several commands.
    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Connect to the display. Does not retry on failure.
    pub async fn connect(&self) -> Result<SessionSnapshot> {
        self.session.connect().await
    }

    /// Disconnect from the display. Safe to call when not connected.
    pub async fn disconnect(&self) -> Result<()> {
        self.session.disconnect().await
    }

    // ------------------------------------------------------------------
    // Display
    // ------------------------------------------------------------------

    /// Normalize `raw` and show it.
    ///
    /// Validation runs against the published configuration first, so a
    /// malformed request fails without waiting for the lock. The text is
    /// normalized again under the lock against the authoritative
    /// configuration before it is written.
    ///
    /// # Errors
    ///
    /// - [`ControlError::DisplayDisabled`] while the display is switched off
    /// - [`ControlError::Validation`] for empty text or characters with no flap
    /// - [`ControlError::Busy`], [`ControlError::NotConnected`] or
    ///   [`ControlError::Transport`] if the write could not be done
    pub async fn set_text(&self, raw: &str, force_movement: bool) -> Result<NormalizedMessage> {
        if !self.is_display_enabled() {
            debug!("Rejecting text while display is disabled");
            return Err(ControlError::DisplayDisabled);
        }

        let snapshot = self.session.snapshot();
        normalize(raw, snapshot.module_count, &snapshot.alphabet)?;

        let force = ForceMovement::from(force_movement);
        let mut guard = self.session.acquire().await?;
        guard.refresh_configuration().await;

        let normalized = match Self::write_text(&mut guard, raw, force).await {
            Err(e) if self.should_retry(&e) => {
                warn!(error = %e, "Text write failed, reconnecting and retrying once");
                guard.establish().await?;
                Self::write_text(&mut guard, raw, force).await?
            }
            other => other?,
        };

        info!(
            text = %normalized.message,
            truncated = normalized.truncated,
            ?force,
            "Display text updated"
        );
        Ok(normalized)
    }

    async fn write_text(
        guard: &mut SessionGuard<'_>,
        raw: &str,
        force: ForceMovement,
    ) -> Result<NormalizedMessage> {
        let normalized = normalize(raw, guard.module_count(), guard.alphabet())?;
        guard.send_text(&normalized.message, force).await?;
        Ok(normalized)
    }

    /// Current connection metadata. Never takes the command lock.
    pub fn get_status(&self) -> StatusResponse {
        StatusResponse::from_snapshot(&self.session.snapshot(), self.is_display_enabled())
    }

    /// Liveness of the controller itself, independent of the display.
    pub fn health(&self) -> HealthResponse {
        HealthResponse::ok()
    }

    /// Switch public text updates on or off. Calibration is unaffected.
    pub fn set_display_enabled(&self, enabled: bool) {
        let was = self.display_enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            info!(enabled, "Display enabled state changed");
        }
    }

    pub fn is_display_enabled(&self) -> bool {
        self.display_enabled.load(Ordering::SeqCst)
    }

    /// Home every module. Calibration offsets are kept.
    pub async fn recalibrate_all(&self) -> Result<()> {
        let mut guard = self.session.acquire().await?;
        match guard.reset_modules().await {
            Err(e) if self.should_retry(&e) => {
                warn!(error = %e, "Reset failed, reconnecting and retrying once");
                guard.establish().await?;
                guard.reset_modules().await?;
            }
            other => other?,
        }
        info!("All modules recalibrated");
        Ok(())
    }

    /// Show the index digit of `module_id` at that module's position and
    /// blank everywhere else.
    pub async fn show_module_marker(&self, module_id: usize) -> Result<DisplayMessage> {
        let mut guard = self.session.acquire().await?;
        guard.refresh_configuration().await;

        let marker = match Self::write_marker(&mut guard, module_id).await {
            Err(e) if self.should_retry(&e) => {
                warn!(error = %e, module_id, "Marker write failed, reconnecting and retrying once");
                guard.establish().await?;
                Self::write_marker(&mut guard, module_id).await?
            }
            other => other?,
        };
        debug!(module_id, text = %marker, "Module marker shown");
        Ok(marker)
    }

    async fn write_marker(guard: &mut SessionGuard<'_>, module_id: usize) -> Result<DisplayMessage> {
        let marker = module_marker_text(module_id, guard.module_count(), guard.alphabet())?;
        guard.send_text(&marker, ForceMovement::None).await?;
        Ok(marker)
    }

    // ------------------------------------------------------------------
    // Calibration
    // ------------------------------------------------------------------

    /// Nudge a module by a signed number of tenth-steps and return its new
    /// tracked offset.
    ///
    /// The in-memory offset changes only after the device accepted every
    /// command. A zero delta sends nothing. Never retried.
    pub async fn adjust_calibration(&self, module_id: usize, delta_tenths: i32) -> Result<i32> {
        let mut guard = self.session.acquire().await?;
        guard.refresh_configuration().await;
        guard.calibration().check_module(module_id)?;
        if delta_tenths == 0 {
            return Ok(guard.calibration().offset(module_id)?);
        }

        let steps = device_steps(delta_tenths, self.config.negative_deltas);
        for (sent, &tenths) in steps.iter().enumerate() {
            if let Err(e) = guard
                .send_calibration_command(module_id, CalibrationCommand::Adjust { tenths })
                .await
            {
                if sent > 0 {
                    error!(
                        module_id,
                        delta_tenths,
                        sent,
                        total = steps.len(),
                        "Calibration interrupted part way, device position may differ from tracked offset"
                    );
                }
                return Err(e);
            }
        }

        let offset = guard.calibration_mut().adjust(module_id, delta_tenths)?;
        info!(module_id, delta_tenths, offset, "Calibration adjusted");
        Ok(offset)
    }

    /// Record a module's current physical position as its origin.
    ///
    /// The tracked offset is reset only if the device accepted the commit.
    pub async fn commit_calibration(&self, module_id: usize) -> Result<()> {
        let mut guard = self.session.acquire().await?;
        guard.refresh_configuration().await;
        guard.calibration().check_module(module_id)?;

        guard
            .send_calibration_command(module_id, CalibrationCommand::CommitZero)
            .await?;
        guard.calibration_mut().commit_as_zero(module_id)?;

        info!(module_id, "Calibration committed as zero");
        Ok(())
    }

    /// Persist every module's offset on the device.
    ///
    /// # Errors
    ///
    /// Returns [`ControlError::Persistence`] if any module failed; it carries
    /// the full per-module report so the saved modules are still visible.
    pub async fn save_calibration(&self) -> Result<Vec<ModuleSaveResult>> {
        let mut guard = self.session.acquire().await?;
        let module_count = guard.module_count();
        if !guard.calibration().any_committed() {
            warn!("Saving offsets with no committed module");
        }

        let outcomes = guard.persist_offsets().await?;
        let results = save_report(module_count, outcomes);

        let failed: Vec<usize> = results
            .iter()
            .filter(|r| !r.ok)
            .map(|r| r.module_id)
            .collect();
        for result in results.iter().filter(|r| !r.ok) {
            warn!(
                module_id = result.module_id,
                error = result.error.as_deref().unwrap_or_default(),
                "Module offset not persisted"
            );
        }

        if failed.is_empty() {
            info!(module_count, "All calibration offsets saved");
            Ok(results)
        } else {
            Err(ControlError::Persistence { failed, results })
        }
    }

    /// Copy of the calibration ledger.
    pub async fn calibration_state(&self) -> Result<CalibrationState> {
        let guard = self.session.acquire().await?;
        Ok(guard.calibration().clone())
    }

    fn should_retry(&self, error: &ControlError) -> bool {
        self.config.retry_after_reconnect
            && matches!(error, ControlError::Transport(e) if e.is_link_lost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splitflap_hardware::mock::MockConnector;

    #[test]
    fn test_new_rejects_invalid_config() {
        let (connector, _handle) = MockConnector::new();
        let config = ControllerConfig {
            lock_timeout_ms: 0,
            ..ControllerConfig::default()
        };
        assert!(matches!(
            DisplayController::new(connector, config),
            Err(ControlError::Config(_))
        ));
    }

    #[test]
    fn test_status_before_connect() {
        let (connector, _handle) = MockConnector::new();
        let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();

        let status = controller.get_status();
        assert!(!status.connected);
        assert_eq!(status.module_count, 6);
        assert!(status.display_enabled);
        assert!(status.error.is_some());
    }

    #[test]
    fn test_health_is_ok_without_connection() {
        let (connector, _handle) = MockConnector::new();
        let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();
        assert_eq!(controller.health().status, "ok");
    }

    #[tokio::test]
    async fn test_display_toggle() {
        let (connector, handle) = MockConnector::new();
        let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();
        controller.connect().await.unwrap();

        controller.set_display_enabled(false);
        let result = controller.set_text("HI", false).await;
        assert!(matches!(result, Err(ControlError::DisplayDisabled)));
        assert!(handle.frames().is_empty());
        assert!(!controller.get_status().display_enabled);

        controller.set_display_enabled(true);
        controller.set_text("HI", false).await.unwrap();
        assert_eq!(handle.frames(), vec!["HI    ".to_string()]);
    }

    #[tokio::test]
    async fn test_recalibrate_all_keeps_offsets() {
        let (connector, handle) = MockConnector::new();
        let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();
        controller.connect().await.unwrap();

        controller.adjust_calibration(1, 3).await.unwrap();
        controller.recalibrate_all().await.unwrap();

        assert_eq!(handle.reset_count(), 1);
        let state = controller.calibration_state().await.unwrap();
        assert_eq!(state.offset(1).unwrap(), 3);
    }

    #[tokio::test]
    async fn test_show_module_marker() {
        let (connector, handle) = MockConnector::new();
        let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();
        controller.connect().await.unwrap();

        let marker = controller.show_module_marker(3).await.unwrap();
        assert_eq!(marker.as_string(), "   3  ");
        assert_eq!(handle.shown_text(), "   3  ");

        let result = controller.show_module_marker(6).await;
        assert!(matches!(
            result,
            Err(ControlError::Validation(splitflap_core::Error::ModuleOutOfRange { .. }))
        ));
    }
}
