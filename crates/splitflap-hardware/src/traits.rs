//! Display transport trait definitions.
//!
//! These traits are the contract between the device session and whatever
//! actually moves bytes to the display. A [`DisplayConnector`] opens links;
//! a [`DisplayLink`] is one open link and carries every command.
//!
//! All traits use native `async fn` methods (Rust 1.90 + Edition 2024 RPITIT),
//! eliminating the need for the `async_trait` macro.

#![allow(async_fn_in_trait)]

use crate::error::Result;
use crate::types::{CalibrationCommand, ForceMovement, PersistOutcome, Probe};

/// Factory for display links.
///
/// # Object Safety and Dynamic Dispatch
///
/// **NOTE**: This trait is NOT object-safe because `async fn` methods return
/// `impl Future`. Use generic type parameters, or the enum wrappers in
/// [`devices`](crate::devices) where a concrete type is needed:
///
/// ```no_run
/// use splitflap_hardware::devices::AnyDisplayConnector;
/// use splitflap_hardware::mock::MockConnector;
/// use splitflap_hardware::traits::{DisplayConnector, DisplayLink};
///
/// # async fn example() -> splitflap_hardware::Result<()> {
/// let (connector, _handle) = MockConnector::new();
/// let connector = AnyDisplayConnector::Mock(connector);
///
/// let mut link = connector.connect("/dev/ttyUSB0").await?;
/// link.close().await?;
/// # Ok(())
/// # }
/// ```
pub trait DisplayConnector: Send + Sync {
    /// The link type produced by a successful handshake.
    type Link: DisplayLink;

    /// Open a link to the display on `port` and complete the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::ConnectionFailed`](crate::TransportError::ConnectionFailed)
    /// if the port cannot be opened or the device does not answer.
    async fn connect(&self, port: &str) -> Result<Self::Link>;
}

/// One open link to a splitflap display.
///
/// Callers must serialize access: a link assumes exactly one command is in
/// flight at a time. The session's command lock provides that.
///
/// # Examples
///
/// ```no_run
/// use splitflap_hardware::traits::DisplayLink;
/// use splitflap_hardware::types::ForceMovement;
/// use splitflap_hardware::error::Result;
///
/// async fn blank<L: DisplayLink>(link: &mut L) -> Result<()> {
///     let count = link.module_count().await.unwrap_or(6);
///     link.write_text(&vec![' '; count], ForceMovement::None).await
/// }
/// ```
pub trait DisplayLink: Send + Sync {
    /// Transport identifier, e.g. the serial port path.
    fn identifier(&self) -> &str;

    /// Number of modules the device reports.
    ///
    /// Returns [`Probe::NotYetKnown`] during the warm-up window after
    /// power-on. Never fails.
    async fn module_count(&mut self) -> Probe<usize>;

    /// The device's flap alphabet, in drum order.
    ///
    /// Returns [`Probe::NotYetKnown`] during the warm-up window after
    /// power-on. Never fails.
    async fn alphabet(&mut self) -> Probe<Vec<char>>;

    /// Show `text` on the display, one character per module.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The link has dropped
    /// - The device rejects the frame
    async fn write_text(&mut self, text: &[char], force: ForceMovement) -> Result<()>;

    /// Send one calibration instruction for `module_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The link has dropped
    /// - The device rejects the command
    async fn write_calibration(&mut self, module_id: usize, command: CalibrationCommand)
    -> Result<()>;

    /// Ask the device to store every module's offset durably.
    ///
    /// The device answers per module. A module may be missing from the reply
    /// if the device did not get to it.
    ///
    /// # Errors
    ///
    /// Returns an error only if the request could not be sent at all.
    async fn persist_offsets(&mut self) -> Result<Vec<PersistOutcome>>;

    /// Home every module and re-run the device's own sensor calibration.
    ///
    /// # Errors
    ///
    /// Returns an error if the link has dropped or the device does not
    /// support resetting.
    async fn reset_modules(&mut self) -> Result<()>;

    /// Close the link. Calling it on an already closed or broken link is
    /// not an error.
    async fn close(&mut self) -> Result<()>;
}
