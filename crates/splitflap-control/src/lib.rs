//! Device control core for the splitflap display.
//!
//! This crate owns everything between a caller's request and the transport:
//!
//! - [`DeviceSession`]: the one connection to the display, guarded by a
//!   command lock with a bounded wait
//! - [`CalibrationState`]: per-module offsets and their workflow phase
//! - [`DisplayController`]: the facade the HTTP handlers and the console call
//! - [`api`]: the `{success, ..., error}` shapes those callers render
//!
//! # Examples
//!
//! ```
//! use splitflap_control::{ControllerConfig, DisplayController, ErrorKind};
//! use splitflap_hardware::mock::MockConnector;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (connector, _handle) = MockConnector::new();
//!     let controller = DisplayController::new(connector, ControllerConfig::default()).unwrap();
//!     controller.connect().await.unwrap();
//!
//!     let err = controller.set_text("$", false).await.unwrap_err();
//!     assert_eq!(err.kind(), ErrorKind::InvalidCharacters);
//!
//!     let offset = controller.adjust_calibration(2, 1).await.unwrap();
//!     assert_eq!(offset, 1);
//! }
//! ```

pub mod api;
pub mod calibration;
pub mod config;
pub mod controller;
pub mod error;
pub mod session;

pub use api::{
    CalibrationResponse, HealthResponse, ModuleSaveResult, SaveCalibrationResponse,
    SetTextResponse, StatusResponse,
};
pub use calibration::{CalibrationPhase, CalibrationState, CalibrationTransition, ModuleCalibration};
pub use config::{ControllerConfig, NegativeDeltaMode};
pub use controller::DisplayController;
pub use error::{ControlError, ErrorKind, Result};
pub use session::{DeviceSession, SessionGuard, SessionSnapshot};
