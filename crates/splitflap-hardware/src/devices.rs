//! Enum wrappers for display transport dispatch.
//!
//! Native `async fn` in traits is not object-safe, so `Box<dyn DisplayLink>`
//! is not an option. These enums give the session one concrete connector and
//! link type whose futures are `Send`, while each variant keeps its own
//! implementation.
//!
//! # Examples
//!
//! ```
//! use splitflap_hardware::devices::AnyDisplayConnector;
//! use splitflap_hardware::mock::MockConnector;
//!
//! let (connector, _handle) = MockConnector::new();
//! let any_connector = AnyDisplayConnector::Mock(connector);
//! ```

use crate::Result;
use crate::mock::{MockConnector, MockDisplay};
use crate::traits::{DisplayConnector, DisplayLink};
use crate::types::{CalibrationCommand, ForceMovement, PersistOutcome, Probe};

/// Enum wrapper for connector dispatch.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum AnyDisplayConnector {
    /// Simulated display for development and testing.
    Mock(MockConnector),
}

impl DisplayConnector for AnyDisplayConnector {
    type Link = AnyDisplayLink;

    async fn connect(&self, port: &str) -> Result<AnyDisplayLink> {
        match self {
            Self::Mock(connector) => connector.connect(port).await.map(AnyDisplayLink::Mock),
        }
    }
}

impl From<MockConnector> for AnyDisplayConnector {
    fn from(connector: MockConnector) -> Self {
        Self::Mock(connector)
    }
}

/// Enum wrapper for link dispatch.
#[derive(Debug)]
#[non_exhaustive]
pub enum AnyDisplayLink {
    /// Simulated display for development and testing.
    Mock(MockDisplay),
}

impl DisplayLink for AnyDisplayLink {
    fn identifier(&self) -> &str {
        match self {
            Self::Mock(link) => link.identifier(),
        }
    }

    async fn module_count(&mut self) -> Probe<usize> {
        match self {
            Self::Mock(link) => link.module_count().await,
        }
    }

    async fn alphabet(&mut self) -> Probe<Vec<char>> {
        match self {
            Self::Mock(link) => link.alphabet().await,
        }
    }

    async fn write_text(&mut self, text: &[char], force: ForceMovement) -> Result<()> {
        match self {
            Self::Mock(link) => link.write_text(text, force).await,
        }
    }

    async fn write_calibration(
        &mut self,
        module_id: usize,
        command: CalibrationCommand,
    ) -> Result<()> {
        match self {
            Self::Mock(link) => link.write_calibration(module_id, command).await,
        }
    }

    async fn persist_offsets(&mut self) -> Result<Vec<PersistOutcome>> {
        match self {
            Self::Mock(link) => link.persist_offsets().await,
        }
    }

    async fn reset_modules(&mut self) -> Result<()> {
        match self {
            Self::Mock(link) => link.reset_modules().await,
        }
    }

    async fn close(&mut self) -> Result<()> {
        match self {
            Self::Mock(link) => link.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_any_connector_dispatch() {
        let (connector, handle) = MockConnector::new();
        let connector = AnyDisplayConnector::from(connector);

        let mut link = connector.connect("/dev/ttyACM0").await.unwrap();
        assert_eq!(link.identifier(), "/dev/ttyACM0");
        assert_eq!(link.module_count().await, Probe::Known(6));

        link.write_text(&['A'; 6], ForceMovement::All).await.unwrap();
        assert_eq!(handle.frames(), vec!["AAAAAA".to_string()]);

        link.close().await.unwrap();
        assert_eq!(handle.close_count(), 1);
    }
}
