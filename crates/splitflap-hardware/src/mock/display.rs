//! Simulated splitflap display for testing and development.
//!
//! The mock keeps everything a test wants to assert on in one shared state:
//! the raw character stream written to the "wire", every calibration command,
//! the device-side offsets and what was persisted. A [`MockDisplayHandle`]
//! reads that state and scripts failures.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::{Result, TransportError};
use crate::traits::{DisplayConnector, DisplayLink};
use crate::types::{CalibrationCommand, ForceMovement, PersistOutcome, Probe};

/// End-of-frame marker on the simulated wire.
pub const FRAME_TERMINATOR: char = '\n';

const DEFAULT_MOCK_ALPHABET: [char; 40] = [
    ' ', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O', 'P', 'Q', 'R',
    'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', '.',
    ',', '\'',
];

/// One text frame as the device received it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextWrite {
    pub text: String,
    pub force: ForceMovement,
}

#[derive(Debug)]
struct MockState {
    module_count: usize,
    alphabet: Vec<char>,
    announced: bool,

    generation: u64,
    link_alive: bool,
    connect_count: usize,
    close_count: usize,
    reset_count: usize,

    wire: String,
    writes: Vec<TextWrite>,
    calibration_log: Vec<(usize, CalibrationCommand)>,
    offsets: Vec<i32>,
    persisted: Vec<i32>,

    command_delay: Duration,
    probe_delay: Duration,
    fail_connects: u32,
    fail_writes: u32,
    fail_calibrations: u32,
    reject_negative: bool,
    persist_failures: HashSet<usize>,
    persist_omissions: HashSet<usize>,

    in_flight: usize,
    max_in_flight: usize,
}

impl MockState {
    fn new(module_count: usize, alphabet: Vec<char>) -> Self {
        Self {
            module_count,
            alphabet,
            announced: true,
            generation: 0,
            link_alive: false,
            connect_count: 0,
            close_count: 0,
            reset_count: 0,
            wire: String::new(),
            writes: Vec::new(),
            calibration_log: Vec::new(),
            offsets: vec![0; module_count],
            persisted: vec![0; module_count],
            command_delay: Duration::ZERO,
            probe_delay: Duration::ZERO,
            fail_connects: 0,
            fail_writes: 0,
            fail_calibrations: 0,
            reject_negative: false,
            persist_failures: HashSet::new(),
            persist_omissions: HashSet::new(),
            in_flight: 0,
            max_in_flight: 0,
        }
    }
}

fn lock(state: &Mutex<MockState>) -> MutexGuard<'_, MockState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks one command on the wire; releases its slot even if the caller
/// drops the future mid-command.
struct InFlight {
    state: Arc<Mutex<MockState>>,
}

impl InFlight {
    fn enter(state: &Arc<Mutex<MockState>>) -> Self {
        let mut s = lock(state);
        s.in_flight += 1;
        s.max_in_flight = s.max_in_flight.max(s.in_flight);
        Self {
            state: Arc::clone(state),
        }
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        lock(&self.state).in_flight -= 1;
    }
}

/// Mock connector that hands out links to one simulated display.
///
/// # Examples
///
/// ```
/// use splitflap_hardware::mock::MockConnector;
/// use splitflap_hardware::traits::{DisplayConnector, DisplayLink};
/// use splitflap_hardware::types::ForceMovement;
///
/// #[tokio::main]
/// async fn main() -> splitflap_hardware::Result<()> {
///     let (connector, handle) = MockConnector::new();
///
///     let mut link = connector.connect("/dev/ttyUSB0").await?;
///     link.write_text(&['H', 'I', ' ', ' ', ' ', ' '], ForceMovement::None).await?;
///
///     assert_eq!(handle.shown_text(), "HI    ");
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<Mutex<MockState>>,
}

impl MockConnector {
    /// A stock 6-module display with the 40-flap alphabet, already announced.
    pub fn new() -> (Self, MockDisplayHandle) {
        Self::with_config(6, DEFAULT_MOCK_ALPHABET.to_vec())
    }

    /// A display with a custom module count and alphabet.
    pub fn with_config(module_count: usize, alphabet: Vec<char>) -> (Self, MockDisplayHandle) {
        let state = Arc::new(Mutex::new(MockState::new(module_count, alphabet)));
        let connector = Self {
            state: Arc::clone(&state),
        };
        (connector, MockDisplayHandle { state })
    }

    /// A display that has just powered on and not yet announced its
    /// configuration. Call [`MockDisplayHandle::announce`] to finish warm-up.
    pub fn booting(module_count: usize, alphabet: Vec<char>) -> (Self, MockDisplayHandle) {
        let (connector, handle) = Self::with_config(module_count, alphabet);
        lock(&handle.state).announced = false;
        (connector, handle)
    }
}

impl DisplayConnector for MockConnector {
    type Link = MockDisplay;

    async fn connect(&self, port: &str) -> Result<MockDisplay> {
        let generation = {
            let mut s = lock(&self.state);
            if s.fail_connects > 0 {
                s.fail_connects -= 1;
                return Err(TransportError::connection_failed(port, "simulated handshake failure"));
            }
            s.generation += 1;
            s.link_alive = true;
            s.connect_count += 1;
            s.generation
        };

        debug!(port = %port, generation, "Mock display connected");

        Ok(MockDisplay {
            state: Arc::clone(&self.state),
            generation,
            identifier: port.to_string(),
        })
    }
}

/// One open link to the simulated display.
#[derive(Debug)]
pub struct MockDisplay {
    state: Arc<Mutex<MockState>>,
    generation: u64,
    identifier: String,
}

impl MockDisplay {
    fn ensure_live(&self) -> Result<()> {
        let s = lock(&self.state);
        if s.generation != self.generation || !s.link_alive {
            return Err(TransportError::disconnected(&self.identifier));
        }
        Ok(())
    }

    async fn command_delay(&self) {
        let delay = lock(&self.state).command_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    async fn probe_delay(&self) {
        let delay = lock(&self.state).probe_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

impl DisplayLink for MockDisplay {
    fn identifier(&self) -> &str {
        &self.identifier
    }

    async fn module_count(&mut self) -> Probe<usize> {
        self.probe_delay().await;
        let s = lock(&self.state);
        if s.announced {
            Probe::Known(s.module_count)
        } else {
            Probe::NotYetKnown
        }
    }

    async fn alphabet(&mut self) -> Probe<Vec<char>> {
        self.probe_delay().await;
        let s = lock(&self.state);
        if s.announced {
            Probe::Known(s.alphabet.clone())
        } else {
            Probe::NotYetKnown
        }
    }

    async fn write_text(&mut self, text: &[char], force: ForceMovement) -> Result<()> {
        let _slot = InFlight::enter(&self.state);
        self.ensure_live()?;
        self.command_delay().await;

        {
            let mut s = lock(&self.state);
            if s.fail_writes > 0 {
                s.fail_writes -= 1;
                return Err(TransportError::communication("simulated write failure"));
            }
        }

        for c in text.iter().copied().chain(std::iter::once(FRAME_TERMINATOR)) {
            lock(&self.state).wire.push(c);
            tokio::task::yield_now().await;
        }

        let text: String = text.iter().collect();
        trace!(text = %text, ?force, "Mock display frame received");
        lock(&self.state).writes.push(TextWrite { text, force });
        Ok(())
    }

    async fn write_calibration(
        &mut self,
        module_id: usize,
        command: CalibrationCommand,
    ) -> Result<()> {
        let _slot = InFlight::enter(&self.state);
        self.ensure_live()?;
        self.command_delay().await;

        let mut s = lock(&self.state);
        if s.fail_calibrations > 0 {
            s.fail_calibrations -= 1;
            return Err(TransportError::communication("simulated calibration failure"));
        }
        if module_id >= s.module_count {
            return Err(TransportError::communication(format!(
                "module {module_id} not present"
            )));
        }

        match command {
            CalibrationCommand::Adjust { tenths } if tenths < 0 && s.reject_negative => {
                return Err(TransportError::unsupported("negative calibration delta"));
            }
            CalibrationCommand::Adjust { tenths } => s.offsets[module_id] += tenths,
            CalibrationCommand::CommitZero => s.offsets[module_id] = 0,
        }
        s.calibration_log.push((module_id, command));
        Ok(())
    }

    async fn persist_offsets(&mut self) -> Result<Vec<PersistOutcome>> {
        let _slot = InFlight::enter(&self.state);
        self.ensure_live()?;
        self.command_delay().await;

        let mut s = lock(&self.state);
        let mut outcomes = Vec::with_capacity(s.module_count);
        for module_id in 0..s.module_count {
            if s.persist_omissions.contains(&module_id) {
                continue;
            }
            if s.persist_failures.contains(&module_id) {
                outcomes.push(PersistOutcome::failed(module_id, "EEPROM write failed"));
                continue;
            }
            s.persisted[module_id] = s.offsets[module_id];
            outcomes.push(PersistOutcome::saved(module_id));
        }
        Ok(outcomes)
    }

    async fn reset_modules(&mut self) -> Result<()> {
        let _slot = InFlight::enter(&self.state);
        self.ensure_live()?;
        self.command_delay().await;

        lock(&self.state).reset_count += 1;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        let mut s = lock(&self.state);
        if s.generation == self.generation && s.link_alive {
            s.link_alive = false;
            s.close_count += 1;
            debug!(port = %self.identifier, "Mock display closed");
        }
        Ok(())
    }
}

/// Handle for inspecting and scripting a mock display.
///
/// Cloneable; all clones observe the same display.
#[derive(Debug, Clone)]
pub struct MockDisplayHandle {
    state: Arc<Mutex<MockState>>,
}

impl MockDisplayHandle {
    // ------------------------------------------------------------------
    // Scripting
    // ------------------------------------------------------------------

    /// Finish the warm-up window; configuration queries start answering.
    pub fn announce(&self) {
        lock(&self.state).announced = true;
    }

    /// Make every command wait this long before touching the wire.
    pub fn set_command_delay(&self, delay: Duration) {
        lock(&self.state).command_delay = delay;
    }

    /// Make configuration queries answer this late, like a slow serial probe.
    pub fn set_probe_delay(&self, delay: Duration) {
        lock(&self.state).probe_delay = delay;
    }

    pub fn fail_next_connects(&self, count: u32) {
        lock(&self.state).fail_connects = count;
    }

    pub fn fail_next_writes(&self, count: u32) {
        lock(&self.state).fail_writes = count;
    }

    pub fn fail_next_calibrations(&self, count: u32) {
        lock(&self.state).fail_calibrations = count;
    }

    /// Emulate firmware that can only step forward.
    pub fn reject_negative_deltas(&self, reject: bool) {
        lock(&self.state).reject_negative = reject;
    }

    /// Report a failure for `module_id` on the next persist requests.
    pub fn fail_persist_for(&self, module_id: usize) {
        lock(&self.state).persist_failures.insert(module_id);
    }

    /// Leave `module_id` out of persist replies entirely.
    pub fn omit_from_persist(&self, module_id: usize) {
        lock(&self.state).persist_omissions.insert(module_id);
    }

    /// Simulate a cable pull: the current link breaks, a reconnect works.
    pub fn unplug(&self) {
        lock(&self.state).link_alive = false;
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Complete frames seen on the wire, in arrival order.
    pub fn frames(&self) -> Vec<String> {
        let s = lock(&self.state);
        s.wire
            .split_terminator(FRAME_TERMINATOR)
            .map(str::to_string)
            .collect()
    }

    /// Raw character stream as it arrived.
    pub fn wire(&self) -> String {
        lock(&self.state).wire.clone()
    }

    pub fn text_writes(&self) -> Vec<TextWrite> {
        lock(&self.state).writes.clone()
    }

    /// Text of the last completed frame, or an empty string.
    pub fn shown_text(&self) -> String {
        lock(&self.state)
            .writes
            .last()
            .map(|w| w.text.clone())
            .unwrap_or_default()
    }

    pub fn calibration_commands(&self) -> Vec<(usize, CalibrationCommand)> {
        lock(&self.state).calibration_log.clone()
    }

    /// Offsets the device currently applies, per module.
    pub fn device_offsets(&self) -> Vec<i32> {
        lock(&self.state).offsets.clone()
    }

    /// Offsets last written to durable storage, per module.
    pub fn persisted_offsets(&self) -> Vec<i32> {
        lock(&self.state).persisted.clone()
    }

    pub fn is_link_alive(&self) -> bool {
        lock(&self.state).link_alive
    }

    pub fn connect_count(&self) -> usize {
        lock(&self.state).connect_count
    }

    pub fn close_count(&self) -> usize {
        lock(&self.state).close_count
    }

    pub fn reset_count(&self) -> usize {
        lock(&self.state).reset_count
    }

    /// Highest number of commands ever on the wire at once.
    pub fn max_in_flight(&self) -> usize {
        lock(&self.state).max_in_flight
    }
}
