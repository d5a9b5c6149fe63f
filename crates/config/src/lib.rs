// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::path::Path;

/// Default schema version for YAML configs
fn default_schema_version() -> String {
    "1.0".to_string()
}

fn default_clock_hz() -> u64 {
    50_000_000
}

fn default_hold_ms() -> u64 {
    200
}

/// Peripheral models understood by the board model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PeripheralKind {
    PioIn,
    PioOut,
    IntervalTimer,
    JtagUart,
}

impl PeripheralKind {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pio_in" => Some(Self::PioIn),
            "pio_out" => Some(Self::PioOut),
            "interval_timer" => Some(Self::IntervalTimer),
            "jtag_uart" => Some(Self::JtagUart),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::PioIn => "pio_in",
            Self::PioOut => "pio_out",
            Self::IntervalTimer => "interval_timer",
            Self::JtagUart => "jtag_uart",
        }
    }

    /// Bytes of address space the peripheral decodes from its base.
    pub fn window_size(self) -> u64 {
        match self {
            Self::PioIn | Self::PioOut => 0x10,
            Self::IntervalTimer => 0x20,
            Self::JtagUart => 0x08,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PeripheralConfig {
    pub id: String,
    pub r#type: String, // "pio_in", "pio_out", "interval_timer", "jtag_uart"
    pub base_address: u64,
    #[serde(default)]
    pub irq: Option<u32>,
    #[serde(default)]
    pub config: HashMap<String, serde_yaml::Value>,
}

impl PeripheralConfig {
    pub fn kind(&self) -> Option<PeripheralKind> {
        PeripheralKind::parse(&self.r#type)
    }

    /// Integer entry from the free-form `config` map.
    pub fn config_u64(&self, key: &str) -> Option<u64> {
        self.config.get(key).and_then(|v| v.as_u64())
    }
}

/// Which peripheral plays which role for the firmware.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Bindings {
    pub switches: String,
    pub buttons: String,
    pub hex_low: String,
    pub hex_high: String,
    pub leds: String,
    pub timer: String,
    pub jtag_uart: String,
}

impl Bindings {
    /// `(role, peripheral id, required kind)` for every role.
    pub fn roles(&self) -> [(&'static str, &str, PeripheralKind); 7] {
        [
            ("switches", self.switches.as_str(), PeripheralKind::PioIn),
            ("buttons", self.buttons.as_str(), PeripheralKind::PioIn),
            ("hex_low", self.hex_low.as_str(), PeripheralKind::PioOut),
            ("hex_high", self.hex_high.as_str(), PeripheralKind::PioOut),
            ("leds", self.leds.as_str(), PeripheralKind::PioOut),
            ("timer", self.timer.as_str(), PeripheralKind::IntervalTimer),
            ("jtag_uart", self.jtag_uart.as_str(), PeripheralKind::JtagUart),
        ]
    }
}

/// Optional overrides of the firmware loop timing.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct FirmwareTiming {
    #[serde(default)]
    pub default_period_ms: Option<u16>,
    #[serde(default)]
    pub settle_ms: Option<u32>,
    #[serde(default)]
    pub release_ms: Option<u32>,
    #[serde(default)]
    pub timer_ticks_per_ms: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardDescriptor {
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub name: String,
    #[serde(default = "default_clock_hz")]
    pub clock_hz: u64,
    pub peripherals: Vec<PeripheralConfig>,
    pub bindings: Bindings,
    #[serde(default)]
    pub firmware: FirmwareTiming,
}

impl BoardDescriptor {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read board descriptor at {:?}", path))?;
        let board = Self::from_yaml(&content)
            .with_context(|| format!("Invalid board descriptor {:?}", path))?;
        Ok(board)
    }

    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let board: Self =
            serde_yaml::from_str(yaml).context("Failed to parse Board Descriptor YAML")?;
        board.validate()?;
        Ok(board)
    }

    pub fn peripheral(&self, id: &str) -> Option<&PeripheralConfig> {
        self.peripherals.iter().find(|p| p.id == id)
    }

    /// Base address of the peripheral bound to `role`.
    pub fn bound_base(&self, role: &str) -> Option<u64> {
        let (_, id, _) = self.bindings.roles().into_iter().find(|(r, _, _)| *r == role)?;
        self.peripheral(id).map(|p| p.base_address)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.clock_hz == 0 {
            anyhow::bail!("Board 'clock_hz' must be greater than zero");
        }

        let mut seen = HashSet::new();
        for p in &self.peripherals {
            if !seen.insert(p.id.as_str()) {
                anyhow::bail!("Duplicate peripheral id '{}'", p.id);
            }
            if p.kind().is_none() {
                anyhow::bail!(
                    "Peripheral '{}' has unknown type '{}'. Supported types: pio_in, pio_out, interval_timer, jtag_uart",
                    p.id,
                    p.r#type
                );
            }
            if p.base_address % 4 != 0 || p.base_address > u64::from(u32::MAX) {
                anyhow::bail!(
                    "Peripheral '{}' base_address {:#x} must be a word-aligned 32-bit address",
                    p.id,
                    p.base_address
                );
            }
        }

        let mut windows: Vec<(u64, u64, &str)> = self
            .peripherals
            .iter()
            .filter_map(|p| {
                let size = p.kind()?.window_size();
                Some((p.base_address, p.base_address + size, p.id.as_str()))
            })
            .collect();
        windows.sort_unstable();
        for pair in windows.windows(2) {
            let (a_start, a_end, a_id) = pair[0];
            let (b_start, _, b_id) = pair[1];
            if b_start < a_end {
                anyhow::bail!(
                    "Peripheral '{}' at {:#x} overlaps '{}' ({:#x}..{:#x})",
                    b_id,
                    b_start,
                    a_id,
                    a_start,
                    a_end
                );
            }
        }

        for (role, id, kind) in self.bindings.roles() {
            let Some(p) = self.peripheral(id) else {
                anyhow::bail!("Binding '{}' refers to unknown peripheral '{}'", role, id);
            };
            if p.kind() != Some(kind) {
                anyhow::bail!(
                    "Binding '{}' requires type '{}', but '{}' is '{}'",
                    role,
                    kind.as_str(),
                    id,
                    p.r#type
                );
            }
        }

        let timer_id = &self.bindings.timer;
        if self.peripheral(timer_id).and_then(|p| p.irq).is_none() {
            anyhow::bail!("Timer peripheral '{}' must declare an irq", timer_id);
        }

        if let Some(ms) = self.firmware.default_period_ms {
            if ms == 0 || ms > 1023 {
                anyhow::bail!("firmware.default_period_ms must be within 1..=1023, got {}", ms);
            }
        }
        if self.firmware.timer_ticks_per_ms == Some(0) {
            anyhow::bail!("firmware.timer_ticks_per_ms must be greater than zero");
        }

        Ok(())
    }
}

const DEFAULT_BOARD_YAML: &str = r#"
schema_version: "1.0"
name: "de10-lite-blinker"
clock_hz: 50000000
peripherals:
  - id: "jtag_uart_0"
    type: "jtag_uart"
    base_address: 0x00011000
    irq: 0
    config:
      fifo_depth: 64
      drain_cycles: 500
  - id: "interval_timer"
    type: "interval_timer"
    base_address: 0x00011020
    irq: 1
  - id: "leds"
    type: "pio_out"
    base_address: 0x00011040
    config:
      width: 10
  - id: "switches"
    type: "pio_in"
    base_address: 0x00011050
    config:
      width: 10
  - id: "pushbt"
    type: "pio_in"
    base_address: 0x00011060
    config:
      width: 4
      idle: 0xF
  - id: "disp_0_to_2"
    type: "pio_out"
    base_address: 0x00011070
    config:
      width: 24
  - id: "disp_3_to_5"
    type: "pio_out"
    base_address: 0x00011080
    config:
      width: 24
bindings:
  switches: "switches"
  buttons: "pushbt"
  hex_low: "disp_0_to_2"
  hex_high: "disp_3_to_5"
  leds: "leds"
  timer: "interval_timer"
  jtag_uart: "jtag_uart_0"
"#;

/// The reference DE10-Lite style layout used when no board file is given.
pub fn default_board() -> Result<BoardDescriptor> {
    BoardDescriptor::from_yaml(DEFAULT_BOARD_YAML).context("Built-in board descriptor")
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ScenarioInputs {
    #[serde(default)]
    pub board: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct ScenarioLimits {
    /// Simulated time to run for.
    pub duration_ms: u64,
    #[serde(default)]
    pub max_steps: Option<u64>,
    /// Bound on button-release polling; unbounded when absent.
    #[serde(default)]
    pub release_poll_limit: Option<u32>,
    #[serde(default)]
    pub max_uart_bytes: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Button {
    Pause,
    Load,
}

impl Button {
    /// Bit of the button in the (active-low) push-button register.
    pub fn mask(self) -> u32 {
        match self {
            Button::Pause => 0x01,
            Button::Load => 0x02,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StimulusAction {
    SetSwitches(u16),
    Press(Button),
    Release(Button),
    Click {
        button: Button,
        #[serde(default = "default_hold_ms")]
        hold_ms: u64,
    },
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ScenarioEvent {
    pub at_ms: u64,
    #[serde(flatten)]
    pub action: StimulusAction,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// Runner failed before simulation started (e.g. script parse/validation error).
    ConfigError,
    Duration,
    MaxSteps,
    MaxUartBytes,
    /// A button was never released within `release_poll_limit` polls.
    ReleaseTimeout,
    /// The firmware touched an address no peripheral decodes.
    BusFault,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct UartContainsAssertion {
    pub uart_contains: String,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PeriodAssertion {
    pub expected_period: u16,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct PausedAssertion {
    pub expected_paused: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DisplayWord {
    Pause,
}

/// What the six digits should read: the pause banner or a decimal value.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum DisplayExpectation {
    Value(u16),
    Word(DisplayWord),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct DisplayAssertion {
    pub expected_display: DisplayExpectation,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct TimerRunningAssertion {
    pub timer_running: bool,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct LedTogglesAssertion {
    pub min_led_toggles: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct StopReasonAssertion {
    pub expected_stop_reason: StopReason,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(untagged)]
pub enum ScenarioAssertion {
    UartContains(UartContainsAssertion),
    ExpectedPeriod(PeriodAssertion),
    ExpectedPaused(PausedAssertion),
    ExpectedDisplay(DisplayAssertion),
    TimerRunning(TimerRunningAssertion),
    MinLedToggles(LedTogglesAssertion),
    ExpectedStopReason(StopReasonAssertion),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(deny_unknown_fields)]
pub struct Scenario {
    pub schema_version: String,
    #[serde(default)]
    pub inputs: ScenarioInputs,
    pub limits: ScenarioLimits,
    #[serde(default)]
    pub events: Vec<ScenarioEvent>,
    #[serde(default)]
    pub assertions: Vec<ScenarioAssertion>,
}

impl Scenario {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let scenario: Self = serde_yaml::from_str(yaml).context("Failed to parse Scenario YAML")?;
        scenario.validate()?;
        Ok(scenario)
    }

    pub fn validate(&self) -> Result<()> {
        if self.schema_version != "1.0" {
            anyhow::bail!(
                "Unsupported schema_version '{}'. Supported versions: '1.0'",
                self.schema_version
            );
        }

        if self.limits.duration_ms == 0 {
            anyhow::bail!("Limit 'duration_ms' must be greater than zero");
        }
        if self.limits.max_steps == Some(0) {
            anyhow::bail!("Limit 'max_steps' must be greater than zero");
        }
        if self.limits.release_poll_limit == Some(0) {
            anyhow::bail!("Limit 'release_poll_limit' must be greater than zero");
        }

        if let Some(board) = &self.inputs.board {
            if board.trim().is_empty() {
                anyhow::bail!("Input 'board' path cannot be empty");
            }
        }

        let mut last_at = 0;
        let mut held: HashSet<Button> = HashSet::new();
        for (i, ev) in self.events.iter().enumerate() {
            if ev.at_ms < last_at {
                anyhow::bail!(
                    "Event #{} at {} ms comes before the previous event at {} ms; events must be sorted by 'at_ms'",
                    i,
                    ev.at_ms,
                    last_at
                );
            }
            last_at = ev.at_ms;

            match &ev.action {
                StimulusAction::SetSwitches(v) if *v > 0x3FF => {
                    anyhow::bail!("Event #{}: set_switches value {} exceeds 10 bits", i, v);
                }
                StimulusAction::SetSwitches(_) => {}
                StimulusAction::Press(b) => {
                    held.insert(*b);
                }
                StimulusAction::Release(b) => {
                    held.remove(b);
                }
                StimulusAction::Click { hold_ms: 0, .. } => {
                    anyhow::bail!("Event #{}: click 'hold_ms' must be greater than zero", i);
                }
                // A click ends released, whatever was held before it.
                StimulusAction::Click { button, .. } => {
                    held.remove(button);
                }
            }

            if ev.at_ms > self.limits.duration_ms {
                tracing::warn!(
                    "Event #{} at {} ms is past duration_ms {} and will never fire",
                    i,
                    ev.at_ms,
                    self.limits.duration_ms
                );
            }
        }

        if let Some(b) = held.iter().next() {
            anyhow::bail!("Button '{:?}' is pressed but never released", b);
        }

        Ok(())
    }
}

/// Load and validate a scenario script from YAML.
pub fn load_scenario<P: AsRef<Path>>(path: P) -> Result<Scenario> {
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read scenario at {:?}", path.as_ref()))?;
    Scenario::from_yaml(&contents)
}
