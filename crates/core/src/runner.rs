// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Drives the firmware controller against a board model for the length of a
//! scenario and checks the scenario's assertions.

use crate::board::{Board, SimHandle};
use crate::snapshot::BoardSnapshot;
use crate::stimulus::StimulusQueue;
use blinkwire_config::{
    BoardDescriptor, DisplayExpectation, Scenario, ScenarioAssertion, StopReason,
};
use blinkwire_firmware::display::encode_value;
use blinkwire_firmware::{
    Controller, Event, LedBlinker, Period, ReleaseWait, Timing, WaitOutcome, PAUSE_DIGITS,
};
use serde::Serialize;
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub echo_uart: bool,
    /// Replaces the scenario's `duration_ms` when set.
    pub duration_ms: Option<u64>,
    pub access_cycles: u64,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            echo_uart: true,
            duration_ms: None,
            access_cycles: crate::board::DEFAULT_ACCESS_CYCLES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pass,
    Fail,
    Error,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Pass => "pass",
            RunStatus::Fail => "fail",
            RunStatus::Error => "error",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssertionResult {
    pub assertion: ScenarioAssertion,
    pub passed: bool,
    pub detail: String,
}

/// A loop iteration that did something.
#[derive(Debug, Clone, Serialize)]
pub struct ObservedEvent {
    pub step: u64,
    pub at_ms: u64,
    pub event: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period_ms: Option<u16>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FirmwareState {
    pub period_ms: u16,
    pub paused: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub status: RunStatus,
    pub stop_reason: StopReason,
    pub steps_executed: u64,
    pub cycles: u64,
    pub elapsed_ms: u64,
    pub firmware: FirmwareState,
    pub assertions: Vec<AssertionResult>,
    pub events: Vec<ObservedEvent>,
    pub faults: Vec<crate::bus::BusFault>,
    pub uart_text: String,
    pub snapshot: BoardSnapshot,
}

/// Firmware timing for a board: descriptor overrides, then defaults. The
/// timer tick rate follows the board clock unless given explicitly.
pub fn timing_for(board: &BoardDescriptor, release_poll_limit: Option<u32>) -> Timing {
    let defaults = Timing::default();
    let fw = &board.firmware;
    Timing {
        settle_ms: fw.settle_ms.unwrap_or(defaults.settle_ms),
        release_ms: fw.release_ms.unwrap_or(defaults.release_ms),
        default_period: fw
            .default_period_ms
            .and_then(Period::new)
            .unwrap_or(defaults.default_period),
        ticks_per_ms: fw
            .timer_ticks_per_ms
            .unwrap_or_else(|| u32::try_from(board.clock_hz / 1000).unwrap_or(u32::MAX)),
        release_wait: release_poll_limit
            .map(ReleaseWait::AtMost)
            .unwrap_or(ReleaseWait::Forever),
    }
}

pub struct ScenarioRunner<'a> {
    board: &'a BoardDescriptor,
    scenario: &'a Scenario,
    options: RunOptions,
    uart_tx: Arc<Mutex<Vec<u8>>>,
}

impl<'a> ScenarioRunner<'a> {
    pub fn new(board: &'a BoardDescriptor, scenario: &'a Scenario, options: RunOptions) -> Self {
        Self {
            board,
            scenario,
            options,
            uart_tx: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn run(&self) -> anyhow::Result<RunReport> {
        let limits = &self.scenario.limits;
        let duration_ms = self.options.duration_ms.unwrap_or(limits.duration_ms);

        let mut board = Board::from_config(self.board)?;
        board.set_access_cycles(self.options.access_cycles);
        board
            .bus
            .attach_uart_tx_sink(self.uart_tx.clone(), self.options.echo_uart);
        let map = *board.map();
        match board.irq_of(map.timer) {
            Some(irq) => board.attach_isr(irq, Box::new(LedBlinker::new(map.timer, map.leds))),
            None => tracing::warn!("Timer has no IRQ line; LEDs will not blink"),
        }
        let cycles_per_ms = board.ms_to_cycles(1);
        board.schedule(StimulusQueue::from_events(
            &self.scenario.events,
            cycles_per_ms,
        ));
        let end_cycle = board.ms_to_cycles(duration_ms);

        let handle = SimHandle::new(board);
        let timing = timing_for(self.board, limits.release_poll_limit);
        let mut controller = Controller::new(handle.clone(), handle.clone(), map, timing);

        tracing::info!(
            "Running scenario for {} ms on board '{}'",
            duration_ms,
            self.board.name
        );
        controller.init();

        let mut steps: u64 = 0;
        let mut events = Vec::new();
        let stop_reason = loop {
            let (cycles, faults) = {
                let b = handle.board();
                (b.cycles(), b.bus.faults.len())
            };
            if faults > 0 {
                break StopReason::BusFault;
            }
            if cycles >= end_cycle {
                break StopReason::Duration;
            }
            if let Some(limit) = limits.max_steps {
                if steps >= limit {
                    break StopReason::MaxSteps;
                }
            }
            if let Some(limit) = limits.max_uart_bytes {
                let current_len = self.uart_tx.lock().map(|g| g.len() as u64).unwrap_or(0);
                if current_len >= limit {
                    break StopReason::MaxUartBytes;
                }
            }

            let event = controller.step();
            steps += 1;
            if event == Event::Idle {
                continue;
            }

            let at_ms = handle.board().elapsed_ms();
            let period_ms = match event {
                Event::Loaded(p) => Some(p.as_ms()),
                _ => None,
            };
            tracing::debug!("step {} t={}ms {:?}", steps, at_ms, event);
            events.push(ObservedEvent {
                step: steps,
                at_ms,
                event: event_name(event).to_string(),
                period_ms,
            });

            if let Some(WaitOutcome::TimedOut { polls }) = controller.last_wait() {
                tracing::error!("Button not released after {} polls", polls);
                break StopReason::ReleaseTimeout;
            }
        };

        let uart_text = {
            let bytes = self.uart_tx.lock().map(|g| g.clone()).unwrap_or_default();
            String::from_utf8_lossy(&bytes).to_string()
        };

        let board = handle.board();
        let snapshot = board.snapshot();
        let firmware = FirmwareState {
            period_ms: controller.period().as_ms(),
            paused: controller.is_paused(),
        };

        let mut assertion_results = Vec::new();
        let mut all_passed = true;
        let mut expected_stop_reason_matched = false;
        for assertion in &self.scenario.assertions {
            let (passed, detail) =
                evaluate(assertion, &uart_text, &firmware, &board, stop_reason);
            if matches!(assertion, ScenarioAssertion::ExpectedStopReason(_)) && passed {
                expected_stop_reason_matched = true;
            }
            if !passed {
                all_passed = false;
                tracing::error!("Assertion failed: {:?} ({})", assertion, detail);
            }
            assertion_results.push(AssertionResult {
                assertion: assertion.clone(),
                passed,
                detail,
            });
        }

        let stop_requires_assertion = matches!(stop_reason, StopReason::MaxUartBytes);
        let runtime_error = matches!(
            stop_reason,
            StopReason::BusFault | StopReason::ReleaseTimeout
        );

        let status = if !all_passed || (stop_requires_assertion && !expected_stop_reason_matched) {
            RunStatus::Fail
        } else if runtime_error && !expected_stop_reason_matched {
            RunStatus::Error
        } else {
            RunStatus::Pass
        };

        tracing::info!(
            "Scenario finished: {} after {} steps, {} ms ({:?})",
            status.as_str(),
            steps,
            snapshot.elapsed_ms,
            stop_reason
        );

        Ok(RunReport {
            status,
            stop_reason,
            steps_executed: steps,
            cycles: snapshot.cycles,
            elapsed_ms: snapshot.elapsed_ms,
            firmware,
            assertions: assertion_results,
            events,
            faults: board.bus.faults.clone(),
            uart_text,
            snapshot,
        })
    }
}

fn event_name(event: Event) -> &'static str {
    match event {
        Event::Idle => "idle",
        Event::Loaded(_) => "loaded",
        Event::LoadIgnored => "load_ignored",
        Event::Paused => "paused",
        Event::Resumed => "resumed",
    }
}

fn evaluate(
    assertion: &ScenarioAssertion,
    uart_text: &str,
    firmware: &FirmwareState,
    board: &Board,
    stop_reason: StopReason,
) -> (bool, String) {
    match assertion {
        ScenarioAssertion::UartContains(a) => (
            uart_text.contains(&a.uart_contains),
            format!("captured {} bytes", uart_text.len()),
        ),
        ScenarioAssertion::ExpectedPeriod(a) => (
            firmware.period_ms == a.expected_period,
            format!("period is {} ms", firmware.period_ms),
        ),
        ScenarioAssertion::ExpectedPaused(a) => (
            firmware.paused == a.expected_paused,
            format!("paused = {}", firmware.paused),
        ),
        ScenarioAssertion::ExpectedDisplay(a) => {
            let expected = match a.expected_display {
                DisplayExpectation::Value(v) => encode_value(v),
                DisplayExpectation::Word(_) => PAUSE_DIGITS,
            };
            let shown = board.display_digits();
            (
                shown == expected,
                format!(
                    "display shows '{}'",
                    crate::snapshot::display_text(&shown)
                ),
            )
        }
        ScenarioAssertion::TimerRunning(a) => {
            let running = board.timer().map(|t| t.is_running()).unwrap_or(false);
            (
                running == a.timer_running,
                format!("timer running = {}", running),
            )
        }
        ScenarioAssertion::MinLedToggles(a) => {
            let toggles = board.led_toggles();
            (
                toggles >= a.min_led_toggles,
                format!("{} LED toggles", toggles),
            )
        }
        ScenarioAssertion::ExpectedStopReason(a) => (
            a.expected_stop_reason == stop_reason,
            format!("stopped with {:?}", stop_reason),
        ),
    }
}
