// BlinkWire - Period Blinker Firmware and Board Model
// Copyright (C) 2026 Andrii Shylenko
//
// This software is released under the MIT License.
// See the LICENSE file in the project root for full license information.

//! Timed operator input: switch changes and button presses.

use blinkwire_config::{Button, ScenarioEvent, StimulusAction};
use std::collections::VecDeque;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stimulus {
    SetSwitches(u16),
    Press(Button),
    Release(Button),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduledStimulus {
    pub at_cycle: u64,
    pub stimulus: Stimulus,
}

/// Stimuli ordered by time. Entries at the same cycle keep script order.
#[derive(Debug, Default, Clone)]
pub struct StimulusQueue {
    events: VecDeque<ScheduledStimulus>,
}

impl StimulusQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Expand scenario events (clicks become a press and a release) and
    /// convert their times to clock cycles.
    pub fn from_events(events: &[ScenarioEvent], cycles_per_ms: u64) -> Self {
        let mut expanded = Vec::with_capacity(events.len());
        for ev in events {
            let at_cycle = ev.at_ms.saturating_mul(cycles_per_ms);
            match ev.action {
                StimulusAction::SetSwitches(v) => expanded.push(ScheduledStimulus {
                    at_cycle,
                    stimulus: Stimulus::SetSwitches(v),
                }),
                StimulusAction::Press(b) => expanded.push(ScheduledStimulus {
                    at_cycle,
                    stimulus: Stimulus::Press(b),
                }),
                StimulusAction::Release(b) => expanded.push(ScheduledStimulus {
                    at_cycle,
                    stimulus: Stimulus::Release(b),
                }),
                StimulusAction::Click { button, hold_ms } => {
                    expanded.push(ScheduledStimulus {
                        at_cycle,
                        stimulus: Stimulus::Press(button),
                    });
                    expanded.push(ScheduledStimulus {
                        at_cycle: at_cycle.saturating_add(hold_ms.saturating_mul(cycles_per_ms)),
                        stimulus: Stimulus::Release(button),
                    });
                }
            }
        }
        expanded.sort_by_key(|s| s.at_cycle);
        Self {
            events: expanded.into(),
        }
    }

    pub fn push(&mut self, at_cycle: u64, stimulus: Stimulus) {
        let idx = self.events.partition_point(|s| s.at_cycle <= at_cycle);
        self.events.insert(idx, ScheduledStimulus { at_cycle, stimulus });
    }

    pub fn next_at(&self) -> Option<u64> {
        self.events.front().map(|s| s.at_cycle)
    }

    /// Next stimulus due at or before `now`.
    pub fn pop_due(&mut self, now: u64) -> Option<ScheduledStimulus> {
        if self.next_at()? <= now {
            self.events.pop_front()
        } else {
            None
        }
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}
