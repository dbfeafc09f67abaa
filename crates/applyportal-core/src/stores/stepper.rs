use serde::{Deserialize, Serialize};

use super::persisted::{Section, SectionStore};

/// What "Next" requires from the current step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextGate {
    /// Step has never been confirmed by the server: the form must be valid
    RequireValid,
    /// Step already has server-confirmed data: only unsaved changes block
    RequireNoChanges,
}

/// Wizard position. Steps are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(default, rename_all = "camelCase")]
pub struct StepperPosition {
    pub current_step: u32,
    /// Furthest step with server-confirmed data, 0 when none
    pub max_completed_step: u32,
}

impl Default for StepperPosition {
    fn default() -> Self {
        Self {
            current_step: 1,
            max_completed_step: 0,
        }
    }
}

impl StepperPosition {
    /// Advance one step, never past `total_steps`
    pub fn next(&mut self, total_steps: u32) {
        let last = total_steps.max(1);
        self.current_step = (self.current_step + 1).min(last);
    }

    /// Go back one step, never before step 1
    pub fn previous(&mut self) {
        self.current_step = self.current_step.saturating_sub(1).max(1);
    }

    /// Raise the completed watermark to at least `step`; never lowers it
    pub fn mark_complete(&mut self, step: u32) {
        self.max_completed_step = self.max_completed_step.max(step);
    }

    /// Jump to `step` if it is at most one past the completed watermark.
    /// Returns whether the jump happened.
    pub fn go_to(&mut self, step: u32, total_steps: u32) -> bool {
        let reachable = (self.max_completed_step + 1).min(total_steps.max(1));
        if step >= 1 && step <= reachable {
            self.current_step = step;
            true
        } else {
            false
        }
    }

    pub fn next_gate(&self) -> NextGate {
        if self.current_step <= self.max_completed_step {
            NextGate::RequireNoChanges
        } else {
            NextGate::RequireValid
        }
    }

    pub fn is_complete(&self, step: u32) -> bool {
        step >= 1 && step <= self.max_completed_step
    }
}

impl Section for StepperPosition {
    const KEY: &'static str = "stepper";

    fn normalize(&mut self) {
        if self.current_step == 0 {
            self.current_step = 1;
        }
    }
}

/// Persisted stepper position
pub type StepperStore = SectionStore<StepperPosition>;

impl SectionStore<StepperPosition> {
    pub fn position(&self) -> StepperPosition {
        self.snapshot()
    }

    pub fn next(&self, total_steps: u32) -> u32 {
        self.update(|p| {
            p.next(total_steps);
            p.current_step
        })
    }

    pub fn previous(&self) -> u32 {
        self.update(|p| {
            p.previous();
            p.current_step
        })
    }

    pub fn mark_complete(&self, step: u32) -> u32 {
        self.update(|p| {
            p.mark_complete(step);
            p.max_completed_step
        })
    }

    pub fn go_to(&self, step: u32, total_steps: u32) -> bool {
        self.update(|p| p.go_to(step, total_steps))
    }
}
