//! Spin outcomes and session snapshots handed to the serving layer

use serde::{Deserialize, Serialize};

use crate::drums::{DrumOutcome, DrumRoll};
use crate::paytable::{Evaluation, WinKind, WinLine};
use crate::reels::ReelWindow;

/// Which game mode produced a spin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SpinKind {
    Base,
    /// 1-based index within the free spin session
    Free { index: u32 },
}

/// Complete result of one spin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinOutcome {
    pub kind: SpinKind,
    /// Final grid, after any free spin transform
    pub window: ReelWindow,
    /// Strip offsets sampled for this spin
    pub stops: Vec<usize>,
    pub win_lines: Vec<WinLine>,
    /// Evaluated win before the drum multiplier
    pub base_credit: u64,
    /// Win after the drum multiplier
    pub total_credit: u64,
    pub feature_triggered: bool,
    /// New free spins from a trigger or retrigger
    pub free_spins_awarded: u32,
    pub multiplier: u32,
    pub drums: Vec<DrumRoll>,
    pub slow_motion: Vec<bool>,
    /// This spin ended the free spin session
    pub session_ended: bool,
}

impl SpinOutcome {
    pub(crate) fn new(
        kind: SpinKind,
        window: ReelWindow,
        stops: Vec<usize>,
        evaluation: Evaluation,
        drums: DrumOutcome,
    ) -> Self {
        let total_credit = drums.apply(evaluation.total_credit);
        Self {
            kind,
            window,
            stops,
            win_lines: evaluation.lines,
            base_credit: evaluation.total_credit,
            total_credit,
            feature_triggered: false,
            free_spins_awarded: 0,
            multiplier: drums.total_multiplier,
            drums: drums.rolls,
            slow_motion: Vec::new(),
            session_ended: false,
        }
    }

    pub fn is_free_spin(&self) -> bool {
        matches!(self.kind, SpinKind::Free { .. })
    }

    pub fn is_win(&self) -> bool {
        self.total_credit > 0
    }

    pub fn scatter_win(&self) -> Option<&WinLine> {
        self.win_lines.iter().find(|l| l.kind == WinKind::Scatter)
    }

    /// Win relative to `bet`
    pub fn win_ratio(&self, bet: u64) -> f64 {
        if bet == 0 {
            0.0
        } else {
            self.total_credit as f64 / bet as f64
        }
    }
}

/// Point-in-time view of a session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub state: String,
    pub credit: u64,
    pub bet: u64,
    pub free_spins_remaining: u32,
    pub free_spins_completed: u32,
    pub cumulative_win: u64,
    pub drum_count: u8,
    pub total_spins: u64,
}
