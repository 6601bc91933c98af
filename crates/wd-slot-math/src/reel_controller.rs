//! Reel presentation bookkeeping
//!
//! Tracks each reel through `Idle → Spinning → (SlowMotion) → Stopped` and
//! assigns a deterministic stop schedule for a result that has already been
//! decided. Nothing here draws randomness or affects payouts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::GameDefinition;
use crate::error::Result;
use crate::reels::ReelWindow;
use crate::symbols::SymbolId;

/// Per-reel scatter rate assumed by [`ReelController::predict_feature_trigger`]
pub const DEFAULT_SCATTER_RATE: f64 = 0.1;

/// Reel slowed down by a two-scatter tease
pub const SLOW_MOTION_REEL: usize = 2;

/// Reel state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReelState {
    #[default]
    Idle,
    Spinning,
    SlowMotion,
    Stopped,
}

/// Stop timing, in milliseconds from spin start
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelTiming {
    /// Stop time of reel 0
    pub first_stop_ms: u64,
    /// Gap between consecutive reel stops
    pub stop_interval_ms: u64,
    /// Added to a slow-motion reel's stop
    pub slow_motion_extra_ms: u64,
}

impl Default for ReelTiming {
    fn default() -> Self {
        Self {
            first_stop_ms: 0,
            stop_interval_ms: 500,
            slow_motion_extra_ms: 2000,
        }
    }
}

impl ReelTiming {
    pub fn stop_time(&self, reel: usize, slow_motion: bool) -> u64 {
        let base = self.first_stop_ms + reel as u64 * self.stop_interval_ms;
        if slow_motion {
            base + self.slow_motion_extra_ms
        } else {
            base
        }
    }
}

/// One reel's scheduled stop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReelStop {
    pub reel: usize,
    /// Strip offset the reel lands on
    pub offset: usize,
    pub stop_ms: u64,
    pub slow_motion: bool,
}

/// Stop schedule for one spin
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpinSchedule {
    pub stops: Vec<ReelStop>,
}

impl SpinSchedule {
    /// Time of the last reel stop
    pub fn total_duration_ms(&self) -> u64 {
        self.stops.iter().map(|s| s.stop_ms).max().unwrap_or(0)
    }

    pub fn slow_motion_reels(&self) -> Vec<usize> {
        self.stops
            .iter()
            .filter(|s| s.slow_motion)
            .map(|s| s.reel)
            .collect()
    }

    /// Reels in the order they stop
    pub fn stop_order(&self) -> Vec<usize> {
        let mut stops = self.stops.clone();
        stops.sort_by_key(|s| (s.stop_ms, s.reel));
        stops.into_iter().map(|s| s.reel).collect()
    }
}

/// Informational trigger estimate from the reels stopped so far
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerPrediction {
    /// Stopped trigger reels showing a scatter
    pub current: usize,
    pub needed: usize,
    /// Trigger reels still turning
    pub remaining_reels: usize,
    pub probability: f64,
    /// `(reel, row)` of the first scatter on each counted reel
    pub scatter_positions: Vec<(usize, usize)>,
}

/// Slow-motion flags for `window`: reels 0 and 1 both show `scatter` ⇒ reel 2
pub fn slow_motion_flags(window: &ReelWindow, scatter: SymbolId) -> Vec<bool> {
    let mut flags = vec![false; window.reel_count()];
    if window.reel_count() > SLOW_MOTION_REEL
        && window.reel_contains(0, scatter)
        && window.reel_contains(1, scatter)
    {
        flags[SLOW_MOTION_REEL] = true;
    }
    flags
}

/// Presentation-side reel state
#[derive(Debug, Clone)]
pub struct ReelController {
    definition: Arc<GameDefinition>,
    timing: ReelTiming,
    scatter_rate: f64,
    states: Vec<ReelState>,
    positions: Vec<usize>,
    targets: Vec<usize>,
    slow_motion: Vec<bool>,
}

impl ReelController {
    pub fn new(definition: Arc<GameDefinition>) -> Self {
        Self::with_timing(definition, ReelTiming::default())
    }

    pub fn with_timing(definition: Arc<GameDefinition>, timing: ReelTiming) -> Self {
        let reels = definition.reels().reel_count();
        Self {
            definition,
            timing,
            scatter_rate: DEFAULT_SCATTER_RATE,
            states: vec![ReelState::Idle; reels],
            positions: vec![0; reels],
            targets: vec![0; reels],
            slow_motion: vec![false; reels],
        }
    }

    pub fn with_scatter_rate(mut self, rate: f64) -> Self {
        self.scatter_rate = rate.clamp(0.0, 1.0);
        self
    }

    pub fn timing(&self) -> &ReelTiming {
        &self.timing
    }

    pub fn states(&self) -> &[ReelState] {
        &self.states
    }

    pub fn positions(&self) -> &[usize] {
        &self.positions
    }

    pub fn slow_motion(&self) -> &[bool] {
        &self.slow_motion
    }

    pub fn all_stopped(&self) -> bool {
        self.states.iter().all(|&s| s == ReelState::Stopped)
    }

    /// Start every reel toward `target`.
    ///
    /// Fails with [`crate::SlotError::ReelSearch`] if any reel of `target` is
    /// not on its strip; the controller is untouched in that case.
    pub fn begin_spin(&mut self, target: &ReelWindow, slow_motion_flags: &[bool]) -> Result<SpinSchedule> {
        let targets = self.definition.reels().locate_window(target)?;

        let slow: Vec<bool> = (0..targets.len())
            .map(|reel| slow_motion_flags.get(reel).copied().unwrap_or(false))
            .collect();

        let stops = targets
            .iter()
            .zip(&slow)
            .enumerate()
            .map(|(reel, (&offset, &slow_motion))| ReelStop {
                reel,
                offset,
                stop_ms: self.timing.stop_time(reel, slow_motion),
                slow_motion,
            })
            .collect();

        self.states = slow
            .iter()
            .map(|&s| if s { ReelState::SlowMotion } else { ReelState::Spinning })
            .collect();
        self.targets = targets;
        self.slow_motion = slow;

        Ok(SpinSchedule { stops })
    }

    /// Land `reel` on its target; false if it was not turning
    pub fn stop_reel(&mut self, reel: usize) -> bool {
        match self.states.get(reel) {
            Some(ReelState::Spinning | ReelState::SlowMotion) => {
                self.states[reel] = ReelState::Stopped;
                self.positions[reel] = self.targets[reel];
                true
            }
            _ => false,
        }
    }

    /// Begin a spin and resolve every stop in schedule order
    pub fn start_spin(&mut self, target: &ReelWindow, slow_motion_flags: &[bool]) -> Result<SpinSchedule> {
        let schedule = self.begin_spin(target, slow_motion_flags)?;
        for reel in schedule.stop_order() {
            self.stop_reel(reel);
        }
        log::debug!(
            "Reels stopped at {:?} after {} ms",
            self.positions,
            schedule.total_duration_ms()
        );
        Ok(schedule)
    }

    /// Window currently shown by the reels
    pub fn current_window(&self) -> Option<ReelWindow> {
        let reels = self.definition.reels();
        let columns = self
            .positions
            .iter()
            .enumerate()
            .map(|(reel, &offset)| {
                reels
                    .strip(reel)
                    .map(|strip| strip.window_at(offset, reels.height()))
            })
            .collect::<Option<Vec<_>>>()?;
        ReelWindow::new(columns)
    }

    pub fn check_slow_motion_trigger(&self, window: &ReelWindow) -> Vec<bool> {
        slow_motion_flags(window, self.definition.symbols().scatter_id())
    }

    /// Non-authoritative trigger estimate; only stopped reels count
    pub fn predict_feature_trigger(&self, window: &ReelWindow) -> TriggerPrediction {
        let scatter = self.definition.symbols().scatter_id();
        let config = self.definition.trigger().config();
        let trigger_reels = config.trigger_reels.min(window.reel_count());

        let mut scatter_positions = Vec::new();
        let mut stopped = 0;
        for reel in 0..trigger_reels {
            if self.states.get(reel) != Some(&ReelState::Stopped) {
                continue;
            }
            stopped += 1;
            if let Some(row) = window.reel(reel).iter().position(|&s| s == scatter) {
                scatter_positions.push((reel, row));
            }
        }

        let current = scatter_positions.len();
        let needed = config.trigger_count.saturating_sub(current);
        let remaining_reels = trigger_reels - stopped;

        let probability = if needed == 0 {
            1.0
        } else if needed > remaining_reels {
            0.0
        } else {
            self.scatter_rate.powi(needed as i32)
        };

        TriggerPrediction {
            current,
            needed,
            remaining_reels,
            probability,
            scatter_positions,
        }
    }

    pub fn reset(&mut self) {
        self.states.fill(ReelState::Idle);
        self.positions.fill(0);
        self.targets.fill(0);
        self.slow_motion.fill(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlotError;

    fn controller() -> ReelController {
        ReelController::new(GameDefinition::standard().unwrap().shared())
    }

    /// Window taken straight off the default strips at `offsets`
    fn window_at(controller: &ReelController, offsets: &[usize]) -> ReelWindow {
        let reels = controller.definition.reels();
        let columns = offsets
            .iter()
            .enumerate()
            .map(|(reel, &o)| reels.strip(reel).unwrap().window_at(o, 3))
            .collect();
        ReelWindow::new(columns).unwrap()
    }

    #[test]
    fn test_start_spin_resolves_to_stopped() {
        let mut controller = controller();
        let target = window_at(&controller, &[3, 7, 11, 19, 23]);
        let schedule = controller.start_spin(&target, &[]).unwrap();

        assert!(controller.all_stopped());
        assert_eq!(controller.current_window().unwrap(), target);
        let times: Vec<u64> = schedule.stops.iter().map(|s| s.stop_ms).collect();
        assert_eq!(times, vec![0, 500, 1000, 1500, 2000]);
        assert_eq!(schedule.total_duration_ms(), 2000);
    }

    #[test]
    fn test_slow_motion_delays_flagged_reel() {
        let mut controller = controller();
        let target = window_at(&controller, &[0, 0, 0, 0, 0]);
        let schedule = controller
            .begin_spin(&target, &[false, false, true, false, false])
            .unwrap();

        assert_eq!(controller.states()[2], ReelState::SlowMotion);
        assert_eq!(controller.states()[1], ReelState::Spinning);
        assert_eq!(schedule.stops[2].stop_ms, 3000);
        assert_eq!(schedule.slow_motion_reels(), vec![2]);
        assert_eq!(schedule.stop_order(), vec![0, 1, 3, 4, 2]);

        assert!(controller.stop_reel(2));
        assert!(!controller.stop_reel(2));
        assert_eq!(controller.states()[2], ReelState::Stopped);
    }

    #[test]
    fn test_unreachable_target_leaves_controller_unchanged() {
        let mut controller = controller();
        let good = window_at(&controller, &[1, 2, 3, 4, 5]);
        controller.start_spin(&good, &[]).unwrap();
        let before = controller.positions().to_vec();

        let bad = ReelWindow::from_ids(&[
            &[10, 10, 10],
            &[10, 10, 10],
            &[10, 10, 10],
            &[10, 10, 10],
            &[10, 10, 10],
        ])
        .unwrap();
        let err = controller.start_spin(&bad, &[]).unwrap_err();
        assert!(matches!(err, SlotError::ReelSearch { reel: 0, .. }));
        assert_eq!(controller.positions(), before.as_slice());
        assert!(controller.all_stopped());
    }

    #[test]
    fn test_short_target_is_rejected() {
        let mut controller = controller();
        // first row of a reachable window
        let short = ReelWindow::from_ids(&[&[4], &[5], &[6], &[7], &[8]]).unwrap();
        assert!(matches!(
            controller.start_spin(&short, &[]),
            Err(SlotError::ReelSearch { .. })
        ));
        assert!(controller.states().iter().all(|&s| s == ReelState::Idle));
    }

    #[test]
    fn test_slow_motion_trigger_needs_reels_0_and_1() {
        let controller = controller();
        let window = ReelWindow::from_ids(&[
            &[0, 9, 1],
            &[9, 7, 8],
            &[5, 3, 1],
            &[7, 8, 6],
            &[0, 1, 2],
        ])
        .unwrap();
        assert_eq!(
            controller.check_slow_motion_trigger(&window),
            vec![false, false, true, false, false]
        );

        let window = ReelWindow::from_ids(&[
            &[0, 9, 1],
            &[6, 7, 8],
            &[9, 3, 1],
            &[7, 8, 6],
            &[0, 1, 2],
        ])
        .unwrap();
        assert!(controller.check_slow_motion_trigger(&window).iter().all(|f| !f));
    }

    #[test]
    fn test_predict_counts_only_stopped_reels() {
        let mut controller = controller();
        // default strip 0 has BONUS at 19, strip 1 at 19
        let target = window_at(&controller, &[18, 18, 0, 0, 0]);
        controller.begin_spin(&target, &[]).unwrap();
        controller.stop_reel(0);
        controller.stop_reel(1);

        let prediction = controller.predict_feature_trigger(&target);
        assert_eq!(prediction.current, 2);
        assert_eq!(prediction.needed, 1);
        assert_eq!(prediction.remaining_reels, 1);
        assert!((prediction.probability - 0.1).abs() < 1e-12);
        assert_eq!(prediction.scatter_positions, vec![(0, 1), (1, 1)]);

        controller.reset();
        let prediction = controller.predict_feature_trigger(&target);
        assert_eq!(prediction.current, 0);
        assert_eq!(prediction.remaining_reels, 3);
        assert!((prediction.probability - 0.001).abs() < 1e-12);
    }
}
