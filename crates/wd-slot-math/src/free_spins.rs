//! Free spin trigger, retrigger and session bookkeeping
//!
//! The feature triggers when at least `trigger_count` of the first
//! `trigger_reels` reels each show a scatter (one per reel counts, however
//! many that reel holds). Retriggers inside a session add spins clipped so
//! `completed + remaining` never exceeds `max_spins`.

use serde::{Deserialize, Serialize};

use crate::config::GridSpec;
use crate::error::ConfigError;
use crate::reels::ReelWindow;
use crate::symbols::SymbolId;

// ═══════════════════════════════════════════════════════════════════════════════
// CONFIGURATION
// ═══════════════════════════════════════════════════════════════════════════════

/// Free spins configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpinsConfig {
    /// Spins awarded when a session opens
    pub initial_spins: u32,
    /// Extra spins per retrigger, before the cap
    pub retrigger_spins: u32,
    /// Ceiling on completed + remaining spins
    pub max_spins: u32,
    /// Leading reels inspected for scatters
    pub trigger_reels: usize,
    /// Scatter reels needed to trigger
    pub trigger_count: usize,
    /// Drums carried by a naturally triggered session
    pub natural_trigger_drums: u8,
}

impl Default for FreeSpinsConfig {
    fn default() -> Self {
        Self {
            initial_spins: 7,
            retrigger_spins: 7,
            max_spins: 70,
            trigger_reels: 3,
            trigger_count: 3,
            natural_trigger_drums: 0,
        }
    }
}

impl FreeSpinsConfig {
    /// Check against the grid and the drum cap
    pub fn validate(&self, grid: GridSpec, max_drums: u8) -> Result<(), ConfigError> {
        if self.initial_spins == 0 {
            return Err(ConfigError::ValidationFailed(
                "free spins must award at least one spin".into(),
            ));
        }
        if self.max_spins < self.initial_spins {
            return Err(ConfigError::ValidationFailed(format!(
                "max_spins {} is below initial_spins {}",
                self.max_spins, self.initial_spins
            )));
        }
        if self.trigger_reels == 0 || self.trigger_reels > grid.reels as usize {
            return Err(ConfigError::ValidationFailed(format!(
                "trigger_reels {} must be within 1..={}",
                self.trigger_reels, grid.reels
            )));
        }
        if self.trigger_count == 0 || self.trigger_count > self.trigger_reels {
            return Err(ConfigError::ValidationFailed(format!(
                "trigger_count {} must be within 1..={}",
                self.trigger_count, self.trigger_reels
            )));
        }
        if self.natural_trigger_drums > max_drums {
            return Err(ConfigError::ValidationFailed(format!(
                "natural_trigger_drums {} exceeds max_drums {}",
                self.natural_trigger_drums, max_drums
            )));
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// SESSION
// ═══════════════════════════════════════════════════════════════════════════════

/// How a free spin session was entered
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SessionOrigin {
    /// Scatter trigger in the base game
    Natural,
    /// Feature buy of the given tier index
    Purchased { tier: usize },
}

/// Live free spin session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeSpinSession {
    pub remaining: u32,
    pub completed: u32,
    /// Win accumulated so far, paid out when the session ends
    pub cumulative_win: u64,
    pub retrigger_count: u32,
    pub drum_count: u8,
    pub max_spins: u32,
    pub origin: SessionOrigin,
}

impl FreeSpinSession {
    pub fn is_finished(&self) -> bool {
        self.remaining == 0
    }

    /// Spins granted over the session's life so far
    pub fn total_spins(&self) -> u32 {
        self.completed + self.remaining
    }

    /// Spins that could still be added before the cap
    pub fn headroom(&self) -> u32 {
        self.max_spins.saturating_sub(self.total_spins())
    }

    /// Mark one spin played, adding its win
    pub(crate) fn consume(&mut self, win: u64) {
        self.remaining = self.remaining.saturating_sub(1);
        self.completed += 1;
        self.cumulative_win = self.cumulative_win.saturating_add(win);
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TRIGGER ENGINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Scatter trigger and retrigger decisions
#[derive(Debug, Clone)]
pub struct FeatureTriggerEngine {
    config: FreeSpinsConfig,
    scatter: SymbolId,
}

impl FeatureTriggerEngine {
    pub fn new(config: FreeSpinsConfig, scatter: SymbolId) -> Self {
        Self { config, scatter }
    }

    pub fn config(&self) -> &FreeSpinsConfig {
        &self.config
    }

    /// Indices of leading reels showing at least one scatter
    pub fn scatter_reels(&self, window: &ReelWindow) -> Vec<usize> {
        (0..self.config.trigger_reels.min(window.reel_count()))
            .filter(|&reel| window.reel_contains(reel, self.scatter))
            .collect()
    }

    pub fn check_trigger(&self, window: &ReelWindow) -> bool {
        self.scatter_reels(window).len() >= self.config.trigger_count
    }

    /// Open a session with `min(initial_spins, max_spins)` spins
    pub fn open_session(&self, origin: SessionOrigin, drum_count: u8) -> FreeSpinSession {
        self.open_session_with_spins(origin, drum_count, self.config.initial_spins)
    }

    /// Open a session with an explicit spin count, still capped at `max_spins`
    pub fn open_session_with_spins(
        &self,
        origin: SessionOrigin,
        drum_count: u8,
        spins: u32,
    ) -> FreeSpinSession {
        let session = FreeSpinSession {
            remaining: spins.min(self.config.max_spins),
            completed: 0,
            cumulative_win: 0,
            retrigger_count: 0,
            drum_count,
            max_spins: self.config.max_spins,
            origin,
        };
        log::info!(
            "Free spins opened ({:?}): {} spins, {} drums",
            session.origin,
            session.remaining,
            drum_count
        );
        session
    }

    /// Spins a retrigger would add to `session` right now
    pub fn grant_for(&self, session: &FreeSpinSession) -> u32 {
        self.config.retrigger_spins.min(session.headroom())
    }

    /// Apply a retrigger if `window` qualifies; returns spins granted
    pub fn retrigger(&self, session: &mut FreeSpinSession, window: &ReelWindow) -> u32 {
        if !self.check_trigger(window) {
            return 0;
        }

        let granted = self.grant_for(session);
        if granted > 0 {
            session.remaining += granted;
            session.retrigger_count += 1;
            log::info!(
                "Retrigger #{}: +{} spins ({} remaining)",
                session.retrigger_count,
                granted,
                session.remaining
            );
        } else {
            log::debug!("Retrigger ignored, session at {} spin cap", session.max_spins);
        }
        granted
    }
}
