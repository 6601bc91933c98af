//! Game session state machine
//!
//! ```text
//! Idle ──spin(bet)──> BaseSpin ──┬── no trigger ──> Idle
//!  │                             └── trigger ─────> FreeSpinActive
//!  └──buy_feature(bet, tier)──> SettlingFeatureBuy ──> FreeSpinActive
//!
//! FreeSpinActive ──spin_free()──┬── remaining > 0 ──> FreeSpinActive
//!                               └── remaining = 0 ──> Idle (win paid)
//! ```
//!
//! Every operation validates before it touches anything: a rejected call
//! leaves credit, state, history and the RNG stream exactly as they were.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::config::GameDefinition;
use crate::drums::DrumOutcome;
use crate::error::{Result, SlotError};
use crate::free_spins::{FreeSpinSession, SessionOrigin};
use crate::paytable::WinEvaluator;
use crate::reel_controller::slow_motion_flags;
use crate::spin::{SessionSnapshot, SpinKind, SpinOutcome};

/// Outcomes kept in [`GameSession::history`]
pub const HISTORY_LIMIT: usize = 100;

/// Session state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    #[default]
    Idle,
    BaseSpin,
    FreeSpinActive,
    SettlingFeatureBuy,
}

impl GameState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::BaseSpin => "base_spin",
            Self::FreeSpinActive => "free_spin_active",
            Self::SettlingFeatureBuy => "settling_feature_buy",
        }
    }
}

impl fmt::Display for GameState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Session statistics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionStats {
    /// Base and free spins played
    pub total_spins: u64,
    pub free_spins_played: u64,
    /// Bets plus feature buy costs
    pub total_wagered: u64,
    /// Base wins plus free spin wins
    pub total_won: u64,
    pub wins: u64,
    pub features_triggered: u64,
    pub features_bought: u64,
    pub retriggers: u64,
    pub max_win: u64,
}

impl SessionStats {
    /// Calculate RTP
    pub fn rtp(&self) -> f64 {
        if self.total_wagered > 0 {
            (self.total_won as f64 / self.total_wagered as f64) * 100.0
        } else {
            0.0
        }
    }

    /// Calculate hit rate
    pub fn hit_rate(&self) -> f64 {
        if self.total_spins > 0 {
            (self.wins as f64 / self.total_spins as f64) * 100.0
        } else {
            0.0
        }
    }

    fn record(&mut self, outcome: &SpinOutcome) {
        self.total_spins += 1;
        if outcome.is_free_spin() {
            self.free_spins_played += 1;
        }
        self.total_won = self.total_won.saturating_add(outcome.total_credit);
        if outcome.is_win() {
            self.wins += 1;
        }
        self.max_win = self.max_win.max(outcome.total_credit);
    }
}

/// One player's game session
#[derive(Debug, Clone)]
pub struct GameSession {
    definition: Arc<GameDefinition>,
    rng: ChaCha8Rng,
    credit: u64,
    bet: u64,
    state: GameState,
    free_spins: Option<FreeSpinSession>,
    history: VecDeque<SpinOutcome>,
    stats: SessionStats,
}

impl GameSession {
    /// New session seeded from the thread RNG
    pub fn new(definition: Arc<GameDefinition>, credit: u64) -> Self {
        Self::from_rng(definition, credit, ChaCha8Rng::from_rng(&mut rand::rng()))
    }

    /// Reproducible session
    pub fn with_seed(definition: Arc<GameDefinition>, credit: u64, seed: u64) -> Self {
        Self::from_rng(definition, credit, ChaCha8Rng::seed_from_u64(seed))
    }

    pub fn from_rng(definition: Arc<GameDefinition>, credit: u64, rng: ChaCha8Rng) -> Self {
        let bet = definition.base_bet();
        Self {
            definition,
            rng,
            credit,
            bet,
            state: GameState::Idle,
            free_spins: None,
            history: VecDeque::with_capacity(HISTORY_LIMIT),
            stats: SessionStats::default(),
        }
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // ACCESSORS
    // ═══════════════════════════════════════════════════════════════════════════

    pub fn definition(&self) -> &Arc<GameDefinition> {
        &self.definition
    }

    pub fn credit(&self) -> u64 {
        self.credit
    }

    pub fn bet(&self) -> u64 {
        self.bet
    }

    pub fn state(&self) -> GameState {
        self.state
    }

    pub fn free_spins(&self) -> Option<&FreeSpinSession> {
        self.free_spins.as_ref()
    }

    /// Most recent outcomes, oldest first
    pub fn history(&self) -> &VecDeque<SpinOutcome> {
        &self.history
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let session = self.free_spins.as_ref();
        SessionSnapshot {
            state: self.state.to_string(),
            credit: self.credit,
            bet: self.bet,
            free_spins_remaining: session.map_or(0, |s| s.remaining),
            free_spins_completed: session.map_or(0, |s| s.completed),
            cumulative_win: session.map_or(0, |s| s.cumulative_win),
            drum_count: session.map_or(0, |s| s.drum_count),
            total_spins: self.stats.total_spins,
        }
    }

    /// Set the bet for later spins; only while idle
    pub fn set_bet(&mut self, bet: u64) -> Result<()> {
        self.require_idle("set bet")?;
        if bet == 0 {
            return Err(self.reject(SlotError::InvalidBet { bet }));
        }
        self.bet = bet;
        Ok(())
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // BASE GAME
    // ═══════════════════════════════════════════════════════════════════════════

    /// Play one base spin.
    ///
    /// The base win is credited immediately, also when the spin triggers free
    /// spins; free spin wins are paid when the session ends.
    pub fn spin(&mut self, bet: u64) -> Result<SpinOutcome> {
        self.require_idle("spin")?;
        if bet == 0 {
            return Err(self.reject(SlotError::InvalidBet { bet }));
        }
        if self.credit < bet {
            return Err(self.reject(SlotError::InsufficientCredit {
                required: bet,
                available: self.credit,
            }));
        }

        self.state = GameState::BaseSpin;
        self.bet = bet;
        self.credit -= bet;
        self.stats.total_wagered = self.stats.total_wagered.saturating_add(bet);

        let def = Arc::clone(&self.definition);
        let sampled = def.reels().sample_window(&mut self.rng);
        let evaluation = WinEvaluator::with_bet(def.paytable(), bet).evaluate(&sampled.window);
        let triggered = def.trigger().check_trigger(&sampled.window);

        let mut outcome = SpinOutcome::new(
            SpinKind::Base,
            sampled.window,
            sampled.stops,
            evaluation,
            DrumOutcome::skipped(),
        );
        outcome.slow_motion = slow_motion_flags(&outcome.window, def.symbols().scatter_id());
        self.credit = self.credit.saturating_add(outcome.total_credit);
        self.stats.record(&outcome);

        log::debug!(
            "Base spin: bet {}, win {}, {} lines, stops {:?}",
            bet,
            outcome.total_credit,
            outcome.win_lines.len(),
            outcome.stops
        );

        if triggered {
            let drums = def.trigger().config().natural_trigger_drums;
            let session = def.trigger().open_session(SessionOrigin::Natural, drums);
            outcome.feature_triggered = true;
            outcome.free_spins_awarded = session.remaining;
            self.free_spins = Some(session);
            self.stats.features_triggered += 1;
            self.state = GameState::FreeSpinActive;
        } else {
            self.state = GameState::Idle;
        }

        self.push_history(outcome.clone());
        Ok(outcome)
    }

    /// Buy straight into free spins and play the first one
    pub fn buy_feature(&mut self, bet: u64, tier: usize) -> Result<SpinOutcome> {
        self.require_idle("buy feature")?;

        let def = Arc::clone(&self.definition);
        let receipt = def
            .feature_buy()
            .execute_purchase(tier, bet, &mut self.credit)
            .map_err(|e| self.reject(e))?;

        self.state = GameState::SettlingFeatureBuy;
        self.bet = bet;
        self.stats.total_wagered = self.stats.total_wagered.saturating_add(receipt.cost);
        self.stats.features_bought += 1;

        let session = def.trigger().open_session_with_spins(
            SessionOrigin::Purchased { tier },
            receipt.drums,
            receipt.free_spins,
        );
        self.free_spins = Some(session);
        self.state = GameState::FreeSpinActive;

        self.spin_free()
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // FREE SPINS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Play one free spin of the active session
    pub fn spin_free(&mut self) -> Result<SpinOutcome> {
        let mut session = match self.free_spins.take() {
            Some(session) if self.state == GameState::FreeSpinActive && session.remaining > 0 => {
                session
            }
            other => {
                self.free_spins = other;
                return Err(self.reject(SlotError::InvalidState {
                    operation: "spin free",
                    state: self.state,
                }));
            }
        };

        let def = Arc::clone(&self.definition);
        let sampled = def.reels().sample_window(&mut self.rng);
        let window = def.transformer().transform(&sampled.window, &mut self.rng);
        let evaluation = WinEvaluator::with_bet(def.paytable(), self.bet).evaluate(&window);
        let drums = def
            .drums()
            .roll(session.drum_count, evaluation.is_win(), &mut self.rng);

        let mut outcome = SpinOutcome::new(
            SpinKind::Free {
                index: session.completed + 1,
            },
            window,
            sampled.stops,
            evaluation,
            drums,
        );
        outcome.slow_motion = slow_motion_flags(&outcome.window, def.symbols().scatter_id());

        session.consume(outcome.total_credit);
        let granted = def.trigger().retrigger(&mut session, &outcome.window);
        outcome.feature_triggered = def.trigger().check_trigger(&outcome.window);
        outcome.free_spins_awarded = granted;
        if granted > 0 {
            self.stats.retriggers += 1;
        }
        self.stats.record(&outcome);

        log::debug!(
            "Free spin {}/{}: base {}, x{}, win {}",
            session.completed,
            session.total_spins(),
            outcome.base_credit,
            outcome.multiplier,
            outcome.total_credit
        );

        if session.is_finished() {
            self.credit = self.credit.saturating_add(session.cumulative_win);
            self.state = GameState::Idle;
            outcome.session_ended = true;
            log::info!(
                "Free spins settled: {} spins, {} retriggers, paid {}",
                session.completed,
                session.retrigger_count,
                session.cumulative_win
            );
        } else {
            self.free_spins = Some(session);
        }

        self.push_history(outcome.clone());
        Ok(outcome)
    }

    /// Play free spins until the session ends
    pub fn finish_free_spins(&mut self) -> Result<Vec<SpinOutcome>> {
        let mut outcomes = Vec::new();
        while self.state == GameState::FreeSpinActive {
            outcomes.push(self.spin_free()?);
        }
        Ok(outcomes)
    }

    // ═══════════════════════════════════════════════════════════════════════════
    // HELPERS
    // ═══════════════════════════════════════════════════════════════════════════

    fn require_idle(&self, operation: &'static str) -> Result<()> {
        if self.state == GameState::Idle {
            Ok(())
        } else {
            Err(self.reject(SlotError::InvalidState {
                operation,
                state: self.state,
            }))
        }
    }

    fn reject(&self, err: SlotError) -> SlotError {
        log::warn!("Rejected: {err}");
        err
    }

    fn push_history(&mut self, outcome: SpinOutcome) {
        if self.history.len() == HISTORY_LIMIT {
            self.history.pop_front();
        }
        self.history.push_back(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    fn session(credit: u64, seed: u64) -> GameSession {
        GameSession::with_seed(GameDefinition::standard().unwrap().shared(), credit, seed)
    }

    #[test]
    fn test_spin_settles_bet_and_win() {
        let mut game = session(1_000, 7);
        let outcome = game.spin(10).unwrap();
        assert_eq!(outcome.kind, SpinKind::Base);
        assert_eq!(game.credit(), 1_000 - 10 + outcome.total_credit);
        assert_eq!(outcome.multiplier, 1);
        assert_eq!(game.history().len(), 1);
        assert_eq!(game.stats().total_wagered, 10);
    }

    #[test]
    fn test_spin_free_while_idle_is_rejected() {
        let mut game = session(1_000, 1);
        let before = game.snapshot();
        let mut twin = game.clone();

        let err = game.spin_free().unwrap_err();
        assert!(matches!(
            err,
            SlotError::InvalidState {
                state: GameState::Idle,
                ..
            }
        ));
        assert_eq!(game.snapshot(), before);
        assert!(game.history().is_empty());

        // RNG stream untouched
        assert_eq!(game.spin(5).unwrap(), twin.spin(5).unwrap());
    }

    #[test]
    fn test_insufficient_credit_is_rejected() {
        let mut game = session(5, 1);
        let err = game.spin(10).unwrap_err();
        assert!(matches!(
            err,
            SlotError::InsufficientCredit {
                required: 10,
                available: 5
            }
        ));
        assert_eq!(game.credit(), 5);
        assert_eq!(game.state(), GameState::Idle);
        assert!(matches!(game.spin(0), Err(SlotError::InvalidBet { bet: 0 })));
    }

    #[test]
    fn test_feature_buy_rejection_keeps_credit() {
        let mut game = session(1_000, 3);
        let err = game.buy_feature(50, 2).unwrap_err();
        assert!(matches!(
            err,
            SlotError::InsufficientCredit {
                required: 5000,
                available: 1000
            }
        ));
        assert_eq!(game.credit(), 1_000);
        assert_eq!(game.state(), GameState::Idle);
        assert!(game.free_spins().is_none());
        assert_eq!(game.stats().total_wagered, 0);
    }

    #[test]
    fn test_buy_runs_first_free_spin() {
        let mut game = session(10_000, 9);
        let outcome = game.buy_feature(10, 1).unwrap();

        assert_eq!(outcome.kind, SpinKind::Free { index: 1 });
        assert_eq!(game.state(), GameState::FreeSpinActive);
        let fs = game.free_spins().unwrap();
        assert_eq!(fs.completed, 1);
        assert_eq!(fs.drum_count, 2);
        assert_eq!(fs.origin, SessionOrigin::Purchased { tier: 1 });
        assert_eq!(fs.cumulative_win, outcome.total_credit);
        // free spin wins are held until the session ends
        assert_eq!(game.credit(), 10_000 - 800);

        assert!(matches!(
            game.spin(10),
            Err(SlotError::InvalidState {
                state: GameState::FreeSpinActive,
                ..
            })
        ));
        assert!(game.buy_feature(10, 0).is_err());
        assert!(game.set_bet(20).is_err());
    }

    #[test]
    fn test_session_end_flushes_cumulative_win() {
        let mut game = session(10_000, 21);
        let first = game.buy_feature(10, 2).unwrap();
        let rest = game.finish_free_spins().unwrap();

        let all: Vec<&SpinOutcome> = std::iter::once(&first).chain(rest.iter()).collect();
        let paid: u64 = all.iter().map(|o| o.total_credit).sum();
        assert_eq!(game.credit(), 10_000 - 1_000 + paid);
        assert_eq!(game.state(), GameState::Idle);
        assert!(game.free_spins().is_none());
        assert!(all.last().unwrap().session_ended);
        assert!(all[..all.len() - 1].iter().all(|o| !o.session_ended));
        assert!(all.len() >= 7 && all.len() <= 70);
    }

    #[test]
    fn test_drums_only_multiply_wins() {
        let mut game = session(1_000_000, 4);
        for _ in 0..20 {
            game.buy_feature(50, 2).unwrap();
            game.finish_free_spins().unwrap();
        }
        for outcome in game.history().iter().filter(|o| o.is_free_spin()) {
            if outcome.base_credit == 0 {
                assert_eq!(outcome.multiplier, 1);
                assert!(outcome.drums.is_empty());
            } else {
                assert_eq!(outcome.drums.len(), 3);
                assert_eq!(
                    outcome.total_credit,
                    outcome.base_credit * outcome.multiplier as u64
                );
            }
        }
    }

    #[test]
    fn test_free_spin_wins_priced_at_session_bet() {
        let mut game = session(1_000_000, 13);
        let mut twin = game.clone();

        let mut low = vec![game.buy_feature(50, 1).unwrap()];
        low.extend(game.finish_free_spins().unwrap());
        let mut high = vec![twin.buy_feature(150, 1).unwrap()];
        high.extend(twin.finish_free_spins().unwrap());

        assert_eq!(low.len(), high.len());
        for (a, b) in low.iter().zip(&high) {
            assert_eq!(a.window, b.window);
            assert_eq!(a.multiplier, b.multiplier);
            assert_eq!(b.base_credit, 3 * a.base_credit);
            assert_eq!(b.total_credit, 3 * a.total_credit);
        }
    }

    #[test]
    fn test_default_bet_is_base_bet() {
        let game = session(1_000, 1);
        assert_eq!(game.bet(), 50);
        assert_eq!(game.snapshot().bet, game.definition().base_bet());
    }

    #[test]
    fn test_huge_pays_saturate_instead_of_overflowing() {
        let mut config = GameConfig::default();
        for values in config.paytable.pays.values_mut() {
            *values = vec![u64::MAX; 3];
        }
        let def = config.resolve().unwrap().shared();
        let mut game = GameSession::with_seed(def, u64::MAX - 1_000, 6);

        for _ in 0..300 {
            if game.state() == GameState::FreeSpinActive {
                game.spin_free().unwrap();
            } else {
                game.spin(100).unwrap();
            }
        }
        assert_eq!(game.stats().max_win, u64::MAX);
        assert_eq!(game.stats().total_won, u64::MAX);
    }

    #[test]
    fn test_history_is_bounded() {
        let mut game = session(1_000_000, 2);
        while game.stats().total_spins < (HISTORY_LIMIT as u64 + 10) {
            if game.state() == GameState::FreeSpinActive {
                game.spin_free().unwrap();
            } else {
                game.spin(1).unwrap();
            }
        }
        assert_eq!(game.history().len(), HISTORY_LIMIT);
    }

    #[test]
    fn test_snapshot_reports_state_name() {
        let mut game = session(10_000, 5);
        assert_eq!(game.snapshot().state, "idle");
        game.buy_feature(10, 0).unwrap();
        let snap = game.snapshot();
        assert_eq!(snap.state, "free_spin_active");
        assert_eq!(snap.drum_count, 1);
        assert_eq!(snap.free_spins_completed, 1);
    }
}
