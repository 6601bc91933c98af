//! Paytable and 243-ways win evaluation

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::config::PaytableConfig;
use crate::error::ConfigError;
use crate::reels::ReelWindow;
use crate::symbols::{SymbolId, SymbolTable};

/// Minimum contiguous reels for a ways win
pub const MIN_RUN_LENGTH: usize = 3;

/// Line number reported for scatter wins
pub const SCATTER_LINE_NO: u32 = 999;

/// Win kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WinKind {
    Normal,
    Scatter,
}

/// One evaluated win
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinLine {
    /// Normal wins are numbered from 1 in evaluation order; scatter uses 999
    pub line_no: u32,
    pub symbol_id: SymbolId,
    /// Absolute grid indices (`reel * height + row`) of matched cells
    pub positions: Vec<usize>,
    pub credit: u64,
    pub ways: u64,
    /// Contiguous reels matched (scatter: total grid count)
    pub run_length: usize,
    pub kind: WinKind,
}

/// Result of evaluating a window
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Evaluation {
    pub lines: Vec<WinLine>,
    pub total_credit: u64,
}

impl Evaluation {
    pub fn is_win(&self) -> bool {
        self.total_credit > 0
    }

    pub fn scatter_line(&self) -> Option<&WinLine> {
        self.lines.iter().find(|l| l.kind == WinKind::Scatter)
    }
}

/// Per-symbol data gathered by one ways scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaysScan {
    pub run_length: usize,
    pub ways: u64,
    pub positions: Vec<usize>,
}

/// Resolved paytable
///
/// Pay values are credits at `base_bet`; wins at any other bet scale by
/// `bet / base_bet`, rounded down per line.
#[derive(Debug, Clone)]
pub struct Paytable {
    /// Pays per symbol, index 0 = run length 3
    pays: HashMap<SymbolId, Vec<u64>>,
    base_bet: u64,
    scatter_pays: BTreeMap<usize, u64>,
    /// Symbols evaluated by the ways scan, ascending
    paying_ids: Vec<SymbolId>,
    wild: SymbolId,
    scatter: SymbolId,
}

impl Paytable {
    pub fn from_config(
        config: &PaytableConfig,
        symbols: &SymbolTable,
        base_bet: u64,
    ) -> Result<Self, ConfigError> {
        if base_bet == 0 {
            return Err(ConfigError::ValidationFailed(
                "base_bet must be positive".into(),
            ));
        }

        let mut pays = HashMap::with_capacity(config.pays.len());
        for (name, values) in &config.pays {
            let id = symbols.resolve(name, "paytable")?;
            if id == symbols.wild_id() || id == symbols.scatter_id() {
                return Err(ConfigError::ValidationFailed(format!(
                    "'{name}' is wild or scatter and cannot have ways pays"
                )));
            }
            pays.insert(id, values.clone());
        }

        if config.scatter_pays.contains_key(&0) {
            return Err(ConfigError::ValidationFailed(
                "scatter pay for a count of 0".into(),
            ));
        }

        Ok(Self {
            pays,
            base_bet,
            scatter_pays: config.scatter_pays.clone(),
            paying_ids: symbols.paying_ids(),
            wild: symbols.wild_id(),
            scatter: symbols.scatter_id(),
        })
    }

    /// Pay for `symbol` over `run_length` reels (0 when undefined)
    pub fn payout(&self, symbol: SymbolId, run_length: usize) -> u64 {
        if run_length < MIN_RUN_LENGTH {
            return 0;
        }
        self.pays
            .get(&symbol)
            .and_then(|values| values.get(run_length - MIN_RUN_LENGTH))
            .copied()
            .unwrap_or(0)
    }

    /// Pay for `count` scatters anywhere (0 when undefined)
    pub fn scatter_payout(&self, count: usize) -> u64 {
        self.scatter_pays.get(&count).copied().unwrap_or(0)
    }

    /// Bet the pay values are priced against
    pub fn base_bet(&self) -> u64 {
        self.base_bet
    }

    /// `amount × bet / base_bet`, rounded down, saturating at `u64::MAX`
    pub fn scale(&self, amount: u64, bet: u64) -> u64 {
        let scaled = amount as u128 * bet as u128 / self.base_bet as u128;
        u64::try_from(scaled).unwrap_or(u64::MAX)
    }

    pub fn wild_id(&self) -> SymbolId {
        self.wild
    }

    pub fn scatter_id(&self) -> SymbolId {
        self.scatter
    }
}

/// 243-ways evaluator
///
/// For each paying symbol, reels are scanned left to right; a reel counts
/// cells showing the symbol or wild. The first reel with no match ends the
/// run, even if a later reel would match again: ways require unbroken
/// presence from reel 0. Wild is only ever a substitute, never a winning
/// symbol of its own.
#[derive(Debug, Clone, Copy)]
pub struct WinEvaluator<'a> {
    paytable: &'a Paytable,
    bet: u64,
}

impl<'a> WinEvaluator<'a> {
    /// Evaluate at the paytable's base bet
    pub fn new(paytable: &'a Paytable) -> Self {
        Self::with_bet(paytable, paytable.base_bet)
    }

    /// Evaluate with every credit scaled to `bet`
    pub fn with_bet(paytable: &'a Paytable, bet: u64) -> Self {
        Self { paytable, bet }
    }

    pub fn bet(&self) -> u64 {
        self.bet
    }

    /// Credit for `ways` ways of a symbol paying `payout`
    fn ways_credit(&self, payout: u64, ways: u64) -> u64 {
        self.paytable.scale(payout.saturating_mul(ways), self.bet)
    }

    /// Evaluate ways wins then the scatter win
    pub fn evaluate(&self, window: &ReelWindow) -> Evaluation {
        let mut lines = Vec::new();

        for &symbol in &self.paytable.paying_ids {
            let scan = self.scan_ways(window, symbol);
            if scan.run_length < MIN_RUN_LENGTH {
                continue;
            }
            let payout = self.paytable.payout(symbol, scan.run_length);
            let credit = self.ways_credit(payout, scan.ways);
            if credit == 0 {
                continue;
            }
            lines.push(WinLine {
                line_no: lines.len() as u32 + 1,
                symbol_id: symbol,
                positions: scan.positions,
                credit,
                ways: scan.ways,
                run_length: scan.run_length,
                kind: WinKind::Normal,
            });
        }

        if let Some(scatter) = self.evaluate_scatter(window) {
            lines.push(scatter);
        }

        let total_credit = lines
            .iter()
            .fold(0u64, |total, l| total.saturating_add(l.credit));
        Evaluation {
            lines,
            total_credit,
        }
    }

    /// Contiguous-reel scan for one symbol
    pub fn scan_ways(&self, window: &ReelWindow, symbol: SymbolId) -> WaysScan {
        let wild = self.paytable.wild;
        let mut run_length = 0;
        let mut ways = 1u64;
        let mut positions = Vec::new();

        for reel in 0..window.reel_count() {
            let matched: Vec<usize> = window
                .reel(reel)
                .iter()
                .enumerate()
                .filter(|&(_, &s)| s == symbol || s == wild)
                .map(|(row, _)| window.position(reel, row))
                .collect();

            if matched.is_empty() {
                break;
            }
            run_length += 1;
            ways = ways.saturating_mul(matched.len() as u64);
            positions.extend(matched);
        }

        WaysScan {
            run_length,
            ways,
            positions,
        }
    }

    /// Whole-grid scatter count; no contiguity requirement
    fn evaluate_scatter(&self, window: &ReelWindow) -> Option<WinLine> {
        let scatter = self.paytable.scatter;
        let positions: Vec<usize> = window
            .cells()
            .filter(|&(_, _, s)| s == scatter)
            .map(|(reel, row, _)| window.position(reel, row))
            .collect();

        let count = positions.len();
        if count < MIN_RUN_LENGTH {
            return None;
        }
        let credit = self.paytable.scale(self.paytable.scatter_payout(count), self.bet);
        if credit == 0 {
            return None;
        }

        Some(WinLine {
            line_no: SCATTER_LINE_NO,
            symbol_id: scatter,
            positions,
            credit,
            ways: 1,
            run_length: count,
            kind: WinKind::Scatter,
        })
    }

    /// Re-derive `line` from `window` and check it matches
    pub fn validate_win_line(&self, line: &WinLine, window: &ReelWindow) -> bool {
        match line.kind {
            WinKind::Scatter => self.evaluate_scatter(window).is_some_and(|expected| {
                expected.positions == line.positions && expected.credit == line.credit
            }),
            WinKind::Normal => {
                let scan = self.scan_ways(window, line.symbol_id);
                scan.ways == line.ways
                    && scan.run_length == line.run_length
                    && self.ways_credit(
                        self.paytable.payout(line.symbol_id, scan.run_length),
                        scan.ways,
                    ) == line.credit
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;

    // Default ids: P5=0 P4=1 P3=2 P2=3 P1=4 K=5 Q=6 J=7 T=8 BONUS=9 WILD=10
    fn paytable() -> Paytable {
        let def = GameConfig::default().resolve().unwrap();
        def.paytable().clone()
    }

    #[test]
    fn test_ways_multiply_per_reel_counts() {
        let paytable = paytable();
        let eval = WinEvaluator::new(&paytable);
        // P1 (4): reel0 P1+WILD, reel1 P1, reel2 WILD, reel3 none, reel4 P1
        let window = ReelWindow::from_ids(&[
            &[4, 10, 7],
            &[6, 4, 8],
            &[5, 10, 7],
            &[6, 7, 8],
            &[4, 4, 4],
        ])
        .unwrap();

        let scan = eval.scan_ways(&window, SymbolId(4));
        assert_eq!(scan.run_length, 3);
        assert_eq!(scan.ways, 2);
        assert_eq!(scan.positions, vec![0, 1, 4, 7]);

        let result = eval.evaluate(&window);
        let p1 = result
            .lines
            .iter()
            .find(|l| l.symbol_id == SymbolId(4))
            .unwrap();
        assert_eq!(p1.credit, 50 * 2);
        assert_eq!(p1.kind, WinKind::Normal);
    }

    #[test]
    fn test_gap_breaks_the_run() {
        let paytable = paytable();
        let eval = WinEvaluator::new(&paytable);
        // K on reels 0, 1, 3, 4 but not 2: only a run of 2, no win
        let window = ReelWindow::from_ids(&[
            &[5, 0, 1],
            &[5, 0, 1],
            &[2, 3, 6],
            &[5, 5, 5],
            &[5, 5, 5],
        ])
        .unwrap();

        let scan = eval.scan_ways(&window, SymbolId(5));
        assert_eq!(scan.run_length, 2);
        assert!(eval.evaluate(&window).lines.iter().all(|l| l.symbol_id != SymbolId(5)));
    }

    #[test]
    fn test_wild_is_never_its_own_winner() {
        let paytable = paytable();
        let eval = WinEvaluator::new(&paytable);
        let window = ReelWindow::from_ids(&[
            &[10, 10, 10],
            &[10, 10, 10],
            &[10, 10, 10],
            &[10, 10, 10],
            &[10, 10, 10],
        ])
        .unwrap();

        let result = eval.evaluate(&window);
        assert!(result.lines.iter().all(|l| l.symbol_id != SymbolId(10)));
        // every paying symbol wins 5 reels × 243 ways through substitution
        let p1 = result.lines.iter().find(|l| l.symbol_id == SymbolId(4)).unwrap();
        assert_eq!(p1.ways, 243);
        assert_eq!(p1.credit, 500 * 243);
        assert_eq!(result.lines.len(), 9);
    }

    #[test]
    fn test_scatter_counts_whole_grid() {
        let paytable = paytable();
        let eval = WinEvaluator::new(&paytable);
        // scatters at (reel0,row1), (reel2,row0), (reel4,row2)
        let window = ReelWindow::from_ids(&[
            &[0, 9, 1],
            &[6, 7, 8],
            &[9, 3, 1],
            &[7, 8, 6],
            &[0, 1, 9],
        ])
        .unwrap();

        let result = eval.evaluate(&window);
        let scatter = result.scatter_line().unwrap();
        assert_eq!(scatter.positions, vec![1, 6, 14]);
        assert_eq!(scatter.ways, 1);
        assert_eq!(scatter.line_no, SCATTER_LINE_NO);
        assert_eq!(scatter.credit, paytable.scatter_payout(3));
        assert_eq!(result.total_credit, 100);
    }

    #[test]
    fn test_credit_scales_with_bet() {
        let paytable = paytable();
        assert_eq!(paytable.base_bet(), 50);
        let window = ReelWindow::from_ids(&[
            &[4, 4, 0],
            &[4, 6, 8],
            &[4, 5, 7],
            &[6, 7, 8],
            &[9, 9, 9],
        ])
        .unwrap();

        let base = WinEvaluator::new(&paytable).evaluate(&window);
        // P1 run of 3 with 2 ways, plus 3 scatters
        assert_eq!(base.lines.len(), 2);
        assert_eq!(base.total_credit, 50 * 2 + 100);

        let double = WinEvaluator::with_bet(&paytable, 100);
        let result = double.evaluate(&window);
        assert_eq!(result.total_credit, 2 * base.total_credit);
        assert!(result.lines.iter().all(|l| double.validate_win_line(l, &window)));

        // fractional bets round down per line
        let small = WinEvaluator::with_bet(&paytable, 1).evaluate(&window);
        assert_eq!(small.lines[0].credit, 2);
        assert_eq!(small.scatter_line().unwrap().credit, 2);

        // a line priced at one bet does not validate at another
        assert!(!double.validate_win_line(&base.lines[0], &window));
    }

    #[test]
    fn test_scaling_saturates() {
        let paytable = paytable();
        assert_eq!(paytable.scale(u64::MAX, 100), u64::MAX);
        assert_eq!(paytable.scale(u64::MAX, 50), u64::MAX);
        assert_eq!(paytable.scale(99, 1), 1);
    }

    #[test]
    fn test_line_numbers_and_total() {
        let paytable = paytable();
        let eval = WinEvaluator::new(&paytable);
        let window = ReelWindow::from_ids(&[
            &[7, 8, 0],
            &[7, 8, 1],
            &[7, 8, 2],
            &[6, 6, 6],
            &[6, 6, 6],
        ])
        .unwrap();

        let result = eval.evaluate(&window);
        assert_eq!(result.lines.len(), 2);
        assert_eq!(result.lines[0].line_no, 1);
        assert_eq!(result.lines[1].line_no, 2);
        assert_eq!(result.total_credit, 5 + 5);
        assert!(result.lines.iter().all(|l| eval.validate_win_line(l, &window)));
    }

    #[test]
    fn test_validate_rejects_tampered_line() {
        let paytable = paytable();
        let eval = WinEvaluator::new(&paytable);
        let window = ReelWindow::from_ids(&[
            &[7, 7, 0],
            &[7, 8, 1],
            &[7, 8, 2],
            &[6, 6, 6],
            &[6, 6, 6],
        ])
        .unwrap();

        let mut line = eval.evaluate(&window).lines[0].clone();
        assert!(eval.validate_win_line(&line, &window));
        line.ways = 1;
        assert!(!eval.validate_win_line(&line, &window));
    }
}
