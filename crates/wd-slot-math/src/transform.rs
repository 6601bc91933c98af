//! Free spin symbol transforms
//!
//! During free spins every P-series cell is redrawn independently from a
//! fixed categorical distribution over the same five symbols. Two scripted
//! patterns act on fixed cells for presentation sequences:
//!
//! - **Vertical**: configured cell rules, by default `(reel 1, row 1)` P3 → T
//!   and `(reel 2, row 2)` P3 → P4.
//! - **Cross**: the main diagonal `(i, i)` for `i < min(reels, rows)`; P-series
//!   cells there are redrawn from the transform distribution.
//!
//! Non-P-series cells are never touched by [`SymbolTransformer::transform`].

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::reels::ReelWindow;
use crate::symbols::{P_SERIES_LEN, SymbolId, SymbolTable};

/// Scripted substitution on one cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellRule {
    pub reel: usize,
    pub row: usize,
    pub from: SymbolId,
    pub to: SymbolId,
}

/// Fixed-coordinate presentation pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformPattern {
    Vertical,
    Cross,
}

/// One step of a transform sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformStep {
    /// Full P-series redraw
    Normal,
    Pattern(TransformPattern),
}

/// Cells on the main diagonal of a `reels × rows` grid
pub fn cross_cells(reels: usize, rows: usize) -> Vec<(usize, usize)> {
    (0..reels.min(rows)).map(|i| (i, i)).collect()
}

/// P-series remapper
#[derive(Debug, Clone)]
pub struct SymbolTransformer {
    /// Draw targets, index-aligned with `dist`
    targets: Vec<SymbolId>,
    dist: WeightedIndex<u32>,
    p_series: [SymbolId; P_SERIES_LEN],
    vertical: Vec<CellRule>,
}

impl SymbolTransformer {
    /// `weights` must cover exactly the P-series, each weight > 0
    pub fn new(
        symbols: &SymbolTable,
        weights: &[(SymbolId, u32)],
        vertical: Vec<CellRule>,
    ) -> Result<Self, ConfigError> {
        let p_series = *symbols.p_series();

        if weights.len() != P_SERIES_LEN {
            return Err(ConfigError::ValidationFailed(format!(
                "transform weights must cover the {P_SERIES_LEN} P-series symbols, got {}",
                weights.len()
            )));
        }
        for &(id, weight) in weights {
            if !p_series.contains(&id) {
                return Err(ConfigError::ValidationFailed(format!(
                    "transform weight for non P-series symbol {id}"
                )));
            }
            if weight == 0 {
                return Err(ConfigError::ValidationFailed(format!(
                    "transform weight for symbol {id} must be positive"
                )));
            }
        }
        if p_series
            .iter()
            .any(|p| !weights.iter().any(|&(id, _)| id == *p))
        {
            return Err(ConfigError::ValidationFailed(
                "transform weights repeat a P-series symbol".into(),
            ));
        }

        // Draw order follows P-series order, not config order
        let targets: Vec<SymbolId> = p_series.to_vec();
        let ordered: Vec<u32> = targets
            .iter()
            .map(|p| {
                weights
                    .iter()
                    .find(|&&(id, _)| id == *p)
                    .map_or(0, |&(_, w)| w)
            })
            .collect();
        let dist = WeightedIndex::new(&ordered)
            .map_err(|e| ConfigError::ValidationFailed(format!("transform weights: {e}")))?;

        Ok(Self {
            targets,
            dist,
            p_series,
            vertical,
        })
    }

    pub fn is_p_series(&self, id: SymbolId) -> bool {
        self.p_series.contains(&id)
    }

    pub fn vertical_rules(&self) -> &[CellRule] {
        &self.vertical
    }

    /// Draw one P-series replacement
    pub fn draw<R: Rng + ?Sized>(&self, rng: &mut R) -> SymbolId {
        self.targets[self.dist.sample(rng)]
    }

    /// Redraw every P-series cell; other cells pass through
    pub fn transform<R: Rng + ?Sized>(&self, window: &ReelWindow, rng: &mut R) -> ReelWindow {
        let mut out = window.clone();
        for (reel, row, symbol) in window.cells() {
            if self.is_p_series(symbol) {
                out.set(reel, row, self.draw(rng));
            }
        }
        out
    }

    /// Apply a fixed-coordinate pattern
    pub fn apply_pattern<R: Rng + ?Sized>(
        &self,
        window: &ReelWindow,
        pattern: TransformPattern,
        rng: &mut R,
    ) -> ReelWindow {
        let mut out = window.clone();
        match pattern {
            TransformPattern::Vertical => {
                for rule in &self.vertical {
                    if window.get(rule.reel, rule.row) == Some(rule.from) {
                        out.set(rule.reel, rule.row, rule.to);
                    }
                }
            }
            TransformPattern::Cross => {
                for (reel, row) in cross_cells(window.reel_count(), window.height()) {
                    if window.get(reel, row).is_some_and(|s| self.is_p_series(s)) {
                        out.set(reel, row, self.draw(rng));
                    }
                }
            }
        }
        out
    }

    /// Run `steps` in order, returning the window after each step
    pub fn apply_sequence<R: Rng + ?Sized>(
        &self,
        window: &ReelWindow,
        steps: &[TransformStep],
        rng: &mut R,
    ) -> Vec<ReelWindow> {
        let mut frames = Vec::with_capacity(steps.len());
        let mut current = window.clone();
        for step in steps {
            current = match *step {
                TransformStep::Normal => self.transform(&current, rng),
                TransformStep::Pattern(pattern) => self.apply_pattern(&current, pattern, rng),
            };
            frames.push(current.clone());
        }
        frames
    }
}

/// Cell-level difference between two windows of the same shape
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformStats {
    /// Absolute positions whose symbol changed
    pub changed_positions: Vec<usize>,
    pub total_cells: usize,
}

impl TransformStats {
    pub fn between(original: &ReelWindow, transformed: &ReelWindow) -> Self {
        let changed_positions = original
            .cells()
            .filter(|&(reel, row, symbol)| transformed.get(reel, row) != Some(symbol))
            .map(|(reel, row, _)| original.position(reel, row))
            .collect();

        Self {
            changed_positions,
            total_cells: original.reel_count() * original.height(),
        }
    }

    pub fn changed(&self) -> usize {
        self.changed_positions.len()
    }

    pub fn change_ratio(&self) -> f64 {
        if self.total_cells == 0 {
            0.0
        } else {
            self.changed() as f64 / self.total_cells as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameDefinition;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    // Default ids: P5=0 P4=1 P3=2 P2=3 P1=4 K=5 Q=6 J=7 T=8 BONUS=9 WILD=10
    fn transformer() -> SymbolTransformer {
        GameDefinition::standard().unwrap().transformer().clone()
    }

    #[test]
    fn test_non_p_series_unchanged() {
        let transformer = transformer();
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let window = ReelWindow::from_ids(&[
            &[5, 6, 7],
            &[8, 9, 10],
            &[5, 6, 7],
            &[8, 9, 10],
            &[5, 6, 7],
        ])
        .unwrap();

        for _ in 0..20 {
            assert_eq!(transformer.transform(&window, &mut rng), window);
        }
    }

    #[test]
    fn test_p_series_stays_in_set() {
        let transformer = transformer();
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        let window = ReelWindow::from_ids(&[
            &[0, 1, 2],
            &[3, 4, 9],
            &[0, 10, 2],
            &[3, 4, 5],
            &[0, 1, 2],
        ])
        .unwrap();

        for _ in 0..200 {
            let out = transformer.transform(&window, &mut rng);
            for (reel, row, before) in window.cells() {
                let after = out.get(reel, row).unwrap();
                if transformer.is_p_series(before) {
                    assert!(transformer.is_p_series(after));
                } else {
                    assert_eq!(before, after);
                }
            }
        }
    }

    #[test]
    fn test_draw_frequencies_follow_weights() {
        let transformer = transformer();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut p1 = 0;
        let mut p5 = 0;
        let n = 20_000;
        for _ in 0..n {
            match transformer.draw(&mut rng) {
                SymbolId(4) => p1 += 1,
                SymbolId(0) => p5 += 1,
                _ => {}
            }
        }
        let p1 = p1 as f64 / n as f64;
        let p5 = p5 as f64 / n as f64;
        assert!((p1 - 0.25).abs() < 0.02, "P1 rate {p1}");
        assert!((p5 - 0.10).abs() < 0.02, "P5 rate {p5}");
    }

    #[test]
    fn test_vertical_pattern_fixed_cells() {
        let transformer = transformer();
        let mut rng = ChaCha8Rng::seed_from_u64(0);
        // P3 at (1,1), (2,2) and (0,0)
        let window = ReelWindow::from_ids(&[
            &[2, 5, 6],
            &[7, 2, 8],
            &[5, 6, 2],
            &[5, 6, 7],
            &[5, 6, 7],
        ])
        .unwrap();

        let out = transformer.apply_pattern(&window, TransformPattern::Vertical, &mut rng);
        assert_eq!(out.get(1, 1), Some(SymbolId(8)));
        assert_eq!(out.get(2, 2), Some(SymbolId(1)));
        assert_eq!(out.get(0, 0), Some(SymbolId(2)));

        let stats = TransformStats::between(&window, &out);
        assert_eq!(stats.changed_positions, vec![4, 8]);
        assert_eq!(stats.total_cells, 15);
    }

    #[test]
    fn test_cross_pattern_only_touches_diagonal() {
        let transformer = transformer();
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let window = ReelWindow::from_ids(&[
            &[0, 0, 0],
            &[0, 0, 0],
            &[0, 0, 0],
            &[0, 0, 0],
            &[0, 0, 0],
        ])
        .unwrap();

        assert_eq!(cross_cells(5, 3), vec![(0, 0), (1, 1), (2, 2)]);
        for _ in 0..50 {
            let out = transformer.apply_pattern(&window, TransformPattern::Cross, &mut rng);
            let stats = TransformStats::between(&window, &out);
            assert!(stats.changed_positions.iter().all(|p| [0, 4, 8].contains(p)));
        }
    }

    #[test]
    fn test_sequence_returns_each_frame() {
        let transformer = transformer();
        let mut rng = ChaCha8Rng::seed_from_u64(8);
        let window = ReelWindow::from_ids(&[
            &[2, 5, 6],
            &[7, 2, 8],
            &[5, 6, 2],
            &[5, 6, 7],
            &[5, 6, 7],
        ])
        .unwrap();

        let steps = [
            TransformStep::Pattern(TransformPattern::Vertical),
            TransformStep::Normal,
            TransformStep::Pattern(TransformPattern::Cross),
        ];
        let frames = transformer.apply_sequence(&window, &steps, &mut rng);
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].get(1, 1), Some(SymbolId(8)));
    }

    #[test]
    fn test_weights_must_cover_p_series() {
        let def = GameDefinition::standard().unwrap();
        let symbols = def.symbols();
        let weights = [(SymbolId(4), 25), (SymbolId(3), 20)];
        assert!(SymbolTransformer::new(symbols, &weights, Vec::new()).is_err());

        let weights = [
            (SymbolId(4), 25),
            (SymbolId(3), 20),
            (SymbolId(2), 20),
            (SymbolId(1), 15),
            (SymbolId(5), 10),
        ];
        assert!(SymbolTransformer::new(symbols, &weights, Vec::new()).is_err());
    }
}
