//! Reel strips, visible windows and strip sampling

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, SlotError};
use crate::symbols::SymbolId;

/// A circular reel strip
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReelStrip {
    /// Reel index
    pub reel_index: usize,
    /// Symbol IDs in order
    pub symbols: Vec<SymbolId>,
}

impl ReelStrip {
    pub fn new(reel_index: usize, symbols: Vec<SymbolId>) -> Self {
        Self {
            reel_index,
            symbols,
        }
    }

    /// Get symbol at position (wraps around)
    pub fn symbol_at(&self, position: usize) -> SymbolId {
        self.symbols[position % self.symbols.len()]
    }

    /// `height` consecutive symbols starting at `offset`, wrapping at the end
    pub fn window_at(&self, offset: usize, height: usize) -> Vec<SymbolId> {
        (0..height).map(|row| self.symbol_at(offset + row)).collect()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Visible result of one draw, column-major (`reels[reel][row]`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawWindow")]
pub struct ReelWindow {
    reels: Vec<Vec<SymbolId>>,
}

/// Unchecked wire form of [`ReelWindow`]
#[derive(Deserialize)]
struct RawWindow {
    reels: Vec<Vec<SymbolId>>,
}

impl TryFrom<RawWindow> for ReelWindow {
    type Error = String;

    fn try_from(raw: RawWindow) -> Result<Self, Self::Error> {
        Self::new(raw.reels)
            .ok_or_else(|| "window reels must be non-empty and of equal height".to_string())
    }
}

impl ReelWindow {
    /// Build a window; every reel must have the same, non-zero height
    pub fn new(reels: Vec<Vec<SymbolId>>) -> Option<Self> {
        let height = reels.first()?.len();
        if height == 0 || reels.iter().any(|r| r.len() != height) {
            return None;
        }
        Some(Self { reels })
    }

    /// Convenience constructor from raw ids
    pub fn from_ids(reels: &[&[u32]]) -> Option<Self> {
        Self::new(
            reels
                .iter()
                .map(|reel| reel.iter().map(|&id| SymbolId(id)).collect())
                .collect(),
        )
    }

    pub fn reel_count(&self) -> usize {
        self.reels.len()
    }

    pub fn height(&self) -> usize {
        self.reels[0].len()
    }

    pub fn reel(&self, reel: usize) -> &[SymbolId] {
        &self.reels[reel]
    }

    pub fn reels(&self) -> &[Vec<SymbolId>] {
        &self.reels
    }

    pub fn get(&self, reel: usize, row: usize) -> Option<SymbolId> {
        self.reels.get(reel).and_then(|r| r.get(row)).copied()
    }

    pub(crate) fn set(&mut self, reel: usize, row: usize, symbol: SymbolId) {
        self.reels[reel][row] = symbol;
    }

    /// Absolute grid index of a cell (`reel * height + row`)
    pub fn position(&self, reel: usize, row: usize) -> usize {
        reel * self.height() + row
    }

    /// Iterate `(reel, row, symbol)` over every cell
    pub fn cells(&self) -> impl Iterator<Item = (usize, usize, SymbolId)> + '_ {
        self.reels.iter().enumerate().flat_map(|(reel, column)| {
            column
                .iter()
                .enumerate()
                .map(move |(row, &symbol)| (reel, row, symbol))
        })
    }

    /// Does the reel show `symbol` anywhere?
    pub fn reel_contains(&self, reel: usize, symbol: SymbolId) -> bool {
        self.reels
            .get(reel)
            .is_some_and(|column| column.contains(&symbol))
    }

    /// Count `symbol` over the whole grid
    pub fn count(&self, symbol: SymbolId) -> usize {
        self.cells().filter(|&(_, _, s)| s == symbol).count()
    }
}

/// A sampled window together with the strip offsets that produced it
#[derive(Debug, Clone)]
pub struct SampledWindow {
    pub window: ReelWindow,
    pub stops: Vec<usize>,
}

/// Owns the reel strips and draws windows from them
#[derive(Debug, Clone)]
pub struct ReelStripModel {
    strips: Vec<ReelStrip>,
    height: usize,
}

impl ReelStripModel {
    pub fn new(strips: Vec<ReelStrip>, height: usize) -> Result<Self, ConfigError> {
        if strips.is_empty() || height == 0 {
            return Err(ConfigError::ValidationFailed(
                "reel model needs at least one strip and a non-zero height".into(),
            ));
        }
        if let Some(strip) = strips.iter().find(|s| s.is_empty()) {
            return Err(ConfigError::ValidationFailed(format!(
                "reel strip {} is empty",
                strip.reel_index
            )));
        }
        Ok(Self { strips, height })
    }

    pub fn reel_count(&self) -> usize {
        self.strips.len()
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn strip(&self, reel: usize) -> Option<&ReelStrip> {
        self.strips.get(reel)
    }

    /// Draw one reel: uniform start offset in `[0, len)`, one RNG draw
    pub fn sample_reel<R: Rng + ?Sized>(&self, reel: usize, rng: &mut R) -> (usize, Vec<SymbolId>) {
        let strip = &self.strips[reel];
        let offset = rng.random_range(0..strip.len());
        (offset, strip.window_at(offset, self.height))
    }

    /// Draw a full window, reels in index order
    pub fn sample_window<R: Rng + ?Sized>(&self, rng: &mut R) -> SampledWindow {
        let mut stops = Vec::with_capacity(self.strips.len());
        let mut columns = Vec::with_capacity(self.strips.len());

        for reel in 0..self.strips.len() {
            let (offset, column) = self.sample_reel(reel, rng);
            stops.push(offset);
            columns.push(column);
        }

        SampledWindow {
            window: ReelWindow { reels: columns },
            stops,
        }
    }

    /// First offset (ascending) whose wrapped window equals `target`.
    /// `target` must be exactly `height` symbols long.
    ///
    /// Drives presentation toward an already-decided result; it never decides
    /// outcomes and never substitutes a near match.
    pub fn locate_offset(&self, reel: usize, target: &[SymbolId]) -> Result<usize, SlotError> {
        let not_found = || SlotError::ReelSearch {
            reel,
            target: target.to_vec(),
        };

        if target.len() != self.height {
            return Err(not_found());
        }
        let strip = self.strips.get(reel).ok_or_else(not_found)?;
        (0..strip.len())
            .find(|&offset| {
                target
                    .iter()
                    .enumerate()
                    .all(|(row, &symbol)| strip.symbol_at(offset + row) == symbol)
            })
            .ok_or_else(not_found)
    }

    /// Offsets reproducing every reel of `window`
    pub fn locate_window(&self, window: &ReelWindow) -> Result<Vec<usize>, SlotError> {
        if window.reel_count() != self.strips.len() || window.height() != self.height {
            return Err(SlotError::ReelSearch {
                reel: window.reel_count().min(self.strips.len()),
                target: Vec::new(),
            });
        }
        (0..window.reel_count())
            .map(|reel| self.locate_offset(reel, window.reel(reel)))
            .collect()
    }

    /// Is every reel of `window` reachable on the strips?
    pub fn validate(&self, window: &ReelWindow) -> bool {
        self.locate_window(window).is_ok()
    }
}
