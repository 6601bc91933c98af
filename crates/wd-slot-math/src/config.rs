//! Game configuration
//!
//! [`GameConfig`] is the raw, serde-facing description of a game: symbols,
//! reel strips and paytable by symbol *name*, plus feature parameters.
//! [`GameConfig::resolve`] validates it once and produces an immutable
//! [`GameDefinition`] whose references are all typed [`SymbolId`]s.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::drums::{WarDrums, WarDrumsConfig};
use crate::error::ConfigError;
use crate::feature_buy::{FeatureBuyController, PurchaseTier};
use crate::free_spins::{FeatureTriggerEngine, FreeSpinsConfig};
use crate::paytable::Paytable;
use crate::reels::{ReelStrip, ReelStripModel};
use crate::symbols::{Symbol, SymbolCategory, SymbolTable};
use crate::transform::{CellRule, SymbolTransformer};

/// Grid specification (reels × rows)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of reels (columns)
    pub reels: u8,
    /// Number of visible rows per reel
    pub rows: u8,
}

impl GridSpec {
    /// Standard 5×3 ways grid
    pub fn standard_5x3() -> Self {
        Self { reels: 5, rows: 3 }
    }

    /// Total grid positions
    pub fn total_positions(&self) -> usize {
        self.reels as usize * self.rows as usize
    }

    /// Maximum ways (rows ^ reels, 243 for 5×3)
    pub fn max_ways(&self) -> u64 {
        (self.rows as u64).pow(self.reels as u32)
    }
}

impl Default for GridSpec {
    fn default() -> Self {
        Self::standard_5x3()
    }
}

/// Paytable section, keyed by symbol name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PaytableConfig {
    /// Pay values for 3, 4, 5 of a kind (index 0 = 3oak, etc.)
    #[serde(default)]
    pub pays: BTreeMap<String, Vec<u64>>,
    /// Scatter pays by total grid count
    #[serde(default)]
    pub scatter_pays: BTreeMap<usize, u64>,
}

/// Scripted substitution on a single grid cell
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellSubstitution {
    pub reel: usize,
    pub row: usize,
    pub from: String,
    pub to: String,
}

/// Free spin symbol transform section
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Relative redraw weights over the P-series
    pub weights: BTreeMap<String, u32>,
    /// Cells rewritten by the vertical pattern
    pub vertical: Vec<CellSubstitution>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        let weights = [("P1", 25), ("P2", 20), ("P3", 20), ("P4", 15), ("P5", 10)]
            .into_iter()
            .map(|(name, w)| (name.to_string(), w))
            .collect();

        Self {
            weights,
            vertical: vec![
                CellSubstitution {
                    reel: 1,
                    row: 1,
                    from: "P3".into(),
                    to: "T".into(),
                },
                CellSubstitution {
                    reel: 2,
                    row: 2,
                    from: "P3".into(),
                    to: "P4".into(),
                },
            ],
        }
    }
}

/// Complete raw game configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameConfig {
    /// Game name for reference
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub grid: GridSpec,
    pub symbols: Vec<Symbol>,
    /// P-series names, P1 first
    #[serde(default = "default_p_series")]
    pub p_series: Vec<String>,
    /// One strip of symbol names per reel
    pub reel_strips: Vec<Vec<String>>,
    /// Bet the paytable is priced against
    #[serde(default = "default_base_bet")]
    pub base_bet: u64,
    pub paytable: PaytableConfig,
    #[serde(default)]
    pub free_spins: FreeSpinsConfig,
    #[serde(default)]
    pub war_drums: WarDrumsConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    #[serde(default = "PurchaseTier::standard_tiers")]
    pub feature_buy: Vec<PurchaseTier>,
}

fn default_name() -> String {
    "War Drums".to_string()
}

fn default_base_bet() -> u64 {
    50
}

fn default_p_series() -> Vec<String> {
    ["P1", "P2", "P3", "P4", "P5"].iter().map(|s| s.to_string()).collect()
}

const DEFAULT_NAMES: [&str; 11] = [
    "P5", "P4", "P3", "P2", "P1", "K", "Q", "J", "T", "BONUS", "WILD",
];

const DEFAULT_STRIPS: [[u32; 40]; 5] = [
    [
        4, 5, 6, 7, 8, 4, 5, 6, 7, 8, 3, 4, 5, 6, 7, 8, 2, 3, 4, 9, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6,
        7, 8, 0, 1, 2, 3, 9, 5, 6, 7,
    ],
    [
        5, 6, 7, 8, 4, 5, 6, 7, 8, 3, 4, 10, 6, 7, 8, 2, 3, 4, 5, 9, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7,
        8, 0, 1, 2, 3, 4, 5, 9, 7, 8,
    ],
    [
        6, 7, 8, 4, 5, 10, 7, 8, 3, 4, 5, 6, 7, 8, 2, 3, 4, 5, 6, 9, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8,
        0, 1, 2, 3, 4, 5, 6, 7, 8, 9,
    ],
    [
        7, 8, 4, 5, 6, 7, 8, 3, 4, 5, 10, 7, 8, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 0, 1,
        2, 3, 4, 5, 6, 7, 8, 4, 5, 6,
    ],
    [
        8, 4, 5, 6, 7, 8, 3, 4, 5, 6, 7, 8, 2, 3, 4, 10, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8, 0, 1, 2,
        3, 4, 5, 6, 7, 8, 0, 1, 2, 3,
    ],
];

impl Default for GameConfig {
    /// The shipped War Drums game: 11 symbols, 40-stop strips, 243 ways
    fn default() -> Self {
        let categories = [
            SymbolCategory::PSeries,
            SymbolCategory::PSeries,
            SymbolCategory::PSeries,
            SymbolCategory::PSeries,
            SymbolCategory::PSeries,
            SymbolCategory::High,
            SymbolCategory::High,
            SymbolCategory::Mid,
            SymbolCategory::Mid,
            SymbolCategory::Scatter,
            SymbolCategory::Wild,
        ];
        let symbols = DEFAULT_NAMES
            .iter()
            .zip(categories)
            .enumerate()
            .map(|(id, (name, category))| Symbol::new(id as u32, *name, category))
            .collect();

        let reel_strips = DEFAULT_STRIPS
            .iter()
            .map(|strip| {
                strip
                    .iter()
                    .map(|&id| DEFAULT_NAMES[id as usize].to_string())
                    .collect()
            })
            .collect();

        let pays = [
            ("P1", [50, 200, 500]),
            ("P2", [30, 100, 300]),
            ("P3", [25, 50, 100]),
            ("P4", [15, 30, 80]),
            ("P5", [10, 15, 50]),
            ("K", [10, 15, 40]),
            ("Q", [8, 10, 30]),
            ("J", [5, 10, 20]),
            ("T", [5, 10, 20]),
        ]
        .into_iter()
        .map(|(name, values)| (name.to_string(), values.to_vec()))
        .collect();

        Self {
            name: default_name(),
            grid: GridSpec::standard_5x3(),
            symbols,
            p_series: default_p_series(),
            reel_strips,
            base_bet: default_base_bet(),
            paytable: PaytableConfig {
                pays,
                scatter_pays: [(3, 100), (4, 200), (5, 500)].into_iter().collect(),
            },
            free_spins: FreeSpinsConfig::default(),
            war_drums: WarDrumsConfig::default(),
            transform: TransformConfig::default(),
            feature_buy: PurchaseTier::standard_tiers(),
        }
    }
}

impl GameConfig {
    /// Parse a JSON config
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Parse a YAML config
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_yml::from_str(yaml)?)
    }

    /// Load a config file (`.yaml`/`.yml` as YAML, anything else as JSON).
    ///
    /// A missing file is reported as [`ConfigError::FileNotFound`]; nothing
    /// falls back to [`GameConfig::default`] implicitly.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let text = std::fs::read_to_string(path)?;
        let is_yaml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));

        let config = if is_yaml {
            Self::from_yaml_str(&text)?
        } else {
            Self::from_json_str(&text)?
        };
        log::info!("Loaded game config '{}' from {}", config.name, path.display());
        Ok(config)
    }

    /// Export as pretty JSON
    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Validate and resolve into an immutable [`GameDefinition`]
    pub fn resolve(&self) -> Result<GameDefinition, ConfigError> {
        let grid = self.grid;
        if grid.reels == 0 || grid.rows == 0 {
            return Err(ConfigError::ValidationFailed(format!(
                "grid must be at least 1×1, got {}×{}",
                grid.reels, grid.rows
            )));
        }

        let symbols = SymbolTable::new(self.symbols.clone(), &self.p_series)?;

        if self.reel_strips.len() != grid.reels as usize {
            return Err(ConfigError::ValidationFailed(format!(
                "expected {} reel strips, got {}",
                grid.reels,
                self.reel_strips.len()
            )));
        }

        let mut strips = Vec::with_capacity(self.reel_strips.len());
        for (reel, names) in self.reel_strips.iter().enumerate() {
            if names.len() < grid.rows as usize {
                return Err(ConfigError::ValidationFailed(format!(
                    "reel strip {reel} has {} stops, needs at least {}",
                    names.len(),
                    grid.rows
                )));
            }
            let context = format!("reel strip {reel}");
            let ids = names
                .iter()
                .map(|name| symbols.resolve(name, &context))
                .collect::<Result<Vec<_>, _>>()?;
            strips.push(ReelStrip::new(reel, ids));
        }
        let reels = ReelStripModel::new(strips, grid.rows as usize)?;

        let paytable = Paytable::from_config(&self.paytable, &symbols, self.base_bet)?;

        self.free_spins.validate(grid, self.war_drums.max_drums)?;
        let trigger = FeatureTriggerEngine::new(self.free_spins.clone(), symbols.scatter_id());

        let drums = WarDrums::new(self.war_drums.clone())?;

        let mut weights = Vec::with_capacity(self.transform.weights.len());
        for (name, &weight) in &self.transform.weights {
            let id = symbols.resolve(name, "transform weights")?;
            weights.push((id, weight));
        }
        let mut vertical = Vec::with_capacity(self.transform.vertical.len());
        for cell in &self.transform.vertical {
            if cell.reel >= grid.reels as usize || cell.row >= grid.rows as usize {
                return Err(ConfigError::ValidationFailed(format!(
                    "vertical transform cell ({}, {}) is outside the grid",
                    cell.reel, cell.row
                )));
            }
            vertical.push(CellRule {
                reel: cell.reel,
                row: cell.row,
                from: symbols.resolve(&cell.from, "vertical transform")?,
                to: symbols.resolve(&cell.to, "vertical transform")?,
            });
        }
        let transformer = SymbolTransformer::new(&symbols, &weights, vertical)?;

        let feature_buy =
            FeatureBuyController::new(self.feature_buy.clone(), self.war_drums.max_drums)?;

        log::debug!(
            "Resolved '{}': {} symbols, {}×{} grid, {} purchase tiers",
            self.name,
            symbols.len(),
            grid.reels,
            grid.rows,
            feature_buy.tiers().len()
        );

        Ok(GameDefinition {
            name: self.name.clone(),
            grid,
            symbols,
            reels,
            paytable,
            trigger,
            drums,
            transformer,
            feature_buy,
        })
    }
}

/// Validated, immutable game definition shared by every session
#[derive(Debug, Clone)]
pub struct GameDefinition {
    name: String,
    grid: GridSpec,
    symbols: SymbolTable,
    reels: ReelStripModel,
    paytable: Paytable,
    trigger: FeatureTriggerEngine,
    drums: WarDrums,
    transformer: SymbolTransformer,
    feature_buy: FeatureBuyController,
}

impl GameDefinition {
    /// Resolve the shipped default game
    pub fn standard() -> Result<Self, ConfigError> {
        GameConfig::default().resolve()
    }

    /// Wrap for sharing between sessions
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn grid(&self) -> GridSpec {
        self.grid
    }

    pub fn symbols(&self) -> &SymbolTable {
        &self.symbols
    }

    pub fn reels(&self) -> &ReelStripModel {
        &self.reels
    }

    pub fn paytable(&self) -> &Paytable {
        &self.paytable
    }

    pub fn base_bet(&self) -> u64 {
        self.paytable.base_bet()
    }

    pub fn trigger(&self) -> &FeatureTriggerEngine {
        &self.trigger
    }

    pub fn drums(&self) -> &WarDrums {
        &self.drums
    }

    pub fn transformer(&self) -> &SymbolTransformer {
        &self.transformer
    }

    pub fn feature_buy(&self) -> &FeatureBuyController {
        &self.feature_buy
    }
}
