//! Symbol definitions and the resolved symbol table

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Number of symbols in the P-series set
pub const P_SERIES_LEN: usize = 5;

/// Symbol identifier as it appears on reel strips and windows
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SymbolId(pub u32);

impl SymbolId {
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Symbol category classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolCategory {
    /// P-series symbols, remapped during free spins
    PSeries,
    /// Mid paying symbol
    Mid,
    /// High paying symbol
    High,
    /// Wild - substitutes for any non-scatter symbol
    Wild,
    /// Scatter - pays and triggers anywhere on the grid
    Scatter,
}

/// A symbol definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    /// Unique symbol ID
    pub id: SymbolId,
    /// Symbol name (e.g., "P1", "K", "WILD", "BONUS")
    pub name: String,
    /// Symbol category
    pub category: SymbolCategory,
}

impl Symbol {
    pub fn new(id: u32, name: impl Into<String>, category: SymbolCategory) -> Self {
        Self {
            id: SymbolId(id),
            name: name.into(),
            category,
        }
    }

    /// Check if this is a special symbol (wild, scatter)
    pub fn is_special(&self) -> bool {
        matches!(self.category, SymbolCategory::Wild | SymbolCategory::Scatter)
    }
}

/// Symbol table resolved once at configuration load.
///
/// Wild, scatter and P-series ids are looked up up front so gameplay code
/// never sees an unresolved reference.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
    by_name: HashMap<String, SymbolId>,
    wild: SymbolId,
    scatter: SymbolId,
    p_series: [SymbolId; P_SERIES_LEN],
}

impl SymbolTable {
    /// Build a table from symbol definitions.
    ///
    /// `p_series` lists the P-series names in order (P1 first). Fails on
    /// duplicate ids or names, a missing or repeated wild/scatter, or a
    /// P-series name that is unknown or not categorised as P-series.
    pub fn new(symbols: Vec<Symbol>, p_series: &[String]) -> Result<Self, ConfigError> {
        let mut by_name = HashMap::with_capacity(symbols.len());
        let mut seen_ids = HashMap::with_capacity(symbols.len());

        for symbol in &symbols {
            if by_name.insert(symbol.name.clone(), symbol.id).is_some() {
                return Err(ConfigError::ValidationFailed(format!(
                    "duplicate symbol name '{}'",
                    symbol.name
                )));
            }
            if let Some(other) = seen_ids.insert(symbol.id, symbol.name.as_str()) {
                return Err(ConfigError::ValidationFailed(format!(
                    "symbol id {} used by both '{}' and '{}'",
                    symbol.id, other, symbol.name
                )));
            }
        }

        let wild = Self::unique_of(&symbols, SymbolCategory::Wild)?;
        let scatter = Self::unique_of(&symbols, SymbolCategory::Scatter)?;

        if p_series.len() != P_SERIES_LEN {
            return Err(ConfigError::ValidationFailed(format!(
                "P-series must name exactly {} symbols, got {}",
                P_SERIES_LEN,
                p_series.len()
            )));
        }

        let mut resolved = [SymbolId(0); P_SERIES_LEN];
        for (slot, name) in resolved.iter_mut().zip(p_series) {
            let id = by_name
                .get(name)
                .copied()
                .ok_or_else(|| ConfigError::UnknownSymbol {
                    name: name.clone(),
                    context: "p_series".into(),
                })?;
            let symbol = symbols.iter().find(|s| s.id == id);
            if symbol.map(|s| s.category) != Some(SymbolCategory::PSeries) {
                return Err(ConfigError::ValidationFailed(format!(
                    "'{name}' is listed in p_series but not categorised as p_series"
                )));
            }
            *slot = id;
        }

        let mut distinct = resolved.to_vec();
        distinct.sort();
        distinct.dedup();
        if distinct.len() != P_SERIES_LEN {
            return Err(ConfigError::ValidationFailed(
                "p_series names must be distinct".into(),
            ));
        }

        Ok(Self {
            symbols,
            by_name,
            wild,
            scatter,
            p_series: resolved,
        })
    }

    fn unique_of(symbols: &[Symbol], category: SymbolCategory) -> Result<SymbolId, ConfigError> {
        let mut matching = symbols.iter().filter(|s| s.category == category);
        match (matching.next(), matching.next()) {
            (Some(symbol), None) => Ok(symbol.id),
            (None, _) => Err(ConfigError::ValidationFailed(format!(
                "no {category:?} symbol defined"
            ))),
            (Some(_), Some(_)) => Err(ConfigError::ValidationFailed(format!(
                "more than one {category:?} symbol defined"
            ))),
        }
    }

    /// Resolve a symbol name, reporting `context` on failure
    pub fn resolve(&self, name: &str, context: &str) -> Result<SymbolId, ConfigError> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| ConfigError::UnknownSymbol {
                name: name.to_string(),
                context: context.to_string(),
            })
    }

    /// Get symbol by ID
    pub fn get(&self, id: SymbolId) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.id == id)
    }

    /// Get symbol name by ID
    pub fn name_of(&self, id: SymbolId) -> Option<&str> {
        self.get(id).map(|s| s.name.as_str())
    }

    pub fn wild_id(&self) -> SymbolId {
        self.wild
    }

    pub fn scatter_id(&self) -> SymbolId {
        self.scatter
    }

    /// P-series ids, P1 first
    pub fn p_series(&self) -> &[SymbolId; P_SERIES_LEN] {
        &self.p_series
    }

    pub fn is_p_series(&self, id: SymbolId) -> bool {
        self.p_series.contains(&id)
    }

    /// Ids evaluated by the ways scan, ascending (wild and scatter excluded)
    pub fn paying_ids(&self) -> Vec<SymbolId> {
        let mut ids: Vec<SymbolId> = self
            .symbols
            .iter()
            .filter(|s| !s.is_special())
            .map(|s| s.id)
            .collect();
        ids.sort();
        ids
    }

    pub fn symbols(&self) -> &[Symbol] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}
