//! # wd-slot-math — War Drums ways slot mathematics
//!
//! Deterministic game-mathematics engine for a 5×3, 243-ways slot with a
//! free spin feature, retriggers, P-series symbol transforms and the
//! "war drums" bonus multiplier.
//!
//! ## Features
//!
//! - **Ways Evaluation**: Contiguous left-to-right reel matching with wild substitution
//! - **Scatter Trigger**: Free spins from scatters on the first three reels, capped retriggers
//! - **War Drums**: Weighted per-drum multipliers summed into the free spin win
//! - **Feature Buy**: Fixed-cost tiers that open a free spin session directly
//! - **Reproducible**: Every session owns a seedable ChaCha RNG, no global state
//!
//! ## Architecture
//!
//! ```text
//! GameConfig ──resolve()──> GameDefinition (Arc, immutable)
//!                                │
//!                                v
//! GameSession ── spin / buy_feature / spin_free
//!     │
//!     ├── ReelStripModel      (sample window)
//!     ├── SymbolTransformer   (free spins only)
//!     ├── WinEvaluator        (243 ways + scatter)
//!     ├── WarDrums            (free spin multiplier)
//!     ├── FeatureTriggerEngine
//!     └── FeatureBuyController
//!           │
//!           v
//!     SpinOutcome / SessionSnapshot
//! ```

pub mod config;
pub mod drums;
pub mod error;
pub mod feature_buy;
pub mod free_spins;
pub mod paytable;
pub mod reel_controller;
pub mod reels;
pub mod session;
pub mod spin;
pub mod symbols;
pub mod transform;

pub use config::*;
pub use drums::*;
pub use error::*;
pub use feature_buy::*;
pub use free_spins::*;
pub use paytable::*;
pub use reel_controller::*;
pub use reels::*;
pub use session::*;
pub use spin::*;
pub use symbols::*;
pub use transform::*;
