#![forbid(unsafe_code)]
#![warn(
    unused,
    clippy::cognitive_complexity,
    unused_crate_dependencies,
    unused_extern_crates,
    clippy::unused_self,
    clippy::useless_let_if_seq,
    missing_debug_implementations,
    rust_2018_idioms,
    rust_2024_compatibility
)]

//! Technical analysis for Playcore: the incremental indicator cache (C2) and the
//! structure-state DAG (C3).
//!
//! `indicators`/`patterns` hold the original `Decimal`-based moving-average and crossover
//! helpers; `incremental`/`feature`/`cache` are the `f64`-based C2 engine, and `structure` is
//! the C3 engine built on top of it.

pub mod cache;
pub mod feature;
pub mod incremental;
pub mod indicators;
pub mod patterns;
pub mod structure;

pub use cache::{CacheError, IndicatorCache, ParityReport};
pub use feature::{FeatureKind, FeatureSpec, IndicatorType};
pub use incremental::{Ema, IncrementalIndicator, Rsi, Sma};
pub use structure::{
    BarContext, FieldValue, StructureCache, StructureDetector, StructureFrame, StructureGraphError,
    StructureSpec, StructureType, WindowMode,
};
