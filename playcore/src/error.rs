//! Top-level error type (§7 Error Handling Design): every sub-crate error funnels into
//! [`PlaycoreError`] at this crate boundary, each variant mapping to one of the §7 error kinds
//! so callers and the journal (`journal.rs`) can always ask for a `reason()`.

use playcore_data::{ProviderError, StoreError};
use playcore_execution::ExecutorDenial;
use playcore_risk::RiskConfigError;
use playcore_snapshot::StateStoreError;
use playcore_ta::StructureGraphError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    MissingKey(&'static str),
    #[error("invalid value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("TRADING_MODE={trading_mode} is inconsistent with BYBIT_USE_DEMO={use_demo}")]
    ModeApiMismatch { trading_mode: String, use_demo: bool },
    #[error("{key}={value} exceeds the platform hard cap of {cap}")]
    HardCapExceeded { key: &'static str, value: String, cap: String },
}

/// Play schema / compile-time validation failures (§7 Validation: "Play schema, unknown
/// indicator/structure, cyclic depends_on — refuse to load").
#[derive(Debug, Error)]
pub enum PlayValidationError {
    #[error("play references timeframe role {0:?} with no declared timeframe")]
    MissingTfRoleMapping(playcore_instrument::TfRole),
    #[error("structure graph is invalid: {0}")]
    StructureGraph(#[from] StructureGraphError),
    #[error("risk limits are invalid: {0}")]
    RiskConfig(#[from] RiskConfigError),
    #[error("play declares no entry rule for either direction")]
    NoEntryRules,
}

/// The aggregated error surface every `playcore` public operation returns (§7).
#[derive(Debug, Error)]
pub enum PlaycoreError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("play validation error: {0}")]
    Validation(#[from] PlayValidationError),
    #[error("data error: {0}")]
    Provider(#[from] ProviderError),
    #[error("historical store error: {0}")]
    Store(#[from] StoreError),
    #[error("execution denied: {0}")]
    Execution(#[from] ExecutorDenial),
    #[error("state store error: {0}")]
    StateStore(#[from] StateStoreError),
    #[error("concurrency limit reached: {0}")]
    ConcurrencyLimit(String),
    #[error("instance {0} not found")]
    InstanceNotFound(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl PlaycoreError {
    /// The short machine-readable reason carried back to the caller (§7: `blocked_by_risk`,
    /// `panic_active`, `mode_mismatch`, `price_deviation`, `insufficient_balance`,
    /// `wait_timeout`, `ws_unhealthy`, ...).
    pub fn reason(&self) -> &'static str {
        match self {
            PlaycoreError::Configuration(_) => "configuration_error",
            PlaycoreError::Validation(_) => "validation_error",
            PlaycoreError::Provider(_) => "data_error",
            PlaycoreError::Store(_) => "data_error",
            PlaycoreError::Execution(denial) => denial.code(),
            PlaycoreError::StateStore(_) => "state_store_error",
            PlaycoreError::ConcurrencyLimit(_) => "concurrency_limit",
            PlaycoreError::InstanceNotFound(_) => "instance_not_found",
            PlaycoreError::Internal(_) => "internal_error",
        }
    }
}
