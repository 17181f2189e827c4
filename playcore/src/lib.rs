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

//! Playcore: a declarative-strategy ("Play") trading-bot core for Bybit v5 perpetual futures.
//!
//! `play`/`view` define and validate a Play and expose its data to the rule evaluator; `engine`
//! is C8, the PlayEngine that drives one Play's `process_bar`/`execute_signal` sequence
//! identically across backtest/demo/live/shadow; `runner` is C9, the live bar-queue/reconnect/
//! health loop that drives a `PlayEngine` from realtime bus events; `manager` is C10, the
//! process-and-cross-process instance registry and concurrency-cap gate; `config`/`error` are
//! this crate's environment configuration and aggregated error type; `journal`/`logging` are the
//! ambient append-only audit log and tracing setup every mode shares.

pub mod config;
pub mod engine;
pub mod error;
pub mod journal;
pub mod logging;
pub mod manager;
pub mod play;
pub mod runner;
pub mod view;

pub use config::{ApiCredentials, AppConfig, TradingModeConfig};
pub use engine::{EngineMode, ExecutionOutcome, PlayEngine};
pub use error::{ConfigError, PlayValidationError, PlaycoreError};
pub use journal::{Journal, JournalEvent};
pub use logging::{init_json_logging, init_logging};
pub use manager::{InstanceManager, InstanceRecord, InstanceStatus};
pub use play::Play;
pub use runner::{LiveRunner, LiveRunnerHandle, ReconnectPolicy, RunnerState};
pub use view::ProviderView;
