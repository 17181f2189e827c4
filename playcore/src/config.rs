//! Configuration surface (§6): every recognized env var, read once at startup and validated
//! fail-fast against the §6 hard caps before the process is allowed to enter a running state
//! (§7 Configuration error policy: "fail fast at startup, never enter running state").

use crate::error::ConfigError;
use playcore_risk::{hard_max_leverage, hard_max_position_usdt, hard_min_balance_usdt};
use rust_decimal::Decimal;
use std::str::FromStr;

/// `TRADING_MODE` (§6) — the PlayEngine's money-at-risk dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradingModeConfig {
    Paper,
    Real,
}

impl FromStr for TradingModeConfig {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw {
            "paper" => Ok(TradingModeConfig::Paper),
            "real" => Ok(TradingModeConfig::Real),
            other => Err(ConfigError::InvalidValue {
                key: "TRADING_MODE",
                value: other.to_string(),
            }),
        }
    }
}

/// A `{key, secret}` credential pair, required for exactly one of `(demo, live)` depending on
/// `BYBIT_USE_DEMO` — §6 "no fallback to generic keys".
#[derive(Clone)]
pub struct ApiCredentials {
    pub key: String,
    pub secret: String,
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials").field("key", &self.key).field("secret", &"<redacted>").finish()
    }
}

/// `AppConfig` (§6 Configuration surface): the process-wide handle read once from the
/// environment at `main` and passed down explicitly, per §9's "reformulate singletons as
/// explicit process-wide handles" design note — there is no ambient global config lookup
/// anywhere below this type.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub trading_mode: TradingModeConfig,
    pub use_demo: bool,
    pub credentials: ApiCredentials,
    pub live_data_credentials: ApiCredentials,
    pub max_leverage: Decimal,
    pub max_position_size_usd: Decimal,
    pub max_daily_loss_usd: Decimal,
    pub min_balance_usd: Decimal,
}

impl AppConfig {
    /// Reads and validates every §6 env var. Fails closed on a missing/invalid key or a limit
    /// that exceeds a platform hard cap — the caller must treat any `Err` as "do not start".
    pub fn from_env() -> Result<Self, ConfigError> {
        let trading_mode = required_env("TRADING_MODE")?.parse::<TradingModeConfig>()?;
        let use_demo = parse_bool(&required_env("BYBIT_USE_DEMO")?, "BYBIT_USE_DEMO")?;

        if !matches!(
            (trading_mode, use_demo),
            (TradingModeConfig::Paper, true) | (TradingModeConfig::Real, false)
        ) {
            return Err(ConfigError::ModeApiMismatch { trading_mode: format!("{trading_mode:?}"), use_demo });
        }

        let credentials = if use_demo {
            ApiCredentials {
                key: required_env("BYBIT_DEMO_API_KEY")?,
                secret: required_env("BYBIT_DEMO_API_SECRET")?,
            }
        } else {
            ApiCredentials {
                key: required_env("BYBIT_LIVE_API_KEY")?,
                secret: required_env("BYBIT_LIVE_API_SECRET")?,
            }
        };

        let live_data_credentials = ApiCredentials {
            key: required_env("BYBIT_LIVE_DATA_API_KEY")?,
            secret: required_env("BYBIT_LIVE_DATA_API_SECRET")?,
        };

        let max_leverage = parse_decimal_env("MAX_LEVERAGE", hard_max_leverage())?;
        let max_position_size_usd = parse_decimal_env("MAX_POSITION_SIZE_USD", hard_max_position_usdt())?;
        let max_daily_loss_usd = parse_decimal_env("MAX_DAILY_LOSS_USD", Decimal::from(100))?;
        let min_balance_usd = parse_decimal_env("MIN_BALANCE_USD", hard_min_balance_usdt())?;

        if max_leverage > hard_max_leverage() {
            return Err(ConfigError::HardCapExceeded {
                key: "MAX_LEVERAGE",
                value: max_leverage.to_string(),
                cap: hard_max_leverage().to_string(),
            });
        }
        if max_position_size_usd > hard_max_position_usdt() {
            return Err(ConfigError::HardCapExceeded {
                key: "MAX_POSITION_SIZE_USD",
                value: max_position_size_usd.to_string(),
                cap: hard_max_position_usdt().to_string(),
            });
        }
        if min_balance_usd < hard_min_balance_usdt() {
            return Err(ConfigError::HardCapExceeded {
                key: "MIN_BALANCE_USD",
                value: min_balance_usd.to_string(),
                cap: hard_min_balance_usdt().to_string(),
            });
        }

        Ok(Self {
            trading_mode,
            use_demo,
            credentials,
            live_data_credentials,
            max_leverage,
            max_position_size_usd,
            max_daily_loss_usd,
            min_balance_usd,
        })
    }
}

fn required_env(key: &'static str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingKey(key))
}

fn parse_bool(raw: &str, key: &'static str) -> Result<bool, ConfigError> {
    match raw {
        "true" => Ok(true),
        "false" => Ok(false),
        other => Err(ConfigError::InvalidValue { key, value: other.to_string() }),
    }
}

fn parse_decimal_env(key: &'static str, default: Decimal) -> Result<Decimal, ConfigError> {
    match std::env::var(key) {
        Ok(raw) => raw.parse::<Decimal>().map_err(|_| ConfigError::InvalidValue { key, value: raw }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// `std::env` is process-global; serialize these tests so they don't clobber each other's
    /// vars when `cargo test` runs them concurrently.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set(key: &str, value: &str) {
        unsafe { std::env::set_var(key, value) };
    }

    fn clear(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn with_valid_paper_env<F: FnOnce()>(f: F) {
        let _guard = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        set("TRADING_MODE", "paper");
        set("BYBIT_USE_DEMO", "true");
        set("BYBIT_DEMO_API_KEY", "k");
        set("BYBIT_DEMO_API_SECRET", "s");
        set("BYBIT_LIVE_DATA_API_KEY", "k2");
        set("BYBIT_LIVE_DATA_API_SECRET", "s2");
        clear("MAX_LEVERAGE");
        clear("MAX_POSITION_SIZE_USD");
        clear("MAX_DAILY_LOSS_USD");
        clear("MIN_BALANCE_USD");
        f();
    }

    #[test]
    fn test_valid_paper_demo_config_loads() {
        with_valid_paper_env(|| {
            let config = AppConfig::from_env().unwrap();
            assert_eq!(config.trading_mode, TradingModeConfig::Paper);
            assert!(config.use_demo);
        });
    }

    #[test]
    fn test_mode_api_mismatch_fails_closed() {
        with_valid_paper_env(|| {
            set("TRADING_MODE", "real");
            let err = AppConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::ModeApiMismatch { .. }));
        });
    }

    #[test]
    fn test_missing_credential_fails() {
        with_valid_paper_env(|| {
            clear("BYBIT_DEMO_API_KEY");
            let err = AppConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::MissingKey("BYBIT_DEMO_API_KEY")));
        });
    }

    #[test]
    fn test_leverage_above_hard_cap_rejected() {
        with_valid_paper_env(|| {
            set("MAX_LEVERAGE", "50");
            let err = AppConfig::from_env().unwrap_err();
            assert!(matches!(err, ConfigError::HardCapExceeded { key: "MAX_LEVERAGE", .. }));
        });
    }
}

impl std::fmt::Display for TradingModeConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradingModeConfig::Paper => write!(f, "paper"),
            TradingModeConfig::Real => write!(f, "real"),
        }
    }
}
