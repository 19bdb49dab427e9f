//! Engine configuration.
//!
//! [`EngineConfig`] carries the deployment parameters: month clock, principal
//! token, owner, fee receivers, penalty and the initial boost table. Loaded
//! with [`EngineConfig::load`] from defaults, then an optional TOML file, then
//! `TIDELOCK__*` environment variables (`TIDELOCK__PENALTY_BPS=500`,
//! `TIDELOCK__BOOST_FACTORS=10000,20000,...`).

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tidelock_core::boost::BoostTable;
use tidelock_core::clock::MonthClock;
use tidelock_core::constants::{
    BPS_PRECISION, DEFAULT_BOOST_FACTORS, DEFAULT_FEE_SPLIT_BPS, DEFAULT_PENALTY_BPS, MONTH_SECONDS,
};
use tidelock_core::error::BoostError;
use tidelock_core::types::Address;

/// Errors while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config build error: {0}")]
    Build(#[from] config::ConfigError),
    #[error("month_seconds must be positive")]
    ZeroMonthLength,
    #[error("{field} is {value} basis points, maximum is 10000")]
    BpsOutOfRange { field: &'static str, value: u64 },
    #[error("invalid boost_factors: {0}")]
    Boost(#[from] BoostError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Unix timestamp of month 0.
    pub epoch: u64,
    pub month_seconds: u64,
    /// Token that is locked.
    pub principal_token: Address,
    /// Account allowed to update boosts, add rewards and recover.
    pub owner: Address,
    /// Receivers of the early-withdrawal penalty, first and second share.
    pub fee_receivers: [Address; 2],
    /// Early-withdrawal penalty on unmatured principal.
    pub penalty_bps: u64,
    /// Share of the penalty paid to the first receiver.
    pub fee_split_bps: u64,
    pub boost_factors: Vec<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            epoch: 0,
            month_seconds: MONTH_SECONDS,
            principal_token: Address::from_label("tidelock/principal"),
            owner: Address::from_label("tidelock/owner"),
            fee_receivers: [Address::from_label("tidelock/fee-0"), Address::from_label("tidelock/fee-1")],
            penalty_bps: DEFAULT_PENALTY_BPS,
            fee_split_bps: DEFAULT_FEE_SPLIT_BPS,
            boost_factors: DEFAULT_BOOST_FACTORS.to_vec(),
        }
    }
}

impl EngineConfig {
    /// Load defaults, then `file` (if given), then `TIDELOCK__*` environment
    /// variables, and validate the result.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Build`] for unreadable or malformed sources, or any
    /// [`EngineConfig::validate`] error.
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path));
        }
        builder = builder.add_source(
            config::Environment::with_prefix("TIDELOCK")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("boost_factors")
                .with_list_parse_key("fee_receivers")
                .try_parsing(true),
        );
        let cfg: Self = builder.build()?.try_deserialize()?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// # Errors
    ///
    /// - [`ConfigError::ZeroMonthLength`]
    /// - [`ConfigError::BpsOutOfRange`] for `penalty_bps` or `fee_split_bps` above 10000
    /// - [`ConfigError::Boost`] for an invalid boost table
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.month_seconds == 0 {
            return Err(ConfigError::ZeroMonthLength);
        }
        if self.penalty_bps > BPS_PRECISION {
            return Err(ConfigError::BpsOutOfRange { field: "penalty_bps", value: self.penalty_bps });
        }
        if self.fee_split_bps > BPS_PRECISION {
            return Err(ConfigError::BpsOutOfRange { field: "fee_split_bps", value: self.fee_split_bps });
        }
        self.boost_table()?;
        Ok(())
    }

    pub fn clock(&self) -> MonthClock {
        MonthClock { epoch: self.epoch, month_seconds: self.month_seconds }
    }

    /// # Errors
    ///
    /// [`BoostError`] if `boost_factors` is not a valid table.
    pub fn boost_table(&self) -> Result<BoostTable, BoostError> {
        BoostTable::new(&self.boost_factors)
    }

    /// Default snapshot location: `<data dir>/tidelock/state.bin`.
    pub fn default_state_path() -> PathBuf {
        dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("tidelock").join("state.bin")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.month_seconds, 30 * 86_400);
        assert_eq!(cfg.penalty_bps, 1_000);
        assert_eq!(cfg.fee_split_bps, 5_000);
        assert_eq!(cfg.boost_table().unwrap(), BoostTable::default());
    }

    #[test]
    fn zero_month_rejected() {
        let cfg = EngineConfig { month_seconds: 0, ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::ZeroMonthLength)));
    }

    #[test]
    fn bps_above_one_rejected() {
        let cfg = EngineConfig { penalty_bps: 10_001, ..EngineConfig::default() };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::BpsOutOfRange { field: "penalty_bps", value: 10_001 })
        ));
        let cfg = EngineConfig { fee_split_bps: 20_000, ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::BpsOutOfRange { field: "fee_split_bps", .. })));
    }

    #[test]
    fn bad_boost_table_rejected() {
        let cfg = EngineConfig { boost_factors: vec![10_000; 23], ..EngineConfig::default() };
        assert!(matches!(cfg.validate(), Err(ConfigError::Boost(BoostError::InvalidLength { .. }))));
    }

    #[test]
    fn clock_uses_epoch_and_month_length() {
        let cfg = EngineConfig { epoch: 1_000, month_seconds: 10, ..EngineConfig::default() };
        let clock = cfg.clock();
        assert_eq!(clock.month_at(1_000), 0);
        assert_eq!(clock.month_at(1_025), 2);
    }

    #[test]
    fn load_from_toml_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidelock.toml");
        let owner = Address::from_label("someone");
        std::fs::write(&path, format!("epoch = 1700000000\npenalty_bps = 2500\nowner = \"{owner}\"\n")).unwrap();

        let cfg = EngineConfig::load(Some(&path)).unwrap();
        assert_eq!(cfg.epoch, 1_700_000_000);
        assert_eq!(cfg.penalty_bps, 2_500);
        assert_eq!(cfg.owner, owner);
        // Unset keys keep their defaults.
        assert_eq!(cfg.fee_split_bps, DEFAULT_FEE_SPLIT_BPS);
        assert_eq!(cfg.boost_factors, DEFAULT_BOOST_FACTORS.to_vec());
    }

    #[test]
    fn load_rejects_invalid_file_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tidelock.toml");
        std::fs::write(&path, "month_seconds = 0\n").unwrap();
        assert!(matches!(EngineConfig::load(Some(&path)), Err(ConfigError::ZeroMonthLength)));
    }

    #[test]
    fn missing_file_is_build_error() {
        let path = Path::new("/tmp/tidelock-no-such-config.toml");
        assert!(matches!(EngineConfig::load(Some(path)), Err(ConfigError::Build(_))));
    }

    #[test]
    fn default_state_path_ends_with_tidelock() {
        let path = EngineConfig::default_state_path();
        assert!(path.ends_with("tidelock/state.bin"), "unexpected path: {path:?}");
    }
}
