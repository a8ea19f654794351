use clap::Parser;
use ethers::types::{Address, U256};
use serde::Deserialize;
use std::ffi::OsString;

use crate::selector::{Selector, EXEC_TRANSACTION};
use crate::tank::{GasTank, TankConfig, WithdrawPolicy, DEFAULT_BASE_GAS, DEFAULT_FEE_PER_CALL};

pub const DEFAULT_NETWORK: &str = "hardhat";

const RINKEBY_TOKEN: &str = "0xc778417E063141139Fce010982780140Aa0cD5Ab";
const RINKEBY_FEE: u64 = 1_000_000_000; // 1 gwei

#[derive(Parser, Debug)]
#[command(name = "gt_config", about = "Configuration for the gas tank")]
struct GTEnvCLIConfig {
    /// Path to the gas tank config file
    #[arg(long, env)]
    pub gt_config: Option<String>,
    /// Network whose presets should be used
    #[arg(long, env)]
    pub gt_network: Option<String>,
    /// Fee (wei) charged on top of the gas of every relayed call
    #[arg(long, env)]
    pub gt_fee: Option<String>,
    /// Method id that may be relayed to the target contracts
    #[arg(long, env)]
    pub gt_method: Option<Selector>,
    /// Owner that can collect the gathered fees
    #[arg(long, env)]
    pub gt_owner: Option<Address>,
    /// Token used by the tank
    #[arg(long, env)]
    pub gt_token: Option<Address>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct GTFileConfig {
    pub network: Option<String>,
    pub fee: Option<String>,
    pub method: Option<Selector>,
    pub owner: Option<Address>,
    pub token: Option<Address>,
    pub withdraw_policy: Option<WithdrawPolicy>,
    pub base_gas: Option<u64>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid arguments: {0}")]
    Arguments(clap::Error),

    #[error("could not read config file: {0}")]
    ReadFile(std::io::Error),

    #[error("could not parse config file: {0}")]
    ParseFile(serde_json::Error),

    #[error("invalid fee `{0}`")]
    Fee(String),
}

/// Deployment values a network starts from.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NetworkPreset {
    pub fee: U256,
    pub method: Selector,
    pub owner: Option<Address>,
    pub token: Option<Address>,
}

impl NetworkPreset {
    pub fn for_network(network: &str) -> NetworkPreset {
        let default = NetworkPreset {
            fee: DEFAULT_FEE_PER_CALL.into(),
            method: EXEC_TRANSACTION,
            owner: None,
            token: None,
        };

        match network {
            "rinkeby" => NetworkPreset {
                fee: RINKEBY_FEE.into(),
                token: RINKEBY_TOKEN.parse().ok(),
                ..default
            },
            _ => default,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GTConfig {
    pub network: String,
    pub fee: U256,
    pub method: Selector,
    pub owner: Option<Address>,
    pub token: Option<Address>,
    pub withdraw_policy: WithdrawPolicy,
    pub base_gas: U256,
}

impl GTConfig {
    /// Command line and environment first, then the config file, then the
    /// network presets.
    pub fn initialize() -> Result<GTConfig, ConfigError> {
        GTConfig::initialize_from(std::env::args_os())
    }

    pub fn initialize_from<I, T>(args: I) -> Result<GTConfig, ConfigError>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let env_cli_config =
            GTEnvCLIConfig::try_parse_from(args).map_err(ConfigError::Arguments)?;

        let file_config = match &env_cli_config.gt_config {
            Some(path) => load_config_file(path)?,
            None => GTFileConfig::default(),
        };

        let network = env_cli_config
            .gt_network
            .or(file_config.network)
            .unwrap_or_else(|| DEFAULT_NETWORK.to_string());
        let preset = NetworkPreset::for_network(&network);

        let fee = match env_cli_config.gt_fee.or(file_config.fee) {
            Some(fee) => U256::from_dec_str(&fee).map_err(|_| ConfigError::Fee(fee))?,
            None => preset.fee,
        };

        Ok(GTConfig {
            network,
            fee,
            method: env_cli_config
                .gt_method
                .or(file_config.method)
                .unwrap_or(preset.method),
            owner: env_cli_config
                .gt_owner
                .or(file_config.owner)
                .or(preset.owner),
            token: env_cli_config
                .gt_token
                .or(file_config.token)
                .or(preset.token),
            withdraw_policy: file_config.withdraw_policy.unwrap_or_default(),
            base_gas: file_config.base_gas.unwrap_or(DEFAULT_BASE_GAS).into(),
        })
    }

    /// Tank configuration for a deployment made by `deployer`, who owns the
    /// tank unless an owner was configured.
    pub fn tank_config(&self, deployer: Address) -> TankConfig {
        TankConfig::new(self.owner.unwrap_or(deployer))
            .set_fee_per_call(self.fee)
            .set_allowed_method(self.method)
            .set_withdraw_policy(self.withdraw_policy)
            .set_base_gas(self.base_gas)
            .set_token(self.token)
    }

    /// Deployment is skipped on networks without a token.
    pub fn deploy(&self, deployer: Address) -> Option<GasTank> {
        self.token?;
        Some(GasTank::new(self.tank_config(deployer)))
    }
}

fn load_config_file(path: &str) -> Result<GTFileConfig, ConfigError> {
    let s = std::fs::read_to_string(path).map_err(ConfigError::ReadFile)?;
    serde_json::from_str(&s).map_err(ConfigError::ParseFile)
}
