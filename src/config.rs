//! Runtime configuration from the environment (and `.env`)

use crate::contract::ledger_contract::{DEFAULT_CONTRACT_ADDRESS, DEFAULT_OPERATOR_WALLET};
use crate::contract::seller_id::is_valid_wallet;
use crate::contract::ContractOptions;
use crate::error::ConfigError;
use crate::ledger::chain::DEFAULT_NODE_URL;
use crate::ledger::pow::DEFAULT_PREFIX;
use crate::ledger::ProofOfWork;
use std::path::PathBuf;
use std::str::FromStr;

const MAX_POW_PREFIX_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Compact,
    Detailed,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" => Ok(LogFormat::Compact),
            "detailed" => Ok(LogFormat::Detailed),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub port: u16,
    /// SQLite file; `None` keeps everything in memory.
    pub db_path: Option<PathBuf>,
    pub operator_wallet: String,
    pub contract_address: String,
    pub pow_prefix: String,
    pub node_url: String,
    pub log_format: LogFormat,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind_addr: "127.0.0.1".to_string(),
            port: 3001,
            db_path: None,
            operator_wallet: DEFAULT_OPERATOR_WALLET.to_string(),
            contract_address: DEFAULT_CONTRACT_ADDRESS.to_string(),
            pow_prefix: DEFAULT_PREFIX.to_string(),
            node_url: DEFAULT_NODE_URL.to_string(),
            log_format: LogFormat::Compact,
        }
    }
}

impl Config {
    /// Loads `.env` if present, then reads `COCOA_*` variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(addr) = get("COCOA_BIND_ADDR") {
            config.bind_addr = addr;
        }
        if let Some(port) = get("COCOA_PORT") {
            config.port = port.trim().parse().map_err(|_| invalid("COCOA_PORT", "not a port number"))?;
        }
        config.db_path = get("COCOA_DB_PATH").map(PathBuf::from);

        if let Some(wallet) = get("COCOA_OPERATOR_WALLET") {
            if !is_valid_wallet(&wallet) {
                return Err(invalid(
                    "COCOA_OPERATOR_WALLET",
                    "expected 0x followed by 40 hex digits",
                ));
            }
            config.operator_wallet = wallet;
        }
        if let Some(address) = get("COCOA_CONTRACT_ADDRESS") {
            config.contract_address = address;
        }
        if let Some(prefix) = get("COCOA_POW_PREFIX") {
            let prefix = prefix.to_ascii_lowercase();
            if prefix.len() > MAX_POW_PREFIX_LEN || !prefix.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(invalid(
                    "COCOA_POW_PREFIX",
                    &format!("expected at most {} hex digits", MAX_POW_PREFIX_LEN),
                ));
            }
            config.pow_prefix = prefix;
        }
        if let Some(url) = get("COCOA_NODE_URL") {
            config.node_url = url;
        }
        if let Some(format) = get("COCOA_LOG_FORMAT") {
            config.log_format = format
                .parse()
                .map_err(|e: String| invalid("COCOA_LOG_FORMAT", &e))?;
        }

        Ok(config)
    }

    pub fn contract_options(&self) -> ContractOptions {
        ContractOptions {
            address: self.contract_address.clone(),
            operator_wallet: self.operator_wallet.clone(),
            node_url: self.node_url.clone(),
            proof_of_work: ProofOfWork::with_prefix(self.pow_prefix.clone()),
        }
    }
}

fn invalid(key: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
