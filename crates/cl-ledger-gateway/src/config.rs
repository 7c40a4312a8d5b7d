//! Gateway configuration.
//!
//! Defaults reproduce the portal's behaviour: two connection trials of 3 s
//! each, 1 s progressive back-off, confirmations 500-1500 ms after an
//! emulated operation, 20 gwei mock gas price.

use shared_types::{Address, RegistryKind};
use std::collections::BTreeMap;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::warn;

/// A named ledger network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    /// Profile name used to select it.
    pub name: String,
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Chain id the endpoint must report.
    pub chain_id: u64,
}

impl NetworkProfile {
    pub fn new(name: impl Into<String>, rpc_url: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            rpc_url: rpc_url.into(),
            chain_id,
        }
    }
}

/// Registry of network profiles, selected by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkProfiles {
    profiles: BTreeMap<String, NetworkProfile>,
}

impl Default for NetworkProfiles {
    fn default() -> Self {
        let mut profiles = Self {
            profiles: BTreeMap::new(),
        };
        profiles.insert(NetworkProfile::new("localhost", "http://127.0.0.1:8545", 1337));
        profiles.insert(NetworkProfile::new("hardhat", "http://127.0.0.1:8545", 31337));
        profiles.insert(NetworkProfile::new(
            "mumbai",
            "https://rpc-mumbai.maticvigil.com",
            80001,
        ));
        profiles.insert(NetworkProfile::new("polygon", "https://polygon-rpc.com", 137));
        profiles
    }
}

impl NetworkProfiles {
    /// Built-in profiles with endpoint overrides from the environment.
    ///
    /// - `MUMBAI_RPC_URL`: Mumbai endpoint
    /// - `POLYGON_RPC_URL`: Polygon endpoint
    pub fn from_env() -> Self {
        let mut profiles = Self::default();
        for (name, var) in [("mumbai", "MUMBAI_RPC_URL"), ("polygon", "POLYGON_RPC_URL")] {
            if let (Ok(url), Some(profile)) = (env::var(var), profiles.profiles.get_mut(name)) {
                profile.rpc_url = url;
            }
        }
        profiles
    }

    /// Add or replace a profile.
    pub fn insert(&mut self, profile: NetworkProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    /// Look up a profile by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&NetworkProfile> {
        self.profiles.get(name)
    }

    /// Known profile names.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }
}

/// Connection trial and receipt polling parameters.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// Connection trials before falling back to emulation.
    pub max_attempts: u32,
    /// Deadline for each trial's network queries.
    pub attempt_timeout: Duration,
    /// Back-off unit; trial `n` waits `retry_delay * n` after failing.
    pub retry_delay: Duration,
    /// Interval between `eth_getTransactionReceipt` polls.
    pub receipt_poll_interval: Duration,
    /// Give up waiting for a receipt after this long.
    pub receipt_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            attempt_timeout: Duration::from_secs(3),
            retry_delay: Duration::from_secs(1),
            receipt_poll_interval: Duration::from_millis(500),
            receipt_timeout: Duration::from_secs(120),
        }
    }
}

/// Emulation parameters.
#[derive(Debug, Clone)]
pub struct EmulationConfig {
    /// Lower bound of the `transaction` confirmation delay.
    pub confirmation_min: Duration,
    /// Upper bound of the `transaction` confirmation delay.
    pub confirmation_max: Duration,
    /// Seed the store with the sample citizens, documents and grievances.
    pub seed_fixtures: bool,
    /// Gas price stamped on synthetic receipts.
    pub gas_price_wei: u128,
    /// Block counter value before the first synthetic transaction.
    pub initial_block: u64,
}

impl Default for EmulationConfig {
    fn default() -> Self {
        Self {
            confirmation_min: Duration::from_millis(500),
            confirmation_max: Duration::from_millis(1500),
            seed_fixtures: true,
            gas_price_wei: 20_000_000_000,
            initial_block: 1_000_000,
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub connection: ConnectionConfig,
    pub emulation: EmulationConfig,
    /// Root of the Hardhat artifact tree (`<Name>.sol/<Name>.json`).
    pub artifacts_dir: PathBuf,
    /// Pre-deployed registry addresses.
    pub contract_addresses: BTreeMap<RegistryKind, Address>,
    pub networks: NetworkProfiles,
    /// Event bus capacity.
    pub event_capacity: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            connection: ConnectionConfig::default(),
            emulation: EmulationConfig::default(),
            artifacts_dir: PathBuf::from("artifacts/contracts"),
            contract_addresses: BTreeMap::new(),
            networks: NetworkProfiles::default(),
            event_capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

impl GatewayConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CL_ARTIFACTS_DIR`: artifact root (default: artifacts/contracts)
    /// - `CITIZEN_REGISTRY_ADDRESS`, `DOCUMENT_REGISTRY_ADDRESS`,
    ///   `GRIEVANCE_SYSTEM_ADDRESS`: pre-deployed contracts
    /// - `CL_MAX_ATTEMPTS`: connection trials (default: 2)
    /// - `CL_ATTEMPT_TIMEOUT_MS`: per-trial deadline (default: 3000)
    /// - `CL_SEED_FIXTURES`: seed sample records offline (default: true)
    /// - `MUMBAI_RPC_URL`, `POLYGON_RPC_URL`: endpoint overrides
    pub fn from_env() -> Self {
        let mut config = Self {
            networks: NetworkProfiles::from_env(),
            ..Self::default()
        };

        if let Ok(dir) = env::var("CL_ARTIFACTS_DIR") {
            config.artifacts_dir = PathBuf::from(dir);
        }

        for kind in RegistryKind::ALL {
            let Ok(text) = env::var(kind.address_env_var()) else {
                continue;
            };
            match Address::parse(&text) {
                Ok(address) => {
                    config.contract_addresses.insert(kind, address);
                }
                Err(e) => warn!(
                    "[cl-gateway] Ignoring {}: {}",
                    kind.address_env_var(),
                    e
                ),
            }
        }

        if let Some(attempts) = env::var("CL_MAX_ATTEMPTS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.connection.max_attempts = attempts;
        }
        if let Some(ms) = env::var("CL_ATTEMPT_TIMEOUT_MS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            config.connection.attempt_timeout = Duration::from_millis(ms);
        }
        if let Ok(v) = env::var("CL_SEED_FIXTURES") {
            config.emulation.seed_fixtures = v.to_lowercase() != "false" && v != "0";
        }

        config
    }

    /// Fast timings and an empty store.
    pub fn for_testing() -> Self {
        Self {
            connection: ConnectionConfig {
                max_attempts: 2,
                attempt_timeout: Duration::from_millis(200),
                retry_delay: Duration::from_millis(10),
                receipt_poll_interval: Duration::from_millis(5),
                receipt_timeout: Duration::from_secs(1),
            },
            emulation: EmulationConfig {
                seed_fixtures: false,
                ..EmulationConfig::default()
            },
            ..Self::default()
        }
    }

    /// Path of a registry's artifact file.
    #[must_use]
    pub fn artifact_path(&self, kind: RegistryKind) -> PathBuf {
        let name = kind.contract_name();
        self.artifacts_dir
            .join(format!("{name}.sol"))
            .join(format!("{name}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_profiles() {
        let profiles = NetworkProfiles::default();
        assert_eq!(profiles.get("localhost").unwrap().chain_id, 1337);
        assert_eq!(profiles.get("hardhat").unwrap().chain_id, 31337);
        assert_eq!(profiles.get("mumbai").unwrap().chain_id, 80001);
        assert_eq!(profiles.get("polygon").unwrap().chain_id, 137);
        assert!(profiles.get("ropsten").is_none());
    }

    #[test]
    fn test_default_config() {
        let config = GatewayConfig::default();
        assert_eq!(config.connection.max_attempts, 2);
        assert_eq!(config.connection.attempt_timeout, Duration::from_secs(3));
        assert_eq!(config.emulation.initial_block, 1_000_000);
        assert!(config.emulation.seed_fixtures);
    }

    #[test]
    fn test_artifact_path() {
        let config = GatewayConfig::default();
        assert_eq!(
            config.artifact_path(RegistryKind::Grievance),
            PathBuf::from("artifacts/contracts/GrievanceSystem.sol/GrievanceSystem.json")
        );
    }
}
