use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub networks: HashMap<String, NetworkConfig>,
    pub default_network: String,
    pub backend: BackendConfig,
    pub pagination: PaginationConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChainType {
    Mainnet,
    Testnet,
}

impl ChainType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Mainnet => "mainnet",
            Self::Testnet => "testnet",
        }
    }
}

impl FromStr for ChainType {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" => Ok(Self::Mainnet),
            "testnet" => Ok(Self::Testnet),
            other => Err(anyhow!(
                "Unknown chain type '{}', expected mainnet or testnet",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub graphql_url: String,
    pub rest_url: String,
    /// Web3 JSON-RPC endpoint used for balance lookups
    pub node_url: Option<String>,
    pub chain_type: ChainType,
    pub layer1_explorer_url: Option<String>,
    pub explorer_title: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    pub request_timeout_secs: u64,
    pub user_agent: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaginationConfig {
    pub default_page_size: u32,
    pub allowed_page_sizes: Vec<u32>,
}

impl Default for Config {
    fn default() -> Self {
        let mut networks = HashMap::new();

        networks.insert(
            "mainnet".to_string(),
            NetworkConfig {
                graphql_url: "https://api.gwscan.com/graphql".to_string(),
                rest_url: "https://api.gwscan.com/api".to_string(),
                node_url: Some("https://v1.mainnet.godwoken.io/rpc".to_string()),
                chain_type: ChainType::Mainnet,
                layer1_explorer_url: Some("https://explorer.nervos.org".to_string()),
                explorer_title: Some("GwScan".to_string()),
            },
        );

        networks.insert(
            "testnet".to_string(),
            NetworkConfig {
                graphql_url: "https://api.testnet.gwscan.com/graphql".to_string(),
                rest_url: "https://api.testnet.gwscan.com/api".to_string(),
                node_url: Some("https://godwoken-testnet-v1.ckbapp.dev".to_string()),
                chain_type: ChainType::Testnet,
                layer1_explorer_url: Some("https://pudge.explorer.nervos.org".to_string()),
                explorer_title: Some("GwScan Testnet".to_string()),
            },
        );

        Self {
            networks,
            default_network: "mainnet".to_string(),
            backend: BackendConfig {
                request_timeout_secs: 30,
                user_agent: None,
            },
            pagination: PaginationConfig {
                default_page_size: 20,
                allowed_page_sizes: vec![10, 20, 50, 100],
            },
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub async fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {:?}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {:?}: {}", path, e))?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub async fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)
            .map_err(|e| anyhow!("Failed to serialize config: {}", e))?;

        if let Some(parent) = path.parent() {
            if !parent.exists() {
                fs::create_dir_all(parent).await.map_err(|e| {
                    anyhow!("Failed to create config directory {:?}: {}", parent, e)
                })?;
            }
        }

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {:?}: {}", path, e))?;

        Ok(())
    }

    /// Load configuration with fallback to default
    pub async fn load_or_default<P: AsRef<Path>>(path: Option<P>) -> Self {
        let mut config = match path {
            Some(path) => match Self::load_from_file(path).await {
                Ok(config) => {
                    tracing::info!("Loaded configuration from file");
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to load config file, using defaults: {}", e);
                    Self::default()
                }
            },
            None => Self::default(),
        };

        config.apply_env_vars();
        config
    }

    /// Checks the invariants the fetch layer relies on
    pub fn validate(&self) -> Result<()> {
        if !self.networks.contains_key(&self.default_network) {
            return Err(anyhow!(
                "Default network '{}' is not configured",
                self.default_network
            ));
        }
        if self.pagination.allowed_page_sizes.is_empty() {
            return Err(anyhow!("allowed_page_sizes cannot be empty"));
        }
        if !self
            .pagination
            .allowed_page_sizes
            .contains(&self.pagination.default_page_size)
        {
            return Err(anyhow!(
                "default_page_size {} is not one of allowed_page_sizes",
                self.pagination.default_page_size
            ));
        }
        Ok(())
    }

    /// Look up a network, falling back to the default one
    pub fn network(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        let network_name = network.unwrap_or(&self.default_network);
        self.networks.get(network_name).ok_or_else(|| {
            let mut available: Vec<&String> = self.networks.keys().collect();
            available.sort();
            anyhow!(
                "Network '{}' not configured. Available networks: {}",
                network_name,
                available
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
        })
    }

    /// Apply environment variable overrides to configuration
    fn apply_env_vars(&mut self) {
        if let Ok(chain_type) = std::env::var("EXPLORER_CHAIN_TYPE") {
            match chain_type.parse() {
                Ok(chain_type) => self.select_chain_type(chain_type),
                Err(e) => tracing::warn!("Ignoring EXPLORER_CHAIN_TYPE: {}", e),
            }
        }

        if let Ok(network) = std::env::var("EXPLORER_NETWORK") {
            if self.networks.contains_key(&network) {
                tracing::info!("Using EXPLORER_NETWORK={} as default network", network);
                self.default_network = network;
            } else {
                tracing::warn!("Ignoring EXPLORER_NETWORK={}, network is not configured", network);
            }
        }

        let default_network = self.default_network.clone();
        if let Some(network_config) = self.networks.get_mut(&default_network) {
            if let Ok(url) = std::env::var("EXPLORER_GRAPHQL_URL") {
                tracing::debug!("Overriding {} GraphQL URL from environment", default_network);
                network_config.graphql_url = url;
            }
            if let Ok(url) = std::env::var("EXPLORER_REST_URL") {
                tracing::debug!("Overriding {} REST URL from environment", default_network);
                network_config.rest_url = url;
            }
            if let Ok(url) = std::env::var("EXPLORER_NODE_URL") {
                tracing::debug!("Overriding {} node URL from environment", default_network);
                network_config.node_url = Some(url);
            }
        }
    }

    /// Makes the first network (by name) of the given chain type the default,
    /// unless the current default already is one.
    pub fn select_chain_type(&mut self, chain_type: ChainType) {
        if self
            .networks
            .get(&self.default_network)
            .is_some_and(|network| network.chain_type == chain_type)
        {
            return;
        }

        let mut candidates: Vec<&String> = self
            .networks
            .iter()
            .filter(|(_, network)| network.chain_type == chain_type)
            .map(|(name, _)| name)
            .collect();
        candidates.sort();

        match candidates.first() {
            Some(name) => {
                tracing::info!(
                    "Using {} as default network for chain type {}",
                    name,
                    chain_type.as_str()
                );
                self.default_network = (*name).clone();
            }
            None => tracing::warn!(
                "No configured network has chain type {}, keeping {}",
                chain_type.as_str(),
                self.default_network
            ),
        }
    }

    /// Get default config file path
    pub fn default_config_path() -> Result<std::path::PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| anyhow!("Could not determine config directory"))?;
        Ok(config_dir.join("explorer-mcp").join("config.toml"))
    }

    /// Generate a sample configuration file
    pub fn generate_sample() -> String {
        let sample_config = r#"# Explorer MCP Server Configuration File
# This file configures backend endpoints, pagination and server behavior

# Default network to use when none is specified
default_network = "mainnet"

# Network configurations
[networks.mainnet]
graphql_url = "https://api.gwscan.com/graphql"
rest_url = "https://api.gwscan.com/api"
node_url = "https://v1.mainnet.godwoken.io/rpc"
chain_type = "mainnet"
layer1_explorer_url = "https://explorer.nervos.org"
explorer_title = "GwScan"

[networks.testnet]
graphql_url = "https://api.testnet.gwscan.com/graphql"
rest_url = "https://api.testnet.gwscan.com/api"
node_url = "https://godwoken-testnet-v1.ckbapp.dev"
chain_type = "testnet"
layer1_explorer_url = "https://pudge.explorer.nervos.org"
explorer_title = "GwScan Testnet"

# HTTP client settings
[backend]
request_timeout_secs = 30
# user_agent = "explorer-mcp/0.1.0"

# Page sizes accepted by list tools; others fall back to the default
[pagination]
default_page_size = 20
allowed_page_sizes = [10, 20, 50, 100]

# Environment variables that can be used:
# EXPLORER_CHAIN_TYPE - mainnet or testnet, picks the default network by chain type
# EXPLORER_NETWORK - Overrides default_network (takes precedence over EXPLORER_CHAIN_TYPE)
# EXPLORER_GRAPHQL_URL - Overrides the GraphQL endpoint of the default network
# EXPLORER_REST_URL - Overrides the REST endpoint of the default network
# EXPLORER_NODE_URL - Overrides the web3 RPC endpoint of the default network
"#;
        sample_config.to_string()
    }
}
