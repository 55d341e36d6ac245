use alloy::primitives::U256;
use anyhow::Result;
use rmcp::{
    model::{ServerCapabilities, ServerInfo},
    tool,
    transport::stdio,
    ServerHandler, ServiceExt,
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{
    config::Config,
    explorer::{
        account::{AccountQuery, AccountVariant},
        client::{ExplorerClient, NftCollectionFilter},
        list::SortDirection,
        numeric::{format_amount, TokenClass},
        records::BridgedRecord,
    },
};

#[derive(Debug, Clone)]
pub struct ExplorerMcpServer {
    client: Arc<ExplorerClient>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct AccountRequest {
    /// Eth address or script hash
    key: String,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct AccountTransactionsRequest {
    address: String,
    page: Option<u64>,
    page_size: Option<u32>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct BridgedRecordsRequest {
    address: Option<String>,
    page: Option<u64>,
    page_size: Option<u32>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct NftCollectionsRequest {
    name: Option<String>,
    before: Option<String>,
    after: Option<String>,
    limit: Option<u32>,
    holder_count_sort: Option<SortDirection>,
    name_sort: Option<SortDirection>,
    network: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, JsonSchema)]
struct FormatAmountRequest {
    /// Integer amount in base units
    amount: String,
    /// One of "native", "layer1_capacity" or "udt"
    token_class: Option<String>,
    /// Required when token_class is "udt"
    decimal: Option<u8>,
}

/// A bridged record with the fields a reader needs to follow it on layer 1.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BridgedRecordView {
    #[serde(flatten)]
    record: BridgedRecord,
    pending: bool,
    layer1_url: Option<String>,
}

impl BridgedRecordView {
    fn new(record: BridgedRecord, layer1_explorer_url: Option<&str>) -> Self {
        let layer1_url = layer1_explorer_url.and_then(|url| record.layer1_output_url(url));
        Self {
            pending: record.is_pending(),
            layer1_url,
            record,
        }
    }
}

fn account_summary(
    account: &AccountVariant,
    balance: Option<U256>,
    deployer: Option<String>,
) -> Value {
    let balance = balance.and_then(|b| format_amount(&b.to_string(), TokenClass::Native).ok());
    json!({
        "account": account,
        "activityCount": account.activity_count(),
        "isVerified": account.is_verified(),
        "balance": balance,
        "deployer": deployer,
    })
}

impl ExplorerMcpServer {
    pub fn new(config: Config) -> Result<Self> {
        let client = Arc::new(ExplorerClient::new(config)?);
        Ok(Self { client })
    }

    pub async fn run(&self) -> Result<()> {
        info!("Starting Explorer MCP Server");

        if !self.client.check_connection(None).await? {
            info!("Explorer backend is not reachable yet, list tools will return empty pages");
        }

        let service = self.clone().serve(stdio()).await?;

        info!("Explorer MCP Server started successfully");
        let _ = service.waiting().await;
        Ok(())
    }
}

fn token_class(name: Option<&str>, decimal: Option<u8>) -> Result<TokenClass, String> {
    match (name.unwrap_or("native"), decimal) {
        ("native", _) => Ok(TokenClass::Native),
        ("layer1_capacity", _) => Ok(TokenClass::Layer1Capacity),
        ("udt", Some(decimal)) => Ok(TokenClass::Udt(decimal)),
        ("udt", None) => Err("token_class 'udt' requires a decimal".to_string()),
        (other, _) => Err(format!("Unknown token_class '{}'", other)),
    }
}

#[tool(tool_box)]
impl ExplorerMcpServer {
    #[tool(description = "Look up an account by eth address or script hash")]
    async fn get_account(&self, #[tool(aggr)] request: AccountRequest) -> String {
        let query = match AccountQuery::parse(&request.key) {
            Ok(query) => query,
            Err(e) => return format!("Error: {}", e),
        };

        let network = request.network.as_deref();
        match self.client.fetch_account(&query, network).await {
            Ok(account) => {
                let balance = match account.base().eth_address.as_deref() {
                    Some(address) => match self.client.fetch_balance(address, network).await {
                        Ok(balance) => Some(balance),
                        Err(e) => {
                            warn!("Balance unavailable: {}", e);
                            None
                        }
                    },
                    None => None,
                };
                let deployer = match account.deployment_tx_hash() {
                    Some(hash) => self
                        .client
                        .fetch_deployer(hash, network)
                        .await
                        .unwrap_or_else(|e| {
                            warn!("Deployer unavailable: {}", e);
                            None
                        }),
                    None => None,
                };

                let summary = account_summary(&account, balance, deployer);
                serde_json::to_string_pretty(&summary)
                    .unwrap_or_else(|_| "Failed to serialize account".to_string())
            }
            Err(e) => {
                error!("Failed to get account: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "List transactions of an account, page by page")]
    async fn list_account_transactions(
        &self,
        #[tool(aggr)] request: AccountTransactionsRequest,
    ) -> String {
        let page = self.client.offset_request(request.page, request.page_size);

        match self
            .client
            .fetch_account_transactions(&request.address, &page, request.network.as_deref())
            .await
        {
            Ok(list) => serde_json::to_string_pretty(&list)
                .unwrap_or_else(|_| "Failed to serialize transactions".to_string()),
            Err(e) => {
                error!("Failed to list transactions: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "List deposits and withdrawals between layer 1 and layer 2")]
    async fn list_bridged_records(&self, #[tool(aggr)] request: BridgedRecordsRequest) -> String {
        let page = self.client.offset_request(request.page, request.page_size);
        let network = request.network.as_deref();
        let layer1_explorer_url = self
            .client
            .network_config(network)
            .ok()
            .and_then(|config| config.layer1_explorer_url.clone());

        match self
            .client
            .fetch_bridged_records(request.address.as_deref(), &page, network)
            .await
        {
            Ok(list) => serde_json::to_string_pretty(
                &list.map(|record| BridgedRecordView::new(record, layer1_explorer_url.as_deref())),
            )
                .unwrap_or_else(|_| "Failed to serialize bridged records".to_string()),
            Err(e) => {
                error!("Failed to list bridged records: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "List NFT collections with cursor pagination and server-side sorting")]
    async fn list_nft_collections(&self, #[tool(aggr)] request: NftCollectionsRequest) -> String {
        let page = self
            .client
            .cursor_request(request.before, request.after, request.limit);
        let filter = NftCollectionFilter {
            name: request.name,
            holder_count_sort: request.holder_count_sort.unwrap_or_default(),
            name_sort: request.name_sort.unwrap_or_default(),
        };

        match self
            .client
            .fetch_nft_collections(&filter, &page, request.network.as_deref())
            .await
        {
            Ok(list) => serde_json::to_string_pretty(&list)
                .unwrap_or_else(|_| "Failed to serialize NFT collections".to_string()),
            Err(e) => {
                error!("Failed to list NFT collections: {}", e);
                format!("Error: {}", e)
            }
        }
    }

    #[tool(description = "Format a base-unit amount using the decimals of its token class")]
    async fn format_amount(&self, #[tool(aggr)] request: FormatAmountRequest) -> String {
        let class = match token_class(request.token_class.as_deref(), request.decimal) {
            Ok(class) => class,
            Err(e) => return format!("Error: {}", e),
        };

        match format_amount(&request.amount, class) {
            Ok(formatted) => formatted,
            Err(e) => format!("Error: {}", e),
        }
    }
}

#[tool(tool_box)]
impl ServerHandler for ExplorerMcpServer {
    fn get_info(&self) -> ServerInfo {
        let network = self.client.network_config(None).ok();
        let title = network
            .and_then(|network| network.explorer_title.as_deref())
            .unwrap_or("layer-2 block explorer");
        let chain_type = network.map_or("unknown", |network| network.chain_type.as_str());

        ServerInfo {
            instructions: Some(format!("MCP server for the {} backend ({}). Resolves accounts into typed variants (eth user, Polyjuice contract/creator, UDT, meta-contract, unknown) with their pCKB balance and contract deployer, and returns paginated transaction, bridged-record and NFT collection lists in a normalized shape.", title, chain_type).into()),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::explorer::records::RawBridgedRecord;

    #[test]
    fn test_token_class_selection() {
        assert_eq!(token_class(None, None), Ok(TokenClass::Native));
        assert_eq!(
            token_class(Some("layer1_capacity"), None),
            Ok(TokenClass::Layer1Capacity)
        );
        assert_eq!(token_class(Some("udt"), Some(6)), Ok(TokenClass::Udt(6)));
        assert!(token_class(Some("udt"), None).is_err());
        assert!(token_class(Some("erc20"), None).is_err());
    }

    #[tokio::test]
    async fn test_format_amount_tool() {
        let server = ExplorerMcpServer::new(Config::default()).unwrap();
        let formatted = server
            .format_amount(FormatAmountRequest {
                amount: "2500000000000000000000".to_string(),
                token_class: None,
                decimal: None,
            })
            .await;
        assert_eq!(formatted, "2,500");
    }

    #[test]
    fn test_account_summary() {
        let query = AccountQuery::Address("0xabc".to_string());
        let account = crate::explorer::account::resolve(None, &query);
        let summary = account_summary(
            &account,
            Some(U256::from(1_500_000_000_000_000_000u64)),
            None,
        );
        assert_eq!(summary["account"]["type"], "UNKNOWN");
        assert_eq!(summary["activityCount"], 0);
        assert_eq!(summary["isVerified"], false);
        assert_eq!(summary["balance"], "1.5");
        assert!(summary["deployer"].is_null());

        let summary = account_summary(&account, None, Some("0xdef".to_string()));
        assert!(summary["balance"].is_null());
        assert_eq!(summary["deployer"], "0xdef");
    }

    #[test]
    fn test_bridged_record_view() {
        let raw: RawBridgedRecord = serde_json::from_value(json!({
            "type": "deposit",
            "value": "0",
            "capacity": "40000000000",
            "timestamp": 1650000000000u64,
            "layer1_tx_hash": "0xaaaa",
            "layer1_output_index": 0,
        }))
        .unwrap();
        let view = BridgedRecordView::new(raw.clone().into(), Some("https://explorer.nervos.org"));
        let value = serde_json::to_value(&view).unwrap();
        assert_eq!(value["type"], "deposit");
        assert_eq!(value["pending"], false);
        assert_eq!(
            value["layer1Url"],
            "https://explorer.nervos.org/transaction/0xaaaa#0"
        );

        let view = BridgedRecordView::new(raw.into(), None);
        assert!(view.layer1_url.is_none());
    }

    #[test]
    fn test_info_names_the_default_network() {
        let server = ExplorerMcpServer::new(Config::default()).unwrap();
        let instructions = server.get_info().instructions.unwrap_or_default();
        assert!(instructions.contains("GwScan backend (mainnet)"));
    }

    #[tokio::test]
    async fn test_get_account_rejects_bad_key() {
        let server = ExplorerMcpServer::new(Config::default()).unwrap();
        let response = server
            .get_account(AccountRequest {
                key: "not-a-key".to_string(),
                network: None,
            })
            .await;
        assert!(response.starts_with("Error: Invalid account key"));
    }
}
