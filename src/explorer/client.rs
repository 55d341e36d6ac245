use alloy::{
    primitives::U256,
    providers::{Provider, ProviderBuilder, RootProvider},
    transports::http::{Client as RpcClient, Http},
};
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::account::{resolve, AccountQuery, AccountVariant, RawAccount};
use super::list::{normalize, ListPage, PageRequest, PaginationMode, RawListResponse, SortDirection};
use super::records::{
    BridgedRecord, NftCollection, RawBridgedRecord, RawNftCollection, RawTransaction, Transaction,
};
use super::utils;
use crate::config::{Config, NetworkConfig};

const ACCOUNT_QUERY: &str = r#"
  query ($script_hash: String, $address: String) {
    account(input: { script_hash: $script_hash, address: $address }) {
      type
      eth_address
      script_hash
      script
      transaction_count
      nonce
      udt {
        id
        name
        decimal
        symbol
      }
      smart_contract {
        name
        deployment_tx_hash
        compiler_version
        compiler_file_format
        contract_source_code
        constructor_arguments
        abi
      }
    }
  }
"#;

const DEPLOYER_QUERY: &str = r#"
  query ($eth_hash: String!) {
    transaction(input: { eth_hash: $eth_hash }) {
      from_account {
        eth_address
      }
    }
  }
"#;

const NFT_COLLECTIONS_QUERY: &str = r#"
  query (
    $limit: Int
    $name: String
    $before: String
    $after: String
    $holder_count_sort: SortType
    $name_sort: SortType
  ) {
    erc721_udts(
      input: {
        limit: $limit
        fuzzy_name: $name
        before: $before
        after: $after
        sorter: [
          { sort_type: $holder_count_sort, sort_value: EX_HOLDERS_COUNT }
          { sort_type: $name_sort, sort_value: NAME }
        ]
      }
    ) {
      entries {
        id
        name
        symbol
        icon
        account {
          eth_address
          bit_alias
        }
        holders_count
        minted_count
      }
      metadata {
        total_count
        after
        before
      }
    }
  }
"#;

/// Filter and sorters of the NFT collection list. Sorting happens server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NftCollectionFilter {
    pub name: Option<String>,
    pub holder_count_sort: SortDirection,
    pub name_sort: SortDirection,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct GraphQlResponse<T> {
    data: Option<T>,
    #[serde(default)]
    errors: Option<Vec<GraphQlError>>,
}

#[derive(Debug, Deserialize)]
struct AccountData {
    account: Option<RawAccount>,
}

#[derive(Debug, Deserialize)]
struct DeployerData {
    transaction: Option<DeployTransaction>,
}

#[derive(Debug, Deserialize)]
struct DeployTransaction {
    from_account: Option<DeployerAccount>,
}

#[derive(Debug, Deserialize)]
struct DeployerAccount {
    eth_address: Option<String>,
}

impl DeployerData {
    fn into_address(self) -> Option<String> {
        self.transaction
            .and_then(|tx| tx.from_account)
            .and_then(|account| account.eth_address)
    }
}

#[derive(Debug, Deserialize)]
struct Erc721Data {
    erc721_udts: Value,
}

/// HTTP access to the explorer backend.
///
/// List fetches never surface transport or decode failures: they log the error
/// and hand back `ListPage::empty` for the request that was made.
#[derive(Debug, Clone)]
pub struct ExplorerClient {
    http: Client,
    providers: HashMap<String, RootProvider<Http<RpcClient>>>,
    config: Arc<Config>,
}

impl ExplorerClient {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let mut builder =
            Client::builder().timeout(Duration::from_secs(config.backend.request_timeout_secs));
        if let Some(user_agent) = &config.backend.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| anyhow!("Failed to build HTTP client: {}", e))?;

        let mut providers = HashMap::new();
        for (network_name, network_config) in &config.networks {
            if let Some(node_url) = &network_config.node_url {
                let url: reqwest::Url = node_url.parse().map_err(|e| {
                    anyhow!("Invalid node_url for network '{}': {}", network_name, e)
                })?;
                providers.insert(network_name.clone(), ProviderBuilder::new().on_http(url));
            }
        }

        Ok(Self {
            http,
            providers,
            config: Arc::new(config),
        })
    }

    pub fn network_config(&self, network: Option<&str>) -> Result<&NetworkConfig> {
        self.config.network(network)
    }

    fn provider(&self, network: Option<&str>) -> Result<&RootProvider<Http<RpcClient>>> {
        let network_name = network.unwrap_or(&self.config.default_network);
        self.config.network(Some(network_name))?;
        self.providers
            .get(network_name)
            .ok_or_else(|| anyhow!("Network '{}' has no node_url configured", network_name))
    }

    /// An offset request with configured defaults applied.
    pub fn offset_request(&self, page: Option<u64>, page_size: Option<u32>) -> PageRequest {
        let pagination = &self.config.pagination;
        PageRequest::offset(
            page.unwrap_or(1),
            page_size.unwrap_or(pagination.default_page_size),
        )
        .with_allowed_page_size(&pagination.allowed_page_sizes, pagination.default_page_size)
    }

    /// A cursor request with configured defaults applied.
    pub fn cursor_request(
        &self,
        before: Option<String>,
        after: Option<String>,
        limit: Option<u32>,
    ) -> PageRequest {
        let pagination = &self.config.pagination;
        PageRequest::cursor(
            before,
            after,
            limit.unwrap_or(pagination.default_page_size),
        )
        .with_allowed_page_size(&pagination.allowed_page_sizes, pagination.default_page_size)
    }

    pub async fn fetch_account(
        &self,
        query: &AccountQuery,
        network: Option<&str>,
    ) -> Result<AccountVariant> {
        debug!("Fetching account {:?}", query);
        let data: AccountData = self
            .graphql(network, ACCOUNT_QUERY, query.variables())
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to fetch account: {}",
                    utils::interpret_fetch_error(&e.to_string())
                )
            })?;

        Ok(resolve(data.account, query))
    }

    /// Native pCKB balance of `address`, in base units, read from the web3 node.
    pub async fn fetch_balance(&self, address: &str, network: Option<&str>) -> Result<U256> {
        let address = utils::validate_address(address)
            .map_err(|e| anyhow!("Invalid account address: {}", e))?;
        let provider = self.provider(network)?;

        provider.get_balance(address).await.map_err(|e| {
            anyhow!(
                "Failed to fetch balance of {}: {}",
                address,
                utils::interpret_fetch_error(&e.to_string())
            )
        })
    }

    /// Eth address of the account that sent the deployment transaction.
    ///
    /// `Ok(None)` when the backend does not know the transaction.
    pub async fn fetch_deployer(
        &self,
        deployment_tx_hash: &str,
        network: Option<&str>,
    ) -> Result<Option<String>> {
        let hash = utils::validate_tx_hash(deployment_tx_hash)?;
        let data: DeployerData = self
            .graphql(network, DEPLOYER_QUERY, json!({ "eth_hash": hash.to_string() }))
            .await
            .map_err(|e| {
                anyhow!(
                    "Failed to fetch deployer: {}",
                    utils::interpret_fetch_error(&e.to_string())
                )
            })?;

        Ok(data.into_address())
    }

    /// Transactions sent or received by `address`, newest first as served.
    ///
    /// Errors only on an invalid address.
    pub async fn fetch_account_transactions(
        &self,
        address: &str,
        request: &PageRequest,
        network: Option<&str>,
    ) -> Result<ListPage<Transaction>> {
        let address = utils::validate_address(address)
            .map_err(|e| anyhow!("Invalid account address: {}", e))?;

        let mut params = vec![("eth_address", address.to_string().to_lowercase())];
        params.extend(request.query_pairs());

        let body = self.rest_get(network, "txs", &params).await;
        Ok(page_or_empty::<RawTransaction, Transaction>(
            body,
            request,
            "transactions",
        ))
    }

    /// Deposits and withdrawals, optionally restricted to one account.
    pub async fn fetch_bridged_records(
        &self,
        address: Option<&str>,
        request: &PageRequest,
        network: Option<&str>,
    ) -> Result<ListPage<BridgedRecord>> {
        let mut params = Vec::new();
        if let Some(address) = address {
            let address = utils::validate_address(address)
                .map_err(|e| anyhow!("Invalid account address: {}", e))?;
            params.push(("eth_address", address.to_string().to_lowercase()));
        }
        params.extend(request.query_pairs());

        let body = self.rest_get(network, "deposit_withdrawals", &params).await;
        Ok(page_or_empty::<RawBridgedRecord, BridgedRecord>(
            body,
            request,
            "bridged records",
        ))
    }

    /// ERC-721 collections. Only cursor requests are meaningful here.
    pub async fn fetch_nft_collections(
        &self,
        filter: &NftCollectionFilter,
        request: &PageRequest,
        network: Option<&str>,
    ) -> Result<ListPage<NftCollection>> {
        let PageRequest::Cursor {
            before,
            after,
            limit,
        } = request
        else {
            return Err(anyhow!("NFT collections are cursor paginated"));
        };

        let variables = json!({
            "limit": limit,
            "name": filter.name.as_deref().filter(|n| !n.is_empty()),
            "before": before,
            "after": after,
            "holder_count_sort": filter.holder_count_sort.as_str(),
            "name_sort": filter.name_sort.as_str(),
        });

        let body = self
            .graphql::<Erc721Data>(network, NFT_COLLECTIONS_QUERY, variables)
            .await
            .map(|data| data.erc721_udts);
        Ok(page_or_empty::<RawNftCollection, NftCollection>(
            body,
            request,
            "NFT collections",
        ))
    }

    /// Probes the GraphQL endpoint.
    pub async fn check_connection(&self, network: Option<&str>) -> Result<bool> {
        match self
            .graphql::<Value>(network, "query { __typename }", json!({}))
            .await
        {
            Ok(_) => Ok(true),
            Err(e) => {
                debug!(
                    "Connection check failed for network {}: {}",
                    network.unwrap_or("default"),
                    e
                );
                Ok(false)
            }
        }
    }

    async fn graphql<T: DeserializeOwned>(
        &self,
        network: Option<&str>,
        query: &str,
        variables: Value,
    ) -> Result<T> {
        let url = &self.config.network(network)?.graphql_url;

        let response: GraphQlResponse<T> = self
            .http
            .post(url)
            .json(&json!({ "query": query, "variables": variables }))
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach {}: {}", url, e))?
            .error_for_status()
            .map_err(|e| anyhow!("GraphQL request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse GraphQL response: {}", e))?;

        if let Some(errors) = response.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<&str> = errors.iter().map(|e| e.message.as_str()).collect();
            return Err(anyhow!("GraphQL error: {}", messages.join("; ")));
        }

        response
            .data
            .ok_or_else(|| anyhow!("GraphQL response contains no data"))
    }

    async fn rest_get(
        &self,
        network: Option<&str>,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<Value> {
        let base = &self.config.network(network)?.rest_url;
        let url = format!("{}/{}", base.trim_end_matches('/'), path);

        self.http
            .get(&url)
            .query(params)
            .send()
            .await
            .map_err(|e| anyhow!("Failed to reach {}: {}", url, e))?
            .error_for_status()
            .map_err(|e| anyhow!("REST request failed: {}", e))?
            .json()
            .await
            .map_err(|e| anyhow!("Failed to parse REST response: {}", e))
    }
}

fn page_or_empty<R, T>(body: Result<Value>, request: &PageRequest, what: &str) -> ListPage<T>
where
    R: DeserializeOwned + Into<T>,
{
    let mode: PaginationMode = request.mode();
    match body.and_then(|value| RawListResponse::<R>::decode(value, mode)) {
        Ok(raw) => normalize(raw, request),
        Err(e) => {
            warn!(
                "Failed to fetch {}, returning an empty page: {}",
                what,
                utils::interpret_fetch_error(&e.to_string())
            );
            ListPage::empty(request)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, NetworkConfig};
    use crate::explorer::list::PageInfo;
    use serde_json::json;

    const ADDRESS: &str = "0x715ab282b873b79a7be8b0e8c13c4e8966a52040";

    /// A client whose endpoints refuse connections.
    fn offline_client() -> ExplorerClient {
        let mut config = Config::default();
        for network in config.networks.values_mut() {
            network.graphql_url = "http://127.0.0.1:1/graphql".to_string();
            network.rest_url = "http://127.0.0.1:1/api".to_string();
            network.node_url = Some("http://127.0.0.1:1/rpc".to_string());
        }
        config.backend.request_timeout_secs = 2;
        ExplorerClient::new(config).unwrap()
    }

    #[test]
    fn test_request_defaults_and_clamping() {
        let client = offline_client();
        assert_eq!(client.offset_request(None, None), PageRequest::offset(1, 20));
        assert_eq!(client.offset_request(Some(3), Some(7)), PageRequest::offset(3, 20));
        assert_eq!(
            client.cursor_request(None, Some("abc".to_string()), Some(50)),
            PageRequest::cursor(None, Some("abc".to_string()), 50)
        );
    }

    #[test]
    fn test_page_or_empty_substitutes_on_failure() {
        let request = PageRequest::offset(2, 10);
        let page: ListPage<Transaction> =
            page_or_empty::<RawTransaction, Transaction>(Err(anyhow!("boom")), &request, "txs");
        assert_eq!(page.total_count(), 0);
        assert_eq!(
            page.page_info(),
            &PageInfo::Offset {
                page: 2,
                page_size: 10
            }
        );

        // Wrong shape for the requested mode is treated the same way
        let page: ListPage<Transaction> = page_or_empty::<RawTransaction, Transaction>(
            Ok(json!({ "unexpected": true })),
            &request,
            "txs",
        );
        assert!(page.items().is_empty());
    }

    #[tokio::test]
    async fn test_list_fetches_degrade_to_empty_pages() {
        let client = offline_client();

        let request = client.offset_request(Some(2), Some(10));
        let txs = client
            .fetch_account_transactions(ADDRESS, &request, None)
            .await
            .unwrap();
        assert_eq!(txs.total_count(), 0);
        assert_eq!(
            txs.page_info(),
            &PageInfo::Offset {
                page: 2,
                page_size: 10
            }
        );

        let records = client
            .fetch_bridged_records(None, &request, Some("testnet"))
            .await
            .unwrap();
        assert!(records.items().is_empty());

        let cursor = client.cursor_request(Some("prev".to_string()), None, None);
        let collections = client
            .fetch_nft_collections(&NftCollectionFilter::default(), &cursor, None)
            .await
            .unwrap();
        assert_eq!(collections.total_count(), 0);
        assert_eq!(
            collections.page_info(),
            &PageInfo::Cursor {
                before: Some("prev".to_string()),
                after: None
            }
        );
    }

    #[tokio::test]
    async fn test_invalid_arguments_are_rejected() {
        let client = offline_client();
        let request = client.offset_request(None, None);

        assert!(client
            .fetch_account_transactions("0x123", &request, None)
            .await
            .is_err());
        assert!(client
            .fetch_nft_collections(&NftCollectionFilter::default(), &request, None)
            .await
            .is_err());
        assert!(client
            .fetch_bridged_records(None, &request, Some("devnet"))
            .await
            .unwrap()
            .items()
            .is_empty());
    }

    #[test]
    fn test_deployer_address_extraction() {
        let data: DeployerData = serde_json::from_value(json!({
            "transaction": { "from_account": { "eth_address": ADDRESS } }
        }))
        .unwrap();
        assert_eq!(data.into_address().as_deref(), Some(ADDRESS));

        let data: DeployerData = serde_json::from_value(json!({ "transaction": null })).unwrap();
        assert_eq!(data.into_address(), None);
    }

    #[test]
    fn test_invalid_node_url_is_rejected() {
        let mut config = Config::default();
        if let Some(network) = config.networks.get_mut("testnet") {
            network.node_url = Some("not a url".to_string());
        }
        assert!(ExplorerClient::new(config).is_err());
    }

    #[tokio::test]
    async fn test_balance_and_deployer_errors() {
        let mut client = offline_client();
        assert!(client.fetch_balance(ADDRESS, None).await.is_err());
        assert!(client.fetch_balance("0x123", None).await.is_err());
        assert!(client.fetch_deployer("0x01", None).await.is_err());
        assert!(client
            .fetch_deployer(
                "0x1f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a79881f2e3d4c5b6a7988",
                None
            )
            .await
            .is_err());

        client.providers.clear();
        let err = client.fetch_balance(ADDRESS, None).await.unwrap_err();
        assert!(err.to_string().contains("no node_url"));
    }

    #[tokio::test]
    async fn test_account_fetch_reports_transport_errors() {
        let client = offline_client();
        let query = AccountQuery::parse(ADDRESS).unwrap();
        assert!(client.fetch_account(&query, None).await.is_err());
        assert!(!client.check_connection(None).await.unwrap());
    }
}
