use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use crate::config::MarketConfig;

/// Thin client over the third-party market-data provider. Responses are
/// passed through as JSON; the provider's schema is not interpreted here.
#[async_trait]
pub trait MarketData: Send + Sync {
    async fn quote(&self, symbol: &str) -> anyhow::Result<Value>;
    async fn search(&self, query: &str) -> anyhow::Result<Value>;
}

pub struct HttpMarket {
    client: reqwest::Client,
    config: MarketConfig,
}

impl HttpMarket {
    pub fn new(config: MarketConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let url = format!("{}/{}", self.config.base_url.trim_end_matches('/'), path);
        let value = self
            .client
            .get(url)
            .query(query)
            .query(&[("apikey", self.config.api_key.as_str())])
            .send()
            .await?
            .error_for_status()?
            .json::<Value>()
            .await?;
        debug!(path = %path, "market data fetched");
        Ok(value)
    }
}

#[async_trait]
impl MarketData for HttpMarket {
    async fn quote(&self, symbol: &str) -> anyhow::Result<Value> {
        self.get_json("quote", &[("symbol", symbol)]).await
    }

    async fn search(&self, query: &str) -> anyhow::Result<Value> {
        self.get_json("search", &[("q", query)]).await
    }
}
