use crate::cache::TtlCache;
use crate::config::Settings;
use crate::domain::market::InstrumentSnapshot;
use crate::ingest::types::{
    HotSector, HotSectorsResponse, MarketIndexResponse, QuotesResponse, SectorInstrumentsResponse,
};
use crate::sector::filter::is_theme_sector;
use anyhow::{Context, Result};
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::time::Duration;

const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_RETRIES: u32 = 3;
const MAX_RETRIES: u32 = 10;
const MAX_BACKOFF_SECS: u64 = 30;
const DEFAULT_CACHE_TTL_SECS: i64 = 300;

// Hot sectors are requested in bulk so that enough remain after name filtering.
const HOT_SECTOR_FETCH_SIZE: usize = 100;

const MARKET_INDEX_PATH: &str = "/v1/market/index";
const HOT_SECTORS_PATH: &str = "/v1/sectors/hot";
const QUOTES_PATH: &str = "/v1/quotes";

/// Source of market snapshots. Implementations own networking, parsing and caching.
#[async_trait::async_trait]
pub trait MarketDataProvider: Send + Sync {
    fn provider_name(&self) -> &'static str;

    /// Broad-market percent change for the session.
    async fn fetch_market_change(&self) -> Result<f64>;

    /// Hot theme sectors by change, descending, pattern boards removed, at most `limit`.
    async fn fetch_hot_sectors(&self, limit: usize) -> Result<Vec<HotSector>>;

    async fn fetch_sector_instruments(&self, sector_code: &str) -> Result<Vec<InstrumentSnapshot>>;

    /// Last prices by code; codes without a usable price are absent.
    async fn fetch_quotes(&self, codes: &[String]) -> Result<HashMap<String, f64>>;
}

pub struct HttpJsonMarketData {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retries: u32,
    cache: tokio::sync::Mutex<TtlCache<String, Value>>,
}

impl HttpJsonMarketData {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let base_url = settings.require_data_provider_base_url()?.to_string();
        let api_key = settings.data_provider_api_key.clone();

        let timeout_secs = std::env::var("DATA_PROVIDER_TIMEOUT_SECS")
            .ok()
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        let retries = parse_retries(std::env::var("DATA_PROVIDER_RETRIES").ok().as_deref());

        let ttl_secs = std::env::var("DATA_PROVIDER_CACHE_TTL_SECS")
            .ok()
            .and_then(|s| s.parse::<i64>().ok())
            .unwrap_or(DEFAULT_CACHE_TTL_SECS);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .context("failed to build market data http client")?;

        Ok(Self::new(
            http,
            base_url,
            api_key,
            retries,
            TtlCache::new(chrono::Duration::seconds(ttl_secs)),
        ))
    }

    pub fn new(
        http: reqwest::Client,
        base_url: String,
        api_key: Option<String>,
        retries: u32,
        cache: TtlCache<String, Value>,
    ) -> Self {
        Self {
            http,
            base_url,
            api_key,
            retries: retries.clamp(1, MAX_RETRIES),
            cache: tokio::sync::Mutex::new(cache),
        }
    }

    fn url(&self, path: &str) -> String {
        let path = if path.starts_with('/') {
            path.to_string()
        } else {
            format!("/{path}")
        };

        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn headers(&self) -> Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = &self.api_key {
            headers.insert("x-api-key", HeaderValue::from_str(api_key)?);
        }
        Ok(headers)
    }

    async fn fetch_once(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let res = self
            .http
            .get(self.url(path))
            .headers(self.headers()?)
            .query(query)
            .send()
            .await
            .with_context(|| format!("market data request failed: {path}"))?;

        let status = res.status();
        let text = res
            .text()
            .await
            .context("failed to read market data response")?;
        let raw_json = serde_json::from_str::<Value>(&text)
            .with_context(|| format!("market data response is not valid JSON: {text}"))?;

        if !status.is_success() {
            anyhow::bail!("market data HTTP {status} for {path}: {raw_json}");
        }
        Ok(raw_json)
    }

    async fn fetch_with_retry(&self, path: &str, query: &[(&str, String)]) -> Result<Value> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.fetch_once(path, query).await {
                Ok(raw) => return Ok(raw),
                Err(err) => {
                    if attempt >= self.retries {
                        return Err(err);
                    }
                    let backoff = backoff_for(attempt);
                    tracing::warn!(attempt, ?backoff, path, error = %err, "market data fetch failed; retrying");
                    tokio::time::sleep(backoff).await;
                }
            }
        }
    }

    /// Cached GET. The lock is not held across the request; concurrent misses may both fetch.
    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        use_cache: bool,
    ) -> Result<T> {
        let key = cache_key(path, query);

        let cached = if use_cache {
            self.cache.lock().await.get(&key, chrono::Utc::now())
        } else {
            None
        };

        let raw = match cached {
            Some(raw) => {
                tracing::debug!(path, "market data cache hit");
                raw
            }
            None => {
                let raw = self.fetch_with_retry(path, query).await?;
                if use_cache {
                    let now = chrono::Utc::now();
                    let mut cache = self.cache.lock().await;
                    let purged = cache.purge_expired(now);
                    cache.set(key, raw.clone(), now);
                    tracing::debug!(path, purged, entries = cache.len(), "market data cached");
                }
                raw
            }
        };

        serde_json::from_value::<T>(raw)
            .with_context(|| format!("failed to parse market data response for {path}"))
    }
}

fn parse_retries(raw: Option<&str>) -> u32 {
    let Some(raw) = raw else {
        return DEFAULT_RETRIES;
    };
    match raw.trim().parse::<u32>() {
        Ok(n) if (1..=MAX_RETRIES).contains(&n) => n,
        Ok(n) => {
            let clamped = n.clamp(1, MAX_RETRIES);
            tracing::warn!(value = n, clamped, "DATA_PROVIDER_RETRIES out of range; clamped");
            clamped
        }
        Err(_) => {
            tracing::warn!(value = raw, default = DEFAULT_RETRIES, "invalid DATA_PROVIDER_RETRIES; using default");
            DEFAULT_RETRIES
        }
    }
}

/// Exponential backoff after a failed `attempt` (1-based), capped.
fn backoff_for(attempt: u32) -> Duration {
    let secs = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX)
        .min(MAX_BACKOFF_SECS);
    Duration::from_secs(secs)
}

fn cache_key(path: &str, query: &[(&str, String)]) -> String {
    let mut key = path.to_string();
    for (k, v) in query {
        key.push_str(&format!("&{k}={v}"));
    }
    key
}

fn sector_instruments_path(sector_code: &str) -> String {
    format!("/v1/sectors/{sector_code}/instruments")
}

#[async_trait::async_trait]
impl MarketDataProvider for HttpJsonMarketData {
    fn provider_name(&self) -> &'static str {
        "external_http_json"
    }

    async fn fetch_market_change(&self) -> Result<f64> {
        let resp: MarketIndexResponse = self.get_json(MARKET_INDEX_PATH, &[], true).await?;
        Ok(resp.change_pct)
    }

    async fn fetch_hot_sectors(&self, limit: usize) -> Result<Vec<HotSector>> {
        let resp: HotSectorsResponse = self
            .get_json(
                HOT_SECTORS_PATH,
                &[("limit", HOT_SECTOR_FETCH_SIZE.to_string())],
                true,
            )
            .await?;
        Ok(select_hot_sectors(resp, limit))
    }

    async fn fetch_sector_instruments(&self, sector_code: &str) -> Result<Vec<InstrumentSnapshot>> {
        anyhow::ensure!(!sector_code.trim().is_empty(), "sector code must be non-empty");
        let resp: SectorInstrumentsResponse = self
            .get_json(&sector_instruments_path(sector_code), &[], true)
            .await?;
        anyhow::ensure!(
            resp.sector_code == sector_code,
            "sector code mismatch: expected {sector_code}, got {}",
            resp.sector_code
        );
        Ok(resp
            .items
            .into_iter()
            .filter(|s| !s.code.trim().is_empty())
            .collect())
    }

    async fn fetch_quotes(&self, codes: &[String]) -> Result<HashMap<String, f64>> {
        if codes.is_empty() {
            return Ok(HashMap::new());
        }
        let resp: QuotesResponse = self
            .get_json(QUOTES_PATH, &[("codes", codes.join(","))], false)
            .await?;
        Ok(quote_prices(resp))
    }
}

fn select_hot_sectors(resp: HotSectorsResponse, limit: usize) -> Vec<HotSector> {
    resp.items
        .into_iter()
        .filter(|item| is_theme_sector(&item.name))
        .take(limit)
        .map(|item| HotSector {
            sector: item.snapshot(),
            net_inflow: item.net_inflow,
        })
        .collect()
}

fn quote_prices(resp: QuotesResponse) -> HashMap<String, f64> {
    resp.items
        .into_iter()
        .filter_map(|q| q.price.filter(|p| *p > 0.0).map(|p| (q.code, p)))
        .collect()
}
