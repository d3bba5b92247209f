use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use metrics::counter;
use reqwest::Client;
use serde::Deserialize;
use tracing::{error, info, warn};

use rdd_logger_domain::config::PriceConfig;
use rdd_logger_domain::model::Row;
use rdd_logger_domain::storage::RowStore;

use crate::tables::PRICES_TABLE;
use crate::worker::CollectorError;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// One spot price for the tracked asset in a single currency.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceQuote {
    pub currency: String,
    pub price: f64,
    pub price_view: String,
}

impl PriceQuote {
    pub fn to_row(&self) -> Row {
        Row::new()
            .with("currency", self.currency.as_str())
            .with("price", self.price)
            .with("priceView", self.price_view.as_str())
    }
}

#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Quotes for every requested currency the feed knows about.
    async fn fetch_quotes(&self, currencies: &[String]) -> Result<Vec<PriceQuote>, CollectorError>;
}

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(rename = "PRICE")]
    price: f64,
}

#[derive(Debug, Deserialize)]
struct DisplayQuote {
    #[serde(rename = "PRICE")]
    price: String,
}

#[derive(Debug, Deserialize)]
struct PriceMultiFull {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "Message")]
    message: Option<String>,
    #[serde(rename = "RAW", default)]
    raw: HashMap<String, HashMap<String, RawQuote>>,
    #[serde(rename = "DISPLAY", default)]
    display: HashMap<String, HashMap<String, DisplayQuote>>,
}

impl PriceMultiFull {
    fn quote(&self, symbol: &str, currency: &str) -> Option<PriceQuote> {
        let raw = self.raw.get(symbol)?.get(currency)?;
        let display = self.display.get(symbol)?.get(currency)?;
        Some(PriceQuote {
            currency: currency.to_string(),
            price: raw.price,
            price_view: display.price.clone(),
        })
    }
}

/// Client for the CryptoCompare `pricemultifull` endpoint.
#[derive(Clone)]
pub struct CryptoCompareClient {
    http: Client,
    api_url: String,
    api_key: String,
    symbol: String,
}

impl CryptoCompareClient {
    pub fn from_config(config: &PriceConfig) -> Result<Self, CollectorError> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| CollectorError::PriceFeed(err.to_string()))?;
        Ok(Self {
            http,
            api_url: config.api_url().trim_end_matches('/').to_string(),
            api_key: config.api_key().to_string(),
            symbol: config.symbol().to_string(),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

#[async_trait]
impl PriceSource for CryptoCompareClient {
    async fn fetch_quotes(&self, currencies: &[String]) -> Result<Vec<PriceQuote>, CollectorError> {
        let tsyms = currencies.join(",");
        let response = self
            .http
            .get(format!("{}/data/pricemultifull", self.api_url))
            .query(&[("fsyms", self.symbol.as_str()), ("tsyms", tsyms.as_str())])
            .header("Authorization", format!("Apikey {}", self.api_key))
            .send()
            .await
            .map_err(|err| CollectorError::PriceFeed(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(CollectorError::PriceFeed(format!("http status {status}")));
        }
        let body: PriceMultiFull = response
            .json()
            .await
            .map_err(|err| CollectorError::PriceFeed(err.to_string()))?;
        if body.response.as_deref() == Some("Error") {
            return Err(CollectorError::PriceFeed(
                body.message.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }

        let mut quotes = Vec::with_capacity(currencies.len());
        for currency in currencies {
            match body.quote(&self.symbol, currency) {
                Some(quote) => quotes.push(quote),
                None => warn!(symbol = %self.symbol, %currency, "no price for currency"),
            }
        }
        Ok(quotes)
    }
}

/// Fetches quotes and writes one row per currency. Inserts are independent:
/// a failed insert is logged and the rest still land. Returns the number of
/// rows written.
pub async fn run_price_logger<P, S>(
    source: &P,
    store: &S,
    currencies: &[String],
) -> Result<usize, CollectorError>
where
    P: PriceSource + ?Sized,
    S: RowStore + ?Sized,
{
    let quotes = source.fetch_quotes(currencies).await?;

    let outcomes = join_all(quotes.iter().map(|quote| async move {
        let row = quote.to_row();
        (quote, store.insert_row(PRICES_TABLE, &row).await)
    }))
    .await;

    let mut written = 0;
    for (quote, outcome) in outcomes {
        match outcome {
            Ok(()) => {
                counter!("logger_price_rows_total", "result" => "ok").increment(1);
                written += 1;
            }
            Err(err) => {
                counter!("logger_price_rows_total", "result" => "error").increment(1);
                error!(currency = %quote.currency, %err, "price write failed");
            }
        }
    }
    info!(written, "price logging done");
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use mockito::{Matcher, Server};
    use rdd_logger_domain::model::ScalarValue;
    use serde_json::json;

    fn client(url: String) -> CryptoCompareClient {
        let config = PriceConfig::new("secret", vec!["USD".to_string()]).with_api_url(url);
        CryptoCompareClient::from_config(&config).expect("client builds")
    }

    fn currencies(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[tokio::test]
    async fn usd_quote_becomes_one_prices_row() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/data/pricemultifull")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("fsyms".into(), "RDD".into()),
                Matcher::UrlEncoded("tsyms".into(), "USD".into()),
            ]))
            .match_header("authorization", "Apikey secret")
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "RAW": {"RDD": {"USD": {"PRICE": 0.00012, "MARKET": "CCCAGG"}}},
                    "DISPLAY": {"RDD": {"USD": {"PRICE": "$0.00012"}}}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let store = MemoryStore::default();
        let written = run_price_logger(&client(server.url()), &store, &currencies(&["USD"]))
            .await
            .expect("price logger succeeds");

        mock.assert_async().await;
        assert_eq!(written, 1);
        let rows = store.rows_for(PRICES_TABLE);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("currency"), Some(&ScalarValue::Text("USD".into())));
        assert_eq!(rows[0].get("price"), Some(&ScalarValue::Float(0.00012)));
        assert_eq!(
            rows[0].get("priceView"),
            Some(&ScalarValue::Text("$0.00012".into()))
        );
    }

    #[tokio::test]
    async fn currency_missing_from_response_is_skipped() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/data/pricemultifull")
            .match_query(Matcher::Any)
            .with_body(
                json!({
                    "RAW": {"RDD": {"USD": {"PRICE": 0.00012}}},
                    "DISPLAY": {"RDD": {"USD": {"PRICE": "$0.00012"}}}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let quotes = client(server.url())
            .fetch_quotes(&currencies(&["USD", "EUR"]))
            .await
            .expect("fetch succeeds");

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].currency, "USD");
    }

    #[tokio::test]
    async fn api_error_body_is_a_price_feed_error() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/data/pricemultifull")
            .match_query(Matcher::Any)
            .with_body(
                json!({"Response": "Error", "Message": "You are over your rate limit"})
                    .to_string(),
            )
            .create_async()
            .await;

        let store = MemoryStore::default();
        let err = run_price_logger(&client(server.url()), &store, &currencies(&["USD"]))
            .await
            .unwrap_err();

        assert!(matches!(err, CollectorError::PriceFeed(ref msg) if msg.contains("rate limit")));
        assert!(store.rows().is_empty());
    }

    #[tokio::test]
    async fn failed_inserts_are_logged_not_fatal() {
        struct FixedQuotes;

        #[async_trait]
        impl PriceSource for FixedQuotes {
            async fn fetch_quotes(
                &self,
                _currencies: &[String],
            ) -> Result<Vec<PriceQuote>, CollectorError> {
                Ok(vec![
                    PriceQuote {
                        currency: "USD".into(),
                        price: 0.00012,
                        price_view: "$0.00012".into(),
                    },
                    PriceQuote {
                        currency: "BTC".into(),
                        price: 0.0000000021,
                        price_view: "Ƀ 0.0000000021".into(),
                    },
                ])
            }
        }

        let store = MemoryStore::default();
        store.fail_writes_to(PRICES_TABLE);
        let written = run_price_logger(&FixedQuotes, &store, &currencies(&["USD", "BTC"]))
            .await
            .expect("fetch stage succeeds");
        assert_eq!(written, 0);
    }
}
