use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;

use rdd_logger_domain::config::RpcConfig;
use rdd_logger_domain::model::Snapshot;

use crate::worker::CollectorError;

mod types;

pub use types::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcMethod};

const PROBE_TIMEOUT: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[async_trait]
pub trait RpcSource: Send + Sync {
    /// Cheap reachability check; the result is discarded.
    async fn probe(&self) -> Result<(), CollectorError>;
    /// Fetches one method result, validated against the method's contract.
    async fn call(&self, method: RpcMethod) -> Result<Snapshot, CollectorError>;
}

/// JSON-RPC over HTTP POST with basic auth against a single node.
#[derive(Clone)]
pub struct HttpRpcClient {
    http: Client,
    url: String,
    username: String,
    password: String,
    probe_method: RpcMethod,
    probe_timeout: Duration,
    request_timeout: Duration,
}

impl HttpRpcClient {
    pub fn new(
        url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self, CollectorError> {
        let http = Client::builder()
            .build()
            .map_err(|err| CollectorError::RpcUnreachable(err.to_string()))?;
        Ok(Self {
            http,
            url: url.into(),
            username: username.into(),
            password: password.into(),
            probe_method: RpcMethod::GetInfo,
            probe_timeout: PROBE_TIMEOUT,
            request_timeout: REQUEST_TIMEOUT,
        })
    }

    /// Builds a client for the configured node; the probe uses the same info
    /// method the collection cycle relies on.
    pub fn from_config(config: &RpcConfig) -> Result<Self, CollectorError> {
        let mut client = Self::new(config.url(), config.username(), config.password())?
            .with_request_timeout(config.timeout());
        client.probe_method = config.info_method().into();
        Ok(client)
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Upper bound for a full call, so a node that accepts the connection but
    /// never answers cannot stall the scheduler.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issues one request and returns the raw `result` member.
    pub async fn request(
        &self,
        method: RpcMethod,
        params: Vec<Value>,
        timeout: Option<Duration>,
    ) -> Result<Value, CollectorError> {
        let body = JsonRpcRequest {
            method: method.as_str(),
            params,
        };
        let request = self
            .http
            .post(&self.url)
            .basic_auth(&self.username, Some(&self.password))
            .timeout(timeout.unwrap_or(self.request_timeout))
            .json(&body);

        let response = request
            .send()
            .await
            .map_err(|err| CollectorError::RpcUnreachable(err.to_string()))?;
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|err| CollectorError::RpcUnreachable(err.to_string()))?;

        // Bitcoin-derived nodes answer RPC errors with HTTP 500 and a JSON
        // body, so the body is inspected before the status.
        let parsed = serde_json::from_slice::<JsonRpcResponse>(&bytes).ok();
        if let Some(JsonRpcResponse {
            error: Some(error), ..
        }) = &parsed
        {
            return Err(CollectorError::call_failed(
                method,
                format!("code {}: {}", error.code, error.message),
            ));
        }
        if !status.is_success() {
            return Err(CollectorError::call_failed(
                method,
                format!("http status {status}"),
            ));
        }

        parsed
            .map(|response| response.result)
            .ok_or_else(|| CollectorError::call_failed(method, "malformed json-rpc response"))
    }
}

#[async_trait]
impl RpcSource for HttpRpcClient {
    async fn probe(&self) -> Result<(), CollectorError> {
        self.request(self.probe_method, Vec::new(), Some(self.probe_timeout))
            .await
            .map(|_| ())
    }

    async fn call(&self, method: RpcMethod) -> Result<Snapshot, CollectorError> {
        let outcome = self
            .request(method, Vec::new(), None)
            .await
            .and_then(|result| {
                let snapshot = Snapshot::from_json(&result)
                    .map_err(|err| CollectorError::call_failed(method, err))?;
                snapshot
                    .require(method.contract())
                    .map_err(|err| CollectorError::call_failed(method, err))?;
                Ok(snapshot)
            });

        let label = if outcome.is_ok() { "ok" } else { "error" };
        counter!("logger_rpc_calls_total", "method" => method.as_str(), "result" => label)
            .increment(1);
        if let Ok(snapshot) = &outcome {
            debug!(method = method.as_str(), fields = snapshot.len(), "rpc call succeeded");
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};
    use rdd_logger_domain::config::InfoMethod;
    use rdd_logger_domain::model::ScalarValue;
    use serde_json::json;
    use strum::IntoEnumIterator;

    const AUTH_HEADER: &str = "Basic cnBjdXNlcjpycGNwYXNz";

    fn client(url: String) -> HttpRpcClient {
        HttpRpcClient::new(url, "rpcuser", "rpcpass").expect("client builds")
    }

    #[test]
    fn method_names_are_lowercase() {
        let names: Vec<_> = RpcMethod::iter().map(RpcMethod::as_str).collect();
        assert_eq!(
            names,
            ["getinfo", "getblockchaininfo", "getwalletinfo", "getstakinginfo"]
        );
        assert_eq!(RpcMethod::GetStakingInfo.to_string(), "getstakinginfo");
    }

    #[test]
    fn request_body_omits_empty_params() {
        let body = JsonRpcRequest {
            method: "getinfo",
            params: Vec::new(),
        };
        assert_eq!(serde_json::to_value(&body).unwrap(), json!({"method": "getinfo"}));
    }

    #[tokio::test]
    async fn call_posts_method_with_basic_auth() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_header("authorization", AUTH_HEADER)
            .match_body(Matcher::Json(json!({"method": "getstakinginfo"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                json!({
                    "result": {
                        "enabled": true,
                        "staking": false,
                        "averageweight": 1200,
                        "netstakeweight": 987654321,
                        "expectedtime": 86400,
                        "difficulty": {"proof-of-stake": 12.5}
                    },
                    "error": null,
                    "id": null
                })
                .to_string(),
            )
            .create_async()
            .await;

        let snapshot = client(server.url())
            .call(RpcMethod::GetStakingInfo)
            .await
            .expect("call succeeds");

        mock.assert_async().await;
        assert_eq!(snapshot.get("staking"), Some(&ScalarValue::Bool(false)));
        assert_eq!(
            snapshot.get("netstakeweight"),
            Some(&ScalarValue::Integer(987_654_321))
        );
        assert!(snapshot.get("difficulty").is_none());
    }

    #[tokio::test]
    async fn rpc_error_body_is_call_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(500)
            .with_header("content-type", "application/json")
            .with_body(r#"{"result":null,"error":{"code":-32601,"message":"Method not found"},"id":null}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .call(RpcMethod::GetInfo)
            .await
            .unwrap_err();
        match err {
            CollectorError::RpcCallFailed { method, message } => {
                assert_eq!(method, "getinfo");
                assert!(message.contains("Method not found"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn unauthorized_status_is_call_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(401)
            .create_async()
            .await;

        let err = client(server.url())
            .call(RpcMethod::GetWalletInfo)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::RpcCallFailed { .. }));
    }

    #[tokio::test]
    async fn contract_drift_is_call_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"result":{"blocks":"many","balance":1.0,"moneysupply":2.0},"error":null}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .call(RpcMethod::GetInfo)
            .await
            .unwrap_err();
        match err {
            CollectorError::RpcCallFailed { message, .. } => {
                assert!(message.contains("blocks"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn non_object_result_is_call_failure() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/")
            .with_status(200)
            .with_body(r#"{"result":42,"error":null}"#)
            .create_async()
            .await;

        let err = client(server.url())
            .call(RpcMethod::GetWalletInfo)
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::RpcCallFailed { .. }));
    }

    #[tokio::test]
    async fn probe_discards_result() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/")
            .match_body(Matcher::Json(json!({"method": "getinfo"})))
            .with_status(200)
            .with_body(r#"{"result":{"version":1},"error":null}"#)
            .create_async()
            .await;

        client(server.url()).probe().await.expect("probe succeeds");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn silent_node_times_out_instead_of_hanging() {
        // Bound but never accepted: the handshake completes, no reply follows.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let url = format!("http://{}", listener.local_addr().expect("local addr"));

        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            client(url)
                .with_request_timeout(Duration::from_millis(200))
                .call(RpcMethod::GetStakingInfo),
        )
        .await
        .expect("call returns before the outer deadline");

        assert!(matches!(outcome, Err(CollectorError::RpcUnreachable(_))));
        drop(listener);
    }

    #[test]
    fn info_method_maps_to_rpc_method() {
        assert_eq!(RpcMethod::from(InfoMethod::GetInfo), RpcMethod::GetInfo);
        assert_eq!(
            RpcMethod::from(InfoMethod::GetBlockchainInfo),
            RpcMethod::GetBlockchainInfo
        );
    }

    #[tokio::test]
    async fn closed_port_is_unreachable() {
        let err = client("http://127.0.0.1:1".to_string())
            .with_probe_timeout(Duration::from_millis(500))
            .probe()
            .await
            .unwrap_err();
        assert!(matches!(err, CollectorError::RpcUnreachable(_)));
    }
}
