use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::{Display, EnumIter, EnumString, IntoStaticStr};

use rdd_logger_domain::config::InfoMethod;
use rdd_logger_domain::model::ScalarKind;

/// RPC methods the logger consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum RpcMethod {
    GetInfo,
    GetBlockchainInfo,
    GetWalletInfo,
    GetStakingInfo,
}

impl RpcMethod {
    pub fn as_str(self) -> &'static str {
        self.into()
    }

    /// Fields each method must return for the logger to make sense of it.
    /// Anything else in the result is tolerated.
    pub fn contract(self) -> &'static [(&'static str, ScalarKind)] {
        match self {
            RpcMethod::GetInfo => &[
                ("balance", ScalarKind::Float),
                ("blocks", ScalarKind::Integer),
                ("moneysupply", ScalarKind::Float),
            ],
            RpcMethod::GetBlockchainInfo => &[("blocks", ScalarKind::Integer)],
            RpcMethod::GetWalletInfo => &[
                ("balance", ScalarKind::Float),
                ("txcount", ScalarKind::Integer),
            ],
            RpcMethod::GetStakingInfo => &[("staking", ScalarKind::Bool)],
        }
    }
}

impl From<InfoMethod> for RpcMethod {
    fn from(method: InfoMethod) -> Self {
        match method {
            InfoMethod::GetInfo => RpcMethod::GetInfo,
            InfoMethod::GetBlockchainInfo => RpcMethod::GetBlockchainInfo,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JsonRpcRequest<'a> {
    pub method: &'a str,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<Value>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
pub struct JsonRpcError {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}
