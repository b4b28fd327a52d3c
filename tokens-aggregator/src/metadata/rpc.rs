use http_client::{FetchError, RetryingFetcher};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: [&'a str; 1],
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, address: &'a str) -> Self {
        Self {
            jsonrpc: "2.0",
            id: 1,
            method,
            params: [address],
        }
    }
}

/// Only `result` matters; an error object from the node is treated like a missing result.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Option<Value>,
}

/// Posts a single-address call and returns its `result`, if the node sent a non-null one.
pub async fn call(
    fetcher: &RetryingFetcher,
    url: &str,
    method: &str,
    address: &str,
) -> Result<Option<Value>, FetchError> {
    let request = RpcRequest::new(method, address);

    let response: RpcResponse = fetcher.fetch(|client| client.post(url).json(&request)).await?;

    Ok(response.result.filter(|result| !result.is_null()))
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn request_shape() {
        let request = RpcRequest::new("getTokenSupply", "So1anaMint");

        assert_eq!(
            serde_json::to_value(request).unwrap(),
            json!({"jsonrpc": "2.0", "id": 1, "method": "getTokenSupply", "params": ["So1anaMint"]})
        );
    }

    #[test]
    fn error_response_has_no_result() {
        let response: RpcResponse =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "error": {"code": -32602, "message": "invalid"}}))
                .unwrap();

        assert!(response.result.is_none());
    }
}
