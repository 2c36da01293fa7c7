use {
    super::*,
    backon::{ConstantBuilder, Retryable},
    serde_json::Value,
};

#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum RpcError {
    #[snafu(display("HTTP request failed: {source}"))]
    Http { source: reqwest::Error },
    #[snafu(display("HTTP status {status}"))]
    Status { status: StatusCode },
    #[snafu(display("RPC error {code}: {message}"))]
    Rpc { code: i64, message: String },
    #[snafu(display("Failed to decode `{method}` response: {source}"))]
    Decode {
        method: String,
        source: serde_json::Error,
    },
    #[snafu(display("`{method}` returned no result"))]
    EmptyResult { method: String },
}

impl RpcError {
    /// Connection level failure, worth retrying.
    fn is_transport(&self) -> bool {
        matches!(self, Self::Http { source } if !source.is_builder())
    }

    fn is_fatal(&self) -> bool {
        matches!(self, Self::Http { source } if source.is_builder())
    }
}

#[derive(Deserialize)]
struct Reply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<ReplyError>,
}

#[derive(Deserialize)]
struct ReplyError {
    code: i64,
    message: String,
}

/// JSON-RPC client for the node's `getblocktemplate` and `submitblock`.
#[derive(Debug, Clone)]
pub struct NodeClient {
    client: reqwest::Client,
    server: String,
    url: Url,
    auth: Option<(String, String)>,
    template_retry: Duration,
    submit_retry: Duration,
    submit_attempts: usize,
}

impl NodeClient {
    pub fn new(server: &str, auth: Option<(String, String)>) -> Result<Self, MinerError> {
        let endpoint = if server.contains("://") {
            server.to_string()
        } else {
            format!("http://{server}/")
        };

        let url = endpoint
            .parse::<Url>()
            .map_err(|err| MinerError::InvalidEndpoint {
                endpoint: server.into(),
                detail: err.to_string(),
            })?;

        snafu::ensure!(
            matches!(url.scheme(), "http" | "https") && url.host().is_some(),
            error::InvalidEndpointSnafu {
                endpoint: server,
                detail: "expected <HOST:PORT> or an http(s) URL",
            }
        );

        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|source| MinerError::Transport { source })?;

        Ok(Self {
            client,
            server: server.into(),
            url,
            auth,
            template_retry: TEMPLATE_RETRY_INTERVAL,
            submit_retry: SUBMIT_RETRY_INTERVAL,
            submit_attempts: SUBMIT_ATTEMPTS,
        })
    }

    pub fn with_template_retry(mut self, interval: Duration) -> Self {
        self.template_retry = interval;
        self
    }

    pub fn with_submit_retry(mut self, interval: Duration, attempts: usize) -> Self {
        self.submit_retry = interval;
        self.submit_attempts = attempts.max(1);
        self
    }

    pub fn server(&self) -> &str {
        &self.server
    }

    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let mut request = self.client.post(self.url.clone()).json(&json!({
            "jsonrpc": "1.0",
            "id": "solo",
            "method": method,
            "params": params,
        }));

        if let Some((username, password)) = &self.auth {
            request = request.basic_auth(username, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|source| RpcError::Http { source })?;

        let status = response.status();

        let body = response
            .bytes()
            .await
            .map_err(|source| RpcError::Http { source })?;

        // bitcoind reports RPC errors with a 500 status and a JSON body
        let reply = match serde_json::from_slice::<Reply>(&body) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => return Err(RpcError::Status { status }),
            Err(source) => {
                return Err(RpcError::Decode {
                    method: method.into(),
                    source,
                });
            }
        };

        if let Some(ReplyError { code, message }) = reply.error {
            return Err(RpcError::Rpc { code, message });
        }

        Ok(reply.result)
    }

    /// Fetches a segwit block template, retrying until the node answers.
    /// Only an unusable HTTP client is returned as an error.
    pub async fn fetch_template(&self) -> Result<RawTemplate, MinerError> {
        let fetch = || async {
            info!("RPC<{}> getblocktemplate()", self.server);

            let result = self
                .call("getblocktemplate", json!([{ "rules": ["segwit"] }]))
                .await?;

            if result.is_null() {
                return Err(RpcError::EmptyResult {
                    method: "getblocktemplate".into(),
                });
            }

            serde_json::from_value::<RawTemplate>(result).map_err(|source| RpcError::Decode {
                method: "getblocktemplate".into(),
                source,
            })
        };

        let template = fetch
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.template_retry)
                    .without_max_times(),
            )
            .sleep(sleep)
            .when(|err: &RpcError| !err.is_fatal())
            .notify(|err: &RpcError, delay: Duration| {
                error!("Cannot connect to {}: {err}", self.server);
                info!("Trying again in {} seconds ...", delay.as_secs_f64());
            })
            .await;

        template.map_err(|err| match err {
            RpcError::Http { source } => MinerError::Transport { source },
            err => MinerError::InvalidEndpoint {
                endpoint: self.server.clone(),
                detail: err.to_string(),
            },
        })
    }

    /// Submits a hex encoded block. A non-empty response is a rejection and
    /// is not retried. Connection failures are retried a bounded number of
    /// times before the block is given up.
    pub async fn submit_block(&self, block: &str) -> bool {
        let submit = || async {
            info!("RPC<{}> submitblock()", self.server);
            self.call("submitblock", json!([block])).await
        };

        let response = submit
            .retry(
                ConstantBuilder::default()
                    .with_delay(self.submit_retry)
                    .with_max_times(self.submit_attempts - 1),
            )
            .sleep(sleep)
            .when(RpcError::is_transport)
            .notify(|err: &RpcError, delay: Duration| {
                error!("Cannot connect to {}: {err}", self.server);
                info!("Trying again in {} seconds ...", delay.as_secs_f64());
            })
            .await;

        match response {
            Ok(Value::Null) => true,
            Ok(Value::String(reason)) if reason.is_empty() => true,
            Ok(response) => {
                error!("Block rejected, RPC response: {response}");
                false
            }
            Err(err) => {
                error!("Failed to submit block: {err}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_forms() {
        let client = NodeClient::new("127.0.0.1:18443", None).unwrap();
        assert_eq!(client.url.as_str(), "http://127.0.0.1:18443/");
        assert_eq!(client.server(), "127.0.0.1:18443");

        let client = NodeClient::new("http://node.local:8332/wallet/x", None).unwrap();
        assert_eq!(client.url.as_str(), "http://node.local:8332/wallet/x");
    }

    #[test]
    fn malformed_endpoint_is_fatal() {
        assert!(matches!(
            NodeClient::new("127.0.0.1:notaport", None),
            Err(MinerError::InvalidEndpoint { .. })
        ));
        assert!(matches!(
            NodeClient::new("ftp://127.0.0.1:21", None),
            Err(MinerError::InvalidEndpoint { .. })
        ));
    }

    #[test]
    fn submit_attempts_are_at_least_one() {
        let client = NodeClient::new("127.0.0.1:8332", None)
            .unwrap()
            .with_submit_retry(Duration::ZERO, 0);
        assert_eq!(client.submit_attempts, 1);
    }

    #[test]
    fn reply_parsing() {
        let reply: Reply = serde_json::from_str(
            r#"{"result":null,"error":{"code":-8,"message":"bad"},"id":"solo"}"#,
        )
        .unwrap();
        assert!(reply.result.is_null());
        assert_eq!(reply.error.unwrap().code, -8);

        let reply: Reply = serde_json::from_str(r#"{"result":"inconclusive","error":null}"#).unwrap();
        assert_eq!(reply.result, json!("inconclusive"));
        assert!(reply.error.is_none());
    }
}
