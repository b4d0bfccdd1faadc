use crate::NodeError;
use alloy_json_rpc::{Id, Request, Response, ResponsePayload, RpcSend};
use serde::de::DeserializeOwned;
use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// Request timeout for every JSON-RPC call.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Minimal blocking JSON-RPC 2.0 client over HTTP.
#[derive(Debug)]
pub struct RpcClient {
    url: String,
    http: reqwest::blocking::Client,
    id: AtomicU64,
}

impl RpcClient {
    /// Creates a client for the endpoint at `url`.
    pub fn new(url: impl Into<String>) -> Result<Self, NodeError> {
        let http = reqwest::blocking::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { url: url.into(), http, id: AtomicU64::new(1) })
    }

    /// The endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Sends `method` with `params` and decodes the result into `T`.
    ///
    /// A `null` result decodes as JSON `null`, so `T = Option<_>` observes missing objects.
    pub fn request<P: RpcSend, T: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<T, NodeError> {
        let id = self.id.fetch_add(1, Ordering::Relaxed);
        trace!(target: "chainprop::node", id, method, "request");
        let request = Request::new(method, Id::Number(id), params);
        let response: Response =
            self.http.post(&self.url).json(&request).send()?.error_for_status()?.json()?;
        decode_response(method, response)
    }
}

fn decode_response<T: DeserializeOwned>(
    method: &'static str,
    response: Response,
) -> Result<T, NodeError> {
    match response.payload {
        ResponsePayload::Success(result) => serde_json::from_str(result.get())
            .map_err(|source| NodeError::Decode { method, source }),
        ResponsePayload::Failure(error) => {
            let (code, message) = (error.code, error.message.into_owned());
            debug!(target: "chainprop::node", method, code, %message, "rpc error");
            Err(NodeError::Rpc { code, message })
        }
    }
}
