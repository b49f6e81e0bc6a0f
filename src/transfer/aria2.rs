// Copyright (c) 2024-2025 Jesse Morgan / Morgan Forge
// SPDX-License-Identifier: AGPL-3.0-or-later

//! aria2 JSON-RPC client.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{TransferClient, TransferOptions};
use crate::download::{JobId, JobState};
use crate::errors::{RpcError, SubmissionError};
use crate::utils::mask_sensitive;

/// Timeout for a single RPC call (in seconds).
const RPC_TIMEOUT_SECS: u64 = 10;

/// Fields requested from `aria2.tellStatus`.
const STATUS_KEYS: [&str; 3] = ["gid", "status", "errorMessage"];

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorObject {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StatusReply {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
}

/// Client for an aria2 daemon started with `--enable-rpc`.
#[derive(Debug)]
pub struct Aria2Client {
    rpc_url: String,
    secret: Option<String>,
    client: reqwest::Client,
    next_id: AtomicU64,
}

impl Aria2Client {
    pub fn new(rpc_url: impl Into<String>, secret: Option<String>) -> Result<Self, RpcError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(RPC_TIMEOUT_SECS))
            .build()
            .map_err(|e| RpcError::Unreachable(format!("HTTP client: {}", e)))?;
        let rpc_url = rpc_url.into();
        debug!(
            rpc_url = %rpc_url,
            secret = %secret.as_deref().map(|s| mask_sensitive(s, 2)).unwrap_or_default(),
            "aria2 client ready"
        );

        Ok(Self {
            rpc_url,
            secret: secret.filter(|s| !s.is_empty()),
            client,
            next_id: AtomicU64::new(1),
        })
    }

    pub fn rpc_url(&self) -> &str {
        &self.rpc_url
    }

    /// JSON-RPC request body, with the `token:` parameter first when a secret is set.
    fn request_body(&self, id: u64, method: &str, params: Vec<Value>) -> Value {
        let mut all = Vec::with_capacity(params.len() + 1);
        if let Some(secret) = &self.secret {
            all.push(Value::String(format!("token:{}", secret)));
        }
        all.extend(params);
        json!({
            "jsonrpc": "2.0",
            "id": format!("trackhaul-{}", id),
            "method": method,
            "params": all,
        })
    }

    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = self.request_body(id, method, params);

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::Unreachable(e.to_string()))?;

        // aria2 reports RPC errors with HTTP 400, so the body is read either way.
        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| RpcError::Unreachable(e.to_string()))?;
        parse_reply(&bytes).map_err(|err| match err {
            RpcError::InvalidResponse(msg) if !status.is_success() => {
                RpcError::InvalidResponse(format!("HTTP {}: {}", status, msg))
            }
            other => other,
        })
    }
}

fn parse_reply(bytes: &[u8]) -> Result<Value, RpcError> {
    let reply: RpcReply =
        serde_json::from_slice(bytes).map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
    if let Some(error) = reply.error {
        return Err(RpcError::Rpc {
            code: error.code,
            message: error.message,
        });
    }
    reply
        .result
        .ok_or_else(|| RpcError::InvalidResponse("reply has neither result nor error".into()))
}

fn parse_status(result: Value) -> Result<JobState, RpcError> {
    let reply: StatusReply =
        serde_json::from_value(result).map_err(|e| RpcError::InvalidResponse(e.to_string()))?;
    let message = reply.error_message.filter(|m| !m.is_empty());
    Ok(JobState::from_daemon(&reply.status, message))
}

#[async_trait]
impl TransferClient for Aria2Client {
    async fn submit(
        &self,
        uri: &str,
        dir: &Path,
        out: &str,
        options: &TransferOptions,
    ) -> Result<JobId, SubmissionError> {
        let options = options.to_daemon_options(dir, out);
        let result = self
            .call("aria2.addUri", vec![json!([uri]), json!(options)])
            .await
            .map_err(|cause| SubmissionError {
                out: out.to_string(),
                cause,
            })?;

        match result {
            Value::String(gid) => Ok(JobId::new(gid)),
            other => Err(SubmissionError {
                out: out.to_string(),
                cause: RpcError::InvalidResponse(format!("expected a gid, got {}", other)),
            }),
        }
    }

    async fn status(&self, job: &JobId) -> Result<JobState, RpcError> {
        let result = self
            .call("aria2.tellStatus", vec![json!(job.as_str()), json!(STATUS_KEYS)])
            .await?;
        parse_status(result)
    }
}
