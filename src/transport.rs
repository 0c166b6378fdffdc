/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use std::error::Error;
use std::fmt::Display;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The JSON-RPC protocol version put into every [`Request`].
pub const JSONRPC_VERSION: &str = "2.0";

/// Classifies the failure reported in an [`RpcStatus`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusCode {
    /// The failure could not be classified any further.
    Unknown,
    /// The remote peer could not be reached.
    Unavailable,
    /// No response has been received in time.
    DeadlineExceeded,
    /// The exchange has been cancelled before a response was received.
    Cancelled,
    /// The transport failed internally.
    Internal,
    /// The remote peer has answered with a JSON-RPC error object carrying the given code.
    Rpc(i64),
}

impl Display for StatusCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StatusCode::Unknown => f.write_str("UNKNOWN"),
            StatusCode::Unavailable => f.write_str("UNAVAILABLE"),
            StatusCode::DeadlineExceeded => f.write_str("DEADLINE_EXCEEDED"),
            StatusCode::Cancelled => f.write_str("CANCELLED"),
            StatusCode::Internal => f.write_str("INTERNAL"),
            StatusCode::Rpc(code) => f.write_fmt(format_args!("RPC({})", code)),
        }
    }
}

/// The failure of a request/response exchange as reported by a [`Transport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RpcStatus {
    code: StatusCode,
    message: Option<String>,
    data: Option<Value>,
}

impl RpcStatus {
    /// Creates a status representing a failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eth_query::{RpcStatus, StatusCode};
    ///
    /// let status = RpcStatus::fail("something went wrong");
    /// assert_eq!(status.code(), StatusCode::Unknown);
    /// assert_eq!(status.message(), "something went wrong");
    /// ```
    pub fn fail<M: Into<String>>(msg: M) -> Self {
        Self::fail_with_code(StatusCode::Unknown, msg)
    }

    /// Creates a status representing a failure.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eth_query::{RpcStatus, StatusCode};
    ///
    /// let status = RpcStatus::fail_with_code(StatusCode::DeadlineExceeded, "no response");
    /// assert_eq!(status.code(), StatusCode::DeadlineExceeded);
    /// ```
    pub fn fail_with_code<M: Into<String>>(code: StatusCode, msg: M) -> Self {
        RpcStatus {
            code,
            message: Some(msg.into()),
            data: None,
        }
    }

    /// Adds additional, protocol specific information to this status.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn code(&self) -> StatusCode {
        self.code
    }

    /// Gets this status' error message.
    ///
    /// # Returns
    ///
    /// an empty string if this instance has been created without a message.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or_default()
    }

    pub fn data(&self) -> Option<&Value> {
        self.data.as_ref()
    }
}

impl Display for RpcStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_fmt(format_args!("[{}] {}", self.code, self.message()))
    }
}

impl Error for RpcStatus {}

impl From<ErrorObject> for RpcStatus {
    fn from(value: ErrorObject) -> Self {
        let status = RpcStatus::fail_with_code(StatusCode::Rpc(value.code), value.message);
        match value.data {
            Some(data) => status.with_data(data),
            None => status,
        }
    }
}

/// A JSON-RPC request as handed to a [`Transport`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    pub jsonrpc: String,
    pub id: u64,
    pub method: String,
    pub params: Vec<Value>,
}

impl Request {
    pub fn new<M: Into<String>>(id: u64, method: M, params: Vec<Value>) -> Self {
        Request {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            method: method.into(),
            params,
        }
    }
}

/// The error member of a JSON-RPC response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// A JSON-RPC response.
///
/// A `null` result and an absent result are both represented as `result: None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl ResponseEnvelope {
    /// Creates a successful response for a request.
    pub fn success(id: u64, result: Value) -> Self {
        ResponseEnvelope {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(Value::from(id)),
            result: Some(result),
            error: None,
        }
    }

    /// Creates an error response for a request.
    pub fn failure(id: u64, error: ErrorObject) -> Self {
        ResponseEnvelope {
            jsonrpc: Some(JSONRPC_VERSION.to_string()),
            id: Some(Value::from(id)),
            result: None,
            error: Some(error),
        }
    }
}

/// What a [`Transport`] yields for a successfully completed exchange.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// The bare result value.
    Bare(Value),
    /// The complete response, carrying either a result or an error.
    Envelope(ResponseEnvelope),
}

impl Reply {
    /// Normalizes this reply to the raw result or the error reported by the remote peer.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eth_query::{ErrorObject, Reply, ResponseEnvelope, StatusCode};
    /// use serde_json::json;
    ///
    /// assert_eq!(Reply::Bare(json!("0x1")).into_result(), Ok(json!("0x1")));
    ///
    /// let error = ErrorObject { code: -32000, message: "header not found".to_string(), data: None };
    /// let status = Reply::Envelope(ResponseEnvelope::failure(7, error)).into_result().unwrap_err();
    /// assert_eq!(status.code(), StatusCode::Rpc(-32000));
    /// ```
    pub fn into_result(self) -> Result<Value, RpcStatus> {
        match self {
            Reply::Bare(value) => Ok(value),
            Reply::Envelope(ResponseEnvelope {
                error: Some(error), ..
            }) => Err(RpcStatus::from(error)),
            Reply::Envelope(ResponseEnvelope {
                result, error: None, ..
            }) => Ok(result.unwrap_or(Value::Null)),
        }
    }
}

impl From<ResponseEnvelope> for Reply {
    fn from(value: ResponseEnvelope) -> Self {
        Reply::Envelope(value)
    }
}

/// Performs the request/response exchange with a remote peer.
///
/// Implementations own all connection handling. A `Transport` is expected to report network and
/// I/O failures, as well as timeouts it enforces, by means of an [`RpcStatus`].
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// Sends a request and waits for the corresponding response.
    ///
    /// # Errors
    ///
    /// Returns an error if no response could be obtained.
    async fn send(&self, request: Request) -> Result<Reply, RpcStatus>;
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use test_case::test_case;

    #[test]
    fn test_request_serializes_as_jsonrpc() {
        let request = Request::new(42, "eth_getBalance", vec![json!("0xab"), json!("latest")]);
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "jsonrpc": "2.0",
                "id": 42,
                "method": "eth_getBalance",
                "params": ["0xab", "latest"],
            })
        );
    }

    #[test]
    fn test_envelope_with_null_result_yields_null() {
        let envelope: ResponseEnvelope =
            serde_json::from_value(json!({"jsonrpc": "2.0", "id": 1, "result": null})).unwrap();
        assert_eq!(Reply::from(envelope).into_result(), Ok(Value::Null));
    }

    #[test]
    fn test_envelope_error_takes_precedence_over_result() {
        let envelope: ResponseEnvelope = serde_json::from_value(json!({
            "id": 1,
            "result": "0x1",
            "error": {"code": -32601, "message": "method not found", "data": "eth_foo"},
        }))
        .unwrap();
        let status = Reply::from(envelope).into_result().unwrap_err();
        assert_eq!(status.code(), StatusCode::Rpc(-32601));
        assert_eq!(status.message(), "method not found");
        assert_eq!(status.data(), Some(&json!("eth_foo")));
    }

    #[test]
    fn test_bare_object_is_not_interpreted_as_envelope() {
        let raw = json!({"error": "not an envelope", "result": 1});
        assert_eq!(Reply::Bare(raw.clone()).into_result(), Ok(raw));
    }

    #[test_case(StatusCode::Unknown, "UNKNOWN"; "unknown")]
    #[test_case(StatusCode::Unavailable, "UNAVAILABLE"; "unavailable")]
    #[test_case(StatusCode::DeadlineExceeded, "DEADLINE_EXCEEDED"; "deadline exceeded")]
    #[test_case(StatusCode::Cancelled, "CANCELLED"; "cancelled")]
    #[test_case(StatusCode::Internal, "INTERNAL"; "internal")]
    #[test_case(StatusCode::Rpc(-32000), "RPC(-32000)"; "rpc error")]
    fn test_every_status_code_denotes_a_failure(code: StatusCode, expected: &str) {
        let status = RpcStatus::fail_with_code(code, "failed");
        assert_eq!(status.code(), code);
        assert_eq!(status.to_string(), format!("[{}] failed", expected));
    }

    #[test]
    fn test_status_display() {
        let status = RpcStatus::fail_with_code(StatusCode::Unavailable, "connection refused");
        assert_eq!(status.to_string(), "[UNAVAILABLE] connection refused");
    }
}
