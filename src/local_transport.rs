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

/*!
Provides a local [`Transport`] which routes requests to handlers running in the same process.
*/

use std::collections::HashMap;
use std::error::Error;
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{ErrorObject, Reply, Request, ResponseEnvelope, RpcStatus, StatusCode, Transport};

/// The JSON-RPC error code indicating that the requested method does not exist.
pub const METHOD_NOT_FOUND: i64 = -32601;

/// An error indicating a problem with registering or unregistering a request handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Indicates that a handler has already been registered for the method.
    AlreadyRegistered(String),
    /// Indicates that no handler is registered for the method.
    NoSuchHandler(String),
}

impl Display for RegistrationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistrationError::AlreadyRegistered(method) => f.write_fmt(format_args!(
                "a handler has already been registered for method {}",
                method
            )),
            RegistrationError::NoSuchHandler(method) => f.write_fmt(format_args!(
                "no handler registered for method {}",
                method
            )),
        }
    }
}

impl Error for RegistrationError {}

/// Processes the requests for a single RPC method.
///
/// Any `Fn(Vec<Value>) -> Result<Value, RpcStatus>` closure is a `RequestHandler`.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
#[async_trait]
pub trait RequestHandler: Send + Sync {
    /// Handles a request.
    ///
    /// # Arguments
    ///
    /// * `params` - The (formatted) parameters of the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the request could not be processed. A status with code
    /// [`StatusCode::Rpc`] is sent back to the client as a JSON-RPC error object.
    async fn handle_request(&self, params: Vec<Value>) -> Result<Value, RpcStatus>;
}

#[async_trait]
impl<F> RequestHandler for F
where
    F: Fn(Vec<Value>) -> Result<Value, RpcStatus> + Send + Sync,
{
    async fn handle_request(&self, params: Vec<Value>) -> Result<Value, RpcStatus> {
        self(params)
    }
}

/// A [`Transport`] that can be used to exchange requests within a single process.
///
/// A request sent via [`Transport::send`] is dispatched to the handler registered for the
/// request's method.
#[derive(Default)]
pub struct LocalTransport {
    handlers: RwLock<HashMap<String, Arc<dyn RequestHandler>>>,
    timeout: Option<Duration>,
}

impl LocalTransport {
    pub fn new() -> Self {
        LocalTransport::default()
    }

    /// Creates a transport that fails requests which have not been processed within
    /// the given amount of time.
    pub fn with_timeout(timeout: Duration) -> Self {
        LocalTransport {
            handlers: RwLock::new(HashMap::new()),
            timeout: Some(timeout),
        }
    }

    /// Registers a handler for a method.
    ///
    /// # Errors
    ///
    /// Returns an error if a handler has already been registered for the method.
    pub async fn register_handler<M: Into<String>>(
        &self,
        method: M,
        handler: Arc<dyn RequestHandler>,
    ) -> Result<(), RegistrationError> {
        let method = method.into();
        let mut handlers = self.handlers.write().await;
        if handlers.contains_key(&method) {
            Err(RegistrationError::AlreadyRegistered(method))
        } else {
            handlers.insert(method, handler);
            Ok(())
        }
    }

    /// Unregisters the handler for a method.
    ///
    /// # Errors
    ///
    /// Returns an error if no handler is registered for the method.
    pub async fn unregister_handler(&self, method: &str) -> Result<(), RegistrationError> {
        let mut handlers = self.handlers.write().await;
        handlers
            .remove(method)
            .map(|_handler| ())
            .ok_or_else(|| RegistrationError::NoSuchHandler(method.to_string()))
    }

    async fn dispatch(
        &self,
        handler: Arc<dyn RequestHandler>,
        params: Vec<Value>,
    ) -> Result<Value, RpcStatus> {
        match self.timeout {
            Some(timeout) => tokio::time::timeout(timeout, handler.handle_request(params))
                .await
                .unwrap_or_else(|_elapsed| {
                    Err(RpcStatus::fail_with_code(
                        StatusCode::DeadlineExceeded,
                        "request has not been processed in time",
                    ))
                }),
            None => handler.handle_request(params).await,
        }
    }
}

#[async_trait]
impl Transport for LocalTransport {
    async fn send(&self, request: Request) -> Result<Reply, RpcStatus> {
        // release the lock before invoking the handler
        let handler = self.handlers.read().await.get(&request.method).cloned();
        let Some(handler) = handler else {
            debug!(method = %request.method, "no handler registered for method");
            return Ok(Reply::from(ResponseEnvelope::failure(
                request.id,
                ErrorObject {
                    code: METHOD_NOT_FOUND,
                    message: format!(
                        "the method {} does not exist/is not available",
                        request.method
                    ),
                    data: None,
                },
            )));
        };

        match self.dispatch(handler, request.params).await {
            Ok(result) => Ok(Reply::from(ResponseEnvelope::success(request.id, result))),
            Err(status) => match status.code() {
                StatusCode::Rpc(code) => Ok(Reply::from(ResponseEnvelope::failure(
                    request.id,
                    ErrorObject {
                        code,
                        message: status.message().to_string(),
                        data: status.data().cloned(),
                    },
                ))),
                StatusCode::Unknown
                | StatusCode::Unavailable
                | StatusCode::DeadlineExceeded
                | StatusCode::Cancelled
                | StatusCode::Internal => {
                    debug!(
                        method = %request.method,
                        request_id = request.id,
                        %status,
                        "failed to process request"
                    );
                    Err(status)
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn echo_handler() -> Arc<dyn RequestHandler> {
        Arc::new(|params: Vec<Value>| -> Result<Value, RpcStatus> { Ok(Value::Array(params)) })
    }

    #[tokio::test]
    async fn test_send_dispatches_to_registered_handler() {
        let mut handler = MockRequestHandler::new();
        handler
            .expect_handle_request()
            .once()
            .withf(|params| params == &vec![json!("0x1")])
            .returning(|_params| Ok(json!(true)));
        let transport = LocalTransport::new();
        transport
            .register_handler("eth_uninstallFilter", Arc::new(handler))
            .await
            .unwrap();

        let reply = transport
            .send(Request::new(3, "eth_uninstallFilter", vec![json!("0x1")]))
            .await
            .unwrap();
        assert_eq!(reply, Reply::from(ResponseEnvelope::success(3, json!(true))));
    }

    #[tokio::test]
    async fn test_send_answers_unknown_method_with_error_object() {
        let transport = LocalTransport::new();
        transport
            .register_handler("eth_echo", echo_handler())
            .await
            .unwrap();
        transport.unregister_handler("eth_echo").await.unwrap();

        let status = transport
            .send(Request::new(1, "eth_echo", vec![]))
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(status.code(), StatusCode::Rpc(METHOD_NOT_FOUND));
    }

    #[tokio::test]
    async fn test_registration_errors() {
        let transport = LocalTransport::new();
        transport
            .register_handler("eth_echo", echo_handler())
            .await
            .unwrap();

        assert_eq!(
            transport.register_handler("eth_echo", echo_handler()).await,
            Err(RegistrationError::AlreadyRegistered("eth_echo".to_string()))
        );
        assert_eq!(
            transport.unregister_handler("eth_other").await,
            Err(RegistrationError::NoSuchHandler("eth_other".to_string()))
        );
    }

    #[tokio::test]
    async fn test_handler_errors() {
        let transport = LocalTransport::new();
        transport
            .register_handler(
                "eth_reverted",
                Arc::new(|_params: Vec<Value>| -> Result<Value, RpcStatus> {
                    Err(RpcStatus::fail_with_code(StatusCode::Rpc(3), "execution reverted"))
                }),
            )
            .await
            .unwrap();
        transport
            .register_handler(
                "eth_broken",
                Arc::new(|_params: Vec<Value>| -> Result<Value, RpcStatus> {
                    Err(RpcStatus::fail("database unavailable"))
                }),
            )
            .await
            .unwrap();

        let reverted = transport
            .send(Request::new(1, "eth_reverted", vec![]))
            .await
            .unwrap()
            .into_result()
            .unwrap_err();
        assert_eq!(reverted.code(), StatusCode::Rpc(3));
        assert_eq!(reverted.message(), "execution reverted");

        let broken = transport.send(Request::new(2, "eth_broken", vec![])).await;
        assert!(broken.is_err_and(|status| status.message() == "database unavailable"));
    }

    struct SlowHandler;

    #[async_trait]
    impl RequestHandler for SlowHandler {
        async fn handle_request(&self, _params: Vec<Value>) -> Result<Value, RpcStatus> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(Value::Null)
        }
    }

    #[tokio::test]
    async fn test_send_fails_for_slow_handler() {
        let transport = LocalTransport::with_timeout(Duration::from_millis(20));
        transport
            .register_handler("eth_slow", Arc::new(SlowHandler))
            .await
            .unwrap();

        let result = transport.send(Request::new(1, "eth_slow", vec![])).await;
        assert!(result.is_err_and(|status| status.code() == StatusCode::DeadlineExceeded));
    }
}
