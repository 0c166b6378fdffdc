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

use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::dispatcher::{DispatchContext, Dispatcher};
use crate::logging::{Diagnostics, LogSink, TracingSink};
use crate::{
    CallArg, ConfigurationError, DispatchError, Formatter, MethodOp, MethodSchema, PendingCall,
    RequestIdGenerator, Transport,
};

#[cfg(feature = "ethereum")]
mod ethereum;

/// This struct is used for configuring a [`Client`].
#[derive(Clone)]
pub struct ClientOptions {
    debug: bool,
    logger: Arc<dyn LogSink>,
    json_indent: usize,
    id_bound: u64,
    initial_request_id: Option<u64>,
    method_prefix: String,
}

impl ClientOptions {
    pub const METHOD_PREFIX_DEFAULT: &'static str = "eth_";

    /// Constructs a new builder.
    pub fn builder() -> ClientOptionsBuilder {
        ClientOptionsBuilder::default()
    }

    /// Checks if diagnostic output is enabled.
    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Gets the number of spaces used for indenting JSON in diagnostic output.
    pub fn json_indent(&self) -> usize {
        self.json_indent
    }

    /// Gets the (exclusive) upper bound for request identifiers.
    pub fn id_bound(&self) -> u64 {
        self.id_bound
    }

    /// Gets the first request identifier to use, if set explicitly.
    pub fn initial_request_id(&self) -> Option<u64> {
        self.initial_request_id
    }

    /// Gets the prefix stripped from wire method names to derive operation names.
    pub fn method_prefix(&self) -> &str {
        &self.method_prefix
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        ClientOptions::builder().build()
    }
}

impl Debug for ClientOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientOptions")
            .field("debug", &self.debug)
            .field("json_indent", &self.json_indent)
            .field("id_bound", &self.id_bound)
            .field("initial_request_id", &self.initial_request_id)
            .field("method_prefix", &self.method_prefix)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing `ClientOptions`.
#[derive(Clone)]
pub struct ClientOptionsBuilder {
    debug: bool,
    logger: Arc<dyn LogSink>,
    json_indent: usize,
    id_bound: u64,
    initial_request_id: Option<u64>,
    method_prefix: String,
}

impl Default for ClientOptionsBuilder {
    fn default() -> Self {
        Self {
            debug: false,
            logger: Arc::new(TracingSink),
            json_indent: 0,
            id_bound: RequestIdGenerator::DEFAULT_BOUND,
            initial_request_id: None,
            method_prefix: ClientOptions::METHOD_PREFIX_DEFAULT.to_string(),
        }
    }
}

impl ClientOptionsBuilder {
    /// Enables or disables diagnostic output.
    #[must_use]
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Sets the sink that diagnostic output is written to.
    ///
    /// Defaults to [`TracingSink`].
    #[must_use]
    pub fn with_logger<L: LogSink + 'static>(mut self, logger: L) -> Self {
        self.logger = Arc::new(logger);
        self
    }

    #[must_use]
    pub fn with_json_indent(mut self, json_indent: usize) -> Self {
        self.json_indent = json_indent;
        self
    }

    /// Sets the (exclusive) upper bound for request identifiers.
    ///
    /// A bound of zero is rejected when the client is created.
    #[must_use]
    pub fn with_id_bound(mut self, id_bound: u64) -> Self {
        self.id_bound = id_bound;
        self
    }

    /// Sets the identifier of the first request.
    ///
    /// If not set, the client starts at a random position below the bound.
    #[must_use]
    pub fn with_initial_request_id(mut self, initial_request_id: u64) -> Self {
        self.initial_request_id = Some(initial_request_id);
        self
    }

    /// Sets the prefix to strip from wire method names.
    #[must_use]
    pub fn with_method_prefix(mut self, method_prefix: impl Into<String>) -> Self {
        self.method_prefix = method_prefix.into();
        self
    }

    /// Construct a `ClientOptions` from this builder.
    pub fn build(self) -> ClientOptions {
        ClientOptions {
            debug: self.debug,
            logger: self.logger,
            json_indent: self.json_indent,
            id_bound: self.id_bound,
            initial_request_id: self.initial_request_id,
            method_prefix: self.method_prefix,
        }
    }
}

/// Exposes the methods of an RPC protocol as callable operations.
///
/// A client binds a [`Transport`], a [`MethodSchema`] and a [`Formatter`]. It provides one
/// [`MethodOp`] per method of the schema, named after the method's wire name without the
/// configured protocol prefix (e.g. `getBalance` for `eth_getBalance`).
///
/// # Examples
///
/// ```rust
/// use std::sync::Arc;
/// use eth_query::{Client, ClientOptions, MethodSchema, StatusCode};
/// # use async_trait::async_trait;
/// # use eth_query::{FormatError, Formatter, Reply, Request, RpcStatus, Transport};
/// # use serde_json::{json, Value};
/// #
/// # struct Echo;
/// # #[async_trait]
/// # impl Transport for Echo {
/// #     async fn send(&self, request: Request) -> Result<Reply, RpcStatus> {
/// #         Ok(Reply::Bare(Value::Array(request.params)))
/// #     }
/// # }
/// # struct Identity;
/// # impl Formatter for Identity {
/// #     fn format_inputs(&self, _method: &str, args: &[Value]) -> Result<Vec<Value>, FormatError> {
/// #         Ok(args.to_vec())
/// #     }
/// #     fn format_outputs(&self, _method: &str, raw: &Value) -> Result<Value, FormatError> {
/// #         Ok(raw.clone())
/// #     }
/// # }
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let schema = MethodSchema::from_json(&json!({ "eth_echo": [["S", "S"], "S", 1] }))?;
/// let client = Client::new(
///     Arc::new(Echo),
///     Arc::new(schema),
///     Arc::new(Identity),
///     ClientOptions::default(),
/// )?;
///
/// let echo = client.method("echo").expect("operation should exist");
/// assert_eq!(echo.call(vec![json!("hello")]).await?, json!(["hello"]));
/// # Ok(())
/// # }
/// ```
pub struct Client {
    operations: BTreeMap<String, MethodOp>,
    schema: Arc<MethodSchema>,
    request_ids: Arc<RequestIdGenerator>,
    diagnostics: Diagnostics,
    options: ClientOptions,
}

impl Client {
    /// Creates a new client.
    ///
    /// # Errors
    ///
    /// Returns an error if
    /// * the request identifier settings of the options are invalid,
    /// * a method's name is empty once the protocol prefix has been stripped,
    /// * two methods map to the same operation name once the protocol prefix has been stripped.
    pub fn new(
        transport: Arc<dyn Transport>,
        schema: Arc<MethodSchema>,
        formatter: Arc<dyn Formatter>,
        options: ClientOptions,
    ) -> Result<Self, ConfigurationError> {
        let request_ids = Arc::new(match options.initial_request_id {
            Some(initial) => RequestIdGenerator::starting_at(options.id_bound, initial)?,
            None => RequestIdGenerator::new(options.id_bound)?,
        });
        let diagnostics = Diagnostics::new(
            options.debug,
            options.logger.clone(),
            options.json_indent,
        );
        let dispatcher = Dispatcher::new(DispatchContext {
            formatter,
            transport,
            request_ids: request_ids.clone(),
            diagnostics: diagnostics.clone(),
        });

        let mut operations = BTreeMap::new();
        for descriptor in schema.iter() {
            let wire_name = descriptor.wire_name();
            let name = wire_name
                .strip_prefix(options.method_prefix.as_str())
                .unwrap_or(wire_name);
            if name.is_empty() {
                return Err(ConfigurationError::EmptyMethodName);
            }
            if operations.contains_key(name) {
                return Err(ConfigurationError::DuplicateOperation {
                    name: name.to_string(),
                });
            }
            operations.insert(
                name.to_string(),
                dispatcher.synthesize(name, descriptor.clone()),
            );
        }
        debug!(
            operations = operations.len(),
            first_request_id = request_ids.current(),
            "created RPC client"
        );

        Ok(Client {
            operations,
            schema,
            request_ids,
            diagnostics,
            options,
        })
    }

    /// Gets the operation for a method.
    ///
    /// # Arguments
    ///
    /// * `name` - The method's wire name without protocol prefix.
    pub fn method(&self, name: &str) -> Option<&MethodOp> {
        self.operations.get(name)
    }

    /// Gets the names of all operations exposed by this client, in lexicographic order.
    pub fn methods(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    /// Invokes an operation by name.
    ///
    /// Invoking an unknown operation settles the call with [`DispatchError::UnknownMethod`].
    pub fn invoke(&self, name: &str, args: Vec<CallArg>) -> PendingCall {
        match self.operations.get(name) {
            Some(operation) => operation.apply(args),
            None => {
                self.diagnostics
                    .log_with(|| format!("no operation named {} exists", name));
                PendingCall::failed_with_args(DispatchError::UnknownMethod(name.to_string()), args)
            }
        }
    }

    /// Writes a line of diagnostic output, if enabled.
    pub fn log(&self, message: &str) {
        self.diagnostics.log(message);
    }

    /// Renders a value as JSON, using the configured indentation.
    pub fn stringify<T: Serialize + ?Sized>(&self, value: &T) -> String {
        self.diagnostics.stringify(value)
    }

    pub fn schema(&self) -> &MethodSchema {
        &self.schema
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    /// Gets the generator that request identifiers are drawn from.
    pub fn request_ids(&self) -> &RequestIdGenerator {
        &self.request_ids
    }
}
