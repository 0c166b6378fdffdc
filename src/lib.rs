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

//! # eth-query
//!
//! A client side dispatch layer exposing the methods of an RPC protocol, by default the Ethereum
//! `eth_*` JSON-RPC API, as callable operations.
//!
//! Each method is described declaratively by a [`MethodDescriptor`]. Invoking the corresponding
//! operation validates the number of arguments, converts the arguments to their wire
//! representation, sends a request via an abstract [`Transport`] and converts the raw result
//! back. The outcome of each invocation is delivered exactly once, both to the returned future
//! and to an optional callback.
//!
//! ## This crate includes:
//!
//! - the [`Client`] façade binding a transport, a method schema and a formatter,
//! - the [`MethodSchema`] catalog of method descriptors, with the built-in Ethereum catalog in
//!   [`schema::ethereum`],
//! - the [`Transport`] and [`Formatter`] capability traits, together with [`HexFormatter`]
//!   (feature `ethereum`) and [`LocalTransport`] (feature `util`),
//! - the [`RequestIdGenerator`] handing out request identifiers.
//!
//! A runnable example querying an account balance through a [`LocalTransport`] can be found
//! in `demos/get_balance.rs`.

mod client;
pub use client::{Client, ClientOptions, ClientOptionsBuilder};

mod dispatcher;
pub use dispatcher::{CallArg, CallResult, Callback, MethodOp, PendingCall};

mod error;
pub use error::{ArityError, ConfigurationError, DispatchError, ErrorKind};

pub mod format;
#[cfg(feature = "ethereum")]
pub use format::HexFormatter;
pub use format::{FormatError, Formatter};

#[cfg(feature = "util")]
mod local_transport;
#[cfg(feature = "util")]
pub use local_transport::{LocalTransport, RegistrationError, RequestHandler, METHOD_NOT_FOUND};
#[cfg(all(feature = "util", any(test, feature = "test-util")))]
pub use local_transport::MockRequestHandler;

mod logging;
pub use logging::{LogSink, TracingSink, LOG_TARGET};

mod request_id;
pub use request_id::RequestIdGenerator;

pub mod schema;
pub use schema::{MethodDescriptor, MethodSchema, OutputShape, DEFAULT_BLOCK_TAG};

pub mod transport;
pub use transport::{
    ErrorObject, Reply, Request, ResponseEnvelope, RpcStatus, StatusCode, Transport,
    JSONRPC_VERSION,
};
