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
The engine behind the operations exposed by a [`Client`](crate::Client).

For each method of a [`MethodSchema`](crate::MethodSchema) a [`MethodOp`] is synthesized. Invoking
an operation runs the same pipeline for every method:

1. check the number of arguments against the method's descriptor, appending the default block
   tag where the descriptor asks for it,
2. convert the arguments to their wire representation using the [`Formatter`],
3. send a [`Request`] with a freshly allocated identifier using the [`Transport`],
4. convert the raw result back using the [`Formatter`].

Every invocation settles exactly once. The outcome is delivered to the returned [`PendingCall`]
and, if one has been supplied, to the callback, both observing the same completion event.
*/

use std::fmt::Debug;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures::future::{BoxFuture, FutureExt};
use serde_json::Value;
use tracing::debug;

use crate::logging::Diagnostics;
use crate::schema::DEFAULT_BLOCK_TAG;
use crate::{
    ArityError, DispatchError, FormatError, Formatter, MethodDescriptor, Reply, Request,
    RequestIdGenerator, RpcStatus, StatusCode, Transport,
};

/// The outcome of a method invocation.
pub type CallResult = Result<Value, DispatchError>;

/// A function to be invoked with the outcome of a method invocation.
pub type Callback = Box<dyn FnOnce(Result<&Value, &DispatchError>) + Send + 'static>;

/// An argument of a variadic invocation via [`MethodOp::apply`].
pub enum CallArg {
    /// A method parameter.
    Param(Value),
    /// A completion callback. Only recognized as such in the last position.
    Callback(Callback),
}

impl CallArg {
    pub fn param<V: Into<Value>>(value: V) -> Self {
        CallArg::Param(value.into())
    }

    pub fn callback<F>(callback: F) -> Self
    where
        F: FnOnce(Result<&Value, &DispatchError>) + Send + 'static,
    {
        CallArg::Callback(Box::new(callback))
    }
}

impl From<Value> for CallArg {
    fn from(value: Value) -> Self {
        CallArg::Param(value)
    }
}

impl Debug for CallArg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallArg::Param(value) => f.debug_tuple("Param").field(value).finish(),
            CallArg::Callback(_) => f.write_str("Callback"),
        }
    }
}

/// The parameters of an invocation, after the trailing callback has been removed.
struct Arguments {
    values: Vec<Value>,
    // position of the first callback found among the parameters
    misplaced_callback: Option<usize>,
}

impl From<Vec<Value>> for Arguments {
    fn from(values: Vec<Value>) -> Self {
        Arguments {
            values,
            misplaced_callback: None,
        }
    }
}

fn split_trailing_callback(mut args: Vec<CallArg>) -> (Arguments, Option<Callback>) {
    let callback = match args.pop() {
        Some(CallArg::Callback(callback)) => Some(callback),
        Some(param @ CallArg::Param(_)) => {
            args.push(param);
            None
        }
        None => None,
    };
    let mut misplaced_callback = None;
    let values = args
        .into_iter()
        .enumerate()
        .map(|(position, arg)| match arg {
            CallArg::Param(value) => value,
            CallArg::Callback(_) => {
                misplaced_callback.get_or_insert(position);
                Value::Null
            }
        })
        .collect();
    (
        Arguments {
            values,
            misplaced_callback,
        },
        callback,
    )
}

/// The single completion slot of an invocation.
///
/// Settling consumes the slot, so the callback can not be invoked more than once. A slot
/// that is dropped without having been settled hands a cancellation error to the callback.
struct Completion {
    method: String,
    callback: Option<Callback>,
}

impl Completion {
    fn new<M: Into<String>>(method: M, callback: Option<Callback>) -> Self {
        Completion {
            method: method.into(),
            callback,
        }
    }

    fn settle(mut self, outcome: CallResult) -> CallResult {
        if let Some(callback) = self.callback.take() {
            callback(outcome.as_ref());
        }
        outcome
    }
}

impl Drop for Completion {
    fn drop(&mut self) {
        if let Some(callback) = self.callback.take() {
            debug!(method = %self.method, "invocation dropped before completion");
            let error = DispatchError::Transport {
                method: std::mem::take(&mut self.method),
                status: RpcStatus::fail_with_code(
                    StatusCode::Cancelled,
                    "invocation dropped before completion",
                ),
            };
            callback(Err(&error));
        }
    }
}

/// The future returned by the invocation of an operation.
///
/// The invocation makes progress while this future is being polled. Callers that are only
/// interested in the callback can [`detach`](Self::detach) the invocation instead.
///
/// Dropping the future before it has completed cancels the invocation. A callback supplied
/// with the invocation then receives a [`DispatchError::Transport`] error with status code
/// [`StatusCode::Cancelled`].
#[must_use = "an invocation does nothing unless polled or detached"]
pub struct PendingCall {
    inner: BoxFuture<'static, CallResult>,
}

impl PendingCall {
    fn new<F>(future: F) -> Self
    where
        F: Future<Output = CallResult> + Send + 'static,
    {
        PendingCall {
            inner: future.boxed(),
        }
    }

    /// Creates an invocation that fails without doing anything.
    pub(crate) fn failed(error: DispatchError, callback: Option<Callback>) -> Self {
        let completion = Completion::new(error.method(), callback);
        PendingCall::new(async move { completion.settle(Err(error)) })
    }

    /// Creates an invocation from a list of variadic arguments that fails without doing anything.
    pub(crate) fn failed_with_args(error: DispatchError, args: Vec<CallArg>) -> Self {
        let (_, callback) = split_trailing_callback(args);
        Self::failed(error, callback)
    }

    /// Runs the invocation to completion on the current tokio runtime.
    ///
    /// # Panics
    ///
    /// if not called from within a tokio runtime.
    pub fn detach(self) -> tokio::task::JoinHandle<CallResult> {
        tokio::spawn(self.inner)
    }
}

impl Future for PendingCall {
    type Output = CallResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        self.inner.poll_unpin(cx)
    }
}

/// What all operations of a client share.
pub(crate) struct DispatchContext {
    pub(crate) formatter: Arc<dyn Formatter>,
    pub(crate) transport: Arc<dyn Transport>,
    pub(crate) request_ids: Arc<RequestIdGenerator>,
    pub(crate) diagnostics: Diagnostics,
}

/// Synthesizes the operations for method descriptors.
pub(crate) struct Dispatcher {
    context: Arc<DispatchContext>,
}

impl Dispatcher {
    pub(crate) fn new(context: DispatchContext) -> Self {
        Dispatcher {
            context: Arc::new(context),
        }
    }

    pub(crate) fn synthesize<N: Into<String>>(
        &self,
        name: N,
        descriptor: MethodDescriptor,
    ) -> MethodOp {
        MethodOp {
            name: name.into(),
            descriptor: Arc::new(descriptor),
            context: self.context.clone(),
        }
    }
}

/// Checks the number of arguments supplied for a method, appending the default value
/// if the descriptor asks for it.
pub(crate) fn check_arity(
    descriptor: &MethodDescriptor,
    mut args: Vec<Value>,
) -> Result<Vec<Value>, ArityError> {
    if args.len() < descriptor.min_required() {
        return Err(ArityError::TooFew {
            method: descriptor.wire_name().to_string(),
            required: descriptor.min_required(),
            first_param: descriptor.param_formatter(0).map(str::to_string),
            supplied: args.len(),
        });
    }
    // the default is appended before checking the maximum, so that it can never cause
    // a call to be rejected
    if descriptor
        .default_threshold()
        .is_some_and(|threshold| args.len() < threshold)
    {
        args.push(Value::from(DEFAULT_BLOCK_TAG));
    }
    if args.len() > descriptor.max_args() {
        return Err(ArityError::TooMany {
            method: descriptor.wire_name().to_string(),
            max: descriptor.max_args(),
            args,
        });
    }
    Ok(args)
}

/// A callable operation bound to a single method.
///
/// Operations are cheap to clone. Invoking an operation never fails synchronously; all
/// failures are reported through the returned [`PendingCall`] and the optional callback.
#[derive(Clone)]
pub struct MethodOp {
    name: String,
    descriptor: Arc<MethodDescriptor>,
    context: Arc<DispatchContext>,
}

impl MethodOp {
    /// Gets the name of this operation, i.e. the method's wire name without protocol prefix.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptor(&self) -> &MethodDescriptor {
        &self.descriptor
    }

    /// Invokes the method.
    ///
    /// # Arguments
    ///
    /// * `params` - The method's parameters.
    pub fn call(&self, params: Vec<Value>) -> PendingCall {
        self.start(Arguments::from(params), None)
    }

    /// Invokes the method, passing the outcome to a callback as well.
    ///
    /// The callback is invoked exactly once, right before the returned future completes with
    /// the same outcome.
    pub fn call_with_callback<F>(&self, params: Vec<Value>, callback: F) -> PendingCall
    where
        F: FnOnce(Result<&Value, &DispatchError>) + Send + 'static,
    {
        self.start(Arguments::from(params), Some(Box::new(callback)))
    }

    /// Invokes the method with a variadic list of arguments.
    ///
    /// If the last argument is a [`CallArg::Callback`] it is used as completion callback. A
    /// callback in any other position counts as a parameter that cannot be formatted.
    pub fn apply(&self, args: Vec<CallArg>) -> PendingCall {
        let (args, callback) = split_trailing_callback(args);
        self.start(args, callback)
    }

    fn start(&self, args: Arguments, callback: Option<Callback>) -> PendingCall {
        self.context.diagnostics.log_with(|| {
            format!(
                "[method '{}'] callback provided: {}",
                self.name,
                callback.is_some()
            )
        });
        let op = self.clone();
        let completion = Completion::new(self.descriptor.wire_name(), callback);
        PendingCall::new(async move { completion.settle(op.execute(args).await) })
    }

    async fn execute(self, args: Arguments) -> CallResult {
        let method = self.descriptor.wire_name();
        let diagnostics = &self.context.diagnostics;
        diagnostics.log_with(|| {
            format!(
                "attempting method {} with params {}",
                self.name,
                diagnostics.stringify(&args.values)
            )
        });

        let params = check_arity(&self.descriptor, args.values)?;
        if let Some(position) = args.misplaced_callback {
            return Err(DispatchError::InputFormat {
                method: method.to_string(),
                args: params,
                source: FormatError::new("a callback must be the last argument")
                    .at_position(position),
            });
        }

        diagnostics.log_with(|| {
            format!(
                "[method '{}'] attempting input formatting of {} inputs",
                self.name,
                params.len()
            )
        });
        let inputs = match self.context.formatter.format_inputs(method, &params) {
            Ok(inputs) => inputs,
            Err(source) => {
                debug!(method, error = %source, "failed to format method inputs");
                return Err(DispatchError::InputFormat {
                    method: method.to_string(),
                    args: params,
                    source,
                });
            }
        };
        diagnostics.log_with(|| {
            format!(
                "[method '{}'] formatted inputs: {}",
                self.name,
                diagnostics.stringify(&inputs)
            )
        });

        let request = Request::new(self.context.request_ids.next(), method, inputs);
        let request_id = request.id;
        diagnostics.log_with(|| {
            format!(
                "[method '{}'] attempting query with formatted inputs...",
                self.name
            )
        });
        let raw = self
            .context
            .transport
            .send(request)
            .await
            .and_then(Reply::into_result)
            .map_err(|status| {
                debug!(method, request_id, %status, "RPC request failed");
                DispatchError::Transport {
                    method: method.to_string(),
                    status,
                }
            })?;

        diagnostics.log_with(|| {
            format!(
                "[method '{}'] callback success, attempting formatting of raw outputs: {}",
                self.name,
                diagnostics.stringify(&raw)
            )
        });
        let output = match self.context.formatter.format_outputs(method, &raw) {
            Ok(output) => output,
            Err(source) => {
                debug!(method, request_id, error = %source, "failed to format method outputs");
                return Err(DispatchError::OutputFormat {
                    method: method.to_string(),
                    raw,
                    source,
                });
            }
        };
        diagnostics.log_with(|| {
            format!(
                "[method '{}'] formatted outputs: {}",
                self.name,
                diagnostics.stringify(&output)
            )
        });
        Ok(output)
    }
}
