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

use serde_json::Value;
use thiserror::Error;

use crate::{FormatError, RpcStatus};

/// An error indicating that a [`Client`](crate::Client) or one of its building blocks
/// cannot be created from the given inputs.
///
/// This is the only kind of error that is reported synchronously. Failures of individual
/// method invocations are always reported through the call's completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// Indicates that the upper bound for request identifiers is zero.
    InvalidIdBound,
    /// Indicates that the initial request identifier is not below the configured bound.
    InvalidInitialId { initial: u64, bound: u64 },
    /// Indicates that a method descriptor violates one of its invariants.
    InvalidDescriptor { method: String, reason: String },
    /// Indicates that two wire methods map to the same operation name once the
    /// protocol prefix has been stripped.
    DuplicateOperation { name: String },
    /// Indicates that a method name is empty, or becomes empty when stripping the protocol prefix.
    EmptyMethodName,
}

impl ConfigurationError {
    pub(crate) fn invalid_descriptor<M, R>(method: M, reason: R) -> Self
    where
        M: Into<String>,
        R: Into<String>,
    {
        Self::InvalidDescriptor {
            method: method.into(),
            reason: reason.into(),
        }
    }
}

impl Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::InvalidIdBound => {
                f.write_str("request identifier bound must be greater than zero")
            }
            ConfigurationError::InvalidInitialId { initial, bound } => f.write_fmt(format_args!(
                "initial request identifier {} is not below bound {}",
                initial, bound
            )),
            ConfigurationError::InvalidDescriptor { method, reason } => f.write_fmt(
                format_args!("invalid descriptor for method {}: {}", method, reason),
            ),
            ConfigurationError::DuplicateOperation { name } => f.write_fmt(format_args!(
                "more than one method maps to operation name {}",
                name
            )),
            ConfigurationError::EmptyMethodName => f.write_str("method name must not be empty"),
        }
    }
}

impl Error for ConfigurationError {}

fn json_list(values: &[Value]) -> Value {
    Value::Array(values.to_vec())
}

/// Indicates that a method has been invoked with an unsupported number of arguments.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ArityError {
    #[error(
        "too few arguments: method {method} requires at least {required} argument(s), \
         first parameter of type {}, but {supplied} were supplied",
        .first_param.as_deref().unwrap_or("<none>")
    )]
    TooFew {
        method: String,
        required: usize,
        first_param: Option<String>,
        supplied: usize,
    },
    #[error(
        "too many arguments: method {method} accepts at most {max} argument(s), got {}",
        json_list(.args)
    )]
    TooMany {
        method: String,
        max: usize,
        args: Vec<Value>,
    },
}

/// The failure classes of a method invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    UnknownMethod,
    Arity,
    InputFormat,
    Transport,
    OutputFormat,
}

/// An error indicating why a method invocation has failed.
///
/// Transport failures and error responses returned by the remote peer are both reported
/// as [`DispatchError::Transport`]. Callers can not (and should not) tell them apart by kind.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no method named {0} is exposed by this client")]
    UnknownMethod(String),
    #[error(transparent)]
    Arity(#[from] ArityError),
    #[error(
        "error while formatting inputs {} for method {method}: {source}",
        json_list(.args)
    )]
    InputFormat {
        method: String,
        args: Vec<Value>,
        #[source]
        source: FormatError,
    },
    #[error("error while querying the RPC provider for method {method}: {status}")]
    Transport { method: String, status: RpcStatus },
    #[error("error while formatting data {raw} from the RPC for method {method}: {source}")]
    OutputFormat {
        method: String,
        raw: Value,
        #[source]
        source: FormatError,
    },
}

impl DispatchError {
    /// Gets the failure class of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DispatchError::UnknownMethod(_) => ErrorKind::UnknownMethod,
            DispatchError::Arity(_) => ErrorKind::Arity,
            DispatchError::InputFormat { .. } => ErrorKind::InputFormat,
            DispatchError::Transport { .. } => ErrorKind::Transport,
            DispatchError::OutputFormat { .. } => ErrorKind::OutputFormat,
        }
    }

    /// Gets the name of the method that the failed invocation targeted.
    pub fn method(&self) -> &str {
        match self {
            DispatchError::UnknownMethod(method) => method,
            DispatchError::Arity(ArityError::TooFew { method, .. })
            | DispatchError::Arity(ArityError::TooMany { method, .. }) => method,
            DispatchError::InputFormat { method, .. }
            | DispatchError::Transport { method, .. }
            | DispatchError::OutputFormat { method, .. } => method,
        }
    }

    /// Gets the status reported by the transport or the remote peer, if this is a
    /// [`ErrorKind::Transport`] error.
    pub fn status(&self) -> Option<&RpcStatus> {
        if let DispatchError::Transport { status, .. } = self {
            Some(status)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::StatusCode;

    #[test]
    fn test_arity_error_messages_name_method_and_arguments() {
        let too_few = ArityError::TooFew {
            method: "eth_getBalance".to_string(),
            required: 1,
            first_param: Some("D20".to_string()),
            supplied: 0,
        };
        let msg = too_few.to_string();
        assert!(msg.contains("eth_getBalance"));
        assert!(msg.contains("D20"));

        let too_many = ArityError::TooMany {
            method: "eth_blockNumber".to_string(),
            max: 0,
            args: vec![json!("0x1")],
        };
        assert!(too_many.to_string().contains(r#"["0x1"]"#));
    }

    #[test]
    fn test_kind_and_method_accessors() {
        let err = DispatchError::Transport {
            method: "eth_gasPrice".to_string(),
            status: RpcStatus::fail_with_code(StatusCode::Unavailable, "connection refused"),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.method(), "eth_gasPrice");
        assert!(err
            .status()
            .is_some_and(|status| status.code() == StatusCode::Unavailable));

        let err = DispatchError::from(ArityError::TooFew {
            method: "eth_sign".to_string(),
            required: 2,
            first_param: None,
            supplied: 1,
        });
        assert_eq!(err.kind(), ErrorKind::Arity);
        assert_eq!(err.method(), "eth_sign");
        assert!(err.status().is_none());
    }

    #[test]
    fn test_configuration_error_display() {
        let err = ConfigurationError::InvalidInitialId {
            initial: 10,
            bound: 10,
        };
        assert_eq!(
            err.to_string(),
            "initial request identifier 10 is not below bound 10"
        );
    }
}
