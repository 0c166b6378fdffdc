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

#[cfg(feature = "ethereum")]
mod hex_formatter;

#[cfg(feature = "ethereum")]
pub use hex_formatter::HexFormatter;

/// An error indicating that a value could not be converted to or from its wire representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatError {
    message: String,
    tag: Option<String>,
    position: Option<usize>,
}

impl FormatError {
    pub fn new<M: Into<String>>(message: M) -> Self {
        FormatError {
            message: message.into(),
            tag: None,
            position: None,
        }
    }

    /// Creates an error for a value that does not match a formatter tag.
    pub fn for_tag<T, M>(tag: T, message: M) -> Self
    where
        T: Into<String>,
        M: Into<String>,
    {
        FormatError {
            message: message.into(),
            tag: Some(tag.into()),
            position: None,
        }
    }

    /// Records the (zero based) position of the offending parameter.
    #[must_use]
    pub fn at_position(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    pub fn position(&self) -> Option<usize> {
        self.position
    }
}

impl Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(position) = self.position {
            f.write_fmt(format_args!("parameter {}: ", position))?;
        }
        if let Some(tag) = self.tag.as_ref() {
            f.write_fmt(format_args!("invalid {} value: ", tag))?;
        }
        f.write_str(&self.message)
    }
}

impl Error for FormatError {}

/// Converts method arguments to their wire representation and raw results back to typed values.
///
/// The conversion rules for the individual formatter tags are entirely up to the implementation.
/// Implementations are shared by all invocations of a client and must therefore not keep any
/// per call state.
#[cfg_attr(any(test, feature = "test-util"), mockall::automock)]
pub trait Formatter: Send + Sync {
    /// Converts the arguments of an invocation of a method.
    ///
    /// # Arguments
    ///
    /// * `method` - The wire name of the invoked method.
    /// * `args` - The arguments supplied by the caller, including any injected default value.
    ///
    /// # Errors
    ///
    /// Returns an error if any of the arguments cannot be converted.
    fn format_inputs(&self, method: &str, args: &[Value]) -> Result<Vec<Value>, FormatError>;

    /// Converts the raw result of an invocation of a method.
    ///
    /// # Errors
    ///
    /// Returns an error if the raw result cannot be converted.
    fn format_outputs(&self, method: &str, raw: &Value) -> Result<Value, FormatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_position_and_tag() {
        let err = FormatError::for_tag("D20", "expected 20 bytes").at_position(0);
        assert_eq!(
            err.to_string(),
            "parameter 0: invalid D20 value: expected 20 bytes"
        );
        assert_eq!(FormatError::new("boom").to_string(), "boom");
    }
}
