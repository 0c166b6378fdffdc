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
The read-only catalog of methods that a [`Client`](crate::Client) exposes.

Each [`MethodDescriptor`] declares the formatter tags of a method's positional parameters, the
shape of its result and how many arguments callers need to supply. The dispatch engine only ever
reads the schema; it is built once and shared by all invocations.
*/

use std::collections::BTreeMap;

use serde_json::Value;

use crate::ConfigurationError;

#[cfg(feature = "ethereum")]
pub mod ethereum;

/// The value that is appended to the arguments of a call that supplies fewer arguments than
/// the method's [default threshold](MethodDescriptor::default_threshold).
pub const DEFAULT_BLOCK_TAG: &str = "latest";

/// The shape of a method's result.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OutputShape {
    /// A single value of the given formatter tag.
    Single(String),
    /// A list of values of the given formatter tag.
    ListOf(String),
}

impl OutputShape {
    /// Gets the formatter tag of the (element) values.
    pub fn tag(&self) -> &str {
        match self {
            OutputShape::Single(tag) | OutputShape::ListOf(tag) => tag,
        }
    }

    fn from_json(method: &str, value: &Value) -> Result<Self, ConfigurationError> {
        if let Some(tag) = value.as_str() {
            return Ok(OutputShape::Single(tag.to_string()));
        }
        match value.as_array().map(|tags| tags.as_slice()) {
            Some([Value::String(tag)]) => Ok(OutputShape::ListOf(tag.to_owned())),
            Some(_) | None => Err(ConfigurationError::invalid_descriptor(
                method,
                "output formatter must be a tag or a single element list of a tag",
            )),
        }
    }
}

/// Describes the parameters and result of a single RPC method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodDescriptor {
    wire_name: String,
    param_formatters: Vec<String>,
    output: OutputShape,
    min_required: usize,
    default_threshold: Option<usize>,
}

impl MethodDescriptor {
    /// Creates a new method descriptor.
    ///
    /// # Arguments
    ///
    /// * `wire_name` - The name of the method as used on the wire, e.g. `eth_getBalance`.
    /// * `param_formatters` - The formatter tags of the method's positional parameters. The number of tags
    ///                        is the maximum number of arguments the method accepts.
    /// * `output` - The shape of the method's result.
    /// * `min_required` - The minimum number of arguments that callers need to supply.
    /// * `default_threshold` - If set, calls supplying fewer arguments get [`DEFAULT_BLOCK_TAG`] appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the wire name is empty, if `min_required` exceeds the number of
    /// parameters or if `default_threshold` exceeds the number of parameters.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eth_query::{MethodDescriptor, OutputShape};
    ///
    /// let get_balance = MethodDescriptor::new(
    ///     "eth_getBalance",
    ///     vec!["D20".to_string(), "Q|T".to_string()],
    ///     OutputShape::Single("Q".to_string()),
    ///     1,
    ///     Some(2),
    /// );
    /// assert!(get_balance.is_ok_and(|desc| desc.max_args() == 2));
    ///
    /// let broken = MethodDescriptor::new("eth_sign", vec![], OutputShape::Single("D".to_string()), 1, None);
    /// assert!(broken.is_err());
    /// ```
    pub fn new<N: Into<String>>(
        wire_name: N,
        param_formatters: Vec<String>,
        output: OutputShape,
        min_required: usize,
        default_threshold: Option<usize>,
    ) -> Result<Self, ConfigurationError> {
        let wire_name = wire_name.into();
        if wire_name.is_empty() {
            return Err(ConfigurationError::EmptyMethodName);
        }
        if min_required > param_formatters.len() {
            return Err(ConfigurationError::invalid_descriptor(
                wire_name,
                format!(
                    "minimum number of arguments ({}) exceeds number of parameters ({})",
                    min_required,
                    param_formatters.len()
                ),
            ));
        }
        if let Some(threshold) = default_threshold {
            if threshold > param_formatters.len() {
                return Err(ConfigurationError::invalid_descriptor(
                    wire_name,
                    format!(
                        "default argument threshold ({}) exceeds number of parameters ({})",
                        threshold,
                        param_formatters.len()
                    ),
                ));
            }
        }
        Ok(MethodDescriptor {
            wire_name,
            param_formatters,
            output,
            min_required,
            default_threshold,
        })
    }

    pub fn wire_name(&self) -> &str {
        &self.wire_name
    }

    pub fn param_formatters(&self) -> &[String] {
        &self.param_formatters
    }

    pub fn output(&self) -> &OutputShape {
        &self.output
    }

    pub fn min_required(&self) -> usize {
        self.min_required
    }

    pub fn default_threshold(&self) -> Option<usize> {
        self.default_threshold
    }

    /// Gets the maximum number of arguments the method accepts.
    pub fn max_args(&self) -> usize {
        self.param_formatters.len()
    }

    /// Gets the formatter tag of the parameter at the given position.
    pub fn param_formatter(&self, position: usize) -> Option<&str> {
        self.param_formatters.get(position).map(String::as_str)
    }
}

/// A catalog of method descriptors, keyed by wire name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MethodSchema {
    methods: BTreeMap<String, MethodDescriptor>,
}

impl MethodSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a method to this schema.
    ///
    /// # Returns
    ///
    /// The descriptor previously registered under the same wire name, if any.
    pub fn insert(&mut self, descriptor: MethodDescriptor) -> Option<MethodDescriptor> {
        self.methods
            .insert(descriptor.wire_name().to_string(), descriptor)
    }

    pub fn get(&self, wire_name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(wire_name)
    }

    pub fn contains(&self, wire_name: &str) -> bool {
        self.methods.contains_key(wire_name)
    }

    /// Iterates over all descriptors in wire name order.
    pub fn iter(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    /// Creates a schema from its tabular JSON representation.
    ///
    /// The representation is an object mapping each wire name to a list of
    /// `[param_formatters, output, min_required, default_threshold]`. The last two slots may be
    /// omitted, `min_required` then defaults to zero.
    ///
    /// # Errors
    ///
    /// Returns an error if the given value does not follow the tabular representation or if
    /// any of the entries violates the invariants checked by [`MethodDescriptor::new`].
    ///
    /// # Examples
    ///
    /// ```rust
    /// use eth_query::MethodSchema;
    /// use serde_json::json;
    ///
    /// let schema = MethodSchema::from_json(&json!({
    ///     "eth_getBalance": [["D20", "Q|T"], "Q", 1, 2],
    ///     "eth_accounts": [[], ["D20"]],
    /// }))
    /// .unwrap();
    /// assert_eq!(schema.len(), 2);
    /// assert_eq!(schema.get("eth_getBalance").unwrap().default_threshold(), Some(2));
    /// ```
    pub fn from_json(value: &Value) -> Result<Self, ConfigurationError> {
        let Some(entries) = value.as_object() else {
            return Err(ConfigurationError::invalid_descriptor(
                "<schema>",
                "schema must be an object mapping method names to descriptors",
            ));
        };
        entries
            .iter()
            .map(|(name, entry)| descriptor_from_json(name, entry))
            .collect()
    }
}

impl FromIterator<MethodDescriptor> for MethodSchema {
    fn from_iter<T: IntoIterator<Item = MethodDescriptor>>(iter: T) -> Self {
        let mut schema = MethodSchema::new();
        iter.into_iter().for_each(|descriptor| {
            schema.insert(descriptor);
        });
        schema
    }
}

fn descriptor_from_json(name: &str, entry: &Value) -> Result<MethodDescriptor, ConfigurationError> {
    let Some(slots) = entry.as_array() else {
        return Err(ConfigurationError::invalid_descriptor(
            name,
            "descriptor must be a list",
        ));
    };
    let mut slots = slots.iter();

    let param_formatters = slots
        .next()
        .and_then(Value::as_array)
        .ok_or_else(|| {
            ConfigurationError::invalid_descriptor(name, "parameter formatters must be a list")
        })?
        .iter()
        .map(|tag| {
            tag.as_str().map(str::to_string).ok_or_else(|| {
                ConfigurationError::invalid_descriptor(name, "parameter formatter must be a string")
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let output = slots
        .next()
        .ok_or_else(|| ConfigurationError::invalid_descriptor(name, "missing output formatter"))
        .and_then(|value| OutputShape::from_json(name, value))?;

    let min_required = match slots.next() {
        Some(value) => count_from_json(name, "minimum number of arguments", value)?,
        None => 0,
    };
    let default_threshold = match slots.next() {
        Some(Value::Null) | None => None,
        Some(value) => Some(count_from_json(name, "default argument threshold", value)?),
    };

    MethodDescriptor::new(
        name,
        param_formatters,
        output,
        min_required,
        default_threshold,
    )
}

fn count_from_json(name: &str, what: &str, value: &Value) -> Result<usize, ConfigurationError> {
    value
        .as_u64()
        .and_then(|count| usize::try_from(count).ok())
        .ok_or_else(|| {
            ConfigurationError::invalid_descriptor(
                name,
                format!("{} must be a non-negative integer", what),
            )
        })
}
