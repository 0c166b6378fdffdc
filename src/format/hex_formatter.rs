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

use std::sync::{Arc, LazyLock};

use regex::Regex;
use serde_json::{Map, Value};

use crate::{Formatter, MethodDescriptor, MethodSchema, OutputShape};

use super::FormatError;

static HEX_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9a-fA-F]*$").expect("pattern is valid"));

const BLOCK_TAGS: [&str; 5] = ["latest", "earliest", "pending", "safe", "finalized"];

const TRANSACTION_INPUT_FIELDS: &[(&str, &str)] = &[
    ("from", "D20"),
    ("to", "D20"),
    ("gas", "Q"),
    ("gasPrice", "Q"),
    ("maxFeePerGas", "Q"),
    ("maxPriorityFeePerGas", "Q"),
    ("value", "Q"),
    ("data", "D"),
    ("input", "D"),
    ("nonce", "Q"),
];

const FILTER_FIELDS: &[(&str, &str)] = &[
    ("fromBlock", "Q|T"),
    ("toBlock", "Q|T"),
    ("address", "D20"),
    ("blockHash", "D32"),
];

const BLOCK_FIELDS: &[(&str, &str)] = &[
    ("number", "Q"),
    ("difficulty", "Q"),
    ("totalDifficulty", "Q"),
    ("size", "Q"),
    ("gasLimit", "Q"),
    ("gasUsed", "Q"),
    ("timestamp", "Q"),
    ("baseFeePerGas", "Q"),
    ("transactions", "[Transaction]"),
];

const TRANSACTION_FIELDS: &[(&str, &str)] = &[
    ("blockNumber", "Q"),
    ("gas", "Q"),
    ("gasPrice", "Q"),
    ("maxFeePerGas", "Q"),
    ("maxPriorityFeePerGas", "Q"),
    ("nonce", "Q"),
    ("transactionIndex", "Q"),
    ("value", "Q"),
    ("type", "Q"),
    ("chainId", "Q"),
    ("v", "Q"),
];

const RECEIPT_FIELDS: &[(&str, &str)] = &[
    ("blockNumber", "Q"),
    ("transactionIndex", "Q"),
    ("cumulativeGasUsed", "Q"),
    ("gasUsed", "Q"),
    ("effectiveGasPrice", "Q"),
    ("status", "Q"),
    ("type", "Q"),
    ("logs", "[FilterChange]"),
];

const LOG_FIELDS: &[(&str, &str)] = &[
    ("logIndex", "Q"),
    ("blockNumber", "Q"),
    ("transactionIndex", "Q"),
];

const SYNCING_FIELDS: &[(&str, &str)] = &[
    ("startingBlock", "Q"),
    ("currentBlock", "Q"),
    ("highestBlock", "Q"),
];

type Fields = &'static [(&'static str, &'static str)];

const NOTHING_REQUIRED: &[&str] = &[];
const SENDER_REQUIRED: &[&str] = &["from"];
const RECIPIENT_REQUIRED: &[&str] = &["to"];

fn input_object_fields(tag: &str) -> Option<(Fields, &'static [&'static str])> {
    match tag {
        "SendTransaction" => Some((TRANSACTION_INPUT_FIELDS, SENDER_REQUIRED)),
        "CallTransaction" => Some((TRANSACTION_INPUT_FIELDS, RECIPIENT_REQUIRED)),
        "EstimateTransaction" => Some((TRANSACTION_INPUT_FIELDS, NOTHING_REQUIRED)),
        "Filter" => Some((FILTER_FIELDS, NOTHING_REQUIRED)),
        _ => None,
    }
}

fn output_object_fields(tag: &str) -> Option<Fields> {
    match tag {
        "Block" => Some(BLOCK_FIELDS),
        "Transaction" => Some(TRANSACTION_FIELDS),
        "Receipt" => Some(RECEIPT_FIELDS),
        "FilterChange" => Some(LOG_FIELDS),
        "EthSyncing" => Some(SYNCING_FIELDS),
        _ => None,
    }
}

fn field_tag<'a>(fields: &'a [(&str, &'a str)], name: &str) -> Option<&'a str> {
    fields
        .iter()
        .find_map(|(field, tag)| (*field == name).then_some(*tag))
}

/// A [`Formatter`] implementing the hex encoding conventions of the Ethereum JSON-RPC API.
///
/// Quantities (`Q`) are sent as minimal `0x` prefixed hex strings and decoded to JSON numbers
/// (or decimal strings, if they do not fit into 64 bits). Data (`D`, `D20`, `D32`) is sent as
/// lowercase `0x` prefixed hex strings. Transaction, filter, block, receipt and log objects are
/// converted field by field.
pub struct HexFormatter {
    schema: Arc<MethodSchema>,
}

impl HexFormatter {
    /// Creates a formatter for the methods of a schema.
    pub fn new(schema: Arc<MethodSchema>) -> Self {
        HexFormatter { schema }
    }

    fn descriptor(&self, method: &str) -> Result<&MethodDescriptor, FormatError> {
        self.schema
            .get(method)
            .ok_or_else(|| FormatError::new(format!("method {} is not part of the schema", method)))
    }
}

impl Formatter for HexFormatter {
    fn format_inputs(&self, method: &str, args: &[Value]) -> Result<Vec<Value>, FormatError> {
        let descriptor = self.descriptor(method)?;
        args.iter()
            .enumerate()
            .map(|(position, arg)| -> Result<Value, FormatError> {
                let tag = descriptor.param_formatter(position).ok_or_else(|| {
                    FormatError::new("method does not accept this many arguments")
                        .at_position(position)
                })?;
                format_input(tag, arg).map_err(|err| err.at_position(position))
            })
            .collect()
    }

    fn format_outputs(&self, method: &str, raw: &Value) -> Result<Value, FormatError> {
        match self.descriptor(method)?.output() {
            OutputShape::Single(tag) => format_output(tag, raw),
            OutputShape::ListOf(tag) => format_output_list(tag, raw),
        }
    }
}

fn format_input(tag: &str, value: &Value) -> Result<Value, FormatError> {
    match tag {
        "Q" => encode_quantity(tag, value),
        "Q|T" => match value.as_str() {
            Some(block_tag) if BLOCK_TAGS.contains(&block_tag) => Ok(value.clone()),
            _ => encode_quantity(tag, value),
        },
        "D" => encode_data(tag, value, None),
        "D20" => match value {
            // filters accept a list of addresses
            Value::Array(addresses) => addresses
                .iter()
                .map(|address| encode_data(tag, address, Some(20)))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            other => encode_data(tag, other, Some(20)),
        },
        "D32" => encode_data(tag, value, Some(32)),
        "B" => expect_bool(tag, value),
        "S" => expect_string(tag, value),
        _ => match input_object_fields(tag) {
            Some((fields, required)) => encode_object(tag, value, fields, required),
            None => Ok(value.clone()),
        },
    }
}

fn encode_quantity(tag: &str, value: &Value) -> Result<Value, FormatError> {
    if let Some(number) = value.as_u64() {
        return Ok(Value::String(format!("0x{:x}", number)));
    }
    let Some(text) = value.as_str() else {
        return Err(FormatError::for_tag(
            tag,
            format!("expected non-negative integer or hex string, got {}", value),
        ));
    };
    if let Some(digits) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        if digits.is_empty() || !HEX_DIGITS.is_match(digits) {
            return Err(FormatError::for_tag(
                tag,
                format!("{} is not a hex quantity", text),
            ));
        }
        let significant = digits.trim_start_matches('0');
        return Ok(Value::String(if significant.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{}", significant.to_ascii_lowercase())
        }));
    }
    text.parse::<u128>()
        .map(|number| Value::String(format!("0x{:x}", number)))
        .map_err(|_| FormatError::for_tag(tag, format!("{} is not a quantity", text)))
}

fn encode_data(tag: &str, value: &Value, byte_len: Option<usize>) -> Result<Value, FormatError> {
    let Some(digits) = value
        .as_str()
        .and_then(|text| text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")))
    else {
        return Err(FormatError::for_tag(
            tag,
            format!("expected 0x prefixed hex string, got {}", value),
        ));
    };
    if !HEX_DIGITS.is_match(digits) {
        return Err(FormatError::for_tag(
            tag,
            format!("{} contains non hex characters", value),
        ));
    }
    if let Some(len) = byte_len {
        if digits.len() != len * 2 {
            return Err(FormatError::for_tag(
                tag,
                format!("expected {} bytes, got {} hex digits", len, digits.len()),
            ));
        }
    }
    let padding = if digits.len() % 2 == 1 { "0" } else { "" };
    Ok(Value::String(format!(
        "0x{}{}",
        padding,
        digits.to_ascii_lowercase()
    )))
}

fn expect_bool(tag: &str, value: &Value) -> Result<Value, FormatError> {
    if value.is_boolean() {
        Ok(value.clone())
    } else {
        Err(FormatError::for_tag(tag, format!("expected boolean, got {}", value)))
    }
}

fn expect_string(tag: &str, value: &Value) -> Result<Value, FormatError> {
    if value.is_string() {
        Ok(value.clone())
    } else {
        Err(FormatError::for_tag(tag, format!("expected string, got {}", value)))
    }
}

fn encode_object(
    tag: &str,
    value: &Value,
    fields: &[(&str, &str)],
    required: &[&str],
) -> Result<Value, FormatError> {
    let Some(object) = value.as_object() else {
        return Err(FormatError::for_tag(tag, format!("expected object, got {}", value)));
    };
    if let Some(missing) = required.iter().find(|name| !object.contains_key(**name)) {
        return Err(FormatError::for_tag(
            tag,
            format!("missing required field {}", missing),
        ));
    }
    object
        .iter()
        .map(|(name, field_value)| -> Result<(String, Value), FormatError> {
            let formatted = match field_tag(fields, name) {
                Some(field_tag) => format_input(field_tag, field_value).map_err(|err| {
                    FormatError::for_tag(tag, format!("field {}: {}", name, err))
                })?,
                None => field_value.clone(),
            };
            Ok((name.clone(), formatted))
        })
        .collect::<Result<Map<String, Value>, FormatError>>()
        .map(Value::Object)
}

fn format_output(tag: &str, raw: &Value) -> Result<Value, FormatError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if let Some(element_tag) = tag.strip_prefix('[').and_then(|t| t.strip_suffix(']')) {
        return format_output_list(element_tag, raw);
    }
    match tag {
        "Q" => decode_quantity(tag, raw),
        "D" | "D20" | "D32" => expect_string(tag, raw)
            .map(|data| Value::String(data.as_str().unwrap_or_default().to_ascii_lowercase())),
        "B" => expect_bool(tag, raw),
        "S" => expect_string(tag, raw),
        "B|EthSyncing" => match raw {
            Value::Bool(_) => Ok(raw.clone()),
            other => decode_object("EthSyncing", other, SYNCING_FIELDS),
        },
        _ => match output_object_fields(tag) {
            Some(fields) => decode_object(tag, raw, fields),
            None => Ok(raw.clone()),
        },
    }
}

fn format_output_list(tag: &str, raw: &Value) -> Result<Value, FormatError> {
    match raw {
        Value::Null => Ok(Value::Null),
        Value::Array(items) => items
            .iter()
            .map(|item| format_output(tag, item))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Err(FormatError::for_tag(
            tag,
            format!("expected list, got {}", other),
        )),
    }
}

fn decode_quantity(tag: &str, raw: &Value) -> Result<Value, FormatError> {
    if raw.is_u64() {
        return Ok(raw.clone());
    }
    let Some(digits) = raw
        .as_str()
        .and_then(|text| text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")))
    else {
        return Err(FormatError::for_tag(
            tag,
            format!("expected hex quantity, got {}", raw),
        ));
    };
    let significant = digits.trim_start_matches('0');
    if significant.is_empty() {
        return if digits.is_empty() {
            Err(FormatError::for_tag(tag, "empty hex quantity"))
        } else {
            Ok(Value::from(0_u64))
        };
    }
    let number = u128::from_str_radix(significant, 16).map_err(|err| {
        FormatError::for_tag(tag, format!("{} is not a 128 bit hex quantity: {}", raw, err))
    })?;
    Ok(match u64::try_from(number) {
        Ok(small) => Value::from(small),
        Err(_) => Value::String(number.to_string()),
    })
}

fn decode_object(tag: &str, raw: &Value, fields: &[(&str, &str)]) -> Result<Value, FormatError> {
    match raw {
        Value::Null => Ok(Value::Null),
        // objects may be referenced by their hash, e.g. the transactions of a block
        Value::String(_) => Ok(raw.clone()),
        Value::Object(object) => object
            .iter()
            .map(|(name, field_value)| -> Result<(String, Value), FormatError> {
                let decoded = match field_tag(fields, name) {
                    Some(field_tag) => format_output(field_tag, field_value).map_err(|err| {
                        FormatError::for_tag(tag, format!("field {}: {}", name, err))
                    })?,
                    None => field_value.clone(),
                };
                Ok((name.clone(), decoded))
            })
            .collect::<Result<Map<String, Value>, FormatError>>()
            .map(Value::Object),
        Value::Bool(_) | Value::Number(_) | Value::Array(_) => Err(FormatError::for_tag(
            tag,
            format!("expected object, got {}", raw),
        )),
    }
}
