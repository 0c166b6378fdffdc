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

use std::sync::Arc;

use serde::Serialize;
use serde_json::ser::PrettyFormatter;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use tracing::debug;

/// The target used for diagnostic events emitted via `tracing`.
pub const LOG_TARGET: &str = "eth_query";

/// A destination for diagnostic output.
///
/// Any `Fn(&str)` closure is a `LogSink`.
pub trait LogSink: Send + Sync {
    /// Writes a single, already formatted diagnostic line.
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line)
    }
}

/// A [`LogSink`] that emits each line as a `tracing` event at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        debug!(target: LOG_TARGET, "{}", line);
    }
}

/// Writes debug-gated diagnostic lines and renders values for them.
#[derive(Clone)]
pub(crate) struct Diagnostics {
    enabled: bool,
    sink: Arc<dyn LogSink>,
    json_indent: usize,
}

impl Diagnostics {
    pub(crate) fn new(enabled: bool, sink: Arc<dyn LogSink>, json_indent: usize) -> Self {
        Diagnostics {
            enabled,
            sink,
            json_indent,
        }
    }

    /// Writes a line to the sink, if diagnostics are enabled.
    ///
    /// The message is only rendered if it is actually written.
    pub(crate) fn log_with<F>(&self, message: F)
    where
        F: FnOnce() -> String,
    {
        if self.enabled {
            self.sink.log(&format_line(&message()));
        }
    }

    pub(crate) fn log(&self, message: &str) {
        self.log_with(|| message.to_string());
    }

    /// Renders a value as JSON, using the configured indentation.
    pub(crate) fn stringify<T: Serialize + ?Sized>(&self, value: &T) -> String {
        let rendered = if self.json_indent == 0 {
            serde_json::to_string(value)
        } else {
            let indent = " ".repeat(self.json_indent);
            let mut buf = Vec::new();
            let mut serializer = serde_json::Serializer::with_formatter(
                &mut buf,
                PrettyFormatter::with_indent(indent.as_bytes()),
            );
            value
                .serialize(&mut serializer)
                .map(|_| String::from_utf8_lossy(&buf).into_owned())
        };
        rendered.unwrap_or_else(|err| format!("<unserializable value: {}>", err))
    }
}

fn format_line(message: &str) -> String {
    let timestamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::from("-"));
    format!("[eth-query {}] {}", timestamp, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;

    use serde_json::json;

    fn capturing_sink() -> (Arc<Mutex<Vec<String>>>, Arc<dyn LogSink>) {
        let lines = Arc::new(Mutex::new(Vec::new()));
        let captured = lines.clone();
        let sink = move |line: &str| captured.lock().unwrap().push(line.to_string());
        (lines, Arc::new(sink))
    }

    #[test]
    fn test_lines_are_written_only_if_enabled() {
        let (lines, sink) = capturing_sink();
        Diagnostics::new(false, sink.clone(), 0).log("hidden");
        assert!(lines.lock().unwrap().is_empty());

        Diagnostics::new(true, sink, 0).log("visible");
        let lines = lines.lock().unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("[eth-query "));
        assert!(lines[0].ends_with("] visible"));
    }

    #[test]
    fn test_disabled_diagnostics_do_not_render_messages() {
        let (_lines, sink) = capturing_sink();
        Diagnostics::new(false, sink, 0).log_with(|| panic!("message must not be rendered"));
    }

    #[test]
    fn test_stringify_honors_indentation() {
        let (_lines, sink) = capturing_sink();
        let value = json!({"a": [1]});
        assert_eq!(
            Diagnostics::new(false, sink.clone(), 0).stringify(&value),
            r#"{"a":[1]}"#
        );
        assert_eq!(
            Diagnostics::new(false, sink, 2).stringify(&value),
            "{\n  \"a\": [\n    1\n  ]\n}"
        );
    }
}
