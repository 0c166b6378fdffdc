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

//! The catalog of the Ethereum `eth_*` JSON-RPC methods.

use tracing::warn;

use super::{MethodDescriptor, MethodSchema, OutputShape};

/// The prefix shared by the wire names of all methods in this catalog.
pub const METHOD_PREFIX: &str = "eth_";

enum Out {
    One(&'static str),
    Many(&'static str),
}

type Entry = (
    &'static str,
    &'static [&'static str],
    Out,
    usize,
    Option<usize>,
);

const METHODS: &[Entry] = &[
    ("eth_protocolVersion", &[], Out::One("S"), 0, None),
    ("eth_syncing", &[], Out::One("B|EthSyncing"), 0, None),
    ("eth_coinbase", &[], Out::One("D20"), 0, None),
    ("eth_mining", &[], Out::One("B"), 0, None),
    ("eth_hashrate", &[], Out::One("Q"), 0, None),
    ("eth_gasPrice", &[], Out::One("Q"), 0, None),
    ("eth_accounts", &[], Out::Many("D20"), 0, None),
    ("eth_blockNumber", &[], Out::One("Q"), 0, None),
    ("eth_getBalance", &["D20", "Q|T"], Out::One("Q"), 1, Some(2)),
    ("eth_getStorageAt", &["D20", "Q", "Q|T"], Out::One("D"), 2, Some(3)),
    ("eth_getTransactionCount", &["D20", "Q|T"], Out::One("Q"), 1, Some(2)),
    ("eth_getBlockTransactionCountByHash", &["D32"], Out::One("Q"), 1, None),
    ("eth_getBlockTransactionCountByNumber", &["Q|T"], Out::One("Q"), 1, None),
    ("eth_getUncleCountByBlockHash", &["D32"], Out::One("Q"), 1, None),
    ("eth_getUncleCountByBlockNumber", &["Q|T"], Out::One("Q"), 1, None),
    ("eth_getCode", &["D20", "Q|T"], Out::One("D"), 1, Some(2)),
    ("eth_sign", &["D20", "D"], Out::One("D"), 2, None),
    ("eth_sendTransaction", &["SendTransaction"], Out::One("D32"), 1, None),
    ("eth_sendRawTransaction", &["D"], Out::One("D32"), 1, None),
    ("eth_call", &["CallTransaction", "Q|T"], Out::One("D"), 1, Some(2)),
    ("eth_estimateGas", &["EstimateTransaction", "Q|T"], Out::One("Q"), 1, None),
    ("eth_getBlockByHash", &["D32", "B"], Out::One("Block"), 2, None),
    ("eth_getBlockByNumber", &["Q|T", "B"], Out::One("Block"), 2, None),
    ("eth_getTransactionByHash", &["D32"], Out::One("Transaction"), 1, None),
    ("eth_getTransactionByBlockHashAndIndex", &["D32", "Q"], Out::One("Transaction"), 2, None),
    ("eth_getTransactionByBlockNumberAndIndex", &["Q|T", "Q"], Out::One("Transaction"), 2, None),
    ("eth_getTransactionReceipt", &["D32"], Out::One("Receipt"), 1, None),
    ("eth_getUncleByBlockHashAndIndex", &["D32", "Q"], Out::One("Block"), 2, None),
    ("eth_getUncleByBlockNumberAndIndex", &["Q|T", "Q"], Out::One("Block"), 2, None),
    ("eth_getCompilers", &[], Out::Many("S"), 0, None),
    ("eth_compileLLL", &["S"], Out::One("D"), 1, None),
    ("eth_compileSolidity", &["S"], Out::One("D"), 1, None),
    ("eth_compileSerpent", &["S"], Out::One("D"), 1, None),
    ("eth_newFilter", &["Filter"], Out::One("Q"), 1, None),
    ("eth_newBlockFilter", &[], Out::One("Q"), 0, None),
    ("eth_newPendingTransactionFilter", &[], Out::One("Q"), 0, None),
    ("eth_uninstallFilter", &["Q"], Out::One("B"), 1, None),
    ("eth_getFilterChanges", &["Q"], Out::Many("FilterChange"), 1, None),
    ("eth_getFilterLogs", &["Q"], Out::Many("FilterChange"), 1, None),
    ("eth_getLogs", &["Filter"], Out::Many("FilterChange"), 1, None),
    ("eth_getWork", &[], Out::Many("D"), 0, None),
    ("eth_submitWork", &["D", "D32", "D32"], Out::One("B"), 3, None),
    ("eth_submitHashrate", &["D", "D"], Out::One("B"), 2, None),
];

/// Creates the schema of all `eth_*` methods supported by the typed
/// [`Client`](crate::Client) operations.
pub fn schema() -> MethodSchema {
    METHODS
        .iter()
        .filter_map(|(name, params, output, min_required, threshold)| {
            let output = match output {
                Out::One(tag) => OutputShape::Single(tag.to_string()),
                Out::Many(tag) => OutputShape::ListOf(tag.to_string()),
            };
            MethodDescriptor::new(
                *name,
                params.iter().map(|tag| tag.to_string()).collect(),
                output,
                *min_required,
                *threshold,
            )
            .map_err(|err| warn!(method = *name, "skipping invalid method descriptor: {}", err))
            .ok()
        })
        .collect()
}
