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

use crate::schema::ethereum;
use crate::{
    CallArg, Client, ClientOptions, ConfigurationError, HexFormatter, PendingCall, Transport,
};

impl Client {
    /// Creates a client for the Ethereum JSON-RPC API.
    ///
    /// The client uses the built-in `eth_*` method catalog and a [`HexFormatter`].
    ///
    /// # Errors
    ///
    /// Returns an error if the given options are invalid.
    pub fn ethereum(
        transport: Arc<dyn Transport>,
        options: ClientOptions,
    ) -> Result<Self, ConfigurationError> {
        let schema = Arc::new(ethereum::schema());
        let formatter = Arc::new(HexFormatter::new(schema.clone()));
        Client::new(transport, schema, formatter, options)
    }
}

macro_rules! operations {
    ($($(#[$attr:meta])* $fn_name:ident => $operation:literal),* $(,)?) => {
        impl Client {
            $(
                $(#[$attr])*
                #[doc = concat!("\n\nInvokes the `", $operation, "` operation, see [`Client::invoke`].")]
                pub fn $fn_name(&self, args: Vec<CallArg>) -> PendingCall {
                    self.invoke($operation, args)
                }
            )*
        }
    };
}

operations! {
    /// Gets the current Ethereum protocol version.
    protocol_version => "protocolVersion",
    /// Gets the synchronization status of the node, or `false` if the node is not syncing.
    syncing => "syncing",
    /// Gets the address that mining rewards go to.
    coinbase => "coinbase",
    mining => "mining",
    /// Gets the number of hashes per second the node is mining with.
    hashrate => "hashrate",
    /// Gets the current price per gas in wei.
    gas_price => "gasPrice",
    /// Gets the addresses owned by the node.
    accounts => "accounts",
    /// Gets the number of the most recent block.
    block_number => "blockNumber",
    /// Gets the balance of an account.
    ///
    /// Arguments: address, optional block number or tag (defaults to `latest`).
    get_balance => "getBalance",
    /// Gets a value from a storage position at a given address.
    get_storage_at => "getStorageAt",
    /// Gets the number of transactions sent from an address.
    get_transaction_count => "getTransactionCount",
    get_block_transaction_count_by_hash => "getBlockTransactionCountByHash",
    get_block_transaction_count_by_number => "getBlockTransactionCountByNumber",
    get_uncle_count_by_block_hash => "getUncleCountByBlockHash",
    get_uncle_count_by_block_number => "getUncleCountByBlockNumber",
    /// Gets the code at a given address.
    get_code => "getCode",
    sign => "sign",
    /// Creates a new message call transaction or a contract creation.
    send_transaction => "sendTransaction",
    send_raw_transaction => "sendRawTransaction",
    /// Executes a new message call immediately without creating a transaction on the block chain.
    call => "call",
    /// Estimates the gas necessary to complete a transaction.
    estimate_gas => "estimateGas",
    get_block_by_hash => "getBlockByHash",
    get_block_by_number => "getBlockByNumber",
    get_transaction_by_hash => "getTransactionByHash",
    get_transaction_by_block_hash_and_index => "getTransactionByBlockHashAndIndex",
    get_transaction_by_block_number_and_index => "getTransactionByBlockNumberAndIndex",
    /// Gets the receipt of a transaction, or `null` if the transaction is still pending.
    get_transaction_receipt => "getTransactionReceipt",
    get_uncle_by_block_hash_and_index => "getUncleByBlockHashAndIndex",
    get_uncle_by_block_number_and_index => "getUncleByBlockNumberAndIndex",
    get_compilers => "getCompilers",
    compile_lll => "compileLLL",
    compile_solidity => "compileSolidity",
    compile_serpent => "compileSerpent",
    /// Creates a filter object to notify when the state changes.
    new_filter => "newFilter",
    new_block_filter => "newBlockFilter",
    new_pending_transaction_filter => "newPendingTransactionFilter",
    uninstall_filter => "uninstallFilter",
    /// Polls a filter, returning the changes that occurred since the last poll.
    get_filter_changes => "getFilterChanges",
    get_filter_logs => "getFilterLogs",
    get_logs => "getLogs",
    get_work => "getWork",
    submit_work => "submitWork",
    submit_hashrate => "submitHashrate",
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::transport::MockTransport;
    use crate::{ErrorKind, Reply, ResponseEnvelope};

    const ADDRESS: &str = "0x407d73d8a49eeb85d32cf465507dd71d507100c1";

    #[test]
    fn test_ethereum_client_exposes_catalog() {
        let client = Client::ethereum(Arc::new(MockTransport::new()), ClientOptions::default())
            .unwrap();
        assert_eq!(client.methods().count(), ethereum::schema().len());
        assert!(client.method("getBalance").is_some());
        assert!(client.method("submitHashrate").is_some());
    }

    #[tokio::test]
    async fn test_get_balance() {
        let mut transport = MockTransport::new();
        transport
            .expect_send()
            .once()
            .withf(|request| {
                request.method == "eth_getBalance"
                    && request.params == vec![json!(ADDRESS), json!("latest")]
            })
            .returning(|request| {
                Ok(Reply::from(ResponseEnvelope::success(
                    request.id,
                    json!("0x0234c8a3397aab58"),
                )))
            });
        let client = Client::ethereum(Arc::new(transport), ClientOptions::default()).unwrap();

        let balance = client.get_balance(vec![CallArg::param(ADDRESS)]).await;
        assert_eq!(balance.unwrap(), json!(158972490234375000_u64));
    }

    #[tokio::test]
    async fn test_typed_method_reports_arity_errors() {
        let mut transport = MockTransport::new();
        transport.expect_send().never();
        let client = Client::ethereum(Arc::new(transport), ClientOptions::default()).unwrap();

        let result = client.get_balance(vec![]).await;
        assert!(result.is_err_and(|e| e.kind() == ErrorKind::Arity));
    }

    #[tokio::test]
    async fn test_typed_method_with_custom_prefix_is_unknown() {
        let options = ClientOptions::builder().with_method_prefix("").build();
        let client = Client::ethereum(Arc::new(MockTransport::new()), options).unwrap();

        let result = client.block_number(vec![]).await;
        assert!(result.is_err_and(|e| e.kind() == ErrorKind::UnknownMethod));
    }
}
