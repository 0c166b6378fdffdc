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
This example illustrates how client code can query the balance of an account. The request is
served by a handler registered with a [`LocalTransport`] running in the same process.
 */
use std::sync::Arc;

use async_trait::async_trait;
use eth_query::{
    CallArg, Client, ClientOptions, LocalTransport, RequestHandler, RpcStatus, StatusCode,
};
use serde_json::{json, Value};

const ACCOUNT: &str = "0x407d73d8a49eeb85d32cf465507dd71d507100c1";

struct BalanceOperation {}

#[async_trait]
impl RequestHandler for BalanceOperation {
    async fn handle_request(&self, params: Vec<Value>) -> Result<Value, RpcStatus> {
        match params.first().and_then(Value::as_str) {
            Some(ACCOUNT) => Ok(json!("0x0234c8a3397aab58")),
            Some(_) => Ok(json!("0x0")),
            None => Err(RpcStatus::fail_with_code(
                StatusCode::Rpc(-32602),
                "missing address",
            )),
        }
    }
}

#[tokio::main]
pub async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let transport = Arc::new(LocalTransport::new());
    // register the service operation
    transport
        .register_handler("eth_getBalance", Arc::new(BalanceOperation {}))
        .await?;

    // the client writes its diagnostic output to stdout
    let options = ClientOptions::builder()
        .with_debug(true)
        .with_logger(|line: &str| println!("{}", line))
        .with_json_indent(2)
        .build();
    let client = Client::ethereum(transport.clone(), options)?;

    // the block defaults to "latest"
    let balance = client.get_balance(vec![CallArg::param(ACCOUNT)]).await?;
    println!("balance of {}: {} wei", ACCOUNT, balance);

    // the outcome is also handed to a callback
    let (tx, rx) = tokio::sync::oneshot::channel();
    let _call = client
        .get_balance(vec![
            CallArg::param(ACCOUNT),
            CallArg::param("pending"),
            CallArg::callback(move |outcome| {
                let _ = tx.send(outcome.map(ToString::to_string).map_err(ToString::to_string));
            }),
        ])
        .detach();
    match rx.await? {
        Ok(balance) => println!("callback received balance: {} wei", balance),
        Err(msg) => println!("callback received error: {}", msg),
    }

    // invoking an operation without the required arguments fails
    if let Err(err) = client.get_balance(vec![]).await {
        println!("invocation failed as expected: {}", err);
    }

    transport.unregister_handler("eth_getBalance").await?;
    Ok(())
}
