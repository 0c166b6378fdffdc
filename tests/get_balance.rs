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

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use eth_query::{
    ArityError, CallArg, Client, ClientOptions, DispatchError, ErrorKind, LocalTransport, Reply,
    Request, RequestHandler, RpcStatus, StatusCode, Transport,
};
use futures::future::join_all;
use serde_json::{json, Value};

const ACCOUNT: &str = "0x407d73d8a49eeb85d32cf465507dd71d507100c1";

#[derive(Default)]
struct RecordingHandler {
    invocations: AtomicUsize,
    params: Mutex<Vec<Vec<Value>>>,
}

#[async_trait::async_trait]
impl RequestHandler for RecordingHandler {
    async fn handle_request(&self, params: Vec<Value>) -> Result<Value, RpcStatus> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        self.params.lock().unwrap().push(params);
        // let other pending calls make progress
        tokio::task::yield_now().await;
        Ok(json!("0x0234c8a3397aab58"))
    }
}

async fn setup(options: ClientOptions) -> (Arc<RecordingHandler>, Arc<LocalTransport>, Client) {
    let handler = Arc::new(RecordingHandler::default());
    let transport = Arc::new(LocalTransport::new());
    transport
        .register_handler("eth_getBalance", handler.clone())
        .await
        .unwrap();
    let client = Client::ethereum(transport.clone(), options).unwrap();
    (handler, transport, client)
}

#[tokio::test]
async fn test_get_balance_resolves_decoded_quantity() {
    let (handler, _transport, client) = setup(ClientOptions::default()).await;
    let (tx, rx) = tokio::sync::oneshot::channel();

    let balance = client
        .get_balance(vec![
            CallArg::param(ACCOUNT.to_uppercase().replace("0X", "0x")),
            CallArg::callback(move |outcome| {
                let _ = tx.send(outcome.cloned().map_err(DispatchError::kind));
            }),
        ])
        .await
        .unwrap();

    assert_eq!(balance, json!(158_972_490_234_375_000_u64));
    assert_eq!(rx.await.unwrap(), Ok(balance));
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 1);
    // the address has been normalized and the block defaulted
    assert_eq!(
        *handler.params.lock().unwrap(),
        vec![vec![json!(ACCOUNT), json!("latest")]]
    );
}

#[tokio::test]
async fn test_get_balance_with_explicit_block_number() {
    let (handler, _transport, client) = setup(ClientOptions::default()).await;

    client
        .invoke("getBalance", vec![CallArg::param(ACCOUNT), CallArg::param(1_000_000)])
        .await
        .unwrap();

    assert_eq!(
        *handler.params.lock().unwrap(),
        vec![vec![json!(ACCOUNT), json!("0xf4240")]]
    );
}

#[tokio::test]
async fn test_get_balance_without_arguments_does_not_reach_transport() {
    let options = ClientOptions::builder()
        .with_id_bound(1_000)
        .with_initial_request_id(7)
        .build();
    let (handler, _transport, client) = setup(options).await;

    let result = client.get_balance(vec![]).await;

    assert!(result.is_err_and(|e| matches!(
        e,
        DispatchError::Arity(ArityError::TooFew { required: 1, supplied: 0, .. })
    )));
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 0);
    assert_eq!(client.request_ids().current(), 7);
}

/// Records the identifiers of all requests passing through to a [`LocalTransport`].
struct RecordingTransport {
    inner: Arc<LocalTransport>,
    request_ids: Mutex<Vec<u64>>,
}

#[async_trait::async_trait]
impl Transport for RecordingTransport {
    async fn send(&self, request: Request) -> Result<Reply, RpcStatus> {
        self.request_ids.lock().unwrap().push(request.id);
        self.inner.send(request).await
    }
}

#[tokio::test]
async fn test_concurrent_calls_use_distinct_request_ids() {
    let handler = Arc::new(RecordingHandler::default());
    let local = Arc::new(LocalTransport::new());
    local
        .register_handler("eth_getBalance", handler.clone())
        .await
        .unwrap();
    let transport = Arc::new(RecordingTransport {
        inner: local,
        request_ids: Mutex::new(Vec::new()),
    });
    let client = Client::ethereum(transport.clone(), ClientOptions::default()).unwrap();
    let start = client.request_ids().current();

    let results = join_all((0..10).map(|_| client.get_balance(vec![CallArg::param(ACCOUNT)]))).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(handler.invocations.load(Ordering::SeqCst), 10);
    let seen = transport.request_ids.lock().unwrap().clone();
    assert_eq!(seen.len(), 10);
    assert_eq!(seen.iter().collect::<HashSet<_>>().len(), 10);
    assert_eq!(
        client.request_ids().current(),
        (start + 10) % client.request_ids().bound()
    );
}

#[tokio::test]
async fn test_unregistered_method_is_reported_as_transport_error() {
    let (_handler, transport, client) = setup(ClientOptions::default()).await;
    transport.unregister_handler("eth_getBalance").await.unwrap();

    let result = client.get_balance(vec![CallArg::param(ACCOUNT)]).await;

    assert!(result.is_err_and(|e| e.kind() == ErrorKind::Transport
        && e.status().map(RpcStatus::code) == Some(StatusCode::Rpc(-32601))));
}
