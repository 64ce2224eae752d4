// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the dispatcher hot path: contract validation and
// routed log calls.

use std::sync::Arc;

use criterion::{BatchSize, Criterion, black_box, criterion_group, criterion_main};

use beacon_bridge::plugins::LOGS_CHANNEL;
use beacon_bridge::plugins::logs::LOGS_CONTRACTS;
use beacon_bridge::stub::RecordingSdk;
use beacon_bridge::{Bridge, Looper, MethodCall};
use beacon_core::BridgeConfig;
use beacon_core::value::{DynamicValue, ValueMap};

// ---------------------------------------------------------------------------
// Helper: a bridge with one live logger
// ---------------------------------------------------------------------------

fn bridge() -> (Arc<RecordingSdk>, Bridge) {
    let sdk = Arc::new(RecordingSdk::new());
    let looper = Looper::spawn("beacon-bench-ui").expect("spawn looper");
    let bridge = Bridge::new(sdk.clone(), Arc::new(looper), BridgeConfig::default());

    let create = MethodCall::new("createLogger", ValueMap::new())
        .with("loggerHandle", "bench")
        .with("configuration", ValueMap::new());
    assert!(bridge.handle(LOGS_CHANNEL, &create).is_success());
    (sdk, bridge)
}

fn info_call(handle: &str) -> MethodCall {
    let mut context = ValueMap::new();
    context.insert("screen".into(), "checkout".into());
    context.insert("items".into(), 3i64.into());
    context.insert(
        "skus".into(),
        DynamicValue::List((0..8).map(|i| format!("sku-{i}").into()).collect()),
    );
    MethodCall::new("info", ValueMap::new())
        .with("loggerHandle", handle)
        .with("message", "cart updated")
        .with("context", context)
}

fn bench_contracts(c: &mut Criterion) {
    let contract = LOGS_CONTRACTS.lookup("log").expect("log contract");
    let valid = info_call("bench").with("logLevel", "LogLevel.info").arguments;
    let mut invalid = valid.clone();
    invalid.insert("message".into(), 42i32.into());

    c.bench_function("contract_validate_ok", |b| {
        b.iter(|| contract.validate(black_box(&valid)))
    });

    c.bench_function("contract_validate_wrong_type", |b| {
        b.iter(|| contract.validate(black_box(&invalid)))
    });
}

fn bench_dispatch(c: &mut Criterion) {
    let (sdk, bridge) = bridge();
    let live = info_call("bench");
    let unknown = info_call("missing");

    c.bench_function("dispatch_log_live_handle", |b| {
        b.iter_batched(
            || sdk.calls().clear(),
            |()| bridge.handle(LOGS_CHANNEL, black_box(&live)),
            BatchSize::SmallInput,
        )
    });

    c.bench_function("dispatch_log_unknown_handle", |b| {
        b.iter(|| bridge.handle(LOGS_CHANNEL, black_box(&unknown)))
    });
}

criterion_group!(benches, bench_contracts, bench_dispatch);
criterion_main!(benches);
