// benches/proxy_bench.rs
//! Proxy creation and interception benchmarks

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use proxylab::{MethodCall, ProxyConfig, ProxyMaker, ProxyOptions, TypeRegistry, TypeSpec};
use serde_json::json;
use std::sync::Arc;

fn bench_proxy_creation(c: &mut Criterion) {
    let types = TypeRegistry::new();
    let widget = types
        .define(
            TypeSpec::class("Widget")
                .method_with_body("size", 0, |_, _| Ok(json!(3)))
                .constructor(|_| Ok(())),
        )
        .unwrap();
    let maker = ProxyMaker::new(Arc::clone(&types), ProxyConfig::default());

    c.bench_function("create_proxy_subclass_path", |b| {
        b.iter(|| {
            let result = maker
                .create_proxy(
                    black_box(widget),
                    &[],
                    Arc::new(|_: MethodCall| Ok(json!(0))),
                    ProxyOptions::default().with_default_constructor(),
                )
                .unwrap();
            result.cancel();
        })
    });
}

fn bench_intercepted_invocation(c: &mut Criterion) {
    let types = TypeRegistry::new();
    let widget = types
        .define(
            TypeSpec::class("Widget")
                .method_with_body("size", 0, |_, _| Ok(json!(3)))
                .constructor(|_| Ok(())),
        )
        .unwrap();
    let maker = ProxyMaker::new(Arc::clone(&types), ProxyConfig::default());
    let result = maker
        .create_proxy(
            widget,
            &[],
            Arc::new(|_: MethodCall| Ok(json!(42))),
            ProxyOptions::default().with_default_constructor(),
        )
        .unwrap();
    let proxy = result.value().clone();

    c.bench_function("intercepted_invocation", |b| {
        b.iter(|| proxy.invoke(black_box("size"), &[]).unwrap())
    });
}

criterion_group!(benches, bench_proxy_creation, bench_intercepted_invocation);
criterion_main!(benches);
