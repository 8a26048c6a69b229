use std::{hint::black_box, sync::Arc};

use criterion::{Criterion, criterion_group, criterion_main};
use spark_metrics::{
    KeyValue, NoopMeterProvider, ProviderDiscovery, RegistrationState, prelude::*,
};

/// 对比三种计数器句柄的单次记录开销：直接空实现、未绑定代理、已绑定代理。
///
/// # 设计目的（Why）
/// - 代理仪表在记录路径上只多一次“一次写入槽位”的读取；基准用于防止后续改动把锁引入热路径。
///
/// # 执行逻辑（How）
/// - 三个句柄都以空后端为最终目标，差异只来自代理转发本身。
fn bench_counter_add(c: &mut Criterion) {
    let attrs = [KeyValue::new("route", "/bench")];

    let direct = NoopMeterProvider::new()
        .get_meter("bench", None, None)
        .create_counter("direct".into());

    let unbound_state =
        RegistrationState::with_discovery(ProviderDiscovery::from_env().with_lookup(|_| None));
    let unbound = unbound_state
        .get_meter("bench", None)
        .map(|meter| meter.create_counter("unbound".into()));

    let bound_state =
        RegistrationState::with_discovery(ProviderDiscovery::from_env().with_lookup(|_| None));
    let bound = bound_state
        .get_meter("bench", None)
        .map(|meter| meter.create_counter("bound".into()));
    bound_state.set_provider(Arc::new(NoopMeterProvider::new()));

    let mut group = c.benchmark_group("counter_add");
    group.bench_function("noop_direct", |b| {
        b.iter(|| direct.add(black_box(1), black_box(&attrs)))
    });
    if let Ok(unbound) = unbound {
        group.bench_function("proxy_unbound", |b| {
            b.iter(|| unbound.add(black_box(1), black_box(&attrs)))
        });
    }
    if let Ok(bound) = bound {
        group.bench_function("proxy_bound", |b| {
            b.iter(|| bound.add(black_box(1), black_box(&attrs)))
        });
    }
    group.finish();
}

criterion_group!(proxy_benches, bench_counter_add);
criterion_main!(proxy_benches);
