//! OpenTelemetry 适配层。
//!
//! # 设计定位（Why）
//! - 本 crate 只负责“注册与升级”，不实现聚合与导出；生产环境通常把 OpenTelemetry SDK
//!   作为真实后端。本模块把任意 `opentelemetry::metrics::MeterProvider` 包装为
//!   [`crate::MeterProvider`]，可直接交给 [`set_meter_provider`](crate::set_meter_provider)。
//!
//! # 映射规则（How）
//! - Meter：`versioned_meter(name, version, schema_url)`；
//! - 同步仪表：`u64_counter`、`i64_up_down_counter`、`f64_histogram`；
//! - 可观测仪表：`f64_observable_*`，回调经 `with_callback` 注册，每次采集调用一次 [`Callback::poll`]；
//! - 属性按类型逐一转换为 `opentelemetry::KeyValue`，不做字符串化。
//!
//! # 契约说明（What）
//! - 可观测仪表的采集由 OpenTelemetry 的读取管线驱动，适配层上的 `observe` 返回空批次，
//!   避免与管线争抢批次迭代器。

use std::sync::Arc;

use opentelemetry::{
    KeyValue as OtelKeyValue, Value as OtelValue,
    metrics::{self as otel, AsyncInstrument},
};

use crate::{
    attributes::{AttributeSet, KeyValue, MetricAttributeValue},
    instrument::{
        Callback, Counter, Histogram, Instrument, InstrumentDescriptor, Measurement,
        ObservableCounter, ObservableGauge, ObservableUpDownCounter, UpDownCounter,
    },
    meter::{Meter, MeterProvider, MeterScope},
};

/// 包装 OpenTelemetry MeterProvider 的真实后端。
#[derive(Debug, Clone)]
pub struct OtelMeterProvider<P> {
    inner: P,
}

impl<P> OtelMeterProvider<P> {
    pub fn new(inner: P) -> Self {
        Self { inner }
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P> MeterProvider for OtelMeterProvider<P>
where
    P: otel::MeterProvider + Send + Sync,
{
    fn meter_with_scope(&self, scope: MeterScope) -> Arc<dyn Meter> {
        let inner = self.inner.versioned_meter(
            scope.name().to_owned(),
            scope.version().map(str::to_owned),
            scope.schema_url().map(str::to_owned),
            None,
        );
        Arc::new(OtelMeter { scope, inner })
    }
}

/// OpenTelemetry Meter 的适配。
pub struct OtelMeter {
    scope: MeterScope,
    inner: otel::Meter,
}

impl Meter for OtelMeter {
    fn scope(&self) -> &MeterScope {
        &self.scope
    }

    fn create_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Counter> {
        let inner = self
            .inner
            .u64_counter(descriptor.name().to_owned())
            .with_description(descriptor.description().to_owned())
            .with_unit(unit_of(&descriptor))
            .init();
        Arc::new(OtelSync { descriptor, inner })
    }

    fn create_up_down_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn UpDownCounter> {
        let inner = self
            .inner
            .i64_up_down_counter(descriptor.name().to_owned())
            .with_description(descriptor.description().to_owned())
            .with_unit(unit_of(&descriptor))
            .init();
        Arc::new(OtelSync { descriptor, inner })
    }

    fn create_histogram(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Histogram> {
        let inner = self
            .inner
            .f64_histogram(descriptor.name().to_owned())
            .with_description(descriptor.description().to_owned())
            .with_unit(unit_of(&descriptor))
            .init();
        Arc::new(OtelSync { descriptor, inner })
    }

    fn create_observable_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableCounter> {
        let handle = self
            .inner
            .f64_observable_counter(descriptor.name().to_owned())
            .with_description(descriptor.description().to_owned())
            .with_unit(unit_of(&descriptor))
            .with_callback(bridge(callback))
            .init();
        Arc::new(OtelObservable {
            descriptor,
            _handle: handle,
        })
    }

    fn create_observable_gauge(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableGauge> {
        let handle = self
            .inner
            .f64_observable_gauge(descriptor.name().to_owned())
            .with_description(descriptor.description().to_owned())
            .with_unit(unit_of(&descriptor))
            .with_callback(bridge(callback))
            .init();
        Arc::new(OtelObservable {
            descriptor,
            _handle: handle,
        })
    }

    fn create_observable_up_down_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableUpDownCounter> {
        let handle = self
            .inner
            .f64_observable_up_down_counter(descriptor.name().to_owned())
            .with_description(descriptor.description().to_owned())
            .with_unit(unit_of(&descriptor))
            .with_callback(bridge(callback))
            .init();
        Arc::new(OtelObservable {
            descriptor,
            _handle: handle,
        })
    }
}

fn unit_of(descriptor: &InstrumentDescriptor) -> otel::Unit {
    otel::Unit::new(descriptor.unit().to_owned())
}

/// 将回调转换为 OpenTelemetry 的采集闭包：每次采集 poll 一批，逐条上报。
fn bridge(callback: Callback) -> impl Fn(&dyn AsyncInstrument<f64>) + Send + Sync + 'static {
    move |observer: &dyn AsyncInstrument<f64>| {
        for measurement in callback.poll() {
            observer.observe(
                measurement.value,
                &to_otel_attributes(measurement.attributes.as_slice()),
            );
        }
    }
}

/// 属性转换，保留原始类型。
pub fn to_otel_attributes(attributes: AttributeSet<'_>) -> Vec<OtelKeyValue> {
    attributes.iter().map(to_otel_key_value).collect()
}

fn to_otel_key_value(kv: &KeyValue<'_>) -> OtelKeyValue {
    let value = match &kv.value {
        MetricAttributeValue::Text(text) => OtelValue::from(text.to_string()),
        MetricAttributeValue::Bool(flag) => OtelValue::from(*flag),
        MetricAttributeValue::F64(number) => OtelValue::from(*number),
        MetricAttributeValue::I64(number) => OtelValue::from(*number),
    };
    OtelKeyValue::new(kv.key.to_string(), value)
}

/// 同步仪表适配：`I` 为 OpenTelemetry 的 `Counter<u64>`、`UpDownCounter<i64>` 或 `Histogram<f64>`。
struct OtelSync<I> {
    descriptor: InstrumentDescriptor,
    inner: I,
}

impl<I: Send + Sync> Instrument for OtelSync<I> {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

impl Counter for OtelSync<otel::Counter<u64>> {
    fn add(&self, value: u64, attributes: AttributeSet<'_>) {
        self.inner.add(value, &to_otel_attributes(attributes));
    }
}

impl UpDownCounter for OtelSync<otel::UpDownCounter<i64>> {
    fn add(&self, value: i64, attributes: AttributeSet<'_>) {
        self.inner.add(value, &to_otel_attributes(attributes));
    }
}

impl Histogram for OtelSync<otel::Histogram<f64>> {
    fn record(&self, value: f64, attributes: AttributeSet<'_>) {
        self.inner.record(value, &to_otel_attributes(attributes));
    }
}

/// 可观测仪表适配；持有 OpenTelemetry 句柄以保持回调注册存活。
struct OtelObservable<H> {
    descriptor: InstrumentDescriptor,
    _handle: H,
}

impl<H: Send + Sync> Instrument for OtelObservable<H> {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

impl ObservableCounter for OtelObservable<otel::ObservableCounter<f64>> {
    fn observe(&self) -> Vec<Measurement> {
        Vec::new()
    }
}

impl ObservableGauge for OtelObservable<otel::ObservableGauge<f64>> {
    fn observe(&self) -> Vec<Measurement> {
        Vec::new()
    }
}

impl ObservableUpDownCounter for OtelObservable<otel::ObservableUpDownCounter<f64>> {
    fn observe(&self) -> Vec<Measurement> {
        Vec::new()
    }
}
