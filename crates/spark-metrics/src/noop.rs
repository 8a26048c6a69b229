//! 空操作后端。
//!
//! # 设计定位（Why）
//! - 进程从未配置真实后端、也未通过环境变量发现后端时，插桩代码仍需一个“可用但惰性”的 API：
//!   不抛错、不产生任何可观测副作用，库作者因此可以无条件插桩。
//!
//! # 契约说明（What）
//! - 所有类型均无共享状态；每次创建都返回新的空仪表。
//! - 仪表保留创建时的描述符，便于调用方自省，但记录操作一律丢弃。
//! - 可观测仪表不会调用回调，`observe` 始终返回空批次。

use std::sync::Arc;

use crate::{
    attributes::AttributeSet,
    instrument::{
        Callback, Counter, Histogram, Instrument, InstrumentDescriptor, Measurement,
        ObservableCounter, ObservableGauge, ObservableUpDownCounter, UpDownCounter,
    },
    meter::{Meter, MeterProvider, MeterScope},
};

/// 默认的空 MeterProvider。
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMeterProvider;

impl NoopMeterProvider {
    pub const fn new() -> Self {
        Self
    }
}

impl MeterProvider for NoopMeterProvider {
    fn meter_with_scope(&self, scope: MeterScope) -> Arc<dyn Meter> {
        Arc::new(NoopMeter::new(scope))
    }
}

/// 空 Meter：仅记录自身身份。
#[derive(Debug, Clone)]
pub struct NoopMeter {
    scope: MeterScope,
}

impl NoopMeter {
    pub fn new(scope: MeterScope) -> Self {
        Self { scope }
    }
}

impl Meter for NoopMeter {
    fn scope(&self) -> &MeterScope {
        &self.scope
    }

    fn create_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Counter> {
        Arc::new(NoopInstrument::new(descriptor))
    }

    fn create_up_down_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn UpDownCounter> {
        Arc::new(NoopInstrument::new(descriptor))
    }

    fn create_histogram(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Histogram> {
        Arc::new(NoopInstrument::new(descriptor))
    }

    fn create_observable_counter(
        &self,
        descriptor: InstrumentDescriptor,
        _callback: Callback,
    ) -> Arc<dyn ObservableCounter> {
        Arc::new(NoopInstrument::new(descriptor))
    }

    fn create_observable_gauge(
        &self,
        descriptor: InstrumentDescriptor,
        _callback: Callback,
    ) -> Arc<dyn ObservableGauge> {
        Arc::new(NoopInstrument::new(descriptor))
    }

    fn create_observable_up_down_counter(
        &self,
        descriptor: InstrumentDescriptor,
        _callback: Callback,
    ) -> Arc<dyn ObservableUpDownCounter> {
        Arc::new(NoopInstrument::new(descriptor))
    }
}

/// 满足全部六类仪表契约的空实现。
///
/// 同一类型同时实现同步与可观测仪表 Trait，由 [`NoopMeter`] 按需擦除为对应的 Trait 对象。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoopInstrument {
    descriptor: InstrumentDescriptor,
}

impl NoopInstrument {
    pub fn new(descriptor: InstrumentDescriptor) -> Self {
        Self { descriptor }
    }
}

impl Instrument for NoopInstrument {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

impl Counter for NoopInstrument {
    fn add(&self, _value: u64, _attributes: AttributeSet<'_>) {}
}

impl UpDownCounter for NoopInstrument {
    fn add(&self, _value: i64, _attributes: AttributeSet<'_>) {}
}

impl Histogram for NoopInstrument {
    fn record(&self, _value: f64, _attributes: AttributeSet<'_>) {}
}

impl ObservableCounter for NoopInstrument {
    fn observe(&self) -> Vec<Measurement> {
        Vec::new()
    }
}

impl ObservableGauge for NoopInstrument {
    fn observe(&self) -> Vec<Measurement> {
        Vec::new()
    }
}

impl ObservableUpDownCounter for NoopInstrument {
    fn observe(&self) -> Vec<Measurement> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    };

    use super::*;
    use crate::attributes::KeyValue;

    #[test]
    fn every_operation_is_inert() {
        let meter = NoopMeterProvider::new().get_meter("noop.test", None, None);
        let attrs = [KeyValue::new("k", "v")];

        let counter = meter.create_counter(InstrumentDescriptor::new("hits"));
        counter.add(3, &attrs);
        counter.increment(&[]);
        meter
            .create_up_down_counter(InstrumentDescriptor::new("inflight"))
            .add(-2, &attrs);
        meter
            .create_histogram(InstrumentDescriptor::new("latency").with_unit("ms"))
            .record(12.5, &attrs);

        assert_eq!(counter.descriptor().name(), "hits");
    }

    #[test]
    fn observables_never_poll_the_callback() {
        let polls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&polls);
        let callback = Callback::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            vec![Measurement::bare(1.0)]
        });

        let meter = NoopMeter::new(MeterScope::new("noop.observable"));
        let gauge = meter.create_observable_gauge("temperature".into(), callback.clone());
        let up_down =
            meter.create_observable_up_down_counter("queue.depth".into(), callback.clone());
        let cumulative = meter.create_observable_counter("cpu.time".into(), callback);

        assert!(gauge.observe().is_empty());
        assert!(up_down.observe().is_empty());
        assert!(cumulative.observe().is_empty());
        assert_eq!(polls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn repeated_names_yield_independent_instruments() {
        let meter = NoopMeter::new(MeterScope::new("dup"));
        let first = meter.create_counter("requests".into());
        let second = meter.create_counter("requests".into());
        assert!(!Arc::ptr_eq(&first, &second));
    }
}
