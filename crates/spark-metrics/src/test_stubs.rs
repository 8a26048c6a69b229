//! 记录型指标后端，供单元测试、集成测试及下游 crate 的测试复用。
//!
//! # 设计定位（Why）
//! - 空实现会吞掉一切输入，无法断言“代理升级后数值确实到达后端”；
//!   记录型后端把每一次仪表创建与每一次记录都保存下来，供测试逐条核对。
//!
//! # 使用方式（How）
//! - 以 [`RecordingMeterProvider`] 注册为真实后端，随后通过 [`RecordingMeterProvider::meter_named`]
//!   或 [`RecordingMeterProvider::sum`] 断言；
//! - 也可直接构造 [`RecordingMeter`]，用于只关心 Meter 层行为的测试。
//!
//! # 契约说明（What）
//! - 可观测仪表的 `observe` 会真正调用回调，并把产出的每个测量值记为一条事件；
//! - 所有状态由互斥锁保护，可在多线程测试中共享。
//!
//! # 风险提示（Trade-offs）
//! - 事件无上限累积，仅适合测试规模的数据量；生产环境请使用真实后端。

use std::sync::Arc;

use parking_lot::Mutex;

use crate::{
    attributes::{AttributeSet, OwnedAttributeSet},
    instrument::{
        Callback, Counter, Histogram, Instrument, InstrumentDescriptor, InstrumentKind,
        Measurement, ObservableCounter, ObservableGauge, ObservableUpDownCounter, UpDownCounter,
    },
    meter::{Meter, MeterProvider, MeterScope},
};

/// 一次记录事件。
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedEvent {
    pub instrument: String,
    pub kind: InstrumentKind,
    pub value: f64,
    pub attributes: OwnedAttributeSet,
}

/// 按发放顺序保存全部 Meter 的记录型 Provider。
#[derive(Debug, Default)]
pub struct RecordingMeterProvider {
    meters: Mutex<Vec<Arc<RecordingMeter>>>,
}

impl RecordingMeterProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn meters(&self) -> Vec<Arc<RecordingMeter>> {
        self.meters.lock().clone()
    }

    /// 第一个名称匹配的 Meter。
    pub fn meter_named(&self, name: &str) -> Option<Arc<RecordingMeter>> {
        self.meters
            .lock()
            .iter()
            .find(|meter| meter.scope.name() == name)
            .cloned()
    }

    /// 全部 Meter 的事件，按 Meter 发放顺序拼接。
    pub fn events(&self) -> Vec<RecordedEvent> {
        self.meters()
            .iter()
            .flat_map(|meter| meter.events())
            .collect()
    }

    /// 跨所有 Meter 累加指定仪表名的记录值。
    pub fn sum(&self, instrument: &str) -> f64 {
        self.meters()
            .iter()
            .map(|meter| meter.sum(instrument))
            .sum()
    }
}

impl MeterProvider for RecordingMeterProvider {
    fn meter_with_scope(&self, scope: MeterScope) -> Arc<dyn Meter> {
        let meter = Arc::new(RecordingMeter::new(scope));
        self.meters.lock().push(Arc::clone(&meter));
        meter
    }
}

#[derive(Debug, Default)]
struct MeterLog {
    created: Vec<(InstrumentKind, InstrumentDescriptor)>,
    events: Vec<RecordedEvent>,
}

/// 记录仪表创建与数值的 Meter。
#[derive(Debug)]
pub struct RecordingMeter {
    scope: MeterScope,
    log: Arc<Mutex<MeterLog>>,
}

impl RecordingMeter {
    pub fn new(scope: MeterScope) -> Self {
        Self {
            scope,
            log: Arc::new(Mutex::new(MeterLog::default())),
        }
    }

    /// 按创建顺序返回 `(种类, 描述符)`。
    pub fn created(&self) -> Vec<(InstrumentKind, InstrumentDescriptor)> {
        self.log.lock().created.clone()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.log.lock().events.clone()
    }

    pub fn sum(&self, instrument: &str) -> f64 {
        self.log
            .lock()
            .events
            .iter()
            .filter(|event| event.instrument == instrument)
            .map(|event| event.value)
            .sum()
    }

    fn instrument(
        &self,
        kind: InstrumentKind,
        descriptor: InstrumentDescriptor,
        callback: Option<Callback>,
    ) -> Arc<RecordingInstrument> {
        self.log.lock().created.push((kind, descriptor.clone()));
        Arc::new(RecordingInstrument {
            kind,
            descriptor,
            callback,
            log: Arc::clone(&self.log),
        })
    }
}

impl Meter for RecordingMeter {
    fn scope(&self) -> &MeterScope {
        &self.scope
    }

    fn create_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Counter> {
        self.instrument(InstrumentKind::Counter, descriptor, None)
    }

    fn create_up_down_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn UpDownCounter> {
        self.instrument(InstrumentKind::UpDownCounter, descriptor, None)
    }

    fn create_histogram(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Histogram> {
        self.instrument(InstrumentKind::Histogram, descriptor, None)
    }

    fn create_observable_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableCounter> {
        self.instrument(InstrumentKind::ObservableCounter, descriptor, Some(callback))
    }

    fn create_observable_gauge(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableGauge> {
        self.instrument(InstrumentKind::ObservableGauge, descriptor, Some(callback))
    }

    fn create_observable_up_down_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableUpDownCounter> {
        self.instrument(
            InstrumentKind::ObservableUpDownCounter,
            descriptor,
            Some(callback),
        )
    }
}

/// 记录型仪表；六类仪表共用同一实现，由 [`RecordingMeter`] 擦除为对应 Trait 对象。
#[derive(Debug)]
pub struct RecordingInstrument {
    kind: InstrumentKind,
    descriptor: InstrumentDescriptor,
    callback: Option<Callback>,
    log: Arc<Mutex<MeterLog>>,
}

impl RecordingInstrument {
    pub fn kind(&self) -> InstrumentKind {
        self.kind
    }

    fn push(&self, value: f64, attributes: OwnedAttributeSet) {
        self.log.lock().events.push(RecordedEvent {
            instrument: self.descriptor.name().to_owned(),
            kind: self.kind,
            value,
            attributes,
        });
    }

    fn collect(&self) -> Vec<Measurement> {
        let Some(callback) = &self.callback else {
            return Vec::new();
        };
        let batch = callback.poll();
        for measurement in &batch {
            self.push(measurement.value, measurement.attributes.clone());
        }
        batch
    }
}

impl Instrument for RecordingInstrument {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

impl Counter for RecordingInstrument {
    fn add(&self, value: u64, attributes: AttributeSet<'_>) {
        self.push(value as f64, OwnedAttributeSet::from_borrowed(attributes));
    }
}

impl UpDownCounter for RecordingInstrument {
    fn add(&self, value: i64, attributes: AttributeSet<'_>) {
        self.push(value as f64, OwnedAttributeSet::from_borrowed(attributes));
    }
}

impl Histogram for RecordingInstrument {
    fn record(&self, value: f64, attributes: AttributeSet<'_>) {
        self.push(value, OwnedAttributeSet::from_borrowed(attributes));
    }
}

impl ObservableCounter for RecordingInstrument {
    fn observe(&self) -> Vec<Measurement> {
        self.collect()
    }
}

impl ObservableGauge for RecordingInstrument {
    fn observe(&self) -> Vec<Measurement> {
        self.collect()
    }
}

impl ObservableUpDownCounter for RecordingInstrument {
    fn observe(&self) -> Vec<Measurement> {
        self.collect()
    }
}
