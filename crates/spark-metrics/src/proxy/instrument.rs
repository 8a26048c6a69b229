use std::{
    fmt,
    sync::{Arc, OnceLock},
};

use crate::{
    attributes::AttributeSet,
    instrument::{
        Callback, Counter, Histogram, Instrument, InstrumentDescriptor, InstrumentKind,
        Measurement, ObservableCounter, ObservableGauge, ObservableUpDownCounter, UpDownCounter,
    },
    meter::Meter,
};

/// 同步仪表的代理。
///
/// # 设计背景（Why）
/// - 后端就绪前发放的仪表句柄必须立即可用，且在后端注册后无需调用方重新获取即可生效。
///
/// # 逻辑解析（How）
/// - 仅保存创建参数（描述符）与一个“一次写入”的真实仪表槽位；
/// - 未绑定时所有记录操作直接丢弃；绑定后逐一转发给真实仪表。
///
/// # 契约说明（What）
/// - 槽位一旦写入便不再清空，也不会被替换。
/// - 代理本身不缓冲任何数值：绑定前的记录不会在绑定后补发。
pub struct ProxyInstrument<I: ?Sized> {
    descriptor: InstrumentDescriptor,
    real: OnceLock<Arc<I>>,
}

impl<I: ?Sized> ProxyInstrument<I> {
    pub(crate) fn new(descriptor: InstrumentDescriptor) -> Self {
        Self {
            descriptor,
            real: OnceLock::new(),
        }
    }

    /// 当前转发目标；未绑定时返回 `None`。
    pub fn real(&self) -> Option<Arc<I>> {
        self.real.get().cloned()
    }

    pub fn is_bound(&self) -> bool {
        self.real.get().is_some()
    }

    fn bind(&self, real: Arc<I>) {
        if self.real.set(real).is_err() {
            tracing::debug!(
                instrument = %self.descriptor.name(),
                "proxy instrument already bound, keeping the first target"
            );
        }
    }
}

impl<I: ?Sized> fmt::Debug for ProxyInstrument<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyInstrument")
            .field("descriptor", &self.descriptor)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<I: ?Sized + Send + Sync> Instrument for ProxyInstrument<I> {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

impl Counter for ProxyInstrument<dyn Counter> {
    fn add(&self, value: u64, attributes: AttributeSet<'_>) {
        if let Some(real) = self.real.get() {
            real.add(value, attributes);
        }
    }
}

impl UpDownCounter for ProxyInstrument<dyn UpDownCounter> {
    fn add(&self, value: i64, attributes: AttributeSet<'_>) {
        if let Some(real) = self.real.get() {
            real.add(value, attributes);
        }
    }
}

impl Histogram for ProxyInstrument<dyn Histogram> {
    fn record(&self, value: f64, attributes: AttributeSet<'_>) {
        if let Some(real) = self.real.get() {
            real.record(value, attributes);
        }
    }
}

/// 可观测仪表的代理，额外持有创建时的回调。
///
/// # 契约说明（What）
/// - 未绑定时 `observe` 返回空批次，且**不会**调用回调；
/// - 绑定时把同一个 [`Callback`] 交给真实 Meter，之后的 `observe` 由真实仪表负责。
pub struct ProxyObservable<I: ?Sized> {
    descriptor: InstrumentDescriptor,
    callback: Callback,
    real: OnceLock<Arc<I>>,
}

impl<I: ?Sized> ProxyObservable<I> {
    pub(crate) fn new(descriptor: InstrumentDescriptor, callback: Callback) -> Self {
        Self {
            descriptor,
            callback,
            real: OnceLock::new(),
        }
    }

    pub fn real(&self) -> Option<Arc<I>> {
        self.real.get().cloned()
    }

    pub fn is_bound(&self) -> bool {
        self.real.get().is_some()
    }

    fn bind(&self, real: Arc<I>) {
        if self.real.set(real).is_err() {
            tracing::debug!(
                instrument = %self.descriptor.name(),
                "proxy observable already bound, keeping the first target"
            );
        }
    }
}

impl<I: ?Sized> fmt::Debug for ProxyObservable<I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProxyObservable")
            .field("descriptor", &self.descriptor)
            .field("bound", &self.is_bound())
            .finish()
    }
}

impl<I: ?Sized + Send + Sync> Instrument for ProxyObservable<I> {
    fn descriptor(&self) -> &InstrumentDescriptor {
        &self.descriptor
    }
}

impl ObservableCounter for ProxyObservable<dyn ObservableCounter> {
    fn observe(&self) -> Vec<Measurement> {
        self.real.get().map(|real| real.observe()).unwrap_or_default()
    }
}

impl ObservableGauge for ProxyObservable<dyn ObservableGauge> {
    fn observe(&self) -> Vec<Measurement> {
        self.real.get().map(|real| real.observe()).unwrap_or_default()
    }
}

impl ObservableUpDownCounter for ProxyObservable<dyn ObservableUpDownCounter> {
    fn observe(&self) -> Vec<Measurement> {
        self.real.get().map(|real| real.observe()).unwrap_or_default()
    }
}

pub type ProxyCounter = ProxyInstrument<dyn Counter>;
pub type ProxyUpDownCounter = ProxyInstrument<dyn UpDownCounter>;
pub type ProxyHistogram = ProxyInstrument<dyn Histogram>;
pub type ProxyObservableCounter = ProxyObservable<dyn ObservableCounter>;
pub type ProxyObservableGauge = ProxyObservable<dyn ObservableGauge>;
pub type ProxyObservableUpDownCounter = ProxyObservable<dyn ObservableUpDownCounter>;

/// 代理 Meter 记录的、等待绑定的仪表。
///
/// 以枚举而非 Trait 对象保存，绑定时按种类调用真实 Meter 上对应的 `create_*`。
#[derive(Clone, Debug)]
pub(crate) enum PendingInstrument {
    Counter(Arc<ProxyCounter>),
    UpDownCounter(Arc<ProxyUpDownCounter>),
    Histogram(Arc<ProxyHistogram>),
    ObservableCounter(Arc<ProxyObservableCounter>),
    ObservableGauge(Arc<ProxyObservableGauge>),
    ObservableUpDownCounter(Arc<ProxyObservableUpDownCounter>),
}

impl PendingInstrument {
    pub(crate) fn kind(&self) -> InstrumentKind {
        match self {
            PendingInstrument::Counter(_) => InstrumentKind::Counter,
            PendingInstrument::UpDownCounter(_) => InstrumentKind::UpDownCounter,
            PendingInstrument::Histogram(_) => InstrumentKind::Histogram,
            PendingInstrument::ObservableCounter(_) => InstrumentKind::ObservableCounter,
            PendingInstrument::ObservableGauge(_) => InstrumentKind::ObservableGauge,
            PendingInstrument::ObservableUpDownCounter(_) => {
                InstrumentKind::ObservableUpDownCounter
            }
        }
    }

    pub(crate) fn descriptor(&self) -> &InstrumentDescriptor {
        match self {
            PendingInstrument::Counter(proxy) => &proxy.descriptor,
            PendingInstrument::UpDownCounter(proxy) => &proxy.descriptor,
            PendingInstrument::Histogram(proxy) => &proxy.descriptor,
            PendingInstrument::ObservableCounter(proxy) => &proxy.descriptor,
            PendingInstrument::ObservableGauge(proxy) => &proxy.descriptor,
            PendingInstrument::ObservableUpDownCounter(proxy) => &proxy.descriptor,
        }
    }

    /// 用原始创建参数在真实 Meter 上重建仪表，并让代理开始转发。
    pub(crate) fn on_meter_set(&self, meter: &dyn Meter) {
        match self {
            PendingInstrument::Counter(proxy) => {
                proxy.bind(meter.create_counter(proxy.descriptor.clone()));
            }
            PendingInstrument::UpDownCounter(proxy) => {
                proxy.bind(meter.create_up_down_counter(proxy.descriptor.clone()));
            }
            PendingInstrument::Histogram(proxy) => {
                proxy.bind(meter.create_histogram(proxy.descriptor.clone()));
            }
            PendingInstrument::ObservableCounter(proxy) => {
                proxy.bind(meter.create_observable_counter(
                    proxy.descriptor.clone(),
                    proxy.callback.clone(),
                ));
            }
            PendingInstrument::ObservableGauge(proxy) => {
                proxy.bind(
                    meter.create_observable_gauge(proxy.descriptor.clone(), proxy.callback.clone()),
                );
            }
            PendingInstrument::ObservableUpDownCounter(proxy) => {
                proxy.bind(meter.create_observable_up_down_counter(
                    proxy.descriptor.clone(),
                    proxy.callback.clone(),
                ));
            }
        }
    }
}
