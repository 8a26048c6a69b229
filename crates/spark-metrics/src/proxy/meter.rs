use std::{fmt, sync::Arc};

use crate::{
    instrument::{
        Callback, Counter, Histogram, InstrumentDescriptor, InstrumentKind, ObservableCounter,
        ObservableGauge, ObservableUpDownCounter, UpDownCounter,
    },
    meter::{Meter, MeterScope},
    sync::Mutex,
};

use super::{
    instrument::{
        PendingInstrument, ProxyCounter, ProxyHistogram, ProxyObservableCounter,
        ProxyObservableGauge, ProxyObservableUpDownCounter, ProxyUpDownCounter,
    },
    rebind_isolated,
};

/// 后端就绪前发放的 Meter 代理。
///
/// # 设计背景（Why）
/// - 调用方在 Provider 尚未注册时就可能获取 Meter 并创建仪表；这些句柄必须在注册后自动生效。
///
/// # 逻辑解析（How）
/// - 内部状态由一把互斥锁保护：`real` 为真实 Meter，`instruments` 为尚未绑定的代理仪表。
/// - `create_*` 与 [`upgrade`](Self::upgrade) 在同一把锁下串行：
///   - 锁内若 `real` 已存在，直接委托真实 Meter，不再产生代理；
///   - 否则创建代理、登记并返回。
///   因此任何仪表要么登记在升级之前（随升级绑定），要么创建于升级之后（直接为真实仪表），不会遗漏。
///
/// # 契约说明（What）
/// - `real` 至多写入一次，之后不再改变。
/// - 登记列表只增不减；升级后保留原列表供诊断。
pub struct ProxyMeter {
    scope: MeterScope,
    state: Mutex<MeterState>,
}

struct MeterState {
    real: Option<Arc<dyn Meter>>,
    instruments: Vec<PendingInstrument>,
}

impl ProxyMeter {
    pub(crate) fn new(scope: MeterScope) -> Self {
        Self {
            scope,
            state: Mutex::new(MeterState {
                real: None,
                instruments: Vec::new(),
            }),
        }
    }

    /// 绑定真实 Meter 并逐一升级已登记的仪表。
    ///
    /// 单个仪表升级时 panic 会被隔离并记录，不影响其余仪表。重复调用被忽略。
    pub(crate) fn upgrade(&self, real: Arc<dyn Meter>) {
        let mut state = self.state.lock();
        if state.real.is_some() {
            tracing::debug!(meter = %self.scope.name(), "proxy meter already upgraded");
            return;
        }

        let mut rebound = 0_usize;
        for pending in &state.instruments {
            let name = pending.descriptor().name();
            if rebind_isolated("instrument", name, || pending.on_meter_set(real.as_ref())) {
                rebound += 1;
            }
        }
        state.real = Some(real);

        tracing::debug!(
            meter = %self.scope.name(),
            rebound,
            total = state.instruments.len(),
            "proxy meter upgraded"
        );
    }

    /// 当前绑定的真实 Meter。
    pub fn real_meter(&self) -> Option<Arc<dyn Meter>> {
        self.state.lock().real.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().real.is_some()
    }

    /// 升级前经由本代理创建的仪表（种类与描述符），按创建顺序返回。
    pub fn instrument_kinds(&self) -> Vec<(InstrumentKind, InstrumentDescriptor)> {
        self.state
            .lock()
            .instruments
            .iter()
            .map(|pending| (pending.kind(), pending.descriptor().clone()))
            .collect()
    }
}

impl fmt::Debug for ProxyMeter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ProxyMeter")
            .field("scope", &self.scope)
            .field("bound", &state.real.is_some())
            .field("instruments", &state.instruments.len())
            .finish()
    }
}

impl Meter for ProxyMeter {
    fn scope(&self) -> &MeterScope {
        &self.scope
    }

    fn create_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Counter> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.create_counter(descriptor);
        }
        let proxy = Arc::new(ProxyCounter::new(descriptor));
        state
            .instruments
            .push(PendingInstrument::Counter(Arc::clone(&proxy)));
        proxy
    }

    fn create_up_down_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn UpDownCounter> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.create_up_down_counter(descriptor);
        }
        let proxy = Arc::new(ProxyUpDownCounter::new(descriptor));
        state
            .instruments
            .push(PendingInstrument::UpDownCounter(Arc::clone(&proxy)));
        proxy
    }

    fn create_histogram(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Histogram> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.create_histogram(descriptor);
        }
        let proxy = Arc::new(ProxyHistogram::new(descriptor));
        state
            .instruments
            .push(PendingInstrument::Histogram(Arc::clone(&proxy)));
        proxy
    }

    fn create_observable_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableCounter> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.create_observable_counter(descriptor, callback);
        }
        let proxy = Arc::new(ProxyObservableCounter::new(descriptor, callback));
        state
            .instruments
            .push(PendingInstrument::ObservableCounter(Arc::clone(&proxy)));
        proxy
    }

    fn create_observable_gauge(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableGauge> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.create_observable_gauge(descriptor, callback);
        }
        let proxy = Arc::new(ProxyObservableGauge::new(descriptor, callback));
        state
            .instruments
            .push(PendingInstrument::ObservableGauge(Arc::clone(&proxy)));
        proxy
    }

    fn create_observable_up_down_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableUpDownCounter> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.create_observable_up_down_counter(descriptor, callback);
        }
        let proxy = Arc::new(ProxyObservableUpDownCounter::new(descriptor, callback));
        state
            .instruments
            .push(PendingInstrument::ObservableUpDownCounter(Arc::clone(&proxy)));
        proxy
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::{
        instrument::{Instrument, Measurement},
        test_stubs::RecordingMeter,
    };

    #[test]
    fn instruments_created_before_upgrade_are_rebound_in_order() {
        let proxy = ProxyMeter::new(MeterScope::new("svc"));
        let counter = proxy.create_counter("requests".into());
        let gauge = proxy.create_observable_gauge(
            "queue.depth".into(),
            Callback::new(|| vec![Measurement::bare(4.0)]),
        );

        assert_eq!(
            proxy
                .instrument_kinds()
                .into_iter()
                .map(|(kind, _)| kind)
                .collect::<Vec<_>>(),
            vec![InstrumentKind::Counter, InstrumentKind::ObservableGauge]
        );

        let real = Arc::new(RecordingMeter::new(MeterScope::new("svc")));
        proxy.upgrade(real.clone());

        counter.add(2, &[]);
        assert_eq!(real.sum("requests"), 2.0);
        assert_eq!(gauge.observe(), vec![Measurement::bare(4.0)]);
        assert!(proxy.is_bound());
    }

    #[test]
    fn creation_after_upgrade_delegates_directly() {
        let proxy = ProxyMeter::new(MeterScope::new("svc"));
        let real = Arc::new(RecordingMeter::new(MeterScope::new("svc")));
        proxy.upgrade(real.clone());

        let histogram = proxy.create_histogram(InstrumentDescriptor::new("latency").with_unit("ms"));
        histogram.record(8.0, &[]);

        assert!(proxy.instrument_kinds().is_empty(), "升级后不再登记代理");
        assert_eq!(real.created().len(), 1);
        assert_eq!(histogram.descriptor().unit(), "ms");
    }

    #[test]
    fn second_upgrade_is_ignored() {
        let proxy = ProxyMeter::new(MeterScope::new("svc"));
        let counter = proxy.create_counter("hits".into());
        let first = Arc::new(RecordingMeter::new(MeterScope::new("svc")));
        let second = Arc::new(RecordingMeter::new(MeterScope::new("svc")));

        proxy.upgrade(first.clone());
        proxy.upgrade(second.clone());
        counter.increment(&[]);

        assert_eq!(first.sum("hits"), 1.0);
        assert!(second.created().is_empty());
    }
}
