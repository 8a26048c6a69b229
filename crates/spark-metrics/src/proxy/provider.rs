use std::{fmt, sync::Arc};

use crate::{
    meter::{Meter, MeterProvider, MeterScope},
    sync::Mutex,
};

use super::{meter::ProxyMeter, rebind_isolated};

/// 全局默认的 MeterProvider 代理。
///
/// # 设计背景（Why）
/// - 全局入口在真实 Provider 注册前就必须返回可用对象；注册发生后，此前发放的 Meter
///   与仪表都要“就地”切换到真实实现，调用方无需重新获取。
///
/// # 逻辑解析（How）
/// - 未绑定时，每次 `meter_with_scope` 创建新的 [`ProxyMeter`] 并登记；
/// - [`upgrade`](Self::upgrade) 在锁内写入真实 Provider，随后对每个登记的 Meter
///   以其原始身份向真实 Provider 申请 Meter 并下发；
/// - 绑定后 `meter_with_scope` 直接委托真实 Provider。
///
/// # 契约说明（What）
/// - 升级至多一次；重复调用仅记录调试日志。
/// - 同一身份的多次请求得到彼此独立的代理 Meter，不做去重。
///
/// # 风险提示（Trade-offs）
/// - 升级期间持有本代理的锁，并发的 `meter_with_scope` 会短暂阻塞直至升级完成；
///   这是保证“不遗漏任何 Meter”的代价。
pub struct ProxyMeterProvider {
    state: Mutex<ProviderState>,
}

struct ProviderState {
    real: Option<Arc<dyn MeterProvider>>,
    meters: Vec<Arc<ProxyMeter>>,
}

impl ProxyMeterProvider {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ProviderState {
                real: None,
                meters: Vec::new(),
            }),
        }
    }

    pub(crate) fn upgrade(&self, real: Arc<dyn MeterProvider>) {
        let mut state = self.state.lock();
        if state.real.is_some() {
            tracing::debug!("proxy provider already upgraded, ignoring");
            return;
        }
        state.real = Some(Arc::clone(&real));

        let mut rebound = 0_usize;
        for meter in &state.meters {
            let scope = meter.scope().clone();
            let upgraded = rebind_isolated("meter", scope.name(), || {
                meter.upgrade(real.meter_with_scope(scope.clone()));
            });
            if upgraded {
                rebound += 1;
            }
        }

        tracing::debug!(
            rebound,
            total = state.meters.len(),
            "proxy provider upgraded"
        );
    }

    /// 升级前经由本代理发放的全部 Meter，按发放顺序返回。
    pub fn meters(&self) -> Vec<Arc<ProxyMeter>> {
        self.state.lock().meters.clone()
    }

    /// 当前绑定的真实 Provider。
    pub fn real_provider(&self) -> Option<Arc<dyn MeterProvider>> {
        self.state.lock().real.clone()
    }

    pub fn is_bound(&self) -> bool {
        self.state.lock().real.is_some()
    }
}

impl Default for ProxyMeterProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProxyMeterProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ProxyMeterProvider")
            .field("bound", &state.real.is_some())
            .field("meters", &state.meters.len())
            .finish()
    }
}

impl MeterProvider for ProxyMeterProvider {
    fn meter_with_scope(&self, scope: MeterScope) -> Arc<dyn Meter> {
        let mut state = self.state.lock();
        if let Some(real) = &state.real {
            return real.meter_with_scope(scope);
        }
        let meter = Arc::new(ProxyMeter::new(scope));
        state.meters.push(Arc::clone(&meter));
        meter
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use super::*;
    use crate::{
        instrument::{Counter, InstrumentDescriptor, InstrumentKind, UpDownCounter},
        test_stubs::RecordingMeterProvider,
    };

    #[test]
    fn upgrade_reaches_meters_and_their_instruments() {
        let proxy = ProxyMeterProvider::new();
        let meter = proxy.get_meter("checkout", Some("2.1.0"), Some("https://schema/1"));
        let inflight = meter.create_up_down_counter(InstrumentDescriptor::new("inflight"));

        let real = Arc::new(RecordingMeterProvider::new());
        proxy.upgrade(real.clone());
        inflight.add(3, &[]);
        inflight.add(-1, &[]);

        let bound = real.meter_named("checkout").expect("代理 Meter 必须以原身份在真实后端重建");
        assert_eq!(bound.scope().version(), Some("2.1.0"));
        assert_eq!(bound.scope().schema_url(), Some("https://schema/1"));
        assert_eq!(bound.sum("inflight"), 2.0);
        assert_eq!(
            bound.created(),
            vec![(InstrumentKind::UpDownCounter, InstrumentDescriptor::new("inflight"))]
        );
    }

    #[test]
    fn meters_are_not_deduplicated() {
        let proxy = ProxyMeterProvider::new();
        let first = proxy.get_meter("dup", None, None);
        let second = proxy.get_meter("dup", None, None);

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(proxy.meters().len(), 2);
    }

    #[test]
    fn after_upgrade_requests_go_straight_to_the_real_provider() {
        let proxy = ProxyMeterProvider::new();
        let real = Arc::new(RecordingMeterProvider::new());
        proxy.upgrade(real.clone());

        let meter = proxy.get_meter("late", None, None);
        meter.create_counter("hits".into()).increment(&[]);

        assert!(proxy.meters().is_empty());
        assert_eq!(real.meters().len(), 1);
        assert_eq!(real.sum("hits"), 1.0);
        assert!(proxy.real_provider().is_some());
    }
}
