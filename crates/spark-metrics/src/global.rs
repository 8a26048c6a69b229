//! 全局注册状态与进程级便捷入口。
//!
//! # 设计定位（Why）
//! - 进程内只能有一个真实 MeterProvider；库作者随时调用 [`get_meter`] 插桩，
//!   应用在启动流程中的某一时刻调用 [`set_meter_provider`] 完成注册。
//! - 两者的先后顺序不可控，因此注册前发放的一切都来自同一个 [`ProxyMeterProvider`]，
//!   注册时由它把整棵代理树切换到真实后端。
//!
//! # 结构说明（How）
//! - [`RegistrationState`] 持有：真实 Provider 槽位、一次性门闩、唯一的 Provider 代理、配置发现协作者；
//! - 进程级单例由 `OnceLock` 懒初始化，免费函数均转发到该单例；
//! - 测试可构造独立的 `RegistrationState`，注入自定义发现逻辑，避免污染进程级状态。
//!
//! # 契约说明（What）
//! - 至多一次注册：并发的多次注册只有一个生效，代理升级也只执行一次；
//! - 被拒绝的显式注册记录一条 `warn` 日志；配置发现触发的自动安装静默进行。

use std::sync::{Arc, OnceLock};

use crate::{
    discovery::ProviderDiscovery,
    error::{BoxError, DiscoveryError},
    meter::{Meter, MeterProvider},
    once::OnceGate,
    proxy::ProxyMeterProvider,
    sync::Mutex,
};

/// 全局注册状态。
///
/// # 教案式说明
/// - **意图 (Why)**：把“槽位 + 门闩 + 代理 + 发现”封装为一个值，既能作为进程级单例，
///   也能在测试中独立实例化。
/// - **契约 (What)**：
///   - [`get_provider`](Self::get_provider)：已注册则返回真实 Provider；否则若配置指定了后端，
///     经同一门闩静默安装后返回；否则返回唯一的 Provider 代理；
///   - [`set_provider`](Self::set_provider)：返回本次调用是否赢得门闩；失败时记录告警。
/// - **执行逻辑 (How)**：门闩动作先写槽位，再升级代理；失败者在门闩处阻塞直至动作完成，
///   因此返回时一定能观察到胜者写入的 Provider。
/// - **设计权衡 (Trade-offs)**：配置发现失败不缓存，每次 `get_provider` 都会重新读取配置，
///   以便部署方修正配置后无需重启依赖方即可恢复。
pub struct RegistrationState {
    slot: Mutex<Option<Arc<dyn MeterProvider>>>,
    gate: OnceGate,
    proxy: Arc<ProxyMeterProvider>,
    discovery: ProviderDiscovery,
}

impl RegistrationState {
    /// 以进程环境作为配置来源。
    pub fn new() -> Self {
        Self::with_discovery(ProviderDiscovery::from_env())
    }

    /// 以自定义发现协作者构造。
    pub fn with_discovery(discovery: ProviderDiscovery) -> Self {
        Self {
            slot: Mutex::new(None),
            gate: OnceGate::new(),
            proxy: Arc::new(ProxyMeterProvider::new()),
            discovery,
        }
    }

    /// 返回当前生效的 Provider。
    pub fn get_provider(&self) -> Result<Arc<dyn MeterProvider>, DiscoveryError> {
        if let Some(real) = self.registered() {
            return Ok(real);
        }

        if let Some(discovered) = self.discovery.resolve()? {
            self.install(discovered, false);
            // 并发场景下胜出的可能是另一个调用方，以槽位中的值为准。
            if let Some(real) = self.registered() {
                return Ok(real);
            }
        }

        Ok(Arc::clone(&self.proxy) as Arc<dyn MeterProvider>)
    }

    /// 尝试注册真实 Provider，返回本次调用是否生效。
    pub fn set_provider(&self, provider: Arc<dyn MeterProvider>) -> bool {
        self.install(provider, true)
    }

    /// 按 `(name, version)` 从当前 Provider 获取 Meter。
    pub fn get_meter(
        &self,
        name: &str,
        version: Option<&str>,
    ) -> Result<Arc<dyn Meter>, DiscoveryError> {
        Ok(self.get_provider()?.get_meter(name, version, None))
    }

    /// 已注册的真实 Provider。
    pub fn registered(&self) -> Option<Arc<dyn MeterProvider>> {
        self.slot.lock().clone()
    }

    /// 本状态唯一的 Provider 代理。
    pub fn proxy(&self) -> &Arc<ProxyMeterProvider> {
        &self.proxy
    }

    pub fn discovery(&self) -> &ProviderDiscovery {
        &self.discovery
    }

    fn install(&self, provider: Arc<dyn MeterProvider>, log: bool) -> bool {
        let installed = self.gate.call_once(|| {
            *self.slot.lock() = Some(Arc::clone(&provider));
            self.proxy.upgrade(Arc::clone(&provider));
            tracing::debug!(auto_resolved = !log, "MeterProvider installed");
        });
        if !installed && log {
            tracing::warn!("不允许覆盖已注册的 MeterProvider，本次注册被忽略");
        }
        installed
    }
}

impl Default for RegistrationState {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RegistrationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistrationState")
            .field("registered", &self.slot.lock().is_some())
            .field("gate", &self.gate)
            .field("proxy", &self.proxy)
            .field("discovery", &self.discovery)
            .finish()
    }
}

static GLOBAL: OnceLock<RegistrationState> = OnceLock::new();

/// 进程级注册状态单例。
pub fn global() -> &'static RegistrationState {
    GLOBAL.get_or_init(RegistrationState::new)
}

/// 获取进程级生效的 MeterProvider。
///
/// 从未注册且未配置 `SPARK_METER_PROVIDER` 时返回 Provider 代理，其行为等同空实现，
/// 直到真实后端注册后自动切换。
pub fn get_meter_provider() -> Result<Arc<dyn MeterProvider>, DiscoveryError> {
    global().get_provider()
}

/// 注册进程级 MeterProvider；重复注册被忽略并记录告警。
pub fn set_meter_provider(provider: Arc<dyn MeterProvider>) {
    global().set_provider(provider);
}

/// 便捷获取 Meter：`provider` 缺省时使用进程级 Provider。
pub fn get_meter(
    name: &str,
    version: Option<&str>,
    provider: Option<&dyn MeterProvider>,
) -> Result<Arc<dyn Meter>, DiscoveryError> {
    match provider {
        Some(provider) => Ok(provider.get_meter(name, version, None)),
        None => Ok(get_meter_provider()?.get_meter(name, version, None)),
    }
}

/// 向进程级发现注册表登记后端工厂，供 `SPARK_METER_PROVIDER` 按名称引用。
pub fn register_provider_factory<F>(name: impl Into<String>, factory: F)
where
    F: Fn() -> Result<Arc<dyn MeterProvider>, BoxError> + Send + Sync + 'static,
{
    global().discovery().registry().register(name, factory);
}

#[cfg(all(test, not(loom)))]
mod tests {
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        discovery::ProviderRegistry, instrument::Counter, test_stubs::RecordingMeterProvider,
    };

    const REJECTION: &str = "不允许覆盖已注册的 MeterProvider";

    fn unconfigured() -> RegistrationState {
        RegistrationState::with_discovery(ProviderDiscovery::from_env().with_lookup(|_| None))
    }

    fn configured(name: &'static str, registry: Arc<ProviderRegistry>) -> RegistrationState {
        RegistrationState::with_discovery(
            ProviderDiscovery::from_env()
                .with_lookup(move |_| Some(name.to_owned()))
                .with_registry(registry),
        )
    }

    #[test]
    fn unconfigured_state_hands_out_the_proxy() {
        let state = unconfigured();
        let provider = state.get_provider().expect("未配置时不应报错");

        assert!(std::ptr::addr_eq(
            Arc::as_ptr(&provider),
            Arc::as_ptr(state.proxy())
        ));
        assert!(state.registered().is_none());
    }

    #[test]
    #[traced_test]
    fn second_registration_is_rejected_with_a_single_warning() {
        let state = unconfigured();
        let first = Arc::new(RecordingMeterProvider::new());
        let second = Arc::new(RecordingMeterProvider::new());

        assert!(state.set_provider(first.clone()));
        assert!(!state.set_provider(second));

        let effective = state.get_provider().expect("已注册时不应报错");
        assert!(std::ptr::addr_eq(Arc::as_ptr(&effective), Arc::as_ptr(&first)));
        logs_assert(|lines: &[&str]| {
            match lines.iter().filter(|line| line.contains(REJECTION)).count() {
                1 => Ok(()),
                n => Err(format!("期望恰好 1 条拒绝告警，实际 {n} 条")),
            }
        });
    }

    #[test]
    #[traced_test]
    fn configured_backend_is_installed_silently_and_upgrades_the_proxy() {
        let registry = Arc::new(ProviderRegistry::new());
        let backend = Arc::new(RecordingMeterProvider::new());
        let shared = Arc::clone(&backend);
        registry.register("recording", move || {
            Ok(Arc::clone(&shared) as Arc<dyn MeterProvider>)
        });
        let state = configured("recording", registry);

        // 发现之前通过代理发放的句柄也必须随自动安装升级。
        let early = state.proxy().get_meter("early", None, None);
        let counter = early.create_counter("jobs".into());

        let provider = state.get_provider().expect("已注册的名称必须可解析");
        counter.add(3, &[]);

        assert!(std::ptr::addr_eq(Arc::as_ptr(&provider), Arc::as_ptr(&backend)));
        assert_eq!(backend.sum("jobs"), 3.0);
        assert!(!logs_contain(REJECTION));

        assert!(!state.set_provider(Arc::new(RecordingMeterProvider::new())));
        assert!(logs_contain(REJECTION));
    }

    #[test]
    fn discovery_errors_propagate_and_leave_state_unregistered() {
        let state = configured("missing", Arc::new(ProviderRegistry::new()));

        for _ in 0..2 {
            let err = state.get_meter("svc", None).err().expect("未注册的名称必须报错");
            assert!(matches!(err, DiscoveryError::UnknownProvider { .. }));
        }
        assert!(state.registered().is_none());
        assert!(state.set_provider(Arc::new(RecordingMeterProvider::new())));
    }

    #[test]
    fn explicit_provider_argument_bypasses_the_global_state() {
        let provider = RecordingMeterProvider::new();
        let meter = get_meter("direct", Some("0.3.0"), Some(&provider as &dyn MeterProvider))
            .expect("显式 Provider 不会失败");

        assert_eq!(meter.scope().version(), Some("0.3.0"));
        assert_eq!(meter.scope().schema_url(), None);
        assert_eq!(provider.meters().len(), 1);
    }
}
