//! 基于配置的后端发现。
//!
//! # 设计定位（Why）
//! - 部署方可能不改代码，只通过环境变量指定指标后端；此时全局入口需要在首次访问时
//!   按名称实例化后端，并走与显式注册相同的一次性安装路径。
//!
//! # 结构说明（How）
//! - [`ProviderRegistry`]：名称到工厂函数的线程安全映射，预置 `"noop"`；
//! - [`ProviderDiscovery`]：组合“配置键 + 取值函数 + 注册表”，[`resolve`](ProviderDiscovery::resolve)
//!   读取配置并调用对应工厂。
//!
//! # 契约说明（What）
//! - 配置缺失（或仅含空白）时返回 `Ok(None)`，调用方继续使用代理；
//! - 名称未注册或工厂失败均以 [`DiscoveryError`] 返回，不做吞并。

use std::{borrow::Cow, collections::HashMap, fmt, sync::Arc};

use parking_lot::RwLock;

use crate::{
    error::{BoxError, DiscoveryError},
    meter::MeterProvider,
    noop::NoopMeterProvider,
};

/// 指定后端名称的环境变量。
pub const METER_PROVIDER_ENV: &str = "SPARK_METER_PROVIDER";

/// 预置的空后端名称。
pub const NOOP_PROVIDER_NAME: &str = "noop";

/// 构造后端的工厂函数。
pub type ProviderFactory =
    Arc<dyn Fn() -> Result<Arc<dyn MeterProvider>, BoxError> + Send + Sync + 'static>;

type Lookup = Arc<dyn Fn(&str) -> Option<String> + Send + Sync + 'static>;

/// 名称到后端工厂的注册表。
pub struct ProviderRegistry {
    factories: RwLock<HashMap<String, ProviderFactory>>,
}

impl ProviderRegistry {
    /// 创建注册表并预置 `"noop"`。
    pub fn new() -> Self {
        let registry = Self::empty();
        registry.register(NOOP_PROVIDER_NAME, || {
            Ok(Arc::new(NoopMeterProvider::new()) as Arc<dyn MeterProvider>)
        });
        registry
    }

    /// 创建不含任何条目的注册表。
    pub fn empty() -> Self {
        Self {
            factories: RwLock::new(HashMap::new()),
        }
    }

    /// 注册工厂；同名条目会被替换。
    pub fn register<F>(&self, name: impl Into<String>, factory: F)
    where
        F: Fn() -> Result<Arc<dyn MeterProvider>, BoxError> + Send + Sync + 'static,
    {
        let name = name.into();
        let replaced = self
            .factories
            .write()
            .insert(name.clone(), Arc::new(factory))
            .is_some();
        if replaced {
            tracing::debug!(provider = %name, "MeterProvider factory replaced");
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.read().contains_key(name)
    }

    /// 已注册的名称，按字典序排列。
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// 按名称构造后端。
    ///
    /// 工厂在读锁释放后执行，因此工厂内部可以安全地再次访问注册表。
    pub fn instantiate(
        &self,
        key: &str,
        name: &str,
    ) -> Result<Arc<dyn MeterProvider>, DiscoveryError> {
        let factory = self.factories.read().get(name).cloned();
        let factory = factory.ok_or_else(|| DiscoveryError::UnknownProvider {
            key: key.to_owned(),
            name: name.to_owned(),
        })?;
        factory().map_err(|source| DiscoveryError::Factory {
            name: name.to_owned(),
            source,
        })
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("names", &self.names())
            .finish()
    }
}

/// 配置发现协作者。
///
/// # 教案式说明
/// - **意图 (Why)**：把“读哪个键、从哪里读、名称映射到谁”三件事显式化，
///   测试可以注入取值函数，而无需修改进程环境变量。
/// - **契约 (What)**：`resolve` 每次调用都会重新读取配置；是否缓存结果由调用方（全局注册状态）决定。
#[derive(Clone)]
pub struct ProviderDiscovery {
    key: Cow<'static, str>,
    lookup: Lookup,
    registry: Arc<ProviderRegistry>,
}

impl ProviderDiscovery {
    /// 从进程环境读取 [`METER_PROVIDER_ENV`]，使用预置 `"noop"` 的新注册表。
    pub fn from_env() -> Self {
        Self {
            key: Cow::Borrowed(METER_PROVIDER_ENV),
            lookup: Arc::new(|key| {
                std::env::var_os(key).map(|value| value.to_string_lossy().into_owned())
            }),
            registry: Arc::new(ProviderRegistry::new()),
        }
    }

    /// 替换取值函数。
    pub fn with_lookup<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.lookup = Arc::new(lookup);
        self
    }

    /// 替换配置键。
    pub fn with_key(mut self, key: impl Into<Cow<'static, str>>) -> Self {
        self.key = key.into();
        self
    }

    /// 替换注册表，便于多个发现实例共享同一份工厂。
    pub fn with_registry(mut self, registry: Arc<ProviderRegistry>) -> Self {
        self.registry = registry;
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    /// 读取配置并实例化后端。
    pub fn resolve(&self) -> Result<Option<Arc<dyn MeterProvider>>, DiscoveryError> {
        let Some(raw) = (self.lookup)(&*self.key) else {
            return Ok(None);
        };
        let name = raw.trim();
        if name.is_empty() {
            return Ok(None);
        }
        self.registry.instantiate(&self.key, name).map(Some)
    }
}

impl Default for ProviderDiscovery {
    fn default() -> Self {
        Self::from_env()
    }
}

impl fmt::Debug for ProviderDiscovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderDiscovery")
            .field("key", &self.key)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}
