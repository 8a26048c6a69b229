use std::{borrow::Cow, sync::Arc};

use crate::instrument::{
    Callback, Counter, Histogram, InstrumentDescriptor, ObservableCounter, ObservableGauge,
    ObservableUpDownCounter, UpDownCounter,
};

/// Meter 的身份三元组 `(name, version, schema_url)`。
///
/// # 契约说明（What）
/// - 仅作为不透明身份使用：相同身份的多次 `get_meter` 会得到彼此独立的实例，去重属于后端职责。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct MeterScope {
    name: Cow<'static, str>,
    version: Option<Cow<'static, str>>,
    schema_url: Option<Cow<'static, str>>,
}

impl MeterScope {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            version: None,
            schema_url: None,
        }
    }

    pub fn with_version(mut self, version: impl Into<Cow<'static, str>>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_schema_url(mut self, schema_url: impl Into<Cow<'static, str>>) -> Self {
        self.schema_url = Some(schema_url.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn schema_url(&self) -> Option<&str> {
        self.schema_url.as_deref()
    }
}

/// 命名的插桩作用域，负责创建六类仪表。
///
/// # 设计背景（Why）
/// - 以 Trait 表达“必须实现全部创建操作”的能力集：缺少任一方法的后端在编译期即被拒绝，
///   不存在运行期“未实现”分支。
///
/// # 契约说明（What）
/// - 三种变体：[`NoopMeter`](crate::noop::NoopMeter)、[`ProxyMeter`](crate::proxy::ProxyMeter)
///   以及外部提供的真实 Meter。
/// - **前置条件**：无；同名仪表可重复创建，实现不得因重名而失败。
/// - **后置条件**：返回的仪表可在任意线程长期持有，其 [`descriptor`](crate::Instrument::descriptor)
///   与传入的描述符一致。
pub trait Meter: Send + Sync {
    /// Meter 的身份。
    fn scope(&self) -> &MeterScope;

    fn create_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Counter>;

    fn create_up_down_counter(&self, descriptor: InstrumentDescriptor) -> Arc<dyn UpDownCounter>;

    fn create_histogram(&self, descriptor: InstrumentDescriptor) -> Arc<dyn Histogram>;

    /// 创建可观测计数器；`callback` 在每次采集时产出一批测量值。
    fn create_observable_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableCounter>;

    fn create_observable_gauge(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableGauge>;

    fn create_observable_up_down_counter(
        &self,
        descriptor: InstrumentDescriptor,
        callback: Callback,
    ) -> Arc<dyn ObservableUpDownCounter>;
}

/// 进程级的 Meter 工厂。
///
/// # 契约说明（What）
/// - `meter_with_scope` 必须是全函数：任何身份输入都不得被拒绝。
/// - [`get_meter`](Self::get_meter) 为便捷入口，按 `(name, version, schema_url)` 组装 [`MeterScope`]。
pub trait MeterProvider: Send + Sync {
    fn meter_with_scope(&self, scope: MeterScope) -> Arc<dyn Meter>;

    fn get_meter(
        &self,
        name: &str,
        version: Option<&str>,
        schema_url: Option<&str>,
    ) -> Arc<dyn Meter> {
        let mut scope = MeterScope::new(name.to_owned());
        if let Some(version) = version {
            scope = scope.with_version(version.to_owned());
        }
        if let Some(schema_url) = schema_url {
            scope = scope.with_schema_url(schema_url.to_owned());
        }
        self.meter_with_scope(scope)
    }
}
