use std::{borrow::Cow, fmt, sync::Arc};

use parking_lot::Mutex;

use crate::attributes::{AttributeSet, OwnedAttributeSet};

/// 仪表的元数据描述：`(name, unit, description)`。
///
/// # 设计背景（Why）
/// - 代理仪表需要在后端注册之后按原样重建真实仪表，因此描述符必须拥有所有权，
///   而不能像热路径上的属性那样借用调用方数据。
///
/// # 契约说明（What）
/// - `unit`、`description` 缺省为空字符串。
/// - 同名仪表不会在本层去重；名称冲突的诊断属于真实后端的职责。
/// - **后置条件**：代理在升级前后对外暴露的描述符与调用方最初传入的完全一致。
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstrumentDescriptor {
    name: Cow<'static, str>,
    unit: Cow<'static, str>,
    description: Cow<'static, str>,
}

impl InstrumentDescriptor {
    /// 以名称构造描述符，单位与说明为空。
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            unit: Cow::Borrowed(""),
            description: Cow::Borrowed(""),
        }
    }

    /// 附加单位信息，建议遵循 UCUM（如 `By`、`ms`）。
    pub fn with_unit(mut self, unit: impl Into<Cow<'static, str>>) -> Self {
        self.unit = unit.into();
        self
    }

    /// 附加说明文本。
    pub fn with_description(mut self, description: impl Into<Cow<'static, str>>) -> Self {
        self.description = description.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl From<&'static str> for InstrumentDescriptor {
    fn from(name: &'static str) -> Self {
        Self::new(name)
    }
}

/// 仪表种类，覆盖三种同步仪表与三种可观测（拉取式）仪表。
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InstrumentKind {
    Counter,
    UpDownCounter,
    Histogram,
    ObservableCounter,
    ObservableGauge,
    ObservableUpDownCounter,
}

impl InstrumentKind {
    /// 是否为依赖回调拉取数值的可观测仪表。
    pub const fn is_observable(self) -> bool {
        matches!(
            self,
            InstrumentKind::ObservableCounter
                | InstrumentKind::ObservableGauge
                | InstrumentKind::ObservableUpDownCounter
        )
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            InstrumentKind::Counter => "counter",
            InstrumentKind::UpDownCounter => "up_down_counter",
            InstrumentKind::Histogram => "histogram",
            InstrumentKind::ObservableCounter => "observable_counter",
            InstrumentKind::ObservableGauge => "observable_gauge",
            InstrumentKind::ObservableUpDownCounter => "observable_up_down_counter",
        }
    }
}

impl fmt::Display for InstrumentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可观测仪表在一次采集中产出的单个测量值。
#[derive(Clone, Debug, PartialEq)]
pub struct Measurement {
    pub value: f64,
    pub attributes: OwnedAttributeSet,
}

impl Measurement {
    pub fn new(value: f64, attributes: OwnedAttributeSet) -> Self {
        Self { value, attributes }
    }

    /// 不带属性的测量值。
    pub fn bare(value: f64) -> Self {
        Self::new(value, OwnedAttributeSet::new())
    }
}

type PollFn = dyn Fn() -> Vec<Measurement> + Send + Sync;

/// 可观测仪表的采集回调。
///
/// # 设计背景（Why）
/// - 回调有两种常见写法：每次调用都重新计算快照的函数，以及按批次产出快照的迭代器（生成器）。
///   两者在此统一为同一个能力：**一次 `poll` 返回一批测量值**，后端无需区分调用约定。
///
/// # 逻辑解析（How）
/// - [`Callback::new`] 直接包装函数；
/// - [`Callback::from_batches`] 将迭代器放入互斥锁，每次 `poll` 推进一步，耗尽后返回空批次。
///
/// # 契约说明（What）
/// - `Callback` 可廉价克隆，克隆体共享同一底层状态（迭代器进度不会因克隆而重置）。
/// - 代理仪表在升级时把同一个 `Callback` 交给真实后端，因此回调只会被注册一次。
#[derive(Clone)]
pub struct Callback {
    poll: Arc<PollFn>,
}

impl Callback {
    /// 以快照函数构造回调。
    pub fn new<F>(poll: F) -> Self
    where
        F: Fn() -> Vec<Measurement> + Send + Sync + 'static,
    {
        Self {
            poll: Arc::new(poll),
        }
    }

    /// 以批次迭代器构造回调；迭代器耗尽后每次采集返回空批次。
    pub fn from_batches<I>(batches: I) -> Self
    where
        I: IntoIterator<Item = Vec<Measurement>>,
        I::IntoIter: Send + 'static,
    {
        let batches = Mutex::new(batches.into_iter());
        Self::new(move || batches.lock().next().unwrap_or_default())
    }

    /// 执行一次采集。
    pub fn poll(&self) -> Vec<Measurement> {
        (self.poll)()
    }
}

impl fmt::Debug for Callback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callback").finish_non_exhaustive()
    }
}

/// 所有仪表共享的最小能力：暴露创建时的描述符。
pub trait Instrument: Send + Sync {
    fn descriptor(&self) -> &InstrumentDescriptor;
}

/// 单调递增计数器。
///
/// # 契约说明（What）
/// - **前置条件**：`value` 为非负增量。
/// - **后置条件**：实现必须线程安全；后端不可用时应丢弃数据而非阻塞或 panic。
pub trait Counter: Instrument {
    /// 累加指标值。
    fn add(&self, value: u64, attributes: AttributeSet<'_>);

    /// 累加 1 的便捷方法。
    fn increment(&self, attributes: AttributeSet<'_>) {
        self.add(1, attributes);
    }
}

/// 可增可减的计数器，适用于连接数、队列长度等。
pub trait UpDownCounter: Instrument {
    fn add(&self, value: i64, attributes: AttributeSet<'_>);
}

/// 直方图，记录延迟、大小等分布数据。
pub trait Histogram: Instrument {
    fn record(&self, value: f64, attributes: AttributeSet<'_>);
}

/// 可观测计数器：数值由回调在采集时拉取。
///
/// `observe` 执行一次采集并返回本批测量值；未绑定后端的代理返回空批次且不触发回调。
pub trait ObservableCounter: Instrument {
    fn observe(&self) -> Vec<Measurement>;
}

/// 可观测 Gauge。
pub trait ObservableGauge: Instrument {
    fn observe(&self) -> Vec<Measurement>;
}

/// 可观测的可增可减计数器。
pub trait ObservableUpDownCounter: Instrument {
    fn observe(&self) -> Vec<Measurement>;
}
