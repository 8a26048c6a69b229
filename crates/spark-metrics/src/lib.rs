#![doc = "spark-metrics: 延迟绑定的全局 MeterProvider 注册表。"]
#![doc = ""]
#![doc = "== 核心语义 =="]
#![doc = "1. 后端注册之前发放的 Provider、Meter 与仪表都是代理，调用安全但不产生效果。"]
#![doc = "2. 真实后端注册（或按 `SPARK_METER_PROVIDER` 自动发现）时，整棵代理树自顶向下一次性升级，调用方无需重新获取句柄。"]
#![doc = "3. 注册至多生效一次：并发注册只有一个胜出，其余调用记录告警后忽略。"]
#![doc = ""]
#![doc = "```"]
#![doc = "use std::sync::Arc;"]
#![doc = "use spark_metrics::{prelude::*, test_stubs::RecordingMeterProvider, RegistrationState};"]
#![doc = ""]
#![doc = "let state = RegistrationState::new();"]
#![doc = "let requests = state"]
#![doc = "    .proxy()"]
#![doc = "    .get_meter(\"checkout\", None, None)"]
#![doc = "    .create_counter(\"requests\".into());"]
#![doc = "requests.increment(&[]); // 尚未注册后端：丢弃"]
#![doc = ""]
#![doc = "let backend = Arc::new(RecordingMeterProvider::new());"]
#![doc = "assert!(state.set_provider(backend.clone()));"]
#![doc = "requests.increment(&[]);"]
#![doc = "assert_eq!(backend.sum(\"requests\"), 1.0);"]
#![doc = "```"]

pub mod attributes;
pub mod discovery;
pub mod error;
pub mod global;
pub mod instrument;
pub mod meter;
pub mod noop;
pub mod once;
#[cfg(feature = "otel")]
pub mod otel;
pub mod prelude;
pub mod proxy;
pub mod test_stubs;

mod sync;

pub use attributes::{
    AttributeKey, AttributeSet, KeyValue, MetricAttributeValue, OwnedAttributeSet,
};
pub use discovery::{
    METER_PROVIDER_ENV, NOOP_PROVIDER_NAME, ProviderDiscovery, ProviderFactory, ProviderRegistry,
};
pub use error::{BoxError, DiscoveryError};
pub use global::{
    RegistrationState, get_meter, get_meter_provider, global, register_provider_factory,
    set_meter_provider,
};
pub use instrument::{
    Callback, Counter, Histogram, Instrument, InstrumentDescriptor, InstrumentKind, Measurement,
    ObservableCounter, ObservableGauge, ObservableUpDownCounter, UpDownCounter,
};
pub use meter::{Meter, MeterProvider, MeterScope};
pub use noop::{NoopInstrument, NoopMeter, NoopMeterProvider};
pub use once::OnceGate;
pub use proxy::{ProxyMeter, ProxyMeterProvider};
