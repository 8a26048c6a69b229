//! 代理层：后端注册之前发放的 Provider、Meter 与仪表。
//!
//! # 设计定位（Why）
//! - 库代码通常在进程启动早期、甚至在应用配置指标后端之前就完成插桩。代理层让这些早期句柄
//!   在后端注册后自动切换到真实实现，调用方既不需要重新获取，也不需要感知切换时机。
//!
//! # 结构说明（How）
//! - 三级代理呈树状：[`ProxyMeterProvider`] 登记 [`ProxyMeter`]，后者登记代理仪表；
//! - 升级自顶向下传播，每一级都在自身的锁内完成“写入真实目标 + 下发给子节点”；
//! - 仪表代理的转发目标通过一次写入的槽位发布，记录路径不加锁。
//!
//! # 契约说明（What）
//! - 每个节点至多升级一次，之后不可撤销。
//! - 单个子节点升级失败（panic）只影响该节点：错误被记录，其余节点照常升级。

mod instrument;
mod meter;
mod provider;

use std::panic::{self, AssertUnwindSafe};

pub use self::{
    instrument::{
        ProxyCounter, ProxyHistogram, ProxyInstrument, ProxyObservable, ProxyObservableCounter,
        ProxyObservableGauge, ProxyObservableUpDownCounter, ProxyUpDownCounter,
    },
    meter::ProxyMeter,
    provider::ProxyMeterProvider,
};

/// 执行一次子节点重绑定，panic 被就地截获并记录为错误日志。
///
/// 返回值表示重绑定是否正常完成。
fn rebind_isolated<F: FnOnce()>(node: &'static str, name: &str, rebind: F) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(rebind)) {
        Ok(()) => true,
        Err(payload) => {
            let reason = payload
                .downcast_ref::<&str>()
                .copied()
                .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
                .unwrap_or("<non-string panic payload>");
            tracing::error!(node, name, reason, "代理升级时子节点重绑定失败，已跳过");
            false
        }
    }
}
