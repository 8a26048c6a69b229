//! # error 模块说明
//!
//! ## 角色定位（Why）
//! - 注册流程中唯一需要以错误值返回的场景是“按配置发现后端”失败；
//!   重复注册属于可预期的并发结果，只记录告警，不构成错误。
//!
//! ## 设计要求（What）
//! - 错误类型派生 `thiserror::Error`，满足 `Send + Sync + 'static`，可直接 `?` 传播；
//! - 工厂自身的失败原样保存在 `source` 中，保留完整错误链。

use std::error::Error as StdError;

use thiserror::Error;

/// 后端工厂返回的装箱错误。
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// 根据环境配置发现后端时的失败。
///
/// # 教案式说明
/// - **意图 (Why)**：配置写错或后端初始化失败时，调用方需要明确知道原因，而不是静默退化为空实现。
/// - **契约 (What)**：由 `get_provider` / [`get_meter_provider`](crate::get_meter_provider) /
///   [`get_meter`](crate::get_meter) 向上传播；本 crate 不做重试，也不缓存失败结果，
///   下一次调用会重新尝试发现。
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DiscoveryError {
    /// 配置的名称没有对应的已注册工厂。
    #[error("环境变量 `{key}` 指定的 MeterProvider `{name}` 未注册")]
    UnknownProvider { key: String, name: String },

    /// 已注册的工厂在构造后端时失败。
    #[error("MeterProvider 工厂 `{name}` 构造失败: {source}")]
    Factory {
        name: String,
        #[source]
        source: BoxError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn factory_error_keeps_its_source() {
        let err = DiscoveryError::Factory {
            name: "otlp".into(),
            source: "endpoint unreachable".into(),
        };
        assert!(err.to_string().contains("otlp"));
        assert_eq!(
            err.source().map(ToString::to_string).as_deref(),
            Some("endpoint unreachable")
        );
    }
}
