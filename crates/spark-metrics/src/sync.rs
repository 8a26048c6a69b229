//! 同步原语的切换层。
//!
//! 常规构建使用 `parking_lot::Mutex` 与标准库原子类型；在 `--cfg loom` 且启用 `loom-model` 时替换为
//! Loom 的模型化原语，使门闩与代理节点的竞态可以被穷举调度验证。两套实现对外暴露相同的 `lock()` 签名。

#[cfg(not(all(loom, feature = "loom-model")))]
pub(crate) use parking_lot::Mutex;
#[cfg(not(all(loom, feature = "loom-model")))]
pub(crate) use std::sync::atomic::{AtomicBool, Ordering};

#[cfg(all(loom, feature = "loom-model"))]
pub(crate) use loom_shim::{AtomicBool, Mutex, Ordering};

#[cfg(all(loom, feature = "loom-model"))]
mod loom_shim {
    use loom::sync::MutexGuard;

    pub(crate) use loom::sync::atomic::{AtomicBool, Ordering};

    /// 包装 Loom 互斥锁，吸收其 `LockResult`，与 `parking_lot` 的无毒化语义对齐。
    pub(crate) struct Mutex<T>(loom::sync::Mutex<T>);

    impl<T> Mutex<T> {
        pub(crate) fn new(value: T) -> Self {
            Self(loom::sync::Mutex::new(value))
        }

        pub(crate) fn lock(&self) -> MutexGuard<'_, T> {
            self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
        }
    }
}
