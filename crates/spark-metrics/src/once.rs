use std::fmt;

use crate::sync::{AtomicBool, Mutex, Ordering};

/// 一次性门闩：保证附着的动作在整个生命周期内至多执行一次。
///
/// # 设计背景（Why）
/// - 全局注册要求“先写者胜出”：无论多少线程并发尝试，只有一个动作真正落地。
/// - 仅靠原子标记无法满足“失败者必须等待胜者完成”的要求，因此额外引入互斥锁作为阻塞等待点。
///
/// # 逻辑解析（How）
/// 1. 快路径读取 `fired`，已触发则立即返回 `false`；
/// 2. 否则获取互斥锁并二次检查，胜者执行动作后以 `Release` 语义置位；
/// 3. 同时到达的竞争者阻塞在锁上，待胜者释放后观察到已触发并返回 `false`。
///
/// # 契约说明（What）
/// - [`OnceGate::call_once`] 返回 `true` 当且仅当本次调用执行了动作。
/// - **后置条件**：任何返回 `false` 的调用在返回前都能观察到胜者动作的全部副作用。
/// - 动作若 panic，门闩保持未触发状态，后续调用可以重试。
pub struct OnceGate {
    fired: AtomicBool,
    lock: Mutex<()>,
}

impl OnceGate {
    pub fn new() -> Self {
        Self {
            fired: AtomicBool::new(false),
            lock: Mutex::new(()),
        }
    }

    /// 若门闩尚未触发则执行 `action`，返回本次调用是否执行了动作。
    pub fn call_once<F>(&self, action: F) -> bool
    where
        F: FnOnce(),
    {
        if self.fired.load(Ordering::Acquire) {
            return false;
        }

        let _guard = self.lock.lock();
        if self.fired.load(Ordering::Acquire) {
            return false;
        }
        action();
        self.fired.store(true, Ordering::Release);
        true
    }

    /// 门闩是否已经触发。
    pub fn is_fired(&self) -> bool {
        self.fired.load(Ordering::Acquire)
    }
}

impl fmt::Debug for OnceGate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OnceGate")
            .field("fired", &self.is_fired())
            .finish()
    }
}

impl Default for OnceGate {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(all(test, not(loom)))]
mod tests {
    use std::{
        sync::{
            Arc, Barrier,
            atomic::{AtomicUsize, Ordering},
        },
        thread,
    };

    use super::OnceGate;

    #[test]
    fn second_call_is_rejected() {
        let gate = OnceGate::new();
        let mut runs = 0;
        assert!(gate.call_once(|| runs += 1));
        assert!(!gate.call_once(|| runs += 1));
        assert_eq!(runs, 1);
        assert!(gate.is_fired());
    }

    #[test]
    fn concurrent_racers_run_action_exactly_once() {
        const RACERS: usize = 8;
        let gate = Arc::new(OnceGate::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let barrier = Arc::new(Barrier::new(RACERS));

        let handles: Vec<_> = (0..RACERS)
            .map(|_| {
                let gate = Arc::clone(&gate);
                let runs = Arc::clone(&runs);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    let won = gate.call_once(|| {
                        thread::yield_now();
                        runs.fetch_add(1, Ordering::SeqCst);
                    });
                    // 失败者返回时必须已能观察到胜者的副作用。
                    assert_eq!(runs.load(Ordering::SeqCst), 1);
                    won
                })
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|handle| handle.join().expect("竞争线程不应 panic"))
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_action_leaves_gate_open() {
        let gate = OnceGate::new();
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            gate.call_once(|| panic!("后端构造失败"));
        }));
        assert!(outcome.is_err());
        assert!(!gate.is_fired());
        assert!(gate.call_once(|| {}));
    }
}
