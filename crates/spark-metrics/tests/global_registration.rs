//! 进程级注册：先插桩、后注册，再尝试覆盖。
//!
//! 本文件独占一个测试进程，进程级状态在唯一的用例中只注册一次。

use std::sync::Arc;

use spark_metrics::{
    get_meter, get_meter_provider, global, prelude::*, set_meter_provider,
    test_stubs::RecordingMeterProvider,
};

#[test]
fn first_registration_wins_and_upgrades_early_handles() {
    let early_meter = get_meter("billing", Some("3.0.0"), None).expect("未配置后端时不会失败");
    let invoices = early_meter.create_counter("invoices".into());
    invoices.increment(&[]);

    let winner = Arc::new(RecordingMeterProvider::new());
    let loser = Arc::new(RecordingMeterProvider::new());
    set_meter_provider(winner.clone());
    set_meter_provider(loser.clone());

    invoices.add(4, &[]);
    get_meter("billing", None, None)
        .expect("已注册时不会失败")
        .create_counter("invoices".into())
        .increment(&[]);

    let effective = get_meter_provider().expect("已注册时不会失败");
    assert!(std::ptr::addr_eq(Arc::as_ptr(&effective), Arc::as_ptr(&winner)));
    assert_eq!(winner.sum("invoices"), 5.0);
    assert!(loser.meters().is_empty(), "被拒绝的 Provider 不会收到任何请求");
    assert!(global().proxy().is_bound());
    assert_eq!(global().proxy().meters().len(), 1);
}
