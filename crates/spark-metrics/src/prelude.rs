//! 常用 Trait 的集中导出：`use spark_metrics::prelude::*;` 即可调用仪表的记录方法。

pub use crate::{
    instrument::{
        Counter, Histogram, Instrument, ObservableCounter, ObservableGauge,
        ObservableUpDownCounter, UpDownCounter,
    },
    meter::{Meter, MeterProvider},
};
