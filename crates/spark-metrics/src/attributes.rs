use std::borrow::Cow;

/// 指标属性键。
///
/// # 设计背景（Why）
/// - 采用 `Cow<'a, str>` 兼顾静态常量与运行时生成的键名，避免在热路径重复分配。
///
/// # 契约说明（What）
/// - 键名应保持低基数、蛇形或点分命名；本 crate 不做校验，校验职责属于真实后端。
pub type AttributeKey<'a> = Cow<'a, str>;

/// 单个属性键值对。
///
/// # 契约说明（What）
/// - `key` 与 `value` 均可借用或拥有；需要跨线程长期保存时调用 [`KeyValue::into_owned`]。
/// - 代理仪表在未绑定后端前不会读取属性，也不会缓存调用方传入的引用。
#[derive(Clone, Debug, PartialEq)]
pub struct KeyValue<'a> {
    pub key: AttributeKey<'a>,
    pub value: MetricAttributeValue<'a>,
}

impl<'a> KeyValue<'a> {
    /// 构建新的属性键值对。
    pub fn new(
        key: impl Into<AttributeKey<'a>>,
        value: impl Into<MetricAttributeValue<'a>>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }

    /// 将键值对提升为 `'static` 生命周期，文本会触发一次分配。
    pub fn into_owned(self) -> KeyValue<'static> {
        KeyValue {
            key: Cow::Owned(self.key.into_owned()),
            value: self.value.into_owned(),
        }
    }
}

/// 属性集合的借用视图。
///
/// # 契约说明（What）
/// - 仅提供只读视图，生命周期由调用方管理；实现方不得缓存该引用超出调用栈范围。
/// - 同步仪表（`add`/`record`）统一以该别名接收属性，保持对象安全且无需泛型。
pub type AttributeSet<'a> = &'a [KeyValue<'a>];

/// 指标属性值的统一枚举。
///
/// # 设计背景（Why）
/// - 提供布尔、整数、浮点、文本四种标量，避免将数值强制转为字符串造成信息损失。
///
/// # 风险提示（Trade-offs）
/// - 未区分有符号与无符号整型，统一折叠为 `i64`；超过 `i64::MAX` 的 `u64` 饱和截断。
#[derive(Clone, Debug, PartialEq)]
#[non_exhaustive]
pub enum MetricAttributeValue<'a> {
    Text(Cow<'a, str>),
    Bool(bool),
    F64(f64),
    I64(i64),
}

impl<'a> From<&'a str> for MetricAttributeValue<'a> {
    fn from(value: &'a str) -> Self {
        Self::Text(Cow::Borrowed(value))
    }
}

impl From<String> for MetricAttributeValue<'_> {
    fn from(value: String) -> Self {
        Self::Text(Cow::Owned(value))
    }
}

impl<'a> From<Cow<'a, str>> for MetricAttributeValue<'a> {
    fn from(value: Cow<'a, str>) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for MetricAttributeValue<'_> {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for MetricAttributeValue<'_> {
    fn from(value: f64) -> Self {
        Self::F64(value)
    }
}

impl From<i64> for MetricAttributeValue<'_> {
    fn from(value: i64) -> Self {
        Self::I64(value)
    }
}

impl From<i32> for MetricAttributeValue<'_> {
    fn from(value: i32) -> Self {
        Self::I64(value.into())
    }
}

impl From<u64> for MetricAttributeValue<'_> {
    fn from(value: u64) -> Self {
        Self::I64(i64::try_from(value).unwrap_or(i64::MAX))
    }
}

impl From<u32> for MetricAttributeValue<'_> {
    fn from(value: u32) -> Self {
        Self::I64(value.into())
    }
}

impl MetricAttributeValue<'_> {
    /// 转化为拥有所有权的形式，适合缓存或跨线程传递。
    pub fn into_owned(self) -> MetricAttributeValue<'static> {
        match self {
            MetricAttributeValue::Text(text) => {
                MetricAttributeValue::Text(Cow::Owned(text.into_owned()))
            }
            MetricAttributeValue::Bool(value) => MetricAttributeValue::Bool(value),
            MetricAttributeValue::F64(value) => MetricAttributeValue::F64(value),
            MetricAttributeValue::I64(value) => MetricAttributeValue::I64(value),
        }
    }
}

/// 拥有所有权的属性集合。
///
/// # 设计背景（Why）
/// - 可观测仪表的回调在采集时刻才产出 [`Measurement`](crate::Measurement)，属性需要脱离调用栈存活，
///   因此测量值统一携带本结构，而非借用视图。
///
/// # 逻辑解析（How）
/// - 内部维护 `Vec<KeyValue<'static>>`；[`Self::as_slice`] 暴露为 [`AttributeSet`]，可直接传入同步仪表。
#[derive(Default, Clone, Debug, PartialEq)]
pub struct OwnedAttributeSet {
    entries: Vec<KeyValue<'static>>,
}

impl OwnedAttributeSet {
    /// 创建空的属性集合。
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// 将借用视图中的键值对复制为拥有所有权的集合。
    pub fn from_borrowed(borrowed: AttributeSet<'_>) -> Self {
        let mut owned = Self::new();
        owned.extend_from(borrowed);
        owned
    }

    /// 追加借用视图中的全部键值对，已有条目保持不变。
    pub fn extend_from(&mut self, borrowed: AttributeSet<'_>) {
        self.entries.reserve(borrowed.len());
        for kv in borrowed {
            self.entries.push(kv.clone().into_owned());
        }
    }

    /// 以拥有所有权的方式追加一个键值对。
    pub fn push_owned(
        &mut self,
        key: impl Into<AttributeKey<'static>>,
        value: impl Into<MetricAttributeValue<'static>>,
    ) {
        self.entries.push(KeyValue {
            key: key.into(),
            value: value.into(),
        });
    }

    /// 链式追加，便于在回调中就地构造测量值。
    pub fn with(
        mut self,
        key: impl Into<AttributeKey<'static>>,
        value: impl Into<MetricAttributeValue<'static>>,
    ) -> Self {
        self.push_owned(key, value);
        self
    }

    /// 以切片形式访问，供同步仪表接口消费。
    pub fn as_slice(&self) -> AttributeSet<'_> {
        self.entries.as_slice()
    }

    /// 按键查找属性值。
    pub fn get(&self, key: &str) -> Option<&MetricAttributeValue<'static>> {
        self.entries
            .iter()
            .find(|kv| kv.key == key)
            .map(|kv| &kv.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 清空集合但保留容量。
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl FromIterator<KeyValue<'static>> for OwnedAttributeSet {
    fn from_iter<T: IntoIterator<Item = KeyValue<'static>>>(iter: T) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn owned_set_copies_borrowed_entries() {
        let owned = {
            let route = String::from("/v1/items");
            let borrowed = [
                KeyValue::new("http.route", route.as_str()),
                KeyValue::new("retry", false),
            ];
            OwnedAttributeSet::from_borrowed(&borrowed)
        };

        assert_eq!(owned.len(), 2);
        assert_eq!(
            owned.get("http.route"),
            Some(&MetricAttributeValue::Text(Cow::Owned("/v1/items".into())))
        );
        assert_eq!(owned.get("retry"), Some(&MetricAttributeValue::Bool(false)));
        assert!(owned.get("missing").is_none());
    }

    #[test]
    fn oversized_unsigned_saturates() {
        assert_eq!(
            MetricAttributeValue::from(u64::MAX),
            MetricAttributeValue::I64(i64::MAX)
        );
        assert_eq!(MetricAttributeValue::from(7_u32), MetricAttributeValue::I64(7));
    }
}
