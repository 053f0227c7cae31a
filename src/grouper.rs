//! 平台取值分组器
//!
//! 变更描述中按平台取值的字段（原型、平台专有名称与描述、返回值、
//! 枚举值）在写入 DITA 前先归并：取值相同的平台合并为一组，每组
//! 渲染为一个带 `props` 条件属性的节点。
//!
//! 分组顺序由取值在输入中的首次出现位置决定，与平台顺序无关；
//! 组内平台集合的 `props` 渲染顺序则由注册表的规范顺序决定。

use indexmap::IndexMap;

use crate::platforms::{expand_id, Platform, PlatformSet};

/// 分组结果：一个取值与支持它的平台集合
///
/// 各组的平台集合互不相交，全部组的并集等于输入中可解析的
/// 平台集合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupedValue {
    pub value: String,
    pub platforms: PlatformSet,
}

impl GroupedValue {
    /// 渲染为 props 条件属性值
    pub fn props(&self) -> String {
        self.platforms.props()
    }
}

/// 将 (平台键, 取值) 对按相同取值归并
///
/// # 参数
/// * `pairs` - 平台键到取值的序列，通常来自保序映射的迭代
///
/// # 返回
/// 按取值首次出现顺序排列的分组。未注册的平台键告警后剔除，
/// 剔除后不支撑任何取值的组不会出现在结果中。
pub fn group_values<'a, I>(pairs: I) -> Vec<GroupedValue>
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    let mut groups: IndexMap<&str, PlatformSet> = IndexMap::new();
    for (id, value) in pairs {
        match expand_id(id) {
            Some(bits) => {
                *groups.entry(value).or_insert_with(PlatformSet::empty) |= bits;
            }
            None => log::warn!("未知平台标识 '{}'，取值已忽略", id),
        }
    }
    groups
        .into_iter()
        .map(|(value, platforms)| GroupedValue {
            value: value.to_string(),
            platforms,
        })
        .collect()
}

/// 跨平台条目按关键字段归组的结果
#[derive(Debug, Clone)]
pub struct KeyedGroup<T> {
    /// 归组关键字段的值
    pub key: String,
    /// 该组覆盖的平台并集
    pub platforms: PlatformSet,
    /// 组内条目，保持 (平台, 条目) 的输入顺序
    pub items: Vec<(Platform, T)>,
}

/// 将 (平台, 条目) 序列按关键字段归组
///
/// 枚举值按跨平台别名归组时使用：同一别名在各平台的条目进同
/// 一组，组顺序由别名首次出现位置决定。
pub fn group_by_key<T, I, K>(items: I, key_fn: K) -> Vec<KeyedGroup<T>>
where
    I: IntoIterator<Item = (Platform, T)>,
    K: Fn(&T) -> &str,
{
    let mut groups: IndexMap<String, KeyedGroup<T>> = IndexMap::new();
    for (platform, item) in items {
        let key = key_fn(&item).to_string();
        let group = groups.entry(key.clone()).or_insert_with(|| KeyedGroup {
            key,
            platforms: PlatformSet::empty(),
            items: Vec::new(),
        });
        group.platforms |= platform.bit();
        group.items.push((platform, item));
    }
    groups.into_values().collect()
}
