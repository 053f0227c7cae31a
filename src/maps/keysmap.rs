//! 平台键定义图
//!
//! 键定义图按平台 props 记号命名，`topichead[@navtitle]` 容器下
//! 挂 `keydef` 条目。keydef 的 `keys` 是记录的键，`href` 指向主题
//! 文件，可选的 `topicmeta/keywords/keyword` 提供展示名。键重复
//! 按成功空操作处理。

use crate::change::ChangeRecord;
use crate::dom::{Element, XmlDocument};
use crate::patcher::{append_child, sort_children_by_key, text_element, PatchOutcome};

fn keys_key(element: &Element) -> Option<String> {
    if element.name == "keydef" {
        element.attr("keys").map(String::from)
    } else {
        None
    }
}

/// 构造完整的 keydef 子树
///
/// `depth` 是 keydef 自身所处的嵌套深度，keyword 存在时逐层展开
/// topicmeta/keywords/keyword。
fn build_keydef(record: &ChangeRecord, depth: usize) -> Element {
    let mut keydef = Element::new("keydef");
    keydef.set_attr("keys", &record.key);
    keydef.set_attr("href", &record.topic_href());
    if let Some(keyword) = record.keyword.as_deref() {
        let mut keywords = Element::new("keywords");
        append_child(&mut keywords, depth + 2, text_element("keyword", keyword));
        let mut topicmeta = Element::new("topicmeta");
        append_child(&mut topicmeta, depth + 1, keywords);
        append_child(&mut keydef, depth, topicmeta);
    }
    keydef
}

/// 把记录的键定义挂入键定义图
///
/// 容器按 `navtitle` 导航标题精确匹配。navtitle 未指定或容器
/// 缺失时告警跳过，已有同键 keydef 时按成功空操作处理。
pub fn insert_keydef(doc: &mut XmlDocument, record: &ChangeRecord) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    let navtitle = match record.navtitle.as_deref() {
        Some(title) if !title.trim().is_empty() => title,
        _ => {
            log::warn!("记录 {} 未指定 navtitle，键定义未插入", record.key);
            return outcome;
        }
    };

    let Some((topichead, depth)) = doc.root.descendant_with_depth_mut(
        &|el| el.name == "topichead" && el.attr("navtitle") == Some(navtitle),
        0,
    ) else {
        log::warn!("键定义图中找不到 navtitle '{}' 的容器，键 {} 未插入", navtitle, record.key);
        return outcome;
    };

    let duplicate = topichead
        .child_elements()
        .any(|el| el.name == "keydef" && el.attr("keys") == Some(record.key.as_str()));
    if duplicate {
        log::debug!("键定义已存在，跳过: {}", record.key);
        outcome.skipped += 1;
        return outcome;
    }

    let keydef = build_keydef(record, depth + 1);
    append_child(topichead, depth, keydef);
    sort_children_by_key(topichead, depth, &keys_key);
    outcome.inserted += 1;
    outcome
}
