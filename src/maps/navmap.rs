//! 平台导航图
//!
//! 导航图中每个平台一份文件，目录树由 `topichead` 与 `topicref`
//! 组成。新主题挂在 `toc_href` 指定的父条目下，生成
//! `topicref[keyref][toc="no"]`，插入后父条目的子项按 keyref 重排。

use crate::change::ChangeRecord;
use crate::dom::{Element, XmlDocument};
use crate::patcher::{append_child, sort_children_by_key, PatchOutcome};

fn keyref_key(element: &Element) -> Option<String> {
    if element.name == "topicref" {
        element.attr("keyref").map(String::from)
    } else {
        None
    }
}

/// 把记录的主题条目挂入导航图
///
/// 父条目按 `toc_href` 与 `href` 属性精确匹配。父条目缺失与重复
/// 条目都不视为错误：前者告警跳过，后者按成功空操作处理。
pub fn insert_topicref(doc: &mut XmlDocument, record: &ChangeRecord) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    let Some(toc_href) = record.toc_href.as_deref() else {
        return outcome;
    };

    let Some((parent, depth)) = doc.root.descendant_with_depth_mut(
        &|el| el.name == "topicref" && el.attr("href") == Some(toc_href),
        0,
    ) else {
        log::warn!("导航图中找不到 href '{}' 的父条目，主题 {} 未挂载", toc_href, record.key);
        return outcome;
    };

    let duplicate = parent
        .child_elements()
        .any(|el| el.name == "topicref" && el.attr("keyref") == Some(record.key.as_str()));
    if duplicate {
        log::debug!("导航图条目已存在，跳过: {}", record.key);
        outcome.skipped += 1;
        return outcome;
    }

    let mut topicref = Element::new("topicref");
    topicref.set_attr("keyref", &record.key);
    topicref.set_attr("toc", "no");
    append_child(parent, depth, topicref);
    sort_children_by_key(parent, depth, &keyref_key);
    outcome.inserted += 1;
    outcome
}
