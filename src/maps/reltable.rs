//! 全局关系表
//!
//! 关系表把类主题与其方法、回调主题关联起来。每个类占一个
//! `relrow`：一个 `relcell` 放类的 topicref，兄弟 `relcell` 放
//! 成员条目。新条目是 `topicref[keyref][props]`，props 按记录的
//! 平台集合渲染，插入后单元格内按 keyref 重排。

use crate::change::ChangeRecord;
use crate::dom::{Element, XmlDocument};
use crate::patcher::{
    append_child, merge_element_props, sort_children_by_key, PatchMode, PatchOutcome,
};

fn keyref_key(element: &Element) -> Option<String> {
    if element.name == "topicref" {
        element.attr("keyref").map(String::from)
    } else {
        None
    }
}

/// 把记录的关系条目写入关系表
///
/// 只有带所属类的记录才进关系表；行按所属类的 topicref 定位，
/// 条目插入该行的第一个兄弟单元格。重复条目在 create 模式下按
/// 成功空操作处理，在 modify 模式下合并 props 平台集合。
pub fn insert_relation(
    doc: &mut XmlDocument,
    record: &ChangeRecord,
    mode: PatchMode,
) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    let Some(parent) = record.parent_class() else {
        return outcome;
    };

    let contains_parent = |cell: &Element| {
        cell.child_elements()
            .any(|el| el.name == "topicref" && el.attr("keyref") == Some(parent))
    };
    let Some((relrow, row_depth)) = doc.root.descendant_with_depth_mut(
        &|el| {
            el.name == "relrow"
                && el
                    .child_elements()
                    .any(|cell| cell.name == "relcell" && contains_parent(cell))
        },
        0,
    ) else {
        log::warn!("关系表中找不到所属类 '{}' 的行，键 {} 未插入", parent, record.key);
        return outcome;
    };

    let cell_depth = row_depth + 1;
    let Some(cell) = relrow
        .child_elements_mut()
        .find(|cell| cell.name == "relcell" && !contains_parent(cell))
    else {
        log::warn!("所属类 '{}' 的行缺少成员单元格，键 {} 未插入", parent, record.key);
        return outcome;
    };

    let existing = cell
        .child_elements_mut()
        .find(|el| el.name == "topicref" && el.attr("keyref") == Some(record.key.as_str()));
    match existing {
        Some(element) => match mode {
            PatchMode::Modify => {
                if merge_element_props(element, record.platform_set()) {
                    outcome.merged += 1;
                } else {
                    outcome.skipped += 1;
                }
            }
            PatchMode::Create => {
                log::debug!("关系条目已存在，跳过: {}", record.key);
                outcome.skipped += 1;
            }
        },
        None => {
            let mut topicref = Element::new("topicref");
            topicref.set_attr("keyref", &record.key);
            let props = record.platform_set().props();
            if !props.is_empty() {
                topicref.set_attr("props", &props);
            }
            append_child(cell, cell_depth, topicref);
            sort_children_by_key(cell, cell_depth, &keyref_key);
            outcome.inserted += 1;
        }
    }
    outcome
}
