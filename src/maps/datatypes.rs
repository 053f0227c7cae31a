//! 全局数据类型索引
//!
//! 单个文件集中列出全部类与枚举：`section[@id="class"]` 与
//! `section[@id="enum"]` 下按平台放 `ul[@props]`，列表项是
//! `li/xref[@keyref]`。记录适用的每个平台列表各插一条，重复项
//! 按嵌套 xref 的 keyref 探测，插入后按它重排。

use crate::change::{ChangeKind, ChangeRecord};
use crate::dom::{Element, XmlDocument, XmlNode};
use crate::patcher::{append_child, sort_children_by_key, PatchOutcome};
use crate::utils::split_props;

fn xref_key(element: &Element) -> Option<String> {
    if element.name != "li" {
        return None;
    }
    element.first_child("xref").and_then(|xref| xref.attr("keyref").map(String::from))
}

/// 记录对应的索引节 id，类与枚举之外的类别不进索引
fn section_id(kind: ChangeKind) -> Option<&'static str> {
    match kind {
        ChangeKind::Class => Some("class"),
        ChangeKind::Enum => Some("enum"),
        ChangeKind::Api | ChangeKind::Callback => None,
    }
}

/// 把类或枚举条目写入数据类型索引
///
/// 对记录的每个平台，在对应 `ul[@props]` 中插入
/// `<li><xref keyref="..."/></li>`。平台列表缺失只告警，已有
/// 条目按成功空操作处理。
pub fn insert_xref(doc: &mut XmlDocument, record: &ChangeRecord) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    let Some(section_id) = section_id(record.attributes) else {
        return outcome;
    };

    let Some((section, section_depth)) = doc.root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some(section_id),
        0,
    ) else {
        log::warn!("数据类型索引缺少 section '{}'，键 {} 未插入", section_id, record.key);
        return outcome;
    };

    for platform in record.platform_set().platforms() {
        let token = platform.token();
        let Some((list, list_depth)) = section.descendant_with_depth_mut(
            &|el| {
                el.name == "ul"
                    && el
                        .attr("props")
                        .map(|props| split_props(props).contains(&token))
                        .unwrap_or(false)
            },
            section_depth,
        ) else {
            log::warn!("数据类型索引缺少 {} 平台的列表，键 {} 未插入", token, record.key);
            continue;
        };

        let duplicate = list.child_elements().any(|li| {
            li.descendant(&|el| el.name == "xref" && el.attr("keyref") == Some(record.key.as_str()))
                .is_some()
        });
        if duplicate {
            log::debug!("数据类型条目已存在，跳过: {} ({})", record.key, token);
            outcome.skipped += 1;
            continue;
        }

        let mut xref = Element::new("xref");
        xref.set_attr("keyref", &record.key);
        let mut item = Element::new("li");
        item.children.push(XmlNode::Element(xref));
        append_child(list, list_depth, item);
        sort_children_by_key(list, list_depth, &xref_key);
        outcome.inserted += 1;
    }
    outcome
}
