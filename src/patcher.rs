//! 文档补丁工具
//!
//! 所有对 DITA 树的结构性修改都经过这里：插入时维护换行加缩进
//! 的布局，写入前按查重键探测已有条目。重复条目在 create 流程中
//! 跳过，在 modify 流程中合并 props 平台集合，保证重跑幂等。
//!
//! 缩进规则：元素的行首缩进是嵌套深度乘以单位缩进，根元素深度
//! 为 0。插入的元素之间以及最后一个元素与父元素闭合标签之间的
//! 分隔文本都按该规则生成。

use crate::dom::{Element, XmlNode};
use crate::grouper::GroupedValue;
use crate::platforms::{merge_props, PlatformSet};

/// 插入模式，决定重复条目的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchMode {
    /// 重复条目跳过
    Create,
    /// 重复条目合并 props 平台集合
    Modify,
}

/// 单位缩进
pub const INDENT_UNIT: &str = "    ";

/// 指定嵌套深度的行首缩进
pub fn indent(depth: usize) -> String {
    INDENT_UNIT.repeat(depth)
}

/// 补丁操作统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchOutcome {
    pub inserted: usize,
    pub merged: usize,
    pub skipped: usize,
}

impl PatchOutcome {
    pub fn changed(&self) -> bool {
        self.inserted > 0 || self.merged > 0
    }

    /// 并入另一份统计
    pub fn absorb(&mut self, other: PatchOutcome) {
        self.inserted += other.inserted;
        self.merged += other.merged;
        self.skipped += other.skipped;
    }
}

/// 在 parent（位于 depth）末尾追加节点并维护缩进
///
/// 父元素原有的闭合缩进文本被复用为新节点的行首分隔，追加后
/// 重新生成闭合缩进，文档布局与手写内容一致。
pub fn append_node(parent: &mut Element, depth: usize, node: XmlNode) {
    let child_sep = format!("\n{}", indent(depth + 1));
    let close_sep = format!("\n{}", indent(depth));
    match parent.children.last_mut() {
        Some(XmlNode::Text(text)) if text.trim().is_empty() => *text = child_sep,
        _ => parent.children.push(XmlNode::Text(child_sep)),
    }
    parent.children.push(node);
    parent.children.push(XmlNode::Text(close_sep));
}

/// 在 parent（位于 depth）末尾追加元素
pub fn append_child(parent: &mut Element, depth: usize, element: Element) {
    append_node(parent, depth, XmlNode::Element(element));
}

/// 构造带文本的元素
pub fn text_element(name: &str, text: &str) -> Element {
    let mut element = Element::new(name);
    element.set_text(text);
    element
}

/// 构造带 props 条件属性的文本元素，props 为空时不写属性
pub fn props_text_element(name: &str, text: &str, props: &str) -> Element {
    let mut element = text_element(name, text);
    if !props.is_empty() {
        element.set_attr("props", props);
    }
    element
}

/// 合并元素的 props 平台集合
///
/// 无 props 属性的元素对全平台生效，保持不变。返回是否发生修改。
pub fn merge_element_props(element: &mut Element, platforms: PlatformSet) -> bool {
    let existing = match element.attr("props") {
        Some(props) if !props.trim().is_empty() => props.to_string(),
        _ => return false,
    };
    let merged = merge_props(&existing, platforms);
    if merged == existing {
        return false;
    }
    element.set_attr("props", &merged);
    true
}

/// 按分组批量插入文本元素
///
/// 查重键是元素的文本内容（去首尾空白）。已有条目在 Create 模式
/// 下跳过，在 Modify 模式下合并 props。
pub fn patch_grouped_text(
    parent: &mut Element,
    depth: usize,
    tag: &str,
    groups: &[GroupedValue],
    mode: PatchMode,
) -> PatchOutcome {
    let mut outcome = PatchOutcome::default();
    for group in groups {
        let value = group.value.trim().to_string();
        let existing = parent
            .child_elements_mut()
            .find(|el| el.name == tag && el.text().trim() == value);
        match existing {
            Some(element) => match mode {
                PatchMode::Modify => {
                    if merge_element_props(element, group.platforms) {
                        outcome.merged += 1;
                    } else {
                        outcome.skipped += 1;
                    }
                }
                PatchMode::Create => {
                    log::debug!("条目已存在，跳过: <{}>{}</{}>", tag, value, tag);
                    outcome.skipped += 1;
                }
            },
            None => {
                append_child(
                    parent,
                    depth,
                    props_text_element(tag, &group.value, &group.props()),
                );
                outcome.inserted += 1;
            }
        }
    }
    outcome
}

/// 在 parml 中按参数名查找已有 plentry（匹配任一 pt 的文本）
pub fn find_plentry<'a>(parml: &'a mut Element, name: &str) -> Option<&'a mut Element> {
    parml.child_elements_mut().find(|entry| {
        entry.name == "plentry"
            && entry
                .child_elements()
                .any(|child| child.name == "pt" && child.text().trim() == name)
    })
}

/// 在 parml 中按一组候选值查找已有 plentry（匹配任一 pt 的文本）
///
/// 枚举值条目没有跨平台公共名，用该组在各平台的全部值名探测。
pub fn find_plentry_by_values<'a>(
    parml: &'a mut Element,
    values: &[&str],
) -> Option<&'a mut Element> {
    parml.child_elements_mut().find(|entry| {
        entry.name == "plentry"
            && entry
                .child_elements()
                .any(|child| child.name == "pt" && values.contains(&child.text().trim()))
    })
}

/// 将带排序键的子元素按键排序（不区分大小写）
///
/// 无键的节点（topicmeta、注释等）保持原有相对顺序排在最前，
/// 空白文本全部重建。
pub fn sort_children_by_key(
    parent: &mut Element,
    depth: usize,
    key_fn: &dyn Fn(&Element) -> Option<String>,
) {
    let mut keyless: Vec<XmlNode> = Vec::new();
    let mut keyed: Vec<(String, Element)> = Vec::new();
    for node in parent.children.drain(..) {
        match node {
            XmlNode::Element(element) => match key_fn(&element) {
                Some(key) => keyed.push((key.to_lowercase(), element)),
                None => keyless.push(XmlNode::Element(element)),
            },
            other => {
                if !other.is_whitespace() {
                    keyless.push(other);
                }
            }
        }
    }
    keyed.sort_by(|a, b| a.0.cmp(&b.0));

    for node in keyless {
        append_node(parent, depth, node);
    }
    for (_, element) in keyed {
        append_child(parent, depth, element);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;
    use crate::grouper::group_values;
    use crate::platforms::Platform;

    #[test]
    fn test_append_into_empty_parent() {
        let mut parml = Element::new("parml");
        append_child(&mut parml, 3, text_element("plentry", "x"));
        let mut out = String::new();
        crate::dom::writer::write_element(&mut out, &parml);
        assert_eq!(out, "<parml>\n                <plentry>x</plentry>\n            </parml>");
    }

    #[test]
    fn test_append_reuses_closing_indent() {
        let source = "<ul>\n    <li>a</li>\n</ul>";
        let mut doc = XmlDocument::parse_str(source).unwrap();
        append_child(&mut doc.root, 0, text_element("li", "b"));
        assert_eq!(doc.to_xml(), "<ul>\n    <li>a</li>\n    <li>b</li>\n</ul>");
    }

    #[test]
    fn test_patch_grouped_text_inserts_with_props() {
        let mut doc = XmlDocument::parse_str("<section>\n    <p>说明</p>\n</section>").unwrap();
        let groups = group_values([("windows", "仅限桌面端。"), ("ios", "仅限桌面端。")]);
        let outcome = patch_grouped_text(&mut doc.root, 0, "p", &groups, PatchMode::Create);
        assert_eq!(outcome.inserted, 1);
        assert_eq!(
            doc.to_xml(),
            "<section>\n    <p>说明</p>\n    <p props=\"cpp ios\">仅限桌面端。</p>\n</section>"
        );
    }

    #[test]
    fn test_patch_grouped_text_create_skips_duplicates() {
        let mut doc =
            XmlDocument::parse_str("<section>\n    <p props=\"cpp\">仅限桌面端。</p>\n</section>")
                .unwrap();
        let before = doc.to_xml();
        let groups = group_values([("windows", "仅限桌面端。")]);
        let outcome = patch_grouped_text(&mut doc.root, 0, "p", &groups, PatchMode::Create);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.inserted, 0);
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_patch_grouped_text_modify_merges_props() {
        let mut doc =
            XmlDocument::parse_str("<section>\n    <p props=\"cpp\">仅限桌面端。</p>\n</section>")
                .unwrap();
        let groups = group_values([("macos", "仅限桌面端。")]);
        let outcome = patch_grouped_text(&mut doc.root, 0, "p", &groups, PatchMode::Modify);
        assert_eq!(outcome.merged, 1);
        let p = doc.root.first_child("p").unwrap();
        assert_eq!(p.attr("props"), Some("cpp macos"));
    }

    #[test]
    fn test_modify_keeps_universal_entry_unchanged() {
        // 无 props 的条目对全平台生效，不能因合并反而收窄
        let mut doc =
            XmlDocument::parse_str("<section>\n    <p>通用说明。</p>\n</section>").unwrap();
        let before = doc.to_xml();
        let groups = group_values([("android", "通用说明。")]);
        let outcome = patch_grouped_text(&mut doc.root, 0, "p", &groups, PatchMode::Modify);
        assert_eq!(outcome.skipped, 1);
        assert_eq!(doc.to_xml(), before);
    }

    #[test]
    fn test_merge_element_props_idempotent() {
        let mut element = props_text_element("p", "x", "cpp ios");
        assert!(!merge_element_props(&mut element, Platform::Ios.bit()));
        assert!(merge_element_props(&mut element, Platform::Android.bit()));
        assert_eq!(element.attr("props"), Some("cpp ios java"));
    }

    #[test]
    fn test_find_plentry_by_pt_text() {
        let source = "<parml>\n    <plentry>\n        <pt>channelId</pt>\n        <pd>频道名。</pd>\n    </plentry>\n</parml>";
        let mut doc = XmlDocument::parse_str(source).unwrap();
        assert!(find_plentry(&mut doc.root, "channelId").is_some());
        assert!(find_plentry(&mut doc.root, "uid").is_none());
        assert!(find_plentry_by_values(&mut doc.root, &["other", "channelId"]).is_some());
    }

    #[test]
    fn test_sort_children_keeps_keyless_first() {
        let source = "<topichead navtitle=\"Core\">\n    <topicmeta/>\n    <keydef keys=\"zeta\"/>\n    <keydef keys=\"Alpha\"/>\n</topichead>";
        let mut doc = XmlDocument::parse_str(source).unwrap();
        sort_children_by_key(&mut doc.root, 0, &|el| {
            if el.name == "keydef" {
                el.attr("keys").map(String::from)
            } else {
                None
            }
        });
        assert_eq!(
            doc.to_xml(),
            "<topichead navtitle=\"Core\">\n    <topicmeta/>\n    <keydef keys=\"Alpha\"/>\n    <keydef keys=\"zeta\"/>\n</topichead>"
        );
    }

    #[test]
    fn test_indent_units() {
        assert_eq!(indent(0), "");
        assert_eq!(indent(2), "        ");
    }
}
