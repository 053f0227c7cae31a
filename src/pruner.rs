//! 空节裁剪与默认句填充
//!
//! 模板主题带有全量的 section 骨架，记录里没有内容支撑的可选节
//! （使用场景、相关回调、参数列表等）在写盘前整节移除；必须保留
//! 的节（调用时机、调用限制）在内容为空时填入默认句。
//!
//! 默认句表内置在 data/section_defaults.json 中，可在配置层替换。

use serde::{Deserialize, Serialize};

use crate::dom::Element;
use crate::patcher::{append_child, text_element};
use crate::utils::SyncError;

/// 必留节的默认句表
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectionDefaults {
    /// 调用时机缺省句
    pub timing: String,
    /// 调用限制缺省句
    pub restriction: String,
}

impl SectionDefaults {
    /// 加载内置默认句表
    pub fn embedded() -> Result<Self, SyncError> {
        let json_data = include_str!("../data/section_defaults.json");
        Ok(serde_json::from_str(json_data)?)
    }
}

/// 整节移除指定 id 的 section，返回是否发生移除
///
/// 先在 root 的直接子元素中找，再向下找包含该节的父元素，
/// 节本身与其前导的缩进空白一起删除。
pub fn remove_section(root: &mut Element, section_id: &str) -> bool {
    let matches =
        |el: &Element| el.name == "section" && el.attr("id") == Some(section_id);
    if root.remove_child_elements_where(&matches) > 0 {
        return true;
    }
    if let Some(parent) = root.descendant_mut(&|el| el.child_elements().any(&matches)) {
        return parent.remove_child_elements_where(&matches) > 0;
    }
    false
}

/// 设置指定节的首个段落文本，段落缺失时创建
///
/// 返回 false 表示主题中没有该节，调用方按缺结构告警处理。
pub fn set_section_text(root: &mut Element, section_id: &str, text: &str) -> bool {
    let found = root.descendant_with_depth_mut(
        &|el| el.name == "section" && el.attr("id") == Some(section_id),
        0,
    );
    let Some((section, depth)) = found else {
        return false;
    };
    let has_paragraph = section.first_child("p").is_some();
    if has_paragraph {
        if let Some(paragraph) = section.first_child_mut("p") {
            paragraph.set_text(text);
        }
    } else {
        append_child(section, depth, text_element("p", text));
    }
    true
}

/// 可选节处理：内容为空时整节移除，否则写入文本
pub fn fill_or_prune(root: &mut Element, section_id: &str, text: Option<&str>) -> bool {
    match text {
        Some(value) if !value.trim().is_empty() => set_section_text(root, section_id, value),
        _ => remove_section(root, section_id),
    }
}

/// 必留节处理：内容为空时写入默认句
pub fn fill_with_default(
    root: &mut Element,
    section_id: &str,
    text: Option<&str>,
    default_text: &str,
) -> bool {
    let value = match text {
        Some(t) if !t.trim().is_empty() => t,
        _ => default_text,
    };
    set_section_text(root, section_id, value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::XmlDocument;

    const BODY: &str = "<reference id=\"api_foo\">\n    <refbody>\n        <section id=\"timing\">\n            <p/>\n        </section>\n        <section id=\"scenario\">\n            <p/>\n        </section>\n    </refbody>\n</reference>";

    #[test]
    fn test_embedded_defaults() {
        let defaults = SectionDefaults::embedded().unwrap();
        assert_eq!(defaults.timing, "加入频道前后均可调用。");
        assert_eq!(defaults.restriction, "无。");
    }

    #[test]
    fn test_remove_section_under_refbody() {
        let mut doc = XmlDocument::parse_str(BODY).unwrap();
        assert!(remove_section(&mut doc.root, "scenario"));
        assert!(doc
            .root
            .descendant(&|el| el.attr("id") == Some("scenario"))
            .is_none());
        // timing 节不受影响
        assert!(doc
            .root
            .descendant(&|el| el.attr("id") == Some("timing"))
            .is_some());
    }

    #[test]
    fn test_remove_section_missing() {
        let mut doc = XmlDocument::parse_str(BODY).unwrap();
        assert!(!remove_section(&mut doc.root, "related"));
    }

    #[test]
    fn test_set_section_text_existing_paragraph() {
        let mut doc = XmlDocument::parse_str(BODY).unwrap();
        assert!(set_section_text(&mut doc.root, "timing", "仅可在加入频道前调用。"));
        let section = doc
            .root
            .descendant(&|el| el.attr("id") == Some("timing"))
            .unwrap();
        assert_eq!(section.first_child("p").unwrap().text(), "仅可在加入频道前调用。");
    }

    #[test]
    fn test_set_section_text_creates_paragraph() {
        let source = "<reference>\n    <refbody>\n        <section id=\"restriction\"/>\n    </refbody>\n</reference>";
        let mut doc = XmlDocument::parse_str(source).unwrap();
        assert!(set_section_text(&mut doc.root, "restriction", "无。"));
        assert_eq!(
            doc.to_xml(),
            "<reference>\n    <refbody>\n        <section id=\"restriction\">\n            <p>无。</p>\n        </section>\n    </refbody>\n</reference>"
        );
    }

    #[test]
    fn test_fill_or_prune() {
        let mut doc = XmlDocument::parse_str(BODY).unwrap();
        // 空内容触发整节移除
        assert!(fill_or_prune(&mut doc.root, "scenario", Some("   ")));
        assert!(doc
            .root
            .descendant(&|el| el.attr("id") == Some("scenario"))
            .is_none());

        let mut doc = XmlDocument::parse_str(BODY).unwrap();
        assert!(fill_or_prune(&mut doc.root, "scenario", Some("用于弱网场景。")));
        let section = doc
            .root
            .descendant(&|el| el.attr("id") == Some("scenario"))
            .unwrap();
        assert_eq!(section.first_child("p").unwrap().text(), "用于弱网场景。");
    }

    #[test]
    fn test_fill_with_default() {
        let defaults = SectionDefaults::embedded().unwrap();
        let mut doc = XmlDocument::parse_str(BODY).unwrap();
        assert!(fill_with_default(&mut doc.root, "timing", None, &defaults.timing));
        let section = doc
            .root
            .descendant(&|el| el.attr("id") == Some("timing"))
            .unwrap();
        assert_eq!(section.first_child("p").unwrap().text(), "加入频道前后均可调用。");
    }
}
