//! XML 事件流到文档树的解析器
//!
//! 使用 quick-xml 逐事件读取，关闭文本修剪以保留文档原有的空白。
//! 实体引用以独立事件出现，解析时还原为字符并与相邻文本合并。
//! 根元素之外的事件（声明、DOCTYPE、注释）拼接回原文存入序言。

use quick_xml::escape::unescape;
use quick_xml::events::{BytesRef, BytesStart, Event as XmlEvent};
use quick_xml::Reader;

use super::{Element, XmlDocument, XmlNode};
use crate::utils::SyncError;

/// 解析完整的 XML 文档
///
/// # 错误
/// 标签不配对、属性非法或出现多个根元素时返回 `InvalidFormat`；
/// 底层读取错误返回 `XmlError`。
pub fn parse_document(source: &str) -> Result<XmlDocument, SyncError> {
    let mut reader = Reader::from_str(source);
    reader.config_mut().trim_text(false);
    let mut buf = Vec::new();

    let mut prolog = String::new();
    let mut epilog = String::new();
    let mut root: Option<Element> = None;
    let mut stack: Vec<Element> = Vec::new();

    loop {
        match reader.read_event_into(&mut buf)? {
            XmlEvent::Start(e) => {
                if stack.is_empty() && root.is_some() {
                    return Err(SyncError::InvalidFormat("文档有多个根元素".to_string()));
                }
                stack.push(element_from_start(&e)?);
            }
            XmlEvent::Empty(e) => {
                let element = element_from_start(&e)?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None if root.is_none() => root = Some(element),
                    None => {
                        return Err(SyncError::InvalidFormat("文档有多个根元素".to_string()))
                    }
                }
            }
            XmlEvent::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| SyncError::InvalidFormat("结束标签不配对".to_string()))?;
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Element(element)),
                    None => root = Some(element),
                }
            }
            XmlEvent::Text(e) => {
                let raw = String::from_utf8_lossy(e.as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => {
                        let text = unescape(&raw).map_err(|err| {
                            SyncError::InvalidFormat(format!("文本转义非法: {}", err))
                        })?;
                        append_text(parent, &text);
                    }
                    // 根元素之外只会是空白，原样并入序言/尾声
                    None if root.is_none() => prolog.push_str(&raw),
                    None => epilog.push_str(&raw),
                }
            }
            XmlEvent::GeneralRef(e) => {
                let text = resolve_reference(&e)?;
                match stack.last_mut() {
                    Some(parent) => append_text(parent, &text),
                    None => {
                        return Err(SyncError::InvalidFormat(
                            "根元素之外出现实体引用".to_string(),
                        ))
                    }
                }
            }
            XmlEvent::CData(e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::CData(text));
                }
            }
            XmlEvent::Comment(e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::Comment(text)),
                    None if root.is_none() => {
                        prolog.push_str("<!--");
                        prolog.push_str(&text);
                        prolog.push_str("-->");
                    }
                    None => {
                        epilog.push_str("<!--");
                        epilog.push_str(&text);
                        epilog.push_str("-->");
                    }
                }
            }
            XmlEvent::PI(e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(XmlNode::ProcessingInstruction(text)),
                    None if root.is_none() => {
                        prolog.push_str("<?");
                        prolog.push_str(&text);
                        prolog.push_str("?>");
                    }
                    None => {
                        epilog.push_str("<?");
                        epilog.push_str(&text);
                        epilog.push_str("?>");
                    }
                }
            }
            XmlEvent::Decl(e) => {
                let mut decl = String::from("<?xml");
                if let Ok(version) = e.version() {
                    decl.push_str(&format!(" version=\"{}\"", String::from_utf8_lossy(&version)));
                }
                if let Some(Ok(encoding)) = e.encoding() {
                    decl.push_str(&format!(
                        " encoding=\"{}\"",
                        String::from_utf8_lossy(&encoding)
                    ));
                }
                if let Some(Ok(standalone)) = e.standalone() {
                    decl.push_str(&format!(
                        " standalone=\"{}\"",
                        String::from_utf8_lossy(&standalone)
                    ));
                }
                decl.push_str("?>");
                prolog.push_str(&decl);
            }
            XmlEvent::DocType(e) => {
                let text = String::from_utf8_lossy(e.as_ref()).into_owned();
                prolog.push_str("<!DOCTYPE ");
                prolog.push_str(text.trim());
                prolog.push('>');
            }
            XmlEvent::Eof => break,
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(SyncError::InvalidFormat("开始标签不配对".to_string()));
    }
    let root = root.ok_or_else(|| SyncError::InvalidFormat("缺少根元素".to_string()))?;

    Ok(XmlDocument { prolog, root, epilog })
}

/// 从开始标签事件构造元素，属性值做实体解码
fn element_from_start(e: &BytesStart) -> Result<Element, SyncError> {
    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
    let mut element = Element::new(&name);
    for attr in e.attributes() {
        let attr = attr.map_err(|err| {
            SyncError::InvalidFormat(format!("元素 <{}> 的属性非法: {}", name, err))
        })?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|err| {
                SyncError::InvalidFormat(format!("元素 <{}> 的属性值转义非法: {}", name, err))
            })?
            .into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

/// 向元素追加文本，紧跟在文本节点之后时原位合并
///
/// 读取器把含实体引用的文本切成多个事件，合并后元素里仍是单个
/// 连续的文本子节点。
fn append_text(parent: &mut Element, text: &str) {
    match parent.children.last_mut() {
        Some(XmlNode::Text(existing)) => existing.push_str(text),
        _ => parent.children.push(XmlNode::Text(text.to_string())),
    }
}

/// 把实体引用事件解析为替换文本
///
/// 支持五个预定义实体与数字字符引用。语料不携带 DTD，其余命名
/// 实体没有定义，按格式非法处理。
fn resolve_reference(reference: &BytesRef) -> Result<String, SyncError> {
    let name = reference
        .decode()
        .map_err(|err| SyncError::InvalidFormat(format!("实体引用解码失败: {}", err)))?;
    let raw = format!("&{};", name);
    let resolved = unescape(&raw).map_err(|err| {
        SyncError::InvalidFormat(format!("实体引用 &{}; 无法解析: {}", name, err))
    })?;
    Ok(resolved.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal() {
        let doc = parse_document("<topic id=\"t\"><p>hello</p></topic>").unwrap();
        assert_eq!(doc.root.name, "topic");
        assert_eq!(doc.root.attr("id"), Some("t"));
        let p = doc.root.first_child("p").unwrap();
        assert_eq!(p.text(), "hello");
    }

    #[test]
    fn test_parse_entities_in_text_and_attrs() {
        let doc =
            parse_document("<p conref=\"a&amp;b\">x &lt; y &amp; z</p>").unwrap();
        assert_eq!(doc.root.attr("conref"), Some("a&b"));
        assert_eq!(doc.root.text(), "x < y & z");
    }

    #[test]
    fn test_entity_text_merges_into_single_node() {
        let doc = parse_document(
            "<section id=\"return_values\"><p>0: 成功。&lt; 0: 失败。x &amp; y</p></section>",
        )
        .unwrap();
        let p = doc.root.first_child("p").unwrap();
        assert_eq!(p.text(), "0: 成功。< 0: 失败。x & y");
        assert_eq!(p.children.len(), 1);
    }

    #[test]
    fn test_entity_text_reescaped_on_write() {
        let source = "<p>0: 成功。&lt; 0: 失败。x &amp; y</p>";
        let doc = parse_document(source).unwrap();
        assert_eq!(doc.to_xml(), source);
    }

    #[test]
    fn test_char_refs_resolved() {
        let doc = parse_document("<p>&#x4E2D;&#25991;</p>").unwrap();
        assert_eq!(doc.root.text(), "中文");
    }

    #[test]
    fn test_undefined_entity_rejected() {
        assert!(matches!(
            parse_document("<p>&nbsp;</p>"),
            Err(SyncError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_parse_missing_root() {
        let err = parse_document("   \n  ").unwrap_err();
        assert!(matches!(err, SyncError::InvalidFormat(_)));
    }

    #[test]
    fn test_parse_unbalanced() {
        assert!(parse_document("<a><b></a>").is_err());
    }

    #[test]
    fn test_parse_multiple_roots() {
        let err = parse_document("<a/><b/>").unwrap_err();
        assert!(matches!(err, SyncError::InvalidFormat(_)));
    }

    #[test]
    fn test_comment_inside_element() {
        let doc = parse_document("<p><!-- 注释 -->text</p>").unwrap();
        assert!(doc
            .root
            .children
            .iter()
            .any(|node| matches!(node, XmlNode::Comment(c) if c.contains("注释"))));
    }
}
