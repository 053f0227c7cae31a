//! 文档树到 XML 字符串的序列化器
//!
//! 文本节点只转义 `&`/`<`/`>`，属性值做完整转义，其余内容
//! 原样写出。无子节点的元素写成自闭合形式。

use quick_xml::escape::{escape, partial_escape};

use super::{Element, XmlDocument, XmlNode};

/// 序列化整个文档，序言与尾声原样拼接
pub fn write_document(doc: &XmlDocument) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(&doc.prolog);
    write_element(&mut out, &doc.root);
    out.push_str(&doc.epilog);
    out
}

/// 序列化单个元素
pub fn write_element(out: &mut String, element: &Element) {
    out.push('<');
    out.push_str(&element.name);
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');
    for child in &element.children {
        write_node(out, child);
    }
    out.push_str("</");
    out.push_str(&element.name);
    out.push('>');
}

fn write_node(out: &mut String, node: &XmlNode) {
    match node {
        XmlNode::Element(element) => write_element(out, element),
        XmlNode::Text(text) => out.push_str(&partial_escape(text.as_str())),
        XmlNode::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        XmlNode::CData(text) => {
            out.push_str("<![CDATA[");
            out.push_str(text);
            out.push_str("]]>");
        }
        XmlNode::ProcessingInstruction(text) => {
            out.push_str("<?");
            out.push_str(text);
            out.push_str("?>");
        }
    }
}
