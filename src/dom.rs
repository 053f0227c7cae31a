/// XML 文档树模块
///
/// 该模块提供一个保留空白与文档序言的轻量级 XML 树，用于对 DITA
/// 文件做原位修改。解析与序列化基于 quick-xml 的事件流，树本身
/// 只记录补丁操作需要的信息。
///
/// # 架构设计
///
/// - **parser**: 事件流 -> 树，序言（XML 声明、DOCTYPE）原样保留
/// - **writer**: 树 -> 字符串，文本与属性分别按 XML 规则转义
///
/// # 使用示例
///
/// ```rust,ignore
/// use dita_sync::dom::XmlDocument;
///
/// let mut doc = XmlDocument::parse_file(Path::new("api_foo.dita"))?;
/// doc.root.set_attr("id", "api_foo");
/// doc.save(Path::new("api_foo.dita"))?;
/// ```
pub mod parser;
pub mod writer;

use std::path::Path;

use crate::utils::SyncError;

/// XML 节点
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(Element),
    /// 文本节点，空白原样保留
    Text(String),
    Comment(String),
    CData(String),
    /// 处理指令，内容不含 `<?` 与 `?>`
    ProcessingInstruction(String),
}

impl XmlNode {
    /// 是否为纯空白文本节点
    pub fn is_whitespace(&self) -> bool {
        matches!(self, XmlNode::Text(text) if text.trim().is_empty())
    }
}

/// XML 元素
///
/// 属性按书写顺序保存，子节点中的文本节点承担缩进空白。
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl Element {
    pub fn new(name: &str) -> Self {
        Element {
            name: name.to_string(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// 读取属性值
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// 设置属性值，已存在则原位替换，否则追加到末尾
    pub fn set_attr(&mut self, name: &str, value: &str) {
        match self.attributes.iter_mut().find(|(key, _)| key == name) {
            Some(entry) => entry.1 = value.to_string(),
            None => self.attributes.push((name.to_string(), value.to_string())),
        }
    }

    /// 直接子文本节点拼接后的内容
    pub fn text(&self) -> String {
        let mut out = String::new();
        for child in &self.children {
            if let XmlNode::Text(text) = child {
                out.push_str(text);
            }
        }
        out
    }

    /// 清空子节点并设置为单个文本节点
    pub fn set_text(&mut self, text: &str) {
        self.children.clear();
        self.children.push(XmlNode::Text(text.to_string()));
    }

    /// 迭代直接子元素
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// 迭代直接子元素（可变）
    pub fn child_elements_mut(&mut self) -> impl Iterator<Item = &mut Element> {
        self.children.iter_mut().filter_map(|node| match node {
            XmlNode::Element(element) => Some(element),
            _ => None,
        })
    }

    /// 第一个指定名称的直接子元素
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|element| element.name == name)
    }

    pub fn first_child_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.child_elements_mut().find(|element| element.name == name)
    }

    /// 深度优先查找第一个满足条件的后代元素（不含自身）
    pub fn descendant(&self, pred: &dyn Fn(&Element) -> bool) -> Option<&Element> {
        for child in self.child_elements() {
            if pred(child) {
                return Some(child);
            }
            if let Some(found) = child.descendant(pred) {
                return Some(found);
            }
        }
        None
    }

    /// 深度优先查找第一个满足条件的后代元素（可变，不含自身）
    pub fn descendant_mut(&mut self, pred: &dyn Fn(&Element) -> bool) -> Option<&mut Element> {
        for child in self.children.iter_mut() {
            if let XmlNode::Element(element) = child {
                if pred(element) {
                    return Some(element);
                }
                if let Some(found) = element.descendant_mut(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// 查找后代元素并返回其相对 `base` 的嵌套深度
    ///
    /// `base` 是自身所处的深度，直接子元素的深度是 `base + 1`。
    /// 补丁层用返回的深度推导插入节点的缩进。
    pub fn descendant_with_depth_mut(
        &mut self,
        pred: &dyn Fn(&Element) -> bool,
        base: usize,
    ) -> Option<(&mut Element, usize)> {
        for child in self.children.iter_mut() {
            if let XmlNode::Element(element) = child {
                if pred(element) {
                    return Some((element, base + 1));
                }
                if let Some(found) = element.descendant_with_depth_mut(pred, base + 1) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// 移除满足条件的直接子元素及其前导空白
    ///
    /// 前导空白文本承担的是被移除元素的行首分隔，连同删除后其余
    /// 节点的分隔与父元素的闭合缩进都保持原样，末尾元素也一样。
    pub fn remove_child_elements_where(&mut self, pred: &dyn Fn(&Element) -> bool) -> usize {
        let mut removed = 0;
        let mut index = 0;
        while index < self.children.len() {
            let hit = matches!(&self.children[index], XmlNode::Element(element) if pred(element));
            if hit {
                self.children.remove(index);
                if index > 0 && self.children[index - 1].is_whitespace() {
                    self.children.remove(index - 1);
                    index -= 1;
                }
                removed += 1;
            } else {
                index += 1;
            }
        }
        removed
    }
}

/// 解析后的 XML 文档
///
/// 根元素之外的内容（XML 声明、DOCTYPE、注释与空行）以原文
/// 字符串保存在 `prolog`/`epilog` 中，序列化时原样写回。
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub prolog: String,
    pub root: Element,
    pub epilog: String,
}

impl XmlDocument {
    /// 从文件解析
    pub fn parse_file(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(SyncError::MissingFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse_str(&content)
    }

    /// 从字符串解析
    pub fn parse_str(source: &str) -> Result<Self, SyncError> {
        parser::parse_document(source)
    }

    /// 序列化为字符串
    pub fn to_xml(&self) -> String {
        writer::write_document(self)
    }

    /// 写回文件
    pub fn save(&self, path: &Path) -> Result<(), SyncError> {
        std::fs::write(path, self.to_xml())?;
        Ok(())
    }
}
