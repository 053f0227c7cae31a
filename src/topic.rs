/// 主题文件处理模块
///
/// 该模块负责单个 DITA 参考主题的生命周期：从模板实例化新文件，
/// 以及把变更记录的字段填充进主题树。字段到节的对应关系按对象
/// 类别（方法、回调、枚举、类）查表驱动。
///
/// # 架构设计
///
/// - **template**: 模板路径集合与模板实例化（已存在即整体跳过）
/// - **populate**: 字段填充流水线，分组、查重、裁剪在这里汇合
///
/// # 使用示例
///
/// ```rust,ignore
/// use dita_sync::topic::{copy_template, populate_topic};
///
/// if copy_template(&templates.method, &dest)? {
///     let mut doc = XmlDocument::parse_file(&dest)?;
///     populate_topic(&mut doc, &record, &defaults)?;
///     doc.save(&dest)?;
/// }
/// ```
pub mod populate;
pub mod template;

// === 导出公共接口 ===
pub use populate::populate_topic;
pub use template::{copy_template, TemplateSet};
