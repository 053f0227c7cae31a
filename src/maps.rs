/// 共享图文件处理模块
///
/// 该模块负责把新主题挂入四类共享 XML 文档：平台导航图、平台键
/// 定义图、全局关系表与全局数据类型索引。每个流程都带查重，重复
/// 条目按成功空操作处理，插入后受影响的父元素按键名重排，保证
/// 文档对后续 diff 稳定。
///
/// # 架构设计
///
/// - **navmap**: 导航图，按 href 定位父条目，插入 topicref
/// - **keysmap**: 键定义图，按 navtitle 定位容器，插入 keydef
/// - **reltable**: 关系表，按所属类定位行，在兄弟单元格插入 topicref
/// - **datatypes**: 数据类型索引，按平台 ul 插入 li/xref
///
/// # 使用示例
///
/// ```rust,ignore
/// use dita_sync::maps::{keysmap, navmap};
///
/// let outcome = navmap::insert_topicref(&mut doc, &record);
/// if outcome.changed() {
///     doc.save(&path)?;
/// }
/// ```
pub mod datatypes;
pub mod keysmap;
pub mod navmap;
pub mod reltable;
