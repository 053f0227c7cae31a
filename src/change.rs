//! 变更描述数据模型
//!
//! 变更描述是一个 JSON 文件，顶层按对象类别分为三个数组：
//! `api_changes`（方法与回调）、`struct_changes`（类与结构体）、
//! `enum_changes`（枚举）。每条记录描述一个 API 实体的新增或修改。
//!
//! 所有按平台取值的字段使用保序映射，保证分组输出的顺序只由
//! 字段在 JSON 中的首次出现位置决定。

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

use crate::platforms::PlatformSet;
use crate::utils::SyncError;

/// 变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Create,
    Modify,
}

impl Default for ChangeType {
    fn default() -> Self {
        ChangeType::Create
    }
}

/// 变更对象类别，决定使用的模板与主题文件名前缀
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Api,
    Callback,
    Enum,
    Class,
}

impl ChangeKind {
    /// 文件名前缀段
    pub fn prefix(self) -> &'static str {
        match self {
            ChangeKind::Api => "api",
            ChangeKind::Callback => "callback",
            ChangeKind::Enum => "enum",
            ChangeKind::Class => "class",
        }
    }
}

/// 参数条目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParamSpec {
    /// 参数名（跨平台公共名）
    pub name: String,

    /// 公共描述
    #[serde(default)]
    pub desc: String,

    /// 参数存在的平台，空表示全部适用平台
    #[serde(default)]
    pub platforms: Vec<String>,

    /// 平台专有参数名（平台键 -> 名称）
    #[serde(default)]
    pub platform_only_name: IndexMap<String, String>,

    /// 平台专有描述（平台键 -> 描述）
    #[serde(default)]
    pub platform_only_desc: IndexMap<String, String>,
}

/// 枚举值条目
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnumValueSpec {
    /// 该值条目的变更类型，缺省为 create
    #[serde(default)]
    pub change_type: ChangeType,

    /// 跨平台别名，同一语义值在各平台共用
    pub alias: String,

    /// 平台上的具体值名
    pub value: String,

    /// 描述
    #[serde(default)]
    pub desc: String,
}

/// 详细描述块
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DetailedDesc {
    /// 引入版本号（不含 v 前缀）
    #[serde(default)]
    pub since: Option<String>,

    /// 公共描述段落
    #[serde(default)]
    pub desc: Option<String>,
}

/// 记录的描述字段集合
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Description {
    /// 短描述
    #[serde(default)]
    pub shortdesc: Option<String>,

    /// 详细描述
    #[serde(default)]
    pub detailed_desc: Option<DetailedDesc>,

    /// 平台专有的详细描述段落（平台键 -> 段落文本）
    #[serde(default)]
    pub platform_only_desc: IndexMap<String, String>,

    /// 使用场景
    #[serde(default)]
    pub scenarios: Option<String>,

    /// 调用时机
    #[serde(default)]
    pub timing: Option<String>,

    /// 调用限制
    #[serde(default)]
    pub restrictions: Option<String>,

    /// 相关回调或方法
    #[serde(default)]
    pub related: Option<String>,

    /// 参数列表
    #[serde(default)]
    pub dita_params: Vec<ParamSpec>,

    /// 返回值（平台键 -> 返回值描述）
    #[serde(default)]
    pub return_values: IndexMap<String, String>,

    /// 枚举值（平台键 -> 值条目列表）
    #[serde(default)]
    pub enumerations: IndexMap<String, Vec<EnumValueSpec>>,
}

/// 单条变更记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord {
    /// API 实体的键，同时是 keysmap 中的 keys 值
    pub key: String,

    /// create 或 modify
    pub change_type: ChangeType,

    /// 对象类别
    pub attributes: ChangeKind,

    /// 所属类名，无所属类时为 "none"
    #[serde(default = "default_parentclass")]
    pub parentclass: String,

    /// 适用平台键列表，支持 "all" 哨兵
    #[serde(default)]
    pub platforms: Vec<String>,

    /// 导航图中父条目的 href，缺省时跳过导航图挂载
    #[serde(default)]
    pub toc_href: Option<String>,

    /// keysmap 中父 topichead 的导航标题
    #[serde(default)]
    pub navtitle: Option<String>,

    /// keysmap 条目的展示关键词
    #[serde(default)]
    pub keyword: Option<String>,

    /// 各平台的 API 原型（平台键 -> 原型代码）
    #[serde(default)]
    pub api_signature: IndexMap<String, String>,

    /// 描述字段
    #[serde(default)]
    pub description: Description,
}

fn default_parentclass() -> String {
    "none".to_string()
}

impl ChangeRecord {
    /// 所属类名，"none" 与空串视为无所属类
    pub fn parent_class(&self) -> Option<&str> {
        let parent = self.parentclass.trim();
        if parent.is_empty() || parent.eq_ignore_ascii_case("none") {
            None
        } else {
            Some(parent)
        }
    }

    /// 主题文件名：`{类别}_{所属类}_{键}.dita`，整体小写
    ///
    /// 无所属类时省略中段，如 `api_irtcengine_joinchannel.dita`
    /// 与 `enum_error_code_type.dita`。
    pub fn topic_filename(&self) -> String {
        let name = match self.parent_class() {
            Some(parent) => format!("{}_{}_{}", self.attributes.prefix(), parent, self.key),
            None => format!("{}_{}", self.attributes.prefix(), self.key),
        };
        format!("{}.dita", name.to_lowercase())
    }

    /// 主题 id，即文件名去掉扩展名
    pub fn topic_id(&self) -> String {
        let filename = self.topic_filename();
        filename.trim_end_matches(".dita").to_string()
    }

    /// 从 config 目录引用主题文件的相对路径
    pub fn topic_href(&self) -> String {
        format!("../API/{}", self.topic_filename())
    }

    /// 解析记录的适用平台集合，未知键告警后剔除
    pub fn platform_set(&self) -> PlatformSet {
        PlatformSet::resolve_ids(self.platforms.iter().map(String::as_str))
    }
}

/// 整个变更集
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChangeSet {
    /// 方法与回调
    #[serde(default)]
    pub api_changes: Vec<ChangeRecord>,

    /// 类与结构体
    #[serde(default)]
    pub struct_changes: Vec<ChangeRecord>,

    /// 枚举
    #[serde(default)]
    pub enum_changes: Vec<ChangeRecord>,
}

impl ChangeSet {
    /// 从文件加载变更集
    ///
    /// # 错误
    /// - 文件不存在或不可读时返回 `MissingFile`/`IoError`
    /// - JSON 语法错误时返回带行列号的 `MalformedJson`（致命）
    /// - 检测到旧版扁平结构时返回 `LegacySchema`
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        if !path.exists() {
            return Err(SyncError::MissingFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// 从 JSON 字符串解析变更集
    pub fn from_json_str(content: &str) -> Result<Self, SyncError> {
        let value: serde_json::Value =
            serde_json::from_str(content).map_err(SyncError::from_json_error)?;

        // 旧版结构是 键 -> 记录 的扁平对象，直接反序列化会得到
        // 空变更集，这里显式识别并拒绝
        if let Some(obj) = value.as_object() {
            let has_change_arrays = obj.contains_key("api_changes")
                || obj.contains_key("struct_changes")
                || obj.contains_key("enum_changes");
            let looks_flat = obj
                .values()
                .any(|v| v.get("key").is_some() && v.get("change_type").is_some());
            if !has_change_arrays && looks_flat {
                return Err(SyncError::LegacySchema);
            }
        }

        serde_json::from_value(value).map_err(SyncError::from_json_error)
    }

    /// 按 api -> struct -> enum 的顺序迭代全部记录
    pub fn iter(&self) -> impl Iterator<Item = &ChangeRecord> {
        self.api_changes
            .iter()
            .chain(self.struct_changes.iter())
            .chain(self.enum_changes.iter())
    }

    /// 记录总数
    pub fn len(&self) -> usize {
        self.api_changes.len() + self.struct_changes.len() + self.enum_changes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 统计变更集信息
    pub fn stats(&self) -> ChangeSetStats {
        let mut stats = ChangeSetStats {
            total: self.len(),
            ..Default::default()
        };
        for record in self.iter() {
            match record.change_type {
                ChangeType::Create => stats.create_count += 1,
                ChangeType::Modify => stats.modify_count += 1,
            }
            match record.attributes {
                ChangeKind::Api => stats.api_count += 1,
                ChangeKind::Callback => stats.callback_count += 1,
                ChangeKind::Enum => stats.enum_count += 1,
                ChangeKind::Class => stats.class_count += 1,
            }
            for platform in record.platform_set().platforms() {
                *stats.platform_counts.entry(platform.id().to_string()).or_insert(0) += 1;
            }
        }
        stats
    }
}

/// 变更集统计信息
#[derive(Debug, Clone, Default)]
pub struct ChangeSetStats {
    pub total: usize,
    pub create_count: usize,
    pub modify_count: usize,
    pub api_count: usize,
    pub callback_count: usize,
    pub enum_count: usize,
    pub class_count: usize,
    /// 平台键 -> 涉及的记录数
    pub platform_counts: IndexMap<String, usize>,
}

impl fmt::Display for ChangeSetStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== 变更集统计信息 ===")?;
        writeln!(f, "记录总数: {}", self.total)?;
        writeln!(f, "新增: {}", self.create_count)?;
        writeln!(f, "修改: {}", self.modify_count)?;
        writeln!(f, "方法: {}", self.api_count)?;
        writeln!(f, "回调: {}", self.callback_count)?;
        writeln!(f, "枚举: {}", self.enum_count)?;
        writeln!(f, "类: {}", self.class_count)?;
        if !self.platform_counts.is_empty() {
            writeln!(f, "涉及平台:")?;
            for (id, count) in &self.platform_counts {
                writeln!(f, "  {}: {} 条", id, count)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platforms::Platform;

    fn sample_record(attributes: ChangeKind, parentclass: &str, key: &str) -> ChangeRecord {
        ChangeRecord {
            key: key.to_string(),
            change_type: ChangeType::Create,
            attributes,
            parentclass: parentclass.to_string(),
            platforms: vec!["windows".to_string(), "ios".to_string()],
            toc_href: None,
            navtitle: None,
            keyword: None,
            api_signature: IndexMap::new(),
            description: Description::default(),
        }
    }

    #[test]
    fn test_topic_filename_with_parent() {
        let record = sample_record(ChangeKind::Api, "IRtcEngine", "enableFoo");
        assert_eq!(record.topic_filename(), "api_irtcengine_enablefoo.dita");
        assert_eq!(record.topic_id(), "api_irtcengine_enablefoo");
        assert_eq!(record.topic_href(), "../API/api_irtcengine_enablefoo.dita");
    }

    #[test]
    fn test_topic_filename_without_parent() {
        let record = sample_record(ChangeKind::Enum, "none", "ERROR_CODE_TYPE");
        // 下划线保留，不做折叠
        assert_eq!(record.topic_filename(), "enum_error_code_type.dita");
    }

    #[test]
    fn test_parent_class_none_variants() {
        assert!(sample_record(ChangeKind::Api, "none", "k").parent_class().is_none());
        assert!(sample_record(ChangeKind::Api, "", "k").parent_class().is_none());
        assert!(sample_record(ChangeKind::Api, "None", "k").parent_class().is_none());
        assert_eq!(
            sample_record(ChangeKind::Api, "IRtcEngine", "k").parent_class(),
            Some("IRtcEngine")
        );
    }

    #[test]
    fn test_platform_set_resolution() {
        let record = sample_record(ChangeKind::Api, "none", "k");
        let set = record.platform_set();
        assert_eq!(set, Platform::Windows.bit() | Platform::Ios.bit());
    }

    #[test]
    fn test_parse_minimal_change_set() {
        let json = r#"{
            "api_changes": [
                {
                    "key": "enableFoo",
                    "change_type": "create",
                    "attributes": "api",
                    "parentclass": "IRtcEngine",
                    "platforms": ["android", "windows"],
                    "api_signature": {
                        "android": "public abstract int enableFoo(boolean enabled);",
                        "windows": "virtual int enableFoo(bool enabled) = 0;"
                    },
                    "description": {
                        "shortdesc": "开启 Foo 功能。",
                        "detailed_desc": {"since": "4.3.0", "desc": "详细说明。"}
                    }
                }
            ]
        }"#;
        let set = ChangeSet::from_json_str(json).unwrap();
        assert_eq!(set.len(), 1);
        let record = &set.api_changes[0];
        assert_eq!(record.key, "enableFoo");
        assert_eq!(record.change_type, ChangeType::Create);
        assert_eq!(record.attributes, ChangeKind::Api);
        assert_eq!(record.api_signature.len(), 2);
        // IndexMap 保持书写顺序
        let keys: Vec<&String> = record.api_signature.keys().collect();
        assert_eq!(keys, ["android", "windows"]);
        assert_eq!(
            record.description.detailed_desc.as_ref().unwrap().since.as_deref(),
            Some("4.3.0")
        );
    }

    #[test]
    fn test_missing_arrays_default_empty() {
        let set = ChangeSet::from_json_str("{}").unwrap();
        assert!(set.is_empty());
        assert_eq!(set.iter().count(), 0);
    }

    #[test]
    fn test_malformed_json_is_fatal_with_position() {
        let err = ChangeSet::from_json_str("{\"api_changes\": [,]}").unwrap_err();
        match err {
            SyncError::MalformedJson { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 0);
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }

    #[test]
    fn test_legacy_flat_schema_rejected() {
        let legacy = r#"{
            "enableFoo": {
                "key": "enableFoo",
                "change_type": "create",
                "attributes": "api"
            }
        }"#;
        let err = ChangeSet::from_json_str(legacy).unwrap_err();
        assert!(matches!(err, SyncError::LegacySchema));
    }

    #[test]
    fn test_enum_value_change_type_default() {
        let json = r#"{
            "enum_changes": [
                {
                    "key": "MEDIA_TYPE",
                    "change_type": "modify",
                    "attributes": "enum",
                    "platforms": ["all"],
                    "description": {
                        "enumerations": {
                            "windows": [
                                {"alias": "audio", "value": "AUDIO_ONLY", "desc": "仅音频。"},
                                {"change_type": "modify", "alias": "video", "value": "VIDEO_ONLY", "desc": "仅视频。"}
                            ]
                        }
                    }
                }
            ]
        }"#;
        let set = ChangeSet::from_json_str(json).unwrap();
        let values = &set.enum_changes[0].description.enumerations["windows"];
        assert_eq!(values[0].change_type, ChangeType::Create);
        assert_eq!(values[1].change_type, ChangeType::Modify);
    }

    #[test]
    fn test_stats() {
        let mut set = ChangeSet::default();
        set.api_changes.push(sample_record(ChangeKind::Api, "IRtcEngine", "a"));
        set.api_changes.push(sample_record(ChangeKind::Callback, "IRtcEngineEventHandler", "b"));
        set.enum_changes.push(sample_record(ChangeKind::Enum, "none", "C"));
        let stats = set.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.api_count, 1);
        assert_eq!(stats.callback_count, 1);
        assert_eq!(stats.enum_count, 1);
        assert_eq!(stats.create_count, 3);
        assert_eq!(stats.platform_counts["windows"], 3);
    }
}
