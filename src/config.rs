//! 运行配置
//!
//! 所有路径从语料库根目录推导，没有模块级全局量，配置实例显式
//! 传入各个入口。目录约定：主题文件在 `{base}/API`，共享图文件
//! 在 `{base}/config`，平台导航图在根目录按展示名命名。

use std::path::{Path, PathBuf};

use crate::change::ChangeRecord;
use crate::platforms::Platform;
use crate::pruner::SectionDefaults;
use crate::topic::TemplateSet;
use crate::utils::SyncError;

/// 一次同步运行的完整配置
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// 语料库根目录
    pub base_dir: PathBuf,

    /// 主题文件目录（`{base}/API`）
    pub api_dir: PathBuf,

    /// 共享图目录（`{base}/config`）
    pub config_dir: PathBuf,

    /// 四类模板文件
    pub templates: TemplateSet,

    /// 关系表文件
    pub reltable_file: PathBuf,

    /// 数据类型索引文件
    pub datatype_file: PathBuf,

    /// 空节的默认句
    pub defaults: SectionDefaults,

    /// 首次写入前做时间戳备份
    pub backup: bool,

    /// 只在内存中演算，不写任何文件
    pub dry_run: bool,
}

impl SyncConfig {
    /// 从语料库根目录与模板目录构建配置
    ///
    /// # 错误
    /// 内嵌默认句数据损坏时返回 `JsonError`（打包问题，正常发布
    /// 版本不会发生）。
    pub fn new(base_dir: &Path, templates_dir: &Path) -> Result<Self, SyncError> {
        let base_dir = base_dir.to_path_buf();
        let api_dir = base_dir.join("API");
        let config_dir = base_dir.join("config");
        Ok(SyncConfig {
            templates: TemplateSet::from_dir(templates_dir),
            reltable_file: config_dir.join("relations-rtc-ng-api.ditamap"),
            datatype_file: api_dir.join("rtc_api_data_type.dita"),
            defaults: SectionDefaults::embedded()?,
            base_dir,
            api_dir,
            config_dir,
            backup: false,
            dry_run: false,
        })
    }

    /// 平台导航图路径，文件名使用平台展示名
    ///
    /// 如 windows 平台对应 `RTC_NG_API_CPP.ditamap`。
    pub fn navmap_path(&self, platform: Platform) -> PathBuf {
        self.base_dir
            .join(format!("RTC_NG_API_{}.ditamap", platform.label()))
    }

    /// 平台键定义图路径，文件名使用 props 记号
    ///
    /// 如 android 平台对应 `keys-rtc-ng-api-java.ditamap`。
    pub fn keysmap_path(&self, platform: Platform) -> PathBuf {
        self.config_dir
            .join(format!("keys-rtc-ng-api-{}.ditamap", platform.token()))
    }

    /// 记录对应的主题文件路径
    pub fn topic_path(&self, record: &ChangeRecord) -> PathBuf {
        self.api_dir.join(record.topic_filename())
    }

    /// 校验运行前置条件：根目录与全部模板文件必须存在
    pub fn validate(&self) -> Result<(), SyncError> {
        if !self.base_dir.is_dir() {
            return Err(SyncError::MissingFile(self.base_dir.clone()));
        }
        self.templates.validate()
    }
}
