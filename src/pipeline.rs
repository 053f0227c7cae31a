//! 同步流水线
//!
//! 按记录迭代变更集，先处理主题文件（create 从模板实例化并填充，
//! modify 原位增量合并），再把主题挂入各共享图。单条记录的失败
//! 只记入报告，整体运行继续；JSON 解析失败在进入流水线之前就被
//! 拦下，属于致命错误。
//!
//! 所有写盘集中在一处：dry-run 模式跳过写回，backup 模式对每个
//! 既有文件在首次写入前做一次时间戳备份。

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::change::{ChangeKind, ChangeRecord, ChangeSet, ChangeType};
use crate::config::SyncConfig;
use crate::dom::XmlDocument;
use crate::maps::{datatypes, keysmap, navmap, reltable};
use crate::patcher::{PatchMode, PatchOutcome};
use crate::topic::{copy_template, populate_topic};
use crate::utils::{create_backup, SyncError};

/// 一次同步运行的执行器
pub struct SyncPipeline {
    config: SyncConfig,
    /// 本次运行已备份过的文件，同一文件只备份一次
    backed_up: HashSet<PathBuf>,
}

impl SyncPipeline {
    pub fn new(config: SyncConfig) -> Self {
        SyncPipeline {
            config,
            backed_up: HashSet::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// 执行整个变更集
    ///
    /// 逐条处理，任何一条失败都不中断后续记录。结束后把成功与
    /// 失败清单写入日志并返回汇总报告。
    pub fn run(&mut self, change_set: &ChangeSet) -> RunReport {
        let mut report = RunReport {
            dry_run: self.config.dry_run,
            ..Default::default()
        };
        for record in change_set.iter() {
            log::info!("处理记录 {} ({})", record.key, record.attributes.prefix());
            match self.process_record(record, &mut report) {
                Ok(()) => report.succeeded.push(record.key.clone()),
                Err(err) => {
                    log::error!("记录 {} 处理失败: {}", record.key, err);
                    report.failed.push((record.key.clone(), err.to_string()));
                }
            }
        }
        if !report.succeeded.is_empty() {
            log::info!("成功记录: {}", report.succeeded.join(", "));
        }
        for (key, message) in &report.failed {
            log::error!("失败记录 {}: {}", key, message);
        }
        report
    }

    fn process_record(
        &mut self,
        record: &ChangeRecord,
        report: &mut RunReport,
    ) -> Result<(), SyncError> {
        let topic_path = self.config.topic_path(record);
        match record.change_type {
            ChangeType::Create => {
                if self.create_topic(record, &topic_path)? {
                    report.created.push(record.topic_filename());
                } else {
                    report.skipped += 1;
                }
            }
            ChangeType::Modify => {
                self.modify_topic(record, &topic_path)?;
                report.modified.push(record.topic_filename());
            }
        }

        let mode = match record.change_type {
            ChangeType::Create => PatchMode::Create,
            ChangeType::Modify => PatchMode::Modify,
        };
        self.update_maps(record, mode, report);
        Ok(())
    }

    /// create 流程：模板实例化加字段填充
    ///
    /// 目标文件已存在时整体跳过，返回 Ok(false)。dry-run 下在
    /// 模板副本的内存树上演算，不碰目标路径。
    fn create_topic(&self, record: &ChangeRecord, path: &Path) -> Result<bool, SyncError> {
        if path.exists() {
            log::info!("主题文件已存在，跳过创建: {}", path.display());
            return Ok(false);
        }
        let template = self.config.templates.for_kind(record.attributes);
        if self.config.dry_run {
            let mut doc = XmlDocument::parse_file(template)?;
            populate_topic(&mut doc, record, &self.config.defaults)?;
            log::info!("[dry-run] 将创建主题: {}", path.display());
            return Ok(true);
        }
        copy_template(template, path)?;
        let mut doc = XmlDocument::parse_file(path)?;
        populate_topic(&mut doc, record, &self.config.defaults)?;
        doc.save(path)?;
        log::info!("已创建主题: {}", path.display());
        Ok(true)
    }

    /// modify 流程：在已有主题上增量合并
    ///
    /// 写回前做序列化对比，内容没有实际变化时不碰文件。
    fn modify_topic(&mut self, record: &ChangeRecord, path: &Path) -> Result<(), SyncError> {
        let mut doc = XmlDocument::parse_file(path)?;
        let before = doc.to_xml();
        populate_topic(&mut doc, record, &self.config.defaults)?;
        if doc.to_xml() != before {
            self.save_document(&doc, path)?;
            log::info!("已更新主题: {}", path.display());
        } else {
            log::info!("主题无实际变化，未写回: {}", path.display());
        }
        Ok(())
    }

    /// 把记录挂入全部适用的共享图
    ///
    /// 图文件缺失或解析失败只计告警，不影响记录本身的成败。
    fn update_maps(&mut self, record: &ChangeRecord, mode: PatchMode, report: &mut RunReport) {
        if record.toc_href.is_some() {
            for platform in record.platform_set().platforms() {
                let path = self.config.navmap_path(platform);
                self.patch_map_file(&path, report, |doc| navmap::insert_topicref(doc, record));
            }
        }
        if record.navtitle.is_some() {
            for platform in record.platform_set().platforms() {
                let path = self.config.keysmap_path(platform);
                self.patch_map_file(&path, report, |doc| keysmap::insert_keydef(doc, record));
            }
        }
        let relates = matches!(record.attributes, ChangeKind::Api | ChangeKind::Callback);
        if relates && record.parent_class().is_some() {
            let path = self.config.reltable_file.clone();
            self.patch_map_file(&path, report, |doc| {
                reltable::insert_relation(doc, record, mode)
            });
        }
        if matches!(record.attributes, ChangeKind::Class | ChangeKind::Enum) {
            let path = self.config.datatype_file.clone();
            self.patch_map_file(&path, report, |doc| datatypes::insert_xref(doc, record));
        }
    }

    /// 对单个图文件执行补丁并按需写回
    fn patch_map_file(
        &mut self,
        path: &Path,
        report: &mut RunReport,
        patch: impl FnOnce(&mut XmlDocument) -> PatchOutcome,
    ) {
        if !path.exists() {
            log::warn!("图文件不存在，跳过: {}", path.display());
            report.warnings += 1;
            return;
        }
        let mut doc = match XmlDocument::parse_file(path) {
            Ok(doc) => doc,
            Err(err) => {
                log::warn!("图文件解析失败，跳过 {}: {}", path.display(), err);
                report.warnings += 1;
                return;
            }
        };
        let outcome = patch(&mut doc);
        if !outcome.changed() {
            return;
        }
        match self.save_document(&doc, path) {
            Ok(()) => report.map_updates += outcome.inserted + outcome.merged,
            Err(err) => {
                log::warn!("图文件写回失败 {}: {}", path.display(), err);
                report.warnings += 1;
            }
        }
    }

    /// 统一写盘出口，处理 dry-run 与首写备份
    fn save_document(&mut self, doc: &XmlDocument, path: &Path) -> Result<(), SyncError> {
        if self.config.dry_run {
            log::info!("[dry-run] 跳过写回: {}", path.display());
            return Ok(());
        }
        if self.config.backup && path.exists() && self.backed_up.insert(path.to_path_buf()) {
            let backup_path = create_backup(path)?;
            log::info!("已备份 {} -> {}", path.display(), backup_path.display());
        }
        doc.save(path)?;
        Ok(())
    }
}

/// 一次运行的汇总报告
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    /// 新建的主题文件名
    pub created: Vec<String>,
    /// 走完 modify 流程的主题文件名
    pub modified: Vec<String>,
    /// create 短路跳过的记录数（目标已存在）
    pub skipped: usize,
    /// 共享图中实际插入或合并的条目数
    pub map_updates: usize,
    /// 图文件缺失等非致命问题计数
    pub warnings: usize,
    /// 成功记录的键
    pub succeeded: Vec<String>,
    /// 失败记录的键与错误信息
    pub failed: Vec<(String, String)>,
    /// 本次是否为 dry-run
    pub dry_run: bool,
}

impl RunReport {
    pub fn total(&self) -> usize {
        self.succeeded.len() + self.failed.len()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== 同步运行报告 ===")?;
        if self.dry_run {
            writeln!(f, "dry-run 模式，未写入任何文件")?;
        }
        writeln!(f, "记录总数: {}", self.total())?;
        writeln!(f, "新建主题: {}", self.created.len())?;
        writeln!(f, "修改主题: {}", self.modified.len())?;
        writeln!(f, "跳过（已存在）: {}", self.skipped)?;
        writeln!(f, "共享图更新: {}", self.map_updates)?;
        writeln!(f, "告警: {}", self.warnings)?;
        writeln!(f, "成功: {}", self.succeeded.len())?;
        writeln!(f, "失败: {}", self.failed.len())?;
        if !self.created.is_empty() {
            writeln!(f, "新建文件:")?;
            for (index, name) in self.created.iter().take(5).enumerate() {
                writeln!(f, "{}. {}", index + 1, name)?;
            }
            if self.created.len() > 5 {
                writeln!(f, "... 还有 {} 个", self.created.len() - 5)?;
            }
        }
        if !self.failed.is_empty() {
            writeln!(f, "失败记录:")?;
            for (key, message) in &self.failed {
                writeln!(f, "- {}: {}", key, message)?;
            }
        }
        Ok(())
    }
}
