//! 主题模板管理
//!
//! 四类对象各对应一个模板文件，按约定文件名放在模板目录下。
//! 新主题通过整文件复制实例化，目标已存在时跳过且不触碰内容。

use std::path::{Path, PathBuf};

use crate::change::ChangeKind;
use crate::utils::SyncError;

/// 四类主题的模板文件路径
#[derive(Debug, Clone)]
pub struct TemplateSet {
    pub method: PathBuf,
    pub callback: PathBuf,
    pub enumeration: PathBuf,
    pub class: PathBuf,
}

impl TemplateSet {
    /// 按约定文件名从模板目录构造
    pub fn from_dir(dir: &Path) -> Self {
        TemplateSet {
            method: dir.join("Method.dita"),
            callback: dir.join("Callback.dita"),
            enumeration: dir.join("Enum.dita"),
            class: dir.join("Class.dita"),
        }
    }

    /// 指定类别使用的模板
    pub fn for_kind(&self, kind: ChangeKind) -> &Path {
        match kind {
            ChangeKind::Api => &self.method,
            ChangeKind::Callback => &self.callback,
            ChangeKind::Enum => &self.enumeration,
            ChangeKind::Class => &self.class,
        }
    }

    /// 校验全部模板文件存在
    pub fn validate(&self) -> Result<(), SyncError> {
        for path in [&self.method, &self.callback, &self.enumeration, &self.class] {
            if !path.exists() {
                return Err(SyncError::MissingFile(path.clone()));
            }
        }
        Ok(())
    }
}

/// 从模板复制出新主题文件
///
/// # 返回
/// 目标已存在时返回 `Ok(false)` 且不做任何修改，重跑的幂等性
/// 由这里保证；复制成功返回 `Ok(true)`。
///
/// # 错误
/// 模板文件缺失返回 `MissingFile`。
pub fn copy_template(template: &Path, dest: &Path) -> Result<bool, SyncError> {
    if dest.exists() {
        log::info!("主题文件已存在，跳过创建: {}", dest.display());
        return Ok(false);
    }
    if !template.exists() {
        return Err(SyncError::MissingFile(template.to_path_buf()));
    }
    if let Some(parent) = dest.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::copy(template, dest)?;
    log::info!("已从模板创建主题: {}", dest.display());
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_template_set_paths() {
        let templates = TemplateSet::from_dir(Path::new("/docs/templates"));
        assert_eq!(templates.method, Path::new("/docs/templates/Method.dita"));
        assert_eq!(templates.for_kind(ChangeKind::Callback), Path::new("/docs/templates/Callback.dita"));
        assert_eq!(templates.for_kind(ChangeKind::Enum), Path::new("/docs/templates/Enum.dita"));
        assert_eq!(templates.for_kind(ChangeKind::Class), Path::new("/docs/templates/Class.dita"));
    }

    #[test]
    fn test_validate_reports_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let templates = TemplateSet::from_dir(dir.path());
        assert!(matches!(templates.validate(), Err(SyncError::MissingFile(_))));

        for name in ["Method.dita", "Callback.dita", "Enum.dita", "Class.dita"] {
            fs::write(dir.path().join(name), "<reference/>").unwrap();
        }
        assert!(templates.validate().is_ok());
    }

    #[test]
    fn test_copy_template_creates_file() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("Method.dita");
        fs::write(&template, "<reference id=\"template\"/>").unwrap();

        let dest = dir.path().join("API").join("api_foo.dita");
        assert!(copy_template(&template, &dest).unwrap());
        assert_eq!(fs::read_to_string(&dest).unwrap(), "<reference id=\"template\"/>");
    }

    #[test]
    fn test_copy_template_skips_existing() {
        let dir = tempfile::tempdir().unwrap();
        let template = dir.path().join("Method.dita");
        fs::write(&template, "<reference/>").unwrap();

        let dest = dir.path().join("api_foo.dita");
        fs::write(&dest, "已有内容").unwrap();
        assert!(!copy_template(&template, &dest).unwrap());
        // 已有文件原样保留
        assert_eq!(fs::read_to_string(&dest).unwrap(), "已有内容");
    }

    #[test]
    fn test_copy_template_missing_source() {
        let dir = tempfile::tempdir().unwrap();
        let result = copy_template(&dir.path().join("absent.dita"), &dir.path().join("out.dita"));
        assert!(matches!(result, Err(SyncError::MissingFile(_))));
    }
}
