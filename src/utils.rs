use thiserror::Error;
use std::path::{Path, PathBuf};

/// 自定义错误类型
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Invalid topic format: {0}")]
    InvalidFormat(String),

    #[error("File not found: {}", .0.display())]
    MissingFile(PathBuf),

    #[error("Malformed change file (line {line}, column {column}): {message}")]
    MalformedJson {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("Legacy flat change schema detected; wrap records into api_changes/struct_changes/enum_changes arrays")]
    LegacySchema,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("XML error: {0}")]
    XmlError(#[from] quick_xml::Error),
}

impl SyncError {
    /// 从 serde_json 错误中提取行列信息
    pub fn from_json_error(err: serde_json::Error) -> Self {
        SyncError::MalformedJson {
            line: err.line(),
            column: err.column(),
            message: err.to_string(),
        }
    }
}

/// 按空白拆分 props 标记串
pub fn split_props(props: &str) -> Vec<&str> {
    props.split_whitespace().collect()
}

/// 判断可选文本字段是否为空白
pub fn is_blank(text: Option<&str>) -> bool {
    match text {
        Some(t) => t.trim().is_empty(),
        None => true,
    }
}

/// 创建文件备份
pub fn create_backup(file_path: &Path) -> Result<PathBuf, SyncError> {
    if !file_path.exists() {
        return Err(SyncError::MissingFile(file_path.to_path_buf()));
    }

    let timestamp = chrono::Local::now().format("%Y-%m-%d-%H-%M-%S");
    let backup_path = file_path.with_extension(format!("{}.bak", timestamp));

    std::fs::copy(file_path, &backup_path)
        .map_err(SyncError::IoError)?;

    Ok(backup_path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_props() {
        assert_eq!(split_props("cpp ios mac"), vec!["cpp", "ios", "mac"]);
        assert_eq!(split_props("  android  "), vec!["android"]);
        assert!(split_props("").is_empty());
    }

    #[test]
    fn test_is_blank() {
        assert!(is_blank(None));
        assert!(is_blank(Some("")));
        assert!(is_blank(Some("   ")));
        assert!(!is_blank(Some("加入频道前后均可调用。")));
    }

    #[test]
    fn test_backup_missing_file() {
        let result = create_backup(Path::new("/nonexistent/file.dita"));
        assert!(matches!(result, Err(SyncError::MissingFile(_))));
    }

    #[test]
    fn test_json_error_position() {
        let err = serde_json::from_str::<serde_json::Value>("{\"key\": }").unwrap_err();
        let sync_err = SyncError::from_json_error(err);
        match sync_err {
            SyncError::MalformedJson { line, column, .. } => {
                assert_eq!(line, 1);
                assert!(column > 0);
            }
            other => panic!("意外的错误类型: {:?}", other),
        }
    }
}
