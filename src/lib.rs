pub mod change;
pub mod config;
pub mod dom;
pub mod grouper;
pub mod maps;
pub mod patcher;
pub mod pipeline;
pub mod platforms;
pub mod pruner;
pub mod topic;
pub mod utils;

// 重新导出主要结构
pub use change::{ChangeKind, ChangeRecord, ChangeSet, ChangeType};
pub use config::SyncConfig;
pub use dom::XmlDocument;
pub use grouper::GroupedValue;
pub use pipeline::{RunReport, SyncPipeline};
pub use platforms::{Platform, PlatformSet};
pub use pruner::SectionDefaults;
pub use utils::SyncError;

// 常量定义
pub const SUPPORTED_EXTENSIONS: &[&str] = &["json"];
