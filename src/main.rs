use clap::Parser;
use std::path::PathBuf;

use anyhow::{bail, Context};
use dita_sync::{ChangeSet, SyncConfig, SyncPipeline, SUPPORTED_EXTENSIONS};

#[derive(Parser)]
#[command(name = "dita_sync")]
#[command(about = "按 JSON 变更描述同步 DITA API 文档语料库")]
#[command(version = "0.3.0")]
struct Cli {
    /// 变更描述 JSON 文件路径
    #[arg(short, long)]
    data: PathBuf,

    /// 语料库根目录（包含 API/ 与 config/ 子目录）
    #[arg(short, long)]
    base_dir: PathBuf,

    /// 模板目录（Method.dita、Callback.dita、Enum.dita、Class.dita）
    #[arg(short, long)]
    templates_dir: PathBuf,

    /// 只打印变更集统计信息，不执行同步
    #[arg(long)]
    stats: bool,

    /// 演算整个流程但不写任何文件
    #[arg(long)]
    dry_run: bool,

    /// 首次写入既有文件前创建时间戳备份
    #[arg(long)]
    backup: bool,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    validate_input(&cli.data)?;

    let change_set = ChangeSet::load(&cli.data)
        .with_context(|| format!("加载变更描述失败: {:?}", cli.data))?;

    if cli.stats {
        print!("{}", change_set.stats());
        return Ok(());
    }

    let mut config = SyncConfig::new(&cli.base_dir, &cli.templates_dir)?;
    config.dry_run = cli.dry_run;
    config.backup = cli.backup;
    config.validate().context("运行前校验失败")?;

    if !cli.quiet {
        println!("变更记录数: {}", change_set.len());
    }

    let mut pipeline = SyncPipeline::new(config);
    let report = pipeline.run(&change_set);

    if !cli.quiet {
        print!("{}", report);
    }

    if report.has_failures() {
        bail!("{} 条记录处理失败", report.failed.len());
    }
    Ok(())
}

/// 验证输入文件
fn validate_input(input: &PathBuf) -> anyhow::Result<()> {
    if !input.exists() {
        bail!("变更描述文件不存在: {:?}", input);
    }

    let extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase());

    if !SUPPORTED_EXTENSIONS.iter().any(|&ext| Some(ext) == extension.as_deref()) {
        bail!("变更描述必须是 JSON 文件");
    }

    Ok(())
}
