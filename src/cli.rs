//! 命令行参数定义

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// creative-portal - 社交媒体素材尺寸工具
///
/// 把一张图片按平台预设（或显式宽高）裁切 / 缩放并编码为目标格式，
/// 也可以批量提交任务并查询结果。
#[derive(Parser)]
#[command(name = "creative-portal")]
#[command(version)]
#[command(about = "Resize creative assets to social media presets", long_about = None)]
pub struct Cli {
    /// 覆盖 LOG_LEVEL
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 列出全部预设
    Presets,

    /// 变换单张图片
    Resize {
        /// 输入图片路径
        #[arg(short, long)]
        input: PathBuf,

        /// 输出路径；缺省时写到输入旁边
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// 预设 key（与 --width/--height 二选一）
        #[arg(short, long, conflicts_with_all = ["width", "height"])]
        preset: Option<String>,

        #[arg(long, requires = "height")]
        width: Option<u32>,

        #[arg(long, requires = "width")]
        height: Option<u32>,

        /// jpeg / png / webp / avif
        #[arg(short, long, default_value = "jpeg")]
        format: String,

        /// 1-100，仅有损格式生效
        #[arg(short, long, default_value_t = 85)]
        quality: u32,

        /// stretch / contain / cover
        #[arg(long, default_value = "cover")]
        fit: String,

        /// contain 留白与 JPEG 拍平使用的背景色
        #[arg(long, default_value = "#FFFFFF")]
        bg_color: String,
    },

    /// 从 JSON 文件提交批量任务
    Job {
        /// `{"owner": "...", "items": [...]}`
        #[arg(short, long)]
        file: PathBuf,

        /// 覆盖文件中的 owner
        #[arg(long)]
        owner: Option<String>,
    },

    /// 查询任务状态
    JobStatus {
        #[arg(long)]
        id: i64,
    },

    /// 检查配置、预设表、数据库与资源目录
    Health,
}
