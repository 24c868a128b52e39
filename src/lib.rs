//! # 社交媒体素材尺寸工具：库入口
//!
//! ## 架构总览
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │               命令行 (clap) / 其他调用方                  │
//! └───────┬──────────────────────────────────────────────────┘
//!         ↕ Result<T, AppError>
//! ┌───────┼──────────────────────────────────────────────────┐
//! │       ↕                                                  │
//! │  ┌─ config ───── AppConfig（环境变量覆盖默认值）           │
//! │  ├─ error ────── AppError（统一错误类型）                 │
//! │  ├─ presets ──── PresetCatalog（平台预设尺寸，不可变）     │
//! │  │                                                       │
//! │  ├─ jobs ─────── JobService 批量任务                      │
//! │  │   ├─ db        JobRepository（rusqlite）               │
//! │  │   ├─ storage   AssetStore 结果文件                     │
//! │  │   └─ engine    transform（阻塞线程池 + 超时）           │
//! │  │                                                       │
//! │  └─ engine ───── 校验·解码·适配·拍平·编码（纯函数）        │
//! └──────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 模块职责
//!
//! | 模块 | 职责 |
//! |------|------|
//! | [`engine`] | 单张图片变换：输入校验、方向/颜色规范化、stretch/contain/cover、编码 |
//! | [`presets`] | 预设 key → 目标尺寸 |
//! | [`jobs`] | 任务提交、条目处理、状态查询 |
//! | [`db`] | 任务与条目持久化（`JobRepository` + SQLite 实现） |
//! | [`storage`] | 结果资源目录的创建、写入与统计 |
//! | [`config`] | 进程级配置 |
//! | [`error`] | 统一错误类型 `AppError` 与状态码映射 |

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod jobs;
pub mod presets;
pub mod storage;
