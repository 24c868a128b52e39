//! Schema 初始化子模块
//!
//! ## 职责
//! - 创建任务表、任务条目表与索引
//! - 设置 SQLite 运行参数（WAL、外键）
//! - 通过 `PRAGMA user_version` 记录 schema 版本
//!
//! ## 错误语义
//! - DDL 失败统一映射为 `AppError::Database`

use rusqlite::Connection;

use crate::error::AppError;

const SCHEMA_VERSION: i64 = 1;

fn get_user_version(conn: &Connection) -> Result<i64, AppError> {
    conn.query_row("PRAGMA user_version", [], |row| row.get(0))
        .map_err(|e| AppError::Database(format!("读取数据库版本失败: {}", e)))
}

fn set_user_version(conn: &Connection, version: i64) -> Result<(), AppError> {
    conn.execute_batch(&format!("PRAGMA user_version = {version};"))
        .map_err(|e| AppError::Database(format!("写入数据库版本失败: {}", e)))
}

fn create_job_tables(conn: &Connection) -> Result<(), AppError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS jobs (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            owner TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'queued'
                CHECK (status IN ('queued', 'processing', 'done', 'failed')),
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        );
        CREATE TABLE IF NOT EXISTS job_items (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            job_id INTEGER NOT NULL,
            source TEXT NOT NULL,
            preset_key TEXT NOT NULL,
            fmt TEXT NOT NULL,
            quality INTEGER NOT NULL,
            fit TEXT NOT NULL,
            bg_color TEXT NOT NULL,
            status TEXT NOT NULL DEFAULT 'pending'
                CHECK (status IN ('pending', 'processing', 'done', 'failed')),
            dst_path TEXT,
            error TEXT,
            FOREIGN KEY (job_id) REFERENCES jobs(id) ON DELETE CASCADE
        );
        CREATE INDEX IF NOT EXISTS idx_jobs_owner ON jobs(owner, created_at DESC);
        CREATE INDEX IF NOT EXISTS idx_job_items_job_id ON job_items(job_id);"
    ).map_err(|e| AppError::Database(format!("创建任务表失败: {}", e)))
}

pub(super) fn initialize_schema(conn: &Connection) -> Result<(), AppError> {
    // 内存库不支持 WAL，失败可忽略
    conn.execute_batch("PRAGMA journal_mode=WAL;").ok();
    conn.execute_batch("PRAGMA foreign_keys=ON;")
        .map_err(|e| AppError::Database(format!("开启外键检查失败: {}", e)))?;

    let mut version = get_user_version(conn)?;
    if version > SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本高于当前程序: current={}, expected={}",
            version, SCHEMA_VERSION
        )));
    }

    if version < 1 {
        create_job_tables(conn)?;
        set_user_version(conn, 1)?;
        version = 1;
    }

    if version != SCHEMA_VERSION {
        return Err(AppError::Database(format!(
            "数据库版本不匹配: current={}, expected={}",
            version, SCHEMA_VERSION
        )));
    }

    Ok(())
}
