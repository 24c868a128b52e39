//! SQLite 任务仓储实现
//!
//! 单连接 + `Mutex`，所有操作都经 `with_conn` 取锁后执行。

use std::fs;
use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::error::AppError;

use super::{schema, ItemStatus, Job, JobItem, JobRepository, JobStatus, NewJobItem};

pub struct SqliteJobRepository {
    conn: Mutex<Connection>,
}

impl SqliteJobRepository {
    /// 打开（必要时创建）数据库文件并初始化 schema。
    pub fn open(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|e| AppError::Database(format!("创建数据库目录失败: {}", e)))?;
        }
        log::info!("数据库路径: {}", path.display());

        let conn = Connection::open(path)
            .map_err(|e| AppError::Database(format!("打开数据库失败: {}", e)))?;
        Self::from_connection(conn)
    }

    pub fn open_in_memory() -> Result<Self, AppError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AppError::Database(format!("打开内存数据库失败: {}", e)))?;
        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AppError> {
        schema::initialize_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn with_conn<T>(&self, op: impl FnOnce(&Connection) -> Result<T, AppError>) -> Result<T, AppError> {
        let conn = self.conn.lock().map_err(|e| {
            AppError::Database(format!("获取数据库锁失败: {}", e))
        })?;
        op(&conn)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn parse_column<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: std::str::FromStr<Err = AppError>,
{
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

fn row_to_job(row: &Row<'_>) -> rusqlite::Result<Job> {
    Ok(Job {
        id: row.get(0)?,
        owner: row.get(1)?,
        status: parse_column(row, 2)?,
        created_at: row.get(3)?,
        updated_at: row.get(4)?,
    })
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<JobItem> {
    Ok(JobItem {
        id: row.get(0)?,
        job_id: row.get(1)?,
        source: row.get(2)?,
        preset_key: row.get(3)?,
        format: row.get(4)?,
        quality: row.get(5)?,
        fit: row.get(6)?,
        bg_color: row.get(7)?,
        status: parse_column(row, 8)?,
        dst_path: row.get(9)?,
        error: row.get(10)?,
    })
}

const ITEM_COLUMNS: &str =
    "id, job_id, source, preset_key, fmt, quality, fit, bg_color, status, dst_path, error";

fn touch_job(conn: &Connection, job_id: i64) -> Result<(), AppError> {
    conn.execute(
        "UPDATE jobs SET updated_at = ?1 WHERE id = ?2",
        params![now_millis(), job_id],
    )
    .map_err(|e| AppError::Database(format!("更新任务时间失败: {}", e)))?;
    Ok(())
}

impl JobRepository for SqliteJobRepository {
    fn create(&self, owner: &str) -> Result<Job, AppError> {
        self.with_conn(|conn| {
            let now = now_millis();
            conn.execute(
                "INSERT INTO jobs (owner, status, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
                params![owner, JobStatus::Queued.as_str(), now],
            )
            .map_err(|e| AppError::Database(format!("创建任务失败: {}", e)))?;

            Ok(Job {
                id: conn.last_insert_rowid(),
                owner: owner.to_string(),
                status: JobStatus::Queued,
                created_at: now,
                updated_at: now,
            })
        })
    }

    fn find_by_id(&self, id: i64) -> Result<Option<Job>, AppError> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, owner, status, created_at, updated_at FROM jobs WHERE id = ?1",
                params![id],
                row_to_job,
            )
            .optional()
            .map_err(|e| AppError::Database(format!("查询任务失败: {}", e)))
        })
    }

    fn update_status(&self, id: i64, status: JobStatus) -> Result<(), AppError> {
        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE jobs SET status = ?1, updated_at = ?2 WHERE id = ?3",
                    params![status.as_str(), now_millis(), id],
                )
                .map_err(|e| AppError::Database(format!("更新任务状态失败: {}", e)))?;

            if changed == 0 {
                return Err(AppError::NotFound(format!("任务 {}", id)));
            }
            Ok(())
        })
    }

    fn add_item(&self, job_id: i64, item: &NewJobItem) -> Result<JobItem, AppError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO job_items (job_id, source, preset_key, fmt, quality, fit, bg_color, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    job_id,
                    item.source,
                    item.preset_key,
                    item.format,
                    item.quality,
                    item.fit,
                    item.bg_color,
                    ItemStatus::Pending.as_str(),
                ],
            )
            .map_err(|e| AppError::Database(format!("添加任务条目失败: {}", e)))?;
            let id = conn.last_insert_rowid();
            touch_job(conn, job_id)?;

            Ok(JobItem {
                id,
                job_id,
                source: item.source.clone(),
                preset_key: item.preset_key.clone(),
                format: item.format.clone(),
                quality: item.quality,
                fit: item.fit.clone(),
                bg_color: item.bg_color.clone(),
                status: ItemStatus::Pending,
                dst_path: None,
                error: None,
            })
        })
    }

    fn update_item(
        &self,
        item_id: i64,
        status: ItemStatus,
        dst_path: Option<&str>,
        error: Option<&str>,
    ) -> Result<(), AppError> {
        self.with_conn(|conn| {
            let job_id: Option<i64> = conn
                .query_row(
                    "SELECT job_id FROM job_items WHERE id = ?1",
                    params![item_id],
                    |row| row.get(0),
                )
                .optional()
                .map_err(|e| AppError::Database(format!("查询任务条目失败: {}", e)))?;
            let job_id = job_id.ok_or_else(|| AppError::NotFound(format!("任务条目 {}", item_id)))?;

            conn.execute(
                "UPDATE job_items SET status = ?1, dst_path = ?2, error = ?3 WHERE id = ?4",
                params![status.as_str(), dst_path, error, item_id],
            )
            .map_err(|e| AppError::Database(format!("更新任务条目失败: {}", e)))?;

            touch_job(conn, job_id)
        })
    }

    fn items(&self, job_id: i64) -> Result<Vec<JobItem>, AppError> {
        self.with_conn(|conn| {
            let mut stmt = conn
                .prepare(&format!(
                    "SELECT {ITEM_COLUMNS} FROM job_items WHERE job_id = ?1 ORDER BY id ASC"
                ))
                .map_err(|e| AppError::Database(format!("准备条目查询失败: {}", e)))?;
            let rows = stmt
                .query_map(params![job_id], row_to_item)
                .map_err(|e| AppError::Database(format!("查询任务条目失败: {}", e)))?;

            rows.collect::<Result<Vec<_>, _>>()
                .map_err(|e| AppError::Database(format!("读取任务条目失败: {}", e)))
        })
    }
}
