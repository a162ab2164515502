//! SQLite storage for committed work items.
//!
//! Each row belongs to the user who committed it and to that user's group.
//! `(user_id, client_id)` is unique, so a re-sent add resolves to the row
//! that was stored the first time.

use chrono::{NaiveDate, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use standup_core::sync::{Acknowledgement, ChangeSet};
use standup_core::{TaskKind, TaskRef, WorkItem, WorkStatus};
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use uuid::Uuid;

/// Errors that can occur during server storage operations.
#[derive(Debug)]
pub enum ServerStorageError {
    /// I/O error preparing the data directory.
    IoError(PathBuf, io::Error),
    /// Query or connection failure.
    Database(sqlx::Error),
    /// Schema migration failure.
    Migration(sqlx::migrate::MigrateError),
    /// A stored row could not be turned back into a work item.
    InvalidRow(String),
}

impl std::fmt::Display for ServerStorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerStorageError::IoError(path, e) => {
                write!(f, "I/O error for {}: {}", path.display(), e)
            }
            ServerStorageError::Database(e) => write!(f, "Database error: {}", e),
            ServerStorageError::Migration(e) => write!(f, "Migration failed: {}", e),
            ServerStorageError::InvalidRow(msg) => write!(f, "Invalid stored work item: {}", msg),
        }
    }
}

impl std::error::Error for ServerStorageError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServerStorageError::IoError(_, e) => Some(e),
            ServerStorageError::Database(e) => Some(e),
            ServerStorageError::Migration(e) => Some(e),
            ServerStorageError::InvalidRow(_) => None,
        }
    }
}

impl From<sqlx::Error> for ServerStorageError {
    fn from(e: sqlx::Error) -> Self {
        ServerStorageError::Database(e)
    }
}

impl From<sqlx::migrate::MigrateError> for ServerStorageError {
    fn from(e: sqlx::migrate::MigrateError) -> Self {
        ServerStorageError::Migration(e)
    }
}

#[derive(sqlx::FromRow)]
struct WorkItemRow {
    id: String,
    client_id: String,
    work_date: String,
    task_kind: String,
    task_name: String,
    description: String,
    duration_minutes: i64,
    status: String,
    user_id: String,
}

impl TryFrom<WorkItemRow> for WorkItem {
    type Error = ServerStorageError;

    fn try_from(row: WorkItemRow) -> Result<Self, Self::Error> {
        let invalid = |what: &str, e: &dyn std::fmt::Display| {
            ServerStorageError::InvalidRow(format!("{} for {}: {}", what, row.id, e))
        };

        let date = NaiveDate::parse_from_str(&row.work_date, "%Y-%m-%d")
            .map_err(|e| invalid("date", &e))?;
        let kind = TaskKind::from_str(&row.task_kind).map_err(|e| invalid("task kind", &e))?;
        let status = WorkStatus::from_str(&row.status).map_err(|e| invalid("status", &e))?;
        let duration_minutes =
            u32::try_from(row.duration_minutes).map_err(|e| invalid("duration", &e))?;

        Ok(WorkItem {
            client_id: row.client_id,
            id: Some(row.id),
            date,
            task: TaskRef::new(kind, row.task_name),
            description: row.description,
            duration_minutes,
            status,
            created_by: row.user_id,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, client_id, work_date, task_kind, task_name, description, \
     duration_minutes, status, user_id FROM work_items";

/// Work item storage backed by a SQLite pool.
#[derive(Debug, Clone)]
pub struct WorkItemStore {
    pool: SqlitePool,
}

impl WorkItemStore {
    /// Opens (creating if needed) the database at `path` and runs migrations.
    pub async fn open(path: &Path) -> Result<Self, ServerStorageError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ServerStorageError::IoError(parent.to_path_buf(), e))?;
        }

        let db_url = format!("sqlite:{}?mode=rwc", path.display());

        let options = SqliteConnectOptions::from_str(&db_url)?.create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await?;

        sqlx::migrate!("./migrations").run(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a user's work items for one day, oldest first.
    pub async fn list_for_user(
        &self,
        user_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<WorkItem>, ServerStorageError> {
        let rows: Vec<WorkItemRow> = sqlx::query_as(&format!(
            "{} WHERE user_id = ? AND work_date = ? ORDER BY created_at, rowid",
            SELECT_COLUMNS
        ))
        .bind(user_id)
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkItem::try_from).collect()
    }

    /// Returns every group member's work items for one day.
    pub async fn list_for_group(
        &self,
        group_id: &str,
        date: NaiveDate,
    ) -> Result<Vec<WorkItem>, ServerStorageError> {
        let rows: Vec<WorkItemRow> = sqlx::query_as(&format!(
            "{} WHERE group_id = ? AND work_date = ? ORDER BY user_id, created_at, rowid",
            SELECT_COLUMNS
        ))
        .bind(group_id)
        .bind(date.format("%Y-%m-%d").to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(WorkItem::try_from).collect()
    }

    /// Applies a change set in one transaction.
    ///
    /// Returns one acknowledgement per stored add. Adds whose client id is
    /// already stored for the user update that row and acknowledge its id.
    /// Updates and deletes of ids the user does not own are skipped.
    pub async fn commit(
        &self,
        user_id: &str,
        group_id: &str,
        changes: &ChangeSet<WorkItem>,
    ) -> Result<Vec<Acknowledgement>, ServerStorageError> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now().to_rfc3339();
        let mut acks = Vec::with_capacity(changes.added.len());

        for item in &changes.added {
            let existing: Option<(String,)> =
                sqlx::query_as("SELECT id FROM work_items WHERE user_id = ? AND client_id = ?")
                    .bind(user_id)
                    .bind(&item.client_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let id = match existing {
                Some((id,)) => {
                    tracing::debug!("Add of {} already stored as {}", item.client_id, id);
                    update_row(&mut tx, user_id, &id, item, &now).await?;
                    id
                }
                None => {
                    let id = Uuid::new_v4().to_string();
                    sqlx::query(
                        r#"
                        INSERT INTO work_items (id, client_id, user_id, group_id, work_date, task_kind, task_name, description, duration_minutes, status, created_at, updated_at)
                        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                        "#,
                    )
                    .bind(&id)
                    .bind(&item.client_id)
                    .bind(user_id)
                    .bind(group_id)
                    .bind(item.date.format("%Y-%m-%d").to_string())
                    .bind(item.task.kind.to_string())
                    .bind(&item.task.name)
                    .bind(&item.description)
                    .bind(i64::from(item.duration_minutes))
                    .bind(item.status.as_str())
                    .bind(&now)
                    .bind(&now)
                    .execute(&mut *tx)
                    .await?;
                    id
                }
            };

            acks.push(Acknowledgement::new(id, item.client_id.clone()));
        }

        for item in &changes.updated {
            let Some(id) = item.id.as_deref() else {
                continue;
            };
            if !update_row(&mut tx, user_id, id, item, &now).await? {
                tracing::debug!("Skipping update of unknown work item {}", id);
            }
        }

        for id in &changes.deleted {
            let result = sqlx::query("DELETE FROM work_items WHERE id = ? AND user_id = ?")
                .bind(id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                tracing::debug!("Skipping delete of unknown work item {}", id);
            }
        }

        tx.commit().await?;

        Ok(acks)
    }
}

/// Overwrites the content of a stored row. Returns false if the user owns
/// no row with that id.
async fn update_row(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    user_id: &str,
    id: &str,
    item: &WorkItem,
    now: &str,
) -> Result<bool, ServerStorageError> {
    let result = sqlx::query(
        r#"
        UPDATE work_items
        SET work_date = ?, task_kind = ?, task_name = ?, description = ?, duration_minutes = ?, status = ?, updated_at = ?
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(item.date.format("%Y-%m-%d").to_string())
    .bind(item.task.kind.to_string())
    .bind(&item.task.name)
    .bind(&item.description)
    .bind(i64::from(item.duration_minutes))
    .bind(item.status.as_str())
    .bind(now)
    .bind(id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::{tempdir, TempDir};

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
    }

    fn item(client_id: &str, task: &str, minutes: u32) -> WorkItem {
        let mut item = WorkItem::new(day(), TaskRef::task(task), "ignored").with_duration(minutes);
        item.client_id = client_id.to_string();
        item
    }

    fn adds(items: Vec<WorkItem>) -> ChangeSet<WorkItem> {
        ChangeSet {
            added: items,
            ..ChangeSet::default()
        }
    }

    async fn open_store() -> (TempDir, WorkItemStore) {
        let temp_dir = tempdir().unwrap();
        let store = WorkItemStore::open(&temp_dir.path().join("data").join("standup.db"))
            .await
            .unwrap();
        (temp_dir, store)
    }

    #[tokio::test]
    async fn test_open_creates_tables() {
        let (_dir, store) = open_store().await;

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' AND name NOT LIKE 'sqlite_%' AND name NOT LIKE '_sqlx_%' ORDER BY name",
        )
        .fetch_all(&store.pool)
        .await
        .unwrap();

        let table_names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        assert_eq!(table_names, vec!["work_items"]);
    }

    #[tokio::test]
    async fn test_commit_adds_and_lists() {
        let (_dir, store) = open_store().await;

        let acks = store
            .commit("alice", "team", &adds(vec![item("c1", "JIRA-1", 30)]))
            .await
            .unwrap();

        assert_eq!(acks.len(), 1);
        assert_eq!(acks[0].client_id, "c1");

        let items = store.list_for_user("alice", day()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id.as_deref(), Some(acks[0].id.as_str()));
        assert_eq!(items[0].created_by, "alice");
        assert_eq!(items[0].duration_minutes, 30);
    }

    #[tokio::test]
    async fn test_resent_add_keeps_its_id() {
        let (_dir, store) = open_store().await;

        let first = store
            .commit("alice", "team", &adds(vec![item("c1", "JIRA-1", 30)]))
            .await
            .unwrap();
        let second = store
            .commit("alice", "team", &adds(vec![item("c1", "JIRA-1", 45)]))
            .await
            .unwrap();

        assert_eq!(first[0].id, second[0].id);
        let items = store.list_for_user("alice", day()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].duration_minutes, 45);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (_dir, store) = open_store().await;
        let acks = store
            .commit(
                "alice",
                "team",
                &adds(vec![item("c1", "JIRA-1", 30), item("c2", "JIRA-2", 10)]),
            )
            .await
            .unwrap();

        let mut edited = item("c1", "JIRA-1", 90).with_status(WorkStatus::Done);
        edited.id = Some(acks[0].id.clone());
        let changes = ChangeSet {
            added: Vec::new(),
            updated: vec![edited],
            deleted: vec![acks[1].id.clone()],
        };
        store.commit("alice", "team", &changes).await.unwrap();

        let items = store.list_for_user("alice", day()).await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].client_id, "c1");
        assert_eq!(items[0].duration_minutes, 90);
        assert_eq!(items[0].status, WorkStatus::Done);
    }

    #[tokio::test]
    async fn test_unknown_ids_are_skipped() {
        let (_dir, store) = open_store().await;
        let acks = store
            .commit("alice", "team", &adds(vec![item("c1", "JIRA-1", 30)]))
            .await
            .unwrap();

        let mut ghost = item("c9", "JIRA-9", 5);
        ghost.id = Some("missing".to_string());
        let changes = ChangeSet {
            added: Vec::new(),
            updated: vec![ghost],
            deleted: vec!["missing".to_string()],
        };
        assert!(store.commit("alice", "team", &changes).await.unwrap().is_empty());

        // bob cannot delete alice's item
        let steal = ChangeSet {
            deleted: vec![acks[0].id.clone()],
            ..ChangeSet::default()
        };
        store.commit("bob", "team", &steal).await.unwrap();

        assert_eq!(store.list_for_user("alice", day()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_for_group() {
        let (_dir, store) = open_store().await;
        store
            .commit("bob", "team", &adds(vec![item("c1", "JIRA-1", 30)]))
            .await
            .unwrap();
        store
            .commit("alice", "team", &adds(vec![item("c1", "JIRA-2", 60)]))
            .await
            .unwrap();
        store
            .commit("carol", "other", &adds(vec![item("c1", "JIRA-3", 15)]))
            .await
            .unwrap();

        let items = store.list_for_group("team", day()).await.unwrap();

        let users: Vec<&str> = items.iter().map(|i| i.created_by.as_str()).collect();
        assert_eq!(users, vec!["alice", "bob"]);
        assert!(store
            .list_for_group("team", day().succ_opt().unwrap())
            .await
            .unwrap()
            .is_empty());
    }
}
