//! Relational task and category storage.
//!
//! [`Storage`] is the single handle the rest of the server is given at
//! startup. All access goes through [`Storage::transaction`], which runs a
//! closure over a [`TaskTx`] atomically: the closure returning `Ok` commits,
//! returning `Err` rolls every write back.
//!
//! [`SqliteStore`] is the production implementation. The connection lives
//! behind a mutex and every transaction runs on tokio's blocking pool, so
//! request handlers only suspend while waiting for the database.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use taskboard_proto::task::{
    Category, CategoryId, Task, TaskId, ValidationError, validate_category_name,
};

/// Categories created by `--seed-categories`.
pub const DEFAULT_CATEGORIES: [&str; 4] = ["Work", "Home", "Study", "Health"];

/// Errors raised by the storage layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database directory could not be created.
    #[error("failed to create database directory {path}: {source}")]
    CreateDir {
        /// Directory that was attempted.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A statement or commit failed.
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),

    /// The blocking worker running the transaction went away.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A write targeted a task that does not exist.
    #[error("unknown task: {0}")]
    UnknownTask(TaskId),

    /// A field failed validation before it reached the database.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Fields of a task about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Validated title.
    pub title: String,
    /// Completion flag.
    pub completed: bool,
    /// Display priority.
    pub priority: u32,
    /// Optional category reference.
    pub category_id: Option<CategoryId>,
}

/// A partial task update; `None` fields are left unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskPatch {
    /// New validated title.
    pub title: Option<String>,
    /// New completion flag.
    pub completed: Option<bool>,
    /// `Some(None)` clears the category.
    pub category_id: Option<Option<CategoryId>>,
    /// New priority.
    pub priority: Option<u32>,
}

/// Row operations available inside a storage transaction.
pub trait TaskTx {
    /// Looks up a task joined with its category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError>;

    /// Returns every task in canonical order, joined with its category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    fn list_tasks(&self) -> Result<Vec<Task>, StoreError>;

    /// Highest priority currently stored, or `None` when there are no tasks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    fn max_priority(&self) -> Result<Option<u32>, StoreError>;

    /// Inserts a task and returns its new id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] on constraint violations.
    fn insert_task(&self, task: &NewTask) -> Result<TaskId, StoreError>;

    /// Applies a patch. Returns `false` if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] on constraint violations.
    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<bool, StoreError>;

    /// Overwrites a task's priority. Returns `false` if the task does not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the statement fails.
    fn set_priority(&self, id: TaskId, priority: u32) -> Result<bool, StoreError>;

    /// Permanently removes a task. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the statement fails.
    fn delete_task(&self, id: TaskId) -> Result<bool, StoreError>;

    /// Returns every category ordered by name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    fn list_categories(&self) -> Result<Vec<Category>, StoreError>;

    /// Looks up a category.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the query fails.
    fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError>;

    /// Inserts a category, or returns the existing one with the same name.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Validation`] for an invalid name.
    fn insert_category(&self, name: &str) -> Result<Category, StoreError>;

    /// Removes a category. Tasks referencing it keep existing with no
    /// category. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if the statement fails.
    fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError>;
}

/// Handle to the storage engine.
pub trait Storage: Send + Sync + 'static {
    /// Runs `f` inside one atomic transaction.
    ///
    /// Commits when `f` returns `Ok`; rolls back when it returns `Err`, in
    /// which case no write made by `f` is observable.
    fn transaction<T, E, F>(&self, f: F) -> impl std::future::Future<Output = Result<T, E>> + Send
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&dyn TaskTx) -> Result<T, E> + Send + 'static;
}

/// SQLite-backed [`Storage`].
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for SqliteStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteStore")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl SqliteStore {
    /// Opens (creating if needed) the database file at `path` and applies
    /// the schema.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::CreateDir`] if the parent directory cannot be
    /// created, or [`StoreError::Sql`] if the database cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| StoreError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(&path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        Self::with_connection(conn, Some(path))
    }

    /// Opens a private in-memory database. Used by tests and `start_test_server`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Sql`] if `SQLite` cannot allocate the database.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::with_connection(Connection::open_in_memory()?, None)
    }

    /// Path of the database file, `None` for in-memory stores.
    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn with_connection(conn: Connection, path: Option<PathBuf>) -> Result<Self, StoreError> {
        migrate(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            path,
        })
    }
}

impl Storage for SqliteStore {
    async fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<StoreError> + Send + 'static,
        F: FnOnce(&dyn TaskTx) -> Result<T, E> + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || -> Result<T, E> {
            let mut conn = conn.lock();
            let tx = conn.transaction().map_err(StoreError::from)?;
            // Dropping `tx` without commit rolls back.
            let value = f(&SqliteTx { tx: &tx })?;
            tx.commit().map_err(StoreError::from)?;
            Ok(value)
        })
        .await
        .map_err(|e| E::from(StoreError::Unavailable(e.to_string())))?
    }
}

/// Inserts [`DEFAULT_CATEGORIES`], keeping any that already exist.
///
/// # Errors
///
/// Returns [`StoreError`] if the transaction fails.
pub async fn seed_default_categories<S: Storage>(store: &S) -> Result<Vec<Category>, StoreError> {
    store
        .transaction(|tx| {
            for name in DEFAULT_CATEGORIES {
                tx.insert_category(name)?;
            }
            tx.list_categories()
        })
        .await
}

fn migrate(conn: &Connection) -> Result<(), StoreError> {
    conn.execute_batch(
        r#"
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS Categories (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          name TEXT NOT NULL UNIQUE,
          createdAt INTEGER NOT NULL,
          updatedAt INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS Tasks (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          title TEXT NOT NULL,
          completed INTEGER NOT NULL DEFAULT 0,
          priority INTEGER NOT NULL DEFAULT 0 CHECK (priority >= 0),
          categoryId INTEGER REFERENCES Categories(id) ON UPDATE CASCADE ON DELETE SET NULL,
          createdAt INTEGER NOT NULL,
          updatedAt INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS tasks_priority ON Tasks(priority);
        CREATE INDEX IF NOT EXISTS tasks_category_id ON Tasks(categoryId);
        "#,
    )?;
    Ok(())
}

const TASK_SELECT: &str = r"
    SELECT t.id, t.title, t.completed, t.priority, t.categoryId, t.createdAt, t.updatedAt,
           c.id, c.name, c.createdAt, c.updatedAt
    FROM Tasks t
    LEFT JOIN Categories c ON c.id = t.categoryId
";

const CATEGORY_SELECT: &str = "SELECT id, name, createdAt, updatedAt FROM Categories";

struct SqliteTx<'a> {
    tx: &'a rusqlite::Transaction<'a>,
}

impl TaskTx for SqliteTx<'_> {
    fn find_task(&self, id: TaskId) -> Result<Option<Task>, StoreError> {
        let sql = format!("{TASK_SELECT} WHERE t.id = ?1");
        Ok(self
            .tx
            .query_row(&sql, params![id.as_i64()], task_from_row)
            .optional()?)
    }

    fn list_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let sql = format!("{TASK_SELECT} ORDER BY t.priority ASC, t.id ASC");
        let mut stmt = self.tx.prepare(&sql)?;
        let tasks = stmt
            .query_map([], task_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tasks)
    }

    fn max_priority(&self) -> Result<Option<u32>, StoreError> {
        let max: Option<i64> = self
            .tx
            .query_row("SELECT MAX(priority) FROM Tasks", [], |row| row.get(0))?;
        max.map(|p| to_priority(0, p))
            .transpose()
            .map_err(StoreError::from)
    }

    fn insert_task(&self, task: &NewTask) -> Result<TaskId, StoreError> {
        let now = now_ms();
        self.tx.execute(
            r"
            INSERT INTO Tasks(title, completed, priority, categoryId, createdAt, updatedAt)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ",
            params![
                task.title,
                task.completed,
                i64::from(task.priority),
                task.category_id.map(CategoryId::as_i64),
                now
            ],
        )?;
        Ok(TaskId::new(self.tx.last_insert_rowid()))
    }

    fn update_task(&self, id: TaskId, patch: &TaskPatch) -> Result<bool, StoreError> {
        let Some(current) = self.find_task(id)? else {
            return Ok(false);
        };
        let title = patch.title.as_deref().unwrap_or(&current.title);
        let completed = patch.completed.unwrap_or(current.completed);
        let category_id = patch.category_id.unwrap_or(current.category_id);
        let priority = patch.priority.unwrap_or(current.priority);
        let changed = self.tx.execute(
            r"
            UPDATE Tasks
            SET title = ?1, completed = ?2, categoryId = ?3, priority = ?4, updatedAt = ?5
            WHERE id = ?6
            ",
            params![
                title,
                completed,
                category_id.map(CategoryId::as_i64),
                i64::from(priority),
                now_ms(),
                id.as_i64()
            ],
        )?;
        Ok(changed > 0)
    }

    fn set_priority(&self, id: TaskId, priority: u32) -> Result<bool, StoreError> {
        let changed = self.tx.execute(
            "UPDATE Tasks SET priority = ?1, updatedAt = ?2 WHERE id = ?3",
            params![i64::from(priority), now_ms(), id.as_i64()],
        )?;
        Ok(changed > 0)
    }

    fn delete_task(&self, id: TaskId) -> Result<bool, StoreError> {
        let changed = self
            .tx
            .execute("DELETE FROM Tasks WHERE id = ?1", params![id.as_i64()])?;
        Ok(changed > 0)
    }

    fn list_categories(&self) -> Result<Vec<Category>, StoreError> {
        let sql = format!("{CATEGORY_SELECT} ORDER BY name ASC");
        let mut stmt = self.tx.prepare(&sql)?;
        let categories = stmt
            .query_map([], |row| category_from_row(row, 0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(categories)
    }

    fn find_category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let sql = format!("{CATEGORY_SELECT} WHERE id = ?1");
        Ok(self
            .tx
            .query_row(&sql, params![id.as_i64()], |row| category_from_row(row, 0))
            .optional()?)
    }

    fn insert_category(&self, name: &str) -> Result<Category, StoreError> {
        let name = validate_category_name(name)?;
        let now = now_ms();
        self.tx.execute(
            r"
            INSERT INTO Categories(name, createdAt, updatedAt) VALUES (?1, ?2, ?2)
            ON CONFLICT(name) DO NOTHING
            ",
            params![name, now],
        )?;
        let sql = format!("{CATEGORY_SELECT} WHERE name = ?1");
        Ok(self
            .tx
            .query_row(&sql, params![name], |row| category_from_row(row, 0))?)
    }

    fn delete_category(&self, id: CategoryId) -> Result<bool, StoreError> {
        let changed = self
            .tx
            .execute("DELETE FROM Categories WHERE id = ?1", params![id.as_i64()])?;
        Ok(changed > 0)
    }
}

fn task_from_row(row: &Row<'_>) -> rusqlite::Result<Task> {
    let category_id: Option<i64> = row.get(4)?;
    let category = match row.get::<_, Option<i64>>(7)? {
        Some(_) => Some(category_from_row(row, 7)?),
        None => None,
    };
    Ok(Task {
        id: TaskId::new(row.get(0)?),
        title: row.get(1)?,
        completed: row.get(2)?,
        priority: to_priority(3, row.get(3)?)?,
        category_id: category_id.map(CategoryId::new),
        created_at: to_datetime(5, row.get(5)?)?,
        updated_at: to_datetime(6, row.get(6)?)?,
        category,
    })
}

fn category_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Category> {
    Ok(Category {
        id: CategoryId::new(row.get(offset)?),
        name: row.get(offset + 1)?,
        created_at: to_datetime(offset + 2, row.get(offset + 2)?)?,
        updated_at: to_datetime(offset + 3, row.get(offset + 3)?)?,
    })
}

fn to_priority(column: usize, value: i64) -> rusqlite::Result<u32> {
    u32::try_from(value).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(column, value))
}

fn to_datetime(column: usize, millis: i64) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or(rusqlite::Error::IntegralValueOutOfRange(column, millis))
}

fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}
