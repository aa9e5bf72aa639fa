use std::time::Duration;

use rusqlite::types::Type;
use rusqlite::{params, Connection, DatabaseName, OptionalExtension, Result, Row};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::domain::category::{Category, NewCategory, TodoCategory};
use crate::domain::todo::{NewTodo, Todo};
use crate::domain::user::{NewUser, User};

pub const CURRENT_SCHEMA_VERSION: i64 = 2;

struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

const MIGRATIONS: [Migration; 2] = [
    Migration {
        version: 1,
        name: "baseline_todo_schema_v1",
        sql: r#"
CREATE TABLE IF NOT EXISTS meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS "user" (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL,
    password TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS todo (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    text TEXT NOT NULL,
    done INTEGER NOT NULL DEFAULT 0 CHECK (done IN (0, 1)),
    user_id INTEGER NOT NULL REFERENCES "user"(id)
);

CREATE TABLE IF NOT EXISTS category (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES "user"(id),
    text TEXT NOT NULL CHECK (length(text) <= 255)
);

CREATE TABLE IF NOT EXISTS todo_category (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    todo_id INTEGER NOT NULL REFERENCES todo(id),
    category_id INTEGER NOT NULL REFERENCES category(id),
    last_modified TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    UNIQUE (todo_id, category_id)
);

CREATE INDEX IF NOT EXISTS idx_todo_user_id ON todo(user_id);
CREATE INDEX IF NOT EXISTS idx_category_user_id ON category(user_id);
CREATE INDEX IF NOT EXISTS idx_todo_category_category_id ON todo_category(category_id);
"#,
    },
    Migration {
        version: 2,
        name: "todo_category_last_modified_trigger_v1",
        sql: r#"
CREATE TRIGGER IF NOT EXISTS trg_todo_category_last_modified
AFTER UPDATE ON todo_category
FOR EACH ROW
BEGIN
    UPDATE todo_category
    SET last_modified = MAX(OLD.last_modified, strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
    WHERE id = NEW.id;
END;
"#,
    },
];

// Children before parents so the implicit deletes never trip a foreign key.
const DROP_ORDER: [&str; 6] = [
    "todo_category",
    "category",
    "todo",
    "\"user\"",
    "meta",
    "schema_migrations",
];

pub fn open_connection(path: &str) -> Result<Connection> {
    let mut conn = Connection::open(path)?;
    configure_pragmas(&conn)?;
    apply_migrations(&mut conn)?;
    Ok(conn)
}

fn configure_pragmas(conn: &Connection) -> Result<()> {
    conn.pragma_update(None::<DatabaseName>, "journal_mode", "WAL")?;
    conn.pragma_update(None::<DatabaseName>, "synchronous", "NORMAL")?;
    conn.pragma_update(None::<DatabaseName>, "foreign_keys", "ON")?;
    conn.pragma_update(None::<DatabaseName>, "temp_store", "MEMORY")?;
    conn.pragma_update(None::<DatabaseName>, "busy_timeout", 5000i64)?;
    conn.busy_timeout(Duration::from_millis(5000))?;
    Ok(())
}

fn apply_migrations(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch(
        r#"
CREATE TABLE IF NOT EXISTS schema_migrations (
    version INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
"#,
    )?;

    for migration in MIGRATIONS {
        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT version FROM schema_migrations WHERE version = ?1",
                params![migration.version],
                |row| row.get(0),
            )
            .optional()?;

        if already_applied.is_some() {
            continue;
        }

        tracing::debug!(
            version = migration.version,
            name = migration.name,
            "applying migration"
        );
        tx.execute_batch(migration.sql)?;
        tx.execute(
            "INSERT INTO schema_migrations (version, name, applied_at) VALUES (?1, ?2, ?3)",
            params![migration.version, migration.name, now_utc_rfc3339()],
        )?;
    }

    tx.execute(
        r#"
INSERT INTO meta (key, value)
VALUES ('schema_version', ?1)
ON CONFLICT(key) DO UPDATE SET value = excluded.value
"#,
        params![CURRENT_SCHEMA_VERSION.to_string()],
    )?;

    tx.commit()
}

/// Drops every table, forgets the id sequences, and re-applies the schema.
/// All rows are lost.
pub fn reset_schema(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;
    for table in DROP_ORDER {
        tx.execute_batch(&format!("DROP TABLE IF EXISTS {table};"))?;
    }
    let has_sequence: bool = tx.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence')",
        [],
        |row| row.get(0),
    )?;
    if has_sequence {
        tx.execute("DELETE FROM sqlite_sequence", [])?;
    }
    tx.commit()?;
    apply_migrations(conn)
}

fn now_utc_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .expect("RFC3339 formatting for UTC timestamp should never fail")
}

const USER_COLUMNS: &str = r#"SELECT id, username, email, password FROM "user""#;

fn user_from_row(row: &Row<'_>) -> Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password: row.get(3)?,
    })
}

pub fn insert_user(conn: &Connection, user: &NewUser<'_>) -> Result<i64> {
    conn.execute(
        r#"INSERT INTO "user" (username, email, password) VALUES (?1, ?2, ?3)"#,
        params![user.username, user.email, user.password],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_user(conn: &Connection, id: i64) -> Result<Option<User>> {
    conn.query_row(
        &format!("{USER_COLUMNS} WHERE id = ?1"),
        params![id],
        user_from_row,
    )
    .optional()
}

pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>> {
    conn.query_row(
        &format!("{USER_COLUMNS} WHERE username = ?1"),
        params![username],
        user_from_row,
    )
    .optional()
}

pub fn update_user_email(conn: &Connection, id: i64, email: &str) -> Result<()> {
    conn.execute(
        r#"UPDATE "user" SET email = ?1 WHERE id = ?2"#,
        params![email, id],
    )?;
    Ok(())
}

pub fn delete_user(conn: &Connection, id: i64) -> Result<usize> {
    conn.execute(r#"DELETE FROM "user" WHERE id = ?1"#, params![id])
}

pub fn count_users(conn: &Connection) -> Result<i64> {
    conn.query_row(r#"SELECT COUNT(*) FROM "user""#, [], |row| row.get(0))
}

const TODO_COLUMNS: &str = r#"
SELECT t.id, t.text, t.done, t.user_id, u.username
FROM todo t
JOIN "user" u ON u.id = t.user_id
"#;

fn todo_from_row(row: &Row<'_>) -> Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        text: row.get(1)?,
        done: row.get(2)?,
        user_id: row.get(3)?,
        username: row.get(4)?,
    })
}

fn collect_todos(conn: &Connection, sql: &str, id: Option<i64>) -> Result<Vec<Todo>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = match id {
        Some(id) => stmt.query_map(params![id], todo_from_row)?,
        None => stmt.query_map([], todo_from_row)?,
    };
    rows.collect()
}

pub fn insert_todo(conn: &Connection, todo: &NewTodo<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO todo (text, done, user_id) VALUES (?1, ?2, ?3)",
        params![todo.text, todo.done, todo.user_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_todo(conn: &Connection, id: i64) -> Result<Option<Todo>> {
    conn.query_row(
        &format!("{TODO_COLUMNS} WHERE t.id = ?1"),
        params![id],
        todo_from_row,
    )
    .optional()
}

/// Looks a todo up by id, but only if `user_id` owns it.
pub fn find_todo_for_user(conn: &Connection, id: i64, user_id: i64) -> Result<Option<Todo>> {
    conn.query_row(
        &format!("{TODO_COLUMNS} WHERE t.id = ?1 AND t.user_id = ?2"),
        params![id, user_id],
        todo_from_row,
    )
    .optional()
}

pub fn list_todos(conn: &Connection) -> Result<Vec<Todo>> {
    collect_todos(conn, &format!("{TODO_COLUMNS} ORDER BY t.id ASC"), None)
}

pub fn list_todos_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Todo>> {
    collect_todos(
        conn,
        &format!("{TODO_COLUMNS} WHERE t.user_id = ?1 ORDER BY t.id ASC"),
        Some(user_id),
    )
}

pub fn list_todos_for_category(conn: &Connection, category_id: i64) -> Result<Vec<Todo>> {
    collect_todos(
        conn,
        &format!(
            "{TODO_COLUMNS} JOIN todo_category tc ON tc.todo_id = t.id \
             WHERE tc.category_id = ?1 ORDER BY t.id ASC"
        ),
        Some(category_id),
    )
}

pub fn set_todo_done(conn: &Connection, id: i64, done: bool) -> Result<()> {
    conn.execute(
        "UPDATE todo SET done = ?1 WHERE id = ?2",
        params![done, id],
    )?;
    Ok(())
}

pub fn delete_todos_for_user(conn: &Connection, user_id: i64) -> Result<usize> {
    conn.execute("DELETE FROM todo WHERE user_id = ?1", params![user_id])
}

pub fn count_todos_for_user(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM todo WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

const CATEGORY_COLUMNS: &str = r#"
SELECT c.id, c.user_id, u.username, c.text
FROM category c
JOIN "user" u ON u.id = c.user_id
"#;

fn category_from_row(row: &Row<'_>) -> Result<Category> {
    Ok(Category {
        id: row.get(0)?,
        user_id: row.get(1)?,
        username: row.get(2)?,
        text: row.get(3)?,
    })
}

fn collect_categories(conn: &Connection, sql: &str, id: i64) -> Result<Vec<Category>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params![id], category_from_row)?;
    rows.collect()
}

pub fn insert_category(conn: &Connection, category: &NewCategory<'_>) -> Result<i64> {
    conn.execute(
        "INSERT INTO category (user_id, text) VALUES (?1, ?2)",
        params![category.user_id, category.text],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_category(conn: &Connection, id: i64) -> Result<Option<Category>> {
    conn.query_row(
        &format!("{CATEGORY_COLUMNS} WHERE c.id = ?1"),
        params![id],
        category_from_row,
    )
    .optional()
}

pub fn find_category_for_user(
    conn: &Connection,
    id: i64,
    user_id: i64,
) -> Result<Option<Category>> {
    conn.query_row(
        &format!("{CATEGORY_COLUMNS} WHERE c.id = ?1 AND c.user_id = ?2"),
        params![id, user_id],
        category_from_row,
    )
    .optional()
}

pub fn list_categories_for_user(conn: &Connection, user_id: i64) -> Result<Vec<Category>> {
    collect_categories(
        conn,
        &format!("{CATEGORY_COLUMNS} WHERE c.user_id = ?1 ORDER BY c.id ASC"),
        user_id,
    )
}

pub fn list_categories_for_todo(conn: &Connection, todo_id: i64) -> Result<Vec<Category>> {
    collect_categories(
        conn,
        &format!(
            "{CATEGORY_COLUMNS} JOIN todo_category tc ON tc.category_id = c.id \
             WHERE tc.todo_id = ?1 ORDER BY c.id ASC"
        ),
        todo_id,
    )
}

pub fn delete_categories_for_user(conn: &Connection, user_id: i64) -> Result<usize> {
    conn.execute("DELETE FROM category WHERE user_id = ?1", params![user_id])
}

pub fn count_categories_for_user(conn: &Connection, user_id: i64) -> Result<i64> {
    conn.query_row(
        "SELECT COUNT(*) FROM category WHERE user_id = ?1",
        params![user_id],
        |row| row.get(0),
    )
}

fn todo_category_from_row(row: &Row<'_>) -> Result<TodoCategory> {
    let raw: String = row.get(3)?;
    let last_modified = OffsetDateTime::parse(&raw, &Rfc3339)
        .map_err(|err| rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err)))?;
    Ok(TodoCategory {
        id: row.get(0)?,
        todo_id: row.get(1)?,
        category_id: row.get(2)?,
        last_modified,
    })
}

/// Creates the link, or touches `last_modified` when the pair already exists.
pub fn upsert_todo_category(conn: &Connection, todo_id: i64, category_id: i64) -> Result<()> {
    conn.execute(
        r#"
INSERT INTO todo_category (todo_id, category_id)
VALUES (?1, ?2)
ON CONFLICT(todo_id, category_id) DO UPDATE SET todo_id = excluded.todo_id
"#,
        params![todo_id, category_id],
    )?;
    Ok(())
}

pub fn get_todo_category(
    conn: &Connection,
    todo_id: i64,
    category_id: i64,
) -> Result<Option<TodoCategory>> {
    conn.query_row(
        r#"
SELECT id, todo_id, category_id, last_modified
FROM todo_category
WHERE todo_id = ?1 AND category_id = ?2
"#,
        params![todo_id, category_id],
        todo_category_from_row,
    )
    .optional()
}

pub fn list_todo_categories_for_todo(conn: &Connection, todo_id: i64) -> Result<Vec<TodoCategory>> {
    let mut stmt = conn.prepare(
        r#"
SELECT id, todo_id, category_id, last_modified
FROM todo_category
WHERE todo_id = ?1
ORDER BY category_id ASC
"#,
    )?;
    let rows = stmt.query_map(params![todo_id], todo_category_from_row)?;
    rows.collect()
}

pub fn delete_todo_category(conn: &Connection, todo_id: i64, category_id: i64) -> Result<usize> {
    conn.execute(
        "DELETE FROM todo_category WHERE todo_id = ?1 AND category_id = ?2",
        params![todo_id, category_id],
    )
}

/// Removes every link that touches one of the user's todos or categories.
pub fn delete_todo_categories_for_user(conn: &Connection, user_id: i64) -> Result<usize> {
    conn.execute(
        r#"
DELETE FROM todo_category
WHERE todo_id IN (SELECT id FROM todo WHERE user_id = ?1)
   OR category_id IN (SELECT id FROM category WHERE user_id = ?1)
"#,
        params![user_id],
    )
}

#[cfg(test)]
mod tests;
