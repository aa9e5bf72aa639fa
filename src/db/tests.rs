use super::{
    count_categories_for_user, count_todos_for_user, count_users, delete_todo_categories_for_user,
    delete_user, find_todo_for_user, find_user_by_username, get_todo_category, insert_category,
    insert_todo, insert_user, list_categories_for_todo, list_todos, list_todos_for_category,
    open_connection, reset_schema, set_todo_done, upsert_todo_category, CURRENT_SCHEMA_VERSION,
};
use crate::domain::category::NewCategory;
use crate::domain::todo::NewTodo;
use crate::domain::user::NewUser;
use rusqlite::{params, ErrorCode};
use uuid::Uuid;

fn unique_db_path() -> String {
    std::env::temp_dir()
        .join(format!("todos-db-{}.sqlite", Uuid::now_v7()))
        .display()
        .to_string()
}

fn cleanup_db_files(path: &str) {
    for suffix in ["", "-wal", "-shm"] {
        let candidate = format!("{path}{suffix}");
        let _ = std::fs::remove_file(candidate);
    }
}

fn table_exists(conn: &rusqlite::Connection, table_name: &str) -> bool {
    let exists: i64 = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
            params![table_name],
            |row| row.get(0),
        )
        .expect("table existence query should be readable");
    exists == 1
}

fn seed_user(conn: &rusqlite::Connection, username: &str) -> i64 {
    insert_user(conn, &NewUser::new(username, "x@mail.com", "pw")).expect("user should insert")
}

fn is_constraint(err: &rusqlite::Error) -> bool {
    err.sqlite_error_code() == Some(ErrorCode::ConstraintViolation)
}

#[test]
fn configures_connection_pragmas() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    let journal_mode: String = conn
        .query_row("PRAGMA journal_mode;", [], |row| row.get(0))
        .expect("journal_mode pragma should be readable");
    assert_eq!(journal_mode.to_uppercase(), "WAL");

    let foreign_keys: i64 = conn
        .query_row("PRAGMA foreign_keys;", [], |row| row.get(0))
        .expect("foreign_keys pragma should be readable");
    assert_eq!(foreign_keys, 1);

    let busy_timeout: i64 = conn
        .query_row("PRAGMA busy_timeout;", [], |row| row.get(0))
        .expect("busy_timeout pragma should be readable");
    assert_eq!(busy_timeout, 5000);

    cleanup_db_files(&path);
}

#[test]
fn initializes_required_tables_and_schema_version() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    for table in [
        "schema_migrations",
        "meta",
        "user",
        "todo",
        "category",
        "todo_category",
    ] {
        assert!(
            table_exists(&conn, table),
            "expected table '{}' to exist",
            table
        );
    }

    let schema_version: String = conn
        .query_row(
            "SELECT value FROM meta WHERE key='schema_version'",
            [],
            |row| row.get(0),
        )
        .expect("schema version should be stored in meta table");
    assert_eq!(schema_version, CURRENT_SCHEMA_VERSION.to_string());

    cleanup_db_files(&path);
}

#[test]
fn reapplies_migrations_idempotently() {
    let path = unique_db_path();
    let conn_first = open_connection(&path).expect("first open should initialize schema");
    drop(conn_first);

    let conn_second = open_connection(&path).expect("second open should be idempotent");
    let applied_count: i64 = conn_second
        .query_row("SELECT COUNT(*) FROM schema_migrations", [], |row| {
            row.get(0)
        })
        .expect("schema_migrations count should be queryable");
    assert_eq!(applied_count, CURRENT_SCHEMA_VERSION);

    cleanup_db_files(&path);
}

#[test]
fn reset_schema_drops_rows_and_restarts_ids() {
    let path = unique_db_path();
    let mut conn = open_connection(&path).expect("connection should open");
    let first = seed_user(&conn, "alice");
    seed_user(&conn, "carol");
    assert_eq!(first, 1);

    reset_schema(&mut conn).expect("reset should succeed");
    assert_eq!(count_users(&conn).expect("count should work"), 0);
    assert_eq!(seed_user(&conn, "bob"), 1);

    cleanup_db_files(&path);
}

#[test]
fn username_is_unique() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    seed_user(&conn, "alice");

    let err = insert_user(&conn, &NewUser::new("alice", "other@mail.com", "pw"))
        .expect_err("duplicate username should fail");
    assert!(is_constraint(&err), "unexpected error: {err}");
    assert_eq!(count_users(&conn).expect("count should work"), 1);

    cleanup_db_files(&path);
}

#[test]
fn todo_and_category_require_existing_user() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");

    let todo_err = insert_todo(
        &conn,
        &NewTodo {
            user_id: 42,
            text: "orphan",
            done: false,
        },
    )
    .expect_err("todo without user should fail");
    assert!(is_constraint(&todo_err));

    let category_err = insert_category(
        &conn,
        &NewCategory {
            user_id: 42,
            text: "orphan",
        },
    )
    .expect_err("category without user should fail");
    assert!(is_constraint(&category_err));

    cleanup_db_files(&path);
}

#[test]
fn store_blocks_deleting_a_user_with_todos() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let user_id = seed_user(&conn, "alice");
    insert_todo(
        &conn,
        &NewTodo {
            user_id,
            text: "buy milk",
            done: false,
        },
    )
    .expect("todo should insert");

    let err = delete_user(&conn, user_id).expect_err("dependent todo should block delete");
    assert!(is_constraint(&err));
    assert!(find_user_by_username(&conn, "alice")
        .expect("lookup should work")
        .is_some());

    cleanup_db_files(&path);
}

#[test]
fn todo_lookup_is_scoped_to_owner() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let alice = seed_user(&conn, "alice");
    let bob = seed_user(&conn, "bob");
    let todo_id = insert_todo(
        &conn,
        &NewTodo {
            user_id: alice,
            text: "buy milk",
            done: false,
        },
    )
    .expect("todo should insert");

    let owned = find_todo_for_user(&conn, todo_id, alice)
        .expect("lookup should work")
        .expect("owner should see todo");
    assert_eq!(owned.username, "alice");
    assert!(!owned.done);
    assert!(find_todo_for_user(&conn, todo_id, bob)
        .expect("lookup should work")
        .is_none());

    set_todo_done(&conn, todo_id, true).expect("update should work");
    let listed = list_todos(&conn).expect("list should work");
    assert_eq!(listed.len(), 1);
    assert!(listed[0].done);

    cleanup_db_files(&path);
}

#[test]
fn links_traverse_both_directions_and_touch_keeps_time_monotonic() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let user_id = seed_user(&conn, "alice");
    let todo_id = insert_todo(
        &conn,
        &NewTodo {
            user_id,
            text: "buy milk",
            done: false,
        },
    )
    .expect("todo should insert");
    let category_id = insert_category(
        &conn,
        &NewCategory {
            user_id,
            text: "errands",
        },
    )
    .expect("category should insert");

    upsert_todo_category(&conn, todo_id, category_id).expect("link should insert");
    let created = get_todo_category(&conn, todo_id, category_id)
        .expect("lookup should work")
        .expect("link should exist");

    upsert_todo_category(&conn, todo_id, category_id).expect("second link should touch");
    let touched = get_todo_category(&conn, todo_id, category_id)
        .expect("lookup should work")
        .expect("link should still exist");
    assert_eq!(touched.id, created.id);
    assert!(touched.last_modified >= created.last_modified);

    let categories = list_categories_for_todo(&conn, todo_id).expect("traversal should work");
    assert_eq!(categories.len(), 1);
    assert_eq!(categories[0].text, "errands");
    let todos = list_todos_for_category(&conn, category_id).expect("traversal should work");
    assert_eq!(todos.len(), 1);
    assert_eq!(todos[0].id, todo_id);

    cleanup_db_files(&path);
}

#[test]
fn trigger_never_moves_last_modified_backwards() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let user_id = seed_user(&conn, "alice");
    let todo_id = insert_todo(
        &conn,
        &NewTodo {
            user_id,
            text: "buy milk",
            done: false,
        },
    )
    .expect("todo should insert");
    let category_id = insert_category(
        &conn,
        &NewCategory {
            user_id,
            text: "errands",
        },
    )
    .expect("category should insert");
    upsert_todo_category(&conn, todo_id, category_id).expect("link should insert");

    let before: String = conn
        .query_row("SELECT last_modified FROM todo_category", [], |row| {
            row.get(0)
        })
        .expect("stamp should be readable");

    conn.execute(
        "UPDATE todo_category SET last_modified = '2000-01-01T00:00:00.000Z'",
        [],
    )
    .expect("backdated update should run");

    let after: String = conn
        .query_row("SELECT last_modified FROM todo_category", [], |row| {
            row.get(0)
        })
        .expect("stamp should be readable");
    assert_ne!(after, "2000-01-01T00:00:00.000Z");
    assert!(after >= before, "{after} should not precede {before}");

    cleanup_db_files(&path);
}

#[test]
fn deleting_user_links_clears_both_sides() {
    let path = unique_db_path();
    let conn = open_connection(&path).expect("connection should open");
    let alice = seed_user(&conn, "alice");
    let bob = seed_user(&conn, "bob");
    let alice_todo = insert_todo(
        &conn,
        &NewTodo {
            user_id: alice,
            text: "a",
            done: false,
        },
    )
    .expect("todo should insert");
    let bob_category = insert_category(
        &conn,
        &NewCategory {
            user_id: bob,
            text: "b",
        },
    )
    .expect("category should insert");
    upsert_todo_category(&conn, alice_todo, bob_category).expect("link should insert");

    assert_eq!(
        delete_todo_categories_for_user(&conn, bob).expect("delete should work"),
        1
    );
    assert_eq!(count_todos_for_user(&conn, alice).expect("count"), 1);
    assert_eq!(count_categories_for_user(&conn, bob).expect("count"), 1);

    cleanup_db_files(&path);
}
