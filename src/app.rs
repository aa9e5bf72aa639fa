use rusqlite::{Connection, ErrorCode, Transaction, TransactionBehavior};
use serde::Serialize;

use crate::config::ConfigError;
use crate::db;
use crate::domain::category::{Category, InvalidCategoryText, TodoCategory};
use crate::domain::todo::Todo;
use crate::domain::user::{DeletePolicy, NewUser, User};

pub const SEED_USERNAME: &str = "bob";
pub const SEED_EMAIL: &str = "bob@mail.com";
pub const SEED_PASSWORD: &str = "bobpass";
pub const SEED_TODO: &str = "wash car";

/// Command handlers over one open store. Every mutating handler runs in a
/// single immediate transaction; returning early with an error rolls it back.
pub struct App {
    conn: Connection,
    delete_policy: DeletePolicy,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct DeletedUser {
    pub username: String,
    pub todos: usize,
    pub categories: usize,
    pub links: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TodoDetail {
    pub todo: Todo,
    pub categories: Vec<Category>,
    pub links: Vec<TodoCategory>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CategoryDetail {
    pub category: Category,
    pub todos: Vec<Todo>,
}

impl App {
    pub fn open(db_path: &str, delete_policy: DeletePolicy) -> Result<Self, AppError> {
        ensure_parent_dir(db_path)?;
        let conn = db::open_connection(db_path)?;
        Ok(Self {
            conn,
            delete_policy,
        })
    }

    fn begin(&mut self) -> Result<Transaction<'_>, AppError> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }

    /// Drops every table, recreates the schema and seeds one user with one
    /// todo. Everything previously stored is lost.
    pub fn reset_and_seed(&mut self) -> Result<(User, Todo), AppError> {
        tracing::warn!("dropping all tables and reseeding the database");
        db::reset_schema(&mut self.conn)?;

        let tx = self.begin()?;
        let user_id = db::insert_user(
            &tx,
            &NewUser::new(SEED_USERNAME, SEED_EMAIL, SEED_PASSWORD),
        )?;
        let user = db::get_user(&tx, user_id)?
            .ok_or_else(|| AppError::UserNotFound(SEED_USERNAME.to_string()))?;
        let todo_id = db::insert_todo(&tx, &user.new_todo(SEED_TODO))?;
        let todo = require_todo(&tx, todo_id)?;
        tx.commit()?;
        Ok((user, todo))
    }

    pub fn user_count(&self) -> Result<i64, AppError> {
        Ok(db::count_users(&self.conn)?)
    }

    pub fn get_user(&self, username: &str) -> Result<User, AppError> {
        tracing::debug!(username, "looking up user");
        require_user(&self.conn, username)
    }

    pub fn add_user(
        &mut self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AppError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::InvalidArgument(
                "username must not be empty".to_string(),
            ));
        }

        let tx = self.begin()?;
        let user_id = db::insert_user(&tx, &NewUser::new(username, email, password))?;
        let user = db::get_user(&tx, user_id)?
            .ok_or_else(|| AppError::UserNotFound(username.to_string()))?;
        tx.commit()?;
        tracing::info!(user_id, username, "created user");
        Ok(user)
    }

    pub fn change_email(&mut self, username: &str, email: &str) -> Result<User, AppError> {
        let tx = self.begin()?;
        let mut user = require_user(&tx, username)?;
        user.email = email.to_string();
        db::update_user_email(&tx, user.id, &user.email)?;
        tx.commit()?;
        tracing::info!(user_id = user.id, username, "changed email");
        Ok(user)
    }

    /// Deletes a user according to the configured [`DeletePolicy`].
    pub fn delete_user(&mut self, username: &str) -> Result<DeletedUser, AppError> {
        let policy = self.delete_policy;
        let tx = self.begin()?;
        let user = require_user(&tx, username)?;

        let summary = match policy {
            DeletePolicy::Cascade => {
                let links = db::delete_todo_categories_for_user(&tx, user.id)?;
                let todos = db::delete_todos_for_user(&tx, user.id)?;
                let categories = db::delete_categories_for_user(&tx, user.id)?;
                DeletedUser {
                    username: user.username.clone(),
                    todos,
                    categories,
                    links,
                }
            }
            DeletePolicy::Restrict => {
                let todos = db::count_todos_for_user(&tx, user.id)?;
                let categories = db::count_categories_for_user(&tx, user.id)?;
                if todos > 0 || categories > 0 {
                    tracing::warn!(username, todos, categories, "delete refused");
                    return Err(AppError::HasDependents {
                        username: user.username,
                        todos,
                        categories,
                    });
                }
                DeletedUser {
                    username: user.username.clone(),
                    todos: 0,
                    categories: 0,
                    links: 0,
                }
            }
        };

        db::delete_user(&tx, user.id)?;
        tx.commit()?;
        tracing::info!(
            username,
            policy = %policy,
            todos = summary.todos,
            categories = summary.categories,
            links = summary.links,
            "deleted user"
        );
        Ok(summary)
    }

    pub fn add_todo(&mut self, username: &str, text: &str) -> Result<Todo, AppError> {
        let tx = self.begin()?;
        let user = require_user(&tx, username)?;
        let todo_id = db::insert_todo(&tx, &user.new_todo(text))?;
        let todo = require_todo(&tx, todo_id)?;
        tx.commit()?;
        tracing::info!(todo_id, username, "created todo");
        Ok(todo)
    }

    pub fn get_todos(&self) -> Result<Vec<Todo>, AppError> {
        Ok(db::list_todos(&self.conn)?)
    }

    pub fn get_user_todos(&self, username: &str) -> Result<Vec<Todo>, AppError> {
        let user = require_user(&self.conn, username)?;
        Ok(db::list_todos_for_user(&self.conn, user.id)?)
    }

    /// Flips `done` on a todo, but only when `username` owns it.
    pub fn toggle_todo(&mut self, todo_id: i64, username: &str) -> Result<Todo, AppError> {
        let tx = self.begin()?;
        let user = require_user(&tx, username)?;
        let mut todo = db::find_todo_for_user(&tx, todo_id, user.id)?.ok_or_else(|| {
            AppError::NoTodoForUser {
                username: username.to_string(),
                todo_id,
            }
        })?;
        todo.toggle();
        db::set_todo_done(&tx, todo.id, todo.done)?;
        tx.commit()?;
        tracing::info!(todo_id, username, done = todo.done, "toggled todo");
        Ok(todo)
    }

    pub fn show_todo(&self, todo_id: i64) -> Result<TodoDetail, AppError> {
        let todo = require_todo(&self.conn, todo_id)?;
        let categories = db::list_categories_for_todo(&self.conn, todo_id)?;
        let links = db::list_todo_categories_for_todo(&self.conn, todo_id)?;
        Ok(TodoDetail {
            todo,
            categories,
            links,
        })
    }

    pub fn add_category(&mut self, username: &str, text: &str) -> Result<Category, AppError> {
        let tx = self.begin()?;
        let user = require_user(&tx, username)?;
        let new_category = user.new_category(text);
        new_category.validate()?;
        let category_id = db::insert_category(&tx, &new_category)?;
        let category =
            db::get_category(&tx, category_id)?.ok_or(AppError::CategoryNotFound(category_id))?;
        tx.commit()?;
        tracing::info!(category_id, username, "created category");
        Ok(category)
    }

    pub fn get_categories(&self, username: &str) -> Result<Vec<Category>, AppError> {
        let user = require_user(&self.conn, username)?;
        Ok(db::list_categories_for_user(&self.conn, user.id)?)
    }

    pub fn show_category(&self, category_id: i64) -> Result<CategoryDetail, AppError> {
        let category = db::get_category(&self.conn, category_id)?
            .ok_or(AppError::CategoryNotFound(category_id))?;
        let todos = db::list_todos_for_category(&self.conn, category_id)?;
        Ok(CategoryDetail { category, todos })
    }

    /// Links a todo to a category of the same owner. Re-linking an existing
    /// pair refreshes its `last_modified`.
    pub fn categorize(
        &mut self,
        todo_id: i64,
        category_id: i64,
        username: &str,
    ) -> Result<TodoCategory, AppError> {
        let tx = self.begin()?;
        let user = require_user(&tx, username)?;
        require_owned_pair(&tx, &user, todo_id, category_id)?;
        db::upsert_todo_category(&tx, todo_id, category_id)?;
        let link = db::get_todo_category(&tx, todo_id, category_id)?.ok_or(
            AppError::LinkNotFound {
                todo_id,
                category_id,
            },
        )?;
        tx.commit()?;
        tracing::info!(todo_id, category_id, username, "linked todo to category");
        Ok(link)
    }

    pub fn uncategorize(
        &mut self,
        todo_id: i64,
        category_id: i64,
        username: &str,
    ) -> Result<(), AppError> {
        let tx = self.begin()?;
        let user = require_user(&tx, username)?;
        require_owned_pair(&tx, &user, todo_id, category_id)?;
        if db::delete_todo_category(&tx, todo_id, category_id)? == 0 {
            return Err(AppError::LinkNotFound {
                todo_id,
                category_id,
            });
        }
        tx.commit()?;
        tracing::info!(todo_id, category_id, username, "unlinked todo from category");
        Ok(())
    }
}

fn require_user(conn: &Connection, username: &str) -> Result<User, AppError> {
    db::find_user_by_username(conn, username)?
        .ok_or_else(|| AppError::UserNotFound(username.to_string()))
}

fn require_todo(conn: &Connection, todo_id: i64) -> Result<Todo, AppError> {
    db::get_todo(conn, todo_id)?.ok_or(AppError::TodoNotFound(todo_id))
}

fn require_owned_pair(
    conn: &Connection,
    user: &User,
    todo_id: i64,
    category_id: i64,
) -> Result<(), AppError> {
    if db::find_todo_for_user(conn, todo_id, user.id)?.is_none() {
        return Err(AppError::NoTodoForUser {
            username: user.username.clone(),
            todo_id,
        });
    }
    if db::find_category_for_user(conn, category_id, user.id)?.is_none() {
        return Err(AppError::NoCategoryForUser {
            username: user.username.clone(),
            category_id,
        });
    }
    Ok(())
}

fn ensure_parent_dir(path: &str) -> Result<(), AppError> {
    if let Some(parent) = std::path::Path::new(path).parent() {
        std::fs::create_dir_all(parent)?;
    }
    Ok(())
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("database error: {0}")]
    Db(#[source] rusqlite::Error),
    #[error("integrity violation: {0}")]
    Integrity(#[source] rusqlite::Error),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    InvalidCategory(#[from] InvalidCategoryText),
    #[error("{0}")]
    InvalidArgument(String),
    #[error("{0} not found!")]
    UserNotFound(String),
    #[error("{username} has no todo id {todo_id}")]
    NoTodoForUser { username: String, todo_id: i64 },
    #[error("{username} has no category id {category_id}")]
    NoCategoryForUser { username: String, category_id: i64 },
    #[error("todo id {0} not found")]
    TodoNotFound(i64),
    #[error("category id {0} not found")]
    CategoryNotFound(i64),
    #[error("todo id {todo_id} is not in category id {category_id}")]
    LinkNotFound { todo_id: i64, category_id: i64 },
    #[error(
        "{username} still owns {todos} todo(s) and {categories} category(ies); \
         delete policy is restrict"
    )]
    HasDependents {
        username: String,
        todos: i64,
        categories: i64,
    },
}

impl AppError {
    /// Lookup misses are reported to the user but do not fail the process.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            AppError::UserNotFound(_)
                | AppError::NoTodoForUser { .. }
                | AppError::NoCategoryForUser { .. }
                | AppError::TodoNotFound(_)
                | AppError::CategoryNotFound(_)
                | AppError::LinkNotFound { .. }
        )
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        if value.sqlite_error_code() == Some(ErrorCode::ConstraintViolation) {
            AppError::Integrity(value)
        } else {
            AppError::Db(value)
        }
    }
}
