use std::fmt;

use serde::Serialize;

/// A todo row joined with its owner's username.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Todo {
    pub id: i64,
    pub text: String,
    pub done: bool,
    pub user_id: i64,
    pub username: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewTodo<'a> {
    pub user_id: i64,
    pub text: &'a str,
    pub done: bool,
}

impl Todo {
    /// Flips `done`. Two toggles restore the original value.
    pub fn toggle(&mut self) {
        self.done = !self.done;
    }

    pub fn status_label(&self) -> &'static str {
        if self.done {
            "done"
        } else {
            "not done"
        }
    }
}

impl fmt::Display for Todo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "<Todo: {} | {} | {} | {}>",
            self.id,
            self.username,
            self.text,
            self.status_label()
        )
    }
}
