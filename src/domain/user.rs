use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::category::NewCategory;
use super::todo::NewTodo;

/// A persisted account. Passwords are stored exactly as supplied.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password: String,
}

/// Insert payload for a user that has no row id yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewUser<'a> {
    pub username: &'a str,
    pub email: &'a str,
    pub password: &'a str,
}

impl<'a> NewUser<'a> {
    pub fn new(username: &'a str, email: &'a str, password: &'a str) -> Self {
        Self {
            username,
            email,
            password,
        }
    }
}

impl User {
    /// Builds a todo owned by this user. New todos always start not done.
    pub fn new_todo<'a>(&self, text: &'a str) -> NewTodo<'a> {
        NewTodo {
            user_id: self.id,
            text,
            done: false,
        }
    }

    pub fn new_category<'a>(&self, text: &'a str) -> NewCategory<'a> {
        NewCategory {
            user_id: self.id,
            text,
        }
    }
}

impl fmt::Display for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<User {} {} - {}>", self.id, self.username, self.email)
    }
}

/// What happens to a user's todos and categories when the user is deleted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Remove the user's links, todos and categories in the same transaction.
    #[default]
    Cascade,
    /// Refuse to delete a user that still owns todos or categories.
    Restrict,
}

impl DeletePolicy {
    pub fn as_str(self) -> &'static str {
        match self {
            DeletePolicy::Cascade => "cascade",
            DeletePolicy::Restrict => "restrict",
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown delete policy '{0}' (expected 'cascade' or 'restrict')")]
pub struct ParseDeletePolicyError(pub String);

impl FromStr for DeletePolicy {
    type Err = ParseDeletePolicyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "cascade" => Ok(DeletePolicy::Cascade),
            "restrict" => Ok(DeletePolicy::Restrict),
            _ => Err(ParseDeletePolicyError(raw.to_string())),
        }
    }
}
