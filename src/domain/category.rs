use std::fmt;

use serde::Serialize;
use time::macros::format_description;
use time::OffsetDateTime;

pub const MAX_CATEGORY_TEXT_LEN: usize = 255;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub user_id: i64,
    pub username: String,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCategory<'a> {
    pub user_id: i64,
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InvalidCategoryText {
    #[error("category text must not be empty")]
    Empty,
    #[error("category text is {0} characters; the limit is {max}", max = MAX_CATEGORY_TEXT_LEN)]
    TooLong(usize),
}

impl NewCategory<'_> {
    pub fn validate(&self) -> Result<(), InvalidCategoryText> {
        if self.text.trim().is_empty() {
            return Err(InvalidCategoryText::Empty);
        }
        let len = self.text.chars().count();
        if len > MAX_CATEGORY_TEXT_LEN {
            return Err(InvalidCategoryText::TooLong(len));
        }
        Ok(())
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<Category user:{} - {}>", self.username, self.text)
    }
}

/// Join row between a todo and a category. `last_modified` is maintained by
/// the store on insert and on every update of the row.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TodoCategory {
    pub id: i64,
    pub todo_id: i64,
    pub category_id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub last_modified: OffsetDateTime,
}

impl fmt::Display for TodoCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stamp = self
            .last_modified
            .format(format_description!(
                "[year]/[month]/[day], [hour]:[minute]:[second]"
            ))
            .map_err(|_| fmt::Error)?;
        write!(f, "<TodoCategory last modified {stamp}>")
    }
}
