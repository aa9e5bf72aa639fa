use std::io::{self, Write};

use crate::app::{App, AppError};
use crate::domain::todo::Todo;
use crate::domain::user::User;

const ANSI_RESET: &str = "\x1b[0m";
const ANSI_BOLD_CYAN: &str = "\x1b[1;36m";
const ANSI_BOLD_GREEN: &str = "\x1b[1;32m";
const ANSI_BOLD_YELLOW: &str = "\x1b[1;33m";

/// Wipes the database behind `app` and seeds the default user and todo.
pub(crate) fn init_database(app: &mut App, db_path: &str) -> Result<(User, Todo), AppError> {
    progress_warn(&format!("dropping every table in {db_path}"))?;
    progress("recreating schema and seeding default user")?;
    let (user, todo) = app.reset_and_seed()?;
    progress_ok(&format!(
        "seeded {} user(s): {} with {}",
        app.user_count()?,
        user.username,
        todo.text
    ))?;
    Ok((user, todo))
}

fn progress(message: &str) -> Result<(), AppError> {
    eprintln!("{ANSI_BOLD_CYAN}•{ANSI_RESET} {message}");
    io::stderr().flush()?;
    Ok(())
}

fn progress_ok(message: &str) -> Result<(), AppError> {
    eprintln!("{ANSI_BOLD_GREEN}✓{ANSI_RESET} {message}");
    io::stderr().flush()?;
    Ok(())
}

fn progress_warn(message: &str) -> Result<(), AppError> {
    eprintln!("{ANSI_BOLD_YELLOW}!{ANSI_RESET} {message}");
    io::stderr().flush()?;
    Ok(())
}

#[cfg(test)]
#[path = "init_tests.rs"]
mod tests;
