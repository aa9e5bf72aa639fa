use std::path::PathBuf;

use clap::builder::styling::{AnsiColor, Effects, Styles};
use clap::{Args, CommandFactory, Parser, Subcommand};

use crate::domain::user::DeletePolicy;

fn cli_styles() -> Styles {
    Styles::styled()
        .header(AnsiColor::BrightCyan.on_default() | Effects::BOLD)
        .usage(AnsiColor::BrightYellow.on_default() | Effects::BOLD)
        .literal(AnsiColor::BrightGreen.on_default() | Effects::BOLD)
        .placeholder(AnsiColor::BrightMagenta.on_default())
}

pub fn styled_command() -> clap::Command {
    Cli::command()
}

#[derive(Debug, Parser)]
#[command(name = "todos")]
#[command(bin_name = "todos")]
#[command(version)]
#[command(about = "A SQLite-backed todo list manager")]
#[command(styles = cli_styles())]
pub struct Cli {
    #[arg(
        short = 'd',
        long,
        env = "TODOS_DB_PATH",
        help = "Path to the SQLite database [default: .todos/todos.sqlite]."
    )]
    pub db: Option<String>,

    #[arg(
        short = 'c',
        long,
        env = "TODOS_CONFIG",
        help = "TOML config file [default: .todos/config.toml if present]."
    )]
    pub config: Option<PathBuf>,

    #[arg(
        long,
        env = "TODOS_DELETE_POLICY",
        help = "What delete-user does with a user's todos and categories: cascade or restrict."
    )]
    pub delete_policy: Option<DeletePolicy>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    #[command(about = "Drop and recreate the database, seeding one user and one todo.")]
    Init,
    #[command(about = "Show one user.")]
    GetUser(GetUserArgs),
    #[command(about = "Create a user.")]
    AddUser(AddUserArgs),
    #[command(about = "Change a user's email address.")]
    ChangeEmail(ChangeEmailArgs),
    #[command(about = "Delete a user.")]
    DeleteUser(UsernameArgs),
    #[command(about = "Add a todo for a user.")]
    AddTodo(AddTodoArgs),
    #[command(about = "List todos.")]
    GetTodos(GetTodosArgs),
    #[command(about = "Flip a todo between done and not done.")]
    ToggleTodo(ToggleTodoArgs),
    #[command(about = "Show one todo with its categories.")]
    ShowTodo(ShowTodoArgs),
    #[command(about = "Add a category for a user.")]
    AddCategory(AddCategoryArgs),
    #[command(about = "List a user's categories.")]
    GetCategories(GetCategoriesArgs),
    #[command(about = "Show one category with its todos.")]
    ShowCategory(ShowCategoryArgs),
    #[command(about = "Put a todo into a category.")]
    Categorize(LinkArgs),
    #[command(about = "Take a todo out of a category.")]
    Uncategorize(LinkArgs),
    #[command(about = "Print shell completions.")]
    Completions(CompletionsArgs),
}

#[derive(Debug, Args)]
pub struct UsernameArgs {
    #[arg(default_value = "bob", help = "Username.")]
    pub username: String,
}

#[derive(Debug, Args)]
pub struct GetUserArgs {
    #[arg(default_value = "bob", help = "Username.")]
    pub username: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AddUserArgs {
    #[arg(help = "Unique username.")]
    pub username: String,
    #[arg(help = "Email address.")]
    pub email: String,
    #[arg(help = "Password (stored as given).")]
    pub password: String,
}

#[derive(Debug, Args)]
pub struct ChangeEmailArgs {
    #[arg(default_value = "bob", help = "Username.")]
    pub username: String,
    #[arg(default_value = "bob@mail.com", help = "New email address.")]
    pub email: String,
}

#[derive(Debug, Args)]
pub struct AddTodoArgs {
    #[arg(default_value = "bob", help = "Owner username.")]
    pub username: String,
    #[arg(default_value = "clean room", help = "Todo text.")]
    pub text: String,
}

#[derive(Debug, Args)]
pub struct GetTodosArgs {
    #[arg(short = 'u', long = "user", help = "Only list todos owned by this user.")]
    pub username: Option<String>,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ToggleTodoArgs {
    #[arg(default_value_t = 1, help = "Todo id.")]
    pub todo_id: i64,
    #[arg(default_value = "bob", help = "Owner username.")]
    pub username: String,
}

#[derive(Debug, Args)]
pub struct ShowTodoArgs {
    #[arg(help = "Todo id.")]
    pub todo_id: i64,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct AddCategoryArgs {
    #[arg(help = "Owner username.")]
    pub username: String,
    #[arg(help = "Category text (at most 255 characters).")]
    pub text: String,
}

#[derive(Debug, Args)]
pub struct GetCategoriesArgs {
    #[arg(default_value = "bob", help = "Owner username.")]
    pub username: String,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ShowCategoryArgs {
    #[arg(help = "Category id.")]
    pub category_id: i64,

    #[arg(short = 'j', long, help = "Render machine-readable JSON.")]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct LinkArgs {
    #[arg(help = "Todo id.")]
    pub todo_id: i64,
    #[arg(help = "Category id.")]
    pub category_id: i64,
    #[arg(default_value = "bob", help = "Username owning both.")]
    pub username: String,
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    #[arg(help = "Shell name (bash, zsh, fish, elvish, powershell). Auto-detected if omitted.")]
    pub shell: Option<String>,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
