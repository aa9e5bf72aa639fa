use std::io::{self, IsTerminal};

use crate::app::{CategoryDetail, TodoDetail};
use crate::domain::category::Category;
use crate::domain::todo::Todo;

pub fn print_todo_list(todos: &[Todo], owner: Option<&str>) {
    let palette = Palette::auto();
    match owner {
        Some(username) => println!("{}", palette.heading(&format!("Todos for {username}"))),
        None => println!("{}", palette.heading("Todos")),
    }
    if todos.is_empty() {
        println!("{}", palette.dim("no todos"));
        return;
    }
    for todo in todos {
        println!("{}", format_todo_row(todo, &palette));
    }
    println!("{}", palette.dim(&format!("{} todo(s)", todos.len())));
}

pub fn print_category_list(username: &str, categories: &[Category]) {
    let palette = Palette::auto();
    println!(
        "{}",
        palette.heading(&format!("Categories for {username}"))
    );
    if categories.is_empty() {
        println!("{}", palette.dim("no categories"));
        return;
    }
    for category in categories {
        println!("{} {category}", palette.id(&format!("#{}", category.id)));
    }
}

pub fn print_todo_detail(detail: &TodoDetail) {
    let palette = Palette::auto();
    println!("{}", format_todo_row(&detail.todo, &palette));
    for (category, link) in detail.categories.iter().zip(&detail.links) {
        println!("  {} {category} {}", palette.dim("↳"), palette.dim(&link.to_string()));
    }
}

pub fn print_category_detail(detail: &CategoryDetail) {
    let palette = Palette::auto();
    println!(
        "{} {}",
        palette.id(&format!("#{}", detail.category.id)),
        detail.category
    );
    for todo in &detail.todos {
        println!("  {} {}", palette.dim("↳"), format_todo_row(todo, &palette));
    }
}

fn format_todo_row(todo: &Todo, palette: &Palette) -> String {
    let line = todo.to_string();
    if todo.done {
        palette.done(&line)
    } else {
        line
    }
}

struct Palette {
    enabled: bool,
}

impl Palette {
    fn auto() -> Self {
        let enabled = std::env::var_os("NO_COLOR").is_none() && io::stdout().is_terminal();
        Self { enabled }
    }

    fn paint(&self, code: &str, text: &str) -> String {
        if self.enabled {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn heading(&self, text: &str) -> String {
        self.paint("1;36", text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint("2", text)
    }

    fn id(&self, text: &str) -> String {
        self.paint("1;94", text)
    }

    fn done(&self, text: &str) -> String {
        self.paint("32", text)
    }
}
