mod app;
mod cli;
mod completions;
mod config;
mod db;
mod domain;
mod init;
mod ui;

use tracing_subscriber::EnvFilter;

fn main() {
    init_tracing();
    match run() {
        Ok(()) => {}
        Err(err) if err.is_recoverable() => println!("{err}"),
        Err(err) => {
            eprintln!("error: {}", err);
            std::process::exit(1);
        }
    }
}

/// Logs go to stderr so stdout stays parseable. Filter with `TODOS_LOG`.
fn init_tracing() {
    let filter = EnvFilter::try_from_env("TODOS_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init();
}

fn print_json(value: &impl serde::Serialize) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).expect("json serialization should work")
    );
}

fn run() -> Result<(), app::AppError> {
    use clap::Parser;
    use cli::Commands;

    let cli = cli::Cli::parse();
    if let Commands::Completions(args) = &cli.command {
        return completions::run_completions_command(args.shell.as_deref());
    }

    let file_config = config::load_file_config(cli.config.as_deref())?;
    let settings = config::resolve(cli.db, cli.delete_policy, file_config);
    tracing::debug!(
        db = %settings.db_path,
        delete_policy = %settings.delete_policy,
        "resolved settings"
    );
    let mut app = app::App::open(&settings.db_path, settings.delete_policy)?;

    match cli.command {
        Commands::Init => {
            let (user, todo) = init::init_database(&mut app, &settings.db_path)?;
            println!("{user} {todo}");
            println!("Database initialized");
        }
        Commands::GetUser(args) => {
            let user = app.get_user(&args.username)?;
            if args.json {
                print_json(&user);
            } else {
                println!("{user}");
            }
        }
        Commands::AddUser(args) => {
            let user = app.add_user(&args.username, &args.email, &args.password)?;
            println!("{user}");
        }
        Commands::ChangeEmail(args) => {
            let user = app.change_email(&args.username, &args.email)?;
            println!("{user}");
        }
        Commands::DeleteUser(args) => {
            let summary = app.delete_user(&args.username)?;
            println!("{} deleted", summary.username);
        }
        Commands::AddTodo(args) => {
            let todo = app.add_todo(&args.username, &args.text)?;
            println!("{todo}");
        }
        Commands::GetTodos(args) => {
            let todos = match args.username.as_deref() {
                Some(username) => app.get_user_todos(username)?,
                None => app.get_todos()?,
            };
            if args.json {
                print_json(&todos);
            } else {
                ui::print_todo_list(&todos, args.username.as_deref());
            }
        }
        Commands::ToggleTodo(args) => {
            let todo = app.toggle_todo(args.todo_id, &args.username)?;
            println!("{}", toggle_message(&todo));
        }
        Commands::ShowTodo(args) => {
            let detail = app.show_todo(args.todo_id)?;
            if args.json {
                print_json(&detail);
            } else {
                ui::print_todo_detail(&detail);
            }
        }
        Commands::AddCategory(args) => {
            let category = app.add_category(&args.username, &args.text)?;
            println!("#{} {category}", category.id);
        }
        Commands::GetCategories(args) => {
            let categories = app.get_categories(&args.username)?;
            if args.json {
                print_json(&categories);
            } else {
                ui::print_category_list(&args.username, &categories);
            }
        }
        Commands::ShowCategory(args) => {
            let detail = app.show_category(args.category_id)?;
            if args.json {
                print_json(&detail);
            } else {
                ui::print_category_detail(&detail);
            }
        }
        Commands::Categorize(args) => {
            let link = app.categorize(args.todo_id, args.category_id, &args.username)?;
            println!(
                "todo {} in category {} {link}",
                link.todo_id, link.category_id
            );
        }
        Commands::Uncategorize(args) => {
            app.uncategorize(args.todo_id, args.category_id, &args.username)?;
            println!(
                "todo {} removed from category {}",
                args.todo_id, args.category_id
            );
        }
        Commands::Completions(_) => unreachable!("completions return before the store opens"),
    }

    Ok(())
}

fn toggle_message(todo: &domain::todo::Todo) -> String {
    format!("{} is {}!", todo.text, todo.status_label())
}
