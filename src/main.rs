use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use colored::{ColoredString, Colorize};
use eyre::{Result, eyre};
use std::path::PathBuf;
use todostore::config::default_config_path;
use todostore::{
    Category, CategoryFilter, Clock, Config, DateRange, Priority, PriorityFilter, StatusFilter, StorageBackend,
    SystemClock, Task, TaskForm, TaskPatch, TaskStore, TodoStats, UuidIds, open_storage,
};
use tracing::Level;

#[derive(Parser)]
#[command(name = "todostore")]
#[command(about = "TodoStore CLI - Todo list with filters, statistics and local persistence")]
#[command(version = env!("GIT_DESCRIBE"))]
struct Cli {
    /// Path to the YAML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the storage backend (file, sqlite, memory)
    #[arg(long)]
    backend: Option<StorageBackend>,

    /// Override the storage directory
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a task
    Add {
        title: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "medium")]
        priority: Priority,
        #[arg(short, long, default_value = "general")]
        category: Category,
        /// Due date (YYYY-MM-DD)
        #[arg(long, default_value = "")]
        due: String,
        /// Tag (repeatable, max 5)
        #[arg(short, long = "tag")]
        tags: Vec<String>,
    },

    /// List tasks matching the active filters
    List {
        /// Ignore the active filters
        #[arg(short, long)]
        all: bool,
    },

    /// Show one task in full
    Show { id: String },

    /// Change fields of a task
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long, conflicts_with = "clear_description")]
        description: Option<String>,
        #[arg(long)]
        clear_description: bool,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(short, long)]
        category: Option<Category>,
        #[arg(long, conflicts_with = "clear_due")]
        due: Option<String>,
        #[arg(long)]
        clear_due: bool,
        /// Replace tags (repeatable)
        #[arg(short, long = "tag", conflicts_with = "clear_tags")]
        tags: Vec<String>,
        #[arg(long)]
        clear_tags: bool,
    },

    /// Flip a task between active and completed
    Toggle { id: String },

    /// Delete a task
    Delete { id: String },

    /// Show aggregate statistics
    Stats,

    /// List incomplete tasks past their due date
    Overdue,

    /// List tasks in a category, ignoring filters
    Category { category: Category },

    /// List every tag in use
    Tags,

    /// Inspect or change the active filters
    Filter {
        #[command(subcommand)]
        command: FilterCommands,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// all, active, completed, overdue
    Status { status: StatusFilter },
    /// all, high, medium, low
    Priority { priority: PriorityFilter },
    /// all or a category name
    Category { category: CategoryFilter },
    /// Case-insensitive text search; omit to clear
    Search {
        #[arg(default_value = "")]
        query: String,
    },
    /// all, today, tomorrow, this-week, next-week, overdue
    Date { range: DateRange },
    /// Require a tag (any required tag matches)
    TagAdd { tag: String },
    TagRemove { tag: String },
    /// Reset all filters
    Clear,
    /// Print the active filters
    Show,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(default_config_path);
    let mut config = Config::load(&config_path)?;
    if let Some(backend) = cli.backend {
        config.storage.backend = backend;
    }
    if let Some(dir) = &cli.data_dir {
        config.storage.path = dir.clone();
    }

    init_tracing(cli.verbose, &config.log_level);

    let storage = open_storage(&config.storage)?;
    let mut store = TaskStore::open(storage, Box::new(SystemClock), Box::new(UuidIds), config.storage.key.clone());

    run(&mut store, cli.command)?;

    if !store.is_durable() {
        eprintln!("{}", "warning: changes could not be saved and will be lost on exit".yellow());
    }
    Ok(())
}

fn init_tracing(verbose: u8, configured: &str) {
    let level = match verbose {
        0 => configured.parse().unwrap_or(Level::WARN),
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();
}

fn run(store: &mut TaskStore, command: Commands) -> Result<()> {
    let today = SystemClock.today();

    match command {
        Commands::Add {
            title,
            description,
            priority,
            category,
            due,
            tags,
        } => {
            let mut form = TaskForm::new(title);
            form.description = description;
            form.priority = priority;
            form.category = category;
            form.due_date = due;
            for tag in &tags {
                form.add_tag(tag)?;
            }
            let input = form.validate()?;
            let task = store.create_task(input);
            println!("{} {}", "Created".green(), short_id(&task.id).bold());
        }

        Commands::List { all } => {
            let tasks: Vec<&Task> = if all {
                store.tasks().iter().collect()
            } else {
                store.filtered_tasks()
            };
            if !all && !store.filter_criteria().is_default() {
                println!("{}", format!("Filtered: {}", describe_filters(store)).dimmed());
            }
            print_tasks(&tasks, today);
        }

        Commands::Show { id } => {
            let id = resolve_id(store, &id)?;
            let task = store.get_task(&id).ok_or_else(|| eyre!("Task not found: {}", id))?;
            print_task_detail(task, today);
        }

        Commands::Edit {
            id,
            title,
            description,
            clear_description,
            priority,
            category,
            due,
            clear_due,
            tags,
            clear_tags,
        } => {
            let id = resolve_id(store, &id)?;
            let mut patch = TaskPatch {
                priority,
                category,
                ..Default::default()
            };
            if let Some(title) = title {
                patch.title = Some(TaskForm::validate_title(&title)?);
            }
            if clear_description {
                patch.description = Some(None);
            } else if let Some(description) = description {
                patch.description = Some(TaskForm::validate_description(&description)?);
            }
            if clear_due {
                patch.due_date = Some(None);
            } else if let Some(due) = due {
                patch.due_date = Some(TaskForm::validate_due_date(&due)?);
            }
            if clear_tags {
                patch.tags = Some(Vec::new());
            } else if !tags.is_empty() {
                let mut form = TaskForm::default();
                for tag in &tags {
                    form.add_tag(tag)?;
                }
                patch.tags = Some(form.tags().to_vec());
            }
            if patch.is_empty() {
                return Err(eyre!("Nothing to change"));
            }
            store.update_task(&id, patch);
            println!("{} {}", "Updated".green(), short_id(&id).bold());
        }

        Commands::Toggle { id } => {
            let id = resolve_id(store, &id)?;
            store.toggle_complete(&id);
            let done = store.get_task(&id).is_some_and(|t| t.completed);
            let state = if done { "completed".green() } else { "active".yellow() };
            println!("{} is now {}", short_id(&id).bold(), state);
        }

        Commands::Delete { id } => {
            let id = resolve_id(store, &id)?;
            store.delete_task(&id);
            println!("{} {}", "Deleted".red(), short_id(&id).bold());
        }

        Commands::Stats => print_stats(&store.stats()),

        Commands::Overdue => print_tasks(&store.overdue_tasks(), today),

        Commands::Category { category } => print_tasks(&store.tasks_by_category(category), today),

        Commands::Tags => {
            let tags = store.all_tags();
            if tags.is_empty() {
                println!("{}", "No tags".dimmed());
            }
            for tag in tags {
                println!("#{}", tag);
            }
        }

        Commands::Filter { command } => {
            match command {
                FilterCommands::Status { status } => store.set_status_filter(status),
                FilterCommands::Priority { priority } => store.set_priority_filter(priority),
                FilterCommands::Category { category } => store.set_category_filter(category),
                FilterCommands::Search { query } => store.set_search_query(query),
                FilterCommands::Date { range } => store.set_date_range_filter(range),
                FilterCommands::TagAdd { tag } => store.add_tag_filter(tag.trim()),
                FilterCommands::TagRemove { tag } => store.remove_tag_filter(tag.trim()),
                FilterCommands::Clear => store.clear_filters(),
                FilterCommands::Show => {}
            }
            println!("{}", describe_filters(store));
        }
    }

    Ok(())
}

/// Accept a full id or an unambiguous prefix
fn resolve_id(store: &TaskStore, id: &str) -> Result<String> {
    if store.get_task(id).is_some() {
        return Ok(id.to_string());
    }

    let matches: Vec<&Task> = store.tasks().iter().filter(|t| t.id.starts_with(id)).collect();
    match matches.as_slice() {
        [task] => Ok(task.id.clone()),
        [] => Err(eyre!("Task not found: {}", id)),
        _ => Err(eyre!("Ambiguous id {}: {} tasks match", id, matches.len())),
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn priority_label(priority: Priority) -> ColoredString {
    match priority {
        Priority::High => "high".red().bold(),
        Priority::Medium => "medium".yellow(),
        Priority::Low => "low".green(),
    }
}

fn print_tasks(tasks: &[&Task], today: NaiveDate) {
    if tasks.is_empty() {
        println!("{}", "No tasks".dimmed());
        return;
    }
    for task in tasks {
        print_task_line(task, today);
    }
}

fn print_task_line(task: &Task, today: NaiveDate) {
    let check = if task.completed { "[x]".green() } else { "[ ]".normal() };
    let title = if task.completed {
        task.title.dimmed().strikethrough()
    } else {
        task.title.normal()
    };

    let mut line = format!(
        "{} {} {} ({}, {})",
        check,
        short_id(&task.id).cyan(),
        title,
        priority_label(task.priority),
        task.category
    );
    if let Some(due) = task.due_date {
        let due = format!("due {}", due);
        let due = if task.is_overdue(today) { due.red() } else { due.normal() };
        line.push_str(&format!(" {}", due));
    }
    if !task.tags.is_empty() {
        let tags: Vec<String> = task.tags.iter().map(|t| format!("#{}", t)).collect();
        line.push_str(&format!(" {}", tags.join(" ").blue()));
    }
    println!("{}", line);
}

fn print_task_detail(task: &Task, today: NaiveDate) {
    println!("{} {}", "Title:".bold(), task.title);
    println!("{} {}", "ID:".bold(), task.id);
    if !task.description.is_empty() {
        println!("{} {}", "Description:".bold(), task.description);
    }
    let status = if task.completed {
        "completed".green()
    } else if task.is_overdue(today) {
        "overdue".red()
    } else {
        "active".yellow()
    };
    println!("{} {}", "Status:".bold(), status);
    println!("{} {}", "Priority:".bold(), priority_label(task.priority));
    println!("{} {}", "Category:".bold(), task.category);
    if let Some(due) = task.due_date {
        println!("{} {}", "Due:".bold(), due);
    }
    if !task.tags.is_empty() {
        println!("{} {}", "Tags:".bold(), task.tags.join(", "));
    }
    println!("{} {}", "Created:".bold(), task.created_at.format("%Y-%m-%d %H:%M"));
    println!("{} {}", "Updated:".bold(), task.updated_at.format("%Y-%m-%d %H:%M"));
}

fn print_stats(stats: &TodoStats) {
    println!("{:<12} {}", "Total".bold(), stats.total);
    println!("{:<12} {}", "Completed".bold(), stats.completed.to_string().green());
    println!("{:<12} {}", "Active".bold(), stats.active.to_string().yellow());
    println!("{:<12} {}", "Overdue".bold(), stats.overdue.to_string().red());
    println!("{:<12} {}%", "Progress".bold(), stats.rounded_rate());
}

fn describe_filters(store: &TaskStore) -> String {
    let criteria = store.filter_criteria();
    if criteria.is_default() {
        return "no filters".to_string();
    }

    let mut parts = Vec::new();
    if criteria.status != StatusFilter::All {
        parts.push(format!("status={}", criteria.status));
    }
    if criteria.priority != PriorityFilter::All {
        parts.push(format!("priority={}", criteria.priority));
    }
    if criteria.category != CategoryFilter::All {
        parts.push(format!("category={}", criteria.category));
    }
    if !criteria.search_query.is_empty() {
        parts.push(format!("search={:?}", criteria.search_query));
    }
    if !criteria.tags.is_empty() {
        parts.push(format!("tags={}", criteria.tags.join("|")));
    }
    if criteria.date_range != DateRange::All {
        parts.push(format!("due={}", criteria.date_range));
    }
    parts.join(" ")
}
