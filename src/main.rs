mod config;
mod db;
mod error;
mod models;
mod operations;
mod prompt;
mod tracker;

use anyhow::{Context, Result, anyhow};
use clap::{Args, Parser, Subcommand};
use config::Config;
use db::kv_store::SqliteStore;
use db::repository::ExpenseRepository;
use operations::add::ExpenseForm;
use operations::export::DirectorySink;
use operations::view::{DerivedView, format_with_currency, validate_month};
use prompt::StdinPrompter;
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;
use tracker::Tracker;

#[derive(Parser, Debug)]
#[command(name = "expenses", version, about = "Record and review personal expenses")]
struct Cli {
    /// SQLite file holding the saved expenses
    #[arg(long, global = true)]
    db: Option<String>,

    /// Comma separated category labels; the first one is the default
    #[arg(long, global = true)]
    categories: Option<String>,

    /// Suffix printed after amounts
    #[arg(long, global = true)]
    currency: Option<String>,

    #[command(subcommand)]
    command: UserCommands,
}

#[derive(Args, Debug)]
struct FilterArgs {
    /// Only expenses dated in this month (YYYY-MM)
    #[arg(long)]
    month: Option<String>,

    /// Case-insensitive text matched against description and category
    #[arg(long)]
    search: Option<String>,
}

#[derive(Subcommand, Debug)]
enum UserCommands {
    /// Add a new expense
    Add {
        #[arg(long, short = 'D')]
        description: String,
        #[arg(long, short)]
        amount: String,
        /// YYYY-MM-DD
        #[arg(long, short)]
        date: String,
        #[arg(long, short)]
        category: Option<String>,
    },
    /// Print the expense history
    List {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print total, count and average
    Summary {
        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Print the months that have expenses, newest first
    Months,
    /// Print the configured categories
    Categories,
    /// Delete one expense by id
    Remove {
        id: String,
        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
    /// Delete every expense
    Clear {
        #[arg(long, short)]
        yes: bool,
    },
    /// Write the filtered expenses to expenses.csv
    Export {
        #[command(flatten)]
        filter: FilterArgs,
        /// Directory to write into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
    /// Interactive terminal view
    Browse {
        /// Directory exports are written into
        #[arg(long, default_value = ".")]
        out: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::new(cli.db, cli.categories.as_deref(), cli.currency).map_err(|e| anyhow!(e))?;
    debug!("Using database {}", config.db_path);

    let conn = db::connection::establish_connection(&config.db_path)
        .with_context(|| format!("Failed to open database '{}'", config.db_path))?;
    let repository = ExpenseRepository::open_with_key(SqliteStore::new(conn), &config.storage_key);
    let mut tracker = Tracker::new(repository, config.categories.clone());

    match cli.command {
        UserCommands::Add {
            description,
            amount,
            date,
            category,
        } => {
            let mut form = ExpenseForm::from_parts(
                tracker.categories(),
                &description,
                &amount,
                &date,
                category.as_deref(),
            )?;
            let mut prompter = StdinPrompter::new(false);
            match tracker.submit(&mut form, &mut prompter) {
                Some(expense) => println!("Expense added successfully! (id {})", expense.id),
                None => return Err(anyhow!("Expense was not added")),
            }
        }
        UserCommands::List { filter } => {
            apply_filter(&mut tracker, &filter)?;
            print_list(&tracker.view(), &config.currency);
        }
        UserCommands::Summary { filter } => {
            apply_filter(&mut tracker, &filter)?;
            print_summary(&tracker.view(), &config.currency);
        }
        UserCommands::Months => {
            for month in tracker.view().months {
                println!("{}", month);
            }
        }
        UserCommands::Categories => {
            for category in tracker.categories() {
                println!("{}", category);
            }
        }
        UserCommands::Remove { id, yes } => {
            let before = tracker.expenses().len();
            if tracker.delete(id.trim(), &mut StdinPrompter::new(yes)) {
                if tracker.expenses().len() < before {
                    println!("Expense removed successfully.");
                } else {
                    println!("No expense with ID {} was found.", id.trim());
                }
            } else {
                println!("Nothing was deleted.");
            }
        }
        UserCommands::Clear { yes } => {
            if tracker.clear_all(&mut StdinPrompter::new(yes)) {
                println!("All expenses cleared.");
            } else {
                println!("Nothing was deleted.");
            }
        }
        UserCommands::Export { filter, out } => {
            apply_filter(&mut tracker, &filter)?;
            let sink = DirectorySink::new(&out);
            if let Some(path) = tracker
                .export(&sink, &mut StdinPrompter::new(false))
                .map_err(|e| anyhow!(e))?
            {
                println!("Exported to {}", path.display());
            }
        }
        UserCommands::Browse { out } => {
            operations::browse::run_browse(&mut tracker, &config.currency, out).map_err(|e| anyhow!(e))?;
        }
    }

    Ok(())
}

fn apply_filter<S: db::kv_store::KeyValueStore>(tracker: &mut Tracker<S>, filter: &FilterArgs) -> Result<()> {
    if let Some(ref month) = filter.month {
        tracker.set_month(validate_month(month).map_err(|e| anyhow!(e))?);
    }
    if let Some(ref search) = filter.search {
        tracker.set_search(search);
    }
    Ok(())
}

fn print_summary(view: &DerivedView, currency: &str) {
    println!("Total Spent:  {}", format_with_currency(view.summary.total, currency));
    println!("Transactions: {}", view.summary.count);
    println!("Average:      {}", format_with_currency(view.summary.average, currency));
}

fn print_list(view: &DerivedView, currency: &str) {
    if let Some(empty) = view.empty_state {
        println!("{}", empty.title());
        println!("{}", empty.hint());
        return;
    }
    for expense in &view.filtered {
        println!(
            "{:<10}  {:<30}  [{}]  {:>14}  {}",
            expense.display_date(),
            expense.description,
            expense.category,
            format_with_currency(expense.amount, currency),
            expense.id
        );
    }
    println!();
    print_summary(view, currency);
}
