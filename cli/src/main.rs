mod client;
mod commands;
mod config;
mod gemini;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::client::BackendClient;
use crate::commands::{
    cmd_budget_delete, cmd_budget_set, cmd_budget_show, cmd_categories, cmd_chat, cmd_chat_history,
    cmd_circle_challenge, cmd_circle_create, cmd_circle_show, cmd_goal_add, cmd_goal_delete,
    cmd_goal_fund, cmd_goal_show, cmd_log, cmd_login, cmd_logout, cmd_personality, cmd_register,
    cmd_settings_set, cmd_settings_show, cmd_summary, cmd_tip, cmd_transaction_delete,
    cmd_transaction_edit, cmd_transactions, cmd_whoami,
};
use crate::config::Config;
use crate::gemini::GeminiClient;
use moneywise_core::db::Database;
use moneywise_core::storage::SqliteStore;
use moneywise_core::store::AppStore;

#[derive(Parser)]
#[command(
    name = "moneywise",
    version,
    about = "A local-first personal finance tracker with an AI companion",
    long_about = "\n\n  ███╗   ███╗ ██████╗ ███╗   ██╗███████╗██╗   ██╗██╗    ██╗██╗███████╗███████╗
  ████╗ ████║██╔═══██╗████╗  ██║██╔════╝╚██╗ ██╔╝██║    ██║██║██╔════╝██╔════╝
  ██╔████╔██║██║   ██║██╔██╗ ██║█████╗   ╚████╔╝ ██║ █╗ ██║██║███████╗█████╗
  ██║╚██╔╝██║██║   ██║██║╚██╗██║██╔══╝    ╚██╔╝  ██║███╗██║██║╚════██║██╔══╝
  ██║ ╚═╝ ██║╚██████╔╝██║ ╚████║███████╗   ██║   ╚███╔███╔╝██║███████║███████╗
  ╚═╝     ╚═╝ ╚═════╝ ╚═╝  ╚═══╝╚══════╝   ╚═╝    ╚══╝╚══╝ ╚═╝╚══════╝╚══════╝
        know where your money goes.
"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an account on the backend and log in
    Register {
        /// Display name
        name: String,
        /// Email address (your identity)
        email: String,
        /// Password (at least 6 characters)
        password: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log in to the backend
    Login {
        /// Email address
        email: String,
        /// Password
        password: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// End the session (local data stays on this device)
    Logout {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the active session
    Whoami {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Log a transaction
    Log {
        /// Amount (non-negative)
        amount: f64,
        /// What the money was for
        description: String,
        /// Category tag (e.g. Food, Transportation)
        #[arg(short, long, default_value = "Other")]
        category: String,
        /// Log as income instead of expense
        #[arg(long)]
        income: bool,
        /// How you felt: happy, stressed, bored, sad, excited, anxious
        #[arg(long)]
        emotion: Option<String>,
        /// Free-text tags (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: today)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Edit a transaction
    Edit {
        /// Transaction ID (full, or the prefix shown in the table)
        id: String,
        /// New amount
        #[arg(long)]
        amount: Option<f64>,
        /// New description
        #[arg(long)]
        description: Option<String>,
        /// New category
        #[arg(long)]
        category: Option<String>,
        /// New type: income or expense
        #[arg(long = "type")]
        kind: Option<String>,
        /// New emotion tag
        #[arg(long)]
        emotion: Option<String>,
        /// New date (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List suggested transaction categories
    Categories {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List transactions (most recent first)
    Transactions {
        /// Show at most this many
        #[arg(short, long)]
        limit: Option<usize>,
        /// Delete a transaction by ID instead of listing
        #[arg(long)]
        delete: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Manage category budgets
    Budget {
        #[command(subcommand)]
        command: BudgetCommands,
    },
    /// Manage savings goals
    Goal {
        #[command(subcommand)]
        command: GoalCommands,
    },
    /// Manage social accountability circles
    Circle {
        #[command(subcommand)]
        command: CircleCommands,
    },
    /// Talk to the AI companion
    Chat {
        /// Your message
        message: Option<String>,
        /// Show the conversation instead of sending a message
        #[arg(long)]
        history: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Get a scripted companion tip (works offline)
    Tip {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or set the companion personality
    Personality {
        /// supportive, strict, or analytical (omit to show current)
        tag: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Month overview: totals, budgets, goals, health score
    Summary {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show or change settings
    Settings {
        #[command(subcommand)]
        command: SettingsCommands,
    },
    /// Start the backend server (auth, chat history, AI proxy)
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
    },
}

#[derive(Subcommand)]
enum BudgetCommands {
    /// Set (or replace) a category budget
    Set {
        /// Category the budget applies to
        category: String,
        /// Spending limit for the period
        limit: f64,
        /// Period: weekly, monthly, yearly
        #[arg(long, default_value = "monthly")]
        period: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all budgets with recomputed spend
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a budget by ID or category
    Delete {
        /// Budget ID or category name
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum GoalCommands {
    /// Add a savings goal
    Add {
        /// Goal name
        name: String,
        /// Target amount
        target: f64,
        /// Deadline (YYYY-MM-DD)
        #[arg(long)]
        deadline: Option<String>,
        /// Category tag
        #[arg(long, default_value = "Other")]
        category: String,
        /// Priority: low, medium, high
        #[arg(long, default_value = "medium")]
        priority: String,
        /// Amount already saved
        #[arg(long, default_value = "0")]
        initial: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show all goals
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Quick-add funds to a goal
    Fund {
        /// Goal ID or name
        id: String,
        /// Amount to add
        amount: f64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a goal by ID or name
    Delete {
        /// Goal ID or name
        id: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum CircleCommands {
    /// Create a circle (you join automatically)
    Create {
        /// Circle name
        name: String,
        /// Member names to add (repeatable)
        #[arg(long = "member")]
        members: Vec<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show circles and their challenges
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a challenge to a circle
    Challenge {
        /// Circle ID or name
        circle: String,
        /// Challenge title
        title: String,
        /// What the challenge is about
        #[arg(long, default_value = "")]
        description: String,
        /// Start date (YYYY-MM-DD, default: today)
        #[arg(long)]
        start: Option<String>,
        /// End date (YYYY-MM-DD, default: today)
        #[arg(long)]
        end: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SettingsCommands {
    /// Show current settings
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Change a setting: currency, notifications, dark-mode, personality, income
    Set {
        /// Setting name
        key: String,
        /// New value
        value: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;

    match cli.command {
        Commands::Serve { port, bind } => {
            let api_key = config.gemini_api_key();
            if api_key.is_none() {
                eprintln!("Warning: GEMINI_API_KEY not set; /api/chat will answer with errors.");
            }
            let db = Database::open(&config.backend_db_path)?;
            let ai = GeminiClient::new(api_key);
            server::start_server(db, ai, port, &bind).await
        }
        // The store and gateways are synchronous; run them on a blocking
        // thread so gateway calls can drive the async HTTP client.
        command => {
            tokio::task::spawn_blocking(move || {
                let storage = SqliteStore::open(&config.store_path)?;
                let store = AppStore::open(Box::new(storage))?;
                let backend = BackendClient::new(&config.api_url);
                dispatch(command, store, &backend)
            })
            .await?
        }
    }
}

#[allow(clippy::too_many_lines)]
fn dispatch(command: Commands, mut store: AppStore, backend: &BackendClient) -> Result<()> {
    match command {
        Commands::Register {
            name,
            email,
            password,
            json,
        } => cmd_register(&mut store, backend, &name, &email, &password, json),
        Commands::Login {
            email,
            password,
            json,
        } => cmd_login(&mut store, backend, &email, &password, json),
        Commands::Logout { json } => cmd_logout(&mut store, json),
        Commands::Whoami { json } => cmd_whoami(&store, json),
        Commands::Log {
            amount,
            description,
            category,
            income,
            emotion,
            tags,
            date,
            json,
        } => cmd_log(
            &mut store,
            amount,
            &description,
            &category,
            income,
            emotion.as_deref(),
            tags,
            date,
            json,
        ),
        Commands::Edit {
            id,
            amount,
            description,
            category,
            kind,
            emotion,
            date,
            json,
        } => cmd_transaction_edit(
            &mut store,
            &id,
            amount,
            description,
            category,
            kind.as_deref(),
            emotion.as_deref(),
            date,
            json,
        ),
        Commands::Categories { json } => cmd_categories(json),
        Commands::Transactions {
            limit,
            delete,
            json,
        } => match delete {
            Some(id) => cmd_transaction_delete(&mut store, &id, json),
            None => cmd_transactions(&store, limit, json),
        },
        Commands::Budget { command } => match command {
            BudgetCommands::Set {
                category,
                limit,
                period,
                json,
            } => cmd_budget_set(&mut store, &category, limit, &period, json),
            BudgetCommands::Show { json } => cmd_budget_show(&store, json),
            BudgetCommands::Delete { id, json } => cmd_budget_delete(&mut store, &id, json),
        },
        Commands::Goal { command } => match command {
            GoalCommands::Add {
                name,
                target,
                deadline,
                category,
                priority,
                initial,
                json,
            } => cmd_goal_add(
                &mut store, &name, target, deadline, &category, &priority, initial, json,
            ),
            GoalCommands::Show { json } => cmd_goal_show(&store, json),
            GoalCommands::Fund { id, amount, json } => cmd_goal_fund(&mut store, &id, amount, json),
            GoalCommands::Delete { id, json } => cmd_goal_delete(&mut store, &id, json),
        },
        Commands::Circle { command } => match command {
            CircleCommands::Create {
                name,
                members,
                json,
            } => cmd_circle_create(&mut store, &name, members, json),
            CircleCommands::Show { json } => cmd_circle_show(&store, json),
            CircleCommands::Challenge {
                circle,
                title,
                description,
                start,
                end,
                json,
            } => cmd_circle_challenge(&mut store, &circle, &title, &description, start, end, json),
        },
        Commands::Chat {
            message,
            history,
            json,
        } => {
            if history {
                cmd_chat_history(&store, json)
            } else {
                match message {
                    Some(message) => cmd_chat(&mut store, backend, &message, json),
                    None => anyhow::bail!("Provide a message, or use --history"),
                }
            }
        }
        Commands::Tip { json } => cmd_tip(&mut store, json),
        Commands::Personality { tag, json } => cmd_personality(&mut store, tag.as_deref(), json),
        Commands::Summary { json } => cmd_summary(&store, json),
        Commands::Settings { command } => match command {
            SettingsCommands::Show { json } => cmd_settings_show(&store, json),
            SettingsCommands::Set { key, value, json } => {
                cmd_settings_set(&mut store, &key, &value, json)
            }
        },
        Commands::Serve { .. } => unreachable!("handled above"),
    }
}
