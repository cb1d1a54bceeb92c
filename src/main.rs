use std::path::PathBuf;

use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod clock;
mod cohort;
mod config;
mod db;
mod error;
mod models;
mod report;
mod repository;
mod response;
mod stats;
mod threshold;

use clock::{Clock, FixedClock, SystemClock};
use config::{AppConfig, EngineSettings};
use db::PgStore;
use error::EngineError;
use models::NewArticle;
use repository::HistoryRepository;
use response::{ErrorResponse, EvaluationResponse, WeeklyReportResponse};

#[derive(Parser)]
#[command(name = "upload-watch")]
#[command(about = "Flags newspapers whose daily article uploads fall below their weekday norm", long_about = None)]
struct Cli {
    /// Evaluate as if today were this date (YYYY-MM-DD)
    #[arg(long, global = true)]
    as_of: Option<NaiveDate>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load sample newspapers, history and articles
    Seed,
    /// Manage newspapers
    Newspaper {
        #[command(subcommand)]
        command: NewspaperCommands,
    },
    /// Upload articles and check the day's volume
    Article {
        #[command(subcommand)]
        command: ArticleCommands,
    },
    /// Manage daily upload history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },
    /// Classify today's volume for a newspaper without uploading anything
    Evaluate {
        #[arg(long)]
        newspaper_id: i32,
        /// Weekday reference date; defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
    },
    /// Per-day article counts for the last seven days
    WeeklyReport {
        #[arg(long)]
        newspaper_id: Option<i32>,
        /// Also write a markdown report to this path
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum NewspaperCommands {
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    List,
    Show { id: i32 },
    /// Replace a newspaper's name and contact address
    Update {
        id: i32,
        #[arg(long)]
        name: String,
        #[arg(long)]
        email: String,
    },
    Delete { id: i32 },
}

#[derive(Subcommand)]
enum ArticleCommands {
    /// Store an article and classify the newspaper's volume for the day
    Create {
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        newspaper_id: i32,
        /// Upload timestamp (YYYY-MM-DDTHH:MM:SS); defaults to now
        #[arg(long)]
        uploaded_at: Option<NaiveDateTime>,
    },
    List,
    Show { id: i32 },
    /// Replace every field of an article; no volume check is run
    Update {
        id: i32,
        #[arg(long)]
        title: String,
        #[arg(long)]
        content: String,
        #[arg(long)]
        newspaper_id: i32,
        #[arg(long)]
        uploaded_at: NaiveDateTime,
    },
    Delete { id: i32 },
}

#[derive(Subcommand)]
enum HistoryCommands {
    Add {
        #[arg(long)]
        newspaper_id: i32,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        count: u32,
    },
    /// Import rows from a CSV with newspaper_id,upload_date,article_count
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    List,
    Show { id: i32 },
    Update {
        id: i32,
        #[arg(long)]
        newspaper_id: i32,
        #[arg(long)]
        date: NaiveDate,
        #[arg(long)]
        count: u32,
    },
    Delete { id: i32 },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = AppConfig::from_env()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;
    let store = PgStore::new(pool);

    let clock: Box<dyn Clock> = match cli.as_of {
        Some(date) => Box::new(FixedClock(date)),
        None => Box::new(SystemClock),
    };

    let outcome = run(cli.command, &store, clock.as_ref(), &config.engine).await;
    store.pool().close().await;
    outcome
}

async fn run(
    command: Commands,
    store: &PgStore,
    clock: &dyn Clock,
    settings: &EngineSettings,
) -> anyhow::Result<()> {
    match command {
        Commands::InitDb => {
            db::init_db(store.pool()).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            db::seed(store, clock.today()).await?;
            println!("Seed data inserted.");
        }
        Commands::Newspaper { command } => match command {
            NewspaperCommands::Add { name, email } => {
                let id = store.insert_newspaper(&name, &email).await?;
                println!("Newspaper {id} saved.");
            }
            NewspaperCommands::List => print_json(&store.list_newspapers().await?)?,
            NewspaperCommands::Show { id } => {
                or_not_found(store.get_newspaper(id).await, |n| print_json(&n))?
            }
            NewspaperCommands::Update { id, name, email } => {
                or_not_found(store.update_newspaper(id, &name, &email).await, |_| {
                    println!("Newspaper {id} updated.");
                    Ok(())
                })?
            }
            NewspaperCommands::Delete { id } => or_not_found(store.delete_newspaper(id).await, |_| {
                println!("Newspaper {id} deleted.");
                Ok(())
            })?,
        },
        Commands::Article { command } => match command {
            ArticleCommands::Create {
                title,
                content,
                newspaper_id,
                uploaded_at,
            } => {
                let uploaded_at =
                    uploaded_at.unwrap_or_else(|| clock.today().and_time(Utc::now().time()));
                let article = NewArticle {
                    title,
                    content,
                    newspaper_id,
                    uploaded_at,
                };
                let article_id = match store.insert_article(&article).await {
                    Ok(id) => id,
                    Err(err) => return or_not_found(Err::<(), _>(err), |_| Ok(())),
                };
                tracing::info!(article_id, newspaper_id, "article stored");

                let evaluated = threshold::evaluate_upload(
                    store,
                    clock,
                    settings,
                    newspaper_id,
                    uploaded_at.date(),
                )
                .await;
                or_not_found(evaluated, |outcome| {
                    print_json(&EvaluationResponse::from_outcome(&outcome, settings))
                })?;
            }
            ArticleCommands::List => print_json(&store.list_articles().await?)?,
            ArticleCommands::Show { id } => {
                or_not_found(store.get_article(id).await, |a| print_json(&a))?
            }
            ArticleCommands::Update {
                id,
                title,
                content,
                newspaper_id,
                uploaded_at,
            } => {
                let article = NewArticle {
                    title,
                    content,
                    newspaper_id,
                    uploaded_at,
                };
                or_not_found(store.update_article(id, &article).await, |_| {
                    println!("Article {id} updated.");
                    Ok(())
                })?
            }
            ArticleCommands::Delete { id } => or_not_found(store.delete_article(id).await, |_| {
                println!("Article {id} deleted.");
                Ok(())
            })?,
        },
        Commands::History { command } => match command {
            HistoryCommands::Add {
                newspaper_id,
                date,
                count,
            } => {
                let count = i32::try_from(count).context("count is too large")?;
                or_not_found(
                    store.insert_upload_history(newspaper_id, date, count).await,
                    |id| {
                        println!("Upload history {id} saved.");
                        Ok(())
                    },
                )?;
            }
            HistoryCommands::Import { csv } => {
                let inserted = db::import_csv(store, &csv).await?;
                println!("Inserted {inserted} history rows from {}.", csv.display());
            }
            HistoryCommands::List => print_json(&store.list_upload_history().await?)?,
            HistoryCommands::Show { id } => {
                or_not_found(store.get_upload_history(id).await, |h| print_json(&h))?
            }
            HistoryCommands::Update {
                id,
                newspaper_id,
                date,
                count,
            } => {
                let count = i32::try_from(count).context("count is too large")?;
                or_not_found(
                    store
                        .update_upload_history(id, newspaper_id, date, count)
                        .await,
                    |_| {
                        println!("Upload history {id} updated.");
                        Ok(())
                    },
                )?;
            }
            HistoryCommands::Delete { id } => {
                or_not_found(store.delete_upload_history(id).await, |_| {
                    println!("Upload history {id} deleted.");
                    Ok(())
                })?
            }
        },
        Commands::Evaluate { newspaper_id, date } => {
            let date = date.unwrap_or_else(|| clock.today());
            let evaluated =
                threshold::evaluate_upload(store, clock, settings, newspaper_id, date).await;
            or_not_found(evaluated, |outcome| {
                print_json(&EvaluationResponse::for_check(&outcome, settings))
            })?;
        }
        Commands::WeeklyReport { newspaper_id, out } => {
            if let Some(id) = newspaper_id {
                if !store.newspaper_exists(id).await? {
                    tracing::warn!(newspaper_id = id, "weekly report requested for unknown newspaper");
                    return print_json(&ErrorResponse::not_found("Newspaper"));
                }
            }
            let weekly = report::weekly_report(store, clock, newspaper_id).await?;
            print_json(&WeeklyReportResponse::from(&weekly))?;
            if let Some(out) = out {
                std::fs::write(&out, report::render_markdown(&weekly))
                    .with_context(|| format!("failed to write {}", out.display()))?;
                eprintln!("Report written to {}.", out.display());
            }
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Prints `{"error": "<Entity> not found"}` for missing records and hands
/// anything else to `on_ok` or up the stack.
fn or_not_found<T, F>(result: Result<T, EngineError>, on_ok: F) -> anyhow::Result<()>
where
    F: FnOnce(T) -> anyhow::Result<()>,
{
    match result {
        Ok(value) => on_ok(value),
        Err(EngineError::NotFound { entity, id }) => {
            tracing::warn!(entity, id, "record not found");
            print_json(&ErrorResponse::not_found(entity))
        }
        Err(err) => Err(err.into()),
    }
}
