use std::path::PathBuf;

use anyhow::Context;
use clap::{ArgGroup, Parser, Subcommand};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{fmt, EnvFilter};

mod aggregate;
mod batch;
mod calendar;
mod config;
mod db;
mod error;
mod leaderboard;
mod models;
mod params;
mod report;
mod server;

use calendar::WeekStart;
use config::Config;
use leaderboard::LeaderboardQuery;

#[derive(Parser)]
#[command(name = "campus-attendance")]
#[command(about = "Attendance calendar and batch leaderboard for campus portal data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create or upgrade the database schema
    InitDb,
    /// Load realistic seed data
    Seed,
    /// Import per-subject daily attendance from a CSV file
    Import {
        #[arg(long)]
        csv: PathBuf,
    },
    /// Print a user's month calendar
    Calendar {
        #[arg(long)]
        username: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long, value_enum, default_value_t = WeekStart::Sunday)]
        week_start: WeekStart,
        /// Emit the day cells as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print a user's month totals and per-subject breakdown as JSON
    Summary {
        #[arg(long)]
        username: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
    },
    /// Rank a batch by overall attendance
    #[command(group(
        ArgGroup::new("scope")
            .args(["batch", "email"])
            .required(true)
            .multiple(false)
    ))]
    Leaderboard {
        #[arg(long)]
        batch: Option<String>,
        /// Rank the batch this institutional email belongs to
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        subject: Option<String>,
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Generate a markdown month report for a user
    Report {
        #[arg(long)]
        username: String,
        #[arg(long)]
        year: i32,
        #[arg(long)]
        month: u32,
        #[arg(long, default_value = "report.md")]
        out: PathBuf,
    },
    /// Serve the JSON API
    Serve,
}

fn resolve_batch(batch: Option<&str>, email: Option<&str>) -> anyhow::Result<String> {
    match (batch, email) {
        (Some(batch), _) => Ok(batch::validate_batch(batch)?),
        (None, Some(email)) => Ok(batch::derive_batch(email)?),
        (None, None) => anyhow::bail!("either --batch or --email is required"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();

    let cli = Cli::parse();
    let config = Config::load()?;

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to Postgres")?;

    match cli.command {
        Commands::InitDb => {
            db::init_db(&pool).await?;
            println!("Schema ready.");
        }
        Commands::Seed => {
            let written = db::seed(&pool).await?;
            println!("Seeded {written} attendance rows.");
        }
        Commands::Import { csv } => {
            let written = db::import_csv(&pool, &csv).await?;
            println!("Imported {written} attendance rows from {}.", csv.display());
        }
        Commands::Calendar {
            username,
            year,
            month,
            week_start,
            json,
        } => {
            let (start, end) = calendar::month_bounds(year, month)?;
            let user = db::fetch_user(&pool, &username)
                .await?
                .with_context(|| format!("user {username} not found"))?;
            let records = db::fetch_daily(&pool, user.id, start, end).await?;
            let cells = calendar::build_month_grid(year, month, &records, week_start)?;

            if json {
                println!("{}", serde_json::to_string_pretty(&cells)?);
                return Ok(());
            }

            println!("{} ({}) {year}-{month:02}:", user.username, user.batch);
            for cell in cells.iter().filter(|cell| cell.is_current_month) {
                let status = aggregate::day_status(cell.attendance.as_ref());
                match cell.summary.as_ref().and_then(|summary| summary.percentage) {
                    Some(pct) => println!("- {} {:?} ({pct:.1}%)", cell.date, status),
                    None => println!("- {} {:?}", cell.date, status),
                }
            }
        }
        Commands::Summary {
            username,
            year,
            month,
        } => {
            let (start, end) = calendar::month_bounds(year, month)?;
            let user = db::fetch_user(&pool, &username)
                .await?
                .with_context(|| format!("user {username} not found"))?;
            let records = db::fetch_daily(&pool, user.id, start, end).await?;
            let summary = aggregate::summarize_month(year, month, &records);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Leaderboard {
            batch,
            email,
            subject,
            limit,
        } => {
            let query = LeaderboardQuery {
                batch: resolve_batch(batch.as_deref(), email.as_deref())?,
                subject,
                limit,
            };
            let members = db::fetch_batch_members(&pool, &query.batch).await?;
            let ranked = leaderboard::rank(members, &query);

            if ranked.is_empty() {
                println!("No users with attendance found for batch {}.", query.batch);
                return Ok(());
            }

            println!("Batch {} by overall attendance:", query.batch);
            for entry in &ranked {
                println!(
                    "{:>3}. {} {:.1}%",
                    entry.rank, entry.user.username, entry.user.overall_percentage
                );
            }
        }
        Commands::Report {
            username,
            year,
            month,
            out,
        } => {
            let (start, end) = calendar::month_bounds(year, month)?;
            let user = db::fetch_user(&pool, &username)
                .await?
                .with_context(|| format!("user {username} not found"))?;
            let records = db::fetch_daily(&pool, user.id, start, end).await?;
            let summary = aggregate::summarize_month(year, month, &records);
            let cells = calendar::build_month_grid(year, month, &records, WeekStart::Sunday)?;
            let report = report::build_report(&user.username, &summary, &cells);
            std::fs::write(&out, report)?;
            println!("Report written to {}.", out.display());
        }
        Commands::Serve => {
            server::serve(pool, config.port).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("campus-attendance").chain(args.iter().copied()))
    }

    #[test]
    fn leaderboard_takes_batch_or_email() {
        assert!(parse(&["leaderboard", "--batch", "2023UGCS"]).is_ok());
        assert!(parse(&["leaderboard", "--email", "2023ugcs041@nitjsr.ac.in"]).is_ok());
        assert!(parse(&["leaderboard"]).is_err());
        assert!(parse(&[
            "leaderboard",
            "--batch",
            "2023UGCS",
            "--email",
            "2023ugcs041@nitjsr.ac.in"
        ])
        .is_err());
    }

    #[test]
    fn resolves_batch_from_either_source() {
        assert_eq!(resolve_batch(Some("2023ugcs"), None).unwrap(), "2023UGCS");
        assert_eq!(
            resolve_batch(None, Some("2023ugcs041@nitjsr.ac.in")).unwrap(),
            "2023UGCS"
        );
        assert!(resolve_batch(None, None).is_err());
        assert!(resolve_batch(None, Some("12345@nitjsr.ac.in")).is_err());
    }

    #[test]
    fn calendar_week_start_defaults_to_sunday() {
        let cli = parse(&[
            "calendar",
            "--username",
            "2023UGCS041",
            "--year",
            "2026",
            "--month",
            "2",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Calendar {
                week_start: WeekStart::Sunday,
                ..
            }
        ));
    }
}
