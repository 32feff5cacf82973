use std::path::PathBuf;

use anyhow::Context;
use chrono::{Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod import;
mod models;
mod scales;
mod session;
mod store;

use config::Secrets;
use db::{RPE_COLLECTION, WELLNESS_COLLECTION};
use import::ImportKind;
use models::{PlayerId, RpeForm, WellnessForm};
use store::{Connector, MongoConnector};

#[derive(Parser)]
#[command(name = "wellness-registry")]
#[command(about = "Record player wellness and post-training RPE for coaching staff", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the player ids on the roster
    Roster {
        #[arg(long)]
        json: bool,
    },
    /// Submit a pre-training wellness check
    Wellness {
        #[arg(long)]
        player: String,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// 1 (a bit sick) to 5 (buzzing)
        #[arg(long)]
        feeling: i64,
        /// Hours slept last night, 0 to 12 in steps of 0.5
        #[arg(long)]
        sleep_hours: f64,
    },
    /// Submit a post-training RPE score
    Rpe {
        #[arg(long)]
        player: String,
        /// Session date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<NaiveDate>,
        /// BORG scale rating, 1 to 10
        #[arg(long)]
        rpe: i64,
        /// Training minutes, 0 to 120
        #[arg(long)]
        minutes: i64,
        #[arg(long)]
        individual: bool,
    },
    /// Import wellness or RPE entries from a CSV file
    Import {
        #[arg(long, value_enum)]
        kind: ImportKind,
        #[arg(long)]
        csv: PathBuf,
    },
    /// Show the feeling and BORG RPE scales
    Scales,
    /// Print the session id for a player and date
    SessionId {
        #[arg(long)]
        player: String,
        #[arg(long)]
        date: Option<NaiveDate>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "player_wellness_registry=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let today = Local::now().date_naive();
    let connector = MongoConnector::new(Secrets::from_env());

    match cli.command {
        Commands::Roster { json } => {
            let roster = db::lookup_roster(&connector).await;
            if let Some(notice) = roster.notice() {
                eprintln!("{notice}");
            }
            if json {
                println!("{}", serde_json::to_string(&roster.player_ids)?);
            } else {
                for player_id in &roster.player_ids {
                    println!("{player_id}");
                }
            }
            if !roster.is_available() {
                anyhow::bail!("player roster is unavailable");
            }
        }
        Commands::Wellness {
            player,
            date,
            feeling,
            sleep_hours,
        } => {
            let entry = WellnessForm {
                player_id: player,
                date: date.unwrap_or(today),
                feeling,
                sleep_hours,
                submission_id: None,
            }
            .validate(today, Utc::now())?;

            let roster = require_roster(&connector).await?;
            entry.player_id.ensure_listed(&roster)?;

            let acknowledged = db::insert(&connector, WELLNESS_COLLECTION, entry.to_document())
                .await
                .context("pre-training entry was not saved")?;
            report_write(acknowledged, "Pre-training data");
            if acknowledged {
                println!(
                    "Session {}: feeling {} ({}), {} hours of sleep.",
                    entry.session_id,
                    entry.feeling,
                    scales::feeling_label(entry.feeling.into()).unwrap_or("unrated"),
                    entry.sleep_hours
                );
            }
        }
        Commands::Rpe {
            player,
            date,
            rpe,
            minutes,
            individual,
        } => {
            let entry = RpeForm {
                player_id: player,
                date: date.unwrap_or(today),
                rpe_score: rpe,
                training_minutes: minutes,
                individual_session: individual,
                submission_id: None,
            }
            .validate(today, Utc::now())?;

            let roster = require_roster(&connector).await?;
            entry.player_id.ensure_listed(&roster)?;

            let acknowledged = db::insert(&connector, RPE_COLLECTION, entry.to_document())
                .await
                .context("RPE entry was not saved")?;
            report_write(acknowledged, "RPE data");
            if acknowledged {
                println!(
                    "Session {}: RPE {} ({}) over {} minutes.",
                    entry.session_id,
                    entry.rpe_score,
                    scales::borg_label(entry.rpe_score.into()).unwrap_or("unrated"),
                    entry.training_minutes
                );
            }
        }
        Commands::Import { kind, csv } => {
            let roster = require_roster(&connector).await?;
            let summary = import::import_csv(&connector, kind, &csv, &roster, today).await?;
            println!(
                "Inserted {} entries from {} ({} already recorded, {} unconfirmed).",
                summary.inserted,
                csv.display(),
                summary.skipped_duplicates,
                summary.unconfirmed
            );
        }
        Commands::Scales => {
            print!("{}", scales::render_scales());
        }
        Commands::SessionId { player, date } => {
            let player_id = PlayerId::parse(&player)?;
            println!(
                "{}",
                session::derive_session_id(date.unwrap_or(today), player_id.as_str())
            );
        }
    }

    Ok(())
}

/// Submissions need a readable roster to check the player against.
async fn require_roster(connector: &dyn Connector) -> anyhow::Result<Vec<String>> {
    let roster = db::lookup_roster(connector).await;
    if !roster.is_available() {
        if let Some(notice) = roster.notice() {
            eprintln!("{notice}");
        }
        anyhow::bail!("player roster is unavailable, nothing was submitted");
    }
    Ok(roster.player_ids)
}

fn report_write(acknowledged: bool, what: &str) {
    if acknowledged {
        println!("{what} submitted successfully!");
    } else {
        eprintln!("{what} was sent but the database did not confirm the write.");
    }
}
