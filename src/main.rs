use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use race_finder::aggregator::{Aggregator, SearchParams};
use race_finder::common::constants::get_supported_apis;
use race_finder::config::Config;
use race_finder::domain::{Competition, SportFilter};
use race_finder::logging;
use tracing::info;

#[derive(Parser)]
#[command(name = "race_finder")]
#[command(about = "Search upcoming running, cycling, swimming and ski competitions")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search competitions across the registration services
    Search {
        /// City name, matched as a case-insensitive substring
        #[arg(long)]
        city: Option<String>,
        /// run, swim, bike, ski, triathlon, other or all
        #[arg(long)]
        sport: Option<SportFilter>,
        /// Maximum number of competitions to print
        #[arg(long)]
        limit: Option<usize>,
        /// 1 = current month, 12 = current year, anything else = next 180 days
        #[arg(long)]
        period: Option<u32>,
        /// Single service to query (default: all)
        #[arg(long)]
        service: Option<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// List the supported services in merge priority order
    Services,
}

fn print_table(competitions: &[Competition]) {
    if competitions.is_empty() {
        println!("No competitions found");
        return;
    }

    for c in competitions {
        let date = c
            .begin_date
            .map(|d| d.format("%d.%m.%Y").to_string())
            .unwrap_or_else(|| "date TBA".to_string());
        println!(
            "{}  {:<9}  {:<13}  {}  ({})",
            date,
            c.sport_code.as_str(),
            c.service.as_str(),
            c.title,
            c.city
        );
        if !c.url.is_empty() {
            println!("            {}", c.url);
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load().context("loading race_finder.toml")?;

    match cli.command {
        Commands::Search {
            city,
            sport,
            limit,
            period,
            service,
            json,
        } => {
            let limit = limit.unwrap_or(config.search.limit);
            if limit == 0 {
                bail!("--limit must be positive");
            }

            let params = SearchParams {
                city,
                sport,
                limit,
                period_months: period.or(config.search.period_months),
                service: service.or_else(|| config.search.service.clone()),
            };
            info!(?params, "Starting search");

            let aggregator = Aggregator::new().with_config(&config.aggregator);
            let competitions = aggregator.fetch_all(&params).await;

            if json {
                println!("{}", serde_json::to_string_pretty(&competitions)?);
            } else {
                print_table(&competitions);
            }
        }
        Commands::Services => {
            for name in get_supported_apis() {
                println!("{}", name);
            }
        }
    }

    Ok(())
}
