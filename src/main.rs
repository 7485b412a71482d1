use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use matchday_report::aggregate::{self, Aggregator};
use matchday_report::config::Config;
use matchday_report::error::PipelineError;
use matchday_report::fixture_scrape::{FixtureScraper, HttpPageFetcher};
use matchday_report::stats_client::StatsClient;
use matchday_report::warehouse::Warehouse;

/// Scrape the configured league's upcoming fixtures, enrich them against the
/// stats api and load the three report tables into the warehouse.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;
    let league_name = config.league_name()?.to_string();

    let stats = StatsClient::new(&config)?;
    let league_id = stats
        .find_league(&config.country, &league_name)?
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::LookupMiss {
            what: format!("league {league_name} in {}", config.country),
        })?
        .id;
    info!(league_id, country = %config.country, %league_name, "resolved league");

    let scraper = FixtureScraper::new(HttpPageFetcher::new()?, config.fixture_base_url.clone());
    let aggregator = Aggregator::new(&stats, &scraper, &config);

    let matches = aggregator.build_fixture_table(&config.country, &league_name, league_id)?;
    let team_ids = aggregate::collect_team_ids(&matches);
    let teams = aggregator.build_team_stats_table(&team_ids, league_id)?;
    let scorers = aggregator.build_top_scorers_table(league_id)?;

    let mut warehouse = Warehouse::open(&config.warehouse_db)?;
    warehouse.load("future_matches", &aggregate::future_matches_table(&matches))?;
    warehouse.load("teams_stats", &aggregate::team_stats_table(&teams))?;
    warehouse.load("top_scorers", &aggregate::top_scorers_table(&scorers))?;

    println!("Ingest complete");
    println!("DB: {}", config.warehouse_db.display());
    println!("future_matches: {} rows", matches.len());
    println!("teams_stats: {} rows", teams.len());
    println!("top_scorers: {} rows", scorers.len());
    Ok(())
}
