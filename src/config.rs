use std::collections::HashMap;
use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};

const DEFAULT_API_HOST: &str = "api-football-v1.p.rapidapi.com";
const DEFAULT_FIXTURE_BASE_URL: &str = "https://m.flashscore.com";
const DEFAULT_SEASON: u16 = 2021;
const DEFAULT_COUNTRY: &str = "Brazil";
const DEFAULT_WAREHOUSE_DB: &str = "matchday.sqlite";
const DEFAULT_REPORT_PDF: &str = "report.pdf";

/// Everything a run needs, resolved once at startup. Every knob has a default;
/// only the stats api key must come from the environment.
#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    /// Required for ingest; the report binary runs without one.
    pub api_key: Option<String>,
    pub season: u16,
    pub country: String,
    pub league_name_by_country: HashMap<String, String>,
    pub fixture_base_url: String,
    /// Accepted fixtures per run; collection stops once this many resolve.
    pub match_cap: usize,
    /// Rows the top scorers table must contain.
    pub top_scorer_count: usize,
    pub warehouse_db: PathBuf,
    pub report_pdf: PathBuf,
    pub logo_png: Option<PathBuf>,
    pub footer_png: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("STATS_API_KEY")
            .ok()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let api_host = env::var("STATS_API_HOST")
            .unwrap_or_else(|_| DEFAULT_API_HOST.to_string())
            .trim()
            .to_string();
        let season = env::var("STATS_SEASON")
            .ok()
            .and_then(|v| v.parse::<u16>().ok())
            .unwrap_or(DEFAULT_SEASON);
        let country = env::var("REPORT_COUNTRY")
            .unwrap_or_else(|_| DEFAULT_COUNTRY.to_string())
            .trim()
            .to_string();
        let fixture_base_url = env::var("FIXTURE_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_FIXTURE_BASE_URL.to_string())
            .trim()
            .trim_end_matches('/')
            .to_string();
        let match_cap = env::var("MATCH_CAP")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(3)
            .max(1);
        let top_scorer_count = env::var("TOP_SCORER_COUNT")
            .ok()
            .and_then(|v| v.parse::<usize>().ok())
            .unwrap_or(10)
            .max(1);
        let warehouse_db = env::var("WAREHOUSE_DB")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_WAREHOUSE_DB));
        let report_pdf = env::var("REPORT_PDF")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_REPORT_PDF));
        let logo_png = opt_path_env("REPORT_LOGO_PNG");
        let footer_png = opt_path_env("REPORT_FOOTER_PNG");

        Ok(Self {
            api_host,
            api_key,
            season,
            country,
            league_name_by_country: default_league_map(),
            fixture_base_url,
            match_cap,
            top_scorer_count,
            warehouse_db,
            report_pdf,
            logo_png,
            footer_png,
        })
    }

    /// League name the report covers for the configured country.
    pub fn league_name(&self) -> Result<&str> {
        self.league_name_by_country
            .get(&self.country)
            .map(String::as_str)
            .with_context(|| format!("no league configured for country {}", self.country))
    }

    /// Report heading, e.g. "Brazil: Serie A".
    pub fn report_title(&self) -> Result<String> {
        Ok(format!("{}: {}", self.country, self.league_name()?))
    }
}

fn default_league_map() -> HashMap<String, String> {
    HashMap::from([
        ("Brazil".to_string(), "Serie A".to_string()),
        ("Algeria".to_string(), "Ligue 1".to_string()),
    ])
}

fn opt_path_env(name: &str) -> Option<PathBuf> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(PathBuf::from)
}
