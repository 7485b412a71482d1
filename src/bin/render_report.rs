use anyhow::Result;
use tracing_subscriber::EnvFilter;

use matchday_report::config::Config;
use matchday_report::report_render::{
    self, FUTURE_MATCHES_QUERY, ReportAssets, TEAM_STATS_QUERY, TOP_SCORERS_QUERY,
};
use matchday_report::warehouse::Warehouse;

/// Read the three report tables back from the warehouse and compose the
/// styled single-page PDF.
fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env()?;

    let warehouse = Warehouse::open(&config.warehouse_db)?;
    let future_matches = warehouse.query(FUTURE_MATCHES_QUERY)?;
    let top_scorers = warehouse.query(TOP_SCORERS_QUERY)?;
    let team_stats = warehouse.query(TEAM_STATS_QUERY)?;

    let assets = ReportAssets {
        logo: config.logo_png.as_deref(),
        footer: config.footer_png.as_deref(),
    };
    report_render::render_report(
        &config.report_title()?,
        &future_matches,
        &top_scorers,
        &team_stats,
        &assets,
        &config.report_pdf,
    )?;

    println!("Report written to {}", config.report_pdf.display());
    Ok(())
}
