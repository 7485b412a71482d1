use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::fixture_scrape::{FixtureSource, RawFixture};
use crate::stats_client::{self, StatsProvider, TeamEntry};
use crate::warehouse::{Cell, Table};

/// One row of the `future_matches` table.
#[derive(Debug, Clone)]
pub struct FutureMatch {
    pub team_1: String,
    pub team_2: String,
    pub match_start_datetime: String,
    pub stadium: Option<String>,
    pub team_1_id: u64,
    pub team_1_top_scorer_name: String,
    pub team_1_top_scorer_goals: u32,
    pub team_1_yellow_cards: u32,
    pub team_2_id: u64,
    pub team_2_top_scorer_name: String,
    pub team_2_top_scorer_goals: u32,
    pub team_2_yellow_cards: u32,
    pub league_id: u64,
}

/// One row of the `teams_stats` table.
#[derive(Debug, Clone)]
pub struct TeamStats {
    pub id: u64,
    pub name: String,
    pub form: String,
    pub wins: u32,
    pub loses: u32,
    pub draws: u32,
}

/// One row of the `top_scorers` table.
#[derive(Debug, Clone)]
pub struct TopScorer {
    pub id: u64,
    pub name: String,
    pub age: Option<u32>,
    pub nationality: Option<String>,
    pub team_id: u64,
    pub goals: u32,
}

/// Joins scraped fixtures with stats lookups into the three report tables.
pub struct Aggregator<'a, S, F> {
    stats: &'a S,
    fixtures: &'a F,
    season: u16,
    match_cap: usize,
    top_scorer_count: usize,
}

impl<'a, S: StatsProvider, F: FixtureSource> Aggregator<'a, S, F> {
    pub fn new(stats: &'a S, fixtures: &'a F, config: &Config) -> Self {
        Self {
            stats,
            fixtures,
            season: config.season,
            match_cap: config.match_cap,
            top_scorer_count: config.top_scorer_count,
        }
    }

    /// Scrape the league's fixture block and enrich the first `match_cap`
    /// fixtures whose teams the stats api knows about.
    ///
    /// A team search coming back empty is a coverage gap of the api tier, so
    /// the fixture is skipped and collection moves on; transport and parse
    /// failures abort the whole build.
    pub fn build_fixture_table(
        &self,
        country: &str,
        league_name: &str,
        league_id: u64,
    ) -> Result<Vec<FutureMatch>> {
        let raw = self.fixtures.upcoming(country, league_name)?;
        if raw.is_empty() {
            return Ok(Vec::new());
        }

        let mut accepted = Vec::new();
        for fixture in raw {
            if self.stats.find_teams(&fixture.home)?.is_empty()
                || self.stats.find_teams(&fixture.away)?.is_empty()
            {
                debug!(home = %fixture.home, away = %fixture.away, "skipping uncovered fixture");
                continue;
            }
            accepted.push(fixture);
            if accepted.len() == self.match_cap {
                break;
            }
        }

        let mut table = Vec::with_capacity(accepted.len());
        for fixture in accepted {
            table.push(self.enrich_fixture(fixture, league_id)?);
        }
        Ok(table)
    }

    /// Season statistics for every id, input order and duplicates preserved.
    /// Any id without a season record fails the whole call.
    pub fn build_team_stats_table(&self, team_ids: &[u64], league_id: u64) -> Result<Vec<TeamStats>> {
        team_ids
            .iter()
            .map(|&id| {
                let stats = self.stats.team_season_stats(id, league_id, self.season)?;
                Ok(TeamStats {
                    id,
                    name: stats.name,
                    form: stats.form,
                    wins: stats.wins,
                    loses: stats.loses,
                    draws: stats.draws,
                })
            })
            .collect()
    }

    /// First `top_scorer_count` entries of the league ranking, upstream order
    /// kept. A shorter ranking is an error, never a silent truncation.
    pub fn build_top_scorers_table(&self, league_id: u64) -> Result<Vec<TopScorer>> {
        let scorers = self.stats.league_top_scorers(league_id, self.season)?;
        if scorers.len() < self.top_scorer_count {
            return Err(PipelineError::ShortResponse {
                wanted: self.top_scorer_count,
                available: scorers.len(),
            });
        }
        Ok(scorers
            .into_iter()
            .take(self.top_scorer_count)
            .map(|s| TopScorer {
                id: s.player_id,
                name: s.name,
                age: s.age,
                nationality: s.nationality,
                team_id: s.team_id,
                goals: s.goals,
            })
            .collect())
    }

    fn enrich_fixture(&self, fixture: RawFixture, league_id: u64) -> Result<FutureMatch> {
        let home = self.resolve_team(&fixture.home)?;
        let away = self.resolve_team(&fixture.away)?;
        if home.id == away.id {
            warn!(fixture = %fixture.home, "both sides resolve to the same team id");
        }

        let (home_scorer, home_goals, home_yellow) = self.season_summary(&home)?;
        let (away_scorer, away_goals, away_yellow) = self.season_summary(&away)?;

        Ok(FutureMatch {
            team_1: fixture.home,
            team_2: fixture.away,
            match_start_datetime: fixture.kickoff,
            stadium: home.venue,
            team_1_id: home.id,
            team_1_top_scorer_name: home_scorer,
            team_1_top_scorer_goals: home_goals,
            team_1_yellow_cards: home_yellow,
            team_2_id: away.id,
            team_2_top_scorer_name: away_scorer,
            team_2_top_scorer_goals: away_goals,
            team_2_yellow_cards: away_yellow,
            league_id,
        })
    }

    /// During enrichment a vanished team is fatal, unlike during collection.
    fn resolve_team(&self, name: &str) -> Result<TeamEntry> {
        self.stats
            .find_teams(name)?
            .into_iter()
            .next()
            .ok_or_else(|| PipelineError::LookupMiss {
                what: format!("team {name}"),
            })
    }

    fn season_summary(&self, team: &TeamEntry) -> Result<(String, u32, u32)> {
        let players = self.stats.squad_players(team.id, self.season)?;
        let (scorer, goals) =
            stats_client::top_scorer(&players).ok_or_else(|| PipelineError::LookupMiss {
                what: format!("squad of team {}", team.name),
            })?;
        let cards = stats_client::yellow_cards(&players, team.id);
        Ok((scorer, goals, cards))
    }
}

/// Team ids feeding the stats table: every home id first, then every away id.
pub fn collect_team_ids(matches: &[FutureMatch]) -> Vec<u64> {
    let mut ids: Vec<u64> = matches.iter().map(|m| m.team_1_id).collect();
    ids.extend(matches.iter().map(|m| m.team_2_id));
    ids
}

pub fn future_matches_table(rows: &[FutureMatch]) -> Table {
    let mut table = Table::new(&[
        "team_1",
        "team_2",
        "match_start_datetime",
        "stadium",
        "team_1_id",
        "team_1_top_scorer_name",
        "team_1_top_scorer_goals",
        "team_1_yellow_cards",
        "team_2_id",
        "team_2_top_scorer_name",
        "team_2_top_scorer_goals",
        "team_2_yellow_cards",
        "league_id",
    ]);
    for row in rows {
        table.push(vec![
            Cell::from(row.team_1.as_str()),
            Cell::from(row.team_2.as_str()),
            Cell::from(row.match_start_datetime.as_str()),
            Cell::from(row.stadium.as_deref()),
            Cell::from(row.team_1_id),
            Cell::from(row.team_1_top_scorer_name.as_str()),
            Cell::from(row.team_1_top_scorer_goals),
            Cell::from(row.team_1_yellow_cards),
            Cell::from(row.team_2_id),
            Cell::from(row.team_2_top_scorer_name.as_str()),
            Cell::from(row.team_2_top_scorer_goals),
            Cell::from(row.team_2_yellow_cards),
            Cell::from(row.league_id),
        ]);
    }
    table
}

pub fn team_stats_table(rows: &[TeamStats]) -> Table {
    let mut table = Table::new(&["id", "name", "form", "wins", "loses", "draws"]);
    for row in rows {
        table.push(vec![
            Cell::from(row.id),
            Cell::from(row.name.as_str()),
            Cell::from(row.form.as_str()),
            Cell::from(row.wins),
            Cell::from(row.loses),
            Cell::from(row.draws),
        ]);
    }
    table
}

pub fn top_scorers_table(rows: &[TopScorer]) -> Table {
    let mut table = Table::new(&["id", "name", "age", "nationality", "team_id", "goals"]);
    for row in rows {
        table.push(vec![
            Cell::from(row.id),
            Cell::from(row.name.as_str()),
            Cell::from(row.age),
            Cell::from(row.nationality.as_deref()),
            Cell::from(row.team_id),
            Cell::from(row.goals),
        ]);
    }
    table
}
