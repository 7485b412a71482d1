use anyhow::Context;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::config::Config;
use crate::error::{PipelineError, Result};
use crate::http_client::http_client;

/// A league as returned by the `leagues` search.
#[derive(Debug, Clone)]
pub struct LeagueEntry {
    pub id: u64,
}

/// A team as returned by the `teams` search.
#[derive(Debug, Clone)]
pub struct TeamEntry {
    pub id: u64,
    pub name: String,
    pub venue: Option<String>,
}

/// One player's season, reduced to what the tables need. `entries` keeps the
/// api's order; the first entry is the player's current engagement.
#[derive(Debug, Clone)]
pub struct PlayerSeason {
    pub name: String,
    pub entries: Vec<PlayerSeasonEntry>,
}

#[derive(Debug, Clone)]
pub struct PlayerSeasonEntry {
    pub team_id: Option<u64>,
    pub goals: Option<u32>,
    pub yellow_cards: Option<u32>,
}

/// Season record from `teams/statistics`.
#[derive(Debug, Clone)]
pub struct TeamSeasonStats {
    pub name: String,
    pub form: String,
    pub wins: u32,
    pub loses: u32,
    pub draws: u32,
}

/// One row of the `players/topscorers` ranking, upstream order preserved.
#[derive(Debug, Clone)]
pub struct ScorerEntry {
    pub player_id: u64,
    pub name: String,
    pub age: Option<u32>,
    pub nationality: Option<String>,
    pub team_id: u64,
    pub goals: u32,
}

/// The stats lookups the aggregator runs against. Implemented by [`StatsClient`]
/// over the wire and by in-memory fakes in tests.
pub trait StatsProvider {
    fn find_teams(&self, name: &str) -> Result<Vec<TeamEntry>>;
    fn squad_players(&self, team_id: u64, season: u16) -> Result<Vec<PlayerSeason>>;
    fn team_season_stats(
        &self,
        team_id: u64,
        league_id: u64,
        season: u16,
    ) -> Result<TeamSeasonStats>;
    fn league_top_scorers(&self, league_id: u64, season: u16) -> Result<Vec<ScorerEntry>>;
}

/// Thin wrapper over the hosted stats api: one GET per lookup, everything
/// unwrapped from the JSON envelope's `response` field.
pub struct StatsClient {
    host: String,
    key: String,
    client: &'static Client,
}

impl StatsClient {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        let key = config
            .api_key
            .clone()
            .context("STATS_API_KEY is not set")?;
        Ok(Self {
            host: config.api_host.clone(),
            key,
            client: http_client()?,
        })
    }

    /// Issue a GET for `/v3/{resource}{query}` and return the envelope's
    /// `response` field. `params` are encoded in slice order.
    pub fn request(&self, resource: &str, params: &[(&str, String)]) -> Result<Value> {
        let url = format!(
            "https://{}/v3/{}{}",
            self.host,
            resource,
            query_path(params)
        );
        let resp = self
            .client
            .get(&url)
            .header("x-rapidapi-host", &self.host)
            .header("x-rapidapi-key", &self.key)
            .send()
            .map_err(|source| PipelineError::Transport {
                url: url.clone(),
                source,
            })?;
        let status = resp.status();
        if !status.is_success() {
            return Err(PipelineError::UnexpectedStatus { url, status });
        }
        let body = resp.text().map_err(|source| PipelineError::Transport {
            url: url.clone(),
            source,
        })?;
        let envelope: Value = serde_json::from_str(&body).map_err(|err| PipelineError::Parse {
            what: url.clone(),
            reason: err.to_string(),
        })?;
        envelope
            .get("response")
            .cloned()
            .ok_or_else(|| PipelineError::Parse {
                what: url,
                reason: "missing response field".to_string(),
            })
    }

    /// Resolve a league id by country and league name.
    pub fn find_league(&self, country: &str, name: &str) -> Result<Vec<LeagueEntry>> {
        let response = self.request(
            "leagues",
            &[
                ("country", country.to_string()),
                ("name", escape_spaces(name)),
            ],
        )?;
        let leagues = parse_league_search(response)?;
        debug!(count = leagues.len(), country, name, "league search");
        Ok(leagues)
    }
}

impl StatsProvider for StatsClient {
    fn find_teams(&self, name: &str) -> Result<Vec<TeamEntry>> {
        let response = self.request("teams", &[("name", escape_spaces(name))])?;
        let teams = parse_team_search(response)?;
        debug!(count = teams.len(), name, "team search");
        Ok(teams)
    }

    fn squad_players(&self, team_id: u64, season: u16) -> Result<Vec<PlayerSeason>> {
        let response = self.request(
            "players",
            &[("team", team_id.to_string()), ("season", season.to_string())],
        )?;
        let players = parse_squad_players(response)?;
        debug!(count = players.len(), team_id, "squad players");
        Ok(players)
    }

    fn team_season_stats(
        &self,
        team_id: u64,
        league_id: u64,
        season: u16,
    ) -> Result<TeamSeasonStats> {
        let response = self.request(
            "teams/statistics",
            &[
                ("season", season.to_string()),
                ("team", team_id.to_string()),
                ("league", league_id.to_string()),
            ],
        )?;
        parse_team_season_stats(response)
    }

    fn league_top_scorers(&self, league_id: u64, season: u16) -> Result<Vec<ScorerEntry>> {
        let response = self.request(
            "players/topscorers",
            &[
                ("season", season.to_string()),
                ("league", league_id.to_string()),
            ],
        )?;
        let scorers = parse_top_scorers(response)?;
        debug!(count = scorers.len(), league_id, "top scorers");
        Ok(scorers)
    }
}

/// `?k=v&k=v` in slice order; empty slice encodes to nothing.
pub fn query_path(params: &[(&str, String)]) -> String {
    if params.is_empty() {
        return String::new();
    }
    let pairs: Vec<String> = params.iter().map(|(k, v)| format!("{k}={v}")).collect();
    format!("?{}", pairs.join("&"))
}

/// The api rejects raw spaces in name filters.
pub fn escape_spaces(name: &str) -> String {
    name.replace(' ', "%20")
}

/// Best scorer of a squad: goals taken from each player's first season entry
/// with missing totals counted as 0; on equal goals the earlier player wins.
/// `None` only for an empty squad.
pub fn top_scorer(players: &[PlayerSeason]) -> Option<(String, u32)> {
    let mut best: Option<(&PlayerSeason, u32)> = None;
    for player in players {
        let goals = player.entries.first().and_then(|e| e.goals).unwrap_or(0);
        match best {
            Some((_, top)) if goals <= top => {}
            _ => best = Some((player, goals)),
        }
    }
    best.map(|(player, goals)| (player.name.clone(), goals))
}

/// Yellow cards a team collected over the season: every entry of every player
/// is considered, only entries for `team_id` count, missing counts are 0.
pub fn yellow_cards(players: &[PlayerSeason], team_id: u64) -> u32 {
    players
        .iter()
        .flat_map(|p| p.entries.iter())
        .filter(|e| e.team_id == Some(team_id))
        .map(|e| e.yellow_cards.unwrap_or(0))
        .sum()
}

#[derive(Debug, Deserialize)]
struct LeagueWrap {
    league: LeagueInfo,
}

#[derive(Debug, Deserialize)]
struct LeagueInfo {
    id: u64,
}

#[derive(Debug, Deserialize)]
struct TeamWrap {
    team: TeamInfo,
    #[serde(default)]
    venue: Option<VenueInfo>,
}

#[derive(Debug, Deserialize)]
struct TeamInfo {
    id: u64,
    name: String,
}

#[derive(Debug, Deserialize)]
struct VenueInfo {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PlayerWrap {
    player: PlayerInfo,
    #[serde(default)]
    statistics: Vec<StatBlock>,
}

#[derive(Debug, Deserialize)]
struct PlayerInfo {
    #[serde(default)]
    id: Option<u64>,
    name: String,
    #[serde(default)]
    age: Option<u32>,
    #[serde(default)]
    nationality: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatBlock {
    #[serde(default)]
    team: Option<TeamRef>,
    #[serde(default)]
    goals: Option<GoalBlock>,
    #[serde(default)]
    cards: Option<CardBlock>,
}

#[derive(Debug, Deserialize)]
struct TeamRef {
    #[serde(default)]
    id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct GoalBlock {
    #[serde(default)]
    total: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CardBlock {
    #[serde(default)]
    yellow: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct TeamStatsWrap {
    team: TeamInfo,
    form: String,
    fixtures: FixtureTotals,
}

#[derive(Debug, Deserialize)]
struct FixtureTotals {
    wins: TotalCount,
    draws: TotalCount,
    loses: TotalCount,
}

#[derive(Debug, Deserialize)]
struct TotalCount {
    total: u32,
}

pub fn parse_league_search(response: Value) -> Result<Vec<LeagueEntry>> {
    let wraps: Vec<LeagueWrap> =
        serde_json::from_value(response).map_err(|e| bad_payload("leagues response", e))?;
    Ok(wraps
        .into_iter()
        .map(|w| LeagueEntry { id: w.league.id })
        .collect())
}

pub fn parse_team_search(response: Value) -> Result<Vec<TeamEntry>> {
    let wraps: Vec<TeamWrap> =
        serde_json::from_value(response).map_err(|e| bad_payload("teams response", e))?;
    Ok(wraps
        .into_iter()
        .map(|w| TeamEntry {
            id: w.team.id,
            name: w.team.name,
            venue: w.venue.and_then(|v| v.name),
        })
        .collect())
}

pub fn parse_squad_players(response: Value) -> Result<Vec<PlayerSeason>> {
    let wraps: Vec<PlayerWrap> =
        serde_json::from_value(response).map_err(|e| bad_payload("players response", e))?;
    Ok(wraps
        .into_iter()
        .map(|w| PlayerSeason {
            name: w.player.name,
            entries: w
                .statistics
                .into_iter()
                .map(|s| PlayerSeasonEntry {
                    team_id: s.team.and_then(|t| t.id),
                    goals: s.goals.and_then(|g| g.total),
                    yellow_cards: s.cards.and_then(|c| c.yellow),
                })
                .collect(),
        })
        .collect())
}

pub fn parse_team_season_stats(response: Value) -> Result<TeamSeasonStats> {
    let wrap: TeamStatsWrap = serde_json::from_value(response)
        .map_err(|e| bad_payload("teams/statistics response", e))?;
    Ok(TeamSeasonStats {
        name: wrap.team.name,
        form: wrap.form,
        wins: wrap.fixtures.wins.total,
        loses: wrap.fixtures.loses.total,
        draws: wrap.fixtures.draws.total,
    })
}

pub fn parse_top_scorers(response: Value) -> Result<Vec<ScorerEntry>> {
    let wraps: Vec<PlayerWrap> =
        serde_json::from_value(response).map_err(|e| bad_payload("topscorers response", e))?;
    wraps
        .into_iter()
        .map(|w| {
            let first = w
                .statistics
                .into_iter()
                .next()
                .ok_or_else(|| bad_payload("topscorers response", "scorer without statistics"))?;
            Ok(ScorerEntry {
                player_id: w
                    .player
                    .id
                    .ok_or_else(|| bad_payload("topscorers response", "scorer without id"))?,
                name: w.player.name,
                age: w.player.age,
                nationality: w.player.nationality,
                team_id: first
                    .team
                    .and_then(|t| t.id)
                    .ok_or_else(|| bad_payload("topscorers response", "scorer without team"))?,
                goals: first.goals.and_then(|g| g.total).unwrap_or(0),
            })
        })
        .collect()
}

fn bad_payload(what: &str, reason: impl std::fmt::Display) -> PipelineError {
    PipelineError::Parse {
        what: what.to_string(),
        reason: reason.to_string(),
    }
}
