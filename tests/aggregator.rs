use std::collections::HashMap;
use std::path::PathBuf;

use matchday_report::aggregate::{self, Aggregator};
use matchday_report::config::Config;
use matchday_report::error::{PipelineError, Result};
use matchday_report::fixture_scrape::{FixtureSource, RawFixture};
use matchday_report::stats_client::{
    PlayerSeason, PlayerSeasonEntry, ScorerEntry, StatsProvider, TeamEntry, TeamSeasonStats,
};

const LEAGUE_ID: u64 = 71;

fn test_config() -> Config {
    Config {
        api_host: "stats.test".to_string(),
        api_key: None,
        season: 2021,
        country: "Brazil".to_string(),
        league_name_by_country: HashMap::from([(
            "Brazil".to_string(),
            "Serie A".to_string(),
        )]),
        fixture_base_url: "https://fixtures.test".to_string(),
        match_cap: 3,
        top_scorer_count: 10,
        warehouse_db: PathBuf::from(":memory:"),
        report_pdf: PathBuf::from("report.pdf"),
        logo_png: None,
        footer_png: None,
    }
}

struct FakeFixtures {
    fixtures: Vec<RawFixture>,
}

impl FixtureSource for FakeFixtures {
    fn upcoming(&self, _country: &str, _league_name: &str) -> Result<Vec<RawFixture>> {
        Ok(self.fixtures.clone())
    }
}

#[derive(Default)]
struct FakeStats {
    teams: HashMap<String, TeamEntry>,
    squads: HashMap<u64, Vec<PlayerSeason>>,
    season_stats: HashMap<u64, TeamSeasonStats>,
    scorers: Vec<ScorerEntry>,
}

impl FakeStats {
    /// Register a covered team with a one-man squad scoring `goals`.
    fn with_team(mut self, id: u64, name: &str, goals: u32) -> Self {
        self.teams.insert(
            name.to_string(),
            TeamEntry {
                id,
                name: name.to_string(),
                venue: Some(format!("{name} Arena")),
            },
        );
        self.squads.insert(
            id,
            vec![PlayerSeason {
                name: format!("{name} Striker"),
                entries: vec![PlayerSeasonEntry {
                    team_id: Some(id),
                    goals: Some(goals),
                    yellow_cards: Some(goals),
                }],
            }],
        );
        self.season_stats.insert(
            id,
            TeamSeasonStats {
                name: name.to_string(),
                form: "WWDLW".to_string(),
                wins: goals,
                loses: 1,
                draws: 2,
            },
        );
        self
    }

    fn with_scorers(mut self, count: usize) -> Self {
        self.scorers = (0..count)
            .map(|i| ScorerEntry {
                player_id: 100 + i as u64,
                name: format!("Scorer {i}"),
                age: Some(25),
                nationality: Some("Brazil".to_string()),
                team_id: 1,
                goals: (count - i) as u32,
            })
            .collect();
        self
    }
}

impl StatsProvider for FakeStats {
    fn find_teams(&self, name: &str) -> Result<Vec<TeamEntry>> {
        Ok(self.teams.get(name).cloned().into_iter().collect())
    }

    fn squad_players(&self, team_id: u64, _season: u16) -> Result<Vec<PlayerSeason>> {
        Ok(self.squads.get(&team_id).cloned().unwrap_or_default())
    }

    fn team_season_stats(
        &self,
        team_id: u64,
        _league_id: u64,
        _season: u16,
    ) -> Result<TeamSeasonStats> {
        self.season_stats
            .get(&team_id)
            .cloned()
            .ok_or_else(|| PipelineError::LookupMiss {
                what: format!("team {team_id} season"),
            })
    }

    fn league_top_scorers(&self, _league_id: u64, _season: u16) -> Result<Vec<ScorerEntry>> {
        Ok(self.scorers.clone())
    }
}

fn fixture(home: &str, away: &str) -> RawFixture {
    RawFixture {
        home: home.to_string(),
        away: away.to_string(),
        kickoff: "28.07.2021 02:30".to_string(),
    }
}

#[test]
fn skips_uncovered_fixture_and_caps_at_three() {
    // Five scraped fixtures; the first one's home team is unknown to the api.
    let stats = FakeStats::default()
        .with_team(2, "Palmeiras", 5)
        .with_team(3, "Santos", 4)
        .with_team(4, "Corinthians", 3)
        .with_team(5, "Fortaleza", 2)
        .with_team(6, "Bahia", 1)
        .with_team(7, "Internacional", 6)
        .with_team(8, "Gremio", 7)
        .with_team(9, "Cuiaba", 1)
        .with_team(10, "Goias", 2);
    let fixtures = FakeFixtures {
        fixtures: vec![
            fixture("Atletico GO", "Palmeiras"),
            fixture("Santos", "Corinthians"),
            fixture("Fortaleza", "Bahia"),
            fixture("Internacional", "Gremio"),
            fixture("Cuiaba", "Goias"),
        ],
    };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let table = aggregator
        .build_fixture_table("Brazil", "Serie A", LEAGUE_ID)
        .expect("table should build");

    let homes: Vec<&str> = table.iter().map(|m| m.team_1.as_str()).collect();
    assert_eq!(homes, vec!["Santos", "Fortaleza", "Internacional"]);
}

#[test]
fn no_scraped_fixtures_means_empty_table() {
    let stats = FakeStats::default();
    let fixtures = FakeFixtures { fixtures: vec![] };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let table = aggregator
        .build_fixture_table("Brazil", "Serie A", LEAGUE_ID)
        .expect("empty scrape should not fail");
    assert!(table.is_empty());
}

#[test]
fn enrichment_fills_every_match_column() {
    let stats = FakeStats::default()
        .with_team(127, "Flamengo", 11)
        .with_team(121, "Palmeiras", 7);
    let fixtures = FakeFixtures {
        fixtures: vec![fixture("Flamengo", "Palmeiras")],
    };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let table = aggregator
        .build_fixture_table("Brazil", "Serie A", LEAGUE_ID)
        .expect("table should build");
    assert_eq!(table.len(), 1);

    let m = &table[0];
    assert_eq!(m.team_1_id, 127);
    assert_eq!(m.team_2_id, 121);
    assert_eq!(m.match_start_datetime, "28.07.2021 02:30");
    assert_eq!(m.stadium.as_deref(), Some("Flamengo Arena"));
    assert_eq!(m.team_1_top_scorer_name, "Flamengo Striker");
    assert_eq!(m.team_1_top_scorer_goals, 11);
    assert_eq!(m.team_1_yellow_cards, 11);
    assert_eq!(m.team_2_top_scorer_name, "Palmeiras Striker");
    assert_eq!(m.team_2_top_scorer_goals, 7);
    assert_eq!(m.league_id, LEAGUE_ID);
}

#[test]
fn empty_squad_during_enrichment_is_fatal() {
    let mut stats = FakeStats::default().with_team(127, "Flamengo", 11).with_team(
        121,
        "Palmeiras",
        7,
    );
    stats.squads.insert(121, Vec::new());
    let fixtures = FakeFixtures {
        fixtures: vec![fixture("Flamengo", "Palmeiras")],
    };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let err = aggregator
        .build_fixture_table("Brazil", "Serie A", LEAGUE_ID)
        .unwrap_err();
    assert!(matches!(err, PipelineError::LookupMiss { .. }));
}

#[test]
fn team_stats_keeps_input_order_and_duplicates() {
    let stats = FakeStats::default()
        .with_team(1, "Santos", 4)
        .with_team(2, "Bahia", 2);
    let fixtures = FakeFixtures { fixtures: vec![] };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let table = aggregator
        .build_team_stats_table(&[2, 1, 2], LEAGUE_ID)
        .expect("stats should build");
    let ids: Vec<u64> = table.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![2, 1, 2]);
    assert_eq!(table[0].name, "Bahia");
    assert_eq!(table[1].wins, 4);
}

#[test]
fn unknown_team_id_fails_stats_table() {
    let stats = FakeStats::default().with_team(1, "Santos", 4);
    let fixtures = FakeFixtures { fixtures: vec![] };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let err = aggregator
        .build_team_stats_table(&[1, 99], LEAGUE_ID)
        .unwrap_err();
    assert!(matches!(err, PipelineError::LookupMiss { .. }));
}

#[test]
fn top_scorers_takes_exactly_the_first_ten() {
    let stats = FakeStats::default().with_scorers(14);
    let fixtures = FakeFixtures { fixtures: vec![] };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let table = aggregator
        .build_top_scorers_table(LEAGUE_ID)
        .expect("scorers should build");
    assert_eq!(table.len(), 10);
    assert_eq!(table[0].name, "Scorer 0");
    assert_eq!(table[9].name, "Scorer 9");
}

#[test]
fn short_scorer_ranking_is_an_error() {
    let stats = FakeStats::default().with_scorers(9);
    let fixtures = FakeFixtures { fixtures: vec![] };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let err = aggregator.build_top_scorers_table(LEAGUE_ID).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::ShortResponse {
            wanted: 10,
            available: 9
        }
    ));
}

#[test]
fn team_ids_list_homes_then_aways() {
    let stats = FakeStats::default()
        .with_team(127, "Flamengo", 11)
        .with_team(121, "Palmeiras", 7)
        .with_team(212, "Santos", 5)
        .with_team(119, "Bahia", 2);
    let fixtures = FakeFixtures {
        fixtures: vec![
            fixture("Flamengo", "Palmeiras"),
            fixture("Santos", "Bahia"),
        ],
    };
    let config = test_config();
    let aggregator = Aggregator::new(&stats, &fixtures, &config);

    let table = aggregator
        .build_fixture_table("Brazil", "Serie A", LEAGUE_ID)
        .expect("table should build");
    assert_eq!(aggregate::collect_team_ids(&table), vec![127, 212, 121, 119]);
}
