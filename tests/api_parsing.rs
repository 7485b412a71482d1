use std::fs;
use std::path::PathBuf;

use serde_json::Value;

use matchday_report::error::PipelineError;
use matchday_report::stats_client::{
    parse_league_search, parse_squad_players, parse_team_search, parse_team_season_stats,
    parse_top_scorers, top_scorer, yellow_cards,
};

fn read_fixture(name: &str) -> Value {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    let raw = fs::read_to_string(path).expect("fixture file should be readable");
    serde_json::from_str(&raw).expect("fixture should be valid json")
}

#[test]
fn parses_league_search_fixture() {
    let leagues = parse_league_search(read_fixture("leagues.json")).expect("fixture should parse");
    assert_eq!(leagues.len(), 1);
    assert_eq!(leagues[0].id, 71);
}

#[test]
fn parses_team_search_fixture() {
    let teams = parse_team_search(read_fixture("teams.json")).expect("fixture should parse");
    assert_eq!(teams.len(), 1);
    assert_eq!(teams[0].id, 127);
    assert_eq!(teams[0].name, "Flamengo");
    assert_eq!(
        teams[0].venue.as_deref(),
        Some("Estadio Jornalista Mario Filho")
    );
}

#[test]
fn parses_squad_fixture_with_gaps() {
    let players = parse_squad_players(read_fixture("players.json")).expect("fixture should parse");
    assert_eq!(players.len(), 2);
    assert_eq!(players[0].name, "Gabriel Barbosa");
    assert_eq!(players[0].entries[0].goals, Some(11));
    // Second player has a null-goal entry first and a transfer entry after.
    assert_eq!(players[1].entries.len(), 2);
    assert_eq!(players[1].entries[0].goals, None);
    assert_eq!(players[1].entries[1].team_id, Some(212));
}

#[test]
fn squad_fixture_drives_derivations() {
    let players = parse_squad_players(read_fixture("players.json")).expect("fixture should parse");
    assert_eq!(top_scorer(&players), Some(("Gabriel Barbosa".to_string(), 11)));
    // Null yellow count on the first entry counts as zero.
    assert_eq!(yellow_cards(&players, 127), 3);
    assert_eq!(yellow_cards(&players, 212), 2);
}

#[test]
fn parses_team_season_stats_fixture() {
    let stats =
        parse_team_season_stats(read_fixture("team_statistics.json")).expect("fixture should parse");
    assert_eq!(stats.name, "Flamengo");
    assert_eq!(stats.form, "WWDLWWW");
    assert_eq!(stats.wins, 9);
    assert_eq!(stats.draws, 2);
    assert_eq!(stats.loses, 3);
}

#[test]
fn empty_team_season_stats_is_an_error() {
    // The free api tier answers uncovered teams with an empty array.
    let err = parse_team_season_stats(serde_json::json!([])).unwrap_err();
    assert!(matches!(err, PipelineError::Parse { .. }));
}

#[test]
fn parses_top_scorers_fixture() {
    let scorers = parse_top_scorers(read_fixture("topscorers.json")).expect("fixture should parse");
    assert_eq!(scorers.len(), 3);
    assert_eq!(scorers[0].name, "Hulk");
    assert_eq!(scorers[0].team_id, 1062);
    assert_eq!(scorers[0].goals, 12);
    // Null goal totals substitute to zero instead of failing the parse.
    assert_eq!(scorers[2].goals, 0);
}

#[test]
fn scorer_without_statistics_is_an_error() {
    let response = serde_json::json!([
        { "player": { "id": 1, "name": "Ghost" }, "statistics": [] }
    ]);
    let err = parse_top_scorers(response).unwrap_err();
    assert!(matches!(err, PipelineError::Parse { .. }));
}
