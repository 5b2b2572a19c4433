// Integration tests for the draft wheel.
//
// These tests exercise the library end to end through its public API: pool
// loading from CSV fixtures, seeded lottery drafts, undo, save/load through
// the CSV store, legacy saved files, and the async draft service.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use draft_wheel::config::{parse_config, EngineConfig};
use draft_wheel::draft::{AssignedRole, DataFormatError, DraftState};
use draft_wheel::lottery::{build_segments, POSITION_DOMAIN};
use draft_wheel::persistence::{
    decode_remaining, read_player_pool, CsvSnapshotStore, PersistenceError, SnapshotStore,
};
use draft_wheel::service;

// ===========================================================================
// Test helpers
// ===========================================================================

/// Fixture directory path (relative to the package root, which is the cwd for
/// `cargo test`).
const FIXTURES: &str = "tests/fixtures";

fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
    (a - b).abs() < epsilon
}

/// The shipped defaults with two registered teams.
fn engine_config() -> EngineConfig {
    let mut config = parse_config(include_str!("../defaults/draft.toml"))
        .unwrap()
        .engine;
    config.default_teams = vec!["Radiant".into(), "Dire".into()];
    config
}

fn fixture_state() -> DraftState {
    let mut state = DraftState::new(engine_config()).unwrap();
    let players = read_player_pool(&Path::new(FIXTURES).join("players.csv")).unwrap();
    state.load_pool(players).unwrap();
    state
}

/// Sorted pool contents per role.
fn pool_contents(state: &DraftState) -> BTreeMap<String, Vec<String>> {
    state
        .config()
        .roles
        .iter()
        .map(|role| {
            let mut names = state.pools().candidates(role).to_vec();
            names.sort();
            (role.clone(), names)
        })
        .collect()
}

fn assert_exclusive(state: &DraftState) {
    let mut seen = HashSet::new();
    for team in state.teams() {
        for entry in team.players() {
            assert!(seen.insert(entry.player.clone()), "{} drafted twice", entry.player);
        }
    }
    for role in &state.config().roles {
        for name in state.pools().candidates(role) {
            assert!(!seen.contains(name), "{name} is both pooled and drafted");
        }
    }
}

/// First non-empty role, trying `requested` before the configured order.
fn draw_role(state: &DraftState, requested: &str) -> Option<String> {
    std::iter::once(requested)
        .chain(state.config().roles.iter().map(String::as_str))
        .find(|r| !state.is_role_empty(r))
        .map(String::from)
}

/// Draft `rounds` picks per team with seeded positions, checking the
/// distribution and exclusivity invariants after every pick.
fn seeded_draft(state: &mut DraftState, seed: u64, rounds: usize) -> usize {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let team_ids: Vec<String> = state.teams().iter().map(|t| t.id.clone()).collect();
    let mut picks = 0;

    for _ in 0..rounds {
        for team_id in &team_ids {
            let unfilled = state.unfilled_roles(team_id).unwrap();
            let Some(requested) = unfilled.first().cloned() else {
                continue;
            };
            let Some(candidate) = draw_role(state, &requested) else {
                return picks;
            };

            let dist = state.compute(team_id, &candidate).unwrap();
            assert!(!dist.is_empty());
            assert!(approx_eq(dist.total(), 1.0, 1e-8), "sum was {}", dist.total());

            let segments = build_segments(&dist);
            let last = segments.last().unwrap();
            assert!(approx_eq(last.end, POSITION_DOMAIN, 1e-6));

            let position = rng.gen_range(0.0..=POSITION_DOMAIN);
            let winner = state
                .pick(team_id, &requested, &candidate, position, &segments)
                .unwrap();
            assert!(winner.is_some(), "position {position} resolved to nobody");
            picks += 1;
            assert_exclusive(state);
        }
    }
    picks
}

fn temp_dir(name: &str) -> std::path::PathBuf {
    let dir = std::env::temp_dir().join(name);
    let _ = fs::remove_dir_all(&dir);
    dir
}

// ===========================================================================
// Test: Pool loading
// ===========================================================================

#[test]
fn fixture_pool_loads_into_role_pools() {
    let state = fixture_state();
    assert_eq!(state.players().len(), 20);
    assert!(state.pools().contains("carry", "Arden"));
    assert!(state.pools().contains("mid", "Arden"));
    assert!(!state.pools().contains("offlane", "Arden"));
    assert_eq!(state.players().get("Corwin").unwrap().priority_for("hard_support"), Some(3));
    assert!(state.teams().iter().all(|t| t.is_empty()));
}

#[test]
fn malformed_fixture_aborts_the_load() {
    let err = read_player_pool(&Path::new(FIXTURES).join("bad_roles.csv")).unwrap_err();
    match err {
        PersistenceError::Format { source, .. } => match source {
            DataFormatError::Row { row, source } => {
                assert_eq!(row, 2);
                assert!(matches!(*source, DataFormatError::DuplicateRole { .. }));
            }
            other => panic!("expected a row error, got: {other}"),
        },
        other => panic!("expected a format error, got: {other}"),
    }
}

#[test]
fn unknown_role_in_pool_is_rejected() {
    let csv = "name,mmr,roles\nArden,2400,carry\nBexley,3100,jungle(1)\n";
    let players = decode_remaining(csv.as_bytes()).unwrap();
    let mut state = DraftState::new(engine_config()).unwrap();
    assert!(state.load_pool(players).is_err());
    assert!(state.players().is_empty());
}

// ===========================================================================
// Test: Seeded draft, undo
// ===========================================================================

#[test]
fn seeded_draft_fills_both_teams() {
    let mut state = fixture_state();
    let picks = seeded_draft(&mut state, 7, 5);

    assert_eq!(picks, 10);
    for team in state.teams() {
        assert_eq!(team.len(), 5);
        assert!(state.unfilled_roles(&team.id).unwrap().is_empty());
        let ratings: Vec<f64> = team
            .players()
            .iter()
            .map(|e| state.players().rating(&e.player).unwrap())
            .collect();
        let mean = ratings.iter().sum::<f64>() / ratings.len() as f64;
        assert!(approx_eq(team.average_rating(), mean, 1e-9));
    }
    assert_eq!(state.undrafted_players().count(), 10);
    assert_eq!(state.history().len(), 10);
}

#[test]
fn same_seed_drafts_the_same_teams() {
    let mut a = fixture_state();
    let mut b = fixture_state();
    seeded_draft(&mut a, 99, 5);
    seeded_draft(&mut b, 99, 5);
    for (ta, tb) in a.teams().iter().zip(b.teams()) {
        assert_eq!(ta.players(), tb.players());
    }
}

#[test]
fn undoing_every_pick_restores_the_pools() {
    let mut state = fixture_state();
    let before = pool_contents(&state);

    let picks = seeded_draft(&mut state, 3, 3);
    for _ in 0..picks {
        assert!(state.undo().is_some());
    }
    assert_eq!(state.undo(), None);
    assert_eq!(pool_contents(&state), before);
    assert!(state.teams().iter().all(|t| t.is_empty()));
}

#[test]
fn captain_shifts_ideal_rating() {
    let mut state = fixture_state();
    assert!(approx_eq(state.ideal_rating("Radiant").unwrap(), 6000.0, 1e-9));

    state.add_captain("Radiant", "Kestrel", 0.0).unwrap();
    // (6000 * 5 - 7400) / 4
    assert!(approx_eq(state.ideal_rating("Radiant").unwrap(), 5650.0, 1e-9));
    assert!(!state.pools().contains_anywhere("Kestrel"));
}

// ===========================================================================
// Test: Save / load
// ===========================================================================

#[test]
fn save_and_load_round_trip_through_csv_store() {
    let dir = temp_dir("draft_wheel_it_round_trip");
    let store = CsvSnapshotStore::new(dir.join("remaining.csv"), dir.join("teams.csv"));

    let mut state = fixture_state();
    state.add_captain("Dire", "Captain Vex", 6400.0).unwrap();
    seeded_draft(&mut state, 11, 2);
    state.save_to(&store).unwrap();

    let mut loaded = DraftState::new(engine_config()).unwrap();
    loaded.load_from(&store).unwrap();

    assert_eq!(pool_contents(&loaded), pool_contents(&state));
    for team in state.teams() {
        assert_eq!(loaded.team(&team.id), Some(team));
    }
    for player in state.players().iter() {
        assert_eq!(loaded.players().get(&player.name), Some(player));
    }
    assert!(loaded.history().is_empty());
    assert_eq!(loaded.undo(), None);

    let _ = fs::remove_dir_all(&dir);
}

#[test]
fn legacy_team_file_without_roles_column_loads() {
    let store = CsvSnapshotStore::new(
        Path::new(FIXTURES).join("saved_remaining.csv"),
        Path::new(FIXTURES).join("saved_teams_legacy.csv"),
    );
    let mut state = DraftState::new(engine_config()).unwrap();
    state.load_from(&store).unwrap();

    let radiant = state.team("Radiant").unwrap();
    assert_eq!(radiant.len(), 2);
    assert_eq!(radiant.players()[0].role, AssignedRole::Captain);
    assert!(approx_eq(radiant.average_rating(), 4900.0, 1e-9));

    let dire = state.team("Dire").unwrap();
    assert_eq!(dire.players()[0].role, AssignedRole::Captain);
    assert_eq!(dire.players()[1].role, AssignedRole::Role("hard_support".into()));

    // Drafted players come back without roles.
    assert!(state.players().get("Arden").unwrap().role_priorities.is_empty());
    assert_eq!(state.pools().candidates("mid"), ["Bexley", "Gale"]);
    assert!(state.is_role_empty("carry"));
}

#[test]
fn missing_save_files_leave_state_untouched() {
    let dir = temp_dir("draft_wheel_it_missing");
    let store = CsvSnapshotStore::new(dir.join("remaining.csv"), dir.join("teams.csv"));
    assert!(store.load().is_err());

    let mut state = fixture_state();
    assert!(state.load_from(&store).is_err());
    assert_eq!(state.players().len(), 20);
}

// ===========================================================================
// Test: Draft service
// ===========================================================================

#[tokio::test]
async fn concurrent_spins_never_double_draft() {
    let (handle, task) = service::spawn(fixture_state());

    let mut joins = Vec::new();
    for i in 0..8u64 {
        let handle = handle.clone();
        let team = if i % 2 == 0 { "Radiant" } else { "Dire" };
        joins.push(tokio::spawn(async move {
            let position = (i as f64 * 13.0) % POSITION_DOMAIN;
            handle.spin(team, "carry", "carry", position).await
        }));
    }

    let mut winners = Vec::new();
    for join in joins {
        if let Some(name) = join.await.unwrap().unwrap() {
            winners.push(name);
        }
    }
    drop(handle);

    let unique: HashSet<&String> = winners.iter().collect();
    assert_eq!(unique.len(), winners.len());

    let state = task.await.unwrap();
    assert_exclusive(&state);
    assert_eq!(state.history().len(), winners.len());
}
