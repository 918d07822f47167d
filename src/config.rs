// Configuration loading and parsing (config/draftroom.toml).

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::board::Position;
use crate::draft::seat::SlotKind;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub draft: DraftConfig,
    pub contests: Vec<ContestSpec>,
    pub port: u16,
    pub db_path: String,
    pub board_path: String,
}

/// Draft pacing and roster shape shared by every room.
#[derive(Debug, Clone)]
pub struct DraftConfig {
    pub seat_count: usize,
    /// Roster slots per seat, in fill order. The number of rounds equals
    /// the length of this list; the same list drives the sequencer, the
    /// validator, and the bot policy.
    pub roster_slots: Vec<SlotKind>,
    /// Positions that may occupy a FLEX slot.
    pub flex_positions: Vec<Position>,
    pub budget: u32,
    pub countdown: Duration,
    pub pick_clock: Duration,
    pub bot_delay: Duration,
    /// How long a short-handed lobby waits before filling with bots.
    pub fill_wait: Duration,
    /// How long a completed room lingers before teardown.
    pub completed_grace: Duration,
}

impl DraftConfig {
    pub fn rounds(&self) -> usize {
        self.roster_slots.len()
    }

    pub fn total_picks(&self) -> usize {
        self.seat_count * self.rounds()
    }
}

/// Contest kind. Cash contests hold exactly one room and spawn a numbered
/// replacement when they fill; pooled contests spill entries across many
/// rooms until capacity is reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContestKind {
    Cash,
    Pooled,
}

/// One configured contest family.
#[derive(Debug, Clone)]
pub struct ContestSpec {
    /// Family name; concrete contest ids are `{family}` and, for cash
    /// replacements, `{family}-{seq}`.
    pub family: String,
    pub kind: ContestKind,
    pub entry_fee: u32,
    pub capacity: u32,
    pub max_entries_per_user: u32,
}

// ---------------------------------------------------------------------------
// draftroom.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire draftroom.toml file.
#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    draft: DraftSection,
    #[serde(default, rename = "contest")]
    contests: Vec<ContestSection>,
    server: ServerSection,
    database: DatabaseSection,
    board: BoardSection,
}

#[derive(Debug, Clone, Deserialize)]
struct DraftSection {
    seat_count: usize,
    roster_slots: Vec<String>,
    flex_positions: Vec<String>,
    budget: u32,
    countdown_secs: u64,
    pick_clock_secs: u64,
    bot_delay_ms: u64,
    fill_wait_secs: u64,
    completed_grace_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
struct ContestSection {
    family: String,
    kind: ContestKind,
    entry_fee: u32,
    capacity: u32,
    max_entries_per_user: u32,
}

#[derive(Debug, Clone, Deserialize)]
struct ServerSection {
    port: u16,
}

#[derive(Debug, Clone, Deserialize)]
struct DatabaseSection {
    path: String,
}

#[derive(Debug, Clone, Deserialize)]
struct BoardSection {
    path: String,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/draftroom.toml` relative to
/// the given `base_dir`.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let path = base_dir.join("config").join("draftroom.toml");
    let text = read_file(&path)?;
    let file: ConfigFile = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.clone(),
        source: e,
    })?;

    let roster_slots = file
        .draft
        .roster_slots
        .iter()
        .map(|s| {
            s.parse::<SlotKind>().map_err(|e| ConfigError::ValidationError {
                field: "draft.roster_slots".into(),
                message: e,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let flex_positions = file
        .draft
        .flex_positions
        .iter()
        .map(|s| {
            Position::from_abbrev(s).ok_or_else(|| ConfigError::ValidationError {
                field: "draft.flex_positions".into(),
                message: format!("unknown position `{s}`"),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let draft = DraftConfig {
        seat_count: file.draft.seat_count,
        roster_slots,
        flex_positions,
        budget: file.draft.budget,
        countdown: Duration::from_secs(file.draft.countdown_secs),
        pick_clock: Duration::from_secs(file.draft.pick_clock_secs),
        bot_delay: Duration::from_millis(file.draft.bot_delay_ms),
        fill_wait: Duration::from_secs(file.draft.fill_wait_secs),
        completed_grace: Duration::from_secs(file.draft.completed_grace_secs),
    };

    let contests = file
        .contests
        .into_iter()
        .map(|c| ContestSpec {
            family: c.family,
            kind: c.kind,
            entry_fee: c.entry_fee,
            capacity: c.capacity,
            max_entries_per_user: c.max_entries_per_user,
        })
        .collect();

    let config = Config {
        draft,
        contests,
        port: file.server.port,
        db_path: file.database.path,
        board_path: file.board.path,
    };

    validate(&config)?;

    Ok(config)
}

/// Convenience wrapper: loads config relative to the current working
/// directory.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let draft = &config.draft;

    if draft.seat_count == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.seat_count".into(),
            message: "must be greater than 0".into(),
        });
    }

    if draft.roster_slots.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "draft.roster_slots".into(),
            message: "must list at least one slot".into(),
        });
    }

    if draft.budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "draft.budget".into(),
            message: "must be greater than 0".into(),
        });
    }

    if draft.pick_clock.is_zero() {
        return Err(ConfigError::ValidationError {
            field: "draft.pick_clock_secs".into(),
            message: "must be greater than 0".into(),
        });
    }

    if draft.roster_slots.iter().any(|s| s.is_flex()) && draft.flex_positions.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "draft.flex_positions".into(),
            message: "must be non-empty when a FLEX slot is configured".into(),
        });
    }

    for contest in &config.contests {
        if contest.capacity == 0 {
            return Err(ConfigError::ValidationError {
                field: format!("contest.{}.capacity", contest.family),
                message: "must be greater than 0".into(),
            });
        }
        if contest.kind == ContestKind::Cash && contest.capacity as usize != draft.seat_count {
            return Err(ConfigError::ValidationError {
                field: format!("contest.{}.capacity", contest.family),
                message: format!(
                    "cash contests hold exactly one room; capacity must equal seat_count ({})",
                    draft.seat_count
                ),
            });
        }
        if contest.max_entries_per_user == 0 {
            return Err(ConfigError::ValidationError {
                field: format!("contest.{}.max_entries_per_user", contest.family),
                message: "must be greater than 0".into(),
            });
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const VALID_TOML: &str = r#"
[draft]
seat_count = 5
roster_slots = ["QB", "RB", "WR", "TE", "FLEX"]
flex_positions = ["RB", "WR", "TE"]
budget = 15
countdown_secs = 10
pick_clock_secs = 30
bot_delay_ms = 400
fill_wait_secs = 60
completed_grace_secs = 60

[[contest]]
family = "cash-5"
kind = "cash"
entry_fee = 5
capacity = 5
max_entries_per_user = 1

[[contest]]
family = "pooled-100"
kind = "pooled"
entry_fee = 2
capacity = 100
max_entries_per_user = 3

[server]
port = 9100

[database]
path = "draftroom.db"

[board]
path = "config/board.csv"
"#;

    fn write_config(dir_name: &str, toml_text: &str) -> PathBuf {
        let tmp = std::env::temp_dir().join(dir_name);
        let config_dir = tmp.join("config");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("draftroom.toml"), toml_text).unwrap();
        tmp
    }

    #[test]
    fn load_valid_config() {
        let tmp = write_config("draftroom_config_valid", VALID_TOML);
        let config = load_config_from(&tmp).expect("should load valid config");

        assert_eq!(config.draft.seat_count, 5);
        assert_eq!(config.draft.rounds(), 5);
        assert_eq!(config.draft.total_picks(), 25);
        assert_eq!(config.draft.roster_slots[4], SlotKind::Flex);
        assert_eq!(
            config.draft.flex_positions,
            vec![
                Position::RunningBack,
                Position::WideReceiver,
                Position::TightEnd
            ]
        );
        assert_eq!(config.draft.budget, 15);
        assert_eq!(config.draft.countdown, Duration::from_secs(10));
        assert_eq!(config.draft.pick_clock, Duration::from_secs(30));
        assert_eq!(config.draft.bot_delay, Duration::from_millis(400));
        assert_eq!(config.draft.fill_wait, Duration::from_secs(60));

        assert_eq!(config.contests.len(), 2);
        assert_eq!(config.contests[0].family, "cash-5");
        assert_eq!(config.contests[0].kind, ContestKind::Cash);
        assert_eq!(config.contests[1].kind, ContestKind::Pooled);
        assert_eq!(config.contests[1].capacity, 100);

        assert_eq!(config.port, 9100);
        assert_eq!(config.db_path, "draftroom.db");
        assert_eq!(config.board_path, "config/board.csv");

        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_roster_slot() {
        let tmp = write_config(
            "draftroom_config_bad_slot",
            &VALID_TOML.replace(r#""FLEX""#, r#""BENCH""#),
        );
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "draft.roster_slots");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_unknown_flex_position() {
        let tmp = write_config(
            "draftroom_config_bad_flex",
            &VALID_TOML.replace(r#"flex_positions = ["RB", "WR", "TE"]"#, r#"flex_positions = ["XX"]"#),
        );
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "draft.flex_positions");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_zero_budget() {
        let tmp = write_config(
            "draftroom_config_zero_budget",
            &VALID_TOML.replace("budget = 15", "budget = 0"),
        );
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "draft.budget");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_cash_capacity_mismatch() {
        let tmp = write_config(
            "draftroom_config_cash_capacity",
            &VALID_TOML.replace("capacity = 5", "capacity = 10"),
        );
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "contest.cash-5.capacity");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn rejects_flex_slot_without_flex_positions() {
        let tmp = write_config(
            "draftroom_config_no_flex_positions",
            &VALID_TOML.replace(
                r#"flex_positions = ["RB", "WR", "TE"]"#,
                "flex_positions = []",
            ),
        );
        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "draft.flex_positions");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn file_not_found_for_missing_config() {
        let tmp = std::env::temp_dir().join("draftroom_config_missing");
        let _ = fs::remove_dir_all(&tmp);
        fs::create_dir_all(&tmp).unwrap();

        let err = load_config_from(&tmp).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => {
                assert!(path.ends_with("draftroom.toml"));
            }
            other => panic!("expected FileNotFound, got: {other}"),
        }
        let _ = fs::remove_dir_all(&tmp);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let tmp = write_config("draftroom_config_garbage", "this is not valid [[[ toml");
        let err = load_config_from(&tmp).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
        let _ = fs::remove_dir_all(&tmp);
    }
}
