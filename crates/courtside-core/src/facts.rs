// Per-game box-score facts and the ingestion boundary that validates them.
//
// A `GameFact` is one player's line for one game, keyed by (game_date, player).
// Rows arrive as `RawGameFact` (everything optional) and are only promoted to
// `GameFact` once the mandatory rebound split is present.

use std::io::Read;
use std::str::FromStr;
use std::path::Path;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("incomplete game fact for {player} on {game_date}: missing {field}")]
    IncompleteGameFact {
        player: String,
        game_date: NaiveDate,
        field: &'static str,
    },

    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },
}

// ---------------------------------------------------------------------------
// Finalized fact
// ---------------------------------------------------------------------------

/// One finalized box-score line. Immutable per key: a correction replaces
/// the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameFact {
    pub game_date: NaiveDate,
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub home_game: bool,
    pub season: String,
    /// Minutes on court, fractional (32:30 -> 32.5).
    pub minutes_played: Option<f64>,
    pub field_goals: Option<u32>,
    pub field_goal_attempts: Option<u32>,
    pub three_points: Option<u32>,
    pub three_point_attempts: Option<u32>,
    pub free_throws: Option<u32>,
    pub free_throw_attempts: Option<u32>,
    pub offensive_rebounds: u32,
    pub defensive_rebounds: u32,
    pub assists: Option<u32>,
    pub steals: Option<u32>,
    pub blocks: Option<u32>,
    pub turnovers: Option<u32>,
    pub personal_fouls: Option<u32>,
    pub points: Option<u32>,
    pub plus_minus: Option<i32>,
    pub game_rating_score: f64,
}

impl GameFact {
    /// Whether the player logged any court time in this game.
    pub fn played(&self) -> bool {
        self.minutes_played.is_some_and(|m| m > 0.0)
    }

    /// Recorded as a DNP: minutes are tracked and zero. Untracked minutes are
    /// not a DNP.
    pub fn did_not_play(&self) -> bool {
        self.minutes_played.is_some_and(|m| m <= 0.0)
    }

    pub fn total_rebounds(&self) -> u32 {
        self.offensive_rebounds + self.defensive_rebounds
    }

    /// Single-game efficiency score (see [`efficiency_of`]). Untracked stats
    /// contribute nothing.
    pub fn efficiency(&self) -> f64 {
        efficiency_of(&StatLine::from(self))
    }
}

/// The counting stats the efficiency formula reads, as floats so the same
/// formula serves single games and window averages.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatLine {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub field_goals: f64,
    pub field_goal_attempts: f64,
    pub free_throws: f64,
    pub free_throw_attempts: f64,
    pub turnovers: f64,
}

impl From<&GameFact> for StatLine {
    fn from(fact: &GameFact) -> Self {
        let n = |v: Option<u32>| f64::from(v.unwrap_or(0));
        StatLine {
            points: n(fact.points),
            rebounds: f64::from(fact.total_rebounds()),
            assists: n(fact.assists),
            steals: n(fact.steals),
            blocks: n(fact.blocks),
            field_goals: n(fact.field_goals),
            field_goal_attempts: n(fact.field_goal_attempts),
            free_throws: n(fact.free_throws),
            free_throw_attempts: n(fact.free_throw_attempts),
            turnovers: n(fact.turnovers),
        }
    }
}

/// `points + rebounds + assists + steals + blocks - missed FG - missed FT -
/// turnovers`. Misses never go negative when attempts are untracked but makes
/// are.
pub fn efficiency_of(line: &StatLine) -> f64 {
    let missed_fg = (line.field_goal_attempts - line.field_goals).max(0.0);
    let missed_ft = (line.free_throw_attempts - line.free_throws).max(0.0);
    line.points + line.rebounds + line.assists + line.steals + line.blocks
        - missed_fg
        - missed_ft
        - line.turnovers
}

// ---------------------------------------------------------------------------
// Raw (pre-validation) fact
// ---------------------------------------------------------------------------

/// A box-score line as captured upstream, before validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawGameFact {
    pub game_date: Option<NaiveDate>,
    pub player: String,
    pub team: String,
    pub opponent: String,
    pub home_game: bool,
    pub minutes_played: Option<f64>,
    pub field_goals: Option<u32>,
    pub field_goal_attempts: Option<u32>,
    pub three_points: Option<u32>,
    pub three_point_attempts: Option<u32>,
    pub free_throws: Option<u32>,
    pub free_throw_attempts: Option<u32>,
    pub offensive_rebounds: Option<u32>,
    pub defensive_rebounds: Option<u32>,
    pub assists: Option<u32>,
    pub steals: Option<u32>,
    pub blocks: Option<u32>,
    pub turnovers: Option<u32>,
    pub personal_fouls: Option<u32>,
    pub points: Option<u32>,
    pub plus_minus: Option<i32>,
    pub game_rating_score: Option<f64>,
}

impl RawGameFact {
    /// Promote to a `GameFact` for `season`. Rejects rows missing either
    /// rebound split. A missing rating is filled from the efficiency formula.
    pub fn finalize(self, game_date: NaiveDate, season: &str) -> Result<GameFact, IngestError> {
        let game_date = self.game_date.unwrap_or(game_date);
        let player = self.player.trim().to_string();
        let incomplete = |field: &'static str| IngestError::IncompleteGameFact {
            player: player.clone(),
            game_date,
            field,
        };
        if player.is_empty() {
            return Err(incomplete("player"));
        }
        let offensive_rebounds = self
            .offensive_rebounds
            .ok_or_else(|| incomplete("offensive_rebounds"))?;
        let defensive_rebounds = self
            .defensive_rebounds
            .ok_or_else(|| incomplete("defensive_rebounds"))?;

        let mut fact = GameFact {
            game_date,
            player,
            team: self.team.trim().to_string(),
            opponent: self.opponent.trim().to_string(),
            home_game: self.home_game,
            season: season.to_string(),
            minutes_played: self.minutes_played,
            field_goals: self.field_goals,
            field_goal_attempts: self.field_goal_attempts,
            three_points: self.three_points,
            three_point_attempts: self.three_point_attempts,
            free_throws: self.free_throws,
            free_throw_attempts: self.free_throw_attempts,
            offensive_rebounds,
            defensive_rebounds,
            assists: self.assists,
            steals: self.steals,
            blocks: self.blocks,
            turnovers: self.turnovers,
            personal_fouls: self.personal_fouls,
            points: self.points,
            plus_minus: self.plus_minus,
            game_rating_score: 0.0,
        };
        fact.game_rating_score = match self.game_rating_score {
            Some(score) if score.is_finite() => score,
            _ => fact.efficiency(),
        };
        Ok(fact)
    }
}

// ---------------------------------------------------------------------------
// CSV import (daily leaders format)
// ---------------------------------------------------------------------------

/// Daily box-score CSV row. Every cell is read as text so blanks can be
/// told apart from zeros. Unknown columns are ignored.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawDailyRow {
    Player: String,
    #[serde(default)]
    Tm: String,
    #[serde(default)]
    Home: String,
    #[serde(default)]
    Opp: String,
    #[serde(default)]
    MP: String,
    #[serde(default)]
    FG: String,
    #[serde(default)]
    FGA: String,
    #[serde(default, rename = "3P")]
    ThreeP: String,
    #[serde(default, rename = "3PA")]
    ThreePA: String,
    #[serde(default)]
    FT: String,
    #[serde(default)]
    FTA: String,
    #[serde(default)]
    ORB: String,
    #[serde(default)]
    DRB: String,
    #[serde(default)]
    AST: String,
    #[serde(default)]
    STL: String,
    #[serde(default)]
    BLK: String,
    #[serde(default)]
    TOV: String,
    #[serde(default)]
    PF: String,
    #[serde(default)]
    PTS: String,
    #[serde(default, rename = "+/-")]
    PlusMinus: String,
    #[serde(default)]
    GmSc: String,
}

/// Parse one cell. Blank is `Ok(None)`; text that does not parse is an
/// error carrying the offending value.
fn parse_cell<T: FromStr>(s: &str) -> Result<Option<T>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    s.parse().map(Some).map_err(|_| s.to_string())
}

fn parse_f64_cell(s: &str) -> Result<Option<f64>, String> {
    match parse_cell::<f64>(s)? {
        Some(v) if !v.is_finite() => Err(s.trim().to_string()),
        v => Ok(v),
    }
}

/// Parse `MM:SS` (or plain minutes) into fractional minutes.
pub fn parse_minutes(s: &str) -> Option<f64> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    match s.split_once(':') {
        Some((m, sec)) => {
            let m: u32 = m.trim().parse().ok()?;
            let sec: u32 = sec.trim().parse().ok()?;
            if sec >= 60 {
                return None;
            }
            Some(f64::from(m) + f64::from(sec) / 60.0)
        }
        None => s.parse::<f64>().ok().filter(|v| v.is_finite()),
    }
}

/// Home flag accepts `1/true/home/H`; an `@` marker (away) or blank is false.
fn cell_home(s: &str) -> bool {
    matches!(
        s.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "home" | "h"
    )
}

impl From<RawDailyRow> for RawGameFact {
    fn from(row: RawDailyRow) -> Self {
        let player = row.Player;
        // Unparsable cells are read as absent, with a warning naming the cell.
        let cell = |column: &str, parsed: Result<Option<u32>, String>| {
            parsed.unwrap_or_else(|bad| {
                warn!("ignoring unparsable {} value `{}` for {}", column, bad, player);
                None
            })
        };
        let minutes_played = match parse_minutes(&row.MP) {
            None if !row.MP.trim().is_empty() => {
                warn!("ignoring unparsable MP value `{}` for {}", row.MP.trim(), player);
                None
            }
            minutes => minutes,
        };
        let plus_minus = parse_cell::<i32>(row.PlusMinus.trim().trim_start_matches('+'))
            .unwrap_or_else(|bad| {
                warn!("ignoring unparsable +/- value `{}` for {}", bad, player);
                None
            });
        let game_rating_score = parse_f64_cell(&row.GmSc).unwrap_or_else(|bad| {
            warn!("ignoring unparsable GmSc value `{}` for {}", bad, player);
            None
        });

        RawGameFact {
            game_date: None,
            team: row.Tm,
            opponent: row.Opp,
            home_game: cell_home(&row.Home),
            minutes_played,
            field_goals: cell("FG", parse_cell(&row.FG)),
            field_goal_attempts: cell("FGA", parse_cell(&row.FGA)),
            three_points: cell("3P", parse_cell(&row.ThreeP)),
            three_point_attempts: cell("3PA", parse_cell(&row.ThreePA)),
            free_throws: cell("FT", parse_cell(&row.FT)),
            free_throw_attempts: cell("FTA", parse_cell(&row.FTA)),
            offensive_rebounds: cell("ORB", parse_cell(&row.ORB)),
            defensive_rebounds: cell("DRB", parse_cell(&row.DRB)),
            assists: cell("AST", parse_cell(&row.AST)),
            steals: cell("STL", parse_cell(&row.STL)),
            blocks: cell("BLK", parse_cell(&row.BLK)),
            turnovers: cell("TOV", parse_cell(&row.TOV)),
            personal_fouls: cell("PF", parse_cell(&row.PF)),
            points: cell("PTS", parse_cell(&row.PTS)),
            plus_minus,
            game_rating_score,
            player,
        }
    }
}

/// Read raw rows from any reader. Malformed rows are skipped with a warning;
/// validation happens later in `RawGameFact::finalize`.
pub fn read_daily_rows<R: Read>(rdr: R) -> Result<Vec<RawGameFact>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawDailyRow>() {
        match result {
            Ok(raw) => rows.push(RawGameFact::from(raw)),
            Err(e) => warn!("skipping malformed box-score row: {}", e),
        }
    }
    Ok(rows)
}

/// Read a daily box-score CSV file.
pub fn load_daily_file(path: &Path) -> Result<Vec<RawGameFact>, IngestError> {
    let file = std::fs::File::open(path).map_err(|e| IngestError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_daily_rows(file).map_err(|e| IngestError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}
