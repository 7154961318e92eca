// Roster eligibility and position classification.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::efficiency::Position;

/// One stint of a player on the roster.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub player: String,
    pub team: Option<String>,
    pub position: Option<Position>,
    pub playable: bool,
    pub enroll_date: NaiveDate,
    /// `None` while the player is still on the roster.
    pub release_date: Option<NaiveDate>,
}

impl RosterEntry {
    /// Whether this stint covers `date`.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.enroll_date <= date && self.release_date.map_or(true, |r| date <= r)
    }
}

/// All roster stints for one player.
#[derive(Debug, Clone, Default)]
pub struct RosterStatus {
    entries: Vec<RosterEntry>,
}

impl RosterStatus {
    pub fn new(mut entries: Vec<RosterEntry>) -> Self {
        entries.sort_by(|a, b| a.enroll_date.cmp(&b.enroll_date));
        Self { entries }
    }

    pub fn entries(&self) -> &[RosterEntry] {
        &self.entries
    }

    /// Players never tracked on the roster are eligible. Otherwise a playable
    /// stint must cover `date`; games after a release trigger nothing.
    pub fn is_eligible(&self, date: NaiveDate) -> bool {
        self.entries.is_empty() || self.entries.iter().any(|e| e.playable && e.covers(date))
    }

    /// Classification from the latest stint that names one, else `fallback`.
    pub fn position(&self, fallback: Position) -> Position {
        self.entries
            .iter()
            .rev()
            .find_map(|e| e.position)
            .unwrap_or(fallback)
    }
}
