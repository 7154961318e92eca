// Positional efficiency scoring.
//
// One weighting per position, one scoring function. A row only carries a
// non-zero score in the column of the player's classified position.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::window::WindowStats;

// ---------------------------------------------------------------------------
// Position classification
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Position {
    Center,
    Guard,
    Forward,
}

impl Position {
    pub const ALL: [Position; 3] = [Position::Center, Position::Guard, Position::Forward];

    /// Parse a position label. Accepts the long names and the usual box-score
    /// abbreviations (PG/SG -> Guard, SF/PF -> Forward). Hybrid labels such as
    /// "G-F" classify by their first component.
    pub fn from_str_pos(s: &str) -> Option<Self> {
        let primary = s.trim().split(['-', '/']).next().unwrap_or_default();
        match primary.trim().to_ascii_uppercase().as_str() {
            "C" | "CENTER" => Some(Position::Center),
            "G" | "PG" | "SG" | "GUARD" => Some(Position::Guard),
            "F" | "SF" | "PF" | "FORWARD" => Some(Position::Forward),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Center => "center",
            Position::Guard => "guard",
            Position::Forward => "forward",
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Weights
// ---------------------------------------------------------------------------

/// Non-negative coefficients applied to a window's per-game averages.
/// Omitted keys default to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionWeights {
    pub points: f64,
    pub rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub field_goals: f64,
    pub three_points: f64,
    pub three_point_attempts: f64,
    pub games_played: f64,
}

impl PositionWeights {
    /// `(name, value)` pairs, used for validation messages.
    pub fn fields(&self) -> [(&'static str, f64); 9] {
        [
            ("points", self.points),
            ("rebounds", self.rebounds),
            ("assists", self.assists),
            ("steals", self.steals),
            ("blocks", self.blocks),
            ("field_goals", self.field_goals),
            ("three_points", self.three_points),
            ("three_point_attempts", self.three_point_attempts),
            ("games_played", self.games_played),
        ]
    }

    fn weighted_sum(&self, stats: &WindowStats) -> f64 {
        self.points * stats.points
            + self.rebounds * stats.total_rebounds
            + self.assists * stats.assists
            + self.steals * stats.steals
            + self.blocks * stats.blocks
            + self.field_goals * stats.field_goals
            + self.three_points * stats.three_points
            + self.three_point_attempts * stats.three_point_attempts
            + self.games_played * f64::from(stats.games_played)
    }
}

/// Weightings for all three positions. A position missing from config keeps
/// its default weighting.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionScorer {
    pub center: PositionWeights,
    pub guard: PositionWeights,
    pub forward: PositionWeights,
}

impl Default for PositionScorer {
    fn default() -> Self {
        PositionScorer {
            center: PositionWeights {
                rebounds: 80.0,
                blocks: 45.0,
                field_goals: 65.0,
                games_played: 45.0,
                ..Default::default()
            },
            guard: PositionWeights {
                assists: 85.0,
                steals: 85.0,
                three_points: 40.0,
                points: 10.0,
                games_played: 25.0,
                ..Default::default()
            },
            forward: PositionWeights {
                points: 30.0,
                rebounds: 40.0,
                field_goals: 30.0,
                three_point_attempts: 40.0,
                games_played: 60.0,
                ..Default::default()
            },
        }
    }
}

/// Compress a raw weighted sum: `asinh(x / 2) / ln(10)`. Monotone and maps
/// zero to zero.
pub fn normalize(value: f64) -> f64 {
    (value / 2.0).asinh() / std::f64::consts::LN_10
}

impl PositionScorer {
    pub fn weights(&self, position: Position) -> &PositionWeights {
        match position {
            Position::Center => &self.center,
            Position::Guard => &self.guard,
            Position::Forward => &self.forward,
        }
    }

    /// Score a window for `position`. Never negative.
    pub fn score(&self, position: Position, stats: &WindowStats) -> f64 {
        let raw = self.weights(position).weighted_sum(stats);
        normalize(raw.max(0.0))
    }

    /// Populate only the column matching `position`; the other two are zero.
    pub fn scores(&self, position: Position, stats: &WindowStats) -> PositionalScores {
        let score = self.score(position, stats);
        let mut scores = PositionalScores::default();
        match position {
            Position::Center => scores.center_player_stats = score,
            Position::Guard => scores.guard_player_stats = score,
            Position::Forward => scores.forward_player_stats = score,
        }
        scores
    }
}

/// The three positional score columns of an average row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PositionalScores {
    pub center_player_stats: f64,
    pub guard_player_stats: f64,
    pub forward_player_stats: f64,
}

impl PositionalScores {
    /// The position whose column carries a non-zero score, if any.
    pub fn authoritative(&self) -> Option<Position> {
        [
            (Position::Center, self.center_player_stats),
            (Position::Guard, self.guard_player_stats),
            (Position::Forward, self.forward_player_stats),
        ]
        .into_iter()
        .find(|(_, v)| *v != 0.0)
        .map(|(p, _)| p)
    }
}
