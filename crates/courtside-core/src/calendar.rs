// Season calendar resolution: calendar date -> (season, week ordinal).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CalendarError {
    #[error("no season covers {date}")]
    NoMatchingSeason { date: NaiveDate },

    #[error("invalid season `{season}`: {message}")]
    InvalidSeason { season: String, message: String },
}

// ---------------------------------------------------------------------------
// Season definitions
// ---------------------------------------------------------------------------

/// Boundary dates for one season. Regular season runs
/// `season_start..=season_end`, playoffs run `playoff_start..=playoff_end`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeasonDefinition {
    pub season: String,
    pub season_start: NaiveDate,
    pub season_end: NaiveDate,
    pub playoff_start: NaiveDate,
    pub playoff_end: NaiveDate,
}

impl SeasonDefinition {
    /// Check boundary ordering: start <= end <= playoff_start <= playoff_end.
    pub fn validate(&self) -> Result<(), CalendarError> {
        let invalid = |message: &str| CalendarError::InvalidSeason {
            season: self.season.clone(),
            message: message.to_string(),
        };
        if self.season.trim().is_empty() {
            return Err(invalid("season identifier is empty"));
        }
        if self.season_start > self.season_end {
            return Err(invalid("season_start is after season_end"));
        }
        if self.season_end > self.playoff_start {
            return Err(invalid("season_end is after playoff_start"));
        }
        if self.playoff_start > self.playoff_end {
            return Err(invalid("playoff_start is after playoff_end"));
        }
        Ok(())
    }

    /// Whether `date` falls in `[season_start, playoff_end]`.
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.season_start <= date && date <= self.playoff_end
    }

    /// 1-based week ordinal of `date` counted from `season_start`.
    ///
    /// Dates before the season start clamp to week 1.
    pub fn week_of(&self, date: NaiveDate) -> u32 {
        let days = (date - self.season_start).num_days().max(0);
        (days / 7) as u32 + 1
    }

    /// The first calendar day of week `week_id`.
    pub fn week_start(&self, week_id: u32) -> NaiveDate {
        let offset = i64::from(week_id.max(1) - 1) * 7;
        self.season_start + chrono::Duration::days(offset)
    }
}

/// Seasons seeded into every fresh database.
pub fn seed_seasons() -> Vec<SeasonDefinition> {
    let d = |y, m, day| NaiveDate::from_ymd_opt(y, m, day).unwrap_or(NaiveDate::MIN);
    vec![
        SeasonDefinition {
            season: "2020-21".into(),
            season_start: d(2020, 12, 22),
            season_end: d(2021, 5, 16),
            playoff_start: d(2021, 5, 22),
            playoff_end: d(2021, 7, 20),
        },
        SeasonDefinition {
            season: "2021-22".into(),
            season_start: d(2021, 10, 19),
            season_end: d(2022, 4, 10),
            playoff_start: d(2022, 4, 16),
            playoff_end: d(2022, 6, 16),
        },
        SeasonDefinition {
            season: "2022-23".into(),
            season_start: d(2022, 10, 18),
            season_end: d(2023, 4, 9),
            playoff_start: d(2023, 4, 15),
            playoff_end: d(2023, 6, 12),
        },
    ]
}

// ---------------------------------------------------------------------------
// Resolver
// ---------------------------------------------------------------------------

/// A season paired with the week ordinal of a particular date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeasonWeek {
    pub season: String,
    pub week_id: u32,
}

/// Immutable view over the known seasons, ordered by `season_start`.
#[derive(Debug, Clone, Default)]
pub struct SeasonCalendar {
    seasons: Vec<SeasonDefinition>,
}

impl SeasonCalendar {
    /// Build a calendar from season records. Records are sorted by start date
    /// (ties broken by identifier) so that overlapping seasons resolve to the
    /// earliest match deterministically.
    pub fn new(mut seasons: Vec<SeasonDefinition>) -> Result<Self, CalendarError> {
        for season in &seasons {
            season.validate()?;
        }
        seasons.sort_by(|a, b| {
            a.season_start
                .cmp(&b.season_start)
                .then_with(|| a.season.cmp(&b.season))
        });
        Ok(Self { seasons })
    }

    pub fn seasons(&self) -> &[SeasonDefinition] {
        &self.seasons
    }

    pub fn season(&self, season: &str) -> Option<&SeasonDefinition> {
        self.seasons.iter().find(|s| s.season == season)
    }

    /// Resolve a date to its season identifier and week ordinal.
    pub fn resolve(&self, date: NaiveDate) -> Result<SeasonWeek, CalendarError> {
        self.seasons
            .iter()
            .find(|s| s.contains(date))
            .map(|s| SeasonWeek {
                season: s.season.clone(),
                week_id: s.week_of(date),
            })
            .ok_or(CalendarError::NoMatchingSeason { date })
    }
}
