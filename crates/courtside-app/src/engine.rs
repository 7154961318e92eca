// Event processing: one game-fact change in, the affected running-average
// rows recomputed and committed out.
//
// Flow per event:
// 1. Read the fact and resolve (season, week) from its date
// 2. Check roster eligibility and pick the position classification
// 3. Read the player's season history once (one snapshot for all periods)
// 4. Recompute every affected snapshot, score it, commit the batch

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::NaiveDate;
use courtside_core::calendar::{CalendarError, SeasonCalendar};
use courtside_core::config::Config;
use courtside_core::db::Database;
use courtside_core::efficiency::Position;
use courtside_core::error::EngineError;
use courtside_core::facts::{GameFact, RawGameFact};
use courtside_core::window::{PlayerSeason, WindowAggregator};
use courtside_core::writer::{AverageSink, UpsertWriter};
use tracing::{debug, info, warn};

// ---------------------------------------------------------------------------
// Events and outcomes
// ---------------------------------------------------------------------------

/// Something that requires a player's averages to be re-derived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FactEvent {
    /// The fact for (player, game_date) was written or replaced.
    Changed { player: String, game_date: NaiveDate },
    /// Recompute every snapshot for the player in `season`.
    Reconcile { player: String, season: String },
}

impl FactEvent {
    /// The key events are serialized on.
    pub fn player(&self) -> &str {
        match self {
            FactEvent::Changed { player, .. } | FactEvent::Reconcile { player, .. } => player,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Rows were recomputed and committed.
    Recomputed { season: String, rows: usize },
    /// The player is off the roster or unplayable on the game date.
    Ineligible,
}

/// Result of bringing stored facts back in line with the season calendar.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeasonRepair {
    /// Facts whose stored season tag was rewritten.
    pub retagged: usize,
    /// Average rows deleted for having no fact under their season.
    pub pruned: usize,
}

/// Result of ingesting one day's box scores.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// One `Changed` event per stored fact.
    pub events: Vec<FactEvent>,
    pub rejected: Vec<EngineError>,
}

// ---------------------------------------------------------------------------
// Per-player exclusion
// ---------------------------------------------------------------------------

/// Marks a player as being recomputed; released on drop.
struct InFlight<'a> {
    set: &'a Mutex<HashSet<String>>,
    player: String,
}

impl<'a> InFlight<'a> {
    fn claim(set: &'a Mutex<HashSet<String>>, player: &str) -> Result<Self, EngineError> {
        let mut guard = set.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.insert(player.to_string()) {
            return Err(EngineError::RecomputeConflict {
                player: player.to_string(),
            });
        }
        Ok(Self {
            set,
            player: player.to_string(),
        })
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.player);
    }
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct Engine {
    db: Arc<Database>,
    calendar: SeasonCalendar,
    aggregator: WindowAggregator,
    writer: UpsertWriter,
    default_position: Position,
    in_flight: Mutex<HashSet<String>>,
}

impl Engine {
    /// Merge configured seasons into the store, load the calendar, and wire
    /// the writer to the same database.
    pub fn new(db: Arc<Database>, config: &Config) -> Result<Self, EngineError> {
        let sink: Arc<dyn AverageSink> = db.clone();
        Self::with_sink(db, sink, config)
    }

    /// Like [`Engine::new`] but commits averages through `sink`.
    pub fn with_sink(
        db: Arc<Database>,
        sink: Arc<dyn AverageSink>,
        config: &Config,
    ) -> Result<Self, EngineError> {
        for season in &config.seasons {
            db.upsert_season(season)?;
        }
        let calendar = SeasonCalendar::new(db.load_seasons()?)?;
        info!("Season calendar loaded: {} seasons", calendar.seasons().len());

        Ok(Self {
            db,
            calendar,
            aggregator: WindowAggregator::new(config.engine.periods.clone(), config.weights),
            writer: UpsertWriter::new(sink, config.retry.clone()),
            default_position: config.engine.default_position,
            in_flight: Mutex::new(HashSet::new()),
        })
    }

    pub fn db(&self) -> &Arc<Database> {
        &self.db
    }

    pub fn calendar(&self) -> &SeasonCalendar {
        &self.calendar
    }

    /// Validate and store a day's raw box scores. Each row's season comes
    /// from the calendar; rows that fail are collected, not fatal.
    pub fn ingest(&self, rows: Vec<RawGameFact>, game_date: NaiveDate) -> Result<IngestReport, EngineError> {
        let mut report = IngestReport::default();
        let mut accepted: Vec<GameFact> = Vec::new();

        for raw in rows {
            let date = raw.game_date.unwrap_or(game_date);
            let season = match self.calendar.resolve(date) {
                Ok(resolved) => resolved.season,
                Err(e) => {
                    warn!("Rejected box score for {}: {}", raw.player, e);
                    report.rejected.push(e.into());
                    continue;
                }
            };
            match raw.finalize(date, &season) {
                Ok(fact) => accepted.push(fact),
                Err(e) => {
                    warn!("Rejected box score: {}", e);
                    report.rejected.push(e.into());
                }
            }
        }

        self.db.import_game_facts(&accepted)?;
        info!(
            "Stored {} game facts for {} ({} rejected)",
            accepted.len(),
            game_date,
            report.rejected.len()
        );

        report.events = accepted
            .into_iter()
            .map(|f| FactEvent::Changed {
                player: f.player,
                game_date: f.game_date,
            })
            .collect();
        Ok(report)
    }

    /// Re-tag every stored fact with the season its date resolves to, then
    /// delete average rows left without a matching fact. Facts dated outside
    /// every season keep their tag.
    pub fn reconcile_seasons(&self) -> Result<SeasonRepair, EngineError> {
        let retagged = self
            .db
            .retag_game_facts(|date| self.calendar.resolve(date).ok().map(|r| r.season))?;
        let pruned = self.db.prune_orphan_averages()?;
        if retagged > 0 || pruned > 0 {
            warn!(
                "Season repair: {} facts retagged, {} stale average rows pruned",
                retagged, pruned
            );
        }
        Ok(SeasonRepair { retagged, pruned })
    }

    /// Process one event to completion. Returns only after the recomputed
    /// rows are committed; an `Err` means the event was not applied.
    pub async fn process(&self, event: FactEvent) -> Result<Outcome, EngineError> {
        match event {
            FactEvent::Changed { player, game_date } => self.on_changed(&player, game_date).await,
            FactEvent::Reconcile { player, season } => self.on_reconcile(&player, &season).await,
        }
    }

    async fn on_changed(&self, player: &str, game_date: NaiveDate) -> Result<Outcome, EngineError> {
        let fact = self
            .db
            .game_fact(player, game_date)?
            .ok_or_else(|| EngineError::UnknownGameFact {
                player: player.to_string(),
                game_date,
            })?;

        let resolved = self.calendar.resolve(game_date).inspect_err(|e| {
            warn!("Rejected change for {} on {}: {}", player, game_date, e);
        })?;
        if resolved.season != fact.season {
            warn!(
                "Stored season {} for {} on {} disagrees with calendar season {}",
                fact.season, player, game_date, resolved.season
            );
            return Err(EngineError::SeasonMismatch {
                player: player.to_string(),
                game_date,
                stored: fact.season,
                resolved: resolved.season,
            });
        }

        let _claim = InFlight::claim(&self.in_flight, player)?;

        let roster = self.db.roster(player)?;
        if !roster.is_eligible(game_date) {
            warn!("Skipping {} on {}: not on a playable roster", player, game_date);
            return Ok(Outcome::Ineligible);
        }

        let season = self.season_definition(&resolved.season)?;
        let history = self.db.player_history(player, &resolved.season)?;
        let player_season = PlayerSeason::new(season, &history);
        let position = roster.position(self.default_position);

        let mut batch = self
            .aggregator
            .recompute_from(&player_season, player, game_date, position);
        // Snapshots dated off the roster keep whatever row they already have.
        batch.retain_dates(|d| roster.is_eligible(d));
        debug!(
            "{} on {} (week {}): {} snapshots to rewrite as {}, {} to clear",
            player,
            game_date,
            resolved.week_id,
            batch.rows.len(),
            position,
            batch.cleared.len()
        );

        let written = self.writer.upsert(&batch).await?;
        info!(
            "Recomputed {} rows for {} from {} ({})",
            written, player, game_date, resolved.season
        );
        Ok(Outcome::Recomputed {
            season: resolved.season,
            rows: written,
        })
    }

    async fn on_reconcile(&self, player: &str, season_id: &str) -> Result<Outcome, EngineError> {
        let season = self.season_definition(season_id)?;
        let _claim = InFlight::claim(&self.in_flight, player)?;

        let roster = self.db.roster(player)?;
        let history = self.db.player_history(player, season_id)?;
        let player_season = PlayerSeason::new(season, &history);
        let position = roster.position(self.default_position);

        let mut batch = self.aggregator.rebuild(&player_season, player, position);
        batch.retain_dates(|d| roster.is_eligible(d));
        if batch.is_empty() && !player_season.is_empty() {
            warn!("Skipping {} for {}: not on a playable roster", player, season_id);
            return Ok(Outcome::Ineligible);
        }

        let written = self.writer.upsert(&batch).await?;
        debug!("Reconciled {} rows for {} in {}", written, player, season_id);
        Ok(Outcome::Recomputed {
            season: season_id.to_string(),
            rows: written,
        })
    }

    fn season_definition(
        &self,
        season: &str,
    ) -> Result<&courtside_core::calendar::SeasonDefinition, EngineError> {
        self.calendar.season(season).ok_or_else(|| {
            CalendarError::InvalidSeason {
                season: season.to_string(),
                message: "not in the season table".to_string(),
            }
            .into()
        })
    }
}
