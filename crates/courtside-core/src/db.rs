// SQLite persistence for game facts, seasons, roster and running averages.

use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};

use crate::calendar::{seed_seasons, SeasonDefinition};
use crate::efficiency::{Position, PositionalScores};
use crate::facts::GameFact;
use crate::roster::{RosterEntry, RosterStatus};
use crate::window::{AverageBatch, AverageKey, AveragePeriod, RunningAverage, WindowStats};

const GAME_FACT_COLUMNS: &str = "game_date, player, team, opponent, home_game, season,
    minutes_played, field_goals, field_goal_attempts, three_points, three_point_attempts,
    free_throws, free_throw_attempts, offensive_rebounds, defensive_rebounds, assists,
    steals, blocks, turnovers, personal_fouls, points, plus_minus, game_rating_score";

const AVERAGE_COLUMNS: &str = "period, game_date, player, season, week_id,
    minutes_played, field_goals, field_goal_attempts, three_points, three_point_attempts,
    free_throws, free_throw_attempts, offensive_rebounds, defensive_rebounds, total_rebounds,
    assists, steals, blocks, turnovers, personal_fouls, points, plus_minus,
    overall_efficiency, games_played, game_rating_score, minutes_per_game,
    center_player_stats, guard_player_stats, forward_player_stats";

impl FromSql for AveragePeriod {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let name = value.as_str()?;
        AveragePeriod::from_name(name)
            .ok_or_else(|| FromSqlError::Other(format!("unknown average period `{name}`").into()))
    }
}

/// SQLite-backed store. The aggregate tables are written only through
/// [`Database::apply_averages`] and its row-only form
/// [`Database::upsert_averages`].
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a SQLite database at `path`, ensure the schema and
    /// seed seasons exist. Pass `":memory:"` for an ephemeral database.
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("failed to open database at {path}"))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA busy_timeout = 5000;
             PRAGMA foreign_keys = ON;",
        )
        .context("failed to set database pragmas")?;

        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS seasons (
                season        TEXT PRIMARY KEY,
                season_start  TEXT NOT NULL,
                season_end    TEXT NOT NULL,
                playoff_start TEXT NOT NULL,
                playoff_end   TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS game_stats (
                game_date            TEXT NOT NULL,
                player               TEXT NOT NULL,
                team                 TEXT,
                opponent             TEXT,
                home_game            INTEGER NOT NULL DEFAULT 0,
                season               TEXT NOT NULL,
                minutes_played       REAL,
                field_goals          INTEGER,
                field_goal_attempts  INTEGER,
                three_points         INTEGER,
                three_point_attempts INTEGER,
                free_throws          INTEGER,
                free_throw_attempts  INTEGER,
                offensive_rebounds   INTEGER NOT NULL,
                defensive_rebounds   INTEGER NOT NULL,
                assists              INTEGER,
                steals               INTEGER,
                blocks               INTEGER,
                turnovers            INTEGER,
                personal_fouls       INTEGER,
                points               INTEGER,
                plus_minus           INTEGER,
                game_rating_score    REAL NOT NULL DEFAULT 0.0,
                PRIMARY KEY (game_date, player)
            );

            CREATE INDEX IF NOT EXISTS idx_game_stats_team ON game_stats(team);
            CREATE INDEX IF NOT EXISTS idx_game_stats_opponent ON game_stats(opponent);
            CREATE INDEX IF NOT EXISTS idx_game_stats_player_season ON game_stats(player, season);

            CREATE TABLE IF NOT EXISTS team (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                player       TEXT NOT NULL,
                team         TEXT,
                playable     INTEGER NOT NULL DEFAULT 1,
                enroll_date  TEXT NOT NULL,
                release_date TEXT,
                UNIQUE(player, enroll_date)
            );

            CREATE INDEX IF NOT EXISTS idx_team_player ON team(player);

            CREATE TABLE IF NOT EXISTS running_player_averages (
                period               TEXT NOT NULL,
                game_date            TEXT NOT NULL,
                player               TEXT NOT NULL,
                season               TEXT NOT NULL,
                week_id              INTEGER NOT NULL,
                minutes_played       REAL NOT NULL,
                field_goals          REAL NOT NULL,
                field_goal_attempts  REAL NOT NULL,
                three_points         REAL NOT NULL,
                three_point_attempts REAL NOT NULL,
                free_throws          REAL NOT NULL,
                free_throw_attempts  REAL NOT NULL,
                offensive_rebounds   REAL NOT NULL,
                defensive_rebounds   REAL NOT NULL,
                total_rebounds       REAL NOT NULL,
                assists              REAL NOT NULL,
                steals               REAL NOT NULL,
                blocks               REAL NOT NULL,
                turnovers            REAL NOT NULL,
                personal_fouls       REAL NOT NULL,
                points               REAL NOT NULL,
                plus_minus           REAL NOT NULL,
                overall_efficiency   REAL NOT NULL,
                games_played         INTEGER NOT NULL,
                game_rating_score    REAL NOT NULL,
                minutes_per_game     REAL NOT NULL,
                center_player_stats  REAL NOT NULL DEFAULT 0.0,
                guard_player_stats   REAL NOT NULL DEFAULT 0.0,
                forward_player_stats REAL NOT NULL DEFAULT 0.0,
                UNIQUE(period, game_date, player, season)
            );

            CREATE INDEX IF NOT EXISTS idx_averages_player ON running_player_averages(player);
            CREATE INDEX IF NOT EXISTS idx_averages_game_date ON running_player_averages(game_date);
            CREATE INDEX IF NOT EXISTS idx_averages_season ON running_player_averages(season);
            ",
        )
        .context("failed to create database schema")?;

        // Migration: add the position column to roster tables created before
        // positions were tracked. Fails harmlessly when the column exists.
        conn.execute_batch("ALTER TABLE team ADD COLUMN position TEXT;")
            .ok();

        Self::create_period_views(&conn)?;
        Self::insert_seed_seasons(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// One read-only view per window length, named after the period, so
    /// consumers can keep querying `running_player_averages_<period>`.
    fn create_period_views(conn: &Connection) -> Result<()> {
        for period in AveragePeriod::ALL {
            let name = period.name();
            conn.execute_batch(&format!(
                "CREATE VIEW IF NOT EXISTS running_player_averages_{name} AS
                    SELECT * FROM running_player_averages WHERE period = '{name}';"
            ))
            .with_context(|| format!("failed to create view for period {name}"))?;
        }
        Ok(())
    }

    fn insert_seed_seasons(conn: &Connection) -> Result<()> {
        for season in seed_seasons() {
            conn.execute(
                "INSERT OR IGNORE INTO seasons
                    (season, season_start, season_end, playoff_start, playoff_end)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    season.season,
                    season.season_start,
                    season.season_end,
                    season.playoff_start,
                    season.playoff_end,
                ],
            )
            .context("failed to seed seasons")?;
        }
        Ok(())
    }

    /// Acquire the database connection.
    ///
    /// Panics if the mutex is poisoned (another thread panicked while
    /// holding the lock). This should never happen in normal operation.
    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().expect("database mutex poisoned")
    }

    // ------------------------------------------------------------------
    // Seasons
    // ------------------------------------------------------------------

    /// Insert a season or overwrite its boundaries.
    pub fn upsert_season(&self, season: &SeasonDefinition) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO seasons (season, season_start, season_end, playoff_start, playoff_end)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(season) DO UPDATE SET
                season_start  = excluded.season_start,
                season_end    = excluded.season_end,
                playoff_start = excluded.playoff_start,
                playoff_end   = excluded.playoff_end",
            params![
                season.season,
                season.season_start,
                season.season_end,
                season.playoff_start,
                season.playoff_end,
            ],
        )
        .context("failed to upsert season")?;
        Ok(())
    }

    /// All season records, ordered by start date.
    pub fn load_seasons(&self) -> Result<Vec<SeasonDefinition>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT season, season_start, season_end, playoff_start, playoff_end
                 FROM seasons ORDER BY season_start, season",
            )
            .context("failed to prepare load_seasons query")?;

        let seasons = stmt
            .query_map([], |row| {
                Ok(SeasonDefinition {
                    season: row.get(0)?,
                    season_start: row.get(1)?,
                    season_end: row.get(2)?,
                    playoff_start: row.get(3)?,
                    playoff_end: row.get(4)?,
                })
            })
            .context("failed to query seasons")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map season rows")?;

        Ok(seasons)
    }

    // ------------------------------------------------------------------
    // Game facts
    // ------------------------------------------------------------------

    fn write_game_fact(conn: &Connection, fact: &GameFact) -> Result<()> {
        conn.execute(
            &format!(
                "INSERT OR REPLACE INTO game_stats ({GAME_FACT_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23)"
            ),
            params![
                fact.game_date,
                fact.player,
                fact.team,
                fact.opponent,
                fact.home_game,
                fact.season,
                fact.minutes_played,
                fact.field_goals,
                fact.field_goal_attempts,
                fact.three_points,
                fact.three_point_attempts,
                fact.free_throws,
                fact.free_throw_attempts,
                fact.offensive_rebounds,
                fact.defensive_rebounds,
                fact.assists,
                fact.steals,
                fact.blocks,
                fact.turnovers,
                fact.personal_fouls,
                fact.points,
                fact.plus_minus,
                fact.game_rating_score,
            ],
        )
        .with_context(|| {
            format!(
                "failed to write game fact for {} on {}",
                fact.player, fact.game_date
            )
        })?;
        Ok(())
    }

    fn row_to_game_fact(row: &Row<'_>) -> rusqlite::Result<GameFact> {
        Ok(GameFact {
            game_date: row.get(0)?,
            player: row.get(1)?,
            team: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            opponent: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            home_game: row.get(4)?,
            season: row.get(5)?,
            minutes_played: row.get(6)?,
            field_goals: row.get(7)?,
            field_goal_attempts: row.get(8)?,
            three_points: row.get(9)?,
            three_point_attempts: row.get(10)?,
            free_throws: row.get(11)?,
            free_throw_attempts: row.get(12)?,
            offensive_rebounds: row.get(13)?,
            defensive_rebounds: row.get(14)?,
            assists: row.get(15)?,
            steals: row.get(16)?,
            blocks: row.get(17)?,
            turnovers: row.get(18)?,
            personal_fouls: row.get(19)?,
            points: row.get(20)?,
            plus_minus: row.get(21)?,
            game_rating_score: row.get(22)?,
        })
    }

    /// Store one game fact. A fact with the same (game_date, player) key is
    /// replaced in full.
    pub fn upsert_game_fact(&self, fact: &GameFact) -> Result<()> {
        let conn = self.conn();
        Self::write_game_fact(&conn, fact)
    }

    /// Store a day's worth of facts in a single transaction.
    pub fn import_game_facts(&self, facts: &[GameFact]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin import transaction")?;
        for fact in facts {
            Self::write_game_fact(&tx, fact)?;
        }
        tx.commit().context("failed to commit game fact import")?;
        Ok(())
    }

    /// Look up one fact by key.
    pub fn game_fact(&self, player: &str, game_date: NaiveDate) -> Result<Option<GameFact>> {
        let conn = self.conn();
        conn.query_row(
            &format!("SELECT {GAME_FACT_COLUMNS} FROM game_stats WHERE player = ?1 AND game_date = ?2"),
            params![player, game_date],
            Self::row_to_game_fact,
        )
        .optional()
        .context("failed to load game fact")
    }

    /// Every fact for `player` in `season`, ordered by date. Read in one
    /// statement so all window lengths see the same snapshot.
    pub fn player_history(&self, player: &str, season: &str) -> Result<Vec<GameFact>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {GAME_FACT_COLUMNS} FROM game_stats
                 WHERE player = ?1 AND season = ?2 ORDER BY game_date"
            ))
            .context("failed to prepare player_history query")?;

        let facts = stmt
            .query_map(params![player, season], Self::row_to_game_fact)
            .context("failed to query player history")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map game fact rows")?;

        Ok(facts)
    }

    /// Distinct (player, season) pairs with at least one fact, optionally
    /// restricted to one season.
    pub fn players_with_facts(&self, season: Option<&str>) -> Result<Vec<(String, String)>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT DISTINCT player, season FROM game_stats
                 WHERE ?1 IS NULL OR season = ?1
                 ORDER BY season, player",
            )
            .context("failed to prepare players_with_facts query")?;

        let pairs = stmt
            .query_map(params![season], |row| Ok((row.get(0)?, row.get(1)?)))
            .context("failed to query players with facts")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map player rows")?;

        Ok(pairs)
    }

    /// Re-tag every stored fact with the season `resolve` assigns to its
    /// date. Facts whose date resolves to nothing keep their tag. Returns the
    /// number of facts re-tagged.
    pub fn retag_game_facts(
        &self,
        resolve: impl Fn(NaiveDate) -> Option<String>,
    ) -> Result<usize> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin retag transaction")?;

        let keys: Vec<(NaiveDate, String, String)> = {
            let mut stmt = tx
                .prepare("SELECT game_date, player, season FROM game_stats")
                .context("failed to prepare retag query")?;
            let keys = stmt
                .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))
                .context("failed to query fact seasons")?
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("failed to map fact season rows")?;
            keys
        };

        let mut retagged = 0;
        for (game_date, player, season) in keys {
            let Some(resolved) = resolve(game_date) else {
                continue;
            };
            if resolved != season {
                tx.execute(
                    "UPDATE game_stats SET season = ?1 WHERE game_date = ?2 AND player = ?3",
                    params![resolved, game_date, player],
                )
                .with_context(|| format!("failed to retag {player} on {game_date}"))?;
                retagged += 1;
            }
        }

        tx.commit().context("failed to commit retag")?;
        Ok(retagged)
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    /// Insert a roster stint or update the one starting on the same date.
    pub fn upsert_roster_entry(&self, entry: &RosterEntry) -> Result<()> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO team (player, team, position, playable, enroll_date, release_date)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(player, enroll_date) DO UPDATE SET
                team         = excluded.team,
                position     = excluded.position,
                playable     = excluded.playable,
                release_date = excluded.release_date",
            params![
                entry.player,
                entry.team,
                entry.position.map(|p| p.as_str()),
                entry.playable,
                entry.enroll_date,
                entry.release_date,
            ],
        )
        .context("failed to upsert roster entry")?;
        Ok(())
    }

    /// Roster stints for `player`. Unknown position labels read as `None`.
    pub fn roster(&self, player: &str) -> Result<RosterStatus> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(
                "SELECT player, team, position, playable, enroll_date, release_date
                 FROM team WHERE player = ?1 ORDER BY enroll_date",
            )
            .context("failed to prepare roster query")?;

        let entries = stmt
            .query_map(params![player], |row| {
                let position: Option<String> = row.get(2)?;
                Ok(RosterEntry {
                    player: row.get(0)?,
                    team: row.get(1)?,
                    position: position.as_deref().and_then(Position::from_str_pos),
                    playable: row.get(3)?,
                    enroll_date: row.get(4)?,
                    release_date: row.get(5)?,
                })
            })
            .context("failed to query roster")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map roster rows")?;

        Ok(RosterStatus::new(entries))
    }

    // ------------------------------------------------------------------
    // Running averages
    // ------------------------------------------------------------------

    fn write_average(tx: &Transaction<'_>, row: &RunningAverage) -> Result<()> {
        let s = &row.stats;
        let p = &row.scores;
        tx.execute(
            &format!(
                "INSERT INTO running_player_averages ({AVERAGE_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                         ?16, ?17, ?18, ?19, ?20, ?21, ?22, ?23, ?24, ?25, ?26, ?27, ?28, ?29)
                 ON CONFLICT(period, game_date, player, season) DO UPDATE SET
                    week_id              = excluded.week_id,
                    minutes_played       = excluded.minutes_played,
                    field_goals          = excluded.field_goals,
                    field_goal_attempts  = excluded.field_goal_attempts,
                    three_points         = excluded.three_points,
                    three_point_attempts = excluded.three_point_attempts,
                    free_throws          = excluded.free_throws,
                    free_throw_attempts  = excluded.free_throw_attempts,
                    offensive_rebounds   = excluded.offensive_rebounds,
                    defensive_rebounds   = excluded.defensive_rebounds,
                    total_rebounds       = excluded.total_rebounds,
                    assists              = excluded.assists,
                    steals               = excluded.steals,
                    blocks               = excluded.blocks,
                    turnovers            = excluded.turnovers,
                    personal_fouls       = excluded.personal_fouls,
                    points               = excluded.points,
                    plus_minus           = excluded.plus_minus,
                    overall_efficiency   = excluded.overall_efficiency,
                    games_played         = excluded.games_played,
                    game_rating_score    = excluded.game_rating_score,
                    minutes_per_game     = excluded.minutes_per_game,
                    center_player_stats  = excluded.center_player_stats,
                    guard_player_stats   = excluded.guard_player_stats,
                    forward_player_stats = excluded.forward_player_stats"
            ),
            params![
                row.period.name(),
                row.game_date,
                row.player,
                row.season,
                row.week_id,
                s.minutes_played,
                s.field_goals,
                s.field_goal_attempts,
                s.three_points,
                s.three_point_attempts,
                s.free_throws,
                s.free_throw_attempts,
                s.offensive_rebounds,
                s.defensive_rebounds,
                s.total_rebounds,
                s.assists,
                s.steals,
                s.blocks,
                s.turnovers,
                s.personal_fouls,
                s.points,
                s.plus_minus,
                s.overall_efficiency,
                s.games_played,
                s.game_rating_score,
                s.minutes_per_game,
                p.center_player_stats,
                p.guard_player_stats,
                p.forward_player_stats,
            ],
        )
        .with_context(|| {
            format!(
                "failed to upsert {} average for {} on {}",
                row.period, row.player, row.game_date
            )
        })?;
        Ok(())
    }

    fn delete_average(tx: &Transaction<'_>, key: &AverageKey) -> Result<()> {
        tx.execute(
            "DELETE FROM running_player_averages
             WHERE period = ?1 AND game_date = ?2 AND player = ?3 AND season = ?4",
            params![key.period.name(), key.game_date, key.player, key.season],
        )
        .with_context(|| {
            format!(
                "failed to clear {} average for {} on {}",
                key.period, key.player, key.game_date
            )
        })?;
        Ok(())
    }

    fn commit_averages(&self, rows: &[RunningAverage], cleared: &[AverageKey]) -> Result<()> {
        let mut conn = self.conn();
        let tx = conn
            .transaction()
            .context("failed to begin averages transaction")?;
        for row in rows {
            Self::write_average(&tx, row)?;
        }
        for key in cleared {
            Self::delete_average(&tx, key)?;
        }
        tx.commit().context("failed to commit averages")?;
        Ok(())
    }

    /// Write-or-replace a batch of average rows in one transaction. Every
    /// column is overwritten, so readers see either the old row or the new
    /// row, never a mix.
    pub fn upsert_averages(&self, rows: &[RunningAverage]) -> Result<()> {
        self.commit_averages(rows, &[])
    }

    /// Apply a recompute: write its rows and delete its cleared keys, all in
    /// one transaction.
    pub fn apply_averages(&self, batch: &AverageBatch) -> Result<()> {
        self.commit_averages(&batch.rows, &batch.cleared)
    }

    /// Delete average rows with no game fact under the same (player,
    /// game_date, season). Returns the number of rows removed.
    pub fn prune_orphan_averages(&self) -> Result<usize> {
        let conn = self.conn();
        conn.execute(
            "DELETE FROM running_player_averages
             WHERE NOT EXISTS (
                SELECT 1 FROM game_stats g
                WHERE g.player = running_player_averages.player
                  AND g.game_date = running_player_averages.game_date
                  AND g.season = running_player_averages.season
             )",
            [],
        )
        .context("failed to prune orphan averages")
    }

    fn row_to_average(row: &Row<'_>) -> rusqlite::Result<RunningAverage> {
        Ok(RunningAverage {
            period: row.get(0)?,
            game_date: row.get(1)?,
            player: row.get(2)?,
            season: row.get(3)?,
            week_id: row.get(4)?,
            stats: WindowStats {
                minutes_played: row.get(5)?,
                field_goals: row.get(6)?,
                field_goal_attempts: row.get(7)?,
                three_points: row.get(8)?,
                three_point_attempts: row.get(9)?,
                free_throws: row.get(10)?,
                free_throw_attempts: row.get(11)?,
                offensive_rebounds: row.get(12)?,
                defensive_rebounds: row.get(13)?,
                total_rebounds: row.get(14)?,
                assists: row.get(15)?,
                steals: row.get(16)?,
                blocks: row.get(17)?,
                turnovers: row.get(18)?,
                personal_fouls: row.get(19)?,
                points: row.get(20)?,
                plus_minus: row.get(21)?,
                overall_efficiency: row.get(22)?,
                games_played: row.get(23)?,
                game_rating_score: row.get(24)?,
                minutes_per_game: row.get(25)?,
            },
            scores: PositionalScores {
                center_player_stats: row.get(26)?,
                guard_player_stats: row.get(27)?,
                forward_player_stats: row.get(28)?,
            },
        })
    }

    fn query_averages(
        &self,
        sql: &str,
        params: &[&dyn rusqlite::ToSql],
    ) -> Result<Vec<RunningAverage>> {
        let conn = self.conn();
        let mut stmt = conn
            .prepare(sql)
            .context("failed to prepare averages query")?;

        let averages = stmt
            .query_map(params, Self::row_to_average)
            .context("failed to query averages")?
            .collect::<std::result::Result<Vec<_>, _>>()
            .context("failed to map average rows")?;
        Ok(averages)
    }

    /// A player's rows for one window length, ordered by date. `season`
    /// narrows to one season when given.
    pub fn load_averages(
        &self,
        player: &str,
        period: AveragePeriod,
        season: Option<&str>,
    ) -> Result<Vec<RunningAverage>> {
        self.query_averages(
            &format!(
                "SELECT {AVERAGE_COLUMNS} FROM running_player_averages
                 WHERE player = ?1 AND period = ?2 AND (?3 IS NULL OR season = ?3)
                 ORDER BY season, game_date"
            ),
            params![player, period.name(), season],
        )
    }

    /// Every row for `player` across all window lengths.
    pub fn load_all_averages(&self, player: &str) -> Result<Vec<RunningAverage>> {
        self.query_averages(
            &format!(
                "SELECT {AVERAGE_COLUMNS} FROM running_player_averages
                 WHERE player = ?1 ORDER BY period, season, game_date"
            ),
            params![player],
        )
    }

    /// Total number of average rows, across all players and periods.
    pub fn average_count(&self) -> Result<usize> {
        let conn = self.conn();
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM running_player_averages", [], |row| {
                row.get(0)
            })
            .context("failed to count averages")?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Helper: create a fresh in-memory database for each test.
    fn test_db() -> Database {
        Database::open(":memory:").expect("in-memory database should open")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_fact(player: &str, game_date: NaiveDate, points: u32) -> GameFact {
        GameFact {
            game_date,
            player: player.to_string(),
            team: "DEN".to_string(),
            opponent: "PHX".to_string(),
            home_game: true,
            season: "2022-23".to_string(),
            minutes_played: Some(34.5),
            field_goals: Some(9),
            field_goal_attempts: Some(15),
            three_points: None,
            three_point_attempts: None,
            free_throws: Some(4),
            free_throw_attempts: Some(4),
            offensive_rebounds: 3,
            defensive_rebounds: 9,
            assists: Some(10),
            steals: Some(1),
            blocks: Some(1),
            turnovers: Some(3),
            personal_fouls: Some(2),
            points: Some(points),
            plus_minus: Some(-4),
            game_rating_score: 27.3,
        }
    }

    fn sample_average(player: &str, period: AveragePeriod, points: f64) -> RunningAverage {
        RunningAverage {
            period,
            game_date: date(2022, 11, 2),
            player: player.to_string(),
            season: "2022-23".to_string(),
            week_id: 3,
            stats: WindowStats {
                points,
                offensive_rebounds: 2.0,
                defensive_rebounds: 5.0,
                total_rebounds: 7.0,
                games_played: 3,
                ..Default::default()
            },
            scores: PositionalScores {
                center_player_stats: 1.5,
                ..Default::default()
            },
        }
    }

    // ------------------------------------------------------------------
    // Schema / open
    // ------------------------------------------------------------------

    #[test]
    fn open_creates_tables_and_views() {
        let db = test_db();
        let conn = db.conn();

        let names: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type IN ('table', 'view') ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<Result<Vec<_>, _>>()
            .unwrap();

        for expected in [
            "game_stats",
            "seasons",
            "team",
            "running_player_averages",
            "running_player_averages_one_week",
            "running_player_averages_three_week",
            "running_player_averages_nine_week",
        ] {
            assert!(names.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn open_seeds_three_seasons() {
        let db = test_db();
        let seasons = db.load_seasons().unwrap();
        let ids: Vec<&str> = seasons.iter().map(|s| s.season.as_str()).collect();
        assert_eq!(ids, vec!["2020-21", "2021-22", "2022-23"]);
    }

    #[test]
    fn reopening_a_file_database_is_idempotent() {
        let dir = std::env::temp_dir().join(format!("courtside_db_test_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("reopen.db");
        let path = path.to_str().unwrap();

        {
            let db = Database::open(path).unwrap();
            db.upsert_game_fact(&sample_fact("A", date(2022, 11, 1), 10))
                .unwrap();
        }
        let db = Database::open(path).unwrap();
        assert_eq!(db.load_seasons().unwrap().len(), 3);
        assert!(db.game_fact("A", date(2022, 11, 1)).unwrap().is_some());

        let _ = std::fs::remove_dir_all(&dir);
    }

    // ------------------------------------------------------------------
    // Seasons
    // ------------------------------------------------------------------

    #[test]
    fn upsert_season_overwrites_boundaries() {
        let db = test_db();
        let mut season = seed_seasons()[2].clone();
        season.playoff_end = date(2023, 6, 20);
        db.upsert_season(&season).unwrap();

        let loaded = db.load_seasons().unwrap();
        assert_eq!(loaded.len(), 3);
        let stored = loaded.iter().find(|s| s.season == "2022-23").unwrap();
        assert_eq!(stored.playoff_end, date(2023, 6, 20));
    }

    // ------------------------------------------------------------------
    // Game facts
    // ------------------------------------------------------------------

    #[test]
    fn game_fact_round_trip_preserves_nulls() {
        let db = test_db();
        let fact = sample_fact("Nikola Jokic", date(2022, 11, 1), 28);
        db.upsert_game_fact(&fact).unwrap();

        let loaded = db
            .game_fact("Nikola Jokic", date(2022, 11, 1))
            .unwrap()
            .unwrap();
        assert_eq!(loaded, fact);
        assert_eq!(loaded.three_points, None);
    }

    #[test]
    fn game_fact_missing_returns_none() {
        let db = test_db();
        assert!(db.game_fact("Nobody", date(2022, 11, 1)).unwrap().is_none());
    }

    #[test]
    fn correction_replaces_whole_fact() {
        let db = test_db();
        db.upsert_game_fact(&sample_fact("A", date(2022, 11, 1), 10))
            .unwrap();

        let mut corrected = sample_fact("A", date(2022, 11, 1), 50);
        corrected.assists = None;
        db.upsert_game_fact(&corrected).unwrap();

        let loaded = db.game_fact("A", date(2022, 11, 1)).unwrap().unwrap();
        assert_eq!(loaded.points, Some(50));
        assert_eq!(loaded.assists, None);
    }

    #[test]
    fn player_history_is_ordered_and_scoped() {
        let db = test_db();
        db.import_game_facts(&[
            sample_fact("A", date(2022, 11, 9), 30),
            sample_fact("A", date(2022, 10, 19), 10),
            sample_fact("B", date(2022, 10, 26), 99),
        ])
        .unwrap();
        let mut other_season = sample_fact("A", date(2022, 3, 1), 5);
        other_season.season = "2021-22".to_string();
        db.upsert_game_fact(&other_season).unwrap();

        let history = db.player_history("A", "2022-23").unwrap();
        let dates: Vec<NaiveDate> = history.iter().map(|f| f.game_date).collect();
        assert_eq!(dates, vec![date(2022, 10, 19), date(2022, 11, 9)]);
    }

    #[test]
    fn players_with_facts_filters_by_season() {
        let db = test_db();
        db.upsert_game_fact(&sample_fact("A", date(2022, 11, 1), 10))
            .unwrap();
        db.upsert_game_fact(&sample_fact("B", date(2022, 11, 1), 10))
            .unwrap();
        let mut old = sample_fact("C", date(2022, 3, 1), 10);
        old.season = "2021-22".to_string();
        db.upsert_game_fact(&old).unwrap();

        assert_eq!(db.players_with_facts(None).unwrap().len(), 3);
        let current = db.players_with_facts(Some("2022-23")).unwrap();
        assert_eq!(
            current,
            vec![
                ("A".to_string(), "2022-23".to_string()),
                ("B".to_string(), "2022-23".to_string()),
            ]
        );
    }

    // ------------------------------------------------------------------
    // Roster
    // ------------------------------------------------------------------

    #[test]
    fn roster_round_trip_and_update() {
        let db = test_db();
        let mut entry = RosterEntry {
            player: "A".to_string(),
            team: Some("DEN".to_string()),
            position: Some(Position::Center),
            playable: true,
            enroll_date: date(2022, 10, 1),
            release_date: None,
        };
        db.upsert_roster_entry(&entry).unwrap();
        entry.release_date = Some(date(2022, 12, 1));
        db.upsert_roster_entry(&entry).unwrap();

        let status = db.roster("A").unwrap();
        assert_eq!(status.entries().len(), 1);
        assert_eq!(status.entries()[0], entry);
        assert_eq!(status.position(Position::Guard), Position::Center);
    }

    #[test]
    fn roster_for_unknown_player_is_empty() {
        let db = test_db();
        assert!(db.roster("Nobody").unwrap().entries().is_empty());
    }

    // ------------------------------------------------------------------
    // Running averages
    // ------------------------------------------------------------------

    #[test]
    fn upsert_averages_round_trip() {
        let db = test_db();
        let row = sample_average("A", AveragePeriod::ThreeWeek, 20.0);
        db.upsert_averages(std::slice::from_ref(&row)).unwrap();

        let loaded = db
            .load_averages("A", AveragePeriod::ThreeWeek, Some("2022-23"))
            .unwrap();
        assert_eq!(loaded, vec![row]);
    }

    #[test]
    fn upsert_averages_replaces_on_key() {
        let db = test_db();
        db.upsert_averages(&[sample_average("A", AveragePeriod::OneWeek, 10.0)])
            .unwrap();
        db.upsert_averages(&[sample_average("A", AveragePeriod::OneWeek, 50.0)])
            .unwrap();

        let loaded = db.load_averages("A", AveragePeriod::OneWeek, None).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].stats.points, 50.0);
        assert_eq!(db.average_count().unwrap(), 1);
    }

    #[test]
    fn periods_are_stored_side_by_side() {
        let db = test_db();
        db.upsert_averages(&[
            sample_average("A", AveragePeriod::OneWeek, 30.0),
            sample_average("A", AveragePeriod::ThreeWeek, 20.0),
            sample_average("A", AveragePeriod::NineWeek, 20.0),
        ])
        .unwrap();

        assert_eq!(db.average_count().unwrap(), 3);
        assert_eq!(db.load_all_averages("A").unwrap().len(), 3);

        let conn = db.conn();
        let in_view: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM running_player_averages_three_week",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(in_view, 1);
    }

    #[test]
    fn load_averages_scopes_to_player() {
        let db = test_db();
        db.upsert_averages(&[
            sample_average("A", AveragePeriod::OneWeek, 30.0),
            sample_average("B", AveragePeriod::OneWeek, 12.0),
        ])
        .unwrap();
        let loaded = db.load_averages("B", AveragePeriod::OneWeek, None).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].player, "B");
    }

    #[test]
    fn apply_averages_writes_rows_and_deletes_cleared_keys() {
        let db = test_db();
        let stale = sample_average("A", AveragePeriod::OneWeek, 10.0);
        db.upsert_averages(std::slice::from_ref(&stale)).unwrap();

        let fresh = sample_average("A", AveragePeriod::NineWeek, 18.0);
        db.apply_averages(&AverageBatch {
            rows: vec![fresh.clone()],
            cleared: vec![stale.key()],
        })
        .unwrap();

        assert_eq!(db.load_all_averages("A").unwrap(), vec![fresh]);
    }

    #[test]
    fn unknown_period_label_fails_the_read() {
        let db = test_db();
        db.upsert_averages(&[sample_average("A", AveragePeriod::OneWeek, 10.0)])
            .unwrap();
        db.conn()
            .execute(
                "UPDATE running_player_averages SET period = 'two_week'",
                [],
            )
            .unwrap();

        let err = db.load_all_averages("A").unwrap_err();
        assert!(format!("{err:#}").contains("two_week"), "got: {err:#}");
    }

    #[test]
    fn retag_moves_facts_to_the_resolved_season() {
        let db = test_db();
        let mut mistagged = sample_fact("A", date(2022, 11, 1), 10);
        mistagged.season = "2021-22".to_string();
        db.upsert_game_fact(&mistagged).unwrap();
        db.upsert_game_fact(&sample_fact("B", date(2022, 11, 1), 10))
            .unwrap();

        let retagged = db
            .retag_game_facts(|_| Some("2022-23".to_string()))
            .unwrap();
        assert_eq!(retagged, 1);
        let loaded = db.game_fact("A", date(2022, 11, 1)).unwrap().unwrap();
        assert_eq!(loaded.season, "2022-23");

        assert_eq!(db.retag_game_facts(|_| None).unwrap(), 0);
    }

    #[test]
    fn prune_drops_averages_without_a_matching_fact() {
        let db = test_db();
        db.upsert_game_fact(&sample_fact("A", date(2022, 11, 2), 10))
            .unwrap();
        let kept = sample_average("A", AveragePeriod::OneWeek, 10.0);
        let mut wrong_season = sample_average("A", AveragePeriod::ThreeWeek, 10.0);
        wrong_season.season = "2021-22".to_string();
        let no_fact = sample_average("B", AveragePeriod::OneWeek, 10.0);
        db.upsert_averages(&[kept.clone(), wrong_season, no_fact])
            .unwrap();

        assert_eq!(db.prune_orphan_averages().unwrap(), 2);
        assert_eq!(db.average_count().unwrap(), 1);
        assert_eq!(db.load_all_averages("A").unwrap(), vec![kept]);
    }
}
