// Rolling-window aggregation over a player's season history.
//
// Every average row is a pure function of the GameFacts it covers: the
// aggregator never mutates an accumulator across events, it recomputes the
// snapshot for each affected game date from the full history. Identical
// history in, bit-identical rows out.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::calendar::SeasonDefinition;
use crate::efficiency::{Position, PositionScorer, PositionalScores};
use crate::facts::{efficiency_of, GameFact, StatLine};

// ---------------------------------------------------------------------------
// Window lengths
// ---------------------------------------------------------------------------

/// Trailing window length, in weeks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AveragePeriod {
    OneWeek,
    ThreeWeek,
    NineWeek,
}

impl AveragePeriod {
    pub const ALL: [AveragePeriod; 3] = [
        AveragePeriod::OneWeek,
        AveragePeriod::ThreeWeek,
        AveragePeriod::NineWeek,
    ];

    pub fn weeks(&self) -> u32 {
        match self {
            AveragePeriod::OneWeek => 1,
            AveragePeriod::ThreeWeek => 3,
            AveragePeriod::NineWeek => 9,
        }
    }

    /// Discriminant stored in the `period` column.
    pub fn name(&self) -> &'static str {
        match self {
            AveragePeriod::OneWeek => "one_week",
            AveragePeriod::ThreeWeek => "three_week",
            AveragePeriod::NineWeek => "nine_week",
        }
    }

    pub fn from_name(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == s.trim())
    }

    /// First week included in a window ending at `week_id`, clamped to the
    /// season's first week.
    pub fn first_week(&self, week_id: u32) -> u32 {
        (week_id + 1).saturating_sub(self.weeks()).max(1)
    }
}

impl fmt::Display for AveragePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Window statistics
// ---------------------------------------------------------------------------

/// Arithmetic mean over the values that are present. Absent values count in
/// neither the numerator nor the denominator.
#[derive(Debug, Clone, Copy, Default)]
struct Mean {
    sum: f64,
    count: u32,
}

impl Mean {
    fn add(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn add_u32(&mut self, value: Option<u32>) {
        self.add(value.map(f64::from));
    }

    fn value(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.sum / f64::from(self.count)
        }
    }
}

/// Per-game averages over one window of GameFacts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WindowStats {
    pub minutes_played: f64,
    pub field_goals: f64,
    pub field_goal_attempts: f64,
    pub three_points: f64,
    pub three_point_attempts: f64,
    pub free_throws: f64,
    pub free_throw_attempts: f64,
    pub offensive_rebounds: f64,
    pub defensive_rebounds: f64,
    /// Always `offensive_rebounds + defensive_rebounds`.
    pub total_rebounds: f64,
    pub assists: f64,
    pub steals: f64,
    pub blocks: f64,
    pub turnovers: f64,
    pub personal_fouls: f64,
    pub points: f64,
    pub plus_minus: f64,
    /// Mean single-game efficiency over every fact not recorded as a DNP.
    pub overall_efficiency: f64,
    /// Facts in the window with non-zero minutes.
    pub games_played: u32,
    /// Mean single-game rating over every fact not recorded as a DNP.
    pub game_rating_score: f64,
    pub minutes_per_game: f64,
}

impl WindowStats {
    /// Aggregate the given facts. Iteration order must be stable (callers
    /// pass date order) so float sums are reproducible.
    pub fn from_facts<'a>(facts: impl IntoIterator<Item = &'a GameFact>) -> Self {
        let mut minutes = Mean::default();
        let mut fg = Mean::default();
        let mut fga = Mean::default();
        let mut tp = Mean::default();
        let mut tpa = Mean::default();
        let mut ft = Mean::default();
        let mut fta = Mean::default();
        let mut orb = Mean::default();
        let mut drb = Mean::default();
        let mut ast = Mean::default();
        let mut stl = Mean::default();
        let mut blk = Mean::default();
        let mut tov = Mean::default();
        let mut pf = Mean::default();
        let mut pts = Mean::default();
        let mut pm = Mean::default();

        let mut games_played = 0u32;
        let mut minutes_sum = 0.0;
        let mut efficiency = Mean::default();
        let mut rating = Mean::default();

        for fact in facts {
            minutes.add(fact.minutes_played);
            fg.add_u32(fact.field_goals);
            fga.add_u32(fact.field_goal_attempts);
            tp.add_u32(fact.three_points);
            tpa.add_u32(fact.three_point_attempts);
            ft.add_u32(fact.free_throws);
            fta.add_u32(fact.free_throw_attempts);
            orb.add_u32(Some(fact.offensive_rebounds));
            drb.add_u32(Some(fact.defensive_rebounds));
            ast.add_u32(fact.assists);
            stl.add_u32(fact.steals);
            blk.add_u32(fact.blocks);
            tov.add_u32(fact.turnovers);
            pf.add_u32(fact.personal_fouls);
            pts.add_u32(fact.points);
            pm.add(fact.plus_minus.map(f64::from));

            if !fact.did_not_play() {
                efficiency.add(Some(efficiency_of(&StatLine::from(fact))));
                rating.add(Some(fact.game_rating_score));
            }
            if fact.played() {
                games_played += 1;
                minutes_sum += fact.minutes_played.unwrap_or(0.0);
            }
        }

        let offensive_rebounds = orb.value();
        let defensive_rebounds = drb.value();
        WindowStats {
            minutes_played: minutes.value(),
            field_goals: fg.value(),
            field_goal_attempts: fga.value(),
            three_points: tp.value(),
            three_point_attempts: tpa.value(),
            free_throws: ft.value(),
            free_throw_attempts: fta.value(),
            offensive_rebounds,
            defensive_rebounds,
            total_rebounds: offensive_rebounds + defensive_rebounds,
            assists: ast.value(),
            steals: stl.value(),
            blocks: blk.value(),
            turnovers: tov.value(),
            personal_fouls: pf.value(),
            points: pts.value(),
            plus_minus: pm.value(),
            overall_efficiency: efficiency.value(),
            games_played,
            game_rating_score: rating.value(),
            minutes_per_game: if games_played == 0 {
                0.0
            } else {
                minutes_sum / f64::from(games_played)
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Output row
// ---------------------------------------------------------------------------

/// "As of `game_date`, `player`'s trailing `period` average is ...".
/// Unique per (period, game_date, player, season).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunningAverage {
    pub period: AveragePeriod,
    pub game_date: NaiveDate,
    pub player: String,
    pub season: String,
    pub week_id: u32,
    #[serde(flatten)]
    pub stats: WindowStats,
    #[serde(flatten)]
    pub scores: PositionalScores,
}

impl RunningAverage {
    pub fn key(&self) -> AverageKey {
        AverageKey {
            period: self.period,
            game_date: self.game_date,
            player: self.player.clone(),
            season: self.season.clone(),
        }
    }
}

/// Storage key of one snapshot row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AverageKey {
    pub period: AveragePeriod,
    pub game_date: NaiveDate,
    pub player: String,
    pub season: String,
}

/// The outcome of one recompute: rows to write-or-replace, and snapshot keys
/// whose window no longer holds a played game and so must not carry a row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AverageBatch {
    pub rows: Vec<RunningAverage>,
    pub cleared: Vec<AverageKey>,
}

impl AverageBatch {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.cleared.is_empty()
    }

    /// Drop every snapshot, written or cleared, dated where `keep` is false.
    pub fn retain_dates(&mut self, keep: impl Fn(NaiveDate) -> bool) {
        self.rows.retain(|r| keep(r.game_date));
        self.cleared.retain(|k| keep(k.game_date));
    }
}

// ---------------------------------------------------------------------------
// Player season history
// ---------------------------------------------------------------------------

/// One player's facts for one season, in date order, each tagged with its
/// week ordinal. Built once per event so every window length reads the same
/// snapshot.
#[derive(Debug, Clone)]
pub struct PlayerSeason<'a> {
    season: &'a SeasonDefinition,
    facts: Vec<(u32, &'a GameFact)>,
}

impl<'a> PlayerSeason<'a> {
    /// Facts outside the season's date range or tagged with another season
    /// are dropped.
    pub fn new(season: &'a SeasonDefinition, facts: &'a [GameFact]) -> Self {
        let mut tagged: Vec<(u32, &GameFact)> = facts
            .iter()
            .filter(|f| f.season == season.season && season.contains(f.game_date))
            .map(|f| (season.week_of(f.game_date), f))
            .collect();
        tagged.sort_by(|a, b| {
            a.1.game_date
                .cmp(&b.1.game_date)
                .then_with(|| a.1.player.cmp(&b.1.player))
        });
        PlayerSeason {
            season,
            facts: tagged,
        }
    }

    pub fn season(&self) -> &SeasonDefinition {
        self.season
    }

    pub fn is_empty(&self) -> bool {
        self.facts.is_empty()
    }

    pub fn len(&self) -> usize {
        self.facts.len()
    }

    /// Game dates on record, ascending.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.facts.iter().map(|(_, f)| f.game_date)
    }

    /// Facts eligible for the `period` window ending at `as_of`: same
    /// season, week in `[week(as_of) - W + 1, week(as_of)]`, dated on or
    /// before `as_of`.
    pub fn window(&self, as_of: NaiveDate, period: AveragePeriod) -> Vec<&'a GameFact> {
        let last_week = self.season.week_of(as_of);
        let first_week = period.first_week(last_week);
        self.facts
            .iter()
            .filter(|(week, f)| *week >= first_week && *week <= last_week && f.game_date <= as_of)
            .map(|(_, f)| *f)
            .collect()
    }

    /// Snapshot dates whose `period` window includes a change on `changed`:
    /// every game date on record from `changed` through the last day of week
    /// `week(changed) + W - 1`.
    pub fn affected_dates(&self, changed: NaiveDate, period: AveragePeriod) -> Vec<NaiveDate> {
        let last_affected_week = self.season.week_of(changed) + period.weeks() - 1;
        self.facts
            .iter()
            .filter(|(week, f)| f.game_date >= changed && *week <= last_affected_week)
            .map(|(_, f)| f.game_date)
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Aggregator
// ---------------------------------------------------------------------------

/// Recomputes running-average rows for the configured window lengths.
#[derive(Debug, Clone)]
pub struct WindowAggregator {
    periods: Vec<AveragePeriod>,
    scorer: PositionScorer,
}

impl WindowAggregator {
    pub fn new(periods: Vec<AveragePeriod>, scorer: PositionScorer) -> Self {
        let mut periods = periods;
        periods.sort();
        periods.dedup();
        Self { periods, scorer }
    }

    pub fn periods(&self) -> &[AveragePeriod] {
        &self.periods
    }

    /// Build the row for one snapshot date. `None` when the window holds no
    /// game with court time.
    pub fn snapshot(
        &self,
        history: &PlayerSeason<'_>,
        player: &str,
        as_of: NaiveDate,
        period: AveragePeriod,
        position: Position,
    ) -> Option<RunningAverage> {
        let stats = WindowStats::from_facts(history.window(as_of, period));
        if stats.games_played == 0 {
            return None;
        }
        Some(RunningAverage {
            period,
            game_date: as_of,
            player: player.to_string(),
            season: history.season().season.clone(),
            week_id: history.season().week_of(as_of),
            stats,
            scores: self.scorer.scores(position, &stats),
        })
    }

    /// Snapshots to rewrite after the fact on `changed` was written or
    /// replaced: for every period, each later snapshot whose window overlaps
    /// it.
    pub fn recompute_from(
        &self,
        history: &PlayerSeason<'_>,
        player: &str,
        changed: NaiveDate,
        position: Position,
    ) -> AverageBatch {
        self.collect(history, player, position, |period| {
            history.affected_dates(changed, period)
        })
    }

    /// Every snapshot for every period (the reconciliation sweep).
    pub fn rebuild(
        &self,
        history: &PlayerSeason<'_>,
        player: &str,
        position: Position,
    ) -> AverageBatch {
        self.collect(history, player, position, |_| history.dates().collect())
    }

    fn collect(
        &self,
        history: &PlayerSeason<'_>,
        player: &str,
        position: Position,
        dates_for: impl Fn(AveragePeriod) -> Vec<NaiveDate>,
    ) -> AverageBatch {
        let mut batch = AverageBatch::default();
        for &period in &self.periods {
            for date in dates_for(period) {
                match self.snapshot(history, player, date, period, position) {
                    Some(row) => batch.rows.push(row),
                    None => batch.cleared.push(AverageKey {
                        period,
                        game_date: date,
                        player: player.to_string(),
                        season: history.season().season.clone(),
                    }),
                }
            }
        }
        batch
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::seed_seasons;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn season() -> SeasonDefinition {
        seed_seasons()
            .into_iter()
            .find(|s| s.season == "2022-23")
            .unwrap()
    }

    fn fact(game_date: NaiveDate, points: u32) -> GameFact {
        GameFact {
            game_date,
            player: "Test Player".into(),
            team: "DEN".into(),
            opponent: "LAL".into(),
            home_game: true,
            season: "2022-23".into(),
            minutes_played: Some(30.0),
            field_goals: Some(0),
            field_goal_attempts: Some(0),
            three_points: Some(0),
            three_point_attempts: Some(0),
            free_throws: Some(0),
            free_throw_attempts: Some(0),
            offensive_rebounds: 0,
            defensive_rebounds: 0,
            assists: Some(0),
            steals: Some(0),
            blocks: Some(0),
            turnovers: Some(0),
            personal_fouls: Some(0),
            points: Some(points),
            plus_minus: Some(0),
            game_rating_score: f64::from(points),
        }
    }

    fn aggregator() -> WindowAggregator {
        WindowAggregator::new(AveragePeriod::ALL.to_vec(), PositionScorer::default())
    }

    // Week 1 starts 2022-10-18, week 2 on 10-25, week 3 on 11-01.
    fn three_weeks() -> Vec<GameFact> {
        vec![
            fact(date(2022, 10, 19), 10),
            fact(date(2022, 10, 26), 20),
            fact(date(2022, 11, 2), 30),
        ]
    }

    #[test]
    fn period_names_round_trip() {
        for p in AveragePeriod::ALL {
            assert_eq!(AveragePeriod::from_name(p.name()), Some(p));
        }
        assert_eq!(AveragePeriod::from_name("two_week"), None);
    }

    #[test]
    fn first_week_clamps_to_season_start() {
        assert_eq!(AveragePeriod::NineWeek.first_week(3), 1);
        assert_eq!(AveragePeriod::ThreeWeek.first_week(10), 8);
        assert_eq!(AveragePeriod::OneWeek.first_week(4), 4);
    }

    #[test]
    fn three_week_average_over_three_games() {
        let season = season();
        let facts = three_weeks();
        let history = PlayerSeason::new(&season, &facts);
        let row = aggregator()
            .snapshot(
                &history,
                "Test Player",
                date(2022, 11, 2),
                AveragePeriod::ThreeWeek,
                Position::Guard,
            )
            .unwrap();
        assert!((row.stats.points - 20.0).abs() < 1e-12);
        assert_eq!(row.stats.games_played, 3);
        assert_eq!(row.week_id, 3);
    }

    #[test]
    fn one_week_window_only_sees_current_week() {
        let season = season();
        let facts = three_weeks();
        let history = PlayerSeason::new(&season, &facts);
        let row = aggregator()
            .snapshot(
                &history,
                "Test Player",
                date(2022, 11, 2),
                AveragePeriod::OneWeek,
                Position::Guard,
            )
            .unwrap();
        assert!((row.stats.points - 30.0).abs() < 1e-12);
        assert_eq!(row.stats.games_played, 1);
    }

    #[test]
    fn later_games_in_same_week_are_excluded() {
        let season = season();
        let facts = vec![fact(date(2022, 11, 1), 10), fact(date(2022, 11, 3), 50)];
        let history = PlayerSeason::new(&season, &facts);
        let window = history.window(date(2022, 11, 1), AveragePeriod::OneWeek);
        assert_eq!(window.len(), 1);
    }

    #[test]
    fn nulls_are_excluded_per_category() {
        let mut a = fact(date(2022, 10, 19), 10);
        a.free_throws = None;
        a.offensive_rebounds = 4;
        let mut b = fact(date(2022, 10, 20), 20);
        b.free_throws = Some(6);
        b.offensive_rebounds = 2;

        let stats = WindowStats::from_facts([&a, &b]);
        assert!((stats.free_throws - 6.0).abs() < 1e-12);
        assert!((stats.offensive_rebounds - 3.0).abs() < 1e-12);
        assert!((stats.points - 15.0).abs() < 1e-12);
    }

    #[test]
    fn total_rebounds_is_sum_of_split_averages() {
        let mut a = fact(date(2022, 10, 19), 0);
        a.offensive_rebounds = 3;
        a.defensive_rebounds = 7;
        let mut b = fact(date(2022, 10, 20), 0);
        b.offensive_rebounds = 1;
        b.defensive_rebounds = 4;

        let stats = WindowStats::from_facts([&a, &b]);
        assert_eq!(
            stats.total_rebounds,
            stats.offensive_rebounds + stats.defensive_rebounds
        );
        assert!((stats.total_rebounds - 7.5).abs() < 1e-12);
    }

    #[test]
    fn games_played_counts_only_nonzero_minutes() {
        let a = fact(date(2022, 10, 19), 10);
        let mut dnp = fact(date(2022, 10, 20), 0);
        dnp.minutes_played = Some(0.0);
        let mut untracked = fact(date(2022, 10, 21), 0);
        untracked.minutes_played = None;

        let stats = WindowStats::from_facts([&a, &dnp, &untracked]);
        assert_eq!(stats.games_played, 1);
        assert!((stats.minutes_per_game - 30.0).abs() < 1e-12);
        // DNP minutes count toward the per-category mean; untracked ones do not.
        assert!((stats.minutes_played - 15.0).abs() < 1e-12);
    }

    #[test]
    fn untracked_minutes_still_count_toward_efficiency_and_rating() {
        let mut untracked = fact(date(2022, 10, 19), 20);
        untracked.minutes_played = None;
        untracked.game_rating_score = 30.0;

        let stats = WindowStats::from_facts([&untracked]);
        assert_eq!(stats.games_played, 0);
        assert!((stats.points - 20.0).abs() < 1e-12);
        assert!((stats.overall_efficiency - 20.0).abs() < 1e-12);
        assert!((stats.game_rating_score - 30.0).abs() < 1e-12);
        assert_eq!(stats.minutes_per_game, 0.0);
    }

    #[test]
    fn dnp_games_are_left_out_of_efficiency_and_rating() {
        let a = fact(date(2022, 10, 19), 10);
        let mut dnp = fact(date(2022, 10, 20), 0);
        dnp.minutes_played = Some(0.0);

        let stats = WindowStats::from_facts([&a, &dnp]);
        assert!((stats.overall_efficiency - 10.0).abs() < 1e-12);
        assert!((stats.game_rating_score - 10.0).abs() < 1e-12);
        assert!((stats.points - 5.0).abs() < 1e-12);
    }

    #[test]
    fn window_without_court_time_is_cleared_not_written() {
        let season = season();
        let mut dnp = fact(date(2022, 10, 19), 0);
        dnp.minutes_played = Some(0.0);
        let facts = vec![dnp, fact(date(2022, 11, 2), 12)];
        let history = PlayerSeason::new(&season, &facts);

        let batch = aggregator().rebuild(&history, "Test Player", Position::Guard);
        // The DNP date has no played game in any window; week 3 has one in all.
        assert_eq!(batch.cleared.len(), 3);
        assert!(batch.cleared.iter().all(|k| k.game_date == date(2022, 10, 19)));
        assert_eq!(batch.rows.len(), 3);
        for row in &batch.rows {
            assert_eq!(row.game_date, date(2022, 11, 2));
            assert_eq!(row.scores.authoritative(), Some(Position::Guard));
        }
    }

    #[test]
    fn retain_dates_filters_rows_and_cleared_keys() {
        let season = season();
        let mut dnp = fact(date(2022, 10, 19), 0);
        dnp.minutes_played = Some(0.0);
        let facts = vec![dnp, fact(date(2022, 11, 2), 12)];
        let history = PlayerSeason::new(&season, &facts);

        let mut batch = aggregator().rebuild(&history, "Test Player", Position::Guard);
        batch.retain_dates(|d| d < date(2022, 11, 1));
        assert!(batch.rows.is_empty());
        assert_eq!(batch.cleared.len(), 3);
        assert!(!batch.is_empty());
    }

    #[test]
    fn overall_efficiency_averages_single_game_formula() {
        let mut a = fact(date(2022, 10, 19), 10);
        a.field_goals = Some(4);
        a.field_goal_attempts = Some(10);
        a.turnovers = Some(2);
        let b = fact(date(2022, 10, 20), 20);

        let stats = WindowStats::from_facts([&a, &b]);
        // Game a: 10 - 6 - 2 = 2. Game b: 20.
        assert!((stats.overall_efficiency - 11.0).abs() < 1e-12);
        assert!((stats.game_rating_score - 15.0).abs() < 1e-12);
    }

    #[test]
    fn affected_dates_cover_overlapping_windows_only() {
        let season = season();
        // Weeks 1, 2, 3, 4, 5.
        let facts: Vec<GameFact> = (0..5)
            .map(|i| fact(date(2022, 10, 19) + chrono::Duration::days(7 * i), 10))
            .collect();
        let history = PlayerSeason::new(&season, &facts);
        let changed = date(2022, 10, 26);

        let one = history.affected_dates(changed, AveragePeriod::OneWeek);
        assert_eq!(one, vec![changed]);

        let three = history.affected_dates(changed, AveragePeriod::ThreeWeek);
        assert_eq!(
            three,
            vec![changed, date(2022, 11, 2), date(2022, 11, 9)]
        );

        let nine = history.affected_dates(changed, AveragePeriod::NineWeek);
        assert_eq!(nine.len(), 4);
    }

    #[test]
    fn recompute_is_idempotent() {
        let season = season();
        let facts = three_weeks();
        let history = PlayerSeason::new(&season, &facts);
        let agg = aggregator();
        let first = agg.recompute_from(&history, "Test Player", date(2022, 10, 19), Position::Center);
        let second = agg.recompute_from(&history, "Test Player", date(2022, 10, 19), Position::Center);
        assert_eq!(first, second);
        // Week 1 change: 1 one-week + 3 three-week + 3 nine-week snapshots.
        assert_eq!(first.rows.len(), 7);
        assert!(first.cleared.is_empty());
    }

    #[test]
    fn rebuild_emits_one_row_per_date_and_period() {
        let season = season();
        let facts = three_weeks();
        let history = PlayerSeason::new(&season, &facts);
        let batch = aggregator().rebuild(&history, "Test Player", Position::Forward);
        assert_eq!(batch.rows.len(), 9);
        for row in &batch.rows {
            assert_eq!(row.scores.authoritative(), Some(Position::Forward));
        }
    }

    #[test]
    fn games_played_never_exceeds_facts_in_week_range() {
        let season = season();
        let facts = three_weeks();
        let history = PlayerSeason::new(&season, &facts);
        for row in aggregator().rebuild(&history, "Test Player", Position::Guard).rows {
            let in_range = history.window(row.game_date, row.period).len() as u32;
            assert!(row.stats.games_played <= in_range);
        }
    }

    #[test]
    fn facts_from_other_seasons_are_ignored() {
        let season = season();
        let mut stray = fact(date(2022, 10, 20), 99);
        stray.season = "2021-22".into();
        let facts = vec![fact(date(2022, 10, 19), 10), stray];
        let history = PlayerSeason::new(&season, &facts);
        assert_eq!(history.len(), 1);
    }
}
