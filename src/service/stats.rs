use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use eyre::Result;
use itertools::Itertools;
use sqlx::types::Uuid;

use types::domain::{
    CategoryStats, FocusGoal, GraphData, GraphDataPoint, GraphQuery, TimeRange, UserStats,
};

use crate::domain::stats::{CategoryTotals, SessionPoint};
use crate::repository::goals::GoalRepository;
use crate::repository::sessions::FocusSessionRepository;

#[derive(Clone)]
pub struct StatsService {
    pub session_repository: Arc<FocusSessionRepository>,
    pub goal_repository: GoalRepository,
}

impl StatsService {
    pub async fn stats(
        &self,
        user_id: Uuid,
        email: String,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Result<UserStats> {
        let totals = self
            .session_repository
            .category_totals(user_id, start, end)
            .await?;
        let goals = self.goal_repository.list(user_id).await?;
        Ok(build_stats(email, totals, goals))
    }

    // the week runs Monday 00:00 UTC through now
    pub async fn weekly_stats(&self, user_id: Uuid, email: String) -> Result<UserStats> {
        let now = Utc::now();
        self.stats(user_id, email, Some(start_of_week(now)), Some(now))
            .await
    }

    pub async fn graph_data(&self, user_id: Uuid, query: GraphQuery) -> Result<GraphData> {
        let today = Utc::now().date_naive();
        let start = range_start(query.time_range, today);
        let window_start = Utc.from_utc_datetime(&start.and_time(NaiveTime::MIN));
        let window_end =
            Utc.from_utc_datetime(&(today.and_time(NaiveTime::MIN) + Duration::days(1)));
        let points = self
            .session_repository
            .points_between(user_id, window_start, window_end, query.category.clone())
            .await?;
        Ok(GraphData {
            data_points: bucket_points(&points, query.time_range, today),
            time_range: query.time_range,
            category: query.category,
        })
    }
}

pub(crate) fn start_of_week(now: DateTime<Utc>) -> DateTime<Utc> {
    let date = now.date_naive();
    let monday = date - Duration::days(date.weekday().num_days_from_monday() as i64);
    Utc.from_utc_datetime(&monday.and_time(NaiveTime::MIN))
}

fn monday_of(date: NaiveDate) -> NaiveDate {
    date - Duration::days(date.weekday().num_days_from_monday() as i64)
}

fn range_start(time_range: TimeRange, today: NaiveDate) -> NaiveDate {
    match time_range {
        TimeRange::Week => today - Duration::days(6),
        TimeRange::Month => today - Duration::days(29),
        TimeRange::SixMonth => today - Duration::days(179),
        TimeRange::Ytd => NaiveDate::from_ymd_opt(today.year(), 1, 1).unwrap_or(today),
    }
}

// fixed-length series: one bucket per day (week, month) or per Monday
// (6month, ytd), with empty buckets reported as zero
pub(crate) fn bucket_points(
    points: &[SessionPoint],
    time_range: TimeRange,
    today: NaiveDate,
) -> Vec<GraphDataPoint> {
    let start = range_start(time_range, today);
    let weekly = matches!(time_range, TimeRange::SixMonth | TimeRange::Ytd);
    let key_of = |date: NaiveDate| if weekly { monday_of(date) } else { date };

    let sums: HashMap<NaiveDate, i64> = points
        .iter()
        .map(|point| {
            (
                key_of(point.time.date_naive()),
                point.duration_seconds as i64,
            )
        })
        .into_grouping_map()
        .sum();

    // the weekly fill walks actual Mondays, not stepped copies of the
    // window start, so the current partial week always gets a bucket
    let mut buckets: BTreeMap<NaiveDate, i64> = BTreeMap::new();
    let mut current = if weekly { monday_of(start) } else { start };
    while current <= today {
        buckets.entry(current).or_insert(0);
        current = current + Duration::days(if weekly { 7 } else { 1 });
    }
    for (key, total) in sums {
        if let Some(bucket) = buckets.get_mut(&key) {
            *bucket += total;
        }
    }

    buckets
        .into_iter()
        .map(|(date, focus_time_seconds)| GraphDataPoint {
            date: date.format("%Y-%m-%d").to_string(),
            focus_time_seconds,
        })
        .collect()
}

pub(crate) fn build_stats(
    email: String,
    totals: Vec<CategoryTotals>,
    goals: Vec<FocusGoal>,
) -> UserStats {
    let goals: HashMap<String, i32> = goals
        .into_iter()
        .map(|goal| (goal.category, goal.goal_time_per_week_seconds))
        .collect();

    let mut total_focus_time_seconds = 0;
    let mut total_sessions = 0;
    let categories = totals
        .into_iter()
        .map(|row| {
            total_focus_time_seconds += row.total_time_seconds;
            total_sessions += row.session_count;
            let goal = goals.get(&row.category).copied();
            // uncapped; clamping for display is the consumer's concern
            let progress_percentage = goal
                .filter(|goal| *goal > 0)
                .map(|goal| row.total_time_seconds as f64 / goal as f64 * 100.0);
            CategoryStats {
                category: row.category,
                total_time_seconds: row.total_time_seconds,
                session_count: row.session_count,
                average_time_seconds: row.average_time_seconds,
                goal_time_per_week_seconds: goal,
                progress_percentage,
            }
        })
        .collect();

    UserStats {
        email,
        total_focus_time_seconds,
        total_sessions,
        categories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Weekday;
    use rstest::rstest;

    fn wednesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, 18).unwrap()
    }

    fn point(date: NaiveDate, duration_seconds: i32) -> SessionPoint {
        SessionPoint {
            time: Utc.from_utc_datetime(&date.and_time(NaiveTime::MIN)),
            duration_seconds,
        }
    }

    #[rstest]
    #[case(TimeRange::Week, 7)]
    #[case(TimeRange::Month, 30)]
    #[case(TimeRange::SixMonth, 27)]
    #[case(TimeRange::Ytd, 25)]
    fn series_length_is_fixed_per_range(#[case] time_range: TimeRange, #[case] expected: usize) {
        let series = bucket_points(&[], time_range, wednesday());
        assert_eq!(series.len(), expected);
        assert!(series.iter().all(|p| p.focus_time_seconds == 0));
    }

    #[test]
    fn daily_buckets_sum_sessions_on_the_same_day() {
        let today = wednesday();
        let points = vec![
            point(today, 600),
            point(today, 300),
            point(today - Duration::days(1), 120),
        ];
        let series = bucket_points(&points, TimeRange::Week, today);
        assert_eq!(series.len(), 7);
        assert_eq!(series[5].focus_time_seconds, 120);
        assert_eq!(series[6].date, "2025-06-18");
        assert_eq!(series[6].focus_time_seconds, 900);
    }

    #[test]
    fn weekly_buckets_are_keyed_by_monday() {
        let today = wednesday();
        let points = vec![point(today, 450)];
        let series = bucket_points(&points, TimeRange::SixMonth, today);
        for bucket in &series {
            let date = NaiveDate::parse_from_str(&bucket.date, "%Y-%m-%d").unwrap();
            assert_eq!(date.weekday(), Weekday::Mon);
        }
        assert_eq!(series.last().unwrap().date, "2025-06-16");
        assert_eq!(series.last().unwrap().focus_time_seconds, 450);
    }

    #[test]
    fn start_of_week_is_monday_midnight() {
        let now = Utc.with_ymd_and_hms(2025, 6, 18, 15, 30, 45).unwrap();
        let start = start_of_week(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap());

        // a Monday stays on the same day
        let monday = Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 1).unwrap();
        assert_eq!(
            start_of_week(monday),
            Utc.with_ymd_and_hms(2025, 6, 16, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn stats_over_no_sessions_are_all_zero() {
        let stats = build_stats("alice@example.com".to_string(), Vec::new(), Vec::new());
        assert_eq!(stats.total_focus_time_seconds, 0);
        assert_eq!(stats.total_sessions, 0);
        assert!(stats.categories.is_empty());
    }

    #[test]
    fn progress_is_uncapped_and_absent_without_a_goal() {
        let totals = vec![
            CategoryTotals {
                category: "Study".to_string(),
                total_time_seconds: 7200,
                session_count: 4,
                average_time_seconds: 1800.0,
            },
            CategoryTotals {
                category: "Work".to_string(),
                total_time_seconds: 600,
                session_count: 1,
                average_time_seconds: 600.0,
            },
        ];
        let goals = vec![FocusGoal {
            category: "Study".to_string(),
            goal_time_per_week_seconds: 3600,
        }];
        let stats = build_stats("alice@example.com".to_string(), totals, goals);

        assert_eq!(stats.total_focus_time_seconds, 7800);
        assert_eq!(stats.total_sessions, 5);
        let study = &stats.categories[0];
        assert_eq!(study.goal_time_per_week_seconds, Some(3600));
        assert_eq!(study.progress_percentage, Some(200.0));
        let work = &stats.categories[1];
        assert_eq!(work.goal_time_per_week_seconds, None);
        assert_eq!(work.progress_percentage, None);
    }
}
