use chrono::{Datelike, NaiveDate, Utc};
use serde::Serialize;

pub const REGULAR_SEASON_WEEKS: u32 = 18;
pub const SEASON_TYPE: &str = "REG";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeasonWeek {
    pub season: i32,
    pub week: u32,
}

/// Upcoming regular-season week as of `today`. Week N's games are over by
/// Tuesday, so the calendar always looks one week past the one in progress.
pub fn upcoming_week(season_start: NaiveDate, today: NaiveDate) -> SeasonWeek {
    let season = season_start.year();
    let days = (today - season_start).num_days();
    if days < 0 {
        return SeasonWeek { season, week: 1 };
    }
    let weeks_passed = (days / 7) as u32;
    SeasonWeek {
        season,
        week: (weeks_passed + 2).min(REGULAR_SEASON_WEEKS),
    }
}

pub fn current_week(season_start: NaiveDate) -> SeasonWeek {
    upcoming_week(season_start, Utc::now().date_naive())
}
