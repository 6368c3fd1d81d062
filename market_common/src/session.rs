//! Regular trading hours of the supported stock exchanges.
//!
//! Holidays and half days are not modelled: a weekday inside the session window
//! counts as open. New York follows the US daylight saving rule; B3 runs on
//! Brasília time, which has no daylight saving.

use chrono::{
    DateTime, Datelike, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeDelta,
    Timelike, Utc, Weekday,
};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::symbols::Region;

const US_STANDARD_OFFSET: i32 = -5 * 3600;
const US_DAYLIGHT_OFFSET: i32 = -4 * 3600;
const BR_OFFSET: i32 = -3 * 3600;

/// Whether an exchange is in its regular session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum MarketState {
    /// Inside the regular session.
    Open,
    /// Outside the regular session.
    Closed,
}

/// Regular session of one exchange, in exchange local time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TradingHours {
    /// Exchange short name.
    pub exchange: &'static str,
    /// Session start as `(hour, minute)`.
    pub open: (u32, u32),
    /// Session end as `(hour, minute)`, exclusive.
    pub close: (u32, u32),
}

impl TradingHours {
    /// Session of the exchange the region's stocks trade on.
    pub fn of(region: Region) -> Self {
        match region {
            Region::US => TradingHours {
                exchange: "NYSE",
                open: (9, 30),
                close: (16, 0),
            },
            Region::BR => TradingHours {
                exchange: "B3",
                open: (10, 0),
                close: (17, 0),
            },
        }
    }

    /// `true` when `local` falls on a weekday inside the session window.
    pub fn is_open(&self, local: NaiveDateTime) -> bool {
        let minute = local.hour() * 60 + local.minute();
        is_trading_day(local.weekday())
            && minute >= self.open.0 * 60 + self.open.1
            && minute < self.close.0 * 60 + self.close.1
    }

    /// Start of the first session after `local`, in UTC.
    fn next_open(&self, region: Region, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        let open = NaiveTime::from_hms_opt(self.open.0, self.open.1, 0)?;
        let mut day = local.date();
        if local.time() >= open {
            day = day.succ_opt()?;
        }
        while !is_trading_day(day.weekday()) {
            day = day.succ_opt()?;
        }
        let local_open = day.and_time(open);
        let to_utc = |offset: FixedOffset| {
            (local_open - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
        };
        // The offset may change between now and the next session.
        let guess = to_utc(utc_offset(region, local_open.and_utc()));
        Some(to_utc(utc_offset(region, guess)))
    }
}

fn is_trading_day(day: Weekday) -> bool {
    !matches!(day, Weekday::Sat | Weekday::Sun)
}

/// UTC offset of the region's exchange at `at`.
pub fn utc_offset(region: Region, at: DateTime<Utc>) -> FixedOffset {
    let seconds = match region {
        Region::US if us_daylight_saving(at) => US_DAYLIGHT_OFFSET,
        Region::US => US_STANDARD_OFFSET,
        Region::BR => BR_OFFSET,
    };
    FixedOffset::east_opt(seconds).unwrap_or_else(|| Utc.fix())
}

/// From the second Sunday of March, 2:00 EST, to the first Sunday of November, 2:00 EDT.
fn us_daylight_saving(at: DateTime<Utc>) -> bool {
    let year = at.year();
    let start = NaiveDate::from_weekday_of_month_opt(year, 3, Weekday::Sun, 2)
        .and_then(|d| d.and_hms_opt(7, 0, 0));
    let end = NaiveDate::from_weekday_of_month_opt(year, 11, Weekday::Sun, 1)
        .and_then(|d| d.and_hms_opt(6, 0, 0));
    match (start, end) {
        (Some(start), Some(end)) => {
            let now = at.naive_utc();
            start <= now && now < end
        }
        _ => false,
    }
}

/// Open/closed status of a region's exchange at a given instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketStatus {
    /// Region asked about.
    pub region: Region,
    /// Exchange short name.
    pub exchange: String,
    /// `true` inside the regular session.
    pub is_open: bool,
    /// `OPEN` or `CLOSED`.
    pub status: MarketState,
    /// Exchange local time the status was computed for.
    pub local_time: DateTime<FixedOffset>,
    /// Start of the next session; `None` while open.
    pub next_open: Option<DateTime<Utc>>,
    /// Short human-readable summary.
    pub message: String,
}

impl MarketStatus {
    /// Status of `region`'s exchange at `now`.
    pub fn at(region: Region, now: DateTime<Utc>) -> Self {
        let hours = TradingHours::of(region);
        let local_time = now.with_timezone(&utc_offset(region, now));
        let is_open = hours.is_open(local_time.naive_local());

        let (status, next_open, message) = if is_open {
            let (hour, minute) = hours.close;
            (
                MarketState::Open,
                None,
                format!("{} is open until {hour:02}:{minute:02} local time", hours.exchange),
            )
        } else {
            (
                MarketState::Closed,
                hours.next_open(region, local_time.naive_local()),
                format!("{} is closed", hours.exchange),
            )
        };

        MarketStatus {
            region,
            exchange: hours.exchange.to_string(),
            is_open,
            status,
            local_time,
            next_open,
            message,
        }
    }

    /// Status of `region`'s exchange right now.
    pub fn now(region: Region) -> Self {
        Self::at(region, Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
    }

    #[test]
    fn new_york_follows_daylight_saving() {
        // Monday, daylight saving: 10:00 EDT.
        let status = MarketStatus::at(Region::US, utc(2026, 10, 19, 14, 0));
        assert!(status.is_open);
        assert_eq!(status.status, MarketState::Open);
        assert_eq!(status.next_open, None);
        assert!(status.local_time.to_rfc3339().ends_with("-04:00"));
        assert!(status.message.contains("16:00"));

        // Monday in January: 09:00 EST, half an hour before the bell.
        let status = MarketStatus::at(Region::US, utc(2026, 1, 5, 14, 0));
        assert!(!status.is_open);
        assert_eq!(status.next_open, Some(utc(2026, 1, 5, 14, 30)));
        assert!(MarketStatus::at(Region::US, utc(2026, 1, 5, 14, 30)).is_open);
    }

    #[test]
    fn weekend_waits_for_monday() {
        let status = MarketStatus::at(Region::US, utc(2026, 10, 17, 15, 0));
        assert_eq!(status.status, MarketState::Closed);
        assert_eq!(status.next_open, Some(utc(2026, 10, 19, 13, 30)));
        assert_eq!(status.message, "NYSE is closed");
    }

    #[test]
    fn next_open_uses_the_offset_of_that_day() {
        // Friday after the close, daylight saving ends on Sunday 1 November.
        let status = MarketStatus::at(Region::US, utc(2026, 10, 30, 21, 0));
        assert!(!status.is_open);
        assert_eq!(status.next_open, Some(utc(2026, 11, 2, 14, 30)));
    }

    #[test]
    fn b3_runs_on_brasilia_time() {
        assert!(MarketStatus::at(Region::BR, utc(2026, 10, 19, 13, 0)).is_open);
        let closed = MarketStatus::at(Region::BR, utc(2026, 10, 19, 20, 0));
        assert!(!closed.is_open);
        assert_eq!(closed.exchange, "B3");
        assert_eq!(closed.next_open, Some(utc(2026, 10, 20, 13, 0)));
        assert!(closed.local_time.to_rfc3339().ends_with("-03:00"));
    }

    #[test]
    fn state_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&MarketState::Open).unwrap(), "\"OPEN\"");
        assert_eq!(MarketState::Closed.to_string(), "CLOSED");
    }
}
