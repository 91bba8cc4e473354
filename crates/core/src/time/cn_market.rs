use anyhow::Context;
use chrono::{DateTime, Datelike, Duration, NaiveDate, Timelike, Utc};
use std::collections::HashSet;

const CST_OFFSET_SECS: i32 = 8 * 3600;

// Before this time (China Standard Time) the session is not settled yet, so the
// report belongs to the previous trading day. SSE/SZSE close at 15:00.
const CLOSE_CUTOFF_HOUR_CST: u32 = 15;
const CLOSE_CUTOFF_MINUTE_CST: u32 = 0;

/// Weekday calendar minus exchange holidays.
#[derive(Debug, Clone, Default)]
pub struct TradingCalendar {
    holidays: HashSet<NaiveDate>,
}

impl TradingCalendar {
    pub fn new(holidays: impl IntoIterator<Item = NaiveDate>) -> Self {
        Self {
            holidays: holidays.into_iter().collect(),
        }
    }

    /// Fixed-date holidays plus `CN_MARKET_HOLIDAYS="YYYY-MM-DD,YYYY-MM-DD"`.
    pub fn from_env() -> Self {
        let mut holidays = fixed_holidays();
        if let Ok(s) = std::env::var("CN_MARKET_HOLIDAYS") {
            holidays.extend(parse_holidays(&s));
        }
        Self { holidays }
    }

    pub fn is_trading_day(&self, date: NaiveDate) -> bool {
        !is_weekend(date) && !self.holidays.contains(&date)
    }

    /// Trading days in `(start, end]`; 0 when `end <= start`.
    pub fn trading_days_between(&self, start: NaiveDate, end: NaiveDate) -> i32 {
        if end <= start {
            return 0;
        }
        start
            .iter_days()
            .skip(1)
            .take_while(|d| *d <= end)
            .filter(|d| self.is_trading_day(*d))
            .count() as i32
    }

    /// The date `n` trading days before `date`, so that `trading_days_between(result, date) == n`.
    pub fn trading_days_before(&self, date: NaiveDate, n: u32) -> NaiveDate {
        let mut out = date;
        let mut remaining = n;
        while remaining > 0 {
            out -= Duration::days(1);
            if self.is_trading_day(out) {
                remaining -= 1;
            }
        }
        out
    }

    /// `date` itself when it trades, else the closest earlier trading day.
    pub fn roll_back(&self, mut date: NaiveDate) -> NaiveDate {
        while !self.is_trading_day(date) {
            date -= Duration::days(1);
        }
        date
    }
}

pub fn resolve_report_date(
    report_date_arg: Option<&str>,
    now_utc: DateTime<Utc>,
    calendar: &TradingCalendar,
) -> anyhow::Result<NaiveDate> {
    if let Some(s) = report_date_arg {
        return NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid report date {s:?}, expected YYYY-MM-DD"));
    }

    let cst = chrono::FixedOffset::east_opt(CST_OFFSET_SECS).context("invalid CST offset")?;
    let now_cst = now_utc.with_timezone(&cst);

    let cutoff_reached =
        (now_cst.hour(), now_cst.minute()) >= (CLOSE_CUTOFF_HOUR_CST, CLOSE_CUTOFF_MINUTE_CST);
    let mut date = now_cst.date_naive();
    if !cutoff_reached {
        date -= Duration::days(1);
    }

    Ok(calendar.roll_back(date))
}

/// Calendar date in China Standard Time.
pub fn today_cst(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let cst = chrono::FixedOffset::east_opt(CST_OFFSET_SECS).context("invalid CST offset")?;
    Ok(now_utc.with_timezone(&cst).date_naive())
}

fn is_weekend(date: NaiveDate) -> bool {
    matches!(date.weekday(), chrono::Weekday::Sat | chrono::Weekday::Sun)
}

fn fixed_holidays() -> HashSet<NaiveDate> {
    // New Year, Labour Day and the first National Day holidays. Lunar holidays move every
    // year and come from CN_MARKET_HOLIDAYS.
    let fixed = [(1, 1), (5, 1), (10, 1), (10, 2), (10, 3)];
    let mut out = HashSet::new();
    for y in 2024..=2030 {
        for (m, d) in fixed {
            if let Some(date) = NaiveDate::from_ymd_opt(y, m, d) {
                out.insert(date);
            }
        }
    }
    out
}

fn parse_holidays(s: &str) -> Vec<NaiveDate> {
    s.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .filter_map(|part| NaiveDate::parse_from_str(part, "%Y-%m-%d").ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn rolls_back_on_weekend() {
        // 2026-01-10 is Saturday; 10:00 CST.
        let now = Utc.with_ymd_and_hms(2026, 1, 10, 2, 0, 0).unwrap();
        let date = resolve_report_date(None, now, &TradingCalendar::default()).unwrap();
        assert_eq!(date, d(2026, 1, 9));
    }

    #[test]
    fn uses_previous_day_before_cutoff() {
        // 2026-01-12 06:59 UTC = 14:59 CST, Monday
        let now = Utc.with_ymd_and_hms(2026, 1, 12, 6, 59, 0).unwrap();
        let date = resolve_report_date(None, now, &TradingCalendar::default()).unwrap();
        // Sunday rolls back to Friday.
        assert_eq!(date, d(2026, 1, 9));
    }

    #[test]
    fn uses_same_day_after_cutoff() {
        // 2026-01-12 07:00 UTC = 15:00 CST
        let now = Utc.with_ymd_and_hms(2026, 1, 12, 7, 0, 0).unwrap();
        let date = resolve_report_date(None, now, &TradingCalendar::default()).unwrap();
        assert_eq!(date, d(2026, 1, 12));
    }

    #[test]
    fn explicit_date_wins() {
        let now = Utc.with_ymd_and_hms(2026, 1, 12, 7, 0, 0).unwrap();
        let cal = TradingCalendar::default();
        assert_eq!(
            resolve_report_date(Some("2026-01-05"), now, &cal).unwrap(),
            d(2026, 1, 5)
        );
        assert!(resolve_report_date(Some("05/01/2026"), now, &cal).is_err());
    }

    #[test]
    fn counts_trading_days_exclusive_of_start() {
        let cal = TradingCalendar::default();
        // Fri → Mon is one trading day
        assert_eq!(cal.trading_days_between(d(2026, 1, 9), d(2026, 1, 12)), 1);
        // Mon → next Mon
        assert_eq!(cal.trading_days_between(d(2026, 1, 5), d(2026, 1, 12)), 5);
        assert_eq!(cal.trading_days_between(d(2026, 1, 12), d(2026, 1, 12)), 0);
        assert_eq!(cal.trading_days_between(d(2026, 1, 12), d(2026, 1, 9)), 0);
    }

    #[test]
    fn walks_back_whole_trading_days() {
        let cal = TradingCalendar::default();
        // Fri 16th back five sessions is Fri 9th, a full week of calendar days
        assert_eq!(cal.trading_days_before(d(2026, 1, 16), 5), d(2026, 1, 9));
        assert_eq!(cal.trading_days_between(d(2026, 1, 9), d(2026, 1, 16)), 5);
        // Monday back one session lands on Friday
        assert_eq!(cal.trading_days_before(d(2026, 1, 12), 1), d(2026, 1, 9));
        assert_eq!(cal.trading_days_before(d(2026, 1, 12), 0), d(2026, 1, 12));

        let cal = TradingCalendar::new(parse_holidays("2026-02-16,2026-02-17"));
        assert_eq!(cal.trading_days_before(d(2026, 2, 18), 2), d(2026, 2, 12));
    }

    #[test]
    fn holidays_are_skipped() {
        let cal = TradingCalendar::new(parse_holidays("2026-02-16, 2026-02-17,,bad"));
        assert!(!cal.is_trading_day(d(2026, 2, 16)));
        // Fri 13th → Wed 18th skips the weekend and two holidays
        assert_eq!(cal.trading_days_between(d(2026, 2, 13), d(2026, 2, 18)), 1);
        assert_eq!(cal.roll_back(d(2026, 2, 17)), d(2026, 2, 13));
    }
}
