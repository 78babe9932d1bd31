use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Future business days strictly after `start`: weekends and US market
/// holidays skipped. Output length always equals `horizon`.
pub fn future_business_days(start: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(horizon);
    let mut date = start;

    while days.len() < horizon {
        date += Duration::days(1);
        if is_business_day(date) {
            days.push(date);
        }
    }

    days
}

pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !is_us_market_holiday(date)
}

/// US equity market holidays, with observed-date shifting for the fixed
/// dates (Saturday observed Friday, Sunday observed Monday).
pub fn is_us_market_holiday(date: NaiveDate) -> bool {
    // An observed New Year's Day can land on Dec 31 of the prior year,
    // so check the surrounding years' calendars too.
    holidays_for_year(date.year()).contains(&date)
        || holidays_for_year(date.year() + 1).contains(&date)
}

fn holidays_for_year(year: i32) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(10);

    let fixed = [
        (1, 1),   // New Year's Day
        (6, 19),  // Juneteenth
        (7, 4),   // Independence Day
        (12, 25), // Christmas Day
    ];
    for (month, day) in fixed {
        if let Some(d) = NaiveDate::from_ymd_opt(year, month, day) {
            days.push(observed(d));
        }
    }

    // Floating Monday/Thursday holidays
    let floating = [
        nth_weekday(year, 1, Weekday::Mon, 3),  // MLK Day
        nth_weekday(year, 2, Weekday::Mon, 3),  // Washington's Birthday
        last_weekday(year, 5, Weekday::Mon),    // Memorial Day
        nth_weekday(year, 9, Weekday::Mon, 1),  // Labor Day
        nth_weekday(year, 11, Weekday::Thu, 4), // Thanksgiving
        good_friday(year),
    ];
    days.extend(floating.into_iter().flatten());

    days
}

fn observed(date: NaiveDate) -> NaiveDate {
    match date.weekday() {
        Weekday::Sat => date - Duration::days(1),
        Weekday::Sun => date + Duration::days(1),
        _ => date,
    }
}

fn nth_weekday(year: i32, month: u32, weekday: Weekday, n: u32) -> Option<NaiveDate> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let offset = (7 + weekday.num_days_from_monday() - first.weekday().num_days_from_monday()) % 7;
    Some(first + Duration::days((offset + (n - 1) * 7) as i64))
}

fn last_weekday(year: i32, month: u32, weekday: Weekday) -> Option<NaiveDate> {
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)
    };
    let last = next_month? - Duration::days(1);
    let offset = (7 + last.weekday().num_days_from_monday() - weekday.num_days_from_monday()) % 7;
    Some(last - Duration::days(offset as i64))
}

/// Good Friday via the anonymous Gregorian Easter algorithm.
fn good_friday(year: i32) -> Option<NaiveDate> {
    let a = year % 19;
    let b = year / 100;
    let c = year % 100;
    let d = b / 4;
    let e = b % 4;
    let f = (b + 8) / 25;
    let g = (b - f + 1) / 3;
    let h = (19 * a + b - d - g + 15) % 30;
    let i = c / 4;
    let k = c % 4;
    let l = (32 + 2 * e + 2 * i - h - k) % 7;
    let m = (a + 11 * h + 22 * l) / 451;
    let month = (h + l - 7 * m + 114) / 31;
    let day = ((h + l - 7 * m + 114) % 31) + 1;

    let easter = NaiveDate::from_ymd_opt(year, month as u32, day as u32)?;
    Some(easter - Duration::days(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn horizon_is_exact_after_holiday_exclusion() {
        // Start just before Christmas 2025 (Thu) and New Year 2026 (Thu)
        let start = NaiveDate::from_ymd_opt(2025, 12, 22).unwrap();
        let days = future_business_days(start, 10);

        assert_eq!(days.len(), 10);
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2025, 12, 25).unwrap()));
        assert!(!days.contains(&NaiveDate::from_ymd_opt(2026, 1, 1).unwrap()));
        for d in &days {
            assert!(is_business_day(*d));
        }
    }

    #[test]
    fn weekends_are_skipped() {
        let friday = NaiveDate::from_ymd_opt(2025, 8, 22).unwrap();
        let days = future_business_days(friday, 3);

        assert_eq!(days[0], NaiveDate::from_ymd_opt(2025, 8, 25).unwrap());
        assert_eq!(days[1], NaiveDate::from_ymd_opt(2025, 8, 26).unwrap());
        assert_eq!(days[2], NaiveDate::from_ymd_opt(2025, 8, 27).unwrap());
    }

    #[test]
    fn floating_holidays_2025() {
        // MLK Day 2025: Jan 20; Memorial Day: May 26; Thanksgiving: Nov 27
        assert!(is_us_market_holiday(NaiveDate::from_ymd_opt(2025, 1, 20).unwrap()));
        assert!(is_us_market_holiday(NaiveDate::from_ymd_opt(2025, 5, 26).unwrap()));
        assert!(is_us_market_holiday(NaiveDate::from_ymd_opt(2025, 11, 27).unwrap()));
    }

    #[test]
    fn observed_independence_day_2026() {
        // Jul 4 2026 is a Saturday, observed Friday Jul 3
        assert!(is_us_market_holiday(NaiveDate::from_ymd_opt(2026, 7, 3).unwrap()));
    }

    #[test]
    fn good_friday_2025() {
        assert!(is_us_market_holiday(NaiveDate::from_ymd_opt(2025, 4, 18).unwrap()));
    }

    #[test]
    fn ordinary_weekdays_are_business_days() {
        assert!(is_business_day(NaiveDate::from_ymd_opt(2025, 8, 27).unwrap()));
        assert!(!is_business_day(NaiveDate::from_ymd_opt(2025, 8, 30).unwrap()));
    }
}
