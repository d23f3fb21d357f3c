//! Time expression resolution
//!
//! Turns free-text fragments like "tomorrow at 9am" into absolute due
//! instants. Absence of a time is a normal outcome, never an error; the
//! resolver is pure, so the same text and the same "now" always produce the
//! same answer.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use once_cell::sync::Lazy;
use regex::Regex;

/// A resolved time phrase: the due instant plus the text that remains once
/// the phrase is stripped.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeMatch {
    pub due_at: DateTime<Utc>,
    pub leftover: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DayWord {
    Today,
    Tomorrow,
    Tonight,
}

impl DayWord {
    fn parse(s: &str) -> DayWord {
        match s.to_lowercase().as_str() {
            "tomorrow" => DayWord::Tomorrow,
            "tonight" => DayWord::Tonight,
            _ => DayWord::Today,
        }
    }
}

/// Relative offsets: "in 20 minutes", "in 2 hours", "in 3 days"
static RELATIVE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bin\s+(\d{1,3})\s+(minutes?|mins?|hours?|hrs?|days?)\b").unwrap()
});

static DAY_WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(today|tomorrow|tonight)\b").unwrap());

/// Clock times: "at 9", "9am", "9:30pm", "18:00". A bare number only counts
/// as a clock time when it carries an "at" prefix, minutes, or a meridiem.
static CLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:(at)\s+)?(\d{1,2})(?::([0-5]\d))?\s*(am|pm)?\b").unwrap());

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Resolver carrying the injected timezone and disambiguation settings
#[derive(Debug, Clone)]
pub struct TimeResolver {
    tz: Tz,
    evening_hour: u32,
    afternoon_hours: (u32, u32),
}

impl TimeResolver {
    pub fn new(tz: Tz, evening_hour: u32, afternoon_hours: (u32, u32)) -> Self {
        Self {
            tz,
            evening_hour,
            afternoon_hours,
        }
    }

    /// Find a time phrase in `text` and resolve it against `now`.
    ///
    /// The resolved instant is always strictly in the future: a wall-clock
    /// time already past rolls forward to the next calendar day.
    pub fn resolve(&self, text: &str, now: DateTime<Utc>) -> Option<TimeMatch> {
        // Relative offsets win outright; they are unambiguous and always future
        if let Some(cap) = RELATIVE_RE.captures(text) {
            let whole = cap.get(0).unwrap();
            let n: i64 = cap[1].parse().ok()?;
            let unit = cap[2].to_lowercase();
            let delta = if unit.starts_with("min") {
                Duration::minutes(n)
            } else if unit.starts_with('h') {
                Duration::hours(n)
            } else {
                Duration::days(n)
            };
            return Some(TimeMatch {
                due_at: now + delta,
                leftover: strip_spans(text, vec![(whole.start(), whole.end())]),
            });
        }

        let mut spans = Vec::new();

        let day = DAY_WORD_RE.captures(text).map(|cap| {
            let m = cap.get(1).unwrap();
            spans.push((m.start(), m.end()));
            DayWord::parse(m.as_str())
        });

        let mut clock: Option<(u32, u32)> = None;
        for cap in CLOCK_RE.captures_iter(text) {
            let has_at = cap.get(1).is_some();
            let minutes = cap.get(3);
            let meridiem = cap.get(4).map(|m| m.as_str().to_lowercase());
            if !has_at && minutes.is_none() && meridiem.is_none() {
                continue;
            }

            let hour_raw: u32 = cap[2].parse().ok()?;
            let minute: u32 = minutes.and_then(|m| m.as_str().parse().ok()).unwrap_or(0);
            let Some(hour) = self.disambiguate_hour(hour_raw, meridiem.as_deref(), day) else {
                continue;
            };

            let whole = cap.get(0).unwrap();
            spans.push((whole.start(), whole.end()));
            clock = Some((hour, minute));
            break;
        }

        if day.is_none() && clock.is_none() {
            return None;
        }

        let local_now = now.with_timezone(&self.tz);
        let mut date = local_now.date_naive();
        if day == Some(DayWord::Tomorrow) {
            date = date.succ_opt()?;
        }

        let (hour, minute) = match (clock, day) {
            (Some(hm), _) => hm,
            (None, Some(DayWord::Tonight)) => (self.evening_hour, 0),
            // Bare "today"/"tomorrow": keep the current wall-clock time
            (None, _) => (local_now.hour(), local_now.minute()),
        };

        let mut due = local_datetime(self.tz, date, hour, minute)?;
        for _ in 0..2 {
            if due > now {
                break;
            }
            date = date.succ_opt()?;
            due = local_datetime(self.tz, date, hour, minute)?;
        }
        if due <= now {
            return None;
        }

        Some(TimeMatch {
            due_at: due,
            leftover: strip_spans(text, spans),
        })
    }

    /// Apply meridiem rules to a raw 1-2 digit hour. Returns None when the
    /// candidate cannot be a clock time.
    fn disambiguate_hour(&self, hour_raw: u32, meridiem: Option<&str>, day: Option<DayWord>) -> Option<u32> {
        match meridiem {
            Some(m) => {
                if hour_raw == 0 || hour_raw > 12 {
                    return None;
                }
                if m.starts_with('p') {
                    Some(if hour_raw == 12 { 12 } else { hour_raw + 12 })
                } else {
                    Some(if hour_raw == 12 { 0 } else { hour_raw })
                }
            }
            None => {
                if hour_raw > 23 {
                    return None;
                }
                let (lo, hi) = self.afternoon_hours;
                if day == Some(DayWord::Tonight) && (1..=11).contains(&hour_raw) {
                    Some(hour_raw + 12)
                } else if hour_raw >= lo && hour_raw <= hi {
                    // Bare small hours read as afternoon/evening
                    Some(hour_raw + 12)
                } else {
                    Some(hour_raw)
                }
            }
        }
    }
}

/// Midnight-to-midnight window for `date` in `tz`, as UTC instants
pub fn day_window(tz: Tz, date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = local_datetime(tz, date, 0, 0)
        .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0).unwrap()));
    let next = date.succ_opt().unwrap_or(date);
    let end = local_datetime(tz, next, 0, 0)
        .unwrap_or_else(|| Utc.from_utc_datetime(&next.and_hms_opt(0, 0, 0).unwrap()));
    (start, end)
}

/// Build a UTC instant from a local wall-clock time. A DST gap shifts the
/// time one hour later rather than failing.
fn local_datetime(tz: Tz, date: NaiveDate, hour: u32, minute: u32) -> Option<DateTime<Utc>> {
    let naive = date.and_hms_opt(hour, minute, 0)?;
    match tz.from_local_datetime(&naive).earliest() {
        Some(dt) => Some(dt.with_timezone(&Utc)),
        None => tz
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest()
            .map(|dt| dt.with_timezone(&Utc)),
    }
}

/// Remove the matched spans from `text` and tidy up what remains
fn strip_spans(text: &str, mut spans: Vec<(usize, usize)>) -> String {
    spans.sort();
    let mut out = String::with_capacity(text.len());
    let mut pos = 0;
    for (start, end) in spans {
        if start > pos {
            out.push_str(&text[pos..start]);
        }
        pos = pos.max(end);
    }
    out.push_str(&text[pos..]);

    let collapsed = WHITESPACE_RE.replace_all(&out, " ");
    let trimmed = collapsed.trim().trim_end_matches([',', '.']).trim();
    trim_connectives(trimmed).to_string()
}

/// Drop connective words left dangling at either edge after stripping
fn trim_connectives(s: &str) -> &str {
    const TRAILING: &[&str] = &["at", "on", "by", "in"];
    const LEADING: &[&str] = &["at", "on", "by", "to"];

    let mut out = s.trim();
    loop {
        match out.rsplit_once(' ') {
            Some((head, last)) if TRAILING.contains(&last.to_lowercase().as_str()) => {
                out = head.trim_end();
            }
            _ => break,
        }
    }
    loop {
        match out.split_once(' ') {
            Some((first, rest)) if LEADING.contains(&first.to_lowercase().as_str()) => {
                out = rest.trim_start();
            }
            _ => break,
        }
    }
    if TRAILING.contains(&out.to_lowercase().as_str()) {
        return "";
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn resolver() -> TimeResolver {
        TimeResolver::new(chrono_tz::UTC, 20, (1, 7))
    }

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap()
    }

    // 2024-01-15 is a Monday
    #[test]
    fn test_clock_time_same_day() {
        let now = utc(2024, 1, 15, 7, 0);
        let m = resolver().resolve("take meds at 9am", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 9, 0));
        assert_eq!(m.leftover, "take meds");
    }

    #[test]
    fn test_tomorrow_with_bare_hour() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("Call GP tomorrow at 11", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 16, 11, 0));
        assert_eq!(m.leftover, "Call GP");
    }

    #[test]
    fn test_past_time_rolls_forward() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("take meds at 9am", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 16, 9, 0));
    }

    #[test]
    fn test_explicit_today_in_past_rolls_forward() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("take meds today at 9am", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 16, 9, 0));
        assert_eq!(m.leftover, "take meds");
    }

    #[test]
    fn test_bare_small_hour_is_pm() {
        let now = utc(2024, 1, 15, 7, 0);
        let m = resolver().resolve("gym at 3", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 15, 0));
        assert_eq!(m.leftover, "gym");
    }

    #[test]
    fn test_bare_morning_hour_stays_am() {
        let now = utc(2024, 1, 15, 7, 0);
        let m = resolver().resolve("standup at 9", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 9, 0));
    }

    #[test]
    fn test_bare_twelve_is_noon() {
        let now = utc(2024, 1, 15, 7, 0);
        let m = resolver().resolve("lunch at 12", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 12, 0));
    }

    #[test]
    fn test_twenty_four_hour_clock() {
        let now = utc(2024, 1, 15, 7, 0);
        let m = resolver().resolve("review PRs at 18:00", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 18, 0));
    }

    #[test]
    fn test_pm_window_is_configurable() {
        let wide = TimeResolver::new(chrono_tz::UTC, 20, (1, 9));
        let now = utc(2024, 1, 15, 7, 0);
        let m = wide.resolve("dinner at 8", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 20, 0));
    }

    #[test]
    fn test_meridiem_edge_hours() {
        let now = utc(2024, 1, 15, 7, 0);
        let m = resolver().resolve("party at 12pm", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 12, 0));

        // 12am is midnight, already past at 07:00, so next day
        let m = resolver().resolve("backup at 12am", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 16, 0, 0));

        let m = resolver().resolve("stretch at 9pm", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 21, 0));
    }

    #[test]
    fn test_tonight_defaults_to_evening_hour() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("put bins out tonight", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 20, 0));
        assert_eq!(m.leftover, "put bins out");
    }

    #[test]
    fn test_tonight_with_bare_hour_is_pm() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("call dad tonight at 9", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 21, 0));
        assert_eq!(m.leftover, "call dad");
    }

    #[test]
    fn test_bare_tomorrow_keeps_clock_time() {
        let now = utc(2024, 1, 15, 10, 30);
        let m = resolver().resolve("water plants tomorrow", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 16, 10, 30));
        assert_eq!(m.leftover, "water plants");
    }

    #[test]
    fn test_relative_minutes() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("check the oven in 20 minutes", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 10, 20));
        assert_eq!(m.leftover, "check the oven");
    }

    #[test]
    fn test_relative_hours_and_days() {
        let now = utc(2024, 1, 15, 10, 0);
        let m = resolver().resolve("submit report in 2 hours", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 15, 12, 0));

        let m = resolver().resolve("renew passport in 3 days", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 1, 18, 10, 0));
    }

    #[test]
    fn test_no_time_found() {
        let now = utc(2024, 1, 15, 10, 0);
        assert!(resolver().resolve("hello world", now).is_none());
        assert!(resolver().resolve("", now).is_none());
        assert!(resolver().resolve("#123", now).is_none());
    }

    #[test]
    fn test_bare_number_is_not_a_time() {
        let now = utc(2024, 1, 15, 10, 0);
        // No "at", no minutes, no meridiem: not a clock time
        assert!(resolver().resolve("buy 2 apples", now).is_none());
    }

    #[test]
    fn test_bare_number_with_day_word() {
        let now = utc(2024, 1, 15, 10, 0);
        // The day word resolves; the bare "2" stays in the body
        let m = resolver().resolve("buy 2 apples tomorrow", now).unwrap();
        assert_eq!(m.leftover, "buy 2 apples");
        assert_eq!(m.due_at, utc(2024, 1, 16, 10, 0));
    }

    #[test]
    fn test_timezone_offsets_apply() {
        let resolver = TimeResolver::new(chrono_tz::Europe::London, 20, (1, 7));
        // 2024-07-15 is a Monday; London is UTC+1 in July
        let now = utc(2024, 7, 15, 6, 0);
        let m = resolver.resolve("take meds at 9am", now).unwrap();
        assert_eq!(m.due_at, utc(2024, 7, 15, 8, 0));
    }

    #[test]
    fn test_determinism() {
        let now = utc(2024, 1, 15, 7, 0);
        let a = resolver().resolve("take meds tomorrow at 9am", now);
        let b = resolver().resolve("take meds tomorrow at 9am", now);
        assert_eq!(a, b);
    }

    #[test]
    fn test_day_window() {
        let (start, end) = day_window(chrono_tz::UTC, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(start, utc(2024, 1, 15, 0, 0));
        assert_eq!(end, utc(2024, 1, 16, 0, 0));

        // London summer: local midnight is 23:00 UTC the previous day
        let (start, end) =
            day_window(chrono_tz::Europe::London, NaiveDate::from_ymd_opt(2024, 7, 15).unwrap());
        assert_eq!(start, utc(2024, 7, 14, 23, 0));
        assert_eq!(end, utc(2024, 7, 15, 23, 0));
    }

    #[test]
    fn test_trim_connectives() {
        assert_eq!(trim_connectives("call gp at"), "call gp");
        assert_eq!(trim_connectives("to call gp"), "call gp");
        assert_eq!(trim_connectives("call gp"), "call gp");
        assert_eq!(trim_connectives("at"), "");
    }

    proptest! {
        #[test]
        fn prop_clock_phrases_resolve_deterministically_to_the_future(
            hour in 1u32..=12,
            minute in 0u32..=59,
            pm in proptest::bool::ANY,
        ) {
            let resolver = resolver();
            let now = utc(2024, 1, 15, 13, 37);
            let meridiem = if pm { "pm" } else { "am" };
            let text = format!("pay bills at {hour}:{minute:02}{meridiem}");

            let a = resolver.resolve(&text, now).unwrap();
            let b = resolver.resolve(&text, now).unwrap();
            prop_assert_eq!(&a, &b);
            prop_assert!(a.due_at > now);
            prop_assert_eq!(a.leftover.as_str(), "pay bills");
        }

        #[test]
        fn prop_bare_hours_never_resolve_to_the_past(hour in 0u32..=23) {
            let resolver = resolver();
            let now = utc(2024, 1, 15, 13, 37);
            let text = format!("ping me at {hour}:15");

            let m = resolver.resolve(&text, now).unwrap();
            prop_assert!(m.due_at > now);
            // Never more than a day out: the roll-forward is a single day
            prop_assert!(m.due_at <= now + Duration::days(1));
        }
    }
}
