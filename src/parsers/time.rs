//! Time-string parsing into minutes, per §4.1/§8 of the allocation
//! protocol design.

use crate::error::SallocError;

/// Sentinel meaning "no time limit".
pub const INFINITE_MINUTES: u32 = u32::MAX;

/// Parse a time string into minutes.
///
/// Accepts `minutes`, `minutes:seconds`, `hours:minutes:seconds`,
/// `days-hours`, `days-hours:minutes`, `days-hours:minutes:seconds`, the
/// literal `INFINITE`, or the empty string (also `INFINITE`). Any
/// non-zero seconds component rounds the result up to the next minute.
/// Parsing `"0"` by itself returns `0`; callers applying the result to a
/// time-limit field are responsible for mapping that `0` to
/// [`INFINITE_MINUTES`] as §4.2 requires — this parser only converts a
/// string to a duration, it does not know which field it feeds.
pub fn parse_time_minutes(s: &str) -> Result<u32, SallocError> {
    let s = s.trim();
    if s.is_empty() || s.eq_ignore_ascii_case("infinite") {
        return Ok(INFINITE_MINUTES);
    }

    let (days, rest) = match s.split_once('-') {
        Some((d, rest)) => (parse_u32(d, "time")?, rest),
        None => (0, s),
    };

    let parts: Vec<&str> = rest.split(':').collect();
    let (hours, minutes, seconds) = match (days > 0, parts.len()) {
        (true, 1) => (parse_u32(parts[0], "time")?, 0, 0),
        (true, 2) => (
            parse_u32(parts[0], "time")?,
            parse_u32(parts[1], "time")?,
            0,
        ),
        (true, 3) => (
            parse_u32(parts[0], "time")?,
            parse_u32(parts[1], "time")?,
            parse_u32(parts[2], "time")?,
        ),
        (false, 1) => (0, parse_u32(parts[0], "time")?, 0),
        (false, 2) => (0, parse_u32(parts[0], "time")?, parse_u32(parts[1], "time")?),
        (false, 3) => (
            parse_u32(parts[0], "time")?,
            parse_u32(parts[1], "time")?,
            parse_u32(parts[2], "time")?,
        ),
        _ => return Err(SallocError::parse("time", format!("malformed time '{s}'"))),
    };

    let total_minutes = days
        .checked_mul(24 * 60)
        .and_then(|v| v.checked_add(hours.checked_mul(60)?))
        .and_then(|v| v.checked_add(minutes))
        .ok_or_else(|| SallocError::parse("time", format!("overflow: '{s}'")))?;

    let bump = if seconds > 0 { 1 } else { 0 };
    Ok(total_minutes + bump)
}

fn parse_u32(s: &str, field: &str) -> Result<u32, SallocError> {
    s.parse()
        .map_err(|_| SallocError::parse(field, format!("not a number: '{s}'")))
}

/// Parse `--begin`/`--deadline`'s time-expression grammar into seconds
/// since the Unix epoch.
///
/// Accepts three shapes:
/// - `now` or `now+<N><unit>` (`unit` one of `seconds`/`minutes`/`hours`/
///   `days`/`weeks`, singular or plural, matched case-insensitively);
/// - an ISO-8601-ish absolute stamp `YYYY-MM-DD[THH:MM[:SS]]` (UTC);
/// - a bare `HH:MM[:SS]`, resolved to the next occurrence of that
///   wall-clock time at or after `now` (today if not yet passed,
///   tomorrow otherwise).
///
/// `now` is passed in rather than read internally so the function stays
/// pure and testable; callers pass the current wall-clock time.
pub fn parse_begin_time(s: &str, now: u64) -> Result<u64, SallocError> {
    let s = s.trim();
    if s.is_empty() {
        return Err(SallocError::parse("time", "empty time expression".into()));
    }
    if s.eq_ignore_ascii_case("now") {
        return Ok(now);
    }
    if s.len() > 4 && s[..4].eq_ignore_ascii_case("now+") {
        return parse_relative_offset(&s[4..]).map(|secs| now.saturating_add(secs));
    }

    if let Some((date, time)) = s.split_once(['T', ' ']) {
        let days = parse_iso_date(date)?;
        let secs = parse_clock(time)?;
        return Ok(days as u64 * 86_400 + secs);
    }
    if s.contains('-') && s.matches('-').count() == 2 && !s.contains(':') {
        let days = parse_iso_date(s)?;
        return Ok(days as u64 * 86_400);
    }
    if s.contains('-') && s.matches('-').count() == 2 {
        return Err(SallocError::parse(
            "time",
            format!("malformed time expression '{s}'"),
        ));
    }

    // Bare HH:MM[:SS]: next occurrence at or after `now`.
    let secs_of_day = parse_clock(s)?;
    let today_midnight = (now / 86_400) * 86_400;
    let candidate = today_midnight + secs_of_day;
    if candidate >= now {
        Ok(candidate)
    } else {
        Ok(candidate + 86_400)
    }
}

fn parse_relative_offset(rest: &str) -> Result<u64, SallocError> {
    let digits_end = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    if digits_end == 0 {
        return Err(SallocError::parse(
            "time",
            format!("malformed relative offset '{rest}'"),
        ));
    }
    let n: u64 = rest[..digits_end]
        .parse()
        .map_err(|_| SallocError::parse("time", format!("not a number: '{rest}'")))?;
    let unit = rest[digits_end..].trim().to_ascii_lowercase();
    let unit_secs = match unit.trim_end_matches('s') {
        "second" | "sec" => 1,
        "minute" | "min" => 60,
        "hour" => 3_600,
        "day" => 86_400,
        "week" => 604_800,
        other => {
            return Err(SallocError::parse(
                "time",
                format!("unknown relative unit '{other}'"),
            ));
        }
    };
    n.checked_mul(unit_secs)
        .ok_or_else(|| SallocError::parse("time", format!("overflow: '{rest}'")))
}

/// `YYYY-MM-DD` to days since the Unix epoch, via Howard Hinnant's
/// `days_from_civil` algorithm (proleptic Gregorian, valid for any year).
fn parse_iso_date(s: &str) -> Result<i64, SallocError> {
    let mut parts = s.splitn(3, '-');
    let (y, m, d) = (
        parts.next().unwrap_or(""),
        parts.next().unwrap_or(""),
        parts.next().unwrap_or(""),
    );
    let y: i64 = y
        .parse()
        .map_err(|_| SallocError::parse("time", format!("bad year in '{s}'")))?;
    let m: i64 = m
        .parse()
        .map_err(|_| SallocError::parse("time", format!("bad month in '{s}'")))?;
    let d: i64 = d
        .parse()
        .map_err(|_| SallocError::parse("time", format!("bad day in '{s}'")))?;
    if !(1..=12).contains(&m) || !(1..=31).contains(&d) {
        return Err(SallocError::parse(
            "time",
            format!("out-of-range date '{s}'"),
        ));
    }
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    Ok(era * 146_097 + doe - 719_468)
}

/// `HH:MM[:SS]` to seconds since midnight.
fn parse_clock(s: &str) -> Result<u64, SallocError> {
    let parts: Vec<&str> = s.split(':').collect();
    let (h, m, sec) = match parts.len() {
        2 => (parse_u32(parts[0], "time")?, parse_u32(parts[1], "time")?, 0),
        3 => (
            parse_u32(parts[0], "time")?,
            parse_u32(parts[1], "time")?,
            parse_u32(parts[2], "time")?,
        ),
        _ => return Err(SallocError::parse("time", format!("malformed clock '{s}'"))),
    };
    if h > 23 || m > 59 || sec > 59 {
        return Err(SallocError::parse("time", format!("out-of-range clock '{s}'")));
    }
    Ok(h as u64 * 3_600 + m as u64 * 60 + sec as u64)
}

#[cfg(test)]
mod begin_time_tests {
    use super::*;

    #[test]
    fn now_literal() {
        assert_eq!(parse_begin_time("now", 1_000).unwrap(), 1_000);
    }

    #[test]
    fn now_plus_relative() {
        assert_eq!(parse_begin_time("now+1hour", 1_000).unwrap(), 1_000 + 3_600);
        assert_eq!(parse_begin_time("now+30minutes", 0).unwrap(), 1_800);
        assert_eq!(parse_begin_time("now+2days", 0).unwrap(), 172_800);
    }

    #[test]
    fn iso_date_only() {
        // 1970-01-02 is day 1 since the epoch.
        assert_eq!(parse_begin_time("1970-01-02", 0).unwrap(), 86_400);
        assert_eq!(parse_begin_time("2026-07-29", 0).unwrap(), 1_785_283_200);
    }

    #[test]
    fn iso_datetime() {
        assert_eq!(
            parse_begin_time("1970-01-01T01:00:00", 0).unwrap(),
            3_600
        );
    }

    #[test]
    fn bare_clock_rolls_to_tomorrow_if_passed() {
        let today_midnight = 10 * 86_400;
        let now = today_midnight + 3_600; // 01:00
        // asking for 00:30 (already passed today) rolls to tomorrow.
        assert_eq!(
            parse_begin_time("00:30:00", now).unwrap(),
            today_midnight + 86_400 + 1_800
        );
        // asking for 02:00 (still ahead today) stays today.
        assert_eq!(parse_begin_time("02:00:00", now).unwrap(), today_midnight + 7_200);
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(parse_begin_time("", 0).is_err(), true);
        assert_eq!(parse_begin_time("not-a-time-at-all", 0).is_err(), true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infinite_and_empty() {
        assert_eq!(parse_time_minutes("INFINITE").unwrap(), INFINITE_MINUTES);
        assert_eq!(parse_time_minutes("infinite").unwrap(), INFINITE_MINUTES);
        assert_eq!(parse_time_minutes("").unwrap(), INFINITE_MINUTES);
    }

    #[test]
    fn minutes_only() {
        assert_eq!(parse_time_minutes("30").unwrap(), 30);
    }

    #[test]
    fn minutes_seconds() {
        assert_eq!(parse_time_minutes("30:00").unwrap(), 30);
        assert_eq!(parse_time_minutes("30:01").unwrap(), 31);
    }

    #[test]
    fn hours_minutes_seconds() {
        assert_eq!(parse_time_minutes("1:30:00").unwrap(), 90);
    }

    #[test]
    fn days_hours() {
        assert_eq!(parse_time_minutes("1-0").unwrap(), 1440);
        assert_eq!(parse_time_minutes("2-12").unwrap(), 2 * 1440 + 12 * 60);
    }

    #[test]
    fn days_hours_minutes() {
        assert_eq!(parse_time_minutes("1-2:30").unwrap(), 1440 + 120 + 30);
    }

    #[test]
    fn days_hours_minutes_seconds() {
        assert_eq!(
            parse_time_minutes("1-2:30:45").unwrap(),
            1440 + 120 + 30 + 1
        );
    }

    #[test]
    fn round_trip_law() {
        for d in 0u32..5 {
            for h in [0u32, 5, 23] {
                for m in [0u32, 5, 59] {
                    for s in [0u32, 1, 59] {
                        let input = format!("{d}-{h}:{m}:{s}");
                        let expected = 60 * 24 * d + 60 * h + m + s.div_ceil(60);
                        assert_eq!(parse_time_minutes(&input).unwrap(), expected, "{input}");
                    }
                }
            }
        }
    }
}
