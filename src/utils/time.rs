use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Parse time string in HH:MM format
pub fn parse_time(time_str: &str) -> Option<NaiveTime> {
    let parts: Vec<&str> = time_str.split(':').collect();
    if parts.len() != 2 {
        return None;
    }
    let hour = parts[0].parse::<u32>().ok()?;
    let minute = parts[1].parse::<u32>().ok()?;
    if hour > 23 || minute > 59 {
        return None;
    }
    NaiveTime::from_hms_opt(hour, minute, 0)
}

/// Resolve a wall-clock date and time in `tz`, taking the earlier instant on DST overlaps
pub fn local_datetime<Tz: TimeZone>(date: NaiveDate, time: NaiveTime, tz: &Tz) -> Option<DateTime<Tz>> {
    tz.from_local_datetime(&date.and_time(time)).earliest()
}

/// UTC bounds `[00:00, next 00:00)` of a local calendar day
pub fn local_day_bounds<Tz: TimeZone>(date: NaiveDate, tz: &Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let midnight = NaiveTime::from_hms_opt(0, 0, 0)?;
    let start = local_datetime(date, midnight, tz)?;
    let end = local_datetime(date.succ_opt()?, midnight, tz)?;
    Some((start.with_timezone(&Utc), end.with_timezone(&Utc)))
}

/// Format a start time the way reminders show it, e.g. "12:00 PM"
pub fn format_clock_time<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%I:%M %p").to_string()
}

/// Hour-granular bucket label, e.g. "2024-03-04-11"
pub fn hour_bucket<Tz: TimeZone>(time: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    time.format("%Y-%m-%d-%H").to_string()
}
