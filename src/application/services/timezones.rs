use chrono::{Offset, Utc};
use chrono_tz::{TZ_VARIANTS, Tz};

use crate::domain::models::TimezonePreference;

/// Current GMT offset label for an IANA zone, e.g. `(GMT+05:30)`.
/// Returns `None` for names missing from the timezone database.
pub fn gmt_offset(name: &str) -> Option<String> {
    let tz: Tz = name.parse().ok()?;
    Some(offset_label(&tz))
}

pub fn resolve(name: &str) -> Option<TimezonePreference> {
    gmt_offset(name).map(|value| TimezonePreference {
        key: name.to_string(),
        value,
    })
}

pub fn all_timezones() -> Vec<TimezonePreference> {
    TZ_VARIANTS
        .iter()
        .map(|tz| TimezonePreference {
            key: tz.name().to_string(),
            value: offset_label(tz),
        })
        .collect()
}

fn offset_label(tz: &Tz) -> String {
    let seconds = Utc::now().with_timezone(tz).offset().fix().local_minus_utc();
    format_offset(seconds)
}

fn format_offset(seconds: i32) -> String {
    let sign = if seconds < 0 { '-' } else { '+' };
    let seconds = seconds.unsigned_abs();
    format!("(GMT{sign}{:02}:{:02})", seconds / 3600, (seconds % 3600) / 60)
}
