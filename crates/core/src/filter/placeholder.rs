use std::sync::LazyLock;

use chrono::{DateTime, Days, Utc};
use regex::Regex;

use crate::doc::parse_instant;

static PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"(?i)^(?:\{\{)?\s*(now|today)\s*(?:([+-])\s*(\d+)\s*)?(?:\}\})?$").unwrap()
});

/// A resolved date value used in a comparison
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Moment {
	pub instant: DateTime<Utc>,
	/// Whether the value names a calendar day rather than an instant
	pub whole_day: bool,
}

impl Moment {
	/// The start of the day containing this moment
	pub fn day_start(&self) -> DateTime<Utc> {
		midnight(self.instant)
	}

	/// The start of the following day
	pub fn next_day(&self) -> DateTime<Utc> {
		let start = self.day_start();
		start.checked_add_days(Days::new(1)).unwrap_or(start)
	}
}

fn midnight(at: DateTime<Utc>) -> DateTime<Utc> {
	at.date_naive().and_hms_opt(0, 0, 0).map_or(at, |d| d.and_utc())
}

/// Resolves `now`, `today` and `today +/- N` (optionally wrapped in `{{ }}`) against `now`,
/// falling back to a literal date or timestamp
pub fn resolve(input: &str, now: DateTime<Utc>) -> Option<Moment> {
	if let Some(caps) = PLACEHOLDER.captures(input.trim()) {
		let base = match caps[1].to_ascii_lowercase().as_str() {
			"now" => now,
			_ => midnight(now),
		};
		let offset = caps.get(3).and_then(|n| n.as_str().parse::<u64>().ok()).map(Days::new);
		let instant = match (caps.get(2).map(|s| s.as_str()), offset) {
			(Some("+"), Some(days)) => base.checked_add_days(days)?,
			(Some("-"), Some(days)) => base.checked_sub_days(days)?,
			_ => base,
		};
		return Some(Moment {
			instant,
			whole_day: caps[1].eq_ignore_ascii_case("today"),
		});
	}
	let instant = parse_instant(input)?;
	Some(Moment {
		instant,
		whole_day: input.trim().len() == 10,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn now() -> DateTime<Utc> {
		DateTime::parse_from_rfc3339("2024-03-05T15:30:00Z").unwrap().with_timezone(&Utc)
	}

	fn at(s: &str) -> DateTime<Utc> {
		DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
	}

	#[rstest]
	#[case::now("now", "2024-03-05T15:30:00Z", false)]
	#[case::braced_now("{{now}}", "2024-03-05T15:30:00Z", false)]
	#[case::today("today", "2024-03-05T00:00:00Z", true)]
	#[case::braced_today("{{ today }}", "2024-03-05T00:00:00Z", true)]
	#[case::today_plus("{{today + 3}}", "2024-03-08T00:00:00Z", true)]
	#[case::today_minus("today-10", "2024-02-24T00:00:00Z", true)]
	#[case::uppercase("TODAY", "2024-03-05T00:00:00Z", true)]
	#[case::now_minus("{{now - 1}}", "2024-03-04T15:30:00Z", false)]
	#[case::literal_date("2024-01-31", "2024-01-31T00:00:00Z", true)]
	#[case::literal_instant("2024-01-31T08:00:00Z", "2024-01-31T08:00:00Z", false)]
	fn resolves_placeholders(#[case] input: &str, #[case] expected: &str, #[case] whole_day: bool) {
		let moment = resolve(input, now()).unwrap();
		assert_eq!(moment.instant, at(expected));
		assert_eq!(moment.whole_day, whole_day);
	}

	#[test]
	fn rejects_garbage() {
		assert_eq!(resolve("yesterday", now()), None);
		assert_eq!(resolve("{{today * 2}}", now()), None);
	}

	#[test]
	fn computes_day_bounds() {
		let moment = resolve("now", now()).unwrap();
		assert_eq!(moment.day_start(), at("2024-03-05T00:00:00Z"));
		assert_eq!(moment.next_day(), at("2024-03-06T00:00:00Z"));
	}
}
