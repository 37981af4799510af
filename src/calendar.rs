use chrono::{DateTime, Datelike, Days, Duration, Months, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};

const WEEK_CANDIDATES: u64 = 6;

/// Which weekday opens a reporting week.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum WeekStart {
	#[default]
	Monday,
	Saturday,
}

impl WeekStart {
	/// Days to step back from `day` to reach the start of its week.
	fn days_back(self, day: NaiveDate) -> u64 {
		let weekday = day.weekday();
		match self {
			WeekStart::Monday => weekday.num_days_from_monday().into(),
			WeekStart::Saturday => ((weekday.num_days_from_sunday() + 1) % 7).into(),
		}
	}
}

/// First and last day of the month `months_back` months before the month of `origin`.
///
/// `from` is normalized to 00:00:00 and `to` to 23:59:59, both in the zone of `origin`.
pub fn month_range<Tz: TimeZone>(
	origin: &DateTime<Tz>,
	months_back: u32,
) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
	let local = origin.date_naive();
	let first_of_origin = NaiveDate::from_ymd_opt(local.year(), local.month(), 1)?;
	let first = first_of_origin.checked_sub_months(Months::new(months_back))?;
	let last = last_day_of_month(first)?;

	let zone = origin.timezone();
	Some((start_of_day(first, &zone), end_of_day(last, &zone)))
}

/// Day zero of the following month.
fn last_day_of_month(day: NaiveDate) -> Option<NaiveDate> {
	let first = day.with_day(1)?;
	first.checked_add_months(Months::new(1))?.pred_opt()
}

pub fn start_of_day<Tz: TimeZone>(day: NaiveDate, zone: &Tz) -> DateTime<Tz> {
	resolve_local(zone, day.and_time(NaiveTime::MIN))
}

pub fn end_of_day<Tz: TimeZone>(day: NaiveDate, zone: &Tz) -> DateTime<Tz> {
	let last_second = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN);
	resolve_local(zone, day.and_time(last_second))
}

// Skips forward past a DST gap; an ambiguous wall clock resolves to its earlier instant.
fn resolve_local<Tz: TimeZone>(zone: &Tz, naive: NaiveDateTime) -> DateTime<Tz> {
	let mut cursor = naive;
	for _ in 0..=120 {
		if let Some(timestamp) = zone.from_local_datetime(&cursor).earliest() {
			return timestamp;
		}
		let Some(next) = cursor.checked_add_signed(Duration::minutes(1)) else {
			break;
		};
		cursor = next;
	}

	zone.from_utc_datetime(&naive)
}

/// Resolves the reporting range: the month `months_back` months before `now`, with
/// `from`/`to` overriding either end independently.
pub fn report_range<Tz: TimeZone>(
	now: &DateTime<Tz>,
	months_back: u32,
	from: Option<NaiveDate>,
	to: Option<NaiveDate>,
) -> Option<(DateTime<Tz>, DateTime<Tz>)> {
	let (default_from, default_to) = month_range(now, months_back)?;
	let zone = now.timezone();

	let date_from = from
		.map(|day| start_of_day(day, &zone))
		.unwrap_or(default_from);
	let date_to = to.map(|day| end_of_day(day, &zone)).unwrap_or(default_to);
	Some((date_from, date_to))
}

/// Week starts whose week overlaps the month of `from`.
///
/// Walks up to six weeks from the start of the week containing `from`, dropping any week start
/// that already lies in the following month. Weeks that do not fit in the representable
/// calendar are left out.
pub fn week_starts(from: NaiveDate, week_start: WeekStart) -> Vec<NaiveDate> {
	let Some(first) = from.checked_sub_days(Days::new(week_start.days_back(from))) else {
		return Vec::new();
	};
	let following_month = from.month() % 12 + 1;

	(0..WEEK_CANDIDATES)
		.map_while(|week| first.checked_add_days(Days::new(week * 7)))
		.filter(|candidate| weekdays(*candidate).is_some())
		.filter(|candidate| candidate.month() != following_month)
		.collect()
}

/// The seven consecutive days opening at `start`, or `None` past the end of the calendar.
pub fn weekdays(start: NaiveDate) -> Option<[NaiveDate; 7]> {
	start.iter_days().take(7).collect::<Vec<_>>().try_into().ok()
}
