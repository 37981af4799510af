use chrono::{Datelike, Duration, NaiveDate};

use crate::calendar::{WeekStart, week_starts, weekdays};
use crate::domain::Project;

/// Inputs of a report besides the projects themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
	pub date_from: NaiveDate,
	pub date_to: NaiveDate,
	/// Reference date for short week labels; the year is omitted when it matches.
	pub today: NaiveDate,
	pub week_start: WeekStart,
}

/// Renders aggregated projects as report lines, ready to be joined with newlines.
pub fn format_report(projects: &[Project], options: &ReportOptions) -> Vec<String> {
	let mut output = vec![
		format!(
			"For the Dates {} - {}",
			options.date_from.format("%d %b %Y"),
			options.date_to.format("%d %b %Y")
		),
		String::new(),
	];

	let weeks = week_starts(options.date_from, options.week_start);

	for project in projects {
		output.push(format!(
			"{} = {}",
			project.name,
			format_long_duration(project.total_duration())
		));

		for week in &weeks {
			let Some(days) = weekdays(*week) else {
				continue;
			};
			let daily = days.map(|day| project.duration_on(day));
			let equation = daily
				.iter()
				.map(|duration| format_short_duration(*duration))
				.collect::<Vec<_>>()
				.join(" + ");
			let week_total = daily
				.iter()
				.fold(Duration::zero(), |acc, duration| acc + *duration);
			output.push(format!(
				"w/b {} - {} = {}",
				format_short_date(*week, options.today),
				equation,
				format_short_duration(week_total)
			));
		}

		output.push(String::new());
		for group in project.groups_by_start() {
			output.push(format!(
				"- {} ({})",
				group.group,
				format_long_duration(group.total_duration)
			));
		}

		output.push(String::new());
		for summary in project.summaries_by_start() {
			output.push(format!(
				"- {} {} ({})",
				summary.group,
				summary.description,
				format_long_duration(summary.total_duration)
			));
		}
		output.push(String::new());
	}

	output
}

// Whole hours and the remaining minutes; sub-minute precision is dropped.
fn hours_and_minutes(duration: Duration) -> (i64, i64) {
	let minutes = duration.num_minutes();
	(minutes / 60, minutes % 60)
}

/// `"0"`, `"45 min"`, `"2 hr"` or `"1 hr 30 min"`.
pub fn format_long_duration(duration: Duration) -> String {
	match hours_and_minutes(duration) {
		(0, 0) => "0".to_string(),
		(0, minutes) => format!("{minutes} min"),
		(hours, 0) => format!("{hours} hr"),
		(hours, minutes) => format!("{hours} hr {minutes} min"),
	}
}

/// `"0"`, `"2"` or `"1:30"`; minutes are not zero-padded.
pub fn format_short_duration(duration: Duration) -> String {
	match hours_and_minutes(duration) {
		(0, 0) => "0".to_string(),
		(hours, 0) => format!("{hours}"),
		(hours, minutes) => format!("{hours}:{minutes}"),
	}
}

pub fn format_short_date(day: NaiveDate, today: NaiveDate) -> String {
	if day.year() == today.year() {
		day.format("%d/%m").to_string()
	} else {
		day.format("%d/%m/%Y").to_string()
	}
}

#[cfg(test)]
mod tests {
	use chrono::{DateTime, Days, Duration, FixedOffset, NaiveDate, TimeZone};

	use crate::calendar::WeekStart;
	use crate::domain::{Task, aggregate};

	use super::{
		ReportOptions, format_long_duration, format_report, format_short_date, format_short_duration,
	};

	fn day(year: i32, month: u32, day: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(year, month, day).unwrap()
	}

	fn at(month: u32, day: u32, hour: u32) -> DateTime<FixedOffset> {
		FixedOffset::east_opt(3600)
			.unwrap()
			.with_ymd_and_hms(2024, month, day, hour, 0, 0)
			.unwrap()
	}

	fn task(project: &str, group: &str, description: &str, start: DateTime<FixedOffset>, minutes: i64) -> Task {
		Task {
			project: project.to_string(),
			group: group.to_string(),
			description: description.to_string(),
			start,
			duration: Duration::minutes(minutes),
		}
	}

	fn january_2024() -> ReportOptions {
		ReportOptions {
			date_from: day(2024, 1, 1),
			date_to: day(2024, 1, 31),
			today: day(2024, 6, 1),
			week_start: WeekStart::Monday,
		}
	}

	#[test]
	fn long_durations() {
		assert_eq!(format_long_duration(Duration::zero()), "0");
		assert_eq!(format_long_duration(Duration::minutes(45)), "45 min");
		assert_eq!(format_long_duration(Duration::minutes(90)), "1 hr 30 min");
		assert_eq!(format_long_duration(Duration::minutes(120)), "2 hr");
		assert_eq!(format_long_duration(Duration::seconds(59)), "0");
		assert_eq!(format_long_duration(Duration::seconds(61 * 60 + 59)), "1 hr 1 min");
	}

	#[test]
	fn short_durations() {
		assert_eq!(format_short_duration(Duration::zero()), "0");
		assert_eq!(format_short_duration(Duration::hours(3)), "3");
		assert_eq!(format_short_duration(Duration::minutes(65)), "1:5");
		assert_eq!(format_short_duration(Duration::minutes(30)), "0:30");
	}

	#[test]
	fn negative_durations_keep_their_sign() {
		assert_eq!(format_long_duration(Duration::minutes(-90)), "-1 hr -30 min");
		assert_eq!(format_short_duration(Duration::minutes(-60)), "-1");
	}

	#[test]
	fn short_dates_omit_the_current_year() {
		assert_eq!(format_short_date(day(2024, 3, 4), day(2024, 12, 31)), "04/03");
		assert_eq!(format_short_date(day(2023, 12, 25), day(2024, 1, 2)), "25/12/2023");
	}

	#[test]
	fn renders_a_week_of_daily_totals() {
		let tasks = vec![
			task("Acme", "Ops", "Deploy", at(1, 8, 9), 60),
			task("Acme", "Ops", "Deploy", at(1, 9, 9), 60),
			task("Acme", "Ops", "Deploy", at(1, 10, 9), 60),
		];

		let projects = aggregate(&tasks);
		let lines = format_report(&projects, &january_2024());

		let empty_week = "0 + 0 + 0 + 0 + 0 + 0 + 0 = 0";
		let expected = vec![
			"For the Dates 01 Jan 2024 - 31 Jan 2024".to_string(),
			String::new(),
			"Acme = 3 hr".to_string(),
			format!("w/b 01/01 - {empty_week}"),
			"w/b 08/01 - 1 + 1 + 1 + 0 + 0 + 0 + 0 = 3".to_string(),
			format!("w/b 15/01 - {empty_week}"),
			format!("w/b 22/01 - {empty_week}"),
			format!("w/b 29/01 - {empty_week}"),
			String::new(),
			"- Ops (3 hr)".to_string(),
			String::new(),
			"- Ops Deploy (3 hr)".to_string(),
			String::new(),
		];
		assert_eq!(lines, expected);
	}

	#[test]
	fn renders_projects_groups_and_tasks_in_start_order() {
		let tasks = vec![
			task("Beta", "", "Standup", at(1, 3, 10), 15),
			task("Acme", "Build", "CI", at(1, 2, 14), 90),
			task("Acme", "Ops", "Deploy", at(1, 2, 9), 30),
			task("Acme", "Build", "Release", at(1, 4, 9), 45),
		];

		let projects = aggregate(&tasks);
		let lines = format_report(&projects, &january_2024());

		assert_eq!(lines[2], "Acme = 2 hr 45 min");
		assert_eq!(lines[3], "w/b 01/01 - 0 + 2 + 0 + 0:45 + 0 + 0 + 0 = 2:45");
		assert_eq!(lines[8], "");
		assert_eq!(&lines[9..11], ["- Ops (30 min)", "- Build (2 hr 15 min)"]);
		assert_eq!(lines[11], "");
		assert_eq!(
			&lines[12..15],
			["- Ops Deploy (30 min)", "- Build CI (1 hr 30 min)", "- Build Release (45 min)"]
		);
		assert_eq!(lines[15], "");
		assert_eq!(lines[16], "Beta = 15 min");
		assert!(lines.contains(&"-  Standup (15 min)".to_string()));
		assert!(lines.contains(&"-  (15 min)".to_string()));
	}

	#[test]
	fn week_labels_carry_the_year_when_it_differs_from_today() {
		let options = ReportOptions {
			date_from: day(2023, 12, 1),
			date_to: day(2023, 12, 31),
			today: day(2024, 1, 5),
			week_start: WeekStart::Monday,
		};
		let tasks = vec![task("Acme", "", "x", at(1, 1, 9), 60)];

		let lines = format_report(&aggregate(&tasks), &options);
		assert_eq!(lines[0], "For the Dates 01 Dec 2023 - 31 Dec 2023");
		assert!(lines[3].starts_with("w/b 27/11/2023 - "));
		assert!(lines[7].starts_with("w/b 25/12/2023 - "));
		assert_eq!(lines[8], "");
	}

	#[test]
	fn saturday_weeks_bucket_days_from_saturday() {
		let options = ReportOptions {
			week_start: WeekStart::Saturday,
			..january_2024()
		};
		let tasks = vec![task("Acme", "", "x", at(1, 6, 9), 60)];

		let lines = format_report(&aggregate(&tasks), &options);
		assert_eq!(lines[3], "w/b 30/12/2023 - 0 + 0 + 0 + 0 + 0 + 0 + 0 = 0");
		assert_eq!(lines[4], "w/b 06/01 - 1 + 0 + 0 + 0 + 0 + 0 + 0 = 1");
	}

	#[test]
	fn ranges_at_the_end_of_the_calendar_render_without_overflow() {
		let last = NaiveDate::MAX;
		let options = ReportOptions {
			date_from: last.checked_sub_days(Days::new(4)).unwrap(),
			date_to: last,
			today: day(2024, 6, 1),
			week_start: WeekStart::Monday,
		};
		let tasks = vec![task("Acme", "", "x", at(1, 8, 9), 60)];

		let lines = format_report(&aggregate(&tasks), &options);
		assert_eq!(lines[2], "Acme = 1 hr");
		assert!(lines.iter().filter(|line| line.starts_with("w/b ")).count() <= 1);
		assert_eq!(lines.last().map(String::as_str), Some(""));
	}

	#[test]
	fn no_projects_yields_only_the_header() {
		let lines = format_report(&[], &january_2024());
		assert_eq!(lines, vec!["For the Dates 01 Jan 2024 - 31 Jan 2024".to_string(), String::new()]);
	}
}
