mod calendar;
mod config;
mod domain;
mod events;
mod graph;
mod report;
mod subject;

use std::error::Error;
use std::path::PathBuf;

use chrono::{Local, NaiveDate};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::calendar::{WeekStart, report_range};
use crate::config::{Auth, EnvRc, user_name};
use crate::domain::aggregate;
use crate::events::{EventSource, JsonFileSource};
use crate::graph::GraphSource;
use crate::report::{ReportOptions, format_report};

#[derive(Debug, Parser)]
#[command(name = "timesheet", about = "Monthly timesheet from calendar events")]
struct Cli {
	/// Produce a timesheet for the month this many months back.
	#[arg(short = 'n', default_value_t = 0)]
	months_back: u32,
	/// Override the first day of the range (inclusive), YYYY-MM-DD.
	#[arg(long, value_parser = parse_day)]
	from: Option<NaiveDate>,
	/// Override the last day of the range (inclusive), YYYY-MM-DD.
	#[arg(long, value_parser = parse_day)]
	to: Option<NaiveDate>,
	/// Calendar user; defaults to UserName from .envrc.
	#[arg(long)]
	user: Option<String>,
	/// Read events from a JSON dump instead of the calendar service.
	#[arg(long)]
	events: Option<PathBuf>,
	/// Directory holding the .envrc file.
	#[arg(long, default_value = ".")]
	env_dir: PathBuf,
	#[arg(long, value_enum, default_value_t = WeekStart::Monday)]
	week_start: WeekStart,
	#[arg(short, long)]
	verbose: bool,
}

fn main() {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	if let Err(err) = run(cli) {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn init_logging(verbose: bool) {
	let default_level = if verbose { "debug" } else { "warn" };
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
	let env_rc = EnvRc::load(&cli.env_dir)?;
	let user_name = user_name(cli.user, &env_rc)?;

	let now = Local::now();
	let (date_from, date_to) = report_range(&now, cli.months_back, cli.from, cli.to)
		.ok_or_else(|| format!("{} months back is outside the supported calendar", cli.months_back))?;
	info!(%date_from, %date_to, user = %user_name, "reporting range");

	let source: Box<dyn EventSource> = match cli.events {
		Some(path) => {
			let source = JsonFileSource::new(path);
			info!(path = %source.path().display(), "reading events from file");
			Box::new(source)
		}
		None => Box::new(GraphSource::new(Auth::from_env(&env_rc)?)),
	};

	let tasks = source.read(&user_name, &date_from, &date_to)?;
	info!(tasks = tasks.len(), "collected tasks");

	let projects = aggregate(&tasks);
	let options = ReportOptions {
		date_from: date_from.date_naive(),
		date_to: date_to.date_naive(),
		today: now.date_naive(),
		week_start: cli.week_start,
	};
	println!("{}", format_report(&projects, &options).join("\n"));

	Ok(())
}

fn parse_day(input: &str) -> Result<NaiveDate, String> {
	NaiveDate::parse_from_str(input, "%Y-%m-%d").map_err(|err| format!("expected YYYY-MM-DD: {err}"))
}
