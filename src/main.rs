mod domain;
mod live;
mod projection;
mod storage;
mod ui;

use std::error::Error;
use std::path::PathBuf;

use chrono::{DateTime, Local, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::domain::{EntrySource, Sheet, format_duration, normalize_tags, parse_week_start, weekday_name};
use crate::projection::{ProjectionError, WeekView, assemble, day_split_totals};
use crate::storage::{load_sheet, recent_sheets, remember_sheet, resolve_sheet_path, save_sheet};

#[derive(Debug, Parser)]
#[command(name = "weeklog", about = "Terminal-first weekly time tracker")]
struct Cli {
	#[arg(long)]
	sheet: Option<PathBuf>,
	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
	Init {
		#[arg(long)]
		owner: Option<String>,
	},
	Dashboard,
	Start {
		#[arg(long)]
		title: String,
		#[arg(long = "tag")]
		tags: Vec<String>,
	},
	Stop,
	Log {
		#[arg(long)]
		title: String,
		#[arg(long = "tag")]
		tags: Vec<String>,
		#[arg(long)]
		start: String,
		#[arg(long)]
		stop: String,
	},
	Retitle {
		#[arg(long)]
		id: String,
		#[arg(long)]
		title: String,
	},
	Tag {
		#[arg(long)]
		id: String,
		#[arg(long)]
		tag: String,
	},
	Untag {
		#[arg(long)]
		id: String,
		#[arg(long)]
		tag: String,
	},
	Delete {
		#[arg(long)]
		id: String,
	},
	Entries {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	Week,
	Day {
		#[arg(long)]
		date: Option<String>,
	},
	Sheets {
		#[arg(long, default_value_t = 20)]
		limit: usize,
	},
	SetWeekStart {
		#[arg(long)]
		day: String,
	},
}

fn main() {
	if let Err(err) = run() {
		eprintln!("error: {err}");
		std::process::exit(1);
	}
}

fn run() -> Result<(), Box<dyn Error>> {
	let cli = Cli::parse();

	if let Some(Command::Sheets { limit }) = &cli.command {
		print_recent_sheets(*limit)?;
		return Ok(());
	}

	let sheet_path = resolve_sheet_path(cli.sheet)?;
	let mut sheet = load_sheet(&sheet_path)?;
	if let Err(err) = remember_sheet(&sheet_path) {
		eprintln!("warning: failed to store recent sheet: {err}");
	}

	match cli.command.unwrap_or(Command::Dashboard) {
		Command::Init { owner } => {
			if let Some(owner) = owner {
				sheet.header.owner = owner;
			}
			save_sheet(&sheet_path, &sheet)?;
			println!("initialized sheet at {}", sheet_path.display());
		}
		Command::Dashboard => {
			ui::run_dashboard(&sheet_path)?;
		}
		Command::Start { title, tags } => {
			let id = sheet.start_entry(title, normalize_tags(tags), Utc::now())?;
			save_sheet(&sheet_path, &sheet)?;
			println!("started {id}");
		}
		Command::Stop => {
			let id = sheet.stop_entry(Utc::now())?;
			save_sheet(&sheet_path, &sheet)?;
			println!("stopped {id}");
		}
		Command::Log {
			title,
			tags,
			start,
			stop,
		} => {
			let start = parse_datetime(&start)?;
			let stop = parse_datetime(&stop)?;
			let id = sheet.log_entry(title, normalize_tags(tags), start, stop)?;
			save_sheet(&sheet_path, &sheet)?;
			println!("logged {id}");
		}
		Command::Retitle { id, title } => {
			sheet.retitle_entry(&id, title)?;
			save_sheet(&sheet_path, &sheet)?;
			println!("retitled {id}");
		}
		Command::Tag { id, tag } => {
			sheet.add_tag(&id, tag)?;
			save_sheet(&sheet_path, &sheet)?;
			println!("tagged {id}");
		}
		Command::Untag { id, tag } => {
			sheet.remove_tag(&id, &tag)?;
			save_sheet(&sheet_path, &sheet)?;
			println!("untagged {id}");
		}
		Command::Delete { id } => {
			let removed = sheet.delete_entry(&id)?;
			save_sheet(&sheet_path, &sheet)?;
			println!("deleted {} ({})", removed.id, removed.title);
		}
		Command::Entries { limit } => {
			print_entries(&sheet, limit);
		}
		Command::Week => {
			print_week(&sheet, Utc::now())?;
		}
		Command::Day { date } => {
			print_day(&sheet, date.as_deref(), Utc::now())?;
		}
		Command::SetWeekStart { day } => {
			let weekday = parse_week_start(&day)
				.ok_or_else(|| format!("unknown weekday: {day}"))?;
			sheet.set_week_start(weekday);
			save_sheet(&sheet_path, &sheet)?;
			println!("week now starts on {}", weekday_name(weekday));
		}
		Command::Sheets { .. } => {}
	}

	Ok(())
}

fn assemble_for(sheet: &Sheet, now: DateTime<Utc>) -> Result<WeekView, ProjectionError> {
	let owner = sheet.header.owner.clone();
	let entries = sheet.list_entries(&owner);
	match sheet.fixed_offset() {
		Some(offset) => assemble(&entries, &owner, now, &offset, sheet.week_start()),
		None => assemble(&entries, &owner, now, &Local, sheet.week_start()),
	}
}

fn print_recent_sheets(limit: usize) -> Result<(), Box<dyn Error>> {
	let rows = recent_sheets(limit)?;
	if rows.is_empty() {
		println!("no recent sheets");
		return Ok(());
	}

	for (index, path) in rows.iter().enumerate() {
		println!("{:>2}. {}", index + 1, path.display());
	}

	Ok(())
}

fn print_entries(sheet: &Sheet, limit: usize) {
	let owner = sheet.header.owner.clone();
	let mut entries = sheet.list_entries(&owner);
	if entries.is_empty() {
		println!("no entries yet");
		return;
	}

	entries.sort_by(|left, right| right.start.cmp(&left.start));
	let now = Utc::now();
	for entry in entries.iter().take(limit) {
		let stop = entry
			.stop
			.map(|stop| stop.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
			.unwrap_or_else(|| "running".to_string());
		let tags = entry
			.tags
			.iter()
			.map(|tag| format!("#{tag}"))
			.collect::<Vec<_>>()
			.join(" ");
		println!(
			"{} | {} | {} -> {} | {} | {}",
			entry.id,
			format_duration(crate::projection::entry_duration(entry, now)),
			entry.start.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
			stop,
			entry.title,
			tags
		);
	}
}

fn print_week(sheet: &Sheet, now: DateTime<Utc>) -> Result<(), Box<dyn Error>> {
	let view = assemble_for(sheet, now)?;
	println!(
		"week {} - {} | total {}",
		view.range.start.format("%d %b"),
		view.range.end.format("%d %b"),
		format_duration(view.weekly_total)
	);

	if let Some(current) = &view.current {
		println!("running: {} | {}", current.title, format_duration(current.elapsed));
	}

	for bucket in &view.days {
		println!(
			"\n{} | total {}",
			bucket.day.format("%A, %d %B"),
			format_duration(bucket.total)
		);
		for group in &bucket.groups {
			let tags = group
				.key
				.tags
				.iter()
				.map(|tag| format!("#{tag}"))
				.collect::<Vec<_>>()
				.join(" ");
			let mut markers = String::new();
			if group.is_cluster() {
				markers.push_str(&format!(" x{}", group.members.len()));
			}
			if group.has_active_member {
				markers.push_str(" (running)");
			}
			if group.overlap_flag().is_some() {
				markers.push_str(" [overlap]");
			}
			println!(
				"  {} | {} {}{}",
				format_duration(group.total),
				group.key.title,
				tags,
				markers
			);
		}
	}

	Ok(())
}

fn print_day(sheet: &Sheet, date: Option<&str>, now: DateTime<Utc>) -> Result<(), Box<dyn Error>> {
	let day = parse_day(date)?;
	let owner = sheet.header.owner.clone();
	let entries = sheet.list_entries(&owner);
	let totals = match sheet.fixed_offset() {
		Some(offset) => day_split_totals(&entries, &owner, now, &offset)?,
		None => day_split_totals(&entries, &owner, now, &Local)?,
	};

	let total = totals.get(&day).copied().unwrap_or_else(chrono::Duration::zero);
	println!("{} | clocked {}", day.format("%Y-%m-%d"), format_duration(total));

	let view = assemble_for(sheet, now)?;
	if let Some(bucket) = view.days.iter().find(|bucket| bucket.day == day) {
		for group in &bucket.groups {
			println!(
				"  {} | {} ({} member{})",
				format_duration(group.total),
				group.key.title,
				group.members.len(),
				if group.members.len() == 1 { "" } else { "s" }
			);
		}
	}

	Ok(())
}

fn parse_datetime(input: &str) -> Result<DateTime<Utc>, Box<dyn Error>> {
	Ok(DateTime::parse_from_rfc3339(input)?.with_timezone(&Utc))
}

fn parse_day(input: Option<&str>) -> Result<NaiveDate, Box<dyn Error>> {
	if let Some(raw) = input {
		Ok(NaiveDate::parse_from_str(raw, "%Y-%m-%d")?)
	} else {
		Ok(Local::now().date_naive())
	}
}
