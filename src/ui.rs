use std::collections::{BTreeMap, HashSet};
use std::error::Error;
use std::fmt::Display;
use std::io;
use std::path::Path;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Local, NaiveDate, TimeZone, Utc, Weekday};
use crossterm::event::{self, Event as CEvent, KeyCode, KeyEventKind};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{execute, ExecutableCommand};
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};
use ratatui::{Frame, Terminal};

use crate::domain::{format_duration, normalize_tags, EntrySource, Sheet};
use crate::live::{Effect, LiveCoordinator, Signal};
use crate::projection::{
	assemble, day_split_totals, GroupKey, ProjectionError, WeekView,
};
use crate::storage::{load_sheet, save_sheet};

const FOCUSED_PANEL_BORDER_COLOR: Color = Color::Yellow;
const INACTIVE_PANEL_BORDER_COLOR: Color = Color::DarkGray;
const HIGHLIGHT_BACKGROUND_COLOR: Color = Color::Rgb(42, 45, 52);
const WEEK_BAR_WIDTH: i64 = 12;
const ACTIVE_POLL_MILLIS: u64 = 250;
const IDLE_POLL_MILLIS: u64 = 1000;

pub fn run_dashboard(sheet_path: &Path) -> Result<(), Box<dyn Error>> {
	enable_raw_mode()?;
	let mut stdout = io::stdout();
	stdout.execute(EnterAlternateScreen)?;
	let backend = CrosstermBackend::new(stdout);
	let mut terminal = Terminal::new(backend)?;

	let result = run_event_loop(&mut terminal, sheet_path);

	disable_raw_mode()?;
	execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
	terminal.show_cursor()?;

	result
}

fn run_event_loop(
	terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
	sheet_path: &Path,
) -> Result<(), Box<dyn Error>> {
	let mut sheet = load_sheet(sheet_path)?;
	let mut app = App::default();
	let mut coordinator = LiveCoordinator::new(Utc::now());

	// The initial load is just the first reconciliation.
	let effects = coordinator.on_signal(Signal::EntryChanged, Utc::now());
	apply_effects(&mut coordinator, effects, &mut sheet, sheet_path)?;

	loop {
		let now = Utc::now();
		let effects = coordinator.poll_heartbeat(now);
		if !effects.is_empty() {
			apply_effects(&mut coordinator, effects, &mut sheet, sheet_path)?;
		}

		let view = build_view(&app, &sheet, now)?;
		app.clamp_selection(&view);
		terminal.draw(|frame| draw_dashboard(frame, &app, &view))?;

		let poll_window = if coordinator.is_ticking() {
			StdDuration::from_millis(ACTIVE_POLL_MILLIS)
		} else {
			StdDuration::from_millis(IDLE_POLL_MILLIS)
		};

		if event::poll(poll_window)? {
			if let CEvent::Key(key) = event::read()? {
				if key.kind != KeyEventKind::Press {
					continue;
				}

				let should_quit = match &app.mode {
					InputMode::Prompt(_) => handle_prompt_key(
						&mut app,
						key.code,
						&mut sheet,
						sheet_path,
						&mut coordinator,
					)?,
					InputMode::Normal => handle_normal_key(
						&mut app,
						key.code,
						&mut sheet,
						sheet_path,
						&mut coordinator,
						&view,
					)?,
				};

				if should_quit {
					coordinator.teardown();
					break;
				}
			}
		}
	}

	Ok(())
}

fn apply_effects(
	coordinator: &mut LiveCoordinator,
	effects: Vec<Effect>,
	sheet: &mut Sheet,
	sheet_path: &Path,
) -> Result<(), Box<dyn Error>> {
	for effect in effects {
		match effect {
			Effect::Refetch { seq } => {
				// The signal carries no payload; fresh truth comes from disk.
				*sheet = load_sheet(sheet_path)?;
				let has_open = sheet.open_entry().is_some();
				let _ = coordinator.completed(seq, has_open);
			}
			// The heartbeat loop is the subscription for a file-backed
			// sheet; there is no push channel to re-open.
			Effect::Resubscribe => {}
			// The poll window is derived from coordinator.is_ticking().
			Effect::StartTicking | Effect::StopTicking => {}
		}
	}

	Ok(())
}

fn notify(
	coordinator: &mut LiveCoordinator,
	signal: Signal,
	sheet: &mut Sheet,
	sheet_path: &Path,
) -> Result<(), Box<dyn Error>> {
	let effects = coordinator.on_signal(signal, Utc::now());
	apply_effects(coordinator, effects, sheet, sheet_path)
}

fn handle_normal_key(
	app: &mut App,
	code: KeyCode,
	sheet: &mut Sheet,
	sheet_path: &Path,
	coordinator: &mut LiveCoordinator,
	view: &ViewModel,
) -> Result<bool, Box<dyn Error>> {
	match code {
		KeyCode::Char('q') => return Ok(true),
		KeyCode::Tab | KeyCode::BackTab => app.focus = app.focus.next(),
		KeyCode::Down | KeyCode::Char('j') => app.move_selection(1, view),
		KeyCode::Up | KeyCode::Char('k') => app.move_selection(-1, view),
		KeyCode::Enter | KeyCode::Char(' ') => {
			if app.focus == FocusPane::Entries {
				app.toggle_expansion(view);
			}
		}
		KeyCode::Char('s') => {
			if sheet.open_entry().is_some() {
				app.status = "an entry is already running; stop it first (x)".to_string();
			} else {
				app.mode = InputMode::Prompt(PromptState::new(
					"Start entry (title, #tags)",
					PromptKind::StartEntry,
				));
			}
		}
		KeyCode::Char('x') => match sheet.stop_entry(Utc::now()) {
			Ok(id) => {
				save_sheet(sheet_path, sheet)?;
				notify(coordinator, Signal::EntryStopped, sheet, sheet_path)?;
				app.status = format!("stopped {id}");
			}
			Err(err) => app.status = format!("error: {err}"),
		},
		KeyCode::Char('r') => match app.selected_entry_id(view) {
			Some(id) => {
				app.mode = InputMode::Prompt(PromptState::new(
					format!("New title for {id}"),
					PromptKind::Retitle { id },
				));
			}
			None => app.status = SELECT_AN_ENTRY_HINT.to_string(),
		},
		KeyCode::Char('t') => match app.selected_entry_id(view) {
			Some(id) => {
				app.mode = InputMode::Prompt(PromptState::new(
					format!("Tags for {id} (space separated)"),
					PromptKind::EditTags { id },
				));
			}
			None => app.status = SELECT_AN_ENTRY_HINT.to_string(),
		},
		KeyCode::Char('d') => match app.selected_entry_id(view) {
			Some(id) => match sheet.delete_entry(&id) {
				Ok(removed) => {
					save_sheet(sheet_path, sheet)?;
					notify(coordinator, Signal::EntryDeleted, sheet, sheet_path)?;
					app.status = format!("deleted {} ({})", removed.id, removed.title);
				}
				Err(err) => app.status = format!("error: {err}"),
			},
			None => app.status = SELECT_AN_ENTRY_HINT.to_string(),
		},
		_ => {}
	}

	Ok(false)
}

const SELECT_AN_ENTRY_HINT: &str = "select an entry first (expand groups with enter)";

fn handle_prompt_key(
	app: &mut App,
	code: KeyCode,
	sheet: &mut Sheet,
	sheet_path: &Path,
	coordinator: &mut LiveCoordinator,
) -> Result<bool, Box<dyn Error>> {
	let InputMode::Prompt(prompt) = &mut app.mode else {
		return Ok(false);
	};

	match code {
		KeyCode::Esc => {
			app.mode = InputMode::Normal;
			app.status = "cancelled".to_string();
		}
		KeyCode::Backspace => {
			prompt.input.pop();
		}
		KeyCode::Char(c) => prompt.input.push(c),
		KeyCode::Enter => {
			let prompt = prompt.clone();
			app.mode = InputMode::Normal;
			app.status = submit_prompt(&prompt, sheet, sheet_path, coordinator)?;
		}
		_ => {}
	}

	Ok(false)
}

fn submit_prompt(
	prompt: &PromptState,
	sheet: &mut Sheet,
	sheet_path: &Path,
	coordinator: &mut LiveCoordinator,
) -> Result<String, Box<dyn Error>> {
	let outcome = match &prompt.kind {
		PromptKind::StartEntry => {
			let (title, tags) = parse_entry_input(&prompt.input);
			sheet
				.start_entry(title, tags, Utc::now())
				.map(|id| (Signal::EntryCreated, format!("started {id}")))
		}
		PromptKind::Retitle { id } => sheet
			.retitle_entry(id, prompt.input.trim().to_string())
			.map(|()| (Signal::EntryChanged, format!("retitled {id}"))),
		PromptKind::EditTags { id } => sheet
			.set_tags(id, normalize_tags(prompt.input.split_whitespace()))
			.map(|()| (Signal::EntryChanged, format!("retagged {id}"))),
	};

	match outcome {
		Ok((signal, message)) => {
			save_sheet(sheet_path, sheet)?;
			notify(coordinator, signal, sheet, sheet_path)?;
			Ok(message)
		}
		Err(err) => Ok(format!("error: {err}")),
	}
}

pub fn parse_entry_input(input: &str) -> (String, std::collections::BTreeSet<String>) {
	let mut title_words = Vec::new();
	let mut tags = Vec::new();
	for word in input.split_whitespace() {
		if let Some(tag) = word.strip_prefix('#') {
			tags.push(tag.to_string());
		} else {
			title_words.push(word);
		}
	}
	(title_words.join(" "), normalize_tags(tags))
}

fn build_view(app: &App, sheet: &Sheet, now: DateTime<Utc>) -> Result<ViewModel, ProjectionError> {
	let week_start = sheet.week_start();
	match sheet.fixed_offset() {
		Some(offset) => build_view_in(app, sheet, now, &offset, week_start),
		None => build_view_in(app, sheet, now, &Local, week_start),
	}
}

fn build_view_in<Tz>(
	app: &App,
	sheet: &Sheet,
	now: DateTime<Utc>,
	tz: &Tz,
	week_start: Weekday,
) -> Result<ViewModel, ProjectionError>
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	let owner = sheet.header.owner.clone();
	let entries = sheet.list_entries(&owner);
	let view = assemble(&entries, &owner, now, tz, week_start)?;
	let split_totals = day_split_totals(&entries, &owner, now, tz)?;

	let week_rows = build_week_rows(&view, &split_totals);
	let selected_day = week_rows
		.get(app.week_index.min(week_rows.len().saturating_sub(1)))
		.map(|row| row.day)
		.unwrap_or(view.today);
	let entry_rows = build_entry_rows(app, &view, selected_day, tz);

	Ok(ViewModel {
		view,
		week_rows,
		entry_rows,
		selected_day,
	})
}

fn build_week_rows(
	view: &WeekView,
	split_totals: &BTreeMap<NaiveDate, Duration>,
) -> Vec<WeekDayRow> {
	let max_day = view
		.range
		.days()
		.filter_map(|day| split_totals.get(&day))
		.copied()
		.max()
		.unwrap_or_else(Duration::zero);

	view.range
		.days()
		.rev()
		.map(|day| {
			let total = split_totals
				.get(&day)
				.copied()
				.unwrap_or_else(Duration::zero);
			let filled = if max_day > Duration::zero() {
				(total.num_seconds() * WEEK_BAR_WIDTH / max_day.num_seconds().max(1)) as usize
			} else {
				0
			};
			let bar = format!(
				"{}{}",
				"█".repeat(filled),
				"·".repeat(WEEK_BAR_WIDTH as usize - filled)
			);

			let mut spans = vec![Span::raw(format!("{} ", day.format("%a %d %b")))];
			let bar_style = if total > Duration::zero() {
				Style::default().fg(Color::LightYellow)
			} else {
				Style::default().fg(Color::DarkGray)
			};
			spans.push(Span::styled(bar, bar_style));
			spans.push(Span::raw(format!(" {}", format_duration(total))));
			if day == view.today {
				spans.push(Span::styled(
					" today",
					Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
				));
			}

			WeekDayRow {
				day,
				line: Line::from(spans),
			}
		})
		.collect()
}

fn build_entry_rows<Tz>(
	app: &App,
	view: &WeekView,
	selected_day: NaiveDate,
	tz: &Tz,
) -> Vec<EntryRow>
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	let Some(bucket) = view.days.iter().find(|bucket| bucket.day == selected_day) else {
		return Vec::new();
	};

	let mut rows = Vec::new();
	for group in &bucket.groups {
		let expanded = app.expanded.contains(&(bucket.day, group.key.clone()));
		let range_stop = match group.latest_stop {
			Some(stop) => {
				let mut text = local_clock(stop, tz);
				if stop.with_timezone(tz).date_naive() > bucket.day {
					text.push_str("+1d");
				}
				text
			}
			None => "now".to_string(),
		};

		let mut spans = vec![Span::raw(format!(
			"{}–{} ",
			local_clock(group.earliest_start, tz),
			range_stop
		))];
		spans.push(Span::styled(
			group.key.title.clone(),
			Style::default().add_modifier(Modifier::BOLD),
		));
		if !group.key.tags.is_empty() {
			let tags = group
				.key
				.tags
				.iter()
				.map(|tag| format!("#{tag}"))
				.collect::<Vec<_>>()
				.join(" ");
			spans.push(Span::styled(
				format!(" {tags}"),
				Style::default().fg(Color::Cyan),
			));
		}
		spans.push(Span::raw(format!(" | {}", format_duration(group.total))));
		if group.has_active_member {
			spans.push(Span::styled(
				" ●",
				Style::default().fg(Color::LightGreen),
			));
		}
		if group.is_cluster() {
			let arrow = if expanded { "▾" } else { "▸" };
			spans.push(Span::styled(
				format!(" {arrow}×{}", group.members.len()),
				Style::default().fg(Color::Magenta),
			));
		}
		if group.overlap_flag().is_some() {
			spans.push(Span::styled(
				" !",
				Style::default().fg(Color::LightRed).add_modifier(Modifier::BOLD),
			));
		}

		let sole_member = if group.members.len() == 1 {
			Some(group.members[0].entry.id.clone())
		} else {
			None
		};
		rows.push(EntryRow {
			line: Line::from(spans),
			kind: EntryRowKind::Group {
				day: bucket.day,
				key: group.key.clone(),
				cluster: group.is_cluster(),
				sole_member,
			},
		});

		if !(expanded && group.is_cluster()) {
			continue;
		}

		for member in &group.members {
			let stop_text = match member.entry.stop {
				Some(stop) => {
					let mut text = local_clock(stop, tz);
					if member.ends_on_later_day {
						text.push_str("+1d");
					}
					text
				}
				None => "now".to_string(),
			};

			let mut spans = vec![Span::raw(format!(
				"  · {}–{} | {}",
				local_clock(member.entry.start, tz),
				stop_text,
				member.entry.id,
			))];
			if let Some(peer) = &member.overlap_peer {
				spans.push(Span::styled(
					format!(" ! overlaps {peer}"),
					Style::default().fg(Color::LightRed),
				));
			}

			rows.push(EntryRow {
				line: Line::from(spans),
				kind: EntryRowKind::Member {
					entry_id: member.entry.id.clone(),
				},
			});
		}
	}

	rows
}

fn local_clock<Tz>(instant: DateTime<Utc>, tz: &Tz) -> String
where
	Tz: TimeZone,
	Tz::Offset: Display,
{
	instant.with_timezone(tz).format("%H:%M").to_string()
}

fn draw_dashboard(frame: &mut Frame, app: &App, view: &ViewModel) {
	let layout = Layout::default()
		.direction(Direction::Vertical)
		.constraints([
			Constraint::Length(3),
			Constraint::Min(10),
			Constraint::Length(4),
		])
		.split(frame.area());

	let body = Layout::default()
		.direction(Direction::Horizontal)
		.constraints([Constraint::Percentage(34), Constraint::Percentage(66)])
		.split(layout[1]);

	render_current_entry_bar(frame, layout[0], view);
	render_week_panel(frame, body[0], app, view);
	render_day_panel(frame, body[1], app, view);
	render_footer(frame, layout[2], app);

	if let InputMode::Prompt(prompt) = &app.mode {
		render_prompt_popup(frame, prompt);
	}
}

fn render_current_entry_bar(frame: &mut Frame, area: Rect, view: &ViewModel) {
	let line = match &view.view.current {
		Some(current) => {
			let mut spans = vec![
				Span::styled(
					format_duration(current.elapsed),
					Style::default().fg(Color::LightGreen).add_modifier(Modifier::BOLD),
				),
				Span::raw(" "),
				Span::styled(current.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
			];
			if !current.tags.is_empty() {
				let tags = current
					.tags
					.iter()
					.map(|tag| format!("#{tag}"))
					.collect::<Vec<_>>()
					.join(" ");
				spans.push(Span::styled(format!(" {tags}"), Style::default().fg(Color::Cyan)));
			}
			Line::from(spans)
		}
		None => Line::from(Span::styled(
			"no entry running, press s to start one",
			Style::default().fg(Color::DarkGray),
		)),
	};

	let block = Block::default().borders(Borders::ALL).title("Now");
	frame.render_widget(Paragraph::new(vec![line]).block(block), area);
}

fn render_week_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let title = format!(
		"Week {} – {} | total {}",
		view.view.range.start.format("%d %b"),
		view.view.range.end.format("%d %b"),
		format_duration(view.view.weekly_total)
	);

	let items = view
		.week_rows
		.iter()
		.map(|row| ListItem::new(row.line.clone()))
		.collect::<Vec<_>>();

	let mut state = ListState::default();
	if !view.week_rows.is_empty() {
		state.select(Some(app.week_index.min(view.week_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Week));
	let list = List::new(items)
		.block(block)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_day_panel(frame: &mut Frame, area: Rect, app: &App, view: &ViewModel) {
	let day_total = view
		.view
		.days
		.iter()
		.find(|bucket| bucket.day == view.selected_day)
		.map(|bucket| bucket.total)
		.unwrap_or_else(Duration::zero);
	let title = format!(
		"{} | total {}",
		view.selected_day.format("%A, %d %B %Y"),
		format_duration(day_total)
	);

	let mut items = view
		.entry_rows
		.iter()
		.map(|row| ListItem::new(row.line.clone()))
		.collect::<Vec<_>>();
	if items.is_empty() {
		items.push(ListItem::new("(no entries for this day)"));
	}

	let mut state = ListState::default();
	if !view.entry_rows.is_empty() {
		state.select(Some(app.entry_index.min(view.entry_rows.len() - 1)));
	}

	let block = Block::default()
		.borders(Borders::ALL)
		.title(title)
		.border_style(border_style(app.focus == FocusPane::Entries));
	let list = List::new(items)
		.block(block)
		.highlight_style(Style::default().bg(HIGHLIGHT_BACKGROUND_COLOR).add_modifier(Modifier::BOLD));

	frame.render_stateful_widget(list, area, &mut state);
}

fn render_footer(frame: &mut Frame, area: Rect, app: &App) {
	let keys = "s start | x stop | enter expand | r retitle | t tags | d delete | tab focus | q quit";
	let lines = vec![
		Line::from(Span::styled(keys, Style::default().fg(Color::DarkGray))),
		Line::from(app.status.clone()),
	];
	let block = Block::default().borders(Borders::ALL);
	frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_prompt_popup(frame: &mut Frame, prompt: &PromptState) {
	let area = centered_rect(frame.area(), 60, 3);
	frame.render_widget(Clear, area);

	let block = Block::default()
		.borders(Borders::ALL)
		.title(prompt.title.clone())
		.border_style(Style::default().fg(FOCUSED_PANEL_BORDER_COLOR));
	let text = Line::from(vec![
		Span::raw(prompt.input.clone()),
		Span::styled("▏", Style::default().fg(Color::Yellow)),
	]);
	frame.render_widget(Paragraph::new(vec![text]).block(block), area);
}

fn centered_rect(area: Rect, width: u16, height: u16) -> Rect {
	let width = width.min(area.width);
	let height = height.min(area.height);
	Rect {
		x: area.x + (area.width - width) / 2,
		y: area.y + (area.height - height) / 2,
		width,
		height,
	}
}

fn border_style(focused: bool) -> Style {
	if focused {
		Style::default().fg(FOCUSED_PANEL_BORDER_COLOR)
	} else {
		Style::default().fg(INACTIVE_PANEL_BORDER_COLOR)
	}
}

struct ViewModel {
	view: WeekView,
	week_rows: Vec<WeekDayRow>,
	entry_rows: Vec<EntryRow>,
	selected_day: NaiveDate,
}

struct WeekDayRow {
	day: NaiveDate,
	line: Line<'static>,
}

struct EntryRow {
	line: Line<'static>,
	kind: EntryRowKind,
}

#[derive(Debug, Clone)]
enum EntryRowKind {
	Group {
		day: NaiveDate,
		key: GroupKey,
		cluster: bool,
		sole_member: Option<String>,
	},
	Member {
		entry_id: String,
	},
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FocusPane {
	Week,
	Entries,
}

impl FocusPane {
	fn next(self) -> Self {
		match self {
			FocusPane::Week => FocusPane::Entries,
			FocusPane::Entries => FocusPane::Week,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PromptKind {
	StartEntry,
	Retitle { id: String },
	EditTags { id: String },
}

#[derive(Debug, Clone)]
struct PromptState {
	title: String,
	input: String,
	kind: PromptKind,
}

impl PromptState {
	fn new(title: impl Into<String>, kind: PromptKind) -> Self {
		Self {
			title: title.into(),
			input: String::new(),
			kind,
		}
	}
}

#[derive(Debug, Clone)]
enum InputMode {
	Normal,
	Prompt(PromptState),
}

struct App {
	focus: FocusPane,
	week_index: usize,
	entry_index: usize,
	expanded: HashSet<(NaiveDate, GroupKey)>,
	mode: InputMode,
	status: String,
}

impl Default for App {
	fn default() -> Self {
		Self {
			focus: FocusPane::Entries,
			week_index: 0,
			entry_index: 0,
			expanded: HashSet::new(),
			mode: InputMode::Normal,
			status: "Ready".to_string(),
		}
	}
}

impl App {
	fn clamp_selection(&mut self, view: &ViewModel) {
		if view.week_rows.is_empty() {
			self.week_index = 0;
		} else {
			self.week_index = self.week_index.min(view.week_rows.len() - 1);
		}

		if view.entry_rows.is_empty() {
			self.entry_index = 0;
		} else {
			self.entry_index = self.entry_index.min(view.entry_rows.len() - 1);
		}
	}

	fn move_selection(&mut self, delta: i32, view: &ViewModel) {
		let (index, len) = match self.focus {
			FocusPane::Week => (&mut self.week_index, view.week_rows.len()),
			FocusPane::Entries => (&mut self.entry_index, view.entry_rows.len()),
		};

		if len == 0 {
			*index = 0;
			return;
		}

		if delta > 0 {
			*index = (*index + delta as usize).min(len - 1);
		} else {
			*index = index.saturating_sub(delta.unsigned_abs() as usize);
		}

		if self.focus == FocusPane::Week {
			self.entry_index = 0;
		}
	}

	fn toggle_expansion(&mut self, view: &ViewModel) {
		let Some(row) = view.entry_rows.get(self.entry_index) else {
			return;
		};
		let EntryRowKind::Group { day, key, cluster, .. } = &row.kind else {
			return;
		};
		if !cluster {
			return;
		}

		let slot = (*day, key.clone());
		if !self.expanded.remove(&slot) {
			self.expanded.insert(slot);
		}
	}

	fn selected_entry_id(&self, view: &ViewModel) -> Option<String> {
		if self.focus != FocusPane::Entries {
			return None;
		}

		match &view.entry_rows.get(self.entry_index)?.kind {
			EntryRowKind::Group { sole_member, .. } => sole_member.clone(),
			EntryRowKind::Member { entry_id } => Some(entry_id.clone()),
		}
	}
}

#[cfg(test)]
mod tests {
	use crate::domain::normalize_tags;

	use super::parse_entry_input;

	#[test]
	fn splits_prompt_input_into_title_and_tags() {
		let (title, tags) = parse_entry_input("Fix login bug #work #urgent");
		assert_eq!(title, "Fix login bug");
		assert_eq!(tags, normalize_tags(["work", "urgent"]));
	}

	#[test]
	fn prompt_input_without_tags_keeps_full_title() {
		let (title, tags) = parse_entry_input("  Standup meeting  ");
		assert_eq!(title, "Standup meeting");
		assert!(tags.is_empty());
	}
}
