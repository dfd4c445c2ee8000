use crate::task::Task;
use crate::task_store::{StoreError, TaskStore};
use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode},
    terminal::{disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Terminal,
};
use std::io;

const HELP_LINE: &str =
    "a add  space toggle  c done  e edit  u due  d delete  x clear done  tab filter  q quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletionFilter {
    #[default]
    All,
    Active,
    Done,
}

impl CompletionFilter {
    pub fn next(self) -> Self {
        match self {
            Self::All => Self::Active,
            Self::Active => Self::Done,
            Self::Done => Self::All,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Self::All => Self::Done,
            Self::Active => Self::All,
            Self::Done => Self::Active,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::All => "All",
            Self::Active => "Active",
            Self::Done => "Done",
        }
    }
}

/// Controller state: the store plus view-only concerns (filter,
/// selection, status line). Holds no business logic of its own.
#[derive(Debug, Default)]
pub struct App {
    pub store: TaskStore,
    pub filter: CompletionFilter,
    pub selected: usize,
    pub status: Option<String>,
}

impl App {
    pub fn new() -> Self {
        Self {
            store: TaskStore::new(),
            filter: CompletionFilter::All,
            selected: 0,
            status: None,
        }
    }

    /// The rows currently on screen, in store order.
    pub fn visible_tasks(&self) -> Vec<Task> {
        match self.filter {
            CompletionFilter::All => self.store.list(),
            CompletionFilter::Active => self.store.filter_by_completion(false),
            CompletionFilter::Done => self.store.filter_by_completion(true),
        }
    }

    pub fn selected_id(&self) -> Option<u32> {
        self.visible_tasks().get(self.selected).map(|t| t.id)
    }

    pub fn add_task(&mut self, description: String, due_date: Option<NaiveDate>) {
        let id = self.store.create(description, due_date);
        log::debug!("created task #{id}");
        self.status = None;
    }

    pub fn toggle_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            let result = self.store.toggle_completed(id);
            self.report(result);
            self.clamp_selection();
        }
    }

    pub fn complete_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            let result = self.store.mark_completed(id);
            self.report(result);
            self.clamp_selection();
        }
    }

    pub fn delete_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            let result = self.store.remove(id);
            self.report(result);
            self.clamp_selection();
        }
    }

    pub fn edit_selected_description(&mut self, new_description: String) {
        if let Some(id) = self.selected_id() {
            let result = self.store.update_description(id, new_description);
            self.report(result);
        }
    }

    pub fn edit_selected_due_date(&mut self, new_due_date: Option<NaiveDate>) {
        if let Some(id) = self.selected_id() {
            let result = self.store.update_due_date(id, new_due_date);
            self.report(result);
        }
    }

    pub fn clear_completed(&mut self) {
        self.store.clear_completed();
        self.status = None;
        self.clamp_selection();
    }

    pub fn cycle_filter(&mut self, forward: bool) {
        self.filter = if forward {
            self.filter.next()
        } else {
            self.filter.prev()
        };
        self.selected = 0;
        self.status = None;
    }

    pub fn select_previous(&mut self) {
        if self.selected > 0 {
            self.selected -= 1;
        }
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.visible_tasks().len() {
            self.selected += 1;
        }
    }

    fn clamp_selection(&mut self) {
        let visible = self.visible_tasks().len();
        if visible == 0 {
            self.selected = 0;
        } else if self.selected >= visible {
            self.selected = visible - 1;
        }
    }

    // A store error here means a stale reference (the id came from the
    // last render), so it is logged and shown, never propagated.
    fn report(&mut self, result: Result<(), StoreError>) {
        match result {
            Ok(()) => self.status = None,
            Err(err) => {
                log::warn!("ignoring stale task reference: {err}");
                self.status = Some(err.to_string());
            }
        }
    }
}

pub fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints(vec![Constraint::Min(1), Constraint::Length(1)])
                .split(f.area());

            let tasks = app.visible_tasks();
            let items: Vec<ListItem> = tasks
                .iter()
                .enumerate()
                .map(|(i, t)| {
                    let marker = if t.completed { "[x]" } else { "[ ]" };
                    let description_style = if t.completed {
                        Style::default()
                            .fg(Color::DarkGray)
                            .add_modifier(Modifier::CROSSED_OUT)
                    } else {
                        Style::default().fg(Color::White)
                    };
                    let mut spans = vec![
                        Span::raw(format!("{} [#{}] ", marker, t.id)),
                        Span::styled(t.description.clone(), description_style),
                    ];
                    if let Some(due) = t.due_date {
                        spans.push(Span::raw(format!(" (Due: {})", due.format("%Y-%m-%d"))));
                    }
                    let item = ListItem::new(Line::from(spans));
                    if i == app.selected {
                        item.style(
                            Style::default()
                                .fg(Color::Cyan)
                                .add_modifier(Modifier::BOLD),
                        )
                    } else {
                        item
                    }
                })
                .collect();

            let list = List::new(items).block(
                Block::default()
                    .title(format!("Tasks ({})", app.filter.label()))
                    .borders(Borders::ALL),
            );
            f.render_widget(list, chunks[0]);

            let footer = match &app.status {
                Some(message) => {
                    Line::from(Span::styled(message.clone(), Style::default().fg(Color::Red)))
                }
                None => Line::from(HELP_LINE),
            };
            f.render_widget(Paragraph::new(footer), chunks[1]);
        })?;

        if let Event::Key(key) = event::read()? {
            match key.code {
                KeyCode::Char('q') => return Ok(()), // Quit
                KeyCode::Char('a') => {
                    // Add a new task. Emptiness is checked here; the
                    // store itself stays permissive.
                    if let Some(description) = prompt("Enter task description") {
                        if description.is_empty() {
                            app.status = Some("description cannot be empty".to_string());
                        } else if let Some(due_input) =
                            prompt("Enter due date (YYYY-MM-DD, blank for none)")
                        {
                            match parse_due_date(&due_input) {
                                Ok(due_date) => app.add_task(description, due_date),
                                Err(_) => {
                                    app.status = Some(format!("invalid due date: {due_input}"));
                                }
                            }
                        }
                    }
                }
                KeyCode::Char(' ') => app.toggle_selected(),
                KeyCode::Char('c') => app.complete_selected(),
                KeyCode::Char('d') => app.delete_selected(),
                KeyCode::Char('e') => {
                    if app.selected_id().is_some() {
                        if let Some(description) = prompt("Enter new description") {
                            if description.is_empty() {
                                app.status = Some("description cannot be empty".to_string());
                            } else {
                                app.edit_selected_description(description);
                            }
                        }
                    }
                }
                KeyCode::Char('u') => {
                    if app.selected_id().is_some() {
                        if let Some(due_input) =
                            prompt("Enter due date (YYYY-MM-DD, blank to clear)")
                        {
                            match parse_due_date(&due_input) {
                                Ok(due_date) => app.edit_selected_due_date(due_date),
                                Err(_) => {
                                    app.status = Some(format!("invalid due date: {due_input}"));
                                }
                            }
                        }
                    }
                }
                KeyCode::Char('x') => app.clear_completed(),
                KeyCode::Tab | KeyCode::Right => app.cycle_filter(true),
                KeyCode::Left => app.cycle_filter(false),
                KeyCode::Up => app.select_previous(),
                KeyCode::Down => app.select_next(),
                _ => {}
            }
        }
    }
}

fn parse_due_date(input: &str) -> Result<Option<NaiveDate>, chrono::ParseError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map(Some)
}

fn prompt(message: &str) -> Option<String> {
    disable_raw_mode().ok();
    println!("{}", message);
    let mut input = String::new();
    if io::stdin().read_line(&mut input).is_ok() {
        enable_raw_mode().ok();
        Some(input.trim().to_string())
    } else {
        enable_raw_mode().ok();
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn app_with_tasks() -> App {
        let mut app = App::new();
        app.add_task("one".to_string(), None);
        app.add_task("two".to_string(), Some(date("2024-01-01")));
        app.add_task("three".to_string(), None);
        app
    }

    #[test]
    fn filter_cycle_wraps_in_both_directions() {
        let mut filter = CompletionFilter::All;
        for _ in 0..3 {
            filter = filter.next();
        }
        assert_eq!(filter, CompletionFilter::All);
        assert_eq!(CompletionFilter::All.prev(), CompletionFilter::Done);
        assert_eq!(CompletionFilter::Done.next(), CompletionFilter::All);
    }

    #[test]
    fn parse_due_date_handles_blank_valid_and_garbage() {
        assert_eq!(parse_due_date(""), Ok(None));
        assert_eq!(parse_due_date("  "), Ok(None));
        assert_eq!(parse_due_date("2024-01-01"), Ok(Some(date("2024-01-01"))));
        assert!(parse_due_date("tomorrow").is_err());
        assert!(parse_due_date("2024-13-40").is_err());
    }

    #[test]
    fn visible_tasks_follow_the_filter() {
        let mut app = app_with_tasks();
        app.store.mark_completed(2).unwrap();

        app.filter = CompletionFilter::All;
        assert_eq!(app.visible_tasks().len(), 3);
        app.filter = CompletionFilter::Active;
        let ids: Vec<u32> = app.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![1, 3]);
        app.filter = CompletionFilter::Done;
        let ids: Vec<u32> = app.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![2]);
    }

    #[test]
    fn toggle_targets_the_visible_row_not_the_store_row() {
        let mut app = app_with_tasks();
        app.store.mark_completed(1).unwrap();
        app.filter = CompletionFilter::Active;
        app.selected = 1; // "three", which sits at store index 2

        app.toggle_selected();
        let done: Vec<u32> = app
            .store
            .filter_by_completion(true)
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(done, vec![1, 3]);
    }

    #[test]
    fn delete_clamps_the_selection_to_the_shrunk_list() {
        let mut app = app_with_tasks();
        app.selected = 2;
        app.delete_selected();
        assert_eq!(app.selected, 1);
        assert_eq!(app.visible_tasks().len(), 2);

        app.delete_selected();
        app.delete_selected();
        assert_eq!(app.selected, 0);
        assert!(app.visible_tasks().is_empty());
    }

    #[test]
    fn gestures_on_an_empty_list_are_no_ops() {
        let mut app = App::new();
        app.toggle_selected();
        app.complete_selected();
        app.delete_selected();
        app.edit_selected_description("ghost".to_string());
        app.edit_selected_due_date(None);
        assert!(app.status.is_none());
        assert!(app.store.list().is_empty());
    }

    #[test]
    fn clear_completed_resets_selection_and_status() {
        let mut app = app_with_tasks();
        app.store.mark_completed(1).unwrap();
        app.store.mark_completed(2).unwrap();
        app.selected = 2;
        app.clear_completed();
        assert_eq!(app.selected, 0);
        let ids: Vec<u32> = app.visible_tasks().iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn selection_moves_stay_in_bounds() {
        let mut app = app_with_tasks();
        app.select_previous();
        assert_eq!(app.selected, 0);
        app.select_next();
        app.select_next();
        app.select_next();
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn cycling_the_filter_resets_selection() {
        let mut app = app_with_tasks();
        app.selected = 2;
        app.cycle_filter(true);
        assert_eq!(app.filter, CompletionFilter::Active);
        assert_eq!(app.selected, 0);
    }
}
