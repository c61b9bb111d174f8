//! Main application logic for the terminal user interface.
//!
//! `App` wraps a [`Controller`] and adds what only a terminal needs: table
//! selection, the search prompt, the help overlay and a one-line status message.
//! Everything else (filter, view, form, editor, pending deletions) is read from the
//! controller on each draw.

use std::io;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
    Frame, Terminal,
};

use crate::{
    controller::{Controller, EditTarget, Outcome, View},
    dates::{format_due_relative, now_ms},
    error::ValidationError,
    filter::Filter,
    form::{DUE_FIELD, STAGING_LIST, SUBTASK_FIELD, TEXT_FIELD},
    input::InputField,
    store::Storage,
    task::Id,
    tui::{
        colors::{ACCENT, DONE_GREEN, GOLD, OVERDUE_RED, PENDING_GREY},
        enums::AppState,
        utils::{centered_rect, progress_bar},
    },
    view::{ListRow, ListView, RowStatus, SubtaskState},
};

pub struct App<S: Storage> {
    ctl: Controller<S>,
    today: NaiveDate,
    task_list_state: TableState,
    subtask_list_state: TableState,
    show_help: bool,
    searching: bool,
    search_input: InputField,
    status_message: String,
}

impl<S: Storage> App<S> {
    pub fn new(ctl: Controller<S>, today: NaiveDate) -> Self {
        let search_input = InputField::with_value(ctl.search());
        let mut app = Self {
            ctl,
            today,
            task_list_state: TableState::default(),
            subtask_list_state: TableState::default(),
            show_help: false,
            searching: false,
            search_input,
            status_message: String::new(),
        };
        app.clamp_selection();
        app
    }

    pub fn controller(&self) -> &Controller<S> {
        &self.ctl
    }

    pub fn status_message(&self) -> &str {
        &self.status_message
    }

    pub fn state(&self) -> AppState {
        if self.show_help {
            AppState::Help
        } else if self.ctl.form().is_some() {
            AppState::Form
        } else if self.ctl.editor().is_some() {
            AppState::ProgressEditor
        } else if self.searching {
            AppState::Search
        } else {
            match self.ctl.view() {
                View::List => AppState::TaskList,
                View::Detail { .. } => AppState::TaskDetail,
            }
        }
    }

    pub fn selected_row(&self) -> Option<usize> {
        self.task_list_state.selected()
    }

    /// Commit deletions whose window has passed and keep selections in range.
    pub fn tick(&mut self, now: Instant) {
        if self.ctl.commit_due_deletions(now) > 0 {
            self.clamp_selection();
        }
    }

    fn list_len(&self) -> usize {
        self.ctl.list_view(self.today).rows().len()
    }

    fn subtask_len(&self) -> usize {
        self.ctl.detail_view().map_or(0, |d| d.subtasks.len())
    }

    fn clamp_selection(&mut self) {
        let (tasks, subtasks) = (self.list_len(), self.subtask_len());
        clamp(&mut self.task_list_state, tasks);
        clamp(&mut self.subtask_list_state, subtasks);
    }

    fn selected_list_row(&self) -> Option<ListRow> {
        let idx = self.task_list_state.selected()?;
        self.ctl.list_view(self.today).rows().get(idx).cloned()
    }

    fn selected_task(&self) -> Option<Id> {
        self.selected_list_row().map(|r| r.id)
    }

    fn detail_task(&self) -> Option<Id> {
        match self.ctl.view() {
            View::Detail { task_id } => Some(task_id),
            View::List => None,
        }
    }

    fn selected_subtask(&self) -> Option<(Id, Id)> {
        let task_id = self.detail_task()?;
        let idx = self.subtask_list_state.selected()?;
        let detail = self.ctl.detail_view()?;
        detail.subtasks.get(idx).map(|s| (task_id, s.id))
    }

    fn report(&mut self, result: Result<Outcome, ValidationError>, applied: &str) -> Outcome {
        match result {
            Ok(Outcome::Applied) => {
                if !applied.is_empty() {
                    self.status_message = applied.to_string();
                }
                Outcome::Applied
            }
            Ok(other) => other,
            Err(e) => {
                self.status_message = e.to_string();
                Outcome::Skipped
            }
        }
    }

    /// Route one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        self.status_message.clear();
        self.ctl.dismiss_notice();
        if key == KeyCode::Char('c') && modifiers.contains(KeyModifiers::CONTROL) {
            return true;
        }
        let should_quit = match self.state() {
            AppState::Help => self.handle_help_input(key),
            AppState::Form => self.handle_form_input(key, modifiers),
            AppState::ProgressEditor => self.handle_editor_input(key),
            AppState::Search => self.handle_search_input(key),
            AppState::TaskDetail => self.handle_detail_input(key, modifiers),
            AppState::TaskList => self.handle_task_list_input(key, modifiers),
        };
        self.clamp_selection();
        should_quit
    }

    fn handle_help_input(&mut self, key: KeyCode) -> bool {
        if matches!(key, KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::F(1)) {
            self.show_help = false;
        }
        false
    }

    fn handle_search_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc => {
                self.searching = false;
                self.search_input.clear();
            }
            KeyCode::Enter => self.searching = false,
            KeyCode::Backspace => self.search_input.handle_backspace(),
            KeyCode::Delete => self.search_input.handle_delete(),
            KeyCode::Left => self.search_input.move_cursor_left(),
            KeyCode::Right => self.search_input.move_cursor_right(),
            KeyCode::Char(c) => self.search_input.handle_char(c),
            _ => return false,
        }
        let query = self.search_input.value.clone();
        let _ = self.ctl.set_search(&query);
        self.task_list_state.select(Some(0));
        false
    }

    fn handle_task_list_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let shift = modifiers.contains(KeyModifiers::SHIFT);
        let len = self.list_len();
        match key {
            KeyCode::Char('q') => return true,
            KeyCode::Esc => {
                if self.ctl.search().is_empty() {
                    return true;
                }
                self.search_input.clear();
                let _ = self.ctl.set_search("");
                self.status_message = "Search cleared".into();
            }
            KeyCode::Up if shift => self.move_task(-1),
            KeyCode::Down if shift => self.move_task(1),
            KeyCode::Char('K') => self.move_task(-1),
            KeyCode::Char('J') => self.move_task(1),
            KeyCode::Up | KeyCode::Char('k') => step(&mut self.task_list_state, -1, len),
            KeyCode::Down | KeyCode::Char('j') => step(&mut self.task_list_state, 1, len),
            KeyCode::Enter | KeyCode::Char(' ') => match self.selected_list_row() {
                Some(row) if row.actions.open_detail => {
                    if self.ctl.open_detail(row.id) == Ok(Outcome::Applied) {
                        self.subtask_list_state.select(Some(0));
                    }
                }
                Some(_) => self.status_message = "Only tasks with subtasks have a detail view".into(),
                None => {}
            },
            KeyCode::Char('p') => match self.selected_list_row() {
                Some(row) if row.actions.edit_progress => {
                    let _ = self.ctl.open_progress_editor(EditTarget::Task(row.id));
                }
                Some(_) => self.status_message = "Progress of a task with subtasks is derived".into(),
                None => {}
            },
            KeyCode::Char('a') => {
                let _ = self.ctl.open_add_form();
            }
            KeyCode::Char('e') => {
                if let Some(id) = self.selected_task() {
                    let result = self.ctl.open_edit_form(id);
                    self.report(result, "");
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some(id) = self.selected_task() {
                    if self.ctl.request_delete_task(id, Instant::now()) == Ok(Outcome::Deferred) {
                        self.status_message = "Task deleted".into();
                    }
                }
            }
            KeyCode::Tab | KeyCode::Char('f') => self.set_filter(self.ctl.filter().next()),
            KeyCode::BackTab | KeyCode::Char('F') => self.set_filter(self.ctl.filter().prev()),
            KeyCode::Char(c @ '1'..='5') => {
                let idx = c as usize - '1' as usize;
                self.set_filter(Filter::ALL[idx]);
            }
            KeyCode::Char('/') => {
                self.searching = true;
                self.search_input = InputField::with_value(self.ctl.search());
                self.search_input.active = true;
            }
            KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            _ => {}
        }
        false
    }

    fn set_filter(&mut self, filter: Filter) {
        let _ = self.ctl.set_filter(filter);
        self.task_list_state.select(Some(0));
    }

    fn move_task(&mut self, delta: isize) {
        let Some(from) = self.task_list_state.selected() else {
            return;
        };
        let Some(to) = from.checked_add_signed(delta) else {
            return;
        };
        let result = self.ctl.reorder_tasks(from, to, self.today);
        if self.report(result, "") == Outcome::Applied {
            self.task_list_state.select(Some(to));
        }
    }

    fn handle_detail_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let shift = modifiers.contains(KeyModifiers::SHIFT);
        let len = self.subtask_len();
        match key {
            KeyCode::Char('q') | KeyCode::Esc | KeyCode::Backspace | KeyCode::Left => {
                let _ = self.ctl.back_to_list();
            }
            KeyCode::Up if shift => self.move_subtask(-1),
            KeyCode::Down if shift => self.move_subtask(1),
            KeyCode::Char('K') => self.move_subtask(-1),
            KeyCode::Char('J') => self.move_subtask(1),
            KeyCode::Up | KeyCode::Char('k') => step(&mut self.subtask_list_state, -1, len),
            KeyCode::Down | KeyCode::Char('j') => step(&mut self.subtask_list_state, 1, len),
            KeyCode::Enter | KeyCode::Char('p') | KeyCode::Char(' ') => {
                if let Some((task_id, subtask_id)) = self.selected_subtask() {
                    let target = EditTarget::Subtask { task_id, subtask_id };
                    if self.ctl.open_progress_editor(target) != Ok(Outcome::Applied) {
                        self.status_message = "Completed subtasks can only be deleted".into();
                    }
                }
            }
            KeyCode::Char('d') | KeyCode::Delete => {
                if let Some((task_id, subtask_id)) = self.selected_subtask() {
                    let _ = self.ctl.request_delete_subtask(task_id, subtask_id, Instant::now());
                }
            }
            KeyCode::Char('e') => {
                if let Some(task_id) = self.detail_task() {
                    let result = self.ctl.open_edit_form(task_id);
                    self.report(result, "");
                }
            }
            KeyCode::Char('h') | KeyCode::Char('?') | KeyCode::F(1) => self.show_help = true,
            _ => {}
        }
        false
    }

    fn move_subtask(&mut self, delta: isize) {
        let (Some(task_id), Some(from)) = (self.detail_task(), self.subtask_list_state.selected()) else {
            return;
        };
        let Some(to) = from.checked_add_signed(delta) else {
            return;
        };
        let result = self.ctl.reorder_subtasks(task_id, from, to);
        if self.report(result, "") == Outcome::Applied {
            self.subtask_list_state.select(Some(to));
        }
    }

    fn handle_editor_input(&mut self, key: KeyCode) -> bool {
        match key {
            KeyCode::Esc => {
                let _ = self.ctl.cancel_progress_editor();
            }
            KeyCode::Enter => {
                let result = self.ctl.commit_progress_editor();
                self.report(result, "Progress updated");
            }
            other => {
                if let Some(input) = self.ctl.editor_input_mut() {
                    match other {
                        KeyCode::Char(c) if c.is_ascii_digit() || c == '-' => input.handle_char(c),
                        KeyCode::Backspace => input.handle_backspace(),
                        KeyCode::Delete => input.handle_delete(),
                        KeyCode::Left => input.move_cursor_left(),
                        KeyCode::Right => input.move_cursor_right(),
                        KeyCode::Home => input.move_home(),
                        KeyCode::End => input.move_end(),
                        _ => {}
                    }
                }
            }
        }
        false
    }

    fn handle_form_input(&mut self, key: KeyCode, modifiers: KeyModifiers) -> bool {
        let Some(form) = self.ctl.form_mut() else {
            return false;
        };
        let on_staging = form.current_field == STAGING_LIST;
        match key {
            KeyCode::Esc => {
                let _ = self.ctl.close_form();
            }
            KeyCode::Char('s') if modifiers.contains(KeyModifiers::CONTROL) => self.submit_form(),
            KeyCode::Tab => form.next_field(),
            KeyCode::BackTab => form.prev_field(),
            KeyCode::Up if on_staging => form.handle_up_down(false),
            KeyCode::Down if on_staging => form.handle_up_down(true),
            KeyCode::Up => form.prev_field(),
            KeyCode::Down => form.next_field(),
            KeyCode::Enter if form.current_field == SUBTASK_FIELD => {
                let text = form.subtask_input.value.clone();
                let result = self.ctl.stage_subtask(&text, now_ms());
                if self.report(result, "") == Outcome::Applied {
                    if let Some(form) = self.ctl.form_mut() {
                        form.subtask_input.clear();
                    }
                }
            }
            KeyCode::Enter if on_staging => {}
            KeyCode::Enter => self.submit_form(),
            KeyCode::Delete | KeyCode::Backspace | KeyCode::Char('d') if on_staging => {
                if let Some(id) = form.selected_staged() {
                    let _ = self.ctl.unstage_subtask(id);
                }
            }
            KeyCode::Backspace => form.handle_backspace(),
            KeyCode::Delete => {
                if let Some(field) = form.active_input_mut() {
                    field.handle_delete();
                }
            }
            KeyCode::Left => form.handle_left_right(false),
            KeyCode::Right => form.handle_left_right(true),
            KeyCode::Char(c) => form.handle_char(c),
            _ => {}
        }
        false
    }

    fn submit_form(&mut self) {
        let editing = self.ctl.form().is_some_and(|f| f.is_edit());
        let result = self.ctl.submit_form(self.today, now_ms());
        let done = if editing { "Task updated" } else { "Task added" };
        if self.report(result, done) == Outcome::Applied && !editing {
            // new tasks land at the end of the list
            let len = self.list_len();
            self.task_list_state.select(len.checked_sub(1));
        }
    }

    // Rendering

    fn render_header(&self, f: &mut Frame, area: Rect) {
        let mut spans = vec![
            Span::styled("TASKBOARD", Style::default().add_modifier(Modifier::BOLD)),
            Span::raw("  "),
        ];
        for (i, filter) in Filter::ALL.iter().enumerate() {
            let label = format!(" {} {} ", i + 1, filter.label());
            let style = if *filter == self.ctl.filter() {
                Style::default().bg(ACCENT).fg(Color::White).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(Color::Gray)
            };
            spans.push(Span::styled(label, style));
        }
        if !self.ctl.search().is_empty() {
            spans.push(Span::styled(
                format!("  search: {}", self.ctl.search()),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::ITALIC),
            ));
        }
        let header = Paragraph::new(Line::from(spans))
            .block(Block::default().borders(Borders::ALL))
            .alignment(Alignment::Center);
        f.render_widget(header, area);
    }

    fn render_task_list(&mut self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0)])
            .split(area);
        self.render_header(f, chunks[0]);

        let rows = match self.ctl.list_view(self.today) {
            ListView::Empty => {
                let placeholder = Paragraph::new(vec![
                    Line::from(""),
                    Line::from("No tasks here."),
                    Line::from("Press 'a' to add one, or change the filter with Tab."),
                ])
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::Gray))
                .block(Block::default().borders(Borders::ALL).title("Tasks"));
                f.render_widget(placeholder, chunks[1]);
                return;
            }
            ListView::Rows(rows) => rows,
        };

        let editing = self.ctl.editor().and_then(|e| match e.target {
            EditTarget::Task(id) => Some((id, e.input.value.clone())),
            EditTarget::Subtask { .. } => None,
        });

        let header = Row::new(["", "Task", "Due", "Progress"].map(|h| {
            Cell::from(h).style(Style::default().add_modifier(Modifier::BOLD))
        }))
        .style(Style::default().bg(ACCENT).fg(Color::White));

        let count = rows.len();
        let table_rows: Vec<Row> = rows
            .into_iter()
            .map(|row| {
                let mark = if row.complete { "[x]" } else { "[ ]" };
                let mut text = vec![Line::from(row.text.clone())];
                if let Some(summary) = &row.subtask_summary {
                    text.push(Line::styled(format!("  {summary}"), Style::default().fg(Color::Gray)));
                }
                let height = text.len() as u16;
                let due = match row.status {
                    RowStatus::Completed => {
                        Cell::from("completed").style(Style::default().fg(DONE_GREEN))
                    }
                    RowStatus::Due(d) => {
                        let style = if d < self.today {
                            Style::default().fg(OVERDUE_RED)
                        } else {
                            Style::default()
                        };
                        Cell::from(format!("{d} {}", format_due_relative(d, self.today))).style(style)
                    }
                };
                let progress = match (&editing, row.progress) {
                    (Some((id, input)), _) if *id == row.id => Cell::from(format!("[{input}▏] %"))
                        .style(Style::default().fg(Color::Black).bg(GOLD)),
                    (_, Some(p)) => Cell::from(format!("{} {p:>3}%", progress_bar(p, 10)))
                        .style(Style::default().fg(DONE_GREEN)),
                    (_, None) => Cell::from(""),
                };
                let style = if row.pending_delete {
                    Style::default().fg(PENDING_GREY).add_modifier(Modifier::CROSSED_OUT)
                } else if row.complete {
                    Style::default().fg(Color::Gray)
                } else {
                    Style::default()
                };
                Row::new(vec![Cell::from(mark), Cell::from(text), due, progress])
                    .height(height)
                    .style(style)
            })
            .collect();

        let widths = [
            Constraint::Length(3),
            Constraint::Min(20),
            Constraint::Length(22),
            Constraint::Length(16),
        ];
        let table = Table::new(table_rows, widths)
            .header(header)
            .block(Block::default().borders(Borders::ALL).title(format!(
                "Tasks ({}/{}) - Press 'h' for help",
                count,
                self.ctl.store().tasks().len()
            )))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, chunks[1], &mut self.task_list_state);
    }

    fn render_task_detail(&mut self, f: &mut Frame, area: Rect) {
        let Some(detail) = self.ctl.detail_view() else {
            return;
        };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(area);

        let summary = vec![
            Line::from(vec![
                Span::styled(detail.title.clone(), Style::default().add_modifier(Modifier::BOLD)),
                Span::raw(format!(
                    "   due {} ({})",
                    detail.due_date,
                    format_due_relative(detail.due_date, self.today)
                )),
            ]),
            Line::from(Span::styled(
                format!("{} {}%", progress_bar(detail.aggregate, 30), detail.aggregate),
                Style::default().fg(DONE_GREEN),
            )),
        ];
        f.render_widget(
            Paragraph::new(summary).block(Block::default().borders(Borders::ALL).title("Task")),
            chunks[0],
        );

        if detail.subtasks.is_empty() {
            let empty = Paragraph::new("No subtasks left. Press 'e' to add some.")
                .alignment(Alignment::Center)
                .block(Block::default().borders(Borders::ALL).title("Subtasks"));
            f.render_widget(empty, chunks[1]);
            return;
        }

        let rows: Vec<Row> = detail
            .subtasks
            .iter()
            .map(|s| {
                let state = match &s.state {
                    SubtaskState::Completed => {
                        Cell::from("✓ completed").style(Style::default().fg(DONE_GREEN))
                    }
                    SubtaskState::InProgress { progress } => {
                        Cell::from(format!("{} {progress:>3}%", progress_bar(*progress, 10)))
                    }
                    SubtaskState::Editing { input, .. } => Cell::from(format!("[{input}▏] %"))
                        .style(Style::default().fg(Color::Black).bg(GOLD)),
                };
                let style = if s.pending_delete {
                    Style::default().fg(PENDING_GREY).add_modifier(Modifier::CROSSED_OUT)
                } else {
                    Style::default()
                };
                Row::new(vec![Cell::from(s.text.clone()), state]).style(style)
            })
            .collect();

        let table = Table::new(rows, [Constraint::Min(20), Constraint::Length(18)])
            .block(Block::default().borders(Borders::ALL).title(
                "Subtasks - p progress, d delete, Shift+↑/↓ reorder, Esc back",
            ))
            .row_highlight_style(Style::default().bg(Color::Gray).fg(Color::Black))
            .highlight_symbol(">> ");
        f.render_stateful_widget(table, chunks[1], &mut self.subtask_list_state);
    }

    fn render_task_form(&self, f: &mut Frame, area: Rect) {
        let Some(form) = self.ctl.form() else {
            return;
        };
        let area = centered_rect(70, 70, area);
        f.render_widget(Clear, area);

        let title = if form.is_edit() { "Edit Task" } else { "Add Task" };
        let block = Block::default().borders(Borders::ALL).title(title);
        let inner = block.inner(area);
        f.render_widget(block, area);

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Length(3),
                Constraint::Min(3),
                Constraint::Length(1),
            ])
            .split(inner);

        let field_style = |idx: usize| {
            if form.current_field == idx {
                Style::default().fg(Color::Yellow)
            } else {
                Style::default()
            }
        };
        let fields = [
            (TEXT_FIELD, "Text", &form.text),
            (DUE_FIELD, "Due (YYYY-MM-DD, today, fri, in 3d; empty = default)", &form.due),
            (SUBTASK_FIELD, "New subtask (Enter to stage)", &form.subtask_input),
        ];
        for (idx, label, input) in fields {
            let widget = Paragraph::new(input.value.as_str())
                .block(Block::default().borders(Borders::ALL).title(label).border_style(field_style(idx)));
            f.render_widget(widget, chunks[idx]);
            if form.current_field == idx {
                let x = chunks[idx].x + 1 + input.cursor as u16;
                f.set_cursor_position((x.min(chunks[idx].right().saturating_sub(2)), chunks[idx].y + 1));
            }
        }

        let staged: Vec<Line> = if form.staging.is_empty() {
            vec![Line::styled("(none - the task tracks its own progress)", Style::default().fg(Color::Gray))]
        } else {
            form.staging
                .iter()
                .enumerate()
                .map(|(i, s)| {
                    let marker = if form.current_field == STAGING_LIST && i == form.staged_selected {
                        ">> "
                    } else {
                        "   "
                    };
                    Line::from(format!("{marker}{} ({})", s.text, s.progress))
                })
                .collect()
        };
        f.render_widget(
            Paragraph::new(staged).block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!("Subtasks ({})", form.staging.len()))
                    .border_style(field_style(STAGING_LIST)),
            ),
            chunks[3],
        );
        f.render_widget(
            Paragraph::new("Tab next field | Enter save | Ctrl+S save | Del remove subtask | Esc cancel")
                .style(Style::default().fg(Color::Gray)),
            chunks[4],
        );
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        let help_text = vec![
            Line::styled("Taskboard Help", bold),
            Line::from(""),
            Line::styled("Task List:", bold),
            Line::from("  ↑/↓, k/j       Select task"),
            Line::from("  Shift+↑/↓, K/J Move task up/down"),
            Line::from("  Enter/Space    Open subtasks"),
            Line::from("  p              Set progress (tasks without subtasks)"),
            Line::from("  a / e / d      Add / edit / delete"),
            Line::from("  Tab, 1-5       Change filter"),
            Line::from("  /              Search"),
            Line::from("  q/Esc          Quit"),
            Line::from(""),
            Line::styled("Subtasks:", bold),
            Line::from("  p/Enter        Set progress"),
            Line::from("  d              Delete subtask"),
            Line::from("  Shift+↑/↓, K/J Move subtask"),
            Line::from("  e              Edit task"),
            Line::from("  Esc/q          Back to list"),
            Line::from(""),
            Line::styled("Due Date Formats:", bold),
            Line::from("  YYYY-MM-DD, today, tomorrow, fri, next mon, in 3d, in 2w, eow, eom"),
        ];
        let paragraph = Paragraph::new(help_text)
            .block(Block::default().borders(Borders::ALL).title("Help - Esc to return"))
            .wrap(Wrap { trim: false });
        f.render_widget(paragraph, area);
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect) {
        let (text, style) = if let Some(notice) = self.ctl.notice() {
            (notice.to_string(), Style::default().bg(OVERDUE_RED).fg(Color::White))
        } else if !self.status_message.is_empty() {
            (self.status_message.clone(), Style::default().bg(ACCENT).fg(Color::White))
        } else {
            let text = match self.state() {
                AppState::Search => format!(
                    "Search: {}▏ (Enter to keep, Esc to clear)",
                    self.search_input.value
                ),
                AppState::ProgressEditor => "Progress 0-100: Enter to save, Esc to cancel".into(),
                AppState::Form => "Editing task".into(),
                AppState::Help => "Help".into(),
                AppState::TaskDetail => "Subtasks | Press 'h' for help".into(),
                AppState::TaskList => format!(
                    "{} | {} shown | Press 'h' for help",
                    self.ctl.filter().label(),
                    self.list_len()
                ),
            };
            (text, Style::default().bg(ACCENT).fg(Color::White))
        };
        f.render_widget(Paragraph::new(text).style(style), area);
    }

    pub fn render(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(1)])
            .split(f.area());

        if self.show_help {
            self.render_help(f, chunks[0]);
        } else {
            match self.ctl.view() {
                View::List => self.render_task_list(f, chunks[0]),
                View::Detail { .. } => self.render_task_detail(f, chunks[0]),
            }
            if self.ctl.form().is_some() {
                self.render_task_form(f, chunks[0]);
            }
        }
        self.render_status_bar(f, chunks[1]);
    }

    /// Main event loop. Pending deletions are committed once per iteration and
    /// flushed on exit.
    pub fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> io::Result<()> {
        loop {
            self.today = crate::dates::today();
            self.tick(Instant::now());
            terminal.draw(|f| self.render(f))?;

            if event::poll(Duration::from_millis(50))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press && self.handle_key(key.code, key.modifiers) {
                        break;
                    }
                }
            }
        }
        self.ctl.flush_deletions();
        Ok(())
    }
}

fn clamp(state: &mut TableState, len: usize) {
    match (state.selected(), len) {
        (_, 0) => state.select(None),
        (None, _) => state.select(Some(0)),
        (Some(i), n) if i >= n => state.select(Some(n - 1)),
        _ => {}
    }
}

fn step(state: &mut TableState, delta: isize, len: usize) {
    if len == 0 {
        return;
    }
    let current = state.selected().unwrap_or(0);
    let next = current.saturating_add_signed(delta).min(len - 1);
    state.select(Some(next));
}
