use crate::db::kv_store::KeyValueStore;
use crate::operations::add::ExpenseForm;
use crate::operations::export::DirectorySink;
use crate::operations::view::{DerivedView, format_with_currency};
use crate::prompt::Prompter;
use crate::tracker::{CONFIRM_CLEAR, CONFIRM_DELETE, Tracker};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::{Alignment, Color, Constraint, Direction, Layout, Rect, Style},
    style::Modifier,
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};
use std::cell::RefCell;
use std::cmp::{max, min};
use std::io;
use std::path::PathBuf;
use std::rc::Rc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormField {
    Description,
    Amount,
    Date,
    Category,
}

impl FormField {
    fn next(self) -> Self {
        match self {
            FormField::Description => FormField::Amount,
            FormField::Amount => FormField::Date,
            FormField::Date => FormField::Category,
            FormField::Category => FormField::Description,
        }
    }

    fn prev(self) -> Self {
        match self {
            FormField::Description => FormField::Category,
            FormField::Amount => FormField::Description,
            FormField::Date => FormField::Amount,
            FormField::Category => FormField::Date,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingAction {
    Delete(String),
    ClearAll,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Mode {
    List,
    Search,
    Form(FormField),
    Confirm(PendingAction),
    Notice(String),
}

struct ModalPrompter {
    accepted: bool,
    notices: Vec<String>,
}

impl ModalPrompter {
    fn new(accepted: bool) -> Self {
        Self {
            accepted,
            notices: Vec::new(),
        }
    }
}

impl Prompter for ModalPrompter {
    fn confirm(&mut self, _message: &str) -> bool {
        self.accepted
    }

    fn notify(&mut self, message: &str) {
        self.notices.push(message.to_string());
    }
}

struct BrowseState {
    mode: Mode,
    view: Rc<RefCell<DerivedView>>,
    table_state: TableState,
    form: ExpenseForm,
    search_buffer: String,
    month: Option<String>,
    currency: String,
    export_dir: PathBuf,
    status: Option<String>,
    last_page_size: usize,
}

impl BrowseState {
    fn new<S: KeyValueStore>(tracker: &mut Tracker<S>, currency: &str, export_dir: PathBuf) -> Self {
        let view = Rc::new(RefCell::new(tracker.view()));
        let latest = Rc::clone(&view);
        tracker.subscribe(move |next| *latest.borrow_mut() = next.clone());

        let mut state = Self {
            mode: Mode::List,
            view,
            table_state: TableState::default(),
            form: tracker.new_form(),
            search_buffer: tracker.filter().search.clone(),
            month: tracker.filter().month.clone(),
            currency: currency.to_string(),
            export_dir,
            status: None,
            last_page_size: 1,
        };
        state.clamp_selection();
        state
    }

    fn row_count(&self) -> usize {
        self.view.borrow().filtered.len()
    }

    fn selected_id(&self) -> Option<String> {
        let selected = self.table_state.selected()?;
        self.view.borrow().filtered.get(selected).map(|e| e.id.clone())
    }

    fn clamp_selection(&mut self) {
        let rows = self.row_count();
        if rows == 0 {
            self.table_state.select(None);
        } else {
            let new_selected = match self.table_state.selected() {
                Some(sel) => min(sel, rows.saturating_sub(1)),
                None => 0,
            };
            self.table_state.select(Some(new_selected));
        }
    }

    fn move_selection(&mut self, delta: i32) {
        let rows = self.row_count();
        if rows == 0 {
            self.table_state.select(None);
            return;
        }

        let current = self.table_state.selected().unwrap_or(0) as i32;
        let max_index = rows.saturating_sub(1) as i32;
        let next = (current + delta).clamp(0, max_index) as usize;
        self.table_state.select(Some(next));
    }

    fn page_up(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(-page);
    }

    fn page_down(&mut self) {
        let page = max(1, self.last_page_size) as i32;
        self.move_selection(page);
    }

    fn show_notices(&mut self, notices: Vec<String>) {
        if !notices.is_empty() {
            self.mode = Mode::Notice(notices.join("\n"));
        }
    }

    fn form_field_mut(&mut self, field: FormField) -> Option<&mut String> {
        match field {
            FormField::Description => Some(&mut self.form.description),
            FormField::Amount => Some(&mut self.form.amount),
            FormField::Date => Some(&mut self.form.date),
            FormField::Category => None,
        }
    }
}

pub fn run_browse<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    currency: &str,
    export_dir: PathBuf,
) -> Result<(), String> {
    enable_raw_mode().map_err(|e| format!("Failed to enable raw mode: {}", e))?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)
        .map_err(|e| format!("Failed to enter alternate screen: {}", e))?;

    let result = (|| {
        let backend = ratatui::backend::CrosstermBackend::new(stdout);
        let mut terminal = ratatui::Terminal::new(backend)
            .map_err(|e| format!("Failed to initialize terminal: {}", e))?;

        let mut state = BrowseState::new(tracker, currency, export_dir);

        loop {
            terminal
                .draw(|frame| {
                    let size = frame.area();
                    let layout = Layout::default()
                        .direction(Direction::Vertical)
                        .constraints([
                            Constraint::Length(3),
                            Constraint::Length(4),
                            Constraint::Min(5),
                            Constraint::Length(3),
                        ])
                        .split(size);

                    render_header(frame, layout[0], &state);
                    render_summary(frame, layout[1], &state);
                    render_table(frame, layout[2], &mut state);
                    render_footer(frame, layout[3], &state);

                    match state.mode {
                        Mode::Form(field) => render_form_modal(frame, size, &state, field),
                        Mode::Confirm(ref action) => render_confirm_modal(frame, size, action),
                        Mode::Notice(ref message) => render_notice_modal(frame, size, message),
                        Mode::List | Mode::Search => {}
                    }
                })
                .map_err(|e| format!("Failed to draw terminal UI: {}", e))?;

            if event::poll(std::time::Duration::from_millis(200))
                .map_err(|e| format!("Failed to poll input: {}", e))?
            {
                let event = event::read().map_err(|e| format!("Failed to read input: {}", e))?;
                if let Event::Key(key) = event {
                    if handle_key(tracker, &mut state, key)? {
                        break;
                    }
                }
            }
        }

        Ok(())
    })();

    disable_raw_mode().map_err(|e| format!("Failed to disable raw mode: {}", e))?;
    let mut stdout = io::stdout();
    execute!(stdout, LeaveAlternateScreen)
        .map_err(|e| format!("Failed to leave alternate screen: {}", e))?;

    result
}

fn handle_key<S: KeyValueStore>(
    tracker: &mut Tracker<S>,
    state: &mut BrowseState,
    key: KeyEvent,
) -> Result<bool, String> {
    // Many terminals emit both a Press and a Release event. Only act on Press/Repeat.
    if key.kind == KeyEventKind::Release {
        return Ok(false);
    }

    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

    match state.mode.clone() {
        Mode::List => match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return Ok(true),
            KeyCode::Up => state.move_selection(-1),
            KeyCode::Down => state.move_selection(1),
            KeyCode::PageUp => state.page_up(),
            KeyCode::PageDown => state.page_down(),
            KeyCode::Home => state.table_state.select(Some(0)),
            KeyCode::End => {
                let rows = state.row_count();
                if rows > 0 {
                    state.table_state.select(Some(rows - 1));
                }
            }
            KeyCode::Char('a') => state.mode = Mode::Form(FormField::Description),
            KeyCode::Char('/') => state.mode = Mode::Search,
            KeyCode::Char('m') => tracker.cycle_month(),
            KeyCode::Char('x') => {
                state.search_buffer.clear();
                tracker.set_search("");
                tracker.set_month(None);
            }
            KeyCode::Char('d') => {
                if let Some(id) = state.selected_id() {
                    state.mode = Mode::Confirm(PendingAction::Delete(id));
                }
            }
            KeyCode::Char('C') => state.mode = Mode::Confirm(PendingAction::ClearAll),
            KeyCode::Char('e') => {
                let mut prompter = ModalPrompter::new(true);
                let sink = DirectorySink::new(&state.export_dir);
                match tracker.export(&sink, &mut prompter) {
                    Ok(Some(path)) => state.status = Some(format!("Exported to {}", path.display())),
                    Ok(None) => {}
                    Err(e) => prompter.notify(&e),
                }
                state.show_notices(prompter.notices);
            }
            _ => {}
        },
        Mode::Search => match key.code {
            KeyCode::Esc | KeyCode::Enter => state.mode = Mode::List,
            KeyCode::Backspace => {
                state.search_buffer.pop();
                tracker.set_search(&state.search_buffer);
            }
            KeyCode::Char(ch) if !ctrl => {
                state.search_buffer.push(ch);
                tracker.set_search(&state.search_buffer);
            }
            _ => {}
        },
        Mode::Form(field) => match key.code {
            KeyCode::Esc => {
                state.form.reset();
                state.mode = Mode::List;
            }
            KeyCode::Tab | KeyCode::Down => state.mode = Mode::Form(field.next()),
            KeyCode::BackTab | KeyCode::Up => state.mode = Mode::Form(field.prev()),
            KeyCode::Enter => {
                let mut prompter = ModalPrompter::new(true);
                if let Some(expense) = tracker.submit(&mut state.form, &mut prompter) {
                    state.status = Some(format!("Added '{}'", expense.description));
                    state.mode = Mode::List;
                    state.table_state.select(Some(0));
                } else {
                    state.show_notices(prompter.notices);
                }
            }
            KeyCode::Left | KeyCode::Right | KeyCode::Char(' ') if field == FormField::Category => {
                state.form.cycle_category();
            }
            KeyCode::Backspace => {
                if let Some(buffer) = state.form_field_mut(field) {
                    buffer.pop();
                }
            }
            KeyCode::Char(ch) if !ctrl => {
                if let Some(buffer) = state.form_field_mut(field) {
                    buffer.push(ch);
                }
            }
            _ => {}
        },
        Mode::Confirm(action) => match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                let mut prompter = ModalPrompter::new(true);
                match action {
                    PendingAction::Delete(id) => {
                        tracker.delete(&id, &mut prompter);
                        state.status = Some("Expense deleted".to_string());
                    }
                    PendingAction::ClearAll => {
                        tracker.clear_all(&mut prompter);
                        state.status = Some("All expenses cleared".to_string());
                    }
                }
                state.mode = Mode::List;
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => state.mode = Mode::List,
            _ => {}
        },
        Mode::Notice(_) => match key.code {
            // The form keeps its input after a rejected submission.
            KeyCode::Enter | KeyCode::Esc | KeyCode::Char(' ') => {
                state.mode = if state.form.description.is_empty()
                    && state.form.amount.is_empty()
                    && state.form.date.is_empty()
                {
                    Mode::List
                } else {
                    Mode::Form(FormField::Description)
                };
            }
            _ => {}
        },
    }

    state.month = tracker.filter().month.clone();
    state.clamp_selection();
    Ok(false)
}

fn render_header(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let view = state.view.borrow();
    let month = state.month.as_deref().unwrap_or("All Months");
    let search = if state.search_buffer.is_empty() {
        "(none)"
    } else {
        state.search_buffer.as_str()
    };
    let search_style = if state.mode == Mode::Search {
        Style::default().fg(Color::Yellow)
    } else {
        Style::default().fg(Color::White)
    };

    let line = Line::from(vec![
        Span::styled(
            "Expense Tracker",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  |  "),
        Span::raw(format!("Month: {} ({} available)", month, view.months.len())),
        Span::raw("  |  "),
        Span::styled(format!("Search: {}", search), search_style),
        Span::raw("  |  "),
        Span::raw(format!("Rows: {}", view.filtered.len())),
    ]);

    let block = Block::default().borders(Borders::ALL);
    let paragraph = Paragraph::new(line).block(block).alignment(Alignment::Left);
    frame.render_widget(paragraph, area);
}

fn render_summary(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let summary = state.view.borrow().summary;
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
            Constraint::Ratio(1, 3),
        ])
        .split(area);

    let cards = [
        ("Total Spent", format_with_currency(summary.total, &state.currency), Color::Green),
        ("Transactions", summary.count.to_string(), Color::Blue),
        ("Average", format_with_currency(summary.average, &state.currency), Color::Magenta),
    ];

    for (i, (label, value, color)) in cards.into_iter().enumerate() {
        let lines = vec![
            Line::from(Span::styled(
                value,
                Style::default().fg(color).add_modifier(Modifier::BOLD),
            )),
            Line::from(Span::styled(label, Style::default().fg(Color::Gray))),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .block(Block::default().borders(Borders::ALL))
                .alignment(Alignment::Center),
            columns[i],
        );
    }
}

fn render_footer(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState) {
    let hint = match state.mode {
        Mode::List => "↑/↓ move  a add  d delete  m month  / search  x clear filters  e export  C clear all  q/Esc exit",
        Mode::Search => "Type to search, Enter/Esc done",
        Mode::Form(_) => "Tab/↑/↓ field  ←/→ category  Enter add  Esc cancel",
        Mode::Confirm(_) => "y confirm  n/Esc cancel",
        Mode::Notice(_) => "Enter/Esc dismiss",
    };

    let mut spans = vec![Span::raw(hint)];
    if let Some(ref status) = state.status {
        spans.push(Span::raw("  |  "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Green)));
    }

    let block = Block::default().borders(Borders::ALL);
    frame.render_widget(
        Paragraph::new(Line::from(spans))
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: true }),
        area,
    );
}

fn render_table(frame: &mut ratatui::Frame, area: Rect, state: &mut BrowseState) {
    let block = Block::default().title("Expense History").borders(Borders::ALL);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let bold = Style::default().add_modifier(Modifier::BOLD);
    let header = Row::new([
        Cell::from("Date").style(bold),
        Cell::from("Description").style(bold),
        Cell::from("Category").style(bold),
        Cell::from("Amount").style(bold),
        Cell::from("Id").style(bold),
    ])
    .style(Style::default().fg(Color::White));

    let view = Rc::clone(&state.view);
    let view = view.borrow();
    let rows = view.filtered.iter().map(|expense| {
        let mut desc = expense.description.clone();
        if desc.chars().count() > 42 {
            desc = desc.chars().take(39).collect();
            desc.push_str("...");
        }
        let id_short: String = expense.id.chars().take(8).collect();

        Row::new([
            Cell::from(expense.display_date()),
            Cell::from(desc),
            Cell::from(expense.category.clone()).style(Style::default().fg(Color::Cyan)),
            Cell::from(format_with_currency(expense.amount, &state.currency)),
            Cell::from(id_short),
        ])
    });

    // Leave room for the header row.
    state.last_page_size = max(1, inner.height.saturating_sub(2) as usize);

    let widths = [
        Constraint::Length(10),
        Constraint::Percentage(40),
        Constraint::Length(16),
        Constraint::Length(16),
        Constraint::Length(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .row_highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .fg(Color::White)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("➤ ")
        .column_spacing(1);

    frame.render_stateful_widget(table, inner, &mut state.table_state);

    if let Some(empty) = view.empty_state {
        let lines = vec![
            Line::from(Span::styled(empty.title(), bold)),
            Line::from(empty.hint()),
        ];
        frame.render_widget(
            Paragraph::new(lines)
                .alignment(Alignment::Center)
                .style(Style::default().fg(Color::DarkGray)),
            inner,
        );
    }
}

fn render_form_modal(frame: &mut ratatui::Frame, area: Rect, state: &BrowseState, active: FormField) {
    let popup_area = centered_rect(70, 50, area);
    frame.render_widget(Clear, popup_area);

    let field_line = |field: FormField, label: &str, value: &str| {
        let style = if field == active {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        let marker = if field == active { "> " } else { "  " };
        Line::from(vec![
            Span::styled(format!("{}{:<13}", marker, label), style),
            Span::styled(value.to_string(), style),
        ])
    };

    let amount_label = format!("Amount ({})", state.currency);
    let category = format!("< {} >", state.form.category());
    let lines = vec![
        Line::from(Span::styled(
            "Add New Expense",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        field_line(FormField::Description, "Description", &state.form.description),
        field_line(FormField::Amount, &amount_label, &state.form.amount),
        field_line(FormField::Date, "Date", &state.form.date),
        field_line(FormField::Category, "Category", &category),
        Line::from(""),
        Line::from(Span::styled(
            "Dates use YYYY-MM-DD",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let block = Block::default().borders(Borders::ALL).title("New Expense");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        popup_area,
    );
}

fn render_confirm_modal(frame: &mut ratatui::Frame, area: Rect, action: &PendingAction) {
    let popup_area = centered_rect(60, 25, area);
    frame.render_widget(Clear, popup_area);

    let question = match action {
        PendingAction::Delete(_) => CONFIRM_DELETE,
        PendingAction::ClearAll => CONFIRM_CLEAR,
    };
    let lines = vec![
        Line::from(Span::styled(
            question,
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from(Span::styled("y / n", Style::default().fg(Color::Yellow))),
    ];

    let block = Block::default().borders(Borders::ALL).title("Confirm");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup_area,
    );
}

fn render_notice_modal(frame: &mut ratatui::Frame, area: Rect, message: &str) {
    let popup_area = centered_rect(60, 25, area);
    frame.render_widget(Clear, popup_area);

    let lines: Vec<Line> = message
        .lines()
        .map(|l| Line::from(Span::styled(l.to_string(), Style::default().fg(Color::Red))))
        .collect();

    let block = Block::default().borders(Borders::ALL).title("Notice");
    frame.render_widget(
        Paragraph::new(lines)
            .block(block)
            .alignment(Alignment::Center)
            .wrap(Wrap { trim: true }),
        popup_area,
    );
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
