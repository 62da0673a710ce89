pub mod data;

use std::collections::VecDeque;
use std::io::{self, stdout, Stdout, Write};
use std::path::Path;
use std::time::Duration;

use crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers,
        MouseButton, MouseEvent, MouseEventKind,
    },
    terminal::{self, EnterAlternateScreen, LeaveAlternateScreen},
    ExecutableCommand,
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};

use tabgrid_config::{ModePreference, Settings, ThemeRegistry};
use tabgrid_engine::column::column_letters;
use tabgrid_engine::style::attr;
use tabgrid_engine::{
    Column, DisplayModel, EditKey, EditState, GridController, GridError, InputEvent, Navigation, Renderer,
    ResolvedStyle, Response,
};

use crate::util;
use data::Table;

/// Rows taken by the title and status bars.
const CHROME_ROWS: u16 = 2;
/// Rows the mouse wheel scrolls per notch.
const WHEEL_ROWS: i64 = 3;

/// Requests the grid controller has no handler for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Save,
    NextTheme,
    PreviousTheme,
    InsertRow,
    DeleteRow,
    Quit,
}

/// Text around the grid, owned by the view loop.
#[derive(Debug, Default)]
struct Chrome {
    title: String,
    /// Right side of the status bar.
    info: String,
    message: Option<String>,
    show_help: bool,
    gutter: usize,
}

/// A drawn cell's screen position, for mouse hit tests.
#[derive(Debug, Clone, Copy)]
struct Hit {
    x: u16,
    y: u16,
    width: u16,
    row: usize,
    col: usize,
}

/// Draws display models with ratatui and turns crossterm input into grid
/// events.
pub struct TerminalRenderer {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    chrome: Chrome,
    pending: VecDeque<InputEvent>,
    commands: VecDeque<Command>,
    hits: Vec<Hit>,
    editing: bool,
    /// Column under the cursor and its current width.
    cursor_column: Option<(usize, f32)>,
}

impl TerminalRenderer {
    fn new(title: String) -> io::Result<Self> {
        let terminal = Terminal::new(CrosstermBackend::new(stdout()))?;
        let mut renderer = Self {
            terminal,
            chrome: Chrome { title, gutter: gutter_width(0), ..Chrome::default() },
            pending: VecDeque::new(),
            commands: VecDeque::new(),
            hits: Vec::new(),
            editing: false,
            cursor_column: None,
        };
        let size = renderer.terminal.size()?;
        let resize = renderer.resize_event(size.width, size.height);
        renderer.pending.push_back(resize);
        Ok(renderer)
    }

    fn queue(&mut self, command: Command) -> Option<InputEvent> {
        self.commands.push_back(command);
        None
    }

    fn take_command(&mut self) -> Option<Command> {
        self.commands.pop_front()
    }

    fn set_info(&mut self, info: String) {
        self.chrome.info = info;
    }

    fn set_message(&mut self, message: impl Into<String>) {
        self.chrome.message = Some(message.into());
    }

    /// Grid container for a terminal of `width` x `height` cells.
    fn resize_event(&self, width: u16, height: u16) -> InputEvent {
        let (width, height) = grid_container(width, height, self.chrome.gutter);
        InputEvent::Resize { width, height }
    }

    fn map_key(&mut self, key: KeyEvent) -> Option<InputEvent> {
        if self.chrome.show_help {
            self.chrome.show_help = false;
            return None;
        }
        self.chrome.message = None;

        if self.editing {
            return match key.code {
                KeyCode::Enter => Some(InputEvent::Commit),
                KeyCode::Esc => Some(InputEvent::Cancel),
                KeyCode::Backspace => Some(InputEvent::Key(EditKey::Backspace)),
                KeyCode::Delete => Some(InputEvent::Key(EditKey::Clear)),
                KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(InputEvent::Key(EditKey::Clear))
                }
                KeyCode::Char(ch) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                    Some(InputEvent::Key(EditKey::Char(ch)))
                }
                _ => None,
            };
        }

        match key.code {
            KeyCode::Char('q') => self.queue(Command::Quit),
            KeyCode::Char('s') => self.queue(Command::Save),
            KeyCode::Char('t') => self.queue(Command::NextTheme),
            KeyCode::Char('T') => self.queue(Command::PreviousTheme),
            KeyCode::Char('o') => self.queue(Command::InsertRow),
            KeyCode::Char('D') => self.queue(Command::DeleteRow),
            KeyCode::Char('?') => {
                self.chrome.show_help = true;
                None
            }
            KeyCode::Char('m') => Some(InputEvent::ToggleMode),
            KeyCode::Enter | KeyCode::F(2) | KeyCode::Char('e') => Some(InputEvent::ActivateCursor),
            KeyCode::Up | KeyCode::Char('k') => Some(InputEvent::Navigate(Navigation::Up)),
            KeyCode::Down | KeyCode::Char('j') => Some(InputEvent::Navigate(Navigation::Down)),
            KeyCode::Left | KeyCode::Char('h') => Some(InputEvent::Navigate(Navigation::Left)),
            KeyCode::Right | KeyCode::Char('l') => Some(InputEvent::Navigate(Navigation::Right)),
            KeyCode::Tab => Some(InputEvent::Navigate(Navigation::Right)),
            KeyCode::BackTab => Some(InputEvent::Navigate(Navigation::Left)),
            KeyCode::PageUp => Some(InputEvent::Navigate(Navigation::PageUp)),
            KeyCode::PageDown => Some(InputEvent::Navigate(Navigation::PageDown)),
            KeyCode::Home | KeyCode::Char('g') => Some(InputEvent::Navigate(Navigation::Home)),
            KeyCode::End | KeyCode::Char('G') => Some(InputEvent::Navigate(Navigation::End)),
            KeyCode::Char('>') => self.cursor_column.map(|(col, width)| InputEvent::ResizeColumn { col, width: width + 1.0 }),
            KeyCode::Char('<') => self.cursor_column.map(|(col, width)| InputEvent::ResizeColumn { col, width: width - 1.0 }),
            _ => None,
        }
    }

    fn map_mouse(&mut self, mouse: MouseEvent) -> Option<InputEvent> {
        match mouse.kind {
            MouseEventKind::ScrollDown => Some(InputEvent::Scroll { dx: 0, dy: WHEEL_ROWS }),
            MouseEventKind::ScrollUp => Some(InputEvent::Scroll { dx: 0, dy: -WHEEL_ROWS }),
            MouseEventKind::ScrollRight => Some(InputEvent::Scroll { dx: 1, dy: 0 }),
            MouseEventKind::ScrollLeft => Some(InputEvent::Scroll { dx: -1, dy: 0 }),
            MouseEventKind::Down(MouseButton::Left) => self
                .hits
                .iter()
                .find(|h| h.y == mouse.row && (h.x..h.x + h.width).contains(&mouse.column))
                .map(|h| InputEvent::Activate { row: h.row, col: h.col }),
            _ => None,
        }
    }
}

impl Renderer for TerminalRenderer {
    type Error = io::Error;

    fn render(&mut self, model: &DisplayModel) -> io::Result<()> {
        let gutter = gutter_width(model.scrollbars.vertical.total);
        if gutter != self.chrome.gutter {
            self.chrome.gutter = gutter;
            let size = self.terminal.size()?;
            let resize = self.resize_event(size.width, size.height);
            self.pending.push_back(resize);
        }

        self.editing = model.editor.is_some();
        self.cursor_column = model
            .cursor
            .and_then(|(_, col)| model.headers.iter().find(|h| h.col == col))
            .map(|h| (h.col, h.rect.width));

        let chrome = &self.chrome;
        let mut hits = Vec::new();
        self.terminal.draw(|frame| hits = chrome.draw(frame, model))?;
        self.hits = hits;
        Ok(())
    }

    fn poll_event(&mut self) -> io::Result<Option<InputEvent>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        if !event::poll(Duration::from_millis(100))? {
            return Ok(None);
        }
        Ok(match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => self.map_key(key),
            Event::Mouse(mouse) => self.map_mouse(mouse),
            Event::Resize(width, height) => Some(self.resize_event(width, height)),
            _ => None,
        })
    }
}

impl Chrome {
    /// Draw one frame. Returns the screen position of every drawn cell.
    fn draw(&self, frame: &mut Frame, model: &DisplayModel) -> Vec<Hit> {
        let chunks =
            Layout::vertical([Constraint::Length(1), Constraint::Min(2), Constraint::Length(1)]).split(frame.area());

        self.draw_title(frame, chunks[0], model);
        let hits = self.draw_grid(frame, chunks[1], model);
        self.draw_status(frame, chunks[2], model);

        if self.show_help {
            draw_help(frame, frame.area());
        }
        hits
    }

    fn draw_title(&self, frame: &mut Frame, area: Rect, model: &DisplayModel) {
        let title = format!(
            " tgrid: {} | {} rows x {} cols | {:?} ",
            self.title, model.scrollbars.vertical.total, model.scrollbars.horizontal.total, model.mode
        );
        let style = model
            .headers
            .first()
            .map(|h| to_style(&h.style))
            .unwrap_or_else(|| Style::default().fg(Color::Black).bg(Color::Cyan))
            .add_modifier(Modifier::BOLD);
        frame.render_widget(Paragraph::new(Line::from(Span::styled(title, style))).style(style), area);
    }

    fn draw_grid(&self, frame: &mut Frame, area: Rect, model: &DisplayModel) -> Vec<Hit> {
        let base = model.cells.first().map(|c| to_style(&c.style)).unwrap_or_default();
        frame.render_widget(Paragraph::new("").style(base), area);
        if model.headers.is_empty() {
            frame.render_widget(Paragraph::new("(empty)").style(base.add_modifier(Modifier::DIM)), area);
            return Vec::new();
        }

        let origin = area.x + self.gutter as u16 + 1;
        let gutter_style = base.add_modifier(Modifier::DIM);
        let buf = frame.buffer_mut();

        buf.set_stringn(area.x, area.y, " ".repeat(self.gutter + 1), self.gutter + 1, gutter_style);
        for header in &model.headers {
            if let Some((x, width)) = clip_span(area, origin, header.rect.x, header.rect.width) {
                let text = util::fit(&header.label, width, header.alignment);
                buf.set_stringn(x, area.y, text, width, to_style(&header.style));
            }
        }

        let first_row = model.viewport.scroll_row;
        for i in 0..model.viewport.visible_rows {
            let y = area.y + 1 + i as u16;
            if y >= area.bottom() {
                break;
            }
            let row = first_row + i;
            let style = if model.cursor.is_some_and(|(r, _)| r == row) {
                gutter_style.remove_modifier(Modifier::DIM).add_modifier(Modifier::BOLD)
            } else {
                gutter_style
            };
            let label = format!("{:>width$} ", row + 1, width = self.gutter);
            buf.set_stringn(area.x, y, label, self.gutter + 1, style);
        }

        let mut hits = Vec::with_capacity(model.cells.len());
        for cell in &model.cells {
            let y = area.y + 1 + cell.rect.y.max(0.0) as u16;
            if y >= area.bottom() {
                continue;
            }
            let Some((x, width)) = clip_span(area, origin, cell.rect.x, cell.rect.width) else {
                continue;
            };
            let text = util::fit(&cell.text, width, cell.alignment);
            buf.set_stringn(x, y, text, width, to_style(&cell.style));
            hits.push(Hit { x, y, width: width as u16, row: cell.row, col: cell.col });
        }

        if let Some(editor) = &model.editor {
            if let Some(hit) = hits.iter().find(|h| (h.row, h.col) == (editor.row, editor.col)) {
                let offset = util::display_width(&editor.text).min(hit.width.saturating_sub(1) as usize);
                frame.set_cursor_position((hit.x + offset as u16, hit.y));
            }
        }
        hits
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect, model: &DisplayModel) {
        let location = model.cursor.map(|(row, col)| {
            let text = model
                .cells
                .iter()
                .find(|c| (c.row, c.col) == (row, col))
                .map(|c| c.text.as_str())
                .unwrap_or("");
            format!("{}{} = {:?}", column_letters(col), row + 1, text)
        });

        let (left, style) = match (&model.editor, &self.message) {
            (Some(editor), _) if editor.error.is_some() => (
                format!(" {}", editor.error.as_deref().unwrap_or_default()),
                Style::default().fg(Color::White).bg(Color::Red),
            ),
            (_, Some(message)) => (format!(" {}", message), Style::default().fg(Color::Black).bg(Color::Yellow)),
            (Some(editor), None) => (
                format!(" editing {}{}: Enter commits, Esc cancels", column_letters(editor.col), editor.row + 1),
                Style::default().fg(Color::Black).bg(Color::DarkGray),
            ),
            (None, None) => (
                format!(" {}", location.unwrap_or_default()),
                Style::default().fg(Color::Black).bg(Color::DarkGray),
            ),
        };
        let right = format!("{}  ?: help ", self.info);

        let padding = (area.width as usize).saturating_sub(util::display_width(&left) + util::display_width(&right));
        let status = format!("{}{:pad$}{}", left, "", right, pad = padding);
        frame.render_widget(Paragraph::new(Line::from(Span::styled(status, style))).style(style), area);
    }
}

fn draw_help(frame: &mut Frame, area: Rect) {
    let help_lines = [
        "",
        "  Navigation",
        "  ----------",
        "  arrows / hjkl     Move cursor",
        "  Tab / Shift+Tab   Next/prev column",
        "  PgUp / PgDn       Page up/down",
        "  Home / g          First row",
        "  End  / G          Last row",
        "  mouse wheel       Scroll",
        "",
        "  Editing",
        "  -------",
        "  Enter / e / click Edit cell",
        "  Enter             Commit",
        "  Esc               Cancel",
        "  Del / Ctrl+U      Clear draft",
        "  < / >             Narrow/widen column",
        "  o / D             Insert/delete row",
        "",
        "  General",
        "  -------",
        "  s                 Save file",
        "  t / T             Next/prev theme",
        "  m                 Toggle light/dark",
        "  q                 Quit",
        "  ?                 Toggle this help",
        "",
    ];
    let help_width: u16 = 44;
    let help_height = help_lines.len() as u16 + 2;

    let x = area.width.saturating_sub(help_width) / 2;
    let y = area.height.saturating_sub(help_height) / 2;
    let popup = Rect::new(area.x + x, area.y + y, help_width.min(area.width), help_height.min(area.height));

    let lines: Vec<Line> =
        help_lines.iter().map(|s| Line::from(Span::styled(*s, Style::default().fg(Color::White)))).collect();

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Keybindings ")
        .title_style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
        .style(Style::default().bg(Color::Black));

    frame.render_widget(Clear, popup);
    frame.render_widget(Paragraph::new(lines).block(block), popup);
}

/// Row-number gutter wide enough for `rows`.
fn gutter_width(rows: usize) -> usize {
    let digits = rows.max(1).ilog10() as usize + 1;
    digits.max(3)
}

/// Grid container (in cells) for a terminal of `width` x `height`: the
/// gutter, title/status bars and header row are taken off.
fn grid_container(width: u16, height: u16, gutter: usize) -> (f32, f32) {
    let width = (width as usize).saturating_sub(gutter + 1);
    let height = height.saturating_sub(CHROME_ROWS + 1);
    (width as f32, height as f32)
}

/// Screen columns for a grid-space span starting at `origin`, clipped to
/// the right edge of `area`.
fn clip_span(area: Rect, origin: u16, x: f32, width: f32) -> Option<(u16, usize)> {
    if x < 0.0 {
        return None;
    }
    let start = origin as usize + x as usize;
    let right = area.right() as usize;
    if start >= right {
        return None;
    }
    let width = (width as usize).min(right - start);
    (width > 0).then_some((start as u16, width))
}

fn to_color(value: &str) -> Option<Color> {
    match tabgrid_config::Color::parse(value) {
        Some(color) => {
            let (r, g, b) = color.to_rgb8();
            Some(Color::Rgb(r, g, b))
        }
        None => value.trim().parse().ok(),
    }
}

/// Terminal style for resolved attributes. Unknown colors are left unset.
fn to_style(style: &ResolvedStyle) -> Style {
    let mut out = Style::default();
    if let Some(fg) = style.color().and_then(to_color) {
        out = out.fg(fg);
    }
    if let Some(bg) = style.background().and_then(to_color) {
        out = out.bg(bg);
    }
    for (name, modifier) in
        [(attr::BOLD, Modifier::BOLD), (attr::ITALIC, Modifier::ITALIC), (attr::UNDERLINE, Modifier::UNDERLINED)]
    {
        if style.flag(name) {
            out = out.add_modifier(modifier);
        }
    }
    out
}

/// Everything the interactive viewer needs besides the grid.
pub struct ViewSession<'a> {
    pub path: &'a Path,
    pub table: Table,
    pub themes: ThemeRegistry,
    pub settings: Settings,
}

/// Run the interactive viewer until the user quits.
pub fn run(grid: GridController, session: ViewSession<'_>) -> Result<(), String> {
    terminal::enable_raw_mode().map_err(|e| format!("failed to enable raw mode: {}", e))?;
    stdout().execute(EnterAlternateScreen).map_err(|e| format!("failed to enter alternate screen: {}", e))?;
    stdout().execute(EnableMouseCapture).map_err(|e| format!("failed to enable mouse capture: {}", e))?;

    struct Cleanup;
    impl Drop for Cleanup {
        fn drop(&mut self) {
            let _ = stdout().execute(DisableMouseCapture);
            let _ = stdout().execute(LeaveAlternateScreen);
            let _ = terminal::disable_raw_mode();
            let _ = stdout().flush();
        }
    }
    let _cleanup = Cleanup;

    let file_name = session.path.file_name().map(|n| n.to_string_lossy().to_string()).unwrap_or_default();
    let renderer = TerminalRenderer::new(file_name).map_err(|e| format!("failed to create terminal: {}", e))?;
    event_loop(grid, renderer, session)
}

fn event_loop(mut grid: GridController, mut renderer: TerminalRenderer, mut session: ViewSession<'_>) -> Result<(), String> {
    let mut redraw = true;
    let mut quit_armed = false;

    loop {
        let damage = grid.take_damage();
        if redraw || damage != tabgrid_engine::Damage::Clean {
            log::trace!("redraw ({:?})", damage);
            renderer.set_info(format!(
                "{} unsaved | {}",
                grid.store().dirty_count(),
                session.themes.active_name()
            ));
            grid.render(&mut renderer).map_err(|e| format!("draw error: {}", e))?;
            redraw = false;
        }

        if let Some(event) = renderer.poll_event().map_err(|e| format!("event error: {}", e))? {
            log::trace!("event {:?}", event);
            match grid.dispatch(event) {
                Ok(Response::Mode(mode)) => {
                    session.settings.mode = match mode {
                        tabgrid_engine::Mode::Light => ModePreference::Light,
                        tabgrid_engine::Mode::Dark => ModePreference::Dark,
                    };
                    persist(&session.settings);
                }
                Ok(Response::Edit(EditState::Committed)) => quit_armed = false,
                Ok(_) => {}
                // The editor shows validation errors itself.
                Err(GridError::InvalidValue { .. }) => {}
                Err(e) => renderer.set_message(e.to_string()),
            }
            redraw = true;
        }

        while let Some(command) = renderer.take_command() {
            redraw = true;
            match command {
                Command::Quit if grid.store().dirty_count() > 0 && !quit_armed => {
                    quit_armed = true;
                    renderer.set_message("unsaved changes: s to save, q again to quit");
                }
                Command::Quit => return Ok(()),
                Command::Save => match data::save_csv(session.path, &mut session.table, grid.store()) {
                    Ok(()) => {
                        grid.mark_all_saved();
                        quit_armed = false;
                        renderer.set_message(format!("saved {}", session.path.display()));
                    }
                    Err(e) => renderer.set_message(e),
                },
                Command::NextTheme | Command::PreviousTheme => {
                    if command == Command::NextTheme {
                        session.themes.next();
                    } else {
                        session.themes.previous();
                    }
                    match session.themes.apply(grid.resolver()) {
                        Ok(()) => {
                            session.settings.theme = session.themes.active_name().to_string();
                            persist(&session.settings);
                            renderer.set_message(format!("theme: {}", session.themes.active_name()));
                        }
                        Err(e) => renderer.set_message(e.to_string()),
                    }
                }
                Command::InsertRow => {
                    let at = grid.cursor().map(|(row, _)| row + 1).unwrap_or(0);
                    match grid.insert_row(at) {
                        Ok(()) => session.table.insert_row(at),
                        Err(e) => renderer.set_message(e.to_string()),
                    }
                }
                Command::DeleteRow => {
                    if let Some((row, _)) = grid.cursor() {
                        match grid.remove_row(row) {
                            Ok(()) => session.table.remove_row(row),
                            Err(e) => renderer.set_message(e.to_string()),
                        }
                    }
                }
            }
        }
    }
}

/// Best-effort settings write; the viewer keeps running on failure.
fn persist(settings: &Settings) {
    if let Err(e) = settings.save() {
        log::warn!("could not save settings: {}", e);
    }
}

/// Print a table as plain text to stdout (no TUI, no raw mode).
pub fn print_plain(table: &Table, columns: &[Column], max_rows: usize) -> Result<(), String> {
    let out = io::stdout();
    let mut w = out.lock();
    let row_num_width = gutter_width(table.num_rows());
    let limit = if max_rows == 0 { table.num_rows() } else { max_rows.min(table.num_rows()) };
    let widths: Vec<usize> = columns.iter().map(|c| c.width as usize).collect();

    write!(w, "{:>width$} ", "", width = row_num_width).map_err(|e| e.to_string())?;
    for (column, &cw) in columns.iter().zip(&widths) {
        write!(w, "{} ", util::fit(&column.label, cw, column.alignment)).map_err(|e| e.to_string())?;
    }
    writeln!(w).map_err(|e| e.to_string())?;

    write!(w, "{:->width$}-", "", width = row_num_width).map_err(|e| e.to_string())?;
    for &cw in &widths {
        write!(w, "{}-", "-".repeat(cw)).map_err(|e| e.to_string())?;
    }
    writeln!(w).map_err(|e| e.to_string())?;

    for (r, row) in table.rows.iter().take(limit).enumerate() {
        write!(w, "{:>width$} ", r + 1, width = row_num_width).map_err(|e| e.to_string())?;
        for ((value, column), &cw) in row.iter().zip(columns).zip(&widths) {
            write!(w, "{} ", util::fit(value, cw, column.alignment)).map_err(|e| e.to_string())?;
        }
        writeln!(w).map_err(|e| e.to_string())?;
    }

    if limit < table.num_rows() {
        writeln!(w, "... ({} more rows)", table.num_rows() - limit).map_err(|e| e.to_string())?;
    }

    Ok(())
}
