use crate::app::{App, DialogChoice, InputMode, InputPurpose, LogLevel, ToastLevel};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Cell, Clear, Padding, Paragraph, Row, Table, Wrap},
};
use std::{io, time::Duration};

const TABLE_CHROME_ROWS: u16 = 12;

#[derive(Clone)]
struct Theme {
    accent: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 190, 255),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
        }
    }

    fn block(&self, title: &'static str) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: &'static str) -> Block<'static> {
        self.block(title).padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        app.poll_catalog();
        app.clamp_selection();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(200))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    let page = terminal
                        .size()
                        .map(|area| area.height.saturating_sub(TABLE_CHROME_ROWS) as usize)
                        .unwrap_or(10)
                        .max(1);
                    handle_key(app, key, page)?;
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent, page: usize) -> Result<()> {
    if app.dialog.is_some() {
        return handle_dialog_mode(app, key);
    }

    if app.help_open {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') => app.help_open = false,
            _ => {}
        }
        return Ok(());
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => {
            app.input_mode = InputMode::Normal;
            handle_normal_mode(app, key, page)
        }
        InputMode::Editing {
            prompt,
            mut buffer,
            purpose,
        } => handle_input_mode(app, key, prompt, &mut buffer, purpose),
    }
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') => app.dialog_choice_left(),
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Tab => {
            app.dialog_choice_right()
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.dialog_set_choice(DialogChoice::Yes);
            app.dialog_confirm();
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        KeyCode::Enter | KeyCode::Char(' ') => app.dialog_confirm(),
        KeyCode::Esc => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        _ => {}
    }
    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent, page: usize) -> Result<()> {
    match key.code {
        KeyCode::Char('q') | KeyCode::Char('Q') => app.should_quit = true,
        KeyCode::Char('?') | KeyCode::F(1) => app.help_open = true,
        KeyCode::Char('/') => app.enter_filter(),
        KeyCode::Esc => app.clear_filter(),
        KeyCode::Up | KeyCode::Char('k') => app.select_prev(),
        KeyCode::Down | KeyCode::Char('j') => app.select_next(),
        KeyCode::Home => app.select_first(),
        KeyCode::End => app.select_last(),
        KeyCode::PageUp => app.page_up(page),
        KeyCode::PageDown => app.page_down(page),
        KeyCode::Enter | KeyCode::Char(' ') => app.toggle_selected(),
        KeyCode::Char('o') | KeyCode::Char('O') => app.open_selected(),
        KeyCode::Char('p') | KeyCode::Char('P') => app.preview_selected(),
        KeyCode::Char('c') | KeyCode::Char('C') => app.copy_selected_path(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.rescan(),
        KeyCode::Char('u') | KeyCode::Char('U') => {
            app.start_catalog_refresh();
            if app.catalog_refreshing {
                app.status = "Refreshing character table...".to_string();
            }
        }
        KeyCode::Char('m') | KeyCode::Char('M') => app.enter_set_root(),
        KeyCode::Char('v') | KeyCode::Char('V') => app.enter_set_viewer(),
        KeyCode::Char('[') => app.scroll_log_up(3),
        KeyCode::Char(']') => app.scroll_log_down(3),
        _ => {}
    }
    Ok(())
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    prompt: String,
    buffer: &mut String,
    purpose: InputPurpose,
) -> Result<()> {
    match key.code {
        KeyCode::Enter => {
            if let Err(err) = app.handle_submit(purpose, buffer.clone()) {
                app.status = format!("Action failed: {err}");
                app.log_error(format!("Action failed: {err}"));
            }
            return Ok(());
        }
        KeyCode::Esc => {
            app.cancel_input(purpose);
            return Ok(());
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) => {
            buffer.push(c);
        }
        _ => {}
    }
    if purpose == InputPurpose::FilterMods {
        app.set_filter_live(buffer);
    }
    app.input_mode = InputMode::Editing {
        prompt,
        buffer: buffer.clone(),
        purpose,
    };
    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let theme = Theme::new();
    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(7),
            Constraint::Length(3),
        ])
        .split(frame.size());

    draw_header(frame, app, &theme, layout[0]);
    draw_mods(frame, app, &theme, layout[1]);
    draw_log(frame, app, &theme, layout[2]);
    draw_status(frame, app, &theme, layout[3]);

    if app.help_open {
        draw_help(frame, &theme);
    }
    if let Some(dialog) = &app.dialog {
        draw_dialog(frame, &theme, dialog);
    }
}

fn draw_header(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let root = app
        .config
        .mods_root
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "not set".to_string());
    let catalog = if app.catalog_refreshing {
        "refreshing...".to_string()
    } else {
        format!("{} entries", app.catalog.len())
    };
    let line = Line::from(vec![
        Span::styled(
            "SpineSmith ",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("mods: {root}"), Style::default().fg(theme.text)),
        Span::styled(
            format!("  table: {catalog}"),
            Style::default().fg(theme.muted),
        ),
    ]);
    let paragraph = Paragraph::new(line)
        .block(theme.panel("Overview"))
        .style(Style::default().bg(theme.header_bg));
    frame.render_widget(paragraph, area);
}

fn draw_mods(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let indices = app.visible_indices();
    let view_height = area.height.saturating_sub(3) as usize;
    let offset = app
        .selected
        .saturating_sub(view_height.saturating_sub(1).max(1));

    let rows: Vec<Row> = indices
        .iter()
        .enumerate()
        .skip(offset)
        .take(view_height.max(1))
        .map(|(position, &index)| {
            let row = &app.rows[index];
            let status_style = match row.folder.activation {
                crate::scan::Activation::Active => Style::default().fg(theme.success),
                crate::scan::Activation::Inactive => Style::default().fg(theme.muted),
                crate::scan::Activation::Missing => Style::default().fg(theme.warning),
            };
            let base = if position == app.selected {
                Style::default()
                    .fg(theme.text)
                    .bg(theme.header_bg)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            Row::new(vec![
                Cell::from(row.folder.author.clone()),
                Cell::from(row.display.character.clone()),
                Cell::from(row.display.costume.clone()),
                Cell::from(row.display.kind.label()),
                Cell::from(Span::styled(row.status_label(), status_style)),
            ])
            .style(base)
        })
        .collect();

    let title = if app.mod_filter.trim().is_empty() {
        format!("Mods ({})", indices.len())
    } else {
        format!("Mods ({} / {})", indices.len(), app.rows.len())
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(
            title,
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ));
    let table = Table::new(
        rows,
        [
            Constraint::Length(16),
            Constraint::Length(20),
            Constraint::Min(20),
            Constraint::Length(12),
            Constraint::Length(10),
        ],
    )
    .header(
        Row::new(vec!["Author", "Character", "Costume", "Type", "Status"]).style(
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(block);
    frame.render_widget(table, area);
}

fn draw_log(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let height = area.height.saturating_sub(2) as usize;
    let total = app.logs.len();
    let end = total.saturating_sub(app.log_scroll);
    let start = end.saturating_sub(height);
    let lines: Vec<Line> = app.logs[start..end]
        .iter()
        .map(|entry| {
            let style = match entry.level {
                LogLevel::Info => Style::default().fg(theme.muted),
                LogLevel::Warn => Style::default().fg(theme.warning),
                LogLevel::Error => Style::default().fg(theme.error),
            };
            Line::from(Span::styled(entry.message.clone(), style))
        })
        .collect();
    let paragraph = Paragraph::new(lines)
        .block(theme.panel("Log"))
        .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
}

fn draw_status(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let line = match &app.input_mode {
        InputMode::Editing { prompt, buffer, .. } => Line::from(vec![
            Span::styled(
                format!("{prompt}: "),
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!("{buffer}_"), Style::default().fg(theme.text)),
        ]),
        InputMode::Normal => {
            if let Some(toast) = &app.toast {
                let style = match toast.level {
                    ToastLevel::Info => Style::default().fg(theme.success),
                    ToastLevel::Warn => Style::default().fg(theme.warning),
                    ToastLevel::Error => Style::default().fg(theme.error),
                };
                Line::from(Span::styled(toast.message.clone(), style))
            } else if app.status.is_empty() {
                Line::from(Span::styled(
                    "enter toggle | o open | p preview | / filter | ? help",
                    Style::default().fg(theme.muted),
                ))
            } else {
                Line::from(Span::styled(
                    app.status.clone(),
                    Style::default().fg(theme.text),
                ))
            }
        }
    };
    let paragraph = Paragraph::new(line).block(theme.panel("Status"));
    frame.render_widget(paragraph, area);
}

fn draw_help(frame: &mut Frame<'_>, theme: &Theme) {
    let area = centered_rect(frame.size(), 52, 16);
    let lines = vec![
        help_line(theme, "enter / space", "toggle activation"),
        help_line(theme, "o", "open mod folder"),
        help_line(theme, "p", "preview (viewer / image opener)"),
        help_line(theme, "c", "copy folder path"),
        help_line(theme, "r", "rescan mods folder"),
        help_line(theme, "u", "refresh character table"),
        help_line(theme, "m", "set mods folder"),
        help_line(theme, "v", "set viewer executable"),
        help_line(theme, "/", "filter listing"),
        help_line(theme, "esc", "clear filter"),
        help_line(theme, "[ / ]", "scroll log"),
        help_line(theme, "q", "quit"),
    ];
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(lines).block(theme.panel("Help"));
    frame.render_widget(paragraph, area);
}

fn help_line(theme: &Theme, keys: &str, action: &str) -> Line<'static> {
    Line::from(vec![
        Span::styled(
            format!("{keys:<14}"),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(action.to_string(), Style::default().fg(theme.text)),
    ])
}

fn draw_dialog(frame: &mut Frame<'_>, theme: &Theme, dialog: &crate::app::Dialog) {
    let area = centered_rect(frame.size(), 46, 7);
    let yes_style = if dialog.choice == DialogChoice::Yes {
        Style::default()
            .fg(theme.success)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(theme.muted)
    };
    let no_style = if dialog.choice == DialogChoice::No {
        Style::default()
            .fg(theme.error)
            .add_modifier(Modifier::BOLD | Modifier::UNDERLINED)
    } else {
        Style::default().fg(theme.muted)
    };
    let lines = vec![
        Line::from(Span::styled(
            dialog.message.clone(),
            Style::default().fg(theme.text),
        )),
        Line::default(),
        Line::from(vec![
            Span::styled("[ Yes ]", yes_style),
            Span::raw("   "),
            Span::styled("[ No ]", no_style),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent))
        .padding(Padding {
            left: 1,
            right: 1,
            top: 0,
            bottom: 0,
        })
        .title(Span::styled(
            dialog.title.clone(),
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(Clear, area);
    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: true });
    frame.render_widget(paragraph, area);
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
