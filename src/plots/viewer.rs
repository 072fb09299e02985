use std::{io, time::Duration};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout},
    text::Line,
    widgets::{Block, Paragraph},
};

use super::{charts::Figure, theme::Theme};
use crate::Result;

struct TerminalGuard;

impl TerminalGuard {
    fn enter() -> Result<Self> {
        enable_raw_mode()?;
        execute!(io::stdout(), EnterAlternateScreen)?;
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, PartialEq, Eq)]
enum Action {
    None,
    Next,
}

fn handle_key(key: KeyCode) -> Action {
    match key {
        KeyCode::Char('q') | KeyCode::Esc | KeyCode::Enter | KeyCode::Right => Action::Next,
        _ => Action::None,
    }
}

/// Shows the figures one after another until the last one is dismissed.
///
/// # Errors
/// Returns an error if terminal setup or rendering fails.
pub fn run(figures: &[Figure]) -> Result<()> {
    let _guard = TerminalGuard::enter()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;

    let mut current = 0;
    while let Some(figure) = figures.get(current) {
        terminal.draw(|f| draw_page(f, figure, current, figures.len()))?;

        if event::poll(Duration::from_millis(120))? {
            if let Event::Key(k) = event::read()? {
                if k.kind != KeyEventKind::Press {
                    continue;
                }

                if handle_key(k.code) == Action::Next {
                    current += 1;
                }
            }
        }
    }

    terminal.show_cursor()?;
    Ok(())
}

/// Draws a figure over the whole frame with a footer telling how to move on.
pub fn draw_page(f: &mut Frame, figure: &Figure, index: usize, total: usize) {
    let area = f.size();
    f.render_widget(Block::default().style(Theme::base()), area);

    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(1)])
        .split(area);

    figure.draw(f, rows[0]);

    let next = if index + 1 == total { "close" } else { "next figure" };
    let hint = format!(
        "[{}/{}]  q · Esc · Enter · → {next}",
        index + 1,
        total
    );

    f.render_widget(
        Paragraph::new(Line::from(hint).alignment(Alignment::Center)).style(Theme::hint()),
        rows[1],
    );
}
