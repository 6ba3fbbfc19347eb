use ratatui::layout::{Constraint, Direction, Layout, Position, Rect};
use ratatui::style::Modifier;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph, Wrap};
use ratatui::Frame;

use crate::app::App;
use crate::service::{self, Item};
use crate::theme::Theme;

pub(crate) fn draw(frame: &mut Frame, app: &mut App) {
    let theme = Theme::for_mode(app.dark_mode);
    frame.render_widget(Block::default().style(theme.background), frame.area());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(5), Constraint::Length(2)])
        .split(frame.area());
    draw_search_bar(frame, app, &theme, chunks[0]);
    match app.selected_post.clone() {
        Some(post) => {
            let panes = Layout::default()
                .direction(Direction::Horizontal)
                .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
                .split(chunks[1]);
            draw_results(frame, app, &theme, panes[0]);
            draw_detail(frame, &post, &theme, panes[1]);
        }
        None => draw_results(frame, app, &theme, chunks[1]),
    }
    draw_status(frame, app, &theme, chunks[2]);
}

fn draw_search_bar(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let input = Paragraph::new(app.query.as_str()).style(theme.text).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Search Hacker News")
            .style(theme.accent),
    );
    frame.render_widget(input, area);
    let cursor_x = area.x + 1 + app.query.chars().count() as u16;
    frame.set_cursor_position(Position::new(cursor_x.min(area.right().saturating_sub(2)), area.y + 1));
}

fn draw_results(frame: &mut Frame, app: &mut App, theme: &Theme, area: Rect) {
    let items = app
        .results
        .iter()
        .map(|hit| ListItem::new(hit.title.as_deref().unwrap_or("(untitled)").to_string()))
        .collect::<Vec<ListItem>>();
    let list = List::new(items)
        .style(theme.text)
        .block(Block::default().borders(Borders::ALL).title("Results").style(theme.text))
        .highlight_style(theme.highlight.add_modifier(Modifier::BOLD))
        .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_detail(frame: &mut Frame, post: &Item, theme: &Theme, area: Rect) {
    let mut lines = vec![
        Line::styled(
            post.title.as_deref().unwrap_or("(untitled)").to_string(),
            theme.accent.add_modifier(Modifier::BOLD),
        ),
        Line::styled(format!("Points: {}", post.points.unwrap_or(0)), theme.muted),
        Line::default(),
        Line::styled("Comments", theme.accent),
    ];
    for comment in &post.children {
        let text = match &comment.text {
            Some(text) => service::flatten_text(text),
            None => "(deleted)".to_string(),
        };
        lines.push(Line::styled(format!("- {}", text), theme.text));
    }
    let detail = Paragraph::new(lines)
        .style(theme.text)
        .wrap(Wrap { trim: true })
        .block(Block::default().borders(Borders::ALL).title("Post").style(theme.text));
    frame.render_widget(detail, area);
}

fn draw_status(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let mut spans = vec![];
    if app.search_status.loading {
        spans.push(Span::styled("Searching...", theme.accent));
    }
    if let Some(error) = &app.search_status.error {
        spans.push(Span::styled(format!("Search error: {}", error), theme.error));
    }
    if app.detail_status.loading {
        if !spans.is_empty() {
            spans.push(Span::styled("  ", theme.text));
        }
        spans.push(Span::styled("Loading post...", theme.accent));
    }
    if let Some(error) = &app.detail_status.error {
        if !spans.is_empty() {
            spans.push(Span::styled("  ", theme.text));
        }
        spans.push(Span::styled(format!("Post error: {}", error), theme.error));
    }
    let hints = Line::styled(
        "type to search | Up/Down select | Enter open | Esc back/quit | Ctrl-T theme | Ctrl-U clear",
        theme.muted,
    );
    let status = Paragraph::new(vec![Line::from(spans), hints]).style(theme.text);
    frame.render_widget(status, area);
}
