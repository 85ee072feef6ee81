use std::borrow::Cow;

use super::state::DashboardState;
use crate::engine::analyzer::EnrichedItem;
use crate::logs::{LogEntry, LogLevel};
use chrono::DateTime;
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame,
};

const CONTENT_CHARS: usize = 100;
const SENTIMENT_BAND: f64 = 0.1;

pub fn draw(f: &mut Frame, state: &DashboardState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(67), Constraint::Percentage(33)])
        .split(chunks[1]);

    let sidebar = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(3)])
        .split(body[1]);

    draw_header(f, state, chunks[0]);
    draw_feed(f, state, body[0]);
    draw_stats(f, state, sidebar[0]);
    draw_logs(f, state, sidebar[1]);
    draw_footer(f, chunks[2]);
}

fn draw_header(f: &mut Frame, state: &DashboardState, area: Rect) {
    let clock = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let line = Line::from(vec![
        Span::styled(
            state.title.clone(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::raw("  "),
        Span::styled(clock, Style::default().fg(Color::White)),
    ]);
    let para = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

fn draw_feed(f: &mut Frame, state: &DashboardState, area: Rect) {
    let header = Row::new(vec!["Time", "Source", "Category", "Content", "Sentiment"])
        .style(Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD));

    // Newest first.
    let items: Vec<&EnrichedItem> = state.recent_items().collect();
    let rows: Vec<Row> = items.into_iter().rev().map(feed_row).collect();

    let widths = [
        Constraint::Length(11),
        Constraint::Length(14),
        Constraint::Length(23),
        Constraint::Min(20),
        Constraint::Length(9),
    ];

    let table = Table::new(rows, widths).header(header).block(
        Block::default()
            .title(" Live Intelligence Feed ")
            .borders(Borders::ALL),
    );
    f.render_widget(table, area);
}

fn feed_row(item: &EnrichedItem) -> Row<'static> {
    let mut content = vec![Line::from(content_preview(&item.raw.text))];
    if !item.signals.is_empty() {
        content.push(Line::from(Span::styled(
            item.signals.join(" "),
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )));
    }
    let height = content.len() as u16;

    Row::new(vec![
        Cell::from(display_time(&item.raw.timestamp)),
        Cell::from(truncate_with_ellipsis(&item.raw.source_name, 14).into_owned()),
        Cell::from(item.category.as_str()),
        Cell::from(Text::from(content)),
        Cell::from(Span::styled(
            format!("{:.2}", item.sentiment),
            Style::default().fg(sentiment_color(item.sentiment)),
        )),
    ])
    .height(height)
}

fn draw_stats(f: &mut Frame, state: &DashboardState, area: Rect) {
    let s = &state.stats;
    let lines = vec![
        stat_line("News items", s.news, Color::White),
        stat_line("Social posts", s.social, Color::White),
        Line::from(""),
        stat_line("Risk signals", s.risk_signals, Color::Red),
        stat_line("Opportunity signals", s.opportunity_signals, Color::Green),
    ];
    let para = Paragraph::new(lines).block(
        Block::default()
            .title(" Statistics ")
            .borders(Borders::ALL),
    );
    f.render_widget(para, area);
}

fn stat_line(label: &str, value: u64, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!(" {:<20} ", format!("{}:", label))),
        Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
    ])
}

fn draw_logs(f: &mut Frame, state: &DashboardState, area: Rect) {
    let max_width = area.width.saturating_sub(2) as usize; // borders

    let lines: Vec<Line> = state.recent_logs().map(|l| log_line(l, max_width)).collect();

    let block = Block::default().title(" System Logs ").borders(Borders::ALL);
    let para = Paragraph::new(lines).block(block);
    f.render_widget(para, area);
}

fn log_line(l: &LogEntry, max_width: usize) -> Line<'static> {
    let prefix = format!("{} [{}] ", l.time.format("%H:%M:%S"), l.level);
    let msg_max = max_width.saturating_sub(prefix.chars().count());
    let msg = truncate_with_ellipsis(&l.message, msg_max).into_owned();
    Line::from(vec![
        Span::styled(prefix, Style::default().fg(level_color(l.level))),
        Span::raw(msg),
    ])
}

fn draw_footer(f: &mut Frame, area: Rect) {
    let line = Line::from(vec![
        Span::raw("Press "),
        Span::styled("[Ctrl+C]", Style::default().fg(Color::Yellow)),
        Span::raw(" or "),
        Span::styled("[q]", Style::default().fg(Color::Yellow)),
        Span::raw(" to exit"),
    ]);
    let para = Paragraph::new(line)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    f.render_widget(para, area);
}

fn level_color(level: LogLevel) -> Color {
    match level {
        LogLevel::Info => Color::Green,
        LogLevel::News => Color::Cyan,
        LogLevel::Debug => Color::DarkGray,
        LogLevel::Warn => Color::Yellow,
        LogLevel::Error => Color::Red,
    }
}

fn sentiment_color(score: f64) -> Color {
    if score > SENTIMENT_BAND {
        Color::Green
    } else if score < -SENTIMENT_BAND {
        Color::Red
    } else {
        Color::White
    }
}

/// `MM-DD HH:MM` for RFC 2822 / RFC 3339 timestamps, otherwise the first 19 chars verbatim.
fn display_time(ts: &str) -> String {
    let ts = ts.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(ts) {
        return dt.format("%m-%d %H:%M").to_string();
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
        return dt.format("%m-%d %H:%M").to_string();
    }
    ts.chars().take(19).collect()
}

fn content_preview(text: &str) -> String {
    text.chars()
        .take(CONTENT_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect()
}

fn truncate_with_ellipsis(s: &str, max_width: usize) -> Cow<'_, str> {
    let char_count = s.chars().count();
    if char_count <= max_width {
        Cow::Borrowed(s)
    } else if max_width <= 3 {
        Cow::Owned(".".repeat(max_width))
    } else {
        let end = s
            .char_indices()
            .nth(max_width - 3)
            .map(|(i, _)| i)
            .unwrap_or(s.len());
        Cow::Owned(format!("{}...", &s[..end]))
    }
}
