//! UI rendering for the TUI.

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
};

use crate::core::{Job, JobState};

use super::app::{TuiApp, View};

/// Main render function - dispatches to view-specific renderers.
pub fn render(frame: &mut Frame, app: &TuiApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer/help
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0]);

    match &app.view {
        View::Dashboard { selected } => render_dashboard(frame, app, chunks[1], *selected),
        View::Detail { scroll, .. } => render_detail(frame, app, chunks[1], *scroll),
    }

    render_footer(frame, app, chunks[2]);
}

fn render_header(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let title = match (&app.data.server, &app.data.refreshed_at) {
        (Some(server), Some(at)) => {
            let running = app
                .data
                .jobs
                .iter()
                .filter(|j| j.state() == JobState::Running)
                .count();
            format!(
                "qstatw  {}  Jobs: {} ({} running)  Updated: {}",
                server,
                app.data.jobs.len(),
                running,
                at.format("%H:%M:%S")
            )
        }
        _ => "qstatw  (querying...)".to_string(),
    };

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    frame.render_widget(block, area);
}

fn render_dashboard(frame: &mut Frame, app: &TuiApp, area: Rect, selected: usize) {
    if app.data.usage.is_empty() {
        render_jobs(frame, app, area, selected);
        return;
    }

    let hosts = app.data.usage.loads().count() as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length((hosts + 2).min(area.height / 2)), // Occupancy
            Constraint::Min(0),                                   // Jobs
        ])
        .split(area);

    render_occupancy(frame, app, chunks[0]);
    render_jobs(frame, app, chunks[1], selected);
}

fn render_occupancy(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let block = Block::default()
        .title("Occupancy")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let width = app
        .data
        .usage
        .loads()
        .map(|(host, _)| host.len())
        .max()
        .unwrap_or(0);
    // Room left for the bar after the name, the load and the borders.
    let bar_room = (area.width as usize).saturating_sub(width + 12);

    let lines: Vec<Line> = app
        .data
        .usage
        .loads()
        .map(|(host, load)| {
            let bar = "|".repeat((load as usize).min(bar_room));
            Line::from(vec![
                Span::styled(format!(" {host:<width$}"), Style::default().fg(Color::Cyan)),
                Span::styled(format!(" [{load:>3}] "), Style::default().fg(Color::DarkGray)),
                Span::styled(bar, Style::default().fg(Color::Green)),
            ])
        })
        .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_jobs(frame: &mut Frame, app: &TuiApp, area: Rect, selected: usize) {
    let block = Block::default()
        .title("Jobs")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    if app.data.jobs.is_empty() {
        let text = Paragraph::new("  No jobs")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    }

    // Keep the selection on screen.
    let visible = area.height.saturating_sub(2) as usize;
    let offset = (selected + 1).saturating_sub(visible);

    let items: Vec<ListItem> = app
        .data
        .jobs
        .iter()
        .enumerate()
        .skip(offset)
        .map(|(i, job)| {
            let is_selected = i == selected;
            let style = if is_selected {
                Style::default()
                    .bg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            };

            let line = Line::from(vec![
                Span::raw(if is_selected { "> " } else { "  " }),
                state_span(job.state()),
                Span::raw(format!(
                    "  {:<20}  {:<24}  {:<12}  {}",
                    truncate(&job.id, 20),
                    truncate(job.name().unwrap_or("-"), 24),
                    truncate(job.owner().unwrap_or("-"), 12),
                    job.walltime().unwrap_or("-"),
                )),
            ]);

            ListItem::new(line).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

fn render_detail(frame: &mut Frame, app: &TuiApp, area: Rect, scroll: u16) {
    let block = Block::default()
        .title("Job Details")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let Some(job) = app.detail_job() else {
        let text = Paragraph::new("  Job is no longer reported by the server")
            .style(Style::default().fg(Color::DarkGray))
            .block(block);
        frame.render_widget(text, area);
        return;
    };

    frame.render_widget(
        Paragraph::new(detail_lines(job)).block(block).scroll((scroll, 0)),
        area,
    );
}

fn detail_lines(job: &Job) -> Vec<Line<'_>> {
    let mut keys: Vec<&String> = job.attrs.keys().collect();
    keys.sort();
    let width = keys.iter().map(|k| k.len()).max().unwrap_or(0);

    let mut lines = vec![
        Line::from(vec![
            Span::styled("  Job ID: ", Style::default().fg(Color::Cyan)),
            Span::raw(job.id.as_str()),
        ]),
        Line::from(""),
    ];

    for key in keys {
        lines.push(Line::from(vec![
            Span::styled(format!("  {key:<width$}  "), Style::default().fg(Color::Cyan)),
            Span::raw(job.attrs[key].as_str()),
        ]));
    }

    lines
}

fn render_footer(frame: &mut Frame, app: &TuiApp, area: Rect) {
    let help_text = match &app.view {
        View::Dashboard { .. } => "[↑↓] Navigate  [Enter] Details  [r] Refresh  [q] Quit",
        View::Detail { .. } => "[↑↓] Scroll  [Esc] Back  [q] Quit",
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let paragraph = Paragraph::new(Line::from(format!("  {help_text}"))).block(block);
    frame.render_widget(paragraph, area);
}

fn state_span(state: JobState) -> Span<'static> {
    let color = match state {
        JobState::Running => Color::Green,
        JobState::Queued | JobState::Waiting => Color::Yellow,
        JobState::Held | JobState::Suspended => Color::Magenta,
        JobState::Exiting | JobState::Completed => Color::DarkGray,
        JobState::Transit | JobState::Unknown => Color::White,
    };
    Span::styled(state.as_str(), Style::default().fg(color))
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{kept}…")
    }
}
