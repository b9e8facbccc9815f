use ratatui::{
    prelude::*,
    widgets::{Block, Paragraph},
    layout::{Constraint, Direction, Layout},
    style::{Modifier, Style},
    text::{Span, Line},
};
use std::time::{Duration, Instant};

use crate::app::{App, MARGIN, page_width};
use crate::media::{MediaView, OFFLINE_LABEL};
use crate::page::{self, Body, Item, Reveal};
use crate::reveal::{Phase, RevealStage, reveal_stage};
use crate::theme::Theme;
use crate::thumbnail::{Thumbnail, ThumbnailCache};
use crate::utils::{HINT_HEIGHT, NAV_HEIGHT, hard_wrap, page_area};
use once_cell::sync::Lazy;

static THEME: Lazy<Theme> = Lazy::new(Theme::default);

const SPINNER: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

fn spinner_frame(app: &App, now: Instant, frame: Duration) -> &'static str {
    let ticks = now.saturating_duration_since(app.started).as_millis() / frame.as_millis().max(1);
    SPINNER[(ticks % SPINNER.len() as u128) as usize]
}

/// Renders the whole screen for the current phase.
pub fn render(f: &mut Frame, app: &mut App, now: Instant) {
    let area = f.area();
    // The frame may already have the new size before the resize event arrives.
    let page = page_area(area);
    if usize::from(page.height) != app.viewport.height() || page_width(page) != app.content_width() {
        app.resize(page);
    }
    f.render_widget(Block::default().style(Style::default().bg(THEME.root_bg)), area);
    match app.phase() {
        Phase::Loading => render_splash(f, app, now),
        Phase::Ready => {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Length(NAV_HEIGHT), Constraint::Min(0), Constraint::Length(HINT_HEIGHT)])
                .split(area);
            render_nav(f, app, chunks[0]);
            render_page(f, app, page, now);
            render_hints(f, app, chunks[2]);
        }
    }
}

fn render_splash(f: &mut Frame, app: &App, now: Instant) {
    let area = centered_rect(60, 30, f.area());
    let lines = vec![
        Line::from(Span::styled(spinner_frame(app, now, Duration::from_millis(80)), THEME.splash)),
        Line::default(),
        Line::from(Span::styled("L O A D I N G   E M P I R E", THEME.splash)),
    ];
    let para = Paragraph::new(lines).alignment(Alignment::Center);
    let top = area.y + area.height.saturating_sub(3) / 2;
    f.render_widget(para, Rect { y: top, height: 3u16.min(area.height), ..area });
}

fn render_nav(f: &mut Frame, app: &App, area: Rect) {
    let mut spans = vec![
        Span::styled(" ▲ ", THEME.nav_cta),
        Span::styled(" EMPIRE ", THEME.nav_brand),
        Span::styled("STRENGTH & FITNESS", Style::default().fg(THEME.primary).add_modifier(Modifier::BOLD)),
        Span::raw("    "),
    ];
    for link in page::NAV_LINKS {
        spans.push(Span::styled(link, THEME.nav_link));
        spans.push(Span::raw("  "));
    }
    let brand = Paragraph::new(Line::from(spans));
    f.render_widget(brand, Rect { height: 1u16.min(area.height), ..area });

    let cta = Paragraph::new(Line::from(Span::styled(format!(" ENROLL NOW · {} ", page::PHONE), THEME.nav_cta)))
        .alignment(Alignment::Right);
    f.render_widget(cta, Rect { height: 1u16.min(area.height), ..area });

    // Rule only once the page has scrolled away from the top.
    if area.height > 1 && app.viewport.offset() > 0 {
        let rule = Paragraph::new("─".repeat(area.width as usize)).style(THEME.nav_rule);
        f.render_widget(rule, Rect { y: area.y + 1, height: 1, ..area });
    }
}

fn render_hints(f: &mut Frame, app: &App, area: Rect) {
    let pending = app.board.pending();
    let status = if pending > 0 {
        format!(" | {pending} image{} generating", if pending == 1 { "" } else { "s" })
    } else {
        String::new()
    };
    let footer = Paragraph::new(format!("↑/↓ or j/k Scroll | PgUp/PgDn Page | g/G Top/Bottom | q Quit{status}"))
        .style(THEME.footer);
    f.render_widget(footer, area);
}

fn render_page(f: &mut Frame, app: &mut App, area: Rect, now: Instant) {
    let visible = app.viewport.visible_rows();
    let width = app.content_width() as u16;
    let spinner = spinner_frame(app, now, Duration::from_millis(80));
    let App { page, layout, board, coordinator, thumbnails, timings, .. } = app;
    let Some(layout) = layout.as_ref() else {
        return;
    };

    for (block, block_layout) in page.blocks.iter().zip(&layout.blocks) {
        if block_layout.span.bottom() <= visible.start || block_layout.span.top >= visible.end {
            continue;
        }
        let block_activated = coordinator.activated_at(block.id);
        for (item, span) in block.items.iter().zip(&block_layout.items) {
            if span.bottom() <= visible.start || span.top >= visible.end {
                continue;
            }
            let stage = match (block.reveal, item.target) {
                (Reveal::Always, _) => RevealStage::Shown,
                (_, Some(child)) => reveal_stage(
                    coordinator.activated_at(child),
                    timings.stagger_step * u32::from(item.stagger),
                    timings.fade,
                    now,
                ),
                (_, None) => reveal_stage(
                    block_activated,
                    timings.stagger_step * u32::from(block.stagger),
                    timings.fade,
                    now,
                ),
            };
            let lines = item_lines(item, stage, width, span.height, board, thumbnails, spinner);
            for (offset, line) in lines.into_iter().enumerate() {
                let row = span.top + offset;
                if !visible.contains(&row) || row - visible.start >= usize::from(area.height) {
                    continue;
                }
                let rect = Rect {
                    x: area.x.saturating_add(MARGIN),
                    y: area.y + (row - visible.start) as u16,
                    width,
                    height: 1,
                }
                .intersection(area);
                if rect.is_empty() {
                    continue;
                }
                let alignment = if block.centered { Alignment::Center } else { Alignment::Left };
                f.render_widget(Paragraph::new(line).alignment(alignment), rect);
            }
        }
    }
}

/// Exactly `rows` lines for one item at its current reveal stage.
fn item_lines(
    item: &Item,
    stage: RevealStage,
    width: u16,
    rows: usize,
    board: &crate::media::MediaBoard,
    thumbnails: &mut ThumbnailCache,
    spinner: &'static str,
) -> Vec<Line<'static>> {
    if stage == RevealStage::Hidden {
        return vec![Line::default(); rows];
    }
    let entering = |style: Style| {
        if stage == RevealStage::Entering { style.add_modifier(Modifier::DIM) } else { style }
    };

    let mut lines = match &item.body {
        Body::Gap => Vec::new(),
        Body::Text { text, tone } => hard_wrap(text, usize::from(width))
            .into_iter()
            .map(|chunk| Line::from(Span::styled(chunk, entering(THEME.tone(*tone)))))
            .collect(),
        Body::Image { cell, .. } => {
            let Some(cell) = cell.and_then(|id| board.cell(id)) else {
                return framed(rows, width, Span::styled(spinner, THEME.spinner));
            };
            match cell.view() {
                MediaView::Image(payload) => match thumbnails.lines(cell.id(), width, rows as u16) {
                    Thumbnail::Ready(lines) => lines,
                    Thumbnail::Decoding => framed(rows, width, Span::styled(spinner, THEME.spinner)),
                    Thumbnail::Undecodable => {
                        let kb = payload.data.len() * 3 / 4 / 1024;
                        let label = format!("{} · {} · {kb} KB", cell.prompt().to_uppercase(), payload.mime_type);
                        framed(rows, width, Span::styled(label, THEME.placeholder))
                    }
                },
                MediaView::Offline => framed(rows, width, Span::styled(OFFLINE_LABEL, THEME.placeholder)),
                MediaView::Busy => framed(rows, width, Span::styled(spinner, THEME.spinner)),
            }
        }
    };
    lines.resize(rows, Line::default());
    lines
}

/// A filled frame of `rows` lines with `label` centered on the middle one.
fn framed(rows: usize, width: u16, label: Span<'static>) -> Vec<Line<'static>> {
    let fill = Style::default().bg(THEME.frame_bg);
    let blank = " ".repeat(usize::from(width));
    (0..rows)
        .map(|row| {
            if row == rows / 2 {
                let label_width = label.content.chars().count().min(usize::from(width));
                let left = (usize::from(width) - label_width) / 2;
                let right = usize::from(width) - label_width - left;
                Line::from(vec![
                    Span::styled(" ".repeat(left), fill),
                    label.clone().patch_style(fill),
                    Span::styled(" ".repeat(right), fill),
                ])
            } else {
                Line::from(Span::styled(blank.clone(), fill))
            }
        })
        .collect()
}

/// Centers a rectangle within another rectangle.
pub fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let vertical = Layout::default().direction(Direction::Vertical)
        .constraints([Constraint::Percentage((100-percent_y)/2), Constraint::Percentage(percent_y), Constraint::Percentage((100-percent_y)/2)]).split(r)[1];
    Layout::default().direction(Direction::Horizontal)
        .constraints([Constraint::Percentage((100-percent_x)/2), Constraint::Percentage(percent_x), Constraint::Percentage((100-percent_x)/2)]).split(vertical)[1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::app_with;
    use crate::page::{Page, Tone, image, text};
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn screen(terminal: &Terminal<TestBackend>) -> String {
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[tokio::test]
    async fn splash_then_page() {
        let t0 = Instant::now();
        let page = Page::builder()
            .block(Reveal::Simple, 0, false, vec![(0, text(Tone::Display, "BUILT BEYOND"))])
            .build();
        let mut app = app_with(page, 17, t0);
        let mut terminal = Terminal::new(TestBackend::new(40, 20)).unwrap();

        app.tick(t0);
        terminal.draw(|f| render(f, &mut app, t0)).unwrap();
        assert!(screen(&terminal).contains("L O A D I N G"));

        let ready = t0 + Duration::from_millis(900);
        app.tick(t0 + Duration::from_millis(800));
        app.tick(ready);
        let later = ready + Duration::from_secs(1);
        terminal.draw(|f| render(f, &mut app, later)).unwrap();
        let shown = screen(&terminal);
        assert!(shown.contains("BUILT BEYOND"));
        assert!(shown.contains("EMPIRE"));
    }

    #[tokio::test]
    async fn hidden_until_revealed_then_offline_placeholder() {
        let t0 = Instant::now();
        let page = Page::builder()
            .block(Reveal::Simple, 0, false, vec![(0, image("Abstract city map", 5))])
            .build();
        let mut app = app_with(page, 17, t0);
        let mut terminal = Terminal::new(TestBackend::new(40, 20)).unwrap();

        app.tick(t0 + Duration::from_millis(800));
        terminal.draw(|f| render(f, &mut app, t0 + Duration::from_millis(800))).unwrap();
        assert!(!screen(&terminal).contains(OFFLINE_LABEL));

        while app.board.pending() > 0 {
            tokio::task::yield_now().await;
            app.tick(t0 + Duration::from_millis(900));
        }
        let later = t0 + Duration::from_secs(2);
        terminal.draw(|f| render(f, &mut app, later)).unwrap();
        assert!(screen(&terminal).contains(OFFLINE_LABEL));
    }

    fn numbered_lines(n: usize) -> Page {
        let items = (0..n).map(|i| (0, text(Tone::Prose, format!("line {i}")))).collect();
        Page::builder().block(Reveal::Simple, 0, false, items).build()
    }

    #[tokio::test]
    async fn frame_smaller_than_app_geometry() {
        let t0 = Instant::now();
        let mut app = app_with(numbered_lines(30), 17, t0);
        app.tick(t0 + Duration::from_millis(800));
        app.tick(t0 + Duration::from_millis(900));
        let later = t0 + Duration::from_secs(2);

        let mut terminal = Terminal::new(TestBackend::new(20, 6)).unwrap();
        terminal.draw(|f| render(f, &mut app, later)).unwrap();
        assert_eq!(app.viewport.height(), 3);
        assert_eq!(app.content_width(), 16);
        let shown = screen(&terminal);
        assert!(shown.contains("line 0"));
        assert!(shown.contains("line 2"));
        assert!(!shown.contains("line 3"));

        app.scroll_to_bottom();
        terminal.draw(|f| render(f, &mut app, later)).unwrap();
        let shown = screen(&terminal);
        assert!(shown.contains("line 29"));
        assert!(!shown.contains("line 0"));
        assert!(shown.contains("─"));
    }

    #[tokio::test]
    async fn narrower_than_margins() {
        let t0 = Instant::now();
        let mut app = app_with(numbered_lines(5), 17, t0);
        app.tick(t0 + Duration::from_millis(800));
        app.tick(t0 + Duration::from_millis(900));
        let later = t0 + Duration::from_secs(2);

        for width in [3, 2, 1] {
            let mut terminal = Terminal::new(TestBackend::new(width, 10)).unwrap();
            terminal.draw(|f| render(f, &mut app, later)).unwrap();
            assert_eq!(app.content_width(), 1);
        }
        let mut terminal = Terminal::new(TestBackend::new(40, 2)).unwrap();
        terminal.draw(|f| render(f, &mut app, later)).unwrap();
        assert_eq!(app.viewport.height(), 0);
    }

    #[test]
    fn framed_centers_label() {
        let lines = framed(3, 11, Span::raw("abc"));
        assert_eq!(lines.len(), 3);
        let middle: String = lines[1].spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(middle, "    abc    ");
    }
}
