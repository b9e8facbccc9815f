//! Event-loop state: one page, one board, one coordinator, one viewport.

use std::time::{Duration, Instant};

use ratatui::layout::Rect;

use crate::media::{MediaBoard, MediaFetchCell};
use crate::page::{Page, PageLayout};
use crate::reveal::{Phase, StartupSequence, StartupStep, ViewportRevealCoordinator};
use crate::thumbnail::ThumbnailCache;
use crate::viewport::TerminalViewport;

/// Columns kept free on each side of the page.
pub const MARGIN: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Timings {
    pub splash: Duration,
    pub settle: Duration,
    pub stagger_step: Duration,
    pub fade: Duration,
    pub threshold: f32,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            splash: Duration::from_millis(800),
            settle: Duration::from_millis(100),
            stagger_step: Duration::from_millis(100),
            fade: Duration::from_millis(300),
            threshold: crate::reveal::REVEAL_THRESHOLD,
        }
    }
}

pub struct App {
    pub page: Page,
    pub layout: Option<PageLayout>,
    pub board: MediaBoard,
    pub coordinator: ViewportRevealCoordinator,
    pub viewport: TerminalViewport,
    pub startup: StartupSequence,
    pub thumbnails: ThumbnailCache,
    pub timings: Timings,
    pub started: Instant,
    width: usize,
}

impl App {
    pub fn new(page: Page, board: MediaBoard, timings: Timings, area: Rect, now: Instant) -> Self {
        let thumbnails = ThumbnailCache::new(board.runtime().clone());
        Self {
            page,
            layout: None,
            board,
            coordinator: ViewportRevealCoordinator::new(timings.threshold),
            viewport: TerminalViewport::new(usize::from(area.height)),
            startup: StartupSequence::new(now, timings.splash, timings.settle),
            thumbnails,
            timings,
            started: now,
            width: page_width(area),
        }
    }

    pub fn phase(&self) -> Phase {
        self.startup.phase()
    }

    pub fn content_width(&self) -> usize {
        self.width
    }

    /// Advances startup, applies finished image requests and feeds pending
    /// visibility notifications to the coordinator.
    pub fn tick(&mut self, now: Instant) {
        for step in self.startup.advance(now) {
            match step {
                StartupStep::MountContent => self.mount_content(),
                StartupStep::BeginObserving => self.begin_observing(),
            }
        }
        let updated = self.board.pump();
        if updated > 0 {
            tracing::debug!(updated, pending = self.board.pending(), "media updated");
        }
        for id in self.page.media() {
            if let Some(payload) = self.board.cell(id).and_then(MediaFetchCell::payload) {
                self.thumbnails.request(id, payload);
            }
        }
        self.thumbnails.pump();
        self.deliver(now);
    }

    pub fn resize(&mut self, area: Rect) {
        self.width = page_width(area);
        self.viewport.resize(usize::from(area.height));
        self.relayout();
    }

    pub fn scroll_by(&mut self, rows: isize) {
        self.viewport.scroll_by(rows);
    }

    pub fn page_down(&mut self) {
        let page = self.viewport.height().saturating_sub(1).max(1);
        self.viewport.scroll_by(page as isize);
    }

    pub fn page_up(&mut self) {
        let page = self.viewport.height().saturating_sub(1).max(1);
        self.viewport.scroll_by(-(page as isize));
    }

    pub fn scroll_to_top(&mut self) {
        self.viewport.scroll_to(0);
    }

    pub fn scroll_to_bottom(&mut self) {
        self.viewport.scroll_to(usize::MAX);
    }

    /// Page unmount: stop observing and drop interest in every image.
    pub fn teardown(&mut self) {
        if self.coordinator.is_torn_down() {
            return;
        }
        self.coordinator.teardown(&mut self.viewport);
        for cell in self.page.media() {
            self.board.unmount(cell);
        }
        tracing::info!("page torn down");
    }

    fn mount_content(&mut self) {
        let board = &mut self.board;
        self.page.mount_media(|prompt| board.mount(prompt));
        self.relayout();
        tracing::info!(images = self.page.media().len(), "content mounted");
    }

    fn begin_observing(&mut self) {
        let targets = self.page.reveal_targets();
        for target in targets {
            if let Err(err) = self.coordinator.register(&mut self.viewport, target) {
                tracing::warn!(error = %err, "could not register reveal target");
            }
        }
        tracing::info!(targets = self.coordinator.registered_count(), "observing reveal targets");
    }

    fn deliver(&mut self, now: Instant) {
        let batch = self.viewport.take_notifications();
        if batch.is_empty() {
            return;
        }
        let newly = self.coordinator.handle(&mut self.viewport, batch, now);
        if !newly.is_empty() {
            tracing::debug!(count = newly.len(), "targets activated");
        }
    }

    fn relayout(&mut self) {
        if self.phase() == Phase::Loading {
            return;
        }
        let layout = self.page.layout(self.width);
        self.viewport.set_layout(layout.spans(&self.page), layout.height);
        self.layout = Some(layout);
    }
}

/// Columns available to page text inside `area`.
pub fn page_width(area: Rect) -> usize {
    usize::from(area.width.saturating_sub(MARGIN * 2).max(1))
}
