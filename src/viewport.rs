use std::collections::BTreeMap;
use std::mem;
use std::ops::Range;

use crate::models::TargetId;
use crate::reveal::{Notification, VisibilityHost};
use crate::utils::calculate_max_scroll;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowSpan {
    pub top: usize,
    pub height: usize,
}

impl RowSpan {
    pub fn new(top: usize, height: usize) -> Self {
        Self { top, height }
    }

    pub fn bottom(&self) -> usize {
        self.top + self.height
    }
}

#[derive(Debug, Clone, Copy)]
struct Observation {
    threshold: f32,
    intersecting: bool,
}

#[derive(Debug, Default)]
pub struct TerminalViewport {
    offset: usize,
    height: usize,
    content_height: usize,
    spans: BTreeMap<TargetId, RowSpan>,
    observed: BTreeMap<TargetId, Observation>,
    queue: Vec<Notification>,
}

impl TerminalViewport {
    pub fn new(height: usize) -> Self {
        Self { height, ..Self::default() }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn visible_rows(&self) -> Range<usize> {
        self.offset..self.offset + self.height
    }

    pub fn max_offset(&self) -> usize {
        calculate_max_scroll(self.content_height, self.height)
    }

    /// Replaces the page layout.
    pub fn set_layout(&mut self, spans: impl IntoIterator<Item = (TargetId, RowSpan)>, content_height: usize) {
        self.spans = spans.into_iter().collect();
        self.content_height = content_height;
        self.offset = self.offset.min(self.max_offset());
        self.refresh();
    }

    pub fn resize(&mut self, height: usize) {
        self.height = height;
        self.offset = self.offset.min(self.max_offset());
        self.refresh();
    }

    pub fn scroll_to(&mut self, offset: usize) {
        self.offset = offset.min(self.max_offset());
        self.refresh();
    }

    pub fn scroll_by(&mut self, delta: isize) {
        let target = if delta.is_negative() {
            self.offset.saturating_sub(delta.unsigned_abs())
        } else {
            self.offset.saturating_add(delta.unsigned_abs())
        };
        self.scroll_to(target);
    }

    /// Fraction of `target` currently on screen; zero for unknown or empty targets.
    pub fn ratio(&self, target: TargetId) -> f32 {
        let Some(span) = self.spans.get(&target) else {
            return 0.0;
        };
        if span.height == 0 {
            return 0.0;
        }
        let view = self.visible_rows();
        let top = span.top.max(view.start);
        let bottom = span.bottom().min(view.end);
        bottom.saturating_sub(top) as f32 / span.height as f32
    }

    /// Drains queued notifications in emission order.
    pub fn take_notifications(&mut self) -> Vec<Notification> {
        mem::take(&mut self.queue)
    }

    #[cfg(test)]
    pub fn is_observing(&self, target: TargetId) -> bool {
        self.observed.contains_key(&target)
    }

    fn intersects(&self, target: TargetId, threshold: f32) -> bool {
        let ratio = self.ratio(target);
        ratio > 0.0 && ratio >= threshold
    }

    fn refresh(&mut self) {
        let ids: Vec<TargetId> = self.observed.keys().copied().collect();
        for id in ids {
            let Some(observation) = self.observed.get(&id).copied() else {
                continue;
            };
            let now = self.intersects(id, observation.threshold);
            if now != observation.intersecting {
                self.observed.insert(id, Observation { intersecting: now, ..observation });
                self.queue.push(Notification { target: id, is_intersecting: now });
            }
        }
    }
}

impl VisibilityHost for TerminalViewport {
    fn observe(&mut self, target: TargetId, threshold: f32) {
        if self.observed.contains_key(&target) {
            return;
        }
        let intersecting = self.intersects(target, threshold);
        self.observed.insert(target, Observation { threshold, intersecting });
        self.queue.push(Notification { target, is_intersecting: intersecting });
    }

    fn unobserve(&mut self, target: TargetId) {
        self.observed.remove(&target);
        self.queue.retain(|n| n.target != target);
    }
}
