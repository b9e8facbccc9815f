//! Scroll-driven reveal and the startup sequence that decides when it begins.

use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

use crate::error::RevealError;
use crate::models::TargetId;

pub const REVEAL_THRESHOLD: f32 = 0.1;

/// Something that can tell us when targets enter or leave the viewport.
pub trait VisibilityHost {
    fn observe(&mut self, target: TargetId, threshold: f32);
    fn unobserve(&mut self, target: TargetId);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Notification {
    pub target: TargetId,
    pub is_intersecting: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetKind {
    Simple,
    /// Children activate together with the parent, in this order.
    Staggered(Vec<TargetId>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealTarget {
    pub id: TargetId,
    pub kind: TargetKind,
}

impl RevealTarget {
    pub fn simple(id: TargetId) -> Self {
        Self { id, kind: TargetKind::Simple }
    }

    pub fn staggered(id: TargetId, children: Vec<TargetId>) -> Self {
        Self { id, kind: TargetKind::Staggered(children) }
    }
}

pub struct ViewportRevealCoordinator {
    threshold: f32,
    registered: BTreeMap<TargetId, TargetKind>,
    activated: HashMap<TargetId, Instant>,
    torn_down: bool,
}

impl Default for ViewportRevealCoordinator {
    fn default() -> Self {
        Self::new(REVEAL_THRESHOLD)
    }
}

impl ViewportRevealCoordinator {
    pub fn new(threshold: f32) -> Self {
        Self {
            threshold,
            registered: BTreeMap::new(),
            activated: HashMap::new(),
            torn_down: false,
        }
    }

    /// Starts watching `target`. Registering a target twice changes nothing.
    pub fn register<H: VisibilityHost + ?Sized>(&mut self, host: &mut H, target: RevealTarget) -> Result<(), RevealError> {
        if self.torn_down {
            return Err(RevealError::TornDown);
        }
        if self.registered.contains_key(&target.id) {
            return Ok(());
        }
        let id = target.id;
        self.registered.insert(id, target.kind);
        if !self.activated.contains_key(&id) {
            host.observe(id, self.threshold);
        }
        Ok(())
    }

    /// Applies one batch of host notifications in the order given and returns
    /// the targets that became active, each parent followed by its children.
    pub fn handle<H, I>(&mut self, host: &mut H, batch: I, now: Instant) -> Vec<TargetId>
    where
        H: VisibilityHost + ?Sized,
        I: IntoIterator<Item = Notification>,
    {
        let mut newly = Vec::new();
        if self.torn_down {
            return newly;
        }
        for notification in batch {
            if !notification.is_intersecting || self.activated.contains_key(&notification.target) {
                continue;
            }
            let Some(kind) = self.registered.get(&notification.target) else {
                continue;
            };

            self.activated.insert(notification.target, now);
            newly.push(notification.target);
            host.unobserve(notification.target);

            if let TargetKind::Staggered(children) = kind {
                for &child in children {
                    if self.activated.contains_key(&child) {
                        continue;
                    }
                    self.activated.insert(child, now);
                    newly.push(child);
                    if self.registered.contains_key(&child) {
                        host.unobserve(child);
                    }
                }
            }
            tracing::debug!(id = %notification.target, "revealed");
        }
        newly
    }

    #[cfg(test)]
    pub fn is_active(&self, id: TargetId) -> bool {
        self.activated.contains_key(&id)
    }

    pub fn activated_at(&self, id: TargetId) -> Option<Instant> {
        self.activated.get(&id).copied()
    }

    #[cfg(test)]
    pub fn is_registered(&self, id: TargetId) -> bool {
        self.registered.contains_key(&id)
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }

    /// Stops all observation. Further notifications are ignored and
    /// `register` fails.
    pub fn teardown<H: VisibilityHost + ?Sized>(&mut self, host: &mut H) {
        if self.torn_down {
            return;
        }
        for &id in self.registered.keys() {
            if !self.activated.contains_key(&id) {
                host.unobserve(id);
            }
        }
        self.registered.clear();
        self.torn_down = true;
        tracing::debug!(activated = self.activated.len(), "reveal coordinator torn down");
    }
}

/// How far along a revealed element is at `now`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealStage {
    Hidden,
    Entering,
    Shown,
}

/// Stage of an element activated at `activated_at` whose entrance is
/// delayed by `delay` and takes `fade` to finish.
pub fn reveal_stage(activated_at: Option<Instant>, delay: Duration, fade: Duration, now: Instant) -> RevealStage {
    let Some(at) = activated_at else {
        return RevealStage::Hidden;
    };
    let start = at + delay;
    if now < start {
        RevealStage::Hidden
    } else if now < start + fade {
        RevealStage::Entering
    } else {
        RevealStage::Shown
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Loading,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupStep {
    /// Splash is over; mount the page content.
    MountContent,
    /// Layout has settled; register every reveal target present.
    BeginObserving,
}

pub struct StartupSequence {
    started: Instant,
    splash: Duration,
    settle: Duration,
    phase: Phase,
    ready_at: Option<Instant>,
    observing: bool,
}

impl StartupSequence {
    pub fn new(started: Instant, splash: Duration, settle: Duration) -> Self {
        Self { started, splash, settle, phase: Phase::Loading, ready_at: None, observing: false }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    #[cfg(test)]
    pub fn is_observing(&self) -> bool {
        self.observing
    }

    /// Steps that have come due by `now`. Each step is returned exactly once.
    pub fn advance(&mut self, now: Instant) -> Vec<StartupStep> {
        let mut steps = Vec::new();
        if self.phase == Phase::Loading && now >= self.started + self.splash {
            self.phase = Phase::Ready;
            self.ready_at = Some(now);
            steps.push(StartupStep::MountContent);
            tracing::info!(after = ?now.saturating_duration_since(self.started), "splash dismissed");
        }
        if let Some(ready_at) = self.ready_at {
            if !self.observing && now >= ready_at + self.settle {
                self.observing = true;
                steps.push(StartupStep::BeginObserving);
            }
        }
        steps
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingHost {
        observed: Vec<(TargetId, f32)>,
        unobserved: Vec<TargetId>,
    }

    impl VisibilityHost for RecordingHost {
        fn observe(&mut self, target: TargetId, threshold: f32) {
            self.observed.push((target, threshold));
        }

        fn unobserve(&mut self, target: TargetId) {
            self.unobserved.push(target);
        }
    }

    fn enter(id: usize) -> Notification {
        Notification { target: TargetId(id), is_intersecting: true }
    }

    fn exit(id: usize) -> Notification {
        Notification { target: TargetId(id), is_intersecting: false }
    }

    #[test]
    fn registers_at_ten_percent() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        coordinator.register(&mut host, RevealTarget::simple(TargetId(1))).unwrap();
        assert_eq!(host.observed, vec![(TargetId(1), 0.1)]);
    }

    #[test]
    fn double_registration_is_single() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        coordinator.register(&mut host, RevealTarget::simple(TargetId(1))).unwrap();
        coordinator.register(&mut host, RevealTarget::simple(TargetId(1))).unwrap();
        assert_eq!(host.observed.len(), 1);
        assert_eq!(coordinator.registered_count(), 1);

        let now = Instant::now();
        assert_eq!(coordinator.handle(&mut host, [enter(1), enter(1)], now), vec![TargetId(1)]);
    }

    #[test]
    fn activation_is_monotonic() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        coordinator.register(&mut host, RevealTarget::simple(TargetId(7))).unwrap();
        let t0 = Instant::now();

        assert!(coordinator.handle(&mut host, [exit(7)], t0).is_empty());
        assert!(!coordinator.is_active(TargetId(7)));

        coordinator.handle(&mut host, [enter(7)], t0);
        for step in 1..5 {
            let later = t0 + Duration::from_millis(step * 10);
            coordinator.handle(&mut host, [exit(7), enter(7), exit(7)], later);
            assert!(coordinator.is_active(TargetId(7)));
        }
        assert_eq!(coordinator.activated_at(TargetId(7)), Some(t0));
        assert_eq!(host.unobserved, vec![TargetId(7)]);
    }

    #[test]
    fn staggered_children_activate_with_parent() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        let children = vec![TargetId(11), TargetId(12), TargetId(13)];
        coordinator.register(&mut host, RevealTarget::staggered(TargetId(10), children.clone())).unwrap();

        let now = Instant::now();
        for child in &children {
            assert!(!coordinator.is_active(*child));
        }
        let newly = coordinator.handle(&mut host, [enter(10)], now);

        assert_eq!(newly, vec![TargetId(10), TargetId(11), TargetId(12), TargetId(13)]);
        for id in newly {
            assert_eq!(coordinator.activated_at(id), Some(now));
        }
    }

    #[test]
    fn unregistered_targets_are_ignored() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        assert!(coordinator.handle(&mut host, [enter(3)], Instant::now()).is_empty());
        assert!(!coordinator.is_active(TargetId(3)));
    }

    #[test]
    fn activation_follows_notification_order() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        for id in [1, 2, 3] {
            coordinator.register(&mut host, RevealTarget::simple(TargetId(id))).unwrap();
        }
        let newly = coordinator.handle(&mut host, [enter(3), exit(2), enter(1)], Instant::now());
        assert_eq!(newly, vec![TargetId(3), TargetId(1)]);
    }

    #[test]
    fn teardown_stops_everything() {
        let mut host = RecordingHost::default();
        let mut coordinator = ViewportRevealCoordinator::default();
        coordinator.register(&mut host, RevealTarget::simple(TargetId(1))).unwrap();
        coordinator.register(&mut host, RevealTarget::simple(TargetId(2))).unwrap();
        coordinator.handle(&mut host, [enter(1)], Instant::now());

        coordinator.teardown(&mut host);
        coordinator.teardown(&mut host);

        assert_eq!(host.unobserved, vec![TargetId(1), TargetId(2)]);
        assert!(coordinator.is_torn_down());
        assert_eq!(coordinator.register(&mut host, RevealTarget::simple(TargetId(4))), Err(RevealError::TornDown));
        assert!(coordinator.handle(&mut host, [enter(2)], Instant::now()).is_empty());
        assert!(coordinator.is_active(TargetId(1)));
    }

    #[test]
    fn stage_respects_delay_and_fade() {
        let at = Instant::now();
        let delay = Duration::from_millis(200);
        let fade = Duration::from_millis(300);
        assert_eq!(reveal_stage(None, delay, fade, at), RevealStage::Hidden);
        assert_eq!(reveal_stage(Some(at), delay, fade, at + Duration::from_millis(100)), RevealStage::Hidden);
        assert_eq!(reveal_stage(Some(at), delay, fade, at + Duration::from_millis(250)), RevealStage::Entering);
        assert_eq!(reveal_stage(Some(at), delay, fade, at + Duration::from_millis(500)), RevealStage::Shown);
    }

    #[test]
    fn startup_is_two_phase() {
        let t0 = Instant::now();
        let mut startup = StartupSequence::new(t0, Duration::from_millis(800), Duration::from_millis(100));

        assert!(startup.advance(t0 + Duration::from_millis(799)).is_empty());
        assert_eq!(startup.phase(), Phase::Loading);

        let ready = t0 + Duration::from_millis(800);
        assert_eq!(startup.advance(ready), vec![StartupStep::MountContent]);
        assert_eq!(startup.phase(), Phase::Ready);
        assert!(!startup.is_observing());

        assert!(startup.advance(ready + Duration::from_millis(50)).is_empty());
        assert_eq!(startup.advance(ready + Duration::from_millis(100)), vec![StartupStep::BeginObserving]);
        assert!(startup.advance(ready + Duration::from_secs(60)).is_empty());
        assert_eq!(startup.phase(), Phase::Ready);
    }

    #[test]
    fn splash_then_registers_three_targets_once() {
        let t0 = Instant::now();
        let mut startup = StartupSequence::new(t0, Duration::from_millis(800), Duration::from_millis(100));
        let mut coordinator = ViewportRevealCoordinator::default();
        let mut host = RecordingHost::default();
        let targets: Vec<_> = (0..3).map(|i| RevealTarget::simple(TargetId(i))).collect();

        for ms in (0..=1200).step_by(50) {
            for step in startup.advance(t0 + Duration::from_millis(ms)) {
                if step == StartupStep::BeginObserving {
                    for target in &targets {
                        coordinator.register(&mut host, target.clone()).unwrap();
                    }
                }
            }
            if ms < 800 {
                assert!(host.observed.is_empty());
            }
        }

        assert_eq!(startup.phase(), Phase::Ready);
        let ids: Vec<_> = host.observed.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec![TargetId(0), TargetId(1), TargetId(2)]);
    }
}
