//! A mounted, interactive galaxy scene.
//!
//! The scene owns the per-frame path (hit test, interaction, rotation), the
//! click subscription, and the derived data for the active year range.
//! Derived data is memoized by catalog identity and range so that moving the
//! year slider back and forth does not rebuild buffers.

use crate::aggregate::{self, ClusterStat, RadarRow, ViewSummary, YearDurationPoint};
use crate::catalog::{CatalogId, FilteredView, SongCatalog, SongRecord, YearRange};
use crate::events::{ClickBus, ClickSubscription};
use crate::hit_test::{self, ChunkedIndex, PointIndex, Ray};
use crate::interaction::{self, HoverPauseController, InteractionState, Notification, Timestamp};
use crate::point_cloud::{self, PointCloudBuffers};
use crate::rotation::{self, RotationDriver};
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

/// Tunables for a mounted scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SceneSettings {
    pub hit_radius: f32,
    pub pause: Duration,
    pub rotation_step: f64,
    /// How many year ranges to keep derived data for.
    pub memo_capacity: usize,
}

impl Default for SceneSettings {
    fn default() -> Self {
        Self {
            hit_radius: hit_test::HIT_RADIUS,
            pause: interaction::PAUSE_DURATION,
            rotation_step: rotation::ROTATION_STEP,
            memo_capacity: 8,
        }
    }
}

/// Everything derived from one filtered view.
#[derive(Debug)]
pub struct ViewData<'c> {
    pub view: FilteredView<'c>,
    pub buffers: PointCloudBuffers,
    pub index: ChunkedIndex,
    pub cluster_stats: Vec<ClusterStat>,
    pub radar: Vec<RadarRow>,
    pub durations: Vec<YearDurationPoint>,
    pub summary: ViewSummary,
}

impl<'c> ViewData<'c> {
    pub fn compute(catalog: &'c SongCatalog, range: YearRange) -> Self {
        let view = catalog.filter(range);
        let buffers = point_cloud::build_point_cloud(&view);
        let index = ChunkedIndex::build(&buffers);
        let cluster_stats = aggregate::compute_cluster_stats(&view);
        let radar = aggregate::compute_radar_series(&cluster_stats);
        let durations = aggregate::compute_duration_series(&view);
        let summary = aggregate::compute_view_summary(&view);
        log::debug!(
            "Computed view {}..={}: {} songs, {} clusters, {} years",
            range.from,
            range.to,
            view.len(),
            cluster_stats.len(),
            durations.len()
        );
        Self {
            view,
            buffers,
            index,
            cluster_stats,
            radar,
            durations,
            summary,
        }
    }
}

type ViewKey = (CatalogId, YearRange);

/// Small most-recently-used memo of derived view data.
#[derive(Debug)]
struct ViewCache<'c> {
    capacity: usize,
    entries: VecDeque<(ViewKey, Rc<ViewData<'c>>)>,
    computed: usize,
}

impl<'c> ViewCache<'c> {
    fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            entries: VecDeque::new(),
            computed: 0,
        }
    }

    fn get_or_compute(&mut self, catalog: &'c SongCatalog, range: YearRange) -> Rc<ViewData<'c>> {
        let key = (catalog.id(), range);
        if let Some(pos) = self.entries.iter().position(|(k, _)| *k == key) {
            if let Some(entry) = self.entries.remove(pos) {
                let data = Rc::clone(&entry.1);
                self.entries.push_front(entry);
                return data;
            }
        }

        let data = Rc::new(ViewData::compute(catalog, range));
        self.computed += 1;
        self.entries.push_front((key, Rc::clone(&data)));
        self.entries.truncate(self.capacity);
        data
    }
}

/// Result of one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<'c> {
    pub state: InteractionState,
    pub hovered: Option<&'c SongRecord>,
    pub paused: bool,
    pub angle: f64,
    /// Hover notifications raised this frame, resolved to songs.
    pub hover_changes: Vec<Option<&'c SongRecord>>,
}

pub struct Scene<'c> {
    catalog: &'c SongCatalog,
    settings: SceneSettings,
    cache: ViewCache<'c>,
    current: Rc<ViewData<'c>>,
    range: YearRange,
    controller: HoverPauseController,
    rotation: RotationDriver,
    clicks: Option<ClickSubscription>,
}

impl<'c> Scene<'c> {
    /// Mount a scene: subscribe to clicks and compute the initial view.
    pub fn mount(
        catalog: &'c SongCatalog,
        range: YearRange,
        bus: &ClickBus,
        settings: SceneSettings,
    ) -> Self {
        let mut cache = ViewCache::new(settings.memo_capacity);
        let current = cache.get_or_compute(catalog, range);
        log::info!(
            "Mounted scene: {} of {} songs in {}..={}",
            current.view.len(),
            catalog.len(),
            range.from,
            range.to
        );
        Self {
            catalog,
            settings,
            cache,
            current,
            range,
            controller: HoverPauseController::new(settings.pause),
            rotation: RotationDriver::new(settings.rotation_step),
            clicks: Some(bus.subscribe()),
        }
    }

    /// Run one frame. `pointer` is the world-space ray under the cursor, or
    /// `None` when the cursor is outside the canvas.
    pub fn tick(&mut self, now: Timestamp, pointer: Option<&Ray>) -> Frame<'c> {
        let hit = pointer.and_then(|ray| {
            let local = ray.to_local(self.rotation.angle());
            self.current
                .index
                .nearest_hit(&local, self.settings.hit_radius)
                .map(|h| h.index)
        });
        self.tick_hit(now, hit)
    }

    /// Run one frame with an already hit-tested pointer target. Targets
    /// outside the current view count as a miss.
    pub fn tick_hit(&mut self, now: Timestamp, hit: Option<usize>) -> Frame<'c> {
        let hit = hit.filter(|&i| i < self.current.view.len());
        let clicks = self.clicks.as_ref().map_or(0, ClickSubscription::drain);

        let notifications = self.controller.advance(now, hit, clicks);
        let angle = self.rotation.advance(self.controller.is_paused());

        Frame {
            state: self.controller.state(),
            hovered: self.hovered(),
            paused: self.controller.is_paused(),
            angle,
            hover_changes: self.resolve(&notifications),
        }
    }

    /// Switch the year filter. Interaction falls back to `Idle` because
    /// indices into the old view are meaningless in the new one.
    pub fn set_year_range(&mut self, range: YearRange) -> Vec<Option<&'c SongRecord>> {
        if range == self.range {
            return Vec::new();
        }
        self.range = range;
        self.current = self.cache.get_or_compute(self.catalog, range);
        let notifications = self.controller.invalidate();
        self.resolve(&notifications)
    }

    /// Release the click subscription and cancel any pending pause.
    pub fn teardown(mut self) {
        self.release();
    }

    fn release(&mut self) {
        self.controller.cancel();
        if self.clicks.take().is_some() {
            log::debug!("Scene torn down");
        }
    }

    fn resolve(&self, notifications: &[Notification]) -> Vec<Option<&'c SongRecord>> {
        notifications
            .iter()
            .map(|Notification::Hover(index)| index.and_then(|i| self.current.view.get(i)))
            .collect()
    }

    pub fn hovered(&self) -> Option<&'c SongRecord> {
        self.controller.hovered().and_then(|i| self.current.view.get(i))
    }

    pub fn year_range(&self) -> YearRange {
        self.range
    }

    pub fn data(&self) -> &ViewData<'c> {
        &self.current
    }

    pub fn state(&self) -> InteractionState {
        self.controller.state()
    }

    pub fn angle(&self) -> f64 {
        self.rotation.angle()
    }

    pub fn pending_timers(&self) -> usize {
        self.controller.pending_timers()
    }

    /// How many views have been computed (not served from memo).
    pub fn views_computed(&self) -> usize {
        self.cache.computed
    }
}

impl Drop for Scene<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::test_support::song;
    use crate::point_cloud::POSITION_SCALE;

    /// Songs on the X axis, one unit apart in scene space, years 1960 + 10i.
    fn catalog() -> SongCatalog {
        let songs = (0..5)
            .map(|i| {
                let mut s = song(1960 + 10 * i, i as u8, 0.5);
                s.name = format!("Song {i}");
                s.position = [f64::from(i) / f64::from(POSITION_SCALE), 0.0, 0.0];
                s
            })
            .collect();
        SongCatalog::new(songs)
    }

    /// Ray straight down -Z through scene x.
    fn ray_at(x: f32) -> Ray {
        Ray::new([x, 0.0, 50.0], [0.0, 0.0, -1.0])
    }

    fn ms(t: u64) -> Timestamp {
        Timestamp::from_millis(t)
    }

    fn no_rotation() -> SceneSettings {
        SceneSettings {
            rotation_step: 0.0,
            ..SceneSettings::default()
        }
    }

    #[test]
    fn test_hover_resolves_song() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, no_rotation());

        let frame = scene.tick(ms(0), Some(&ray_at(2.0)));
        assert_eq!(frame.hovered.map(|s| s.name.as_str()), Some("Song 2"));
        assert_eq!(frame.hover_changes.len(), 1);
        assert_eq!(frame.state, InteractionState::Hovering { index: 2 });

        let frame = scene.tick(ms(16), None);
        assert_eq!(frame.hovered, None);
        assert_eq!(frame.hover_changes, vec![None]);
    }

    #[test]
    fn test_click_pauses_rotation_until_timeout() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, SceneSettings::default());

        scene.tick(ms(0), Some(&ray_at(1.0)));
        bus.publish();
        let frame = scene.tick(ms(16), Some(&ray_at(1.0)));
        assert!(frame.paused);
        let held = frame.angle;

        let frame = scene.tick(ms(1000), Some(&ray_at(1.0)));
        assert!(frame.paused);
        assert_eq!(frame.angle, held);

        let frame = scene.tick(ms(3016), Some(&ray_at(1.0)));
        assert!(!frame.paused);
        assert_eq!(frame.state, InteractionState::Hovering { index: 1 });
        assert!(frame.angle > held);
    }

    #[test]
    fn test_year_range_change_invalidates_hover() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, no_rotation());

        scene.tick(ms(0), Some(&ray_at(3.0)));
        bus.publish();
        scene.tick(ms(16), Some(&ray_at(3.0)));
        assert_eq!(scene.pending_timers(), 1);

        let changes = scene.set_year_range(YearRange::new(1980, 2000));
        assert_eq!(changes, vec![None]);
        assert_eq!(scene.state(), InteractionState::Idle);
        assert_eq!(scene.pending_timers(), 0);
        assert_eq!(scene.data().view.len(), 3);
        assert_eq!(scene.data().buffers.len(), 3);
    }

    #[test]
    fn test_views_are_memoized() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, no_rotation());
        assert_eq!(scene.views_computed(), 1);

        scene.set_year_range(YearRange::new(1970, 1990));
        scene.set_year_range(YearRange::default());
        scene.set_year_range(YearRange::new(1970, 1990));
        assert_eq!(scene.views_computed(), 2);

        // Same range again is a no-op
        assert!(scene.set_year_range(YearRange::new(1970, 1990)).is_empty());
        assert_eq!(scene.views_computed(), 2);
    }

    #[test]
    fn test_memo_evicts_least_recent() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let settings = SceneSettings {
            memo_capacity: 2,
            ..no_rotation()
        };
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, settings);
        scene.set_year_range(YearRange::new(1960, 1970));
        scene.set_year_range(YearRange::new(1980, 2000));
        // Full range was evicted
        scene.set_year_range(YearRange::default());
        assert_eq!(scene.views_computed(), 4);
    }

    #[test]
    fn test_teardown_releases_subscription() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, no_rotation());
        assert_eq!(bus.subscriber_count(), 1);

        scene.tick(ms(0), Some(&ray_at(0.0)));
        bus.publish();
        scene.tick(ms(16), Some(&ray_at(0.0)));
        assert_eq!(scene.pending_timers(), 1);

        scene.teardown();
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_drop_releases_subscription() {
        let catalog = catalog();
        let bus = ClickBus::new();
        {
            let _a = Scene::mount(&catalog, YearRange::default(), &bus, no_rotation());
            let _b = Scene::mount(&catalog, YearRange::default(), &bus, no_rotation());
            assert_eq!(bus.subscriber_count(), 2);
        }
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_hit_follows_rotation() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let settings = SceneSettings {
            rotation_step: std::f64::consts::FRAC_PI_2,
            ..SceneSettings::default()
        };
        let mut scene = Scene::mount(&catalog, YearRange::default(), &bus, settings);

        // First tick tests at angle 0, then the scene turns a quarter
        scene.tick(ms(0), None);
        assert!((scene.angle() - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        // Local +X now points to world -Z: a ray along -X from the far side
        // of the Z axis passes through song 4 at world (0, 0, -4)
        let ray = Ray::new([10.0, 0.0, -4.0], [-1.0, 0.0, 0.0]);
        let frame = scene.tick(ms(16), Some(&ray));
        assert_eq!(frame.state, InteractionState::Hovering { index: 4 });
    }

    #[test]
    fn test_empty_view_scene() {
        let catalog = catalog();
        let bus = ClickBus::new();
        let mut scene = Scene::mount(&catalog, YearRange::new(2015, 2020), &bus, no_rotation());
        assert!(scene.data().buffers.is_empty());
        assert!(scene.data().cluster_stats.is_empty());
        assert!(scene.data().durations.is_empty());

        bus.publish();
        let frame = scene.tick(ms(0), Some(&ray_at(0.0)));
        assert_eq!(frame.state, InteractionState::Idle);
    }
}
