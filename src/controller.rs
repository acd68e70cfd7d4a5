//! The rotation controller owns all mutable app state and drives it forward
//! one tick at a time: apply finished refreshes, rotate pages, draw, then
//! handle input. Nothing in here blocks; the network lives on the
//! [Refresher]'s threads.

use crate::{
    location::{Location, LocationRequest},
    music::Playlist,
    pages::{PageId, Registry},
    refresh::{RefreshRequest, Refresher},
    settings::{Settings, SettingsStore},
    snapshot::{DataKind, Fetched, Snapshot},
    surface::{Frame, InputEvent, Surface},
};
use indexmap::IndexSet;
use log::{debug, error, info, trace, warn};
use std::{sync::Arc, time::Duration};

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Mode {
    Running,
    Paused,
    /// User navigated by hand. Auto-advance picks back up once the page has
    /// been up for its full duration
    ManualOverride,
}

/// Transient rotation state. Never persisted
#[derive(Clone, Debug, PartialEq)]
pub struct RotationState {
    pub mode: Mode,
    /// Index into the enabled page list
    pub index: usize,
    /// Time on the current page. Frozen while paused or in the menu
    pub elapsed: Duration,
    /// Time since the last refresh was attempted
    pub since_refresh: Duration,
}

impl Default for RotationState {
    fn default() -> Self {
        Self {
            mode: Mode::Running,
            index: 0,
            elapsed: Duration::ZERO,
            since_refresh: Duration::ZERO,
        }
    }
}

/// What the main loop should do after a tick
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Controller<S> {
    surface: S,
    settings: SettingsStore,
    registry: Registry,
    refresher: Refresher,
    playlist: Playlist,
    /// Kinds with a registered source. Fixed for the process lifetime
    available: IndexSet<DataKind>,
    /// Enabled pages, recomputed whenever settings change
    pages: Vec<PageId>,
    state: RotationState,
    /// Replaced whole when a refresh lands, never modified in place
    snapshot: Arc<Snapshot>,
    menu_open: bool,
    refresh_interval: Duration,
    /// Session-only location from the command line
    location_override: Option<Location>,
}

impl<S: Surface> Controller<S> {
    pub fn new(
        surface: S,
        settings: SettingsStore,
        registry: Registry,
        refresher: Refresher,
        playlist: Playlist,
        refresh_interval: Duration,
    ) -> Self {
        let available = refresher.kinds();
        let pages = registry.enabled_pages(&settings, &available);
        info!("Enabled pages: {}", itertools::join(&pages, ", "));
        Self {
            surface,
            settings,
            registry,
            refresher,
            playlist,
            available,
            pages,
            state: RotationState::default(),
            snapshot: Arc::new(Snapshot::default()),
            menu_open: false,
            refresh_interval,
            location_override: None,
        }
    }

    /// Use this location for the session instead of what's in settings
    pub fn with_location_override(mut self, location: Location) -> Self {
        info!("Using location {location} for this session");
        self.location_override = Some(location);
        self
    }

    /// Kick things off: music and the first refresh
    pub fn start(&mut self) {
        self.surface.set_volume(self.settings.music_volume);
        self.play_current_track();
        self.trigger_refresh();
    }

    /// Run one cycle of the loop. `dt` is the time since the last tick
    pub fn tick(&mut self, dt: Duration) -> anyhow::Result<Flow> {
        trace!("Running tick");

        // 1. Data
        if let Some(fetched) = self.refresher.poll() {
            self.apply(fetched);
        }
        self.state.since_refresh += dt;
        if self.state.since_refresh >= self.refresh_interval {
            self.trigger_refresh();
        }

        // 2. Rotation
        self.rotate(dt);

        // 3. Render
        let frame = self.frame();
        self.surface.draw_frame(&frame)?;

        // 4. Input
        for event in self.surface.poll_input() {
            if self.handle_input(event) == Flow::Quit {
                info!("Quit requested");
                return Ok(Flow::Quit);
            }
        }
        Ok(Flow::Continue)
    }

    /// Swap in the next snapshot. Renders before this see the old one in
    /// full, renders after see the new one in full
    pub fn apply(&mut self, fetched: Fetched) {
        self.snapshot = Arc::new(self.snapshot.apply(fetched));
        debug!("Applied snapshot {}", self.snapshot.generation());
    }

    /// Stop music and make sure settings are on disk
    pub fn shutdown(&mut self) -> anyhow::Result<()> {
        info!("Shutting down");
        self.surface.stop_music();
        self.settings.save()
    }

    pub fn state(&self) -> &RotationState {
        &self.state
    }

    pub fn pages(&self) -> &[PageId] {
        &self.pages
    }

    pub fn active_page(&self) -> Option<PageId> {
        self.pages.get(self.state.index).copied()
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn menu_open(&self) -> bool {
        self.menu_open
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn trigger_refresh(&mut self) {
        self.state.since_refresh = Duration::ZERO;
        let kinds = self.registry.required_kinds(&self.pages, &self.available);
        if kinds.is_empty() {
            debug!("Nothing to refresh");
            return;
        }
        let location = match &self.location_override {
            Some(location) => LocationRequest::Manual(location.clone()),
            None => self.settings.location_request(),
        };
        self.refresher.trigger(RefreshRequest { location, kinds });
    }

    /// Advance once for every full page duration in the elapsed time, so a
    /// slow frame (e.g. an e-paper refresh) doesn't stretch the schedule
    fn rotate(&mut self, dt: Duration) {
        if self.menu_open || self.state.mode == Mode::Paused {
            return;
        }
        if self.active_page().is_none() {
            return;
        }
        self.state.elapsed += dt;
        while let Some(page) = self.active_page() {
            let duration =
                self.registry
                    .duration(page, &self.snapshot, self.settings.units);
            if duration.is_zero() || self.state.elapsed < duration {
                break;
            }
            self.state.elapsed -= duration;
            self.state.index = (self.state.index + 1) % self.pages.len();
            self.state.mode = Mode::Running;
            self.log_page_change(page);
        }
    }

    fn frame(&self) -> Frame {
        let units = self.settings.units;
        if self.menu_open {
            return self.registry.render_menu(&self.settings);
        }
        match self.active_page() {
            Some(page) => self.registry.render(page, &self.snapshot, units),
            None => self.registry.render_fallback(&self.snapshot, units),
        }
    }

    fn handle_input(&mut self, event: InputEvent) -> Flow {
        debug!("Input: {event:?}");
        match event {
            InputEvent::Quit => return Flow::Quit,
            InputEvent::TogglePause => {
                self.state.mode = match self.state.mode {
                    Mode::Paused => Mode::Running,
                    Mode::Running | Mode::ManualOverride => Mode::Paused,
                };
                info!("Rotation {:?}", self.state.mode);
            }
            InputEvent::Next => self.navigate(1),
            InputEvent::Previous => self.navigate(-1),
            InputEvent::OpenSettings => self.menu_open = true,
            InputEvent::CloseSettings => self.menu_open = false,
            InputEvent::Toggle(option) if self.menu_open => {
                self.change_settings(|settings| settings.toggle(option));
            }
            InputEvent::CycleVolume if self.menu_open => {
                self.change_settings(Settings::cycle_volume);
                self.surface.set_volume(self.settings.music_volume);
            }
            InputEvent::Toggle(_) | InputEvent::CycleVolume => {
                debug!("Settings menu is closed, ignoring");
            }
            InputEvent::ForceRefresh => self.trigger_refresh(),
            InputEvent::HeadlineClicked(url) => {
                if let Err(err) = self.surface.open_link(&url) {
                    error!("Error opening {url}: {err:#}");
                }
            }
            InputEvent::TrackFinished => {
                self.playlist.advance();
                self.play_current_track();
            }
        }
        Flow::Continue
    }

    /// Move by hand, wrapping at either end
    fn navigate(&mut self, delta: isize) {
        let count = self.pages.len();
        if count == 0 {
            return;
        }
        let previous = self.active_page();
        self.state.index =
            (self.state.index as isize + delta).rem_euclid(count as isize)
                as usize;
        self.state.elapsed = Duration::ZERO;
        self.state.mode = Mode::ManualOverride;
        if let Some(previous) = previous {
            self.log_page_change(previous);
        }
    }

    fn log_page_change(&self, previous: PageId) {
        if let Some(page) = self.active_page() {
            info!("Page {previous} -> {page}");
        }
    }

    /// Apply and persist a settings change, then rebuild the page list and
    /// fetch anything newly needed
    fn change_settings(&mut self, f: impl FnOnce(&mut Settings)) {
        // The in-memory change sticks even if the save fails
        if let Err(err) = self.settings.update(f) {
            error!("{err:#}");
        }
        self.update_pages();
        self.trigger_refresh();
    }

    /// Recompute enabled pages, keeping the active page if it's still there
    /// and otherwise moving to the next one that is
    fn update_pages(&mut self) {
        let active = self.active_page();
        let pages = self.registry.enabled_pages(&self.settings, &self.available);
        let index = match active {
            Some(active) => pages
                .iter()
                .position(|&page| page == active)
                .or_else(|| {
                    self.state.elapsed = Duration::ZERO;
                    self.registry.following(active, &pages)
                }),
            None => None,
        };
        self.state.index = index.unwrap_or(0);
        self.pages = pages;
        info!("Enabled pages: {}", itertools::join(&self.pages, ", "));
    }

    fn play_current_track(&mut self) {
        if let Some(track) = self.playlist.current() {
            if let Err(err) = self.surface.play_track(track) {
                warn!("Error playing {}: {err:#}", track.display());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        settings::SettingsOption,
        testing::{self, FakeSource, RecordingSurface},
    };
    use proptest::prelude::*;
    use std::{env, fs, path::PathBuf, process, thread, time::Instant};

    const PAGE: Duration = Duration::from_secs(15);
    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    fn settings_path(name: &str) -> PathBuf {
        env::temp_dir().join(format!(
            "weatherstar-controller-{}-{name}.json",
            process::id()
        ))
    }

    /// Sources for the core weather pages. No headlines, so every page
    /// has a fixed duration
    fn weather_sources() -> Vec<FakeSource> {
        vec![
            FakeSource::new(DataKind::Current, testing::current(20.0)),
            FakeSource::new(DataKind::Radar, testing::radar()),
            FakeSource::new(DataKind::Alerts, testing::alerts()),
        ]
    }

    fn controller_with(
        name: &str,
        settings: Settings,
        sources: Vec<FakeSource>,
        refresh_interval: Duration,
    ) -> Controller<RecordingSurface> {
        let mut provider = testing::provider(Duration::from_secs(5));
        for source in sources {
            provider = provider.with_source(source);
        }
        Controller::new(
            RecordingSurface::default(),
            SettingsStore::with_settings(settings_path(name), settings),
            Registry::new(PAGE),
            Refresher::new(Arc::new(provider)),
            Playlist::new(vec!["a.mp3".into(), "b.mp3".into()]),
            refresh_interval,
        )
    }

    fn controller(name: &str) -> Controller<RecordingSurface> {
        controller_with(name, Settings::default(), weather_sources(), DAY)
    }

    /// Push one input event and run a zero-length tick to process it
    fn input(controller: &mut Controller<RecordingSurface>, event: InputEvent) {
        controller.surface_mut().push(event);
        assert_eq!(controller.tick(Duration::ZERO).unwrap(), Flow::Continue);
    }

    /// Tick until the in-flight refresh lands
    fn wait_for_refresh(controller: &mut Controller<RecordingSurface>) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while controller.refresher.in_flight() {
            assert!(Instant::now() < deadline, "Refresh never finished");
            thread::sleep(Duration::from_millis(5));
            controller.tick(Duration::ZERO).unwrap();
        }
    }

    #[test]
    fn test_initial_state() {
        let mut controller = controller("initial");
        assert_eq!(
            controller.pages(),
            &[PageId::CurrentConditions, PageId::Radar, PageId::Hazards]
        );
        assert_eq!(controller.state(), &RotationState::default());
        controller.tick(Duration::ZERO).unwrap();
        let frame = controller.surface().last_frame();
        assert_eq!(frame.page, Some(PageId::CurrentConditions));
        assert!(frame.placeholder);
    }

    #[test]
    fn test_advance_and_wrap() {
        let mut controller = controller("advance");
        controller.tick(Duration::from_secs(14)).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
        controller.tick(Duration::from_secs(1)).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::Radar));
        assert_eq!(controller.state().elapsed, Duration::ZERO);
        controller.tick(PAGE).unwrap();
        controller.tick(PAGE).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
    }

    #[test]
    fn test_long_tick_advances_per_duration() {
        let mut controller = controller("long-tick");
        controller.tick(PAGE * 2 + Duration::from_secs(3)).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::Hazards));
        assert_eq!(controller.state().elapsed, Duration::from_secs(3));
        controller.tick(Duration::from_secs(12)).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
        assert_eq!(controller.state().elapsed, Duration::ZERO);
    }

    #[test]
    fn test_pause_freezes_rotation() {
        let mut controller = controller("pause");
        controller.tick(Duration::from_secs(5)).unwrap();
        input(&mut controller, InputEvent::TogglePause);
        assert_eq!(controller.state().mode, Mode::Paused);
        controller.tick(PAGE * 10).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
        assert_eq!(controller.state().elapsed, Duration::from_secs(5));

        input(&mut controller, InputEvent::TogglePause);
        assert_eq!(controller.state().mode, Mode::Running);
        controller.tick(Duration::from_secs(10)).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::Radar));
    }

    #[test]
    fn test_next_then_previous() {
        let mut controller = controller("next-previous");
        controller.tick(Duration::from_secs(7)).unwrap();

        input(&mut controller, InputEvent::Next);
        assert_eq!(controller.active_page(), Some(PageId::Radar));
        assert_eq!(controller.state().elapsed, Duration::ZERO);
        assert_eq!(controller.state().mode, Mode::ManualOverride);

        input(&mut controller, InputEvent::Previous);
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
        assert_eq!(controller.state().elapsed, Duration::ZERO);

        // Wraps backwards
        input(&mut controller, InputEvent::Previous);
        assert_eq!(controller.active_page(), Some(PageId::Hazards));
    }

    #[test]
    fn test_manual_override_resumes() {
        let mut controller = controller("override");
        input(&mut controller, InputEvent::Next);
        controller.tick(PAGE).unwrap();
        assert_eq!(controller.active_page(), Some(PageId::Hazards));
        assert_eq!(controller.state().mode, Mode::Running);
    }

    #[test]
    fn test_menu_toggles_only_while_open() {
        let mut controller = controller("menu");
        input(&mut controller, InputEvent::Toggle(SettingsOption::Trends));
        assert!(controller.settings().show_trends);

        input(&mut controller, InputEvent::OpenSettings);
        assert!(controller.menu_open());
        controller.tick(PAGE * 2).unwrap();
        // Rotation is frozen under the menu
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
        assert_eq!(controller.surface().last_frame().title, "Settings");

        input(&mut controller, InputEvent::Toggle(SettingsOption::Trends));
        assert!(!controller.settings().show_trends);
        input(&mut controller, InputEvent::CycleVolume);
        let volume = controller.surface().volume.unwrap();
        assert!((volume - 0.4).abs() < 1e-6);

        input(&mut controller, InputEvent::CloseSettings);
        assert!(!controller.menu_open());

        // Persisted
        let (reloaded, _) = SettingsStore::load(settings_path("menu"));
        assert!(!reloaded.show_trends);
        fs::remove_file(settings_path("menu")).unwrap();
    }

    #[test]
    fn test_disable_active_page_moves_forward() {
        let sources = vec![
            FakeSource::new(DataKind::Current, testing::current(20.0)),
            FakeSource::new(DataKind::Hourly, testing::hourly()),
            FakeSource::new(DataKind::History, testing::history()),
            FakeSource::new(DataKind::MsnHeadlines, testing::headlines("msn", 2)),
        ];
        let mut controller =
            controller_with("disable", Settings::default(), sources, DAY);
        assert_eq!(
            controller.pages(),
            &[
                PageId::CurrentConditions,
                PageId::HourlyForecast,
                PageId::TemperatureTrend,
                PageId::WeatherRecords,
                PageId::MsnNews,
            ]
        );
        input(&mut controller, InputEvent::Next);
        input(&mut controller, InputEvent::Next);
        assert_eq!(controller.active_page(), Some(PageId::TemperatureTrend));

        input(&mut controller, InputEvent::OpenSettings);
        input(&mut controller, InputEvent::Toggle(SettingsOption::Trends));
        assert_eq!(controller.active_page(), Some(PageId::WeatherRecords));

        // Disabling the last two pages wraps around to the front
        input(&mut controller, InputEvent::Toggle(SettingsOption::Msn));
        input(&mut controller, InputEvent::Toggle(SettingsOption::Historical));
        assert_eq!(controller.active_page(), Some(PageId::CurrentConditions));
        wait_for_refresh(&mut controller);
        fs::remove_file(settings_path("disable")).unwrap();
    }

    #[test]
    fn test_no_pages_renders_fallback() {
        let mut controller =
            controller_with("empty", Settings::default(), vec![], DAY);
        assert!(controller.pages().is_empty());
        controller.tick(PAGE * 3).unwrap();
        input(&mut controller, InputEvent::Next);
        let frame = controller.surface().last_frame();
        assert_eq!(frame.page, None);
        assert!(frame.placeholder);
    }

    #[test]
    fn test_quit() {
        let mut controller = controller("quit");
        controller.surface_mut().push(InputEvent::Quit);
        assert_eq!(controller.tick(Duration::ZERO).unwrap(), Flow::Quit);
    }

    #[test]
    fn test_headline_click_opens_link() {
        let mut controller = controller("click");
        input(
            &mut controller,
            InputEvent::HeadlineClicked("https://example.com/story".into()),
        );
        assert_eq!(controller.surface().opened, vec!["https://example.com/story"]);
    }

    #[test]
    fn test_music() {
        let mut controller = controller("music");
        controller.start();
        input(&mut controller, InputEvent::TrackFinished);
        input(&mut controller, InputEvent::TrackFinished);
        assert_eq!(
            controller.surface().tracks,
            vec![
                PathBuf::from("a.mp3"),
                PathBuf::from("b.mp3"),
                PathBuf::from("a.mp3")
            ]
        );
        wait_for_refresh(&mut controller);
        controller.shutdown().unwrap();
        assert!(controller.surface().music_stopped);
        fs::remove_file(settings_path("music")).unwrap();
    }

    #[test]
    fn test_loaded_settings_reach_surface() {
        let path = settings_path("loaded");
        fs::write(&path, r#"{"music_volume": 0.3, "show_local_news": false}"#)
            .unwrap();
        let (settings, _) = SettingsStore::load(&path);
        let mut provider = testing::provider(Duration::from_secs(5));
        provider = provider.with_source(FakeSource::new(
            DataKind::LocalNews,
            testing::headlines("local", 3),
        ));
        let mut controller = Controller::new(
            RecordingSurface::default(),
            settings,
            Registry::new(PAGE),
            Refresher::new(Arc::new(provider)),
            Playlist::default(),
            DAY,
        );
        controller.start();
        assert!(!controller.pages().contains(&PageId::LocalNews));
        assert_eq!(controller.surface().volume, Some(0.3));
        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_refresh_applies_between_renders() {
        let mut controller = controller("refresh");
        controller.start();
        wait_for_refresh(&mut controller);
        controller.tick(Duration::ZERO).unwrap();
        assert_eq!(controller.snapshot().generation(), 1);
        let frame = controller.surface().last_frame();
        assert!(!frame.placeholder);
        assert_eq!(frame.generation, 1);
    }

    #[test]
    fn test_refresh_interval() {
        let mut controller = controller_with(
            "interval",
            Settings::default(),
            weather_sources(),
            Duration::from_secs(60),
        );
        controller.tick(Duration::from_secs(59)).unwrap();
        assert!(!controller.refresher.in_flight());
        controller.tick(Duration::from_secs(1)).unwrap();
        assert!(controller.refresher.in_flight());
        assert_eq!(controller.state().since_refresh, Duration::ZERO);
        wait_for_refresh(&mut controller);
    }

    #[test]
    fn test_force_refresh_coalesces() {
        let source = FakeSource::new(DataKind::Current, testing::current(20.0))
            .with_delay(Duration::from_millis(200));
        let calls = source.calls();
        let mut controller =
            controller_with("coalesce", Settings::default(), vec![source], DAY);
        controller.start();
        input(&mut controller, InputEvent::ForceRefresh);
        input(&mut controller, InputEvent::ForceRefresh);
        wait_for_refresh(&mut controller);
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn test_timed_out_fetch_keeps_previous_value() {
        let source = FakeSource::new(DataKind::Current, testing::current(20.0))
            .with_ttl(Duration::ZERO);
        let delay = source.delay_handle();
        let mut provider = testing::provider(Duration::from_millis(100));
        provider = provider.with_source(source);
        let mut controller = Controller::new(
            RecordingSurface::default(),
            SettingsStore::with_settings(
                settings_path("timeout"),
                Settings::default(),
            ),
            Registry::new(PAGE),
            Refresher::new(Arc::new(provider)),
            Playlist::default(),
            DAY,
        );
        controller.start();
        wait_for_refresh(&mut controller);
        let first = Arc::clone(controller.snapshot());
        assert!(first.contains(DataKind::Current));

        *delay.lock().unwrap() = Duration::from_millis(500);
        let started = Instant::now();
        input(&mut controller, InputEvent::ForceRefresh);
        wait_for_refresh(&mut controller);
        assert!(started.elapsed() < Duration::from_millis(450));

        let second = controller.snapshot();
        assert_eq!(second.generation(), 2);
        assert_eq!(second.get(DataKind::Current), first.get(DataKind::Current));
        assert_eq!(second.updated_at(), first.updated_at());
    }

    #[derive(Clone, Debug)]
    enum Step {
        Tick(u64),
        Pause,
        Deliver(usize),
    }

    fn step() -> impl Strategy<Value = Step> {
        prop_oneof![
            6 => (0u64..20_000).prop_map(Step::Tick),
            1 => Just(Step::Pause),
            2 => (0usize..5).prop_map(Step::Deliver),
        ]
    }

    proptest! {
        /// Without manual input, the page advances exactly once per elapsed
        /// page duration, and never while paused
        #[test]
        fn test_rotation_timing(steps in prop::collection::vec(step(), 1..60)) {
            let mut controller = controller("rotation-property");
            let count = controller.pages().len();
            let mut index = 0;
            let mut elapsed = Duration::ZERO;
            let mut paused = false;
            for step in steps {
                match step {
                    Step::Tick(millis) => {
                        let dt = Duration::from_millis(millis);
                        controller.tick(dt).unwrap();
                        if !paused {
                            elapsed += dt;
                            while elapsed >= PAGE {
                                index = (index + 1) % count;
                                elapsed -= PAGE;
                            }
                        }
                    }
                    Step::Pause => {
                        input(&mut controller, InputEvent::TogglePause);
                        paused = !paused;
                    }
                    Step::Deliver(_) => continue,
                }
                prop_assert_eq!(controller.state().index, index);
                prop_assert_eq!(controller.state().elapsed, elapsed);
                prop_assert_eq!(
                    controller.state().mode == Mode::Paused,
                    paused
                );
            }
        }

        /// Each render sees exactly one complete snapshot: the result of
        /// every refresh applied so far, and nothing partial
        #[test]
        fn test_renders_see_whole_snapshots(
            steps in prop::collection::vec(step(), 1..40),
        ) {
            let mut controller = controller("atomic-property");
            let mut expected = Snapshot::default();
            for step in steps {
                match step {
                    Step::Tick(millis) => {
                        controller.tick(Duration::from_millis(millis)).unwrap();
                    }
                    Step::Pause => {
                        input(&mut controller, InputEvent::TogglePause);
                    }
                    Step::Deliver(variant) => {
                        let fetched = testing::fetched(variant);
                        expected = expected.apply(fetched.clone());
                        controller.apply(fetched);
                        controller.tick(Duration::ZERO).unwrap();
                    }
                }
                let frame = controller.surface().last_frame();
                let page = controller.active_page().unwrap();
                prop_assert_eq!(frame.generation, expected.generation());
                prop_assert_eq!(
                    frame,
                    &controller.registry().render(
                        page,
                        &expected,
                        controller.settings().units,
                    )
                );
            }
        }
    }
}
