use formats::{PlaybackConfig, PointRecord};
use layers::symbology::HeatmapStyle;
use layers::{HeatmapLayer, LayerSink};
use runtime::{EventBus, Timer, TimerId};
use tracing::debug;

use crate::controls::ControlsModel;
use crate::frame::{Frame, frame_subset};

/// How many transition events the player keeps for inspection.
const EVENT_LOG_CAPACITY: usize = 256;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Playback {
    Stopped,
    /// Auto-play is running on exactly this timer.
    Playing { timer: TimerId },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PlayerState {
    pub current_frame: Frame,
    pub playback: Playback,
    pub speed_ms: u32,
}

impl PlayerState {
    pub fn is_playing(&self) -> bool {
        matches!(self.playback, Playback::Playing { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    NoSpeeds,
    UnknownSpeed(u32),
}

impl std::fmt::Display for TimelineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimelineError::NoSpeeds => write!(f, "no playback speeds configured"),
            TimelineError::UnknownSpeed(ms) => {
                write!(f, "{ms}ms is not one of the configured playback speeds")
            }
        }
    }
}

impl std::error::Error for TimelineError {}

/// Steps the heatmap through the Men, Women and All frames.
///
/// All state changes go through the transition methods. The player owns its
/// timer, so the only way a tick is armed is `toggle_play`, and every path
/// that stops playback cancels the live timer first.
pub struct TimelinePlayer<T: Timer, S: LayerSink> {
    records: Vec<PointRecord>,
    state: PlayerState,
    speeds_ms: Vec<u32>,
    style: HeatmapStyle,
    timer: T,
    sink: S,
    events: EventBus,
    ticks: u64,
}

impl<T: Timer, S: LayerSink> TimelinePlayer<T, S> {
    /// Builds the player and renders the initial frame (Men, stopped).
    pub fn new(
        records: Vec<PointRecord>,
        playback: &PlaybackConfig,
        style: HeatmapStyle,
        timer: T,
        sink: S,
    ) -> Result<Self, TimelineError> {
        if playback.speeds_ms.is_empty() {
            return Err(TimelineError::NoSpeeds);
        }
        if !playback.speeds_ms.contains(&playback.initial_speed_ms) {
            return Err(TimelineError::UnknownSpeed(playback.initial_speed_ms));
        }

        let mut player = Self {
            records,
            state: PlayerState {
                current_frame: Frame::Men,
                playback: Playback::Stopped,
                speed_ms: playback.initial_speed_ms,
            },
            speeds_ms: playback.speeds_ms.clone(),
            style,
            timer,
            sink,
            events: EventBus::bounded(EVENT_LOG_CAPACITY),
            ticks: 0,
        };
        player.render_frame();
        Ok(player)
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn records(&self) -> &[PointRecord] {
        &self.records
    }

    pub fn speeds_ms(&self) -> &[u32] {
        &self.speeds_ms
    }

    pub fn timer(&self) -> &T {
        &self.timer
    }

    pub fn timer_mut(&mut self) -> &mut T {
        &mut self.timer
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn controls(&self) -> ControlsModel {
        ControlsModel::from_state(&self.state, &self.speeds_ms)
    }

    /// Play/pause button.
    pub fn toggle_play(&mut self) {
        if self.state.is_playing() {
            self.stop();
            return;
        }
        // Cancel-then-arm: never two live timers, even if state was tampered with.
        self.cancel_active();
        let timer = self.timer.arm(self.state.speed_ms);
        self.state.playback = Playback::Playing { timer };
        debug!(speed_ms = self.state.speed_ms, ?timer, "playback started");
        self.emit("play", format!("speed={}ms", self.state.speed_ms));
    }

    /// Frame marker click. Manual scrubbing always stops auto-play.
    pub fn select_frame(&mut self, frame: Frame) {
        self.stop();
        self.state.current_frame = frame;
        self.emit("select_frame", frame.label());
        self.render_frame();
    }

    /// Speed button click. Changing speed always leaves playback stopped.
    pub fn select_speed(&mut self, speed_ms: u32) -> Result<(), TimelineError> {
        if !self.speeds_ms.contains(&speed_ms) {
            return Err(TimelineError::UnknownSpeed(speed_ms));
        }
        self.state.speed_ms = speed_ms;
        self.stop();
        self.emit("select_speed", format!("speed={speed_ms}ms"));
        Ok(())
    }

    /// Stops auto-play. No-op when already stopped.
    pub fn stop(&mut self) {
        if self.cancel_active() {
            debug!(frame = %self.state.current_frame, "playback stopped");
            self.emit("stop", self.state.current_frame.label());
        }
    }

    /// Called by whoever drives the timer when `id` fires.
    ///
    /// Ticks from a timer that is no longer live are ignored.
    pub fn on_tick(&mut self, id: TimerId) {
        match self.state.playback {
            Playback::Playing { timer } if timer == id => {
                self.ticks += 1;
                self.state.current_frame = self.state.current_frame.next();
                self.emit("tick", self.state.current_frame.label());
                self.render_frame();
            }
            _ => debug!(?id, "ignoring tick from inactive timer"),
        }
    }

    fn cancel_active(&mut self) -> bool {
        match std::mem::replace(&mut self.state.playback, Playback::Stopped) {
            Playback::Playing { timer } => {
                self.timer.cancel(timer);
                true
            }
            Playback::Stopped => false,
        }
    }

    fn render_frame(&mut self) {
        let frame = self.state.current_frame;
        let subset = frame_subset(&self.records, frame);
        debug!(%frame, records = subset.len(), "rendering frame");
        self.sink.replace_layer(HeatmapLayer::new(subset, self.style));
    }

    fn emit(&mut self, kind: &'static str, message: impl Into<String>) {
        let at = self.timer.now();
        self.events.emit(self.ticks, at, kind, message);
    }
}

#[cfg(test)]
mod tests {
    use super::{Playback, TimelineError, TimelinePlayer};
    use crate::frame::Frame;
    use formats::{Gender, PlaybackConfig, PointRecord};
    use layers::HeatmapDataSource;
    use layers::symbology::HeatmapStyle;
    use pretty_assertions::assert_eq;
    use runtime::{ManualTimer, Timer};

    type TestPlayer = TimelinePlayer<ManualTimer, HeatmapDataSource>;

    fn dataset() -> Vec<PointRecord> {
        vec![
            PointRecord::new(-74.70, 40.50, 1.0, Gender::Male),
            PointRecord::new(-74.71, 40.51, 1.0, Gender::Female),
            PointRecord::new(-74.72, 40.52, 1.0, Gender::Male),
            PointRecord::new(-74.73, 40.53, 2.0, Gender::Female),
        ]
    }

    fn player_with(records: Vec<PointRecord>) -> TestPlayer {
        TimelinePlayer::new(
            records,
            &PlaybackConfig::default(),
            HeatmapStyle::default(),
            ManualTimer::new(),
            HeatmapDataSource::new(),
        )
        .expect("player")
    }

    fn rendered(player: &TestPlayer) -> Vec<PointRecord> {
        player.sink().current().expect("layer").data.clone()
    }

    /// Advances the clock and feeds every fired tick back into the player.
    fn run_for(player: &mut TestPlayer, ms: u64) -> Vec<Frame> {
        let fired = player.timer_mut().advance(ms);
        let mut visited = Vec::new();
        for id in fired {
            player.on_tick(id);
            visited.push(player.state().current_frame);
        }
        visited
    }

    fn active_markers(player: &TestPlayer) -> usize {
        player.controls().frames.iter().filter(|m| m.active).count()
    }

    #[test]
    fn starts_stopped_on_men_and_renders_it() {
        let player = player_with(dataset());
        let state = player.state();
        assert_eq!(state.current_frame, Frame::Men);
        assert_eq!(state.playback, Playback::Stopped);
        assert_eq!(state.speed_ms, 1000);
        assert_eq!(player.sink().generation(), 1);
        assert!(rendered(&player).iter().all(|r| r.gender == Gender::Male));
        assert_eq!(player.timer().live_count(), 0);
    }

    #[test]
    fn select_frame_renders_exact_subsets() {
        let data = dataset();
        let mut player = player_with(data.clone());

        player.select_frame(Frame::Men);
        assert_eq!(rendered(&player), vec![data[0], data[2]]);

        player.select_frame(Frame::Women);
        assert_eq!(rendered(&player), vec![data[1], data[3]]);

        player.select_frame(Frame::All);
        assert_eq!(rendered(&player), data);
    }

    #[test]
    fn select_frame_is_idempotent() {
        let mut player = player_with(dataset());
        player.select_frame(Frame::Women);
        let once = (rendered(&player), player.controls());
        player.select_frame(Frame::Women);
        let twice = (rendered(&player), player.controls());
        assert_eq!(once, twice);
    }

    #[test]
    fn exactly_one_marker_active_in_every_reachable_state() {
        let mut player = player_with(dataset());
        assert_eq!(active_markers(&player), 1);
        for frame in Frame::ALL {
            player.select_frame(frame);
            assert_eq!(active_markers(&player), 1);
            player.toggle_play();
            for _ in 0..3 {
                run_for(&mut player, 1000);
                assert_eq!(active_markers(&player), 1);
            }
            player.toggle_play();
            assert_eq!(active_markers(&player), 1);
        }
    }

    #[test]
    fn toggle_twice_returns_to_stopped_without_timer() {
        let mut player = player_with(dataset());
        player.toggle_play();
        assert!(player.state().is_playing());
        assert_eq!(player.timer().live_count(), 1);
        assert_eq!(player.controls().play_label, "pause");

        player.toggle_play();
        assert!(!player.state().is_playing());
        assert_eq!(player.timer().live_count(), 0);
        assert_eq!(player.controls().play_label, "play");
    }

    #[test]
    fn autoplay_visits_frames_in_cyclic_order() {
        let mut player = player_with(dataset());
        player.toggle_play();
        let visited = run_for(&mut player, 3000);
        assert_eq!(visited, vec![Frame::Women, Frame::All, Frame::Men]);
        let indices: Vec<_> = std::iter::once(Frame::Men)
            .chain(visited)
            .map(Frame::index)
            .collect();
        assert_eq!(indices, vec![0, 1, 2, 0]);
        assert_eq!(player.sink().generation(), 4);
    }

    #[test]
    fn ticks_use_selected_speed() {
        let mut player = player_with(dataset());
        player.select_speed(250).expect("speed");
        player.toggle_play();
        assert_eq!(run_for(&mut player, 1000).len(), 4);
    }

    #[test]
    fn select_speed_always_stops() {
        let mut player = player_with(dataset());
        player.toggle_play();
        player.select_speed(250).expect("speed");
        let state = player.state();
        assert_eq!(state.playback, Playback::Stopped);
        assert_eq!(state.current_frame, Frame::Men);
        assert_eq!(state.speed_ms, 250);
        assert_eq!(player.timer().live_count(), 0);
        assert!(run_for(&mut player, 5000).is_empty());
    }

    #[test]
    fn unknown_speed_is_rejected_without_side_effects() {
        let mut player = player_with(dataset());
        player.toggle_play();
        assert_eq!(player.select_speed(500), Err(TimelineError::UnknownSpeed(500)));
        assert!(player.state().is_playing());
        assert_eq!(player.state().speed_ms, 1000);
    }

    #[test]
    fn select_frame_stops_playback() {
        let mut player = player_with(dataset());
        player.toggle_play();
        run_for(&mut player, 1000);
        player.select_frame(Frame::All);
        assert!(!player.state().is_playing());
        assert_eq!(player.timer().live_count(), 0);
        assert_eq!(player.state().current_frame, Frame::All);
        assert!(run_for(&mut player, 5000).is_empty());
    }

    #[test]
    fn stop_is_idempotent() {
        let mut player = player_with(dataset());
        player.stop();
        player.stop();
        assert_eq!(player.state().playback, Playback::Stopped);
        assert!(player.events().events().is_empty());
    }

    #[test]
    fn at_most_one_timer_across_transitions() {
        fn check(player: &mut TestPlayer) {
            assert!(player.timer().live_count() <= 1);
            assert_eq!(player.state().is_playing(), player.timer().live_count() == 1);
            run_for(player, 700);
        }

        let mut player = player_with(dataset());
        player.toggle_play();
        check(&mut player);
        player.select_frame(Frame::Women);
        check(&mut player);
        player.toggle_play();
        check(&mut player);
        player.select_speed(250).expect("speed");
        check(&mut player);
        player.toggle_play();
        check(&mut player);
        player.toggle_play();
        check(&mut player);
    }

    #[test]
    fn stale_tick_is_ignored() {
        let mut player = player_with(dataset());
        player.toggle_play();
        let Playback::Playing { timer: old } = player.state().playback else {
            panic!("expected playing");
        };
        player.toggle_play();
        player.toggle_play();
        player.on_tick(old);
        assert_eq!(player.state().current_frame, Frame::Men);
        assert_eq!(player.sink().generation(), 1);
    }

    #[test]
    fn records_transition_events() {
        let mut player = player_with(dataset());
        player.toggle_play();
        run_for(&mut player, 1000);
        player.select_speed(250).expect("speed");
        assert_eq!(
            player.events().kinds(),
            vec!["play", "tick", "stop", "select_speed"]
        );
        assert_eq!(player.events().events()[1].message, "Women");
    }

    #[test]
    fn rejects_initial_speed_outside_options() {
        let config = PlaybackConfig {
            speeds_ms: vec![250],
            initial_speed_ms: 1000,
        };
        let result = TimelinePlayer::new(
            dataset(),
            &config,
            HeatmapStyle::default(),
            ManualTimer::new(),
            HeatmapDataSource::new(),
        );
        assert!(matches!(result, Err(TimelineError::UnknownSpeed(1000))));
    }

    #[test]
    fn empty_dataset_renders_empty_layers() {
        let mut player = player_with(Vec::new());
        player.select_frame(Frame::All);
        assert!(rendered(&player).is_empty());
    }
}
