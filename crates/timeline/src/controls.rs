use crate::frame::Frame;
use crate::player::PlayerState;

pub const PLAY_LABEL: &str = "play";
pub const PAUSE_LABEL: &str = "pause";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameMarker {
    pub frame: Frame,
    pub label: &'static str,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpeedButton {
    pub period_ms: u32,
    pub label: String,
    pub active: bool,
}

/// What the control strip should show for a given player state.
///
/// UI bindings render this and never read `PlayerState` directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlsModel {
    pub play_label: &'static str,
    pub frames: Vec<FrameMarker>,
    pub speeds: Vec<SpeedButton>,
}

impl ControlsModel {
    pub fn from_state(state: &PlayerState, speeds_ms: &[u32]) -> Self {
        Self {
            play_label: if state.is_playing() {
                PAUSE_LABEL
            } else {
                PLAY_LABEL
            },
            frames: Frame::ALL
                .iter()
                .map(|&frame| FrameMarker {
                    frame,
                    label: frame.label(),
                    active: frame == state.current_frame,
                })
                .collect(),
            speeds: speeds_ms
                .iter()
                .map(|&period_ms| SpeedButton {
                    period_ms,
                    label: speed_label(period_ms),
                    active: period_ms == state.speed_ms,
                })
                .collect(),
        }
    }

    pub fn active_frame(&self) -> Option<Frame> {
        self.frames.iter().find(|m| m.active).map(|m| m.frame)
    }
}

/// "1 frame/second", "4 frames/second", "0.5 frames/second".
pub fn speed_label(period_ms: u32) -> String {
    let period_ms = period_ms.max(1);
    if 1000 % period_ms == 0 {
        let fps = 1000 / period_ms;
        let unit = if fps == 1 { "frame" } else { "frames" };
        return format!("{fps} {unit}/second");
    }
    let fps = 1000.0 / f64::from(period_ms);
    let text = format!("{fps:.2}");
    let text = text.trim_end_matches('0').trim_end_matches('.');
    format!("{text} frames/second")
}
