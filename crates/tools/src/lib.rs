//! Headless helpers behind the `heatmap` CLI.

use formats::{PlaybackConfig, PointRecord, ViewerConfig};
use foundation::CameraPose;
use layers::raster::HeatmapRaster;
use layers::symbology::HeatmapStyle;
use layers::{HeatmapDataSource, HeatmapLayer, LayerSink};
use runtime::{Event, ManualTimer, Timer};
use serde::Serialize;
use session::RenderSession;
use timeline::{Frame, TimelinePlayer, frame_subset};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FrameSummary {
    pub frame: &'static str,
    pub records: usize,
    pub total_weight: f64,
}

pub fn frame_summaries(records: &[PointRecord]) -> Vec<FrameSummary> {
    Frame::ALL
        .iter()
        .map(|&frame| {
            let subset = frame_subset(records, frame);
            FrameSummary {
                frame: frame.label(),
                records: subset.len(),
                total_weight: subset.iter().map(|r| r.count).sum(),
            }
        })
        .collect()
}

pub fn dataset_hash(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackTrace {
    /// Frame shown after construction, then after every tick.
    pub visited: Vec<Frame>,
    pub events: Vec<Event>,
    pub live_timers_after: usize,
}

/// Presses play, lets `ticks` ticks elapse on a manual clock, then pauses.
pub fn simulate_playback(
    records: Vec<PointRecord>,
    playback: &PlaybackConfig,
    speed_ms: Option<u32>,
    ticks: u32,
) -> Result<PlaybackTrace, String> {
    let mut player = TimelinePlayer::new(
        records,
        playback,
        HeatmapStyle::default(),
        ManualTimer::new(),
        HeatmapDataSource::new(),
    )
    .map_err(|e| e.to_string())?;
    if let Some(speed_ms) = speed_ms {
        player.select_speed(speed_ms).map_err(|e| e.to_string())?;
    }

    let mut visited = vec![player.state().current_frame];
    player.toggle_play();
    let period = u64::from(player.state().speed_ms);
    for _ in 0..ticks {
        for id in player.timer_mut().advance(period) {
            player.on_tick(id);
            visited.push(player.state().current_frame);
        }
    }
    player.toggle_play();

    Ok(PlaybackTrace {
        visited,
        events: player.events().events().to_vec(),
        live_timers_after: player.timer().live_count(),
    })
}

/// Rasterizes one frame at `pose`.
pub fn render_frame(
    records: &[PointRecord],
    frame: Frame,
    config: &ViewerConfig,
    pose: CameraPose,
    width: u32,
    height: u32,
) -> Option<HeatmapRaster> {
    let mut session = RenderSession::new(pose, f64::from(width), f64::from(height));
    session.replace_layer(HeatmapLayer::new(
        frame_subset(records, frame),
        HeatmapStyle::from(config.heatmap),
    ));
    session.render()
}

/// Binary PPM (P6) with the heatmap alpha-blended over `background`.
pub fn encode_ppm(raster: &HeatmapRaster, background: [u8; 3]) -> Vec<u8> {
    let mut out = format!("P6\n{} {}\n255\n", raster.width, raster.height).into_bytes();
    out.reserve(raster.rgba.len() / 4 * 3);
    for px in raster.rgba.chunks_exact(4) {
        let a = u32::from(px[3]);
        for c in 0..3 {
            let blended = (u32::from(px[c]) * a + u32::from(background[c]) * (255 - a) + 127) / 255;
            out.push(blended as u8);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::{dataset_hash, encode_ppm, frame_summaries, render_frame, simulate_playback};
    use formats::{Gender, PlaybackConfig, PointRecord, ViewerConfig};
    use layers::raster::HeatmapRaster;
    use pretty_assertions::assert_eq;
    use timeline::Frame;

    fn dataset() -> Vec<PointRecord> {
        vec![
            PointRecord::new(-74.75, 40.52, 1.0, Gender::Male),
            PointRecord::new(-74.74, 40.53, 1.0, Gender::Female),
            PointRecord::new(-74.76, 40.51, 1.0, Gender::Male),
            PointRecord::new(-74.73, 40.50, 2.0, Gender::Female),
        ]
    }

    #[test]
    fn summaries_cover_every_frame() {
        let s = frame_summaries(&dataset());
        let rows: Vec<_> = s.iter().map(|f| (f.frame, f.records, f.total_weight)).collect();
        assert_eq!(
            rows,
            vec![("Men", 2, 2.0), ("Women", 2, 3.0), ("All", 4, 5.0)]
        );
    }

    #[test]
    fn simulated_playback_cycles_and_cleans_up() {
        let trace = simulate_playback(dataset(), &PlaybackConfig::default(), None, 3).expect("trace");
        assert_eq!(
            trace.visited,
            vec![Frame::Men, Frame::Women, Frame::All, Frame::Men]
        );
        assert_eq!(trace.live_timers_after, 0);
        assert_eq!(trace.events.first().map(|e| e.kind), Some("play"));
        assert_eq!(trace.events.last().map(|e| e.kind), Some("stop"));
    }

    #[test]
    fn simulated_playback_rejects_unknown_speed() {
        let err = simulate_playback(dataset(), &PlaybackConfig::default(), Some(333), 1).unwrap_err();
        assert!(err.contains("333"));
    }

    #[test]
    fn renders_only_the_selected_frame() {
        let config = ViewerConfig::default();
        let pose = config.initial_pose();
        let men = render_frame(&dataset(), Frame::Men, &config, pose, 64, 64).expect("raster");
        assert!(!men.is_blank());
        let nobody = render_frame(&[], Frame::All, &config, pose, 64, 64).expect("raster");
        assert!(nobody.is_blank());
    }

    #[test]
    fn ppm_blends_over_background() {
        let raster = HeatmapRaster {
            width: 2,
            height: 1,
            rgba: vec![255, 0, 0, 255, 255, 0, 0, 0],
        };
        let ppm = encode_ppm(&raster, [10, 20, 30]);
        let header = b"P6\n2 1\n255\n";
        assert_eq!(&ppm[..header.len()], header);
        assert_eq!(&ppm[header.len()..], &[255u8, 0, 0, 10, 20, 30]);
    }

    #[test]
    fn hash_is_stable_hex() {
        let h = dataset_hash(b"[]");
        assert_eq!(h.len(), 64);
        assert_eq!(h, dataset_hash(b"[]"));
    }
}
