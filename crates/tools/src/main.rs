use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use formats::{ViewerConfig, parse_points, validate_points};
use timeline::Frame;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use tools::{dataset_hash, encode_ppm, frame_summaries, render_frame, simulate_playback};

#[derive(Parser)]
#[command(name = "heatmap", about = "Inspect and render heatmap timeline datasets")]
struct Cli {
    /// Viewer config JSON; defaults apply to missing fields.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Per-frame record counts and total weight.
    Frames {
        data: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Simulate auto-play on a manual clock.
    Play {
        data: PathBuf,
        #[arg(long, default_value_t = 3)]
        ticks: u32,
        /// Tick period in ms; must be one of the configured speeds.
        #[arg(long)]
        speed: Option<u32>,
    },
    /// Rasterize one frame at the configured initial view into a PPM image.
    Render {
        data: PathBuf,
        #[arg(long, default_value = "all")]
        frame: Frame,
        #[arg(long)]
        out: PathBuf,
        #[arg(long, default_value_t = 1024)]
        width: u32,
        #[arg(long, default_value_t = 768)]
        height: u32,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Command::Frames { data, json } => cmd_frames(&data, json),
        Command::Play { data, ticks, speed } => cmd_play(&data, &config, ticks, speed),
        Command::Render {
            data,
            frame,
            out,
            width,
            height,
        } => cmd_render(&data, &config, frame, &out, width, height),
    }
}

fn load_config(path: Option<&Path>) -> Result<ViewerConfig, String> {
    let Some(path) = path else {
        return Ok(ViewerConfig::default());
    };
    let payload = fs::read_to_string(path).map_err(|e| format!("read {path:?}: {e}"))?;
    ViewerConfig::from_json_str(&payload).map_err(|e| format!("{path:?}: {e}"))
}

fn load_valid_points(path: &Path) -> Result<(Vec<formats::PointRecord>, String), String> {
    let bytes = fs::read(path).map_err(|e| format!("read {path:?}: {e}"))?;
    let text = std::str::from_utf8(&bytes).map_err(|e| format!("utf8: {e}"))?;
    let records = parse_points(text).map_err(|e| format!("{path:?}: {e}"))?;
    let report = validate_points(records);
    if !report.rejected.is_empty() {
        warn!(rejected = report.rejected.len(), "dataset contains invalid records");
    }
    let hash = dataset_hash(&bytes);
    info!(records = report.valid.len(), blake3 = %hash, "dataset ready");
    Ok((report.valid, hash))
}

fn cmd_frames(data: &Path, json: bool) -> Result<(), String> {
    let (records, hash) = load_valid_points(data)?;
    let summaries = frame_summaries(&records);
    if json {
        let payload = serde_json::to_string_pretty(&summaries).map_err(|e| format!("json: {e}"))?;
        println!("{payload}");
        return Ok(());
    }
    println!("dataset {} (blake3={hash})", data.display());
    for s in summaries {
        println!("{:<6} {:>6} records  weight {:>10.2}", s.frame, s.records, s.total_weight);
    }
    Ok(())
}

fn cmd_play(
    data: &Path,
    config: &ViewerConfig,
    ticks: u32,
    speed: Option<u32>,
) -> Result<(), String> {
    let (records, _) = load_valid_points(data)?;
    let trace = simulate_playback(records, &config.playback, speed, ticks)?;
    let visited: Vec<_> = trace.visited.iter().map(|f| f.label()).collect();
    println!("visited: {}", visited.join(" -> "));
    for e in &trace.events {
        println!("[{:>3} {:>8}] {:<12} {}", e.tick, e.at.to_string(), e.kind, e.message);
    }
    if trace.live_timers_after != 0 {
        return Err(format!("{} timers still live after pause", trace.live_timers_after));
    }
    Ok(())
}

fn cmd_render(
    data: &Path,
    config: &ViewerConfig,
    frame: Frame,
    out: &Path,
    width: u32,
    height: u32,
) -> Result<(), String> {
    if width == 0 || height == 0 {
        return Err("width and height must be positive".to_string());
    }
    let (records, _) = load_valid_points(data)?;
    let raster = render_frame(&records, frame, config, config.initial_pose(), width, height)
        .ok_or_else(|| "nothing to render".to_string())?;
    fs::write(out, encode_ppm(&raster, [250, 250, 248])).map_err(|e| format!("write {out:?}: {e}"))?;
    eprintln!("wrote {} ({frame}, {width}x{height})", out.display());
    Ok(())
}
