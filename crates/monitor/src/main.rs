//! Safety Monitor - replay entry point
//!
//! Replays a recorded stream described by a JSON-lines manifest, one record
//! per frame:
//!
//! ```json
//! {"image": "frames/0001.jpg", "timestamp_ms": 0, "detections": [...], "sub_detections": [[...], null]}
//! ```

use anyhow::Context;
use clap::Parser;
use compliance::Detection;
use frame_buffer::VideoFrame;
use monitor::{init_logging, spawn_session, FrameInput, FrameReport, MonitorConfig, MonitorSession};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader, Write};
use std::path::PathBuf;
use tracing::{info, warn, Level};

#[derive(Parser, Debug)]
#[command(name = "safety-monitor", version, about = "Replay a recorded stream through the compliance monitor")]
struct Args {
    /// Monitor configuration file (TOML, YAML or JSON)
    #[arg(short, long, env = "SAFETY_CONFIG")]
    config: Option<PathBuf>,

    /// JSON-lines frame manifest
    manifest: PathBuf,

    /// Override the snapshot output directory
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Debug, Deserialize)]
struct FrameRecord {
    image: PathBuf,
    timestamp_ms: u64,
    #[serde(default)]
    detections: Vec<Detection>,
    #[serde(default)]
    sub_detections: Option<Vec<Option<Vec<Detection>>>>,
}

#[derive(Debug, Serialize)]
struct FrameSummary<'a> {
    sequence: u32,
    timestamp_ms: u64,
    zone_vertices: usize,
    violating: Vec<&'a compliance::ComplianceResult>,
    dwell_phase: Option<dwell::DwellPhase>,
    dwell_remaining_secs: Option<u64>,
    events: &'a [recorder::ViolationEvent],
}

impl<'a> From<&'a FrameReport> for FrameSummary<'a> {
    fn from(report: &'a FrameReport) -> Self {
        Self {
            sequence: report.sequence,
            timestamp_ms: report.timestamp_ns / 1_000_000,
            zone_vertices: report.zone.as_ref().map(|z| z.len()).unwrap_or(0),
            violating: report.violating().collect(),
            dwell_phase: report.dwell.map(|s| s.phase()),
            dwell_remaining_secs: report.dwell_remaining.map(|d| d.as_secs()),
            events: &report.events,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(if args.verbose { Level::DEBUG } else { Level::INFO })?;

    info!("=== Safety Monitor v{} ===", env!("CARGO_PKG_VERSION"));

    let mut config = MonitorConfig::load(args.config.as_deref())?;
    if let Some(output) = args.output {
        config.recorder.output_dir = output;
    }

    let session = MonitorSession::from_config(config)?;
    let mut handle = spawn_session(session, 8);
    info!("Replaying {} (session {})", args.manifest.display(), handle.id());

    let manifest = std::fs::File::open(&args.manifest)
        .with_context(|| format!("opening manifest {}", args.manifest.display()))?;
    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let mut sequence = 0u32;

    for (line_no, line) in BufReader::new(manifest).lines().enumerate() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let record: FrameRecord = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                warn!("Skipping manifest line {}: {}", line_no + 1, e);
                continue;
            }
        };

        let image = image::open(&record.image)
            .with_context(|| format!("reading frame {}", record.image.display()))?
            .to_rgb8();
        let frame = VideoFrame::from_rgb_image(image, record.timestamp_ms * 1_000_000, sequence);
        sequence += 1;

        let mut input = FrameInput::new(frame, record.detections);
        if let Some(per_primary) = record.sub_detections {
            input = input.with_sub_detections(per_primary);
        }

        handle.submit(input).await?;
        let Some(report) = handle.next_report().await else {
            break;
        };
        serde_json::to_writer(&mut out, &FrameSummary::from(&report))?;
        writeln!(out)?;
    }

    handle.stop().await?;
    info!("Replay finished: {} frames", sequence);
    Ok(())
}
