//! Example: repeated width measurement over a strip of captures.
//!
//! Loads a horizontally-merged PNG of N equal-width frames of the same
//! specimen, splits it into individual captures and measures each one with a
//! fixed calibration. Every result is kept in a `MeasurementHistory`, whose
//! statistics are printed and whose samples are exported as CSV.
//!
//! Run from the workspace root:
//!   cargo run -p specimen-gauge --example series -- --help
//!   cargo run -p specimen-gauge --example series -- --input strip.png --n-frames 5

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use image::ImageReader;
use serde::Serialize;
use specimen_gauge::{
    CalibrationFactor, CalibrationStore, Image, MeasureConfig, MeasureMode, MeasurementHistory,
    MeasurementStatistics, Measurer, PixelBuffer, statistics_report,
};

// ── CLI ───────────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(about = "Measure a strip of equal-width captures and summarize them")]
struct Args {
    /// Path to the merged PNG
    #[arg(long)]
    input: String,

    /// Number of equal-width frames merged in the image
    #[arg(long, default_value_t = 5)]
    n_frames: usize,

    /// Millimetres per pixel
    #[arg(long, default_value_t = 0.15)]
    mm_per_pixel: f64,

    /// Gaussian sigma applied to each scan profile
    #[arg(long, default_value_t = 1.5)]
    sigma: f32,

    /// Output stem (default: <input stem>_series next to input)
    #[arg(long)]
    out: Option<String>,
}

// ── JSON DTOs ─────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct FrameDto {
    frame: usize,
    elapsed_ms: f64,
    width_pixels: Option<f64>,
    width_mm: Option<f64>,
    score: f64,
}

#[derive(Serialize)]
struct SeriesDto {
    frames: Vec<FrameDto>,
    failed: Vec<usize>,
    pixels: MeasurementStatistics,
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// Copy one frame (column slice) from the strip into a contiguous buffer.
fn extract_frame(
    pixels: &[u8],
    full_width: usize,
    height: usize,
    frame_w: usize,
    frame_idx: usize,
) -> Result<PixelBuffer> {
    let mut buf = vec![0u8; frame_w * height];
    let col_offset = frame_idx * frame_w;
    for row in 0..height {
        let start = row * full_width + col_offset;
        buf[row * frame_w..(row + 1) * frame_w].copy_from_slice(&pixels[start..start + frame_w]);
    }
    let img = Image::from_vec(frame_w, height, buf).context("building frame Image")?;
    PixelBuffer::from_gray(img).context("building frame buffer")
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let img_path = &args.input;
    let out_stem = args.out.unwrap_or_else(|| {
        let p = Path::new(img_path);
        let stem = p.file_stem().unwrap_or_default().to_string_lossy();
        let dir = p.parent().unwrap_or(Path::new("."));
        dir.join(format!("{stem}_series"))
            .to_string_lossy()
            .into_owned()
    });

    let gray = ImageReader::open(img_path)
        .with_context(|| format!("opening {img_path}"))?
        .decode()
        .with_context(|| format!("decoding {img_path}"))?
        .into_luma8();

    let full_width = gray.width() as usize;
    let height = gray.height() as usize;
    let n_frames = args.n_frames;
    if n_frames == 0 {
        bail!("n_frames must be > 0");
    }
    if full_width % n_frames != 0 {
        bail!("image width {full_width} is not divisible by n_frames={n_frames}");
    }
    let frame_w = full_width / n_frames;

    println!(
        "loaded {img_path}: {full_width}x{height}, splitting into {n_frames} frames of {frame_w}x{height}"
    );

    let factor = CalibrationFactor::manual(args.mm_per_pixel).context("validating calibration")?;
    let store = CalibrationStore::with_factor(factor);
    let measurer = Measurer::new(MeasureConfig {
        sigma: args.sigma,
        ..MeasureConfig::default()
    });

    let pixels = gray.as_raw().as_slice();
    let mut history = MeasurementHistory::new();
    let mut frames = Vec::with_capacity(n_frames);
    let mut failed = Vec::new();
    let total_start = Instant::now();

    for frame_idx in 0..n_frames {
        let buf = extract_frame(pixels, full_width, height, frame_w, frame_idx)?;

        let t0 = Instant::now();
        let outcome = measurer.measure(&buf, MeasureMode::Width, &store, false);
        let elapsed_ms = t0.elapsed().as_secs_f64() * 1e3;

        match outcome {
            Ok(m) => {
                println!(
                    "  frame {frame_idx}: {:.3} mm  ({elapsed_ms:.2} ms)",
                    m.result.width_mm.unwrap_or_default()
                );
                frames.push(FrameDto {
                    frame: frame_idx,
                    elapsed_ms,
                    width_pixels: m.result.width_pixels,
                    width_mm: m.result.width_mm,
                    score: m.result.score,
                });
                history.push(m.result);
            }
            Err(e) => {
                println!("  frame {frame_idx}: {e}");
                failed.push(frame_idx);
            }
        }
    }

    let total_ms = total_start.elapsed().as_secs_f64() * 1e3;
    println!("total measurement time: {total_ms:.2} ms");

    let stats = history.statistics(MeasureMode::Width);
    print!("{}", statistics_report("width", "px", &stats));

    let csv_path = format!("{out_stem}.csv");
    std::fs::write(&csv_path, history.to_csv(MeasureMode::Width))
        .with_context(|| format!("writing {csv_path}"))?;

    let json_path = format!("{out_stem}.json");
    let out_file =
        std::fs::File::create(&json_path).with_context(|| format!("creating {json_path}"))?;
    serde_json::to_writer_pretty(
        out_file,
        &SeriesDto {
            frames,
            failed,
            pixels: stats,
        },
    )
    .with_context(|| format!("writing JSON to {json_path}"))?;

    println!("results written to {csv_path} and {json_path}");
    Ok(())
}
