use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use image::{GrayImage, Rgb, RgbImage};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use specimen_gauge::{
    CalibrationFactor, CalibrationStore, CameraModel, Channels, EdgeSuppressor, GradientField,
    Image, LineOrientation, MeasureConfig, MeasureMethod, MeasureMode, MeasurementStatistics,
    Measurer, Overlay, PixelBuffer, RefinedEdgePoint, ZernikeConfig, ZernikeRefiner,
    calculate_measurement_statistics, export_csv, preprocess, statistics_report,
};

#[derive(Parser, Debug)]
#[command(name = "sg_gauge")]
#[command(about = "Measure specimen dimensions in captured images")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Measure one image and write result JSON plus overlay images.
    #[command(name = "measure")]
    Measure(MeasureArgs),
    /// Run Zernike sub-pixel refinement and dump the refined edge points.
    #[command(name = "zernike")]
    Zernike(ZernikeArgs),
    /// Derive a calibration factor and write it as JSON.
    #[command(name = "calibrate")]
    Calibrate(CalibrateArgs),
    /// Summarize a series of measurements.
    #[command(name = "stats")]
    Stats(StatsArgs),
}

#[derive(Args, Debug, Clone)]
struct CommonArgs {
    #[arg(long, required = true)]
    input: PathBuf,
    #[arg(long, default_value = "out")]
    out: PathBuf,
    /// JSON tuning file (camelCase keys); flags below override it.
    #[arg(long)]
    config: Option<PathBuf>,
}

#[derive(Args, Debug, Clone)]
struct CalibrationArgs {
    /// Millimetres per pixel.
    #[arg(long, conflicts_with = "calibration")]
    mm_per_pixel: Option<f64>,
    /// Calibration JSON written by `calibrate`.
    #[arg(long)]
    calibration: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum ModeArg {
    Width,
    Height,
    Length,
    Area,
}

impl From<ModeArg> for MeasureMode {
    fn from(m: ModeArg) -> Self {
        match m {
            ModeArg::Width => Self::Width,
            ModeArg::Height => Self::Height,
            ModeArg::Length => Self::Length,
            ModeArg::Area => Self::Area,
        }
    }
}

#[derive(ValueEnum, Debug, Clone, Copy)]
enum MethodArg {
    Scanline,
    Zernike,
}

#[derive(Args, Debug, Clone)]
struct MeasureArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[command(flatten)]
    calibration: CalibrationArgs,
    #[arg(long, value_enum, default_value_t = ModeArg::Width)]
    mode: ModeArg,
    #[arg(long, value_enum)]
    method: Option<MethodArg>,
    #[arg(long)]
    sigma: Option<f32>,
    #[arg(long)]
    contrast_factor: Option<f32>,
    /// Also write the preprocessed and edge-strength images.
    #[arg(long, default_value_t = false)]
    diagnostics: bool,
}

#[derive(Args, Debug, Clone)]
struct ZernikeArgs {
    #[command(flatten)]
    common: CommonArgs,
    #[arg(long)]
    contrast: Option<f32>,
}

#[derive(Args, Debug, Clone)]
struct CalibrateArgs {
    #[command(subcommand)]
    source: CalibrateSource,
    #[arg(long, global = true, default_value = "calibration.json")]
    out: PathBuf,
}

#[derive(Subcommand, Debug, Clone)]
enum CalibrateSource {
    /// Pinhole model with fixed intrinsics and working distance.
    Camera {
        #[arg(long)]
        distance_mm: f64,
        #[arg(long, default_value_t = 4.8)]
        sensor_width_mm: f64,
        #[arg(long, default_value_t = 4.0)]
        focal_length_mm: f64,
        #[arg(long, default_value_t = 1280)]
        image_width_px: u32,
    },
    /// Object of known size measured in pixels.
    Reference {
        #[arg(long)]
        reference_mm: f64,
        #[arg(long)]
        reference_px: f64,
    },
    /// A known factor entered directly.
    Manual {
        #[arg(long)]
        mm_per_pixel: f64,
    },
}

#[derive(Args, Debug, Clone)]
struct StatsArgs {
    /// Text or CSV file with one measurement per line.
    #[arg(long, required = true)]
    input: PathBuf,
    /// Zero-based CSV column holding the pixel values.
    #[arg(long, default_value_t = 0)]
    column: usize,
    #[arg(long, value_enum, default_value_t = ModeArg::Width)]
    mode: ModeArg,
    #[command(flatten)]
    calibration: CalibrationArgs,
    #[arg(long, default_value = "out")]
    out: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DetectionDto {
    mode: MeasureMode,
    method: MeasureMethod,
    width_pixels: Option<f64>,
    height_pixels: Option<f64>,
    score: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZernikePointDto {
    x: usize,
    y: usize,
    sub_x: f32,
    sub_y: f32,
    phi: f32,
    k: f32,
    h: f32,
    l: f32,
    l_spread: f32,
}

impl From<&RefinedEdgePoint> for ZernikePointDto {
    fn from(p: &RefinedEdgePoint) -> Self {
        Self {
            x: p.x,
            y: p.y,
            sub_x: p.sub.x,
            sub_y: p.sub.y,
            phi: p.phi,
            k: p.k,
            h: p.h,
            l: p.l,
            l_spread: p.l_spread,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ZernikeDto {
    strong: usize,
    weak: usize,
    degenerate: usize,
    near_border: usize,
    mean_l_spread: f32,
    points: Vec<ZernikePointDto>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatsDto {
    mode: MeasureMode,
    pixels: MeasurementStatistics,
    millimeters: Option<MeasurementStatistics>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.cmd {
        Command::Measure(args) => run_measure(args),
        Command::Zernike(args) => run_zernike(args),
        Command::Calibrate(args) => run_calibrate(args),
        Command::Stats(args) => run_stats(args),
    }
}

fn run_measure(args: MeasureArgs) -> Result<()> {
    let mut cfg = load_config(args.common.config.as_deref())?;
    if let Some(method) = args.method {
        cfg.method = match method {
            MethodArg::Scanline => MeasureMethod::Scanline,
            MethodArg::Zernike => MeasureMethod::Zernike,
        };
    }
    if let Some(sigma) = args.sigma {
        cfg.sigma = sigma;
    }
    if let Some(f) = args.contrast_factor {
        cfg.contrast_factor = f;
    }

    let buf = load_capture(&args.common.input)?;
    let out_dir = prepare_out_dir(&args.common.out)?;
    let mode = MeasureMode::from(args.mode);
    let measurer = Measurer::new(cfg);

    let overlay = match load_calibration(&args.calibration)? {
        Some(factor) => {
            let store = CalibrationStore::with_factor(factor);
            let m = measurer
                .measure(&buf, mode, &store, args.diagnostics)
                .context("measuring specimen")?;
            info!(
                "{}: width {:?} mm, height {:?} mm, area {:?} mm2",
                mode.as_str(),
                m.result.width_mm,
                m.result.height_mm,
                m.result.area_mm2
            );
            write_json(out_dir.join("result.json"), &m.result)?;
            if let Some(diag) = &m.diagnostics {
                save_u8_image(out_dir.join("processed.png"), &diag.processed)?;
                save_u8_image(out_dir.join("edges.png"), &diag.edges)?;
            }
            m.overlay
        }
        None => {
            warn!("no calibration given; writing pixel measurements only");
            let det = measurer
                .detect(&buf, mode, args.diagnostics)
                .context("detecting specimen edges")?;
            write_json(
                out_dir.join("result.json"),
                &DetectionDto {
                    mode,
                    method: det.method,
                    width_pixels: det.width_px,
                    height_pixels: det.height_px,
                    score: det.score,
                },
            )?;
            if let Some(diag) = &det.diagnostics {
                save_u8_image(out_dir.join("processed.png"), &diag.processed)?;
                save_u8_image(out_dir.join("edges.png"), &diag.edges)?;
            }
            det.overlay
        }
    };

    write_json(out_dir.join("overlay.json"), &overlay)?;
    render_overlay(&buf, &overlay)
        .save(out_dir.join("overlay.png"))
        .with_context(|| format!("saving overlay in {}", out_dir.display()))?;
    Ok(())
}

fn run_zernike(args: ZernikeArgs) -> Result<()> {
    let cfg = load_config(args.common.config.as_deref())?;
    let buf = load_capture(&args.common.input)?;
    let out_dir = prepare_out_dir(&args.common.out)?;

    let gray = preprocess(&buf, &cfg.preprocess_config());
    let view = gray.as_view();
    let edges = EdgeSuppressor::new(cfg.suppress_config()).suppress(&GradientField::sobel(&view));
    let zcfg = ZernikeConfig {
        strong_contrast: args.contrast.unwrap_or(cfg.zernike_contrast_threshold),
    };
    let refined = ZernikeRefiner::new(zcfg).refine_edges(&view, &edges);
    info!(
        "zernike: {} strong points of {} edge pixels",
        refined.points.len(),
        edges.count()
    );

    write_json(
        out_dir.join("zernike.json"),
        &ZernikeDto {
            strong: refined.points.len(),
            weak: refined.weak,
            degenerate: refined.degenerate,
            near_border: refined.near_border,
            mean_l_spread: refined.mean_l_spread(),
            points: refined.points.iter().map(ZernikePointDto::from).collect(),
        },
    )?;

    let overlay = Overlay {
        edge_points: refined.points.iter().map(|p| [p.sub.x, p.sub.y]).collect(),
        ..Overlay::default()
    };
    render_overlay(&buf, &overlay)
        .save(out_dir.join("zernike.png"))
        .with_context(|| format!("saving overlay in {}", out_dir.display()))?;
    save_u8_image(out_dir.join("edges.png"), &edges.to_visualization())?;
    Ok(())
}

fn run_calibrate(args: CalibrateArgs) -> Result<()> {
    let factor = match args.source {
        CalibrateSource::Camera {
            distance_mm,
            sensor_width_mm,
            focal_length_mm,
            image_width_px,
        } => CameraModel {
            sensor_width_mm,
            focal_length_mm,
            distance_mm,
            image_width_px,
        }
        .derive()
        .context("deriving calibration from camera model")?,
        CalibrateSource::Reference {
            reference_mm,
            reference_px,
        } => CalibrationFactor::from_reference(reference_mm, reference_px)
            .context("deriving calibration from reference object")?,
        CalibrateSource::Manual { mm_per_pixel } => {
            CalibrationFactor::manual(mm_per_pixel).context("validating manual calibration")?
        }
    };

    info!(
        "calibration: {:.6} mm/px ({:?})",
        factor.mm_per_pixel(),
        factor.source()
    );
    if let Some(parent) = args.out.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating output directory {}", parent.display()))?;
    }
    write_json(args.out, &factor)
}

fn run_stats(args: StatsArgs) -> Result<()> {
    let text = fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let pixels = parse_column(&text, args.column);
    if pixels.is_empty() {
        warn!("no numeric values in column {} of {}", args.column, args.input.display());
    }

    let mode = MeasureMode::from(args.mode);
    let out_dir = prepare_out_dir(&args.out)?;
    let px_stats = calculate_measurement_statistics(&pixels);
    let mut report = statistics_report(&format!("{} (pixels)", mode.as_str()), "px", &px_stats);

    let factor = load_calibration(&args.calibration)?;
    let mm_stats = factor.map(|f| {
        let mm: Vec<f64> = pixels.iter().map(|&p| f.to_mm(p)).collect();
        calculate_measurement_statistics(&mm)
    });
    if let Some(s) = &mm_stats {
        report.push_str(&statistics_report(
            &format!("{} (millimeters)", mode.as_str()),
            "mm",
            s,
        ));
    }

    write_json(
        out_dir.join("statistics.json"),
        &StatsDto {
            mode,
            pixels: px_stats,
            millimeters: mm_stats,
        },
    )?;
    fs::write(out_dir.join("report.txt"), &report)
        .with_context(|| format!("writing report in {}", out_dir.display()))?;

    if let Some(f) = factor {
        let samples: Vec<(f64, f64)> = pixels.iter().map(|&p| (p, f.to_mm(p))).collect();
        fs::write(
            out_dir.join("measurements.csv"),
            export_csv(mode.as_str(), &samples),
        )
        .with_context(|| format!("writing csv in {}", out_dir.display()))?;
    }

    print!("{report}");
    Ok(())
}

fn parse_column(text: &str, column: usize) -> Vec<f64> {
    text.lines()
        .filter_map(|line| line.split(',').nth(column))
        .filter_map(|field| field.trim().parse::<f64>().ok())
        .collect()
}

fn load_config(path: Option<&Path>) -> Result<MeasureConfig> {
    match path {
        Some(p) => read_json(p).with_context(|| format!("loading config {}", p.display())),
        None => Ok(MeasureConfig::default()),
    }
}

fn load_calibration(args: &CalibrationArgs) -> Result<Option<CalibrationFactor>> {
    if let Some(mm) = args.mm_per_pixel {
        return Ok(Some(
            CalibrationFactor::manual(mm).context("validating --mm-per-pixel")?,
        ));
    }
    match &args.calibration {
        Some(p) => {
            let f: CalibrationFactor =
                read_json(p).with_context(|| format!("loading calibration {}", p.display()))?;
            // Re-validate: the file may have been edited by hand.
            Ok(Some(
                CalibrationFactor::manual(f.mm_per_pixel())
                    .map(|_| f)
                    .with_context(|| format!("invalid calibration in {}", p.display()))?,
            ))
        }
        None => Ok(None),
    }
}

fn load_capture(path: &Path) -> Result<PixelBuffer> {
    ensure_file_exists(path, "input")?;
    let dyn_img =
        image::open(path).with_context(|| format!("opening input image {}", path.display()))?;
    let (w, h) = (dyn_img.width() as usize, dyn_img.height() as usize);

    let (channels, data) = match dyn_img.color().channel_count() {
        1 | 2 => (Channels::Gray, dyn_img.to_luma8().into_raw()),
        3 => (Channels::Rgb, dyn_img.to_rgb8().into_raw()),
        _ => (Channels::Rgba, dyn_img.to_rgba8().into_raw()),
    };

    PixelBuffer::new(w, h, channels, data)
        .with_context(|| format!("constructing pixel buffer from {}", path.display()))
}

fn prepare_out_dir(out: &Path) -> Result<PathBuf> {
    fs::create_dir_all(out)
        .with_context(|| format!("creating output directory {}", out.display()))?;
    Ok(out.to_path_buf())
}

fn render_overlay(buf: &PixelBuffer, overlay: &Overlay) -> RgbImage {
    let (w, h) = (buf.width() as u32, buf.height() as u32);
    let mut rgb = RgbImage::new(w, h);
    for (dst, px) in rgb.pixels_mut().zip(buf.pixels()) {
        *dst = match buf.channels() {
            Channels::Gray => Rgb([px[0], px[0], px[0]]),
            Channels::Rgb | Channels::Rgba => Rgb([px[0], px[1], px[2]]),
        };
    }

    for line in &overlay.scan_lines {
        draw_line(&mut rgb, line.orientation, line.position, Rgb([255, 210, 0]));
    }
    for line in &overlay.edge_lines {
        draw_line(&mut rgb, line.orientation, line.position, Rgb([255, 48, 48]));
    }
    if let Some(corners) = overlay.corners {
        for [x, y] in corners {
            draw_dot(&mut rgb, x, y, Rgb([48, 220, 48]));
        }
    }
    for &[x, y] in &overlay.edge_points {
        draw_dot(&mut rgb, x, y, Rgb([0, 200, 255]));
    }
    rgb
}

fn draw_line(img: &mut RgbImage, orientation: LineOrientation, position: f32, color: Rgb<u8>) {
    let p = position.round();
    if p < 0.0 {
        return;
    }
    let p = p as u32;
    match orientation {
        LineOrientation::Horizontal if p < img.height() => {
            for x in 0..img.width() {
                img.put_pixel(x, p, color);
            }
        }
        LineOrientation::Vertical if p < img.width() => {
            for y in 0..img.height() {
                img.put_pixel(p, y, color);
            }
        }
        _ => {}
    }
}

fn draw_dot(img: &mut RgbImage, x: f32, y: f32, color: Rgb<u8>) {
    let xi = x.round() as i32;
    let yi = y.round() as i32;

    for dy in -1..=1 {
        for dx in -1..=1 {
            let nx = xi + dx;
            let ny = yi + dy;
            if nx < 0 || ny < 0 {
                continue;
            }
            let (ux, uy) = (nx as u32, ny as u32);
            if ux >= img.width() || uy >= img.height() {
                continue;
            }
            img.put_pixel(ux, uy, color);
        }
    }
}

fn save_u8_image(path: PathBuf, img: &Image<u8>) -> Result<()> {
    let gray = GrayImage::from_raw(img.width() as u32, img.height() as u32, img.data().to_vec())
        .context("constructing GrayImage from raw bytes")?;
    gray.save(&path)
        .with_context(|| format!("saving image {}", path.display()))
}

fn write_json(path: PathBuf, value: &impl Serialize) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value).context("serializing json")?;
    fs::write(&path, bytes).with_context(|| format!("writing json {}", path.display()))
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T> {
    let data = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_slice(&data).with_context(|| format!("parsing json {}", path.display()))
}

fn ensure_file_exists(path: &Path, what: &str) -> Result<()> {
    if !path.exists() {
        bail!("{} file does not exist: {}", what, path.display());
    }
    if !path.is_file() {
        bail!("{} path is not a file: {}", what, path.display());
    }
    Ok(())
}
