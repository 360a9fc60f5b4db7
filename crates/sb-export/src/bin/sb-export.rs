use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use sb_core::anim::timeline_end;
use sb_core::{Color, SceneGraph};
use sb_export::encode::is_ffmpeg_on_path;
use sb_export::{
    AbortHandle, Artifact, ExportObserver, ExportSettings, Exporter, FfmpegEncoder, FrameEncoder,
    GifEncoder, PngSequenceEncoder, parse_scenes, render_scenes,
};
use sb_render::{FsImageLoader, ImageCache};

#[derive(Parser, Debug)]
#[command(name = "sb-export", version)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a draw-command template as a GIF, PNG sequence or MP4.
    Render(RenderArgs),
    /// Render a storyboard of scenes into one MP4 (requires `ffmpeg` on PATH).
    Batch(BatchArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Gif,
    Png,
    Mp4,
}

#[derive(clap::Args, Debug)]
struct FrameArgs {
    /// Frames per second.
    #[arg(long)]
    fps: Option<u32>,

    #[arg(long)]
    width: Option<u32>,

    #[arg(long)]
    height: Option<u32>,

    /// Background color (`#rrggbb` or a CSS name).
    #[arg(long)]
    background: Option<String>,

    /// JSON file with export settings; flags override it.
    #[arg(long)]
    settings: Option<PathBuf>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input template JSON.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output file (gif/mp4) or directory (png).
    #[arg(long)]
    out: PathBuf,

    /// Output format; inferred from `--out` when omitted.
    #[arg(long, value_enum)]
    format: Option<Format>,

    /// Total duration in ms. Defaults to the end of the last animation.
    #[arg(long)]
    duration: Option<f64>,

    /// Per-element stagger in ms.
    #[arg(long)]
    stagger: Option<f64>,

    /// GIF quality, 1 (best) to 30 (fastest).
    #[arg(long, default_value_t = 10)]
    quality: u8,

    /// Directory image sources resolve against. Defaults to the input's directory.
    #[arg(long)]
    assets: Option<PathBuf>,

    #[command(flatten)]
    frame: FrameArgs,
}

#[derive(Parser, Debug)]
struct BatchArgs {
    /// Storyboard JSON: an array of scenes or `{"scenes": [...]}`.
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    #[arg(long)]
    assets: Option<PathBuf>,

    #[command(flatten)]
    frame: FrameArgs,
}

/// Logs progress in 10% steps.
#[derive(Default)]
struct LogProgress {
    last_decile: i32,
}

impl ExportObserver for LogProgress {
    fn on_progress(&mut self, fraction: f64) {
        let decile = (fraction * 10.0).floor() as i32;
        if decile > self.last_decile {
            self.last_decile = decile;
            log::info!("export {:>3}%", decile * 10);
        }
    }

    fn on_aborted(&mut self) {
        log::info!("export aborted");
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Batch(args) => cmd_batch(args),
    }
}

fn read(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("read '{}'", path.display()))
}

fn assets_root(assets: Option<PathBuf>, in_path: &Path) -> PathBuf {
    assets.unwrap_or_else(|| {
        in_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn base_settings(args: &FrameArgs) -> anyhow::Result<ExportSettings> {
    let mut settings = match &args.settings {
        Some(path) => serde_json::from_str(&read(path)?)
            .with_context(|| format!("parse settings '{}'", path.display()))?,
        None => ExportSettings::default(),
    };
    if let Some(fps) = args.fps {
        settings.fps = fps;
    }
    if let Some(width) = args.width {
        settings.width = width;
    }
    if let Some(height) = args.height {
        settings.height = height;
    }
    if let Some(bg) = &args.background {
        settings.background =
            Color::parse(bg).with_context(|| format!("unrecognized color '{bg}'"))?;
    }
    Ok(settings)
}

fn infer_format(out: &Path) -> Format {
    match out.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("gif") => Format::Gif,
        Some(ext) if ext.eq_ignore_ascii_case("mp4") => Format::Mp4,
        _ => Format::Png,
    }
}

fn report(artifact: &Artifact) {
    match artifact {
        Artifact::File(path) => eprintln!("wrote {}", path.display()),
        Artifact::Directory { path, frames } => {
            eprintln!("wrote {frames} frames into {}", path.display())
        }
        Artifact::Bytes { data, .. } => eprintln!("encoded {} bytes", data.len()),
    }
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let elements = sb_core::import_template(&read(&args.in_path)?)
        .with_context(|| format!("import '{}'", args.in_path.display()))?;
    let graph = SceneGraph::from_elements(elements)?;

    let mut settings = base_settings(&args.frame)?;
    if let Some(stagger) = args.stagger {
        settings.stagger_ms = stagger;
    }
    settings.duration_ms = match args.duration {
        Some(d) => d,
        None => {
            let end = timeline_end(graph.iter(), settings.stagger_ms);
            if end > 0.0 { end } else { settings.duration_ms }
        }
    };

    let format = args.format.unwrap_or_else(|| infer_format(&args.out));
    if format == Format::Mp4 && !is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg is required for MP4 output, but was not found on PATH");
    }
    let loader = FsImageLoader::new(assets_root(args.assets, &args.in_path));
    let exporter = Exporter::new();

    let artifact = match format {
        Format::Gif => run(
            &exporter,
            &graph,
            settings,
            GifEncoder::new(args.quality).to_file(&args.out),
            loader,
        )?,
        Format::Png => run(
            &exporter,
            &graph,
            settings,
            PngSequenceEncoder::new(&args.out),
            loader,
        )?,
        Format::Mp4 => run(&exporter, &graph, settings, FfmpegEncoder::new(&args.out), loader)?,
    };
    report(&artifact);
    Ok(())
}

fn run<E: FrameEncoder>(
    exporter: &Exporter,
    graph: &SceneGraph,
    settings: ExportSettings,
    encoder: E,
    loader: FsImageLoader,
) -> anyhow::Result<Artifact> {
    let mut job = exporter.start(graph, settings, encoder)?.with_loader(loader);
    Ok(job.run(&mut LogProgress::default())?)
}

fn cmd_batch(args: BatchArgs) -> anyhow::Result<()> {
    if !is_ffmpeg_on_path() {
        anyhow::bail!("ffmpeg is required for batch output, but was not found on PATH");
    }
    let scenes = parse_scenes(&read(&args.in_path)?)?;
    let settings = base_settings(&args.frame)?;

    let loader = FsImageLoader::new(assets_root(args.assets, &args.in_path));
    let mut images = ImageCache::new();
    for scene in &scenes {
        let graph = scene.graph()?;
        let failed = images.preload(graph.iter().filter_map(|e| e.image_src()), &loader);
        if failed > 0 {
            log::warn!("scene `{}`: {failed} image(s) failed to load", scene.id);
        }
    }

    let mut encoder = FfmpegEncoder::new(&args.out);
    let artifact = render_scenes(&scenes, &settings, &images, &mut encoder, &AbortHandle::new())?;
    report(&artifact);
    Ok(())
}
