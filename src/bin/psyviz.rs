use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};

use psyviz::config::{RenderConfig, Resolution, PALETTES};
use psyviz::layers::rings::ring_shapes;
use psyviz::pipeline::{start_render, RenderEvent, RenderOutcome, RenderSession};
use psyviz::video::{probe_encoders, EncoderSettings, VideoCodec};

#[derive(Parser, Debug)]
#[command(name = "psyviz", version, about = "Audio-reactive psychedelic music videos")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an MP4 video (requires `ffmpeg` on PATH).
    Render(RenderArgs),
    /// Render a single frame as a PNG.
    Still(StillArgs),
    /// List the available ring shapes.
    Shapes,
    /// List the available colour palettes.
    Palettes,
    /// Report which H.264 encoders FFmpeg provides.
    Probe {
        /// FFmpeg executable.
        #[arg(long, default_value = "ffmpeg")]
        ffmpeg: PathBuf,
    },
}

#[derive(Parser, Debug)]
struct SourceArgs {
    /// Input audio file.
    #[arg(long)]
    audio: PathBuf,

    /// Settings JSON; command line values override it.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Cover image.
    #[arg(long)]
    cover: Option<PathBuf>,

    /// Output size preset.
    #[arg(long, value_enum)]
    resolution: Option<ResolutionChoice>,

    /// Colour palette name.
    #[arg(long)]
    palette: Option<String>,
}

#[derive(Parser, Debug)]
struct RenderArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output MP4 path.
    #[arg(long)]
    out: PathBuf,

    /// Only render the first SECONDS of the song.
    #[arg(long, value_name = "SECONDS")]
    preview: Option<f64>,

    /// Video encoder.
    #[arg(long, value_enum, default_value_t = CodecChoice::Auto)]
    codec: CodecChoice,

    /// FFmpeg executable.
    #[arg(long, default_value = "ffmpeg")]
    ffmpeg: PathBuf,
}

#[derive(Parser, Debug)]
struct StillArgs {
    #[command(flatten)]
    source: SourceArgs,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Frame index (0-based); defaults to one eighth into the song.
    #[arg(long)]
    frame: Option<usize>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ResolutionChoice {
    Landscape720p,
    PhoneVertical,
    PhoneHorizontal,
}

impl From<ResolutionChoice> for Resolution {
    fn from(choice: ResolutionChoice) -> Self {
        match choice {
            ResolutionChoice::Landscape720p => Resolution::LANDSCAPE_720P,
            ResolutionChoice::PhoneVertical => Resolution::PHONE_VERTICAL,
            ResolutionChoice::PhoneHorizontal => Resolution::PHONE_HORIZONTAL,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum CodecChoice {
    Auto,
    Videotoolbox,
    Nvenc,
    Qsv,
    Software,
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Still(args) => cmd_still(args),
        Command::Shapes => {
            for (display_name, name) in ring_shapes() {
                println!("{:<20} {}", name, display_name);
            }
            Ok(())
        }
        Command::Palettes => {
            for palette in PALETTES.iter() {
                println!("{:<12} {}", palette.name, palette.display_name);
            }
            Ok(())
        }
        Command::Probe { ffmpeg } => {
            let available = probe_encoders(&ffmpeg)
                .with_context(|| format!("probe encoders of '{}'", ffmpeg.display()))?;
            for codec in VideoCodec::ALL {
                let status = if available.contains(&codec) { "yes" } else { "no" };
                println!("{:<20} {}", codec.encoder_name(), status);
            }
            println!("selected: {}", VideoCodec::auto_select(&available));
            Ok(())
        }
    }
}

fn build_config(source: &SourceArgs) -> anyhow::Result<RenderConfig> {
    let mut config = match &source.config {
        Some(path) => RenderConfig::from_json_file(path)
            .with_context(|| format!("load settings '{}'", path.display()))?,
        None => RenderConfig::default(),
    };
    config.audio_path = source.audio.clone();
    if let Some(cover) = &source.cover {
        config.cover_image_path = Some(cover.clone());
    }
    if let Some(resolution) = source.resolution {
        config.resolution = resolution.into();
    }
    if let Some(palette) = &source.palette {
        config.palette = palette.clone();
    }
    Ok(config)
}

fn select_codec(choice: CodecChoice, ffmpeg: &Path) -> VideoCodec {
    match choice {
        CodecChoice::Videotoolbox => VideoCodec::VideoToolbox,
        CodecChoice::Nvenc => VideoCodec::Nvenc,
        CodecChoice::Qsv => VideoCodec::Qsv,
        CodecChoice::Software => VideoCodec::Software,
        CodecChoice::Auto => match probe_encoders(ffmpeg) {
            Ok(available) => VideoCodec::auto_select(&available),
            Err(e) => {
                log::warn!("Could not probe encoders ({}), using {}", e, VideoCodec::default());
                VideoCodec::default()
            }
        },
    }
}

fn ensure_parent_dir(path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    Ok(())
}

fn cmd_render(args: RenderArgs) -> anyhow::Result<()> {
    let mut config = build_config(&args.source)?;
    if let Some(seconds) = args.preview {
        // Set before analysis so the preview uses the cheaper settings
        config.preview_seconds = Some(config.preview_seconds.map_or(seconds, |current| current.min(seconds)));
    }
    let codec = select_codec(args.codec, &args.ffmpeg);
    log::info!("Using encoder {}", codec);

    let session = RenderSession::from_config(config)
        .context("prepare render")?
        .with_encoder(EncoderSettings {
            program: args.ffmpeg.clone(),
            codec,
            ..EncoderSettings::default()
        });
    ensure_parent_dir(&args.out)?;

    let job = start_render(session, &args.out, None).context("start render")?;
    let mut last_percent = None;
    for event in job.events().iter() {
        match event {
            RenderEvent::Progress(progress) => {
                let percent = (progress.fraction() * 100.0) as u32 / 5 * 5;
                if last_percent != Some(percent) {
                    last_percent = Some(percent);
                    let eta = progress.eta.map(|d| d.as_secs()).unwrap_or(0);
                    log::info!(
                        "{:>3}% ({}/{} frames, ~{}s left)",
                        percent,
                        progress.frames_written,
                        progress.total_frames,
                        eta
                    );
                }
            }
            RenderEvent::Finished(_) => break,
        }
    }

    match job.join() {
        RenderOutcome::Completed(path) => {
            eprintln!("wrote {}", path.display());
            Ok(())
        }
        RenderOutcome::Cancelled => anyhow::bail!("render cancelled"),
        RenderOutcome::Failed(e) => Err(e).context("render failed"),
    }
}

fn cmd_still(args: StillArgs) -> anyhow::Result<()> {
    let config = build_config(&args.source)?;
    let mut session = RenderSession::from_config(config).context("prepare render")?;
    let frame_idx = args.frame.unwrap_or_else(|| session.preview_frame_index());

    let frame = session.preview_frame(frame_idx);
    ensure_parent_dir(&args.out)?;
    frame
        .save_with_format(&args.out, image::ImageFormat::Png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {} (frame {})", args.out.display(), frame_idx);
    Ok(())
}
