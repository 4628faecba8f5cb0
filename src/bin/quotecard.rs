use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand, ValueEnum};
use log::warn;
use std::path::PathBuf;
use std::sync::Arc;

use quotecard::text::{
    EstimateProvider, MeasurementProvider, WidthCache, WrapOptions, layout_block,
};
use quotecard::{
    AvatarSource, Canvas, CardConfig, FontLibrary, LayoutConfig, Origin, QuoteData,
    QuoteRenderer, Scale,
};

#[derive(Parser, Debug)]
#[command(
    name = "quotecard",
    version,
    about = "Lay out chat messages and render them as quote card images"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a quote card image.
    Render(RenderArgs),
    /// Wrap text and print the resulting lines and height as JSON.
    Wrap(WrapArgs),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OriginArg {
    Left,
    Top,
    Right,
    Bottom,
}

impl From<OriginArg> for Origin {
    fn from(o: OriginArg) -> Self {
        match o {
            OriginArg::Left => Origin::Left,
            OriginArg::Top => Origin::Top,
            OriginArg::Right => Origin::Right,
            OriginArg::Bottom => Origin::Bottom,
        }
    }
}

#[derive(Args, Debug)]
struct RenderArgs {
    /// Message text.
    #[arg(short, long, conflicts_with = "message_file")]
    message: Option<String>,
    /// Read the message from a file instead.
    #[arg(long)]
    message_file: Option<PathBuf>,
    #[arg(long)]
    display_name: String,
    #[arg(long)]
    username: String,
    /// Avatar image path or http(s) URL.
    #[arg(long)]
    avatar: String,
    /// Font to load as FAMILY=PATH (repeatable).
    #[arg(long = "font", value_name = "FAMILY=PATH")]
    fonts: Vec<String>,
    /// JSON card configuration; flags override it.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Side of the card the avatar takes.
    #[arg(long, value_enum)]
    origin: Option<OriginArg>,
    /// Watermark text (empty string disables it).
    #[arg(long)]
    watermark: Option<String>,
    /// Draw markdown markup literally instead of stripping it.
    #[arg(long, default_value_t = false)]
    keep_markdown: bool,
    /// Output image (.png or .jpg).
    #[arg(short, long)]
    out: PathBuf,
}

#[derive(Args, Debug)]
struct WrapArgs {
    #[arg(short, long)]
    text: String,
    /// Width budget in pixels.
    #[arg(long)]
    max_width: f32,
    #[arg(long, default_value_t = 16)]
    font_size: u32,
    /// Font to measure with, as FAMILY=PATH. Without it widths are estimated.
    #[arg(long, value_name = "FAMILY=PATH")]
    font: Option<String>,
    /// Height budget in pixels; lines past it are dropped.
    #[arg(long)]
    max_height: Option<f32>,
    #[arg(long, default_value_t = 1.5)]
    line_height: f32,
    /// Marker for the last kept line when truncating.
    #[arg(long)]
    ellipsis: Option<String>,
    /// Only break at spaces.
    #[arg(long, default_value_t = false)]
    no_hyphenate: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();
    match cli.cmd {
        Command::Render(args) => cmd_render(args),
        Command::Wrap(args) => cmd_wrap(args),
    }
}

fn load_fonts(specs: &[String]) -> Result<FontLibrary> {
    let mut fonts = FontLibrary::new();
    for spec in specs {
        fonts.load_spec(spec)?;
    }
    Ok(fonts)
}

fn cmd_render(args: RenderArgs) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => CardConfig::from_json_file(path)?,
        None => CardConfig::default(),
    };
    if let Some(origin) = args.origin {
        config.avatar_origin = origin.into();
    }
    if let Some(watermark) = args.watermark {
        config.watermark = watermark;
    }
    if args.keep_markdown {
        config.strip_markdown = false;
    }

    let message = match (args.message, &args.message_file) {
        (Some(m), _) => m,
        (None, Some(path)) => std::fs::read_to_string(path)
            .with_context(|| format!("reading message file {}", path.display()))?,
        (None, None) => bail!("either --message or --message-file is required"),
    };

    let fonts = load_fonts(&args.fonts)?;
    if let Err(err) = fonts.require(&config.font_family) {
        // Families not passed with --font are unknown; use the first one given.
        if let Some(first) = fonts.families().first() {
            warn!("{err}; falling back to {first:?}");
            config.font_family = first.clone();
        }
    }

    let data = QuoteData {
        message,
        display_name: args.display_name,
        username: args.username,
        avatar: AvatarSource::parse(&args.avatar),
    };
    let renderer = QuoteRenderer::new(config, Arc::new(fonts))?;
    let layout = renderer.render_to_file(&data, &args.out)?;
    eprintln!(
        "Saved {} ({} message lines at {}{})",
        args.out.display(),
        layout.message.line_count(),
        layout.message_font,
        if layout.truncated { ", truncated" } else { "" }
    );
    Ok(())
}

fn cmd_wrap(args: WrapArgs) -> Result<()> {
    let mut config = LayoutConfig {
        font_size: args.font_size,
        max_width: args.max_width,
        line_height: args.line_height,
        ellipsis: args.ellipsis,
        ..LayoutConfig::default()
    };
    if let Some(h) = args.max_height {
        config.max_height = h;
    }
    let options = WrapOptions {
        hyphenate: !args.no_hyphenate,
        ..WrapOptions::default()
    };

    let mut provider: Box<dyn MeasurementProvider> = match &args.font {
        Some(spec) => {
            let fonts = load_fonts(std::slice::from_ref(spec))?;
            if let Some(family) = fonts.families().first() {
                config.font_family = family.clone();
            }
            Box::new(Canvas::new(1, 1, Scale::ONE, Arc::new(fonts)))
        }
        None => {
            config.font_family = "sans-serif".into();
            Box::new(EstimateProvider::default())
        }
    };

    let cache = WidthCache::default();
    let block = layout_block(provider.as_mut(), &cache, &args.text, &config, &options);
    let out = serde_json::json!({
        "font": block.font.to_string(),
        "lines": block.lines,
        "height": block.height,
        "truncated": block.truncated,
    });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}
