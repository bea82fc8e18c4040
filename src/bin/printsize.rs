//! CLI binary for printsize.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `ResizeConfig` and prints the result record.

use anyhow::{bail, Context, Result};
use clap::Parser;
use printsize::{
    process_to_record, target_canvas, Color, Orientation, PlacementMode, ResizeConfig, ResultRecord,
    SizeCatalog, SizeEntry, ToolLocation,
};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # A4 portrait at 300 DPI, padded with white
  printsize photo.jpg -o photo-a4.png

  # 8x10 photo print, cropped to fill, landscape
  printsize --catalog 4x5 --size 8x10 --mode fill --orientation landscape shot.nef -o print.jpg

  # First page of a PDF at 600 DPI, fail instead of skipping when Ghostscript is missing
  printsize --dpi 600 --strict poster.pdf -o poster.png

  # Arbitrary size in millimetres
  printsize --custom-size 100x150 logo.svg -o logo.png

  # Show the canvas only
  printsize --catalog 2x3 --size 12x18 --dry-run photo.jpg -o unused.png

SIZE CATALOGS:
  a       A1 A2 A3 A4
  2x3     24X36 20X30 16X24 12X18 8X12
  4x5     24X30 20X25 16X20 12X15 8X10
  3x4     18X24 15X20 12X16 9X12
  11x14   11X14

ENVIRONMENT VARIABLES:
  PRINTSIZE_*       Every flag, e.g. PRINTSIZE_DPI=600
  INKSCAPE_EXE      Path to the inkscape executable
  RUST_LOG          Log filter (overrides -v / -q)
"#;

/// Fit an image onto a paper-sized canvas at a given DPI.
#[derive(Parser, Debug)]
#[command(
    name = "printsize",
    version,
    about = "Fit an image onto a paper-sized canvas at a given DPI",
    long_about = "Resize any image (JPEG, PNG, TIFF, camera RAW, SVG, PDF, PostScript, EPS, AI) \
to the exact pixel size of a paper or photo-print format, embedding the DPI in the output.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Source image.
    #[arg(required_unless_present = "list_sizes")]
    input: Option<PathBuf>,

    /// Output file; the extension selects the format (.png keeps transparency).
    #[arg(short, long, env = "PRINTSIZE_OUTPUT", required_unless_present = "list_sizes")]
    output: Option<PathBuf>,

    /// Size catalog: a, 2x3, 4x5, 3x4, 11x14.
    #[arg(long, env = "PRINTSIZE_CATALOG", default_value = "a")]
    catalog: String,

    /// Size key inside the catalog (case-insensitive).
    #[arg(short, long, env = "PRINTSIZE_SIZE", default_value = "A4")]
    size: String,

    /// Custom size in millimetres, WIDTHxHEIGHT. Overrides --catalog/--size.
    #[arg(long, env = "PRINTSIZE_CUSTOM_SIZE", value_parser = parse_custom_size)]
    custom_size: Option<(f64, f64)>,

    /// Output resolution in dots per inch.
    #[arg(long, env = "PRINTSIZE_DPI", default_value_t = 300,
          value_parser = clap::value_parser!(u32).range(1..))]
    dpi: u32,

    /// Placement mode: fit, fill, stretch.
    #[arg(long, env = "PRINTSIZE_MODE", value_enum, default_value = "fit")]
    mode: ModeArg,

    /// Orientation: vertical, or horizontal / landscape / h.
    #[arg(long, env = "PRINTSIZE_ORIENTATION", default_value = "vertical")]
    orientation: String,

    /// Padding and flattening colour: #rrggbb, r,g,b, white, black.
    #[arg(long, env = "PRINTSIZE_BACKGROUND", default_value = "white")]
    background: String,

    /// Do not trim uniform or transparent borders.
    #[arg(long, env = "PRINTSIZE_NO_AUTOCROP")]
    no_autocrop: bool,

    /// Keep transparency instead of flattening it onto the background.
    #[arg(long, env = "PRINTSIZE_NO_FLATTEN")]
    no_flatten: bool,

    /// Fail instead of skipping when Ghostscript or SVG rasterization fails.
    #[arg(long, env = "PRINTSIZE_STRICT")]
    strict: bool,

    /// Ghostscript executable ("none" disables it).
    #[arg(long, env = "PRINTSIZE_GS")]
    gs: Option<PathBuf>,

    /// Inkscape executable ("none" disables it).
    #[arg(long, env = "PRINTSIZE_INKSCAPE")]
    inkscape: Option<PathBuf>,

    /// Kill an external rasterizer after this many seconds (0 = never).
    #[arg(long, env = "PRINTSIZE_TOOL_TIMEOUT", default_value_t = 300)]
    tool_timeout: u64,

    /// Refuse canvases with more than this many pixels.
    #[arg(long, env = "PRINTSIZE_MAX_PIXELS", default_value_t = printsize::DEFAULT_MAX_CANVAS_PIXELS)]
    max_pixels: u64,

    /// Print the result record as JSON on stdout.
    #[arg(long, env = "PRINTSIZE_JSON")]
    json: bool,

    /// Resolve and print the target canvas without converting.
    #[arg(long)]
    dry_run: bool,

    /// List every size catalog and exit.
    #[arg(long)]
    list_sizes: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "PRINTSIZE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "PRINTSIZE_QUIET")]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ModeArg {
    Fit,
    Fill,
    Stretch,
}

impl From<ModeArg> for PlacementMode {
    fn from(v: ModeArg) -> Self {
        match v {
            ModeArg::Fit => PlacementMode::Fit,
            ModeArg::Fill => PlacementMode::Fill,
            ModeArg::Stretch => PlacementMode::Stretch,
        }
    }
}

fn parse_custom_size(s: &str) -> Result<(f64, f64), String> {
    let (w, h) = s
        .to_ascii_lowercase()
        .split_once('x')
        .map(|(w, h)| (w.trim().parse::<f64>(), h.trim().parse::<f64>()))
        .ok_or_else(|| format!("expected WIDTHxHEIGHT in millimetres, got '{s}'"))?;
    match (w, h) {
        (Ok(w), Ok(h)) if w > 0.0 && h > 0.0 => Ok((w, h)),
        _ => Err(format!("'{s}' is not a positive WIDTHxHEIGHT in millimetres")),
    }
}

fn tool_location(arg: Option<&PathBuf>) -> ToolLocation {
    match arg {
        None => ToolLocation::Auto,
        Some(p) if p.as_os_str().eq_ignore_ascii_case("none") => ToolLocation::Disabled,
        Some(p) => ToolLocation::Path(p.clone()),
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else if cli.json {
        "warn"
    } else {
        "info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .with_writer(io::stderr)
        .init();

    // ── List sizes ───────────────────────────────────────────────────────
    if cli.list_sizes {
        print_catalogs(cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }

    let config = build_config(&cli)?;

    // ── Dry run ──────────────────────────────────────────────────────────
    if cli.dry_run {
        let canvas = target_canvas(&config).context("Cannot resolve the target canvas")?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&canvas).context("Failed to serialise canvas")?);
        } else {
            println!(
                "{} {} @ {} DPI ({}) → {canvas}",
                config.catalog, config.size_key, config.dpi, config.orientation
            );
        }
        return Ok(ExitCode::SUCCESS);
    }

    // ── Run conversion ───────────────────────────────────────────────────
    let (Some(input), Some(output)) = (cli.input.as_ref(), cli.output.as_ref()) else {
        bail!("INPUT and --output are required");
    };
    let record = process_to_record(input, output, &config);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&record).context("Failed to serialise record")?);
    } else if !cli.quiet || !record.is_success() {
        match &record {
            ResultRecord::Success(_) => eprintln!("{}  {record}", green("✔")),
            ResultRecord::Error(e) => eprintln!("{}  {}\n   {}", red("✘"), bold(e.error.as_str()), e.message),
        }
    }

    Ok(if record.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

fn build_config(cli: &Cli) -> Result<ResizeConfig> {
    let (catalog, size_key) = match cli.custom_size {
        Some((w, h)) => (SizeCatalog::Custom(vec![SizeEntry::custom("CUSTOM", w, h)]), "CUSTOM".to_string()),
        None => {
            let catalog = SizeCatalog::from_name(&cli.catalog).with_context(|| {
                format!("Unknown size catalog '{}' (expected a, 2x3, 4x5, 3x4 or 11x14)", cli.catalog)
            })?;
            (catalog, cli.size.clone())
        }
    };

    let background: Color = cli.background.parse().context("Invalid --background")?;

    let config = ResizeConfig::builder()
        .catalog(catalog)
        .size_key(size_key)
        .dpi(cli.dpi)
        .mode(cli.mode.into())
        .orientation(Orientation::parse(&cli.orientation))
        .background(background)
        .autocrop(!cli.no_autocrop)
        .flatten_alpha(!cli.no_flatten)
        .skip_page_failures(!cli.strict)
        .skip_vector_failures(!cli.strict)
        .ghostscript(tool_location(cli.gs.as_ref()))
        .inkscape(tool_location(cli.inkscape.as_ref()))
        .tool_timeout_secs((cli.tool_timeout > 0).then_some(cli.tool_timeout))
        .max_canvas_pixels(cli.max_pixels)
        .build()
        .context("Invalid configuration")?;

    Ok(config)
}

fn print_catalogs(json: bool) -> Result<()> {
    if json {
        let listing: serde_json::Map<String, serde_json::Value> = SizeCatalog::builtin()
            .iter()
            .map(|c| (c.name().to_string(), serde_json::json!(c.entries())))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing).context("Failed to serialise catalogs")?);
        return Ok(());
    }

    for catalog in SizeCatalog::builtin() {
        println!("{}", bold(catalog.name()));
        for entry in catalog.entries() {
            println!("  {:<6} {:>5} × {:<5} mm", entry.key, entry.width_mm, entry.height_mm);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_size_parsing() {
        assert_eq!(parse_custom_size("100x150").unwrap(), (100.0, 150.0));
        assert_eq!(parse_custom_size("89.5 X 127").unwrap(), (89.5, 127.0));
        assert!(parse_custom_size("100").is_err());
        assert!(parse_custom_size("0x10").is_err());
    }

    #[test]
    fn tool_location_none_disables() {
        assert_eq!(tool_location(None), ToolLocation::Auto);
        assert_eq!(tool_location(Some(&PathBuf::from("NONE"))), ToolLocation::Disabled);
        assert_eq!(
            tool_location(Some(&PathBuf::from("/usr/bin/gs"))),
            ToolLocation::Path("/usr/bin/gs".into())
        );
    }

    #[test]
    fn cli_maps_to_config() {
        let cli = Cli::parse_from([
            "printsize", "in.jpg", "-o", "out.png", "--catalog", "4x5", "--size", "8x10",
            "--mode", "fill", "--orientation", "landscape", "--strict", "--gs", "none",
            "--tool-timeout", "0",
        ]);
        let config = build_config(&cli).unwrap();
        assert_eq!(config.catalog, SizeCatalog::FourByFive);
        assert_eq!(config.mode, PlacementMode::Fill);
        assert_eq!(config.orientation, Orientation::Horizontal);
        assert!(!config.skip_page_failures && !config.skip_vector_failures);
        assert_eq!(config.ghostscript, ToolLocation::Disabled);
        assert_eq!(config.tool_timeout_secs, None);
        assert_eq!(config.max_canvas_pixels, printsize::DEFAULT_MAX_CANVAS_PIXELS);
    }

    #[test]
    fn max_pixels_rejects_large_dry_run() {
        let cli = Cli::parse_from(["printsize", "in.jpg", "-o", "out.png", "--max-pixels", "1000"]);
        let config = build_config(&cli).unwrap();
        assert!(target_canvas(&config).is_err());
    }

    #[test]
    fn custom_size_overrides_catalog() {
        let cli = Cli::parse_from(["printsize", "in.jpg", "-o", "out.png", "--custom-size", "254x508", "--dpi", "100"]);
        let config = build_config(&cli).unwrap();
        let canvas = target_canvas(&config).unwrap();
        assert_eq!((canvas.width_px, canvas.height_px), (1000, 2000));
    }
}
