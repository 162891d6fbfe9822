use clap::{Parser, Subcommand};
use imgpress::config::{ServiceConfig, stock_config_toml};
use imgpress::dispatch::{Dispatcher, ToolOutput};
use imgpress::imaging::handle::RawImage;
use imgpress::output;
use imgpress::params::raw_from_pairs;
use std::path::{Path, PathBuf};

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup — trivial, called exactly once
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "imgpress")]
#[command(about = "Multi-tool image processing")]
#[command(long_about = "\
Multi-tool image processing

Name a tool, hand it an image, get transformed bytes back. Around a
hundred tools share one decode/transform/encode pipeline: resizing in
pixels or physical units, byte-budget compression, format conversion,
passport photos and print sheets, cosmetic effects, and JSON inspection
tools.

Examples:

  imgpress list
  imgpress run resize photo.jpg -p width=800
  imgpress run resize photo.jpg -p width=35mm -p height=45mm -p mode=fill
  imgpress run compress-to-100kb photo.jpg -o small.jpg
  imgpress run passport-us portrait.jpg -p quantity=6 -o sheet.jpg
  imgpress run inspect photo.jpg
  imgpress batch to-webp ./shots --out-dir ./webp

Geometry parameters take px (default), mm, cm or in; physical units
convert through the request dpi (-p dpi=NNN), the image's declared
density, or the configured default of 300.

Run 'imgpress gen-config' to print a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Service config file (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List every registered tool, grouped by family
    List,
    /// Run one tool against one image
    Run {
        /// Tool id (see `list`)
        tool: String,
        /// Input image (jpeg, png or webp)
        input: PathBuf,
        /// Output path; derived from the input name when omitted
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Tool parameter as key=value (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Shortcut for `run inspect`
    Inspect {
        /// Input image
        input: PathBuf,
    },
    /// Run one tool over every image in a directory
    Batch {
        /// Tool id (see `list`)
        tool: String,
        /// Directory to walk for images
        dir: PathBuf,
        /// Where transformed images land
        #[arg(long)]
        out_dir: PathBuf,
        /// Tool parameter as key=value (repeatable)
        #[arg(short, long = "param")]
        params: Vec<String>,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

const INPUT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = ServiceConfig::load_or_default(cli.config.as_deref())?;

    match cli.command {
        Command::List => {
            let dispatcher = Dispatcher::new(config);
            output::print_tool_listing(dispatcher.registry());
        }
        Command::Run {
            tool,
            input,
            output,
            params,
        } => {
            let dispatcher = Dispatcher::new(config);
            run_one(&dispatcher, &tool, &input, output.as_deref(), &params)?;
        }
        Command::Inspect { input } => {
            let dispatcher = Dispatcher::new(config);
            run_one(&dispatcher, "inspect", &input, None, &[])?;
        }
        Command::Batch {
            tool,
            dir,
            out_dir,
            params,
        } => {
            let dispatcher = Dispatcher::new(config);
            std::fs::create_dir_all(&out_dir)?;
            let raw_params = raw_from_pairs(params.iter().map(String::as_str));
            let mut processed = 0u32;
            let mut failed = 0u32;
            for entry in walkdir::WalkDir::new(&dir)
                .into_iter()
                .filter_map(Result::ok)
                .filter(|e| e.file_type().is_file())
            {
                let path = entry.path();
                let ext = path
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_lowercase())
                    .unwrap_or_default();
                if !INPUT_EXTENSIONS.contains(&ext.as_str()) {
                    continue;
                }
                let raw = RawImage::new(std::fs::read(path)?);
                match dispatcher.dispatch(&tool, &raw, &raw_params) {
                    Ok(ToolOutput::Image(encoded)) => {
                        let stem = path
                            .file_stem()
                            .and_then(|s| s.to_str())
                            .unwrap_or("image");
                        let ext = Path::new(&encoded.suggested_filename)
                            .extension()
                            .and_then(|e| e.to_str())
                            .unwrap_or("bin");
                        let target = out_dir.join(format!("{stem}.{ext}"));
                        std::fs::write(&target, &encoded.bytes)?;
                        println!("{} → {}", path.display(), target.display());
                        processed += 1;
                    }
                    Ok(ToolOutput::Json(body)) => {
                        println!("{}: {}", path.display(), body);
                        processed += 1;
                    }
                    Err(e) => {
                        eprintln!("{}: {e}", path.display());
                        failed += 1;
                    }
                }
            }
            println!("Processed {processed}, failed {failed}");
        }
        Command::GenConfig => {
            print!("{}", stock_config_toml());
        }
    }

    Ok(())
}

/// Dispatch one file through one tool and write or print the result.
fn run_one(
    dispatcher: &Dispatcher,
    tool: &str,
    input: &Path,
    output: Option<&Path>,
    params: &[String],
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = RawImage::new(std::fs::read(input)?);
    let raw_params = raw_from_pairs(params.iter().map(String::as_str));

    match dispatcher.dispatch(tool, &raw, &raw_params)? {
        ToolOutput::Image(encoded) => {
            let target = match output {
                Some(path) => path.to_path_buf(),
                None => derived_output_path(input, tool, &encoded.suggested_filename),
            };
            std::fs::write(&target, &encoded.bytes)?;
            output::print_image_result(tool, &encoded);
            println!("Wrote {}", target.display());
        }
        ToolOutput::Json(body) => {
            println!("{}", serde_json::to_string_pretty(&body)?);
        }
    }
    Ok(())
}

/// `photo.jpg` run through `resize` → `photo-resize.jpg` (extension from
/// the tool's output format).
fn derived_output_path(input: &Path, tool: &str, suggested: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("output");
    let ext = Path::new(suggested)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("bin");
    input.with_file_name(format!("{stem}-{tool}.{ext}"))
}
