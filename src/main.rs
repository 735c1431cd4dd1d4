use clap::{Parser, Subcommand};
use image_tools::config::{self, ServerConfig};
use image_tools::imaging::RustBackend;
use image_tools::output;
use image_tools::server::Server;
use image_tools::tools::{Registry, ToolContext};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// The package version on a clean release tag, `dev@<git describe>` otherwise.
fn version_label(describe: &str, version: &str) -> String {
    if describe.strip_prefix('v') == Some(version) {
        version.to_string()
    } else if describe.is_empty() {
        "dev@unknown".to_string()
    } else {
        format!("dev@{describe}")
    }
}

fn version_string() -> &'static str {
    // Leaked once at startup, called exactly once
    Box::leak(
        version_label(env!("IMAGE_TOOLS_DESCRIBE"), env!("CARGO_PKG_VERSION")).into_boxed_str(),
    )
}

#[derive(Parser)]
#[command(name = "image-tools")]
#[command(about = "Image conversion, resizing and adjustment tools over JSON-RPC stdio")]
#[command(long_about = "\
Image conversion, resizing and adjustment tools over JSON-RPC stdio

Each tool takes a list of absolute image paths and writes one output per
input next to it, named with a tool-specific suffix:

  image.convertFormat     photo.png → photo_converted.webp
  image.cropResize        photo.png → photo_cropped.png
  image.compressOptimize  photo.jpg → photo_compressed.jpg
  image.resize            photo.jpg → photo_resized.jpg
  image.rotateFlip        photo.jpg → photo_rotatedFlipped.jpg
  image.postProcess       photo.jpg → photo_postProcessed.jpg

A failing image never stops the rest of the batch.

Run 'image-tools gen-config' to generate a documented config.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Path to a config.toml (stock defaults when omitted)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Serve tools over JSON-RPC on stdin/stdout (default)
    Serve,
    /// Print every tool's name, description and input schema as JSON
    ListTools,
    /// Run a single tool locally and print its response lines
    Call {
        /// Tool name, e.g. image.resize
        tool: String,
        /// Arguments as a JSON object
        args: String,
    },
    /// Print a stock config.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => {
            let config = setup(cli.config)?;
            let server = Server::new(backend(&config))
                .with_name(config.server.name.clone())
                .with_paths(config.path_rules());
            let stdin = std::io::stdin();
            server.serve(stdin.lock(), std::io::stdout().lock())?;
        }
        Command::ListTools => {
            let tools = Registry::new().descriptors();
            println!("{}", serde_json::to_string_pretty(&tools)?);
        }
        Command::Call { tool, args } => {
            let config = setup(cli.config)?;
            let args: serde_json::Value = serde_json::from_str(&args)?;
            let backend = backend(&config);
            let ctx = ToolContext::new(&backend).with_paths(config.path_rules());
            let response = Registry::new().call(&tool, &ctx, args)?;
            let lines: Vec<&str> = response.content.iter().map(|c| c.text()).collect();
            output::print_lines(&lines);
            if response.is_error {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Load the effective config and start logging at its level.
fn setup(path: Option<PathBuf>) -> Result<ServerConfig, config::ConfigError> {
    let config = config::load_config(path.as_deref())?;
    init_logging(&config.logging.level);
    Ok(config)
}

fn backend(config: &ServerConfig) -> RustBackend {
    RustBackend::new()
        .with_defaults(config.encoding_defaults())
        .with_overwrite(config.processing.overwrite)
}

/// Log to stderr; stdout carries protocol messages. `RUST_LOG` wins over config.
fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::version_label;

    #[test]
    fn release_tag_shows_plain_version() {
        assert_eq!(version_label("v0.4.0", "0.4.0"), "0.4.0");
    }

    #[test]
    fn other_builds_show_describe_output() {
        assert_eq!(version_label("v0.4.0-3-gabc1234", "0.4.0"), "dev@v0.4.0-3-gabc1234");
        assert_eq!(version_label("v0.4.0-dirty", "0.4.0"), "dev@v0.4.0-dirty");
        assert_eq!(version_label("", "0.4.0"), "dev@unknown");
    }
}
