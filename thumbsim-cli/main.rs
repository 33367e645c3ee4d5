use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use thumbsim_cli::handler::CompareResponse;
use thumbsim_cli::{health, init_thread_pool, init_tracing, service_info, CompareHandler, OutputFormat, PipelineConfig, Upload};
use thumbsim_render::decode_data_uri;
use tracing::{error, info};

/// Thumbnail similarity checker
#[derive(Parser, Debug)]
#[command(name = "thumbsim")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// TOML file overriding the default pipeline configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Worker threads (defaults to the configured ORB thread count)
    #[arg(long, global = true)]
    threads: Option<usize>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Compare two JPEG or PNG images
    Compare {
        image1: PathBuf,
        image2: PathBuf,

        /// Write the JSON response to this file
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Decode every embedded image into this directory
        #[arg(long)]
        write_images: Option<PathBuf>,

        /// Print the JSON response instead of a summary
        #[arg(long)]
        json: bool,

        /// Encoding of embedded images
        #[arg(long, default_value = "png")]
        format: ImageEncoding,
    },
    /// Print the effective configuration as TOML
    Config {
        /// Save to this file instead of printing
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print the service descriptor and health status
    Info,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ImageEncoding {
    Png,
    Jpeg,
}

impl From<ImageEncoding> for OutputFormat {
    fn from(encoding: ImageEncoding) -> Self {
        match encoding {
            ImageEncoding::Png => OutputFormat::Png,
            ImageEncoding::Jpeg => OutputFormat::Jpeg,
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(if cli.verbose { "debug" } else { "info" });

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig, Box<dyn Error>> {
    match path {
        Some(path) => {
            let config = PipelineConfig::load_toml(path)?;
            info!(path = %path.display(), "configuration loaded");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Compare {
            image1,
            image2,
            output,
            write_images,
            json,
            format,
        } => {
            init_thread_pool(cli.threads.unwrap_or(config.orb.n_threads).max(1))?;
            run_compare(&config, &image1, &image2, output, write_images, json, format.into())
        }
        Commands::Config { output } => {
            match output {
                Some(path) => {
                    config.save_toml(&path)?;
                    println!("Configuration written to {}", path.display());
                }
                None => print!("{}", config.to_toml()?),
            }
            Ok(())
        }
        Commands::Info => {
            println!("{}", serde_json::to_string_pretty(&service_info())?);
            println!("{}", serde_json::to_string_pretty(&health())?);
            Ok(())
        }
    }
}

fn run_compare(
    config: &PipelineConfig,
    image1: &Path,
    image2: &Path,
    output: Option<PathBuf>,
    write_images: Option<PathBuf>,
    json: bool,
    format: OutputFormat,
) -> Result<(), Box<dyn Error>> {
    let first = Upload::from_path(image1)?;
    let second = Upload::from_path(image2)?;

    let handler = CompareHandler::new(config.clone())?.with_format(format);
    let response = match handler.handle(&first, &second) {
        Ok(response) => response,
        Err(e) => {
            eprintln!("{}", serde_json::to_string(&e.body())?);
            return Err(format!("request failed with status {}", e.status_code()).into());
        }
    };

    let document = serde_json::to_string_pretty(&response)?;
    if let Some(path) = &output {
        std::fs::write(path, &document)?;
        info!(path = %path.display(), "response written");
    }
    if let Some(dir) = &write_images {
        write_embedded_images(&response, dir)?;
    }

    if json {
        println!("{}", document);
    } else {
        print_summary(&response);
    }
    Ok(())
}

fn write_embedded_images(response: &CompareResponse, dir: &Path) -> Result<(), Box<dyn Error>> {
    std::fs::create_dir_all(dir)?;
    for (label, uri) in response.images() {
        let (format, bytes) = decode_data_uri(uri)?;
        let path = dir.join(format!("{}.{}", label, format.extension()));
        std::fs::write(&path, bytes)?;
    }
    info!(dir = %dir.display(), "embedded images written");
    Ok(())
}

fn print_summary(response: &CompareResponse) {
    let scores = &response.similarity_scores;
    let features = &response.feature_matching;
    println!("Overall similarity:   {:>6.2}%", scores.overall_similarity);
    println!("Color similarity:     {:>6.2}%", scores.color_similarity);
    println!("Structure similarity: {:>6.2}%", scores.structure_similarity);
    println!(
        "Feature matching:     {:>6.2}% ({} matches, {} / {} keypoints)",
        features.match_score, features.match_count, features.keypoints1_count, features.keypoints2_count
    );
}
