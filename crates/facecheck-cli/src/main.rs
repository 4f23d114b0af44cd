use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use facecheck_core::{
    is_valid_score, Comparator, ImageHash, Leg, MatchPolicy, PerceptualComparator, FIRST_LABEL,
    SECOND_LABEL,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "facecheck", about = "Match a captured image against two references")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the perceptual hash of each image
    Hash {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Compare offline using perceptual hashes
    Compare {
        /// Image to identify
        #[arg(short, long)]
        captured: PathBuf,
        /// First reference image
        #[arg(long)]
        image1: Option<PathBuf>,
        /// Second reference image
        #[arg(long)]
        image2: Option<PathBuf>,
        /// Hamming distance still counted as a match (0 = identical hashes)
        #[arg(long, default_value_t = 0)]
        max_distance: u32,
        /// Only accept legs scoring strictly above this similarity (0-100)
        #[arg(long, value_parser = parse_similarity)]
        min_similarity: Option<f32>,
    },
    /// Upload to a running facecheckd and print its answer
    Remote {
        /// Base URL of the service (e.g., http://localhost:3000)
        #[arg(short, long, default_value = "http://localhost:3000")]
        url: String,
        #[arg(short, long)]
        captured: PathBuf,
        #[arg(long)]
        image1: Option<PathBuf>,
        #[arg(long)]
        image2: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Hash { files } => {
            for path in files {
                let bytes = read(&path)?;
                let hash = ImageHash::from_bytes(&bytes)
                    .with_context(|| format!("hashing {}", path.display()))?;
                println!("{hash}  {}", path.display());
            }
        }
        Commands::Compare {
            captured,
            image1,
            image2,
            max_distance,
            min_similarity,
        } => {
            if image1.is_none() && image2.is_none() {
                bail!("at least one of --image1 or --image2 is required");
            }
            let captured = read(&captured)?;
            let comparator = PerceptualComparator::new(max_distance);
            let policy = MatchPolicy { min_similarity };

            let first = offline_leg(&comparator, FIRST_LABEL, image1.as_deref(), &captured).await?;
            let second =
                offline_leg(&comparator, SECOND_LABEL, image2.as_deref(), &captured).await?;

            let decision = policy.decide(first.as_ref(), second.as_ref());
            println!("{}", serde_json::to_string_pretty(&decision)?);
        }
        Commands::Remote {
            url,
            captured,
            image1,
            image2,
        } => {
            let mut form = reqwest::multipart::Form::new().part(
                "captured_image",
                file_part(&captured)?,
            );
            for (label, path) in [(FIRST_LABEL, image1), (SECOND_LABEL, image2)] {
                if let Some(path) = path {
                    form = form.part(label, file_part(&path)?);
                }
            }

            let endpoint = compare_url(&url);
            tracing::debug!(%endpoint, "uploading");
            let response = reqwest::Client::new()
                .post(&endpoint)
                .multipart(form)
                .send()
                .await
                .with_context(|| format!("POST {endpoint}"))?;

            let status = response.status();
            let body: serde_json::Value = response.json().await.context("reading response")?;
            println!("{}", serde_json::to_string_pretty(&body)?);
            if !status.is_success() {
                bail!("facecheckd returned {status}");
            }
        }
    }

    Ok(())
}

fn read(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).with_context(|| format!("reading {}", path.display()))
}

fn file_part(path: &Path) -> Result<reqwest::multipart::Part> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(reqwest::multipart::Part::bytes(read(path)?).file_name(name))
}

/// Run one leg offline. Undecodable images count as absent, as in the service.
async fn offline_leg(
    comparator: &PerceptualComparator,
    label: &str,
    reference: Option<&Path>,
    captured: &[u8],
) -> Result<Option<Leg>> {
    let Some(path) = reference else {
        return Ok(None);
    };
    let bytes = read(path)?;
    match comparator.compare(&bytes, captured).await {
        Ok(result) => Ok(Some(Leg::new(label, result))),
        Err(err) => {
            tracing::warn!(label, error = %err, "comparison failed; treating leg as absent");
            Ok(None)
        }
    }
}

fn parse_similarity(value: &str) -> std::result::Result<f32, String> {
    let parsed: f32 = value
        .trim()
        .parse()
        .map_err(|_| format!("{value:?} is not a number"))?;
    if !is_valid_score(parsed) {
        return Err(format!("{value:?} is not a similarity between 0 and 100"));
    }
    Ok(parsed)
}

fn compare_url(base: &str) -> String {
    format!("{}/compare", base.trim_end_matches('/'))
}
