use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use plate_client::{
    CaptureReport, ClientConfig, FilePicker, FinderError, GatewayClient, GrantedPermissions,
    ImageHandle, MediaAcquisition, MediaSource, Navigator, PickedAsset, RecipeBackend,
    RecipeFinder, Route,
};
use plate_core::{ImageHash, RecipeFilter, UploadOutcome};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "platectl", version, about = "Talk to a Pixel to Plate recipe backend")]
struct Args {
    /// TOML client config. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Backend base URL, e.g. http://127.0.0.1:8080. Wins over the config file.
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// List recipes, optionally filtered.
    Recipes {
        #[arg(long)]
        cuisine: Option<String>,
        #[arg(long)]
        dietary_preference: Option<String>,
    },
    Recipe {
        #[arg(long)]
        image_hash: String,
    },
    Metadata {
        #[arg(long)]
        image_hash: String,
    },
    /// Upload a photo and print the raw outcome, without navigating.
    Upload {
        #[arg(long)]
        file: PathBuf,
    },
    /// Run one capture cycle with a photo from disk.
    Snap {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, default_value_t = SourceArg::Library)]
        source: SourceArg,
    },
    Config {
        #[command(subcommand)]
        config: ConfigCmd,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCmd {
    /// Write a config file with default values.
    Init {
        #[arg(long)]
        path: PathBuf,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Camera,
    Library,
}

impl From<SourceArg> for MediaSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Camera => MediaSource::Camera,
            SourceArg::Library => MediaSource::Library,
        }
    }
}

struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        info!("navigate {}", route.to_href());
    }
}

/// User-facing text first, the underlying cause as its source.
fn finder_failure(err: &FinderError) -> anyhow::Error {
    match err.detail() {
        Some(detail) => anyhow!("{detail}").context(err.to_string()),
        None => anyhow!("{err}"),
    }
}

fn outcome_json(outcome: &UploadOutcome) -> Result<String> {
    serde_json::to_string_pretty(outcome).context("encode upload outcome")
}

fn connect(config: Option<&Path>, backend: Option<&str>) -> Result<GatewayClient> {
    let mut config = match config {
        Some(path) => ClientConfig::load_from(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => ClientConfig::default(),
    }
    .with_env_overrides();
    if let Some(url) = backend {
        config.backend.url = Some(url.to_string());
    }
    let gateway = GatewayClient::new(&config).context("build gateway client")?;
    info!("backend={}", gateway.base_url());
    Ok(gateway)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let Args {
        config,
        backend,
        cmd,
    } = Args::parse();
    let config = config.as_deref();
    let backend = backend.as_deref();

    match cmd {
        Cmd::Recipes {
            cuisine,
            dietary_preference,
        } => {
            let filter = RecipeFilter {
                cuisine,
                dietary_preference,
            };
            let recipes = connect(config, backend)?
                .list_recipes(&filter)
                .await
                .context("list recipes")?;
            println!("{}", serde_json::to_string_pretty(&recipes)?);
        }
        Cmd::Recipe { image_hash } => {
            let recipe = connect(config, backend)?
                .get_recipe(&ImageHash::from_str(image_hash))
                .await
                .context("fetch recipe")?;
            println!("{}", serde_json::to_string_pretty(&recipe)?);
        }
        Cmd::Metadata { image_hash } => {
            let meta = connect(config, backend)?
                .image_metadata(&ImageHash::from_str(image_hash))
                .await
                .context("fetch image metadata")?;
            println!("{}", serde_json::to_string_pretty(&meta)?);
        }
        Cmd::Upload { file } => {
            let gateway = connect(config, backend)?;
            let asset = PickedAsset::Uri {
                uri: file.to_string_lossy().to_string(),
                file_name: file.file_name().and_then(|n| n.to_str()).map(String::from),
                content_type: None,
            };
            let handle = ImageHandle::resolve(asset)
                .await
                .with_context(|| format!("read photo {}", file.display()))?;
            let outcome = gateway.upload_image(handle).await;
            println!("{}", outcome_json(&outcome)?);
        }
        Cmd::Snap { file, source } => {
            let gateway = connect(config, backend)?;
            let media = MediaAcquisition::new(
                Arc::new(GrantedPermissions),
                Arc::new(FilePicker::new(file)),
            );
            let mut finder = RecipeFinder::new(Arc::new(gateway), media, Arc::new(LogNavigator));
            match finder.capture(source.into()).await {
                CaptureReport::Completed {
                    image_hash,
                    description,
                } => {
                    let out = serde_json::json!({
                        "route": Route::detail(image_hash.clone()).to_href(),
                        "image_hash": image_hash,
                        "description": description,
                    });
                    println!("{}", serde_json::to_string_pretty(&out)?);
                }
                CaptureReport::Cancelled => println!("cancelled"),
                CaptureReport::Abandoned => println!("abandoned"),
                CaptureReport::Failed(err) => return Err(finder_failure(&err)),
            }
        }
        Cmd::Config {
            config: ConfigCmd::Init { path },
        } => {
            ClientConfig::default()
                .save_to(&path)
                .with_context(|| format!("write config {}", path.display()))?;
            println!("wrote {}", path.display());
        }
    }

    Ok(())
}
