use clap::{Parser, Subcommand};
use simple_img::server::{self, AppState};
use simple_img::store::Store;
use simple_img::{config, naming, output, scan};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

fn version_string() -> &'static str {
    let on_tag = env!("ON_RELEASE_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "simple-img")]
#[command(about = "HTTP image store with lazily rendered variants")]
#[command(long_about = "\
HTTP image store with lazily rendered variants

Upload an image with PUT, then reserve variants by POSTing a name. The first
GET of a variant renders it; later reads serve the stored file.

Variant names:

  scale-400x300  (or 400x300)    Resample to exactly 400x300
  clip-400x300                   Fit inside 400x300, keep aspect ratio
  crop-200x200-x50y50            Cover 200x200, window centered at 50%,50%
  cut-20x20-t5l10-s40x40         Copy 20x20 pixels at top 5, left 10, scale to 40x40

  Suffix: .png, .jpeg, .jpg, or .q<N>.jpeg (default JPEG quality 80)

Store layout:

  store/
  └── q/3/Z/k9Xv0cBmLr_2N8aYtWe1H/
      ├── source.jpeg              # Upload, re-encoded as JPEG
      ├── metadata.txt             # Optional sidecar
      └── crop-200x200-x50y50.jpeg # Variant (empty until first read)

Run 'simple-img gen-config' to generate a documented simple-img.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (defaults to ./simple-img.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Store root directory (overrides [storage] root)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// Listen address (overrides [server] bind)
        #[arg(long)]
        bind: Option<String>,
    },
    /// Inventory the store: containers, materialized and pending variants
    Scan {
        /// Print the inventory as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the canonical file name a variant segment reserves
    Name {
        /// Variant segment, e.g. crop-50x50.png
        segment: String,
    },
    /// Print a stock simple-img.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve { bind } => {
            init_tracing();
            let mut config = config::load_config(cli.config.as_deref())?;
            if let Some(root) = cli.root {
                config.storage.root = root;
            }
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            config.validate()?;
            run_server(config)?;
        }
        Command::Scan { json } => {
            let config = config::load_config(cli.config.as_deref())?;
            let root = cli.root.unwrap_or(config.storage.root);
            let inventory = scan::scan(&root)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&inventory)?);
            } else {
                output::print_inventory(&inventory);
            }
        }
        Command::Name { segment } => {
            let parsed = naming::Grammar::new().parse(&segment);
            output::print_name(&segment, &parsed);
            if parsed.is_err() {
                std::process::exit(1);
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,simple_img=debug"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Build the tokio runtime with the blocking pool capped by
/// `[processing] max_workers`, then serve until Ctrl-C.
fn run_server(config: config::ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    let workers = config::effective_workers(&config.processing);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .max_blocking_threads(workers)
        .enable_all()
        .build()?;

    std::fs::create_dir_all(&config.storage.root)?;
    let state = AppState {
        store: Arc::new(Store::from_config(&config.storage, &config.images)),
        max_upload_bytes: config.server.max_upload_bytes,
    };

    runtime.block_on(async {
        let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
        tracing::info!(
            bind = %config.server.bind,
            root = %config.storage.root.display(),
            workers,
            "listening"
        );
        server::serve(listener, state).await
    })?;
    Ok(())
}
