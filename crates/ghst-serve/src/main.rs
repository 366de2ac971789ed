//! ghst-serve: serve a directory over HTTP
//!
//! Every file under `--dir` becomes a `GET` route at its relative path.
//! `/` serves `index.html` when the directory has one.

use clap::Parser;
use ghst_core::middleware::Logger;
use ghst_core::{App, AppOptions, Method, ServerConfig};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[derive(Debug, Parser)]
#[command(name = "ghst-serve", version, about = "Serve a directory over HTTP")]
struct Args {
    /// Directory to serve
    #[arg(short, long, default_value = ".", env = "GHST_DIR")]
    dir: PathBuf,

    /// Port to listen on
    #[arg(short, long, default_value_t = 8080, env = "GHST_PORT")]
    port: u16,

    /// Address to bind
    #[arg(long, default_value = "0.0.0.0", env = "GHST_HOST")]
    host: String,

    /// Per-request deadline in milliseconds
    #[arg(long, default_value_t = 30_000)]
    timeout_ms: u64,

    /// Largest accepted request body in bytes
    #[arg(long, default_value_t = 1024 * 1024)]
    max_body: usize,

    /// Worker threads (defaults to the number of CPUs)
    #[arg(long)]
    workers: Option<usize>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ghst_serve=info,ghst_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.workers.unwrap_or_else(num_cpus::get).max(1))
        .enable_all()
        .build()?;

    runtime.block_on(serve(args))
}

async fn serve(args: Args) -> Result<(), Box<dyn std::error::Error>> {
    let mut app = App::with_options(AppOptions::new().middleware(Logger::new()));
    app.set_static(&args.dir)?;

    let index = args.dir.join("index.html");
    if index.is_file() {
        app.on_request("/", Method::Get, move |_req, res| {
            res.send_file(&index)?;
            Ok(())
        });
    }

    let config = ServerConfig::new(args.port)
        .hostname(args.host)
        .request_timeout(Duration::from_millis(args.timeout_ms))
        .max_body_size(args.max_body);

    let server = app.bind(config).await?;
    tracing::info!(
        dir = %args.dir.display(),
        "serving on http://{}",
        server.local_addr()?
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    tracing::info!("stopped");
    Ok(())
}
