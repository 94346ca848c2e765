use std::net::SocketAddr;

use clap::Parser;
use insight_engine::{AppState, config::EngineConfig, create_router};
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Serve route summaries, report heatmaps and polyline decoding over HTTP"
)]
struct Args {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "insight_engine=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = EngineConfig::from_env();
    tracing::debug!("configuration: {config:?}");

    let app = create_router(AppState::new(config)).layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .expect("bind listening socket");
    tracing::info!("insight engine listening on http://{}", args.bind);
    axum::serve(listener, app).await.expect("server error");
}
