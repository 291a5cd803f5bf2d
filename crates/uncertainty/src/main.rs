//! Demo server: a toy downstream service wrapped in an uncertainty profile.
//!
//! Usage:
//!   uncertainty --port 8080 --profile flaky --error-rate 0.3

use anyhow::Context;
use bytes::Bytes;
use clap::{Parser, ValueEnum};
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::{Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower::Layer;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uncertainty::behaviour::{
    delay_request, multi_conditional, pass_through, random_choice, server_error, status, Choice,
};
use uncertainty::predicate::{is_get, path_matches};
use uncertainty::{BehaviourRef, Settings, UncertaintyLayer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Profile {
    /// Forward every request untouched
    Passthrough,
    /// Fail a share of requests with a 500
    Flaky,
    /// Delay every request before forwarding
    Slow,
    /// Serve 503 for reads, keep health checks alive
    Maintenance,
}

#[derive(Parser, Debug)]
#[command(name = "uncertainty")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8080", env = "UNCERTAINTY_PORT")]
    port: u16,

    /// Rule tree to install in front of the demo service
    #[arg(long, value_enum, default_value = "passthrough", env = "UNCERTAINTY_PROFILE")]
    profile: Profile,

    /// Probability of a 500 under the flaky profile
    #[arg(long, default_value = "0.3")]
    error_rate: f64,

    /// Seconds to wait under the slow profile
    #[arg(long, default_value = "1.0")]
    delay_seconds: f64,
}

fn build_settings(args: &Args) -> anyhow::Result<Settings> {
    let root: BehaviourRef = match args.profile {
        Profile::Passthrough => pass_through().into(),
        Profile::Flaky => random_choice([
            Choice::weighted(server_error("injected failure\n"), args.error_rate),
            Choice::even(pass_through()),
        ])?
        .into(),
        Profile::Slow => delay_request(pass_through(), args.delay_seconds)?.into(),
        Profile::Maintenance => multi_conditional([
            (path_matches("^/health")?, BehaviourRef::from(pass_through())),
            (
                is_get(),
                status(StatusCode::SERVICE_UNAVAILABLE, "down for maintenance\n").into(),
            ),
        ])
        .into(),
    };
    Ok(Settings::new(root))
}

async fn downstream(request: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, Infallible> {
    let body = format!("hello from {}\n", request.uri().path());
    Ok(Response::new(Full::new(Bytes::from(body))))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let settings = build_settings(&args).context("invalid profile settings")?;
    let service = UncertaintyLayer::new(settings).layer(tower::service_fn(downstream));

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Listening on http://{} with profile {:?}", addr, args.profile);

    loop {
        let (stream, remote_addr) = tokio::select! {
            accepted = listener.accept() => accepted?,
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                return Ok(());
            }
        };

        let service = TowerToHyperService::new(service.clone());
        tokio::spawn(async move {
            let io = TokioIo::new(stream);
            if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                error!("Error serving connection from {}: {}", remote_addr, err);
            }
        });
    }
}
