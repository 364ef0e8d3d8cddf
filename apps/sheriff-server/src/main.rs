//! Sheriff webhook receiver.
//!
//! `POST /` consumes GitHub's webhook envelope (HMAC-validated against
//! `GITHUB_WEBHOOK_SECRET`); `GET /static/*` serves the bundled images used
//! in alert blocks. On SIGINT the listener stops accepting connections,
//! in-flight work drains, and the process exits 0.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use sheriff_alerts::{DynAlertSink, LogSink, SlackWebhookSink};
use sheriff_config::SheriffEnv;
use sheriff_github::credentials::CredentialProvider;
use sheriff_github::{RestClient, StaticTokenProvider};
use sheriff_webhooks::{verify_signature, DryRunHarness, EnforcementEngine};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Clone)]
struct AppState {
    engine: Arc<EnforcementEngine>,
    webhook_secret: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    info!("Starting sheriff webhook receiver v{VERSION}");

    let env = SheriffEnv::from_env()?;

    let token = env
        .github_app_creds
        .clone()
        .ok_or_else(|| anyhow::anyhow!("SHERIFF_GITHUB_APP_CREDS is required"))?;
    let provider: Arc<dyn CredentialProvider> =
        Arc::new(StaticTokenProvider::new(token.clone(), false));

    let sink: DynAlertSink = match &env.slack_webhook_url {
        Some(url) => Arc::new(SlackWebhookSink::new(url.clone())),
        None => {
            warn!("SLACK_WEBHOOK_URL is not set; alerts go to the log only");
            Arc::new(LogSink)
        }
    };

    // Gists need a user token; the app installation token cannot create
    // them.
    let gist_token = env.gist_token.clone().unwrap_or(token);
    let gist_client = Arc::new(RestClient::new(sheriff_github::rest::RestConfig::new(
        gist_token,
    ))?);

    let shutdown = CancellationToken::new();
    let harness = DryRunHarness::new(
        env.clone(),
        Arc::clone(&provider),
        gist_client,
        shutdown.clone(),
    );

    let engine = Arc::new(EnforcementEngine::new(
        env.clone(),
        provider,
        sink,
        Some(harness),
    ));

    let state = AppState {
        engine,
        webhook_secret: env.webhook_secret.clone(),
    };

    let app = Router::new()
        .route("/", post(receive_webhook))
        .nest_service("/static", ServeDir::new("static"))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], env.port));
    info!(address = %addr, "sheriff listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_sigint(shutdown))
        .await?;

    info!("sheriff stopped cleanly");
    Ok(())
}

fn init_logging() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json())
        .init();
}

async fn wait_for_sigint(shutdown: CancellationToken) {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "cannot listen for SIGINT");
        return;
    }
    info!("SIGINT received; draining in-flight work");
    shutdown.cancel();
}

/// The single webhook endpoint. Signature failures are rejected; unknown or
/// unhandled events are accepted and logged; handler errors never escape.
async fn receive_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get("x-hub-signature-256")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    if !verify_signature(&state.webhook_secret, &body, signature) {
        warn!("rejecting delivery with bad signature");
        return StatusCode::UNAUTHORIZED;
    }

    let event = headers
        .get("x-github-event")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();
    let delivery_id = headers
        .get("x-github-delivery")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string();

    let payload: serde_json::Value = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(event, delivery_id, error = %err, "unparseable webhook body");
            return StatusCode::BAD_REQUEST;
        }
    };

    if let Err(err) = state.engine.handle_event(&event, &delivery_id, payload).await {
        error!(event, delivery_id, error = %err, "event handling failed");
    }
    StatusCode::OK
}
