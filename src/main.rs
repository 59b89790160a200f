//! Hunt Back binary entrypoint wiring the REST API, storage supervision and outbound collaborators.

use std::{env, net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::Router;
use reqwest::Client;
use tokio::{net::TcpListener, sync::mpsc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hunt_back::{
    config::{AppConfig, DispatchSettings, StoreBackend},
    dao::{
        game_store::{GameStore, memory::InMemoryGameStore},
        storage::StorageError,
    },
    routes,
    services::{
        dispatch::{
            EndGameScheduler, EventSink, HttpEventSink, HttpPushTransport, LocalEndGameScheduler,
            LogPushTransport, PushTransport, TracingEventSink, WebhookEndGameScheduler,
        },
        save_game_service,
    },
    state::{AppState, Collaborators, PushChannels, SharedState},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::load();
    let settings = DispatchSettings::from_env();
    let client = Client::builder()
        .build()
        .context("building outbound HTTP client")?;

    let (timer_tx, timer_rx) = mpsc::unbounded_channel();
    let scheduler: Arc<dyn EndGameScheduler> = match &settings.end_game_webhook_url {
        Some(url) => {
            info!(endpoint = %url, "end-game timers delegated to webhook");
            Arc::new(WebhookEndGameScheduler::new(client.clone(), url.clone()))
        }
        None => Arc::new(LocalEndGameScheduler::new(timer_tx)),
    };
    let events: Arc<dyn EventSink> = match &settings.audit_sink_url {
        Some(url) => Arc::new(HttpEventSink::new(client.clone(), url.clone())),
        None => Arc::new(TracingEventSink),
    };
    let push = PushChannels {
        dev: push_transport(&client, settings.push_dev_url.as_ref(), &settings, "dev"),
        production: push_transport(
            &client,
            settings.push_production_url.as_ref(),
            &settings,
            "production",
        ),
    };

    let app_state = AppState::new(
        config,
        Collaborators {
            push,
            events,
            scheduler,
        },
    );

    if settings.end_game_webhook_url.is_none() {
        tokio::spawn(save_game_service::run_end_game_worker(
            app_state.clone(),
            timer_rx,
        ));
    }

    start_storage(&app_state, StoreBackend::from_env()).await;

    // Build the HTTP router once the shared state is ready.
    let app = build_router(app_state);

    let port = env::var("PORT")
        .or_else(|_| env::var("SERVER_PORT"))
        .ok()
        .and_then(|value| value.parse::<u16>().ok())
        .unwrap_or(8080);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    let service = app.into_make_service();
    axum::serve(listener, service)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    Ok(())
}

fn push_transport(
    client: &Client,
    endpoint: Option<&String>,
    settings: &DispatchSettings,
    channel: &'static str,
) -> Arc<dyn PushTransport> {
    match endpoint {
        Some(url) => Arc::new(HttpPushTransport::new(
            client.clone(),
            url.clone(),
            settings.push_api_token.clone(),
        )),
        None => Arc::new(LogPushTransport::new(channel)),
    }
}

/// Install the selected backend. Remote backends connect in the background and the server
/// stays in degraded mode until they answer.
async fn start_storage(state: &SharedState, backend: StoreBackend) {
    info!(?backend, "selected storage backend");
    match backend {
        StoreBackend::Memory => {
            state
                .install_game_store(Arc::new(InMemoryGameStore::new()))
                .await;
        }
        #[cfg(feature = "couch-store")]
        StoreBackend::Couch => {
            use hunt_back::dao::game_store::couchdb::{CouchConfig, CouchGameStore};

            tokio::spawn(
                hunt_back::services::storage_supervisor::run(state.clone(), || async {
                    let config = CouchConfig::from_env()?;
                    let store = CouchGameStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }),
            );
        }
        #[cfg(feature = "mongo-store")]
        StoreBackend::Mongo => {
            use hunt_back::dao::game_store::mongodb::{MongoConfig, MongoGameStore};

            tokio::spawn(
                hunt_back::services::storage_supervisor::run(state.clone(), || async {
                    let config = MongoConfig::from_env().await?;
                    let store = MongoGameStore::connect(config).await?;
                    Ok::<_, StorageError>(Arc::new(store) as Arc<dyn GameStore>)
                }),
            );
        }
        #[allow(unreachable_patterns)]
        other => {
            tracing::error!(
                backend = ?other,
                "storage backend not compiled in; serving in degraded mode"
            );
        }
    }
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState) -> Router<()> {
    routes::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                tracing::warn!(error = %err, "SIGTERM handler unavailable; waiting for Ctrl+C");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
