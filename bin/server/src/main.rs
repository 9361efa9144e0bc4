use phone_agent_ai::XaiClient;
use phone_agent_conversation::InMemorySessionStore;
use phone_agent_scheduler::ExpirySweeper;
use phone_agent_server::{AppState, ServerConfig, StartupError, router};
use phone_agent_speech::ElevenLabsClient;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> phone_agent_core::Result<(), StartupError> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration from environment
    let config = ServerConfig::from_env().map_err(|e| StartupError::Config {
        details: e.to_string(),
    })?;
    tracing::info!(
        model = %config.xai.model,
        voice_id = %config.elevenlabs.voice_id,
        "Loaded configuration"
    );

    let llm = XaiClient::new(config.xai.clone()).map_err(|e| StartupError::Client {
        details: e.to_string(),
    })?;
    let synthesizer =
        ElevenLabsClient::new(config.elevenlabs.clone()).map_err(|e| StartupError::Client {
            details: e.to_string(),
        })?;
    let store = Arc::new(InMemorySessionStore::new());

    // Spawn periodic session expiry
    let sweeper = ExpirySweeper::new(store.clone(), config.conversation.sweep_config())
        .map_err(|e| StartupError::Config {
            details: e.to_string(),
        })?
        .spawn();

    let state = Arc::new(AppState::new(
        store,
        Arc::new(llm),
        Arc::new(synthesizer),
        config.pipeline_config(),
        config.telephony.clone(),
        config.conversation.remove_on_hangup,
    ));
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| StartupError::Bind {
            addr: addr.clone(),
            details: e.to_string(),
        })?;

    tracing::info!("listening on http://{}", addr);
    tracing::info!("Twilio webhook URL: http://{}/voice", addr);

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    sweeper.abort();
    served.map_err(|e| StartupError::Serve {
        details: e.to_string(),
    })?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}
