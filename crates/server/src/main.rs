//! Voice Call Server Entry Point

use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, Layer};

use voice_call_agent::spawn_sweeper;
use voice_call_config::{load_settings, Settings};
use voice_call_llm::{AiBackend, AiBackendSettings, HttpAiBackend};
use voice_call_persistence::{CallLogStore, InMemoryCallLogStore, ScyllaConfig};
use voice_call_server::{create_router, init_metrics, AppState};
use voice_call_transport::{TelephonyProvider, TwilioClient, TwilioSettings};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Priority: env vars > config/{env}.* > config/default.* > defaults
    let env = std::env::var("VOICE_CALL_ENV").ok();
    let config = match load_settings(env.as_deref()) {
        Ok(settings) => {
            // Tracing not yet initialized
            eprintln!(
                "Loaded configuration from files (env: {})",
                env.as_deref().unwrap_or("default")
            );
            settings
        },
        Err(e) => {
            eprintln!("Warning: Failed to load config: {}. Using defaults.", e);
            Settings::default()
        },
    };

    init_tracing(&config);

    tracing::info!("Starting Voice Call Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        environment = ?config.environment,
        config_path = env.as_deref().unwrap_or("default"),
        public_base_url = %config.server.public_base_url,
        "Configuration loaded"
    );
    if !config.telephony.has_credentials() {
        tracing::warn!("Telephony credentials missing, outbound calls will fail");
    }

    if config.observability.metrics_enabled {
        let _metrics_handle = init_metrics();
        tracing::info!("Initialized Prometheus metrics at /metrics");
    }

    let provider: Arc<dyn TelephonyProvider> = Arc::new(TwilioClient::new(TwilioSettings {
        account_sid: config.telephony.account_sid.clone(),
        auth_token: config.telephony.auth_token.clone(),
        api_base_url: config.telephony.api_base_url.clone(),
        timeout: config.telephony.request_timeout(),
    })?);

    let backend: Arc<dyn AiBackend> = Arc::new(HttpAiBackend::new(AiBackendSettings {
        endpoint: config.ai_backend.endpoint.clone(),
        timeout: config.ai_backend.timeout(),
        probe_timeout: config.ai_backend.probe_timeout(),
    })?);

    let call_logs = init_call_logs(&config).await;
    let state = AppState::with_call_logs(config.clone(), provider, backend, call_logs);

    tracing::info!(
        distributed = state.is_distributed_sessions(),
        max_sessions = config.session.max_sessions,
        "Initialized application state"
    );

    let sweeper = spawn_sweeper(
        state.sessions.clone(),
        config.session.sweep_interval(),
        config.session.max_age(),
    );

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = sweeper.send(true);
    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Call log store: ScyllaDB when enabled, otherwise (or on failure) in-memory
async fn init_call_logs(config: &Settings) -> Arc<dyn CallLogStore> {
    if !config.persistence.enabled {
        tracing::info!("Persistence disabled, using in-memory call log");
        return Arc::new(InMemoryCallLogStore::new());
    }

    tracing::info!("Initializing ScyllaDB persistence layer...");
    let scylla_config = ScyllaConfig {
        hosts: config.persistence.scylla_hosts.clone(),
        keyspace: config.persistence.keyspace.clone(),
        replication_factor: config.persistence.replication_factor,
    };
    match voice_call_persistence::init(scylla_config).await {
        Ok(store) => {
            tracing::info!(
                hosts = ?config.persistence.scylla_hosts,
                keyspace = %config.persistence.keyspace,
                "ScyllaDB persistence initialized"
            );
            Arc::new(store)
        },
        Err(e) => {
            tracing::error!("Failed to initialize ScyllaDB: {}. Falling back to in-memory.", e);
            Arc::new(InMemoryCallLogStore::new())
        },
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            },
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}

fn env_filter(config: &Settings) -> tracing_subscriber::EnvFilter {
    tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = &config.observability.log_level;
        format!("voice_call={},tower_http=debug", level).into()
    })
}

/// Initialize tracing (with optional OpenTelemetry when feature enabled)
#[cfg(feature = "telemetry")]
fn init_tracing(config: &Settings) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;

    let subscriber = tracing_subscriber::registry().with(env_filter(config));
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };

    if let Some(otlp_endpoint) = &config.observability.otlp_endpoint {
        let exporter = opentelemetry_otlp::SpanExporter::builder()
            .with_tonic()
            .with_endpoint(otlp_endpoint)
            .build();
        match exporter {
            Ok(exporter) => {
                let provider = opentelemetry_sdk::trace::TracerProvider::builder()
                    .with_batch_exporter(exporter, opentelemetry_sdk::runtime::Tokio)
                    .with_resource(opentelemetry_sdk::Resource::new(vec![
                        opentelemetry::KeyValue::new("service.name", "voice-call"),
                        opentelemetry::KeyValue::new("service.version", env!("CARGO_PKG_VERSION")),
                    ]))
                    .build();
                let tracer = provider.tracer("voice-call");
                opentelemetry::global::set_tracer_provider(provider);
                let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);
                subscriber.with(fmt_layer).with(otel_layer).init();
                tracing::info!(endpoint = %otlp_endpoint, "OpenTelemetry tracing enabled");
                return;
            },
            Err(e) => eprintln!("Failed to initialize OpenTelemetry: {}. Falling back.", e),
        }
    }
    subscriber.with(fmt_layer).init();
}

/// Initialize tracing (console only - telemetry feature disabled)
#[cfg(not(feature = "telemetry"))]
fn init_tracing(config: &Settings) {
    let subscriber = tracing_subscriber::registry().with(env_filter(config));
    let fmt_layer = if config.observability.log_json {
        tracing_subscriber::fmt::layer().json().boxed()
    } else {
        tracing_subscriber::fmt::layer().boxed()
    };
    subscriber.with(fmt_layer).init();
}
