use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use frontdesk::config::AppConfig;
use frontdesk::db;
use frontdesk::handlers;
use frontdesk::services::agent::SchedulingAgent;
use frontdesk::services::ai::anthropic::AnthropicProvider;
use frontdesk::services::ai::groq::GroqProvider;
use frontdesk::services::ai::ollama::OllamaProvider;
use frontdesk::services::ai::LlmProvider;
use frontdesk::services::directory::SqlitePatientDirectory;
use frontdesk::services::pipeline::Orchestrator;
use frontdesk::services::scheduling::SchedulingEngine;
use frontdesk::services::session::MemorySessionStore;
use frontdesk::services::tools::ToolRegistry;
use frontdesk::state::AppState;
use frontdesk::store::{AppointmentStore, GoogleCalendarStore, MemoryStore};

const RESPONDER_TEMPERATURE: f32 = 0.3;

/// Reasoning, classification and generic-response oracles, in that order.
type Oracles = (Arc<dyn LlmProvider>, Arc<dyn LlmProvider>, Arc<dyn LlmProvider>);

fn shared(provider: impl LlmProvider + 'static) -> Arc<dyn LlmProvider> {
    Arc::new(provider)
}

fn build_oracles(config: &AppConfig) -> anyhow::Result<Oracles> {
    let oracles = match config.llm_provider.as_str() {
        "groq" => {
            anyhow::ensure!(!config.groq_api_key.is_empty(), "GROQ_API_KEY must be set when LLM_PROVIDER=groq");
            tracing::info!(model = %config.groq_model, "using Groq LLM provider");
            let make = || GroqProvider::new(config.groq_api_key.clone(), config.groq_model.clone());
            (
                shared(make()),
                shared(make()),
                shared(make().with_temperature(RESPONDER_TEMPERATURE)),
            )
        }
        "ollama" => {
            tracing::info!(url = %config.ollama_url, model = %config.ollama_model, "using Ollama LLM provider");
            let make = || OllamaProvider::new(config.ollama_url.clone(), config.ollama_model.clone());
            (
                shared(make()),
                shared(make()),
                shared(make().with_temperature(RESPONDER_TEMPERATURE)),
            )
        }
        _ => {
            anyhow::ensure!(
                !config.anthropic_api_key.is_empty(),
                "ANTHROPIC_API_KEY must be set when LLM_PROVIDER=anthropic"
            );
            tracing::info!(
                model = %config.anthropic_model,
                fast_model = %config.anthropic_fast_model,
                "using Anthropic LLM provider"
            );
            let key = config.anthropic_api_key.clone();
            (
                shared(AnthropicProvider::new(key.clone(), config.anthropic_model.clone())),
                shared(AnthropicProvider::new(key.clone(), config.anthropic_fast_model.clone())),
                shared(
                    AnthropicProvider::new(key, config.anthropic_fast_model.clone())
                        .with_temperature(RESPONDER_TEMPERATURE),
                ),
            )
        }
    };
    Ok(oracles)
}

fn build_store(config: &AppConfig) -> Arc<dyn AppointmentStore> {
    if config.use_google_calendar() {
        tracing::info!(calendar = %config.google_calendar_id, "using Google Calendar backend");
        Arc::new(GoogleCalendarStore::new(
            config.google_calendar_id.clone(),
            config.google_calendar_token.clone(),
            config.calendar_timezone.clone(),
        ))
    } else {
        tracing::info!("using in-memory calendar with demo appointments");
        Arc::new(MemoryStore::seeded(chrono::Local::now().date_naive()))
    }
}

fn cors_layer(config: &AppConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .cors_origin_list()
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = db::init_db(&config.database_url)?;
    let directory = Arc::new(SqlitePatientDirectory::new(Arc::new(Mutex::new(conn))));

    let engine = SchedulingEngine::new(build_store(&config));
    let (reasoner, classifier, responder) = build_oracles(&config)?;
    tracing::info!(
        reasoner = reasoner.name(),
        classifier = classifier.name(),
        responder = responder.name(),
        "oracles ready"
    );

    let tools = ToolRegistry::front_desk(
        engine.clone(),
        directory.clone(),
        Duration::from_secs(config.tool_timeout_secs),
    );
    let agent = SchedulingAgent::new(reasoner, tools, config.agent_max_steps);
    let orchestrator = Orchestrator::new(
        classifier,
        responder,
        agent,
        Arc::new(MemorySessionStore::default()),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        orchestrator,
        engine,
        directory,
    });

    let app = handlers::router(state)
        .layer(cors_layer(&config))
        .layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(env = %config.app_env, "starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
