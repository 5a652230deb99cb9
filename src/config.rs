use std::env;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub port: u16,
    pub app_env: String,
    pub database_url: String,
    pub llm_provider: String,
    pub anthropic_api_key: String,
    pub anthropic_model: String,
    pub anthropic_fast_model: String,
    pub groq_api_key: String,
    pub groq_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
    pub google_calendar_id: String,
    pub google_calendar_token: String,
    pub calendar_timezone: String,
    pub cors_origins: String,
    pub agent_max_steps: usize,
    pub tool_timeout_secs: u64,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(8000),
            app_env: env::var("APP_ENV").unwrap_or_else(|_| "demo".to_string()),
            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "patients.db".to_string()),
            llm_provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "anthropic".to_string()),
            anthropic_api_key: env::var("ANTHROPIC_API_KEY").unwrap_or_default(),
            anthropic_model: env::var("ANTHROPIC_MODEL")
                .unwrap_or_else(|_| "claude-sonnet-4-20250514".to_string()),
            anthropic_fast_model: env::var("ANTHROPIC_FAST_MODEL")
                .unwrap_or_else(|_| "claude-3-5-haiku-20241022".to_string()),
            groq_api_key: env::var("GROQ_API_KEY").unwrap_or_default(),
            groq_model: env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.3-70b-versatile".to_string()),
            ollama_url: env::var("OLLAMA_URL")
                .unwrap_or_else(|_| "http://localhost:11434".to_string()),
            ollama_model: env::var("OLLAMA_MODEL").unwrap_or_else(|_| "llama3.2".to_string()),
            google_calendar_id: env::var("GOOGLE_CALENDAR_ID").unwrap_or_default(),
            google_calendar_token: env::var("GOOGLE_CALENDAR_TOKEN").unwrap_or_default(),
            calendar_timezone: env::var("CALENDAR_TIMEZONE").unwrap_or_else(|_| "UTC".to_string()),
            cors_origins: env::var("CORS_ORIGINS")
                .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string()),
            agent_max_steps: env::var("AGENT_MAX_STEPS")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|n| *n > 0)
                .unwrap_or(8),
            tool_timeout_secs: env::var("TOOL_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
        }
    }

    /// The Google Calendar backend is used only when both the calendar id and
    /// an access token are configured.
    pub fn use_google_calendar(&self) -> bool {
        !self.google_calendar_id.is_empty() && !self.google_calendar_token.is_empty()
    }

    pub fn cors_origin_list(&self) -> Vec<String> {
        self.cors_origins
            .split(',')
            .map(|o| o.trim().to_string())
            .filter(|o| !o.is_empty())
            .collect()
    }
}
