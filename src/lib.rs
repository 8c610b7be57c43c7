use std::sync::Arc;

use axum::{
    http::{HeaderValue, Method},
    routing::{get, post},
    Router,
};
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

pub mod config;
pub mod handlers {
    pub mod call_handlers;
    pub mod contact_handlers;
    pub mod demo_handlers;
}
pub mod api {
    pub mod mailer;
    pub mod vapi;
}
pub mod models {
    pub mod call_models;
    pub mod contact_models;
}
pub mod repositories {
    pub mod rate_store;
}
pub mod simulation {
    pub mod agents;
    pub mod call_panel;
}
pub mod utils {
    pub mod client_ip;
    pub mod clock;
    pub mod contact_emails;
    pub mod contact_limiter;
}
pub mod jobs {
    pub mod maintenance;
}

use api::mailer::{Mailer, SmtpMailer};
use api::vapi::{TelephonyClient, VapiClient};
use config::Config;
use handlers::call_handlers::{self, CallLimiter};
use handlers::{contact_handlers, demo_handlers};
use repositories::rate_store::MemoryRateStore;
use simulation::agents::default_roster;
use simulation::call_panel::{CallSimulator, OutcomePolicy, WeightedOutcome};
use utils::clock::{Clock, SystemClock};
use utils::contact_limiter::{ContactLimiter, ContactLimits};

pub struct AppState {
    pub config: Config,
    pub contact_limiter: ContactLimiter,
    pub call_limiter: CallLimiter,
    pub mailer: Option<Arc<dyn Mailer>>,
    pub telephony: Option<Arc<dyn TelephonyClient>>,
    pub call_panel: Mutex<CallSimulator>,
}

impl AppState {
    pub fn new(
        config: Config,
        clock: Arc<dyn Clock>,
        mailer: Option<Arc<dyn Mailer>>,
        telephony: Option<Arc<dyn TelephonyClient>>,
        outcomes: Box<dyn OutcomePolicy>,
    ) -> Self {
        let contact_limiter = ContactLimiter::new(
            Arc::new(MemoryRateStore::new()),
            clock.clone(),
            ContactLimits::default(),
        );
        let call_panel = CallSimulator::new(default_roster(), clock, outcomes);
        Self {
            config,
            contact_limiter,
            call_limiter: call_handlers::call_limiter(),
            mailer,
            telephony,
            call_panel: Mutex::new(call_panel),
        }
    }

    /// Wires the real SMTP and telephony clients for whichever credentials
    /// are present in `config`. A mailer that cannot be built leaves only
    /// `/api/contact` unavailable.
    pub fn from_config(config: Config) -> Self {
        let mailer = match &config.smtp {
            Some(smtp) => match SmtpMailer::new(smtp) {
                Ok(mailer) => Some(Arc::new(mailer) as Arc<dyn Mailer>),
                Err(e) => {
                    tracing::error!("Failed to set up SMTP mailer, /api/contact will answer 500: {}", e);
                    None
                }
            },
            None => {
                tracing::warn!("SMTP credentials missing, /api/contact will answer 500");
                None
            }
        };
        let telephony = match &config.vapi {
            Some(vapi) => Some(Arc::new(VapiClient::new(vapi.clone())) as Arc<dyn TelephonyClient>),
            None => {
                tracing::warn!("VAPI credentials missing, /api/call will answer 500");
                None
            }
        };
        Self::new(
            config,
            Arc::new(SystemClock),
            mailer,
            telephony,
            Box::new(WeightedOutcome::new()),
        )
    }
}

async fn health_check() -> &'static str {
    "OK"
}

pub fn build_router(state: Arc<AppState>) -> Router {
    let frontend_origin = HeaderValue::from_str(&state.config.frontend_url).unwrap_or_else(|e| {
        tracing::warn!("Invalid FRONTEND_URL {}: {}", state.config.frontend_url, e);
        HeaderValue::from_static("http://localhost:8080")
    });

    let demo_routes = Router::new()
        .route("/api/demo/agents", get(demo_handlers::list_agents))
        .route("/api/demo/call", get(demo_handlers::get_call))
        .route("/api/demo/call/hangup", post(demo_handlers::hang_up))
        .route("/api/demo/call/retry", post(demo_handlers::retry_call))
        .route("/api/demo/call/{agent_id}", post(demo_handlers::start_call));

    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/call", post(call_handlers::trigger_call))
        .route("/api/contact", post(contact_handlers::submit_contact))
        .merge(demo_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(
            CorsLayer::new()
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_origin(AllowOrigin::exact(frontend_origin))
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::ACCEPT,
                    axum::http::header::ORIGIN,
                ]),
        )
        .with_state(state)
}
