use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::middleware;
use axum::routing::{delete, get, post};
use axum::Router;
use clap::Parser;
use cognisphere::{CogniSphere, GroqOracle};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod models;
mod rate_limit;
mod state;

use crate::rate_limit::RateLimiter;
use crate::state::AppState;

const RATE_WINDOW: Duration = Duration::from_secs(15 * 60);

#[derive(Parser, Debug)]
#[command(name = "cognisphere-server", about = "CogniSphere chat backend")]
struct Args {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 5000)]
    port: u16,

    /// Directory holding the SQLite database
    #[arg(long, env = "DATA_DIR", default_value = "./cognisphere_data")]
    data_dir: String,

    /// API key for the completion provider
    #[arg(long, env = "GROQ_API_KEY")]
    groq_api_key: String,

    /// Secret used to sign session tokens
    #[arg(long, env = "JWT_SECRET")]
    jwt_secret: String,

    /// Allowed CORS origin; permissive when unset
    #[arg(long, env = "FRONTEND_URL")]
    frontend_url: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,cognisphere=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    tracing::info!(data_dir = %args.data_dir, "initializing CogniSphere");

    let oracle = Arc::new(GroqOracle::new(args.groq_api_key));
    let system = CogniSphere::new(&args.data_dir, oracle, &args.jwt_secret).await?;
    let state = AppState {
        system: Arc::new(system),
    };

    let general_limit = RateLimiter::new(
        100,
        RATE_WINDOW,
        "Too many requests from this IP, please try again later.",
    );
    let auth_limit = RateLimiter::new(
        5,
        RATE_WINDOW,
        "Too many login attempts from this IP, please try again after 15 minutes.",
    );
    let chat_limit = RateLimiter::new(
        50,
        RATE_WINDOW,
        "Too many chat requests, please slow down and try again later.",
    );

    let auth_routes = Router::new()
        .route("/register", post(api::register))
        .route("/login", post(api::login))
        .route("/profile/:email", get(api::profile))
        .route_layer(middleware::from_fn_with_state(
            auth_limit,
            rate_limit::enforce,
        ));

    let chat_routes = Router::new()
        .route("/", post(api::chat))
        .route("/threads", get(api::list_threads))
        .route(
            "/threads/:thread_id",
            get(api::get_thread).delete(api::delete_thread),
        )
        .route_layer(middleware::from_fn_with_state(
            chat_limit,
            rate_limit::enforce,
        ));

    let memory_routes = Router::new()
        .route("/", post(api::upsert_memory))
        .route("/:user_id", get(api::get_memory))
        .route("/:user_id/context", get(api::memory_context))
        .route("/:user_id/:key", delete(api::delete_memory));

    let cors = match &args.frontend_url {
        Some(origin) => CorsLayer::new()
            .allow_origin(origin.parse::<HeaderValue>()?)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
        None => CorsLayer::new()
            .allow_origin(Any)
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    };

    let app = Router::new()
        .route("/", get(api::root))
        .route("/health", get(api::health_check))
        .nest("/api/auth", auth_routes)
        .nest("/api/chat", chat_routes)
        .nest("/api/memory", memory_routes)
        .route("/api/debate", post(api::debate))
        .route("/api/personalities", get(api::personalities))
        .layer(middleware::from_fn_with_state(
            general_limit,
            rate_limit::enforce,
        ))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], args.port));
    tracing::info!("CogniSphere server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
