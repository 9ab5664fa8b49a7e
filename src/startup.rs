use axum::{
    http::Method,
    response::IntoResponse,
    routing::{get, post},
    Router,
};
use color_eyre::eyre::Context;
use tokio::net::TcpListener;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{
    config::Config,
    utils::state::AppState,
    web::handlers::{
        accept_subscription, authorize, authorize_batch, pending_requests, reject_subscription,
        subscribers,
    },
};

async fn welcome() -> impl IntoResponse {
    "Subscription Gateway"
}

async fn health_check() -> impl IntoResponse {
    "OK"
}

pub struct HttpServer {
    listener: TcpListener,
    router: Router,
}

impl HttpServer {
    pub async fn new(config: &Config, state: AppState) -> color_eyre::Result<Self> {
        let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port))
            .await
            .wrap_err_with(|| format!("Failed to bind to port {}", config.server.port))?;

        Ok(Self {
            router: router(state),
            listener,
        })
    }

    pub async fn run(self) -> color_eyre::Result<()> {
        tracing::info!("listening on {}", self.listener.local_addr()?);
        axum::serve(self.listener, self.router)
            .await
            .wrap_err("Failed to start HTTP server")?;
        Ok(())
    }
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_origin(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(welcome))
        .route("/health", get(health_check))
        .nest("/authorize", authorization_routes())
        .nest("/subscriptions", subscription_routes())
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::new())
        .layer(cors)
        .with_state(state)
}

fn authorization_routes() -> Router<AppState> {
    Router::new()
        .route("/batch", post(authorize_batch))
        .route("/{creator_id}", get(authorize))
}

fn subscription_routes() -> Router<AppState> {
    Router::new()
        .route("/accept", post(accept_subscription))
        .route("/reject", post(reject_subscription))
        .route("/pending/{subscriber_id}", get(pending_requests))
        .route("/subscribers/{creator_id}", get(subscribers))
}
