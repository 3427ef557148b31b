use actix_cors::Cors;
use actix_governor::{Governor, GovernorConfigBuilder};
use actix_web::{web, App, HttpServer};

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use payout_server::config::ServiceConfig;
use payout_server::{bootstrap, routes};

fn build_cors(origins: &[String]) -> Cors {
    if origins.is_empty() {
        // Default: allow localhost on any port
        Cors::default()
            .allowed_origin_fn(|origin, _| {
                origin
                    .to_str()
                    .map(|o| o == "http://localhost" || o.starts_with("http://localhost:"))
                    .unwrap_or(false)
            })
            .allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["content-type", "authorization"])
            .max_age(3600)
    } else {
        let mut cors = Cors::default();
        for origin in origins {
            cors = cors.allowed_origin(origin);
        }
        cors.allowed_methods(vec!["GET", "POST"])
            .allowed_headers(vec!["content-type", "authorization"])
            .max_age(3600)
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = match ServiceConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {e}");
            std::process::exit(1);
        }
    };

    let port = config.port;
    let rate_limit_rpm = config.rate_limit_rpm;
    let cors_origins = config.allowed_origins.clone();
    if config.metrics_token.is_none() && config.public_metrics {
        tracing::warn!("METRICS_TOKEN not set and PAYOUT_PUBLIC_METRICS=true; /metrics is public");
    }

    let state = match bootstrap::bootstrap(config).await {
        Ok(state) => web::Data::new(state),
        Err(e) => {
            tracing::error!("Startup failed: {e}");
            std::process::exit(1);
        }
    };

    tracing::info!("Payout server listening on port {port}");
    tracing::info!("Rate limit: {rate_limit_rpm} req/min per IP");
    tracing::info!("  GET  http://localhost:{port}/");
    tracing::info!("  GET  http://localhost:{port}/api/health");
    tracing::info!("  POST http://localhost:{port}/api/engine/start");
    tracing::info!("  POST http://localhost:{port}/api/engine/stop");
    tracing::info!("  POST http://localhost:{port}/api/engine/withdraw");

    let governor_conf = GovernorConfigBuilder::default()
        .requests_per_minute(rate_limit_rpm)
        .finish()
        .ok_or_else(|| std::io::Error::other("invalid RATE_LIMIT_RPM"))?;

    HttpServer::new(move || {
        App::new()
            .wrap(build_cors(&cors_origins))
            .wrap(Governor::new(&governor_conf))
            .app_data(state.clone())
            .service(routes::health)
            .service(routes::metrics_endpoint)
            .service(routes::chain_health)
            .service(routes::engine_start)
            .service(routes::engine_stop)
            .service(routes::withdraw)
    })
    .bind(("0.0.0.0", port))?
    .run()
    .await
}
