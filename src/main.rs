use actix_cors::Cors;
use actix_web::{http::header, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::{error, info};
use tracing_actix_web::TracingLogger;

use bid_ingress::broker::QueueBroker;
use bid_ingress::config::AppConfig;
use bid_ingress::jwt::JwtAuth;
use bid_ingress::routing::BidRouter;
use bid_ingress::{configure_routes, connect_broker, init_tracing, load_dotenv};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();
    init_tracing();

    let config = AppConfig::from_env()?;

    info!("Starting bid ingress server...");

    // No broker session, no service.
    let broker = connect_broker(&config).await?;
    let router = web::Data::new(BidRouter::new(broker.clone() as Arc<dyn QueueBroker>));

    let cors_origin = config.cors_allowed_origin.clone();
    let auth_secret = config.auth_secret.clone();

    let server = HttpServer::new(move || {
        let cors = Cors::default()
            .allowed_origin(&cors_origin)
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec![header::AUTHORIZATION, header::ACCEPT])
            .allowed_header(header::CONTENT_TYPE)
            .supports_credentials()
            .max_age(3600);

        let auth = JwtAuth::new(&auth_secret);

        App::new()
            .wrap(cors)
            .wrap(TracingLogger::default())
            .app_data(router.clone())
            .configure(|cfg| configure_routes(cfg, auth))
    })
    .bind((config.bind_addr.as_str(), config.port))
    .with_context(|| format!("failed to bind {}:{}", config.bind_addr, config.port))?
    .run();

    info!("Listening on {}:{}", config.bind_addr, config.port);
    let served = server.await;

    if let Err(err) = broker.close().await {
        error!(error = %err, "Failed to close broker connection cleanly");
    }

    served.context("HTTP server terminated with an error")
}
