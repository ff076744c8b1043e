pub mod bid_ingress;
pub mod bootstrap;
pub mod broker;
pub mod config;
pub mod dto;
pub mod jwt;
pub mod routing;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use bootstrap::{connect_broker, init_tracing, load_dotenv};

use actix_web::web;

use bid_ingress::{bid_json_config, route_bid, version};
use jwt::JwtAuth;

/// Configure all routes for the application
///
/// `POST /bid` sits behind the bearer-token gate; `GET /bid/version` is anonymous.
pub fn configure_routes(cfg: &mut web::ServiceConfig, auth: JwtAuth) {
    cfg.service(web::resource("/bid/version").route(web::get().to(version)))
        .service(
            web::resource("/bid")
                .app_data(bid_json_config())
                .wrap(auth)
                .route(web::post().to(route_bid)),
        );
}
