use actix_web::{
    error::InternalError, web, HttpRequest, HttpResponse, ResponseError, Result as ActixResult,
};
use tracing::{info, warn};

use crate::dto::bid::Bid;
use crate::jwt::get_claims;
use crate::routing::router::ROUTED_MESSAGE;
use crate::routing::validator::INVALID_BID_MESSAGE;
use crate::routing::{validate, BidRouter, RouteOutcome};

/// Body extractor settings for the bid endpoint: anything that does not
/// parse into a bid gets the same 400 as a bid without an `ItemId`.
pub fn bid_json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!(error = %err, "Invalid bid. Body did not parse");
        let response = HttpResponse::BadRequest()
            .content_type("text/plain; charset=utf-8")
            .body(INVALID_BID_MESSAGE);
        InternalError::from_response(err, response).into()
    })
}

pub async fn route_bid(
    req: HttpRequest,
    body: web::Json<Option<Bid>>,
    router: web::Data<BidRouter>,
) -> ActixResult<HttpResponse> {
    let subject = get_claims(&req).map(|claims| claims.sub).unwrap_or_default();

    let bid = match validate(body.into_inner()) {
        Ok(bid) => bid,
        Err(err) => {
            warn!(subject = %subject, "Invalid bid. Missing ItemId or bid details.");
            return Ok(err.error_response());
        }
    };

    info!(subject = %subject, item_id = bid.item_id(), "Received bid");

    match router.route(&bid).await {
        Ok(RouteOutcome::Routed { .. }) => Ok(HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(ROUTED_MESSAGE)),
        Err(err) => Ok(err.error_response()),
    }
}

pub async fn version() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body(format!("{} {}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")))
}
