//! Bid validation
//!
//! Pure structural checks performed before any broker I/O.

use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use thiserror::Error;

use crate::dto::bid::Bid;

pub const INVALID_BID_MESSAGE: &str = "Invalid bid. Missing ItemId or bid details.";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("bid is missing an ItemId")]
    MissingItemId,
}

impl ResponseError for ValidationError {
    fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .content_type("text/plain; charset=utf-8")
            .body(INVALID_BID_MESSAGE)
    }
}

/// A bid whose `ItemId` is known to be present and non-blank.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidBid {
    item_id: String,
    bid: Bid,
}

impl ValidBid {
    pub fn item_id(&self) -> &str {
        &self.item_id
    }

    pub fn bid(&self) -> &Bid {
        &self.bid
    }
}

/// Accept a bid only if it exists and carries a non-blank `ItemId`.
///
/// `None` stands for a request body that was `null`. Nothing besides the
/// identifier is inspected.
pub fn validate(raw: Option<Bid>) -> Result<ValidBid, ValidationError> {
    let bid = raw.ok_or(ValidationError::MissingItemId)?;

    let item_id = match bid.item_id() {
        Some(id) if !id.trim().is_empty() => id.to_owned(),
        _ => return Err(ValidationError::MissingItemId),
    };

    Ok(ValidBid { item_id, bid })
}
