//! Routing core
//!
//! `validator` decides whether a bid is well-formed; `router` resolves the
//! per-item queue, checks that it exists and publishes the bid to it.

pub mod router;
pub mod validator;

pub use router::{BidRouter, QueueName, RouteError, RouteOutcome};
pub use validator::{validate, ValidBid, ValidationError};
