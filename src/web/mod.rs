//! Web server module
//!
//! Exposes insight search, usage and operational endpoints over HTTP.

mod error;
mod handlers;
mod routes;
mod state;

pub use error::{ApiError, ErrorBody};
pub use handlers::{CallerId, InsightRequest, InsightResponse, USER_ID_HEADER};
pub use routes::create_router;
pub use state::AppState;
