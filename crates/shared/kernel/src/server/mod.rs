//! Axum glue shared by the feature routers.

pub mod error;
pub mod extract;
mod health;
pub mod router;
pub mod state;

pub use error::{ApiError, ApiResult, ErrorBody};
pub use state::{ApiState, ApiStateBuilder, ApiStateError};
