pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod video;

pub use routes::create_router;
pub use video::{ApiError, ErrorResponse};
