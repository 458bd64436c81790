pub mod auth;
pub mod error_detail;
pub mod rate_limit;
pub mod response;

pub use auth::{authenticate, require_roles, AuthContext};
pub use error_detail::expose_error_detail;
pub use rate_limit::{rate_limit, RateLimiter};
pub use response::{ApiResponse, ApiResult};
