pub mod error;
pub mod messages;
pub mod router;
pub mod state;

pub use error::ApiError;
pub use router::build_router;
pub use state::{AppState, AppStateInner};
