pub mod api;
pub mod models;

pub use api::{ReactionAction, SortBy};
pub use models::Message;
