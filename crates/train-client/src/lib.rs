/// Train of Thought client runtime.
///
/// Hosts the story engine on tokio and connects its message board to the
/// server:
/// - HTTP client for the message service, behind the `MessageApi` trait
/// - Offline store and write-ahead outbox for when the server is unreachable
/// - Frame loop that drives the experience and fulfils board requests

pub mod api;
pub mod driver;
pub mod error;
pub mod outbox;
pub mod store;
pub mod sync;

#[cfg(test)]
mod testing;

pub use api::{HttpMessageApi, MessageApi};
pub use driver::{Driver, HostInput};
pub use error::ClientError;
pub use outbox::{Outbox, PendingMessage};
pub use store::LocalStore;
pub use sync::{BoardSync, Source, Submitted};
