pub mod cancel;
pub mod error;
pub mod feed;
pub mod license;
pub mod policy;
pub mod promote;
pub mod queue;
pub mod resolver;
pub mod transfer;
pub mod tree;

pub mod reporter;

#[cfg(test)]
pub(crate) mod testing;

pub use error::PromoteError;
pub use feed::{Feed, FeedError};
pub use reporter::{NullReporter, Reporter};
pub use tokio_util::sync::CancellationToken;

/// User Agent string for feed requests
pub const USER_AGENT: &str = concat!("promote/", env!("CARGO_PKG_VERSION"));
