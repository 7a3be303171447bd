//! Cooperative cancellation helpers.
//!
//! The token is passed explicitly into every core entry point. Long-running
//! loops call [`check`] at item boundaries, and every feed call is raced
//! against the token with [`guard`].

use std::future::Future;

use tokio_util::sync::CancellationToken;

use crate::error::PromoteError;

/// Fail with [`PromoteError::Cancelled`] if the token has been cancelled.
pub fn check(cancel: &CancellationToken) -> Result<(), PromoteError> {
    if cancel.is_cancelled() {
        Err(PromoteError::Cancelled)
    } else {
        Ok(())
    }
}

/// Await `fut`, aborting early with [`PromoteError::Cancelled`] if the token
/// fires first. Errors from `fut` are converted into [`PromoteError`].
pub async fn guard<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, PromoteError>
where
    F: Future<Output = Result<T, E>>,
    PromoteError: From<E>,
{
    tokio::select! {
        biased;
        () = cancel.cancelled() => Err(PromoteError::Cancelled),
        result = fut => result.map_err(PromoteError::from),
    }
}
