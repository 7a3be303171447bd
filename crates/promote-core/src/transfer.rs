//! Download-then-push of package archives.

use std::path::PathBuf;

use promote_schema::PackageIdentity;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;

use crate::cancel::{check, guard};
use crate::error::PromoteError;
use crate::feed::Feed;
use crate::reporter::Reporter;

pub struct TransferPipeline<'a> {
    source: &'a dyn Feed,
    destination: &'a dyn Feed,
    reporter: &'a dyn Reporter,
    temp_dir: Option<PathBuf>,
}

impl<'a> TransferPipeline<'a> {
    pub fn new(source: &'a dyn Feed, destination: &'a dyn Feed, reporter: &'a dyn Reporter) -> Self {
        Self {
            source,
            destination,
            reporter,
            temp_dir: None,
        }
    }

    /// Stage archives in `dir` instead of the system temporary directory.
    #[must_use]
    pub fn with_temp_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.temp_dir = Some(dir.into());
        self
    }

    /// Copy one package from the source to the destination.
    ///
    /// The archive is staged in a temporary file that is removed when this
    /// returns, whatever the outcome. Pushing a version the destination
    /// already has is not an error.
    pub async fn promote_one(
        &self,
        identity: &PackageIdentity,
        cancel: &CancellationToken,
    ) -> Result<(), PromoteError> {
        check(cancel)?;

        let prefix = format!("{}.", identity.id.to_lowercase());
        let mut builder = tempfile::Builder::new();
        builder.prefix(&prefix).suffix(".nupkg");
        let staged = match &self.temp_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };

        let mut file = tokio::fs::File::from_std(staged.reopen()?);
        guard(cancel, self.source.copy_archive(identity, &mut file))
            .await
            .map_err(|e| match e {
                PromoteError::Feed(source) => PromoteError::Download {
                    identity: identity.clone(),
                    source,
                },
                other => other,
            })?;
        file.flush().await?;
        drop(file);

        tracing::debug!("Staged {} at {}", identity, staged.path().display());

        guard(cancel, self.destination.push_archive(staged.path(), true))
            .await
            .map_err(|e| match e {
                PromoteError::Feed(source) => PromoteError::Push {
                    identity: identity.clone(),
                    source,
                },
                other => other,
            })?;

        tracing::info!("Pushed {} to {}", identity, self.destination.name());
        Ok(())
    }

    /// Promote `packages` in order, stopping at the first failure.
    ///
    /// Returns the number of packages transferred. Packages transferred
    /// before a failure stay at the destination.
    ///
    /// # Errors
    ///
    /// [`PromoteError::Transfer`] wrapping the first failure, or
    /// [`PromoteError::Cancelled`].
    pub async fn promote_all(
        &self,
        packages: &[PackageIdentity],
        cancel: &CancellationToken,
    ) -> Result<usize, PromoteError> {
        let total = packages.len();
        for (index, identity) in packages.iter().enumerate() {
            self.reporter.transferring(identity, index + 1, total);
            match self.promote_one(identity, cancel).await {
                Ok(()) => self.reporter.done(identity, "pushed"),
                Err(PromoteError::Cancelled) => return Err(PromoteError::Cancelled),
                Err(e) => {
                    self.reporter.failed(identity, &e.to_string());
                    return Err(PromoteError::Transfer {
                        completed: index,
                        total,
                        source: Box::new(e),
                    });
                }
            }
        }
        Ok(total)
    }
}
