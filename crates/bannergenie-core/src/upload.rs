//! ImageHost trait definition.

use bannergenie_types::error::DesignError;

/// Publishes raw image bytes and returns a public URL the render service can
/// fetch.
///
/// Failures surface as `DesignError::UploadFailed` carrying the host's own
/// message where it gave one.
pub trait ImageHost: Send + Sync {
    fn upload(
        &self,
        bytes: &[u8],
    ) -> impl std::future::Future<Output = Result<String, DesignError>> + Send;
}
