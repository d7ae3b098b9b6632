//! Device-integrity proof seam.

use async_trait::async_trait;

/// Produces a platform integrity token for device attestation.
///
/// The concrete implementation wraps whatever integrity service the platform
/// offers; this core only forwards the configured project/app ids and submits
/// the resulting token to the backend.
#[async_trait]
pub trait DeviceAttestor: Send + Sync {
    async fn integrity_token(
        &self,
        cloud_project_id: Option<&str>,
        app_id: Option<&str>,
    ) -> Result<String, String>;
}
