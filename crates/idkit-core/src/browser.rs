//! Platform browser-launcher seam.

/// Opens external verification URLs in the platform browser.
///
/// Launching is fire-and-forget. The platform later reports back through the
/// owning bridge's `complete_*` entry point with the callback URI, or never,
/// if the user abandoned the flow (the next `begin` supersedes the stale
/// operation in that case).
pub trait BrowserLauncher: Send + Sync {
    fn launch(&self, url: &str);
}
