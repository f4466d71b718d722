//! Best-effort pre-pull of node images.

use kindle_common::ClusterConfig;
use tracing::warn;

use crate::application::ports::{ImagePuller, ProgressReporter};
use crate::application::services::retry::{LinearBackoff, retry_with_backoff};

/// Image reference without its `@sha256:...` digest, for display.
#[must_use]
pub fn friendly_image_name(image: &str) -> &str {
    image.split_once('@').map_or(image, |(name, _)| name)
}

/// Pull every distinct node image of `config`, in sorted order.
///
/// Failures are reported and logged but never abort provisioning, since the
/// backend pulls missing images when it creates a node.
pub async fn ensure_node_images(
    puller: &impl ImagePuller,
    reporter: &impl ProgressReporter,
    config: &ClusterConfig,
    backoff: &LinearBackoff,
) {
    for image in config.required_node_images() {
        let friendly = friendly_image_name(image);
        reporter.start(&format!("Ensuring node image ({friendly})"));
        match retry_with_backoff(backoff, "pull node image", || puller.pull_image(image)).await {
            Ok(()) => reporter.end(true),
            Err(e) => {
                warn!(image = %image, error = %format!("{e:#}"), "unable to pull node image, continuing");
                reporter.end(false);
                reporter.warn(&format!(
                    "Could not pull {friendly}; node creation will try again"
                ));
            }
        }
    }
}
