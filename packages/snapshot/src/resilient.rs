//! Two-state Live/Fallback loader.

use std::sync::Arc;

use crate::{Snapshot, SnapshotError, SnapshotOrigin, SnapshotSource};

/// Tries the live source, then the fallback source.
///
/// Holds no state between calls: every [`Self::load`] starts in Live.
#[derive(Clone)]
pub struct ResilientSource {
    live: Option<Arc<dyn SnapshotSource>>,
    fallback: Arc<dyn SnapshotSource>,
}

impl std::fmt::Debug for ResilientSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResilientSource")
            .field("live", &self.live.as_ref().map(|s| s.name().to_string()))
            .field("fallback", &self.fallback.name())
            .finish()
    }
}

impl ResilientSource {
    /// Creates a loader. With no `live` source every load is served from
    /// `fallback`.
    #[must_use]
    pub fn new(
        live: Option<Arc<dyn SnapshotSource>>,
        fallback: Arc<dyn SnapshotSource>,
    ) -> Self {
        Self { live, fallback }
    }

    /// Loads one snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Exhausted`] when both the live and the
    /// fallback source fail.
    pub async fn load(&self) -> Result<Snapshot, SnapshotError> {
        let live_error = match &self.live {
            Some(live) => match live.fetch().await {
                Ok(payload) => {
                    return Ok(Snapshot {
                        origin: SnapshotOrigin::Live,
                        payload,
                    });
                }
                Err(e) => {
                    log::warn!("Live fetch from {} failed: {e}", live.name());
                    e.to_string()
                }
            },
            None => "no live upstream configured".to_string(),
        };

        log::warn!("Serving fallback snapshot from {}", self.fallback.name());
        match self.fallback.fetch().await {
            Ok(payload) => Ok(Snapshot {
                origin: SnapshotOrigin::Fallback,
                payload,
            }),
            Err(e) => {
                log::error!(
                    "Fallback snapshot {} unavailable: {e}",
                    self.fallback.name()
                );
                Err(SnapshotError::Exhausted {
                    live: live_error,
                    fallback: e.to_string(),
                })
            }
        }
    }
}
