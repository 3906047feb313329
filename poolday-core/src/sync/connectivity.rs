//! Sync on reconnect.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::remote::ServiceRecordStore;
use crate::sync::{SyncCoordinator, SyncRun};

/// Run one sync per offline→online transition of `online`.
///
/// Repeated `true` values and the initial state do not trigger a run; only
/// an observed edge from offline to online does. The task ends when the
/// sender is dropped.
pub fn spawn_reconnect_sync<S>(
    coordinator: Arc<SyncCoordinator<S>>,
    mut online: watch::Receiver<bool>,
) -> JoinHandle<()>
where
    S: ServiceRecordStore + 'static,
{
    tokio::spawn(async move {
        let mut was_online = *online.borrow_and_update();

        while online.changed().await.is_ok() {
            let is_online = *online.borrow_and_update();
            let reconnected = is_online && !was_online;
            was_online = is_online;

            if !reconnected {
                continue;
            }

            debug!("connectivity restored, syncing offline queue");
            match coordinator.sync().await {
                Ok(SyncRun::Drained(_)) => {}
                Ok(SyncRun::Coalesced) => debug!("reconnect sync coalesced into running drain"),
                Err(e) => warn!(error = %e, "reconnect sync failed"),
            }
        }
    })
}
