//! Live follower: keeps a shared projector in step with a running ledger.
//!
//! The follower subscribes first and catches up from the log second, so no
//! event can fall between the two. Anything seen twice is skipped by the
//! projector. When the broadcast buffer overflows (`Lagged`) or an event
//! arrives ahead of the view, it catches up from the log again.

use std::sync::Arc;

use openlot_settlement::LedgerHandle;
use openlot_types::{OpenlotError, Result};
use tokio::sync::RwLock;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

use crate::projector::ViewProjector;

/// Run until the ledger's event feed closes.
///
/// # Errors
/// - `ServiceUnavailable` if the ledger stops while catching up
/// - any non-gap error from the projector
pub async fn follow(handle: LedgerHandle, projector: Arc<RwLock<ViewProjector>>) -> Result<()> {
    let mut feed = handle.subscribe().await?;
    catch_up(&handle, &projector).await?;

    loop {
        match feed.recv().await {
            Ok(event) => {
                let applied = projector.write().await.apply(&event);
                match applied {
                    Ok(_) => {}
                    Err(OpenlotError::EventGap { expected, got }) => {
                        debug!(expected = %expected, got = %got, "View behind feed, catching up");
                        catch_up(&handle, &projector).await?;
                    }
                    Err(e) => return Err(e),
                }
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Event feed lagged, catching up from log");
                catch_up(&handle, &projector).await?;
            }
            Err(RecvError::Closed) => {
                let next_seq = projector.read().await.next_seq();
                info!(next_seq = %next_seq, "Event feed closed, follower stopping");
                return Ok(());
            }
        }
    }
}

/// Apply every logged event the projector has not seen yet. Returns how
/// many were applied.
///
/// # Errors
/// Returns `ServiceUnavailable` if the ledger has stopped, or the first
/// projector error.
pub async fn catch_up(handle: &LedgerHandle, projector: &RwLock<ViewProjector>) -> Result<usize> {
    let from = projector.read().await.next_seq();
    let events = handle.events_since(from).await?;
    let mut view = projector.write().await;
    let mut applied = 0;
    for event in &events {
        if view.apply(event)? {
            applied += 1;
        }
    }
    if applied > 0 {
        debug!(from = %from, applied, "Caught up from log");
    }
    Ok(applied)
}
