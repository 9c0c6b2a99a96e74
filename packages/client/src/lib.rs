//! Observer-side reconciliation for the training-job tracker.
//!
//! Merges authoritative snapshots (pull) with streamed deltas (push) into
//! one coherent, append-only view per job:
//! - `merge_event` - the pure reducer applying one delta to a view
//! - `ReconciliationStore` - the per-job view collection
//! - `SyncClient` - transport-generic connect/resubscribe/re-pull loop with
//!   a fixed-delay reconnect policy

mod store;
mod sync;
mod view;

pub use store::ReconciliationStore;
pub use sync::{PushConnection, PushTransport, RetryPolicy, SnapshotApi, SyncClient, TransportError};
pub use view::{JobView, merge_event};
