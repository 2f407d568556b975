use crate::error::HearthError;
use crate::ledger::RequestLedger;
use crate::registry::RoomRegistry;
use crate::request::{FriendRequest, RoomJoinRequest};
use crate::room::Room;
use crate::store::{Collection, DocumentStore};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::warn;

/// Handle for an active subscription. Dropping it (or calling
/// [`unsubscribe`](Self::unsubscribe)) stops future emissions; data
/// already delivered is never retracted.
pub struct Subscription {
    handle: JoinHandle<()>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        self.handle.abort();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Pushes live snapshots of pending requests and room membership to
/// registered observers.
///
/// Observes the store's change feed independently of the coordinator's
/// direct callers. Each subscription emits the current snapshot
/// immediately, then re-emits whenever a write to the watched
/// collection changes the filtered set. Emissions within one stream
/// never go backward: every snapshot is read after the write that
/// triggered it.
#[derive(Clone)]
pub struct ChangeNotifier {
    store: Arc<dyn DocumentStore>,
    ledger: RequestLedger,
    registry: RoomRegistry,
}

impl ChangeNotifier {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        let ledger = RequestLedger::new(store.clone());
        let registry = RoomRegistry::new(store.clone());
        Self {
            store,
            ledger,
            registry,
        }
    }

    /// Watch the pending friend requests addressed to `user_id`.
    pub fn subscribe_pending_friend_requests<F>(&self, user_id: &str, on_change: F) -> Subscription
    where
        F: Fn(Vec<FriendRequest>) + Send + 'static,
    {
        let ledger = self.ledger.clone();
        let user_id = user_id.to_string();
        Self::spawn_watch(
            self.store.clone(),
            Collection::FriendRequests,
            move || {
                let ledger = ledger.clone();
                let user_id = user_id.clone();
                async move { ledger.pending_friend_requests(&user_id).await }
            },
            on_change,
        )
    }

    /// Watch the pending join requests for rooms owned by `owner_id`.
    pub fn subscribe_pending_join_requests<F>(&self, owner_id: &str, on_change: F) -> Subscription
    where
        F: Fn(Vec<RoomJoinRequest>) + Send + 'static,
    {
        let ledger = self.ledger.clone();
        let owner_id = owner_id.to_string();
        Self::spawn_watch(
            self.store.clone(),
            Collection::JoinRequests,
            move || {
                let ledger = ledger.clone();
                let owner_id = owner_id.clone();
                async move { ledger.pending_join_requests(&owner_id).await }
            },
            on_change,
        )
    }

    /// Watch the rooms `user_id` is a member of.
    pub fn subscribe_user_rooms<F>(&self, user_id: &str, on_change: F) -> Subscription
    where
        F: Fn(Vec<Room>) + Send + 'static,
    {
        let registry = self.registry.clone();
        let user_id = user_id.to_string();
        Self::spawn_watch(
            self.store.clone(),
            Collection::Rooms,
            move || {
                let registry = registry.clone();
                let user_id = user_id.clone();
                async move { registry.get_user_rooms(&user_id).await }
            },
            on_change,
        )
    }

    fn spawn_watch<T, Q, Fut, F>(
        store: Arc<dyn DocumentStore>,
        collection: Collection,
        query: Q,
        on_change: F,
    ) -> Subscription
    where
        T: PartialEq + Clone + Send + 'static,
        Q: Fn() -> Fut + Send + 'static,
        Fut: Future<Output = Result<Vec<T>, HearthError>> + Send,
        F: Fn(Vec<T>) + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            // Subscribe before the initial read so a write landing in
            // between is re-read, never missed.
            let mut events = store.watch();

            let mut last = match query().await {
                Ok(items) => {
                    on_change(items.clone());
                    Some(items)
                }
                Err(e) => {
                    warn!(%collection, error = %e, "initial snapshot failed");
                    None
                }
            };

            loop {
                match events.recv().await {
                    Ok(touched) if touched == collection => {}
                    Ok(_) => continue,
                    // Missed events are safe to coalesce: the next
                    // snapshot reflects everything up to now.
                    Err(RecvError::Lagged(missed)) => {
                        warn!(%collection, missed, "change feed lagged, re-reading");
                    }
                    Err(RecvError::Closed) => break,
                }

                match query().await {
                    Ok(items) => {
                        if last.as_ref() != Some(&items) {
                            on_change(items.clone());
                            last = Some(items);
                        }
                    }
                    Err(e) => warn!(%collection, error = %e, "snapshot query failed"),
                }
            }
        });

        Subscription { handle }
    }
}
