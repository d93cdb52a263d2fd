//! Request-scoped access to the in-flight wide event.
//!
//! The builder lives in an `EventSlot` installed as tokio task-local state
//! for the duration of one request future. Task-locals follow the request
//! across `.await` points and worker threads, so concurrently handled
//! requests never see each other's slot.
//!
//! Work spawned onto a separate task does not inherit the slot. Grab the
//! handle with [`RequestContext::current`] and run the spawned future under
//! [`RequestContext::scope`] to carry it across.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::thread::{self, ThreadId};

use crate::event::record::WideEventBuilder;

tokio::task_local! {
    static CURRENT_EVENT: EventSlot;
}

/// Misuse of the request context.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ContextError {
    /// Accessed outside an initialized request, or after it was cleared.
    #[error("wide event not initialized for this request")]
    Uninitialized,
    /// Accessed from inside a closure that is already mutating the builder.
    #[error("wide event accessed re-entrantly")]
    Reentrant,
}

#[derive(Debug)]
struct SlotState {
    builder: Mutex<Option<WideEventBuilder>>,
    // Thread currently running a `with` closure.
    holder: Mutex<Option<ThreadId>>,
}

/// Shared handle to one request's builder.
///
/// Cloning the handle does not clone the builder. Once the request boundary
/// clears the slot, every clone reports [`ContextError::Uninitialized`].
/// Only the boundary can detach the builder:
///
/// ```compile_fail
/// use wide_events::event::{RequestContext, ServiceInfo, WideEvent};
///
/// let slot = RequestContext::init(WideEvent::builder("req", "trace", ServiceInfo::default()));
/// slot.clear();
/// ```
#[derive(Debug, Clone)]
pub struct EventSlot {
    inner: Arc<SlotState>,
}

/// Resets the holder before the builder lock is released.
struct HolderMark<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for HolderMark<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }
}

impl EventSlot {
    fn new(builder: WideEventBuilder) -> Self {
        Self {
            inner: Arc::new(SlotState {
                builder: Mutex::new(Some(builder)),
                holder: Mutex::new(None),
            }),
        }
    }

    fn holder(&self) -> MutexGuard<'_, Option<ThreadId>> {
        self.inner.holder.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // A handler that panicked mid-update still leaves a usable record, so
    // poisoning is ignored. Contention from other threads waits; a nested
    // call from the thread running a `with` closure is refused.
    fn lock(&self) -> Result<MutexGuard<'_, Option<WideEventBuilder>>, ContextError> {
        match self.inner.builder.try_lock() {
            Ok(guard) => Ok(guard),
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => {
                if *self.holder() == Some(thread::current().id()) {
                    return Err(ContextError::Reentrant);
                }
                Ok(self.inner.builder.lock().unwrap_or_else(PoisonError::into_inner))
            }
        }
    }

    /// Mutate the builder.
    ///
    /// Re-entering the context from inside `f` yields
    /// [`ContextError::Reentrant`].
    pub fn with<R>(&self, f: impl FnOnce(&mut WideEventBuilder) -> R) -> Result<R, ContextError> {
        let mut guard = self.lock()?;
        let builder = guard.as_mut().ok_or(ContextError::Uninitialized)?;
        *self.holder() = Some(thread::current().id());
        let _mark = HolderMark(&self.inner.holder);
        Ok(f(builder))
    }

    /// Whether the builder is still attached.
    pub fn is_active(&self) -> bool {
        match self.lock() {
            Ok(guard) => guard.is_some(),
            Err(_) => true,
        }
    }

    /// Detach the builder. Returns `None` if it was already detached.
    ///
    /// Reserved for the request boundary, which emits what it takes.
    pub(crate) fn clear(&self) -> Option<WideEventBuilder> {
        self.lock().ok().and_then(|mut guard| guard.take())
    }
}

/// Entry points for the task-local context.
pub struct RequestContext;

impl RequestContext {
    /// Create the slot for a new request.
    pub fn init(builder: WideEventBuilder) -> EventSlot {
        EventSlot::new(builder)
    }

    /// Run `future` with `slot` as the current request context.
    pub async fn scope<F: Future>(slot: EventSlot, future: F) -> F::Output {
        CURRENT_EVENT.scope(slot, future).await
    }

    /// Run a synchronous closure with `slot` as the current request context.
    pub fn sync_scope<R>(slot: EventSlot, f: impl FnOnce() -> R) -> R {
        CURRENT_EVENT.sync_scope(slot, f)
    }

    /// Handle to the calling request's builder.
    pub fn current() -> Result<EventSlot, ContextError> {
        let slot = CURRENT_EVENT
            .try_with(EventSlot::clone)
            .map_err(|_| ContextError::Uninitialized)?;
        let active = slot.lock()?.is_some();
        if active {
            Ok(slot)
        } else {
            Err(ContextError::Uninitialized)
        }
    }

    /// Mutate the calling request's builder.
    pub fn with_current<R>(f: impl FnOnce(&mut WideEventBuilder) -> R) -> Result<R, ContextError> {
        CURRENT_EVENT
            .try_with(|slot| slot.with(f))
            .map_err(|_| ContextError::Uninitialized)?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::record::{ServiceInfo, WideEvent};

    fn builder(request_id: &str) -> WideEventBuilder {
        WideEvent::builder(request_id, "trace", ServiceInfo::default())
    }

    #[test]
    fn test_current_outside_request_fails() {
        assert_eq!(RequestContext::current().unwrap_err(), ContextError::Uninitialized);
        let res = RequestContext::with_current(|b| b.request_id().to_string());
        assert_eq!(res, Err(ContextError::Uninitialized));
    }

    #[test]
    fn test_sync_scope_reaches_builder() {
        let slot = RequestContext::init(builder("req00001"));
        let id = RequestContext::sync_scope(slot.clone(), || {
            RequestContext::with_current(|b| {
                b.user_id("user_42");
                b.request_id().to_string()
            })
        });
        assert_eq!(id.unwrap(), "req00001");

        let taken = slot.clear().unwrap();
        assert_eq!(taken.peek().user.user_id.as_deref(), Some("user_42"));
    }

    #[test]
    fn test_cleared_slot_is_uninitialized() {
        let slot = RequestContext::init(builder("req00002"));
        let escaped = slot.clone();
        assert!(slot.clear().is_some());
        assert!(slot.clear().is_none());

        assert!(!escaped.is_active());
        assert_eq!(escaped.with(|_| ()), Err(ContextError::Uninitialized));

        let inside = RequestContext::sync_scope(slot, RequestContext::current);
        assert_eq!(inside.unwrap_err(), ContextError::Uninitialized);
    }

    #[test]
    fn test_nested_access_is_refused_not_deadlocked() {
        let slot = RequestContext::init(builder("req00003"));
        let nested = RequestContext::sync_scope(slot.clone(), || {
            RequestContext::with_current(|b| {
                b.user_id("user_7");
                (
                    RequestContext::current().map(|_| ()),
                    RequestContext::with_current(|_| ()),
                )
            })
        });
        let (current, inner) = nested.unwrap();
        assert_eq!(current, Err(ContextError::Reentrant));
        assert_eq!(inner, Err(ContextError::Reentrant));

        // The slot is usable again once the outer closure returns.
        assert!(slot.is_active());
        assert_eq!(slot.with(|b| b.peek().user.user_id.clone()).unwrap().as_deref(), Some("user_7"));
    }

    #[test]
    fn test_other_threads_wait_for_the_lock() {
        let slot = RequestContext::init(builder("req00004"));
        let other = slot.clone();
        let handle = slot
            .with(|b| {
                b.cart_item_count(1);
                let handle = std::thread::spawn(move || {
                    other.with(|b| b.cart_item_count(2).peek().cart.cart_item_count)
                });
                std::thread::sleep(std::time::Duration::from_millis(20));
                handle
            })
            .unwrap();

        assert_eq!(handle.join().unwrap(), Ok(Some(2)));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_requests_are_isolated() {
        let mut handles = Vec::new();
        for i in 0..32u32 {
            handles.push(tokio::spawn(async move {
                let slot = RequestContext::init(builder(&format!("req{i:05}")));
                RequestContext::scope(slot.clone(), async move {
                    RequestContext::with_current(|b| {
                        b.cart_item_count(i);
                    })
                    .unwrap();
                    tokio::task::yield_now().await;
                    tokio::time::sleep(std::time::Duration::from_millis(5)).await;
                    RequestContext::with_current(|b| {
                        b.custom("seen", i);
                    })
                    .unwrap();
                })
                .await;
                (i, slot.clear().unwrap())
            }));
        }

        for handle in handles {
            let (i, builder) = handle.await.unwrap();
            let event = builder.peek();
            assert_eq!(event.request_id, format!("req{i:05}"));
            assert_eq!(event.cart.cart_item_count, Some(i));
            assert_eq!(event.custom["seen"], serde_json::json!(i));
        }
    }
}
