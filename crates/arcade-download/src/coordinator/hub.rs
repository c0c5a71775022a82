//! Event fan-out to presentation subscribers.
//!
//! Every subscriber owns an unbounded queue that never blocks the producer.
//! Status frames are always appended. A progress frame replaces the newest
//! pending progress frame for the same package, provided no status frame for
//! that package has been queued after it, so a slow subscriber sees the
//! latest progress without ever losing a transition.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::sync::Notify;

use arcade_core::{InstallEvent, InstallEventEmitterPort};

#[derive(Default)]
struct SubscriberQueue {
    frames: Mutex<VecDeque<InstallEvent>>,
    notify: Notify,
    closed: AtomicBool,
}

impl SubscriberQueue {
    fn push(&self, event: InstallEvent) {
        {
            let mut frames = self.frames.lock().unwrap_or_else(PoisonError::into_inner);
            if !coalesce(&mut frames, &event) {
                frames.push_back(event);
            }
        }
        self.notify.notify_one();
    }

    fn pop(&self) -> Option<InstallEvent> {
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front()
    }

    fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.notify.notify_one();
    }
}

/// Replace the pending progress frame for the same package, if any.
fn coalesce(frames: &mut VecDeque<InstallEvent>, event: &InstallEvent) -> bool {
    if !event.status.is_coalescible() {
        return false;
    }
    for frame in frames.iter_mut().rev() {
        if frame.package_id != event.package_id {
            continue;
        }
        if frame.status.is_coalescible() {
            *frame = event.clone();
            return true;
        }
        return false;
    }
    false
}

#[derive(Default)]
struct HubInner {
    subscribers: Mutex<Vec<Weak<SubscriberQueue>>>,
}

impl Drop for HubInner {
    fn drop(&mut self) {
        let subscribers = self
            .subscribers
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for queue in subscribers.drain(..).filter_map(|w| w.upgrade()) {
            queue.close();
        }
    }
}

/// Broadcasts install events to any number of subscribers.
///
/// Cloning is cheap; all clones share the same subscriber set. When the last
/// clone is dropped, subscriptions drain their remaining frames and then end.
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<HubInner>,
}

impl EventHub {
    /// Create a hub with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new subscriber. It sees events emitted from now on.
    pub fn subscribe(&self) -> EventSubscription {
        let queue = Arc::new(SubscriberQueue::default());
        self.inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::downgrade(&queue));
        EventSubscription { queue }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|w| w.strong_count() > 0);
        subscribers.len()
    }

    /// Deliver one event to every live subscriber.
    pub fn publish(&self, event: InstallEvent) {
        let mut subscribers = self
            .inner
            .subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|weak| match weak.upgrade() {
            Some(queue) => {
                queue.push(event.clone());
                true
            }
            None => false,
        });
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub").finish_non_exhaustive()
    }
}

impl InstallEventEmitterPort for EventHub {
    fn emit(&self, event: InstallEvent) {
        self.publish(event);
    }

    fn clone_box(&self) -> Box<dyn InstallEventEmitterPort> {
        Box::new(self.clone())
    }
}

/// Receiving end of an [`EventHub`] subscription.
pub struct EventSubscription {
    queue: Arc<SubscriberQueue>,
}

impl EventSubscription {
    /// Wait for the next event. Returns `None` once the hub is gone and the
    /// queue has drained.
    pub async fn recv(&mut self) -> Option<InstallEvent> {
        loop {
            if let Some(event) = self.queue.pop() {
                return Some(event);
            }
            if self.queue.closed.load(Ordering::Acquire) {
                return self.queue.pop();
            }
            self.queue.notify.notified().await;
        }
    }

    /// Take the next event without waiting.
    pub fn try_recv(&mut self) -> Option<InstallEvent> {
        self.queue.pop()
    }

    /// Take every pending event.
    pub fn drain(&mut self) -> Vec<InstallEvent> {
        let mut frames = self
            .queue
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        frames.drain(..).collect()
    }

    /// Number of pending events.
    pub fn pending(&self) -> usize {
        self.queue
            .frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl std::fmt::Debug for EventSubscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventSubscription")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arcade_core::{EventStatus, PackageId, SessionKind};

    fn progress(id: &str, bytes: u64) -> InstallEvent {
        InstallEvent::progress(
            &PackageId::from(id),
            SessionKind::Install,
            "Primary",
            bytes,
            Some(100),
            1.0,
        )
    }

    fn started(id: &str) -> InstallEvent {
        InstallEvent::started(&PackageId::from(id), SessionKind::Install)
    }

    #[test]
    fn test_progress_frames_coalesce() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();

        hub.publish(started("a"));
        hub.publish(progress("a", 10));
        hub.publish(progress("a", 20));
        hub.publish(progress("a", 30));

        let frames = sub.drain();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].status, EventStatus::Started);
        assert_eq!(frames[1].bytes_downloaded, 30);
    }

    #[test]
    fn test_status_frames_are_never_replaced() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();

        hub.publish(progress("a", 10));
        hub.publish(InstallEvent::extracting(
            &PackageId::from("a"),
            SessionKind::Install,
            10,
        ));
        hub.publish(progress("a", 20));

        let statuses: Vec<_> = sub.drain().into_iter().map(|e| e.status).collect();
        assert_eq!(
            statuses,
            vec![
                EventStatus::Progress,
                EventStatus::Extracting,
                EventStatus::Progress
            ]
        );
    }

    #[test]
    fn test_coalescing_is_per_package() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();

        hub.publish(progress("a", 10));
        hub.publish(progress("b", 5));
        hub.publish(progress("a", 20));

        let frames = sub.drain();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].package_id.as_str(), "a");
        assert_eq!(frames[0].bytes_downloaded, 20);
        assert_eq!(frames[1].package_id.as_str(), "b");
    }

    #[test]
    fn test_dropped_subscribers_are_pruned() {
        let hub = EventHub::new();
        let sub = hub.subscribe();
        assert_eq!(hub.subscriber_count(), 1);
        drop(sub);
        assert_eq!(hub.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_recv_ends_after_hub_dropped() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();
        hub.publish(started("a"));
        drop(hub);

        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_recv_wakes_on_publish() {
        let hub = EventHub::new();
        let mut sub = hub.subscribe();

        let publisher = hub.clone();
        let task = tokio::spawn(async move {
            tokio::task::yield_now().await;
            publisher.publish(started("a"));
        });

        let event = sub.recv().await.unwrap();
        assert_eq!(event.status, EventStatus::Started);
        task.await.unwrap();
    }
}
