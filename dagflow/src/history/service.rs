use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::api::config::HistoryConfig;
use crate::history::event::HistoryEvent;

/// Destination of history batches
#[async_trait]
pub trait TimelineClient: Send + Sync {
    async fn put_entities(&self, events: Vec<HistoryEvent>) -> anyhow::Result<()>;
}

/// Writes every event to the log
#[derive(Default, Debug)]
pub struct LoggingTimelineClient {}

#[async_trait]
impl TimelineClient for LoggingTimelineClient {
    async fn put_entities(&self, events: Vec<HistoryEvent>) -> anyhow::Result<()> {
        for event in events {
            info!("history {}", event.to_json()?);
        }
        Ok(())
    }
}

#[derive(Default, Debug)]
struct HistoryShared {
    /// queued or in flight, not yet acknowledged by the client
    pending: AtomicUsize,
    stopped: AtomicBool,
}

/// Cheap, cloneable entry point of a [`HistoryLoggingService`].
#[derive(Clone)]
pub struct HistoryHandler {
    sender: mpsc::Sender<HistoryEvent>,
    shared: Arc<HistoryShared>,
}

impl HistoryHandler {
    /// Queue `event` without waiting. Returns false when the event is dropped because
    /// the service is stopped or its queue is full.
    pub fn handle(&self, event: HistoryEvent) -> bool {
        if self.shared.stopped.load(Ordering::SeqCst) {
            debug!("history service stopped, drop event {}", event);
            return false;
        }

        self.shared.pending.fetch_add(1, Ordering::SeqCst);
        match self.sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                self.shared.pending.fetch_sub(1, Ordering::SeqCst);
                warn!("history queue full, drop event {}", event);
                false
            }
            Err(TrySendError::Closed(event)) => {
                self.shared.pending.fetch_sub(1, Ordering::SeqCst);
                debug!("history queue closed, drop event {}", event);
                false
            }
        }
    }
}

/// Ships history events to a [`TimelineClient`] from a background task.
///
/// Delivery is best effort: `stop` waits at most `flush_timeout` for the queue to
/// drain and then drops whatever is left.
pub struct HistoryLoggingService {
    config: HistoryConfig,
    handler: HistoryHandler,
    stop_token: CancellationToken,
    consumer: Option<JoinHandle<()>>,
}

impl HistoryLoggingService {
    /// Must be called within a tokio runtime.
    pub fn start(config: HistoryConfig, client: Arc<dyn TimelineClient>) -> Self {
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let shared = Arc::new(HistoryShared::default());
        let stop_token = CancellationToken::new();

        let consumer = if config.enabled {
            let consumer = HistoryConsumer {
                receiver,
                client,
                max_events_per_batch: config.max_events_per_batch.max(1),
                shared: shared.clone(),
                stop_token: stop_token.clone(),
            };
            info!(
                "history service started, batch={}, flush timeout={}ms",
                config.max_events_per_batch, config.flush_timeout_ms
            );
            Some(tokio::spawn(consumer.run()))
        } else {
            info!("history service disabled");
            shared.stopped.store(true, Ordering::SeqCst);
            None
        };

        HistoryLoggingService {
            config,
            handler: HistoryHandler { sender, shared },
            stop_token,
            consumer,
        }
    }

    pub fn handler(&self) -> HistoryHandler {
        self.handler.clone()
    }

    pub fn handle(&self, event: HistoryEvent) -> bool {
        self.handler.handle(event)
    }

    /// Stop accepting events, drain for at most `flush_timeout` and return the number
    /// of events dropped.
    pub async fn stop(&mut self) -> usize {
        self.handler.shared.stopped.store(true, Ordering::SeqCst);
        self.stop_token.cancel();

        if let Some(mut consumer) = self.consumer.take() {
            let flush_timeout = self.config.flush_timeout();
            if tokio::time::timeout(flush_timeout, &mut consumer)
                .await
                .is_err()
            {
                consumer.abort();
            }
        }

        let dropped = self.handler.shared.pending.swap(0, Ordering::SeqCst);
        if dropped > 0 {
            warn!(
                "history service stopped, {} events dropped after {}ms",
                dropped, self.config.flush_timeout_ms
            );
        } else {
            info!("history service stopped");
        }
        dropped
    }
}

struct HistoryConsumer {
    receiver: mpsc::Receiver<HistoryEvent>,
    client: Arc<dyn TimelineClient>,
    max_events_per_batch: usize,
    shared: Arc<HistoryShared>,
    stop_token: CancellationToken,
}

impl HistoryConsumer {
    async fn run(mut self) {
        loop {
            // keep draining after stop until the queue is empty
            let first = tokio::select! {
                biased;
                event = self.receiver.recv() => match event {
                    Some(event) => event,
                    None => break,
                },
                _ = self.stop_token.cancelled() => match self.receiver.try_recv() {
                    Ok(event) => event,
                    Err(_) => break,
                },
            };

            let mut batch = Vec::with_capacity(self.max_events_per_batch);
            batch.push(first);
            while batch.len() < self.max_events_per_batch {
                match self.receiver.try_recv() {
                    Ok(event) => batch.push(event),
                    Err(_) => break,
                }
            }

            let len = batch.len();
            if let Err(e) = self.client.put_entities(batch).await {
                error!("put {} history events error. {}", len, e);
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
            self.shared.pending.fetch_sub(len, Ordering::SeqCst);
        }
        debug!("history consumer exit");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use crate::api::config::HistoryConfig;
    use crate::history::event::{HistoryEvent, HistoryEventType};
    use crate::history::service::{HistoryLoggingService, LoggingTimelineClient, TimelineClient};

    struct SlowTimelineClient {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl TimelineClient for SlowTimelineClient {
        async fn put_entities(&self, _events: Vec<HistoryEvent>) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(500)).await;
            Ok(())
        }
    }

    fn event(index: usize) -> HistoryEvent {
        HistoryEvent::new(
            "history-test",
            HistoryEventType::VertexInitialized {
                vertex_name: format!("v{}", index),
            },
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    pub async fn bounded_flush_test() {
        let calls = Arc::new(AtomicUsize::new(0));
        let config = HistoryConfig {
            enabled: true,
            flush_timeout_ms: 1000,
            max_events_per_batch: 1,
            queue_capacity: 100,
        };
        let client = Arc::new(SlowTimelineClient {
            calls: calls.clone(),
        });
        let mut service = HistoryLoggingService::start(config, client);

        for index in 0..20 {
            assert!(service.handle(event(index)));
        }

        tokio::time::sleep(Duration::from_millis(2500)).await;
        let dropped = service.stop().await;

        let calls = calls.load(Ordering::SeqCst);
        assert!(calls >= 4 && calls < 10, "calls {}", calls);
        assert!(dropped > 0 && dropped <= 20 - 4, "dropped {}", dropped);
        assert!(!service.handle(event(20)));
    }

    #[tokio::test]
    pub async fn drain_on_stop_test() {
        let mut service = HistoryLoggingService::start(
            HistoryConfig::default(),
            Arc::new(LoggingTimelineClient::default()),
        );
        let handler = service.handler();
        for index in 0..5 {
            assert!(handler.handle(event(index)));
        }
        assert_eq!(service.stop().await, 0);
        assert!(!handler.handle(event(5)));

        let mut disabled = HistoryLoggingService::start(
            HistoryConfig {
                enabled: false,
                ..HistoryConfig::default()
            },
            Arc::new(LoggingTimelineClient::default()),
        );
        assert!(!disabled.handle(event(0)));
        assert_eq!(disabled.stop().await, 0);
    }
}
