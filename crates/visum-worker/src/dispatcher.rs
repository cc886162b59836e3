//! Task dispatcher and worker pool.
//!
//! A single dispatch loop polls the broker and feeds a fixed pool of
//! workers over a bounded channel, so at most `worker_count` tasks are in
//! flight. Extraction tasks drain first; compare and maintenance tasks are
//! only fetched once the extraction queue is empty.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use lapin::message::BasicGetMessage;
use lapin::options::{BasicAckOptions, BasicNackOptions};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info, instrument, warn};

use visum_core::{Error, Result, WorkerConfig};

use crate::handler::{TaskHandler, TaskOutcome};
use crate::transport::{Transport, COMPARE_QUEUE, EXTRACTION_QUEUE, MAINTENANCE_QUEUE};

/// Capacity of the broadcast event bus.
const EVENT_BUS_CAPACITY: usize = 256;

/// Event emitted by the dispatcher.
#[derive(Debug, Clone)]
pub enum WorkerEvent {
    /// Dispatcher started.
    WorkerStarted,
    /// Dispatcher stopped.
    WorkerStopped,
    /// A task was handed to a worker.
    TaskStarted { queue: &'static str },
    /// A task was acknowledged.
    TaskCompleted {
        queue: &'static str,
        outcome: &'static str,
    },
    /// A task failed and was dead-lettered.
    TaskFailed { queue: &'static str, error: String },
}

/// Handle for controlling a running dispatcher.
pub struct DispatcherHandle {
    shutdown_tx: mpsc::Sender<()>,
    event_rx: broadcast::Receiver<WorkerEvent>,
    extraction_idle: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl DispatcherHandle {
    /// Signal the dispatcher to shut down and wait for in-flight tasks to
    /// finish.
    pub async fn shutdown(self) -> Result<()> {
        self.shutdown_tx
            .send(())
            .await
            .map_err(|_| Error::Internal("Failed to send shutdown signal".into()))?;
        self.join
            .await
            .map_err(|e| Error::Internal(format!("Dispatcher task panicked: {e}")))?;
        Ok(())
    }

    /// Get a receiver for dispatcher events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_rx.resubscribe()
    }

    /// Whether the extraction queue was empty at the last poll.
    pub fn extraction_idle(&self) -> bool {
        self.extraction_idle.load(Ordering::Relaxed)
    }
}

/// A fetched message together with the queue it came from.
struct WorkItem {
    queue: &'static str,
    message: BasicGetMessage,
}

/// Polls task queues and dispatches messages to a worker pool.
pub struct Dispatcher {
    transport: Arc<Transport>,
    config: WorkerConfig,
    handlers: HashMap<&'static str, Arc<dyn TaskHandler>>,
    event_tx: broadcast::Sender<WorkerEvent>,
    extraction_idle: Arc<AtomicBool>,
}

impl Dispatcher {
    /// Create a new dispatcher.
    pub fn new(transport: Arc<Transport>, config: WorkerConfig) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            transport,
            config,
            handlers: HashMap::new(),
            event_tx,
            extraction_idle: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Register a handler for the queue it declares.
    pub fn register_handler<H: TaskHandler + 'static>(&mut self, handler: H) {
        let queue = handler.queue();
        self.handlers.insert(queue, Arc::new(handler));
        debug!(queue, "registered task handler");
    }

    /// Get a receiver for dispatcher events.
    pub fn events(&self) -> broadcast::Receiver<WorkerEvent> {
        self.event_tx.subscribe()
    }

    /// Start the dispatcher and return a handle for control.
    pub fn start(self) -> DispatcherHandle {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let event_rx = self.event_tx.subscribe();
        let extraction_idle = self.extraction_idle.clone();

        let join = tokio::spawn(async move {
            self.run(shutdown_rx).await;
        });

        DispatcherHandle {
            shutdown_tx,
            event_rx,
            extraction_idle,
            join,
        }
    }

    /// Run the dispatch loop.
    ///
    /// Fetches stay bounded by the work channel: once every worker is busy
    /// the next send blocks, so the loop never reads ahead of the pool.
    #[instrument(skip(self, shutdown_rx))]
    async fn run(mut self, mut shutdown_rx: mpsc::Receiver<()>) {
        info!(
            worker_count = self.config.worker_count,
            poll_interval_ms = self.config.poll_interval_ms,
            maintenance = self.config.enable_maintenance,
            "dispatcher started"
        );
        let _ = self.event_tx.send(WorkerEvent::WorkerStarted);

        let handlers = Arc::new(std::mem::take(&mut self.handlers));
        let (work_tx, work_rx) = mpsc::channel::<WorkItem>(self.config.worker_count);
        let work_rx = Arc::new(Mutex::new(work_rx));

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count {
            let context = WorkerContext {
                id,
                transport: self.transport.clone(),
                handlers: handlers.clone(),
                event_tx: self.event_tx.clone(),
            };
            workers.push(tokio::spawn(context.run(work_rx.clone())));
        }

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            // Check for shutdown before fetching more work
            if shutdown_rx.try_recv().is_ok() {
                info!("dispatcher received shutdown signal");
                break;
            }

            match self.drain_cycle(&work_tx).await {
                // A message moved, poll again immediately
                Ok(true) => {}
                Ok(false) => {
                    // All queues empty, sleep before polling again
                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            info!("dispatcher received shutdown signal");
                            break;
                        }
                        _ = sleep(poll_interval) => {}
                    }
                }
                Err(e) => {
                    error!(error = %e, "queue poll failed, reconnecting");
                    self.transport.reconnect().await;
                }
            }
        }

        // Closing the channel lets workers finish their current task and exit
        drop(work_tx);
        for worker in workers {
            if let Err(e) = worker.await {
                error!(error = ?e, "worker task panicked");
            }
        }

        let _ = self.event_tx.send(WorkerEvent::WorkerStopped);
        info!("dispatcher stopped");
    }

    /// Fetch and dispatch the next message by queue priority.
    ///
    /// Returns `Ok(true)` if a message was dispatched.
    async fn drain_cycle(&self, work_tx: &mpsc::Sender<WorkItem>) -> Result<bool> {
        let pending = self.transport.message_count(EXTRACTION_QUEUE).await?;
        self.extraction_idle.store(pending == 0, Ordering::Relaxed);

        if pending > 0 {
            if let Some(message) = self.transport.fetch(EXTRACTION_QUEUE).await? {
                self.submit(work_tx, EXTRACTION_QUEUE, message).await;
                return Ok(true);
            }
        }

        let mut moved = false;
        if let Some(message) = self.transport.fetch(COMPARE_QUEUE).await? {
            self.submit(work_tx, COMPARE_QUEUE, message).await;
            moved = true;
        }
        // Maintenance messages are consumed even with the feature disabled;
        // the handler acknowledges them as a warned no-op.
        if let Some(message) = self.transport.fetch(MAINTENANCE_QUEUE).await? {
            self.submit(work_tx, MAINTENANCE_QUEUE, message).await;
            moved = true;
        }
        Ok(moved)
    }

    async fn submit(
        &self,
        work_tx: &mpsc::Sender<WorkItem>,
        queue: &'static str,
        message: BasicGetMessage,
    ) {
        if work_tx
            .send(WorkItem { queue, message })
            .await
            .is_err()
        {
            error!(queue, "worker pool closed, dropping fetched message");
        }
    }
}

/// Reference bundle one pool worker runs with.
struct WorkerContext {
    id: usize,
    transport: Arc<Transport>,
    handlers: Arc<HashMap<&'static str, Arc<dyn TaskHandler>>>,
    event_tx: broadcast::Sender<WorkerEvent>,
}

impl WorkerContext {
    async fn run(self, work_rx: Arc<Mutex<mpsc::Receiver<WorkItem>>>) {
        debug!(worker = self.id, "worker started");
        loop {
            let item = {
                let mut rx = work_rx.lock().await;
                rx.recv().await
            };
            let Some(item) = item else { break };
            self.process(item).await;
        }
        debug!(worker = self.id, "worker stopped");
    }

    /// Execute a single task and settle its message.
    async fn process(&self, item: WorkItem) {
        let start = Instant::now();
        let WorkItem { queue, message } = item;
        let delivery = message.delivery;

        let _ = self.event_tx.send(WorkerEvent::TaskStarted { queue });

        let result = match self.handlers.get(queue) {
            Some(handler) => handler.execute(&delivery.data).await,
            None => Err(Error::Internal(format!(
                "No handler registered for queue {queue}"
            ))),
        };

        match result {
            Ok(outcome) => {
                if let Err(e) = delivery.acker.ack(BasicAckOptions::default()).await {
                    error!(error = %e, queue, "failed to ack message");
                    return;
                }
                let duration_ms = start.elapsed().as_millis() as u64;
                match outcome {
                    TaskOutcome::Completed(label) => {
                        info!(
                            worker = self.id,
                            queue,
                            outcome = label,
                            duration_ms,
                            "task completed"
                        );
                    }
                    TaskOutcome::Rejected(label) => {
                        warn!(
                            worker = self.id,
                            queue,
                            outcome = label,
                            duration_ms,
                            "task rejected"
                        );
                    }
                }
                let _ = self.event_tx.send(WorkerEvent::TaskCompleted {
                    queue,
                    outcome: outcome.message(),
                });
            }
            Err(e) => {
                let error = e.to_string();
                error!(
                    worker = self.id,
                    queue,
                    error = %error,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "task failed, dead-lettering"
                );
                if let Err(e) = delivery
                    .acker
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..BasicNackOptions::default()
                    })
                    .await
                {
                    error!(error = %e, queue, "failed to nack message");
                }
                if let Err(e) = self.transport.publish_dead_letter(&delivery.data).await {
                    error!(error = %e, queue, "failed to publish dead letter");
                }
                let _ = self.event_tx.send(WorkerEvent::TaskFailed { queue, error });
            }
        }
    }
}
