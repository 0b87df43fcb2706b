//! Queue polling and job submission.
//!
//! The loop suspends in exactly two places, the long-poll receive and
//! the backoff delay, and both race against the shutdown channel. A
//! batch that has already been received is always processed to the end,
//! so graceful shutdown means "finish the current cycle, stop polling".

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::watch;
use tracing::{error, info, warn};

use vtc_launcher::{JobLauncher, LaunchRequest};
use vtc_models::{parse_notification, JobParams, StorageObjectRef};
use vtc_queue::{MessageQueue, QueueMessage};

use crate::config::DispatcherConfig;
use crate::error::{DispatcherError, DispatcherResult};

/// Polls the notification queue and launches one worker job per
/// extracted object reference.
pub struct Dispatcher {
    config: DispatcherConfig,
    queue: Arc<dyn MessageQueue>,
    launcher: Arc<dyn JobLauncher>,
}

impl Dispatcher {
    pub fn new(
        config: DispatcherConfig,
        queue: Arc<dyn MessageQueue>,
        launcher: Arc<dyn JobLauncher>,
    ) -> Self {
        Self {
            config,
            queue,
            launcher,
        }
    }

    /// Run the polling loop until the shutdown channel flips to true.
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) -> DispatcherResult<()> {
        info!(
            "Dispatcher polling (max {} messages, {}s wait)",
            self.config.max_messages, self.config.wait_seconds
        );

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let received = tokio::select! {
                _ = shutdown_rx.changed() => continue,
                result = self
                    .queue
                    .receive(self.config.max_messages, self.config.wait_seconds) => result,
            };

            let messages = match received {
                Ok(messages) => messages,
                Err(e) => {
                    error!("Receive failed: {}", e);
                    self.backoff(&mut shutdown_rx).await;
                    continue;
                }
            };

            if messages.is_empty() {
                continue;
            }

            // The batch is processed to completion even under shutdown;
            // the visibility timers are unaffected by our backoff.
            if let Err(e) = self.process_batch(messages).await {
                error!("Cycle failed: {}", e);
                self.backoff(&mut shutdown_rx).await;
            }
        }

        info!("Dispatcher stopped");
        Ok(())
    }

    /// Process one received batch, message by message.
    pub async fn process_batch(&self, messages: Vec<QueueMessage>) -> DispatcherResult<()> {
        let total = messages.len();
        let mut failed = 0;

        for message in messages {
            let id = message.id.clone();
            if let Err(e) = self.handle_message(message).await {
                warn!("Message {} left for redelivery: {}", id, e);
                failed += 1;
            }
        }

        if failed > 0 {
            return Err(DispatcherError::Cycle { failed, total });
        }
        Ok(())
    }

    /// Parse one message, submit a job per object reference, and delete
    /// the message only once every submission succeeded.
    pub async fn handle_message(&self, message: QueueMessage) -> DispatcherResult<()> {
        let refs = parse_notification(&message.body)?;

        if refs.is_empty() {
            // Self-test probe: nothing to submit, safe to delete now.
            info!("Message {} is a self-test event, deleting", message.id);
            self.queue.delete(message.receipt).await?;
            return Ok(());
        }

        let total = refs.len();
        let submissions = refs.iter().map(|object| self.submit(object));
        let results = join_all(submissions).await;

        let failed = results.iter().filter(|r| r.is_err()).count();
        if failed > 0 {
            // Already-submitted siblings are not rolled back; redelivery
            // makes duplicate launches possible and the worker's
            // job-unique output prefix makes them harmless.
            return Err(DispatcherError::Submission { failed, total });
        }

        self.queue.delete(message.receipt).await?;
        info!(
            "Message {} deleted after {} successful submissions",
            message.id, total
        );
        Ok(())
    }

    async fn submit(&self, object: &StorageObjectRef) -> DispatcherResult<()> {
        let params = JobParams::new(object.clone(), &self.config.destination_bucket);
        self.launcher
            .launch(LaunchRequest::new(params.to_env()))
            .await
            .map_err(|e| {
                warn!("Submission failed for {}: {}", object, e);
                DispatcherError::Submission { failed: 1, total: 1 }
            })?;

        info!("Submitted job for {}", object);
        Ok(())
    }

    /// Fixed delay between failed cycles, cancellable by shutdown.
    async fn backoff(&self, shutdown_rx: &mut watch::Receiver<bool>) {
        tokio::select! {
            _ = shutdown_rx.changed() => {}
            _ = tokio::time::sleep(self.config.backoff) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use vtc_launcher::{LaunchError, LaunchResult};
    use vtc_queue::{QueueError, QueueResult, ReceiptToken};

    fn test_config() -> DispatcherConfig {
        DispatcherConfig {
            max_messages: 10,
            wait_seconds: 1,
            backoff: Duration::from_millis(10),
            destination_bucket: "dest".to_string(),
        }
    }

    fn message(id: &str, body: &str) -> QueueMessage {
        QueueMessage {
            id: id.to_string(),
            body: body.as_bytes().to_vec(),
            receipt: ReceiptToken::new(format!("receipt-{id}")),
        }
    }

    #[derive(Default)]
    struct FakeQueue {
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl MessageQueue for FakeQueue {
        async fn receive(&self, _max: i32, _wait: i32) -> QueueResult<Vec<QueueMessage>> {
            Ok(Vec::new())
        }

        async fn delete(&self, receipt: ReceiptToken) -> QueueResult<()> {
            self.deleted.lock().unwrap().push(receipt.into_inner());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeLauncher {
        fail_source_key: Option<String>,
        launched: Mutex<Vec<LaunchRequest>>,
    }

    impl FakeLauncher {
        fn failing_for(key: &str) -> Self {
            Self {
                fail_source_key: Some(key.to_string()),
                launched: Mutex::new(Vec::new()),
            }
        }

        fn launch_count(&self) -> usize {
            self.launched.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl JobLauncher for FakeLauncher {
        async fn launch(&self, request: LaunchRequest) -> LaunchResult<()> {
            let key = request
                .environment
                .iter()
                .find(|(k, _)| k == "SOURCE_KEY")
                .map(|(_, v)| v.clone());

            self.launched.lock().unwrap().push(request);

            if self.fail_source_key.is_some() && key == self.fail_source_key {
                return Err(LaunchError::request_failed("injected failure"));
            }
            Ok(())
        }
    }

    fn dispatcher(queue: Arc<FakeQueue>, launcher: Arc<FakeLauncher>) -> Dispatcher {
        Dispatcher::new(test_config(), queue, launcher)
    }

    const SINGLE_RECORD: &str =
        r#"{"Records":[{"s3":{"bucket":{"name":"src"},"object":{"key":"video.mp4"}}}]}"#;

    #[tokio::test]
    async fn test_successful_submission_deletes_message() {
        let queue = Arc::new(FakeQueue::default());
        let launcher = Arc::new(FakeLauncher::default());
        let d = dispatcher(Arc::clone(&queue), Arc::clone(&launcher));

        d.handle_message(message("m1", SINGLE_RECORD)).await.unwrap();

        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(*queue.deleted.lock().unwrap(), vec!["receipt-m1"]);

        let request = launcher.launched.lock().unwrap()[0].clone();
        assert!(request
            .environment
            .contains(&("SOURCE_BUCKET".into(), "src".into())));
        assert!(request
            .environment
            .contains(&("SOURCE_KEY".into(), "video.mp4".into())));
        assert!(request
            .environment
            .contains(&("DEST_BUCKET".into(), "dest".into())));
    }

    #[tokio::test]
    async fn test_self_test_event_deleted_with_zero_submissions() {
        let queue = Arc::new(FakeQueue::default());
        let launcher = Arc::new(FakeLauncher::default());
        let d = dispatcher(Arc::clone(&queue), Arc::clone(&launcher));

        let body = r#"{"Service":"Amazon S3","Event":"s3:TestEvent"}"#;
        d.handle_message(message("m1", body)).await.unwrap();

        assert_eq!(launcher.launch_count(), 0);
        assert_eq!(queue.deleted.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_partial_submission_failure_keeps_message() {
        let queue = Arc::new(FakeQueue::default());
        let launcher = Arc::new(FakeLauncher::failing_for("b.mp4"));
        let d = dispatcher(Arc::clone(&queue), Arc::clone(&launcher));

        let body = r#"{"Records":[
            {"s3":{"bucket":{"name":"src"},"object":{"key":"a.mp4"}}},
            {"s3":{"bucket":{"name":"src"},"object":{"key":"b.mp4"}}},
            {"s3":{"bucket":{"name":"src"},"object":{"key":"c.mp4"}}}
        ]}"#;
        let result = d.handle_message(message("m1", body)).await;

        assert!(matches!(
            result,
            Err(DispatcherError::Submission { failed: 1, total: 3 })
        ));
        // Sibling submissions were still attempted, but the message
        // stays for redelivery.
        assert_eq!(launcher.launch_count(), 3);
        assert!(queue.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_parse_error_keeps_message() {
        let queue = Arc::new(FakeQueue::default());
        let launcher = Arc::new(FakeLauncher::default());
        let d = dispatcher(Arc::clone(&queue), Arc::clone(&launcher));

        let result = d.handle_message(message("m1", "not json")).await;

        assert!(matches!(result, Err(DispatcherError::Parse(_))));
        assert_eq!(launcher.launch_count(), 0);
        assert!(queue.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_batch_reports_failed_messages() {
        let queue = Arc::new(FakeQueue::default());
        let launcher = Arc::new(FakeLauncher::default());
        let d = dispatcher(Arc::clone(&queue), Arc::clone(&launcher));

        let batch = vec![message("good", SINGLE_RECORD), message("bad", "not json")];
        let result = d.process_batch(batch).await;

        assert!(matches!(
            result,
            Err(DispatcherError::Cycle { failed: 1, total: 2 })
        ));
        // The good message was still handled and deleted.
        assert_eq!(*queue.deleted.lock().unwrap(), vec!["receipt-good"]);
    }

    /// Scripted queue: the first receive fails, the second delivers one
    /// message, and the third flips the shutdown channel so the loop
    /// winds down.
    struct FlakyQueue {
        calls: Mutex<u32>,
        deleted: Mutex<Vec<String>>,
        shutdown_tx: watch::Sender<bool>,
    }

    #[async_trait]
    impl MessageQueue for FlakyQueue {
        async fn receive(&self, _max: i32, _wait: i32) -> QueueResult<Vec<QueueMessage>> {
            let call = {
                let mut calls = self.calls.lock().unwrap();
                *calls += 1;
                *calls
            };
            match call {
                1 => Err(QueueError::receive_failed("injected receive failure")),
                2 => Ok(vec![message("m1", SINGLE_RECORD)]),
                _ => {
                    let _ = self.shutdown_tx.send(true);
                    Ok(Vec::new())
                }
            }
        }

        async fn delete(&self, receipt: ReceiptToken) -> QueueResult<()> {
            self.deleted.lock().unwrap().push(receipt.into_inner());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_run_survives_receive_failure_and_keeps_polling() {
        // Paused time makes the backoff sleep resolve deterministically.
        tokio::time::pause();

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let queue = Arc::new(FlakyQueue {
            calls: Mutex::new(0),
            deleted: Mutex::new(Vec::new()),
            shutdown_tx,
        });
        let launcher = Arc::new(FakeLauncher::default());
        let d = Dispatcher::new(
            test_config(),
            Arc::clone(&queue) as Arc<dyn MessageQueue>,
            Arc::clone(&launcher) as Arc<dyn JobLauncher>,
        );

        d.run(shutdown_rx).await.unwrap();

        // The failed receive was backed off, not fatal: the message
        // delivered afterwards was still submitted and deleted.
        assert!(*queue.calls.lock().unwrap() >= 3);
        assert_eq!(launcher.launch_count(), 1);
        assert_eq!(*queue.deleted.lock().unwrap(), vec!["receipt-m1"]);
    }

    #[tokio::test]
    async fn test_run_stops_on_shutdown() {
        let queue = Arc::new(FakeQueue::default());
        let launcher = Arc::new(FakeLauncher::default());
        let d = dispatcher(queue, launcher);

        let (shutdown_tx, shutdown_rx) = watch::channel(true);
        d.run(shutdown_rx).await.unwrap();
        drop(shutdown_tx);
    }
}
