//! Core stage abstraction and run loop for queue-driven workers.

use crate::message::Message;
use crate::queue::MessageQueue;
use crate::supervisor::StopFlag;
use crate::worker::error::{ErrorReporter, StageError};
use std::sync::Arc;

/// A processing stage in the pipeline.
///
/// Stages live on worker threads, connected by message queues; each
/// call handles one pulled message and yields at most one in response.
pub trait Stage: Send + 'static {
    /// Handles one message.
    ///
    /// `Ok(Some(_))` carries the outgoing message and `Ok(None)` means
    /// the stage swallowed this one. Errors are handled per severity:
    /// the loop keeps pulling after a per-message engine failure and
    /// exits when the backend is gone.
    fn process(&mut self, input: Message) -> Result<Option<Message>, StageError>;

    /// Stage name used in logs and error reports.
    fn name(&self) -> &'static str;

    /// Hook invoked once the run loop has exited.
    fn shutdown(&mut self) {}
}

/// Runs a stage's pull/process/push loop until shutdown.
///
/// The loop exits when the input queue yields the shutdown sentinel,
/// when a terminate is requested through `stop`, or when the stage
/// reports its backend gone. Outgoing messages are pushed to every
/// output queue in order; the fan-out covers stages with a secondary
/// tap such as the generator's LLM-output queue. A stage that exits
/// pushes no further output.
pub fn run_stage<S: Stage>(
    mut stage: S,
    input: &MessageQueue,
    outputs: &[MessageQueue],
    stop: &StopFlag,
    reporter: &Arc<dyn ErrorReporter>,
) {
    let stage_name = stage.name();

    while let Some(message) = input.pull() {
        if stop.is_requested() {
            break;
        }

        match stage.process(message) {
            Ok(Some(output)) => {
                for queue in outputs {
                    queue.push(output.clone());
                }
            }
            Ok(None) => {
                // Swallowed by the stage; nothing to push.
            }
            Err(e) => {
                let fatal = e.is_fatal();
                reporter.report(stage_name, &e);
                if fatal {
                    break;
                }
            }
        }
    }

    stage.shutdown();
    tracing::debug!(stage = stage_name, "stage loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::thread;

    // Stage that uppercases every fragment
    struct UppercaseStage {
        shutdown_called: Arc<AtomicBool>,
    }

    impl Stage for UppercaseStage {
        fn process(&mut self, input: Message) -> Result<Option<Message>, StageError> {
            let outputs = input.outputs.iter().map(|s| s.to_uppercase()).collect();
            Ok(Some(Message::new(outputs, input.eos)))
        }

        fn name(&self) -> &'static str {
            "uppercase"
        }

        fn shutdown(&mut self) {
            self.shutdown_called.store(true, Ordering::SeqCst);
        }
    }

    // Stage that drops messages with empty outputs
    struct NonEmptyStage;

    impl Stage for NonEmptyStage {
        fn process(&mut self, input: Message) -> Result<Option<Message>, StageError> {
            if input.outputs.is_empty() {
                Ok(None)
            } else {
                Ok(Some(input))
            }
        }

        fn name(&self) -> &'static str {
            "non-empty"
        }
    }

    // Stage that fails on a specific fragment
    struct FailingStage {
        fail_on: &'static str,
        fatal: bool,
    }

    impl Stage for FailingStage {
        fn process(&mut self, input: Message) -> Result<Option<Message>, StageError> {
            if input.outputs.iter().any(|s| s == self.fail_on) {
                if self.fatal {
                    Err(StageError::backend_gone(format!(
                        "backend died while handling {:?}",
                        self.fail_on
                    )))
                } else {
                    Err(StageError::engine(self.fail_on, "rejected by engine"))
                }
            } else {
                Ok(Some(input))
            }
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    #[derive(Default)]
    struct MockReporter {
        errors: Arc<Mutex<Vec<(String, String)>>>,
    }

    impl ErrorReporter for MockReporter {
        fn report(&self, stage: &str, error: &StageError) {
            let mut errors = self.errors.lock().unwrap();
            errors.push((stage.to_string(), error.to_string()));
        }
    }

    fn spawn_stage<S: Stage>(
        stage: S,
        input: MessageQueue,
        outputs: Vec<MessageQueue>,
        reporter: Arc<dyn ErrorReporter>,
    ) -> (thread::JoinHandle<()>, StopFlag) {
        let stop = StopFlag::new();
        let stop_clone = stop.clone();
        let handle = thread::spawn(move || {
            run_stage(stage, &input, &outputs, &stop_clone, &reporter);
        });
        (handle, stop)
    }

    #[test]
    fn test_basic_processing() {
        let input = MessageQueue::new();
        let output = MessageQueue::new();
        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let stage = UppercaseStage {
            shutdown_called: shutdown_flag.clone(),
        };

        let (handle, _stop) = spawn_stage(
            stage,
            input.clone(),
            vec![output.clone()],
            Arc::new(MockReporter::default()),
        );

        input.push(Message::single("hello", false));
        input.push(Message::single("world", true));
        input.close();

        assert_eq!(output.pull().unwrap().outputs, vec!["HELLO"]);
        let second = output.pull().unwrap();
        assert_eq!(second.outputs, vec!["WORLD"]);
        assert!(second.eos);

        handle.join().unwrap();
        assert!(shutdown_flag.load(Ordering::SeqCst));
    }

    #[test]
    fn test_filtered_messages_produce_no_output() {
        let input = MessageQueue::new();
        let output = MessageQueue::new();

        let (handle, _stop) = spawn_stage(
            NonEmptyStage,
            input.clone(),
            vec![output.clone()],
            Arc::new(MockReporter::default()),
        );

        input.push(Message::new(vec![], false));
        input.push(Message::single("kept", false));
        input.close();
        handle.join().unwrap();

        assert_eq!(output.pull().unwrap().outputs, vec!["kept"]);
        assert!(output.is_empty());
    }

    #[test]
    fn test_fan_out_to_multiple_outputs() {
        let input = MessageQueue::new();
        let primary = MessageQueue::new();
        let tap = MessageQueue::new();

        let (handle, _stop) = spawn_stage(
            NonEmptyStage,
            input.clone(),
            vec![primary.clone(), tap.clone()],
            Arc::new(MockReporter::default()),
        );

        input.push(Message::single("both", false));
        input.close();
        handle.join().unwrap();

        assert_eq!(primary.pull().unwrap().outputs, vec!["both"]);
        assert_eq!(tap.pull().unwrap().outputs, vec!["both"]);
    }

    #[test]
    fn test_engine_error_skips_message_and_continues() {
        let input = MessageQueue::new();
        let output = MessageQueue::new();
        let reporter = Arc::new(MockReporter::default());
        let errors = reporter.errors.clone();

        let stage = FailingStage {
            fail_on: "bad",
            fatal: false,
        };
        let (handle, _stop) = spawn_stage(stage, input.clone(), vec![output.clone()], reporter);

        input.push(Message::single("ok", false));
        input.push(Message::single("bad", false));
        input.push(Message::single("also ok", false));
        input.close();
        handle.join().unwrap();

        assert_eq!(output.pull().unwrap().outputs, vec!["ok"]);
        assert_eq!(output.pull().unwrap().outputs, vec!["also ok"]);

        let reported = errors.lock().unwrap();
        assert_eq!(reported.len(), 1);
        assert_eq!(reported[0].0, "failing");
    }

    #[test]
    fn test_backend_gone_stops_loop() {
        let input = MessageQueue::new();
        let output = MessageQueue::new();
        let reporter = Arc::new(MockReporter::default());
        let errors = reporter.errors.clone();

        let stage = FailingStage {
            fail_on: "bad",
            fatal: true,
        };
        let (handle, _stop) = spawn_stage(stage, input.clone(), vec![output.clone()], reporter);

        input.push(Message::single("bad", false));
        input.push(Message::single("never processed", false));
        handle.join().unwrap();

        assert!(output.is_empty());
        assert_eq!(errors.lock().unwrap().len(), 1);
        // The message after the fatal one was never consumed.
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_sentinel_exits_without_consuming_further() {
        let input = MessageQueue::new();
        let output = MessageQueue::new();

        input.push(Message::single("first", false));
        input.close();
        input.push(Message::single("late", false));

        let (handle, _stop) = spawn_stage(
            NonEmptyStage,
            input.clone(),
            vec![output.clone()],
            Arc::new(MockReporter::default()),
        );
        handle.join().unwrap();

        assert_eq!(output.pull().unwrap().outputs, vec!["first"]);
        assert!(output.is_empty());
        assert_eq!(input.len(), 1);
    }

    #[test]
    fn test_stop_request_exits_on_next_pull() {
        let input = MessageQueue::new();
        let output = MessageQueue::new();

        let (handle, stop) = spawn_stage(
            NonEmptyStage,
            input.clone(),
            vec![output.clone()],
            Arc::new(MockReporter::default()),
        );

        stop.request();
        // Unblock the pull; the stop flag is observed before processing.
        input.push(Message::single("dropped", false));
        handle.join().unwrap();

        assert!(output.is_empty());
    }
}
