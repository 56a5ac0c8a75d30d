//! Trailing-edge debounce over a watch channel.
//!
//! Every change of the input restarts the delay. The latest input is
//! published once the input has been quiet for the whole delay.

use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

pub struct Debouncer<T> {
    input: watch::Sender<T>,
    output: watch::Receiver<T>,
    task: JoinHandle<()>,
}

impl<T> Debouncer<T>
where
    T: Clone + PartialEq + Send + Sync + 'static,
{
    /// Start debouncing with `initial` as both the current input and the
    /// published value
    pub fn new(initial: T, delay: Duration) -> Self {
        let (input, mut input_rx) = watch::channel(initial.clone());
        let (output_tx, output) = watch::channel(initial);

        let task = tokio::spawn(async move {
            // Outer wait: idle until the first change of a burst
            while input_rx.changed().await.is_ok() {
                loop {
                    match tokio::time::timeout(delay, input_rx.changed()).await {
                        Ok(Ok(())) => continue,
                        Ok(Err(_)) => return,
                        Err(_elapsed) => break,
                    }
                }
                let latest = input_rx.borrow_and_update().clone();
                output_tx.send_if_modified(|current| {
                    if *current == latest {
                        false
                    } else {
                        *current = latest;
                        true
                    }
                });
            }
        });

        Self {
            input,
            output,
            task,
        }
    }

    /// Feed a new raw value
    pub fn push(&self, value: T) {
        self.input.send_replace(value);
    }

    /// Last published value
    pub fn current(&self) -> T {
        self.output.borrow().clone()
    }

    /// Receiver notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<T> {
        self.output.clone()
    }
}

impl<T> Drop for Debouncer<T> {
    fn drop(&mut self) {
        self.task.abort();
    }
}
