// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The asynchronous loader: the synchronous pipeline, off-thread.
//!
//! Nothing here suspends cooperatively. A [`LoadSequence`] is an ordered
//! list of caller-supplied synchronous steps; the loader's single worker
//! thread runs them in order and reports the outcome through a completion
//! callback. Cancellation is checked between steps only — a step that has
//! started always runs to completion.

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

/// A shareable cancellation flag for one queued sequence.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    /// A fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect at the next between-step check.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// How a queued sequence ended.
#[derive(Debug)]
pub enum SequenceOutcome {
    /// Every step ran and succeeded.
    Completed,
    /// Cancellation was observed between steps; remaining steps were
    /// skipped.
    Cancelled,
    /// A step returned an error; remaining steps were skipped.
    Faulted(anyhow::Error),
}

type Step = Box<dyn FnOnce() -> anyhow::Result<()> + Send>;
type CompletionHook = Box<dyn FnOnce(SequenceOutcome) + Send>;

/// An ordered queue of synchronous steps to run on the worker thread.
pub struct LoadSequence {
    steps: Vec<Step>,
    on_complete: Option<CompletionHook>,
    token: CancellationToken,
}

impl LoadSequence {
    /// An empty sequence with a fresh cancellation token.
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            on_complete: None,
            token: CancellationToken::new(),
        }
    }

    /// Appends a step. Steps run in append order.
    pub fn step(mut self, step: impl FnOnce() -> anyhow::Result<()> + Send + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// Sets the completion callback, invoked on the worker thread with the
    /// sequence's outcome.
    pub fn on_complete(mut self, hook: impl FnOnce(SequenceOutcome) + Send + 'static) -> Self {
        self.on_complete = Some(Box::new(hook));
        self
    }

    /// The sequence's cancellation token, cloneable before enqueueing.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl Default for LoadSequence {
    fn default() -> Self {
        Self::new()
    }
}

/// A single worker thread draining a queue of [`LoadSequence`]s.
pub struct AsyncLoader {
    sender: Option<Sender<LoadSequence>>,
    worker: Option<JoinHandle<()>>,
}

impl AsyncLoader {
    /// Spawns the worker thread.
    pub fn new() -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded::<LoadSequence>();
        let worker = std::thread::Builder::new()
            .name("vellum-async-loader".to_string())
            .spawn(move || worker_loop(receiver))
            .expect("failed to spawn async loader thread");
        Self {
            sender: Some(sender),
            worker: Some(worker),
        }
    }

    /// Enqueues a sequence and returns its cancellation token.
    pub fn enqueue(&self, sequence: LoadSequence) -> CancellationToken {
        let token = sequence.token();
        if let Some(sender) = &self.sender {
            if sender.send(sequence).is_err() {
                log::error!("Async loader worker is gone; sequence dropped");
            }
        }
        token
    }
}

impl Default for AsyncLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for AsyncLoader {
    fn drop(&mut self) {
        // Closing the channel lets the worker finish queued sequences and
        // exit; join so teardown is deterministic.
        self.sender.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("Async loader worker panicked during shutdown");
            }
        }
    }
}

fn worker_loop(receiver: Receiver<LoadSequence>) {
    for sequence in receiver {
        run_sequence(sequence);
    }
}

fn run_sequence(sequence: LoadSequence) {
    let mut outcome = SequenceOutcome::Completed;
    for step in sequence.steps {
        if sequence.token.is_cancelled() {
            outcome = SequenceOutcome::Cancelled;
            break;
        }
        if let Err(fault) = step() {
            outcome = SequenceOutcome::Faulted(fault);
            break;
        }
    }
    if let Some(hook) = sequence.on_complete {
        hook(outcome);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    #[test]
    fn steps_run_in_order() {
        let loader = AsyncLoader::new();
        let order = Arc::new(Mutex::new(Vec::new()));
        let (done_tx, done_rx) = mpsc::channel();

        let sequence = {
            let a = order.clone();
            let b = order.clone();
            LoadSequence::new()
                .step(move || {
                    a.lock().unwrap().push(1);
                    Ok(())
                })
                .step(move || {
                    b.lock().unwrap().push(2);
                    Ok(())
                })
                .on_complete(move |outcome| {
                    assert!(matches!(outcome, SequenceOutcome::Completed));
                    done_tx.send(()).unwrap();
                })
        };
        loader.enqueue(sequence);

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[test]
    fn cancellation_is_checked_between_steps() {
        let loader = AsyncLoader::new();
        let ran_second = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        let sequence = LoadSequence::new();
        let token = sequence.token();
        let flag = ran_second.clone();
        let inner_token = token.clone();
        let sequence = sequence
            .step(move || {
                // Cancel mid-sequence: the running step completes, the
                // next one never starts.
                inner_token.cancel();
                Ok(())
            })
            .step(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .on_complete(move |outcome| {
                assert!(matches!(outcome, SequenceOutcome::Cancelled));
                done_tx.send(()).unwrap();
            });
        loader.enqueue(sequence);

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!ran_second.load(Ordering::SeqCst));
    }

    #[test]
    fn faults_stop_the_sequence() {
        let loader = AsyncLoader::new();
        let ran_second = Arc::new(AtomicBool::new(false));
        let (done_tx, done_rx) = mpsc::channel();

        let flag = ran_second.clone();
        let sequence = LoadSequence::new()
            .step(|| anyhow::bail!("disk on fire"))
            .step(move || {
                flag.store(true, Ordering::SeqCst);
                Ok(())
            })
            .on_complete(move |outcome| {
                match outcome {
                    SequenceOutcome::Faulted(e) => assert!(e.to_string().contains("disk on fire")),
                    other => panic!("expected fault, got {other:?}"),
                }
                done_tx.send(()).unwrap();
            });
        loader.enqueue(sequence);

        done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(!ran_second.load(Ordering::SeqCst));
    }

    #[test]
    fn drop_joins_after_draining() {
        let order = Arc::new(Mutex::new(Vec::new()));
        {
            let loader = AsyncLoader::new();
            for i in 0..4 {
                let o = order.clone();
                loader.enqueue(LoadSequence::new().step(move || {
                    o.lock().unwrap().push(i);
                    Ok(())
                }));
            }
            // Dropping here closes the queue and joins the worker.
        }
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2, 3]);
    }
}
