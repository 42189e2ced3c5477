use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use modman_core::{ModError, PackageId, Result};
use tracing::debug;

/// Message from a background operation to whoever observes it.
#[derive(Debug)]
pub enum TaskEvent<T> {
    Progress(u8),
    Finished(Result<T>),
}

/// Handle on one operation running on its own worker thread.
///
/// Progress arrives as [`TaskEvent::Progress`] followed by exactly one
/// [`TaskEvent::Finished`]. Sending never blocks the worker.
pub struct TaskHandle<T> {
    package_id: PackageId,
    events: Receiver<TaskEvent<T>>,
    thread: Option<JoinHandle<()>>,
}

pub fn spawn_task<T, F>(package_id: PackageId, task: F) -> Result<TaskHandle<T>>
where
    T: Send + 'static,
    F: FnOnce(&mut dyn FnMut(u8)) -> Result<T> + Send + 'static,
{
    let (sender, events) = mpsc::channel();
    let progress_sender = sender.clone();
    let thread = thread::Builder::new()
        .name(format!("modman-{package_id}"))
        .spawn(move || {
            let mut on_progress = move |percent: u8| {
                let _ = progress_sender.send(TaskEvent::Progress(percent));
            };
            let result = task(&mut on_progress);
            let _ = sender.send(TaskEvent::Finished(result));
        })
        .map_err(|err| {
            debug!(package = %package_id, error = %err, "failed to spawn worker");
            ModError::WorkerLost {
                package_id: package_id.to_string(),
            }
        })?;

    Ok(TaskHandle {
        package_id,
        events,
        thread: Some(thread),
    })
}

impl<T> TaskHandle<T> {
    pub fn package_id(&self) -> &PackageId {
        &self.package_id
    }

    /// Non-blocking poll for UIs that redraw between events.
    pub fn try_next(&self) -> Option<TaskEvent<T>> {
        match self.events.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(TaskEvent::Finished(Err(self.lost()))),
        }
    }

    /// Blocks until the operation finishes, forwarding progress on the
    /// calling thread.
    pub fn wait_with(mut self, mut on_progress: impl FnMut(u8)) -> Result<T> {
        let outcome = loop {
            match self.events.recv() {
                Ok(TaskEvent::Progress(percent)) => on_progress(percent),
                Ok(TaskEvent::Finished(result)) => break result,
                Err(_) => break Err(self.lost()),
            }
        };
        self.join();
        outcome
    }

    pub fn wait(self) -> Result<T> {
        self.wait_with(|_| {})
    }

    fn lost(&self) -> ModError {
        ModError::WorkerLost {
            package_id: self.package_id.to_string(),
        }
    }

    fn join(&mut self) {
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                debug!(package = %self.package_id, "worker thread panicked");
            }
        }
    }
}
