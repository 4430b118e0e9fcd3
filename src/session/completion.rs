use std::sync::mpsc::{self, Receiver, Sender};

/// Handle that resolves once a recording has completed successfully.
///
/// A recording that fails or is dropped never resolves its handles; waiting on them then returns
/// `false` instead of blocking forever.
#[derive(Debug)]
pub struct Completion {
    rx: Receiver<()>,
    fired: bool,
}

impl Completion {
    /// Block until the recording completes. Returns `false` if it ended without completing.
    pub fn wait(self) -> bool {
        self.fired || self.rx.recv().is_ok()
    }

    /// Non-blocking check; stays `true` once it has returned `true`.
    pub fn try_wait(&mut self) -> bool {
        if !self.fired && self.rx.try_recv().is_ok() {
            self.fired = true;
        }
        self.fired
    }
}

type Callback = Box<dyn FnOnce() + Send + 'static>;

/// Pending completion listeners of one recording. Firing consumes it, so it fires at most once.
#[derive(Default)]
pub(crate) struct CompletionHub {
    callbacks: Vec<Callback>,
    subscribers: Vec<Sender<()>>,
}

impl CompletionHub {
    pub(crate) fn on_complete(&mut self, f: impl FnOnce() + Send + 'static) {
        self.callbacks.push(Box::new(f));
    }

    pub(crate) fn subscribe(&mut self) -> Completion {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        Completion { rx, fired: false }
    }

    pub(crate) fn listeners(&self) -> usize {
        self.callbacks.len() + self.subscribers.len()
    }

    pub(crate) fn fire(self) {
        for callback in self.callbacks {
            callback();
        }
        for tx in self.subscribers {
            // The receiving handle may already be gone.
            let _ = tx.send(());
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/session/completion.rs"]
mod tests;
