//! Debounced persistence of the working draft.
//!
//! Every edit schedules a save; a later edit inside the quiet window replaces
//! the pending snapshot and restarts the window, so a burst of edits produces
//! one write of the final state.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::model::InvoiceData;
use crate::store::InvoiceStore;

/// Single-slot delayed action. Scheduling again supersedes what was pending.
#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<(Instant, T)>,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self { quiet, pending: None }
    }

    pub fn schedule(&mut self, now: Instant, value: T) {
        self.pending = Some((now + self.quiet, value));
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|(at, _)| *at)
    }

    /// Releases the pending value once its deadline has passed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        match self.deadline() {
            Some(at) if at <= now => self.pending.take().map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn flush(&mut self) -> Option<T> {
        self.pending.take().map(|(_, v)| v)
    }

    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

enum Message {
    Schedule(Box<InvoiceData>),
    Discard,
}

/// Background writer. Dropping it writes any snapshot still pending.
pub struct Autosaver {
    tx: Option<Sender<Message>>,
    worker: Option<JoinHandle<()>>,
}

impl Autosaver {
    pub fn spawn(store: Box<dyn InvoiceStore>, quiet: Duration) -> Self {
        let (tx, rx) = mpsc::channel::<Message>();

        let worker = thread::spawn(move || {
            let mut debouncer = Debouncer::new(quiet);
            loop {
                let received = match debouncer.deadline() {
                    Some(at) => rx.recv_timeout(at.saturating_duration_since(Instant::now())),
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };

                match received {
                    Ok(Message::Schedule(data)) => debouncer.schedule(Instant::now(), data),
                    Ok(Message::Discard) => debouncer.cancel(),
                    Err(RecvTimeoutError::Timeout) => {
                        if let Some(data) = debouncer.poll(Instant::now()) {
                            persist(store.as_ref(), &data);
                        }
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        if let Some(data) = debouncer.flush() {
                            persist(store.as_ref(), &data);
                        }
                        break;
                    }
                }
            }
        });

        Self { tx: Some(tx), worker: Some(worker) }
    }

    pub fn schedule(&self, data: &InvoiceData) {
        self.send(Message::Schedule(Box::new(data.clone())));
    }

    /// Drop the pending snapshot without writing it.
    pub fn discard(&self) {
        self.send(Message::Discard);
    }

    fn send(&self, msg: Message) {
        if let Some(tx) = &self.tx {
            if tx.send(msg).is_err() {
                warn!("autosave worker has stopped; change not scheduled");
            }
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                warn!("autosave worker panicked");
            }
        }
    }
}

fn persist(store: &dyn InvoiceStore, data: &InvoiceData) {
    match store.save(data) {
        Ok(()) => debug!(invoice = %data.invoice_number, "autosaved draft"),
        Err(e) => warn!(error = %e, "autosave failed"),
    }
}
