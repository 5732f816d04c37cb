//! The shared console: one line per simulation event, atomic on stdout.
//!
//! Actors enqueue finished lines into a bounded channel; a single printer
//! thread drains it. No actor ever takes a lock on stdout, and lines from
//! different threads can interleave but never tear.

use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread;

const LINE_BUFFER: usize = 1024;

pub struct Console {
    tx: SyncSender<String>,
}

impl Console {
    /// Console backed by a printer thread writing to stdout.
    pub fn stdout() -> Arc<Console> {
        let (tx, rx) = sync_channel::<String>(LINE_BUFFER);
        thread::Builder::new()
            .name("console".into())
            .spawn(move || {
                for line in rx {
                    println!("{line}");
                }
            })
            .expect("failed to spawn console thread");
        Arc::new(Console { tx })
    }

    /// Console whose lines are handed to the caller instead of printed.
    /// Used by tests to assert on emitted events.
    pub fn capture() -> (Arc<Console>, Receiver<String>) {
        let (tx, rx) = sync_channel::<String>(LINE_BUFFER);
        (Arc::new(Console { tx }), rx)
    }

    /// Emit one event line. Blocks briefly if the printer is behind; a
    /// closed receiver (capture dropped) discards the line.
    pub fn line(&self, line: String) {
        let _ = self.tx.send(line);
    }
}
