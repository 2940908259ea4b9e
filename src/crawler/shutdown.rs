use std::future;
use tokio::sync::watch;

use crate::error::{CrawlError, Result};

/// Requests that a running crawl stop
#[derive(Debug)]
pub struct ShutdownTrigger {
    tx: watch::Sender<bool>,
}

impl ShutdownTrigger {
    pub fn trigger(&self) {
        // No receivers left means nothing is running
        let _ = self.tx.send(true);
    }
}

/// Observed by the crawl between steps and around every browser call
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

pub fn shutdown_channel() -> (ShutdownTrigger, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownTrigger { tx }, ShutdownSignal { rx })
}

impl ShutdownSignal {
    /// A signal that never fires
    pub fn never() -> Self {
        shutdown_channel().1
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Fail with `Interrupted` once a stop was requested
    pub fn check(&self) -> Result<()> {
        if self.is_triggered() {
            return Err(CrawlError::Interrupted);
        }
        Ok(())
    }

    /// Resolves once a stop is requested
    pub async fn triggered(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                // Trigger dropped without firing
                future::pending::<()>().await;
            }
        }
    }
}
