//! In-memory alert sink for integration testing.
//!
//! Records every alert it receives and can be switched into a failing
//! mode to exercise delivery errors without any external channel.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use bundle_hunter::notify::{Alert, AlertSink};

#[derive(Clone, Default)]
pub struct CollectingSink {
    received: Arc<Mutex<Vec<Alert>>>,
    /// If set, every send returns this error.
    force_error: Arc<Mutex<Option<String>>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Force all subsequent sends to fail.
    pub fn set_error(&self, msg: &str) {
        *self.force_error.lock().unwrap() = Some(msg.to_string());
    }

    /// Everything received so far, in delivery order.
    pub fn received(&self) -> Vec<Alert> {
        self.received.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.received().iter().map(Alert::kind).collect()
    }
}

#[async_trait]
impl AlertSink for CollectingSink {
    async fn send(&self, alert: &Alert) -> Result<()> {
        if let Some(msg) = self.force_error.lock().unwrap().clone() {
            return Err(anyhow!(msg));
        }
        self.received.lock().unwrap().push(alert.clone());
        Ok(())
    }

    fn name(&self) -> &str {
        "collecting"
    }
}
