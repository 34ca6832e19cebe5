//! Application state management

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::billing::CheckoutProvider;
use crate::config::Config;
use crate::ocr::OcrEngine;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    db: SqlitePool,
    ocr: Arc<dyn OcrEngine>,
    billing: Arc<dyn CheckoutProvider>,
}

impl AppState {
    pub fn new(
        config: Config,
        db: SqlitePool,
        ocr: Arc<dyn OcrEngine>,
        billing: Arc<dyn CheckoutProvider>,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                db,
                ocr,
                billing,
            }),
        }
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the database pool
    pub fn db(&self) -> &SqlitePool {
        &self.inner.db
    }

    /// Get the OCR engine
    pub fn ocr(&self) -> &dyn OcrEngine {
        self.inner.ocr.as_ref()
    }

    /// Get the payment provider
    pub fn billing(&self) -> &dyn CheckoutProvider {
        self.inner.billing.as_ref()
    }
}
