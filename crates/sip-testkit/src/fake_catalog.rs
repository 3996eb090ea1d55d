use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use sip_catalog::{CatalogSource, SourceUnavailable};
use sip_schemas::Beverage;

#[derive(Debug, Clone)]
enum Script {
    Answer(Vec<Beverage>),
    Fail(SourceUnavailable),
    /// Answer after sleeping; used to trip the caller's timeout.
    Stall(Duration, Vec<Beverage>),
}

/// Scripted [`CatalogSource`]. Returns the same scripted answer for every
/// term and records the terms it was asked for.
#[derive(Debug)]
pub struct FakeCatalog {
    script: Script,
    calls: AtomicUsize,
    terms: Mutex<Vec<String>>,
}

impl FakeCatalog {
    fn with(script: Script) -> Self {
        Self {
            script,
            calls: AtomicUsize::new(0),
            terms: Mutex::new(Vec::new()),
        }
    }

    pub fn returning(list: Vec<Beverage>) -> Self {
        Self::with(Script::Answer(list))
    }

    pub fn empty() -> Self {
        Self::returning(Vec::new())
    }

    pub fn failing(err: SourceUnavailable) -> Self {
        Self::with(Script::Fail(err))
    }

    pub fn stalled(delay: Duration, list: Vec<Beverage>) -> Self {
        Self::with(Script::Stall(delay, list))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn terms(&self) -> Vec<String> {
        self.terms.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait::async_trait]
impl CatalogSource for FakeCatalog {
    fn source_name(&self) -> &'static str {
        "fake"
    }

    async fn search_by_name(&self, term: &str) -> Result<Vec<Beverage>, SourceUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut t) = self.terms.lock() {
            t.push(term.to_string());
        }
        match &self.script {
            Script::Answer(list) => Ok(list.clone()),
            Script::Fail(e) => Err(e.clone()),
            Script::Stall(delay, list) => {
                tokio::time::sleep(*delay).await;
                Ok(list.clone())
            }
        }
    }
}
