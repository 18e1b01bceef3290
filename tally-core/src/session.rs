//! Survey session: one store plus its lazily loaded cache.
//!
//! The session is the explicit handle request-handling code passes around
//! instead of sharing a process-wide cache.

use tracing::warn;

use crate::cache::SessionCache;
use crate::store::ResponseStore;
use crate::types::{Answers, ResponseRecord};

#[derive(Debug)]
pub struct SurveySession {
    store: Box<dyn ResponseStore>,
    cache: Option<SessionCache>,
}

impl SurveySession {
    /// Wrap `store`. Nothing is read until the cache is first needed.
    pub fn new(store: Box<dyn ResponseStore>) -> Self {
        Self { store, cache: None }
    }

    pub fn store(&self) -> &dyn ResponseStore {
        self.store.as_ref()
    }

    /// The session cache, loading it from the store on first use.
    pub fn cache(&mut self) -> crate::error::Result<&SessionCache> {
        Ok(&*self.cache_mut()?)
    }

    fn cache_mut(&mut self) -> crate::error::Result<&mut SessionCache> {
        let cache = match self.cache.take() {
            Some(cache) => cache,
            None => SessionCache::load(self.store.as_ref())?,
        };
        Ok(self.cache.insert(cache))
    }

    /// Read-only snapshot of every response known to this session.
    pub fn current_view(&mut self) -> crate::error::Result<&[ResponseRecord]> {
        Ok(self.cache()?.current_view())
    }

    /// Persist a response, then mirror it in the cache.
    ///
    /// The cache is loaded before the write so the new record is counted
    /// exactly once. On any error the cache is left as it was and the
    /// submission must be reported as failed.
    pub fn submit(&mut self, answers: Answers) -> crate::error::Result<ResponseRecord> {
        self.cache_mut()?;
        let record = match self.store.append(answers) {
            Ok(record) => record,
            Err(e) => {
                warn!(error = %e, "Submission rejected");
                return Err(e);
            }
        };
        self.cache_mut()?.record_added(record.clone());
        Ok(record)
    }
}
