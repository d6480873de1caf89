//! Debounced search-and-select over a remote symbol search.

use crate::core::debounce::Debouncer;
use crate::core::lookup::{LookupSlot, LookupState, LookupWatcher, RequestToken};
use crate::core::search::{SearchCandidate, SymbolSearchProvider};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing::debug;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
pub const DEFAULT_MIN_QUERY_LEN: usize = 2;
pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct PickerOptions {
    pub debounce: Duration,
    pub min_query_len: usize,
    pub limit: usize,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            debounce: DEFAULT_DEBOUNCE,
            min_query_len: DEFAULT_MIN_QUERY_LEN,
            limit: DEFAULT_LIMIT,
        }
    }
}

type OnSelect = Box<dyn Fn(&SearchCandidate) + Send + Sync>;

/// Candidates from the newest search together with whether they are on show.
/// Both travel in one published value so watchers never see them disagree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateList {
    pub items: Vec<SearchCandidate>,
    pub open: bool,
}

impl CandidateList {
    fn found(items: Vec<SearchCandidate>) -> Self {
        let open = !items.is_empty();
        Self { items, open }
    }
}

struct Shared {
    provider: Arc<dyn SymbolSearchProvider>,
    candidates: LookupSlot<CandidateList>,
    query: Mutex<String>,
    limit: usize,
}

impl Shared {
    /// Runs one search. Failures are advisory: they clear the list and are
    /// never reported to the host.
    async fn search(self: Arc<Self>, token: RequestToken, query: String) {
        let found = match self.provider.search(&query, self.limit).await {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, %query, "Symbol search failed");
                Vec::new()
            }
        };
        self.candidates.complete(token, Ok(CandidateList::found(found)));
    }

    /// Shows or hides a held list. Returns false when there is nothing to show.
    fn set_open(&self, open: bool) -> bool {
        self.candidates.modify(|state| match state {
            LookupState::Success(list) if !list.items.is_empty() && list.open != open => {
                list.open = open;
                true
            }
            _ => false,
        })
    }
}

/// Text input with an autocomplete list backed by a [`SymbolSearchProvider`].
///
/// Each edit restarts the quiet period; only the last edit's query is searched
/// and only the response to the newest search is shown.
pub struct SymbolPicker {
    shared: Arc<Shared>,
    debouncer: Debouncer,
    min_query_len: usize,
    on_select: OnSelect,
}

impl SymbolPicker {
    pub fn new(
        provider: Arc<dyn SymbolSearchProvider>,
        options: PickerOptions,
        on_select: impl Fn(&SearchCandidate) + Send + Sync + 'static,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                provider,
                candidates: LookupSlot::new(),
                query: Mutex::new(String::new()),
                limit: options.limit,
            }),
            debouncer: Debouncer::new(options.debounce),
            min_query_len: options.min_query_len,
            on_select: Box::new(on_select),
        }
    }

    pub fn query(&self) -> String {
        self.shared
            .query
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn is_open(&self) -> bool {
        matches!(self.shared.candidates.state(), LookupState::Success(list) if list.open)
    }

    /// Candidates currently held, shown or not. Empty while a search is pending.
    pub fn candidates(&self) -> Vec<SearchCandidate> {
        match self.shared.candidates.state() {
            LookupState::Success(list) => list.items,
            _ => Vec::new(),
        }
    }

    pub fn subscribe(&self) -> LookupWatcher<CandidateList> {
        self.shared.candidates.subscribe()
    }

    /// Handles one edit of the query text. Must be called within a tokio runtime.
    pub fn edit(&self, text: &str) {
        let query = text.trim().to_uppercase();
        *self.shared.query.lock().unwrap_or_else(|e| e.into_inner()) = query.clone();

        if query.chars().count() < self.min_query_len {
            self.debouncer.cancel();
            self.clear();
            return;
        }

        // A response to an older query must not land while this one waits.
        self.shared.candidates.invalidate();
        let shared = Arc::clone(&self.shared);
        self.debouncer.schedule(async move {
            let token = shared.candidates.begin();
            shared.search(token, query).await;
        });
    }

    /// Called when the input regains focus. A held list is shown again as is;
    /// with nothing held, a long enough query is searched straight away.
    pub async fn focus(&self) {
        let query = self.query();
        if query.chars().count() < self.min_query_len {
            return;
        }
        if !self.candidates().is_empty() {
            self.shared.set_open(true);
            return;
        }
        self.debouncer.cancel();
        let token = self.shared.candidates.begin();
        Arc::clone(&self.shared).search(token, query).await;
    }

    /// Commits the candidate at `index`: closes the list, sets the query to
    /// its identifier and fires the selection callback once.
    pub fn select(&self, index: usize) -> Option<SearchCandidate> {
        let candidate = match self.shared.candidates.state() {
            LookupState::Success(list) if list.open => list.items.get(index).cloned()?,
            _ => return None,
        };

        self.debouncer.cancel();
        *self.shared.query.lock().unwrap_or_else(|e| e.into_inner()) =
            candidate.identifier.clone();
        self.clear();
        (self.on_select)(&candidate);
        Some(candidate)
    }

    /// Closes the list without touching the query, as when clicking outside it.
    pub fn dismiss(&self) {
        self.shared.set_open(false);
    }

    fn clear(&self) {
        self.shared.candidates.reset();
    }
}
