//! Recent price history for a single symbol.

use crate::core::error::LookupError;
use crate::core::lookup::{Completion, LookupSlot, LookupState, LookupWatcher};
use crate::core::metadata::{EntityIdentity, MetadataProvider};
use crate::core::series::{
    Bar, DateWindow, SeriesProvider, SeriesRange, SeriesSummary, normalize_bars, validate_symbol,
};
use chrono::{NaiveDate, Utc};
use futures::future::join;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Everything the presentation layer needs for one symbol and range.
#[derive(Debug, Clone, PartialEq)]
pub struct SeriesView {
    pub symbol: String,
    pub range: SeriesRange,
    pub window: DateWindow,
    /// Ascending by date.
    pub bars: Vec<Bar>,
    pub summary: SeriesSummary,
    pub identity: EntityIdentity,
}

type Clock = Box<dyn Fn() -> NaiveDate + Send + Sync>;

/// How long bars may wait on name and logo enrichment.
pub const DEFAULT_METADATA_TIMEOUT: Duration = Duration::from_secs(2);

pub struct SeriesLookup {
    series: Arc<dyn SeriesProvider>,
    metadata: Option<Arc<dyn MetadataProvider>>,
    metadata_timeout: Duration,
    today: Clock,
    slot: LookupSlot<SeriesView>,
}

impl SeriesLookup {
    pub fn new(series: Arc<dyn SeriesProvider>) -> Self {
        Self {
            series,
            metadata: None,
            metadata_timeout: DEFAULT_METADATA_TIMEOUT,
            today: Box::new(|| Utc::now().date_naive()),
            slot: LookupSlot::new(),
        }
    }

    /// Enables best-effort name and logo enrichment.
    pub fn with_metadata(mut self, metadata: Arc<dyn MetadataProvider>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    pub fn with_metadata_timeout(mut self, timeout: Duration) -> Self {
        self.metadata_timeout = timeout;
        self
    }

    /// Replaces the source of "today" used to compute the date window.
    pub fn with_clock(mut self, today: impl Fn() -> NaiveDate + Send + Sync + 'static) -> Self {
        self.today = Box::new(today);
        self
    }

    pub fn state(&self) -> LookupState<SeriesView> {
        self.slot.state()
    }

    pub fn subscribe(&self) -> LookupWatcher<SeriesView> {
        self.slot.subscribe()
    }

    /// Fetches bars for `symbol` over `range` and publishes the result if no
    /// newer request was issued in the meantime.
    #[instrument(skip(self))]
    pub async fn request(&self, symbol: &str, range: SeriesRange) -> Completion {
        let token = self.slot.begin();
        let symbol = match validate_symbol(symbol) {
            Ok(symbol) => symbol,
            Err(err) => return self.slot.complete(token, Err(err)),
        };

        let window = range.window_ending((self.today)());
        debug!(%symbol, start = %window.start, end = %window.end, "Requesting series");

        let (bars, identity) = join(
            self.series.fetch_bars(&symbol, window.start, window.end),
            self.identity(&symbol),
        )
        .await;

        let outcome = bars.and_then(|bars| {
            let bars = normalize_bars(bars);
            let summary = SeriesSummary::from_bars(&bars)
                .ok_or_else(|| LookupError::EmptyResult(format!("{symbol} over {range}")))?;
            Ok(SeriesView {
                symbol: symbol.clone(),
                range,
                window,
                bars,
                summary,
                identity,
            })
        });
        self.slot.complete(token, outcome)
    }

    async fn identity(&self, symbol: &str) -> EntityIdentity {
        let Some(metadata) = &self.metadata else {
            return EntityIdentity::placeholder_for(symbol);
        };
        let fetch = metadata.fetch_metadata(symbol);
        match tokio::time::timeout(self.metadata_timeout, fetch).await {
            Ok(Ok(meta)) => EntityIdentity::from_metadata(symbol, meta),
            Ok(Err(e)) => {
                warn!(error = %e, %symbol, "Metadata unavailable, using placeholder");
                EntityIdentity::placeholder_for(symbol)
            }
            Err(_) => {
                warn!(%symbol, timeout = ?self.metadata_timeout, "Metadata timed out, using placeholder");
                EntityIdentity::placeholder_for(symbol)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::Result;
    use crate::core::metadata::EntityMetadata;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn bar(date: &str, open: f64, close: f64) -> Bar {
        Bar {
            date: day(date),
            open,
            high: open.max(close) + 1.0,
            low: open.min(close) - 1.0,
            close,
            volume: 52_000_000,
        }
    }

    #[derive(Default)]
    struct MockSeriesProvider {
        bars: HashMap<String, Vec<Bar>>,
        delays: HashMap<String, Duration>,
        requests: Mutex<Vec<(String, NaiveDate, NaiveDate)>>,
    }

    impl MockSeriesProvider {
        fn with_bars(mut self, symbol: &str, bars: Vec<Bar>) -> Self {
            self.bars.insert(symbol.to_string(), bars);
            self
        }

        fn with_delay(mut self, symbol: &str, delay: Duration) -> Self {
            self.delays.insert(symbol.to_string(), delay);
            self
        }
    }

    #[async_trait]
    impl SeriesProvider for MockSeriesProvider {
        async fn fetch_bars(
            &self,
            symbol: &str,
            start: NaiveDate,
            end: NaiveDate,
        ) -> Result<Vec<Bar>> {
            self.requests
                .lock()
                .unwrap()
                .push((symbol.to_string(), start, end));
            if let Some(delay) = self.delays.get(symbol) {
                tokio::time::sleep(*delay).await;
            }
            self.bars
                .get(symbol)
                .cloned()
                .ok_or_else(|| LookupError::UnknownIdentifier(symbol.to_string()))
        }
    }

    struct FailingMetadata;

    #[async_trait]
    impl MetadataProvider for FailingMetadata {
        async fn fetch_metadata(&self, _identifier: &str) -> Result<EntityMetadata> {
            Err(LookupError::RateLimited("metadata".to_string()))
        }
    }

    struct StaticMetadata;

    #[async_trait]
    impl MetadataProvider for StaticMetadata {
        async fn fetch_metadata(&self, identifier: &str) -> Result<EntityMetadata> {
            Ok(EntityMetadata {
                display_name: format!("{identifier} Inc."),
                logo_url: None,
            })
        }
    }

    fn descending_aapl() -> Vec<Bar> {
        vec![
            bar("2025-03-07", 158.0, 160.0),
            bar("2025-03-05", 152.0, 155.0),
            bar("2025-03-03", 150.0, 151.0),
        ]
    }

    fn lookup_with(provider: MockSeriesProvider) -> (SeriesLookup, Arc<MockSeriesProvider>) {
        let provider = Arc::new(provider);
        let lookup = SeriesLookup::new(provider.clone()).with_clock(|| day("2025-03-08"));
        (lookup, provider)
    }

    #[tokio::test]
    async fn test_bars_normalized_and_summarized() {
        let (lookup, _) =
            lookup_with(MockSeriesProvider::default().with_bars("AAPL", descending_aapl()));

        assert_eq!(
            lookup.request("aapl", SeriesRange::Week).await,
            Completion::Applied
        );
        let state = lookup.state();
        let view = state.success().expect("series view");
        assert_eq!(view.symbol, "AAPL");
        assert!(view.bars.windows(2).all(|w| w[0].date < w[1].date));
        assert_eq!(view.summary.change_abs_display(), "10.00");
        assert_eq!(view.summary.change_pct_display(), "6.67");
        assert_eq!(view.summary.latest.date, day("2025-03-07"));
    }

    #[tokio::test]
    async fn test_window_computed_from_clock() {
        let (lookup, provider) =
            lookup_with(MockSeriesProvider::default().with_bars("AAPL", descending_aapl()));

        lookup.request("AAPL", SeriesRange::Week).await;
        let requests = provider.requests.lock().unwrap();
        assert_eq!(
            requests[0],
            ("AAPL".to_string(), day("2025-03-01"), day("2025-03-08"))
        );
    }

    #[tokio::test]
    async fn test_empty_result_is_a_failure() {
        let (lookup, _) = lookup_with(MockSeriesProvider::default().with_bars("AAPL", vec![]));

        lookup.request("AAPL", SeriesRange::Week).await;
        assert!(matches!(
            lookup.state(),
            LookupState::Failed(LookupError::EmptyResult(_))
        ));
    }

    #[tokio::test]
    async fn test_failure_clears_previous_success() {
        let (lookup, _) =
            lookup_with(MockSeriesProvider::default().with_bars("AAPL", descending_aapl()));

        lookup.request("AAPL", SeriesRange::Month).await;
        assert!(lookup.state().success().is_some());

        lookup.request("NOPE", SeriesRange::Month).await;
        assert_eq!(
            lookup.state(),
            LookupState::Failed(LookupError::UnknownIdentifier("NOPE".to_string()))
        );
    }

    #[tokio::test]
    async fn test_same_request_twice_is_idempotent() {
        let (lookup, _) =
            lookup_with(MockSeriesProvider::default().with_bars("AAPL", descending_aapl()));

        lookup.request("AAPL", SeriesRange::Month).await;
        let first = lookup.state().success().cloned().unwrap();
        lookup.request("AAPL", SeriesRange::Month).await;
        let second = lookup.state().success().cloned().unwrap();
        assert_eq!(first.summary, second.summary);
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_does_not_overwrite_newer_symbol() {
        let (lookup, _) = lookup_with(
            MockSeriesProvider::default()
                .with_bars("AAPL", descending_aapl())
                .with_bars("MSFT", vec![bar("2025-03-03", 400.0, 410.0)])
                .with_delay("AAPL", Duration::from_millis(500))
                .with_delay("MSFT", Duration::from_millis(50)),
        );

        let (aapl, msft) = tokio::join!(
            lookup.request("AAPL", SeriesRange::Week),
            lookup.request("MSFT", SeriesRange::Week)
        );
        assert_eq!(aapl, Completion::Superseded);
        assert_eq!(msft, Completion::Applied);
        assert_eq!(lookup.state().success().unwrap().symbol, "MSFT");
    }

    #[tokio::test]
    async fn test_metadata_failure_degrades_to_placeholder() {
        let provider = Arc::new(MockSeriesProvider::default().with_bars("MSFT", descending_aapl()));
        let lookup = SeriesLookup::new(provider)
            .with_metadata(Arc::new(FailingMetadata))
            .with_clock(|| day("2025-03-08"));

        assert_eq!(
            lookup.request("MSFT", SeriesRange::Week).await,
            Completion::Applied
        );
        let identity = lookup.state().success().unwrap().identity.clone();
        assert!(identity.is_placeholder());
        assert_eq!(identity.placeholder, "M");
    }

    struct StalledMetadata;

    #[async_trait]
    impl MetadataProvider for StalledMetadata {
        async fn fetch_metadata(&self, _identifier: &str) -> Result<EntityMetadata> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Err(LookupError::Transport("timed out".to_string()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stalled_metadata_does_not_hold_back_bars() {
        let provider = Arc::new(MockSeriesProvider::default().with_bars("MSFT", descending_aapl()));
        let lookup = SeriesLookup::new(provider)
            .with_metadata(Arc::new(StalledMetadata))
            .with_clock(|| day("2025-03-08"));

        let started = tokio::time::Instant::now();
        assert_eq!(
            lookup.request("MSFT", SeriesRange::Week).await,
            Completion::Applied
        );
        assert!(started.elapsed() < Duration::from_secs(3));
        assert!(lookup.state().success().unwrap().identity.is_placeholder());
    }

    #[tokio::test]
    async fn test_metadata_enriches_identity() {
        let provider = Arc::new(MockSeriesProvider::default().with_bars("MSFT", descending_aapl()));
        let lookup = SeriesLookup::new(provider)
            .with_metadata(Arc::new(StaticMetadata))
            .with_clock(|| day("2025-03-08"));

        lookup.request("MSFT", SeriesRange::Week).await;
        assert_eq!(
            lookup.state().success().unwrap().identity.display_name.as_deref(),
            Some("MSFT Inc.")
        );
    }

    #[tokio::test]
    async fn test_empty_symbol_is_rejected() {
        let (lookup, provider) = lookup_with(MockSeriesProvider::default());
        lookup.request("   ", SeriesRange::Week).await;
        assert!(matches!(
            lookup.state(),
            LookupState::Failed(LookupError::InvalidInput(_))
        ));
        assert!(provider.requests.lock().unwrap().is_empty());
    }
}
