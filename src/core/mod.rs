//! Core business logic abstractions

pub mod config;
pub mod currency;
pub mod debounce;
pub mod error;
pub mod log;
pub mod lookup;
pub mod metadata;
pub mod picker;
pub mod rate_lookup;
pub mod search;
pub mod series;
pub mod series_lookup;

// Re-export main types for cleaner imports
pub use currency::{CurrencyList, CurrencyRateProvider, Quote};
pub use error::LookupError;
pub use lookup::{Completion, LookupSlot, LookupState};
pub use metadata::{EntityIdentity, EntityMetadata, MetadataProvider};
pub use picker::{CandidateList, PickerOptions, SymbolPicker};
pub use rate_lookup::{Conversion, RateLookup, TriggerPolicy};
pub use search::{SearchCandidate, SymbolSearchProvider};
pub use series::{Bar, SeriesProvider, SeriesRange, SeriesSummary};
pub use series_lookup::{SeriesLookup, SeriesView};
