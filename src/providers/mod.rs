pub mod exchange_rate;
pub mod polygon;
pub mod util;

pub use exchange_rate::ExchangeRateApiProvider;
pub use polygon::PolygonProvider;
