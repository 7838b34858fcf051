// Usage and billing statistics for a GreenMobility account

pub mod analytics;
pub mod cache;
pub mod config;
pub mod graphql;
pub mod models;
pub mod pagination;
pub mod pipeline;
pub mod rest_api;
pub mod session;
pub mod transport;

// Re-export key types for convenience
pub use analytics::{AggregateReport, AnalyticsError, FinancialSummary, UsageSummary};
pub use cache::{CacheError, DatasetCache};
pub use config::{ClientConfig, ConfigError, PagingConfig, Thresholds};
pub use graphql::GraphqlClient;
pub use models::{Bill, Financials, Reservation, User, Voucher};
pub use pagination::{collect_pages, PageCursor};
pub use rest_api::RestClient;
pub use session::{SessionCredential, SessionError, SessionResolver};
pub use transport::{ApiRequest, HttpTransport, Transport, TransportError};
