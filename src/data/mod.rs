//! Data layer: typed records, loading, enrichment, filtering and aggregation.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader  │  parse file → RentalTable
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐      ┌─────────┐
//!   │  derive  │ ◄──  │  cache  │  memoised per source fingerprint
//!   └──────────┘      └─────────┘
//!        │
//!        ▼
//!   ┌──────────────┐
//!   │ EnrichedTable│  Vec<EnrichedRecord>, year index
//!   └──────────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter  │  year / working day / seasons → FilteredView
//!   └──────────┘
//!        │
//!        ▼
//!   ┌───────────┐
//!   │ aggregate │  indicators + grouped means → DashboardView
//!   └───────────┘
//! ```

pub mod aggregate;
pub mod cache;
pub mod derive;
pub mod filter;
pub mod loader;
pub mod model;
