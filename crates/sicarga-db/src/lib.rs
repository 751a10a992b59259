//! # sicarga-db: Database Layer for SicargaBox
//!
//! SQLite persistence for accounts, clients, the tariff schedule, quotes,
//! shipments and system parameters, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        SicargaBox Data Flow                             │
//! │                                                                         │
//! │  axum handler (POST /api/cotizaciones/{id}/articulos/)                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    sicarga-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ UserRepo      │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ ClientRepo    │    │ 001_schema   │  │   │
//! │  │   │               │    │ TariffRepo    │    │ 002_fts      │  │   │
//! │  │   │               │    │ QuoteRepo     │    │ 003_indexes  │  │   │
//! │  │   │               │    │ ShipmentRepo  │    │              │  │   │
//! │  │   │               │    │ ParameterRepo │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   import.rs: tariff schedule CSV → TariffItem                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  sicarga.db (WAL)                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use sicarga_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("sicarga.db")).await?;
//! let hits = db.tariffs().autocomplete("lapt", 20).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod import;
pub mod migrations;
pub mod password;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use import::{import_schedule, read_schedule, ImportSummary};
pub use password::{hash_password, verify_password};
pub use pool::{Database, DbConfig};

pub use repository::client::{ClientFilter, ClientRepository};
pub use repository::parameter::ParameterRepository;
pub use repository::quote::{QuoteFilter, QuoteRepository, QuoteWithItems};
pub use repository::shipment::{ShipmentFilter, ShipmentRepository, StatusChange};
pub use repository::tariff::{AutocompleteHit, TariffFilter, TariffOrdering, TariffRepository};
pub use repository::user::UserRepository;
pub use repository::{Page, PageRequest};
