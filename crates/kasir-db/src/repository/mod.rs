//! # Repository Module
//!
//! Database repository implementations for Kasir POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  HTTP handler / OrderService                                           │
//! │       │                                                                 │
//! │       │  db.products().get_by_id(7)                                    │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── list(&self, name_filter)                                          │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, input)                                              │
//! │  ├── update(&self, id, input)                                          │
//! │  └── delete(&self, id)                                                 │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`CategoryRepository`](category::CategoryRepository) - Category CRUD
//! - [`ProductRepository`](product::ProductRepository) - Product CRUD and name search
//! - [`TransactionRepository`](transaction::TransactionRepository) - Atomic
//!   sale commit, lookup, daily aggregation

pub mod category;
pub mod product;
pub mod transaction;
