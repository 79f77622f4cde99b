//! Domain services for the order management system.
//!
//! This crate provides the request-scoped services over the store boundary:
//! - [`CartManager`]: lookup-or-create of the single open cart per customer
//!   and mutation of its line items
//! - [`inventory`]: the inventory ledger (transaction-scoped stock
//!   decrements)
//! - [`OrderHistory`]: read-only queries over finalized orders

pub mod cart;
pub mod error;
pub mod history;
pub mod inventory;
pub mod tx;

pub use cart::{CartManager, ItemChange};
pub use error::DomainError;
pub use history::OrderHistory;
