//! Checkout orchestration: the cart → order transition.
//!
//! Converts a customer's open cart into a completed order: validate the
//! cart, compute the total over captured unit prices, authorize payment,
//! decrement inventory, flip the order's status, and provision the next
//! cart. All of it runs inside one storage transaction, so any failure at
//! any step leaves the original cart open and untouched.

pub mod error;
pub mod orchestrator;
pub mod payment;

pub use error::CheckoutError;
pub use orchestrator::{CheckoutOrchestrator, CheckoutOutcome};
pub use payment::{PaymentAuthority, PaymentAuthorization, SimulatedPaymentAuthority};
