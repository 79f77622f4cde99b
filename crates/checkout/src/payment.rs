//! Payment authority trait and simulated implementation.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use common::{CustomerId, Money, OrderId};

use crate::error::CheckoutError;

/// Proof of a successful authorization.
#[derive(Debug, Clone)]
pub struct PaymentAuthorization {
    /// The payment ID assigned by the payment authority.
    pub payment_id: String,
}

/// Trait for payment authorization.
///
/// A bounded-latency external call; timeout and cancellation policy belong
/// to the implementation, not to the checkout flow.
#[async_trait]
pub trait PaymentAuthority: Send + Sync {
    /// Authorizes a charge for the given amount.
    ///
    /// Returns [`CheckoutError::PaymentDeclined`] when the charge is
    /// refused.
    async fn authorize(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<PaymentAuthorization, CheckoutError>;
}

#[derive(Debug, Default)]
struct SimulatedPaymentState {
    authorizations: HashMap<String, (OrderId, CustomerId, Money)>,
    next_id: u32,
    decline_all: bool,
}

/// Simulated payment authority: approves everything after a fixed delay.
///
/// Stands in for a real processor integration (a non-goal). Tests can flip
/// it into declining every charge.
#[derive(Debug, Clone)]
pub struct SimulatedPaymentAuthority {
    state: Arc<RwLock<SimulatedPaymentState>>,
    delay: Duration,
}

/// Settlement delay the stub applies to every authorization.
const DEFAULT_SETTLEMENT_DELAY: Duration = Duration::from_millis(250);

impl SimulatedPaymentAuthority {
    /// Creates a simulated authority with the default settlement delay.
    pub fn new() -> Self {
        Self::with_delay(DEFAULT_SETTLEMENT_DELAY)
    }

    /// Creates a simulated authority with a specific settlement delay.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            state: Arc::new(RwLock::new(SimulatedPaymentState::default())),
            delay,
        }
    }

    /// Configures the authority to decline every charge.
    pub fn set_decline(&self, decline: bool) {
        self.state.write().unwrap().decline_all = decline;
    }

    /// Returns the number of recorded authorizations.
    pub fn authorization_count(&self) -> usize {
        self.state.read().unwrap().authorizations.len()
    }

    /// Returns true if an authorization exists with the given ID.
    pub fn has_authorization(&self, payment_id: &str) -> bool {
        self.state
            .read()
            .unwrap()
            .authorizations
            .contains_key(payment_id)
    }
}

impl Default for SimulatedPaymentAuthority {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentAuthority for SimulatedPaymentAuthority {
    async fn authorize(
        &self,
        order_id: OrderId,
        customer_id: CustomerId,
        amount: Money,
    ) -> Result<PaymentAuthorization, CheckoutError> {
        tokio::time::sleep(self.delay).await;

        let mut state = self.state.write().unwrap();

        if state.decline_all {
            return Err(CheckoutError::PaymentDeclined(
                "charge refused by simulated issuer".to_string(),
            ));
        }

        state.next_id += 1;
        let payment_id = format!("PAY-{:04}", state.next_id);
        state
            .authorizations
            .insert(payment_id.clone(), (order_id, customer_id, amount));

        Ok(PaymentAuthorization { payment_id })
    }
}
