//! Orchestrates the cart → completed-order transition.

use common::{CustomerId, Money, OrderId};
use domain::{DomainError, inventory, tx::discard};
use store::{OrderRecord, OrderStore, OrderTx};

use crate::error::CheckoutError;
use crate::payment::PaymentAuthority;

/// Result of a successful checkout: the finalized order and the fresh cart
/// provisioned for the customer's next purchases.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub order: OrderRecord,
    pub new_cart_id: OrderId,
}

/// Drives the state machine over the order entity: `cart` → `completed`.
///
/// The whole flow is one storage transaction; every failure path rolls back,
/// leaving the original cart open and unmodified. No other transition is
/// defined — terminal orders are never reopened.
pub struct CheckoutOrchestrator<S, P> {
    store: S,
    payment: P,
}

impl<S, P> CheckoutOrchestrator<S, P>
where
    S: OrderStore,
    P: PaymentAuthority,
{
    /// Creates a new checkout orchestrator.
    pub fn new(store: S, payment: P) -> Self {
        Self { store, payment }
    }

    /// Converts the customer's open cart into a completed order.
    #[tracing::instrument(skip(self))]
    pub async fn checkout(
        &self,
        customer_id: CustomerId,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        metrics::counter!("checkout_attempts_total").increment(1);
        let started = std::time::Instant::now();

        let mut tx = self.store.begin().await?;
        match self.run(&mut tx, customer_id).await {
            Ok(outcome) => {
                tx.commit().await?;
                metrics::counter!("checkout_completed_total").increment(1);
                metrics::histogram!("checkout_duration_seconds")
                    .record(started.elapsed().as_secs_f64());
                tracing::info!(
                    order_id = %outcome.order.id,
                    total = %outcome.order.total,
                    new_cart_id = %outcome.new_cart_id,
                    "checkout completed"
                );
                Ok(outcome)
            }
            Err(err) => {
                metrics::counter!("checkout_failed_total").increment(1);
                discard(tx).await;
                Err(err)
            }
        }
    }

    async fn run(
        &self,
        tx: &mut S::Tx,
        customer_id: CustomerId,
    ) -> Result<CheckoutOutcome, CheckoutError> {
        // 1. Resolve the open cart, locking its row against concurrent
        //    mutation and concurrent checkout.
        let cart = tx
            .find_open_order(customer_id)
            .await?
            .ok_or(CheckoutError::CartNotFound(customer_id))?;

        // 2. An empty cart has nothing to check out.
        let lines = tx.list_cart_lines(cart.id).await?;
        if lines.is_empty() {
            return Err(CheckoutError::EmptyCart(cart.id));
        }

        // 3. Total over the captured unit prices, not live catalog prices.
        let total = lines
            .iter()
            .fold(Money::zero(), |acc, line| acc + line.line_total());

        // 4. Authorize payment before any inventory write.
        let authorization = self.payment.authorize(cart.id, customer_id, total).await?;
        tracing::debug!(payment_id = %authorization.payment_id, %total, "payment authorized");

        // 5. Decrement stock for every line item.
        for line in &lines {
            inventory::decrement(tx, line.product_id, line.quantity).await?;
        }

        // 6. Flip the order to completed with its authoritative total.
        let order = tx.complete_order(cart.id, total).await?.ok_or_else(|| {
            CheckoutError::Domain(DomainError::Conflict(format!(
                "cart {} was completed concurrently",
                cart.id
            )))
        })?;

        // 7. Provision the next cart so future operations have a target.
        let new_cart = tx.insert_open_order(customer_id).await?;

        Ok(CheckoutOutcome {
            order,
            new_cart_id: new_cart.id,
        })
    }
}
