//! Integration tests for the checkout orchestrator.

use std::time::Duration;

use checkout::{CheckoutError, CheckoutOrchestrator, SimulatedPaymentAuthority};
use common::{CustomerId, Money, OrderId, OrderStatus, ProductId};
use domain::{CartManager, DomainError, OrderHistory};
use store::InMemoryOrderStore;

type TestOrchestrator = CheckoutOrchestrator<InMemoryOrderStore, SimulatedPaymentAuthority>;

struct TestHarness {
    orchestrator: TestOrchestrator,
    cart: CartManager<InMemoryOrderStore>,
    history: OrderHistory<InMemoryOrderStore>,
    store: InMemoryOrderStore,
    payment: SimulatedPaymentAuthority,
}

impl TestHarness {
    fn new() -> Self {
        let store = InMemoryOrderStore::new();
        let payment = SimulatedPaymentAuthority::with_delay(Duration::ZERO);

        Self {
            orchestrator: CheckoutOrchestrator::new(store.clone(), payment.clone()),
            cart: CartManager::new(store.clone()),
            history: OrderHistory::new(store.clone()),
            store,
            payment,
        }
    }

    /// Seeds a product and fills a fresh cart with it.
    async fn filled_cart(
        &self,
        price_cents: i64,
        stock: i64,
        quantity: u32,
    ) -> (CustomerId, OrderId, ProductId) {
        let customer = CustomerId::new();
        let product = self
            .store
            .insert_product("Widget", Money::from_cents(price_cents), stock)
            .await;
        let open = self.cart.get_or_create_cart(customer).await.unwrap();
        self.cart
            .add_item(open.id, product.id, Some(quantity))
            .await
            .unwrap();
        (customer, open.id, product.id)
    }
}

#[tokio::test]
async fn happy_path_completes_order_and_provisions_new_cart() {
    let h = TestHarness::new();
    // Price $10.00, quantity 2: the total must come out at $20.00.
    let (customer, cart_id, product_id) = h.filled_cart(1000, 10, 2).await;

    let outcome = h.orchestrator.checkout(customer).await.unwrap();

    assert_eq!(outcome.order.id, cart_id);
    assert_eq!(outcome.order.status, OrderStatus::Completed);
    assert_eq!(outcome.order.total.cents(), 2000);
    assert_ne!(outcome.new_cart_id, outcome.order.id);

    assert_eq!(h.store.product_stock(product_id).await, Some(8));
    assert_eq!(h.store.open_order_count(customer).await, 1);
    assert_eq!(h.payment.authorization_count(), 1);

    // The new cart is the customer's open cart now, and it is empty.
    let open = h.cart.get_or_create_cart(customer).await.unwrap();
    assert_eq!(open.id, outcome.new_cart_id);
    assert!(h.cart.list_items(open.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn total_sums_all_line_items() {
    let h = TestHarness::new();
    let customer = CustomerId::new();
    let widget = h
        .store
        .insert_product("Widget", Money::from_cents(1000), 10)
        .await;
    let gadget = h
        .store
        .insert_product("Gadget", Money::from_cents(2500), 10)
        .await;

    let open = h.cart.get_or_create_cart(customer).await.unwrap();
    h.cart.add_item(open.id, widget.id, Some(2)).await.unwrap();
    h.cart.add_item(open.id, gadget.id, Some(3)).await.unwrap();

    let outcome = h.orchestrator.checkout(customer).await.unwrap();

    assert_eq!(outcome.order.total.cents(), 2 * 1000 + 3 * 2500);
    assert_eq!(h.store.product_stock(widget.id).await, Some(8));
    assert_eq!(h.store.product_stock(gadget.id).await, Some(7));
}

#[tokio::test]
async fn checkout_without_cart_fails() {
    let h = TestHarness::new();

    let err = h.orchestrator.checkout(CustomerId::new()).await.unwrap_err();
    assert!(matches!(err, CheckoutError::CartNotFound(_)));
}

#[tokio::test]
async fn checkout_empty_cart_fails_and_completes_nothing() {
    let h = TestHarness::new();
    let customer = CustomerId::new();
    let open = h.cart.get_or_create_cart(customer).await.unwrap();

    let err = h.orchestrator.checkout(customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart(_)));

    // The cart is still the customer's open order and nothing finalized.
    let after = h.cart.get_or_create_cart(customer).await.unwrap();
    assert_eq!(after.id, open.id);
    assert!(h.history.list_orders(customer).await.unwrap().is_empty());
    assert_eq!(h.payment.authorization_count(), 0);
}

#[tokio::test]
async fn payment_decline_rolls_everything_back() {
    let h = TestHarness::new();
    let (customer, cart_id, product_id) = h.filled_cart(1000, 10, 2).await;
    h.payment.set_decline(true);

    let err = h.orchestrator.checkout(customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::PaymentDeclined(_)));

    // No stock decrement, no status flip, no new cart.
    assert_eq!(h.store.product_stock(product_id).await, Some(10));
    let open = h.cart.get_or_create_cart(customer).await.unwrap();
    assert_eq!(open.id, cart_id);
    assert_eq!(open.status, OrderStatus::Cart);
    assert_eq!(h.store.open_order_count(customer).await, 1);
    assert_eq!(h.store.line_item_count(cart_id).await, 1);
    assert!(h.history.list_orders(customer).await.unwrap().is_empty());

    // Approving again makes the same cart checkoutable.
    h.payment.set_decline(false);
    let outcome = h.orchestrator.checkout(customer).await.unwrap();
    assert_eq!(outcome.order.id, cart_id);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_earlier_decrements() {
    let h = TestHarness::new();
    let customer = CustomerId::new();
    let plenty = h
        .store
        .insert_product("Widget", Money::from_cents(1000), 10)
        .await;
    let scarce = h
        .store
        .insert_product("Gadget", Money::from_cents(2500), 1)
        .await;

    let open = h.cart.get_or_create_cart(customer).await.unwrap();
    h.cart.add_item(open.id, plenty.id, Some(2)).await.unwrap();
    h.cart.add_item(open.id, scarce.id, Some(5)).await.unwrap();

    let err = h.orchestrator.checkout(customer).await.unwrap_err();
    assert!(matches!(
        err,
        CheckoutError::Domain(DomainError::InsufficientStock { .. })
    ));

    // Both products keep their stock, including the one decremented first.
    assert_eq!(h.store.product_stock(plenty.id).await, Some(10));
    assert_eq!(h.store.product_stock(scarce.id).await, Some(1));
    let after = h.cart.get_or_create_cart(customer).await.unwrap();
    assert_eq!(after.id, open.id);
    assert_eq!(after.status, OrderStatus::Cart);
}

#[tokio::test]
async fn second_checkout_sees_the_fresh_empty_cart() {
    let h = TestHarness::new();
    let (customer, _, _) = h.filled_cart(1000, 10, 2).await;

    h.orchestrator.checkout(customer).await.unwrap();

    let err = h.orchestrator.checkout(customer).await.unwrap_err();
    assert!(matches!(err, CheckoutError::EmptyCart(_)));
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_checkouts_complete_exactly_once() {
    let h = TestHarness::new();
    let (customer, _, product_id) = h.filled_cart(1000, 10, 2).await;

    let store = h.store.clone();
    let payment = h.payment.clone();
    let first = tokio::spawn(async move {
        CheckoutOrchestrator::new(store, payment)
            .checkout(customer)
            .await
    });
    let store = h.store.clone();
    let payment = h.payment.clone();
    let second = tokio::spawn(async move {
        CheckoutOrchestrator::new(store, payment)
            .checkout(customer)
            .await
    });

    let results = [first.await.unwrap(), second.await.unwrap()];
    let completed = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(completed, 1);
    assert!(
        results
            .iter()
            .any(|r| matches!(r, Err(CheckoutError::EmptyCart(_))))
    );

    // Stock was decremented exactly once.
    assert_eq!(h.store.product_stock(product_id).await, Some(8));
    assert_eq!(h.store.open_order_count(customer).await, 1);
}

#[tokio::test]
async fn completed_order_shows_up_in_history() {
    let h = TestHarness::new();
    let (customer, cart_id, _) = h.filled_cart(1000, 10, 2).await;

    h.orchestrator.checkout(customer).await.unwrap();

    let orders = h.history.list_orders(customer).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(orders[0].order.id, cart_id);
    assert_eq!(orders[0].item_count, 1);
    assert_eq!(orders[0].order.total.cents(), 2000);

    let (order, items) = h.history.get_order(customer, cart_id).await.unwrap();
    assert_eq!(order.status, OrderStatus::Completed);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, 2);
}
