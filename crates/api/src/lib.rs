//! HTTP API server for the order management system.
//!
//! Exposes the cart lifecycle (get, item mutation, checkout) and the order
//! history, with structured logging (tracing) and Prometheus metrics. The
//! customer identity arrives from the upstream authentication layer; see
//! [`identity`].

pub mod config;
pub mod error;
pub mod identity;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{CheckoutOrchestrator, SimulatedPaymentAuthority};
use domain::{CartManager, OrderHistory};
use metrics_exporter_prometheus::PrometheusHandle;
use store::OrderStore;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use routes::cart::AppState;

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: OrderStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::render))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/cart", get(routes::cart::get_cart::<S>))
        .route("/cart/items", post(routes::cart::add_item::<S>))
        .route(
            "/cart/items/{product_id}",
            put(routes::cart::update_item::<S>).delete(routes::cart::remove_item::<S>),
        )
        .route("/cart/checkout", post(routes::cart::checkout::<S>))
        .route("/orders", get(routes::orders::list::<S>))
        .route("/orders/{id}", get(routes::orders::get::<S>))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}

/// Creates application state over the given store and payment authority.
pub fn create_state<S: OrderStore + Clone + 'static>(
    store: S,
    payment: SimulatedPaymentAuthority,
) -> Arc<AppState<S>> {
    Arc::new(AppState {
        cart: CartManager::new(store.clone()),
        checkout: CheckoutOrchestrator::new(store.clone(), payment),
        history: OrderHistory::new(store),
    })
}

/// Creates application state with the default always-approve payment stub.
pub fn create_default_state<S: OrderStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    create_state(store, SimulatedPaymentAuthority::new())
}
