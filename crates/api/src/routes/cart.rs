//! Cart and checkout endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use checkout::{CheckoutOrchestrator, SimulatedPaymentAuthority};
use common::ProductId;
use domain::{CartManager, ItemChange, OrderHistory};
use serde::{Deserialize, Serialize};
use store::{CartLine, LineItemRecord, OrderRecord, OrderStore};
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CustomerIdentity;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub cart: CartManager<S>,
    pub checkout: CheckoutOrchestrator<S, SimulatedPaymentAuthority>,
    pub history: OrderHistory<S>,
}

// -- Request types --

#[derive(Debug, Deserialize)]
pub struct AddItemRequest {
    pub product_id: Uuid,
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateItemRequest {
    pub quantity: i64,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub customer_id: String,
    pub status: String,
    pub total_cents: i64,
}

#[derive(Serialize)]
pub struct CartLineResponse {
    pub product_id: String,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct ItemResponse {
    pub product_id: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub line_total_cents: i64,
}

#[derive(Serialize)]
pub struct CartResponse {
    pub cart: OrderResponse,
    pub items: Vec<CartLineResponse>,
}

#[derive(Serialize)]
pub struct CheckoutResponse {
    pub order: OrderResponse,
    pub new_cart_id: String,
}

pub(crate) fn order_response(order: &OrderRecord) -> OrderResponse {
    OrderResponse {
        id: order.id.to_string(),
        customer_id: order.customer_id.to_string(),
        status: order.status.to_string(),
        total_cents: order.total.cents(),
    }
}

pub(crate) fn cart_line_response(line: &CartLine) -> CartLineResponse {
    CartLineResponse {
        product_id: line.product_id.to_string(),
        product_name: line.product_name.clone(),
        quantity: line.quantity,
        unit_price_cents: line.unit_price.cents(),
        line_total_cents: line.line_total().cents(),
    }
}

fn item_response(item: &LineItemRecord) -> ItemResponse {
    ItemResponse {
        product_id: item.product_id.to_string(),
        quantity: item.quantity,
        unit_price_cents: item.unit_price.cents(),
        line_total_cents: item.line_total().cents(),
    }
}

/// Rejects quantities below 1 before they reach the domain layer, so a
/// negative number maps to the same response as zero.
fn parse_quantity(quantity: i64) -> Result<u32, ApiError> {
    u32::try_from(quantity)
        .ok()
        .filter(|q| *q >= 1)
        .ok_or_else(|| ApiError::BadRequest(format!("quantity must be at least 1, got {quantity}")))
}

// -- Handlers --

/// GET /cart — the customer's open cart with its items, created lazily.
#[tracing::instrument(skip(state))]
pub async fn get_cart<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
) -> Result<Json<CartResponse>, ApiError> {
    let (order, lines) = state.cart.cart_with_items(customer_id).await?;

    Ok(Json(CartResponse {
        cart: order_response(&order),
        items: lines.iter().map(cart_line_response).collect(),
    }))
}

/// POST /cart/items — add a product to the cart.
///
/// Returns 201 for a fresh line item, 200 when the addition merged into an
/// existing one.
#[tracing::instrument(skip(state))]
pub async fn add_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
    Json(req): Json<AddItemRequest>,
) -> Result<(StatusCode, Json<ItemResponse>), ApiError> {
    let quantity = req.quantity.map(parse_quantity).transpose()?;

    let open = state.cart.get_or_create_cart(customer_id).await?;
    let (item, change) = state
        .cart
        .add_item(open.id, ProductId::from_uuid(req.product_id), quantity)
        .await?;

    let status = match change {
        ItemChange::Added => StatusCode::CREATED,
        ItemChange::Merged => StatusCode::OK,
    };

    Ok((status, Json(item_response(&item))))
}

/// PUT /cart/items/{product_id} — overwrite a line item's quantity.
#[tracing::instrument(skip(state))]
pub async fn update_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
    Path(product_id): Path<Uuid>,
    Json(req): Json<UpdateItemRequest>,
) -> Result<Json<ItemResponse>, ApiError> {
    let quantity = parse_quantity(req.quantity)?;

    let open = state.cart.get_or_create_cart(customer_id).await?;
    let item = state
        .cart
        .update_item_quantity(open.id, ProductId::from_uuid(product_id), quantity)
        .await?;

    Ok(Json(item_response(&item)))
}

/// DELETE /cart/items/{product_id} — remove a line item.
#[tracing::instrument(skip(state))]
pub async fn remove_item<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
    Path(product_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let open = state.cart.get_or_create_cart(customer_id).await?;
    state
        .cart
        .remove_item(open.id, ProductId::from_uuid(product_id))
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/checkout — convert the open cart into a completed order.
#[tracing::instrument(skip(state))]
pub async fn checkout<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
) -> Result<Json<CheckoutResponse>, ApiError> {
    let outcome = state.checkout.checkout(customer_id).await?;

    Ok(Json(CheckoutResponse {
        order: order_response(&outcome.order),
        new_cart_id: outcome.new_cart_id.to_string(),
    }))
}
