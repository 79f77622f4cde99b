//! Order history endpoints (finalized orders only).

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use common::OrderId;
use serde::Serialize;
use store::OrderStore;
use uuid::Uuid;

use crate::error::ApiError;
use crate::identity::CustomerIdentity;
use crate::routes::cart::{AppState, CartLineResponse, OrderResponse, cart_line_response, order_response};

#[derive(Serialize)]
pub struct OrderSummaryResponse {
    pub id: String,
    pub status: String,
    pub total_cents: i64,
    pub item_count: i64,
    pub created_at: String,
}

#[derive(Serialize)]
pub struct OrderDetailResponse {
    pub order: OrderResponse,
    pub items: Vec<CartLineResponse>,
}

/// GET /orders — the customer's finalized orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
) -> Result<Json<Vec<OrderSummaryResponse>>, ApiError> {
    let summaries = state.history.list_orders(customer_id).await?;

    let responses = summaries
        .iter()
        .map(|s| OrderSummaryResponse {
            id: s.order.id.to_string(),
            status: s.order.status.to_string(),
            total_cents: s.order.total.cents(),
            item_count: s.item_count,
            created_at: s.order.created_at.to_rfc3339(),
        })
        .collect();

    Ok(Json(responses))
}

/// GET /orders/{id} — one finalized order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + Clone + 'static>(
    State(state): State<Arc<AppState<S>>>,
    CustomerIdentity(customer_id): CustomerIdentity,
    Path(id): Path<String>,
) -> Result<Json<OrderDetailResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let (order, items) = state.history.get_order(customer_id, order_id).await?;

    Ok(Json(OrderDetailResponse {
        order: order_response(&order),
        items: items.iter().map(cart_line_response).collect(),
    }))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    let uuid = Uuid::parse_str(id)
        .map_err(|e| ApiError::BadRequest(format!("invalid order id: {e}")))?;
    Ok(OrderId::from_uuid(uuid))
}
