//! Order lifecycle endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, Query, State};
use chrono::{DateTime, Utc};
use domain::{
    ChangeStatus, CreateOrder, ItemChange, NewItem, Order, OrderService, OrderStats, OrderStatus,
    UpdateOrder,
};
use order_store::{ItemId, ListQuery, OrderId, OrderStore};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::ApiError;

/// Pagination defaults matching the storefront client.
const DEFAULT_PER_PAGE: u32 = 10;
const MAX_PER_PAGE: u32 = 100;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub order_service: OrderService<S>,
}

// -- Request types --

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrderRequest {
    #[validate(length(min = 1, max = 255, message = "customer_name must be 1-255 characters"))]
    pub customer_name: String,
    #[validate(
        email(message = "customer_email must be a valid email address"),
        length(max = 255, message = "customer_email must be at most 255 characters")
    )]
    pub customer_email: String,
    #[validate(length(max = 50, message = "customer_phone must be at most 50 characters"))]
    pub customer_phone: Option<String>,
    pub total_amount: Decimal,
    #[validate(length(min = 1, message = "items must contain at least one entry"), nested)]
    pub items: Vec<NewItemRequest>,
}

impl CreateOrderRequest {
    fn validate_amounts(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();
        if self.total_amount < Decimal::ZERO {
            errors.add("total_amount", negative_amount());
        }
        if self.items.iter().any(|item| item.unit_price < Decimal::ZERO) {
            errors.add("items", negative_amount());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct NewItemRequest {
    #[validate(length(min = 1, max = 255, message = "product_name must be 1-255 characters"))]
    pub product_name: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateOrderRequest {
    #[validate(length(min = 1, max = 255, message = "customer_name must be 1-255 characters"))]
    pub customer_name: Option<String>,
    #[validate(
        email(message = "customer_email must be a valid email address"),
        length(max = 255, message = "customer_email must be at most 255 characters")
    )]
    pub customer_email: Option<String>,
    /// Absent leaves the phone unchanged, an explicit `null` clears it.
    #[serde(default, deserialize_with = "double_option")]
    #[validate(length(max = 50, message = "customer_phone must be at most 50 characters"))]
    pub customer_phone: Option<Option<String>>,
    pub total_amount: Option<Decimal>,
    #[validate(length(min = 1, message = "items must contain at least one entry"), nested)]
    pub items: Option<Vec<ItemChangeRequest>>,
}

impl UpdateOrderRequest {
    fn validate_amounts(&self) -> Result<(), ApiError> {
        let mut errors = ValidationErrors::new();
        if self.total_amount.is_some_and(|amount| amount < Decimal::ZERO) {
            errors.add("total_amount", negative_amount());
        }
        if self
            .items
            .as_ref()
            .is_some_and(|items| items.iter().any(|item| item.unit_price < Decimal::ZERO))
        {
            errors.add("items", negative_amount());
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(errors))
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Validate)]
pub struct ItemChangeRequest {
    /// Present for edits to existing items, absent for new ones.
    pub id: Option<ItemId>,
    #[validate(length(min = 1, max = 255, message = "product_name must be 1-255 characters"))]
    pub product_name: String,
    #[validate(range(min = 1, message = "quantity must be at least 1"))]
    pub quantity: i32,
    pub unit_price: Decimal,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ChangeStatusRequest {
    pub status: OrderStatus,
    #[validate(length(max = 500, message = "message must be at most 500 characters"))]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub search: Option<String>,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: String,
    pub order_number: String,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub total_amount: Decimal,
    pub status: OrderStatus,
    pub items: Vec<OrderItemResponse>,
    pub status_logs: Vec<StatusLogResponse>,
    pub allowed_transitions: Vec<OrderStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub id: String,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Serialize)]
pub struct StatusLogResponse {
    pub id: String,
    pub status: OrderStatus,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize)]
pub struct OrderListResponse {
    pub items: Vec<OrderResponse>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let items = order
            .items
            .iter()
            .map(|item| OrderItemResponse {
                id: item.id.to_string(),
                product_name: item.product_name.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.line_total(),
            })
            .collect();

        let status_logs = order
            .status_logs
            .iter()
            .map(|log| StatusLogResponse {
                id: log.id.to_string(),
                status: log.status,
                message: log.message.clone(),
                created_at: log.created_at,
            })
            .collect();

        OrderResponse {
            id: order.id.to_string(),
            order_number: order.order_number.to_string(),
            customer_name: order.customer_name,
            customer_email: order.customer_email,
            customer_phone: order.customer_phone.unwrap_or_default(),
            total_amount: order.total_amount,
            status: order.status,
            items,
            status_logs,
            allowed_transitions: order.status.allowed_transitions().to_vec(),
            created_at: order.created_at,
            updated_at: order.updated_at,
        }
    }
}

// -- Handlers --

/// POST /orders: creates a new order with its items.
#[tracing::instrument(skip(state, req))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(req): Json<CreateOrderRequest>,
) -> Result<(axum::http::StatusCode, Json<OrderResponse>), ApiError> {
    req.validate()?;
    req.validate_amounts()?;

    let items = req
        .items
        .into_iter()
        .map(|item| NewItem::new(item.product_name, item.quantity, item.unit_price))
        .collect();

    let cmd = CreateOrder::new(
        req.customer_name,
        req.customer_email,
        req.total_amount,
        items,
    );
    let cmd = match req.customer_phone {
        Some(phone) => cmd.with_phone(phone),
        None => cmd,
    };

    let order = state.order_service.create(cmd).await?;

    Ok((axum::http::StatusCode::CREATED, Json(order.into())))
}

/// GET /orders/:id: loads one order with items and status history.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    let order = state.order_service.get(order_id).await?;

    Ok(Json(order.into()))
}

/// PUT /orders/:id: updates customer fields and replaces items.
#[tracing::instrument(skip(state, req))]
pub async fn update<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateOrderRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    req.validate()?;
    req.validate_amounts()?;

    let cmd = UpdateOrder {
        customer_name: req.customer_name,
        customer_email: req.customer_email,
        customer_phone: req.customer_phone,
        total_amount: req.total_amount,
        items: req.items.map(|items| {
            items
                .into_iter()
                .map(|item| ItemChange {
                    id: item.id,
                    product_name: item.product_name,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect()
        }),
    };

    let order = state.order_service.update(order_id, cmd).await?;

    Ok(Json(order.into()))
}

/// PATCH /orders/:id/status: moves an order along the status machine.
#[tracing::instrument(skip(state, req))]
pub async fn change_status<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<String>,
    Json(req): Json<ChangeStatusRequest>,
) -> Result<Json<OrderResponse>, ApiError> {
    let order_id = parse_order_id(&id)?;
    req.validate()?;

    let cmd = ChangeStatus {
        status: req.status,
        message: req.message,
    };

    let order = state.order_service.change_status(order_id, cmd).await?;

    Ok(Json(order.into()))
}

/// GET /orders: lists orders newest first, paginated and searchable.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Query(params): Query<ListParams>,
) -> Result<Json<OrderListResponse>, ApiError> {
    let mut query = ListQuery::default()
        .page(params.page.unwrap_or(1).max(1))
        .per_page(
            params
                .per_page
                .unwrap_or(DEFAULT_PER_PAGE)
                .clamp(1, MAX_PER_PAGE),
        );
    if let Some(term) = params.search.filter(|term| !term.trim().is_empty()) {
        query = query.search(term);
    }

    let page = state.order_service.list(query).await?;

    Ok(Json(OrderListResponse {
        page: page.page,
        per_page: page.per_page,
        total_items: page.total_items,
        total_pages: page.total_pages,
        items: page.items.into_iter().map(OrderResponse::from).collect(),
    }))
}

/// GET /orders/stats: dashboard counters over the whole order book.
#[tracing::instrument(skip(state))]
pub async fn stats<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<OrderStats>, ApiError> {
    let stats = state.order_service.stats().await?;

    Ok(Json(stats))
}

fn parse_order_id(id: &str) -> Result<OrderId, ApiError> {
    id.parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid order ID: {e}")))
}

fn negative_amount() -> ValidationError {
    let mut error = ValidationError::new("range");
    error.message = Some("must not be negative".into());
    error
}

/// Distinguishes an absent field from an explicit `null`.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}
