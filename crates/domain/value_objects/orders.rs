use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::value_objects::{
    carts::{Address, CartLine, CartModel},
    enums::{
        fulfillment_statuses::FulfillmentStatus, order_item_statuses::OrderItemStatus,
        order_statuses::OrderStatus,
    },
    order_state::{OrderItemTimestamps, OrderState},
    tenant::TenantId,
};

pub const DEFAULT_ORDER_NUMBER_PREFIX: &str = "ORD";

/// `{prefix}{YYMMDD}{sequence}` with the daily sequence zero-padded to four digits.
pub fn format_order_number(prefix: &str, day: NaiveDate, sequence: i64) -> String {
    format!("{prefix}{}{sequence:04}", day.format("%y%m%d"))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderItemModel {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub unit_price_minor: i64,
    pub quantity: i32,
    pub total_minor: i64,
    pub weight_grams: i64,
    pub requires_shipping: bool,
    pub is_digital: bool,
    pub is_service: bool,
    pub status: OrderItemStatus,
    #[serde(flatten)]
    pub timestamps: OrderItemTimestamps,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OrderModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub order_number: String,
    pub cart_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub currency: String,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub coupon_code: Option<String>,
    pub shipping_option_id: Option<Uuid>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method_code: String,
    pub has_physical_items: bool,
    pub has_digital_items: bool,
    pub has_services: bool,
    #[serde(flatten)]
    pub state: OrderState,
    pub items: Vec<OrderItemModel>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrderModel {
    pub fn status(&self) -> OrderStatus {
        self.state.status
    }

    pub fn total_minor(&self) -> i64 {
        self.state.total_minor
    }
}

/// Snapshot of a cart taken at checkout. The repository assigns the order
/// number and converts the cart in the same transaction that stores it.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderDraft {
    pub order_id: Uuid,
    pub cart_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub currency: String,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub total_minor: i64,
    pub coupon_code: Option<String>,
    pub shipping_option_id: Option<Uuid>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub payment_method_code: String,
    pub has_physical_items: bool,
    pub has_digital_items: bool,
    pub has_services: bool,
    pub lines: Vec<CartLine>,
    pub created_at: DateTime<Utc>,
}

impl OrderDraft {
    pub fn from_cart(cart: &CartModel, payment_method_code: &str, now: DateTime<Utc>) -> Self {
        let lines = cart.lines.clone();
        Self {
            order_id: Uuid::new_v4(),
            cart_id: cart.id,
            customer_id: cart.user_id,
            currency: cart.currency.clone(),
            subtotal_minor: cart.totals.subtotal_minor,
            tax_minor: cart.totals.tax_minor,
            discount_minor: cart.totals.discount_minor,
            shipping_minor: cart.totals.shipping_minor,
            total_minor: cart.totals.total_minor,
            coupon_code: cart.coupon.as_ref().map(|c| c.code.clone()),
            shipping_option_id: cart.shipping.map(|s| s.option_id),
            shipping_address: cart.shipping_address.clone(),
            billing_address: cart.billing_address.clone(),
            payment_method_code: payment_method_code.to_string(),
            has_physical_items: lines
                .iter()
                .any(|l| l.requires_shipping && !l.is_digital && !l.is_service),
            has_digital_items: lines.iter().any(|l| l.is_digital),
            has_services: lines.iter().any(|l| l.is_service),
            lines,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaceOrderRequest {
    pub cart_id: Uuid,
    pub payment_method_code: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderStatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateFulfillmentRequest {
    pub fulfillment_status: FulfillmentStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateOrderItemStatusRequest {
    pub status: OrderItemStatus,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CancelOrderRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefundOrderRequest {
    pub amount_minor: i64,
    #[serde(default)]
    pub reason: Option<String>,
}
