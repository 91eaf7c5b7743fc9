use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::{
        entities::carts::{address_from_json, address_to_json},
        value_objects::{
            carts::CartLine,
            enums::{
                fulfillment_statuses::FulfillmentStatus, order_item_statuses::OrderItemStatus,
                order_payment_statuses::OrderPaymentStatus, order_statuses::OrderStatus,
            },
            order_state::{OrderItemTimestamps, OrderState, OrderTimestamps},
            orders::{OrderDraft, OrderItemModel, OrderModel},
            tenant::TenantId,
        },
    },
    infra::db::postgres::schema::{order_items, order_number_sequences, orders},
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = orders, primary_key(tenant_id, id))]
pub struct OrderEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub order_number: String,
    pub cart_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub currency: String,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub total_minor: i64,
    pub refunded_minor: i64,
    pub coupon_code: Option<String>,
    pub shipping_option_id: Option<Uuid>,
    pub shipping_address: Option<serde_json::Value>,
    pub billing_address: Option<serde_json::Value>,
    pub payment_method_code: String,
    pub has_physical_items: bool,
    pub has_digital_items: bool,
    pub has_services: bool,
    pub cancel_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = orders)]
pub struct InsertOrderEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub order_number: String,
    pub cart_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub currency: String,
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub total_minor: i64,
    pub refunded_minor: i64,
    pub coupon_code: Option<String>,
    pub shipping_option_id: Option<Uuid>,
    pub shipping_address: Option<serde_json::Value>,
    pub billing_address: Option<serde_json::Value>,
    pub payment_method_code: String,
    pub has_physical_items: bool,
    pub has_digital_items: bool,
    pub has_services: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Columns a state transition may touch.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = orders, treat_none_as_null = true)]
pub struct UpdateOrderStateEntity {
    pub status: String,
    pub payment_status: String,
    pub fulfillment_status: String,
    pub refunded_minor: i64,
    pub cancel_reason: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = order_items, primary_key(tenant_id, id))]
pub struct OrderItemEntity {
    pub tenant_id: Uuid,
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
    pub status: String,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = order_items, treat_none_as_null = true)]
pub struct UpdateOrderItemStatusEntity {
    pub status: String,
    pub shipped_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub refunded_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = order_number_sequences)]
pub struct InsertOrderNumberSequenceEntity {
    pub tenant_id: Uuid,
    pub day: NaiveDate,
    pub last_value: i64,
}

impl InsertOrderEntity {
    pub fn from_draft(tenant_id: TenantId, order_number: String, draft: &OrderDraft) -> Result<Self> {
        Ok(Self {
            tenant_id: tenant_id.as_uuid(),
            id: draft.order_id,
            order_number,
            cart_id: draft.cart_id,
            customer_id: draft.customer_id,
            currency: draft.currency.clone(),
            status: OrderStatus::Pending.to_string(),
            payment_status: OrderPaymentStatus::Pending.to_string(),
            fulfillment_status: FulfillmentStatus::Unfulfilled.to_string(),
            subtotal_minor: draft.subtotal_minor,
            tax_minor: draft.tax_minor,
            discount_minor: draft.discount_minor,
            shipping_minor: draft.shipping_minor,
            total_minor: draft.total_minor,
            refunded_minor: 0,
            coupon_code: draft.coupon_code.clone(),
            shipping_option_id: draft.shipping_option_id,
            shipping_address: address_to_json(draft.shipping_address.as_ref())?,
            billing_address: address_to_json(draft.billing_address.as_ref())?,
            payment_method_code: draft.payment_method_code.clone(),
            has_physical_items: draft.has_physical_items,
            has_digital_items: draft.has_digital_items,
            has_services: draft.has_services,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        })
    }
}

impl OrderItemEntity {
    pub fn from_line(
        tenant_id: TenantId,
        order_id: Uuid,
        line: &CartLine,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.as_uuid(),
            id: Uuid::new_v4(),
            order_id,
            product_id: line.product_id,
            name: line.name.clone(),
            sku: line.sku.clone(),
            unit_price_minor: line.unit_price_minor,
            quantity: line.quantity,
            total_minor: line.line_total_minor(),
            weight_grams: line.weight_grams,
            requires_shipping: line.requires_shipping,
            is_digital: line.is_digital,
            is_service: line.is_service,
            status: OrderItemStatus::Pending.to_string(),
            shipped_at: None,
            delivered_at: None,
            cancelled_at: None,
            refunded_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn into_model(self) -> Result<OrderItemModel> {
        let status = OrderItemStatus::from_str(&self.status)
            .with_context(|| format!("unknown order item status `{}`", self.status))?;

        Ok(OrderItemModel {
            id: self.id,
            order_id: self.order_id,
            product_id: self.product_id,
            name: self.name,
            sku: self.sku,
            unit_price_minor: self.unit_price_minor,
            quantity: self.quantity,
            total_minor: self.total_minor,
            weight_grams: self.weight_grams,
            requires_shipping: self.requires_shipping,
            is_digital: self.is_digital,
            is_service: self.is_service,
            status,
            timestamps: OrderItemTimestamps {
                shipped_at: self.shipped_at,
                delivered_at: self.delivered_at,
                cancelled_at: self.cancelled_at,
                refunded_at: self.refunded_at,
            },
        })
    }
}

impl OrderEntity {
    pub fn state(&self) -> Result<OrderState> {
        Ok(OrderState {
            status: OrderStatus::from_str(&self.status)
                .with_context(|| format!("unknown order status `{}`", self.status))?,
            payment_status: OrderPaymentStatus::from_str(&self.payment_status).with_context(
                || format!("unknown order payment status `{}`", self.payment_status),
            )?,
            fulfillment_status: FulfillmentStatus::from_str(&self.fulfillment_status)
                .with_context(|| {
                    format!("unknown fulfillment status `{}`", self.fulfillment_status)
                })?,
            total_minor: self.total_minor,
            refunded_minor: self.refunded_minor,
            cancel_reason: self.cancel_reason.clone(),
            timestamps: OrderTimestamps {
                paid_at: self.paid_at,
                shipped_at: self.shipped_at,
                delivered_at: self.delivered_at,
                completed_at: self.completed_at,
                cancelled_at: self.cancelled_at,
                refunded_at: self.refunded_at,
            },
        })
    }

    pub fn into_model(self, items: Vec<OrderItemEntity>) -> Result<OrderModel> {
        let state = self.state()?;
        let items = items
            .into_iter()
            .map(OrderItemEntity::into_model)
            .collect::<Result<Vec<_>>>()?;

        Ok(OrderModel {
            id: self.id,
            tenant_id: TenantId::new(self.tenant_id),
            order_number: self.order_number,
            cart_id: self.cart_id,
            customer_id: self.customer_id,
            currency: self.currency,
            subtotal_minor: self.subtotal_minor,
            tax_minor: self.tax_minor,
            discount_minor: self.discount_minor,
            shipping_minor: self.shipping_minor,
            coupon_code: self.coupon_code,
            shipping_option_id: self.shipping_option_id,
            shipping_address: address_from_json(self.shipping_address)?,
            billing_address: address_from_json(self.billing_address)?,
            payment_method_code: self.payment_method_code,
            has_physical_items: self.has_physical_items,
            has_digital_items: self.has_digital_items,
            has_services: self.has_services,
            state,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

impl UpdateOrderStateEntity {
    pub fn from_state(state: &OrderState, now: DateTime<Utc>) -> Self {
        let stamps = state.timestamps;
        Self {
            status: state.status.to_string(),
            payment_status: state.payment_status.to_string(),
            fulfillment_status: state.fulfillment_status.to_string(),
            refunded_minor: state.refunded_minor,
            cancel_reason: state.cancel_reason.clone(),
            paid_at: stamps.paid_at,
            shipped_at: stamps.shipped_at,
            delivered_at: stamps.delivered_at,
            completed_at: stamps.completed_at,
            cancelled_at: stamps.cancelled_at,
            refunded_at: stamps.refunded_at,
            updated_at: now,
        }
    }
}
