use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        carts::{Address, AppliedCoupon, CartLine, CartModel, CartTotals, SelectedShipping},
        enums::{cart_statuses::CartStatus, coupon_kinds::CouponKind},
        tenant::TenantId,
    },
    infra::db::postgres::schema::{cart_items, carts},
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = carts, primary_key(tenant_id, id))]
pub struct CartEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub session_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: String,
    pub currency: String,
    pub shipping_address: Option<serde_json::Value>,
    pub billing_address: Option<serde_json::Value>,
    pub coupon_code: Option<String>,
    pub coupon_kind: Option<String>,
    pub coupon_value: Option<i64>,
    pub shipping_option_id: Option<Uuid>,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub total_minor: i64,
    pub last_activity_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = carts)]
pub struct InsertCartEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub session_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: String,
    pub currency: String,
    pub last_activity_at: DateTime<Utc>,
}

/// Full rewrite of the mutable cart columns after a mutation.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = carts, treat_none_as_null = true)]
pub struct UpdateCartEntity {
    pub status: String,
    pub shipping_address: Option<serde_json::Value>,
    pub billing_address: Option<serde_json::Value>,
    pub coupon_code: Option<String>,
    pub coupon_kind: Option<String>,
    pub coupon_value: Option<i64>,
    pub shipping_option_id: Option<Uuid>,
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub total_minor: i64,
    pub last_activity_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable, Insertable)]
#[diesel(table_name = cart_items, primary_key(tenant_id, id))]
pub struct CartItemEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub unit_price_minor: i64,
    pub quantity: i32,
    pub weight_grams: i64,
    pub requires_shipping: bool,
    pub is_digital: bool,
    pub is_service: bool,
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl CartItemEntity {
    pub fn from_line(
        tenant_id: TenantId,
        cart_id: Uuid,
        position: i32,
        line: &CartLine,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.as_uuid(),
            id: line.id,
            cart_id,
            product_id: line.product_id,
            name: line.name.clone(),
            sku: line.sku.clone(),
            unit_price_minor: line.unit_price_minor,
            quantity: line.quantity,
            weight_grams: line.weight_grams,
            requires_shipping: line.requires_shipping,
            is_digital: line.is_digital,
            is_service: line.is_service,
            position,
            created_at: now,
        }
    }
}

impl From<CartItemEntity> for CartLine {
    fn from(entity: CartItemEntity) -> Self {
        Self {
            id: entity.id,
            product_id: entity.product_id,
            name: entity.name,
            sku: entity.sku,
            unit_price_minor: entity.unit_price_minor,
            quantity: entity.quantity,
            weight_grams: entity.weight_grams,
            requires_shipping: entity.requires_shipping,
            is_digital: entity.is_digital,
            is_service: entity.is_service,
        }
    }
}

pub(crate) fn address_from_json(value: Option<serde_json::Value>) -> Result<Option<Address>> {
    value
        .map(serde_json::from_value::<Address>)
        .transpose()
        .context("stored address is not valid JSON")
}

pub(crate) fn address_to_json(address: Option<&Address>) -> Result<Option<serde_json::Value>> {
    address
        .map(serde_json::to_value)
        .transpose()
        .context("failed to encode address")
}

impl CartEntity {
    pub fn into_model(self, items: Vec<CartItemEntity>) -> Result<CartModel> {
        let status = CartStatus::from_str(&self.status)
            .with_context(|| format!("unknown cart status `{}`", self.status))?;

        let coupon = match (self.coupon_code, self.coupon_kind, self.coupon_value) {
            (Some(code), Some(kind), Some(value)) => Some(AppliedCoupon {
                kind: CouponKind::from_str(&kind)
                    .with_context(|| format!("unknown coupon kind `{kind}`"))?,
                code,
                value,
            }),
            _ => None,
        };

        let shipping = self.shipping_option_id.map(|option_id| SelectedShipping {
            option_id,
            price_minor: self.shipping_minor,
        });

        Ok(CartModel {
            id: self.id,
            tenant_id: TenantId::new(self.tenant_id),
            session_id: self.session_id,
            user_id: self.user_id,
            status,
            currency: self.currency,
            lines: items.into_iter().map(CartLine::from).collect(),
            shipping_address: address_from_json(self.shipping_address)?,
            billing_address: address_from_json(self.billing_address)?,
            coupon,
            shipping,
            totals: CartTotals {
                subtotal_minor: self.subtotal_minor,
                tax_minor: self.tax_minor,
                discount_minor: self.discount_minor,
                shipping_minor: self.shipping_minor,
                total_minor: self.total_minor,
            },
            last_activity_at: self.last_activity_at,
        })
    }
}

impl UpdateCartEntity {
    pub fn from_model(cart: &CartModel, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            status: cart.status.to_string(),
            shipping_address: address_to_json(cart.shipping_address.as_ref())?,
            billing_address: address_to_json(cart.billing_address.as_ref())?,
            coupon_code: cart.coupon.as_ref().map(|c| c.code.clone()),
            coupon_kind: cart.coupon.as_ref().map(|c| c.kind.to_string()),
            coupon_value: cart.coupon.as_ref().map(|c| c.value),
            shipping_option_id: cart.shipping.map(|s| s.option_id),
            subtotal_minor: cart.totals.subtotal_minor,
            tax_minor: cart.totals.tax_minor,
            discount_minor: cart.totals.discount_minor,
            shipping_minor: cart.totals.shipping_minor,
            total_minor: cart.totals.total_minor,
            last_activity_at: cart.last_activity_at,
            updated_at: now,
        })
    }
}
