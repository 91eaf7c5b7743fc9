use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        catalog::{CouponModel, ProductModel},
        enums::coupon_kinds::CouponKind,
        tenant::TenantId,
    },
    infra::db::postgres::schema::{coupons, products},
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = products, primary_key(tenant_id, id))]
pub struct ProductEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub price_minor: i64,
    pub weight_grams: i64,
    pub requires_shipping: bool,
    pub is_digital: bool,
    pub is_service: bool,
    pub stock_quantity: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = coupons, primary_key(tenant_id, id))]
pub struct CouponEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub code: String,
    pub kind: String,
    pub value: i64,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<ProductEntity> for ProductModel {
    fn from(entity: ProductEntity) -> Self {
        Self {
            id: entity.id,
            tenant_id: TenantId::new(entity.tenant_id),
            name: entity.name,
            sku: entity.sku,
            price_minor: entity.price_minor,
            weight_grams: entity.weight_grams,
            requires_shipping: entity.requires_shipping,
            is_digital: entity.is_digital,
            is_service: entity.is_service,
            stock_quantity: entity.stock_quantity,
            is_active: entity.is_active,
        }
    }
}

impl TryFrom<CouponEntity> for CouponModel {
    type Error = anyhow::Error;

    fn try_from(entity: CouponEntity) -> Result<Self> {
        Ok(Self {
            id: entity.id,
            tenant_id: TenantId::new(entity.tenant_id),
            kind: CouponKind::from_str(&entity.kind)
                .with_context(|| format!("unknown coupon kind `{}`", entity.kind))?,
            code: entity.code,
            value: entity.value,
            is_active: entity.is_active,
            expires_at: entity.expires_at,
        })
    }
}
