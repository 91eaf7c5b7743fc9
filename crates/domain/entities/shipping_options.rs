use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::{
    domain::value_objects::{
        shipping::{NewShippingOption, ShippingOptionModel},
        tenant::TenantId,
    },
    infra::db::postgres::schema::shipping_options,
};

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = shipping_options, primary_key(tenant_id, id))]
pub struct ShippingOptionEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub pricing: serde_json::Value,
    pub base_price_minor: i64,
    pub free_shipping_threshold_minor: Option<i64>,
    pub min_order_value_minor: Option<i64>,
    pub max_order_value_minor: Option<i64>,
    pub estimated_delivery_days: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = shipping_options)]
pub struct InsertShippingOptionEntity {
    pub tenant_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub pricing: serde_json::Value,
    pub base_price_minor: i64,
    pub free_shipping_threshold_minor: Option<i64>,
    pub min_order_value_minor: Option<i64>,
    pub max_order_value_minor: Option<i64>,
    pub estimated_delivery_days: Option<i32>,
    pub is_active: bool,
    pub sort_order: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InsertShippingOptionEntity {
    pub fn new(tenant_id: TenantId, option: NewShippingOption, now: DateTime<Utc>) -> Result<Self> {
        Ok(Self {
            tenant_id: tenant_id.as_uuid(),
            id: Uuid::new_v4(),
            name: option.name,
            pricing: serde_json::to_value(&option.pricing)
                .context("failed to encode shipping pricing")?,
            base_price_minor: option.base_price_minor,
            free_shipping_threshold_minor: option.free_shipping_threshold_minor,
            min_order_value_minor: option.min_order_value_minor,
            max_order_value_minor: option.max_order_value_minor,
            estimated_delivery_days: option.estimated_delivery_days,
            is_active: true,
            sort_order: option.sort_order,
            created_at: now,
            updated_at: now,
        })
    }
}

impl TryFrom<ShippingOptionEntity> for ShippingOptionModel {
    type Error = anyhow::Error;

    fn try_from(entity: ShippingOptionEntity) -> Result<Self> {
        let pricing = serde_json::from_value(entity.pricing).with_context(|| {
            format!("shipping option {} has an invalid pricing document", entity.id)
        })?;

        Ok(Self {
            id: entity.id,
            tenant_id: TenantId::new(entity.tenant_id),
            name: entity.name,
            pricing,
            base_price_minor: entity.base_price_minor,
            free_shipping_threshold_minor: entity.free_shipping_threshold_minor,
            min_order_value_minor: entity.min_order_value_minor,
            max_order_value_minor: entity.max_order_value_minor,
            estimated_delivery_days: entity.estimated_delivery_days,
            is_active: entity.is_active,
            sort_order: entity.sort_order,
        })
    }
}
