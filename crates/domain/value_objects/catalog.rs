use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::domain::value_objects::{
    carts::{AppliedCoupon, CartLine},
    enums::coupon_kinds::CouponKind,
    tenant::TenantId,
};

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProductModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub name: String,
    pub sku: Option<String>,
    pub price_minor: i64,
    pub weight_grams: i64,
    pub requires_shipping: bool,
    pub is_digital: bool,
    pub is_service: bool,
    pub stock_quantity: i32,
    pub is_active: bool,
}

impl ProductModel {
    /// Price and flags are copied so later catalog edits do not reach the cart.
    pub fn to_cart_line(&self, quantity: i32) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product_id: self.id,
            name: self.name.clone(),
            sku: self.sku.clone(),
            unit_price_minor: self.price_minor,
            quantity,
            weight_grams: self.weight_grams,
            requires_shipping: self.requires_shipping,
            is_digital: self.is_digital,
            is_service: self.is_service,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CouponModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
}

impl CouponModel {
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    pub fn snapshot(&self) -> AppliedCoupon {
        AppliedCoupon {
            code: self.code.clone(),
            kind: self.kind,
            value: self.value,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn expired_or_inactive_coupons_are_not_redeemable() {
        let now = Utc::now();
        let mut coupon = CouponModel {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(Uuid::new_v4()),
            code: "WELCOME".to_string(),
            kind: CouponKind::Percentage,
            value: 1_000,
            is_active: true,
            expires_at: Some(now + Duration::days(1)),
        };
        assert!(coupon.is_redeemable(now));

        coupon.expires_at = Some(now - Duration::seconds(1));
        assert!(!coupon.is_redeemable(now));

        coupon.expires_at = None;
        coupon.is_active = false;
        assert!(!coupon.is_redeemable(now));
    }
}
