use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::{cart_statuses::CartStatus, coupon_kinds::CouponKind},
    tenant::TenantId,
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Address {
    pub recipient_name: String,
    pub line1: String,
    #[serde(default)]
    pub line2: Option<String>,
    pub city: String,
    #[serde(default)]
    pub state: Option<String>,
    pub postal_code: String,
    pub country: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    /// Tax document of the payer, forwarded to the gateway as billing identity.
    #[serde(default)]
    pub document: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub name: String,
    pub sku: Option<String>,
    pub unit_price_minor: i64,
    pub quantity: i32,
    pub weight_grams: i64,
    pub requires_shipping: bool,
    pub is_digital: bool,
    pub is_service: bool,
}

impl CartLine {
    /// Saturates instead of wrapping; carts reject lines whose total overflows.
    pub fn line_total_minor(&self) -> i64 {
        self.unit_price_minor.saturating_mul(i64::from(self.quantity))
    }

    pub fn checked_line_total_minor(&self) -> Option<i64> {
        self.unit_price_minor.checked_mul(i64::from(self.quantity))
    }

    /// Weight that counts towards shipping. Digital and service lines never ship.
    pub fn shipping_weight_grams(&self) -> i64 {
        if self.requires_shipping && !self.is_digital && !self.is_service {
            self.weight_grams * i64::from(self.quantity)
        } else {
            0
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AppliedCoupon {
    pub code: String,
    pub kind: CouponKind,
    pub value: i64,
}

impl AppliedCoupon {
    /// Discount for the given subtotal, never negative and never above it.
    pub fn discount_for(&self, subtotal_minor: i64) -> i64 {
        let raw = match self.kind {
            CouponKind::Percentage => subtotal_minor * self.value / 10_000,
            CouponKind::Fixed => self.value,
        };
        raw.clamp(0, subtotal_minor.max(0))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct SelectedShipping {
    pub option_id: Uuid,
    pub price_minor: i64,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CartTotals {
    pub subtotal_minor: i64,
    pub tax_minor: i64,
    pub discount_minor: i64,
    pub shipping_minor: i64,
    pub total_minor: i64,
}

impl CartTotals {
    pub fn compute(
        lines: &[CartLine],
        coupon: Option<&AppliedCoupon>,
        shipping: Option<&SelectedShipping>,
        tax_minor: i64,
    ) -> Self {
        let subtotal_minor: i64 = lines.iter().map(CartLine::line_total_minor).sum();
        let discount_minor = coupon.map_or(0, |c| c.discount_for(subtotal_minor));
        let shipping_minor = shipping.map_or(0, |s| s.price_minor);

        Self {
            subtotal_minor,
            tax_minor,
            discount_minor,
            shipping_minor,
            total_minor: subtotal_minor + shipping_minor + tax_minor - discount_minor,
        }
    }
}

fn checked_subtotal_minor(lines: &[CartLine]) -> Option<i64> {
    lines.iter().try_fold(0_i64, |subtotal, line| {
        subtotal.checked_add(line.checked_line_total_minor()?)
    })
}

pub fn shippable_weight_grams(lines: &[CartLine]) -> i64 {
    lines.iter().map(CartLine::shipping_weight_grams).sum()
}

pub fn requires_shipping(lines: &[CartLine]) -> bool {
    lines.iter().any(|line| line.shipping_weight_grams() > 0 || line.requires_shipping)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CartError {
    #[error("cart is {0} and can no longer be changed")]
    Closed(CartStatus),
    #[error("cart items are locked while checkout is in progress")]
    CheckoutInProgress,
    #[error("cart item {0} not found")]
    ItemNotFound(Uuid),
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("only {available} units in stock")]
    InsufficientStock { available: i32 },
    #[error("cannot start checkout with an empty cart")]
    Empty,
    #[error("cart has already been converted into an order")]
    AlreadyConverted,
    #[error("cart amount is too large")]
    AmountOverflow,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CartMutation {
    /// Adds a line, merging into an existing line for the same product.
    AddItem { line: CartLine, stock_quantity: i32 },
    /// Quantity 0 removes the line.
    UpdateQuantity {
        item_id: Uuid,
        quantity: i32,
        stock_quantity: i32,
    },
    RemoveItem { item_id: Uuid },
    /// `None` leaves the current address in place.
    SetAddresses {
        shipping: Option<Address>,
        billing: Option<Address>,
    },
    ApplyCoupon(Option<AppliedCoupon>),
    SelectShipping(Option<SelectedShipping>),
    StartCheckout,
}

impl CartMutation {
    fn touches_items(&self) -> bool {
        matches!(
            self,
            CartMutation::AddItem { .. }
                | CartMutation::UpdateQuantity { .. }
                | CartMutation::RemoveItem { .. }
                | CartMutation::ApplyCoupon(_)
        )
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CartModel {
    pub id: Uuid,
    pub tenant_id: TenantId,
    pub session_id: Option<String>,
    pub user_id: Option<Uuid>,
    pub status: CartStatus,
    pub currency: String,
    pub lines: Vec<CartLine>,
    pub shipping_address: Option<Address>,
    pub billing_address: Option<Address>,
    pub coupon: Option<AppliedCoupon>,
    pub shipping: Option<SelectedShipping>,
    pub totals: CartTotals,
    pub last_activity_at: DateTime<Utc>,
}

impl CartModel {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn requires_shipping(&self) -> bool {
        requires_shipping(&self.lines)
    }

    pub fn shippable_weight_grams(&self) -> i64 {
        shippable_weight_grams(&self.lines)
    }

    /// Applies one mutation and recomputes the totals.
    ///
    /// On error the model is left untouched.
    pub fn apply(&mut self, mutation: CartMutation, now: DateTime<Utc>) -> Result<(), CartError> {
        if self.status.is_closed() {
            return Err(CartError::Closed(self.status));
        }
        if self.status == CartStatus::CheckoutStarted && mutation.touches_items() {
            return Err(CartError::CheckoutInProgress);
        }

        let snapshot = matches!(
            mutation,
            CartMutation::AddItem { .. } | CartMutation::UpdateQuantity { .. }
        )
        .then(|| (self.lines.clone(), self.shipping));

        match mutation {
            CartMutation::AddItem {
                line,
                stock_quantity,
            } => {
                if line.quantity < 1 {
                    return Err(CartError::InvalidQuantity);
                }
                match self
                    .lines
                    .iter_mut()
                    .find(|existing| existing.product_id == line.product_id)
                {
                    Some(existing) => {
                        let merged = existing.quantity + line.quantity;
                        if merged > stock_quantity {
                            return Err(CartError::InsufficientStock {
                                available: stock_quantity,
                            });
                        }
                        existing.quantity = merged;
                        existing.unit_price_minor = line.unit_price_minor;
                    }
                    None => {
                        if line.quantity > stock_quantity {
                            return Err(CartError::InsufficientStock {
                                available: stock_quantity,
                            });
                        }
                        self.lines.push(line);
                    }
                }
                self.shipping = None;
            }
            CartMutation::UpdateQuantity {
                item_id,
                quantity,
                stock_quantity,
            } => {
                if quantity < 0 {
                    return Err(CartError::InvalidQuantity);
                }
                let index = self
                    .lines
                    .iter()
                    .position(|line| line.id == item_id)
                    .ok_or(CartError::ItemNotFound(item_id))?;
                if quantity == 0 {
                    self.lines.remove(index);
                } else {
                    if quantity > stock_quantity {
                        return Err(CartError::InsufficientStock {
                            available: stock_quantity,
                        });
                    }
                    self.lines[index].quantity = quantity;
                }
                self.shipping = None;
            }
            CartMutation::RemoveItem { item_id } => {
                let before = self.lines.len();
                self.lines.retain(|line| line.id != item_id);
                if self.lines.len() == before {
                    return Err(CartError::ItemNotFound(item_id));
                }
                self.shipping = None;
            }
            CartMutation::SetAddresses { shipping, billing } => {
                if let Some(address) = shipping {
                    if self.shipping_address.as_ref() != Some(&address) {
                        self.shipping = None;
                    }
                    self.shipping_address = Some(address);
                }
                if let Some(address) = billing {
                    self.billing_address = Some(address);
                }
            }
            CartMutation::ApplyCoupon(coupon) => {
                self.coupon = coupon;
            }
            CartMutation::SelectShipping(selection) => {
                self.shipping = selection;
            }
            CartMutation::StartCheckout => {
                if self.lines.is_empty() {
                    return Err(CartError::Empty);
                }
                self.status = CartStatus::CheckoutStarted;
            }
        }

        if let Some((lines, shipping)) = snapshot {
            if checked_subtotal_minor(&self.lines).is_none() {
                self.lines = lines;
                self.shipping = shipping;
                return Err(CartError::AmountOverflow);
            }
        }

        self.recalculate();
        self.last_activity_at = now;
        Ok(())
    }

    pub fn recalculate(&mut self) {
        self.totals = CartTotals::compute(
            &self.lines,
            self.coupon.as_ref(),
            self.shipping.as_ref(),
            self.totals.tax_minor,
        );
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCartRequest {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub user_id: Option<Uuid>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddCartItemRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetCartAddressesRequest {
    #[serde(default)]
    pub shipping_address: Option<Address>,
    #[serde(default)]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApplyCouponRequest {
    /// `None` removes the applied coupon.
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SelectShippingRequest {
    #[serde(default)]
    pub shipping_option_id: Option<Uuid>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32, weight_grams: i64, physical: bool) -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: "item".to_string(),
            sku: None,
            unit_price_minor: price,
            quantity,
            weight_grams,
            requires_shipping: physical,
            is_digital: !physical,
            is_service: false,
        }
    }

    fn empty_cart() -> CartModel {
        CartModel {
            id: Uuid::new_v4(),
            tenant_id: TenantId::new(Uuid::new_v4()),
            session_id: Some("session".to_string()),
            user_id: None,
            status: CartStatus::Active,
            currency: "BRL".to_string(),
            lines: Vec::new(),
            shipping_address: None,
            billing_address: None,
            coupon: None,
            shipping: None,
            totals: CartTotals::default(),
            last_activity_at: Utc::now(),
        }
    }

    fn assert_total_identity(cart: &CartModel) {
        let t = cart.totals;
        assert_eq!(
            t.total_minor,
            t.subtotal_minor + t.shipping_minor + t.tax_minor - t.discount_minor
        );
    }

    #[test]
    fn physical_and_digital_mix_weights_only_physical_lines() {
        let mut cart = empty_cart();
        let physical = line(10_000, 2, 500, true);
        let digital = line(5_000, 1, 300, false);

        cart.apply(
            CartMutation::AddItem {
                line: physical,
                stock_quantity: 10,
            },
            Utc::now(),
        )
        .unwrap();
        cart.apply(
            CartMutation::AddItem {
                line: digital,
                stock_quantity: 10,
            },
            Utc::now(),
        )
        .unwrap();

        assert_eq!(cart.shippable_weight_grams(), 1_000);
        assert_eq!(cart.totals.subtotal_minor, 25_000);
        assert!(cart.requires_shipping());
        assert_total_identity(&cart);
    }

    #[test]
    fn totals_hold_after_every_mutation() {
        let mut cart = empty_cart();
        let first = line(1_999, 3, 200, true);
        let first_id = first.id;
        let now = Utc::now();

        let steps = vec![
            CartMutation::AddItem {
                line: first,
                stock_quantity: 10,
            },
            CartMutation::AddItem {
                line: line(4_550, 1, 0, false),
                stock_quantity: 5,
            },
            CartMutation::ApplyCoupon(Some(AppliedCoupon {
                code: "TEN".to_string(),
                kind: CouponKind::Percentage,
                value: 1_000,
            })),
            CartMutation::SelectShipping(Some(SelectedShipping {
                option_id: Uuid::new_v4(),
                price_minor: 1_500,
            })),
            CartMutation::UpdateQuantity {
                item_id: first_id,
                quantity: 1,
                stock_quantity: 10,
            },
            CartMutation::ApplyCoupon(Some(AppliedCoupon {
                code: "BIG".to_string(),
                kind: CouponKind::Fixed,
                value: 1_000_000,
            })),
            CartMutation::RemoveItem { item_id: first_id },
        ];

        for step in steps {
            cart.apply(step, now).unwrap();
            assert_total_identity(&cart);
        }

        // fixed coupon larger than the subtotal is capped
        assert_eq!(cart.totals.discount_minor, cart.totals.subtotal_minor);
        assert_eq!(cart.totals.total_minor, 0);
    }

    #[test]
    fn item_changes_clear_shipping_selection() {
        let mut cart = empty_cart();
        let now = Utc::now();
        cart.apply(
            CartMutation::AddItem {
                line: line(1_000, 1, 100, true),
                stock_quantity: 5,
            },
            now,
        )
        .unwrap();
        cart.apply(
            CartMutation::SelectShipping(Some(SelectedShipping {
                option_id: Uuid::new_v4(),
                price_minor: 700,
            })),
            now,
        )
        .unwrap();
        assert_eq!(cart.totals.shipping_minor, 700);

        cart.apply(
            CartMutation::AddItem {
                line: line(500, 1, 100, true),
                stock_quantity: 5,
            },
            now,
        )
        .unwrap();

        assert!(cart.shipping.is_none());
        assert_eq!(cart.totals.shipping_minor, 0);
        assert_total_identity(&cart);
    }

    #[test]
    fn adding_same_product_merges_and_checks_stock() {
        let mut cart = empty_cart();
        let now = Utc::now();
        let first = line(1_000, 2, 100, true);
        let mut again = first.clone();
        again.id = Uuid::new_v4();
        again.quantity = 2;

        cart.apply(
            CartMutation::AddItem {
                line: first,
                stock_quantity: 3,
            },
            now,
        )
        .unwrap();
        let err = cart
            .apply(
                CartMutation::AddItem {
                    line: again,
                    stock_quantity: 3,
                },
                now,
            )
            .unwrap_err();

        assert_eq!(err, CartError::InsufficientStock { available: 3 });
        assert_eq!(cart.lines.len(), 1);
        assert_eq!(cart.lines[0].quantity, 2);
    }

    #[test]
    fn checkout_locks_items_but_not_addresses() {
        let mut cart = empty_cart();
        let now = Utc::now();
        assert_eq!(
            cart.apply(CartMutation::StartCheckout, now).unwrap_err(),
            CartError::Empty
        );

        cart.apply(
            CartMutation::AddItem {
                line: line(1_000, 1, 100, true),
                stock_quantity: 5,
            },
            now,
        )
        .unwrap();
        cart.apply(CartMutation::StartCheckout, now).unwrap();

        let err = cart
            .apply(
                CartMutation::AddItem {
                    line: line(1_000, 1, 100, true),
                    stock_quantity: 5,
                },
                now,
            )
            .unwrap_err();
        assert_eq!(err, CartError::CheckoutInProgress);

        cart.apply(
            CartMutation::SetAddresses {
                shipping: None,
                billing: Some(Address::default()),
            },
            now,
        )
        .unwrap();
        assert!(cart.billing_address.is_some());
    }

    #[test]
    fn closed_cart_rejects_everything() {
        let mut cart = empty_cart();
        cart.status = CartStatus::Converted;

        let err = cart
            .apply(CartMutation::ApplyCoupon(None), Utc::now())
            .unwrap_err();
        assert_eq!(err, CartError::Closed(CartStatus::Converted));
    }

    #[test]
    fn line_total_overflow_is_rejected_and_leaves_cart_untouched() {
        let mut cart = empty_cart();
        let cheap = line(1_000, 1, 0, false);
        let cheap_id = cheap.id;
        cart.apply(
            CartMutation::AddItem {
                line: cheap,
                stock_quantity: i32::MAX,
            },
            Utc::now(),
        )
        .unwrap();
        let before = cart.clone();

        let err = cart
            .apply(
                CartMutation::AddItem {
                    line: line(i64::MAX / 2, 3, 0, false),
                    stock_quantity: 10,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, CartError::AmountOverflow);
        assert_eq!(cart, before);

        cart.lines[0].unit_price_minor = i64::MAX / 4;
        let before = cart.clone();
        let err = cart
            .apply(
                CartMutation::UpdateQuantity {
                    item_id: cheap_id,
                    quantity: 5,
                    stock_quantity: i32::MAX,
                },
                Utc::now(),
            )
            .unwrap_err();
        assert_eq!(err, CartError::AmountOverflow);
        assert_eq!(cart, before);
    }
}
