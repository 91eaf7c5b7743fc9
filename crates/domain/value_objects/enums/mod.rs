pub mod billing_cycles;
pub mod billing_types;
pub mod cart_statuses;
pub mod coupon_kinds;
pub mod fulfillment_statuses;
pub mod order_item_statuses;
pub mod order_payment_statuses;
pub mod order_statuses;
pub mod payment_statuses;
pub mod subscription_statuses;
pub mod transaction_kinds;
