pub mod carts;
pub mod catalog;
pub mod enums;
pub mod gateway_webhook;
pub mod order_state;
pub mod orders;
pub mod payments;
pub mod shipping;
pub mod subscriptions;
pub mod tenant;
