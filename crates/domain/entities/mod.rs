pub mod carts;
pub mod catalog;
pub mod gateway_webhook_events;
pub mod orders;
pub mod payments;
pub mod shipping_options;
pub mod subscriptions;
