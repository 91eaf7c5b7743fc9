pub mod carts;
pub mod checkout;
pub mod orders;
pub mod shipping_options;
pub mod subscriptions;
pub mod webhooks;
