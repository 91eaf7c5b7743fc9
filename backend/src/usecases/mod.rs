pub mod carts;
pub mod checkout;
pub mod errors;
pub mod gateway_reconciliation;
pub mod orders;
pub mod payment_gateway;
pub mod shipping;
pub mod subscriptions;
