use anyhow::Result as AnyResult;
use async_trait::async_trait;
use crates::payments::gateway_client::{
    ChargeRequest, CustomerRequest, GatewayCharge, GatewayClient, GatewayRecurring,
    RecurringRequest, RecurringUpdate,
};

/// Outbound payment gateway operations used by the use cases.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn create_customer(&self, customer: CustomerRequest) -> AnyResult<String>;

    async fn create_payment(&self, charge: ChargeRequest) -> AnyResult<GatewayCharge>;

    async fn cancel_payment(&self, gateway_payment_id: String) -> AnyResult<()>;

    async fn refund_payment(
        &self,
        gateway_payment_id: String,
        amount_minor: Option<i64>,
        description: Option<String>,
    ) -> AnyResult<GatewayCharge>;

    async fn create_subscription(&self, recurring: RecurringRequest) -> AnyResult<GatewayRecurring>;

    async fn update_subscription(
        &self,
        gateway_subscription_id: String,
        update: RecurringUpdate,
    ) -> AnyResult<GatewayRecurring>;

    async fn cancel_subscription(&self, gateway_subscription_id: String) -> AnyResult<()>;

    async fn list_subscription_payments(
        &self,
        gateway_subscription_id: String,
    ) -> AnyResult<Vec<GatewayCharge>>;

    fn verify_webhook_token(&self, provided: &str) -> bool;
}

#[async_trait]
impl PaymentGateway for GatewayClient {
    async fn create_customer(&self, customer: CustomerRequest) -> AnyResult<String> {
        self.create_customer(&customer).await
    }

    async fn create_payment(&self, charge: ChargeRequest) -> AnyResult<GatewayCharge> {
        self.create_payment(&charge).await
    }

    async fn cancel_payment(&self, gateway_payment_id: String) -> AnyResult<()> {
        self.cancel_payment(&gateway_payment_id).await
    }

    async fn refund_payment(
        &self,
        gateway_payment_id: String,
        amount_minor: Option<i64>,
        description: Option<String>,
    ) -> AnyResult<GatewayCharge> {
        self.refund_payment(&gateway_payment_id, amount_minor, description.as_deref())
            .await
    }

    async fn create_subscription(&self, recurring: RecurringRequest) -> AnyResult<GatewayRecurring> {
        self.create_subscription(&recurring).await
    }

    async fn update_subscription(
        &self,
        gateway_subscription_id: String,
        update: RecurringUpdate,
    ) -> AnyResult<GatewayRecurring> {
        self.update_subscription(&gateway_subscription_id, &update)
            .await
    }

    async fn cancel_subscription(&self, gateway_subscription_id: String) -> AnyResult<()> {
        self.cancel_subscription(&gateway_subscription_id).await
    }

    async fn list_subscription_payments(
        &self,
        gateway_subscription_id: String,
    ) -> AnyResult<Vec<GatewayCharge>> {
        self.list_subscription_payments(&gateway_subscription_id)
            .await
    }

    fn verify_webhook_token(&self, provided: &str) -> bool {
        self.verify_webhook_token(provided)
    }
}
