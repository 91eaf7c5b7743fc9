use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::value_objects::{
    enums::payment_statuses::PaymentStatus,
    payments::{
        NewPayment, NewPaymentTransaction, PaymentMethodModel, PaymentModel, PaymentStatusChange,
    },
    tenant::TenantId,
};

#[automock]
#[async_trait]
pub trait PaymentRepository {
    async fn create(&self, tenant_id: TenantId, payment: NewPayment) -> Result<PaymentModel>;
    async fn find(&self, tenant_id: TenantId, payment_id: Uuid) -> Result<Option<PaymentModel>>;
    async fn find_by_gateway_id(
        &self,
        tenant_id: TenantId,
        gateway_payment_id: String,
    ) -> Result<Option<PaymentModel>>;
    /// Pending payment not yet bound to a gateway id.
    async fn find_unbound_by_external_reference(
        &self,
        tenant_id: TenantId,
        external_reference: String,
    ) -> Result<Option<PaymentModel>>;
    async fn find_latest_for_order(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
    ) -> Result<Option<PaymentModel>>;
    /// Most recent payment for the order whose funds were collected.
    async fn find_settled_for_order(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
    ) -> Result<Option<PaymentModel>>;
    /// Sets the gateway id on a payment that has none yet.
    async fn bind_gateway_payment(
        &self,
        tenant_id: TenantId,
        payment_id: Uuid,
        gateway_payment_id: String,
        invoice_url: Option<String>,
    ) -> Result<bool>;
    async fn compare_and_set_status(
        &self,
        tenant_id: TenantId,
        payment_id: Uuid,
        expected: PaymentStatus,
        next: PaymentStatus,
        change: PaymentStatusChange,
    ) -> Result<bool>;
    async fn append_transaction(
        &self,
        tenant_id: TenantId,
        entry: NewPaymentTransaction,
    ) -> Result<()>;
    async fn find_payment_method(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> Result<Option<PaymentMethodModel>>;
}
