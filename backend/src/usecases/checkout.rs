use std::sync::Arc;

use chrono::{Duration, Utc};
use crates::{
    domain::{
        repositories::{
            carts::{CartMutationOutcome, CartRepository},
            orders::{OrderCreation, OrderRepository},
            payments::PaymentRepository,
        },
        value_objects::{
            carts::{CartError, CartModel, CartMutation},
            enums::{
                billing_types::BillingType, cart_statuses::CartStatus,
                payment_statuses::PaymentStatus,
            },
            orders::{OrderDraft, OrderModel, PlaceOrderRequest},
            payments::{NewPayment, PaymentMethodModel, PaymentModel, PaymentStatusChange},
            tenant::TenantId,
        },
    },
    payments::gateway_client::{ChargeRequest, CustomerRequest},
};
use serde::Serialize;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{
    errors::{UseCaseError, UseCaseResult},
    payment_gateway::PaymentGateway,
};

#[derive(Debug, Clone, Serialize)]
pub struct PlacedOrder {
    pub order: OrderModel,
    pub payment: PaymentModel,
}

pub struct CheckoutUseCase {
    carts: Arc<dyn CartRepository + Send + Sync>,
    orders: Arc<dyn OrderRepository + Send + Sync>,
    payments: Arc<dyn PaymentRepository + Send + Sync>,
    gateway: Arc<dyn PaymentGateway>,
    payment_due_days: i64,
}

impl CheckoutUseCase {
    pub fn new(
        carts: Arc<dyn CartRepository + Send + Sync>,
        orders: Arc<dyn OrderRepository + Send + Sync>,
        payments: Arc<dyn PaymentRepository + Send + Sync>,
        gateway: Arc<dyn PaymentGateway>,
        payment_due_days: i64,
    ) -> Self {
        Self {
            carts,
            orders,
            payments,
            gateway,
            payment_due_days,
        }
    }

    /// Converts the cart into an order and opens its first gateway charge.
    ///
    /// The order survives a gateway failure in `pending_payment` so the
    /// charge can be retried.
    pub async fn place_order(
        &self,
        tenant_id: TenantId,
        request: PlaceOrderRequest,
    ) -> UseCaseResult<PlacedOrder> {
        let cart_id = request.cart_id;
        let cart = self
            .carts
            .find(tenant_id, cart_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("cart"))?;

        match cart.status {
            CartStatus::Converted => return Err(CartError::AlreadyConverted.into()),
            CartStatus::Abandoned => return Err(CartError::Closed(cart.status).into()),
            CartStatus::Active | CartStatus::CheckoutStarted => {}
        }
        if cart.is_empty() {
            return Err(CartError::Empty.into());
        }
        if cart.requires_shipping() && cart.shipping_address.is_none() {
            return Err(UseCaseError::invalid(
                "a shipping address is required for items that ship",
            ));
        }
        if cart.billing_address.is_none() {
            return Err(UseCaseError::invalid("a billing address is required"));
        }

        let method = self
            .active_payment_method(tenant_id, request.payment_method_code.clone())
            .await?;

        let cart = self.lock_cart(tenant_id, cart).await?;
        let draft = OrderDraft::from_cart(&cart, &method.code, Utc::now());

        let order = match self.orders.create_from_cart(tenant_id, draft).await? {
            OrderCreation::Created(order) => order,
            OrderCreation::CartUnavailable => {
                warn!(%tenant_id, %cart_id, "checkout: cart converted by a concurrent checkout");
                return Err(UseCaseError::invalid(
                    "cart is no longer available for checkout",
                ));
            }
        };
        info!(
            %tenant_id,
            order_id = %order.id,
            order_number = %order.order_number,
            total_minor = order.total_minor(),
            "checkout: order placed"
        );

        match self
            .initiate_payment(tenant_id, &order, method.billing_type, None)
            .await
        {
            Ok(payment) => Ok(PlacedOrder { order, payment }),
            Err(err) => {
                self.mark_awaiting_payment(tenant_id, &order).await;
                Err(err)
            }
        }
    }

    /// Hands out the open charge of an unpaid order, opening a new one when
    /// none is usable.
    pub async fn retry_payment(
        &self,
        tenant_id: TenantId,
        order_id: Uuid,
    ) -> UseCaseResult<PlacedOrder> {
        let order = self
            .orders
            .find(tenant_id, order_id)
            .await?
            .ok_or_else(|| UseCaseError::not_found("order"))?;

        if order.status().is_terminal() {
            return Err(UseCaseError::invalid(format!(
                "order is {} and cannot be paid",
                order.status()
            )));
        }
        if order.state.payment_status.holds_funds() {
            return Err(UseCaseError::invalid("order is already paid"));
        }

        let latest = self.payments.find_latest_for_order(tenant_id, order_id).await?;
        if let Some(payment) = latest.as_ref().filter(|p| p.is_reusable()) {
            info!(%tenant_id, %order_id, payment_id = %payment.id, "checkout: reusing pending payment");
            return Ok(PlacedOrder {
                payment: payment.clone(),
                order,
            });
        }

        let method = self
            .active_payment_method(tenant_id, order.payment_method_code.clone())
            .await?;
        let unbound = latest.filter(|p| p.status == PaymentStatus::Pending && !p.is_bound());

        match self
            .initiate_payment(tenant_id, &order, method.billing_type, unbound)
            .await
        {
            Ok(payment) => Ok(PlacedOrder { order, payment }),
            Err(err) => {
                self.mark_awaiting_payment(tenant_id, &order).await;
                Err(err)
            }
        }
    }

    async fn active_payment_method(
        &self,
        tenant_id: TenantId,
        code: String,
    ) -> UseCaseResult<PaymentMethodModel> {
        let method = self
            .payments
            .find_payment_method(tenant_id, code)
            .await?
            .ok_or_else(|| UseCaseError::not_found("payment method"))?;
        if !method.is_active {
            return Err(UseCaseError::invalid(format!(
                "payment method `{}` is not active",
                method.code
            )));
        }
        Ok(method)
    }

    async fn lock_cart(&self, tenant_id: TenantId, cart: CartModel) -> UseCaseResult<CartModel> {
        if cart.status != CartStatus::Active {
            return Ok(cart);
        }

        match self
            .carts
            .mutate(tenant_id, cart.id, CartMutation::StartCheckout)
            .await?
        {
            CartMutationOutcome::Applied(locked) => Ok(locked),
            CartMutationOutcome::Rejected(rejection) => Err(rejection.into()),
            CartMutationOutcome::NotFound => Err(UseCaseError::not_found("cart")),
        }
    }

    /// Stores the attempt locally before talking to the gateway so a webhook
    /// racing the response can still be matched by external reference.
    async fn initiate_payment(
        &self,
        tenant_id: TenantId,
        order: &OrderModel,
        billing_type: BillingType,
        existing: Option<PaymentModel>,
    ) -> UseCaseResult<PaymentModel> {
        let today = Utc::now().date_naive();
        let due_date = today + Duration::days(self.payment_due_days);

        let payment = match existing {
            Some(payment) => payment,
            None => {
                self.payments
                    .create(
                        tenant_id,
                        NewPayment {
                            order_id: Some(order.id),
                            subscription_id: None,
                            billing_type,
                            amount_minor: order.total_minor(),
                            status: PaymentStatus::Pending,
                            gateway_payment_id: None,
                            external_reference: order.id.to_string(),
                            invoice_url: None,
                            due_date,
                        },
                    )
                    .await?
            }
        };

        let charge = match self.open_gateway_charge(order, billing_type, due_date).await {
            Ok(charge) => charge,
            Err(err) => {
                error!(
                    %tenant_id,
                    order_id = %order.id,
                    payment_id = %payment.id,
                    error = ?err,
                    "checkout: gateway charge failed"
                );
                if let Err(db_err) = self
                    .payments
                    .compare_and_set_status(
                        tenant_id,
                        payment.id,
                        PaymentStatus::Pending,
                        PaymentStatus::Failed,
                        PaymentStatusChange::default(),
                    )
                    .await
                {
                    error!(%tenant_id, payment_id = %payment.id, db_error = ?db_err, "checkout: could not mark payment failed");
                }
                return Err(UseCaseError::Gateway(err.to_string()));
            }
        };

        let bound = self
            .payments
            .bind_gateway_payment(
                tenant_id,
                payment.id,
                charge.id.clone(),
                charge.invoice_url.clone(),
            )
            .await?;
        if !bound {
            // a webhook bound it first
            warn!(%tenant_id, payment_id = %payment.id, gateway_payment_id = %charge.id, "checkout: payment already bound");
        }

        info!(
            %tenant_id,
            order_id = %order.id,
            payment_id = %payment.id,
            gateway_payment_id = %charge.id,
            "checkout: gateway charge opened"
        );

        Ok(PaymentModel {
            gateway_payment_id: Some(charge.id),
            invoice_url: charge.invoice_url,
            due_date: charge.due_date.unwrap_or(payment.due_date),
            ..payment
        })
    }

    async fn open_gateway_charge(
        &self,
        order: &OrderModel,
        billing_type: BillingType,
        due_date: chrono::NaiveDate,
    ) -> anyhow::Result<crates::payments::gateway_client::GatewayCharge> {
        let billing = order.billing_address.clone().unwrap_or_default();
        let customer = self
            .gateway
            .create_customer(CustomerRequest {
                name: billing.recipient_name,
                email: billing.email,
                document: billing.document,
                external_reference: order.customer_id.map(|id| id.to_string()),
            })
            .await?;

        self.gateway
            .create_payment(ChargeRequest {
                customer,
                billing_type,
                amount_minor: order.total_minor(),
                due_date,
                description: format!("Order {}", order.order_number),
                external_reference: order.id.to_string(),
            })
            .await
    }

    async fn mark_awaiting_payment(&self, tenant_id: TenantId, order: &OrderModel) {
        let Some(next) = order.state.await_payment() else {
            return;
        };

        match self
            .orders
            .apply_transition(tenant_id, order.id, order.state.clone(), next)
            .await
        {
            Ok(true) => {
                info!(%tenant_id, order_id = %order.id, "checkout: order awaiting payment")
            }
            Ok(false) => {
                warn!(%tenant_id, order_id = %order.id, "checkout: order changed before pending_payment")
            }
            Err(err) => {
                error!(%tenant_id, order_id = %order.id, db_error = ?err, "checkout: could not mark order pending_payment")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::usecases::payment_gateway::MockPaymentGateway;
    use crates::{
        domain::{
            repositories::{
                carts::MockCartRepository, orders::MockOrderRepository,
                payments::MockPaymentRepository,
            },
            value_objects::{
                carts::{Address, CartLine, CartTotals},
                enums::{
                    fulfillment_statuses::FulfillmentStatus,
                    order_payment_statuses::OrderPaymentStatus, order_statuses::OrderStatus,
                },
                order_state::{OrderState, OrderTimestamps},
            },
        },
        payments::gateway_client::GatewayCharge,
    };

    fn tenant() -> TenantId {
        TenantId::new(Uuid::from_u128(11))
    }

    fn address() -> Address {
        Address {
            recipient_name: "Ana Souza".to_string(),
            line1: "Av. Paulista, 1000".to_string(),
            city: "São Paulo".to_string(),
            state: Some("SP".to_string()),
            postal_code: "01310-100".to_string(),
            country: "BR".to_string(),
            email: Some("ana@example.com".to_string()),
            ..Address::default()
        }
    }

    fn physical_line() -> CartLine {
        CartLine {
            id: Uuid::new_v4(),
            product_id: Uuid::new_v4(),
            name: "Mug".to_string(),
            sku: None,
            unit_price_minor: 5_000,
            quantity: 2,
            weight_grams: 500,
            requires_shipping: true,
            is_digital: false,
            is_service: false,
        }
    }

    fn cart(lines: Vec<CartLine>, shipping_address: Option<Address>) -> CartModel {
        let mut cart = CartModel {
            id: Uuid::new_v4(),
            tenant_id: tenant(),
            session_id: Some("sess".to_string()),
            user_id: Some(Uuid::new_v4()),
            status: CartStatus::Active,
            currency: "BRL".to_string(),
            lines,
            shipping_address,
            billing_address: Some(address()),
            coupon: None,
            shipping: None,
            totals: CartTotals::default(),
            last_activity_at: Utc::now(),
        };
        cart.recalculate();
        cart
    }

    fn order_from(draft: &OrderDraft) -> OrderModel {
        OrderModel {
            id: draft.order_id,
            tenant_id: tenant(),
            order_number: "ORD2610170001".to_string(),
            cart_id: draft.cart_id,
            customer_id: draft.customer_id,
            currency: draft.currency.clone(),
            subtotal_minor: draft.subtotal_minor,
            tax_minor: draft.tax_minor,
            discount_minor: draft.discount_minor,
            shipping_minor: draft.shipping_minor,
            coupon_code: None,
            shipping_option_id: None,
            shipping_address: draft.shipping_address.clone(),
            billing_address: draft.billing_address.clone(),
            payment_method_code: draft.payment_method_code.clone(),
            has_physical_items: draft.has_physical_items,
            has_digital_items: draft.has_digital_items,
            has_services: draft.has_services,
            state: OrderState {
                status: OrderStatus::Pending,
                payment_status: OrderPaymentStatus::Pending,
                fulfillment_status: FulfillmentStatus::Unfulfilled,
                total_minor: draft.total_minor,
                refunded_minor: 0,
                cancel_reason: None,
                timestamps: OrderTimestamps::default(),
            },
            items: Vec::new(),
            created_at: draft.created_at,
            updated_at: draft.created_at,
        }
    }

    fn pix_method() -> PaymentMethodModel {
        PaymentMethodModel {
            code: "pix".to_string(),
            name: "Pix".to_string(),
            billing_type: BillingType::Pix,
            is_active: true,
        }
    }

    fn local_payment(new: NewPayment) -> PaymentModel {
        PaymentModel {
            id: Uuid::new_v4(),
            tenant_id: tenant(),
            order_id: new.order_id,
            subscription_id: new.subscription_id,
            billing_type: new.billing_type,
            amount_minor: new.amount_minor,
            refunded_minor: 0,
            status: new.status,
            gateway_payment_id: new.gateway_payment_id,
            external_reference: new.external_reference,
            invoice_url: new.invoice_url,
            due_date: new.due_date,
            paid_at: None,
            created_at: Utc::now(),
        }
    }

    fn request(cart: &CartModel) -> PlaceOrderRequest {
        PlaceOrderRequest {
            cart_id: cart.id,
            payment_method_code: "pix".to_string(),
        }
    }

    fn checkout(
        carts: MockCartRepository,
        orders: MockOrderRepository,
        payments: MockPaymentRepository,
        gateway: MockPaymentGateway,
    ) -> CheckoutUseCase {
        CheckoutUseCase::new(
            Arc::new(carts),
            Arc::new(orders),
            Arc::new(payments),
            Arc::new(gateway),
            3,
        )
    }

    #[tokio::test]
    async fn empty_cart_is_rejected_without_creating_an_order() {
        let empty = cart(Vec::new(), Some(address()));
        let req = request(&empty);

        let mut carts = MockCartRepository::new();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(empty.clone())));
        carts.expect_mutate().never();
        let mut orders = MockOrderRepository::new();
        orders.expect_create_from_cart().never();

        let err = checkout(
            carts,
            orders,
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
        )
        .place_order(tenant(), req)
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message == CartError::Empty.to_string()));
    }

    #[tokio::test]
    async fn missing_shipping_address_is_rejected_without_creating_an_order() {
        let physical = cart(vec![physical_line()], None);
        let req = request(&physical);

        let mut carts = MockCartRepository::new();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(physical.clone())));
        carts.expect_mutate().never();
        let mut orders = MockOrderRepository::new();
        orders.expect_create_from_cart().never();
        let mut payments = MockPaymentRepository::new();
        payments.expect_find_payment_method().never();

        let err = checkout(carts, orders, payments, MockPaymentGateway::new())
            .place_order(tenant(), req)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(_)));
    }

    #[tokio::test]
    async fn converted_cart_is_rejected() {
        let mut converted = cart(vec![physical_line()], Some(address()));
        converted.status = CartStatus::Converted;
        let req = request(&converted);

        let mut carts = MockCartRepository::new();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(converted.clone())));
        let mut orders = MockOrderRepository::new();
        orders.expect_create_from_cart().never();

        let err = checkout(
            carts,
            orders,
            MockPaymentRepository::new(),
            MockPaymentGateway::new(),
        )
        .place_order(tenant(), req)
        .await
        .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message == CartError::AlreadyConverted.to_string()));
    }

    #[tokio::test]
    async fn gateway_failure_keeps_order_pending_payment() {
        let ready = cart(vec![physical_line()], Some(address()));
        let req = request(&ready);

        let mut carts = MockCartRepository::new();
        let found = ready.clone();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(found.clone())));
        carts.expect_mutate().times(1).returning(move |_, _, _| {
            let mut locked = ready.clone();
            locked.status = CartStatus::CheckoutStarted;
            Ok(CartMutationOutcome::Applied(locked))
        });

        let mut orders = MockOrderRepository::new();
        orders
            .expect_create_from_cart()
            .times(1)
            .returning(|_, draft| Ok(OrderCreation::Created(order_from(&draft))));
        orders
            .expect_apply_transition()
            .withf(|_, _, expected, next| {
                expected.status == OrderStatus::Pending
                    && next.status == OrderStatus::PendingPayment
            })
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_payment_method()
            .returning(|_, _| Ok(Some(pix_method())));
        payments
            .expect_create()
            .times(1)
            .returning(|_, new| Ok(local_payment(new)));
        payments
            .expect_compare_and_set_status()
            .withf(|_, _, expected, next, _| {
                *expected == PaymentStatus::Pending && *next == PaymentStatus::Failed
            })
            .times(1)
            .returning(|_, _, _, _, _| Ok(true));
        payments.expect_bind_gateway_payment().never();

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .returning(|_| Err(anyhow::anyhow!("gateway timed out")));
        gateway.expect_create_payment().never();

        let err = checkout(carts, orders, payments, gateway)
            .place_order(tenant(), req)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::Gateway(_)));
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn successful_checkout_binds_gateway_charge() {
        let ready = cart(vec![physical_line()], Some(address()));
        let req = request(&ready);

        let mut carts = MockCartRepository::new();
        let found = ready.clone();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(found.clone())));
        carts.expect_mutate().returning(move |_, _, _| {
            let mut locked = ready.clone();
            locked.status = CartStatus::CheckoutStarted;
            Ok(CartMutationOutcome::Applied(locked))
        });

        let mut orders = MockOrderRepository::new();
        orders
            .expect_create_from_cart()
            .withf(|_, draft| draft.total_minor == 10_000 && draft.has_physical_items)
            .returning(|_, draft| Ok(OrderCreation::Created(order_from(&draft))));
        orders.expect_apply_transition().never();

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_payment_method()
            .returning(|_, _| Ok(Some(pix_method())));
        payments
            .expect_create()
            .withf(|_, new| new.status == PaymentStatus::Pending && new.gateway_payment_id.is_none())
            .returning(|_, new| Ok(local_payment(new)));
        payments
            .expect_bind_gateway_payment()
            .withf(|_, _, gateway_id, _| gateway_id == "pay_123")
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .withf(|customer| customer.name == "Ana Souza")
            .returning(|_| Ok("cus_1".to_string()));
        gateway
            .expect_create_payment()
            .withf(|charge| {
                charge.customer == "cus_1"
                    && charge.amount_minor == 10_000
                    && charge.billing_type == BillingType::Pix
            })
            .returning(|charge| {
                Ok(GatewayCharge {
                    id: "pay_123".to_string(),
                    status: Some("PENDING".to_string()),
                    invoice_url: Some("https://pay.example/i/123".to_string()),
                    due_date: Some(charge.due_date),
                    subscription: None,
                })
            });

        let placed = checkout(carts, orders, payments, gateway)
            .place_order(tenant(), req)
            .await
            .unwrap();

        assert_eq!(placed.payment.gateway_payment_id.as_deref(), Some("pay_123"));
        assert_eq!(placed.payment.external_reference, placed.order.id.to_string());
        assert_eq!(placed.order.total_minor(), 10_000);
    }

    #[tokio::test]
    async fn retry_reuses_a_bound_pending_payment() {
        let ready = cart(vec![physical_line()], Some(address()));
        let draft = OrderDraft::from_cart(&ready, "pix", Utc::now());
        let mut order = order_from(&draft);
        order.state.status = OrderStatus::PendingPayment;
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find()
            .returning(move |_, _| Ok(Some(order.clone())));

        let mut payments = MockPaymentRepository::new();
        payments.expect_find_latest_for_order().returning(|_, order_id| {
            Ok(Some(PaymentModel {
                gateway_payment_id: Some("pay_existing".to_string()),
                ..local_payment(NewPayment {
                    order_id: Some(order_id),
                    subscription_id: None,
                    billing_type: BillingType::Pix,
                    amount_minor: 10_000,
                    status: PaymentStatus::Pending,
                    gateway_payment_id: None,
                    external_reference: order_id.to_string(),
                    invoice_url: None,
                    due_date: Utc::now().date_naive(),
                })
            }))
        });
        payments.expect_create().never();

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_payment().never();

        let placed = checkout(MockCartRepository::new(), orders, payments, gateway)
            .retry_payment(tenant(), order_id)
            .await
            .unwrap();

        assert_eq!(
            placed.payment.gateway_payment_id.as_deref(),
            Some("pay_existing")
        );
    }

    #[tokio::test]
    async fn missing_billing_address_is_rejected_without_creating_an_order() {
        let mut unbilled = cart(vec![physical_line()], Some(address()));
        unbilled.billing_address = None;
        let req = request(&unbilled);

        let mut carts = MockCartRepository::new();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(unbilled.clone())));
        carts.expect_mutate().never();
        let mut orders = MockOrderRepository::new();
        orders.expect_create_from_cart().never();
        let mut payments = MockPaymentRepository::new();
        payments.expect_find_payment_method().never();

        let err = checkout(carts, orders, payments, MockPaymentGateway::new())
            .place_order(tenant(), req)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message.contains("billing address")));
    }

    #[tokio::test]
    async fn inactive_payment_method_is_rejected_before_locking_the_cart() {
        let ready = cart(vec![physical_line()], Some(address()));
        let req = request(&ready);

        let mut carts = MockCartRepository::new();
        carts
            .expect_find()
            .returning(move |_, _| Ok(Some(ready.clone())));
        carts.expect_mutate().never();
        let mut orders = MockOrderRepository::new();
        orders.expect_create_from_cart().never();
        let mut payments = MockPaymentRepository::new();
        payments.expect_find_payment_method().returning(|_, _| {
            Ok(Some(PaymentMethodModel {
                is_active: false,
                ..pix_method()
            }))
        });
        payments.expect_create().never();

        let err = checkout(carts, orders, payments, MockPaymentGateway::new())
            .place_order(tenant(), req)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message.contains("not active")));
    }

    fn failed_attempt(order_id: Uuid) -> PaymentModel {
        local_payment(NewPayment {
            order_id: Some(order_id),
            subscription_id: None,
            billing_type: BillingType::Boleto,
            amount_minor: 10_000,
            status: PaymentStatus::Failed,
            gateway_payment_id: None,
            external_reference: order_id.to_string(),
            invoice_url: None,
            due_date: Utc::now().date_naive(),
        })
    }

    fn awaiting_order() -> OrderModel {
        let ready = cart(vec![physical_line()], Some(address()));
        let draft = OrderDraft::from_cart(&ready, "pix", Utc::now());
        let mut order = order_from(&draft);
        order.state.status = OrderStatus::PendingPayment;
        order
    }

    #[tokio::test]
    async fn retry_opens_the_charge_with_the_order_payment_method() {
        let order = awaiting_order();
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find()
            .returning(move |_, _| Ok(Some(order.clone())));

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_latest_for_order()
            .returning(|_, order_id| Ok(Some(failed_attempt(order_id))));
        payments
            .expect_find_payment_method()
            .withf(|_, code| code == "pix")
            .times(1)
            .returning(|_, _| Ok(Some(pix_method())));
        payments
            .expect_create()
            .withf(|_, new| new.billing_type == BillingType::Pix)
            .times(1)
            .returning(|_, new| Ok(local_payment(new)));
        payments
            .expect_bind_gateway_payment()
            .times(1)
            .returning(|_, _, _, _| Ok(true));

        let mut gateway = MockPaymentGateway::new();
        gateway
            .expect_create_customer()
            .returning(|_| Ok("cus_1".to_string()));
        gateway
            .expect_create_payment()
            .withf(|charge| charge.billing_type == BillingType::Pix)
            .times(1)
            .returning(|_| {
                Ok(GatewayCharge {
                    id: "pay_retry".to_string(),
                    status: Some("PENDING".to_string()),
                    invoice_url: None,
                    due_date: None,
                    subscription: None,
                })
            });

        let placed = checkout(MockCartRepository::new(), orders, payments, gateway)
            .retry_payment(tenant(), order_id)
            .await
            .unwrap();

        assert_eq!(placed.payment.billing_type, BillingType::Pix);
        assert_eq!(placed.payment.gateway_payment_id.as_deref(), Some("pay_retry"));
    }

    #[tokio::test]
    async fn retry_with_inactive_payment_method_is_rejected() {
        let order = awaiting_order();
        let order_id = order.id;

        let mut orders = MockOrderRepository::new();
        orders
            .expect_find()
            .returning(move |_, _| Ok(Some(order.clone())));
        orders.expect_apply_transition().never();

        let mut payments = MockPaymentRepository::new();
        payments
            .expect_find_latest_for_order()
            .returning(|_, order_id| Ok(Some(failed_attempt(order_id))));
        payments.expect_find_payment_method().returning(|_, _| {
            Ok(Some(PaymentMethodModel {
                is_active: false,
                ..pix_method()
            }))
        });
        payments.expect_create().never();

        let mut gateway = MockPaymentGateway::new();
        gateway.expect_create_payment().never();

        let err = checkout(MockCartRepository::new(), orders, payments, gateway)
            .retry_payment(tenant(), order_id)
            .await
            .unwrap_err();

        assert!(matches!(err, UseCaseError::InvalidRequest(message)
            if message.contains("not active")));
    }
}
