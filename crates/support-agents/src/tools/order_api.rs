//! Seeded order backend for demos and tests.
//!
//! Three fixed orders cover the interesting refund states: inside the
//! window (ORD-001), outside the window (ORD-002), and in transit
//! (ORD-003). Dates are pinned relative to process start so the refund
//! window arithmetic stays live.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use once_cell::sync::Lazy;

use super::{
    OrderItem, OrderRecord, OrderService, OrderStatus, RefundEligibility, RefundReceipt, ToolError,
};

const REFUND_WINDOW_DAYS: i64 = 30;
const REFUND_ESTIMATED_DAYS: u32 = 7;

static SEEDED_ORDERS: Lazy<HashMap<String, OrderRecord>> = Lazy::new(|| {
    let now = Utc::now();
    let orders = [
        OrderRecord {
            order_id: "ORD-001".into(),
            customer_email: "john@example.com".into(),
            order_date: now - Duration::days(5),
            total: 149.99,
            status: OrderStatus::Delivered,
            items: vec![
                OrderItem {
                    name: "Wireless Mouse".into(),
                    price: 29.99,
                    quantity: 1,
                },
                OrderItem {
                    name: "Mechanical Keyboard".into(),
                    price: 119.99,
                    quantity: 1,
                },
            ],
            refund_window_days: REFUND_WINDOW_DAYS,
        },
        OrderRecord {
            order_id: "ORD-002".into(),
            customer_email: "jane@example.com".into(),
            order_date: now - Duration::days(45),
            total: 299.99,
            status: OrderStatus::Delivered,
            items: vec![OrderItem {
                name: "4K Monitor".into(),
                price: 299.99,
                quantity: 1,
            }],
            refund_window_days: REFUND_WINDOW_DAYS,
        },
        OrderRecord {
            order_id: "ORD-003".into(),
            customer_email: "bob@example.com".into(),
            order_date: now - Duration::days(2),
            total: 79.99,
            status: OrderStatus::Shipped,
            items: vec![OrderItem {
                name: "USB-C Cable Pack".into(),
                price: 79.99,
                quantity: 1,
            }],
            refund_window_days: REFUND_WINDOW_DAYS,
        },
    ];
    orders
        .into_iter()
        .map(|order| (order.order_id.clone(), order))
        .collect()
});

/// Order backend serving the seeded order book.
pub struct SeededOrderApi {
    next_refund: AtomicU64,
}

impl SeededOrderApi {
    pub fn new() -> Self {
        Self {
            next_refund: AtomicU64::new(1000),
        }
    }
}

impl Default for SeededOrderApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrderService for SeededOrderApi {
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, ToolError> {
        Ok(SEEDED_ORDERS.get(order_id).cloned())
    }

    async fn check_refund_eligibility(
        &self,
        order_id: &str,
    ) -> Result<RefundEligibility, ToolError> {
        let Some(order) = SEEDED_ORDERS.get(order_id).cloned() else {
            return Ok(RefundEligibility {
                eligible: false,
                reason: "Order not found".into(),
                order_exists: false,
                order: None,
                refund_amount: None,
            });
        };

        let days_since_order = (Utc::now() - order.order_date).num_days();
        if days_since_order > order.refund_window_days {
            return Ok(RefundEligibility {
                eligible: false,
                reason: format!(
                    "Order is {days_since_order} days old, outside the {}-day refund window",
                    order.refund_window_days
                ),
                order_exists: true,
                order: Some(order),
                refund_amount: None,
            });
        }

        if !matches!(order.status, OrderStatus::Delivered | OrderStatus::Shipped) {
            return Ok(RefundEligibility {
                eligible: false,
                reason: format!("Order status is {}, not eligible for refund", order.status),
                order_exists: true,
                order: Some(order),
                refund_amount: None,
            });
        }

        let refund_amount = Some(order.total);
        Ok(RefundEligibility {
            eligible: true,
            reason: "Order is within refund window and eligible".into(),
            order_exists: true,
            order: Some(order),
            refund_amount,
        })
    }

    async fn process_refund(
        &self,
        order_id: &str,
        amount: Option<f64>,
    ) -> Result<RefundReceipt, ToolError> {
        let eligibility = self.check_refund_eligibility(order_id).await?;
        if !eligibility.eligible {
            return Ok(RefundReceipt {
                success: false,
                message: eligibility.reason,
                refund_id: None,
                refund_amount: None,
                estimated_days: None,
            });
        }

        let refund_amount = amount.or(eligibility.refund_amount);
        let refund_id = format!("REF-{}", self.next_refund.fetch_add(1, Ordering::Relaxed));
        Ok(RefundReceipt {
            success: true,
            message: "Refund processed successfully".into(),
            refund_id: Some(refund_id),
            refund_amount,
            estimated_days: Some(REFUND_ESTIMATED_DAYS),
        })
    }
}
