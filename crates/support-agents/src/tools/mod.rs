//! Collaborator contracts the pipeline invokes by name.
//!
//! Every tool sits behind a trait so tests can substitute deterministic
//! implementations. Transport-level failures are [`ToolError`] and fatal
//! for the stage that hit them; domain-level absence (order not found,
//! empty search) is a normal result, not an error.

pub mod knowledge_base;
pub mod order_api;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Tool names as recorded in trace `tools_used` lists, in the exact form
/// the audit surface expects.
pub const SEARCH_KNOWLEDGE_BASE: &str = "search_knowledge_base";
pub const GET_ORDER_DETAILS: &str = "get_order_details";
pub const CHECK_REFUND_ELIGIBILITY: &str = "check_refund_eligibility";
pub const PROCESS_REFUND: &str = "process_refund";

/// Transport-level collaborator failure.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("knowledge base unavailable: {0}")]
    KnowledgeBase(String),

    #[error("order backend unavailable: {0}")]
    OrderBackend(String),
}

/// One knowledge-base hit. Search results arrive ordered by relevance
/// descending and may be empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KbHit {
    pub content: String,
    pub source: String,
    pub relevance_score: f64,
}

/// Knowledge-base search capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KnowledgeSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: usize) -> Result<Vec<KbHit>, ToolError>;
}

/// Order line item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub name: String,
    pub price: f64,
    pub quantity: u32,
}

/// Fulfillment status of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Processing => write!(f, "processing"),
            Self::Shipped => write!(f, "shipped"),
            Self::Delivered => write!(f, "delivered"),
            Self::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// An order as returned by the order backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: String,
    pub customer_email: String,
    pub order_date: DateTime<Utc>,
    pub total: f64,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub refund_window_days: i64,
}

/// Outcome of a refund-eligibility check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundEligibility {
    pub eligible: bool,
    pub reason: String,
    pub order_exists: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
}

/// Receipt from the refund executor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundReceipt {
    pub success: bool,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refund_amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_days: Option<u32>,
}

/// Order lookup and refund capability.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Look up an order. `None` means not found, a normal outcome.
    async fn get_order(&self, order_id: &str) -> Result<Option<OrderRecord>, ToolError>;

    async fn check_refund_eligibility(
        &self,
        order_id: &str,
    ) -> Result<RefundEligibility, ToolError>;

    /// Execute a refund. Not invoked by any pipeline stage; exposed for
    /// human operators and future policy actions.
    async fn process_refund(
        &self,
        order_id: &str,
        amount: Option<f64>,
    ) -> Result<RefundReceipt, ToolError>;
}
