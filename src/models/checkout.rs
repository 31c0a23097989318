use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};

/// Local lifecycle of a provider checkout session. `Completed` and `Expired`
/// are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CheckoutStatus {
    Open,
    Completed,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckoutRecord {
    /// Provider session id
    pub id: String,
    /// Browser session whose cart was checked out (None for ad-hoc checkouts)
    pub cart_session_id: Option<String>,
    pub status: CheckoutStatus,
    pub amount_total: Option<i64>,
    pub customer_email: Option<String>,
    pub created_at: i64,
    pub finalized_at: Option<i64>,
}
