use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Upper bound for the quantity of one cart entry or checkout line.
pub const MAX_QUANTITY: i64 = 999;

/// One product in a session's cart. Name, price and image are snapshotted
/// from the catalog when the product is first added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartEntry {
    pub product_id: i64,
    pub name: String,
    pub price_cents: i64,
    pub quantity: i64,
    pub image_url: Option<String>,
}

impl CartEntry {
    /// None when the total does not fit in an `i64`.
    pub fn line_total_cents(&self) -> Option<i64> {
        self.price_cents.checked_mul(self.quantity)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToCart {
    pub product_id: i64,
    #[serde(default)]
    pub quantity: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateCartItem {
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartView {
    pub items: Vec<CartEntry>,
    pub item_count: i64,
    pub total_cents: i64,
}

impl TryFrom<Vec<CartEntry>> for CartView {
    type Error = AppError;

    fn try_from(items: Vec<CartEntry>) -> Result<Self> {
        let mut item_count: i64 = 0;
        let mut total_cents: i64 = 0;
        for entry in &items {
            item_count = item_count
                .checked_add(entry.quantity)
                .ok_or_else(cart_total_overflow)?;
            total_cents = entry
                .line_total_cents()
                .and_then(|line| total_cents.checked_add(line))
                .ok_or_else(cart_total_overflow)?;
        }
        Ok(Self {
            items,
            item_count,
            total_cents,
        })
    }
}

pub(crate) fn cart_total_overflow() -> AppError {
    AppError::BadRequest("Cart total too large".into())
}
