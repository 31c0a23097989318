use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::util::to_minor_units;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    /// Price in minor units of the settlement currency
    pub price_cents: i64,
    pub category: Option<String>,
    /// Comma-separated material list, e.g. "silver, pearl"
    pub materials: Option<String>,
    pub image_url: Option<String>,
    /// False = listed but not purchasable
    pub available: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Admin input. `price` is in major units and stored as minor units.
#[derive(Debug, Deserialize)]
pub struct CreateProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub materials: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default = "default_available")]
    pub available: bool,
}

fn default_available() -> bool {
    true
}

impl CreateProduct {
    /// Validates the input and returns the price in minor units.
    pub fn validate(&self) -> Result<i64> {
        if self.name.trim().is_empty() {
            return Err(AppError::BadRequest("name is required".into()));
        }
        to_minor_units(self.price)
            .ok_or_else(|| AppError::BadRequest("price must be greater than 0".into()))
    }
}

/// Partial update. An explicit `null` clears a nullable field.
#[derive(Debug, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<String>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub description: Option<Option<String>>,
    pub price: Option<f64>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub category: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub materials: Option<Option<String>>,
    #[serde(default, deserialize_with = "super::double_option")]
    pub image_url: Option<Option<String>>,
    pub available: Option<bool>,
}

impl UpdateProduct {
    /// Validates the input and returns the new price in minor units, if any.
    pub fn validate(&self) -> Result<Option<i64>> {
        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                return Err(AppError::BadRequest("name must not be empty".into()));
            }
        }
        self.price
            .map(|p| {
                to_minor_units(p)
                    .ok_or_else(|| AppError::BadRequest("price must be greater than 0".into()))
            })
            .transpose()
    }
}

/// Catalog filters shared by the public and admin listings.
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Exact match
    pub category: Option<String>,
    /// Substring match against the material list
    pub materials: Option<String>,
}
