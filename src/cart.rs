//! Session-scoped shopping cart backed by the `cart_items` table.

use rusqlite::Connection;

use crate::db::queries;
use crate::error::{AppError, Result};
use crate::models::{CartEntry, CartView, MAX_QUANTITY};

/// Cart of one browser session. Handlers build it from the `Session` the
/// session middleware resolved; there is no other way to reach a cart.
pub struct CartStore<'a> {
    conn: &'a Connection,
    session_id: &'a str,
}

impl<'a> CartStore<'a> {
    pub fn new(conn: &'a Connection, session_id: &'a str) -> Self {
        Self { conn, session_id }
    }

    /// Add `quantity` units of a product, merging with an existing entry.
    /// Name, price and image come from the catalog, never from the client.
    /// The merged quantity may not exceed `MAX_QUANTITY`.
    pub fn add(&self, product_id: i64, quantity: i64) -> Result<CartView> {
        check_quantity(quantity)?;

        let product = queries::get_product_by_id(self.conn, product_id)?
            .filter(|p| p.available)
            .ok_or_else(|| AppError::ProductUnavailable("Product not found or unavailable".into()))?;

        let entry = CartEntry {
            product_id: product.id,
            name: product.name,
            price_cents: product.price_cents,
            quantity,
            image_url: product.image_url,
        };
        let mut entries = self.entries()?;
        match entries.iter_mut().find(|e| e.product_id == product_id) {
            Some(existing) => {
                existing.quantity += quantity;
                check_quantity(existing.quantity)?;
            }
            None => entries.push(entry.clone()),
        }
        CartView::try_from(entries)?;

        if !queries::merge_cart_entry(self.conn, self.session_id, &entry, MAX_QUANTITY)? {
            return Err(AppError::InvalidQuantity);
        }

        self.list()
    }

    /// Replace the quantity of an existing entry.
    pub fn update(&self, product_id: i64, quantity: i64) -> Result<CartView> {
        check_quantity(quantity)?;

        let mut entries = self.entries()?;
        let Some(existing) = entries.iter_mut().find(|e| e.product_id == product_id) else {
            return Err(AppError::NotFound("Item not in cart".into()));
        };
        existing.quantity = quantity;
        CartView::try_from(entries)?;

        if !queries::set_cart_quantity(self.conn, self.session_id, product_id, quantity)? {
            return Err(AppError::NotFound("Item not in cart".into()));
        }
        self.list()
    }

    /// Remove a product entirely. Removing an absent product is not an error.
    pub fn remove(&self, product_id: i64) -> Result<CartView> {
        queries::remove_cart_entry(self.conn, self.session_id, product_id)?;
        self.list()
    }

    pub fn entries(&self) -> Result<Vec<CartEntry>> {
        queries::list_cart_entries(self.conn, self.session_id)
    }

    pub fn list(&self) -> Result<CartView> {
        CartView::try_from(self.entries()?)
    }

    pub fn clear(&self) -> Result<()> {
        queries::clear_cart(self.conn, self.session_id)?;
        Ok(())
    }
}

fn check_quantity(quantity: i64) -> Result<()> {
    if (1..=MAX_QUANTITY).contains(&quantity) {
        Ok(())
    } else {
        Err(AppError::InvalidQuantity)
    }
}
