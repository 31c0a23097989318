//! Row mapping for the query layer. Each `*_COLS` constant lists the columns
//! its `FromRow` impl expects, in order.

use rusqlite::{Connection, OptionalExtension, Params, Row};

use crate::error::Result;
use crate::models::*;

pub trait FromRow: Sized {
    fn from_row(row: &Row) -> rusqlite::Result<Self>;
}

pub fn query_one<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Option<T>> {
    Ok(conn.query_row(sql, params, |row| T::from_row(row)).optional()?)
}

pub fn query_all<T: FromRow>(conn: &Connection, sql: &str, params: impl Params) -> Result<Vec<T>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(params, |row| T::from_row(row))?;
    Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
}

pub const PRODUCT_COLS: &str = "id, name, description, price_cents, category, materials, image_url, available, created_at, updated_at";

pub const HERO_COLS: &str = "h.id, h.hero_header, h.hero_title1, h.hero_title2, h.hero_title3, h.target_url, h.created_at, h.updated_at, \
     (SELECT COUNT(*) FROM hero_images i WHERE i.hero_id = h.id)";

pub const GALLERY_SUMMARY_COLS: &str = "g.id, g.name, length(g.avatar), \
     (SELECT COUNT(*) FROM gallery_images i WHERE i.gallery_id = g.id)";

pub const SESSION_COLS: &str = "id, admin_user, created_at, last_seen_at";

pub const CART_ENTRY_COLS: &str = "product_id, name, price_cents, quantity, image_url";

pub const CHECKOUT_COLS: &str = "id, cart_session_id, status, amount_total, customer_email, created_at, finalized_at";

impl FromRow for Product {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Product {
            id: row.get(0)?,
            name: row.get(1)?,
            description: row.get(2)?,
            price_cents: row.get(3)?,
            category: row.get(4)?,
            materials: row.get(5)?,
            image_url: row.get(6)?,
            available: row.get::<_, i32>(7)? != 0,
            created_at: row.get(8)?,
            updated_at: row.get(9)?,
        })
    }
}

impl FromRow for Hero {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Hero {
            id: row.get(0)?,
            hero_header: row.get(1)?,
            hero_title1: row.get(2)?,
            hero_title2: row.get(3)?,
            hero_title3: row.get(4)?,
            target_url: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
            heroimg_count: row.get(8)?,
        })
    }
}

impl FromRow for GallerySummary {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(GallerySummary {
            id: row.get(0)?,
            name: row.get(1)?,
            avatar_size: row.get(2)?,
            gallery_count: row.get(3)?,
        })
    }
}

impl FromRow for StoredImage {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(StoredImage {
            content_type: row.get(0)?,
            data: row.get(1)?,
        })
    }
}

impl FromRow for Session {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Session {
            id: row.get(0)?,
            admin_user: row.get(1)?,
            created_at: row.get(2)?,
            last_seen_at: row.get(3)?,
        })
    }
}

impl FromRow for CartEntry {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(CartEntry {
            product_id: row.get(0)?,
            name: row.get(1)?,
            price_cents: row.get(2)?,
            quantity: row.get(3)?,
            image_url: row.get(4)?,
        })
    }
}

impl FromRow for CheckoutRecord {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let status: String = row.get(2)?;
        Ok(CheckoutRecord {
            id: row.get(0)?,
            cart_session_id: row.get(1)?,
            status: status.parse().map_err(|_| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("unknown checkout status: {}", status).into(),
                )
            })?,
            amount_total: row.get(3)?,
            customer_email: row.get(4)?,
            created_at: row.get(5)?,
            finalized_at: row.get(6)?,
        })
    }
}
