use chrono::Utc;
use rusqlite::{Connection, params, params_from_iter, types::Value};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;

use super::from_row::{
    CART_ENTRY_COLS, CHECKOUT_COLS, GALLERY_SUMMARY_COLS, HERO_COLS, PRODUCT_COLS, SESSION_COLS,
    query_all, query_one,
};

const SECONDS_PER_DAY: i64 = 86400;

fn now() -> i64 {
    Utc::now().timestamp()
}

fn gen_id() -> String {
    Uuid::new_v4().to_string()
}

/// Builder for dynamic UPDATE statements with optional fields.
/// Combines multiple field updates into a single query.
struct UpdateBuilder {
    table: &'static str,
    id: Value,
    fields: Vec<(&'static str, Value)>,
    track_updated_at: bool,
}

impl UpdateBuilder {
    fn new(table: &'static str, id: impl Into<Value>) -> Self {
        Self {
            table,
            id: id.into(),
            fields: Vec::new(),
            track_updated_at: false,
        }
    }

    fn with_updated_at(mut self) -> Self {
        self.track_updated_at = true;
        self
    }

    fn set(mut self, column: &'static str, value: impl Into<Value>) -> Self {
        self.fields.push((column, value.into()));
        self
    }

    /// Set the column only when `value` is `Some`. A `Some(None)` for a
    /// nullable column writes NULL.
    fn set_opt<V: Into<Value>>(self, column: &'static str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    /// Returns whether a row matched. An empty update still checks existence.
    fn execute(mut self, conn: &Connection) -> Result<bool> {
        if self.fields.is_empty() {
            let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?1", self.table);
            let count: i64 = conn.query_row(&sql, [self.id], |row| row.get(0))?;
            return Ok(count > 0);
        }
        if self.track_updated_at {
            self.fields.push(("updated_at", now().into()));
        }
        let sets: Vec<String> = self
            .fields
            .iter()
            .map(|(col, _)| format!("{} = ?", col))
            .collect();
        let mut values: Vec<Value> = self.fields.into_iter().map(|(_, v)| v).collect();
        values.push(self.id);
        let sql = format!("UPDATE {} SET {} WHERE id = ?", self.table, sets.join(", "));
        let affected = conn.execute(&sql, params_from_iter(values))?;
        Ok(affected > 0)
    }
}

// ============ Products ============

pub fn create_product(conn: &Connection, input: &CreateProduct, price_cents: i64) -> Result<Product> {
    let now = now();

    conn.execute(
        "INSERT INTO products (name, description, price_cents, category, materials, image_url, available, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        params![
            input.name.trim(),
            &input.description,
            price_cents,
            &input.category,
            &input.materials,
            &input.image_url,
            input.available,
            now,
            now
        ],
    )?;

    Ok(Product {
        id: conn.last_insert_rowid(),
        name: input.name.trim().to_string(),
        description: input.description.clone(),
        price_cents,
        category: input.category.clone(),
        materials: input.materials.clone(),
        image_url: input.image_url.clone(),
        available: input.available,
        created_at: now,
        updated_at: now,
    })
}

/// Catalog lookup: canonical product data by id, regardless of availability.
pub fn get_product_by_id(conn: &Connection, id: i64) -> Result<Option<Product>> {
    query_one(
        conn,
        &format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLS),
        [id],
    )
}

fn product_where(filter: &ProductFilter, only_available: bool) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut values: Vec<Value> = Vec::new();

    if only_available {
        clauses.push("available = 1".to_string());
    }
    if let Some(category) = filter.category.as_deref().filter(|c| !c.is_empty()) {
        values.push(category.to_string().into());
        clauses.push(format!("category = ?{}", values.len()));
    }
    if let Some(material) = filter.materials.as_deref().filter(|m| !m.is_empty()) {
        values.push(material.to_lowercase().into());
        clauses.push(format!(
            "instr(lower(coalesce(materials, '')), ?{}) > 0",
            values.len()
        ));
    }

    if clauses.is_empty() {
        (String::new(), values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), values)
    }
}

pub fn list_products(
    conn: &Connection,
    filter: &ProductFilter,
    only_available: bool,
) -> Result<Vec<Product>> {
    let (where_sql, values) = product_where(filter, only_available);
    query_all(
        conn,
        &format!(
            "SELECT {} FROM products{} ORDER BY created_at DESC, id DESC",
            PRODUCT_COLS, where_sql
        ),
        params_from_iter(values),
    )
}

pub fn list_products_paginated(
    conn: &Connection,
    filter: &ProductFilter,
    limit: i64,
    offset: i64,
) -> Result<(Vec<Product>, i64)> {
    let (where_sql, values) = product_where(filter, false);

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM products{}", where_sql),
        params_from_iter(values.iter()),
        |row| row.get(0),
    )?;

    let n = values.len();
    let mut page_values = values;
    page_values.push(limit.into());
    page_values.push(offset.into());

    let items = query_all(
        conn,
        &format!(
            "SELECT {} FROM products{} ORDER BY created_at DESC, id DESC LIMIT ?{} OFFSET ?{}",
            PRODUCT_COLS,
            where_sql,
            n + 1,
            n + 2
        ),
        params_from_iter(page_values),
    )?;

    Ok((items, total))
}

pub fn update_product(
    conn: &Connection,
    id: i64,
    input: &UpdateProduct,
    price_cents: Option<i64>,
) -> Result<bool> {
    UpdateBuilder::new("products", id)
        .with_updated_at()
        .set_opt("name", input.name.as_ref().map(|n| n.trim().to_string()))
        .set_opt("description", input.description.clone())
        .set_opt("price_cents", price_cents)
        .set_opt("category", input.category.clone())
        .set_opt("materials", input.materials.clone())
        .set_opt("image_url", input.image_url.clone())
        .set_opt("available", input.available)
        .execute(conn)
}

pub fn delete_product(conn: &Connection, id: i64) -> Result<bool> {
    let deleted = conn.execute("DELETE FROM products WHERE id = ?1", params![id])?;
    Ok(deleted > 0)
}

// ============ Heroes ============

pub fn create_hero(conn: &Connection, input: &HeroFields) -> Result<Hero> {
    let now = now();

    conn.execute(
        "INSERT INTO heroes (hero_header, hero_title1, hero_title2, hero_title3, target_url, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            &input.hero_header,
            &input.hero_title1,
            &input.hero_title2,
            &input.hero_title3,
            &input.target_url,
            now,
            now
        ],
    )?;

    Ok(Hero {
        id: conn.last_insert_rowid(),
        hero_header: input.hero_header.clone(),
        hero_title1: input.hero_title1.clone(),
        hero_title2: input.hero_title2.clone(),
        hero_title3: input.hero_title3.clone(),
        target_url: input.target_url.clone(),
        created_at: now,
        updated_at: now,
        heroimg_count: 0,
    })
}

pub fn get_hero_by_id(conn: &Connection, id: i64) -> Result<Option<Hero>> {
    query_one(
        conn,
        &format!("SELECT {} FROM heroes h WHERE h.id = ?1", HERO_COLS),
        [id],
    )
}

pub fn list_heroes(conn: &Connection) -> Result<Vec<Hero>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM heroes h ORDER BY h.created_at DESC, h.id DESC",
            HERO_COLS
        ),
        [],
    )
}

pub fn update_hero(conn: &Connection, id: i64, input: &HeroFields) -> Result<bool> {
    UpdateBuilder::new("heroes", id)
        .with_updated_at()
        .set("hero_header", input.hero_header.clone())
        .set("hero_title1", input.hero_title1.clone())
        .set("hero_title2", input.hero_title2.clone())
        .set("hero_title3", input.hero_title3.clone())
        .set("target_url", input.target_url.clone())
        .execute(conn)
}

pub fn delete_hero(conn: &Connection, id: i64) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;
    tx.execute("DELETE FROM hero_images WHERE hero_id = ?1", params![id])?;
    let deleted = tx.execute("DELETE FROM heroes WHERE id = ?1", params![id])?;
    tx.commit()?;
    Ok(deleted > 0)
}

/// Replace all images of a hero. Returns false if the hero does not exist.
pub fn replace_hero_images(conn: &Connection, hero_id: i64, images: &[ImageUpload]) -> Result<bool> {
    let tx = conn.unchecked_transaction()?;

    let touched = tx.execute(
        "UPDATE heroes SET updated_at = ?1 WHERE id = ?2",
        params![now(), hero_id],
    )?;
    if touched == 0 {
        return Ok(false);
    }

    tx.execute("DELETE FROM hero_images WHERE hero_id = ?1", params![hero_id])?;
    for (position, image) in images.iter().enumerate() {
        tx.execute(
            "INSERT INTO hero_images (hero_id, position, content_type, data) VALUES (?1, ?2, ?3, ?4)",
            params![hero_id, position as i64, &image.content_type, &image.data],
        )?;
    }

    tx.commit()?;
    Ok(true)
}

pub fn get_hero_image(conn: &Connection, hero_id: i64, position: i64) -> Result<Option<StoredImage>> {
    query_one(
        conn,
        "SELECT content_type, data FROM hero_images WHERE hero_id = ?1 AND position = ?2",
        [hero_id, position],
    )
}

// ============ Gallery ============

pub fn create_gallery_entry(
    conn: &Connection,
    name: &str,
    avatar: Option<&ImageUpload>,
    images: &[ImageUpload],
) -> Result<GalleryEntry> {
    let now = now();
    let tx = conn.unchecked_transaction()?;

    tx.execute(
        "INSERT INTO gallery (name, avatar, avatar_type, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            name,
            avatar.map(|a| a.data.as_slice()),
            avatar.map(|a| a.content_type.as_str()),
            now
        ],
    )?;
    let id = tx.last_insert_rowid();

    for (position, image) in images.iter().enumerate() {
        tx.execute(
            "INSERT INTO gallery_images (gallery_id, position, content_type, data) VALUES (?1, ?2, ?3, ?4)",
            params![id, position as i64, &image.content_type, &image.data],
        )?;
    }

    tx.commit()?;

    Ok(GalleryEntry {
        id,
        name: name.to_string(),
        created_at: now,
    })
}

pub fn list_gallery(conn: &Connection) -> Result<Vec<GallerySummary>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM gallery g ORDER BY g.created_at DESC, g.id DESC",
            GALLERY_SUMMARY_COLS
        ),
        [],
    )
}

pub fn get_gallery_avatar(conn: &Connection, id: i64) -> Result<Option<StoredImage>> {
    query_one(
        conn,
        "SELECT avatar_type, avatar FROM gallery WHERE id = ?1 AND avatar IS NOT NULL",
        [id],
    )
}

pub fn get_gallery_image(conn: &Connection, id: i64, position: i64) -> Result<Option<StoredImage>> {
    query_one(
        conn,
        "SELECT content_type, data FROM gallery_images WHERE gallery_id = ?1 AND position = ?2",
        [id, position],
    )
}

// ============ Sessions ============

pub fn create_session(conn: &Connection) -> Result<Session> {
    let id = gen_id();
    let now = now();

    conn.execute(
        "INSERT INTO sessions (id, admin_user, created_at, last_seen_at) VALUES (?1, NULL, ?2, ?3)",
        params![&id, now, now],
    )?;

    Ok(Session {
        id,
        admin_user: None,
        created_at: now,
        last_seen_at: now,
    })
}

/// Fetch a session that has been seen within `ttl_days`, refreshing its
/// last-seen time. Stale sessions are treated as absent.
pub fn get_active_session(conn: &Connection, id: &str, ttl_days: i64) -> Result<Option<Session>> {
    let cutoff = now() - ttl_days * SECONDS_PER_DAY;
    let session: Option<Session> = query_one(
        conn,
        &format!(
            "SELECT {} FROM sessions WHERE id = ?1 AND last_seen_at >= ?2",
            SESSION_COLS
        ),
        params![id, cutoff],
    )?;

    let Some(mut session) = session else {
        return Ok(None);
    };

    let now = now();
    conn.execute(
        "UPDATE sessions SET last_seen_at = ?1 WHERE id = ?2",
        params![now, id],
    )?;
    session.last_seen_at = now;
    Ok(Some(session))
}

pub fn set_session_admin(conn: &Connection, id: &str, admin_user: Option<&str>) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE sessions SET admin_user = ?1 WHERE id = ?2",
        params![admin_user, id],
    )?;
    Ok(updated > 0)
}

/// Issue a fresh session id for an existing session, carrying its cart over.
pub fn rotate_session(conn: &Connection, old_id: &str, admin_user: Option<&str>) -> Result<Session> {
    let tx = conn.unchecked_transaction()?;
    let id = gen_id();
    let now = now();

    tx.execute(
        "INSERT INTO sessions (id, admin_user, created_at, last_seen_at) VALUES (?1, ?2, ?3, ?4)",
        params![&id, admin_user, now, now],
    )?;
    tx.execute(
        "UPDATE cart_items SET session_id = ?1 WHERE session_id = ?2",
        params![&id, old_id],
    )?;
    tx.execute("DELETE FROM sessions WHERE id = ?1", params![old_id])?;
    tx.commit()?;

    Ok(Session {
        id,
        admin_user: admin_user.map(String::from),
        created_at: now,
        last_seen_at: now,
    })
}

/// Delete sessions idle for longer than `ttl_days`, along with their carts.
/// Returns the number of deleted sessions.
pub fn purge_expired_sessions(conn: &Connection, ttl_days: i64) -> Result<usize> {
    let cutoff = now() - ttl_days * SECONDS_PER_DAY;
    let tx = conn.unchecked_transaction()?;
    tx.execute(
        "DELETE FROM cart_items WHERE session_id IN (SELECT id FROM sessions WHERE last_seen_at < ?1)",
        params![cutoff],
    )?;
    let deleted = tx.execute("DELETE FROM sessions WHERE last_seen_at < ?1", params![cutoff])?;
    tx.commit()?;
    Ok(deleted)
}

// ============ Cart ============

pub fn list_cart_entries(conn: &Connection, session_id: &str) -> Result<Vec<CartEntry>> {
    query_all(
        conn,
        &format!(
            "SELECT {} FROM cart_items WHERE session_id = ?1 ORDER BY added_at, rowid",
            CART_ENTRY_COLS
        ),
        [session_id],
    )
}

/// Insert an entry, or add its quantity to the existing entry for the same
/// product. The snapshot of the first insert is kept. Returns false, leaving
/// the row untouched, when the merged quantity would exceed `max_quantity`.
pub fn merge_cart_entry(
    conn: &Connection,
    session_id: &str,
    entry: &CartEntry,
    max_quantity: i64,
) -> Result<bool> {
    let affected = conn.execute(
        "INSERT INTO cart_items (session_id, product_id, name, price_cents, quantity, image_url, added_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(session_id, product_id) DO UPDATE SET quantity = quantity + excluded.quantity
         WHERE cart_items.quantity + excluded.quantity <= ?8",
        params![
            session_id,
            entry.product_id,
            &entry.name,
            entry.price_cents,
            entry.quantity,
            &entry.image_url,
            now(),
            max_quantity
        ],
    )?;
    Ok(affected > 0)
}

pub fn set_cart_quantity(conn: &Connection, session_id: &str, product_id: i64, quantity: i64) -> Result<bool> {
    let updated = conn.execute(
        "UPDATE cart_items SET quantity = ?1 WHERE session_id = ?2 AND product_id = ?3",
        params![quantity, session_id, product_id],
    )?;
    Ok(updated > 0)
}

pub fn remove_cart_entry(conn: &Connection, session_id: &str, product_id: i64) -> Result<bool> {
    let deleted = conn.execute(
        "DELETE FROM cart_items WHERE session_id = ?1 AND product_id = ?2",
        params![session_id, product_id],
    )?;
    Ok(deleted > 0)
}

pub fn clear_cart(conn: &Connection, session_id: &str) -> Result<usize> {
    let deleted = conn.execute(
        "DELETE FROM cart_items WHERE session_id = ?1",
        params![session_id],
    )?;
    Ok(deleted)
}

// ============ Checkout Sessions ============

/// Record a freshly created provider session as open. Ignored if the id is
/// already known.
pub fn record_checkout_session(conn: &Connection, id: &str, cart_session_id: Option<&str>) -> Result<()> {
    conn.execute(
        "INSERT OR IGNORE INTO checkout_sessions (id, cart_session_id, status, created_at)
         VALUES (?1, ?2, 'open', ?3)",
        params![id, cart_session_id, now()],
    )?;
    Ok(())
}

pub fn get_checkout_session(conn: &Connection, id: &str) -> Result<Option<CheckoutRecord>> {
    query_one(
        conn,
        &format!("SELECT {} FROM checkout_sessions WHERE id = ?1", CHECKOUT_COLS),
        [id],
    )
}

/// Atomically move a checkout session into a terminal state.
///
/// Inserts the row if the session was never recorded (ad-hoc checkouts write
/// no local state at creation), otherwise updates it only while it is still
/// `open`. Concurrent or repeated webhook deliveries therefore see exactly
/// one `Ok(true)`.
///
/// Returns:
/// - `Ok(true)` if this call performed the transition
/// - `Ok(false)` if the session was already completed or expired
pub fn finalize_checkout_session(
    conn: &Connection,
    id: &str,
    status: CheckoutStatus,
    amount_total: Option<i64>,
    customer_email: Option<&str>,
) -> Result<bool> {
    let now = now();
    let affected = conn.execute(
        "INSERT INTO checkout_sessions (id, status, amount_total, customer_email, created_at, finalized_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)
         ON CONFLICT(id) DO UPDATE SET
             status = excluded.status,
             amount_total = coalesce(excluded.amount_total, checkout_sessions.amount_total),
             customer_email = coalesce(excluded.customer_email, checkout_sessions.customer_email),
             finalized_at = excluded.finalized_at
         WHERE checkout_sessions.status = 'open'",
        params![id, status.as_ref(), amount_total, customer_email, now],
    )?;
    Ok(affected > 0)
}
