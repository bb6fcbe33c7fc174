//! Inventory database operations.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tracing::{info, warn};

use super::{money_from_sql, money_to_sql, Database, DbError, DbResult};
use crate::context::TenantContext;
use crate::inventory::apply_stock_operation;
use crate::models::{InventoryCategory, InventoryItem, StockOperation};

const ITEM_COLUMNS: &str = "id, clinic_id, category_id, name, sku, description, unit, quantity, \
     min_quantity, unit_cost, selling_price, expiry_date, supplier_name, supplier_contact, \
     location, is_active, version, created_at, updated_at";

impl Database {
    // =========================================================================
    // Categories
    // =========================================================================

    pub fn insert_category(&self, ctx: &TenantContext, category: &InventoryCategory) -> DbResult<()> {
        if category.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("category {}", category.id)));
        }
        self.conn
            .execute(
                "INSERT INTO inventory_categories (id, clinic_id, name, description, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    category.id,
                    category.clinic_id,
                    category.name,
                    category.description,
                    category.created_at,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(err, _)
                    if err.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    DbError::Constraint(format!("category {:?} already exists", category.name))
                }
                other => other.into(),
            })?;
        Ok(())
    }

    pub fn list_categories(&self, ctx: &TenantContext) -> DbResult<Vec<InventoryCategory>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, clinic_id, name, description, created_at
             FROM inventory_categories WHERE clinic_id = ?1 ORDER BY name",
        )?;
        let rows = stmt.query_map([&ctx.clinic_id], |row| {
            Ok(InventoryCategory {
                id: row.get(0)?,
                clinic_id: row.get(1)?,
                name: row.get(2)?,
                description: row.get(3)?,
                created_at: row.get(4)?,
            })
        })?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    fn ensure_category(&self, ctx: &TenantContext, id: &str) -> DbResult<()> {
        let owner: Option<String> = self
            .conn
            .query_row("SELECT clinic_id FROM inventory_categories WHERE id = ?1", [id], |row| {
                row.get(0)
            })
            .optional()?;
        match owner {
            Some(clinic) if clinic == ctx.clinic_id => Ok(()),
            Some(_) => Err(DbError::TenantMismatch(format!("category {id}"))),
            None => Err(DbError::NotFound(format!("category {id}"))),
        }
    }

    // =========================================================================
    // Items
    // =========================================================================

    pub fn insert_inventory_item(&self, ctx: &TenantContext, item: &InventoryItem) -> DbResult<()> {
        if item.clinic_id != ctx.clinic_id {
            return Err(DbError::TenantMismatch(format!("inventory item {}", item.id)));
        }
        if let Some(category_id) = &item.category_id {
            self.ensure_category(ctx, category_id)?;
        }
        self.conn.execute(
            &format!(
                "INSERT INTO inventory_items ({ITEM_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)"
            ),
            params![
                item.id,
                item.clinic_id,
                item.category_id,
                item.name,
                item.sku,
                item.description,
                item.unit,
                item.quantity,
                item.min_quantity,
                money_to_sql(item.unit_cost),
                money_to_sql(item.selling_price),
                item.expiry_date,
                item.supplier_name,
                item.supplier_contact,
                item.location,
                item.is_active,
                item.version,
                item.created_at,
                item.updated_at,
            ],
        )?;
        Ok(())
    }

    pub fn get_inventory_item(&self, ctx: &TenantContext, id: &str) -> DbResult<Option<InventoryItem>> {
        self.conn
            .query_row(
                &format!("SELECT {ITEM_COLUMNS} FROM inventory_items WHERE id = ?1 AND clinic_id = ?2"),
                params![id, ctx.clinic_id],
                read_item_row,
            )
            .optional()?
            .map(InventoryItem::try_from)
            .transpose()
    }

    /// Overwrite descriptive fields. Quantity is only changed by
    /// [`Database::adjust_stock`].
    pub fn update_inventory_item(&self, ctx: &TenantContext, item: &InventoryItem) -> DbResult<()> {
        if let Some(category_id) = &item.category_id {
            self.ensure_category(ctx, category_id)?;
        }
        let rows_affected = self.conn.execute(
            r#"
            UPDATE inventory_items SET
                category_id = ?3, name = ?4, sku = ?5, description = ?6, unit = ?7,
                min_quantity = ?8, unit_cost = ?9, selling_price = ?10, expiry_date = ?11,
                supplier_name = ?12, supplier_contact = ?13, location = ?14, updated_at = ?15
            WHERE id = ?1 AND clinic_id = ?2
            "#,
            params![
                item.id,
                ctx.clinic_id,
                item.category_id,
                item.name,
                item.sku,
                item.description,
                item.unit,
                item.min_quantity,
                money_to_sql(item.unit_cost),
                money_to_sql(item.selling_price),
                item.expiry_date,
                item.supplier_name,
                item.supplier_contact,
                item.location,
                item.updated_at,
            ],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("inventory item {}", item.id)));
        }
        Ok(())
    }

    /// Soft delete.
    pub fn deactivate_inventory_item(&self, ctx: &TenantContext, id: &str, now: DateTime<Utc>) -> DbResult<()> {
        let rows_affected = self.conn.execute(
            "UPDATE inventory_items SET is_active = 0, updated_at = ?3 WHERE id = ?1 AND clinic_id = ?2",
            params![id, ctx.clinic_id, now],
        )?;
        if rows_affected == 0 {
            return Err(DbError::NotFound(format!("inventory item {id}")));
        }
        Ok(())
    }

    /// Active items by name.
    pub fn list_inventory(&self, ctx: &TenantContext) -> DbResult<Vec<InventoryItem>> {
        self.query_items(
            &format!(
                "SELECT {ITEM_COLUMNS} FROM inventory_items
                 WHERE clinic_id = ?1 AND is_active = 1
                 ORDER BY name COLLATE NOCASE"
            ),
            params![ctx.clinic_id],
        )
    }

    /// Active items with `quantity <= min_quantity`, computed fresh.
    pub fn low_stock_items(&self, ctx: &TenantContext) -> DbResult<Vec<InventoryItem>> {
        self.query_items(
            &format!(
                "SELECT {ITEM_COLUMNS} FROM inventory_items
                 WHERE clinic_id = ?1 AND is_active = 1 AND quantity <= min_quantity
                 ORDER BY quantity, name COLLATE NOCASE"
            ),
            params![ctx.clinic_id],
        )
    }

    /// Active items expiring on or before `today + days_ahead`, soonest
    /// first. Already expired items are included.
    pub fn expiring_items(&self, ctx: &TenantContext, today: NaiveDate, days_ahead: u32) -> DbResult<Vec<InventoryItem>> {
        let mut items: Vec<InventoryItem> = self
            .list_inventory(ctx)?
            .into_iter()
            .filter(|item| item.is_expiring(today, days_ahead))
            .collect();
        items.sort_by_key(|item| item.expiry_date);
        Ok(items)
    }

    /// Apply a stock ledger operation atomically.
    pub fn adjust_stock(
        &self,
        ctx: &TenantContext,
        id: &str,
        operation: StockOperation,
        amount: u32,
        now: DateTime<Utc>,
    ) -> DbResult<InventoryItem> {
        self.immediate(|| {
            let mut item = self
                .get_inventory_item(ctx, id)?
                .ok_or_else(|| DbError::NotFound(format!("inventory item {id}")))?;

            let quantity = apply_stock_operation(item.quantity, operation, amount).map_err(|e| {
                warn!(clinic_id = %ctx.clinic_id, item_id = id, error = %e, "stock adjustment rejected");
                DbError::Constraint(e.to_string())
            })?;

            let rows_affected = self.conn.execute(
                r#"
                UPDATE inventory_items SET quantity = ?3, version = version + 1, updated_at = ?4
                WHERE id = ?1 AND clinic_id = ?2 AND version = ?5
                "#,
                params![id, ctx.clinic_id, quantity, now, item.version],
            )?;
            if rows_affected == 0 {
                warn!(clinic_id = %ctx.clinic_id, item_id = id, version = item.version, "inventory version conflict");
                return Err(DbError::Conflict(format!("inventory item {id}")));
            }

            info!(
                clinic_id = %ctx.clinic_id,
                item_id = id,
                operation = operation.as_str(),
                amount,
                from = item.quantity,
                to = quantity,
                "stock adjusted"
            );

            item.quantity = quantity;
            item.version += 1;
            item.updated_at = now;
            Ok(item)
        })
    }

    fn query_items(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> DbResult<Vec<InventoryItem>> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, read_item_row)?;

        let mut items = Vec::new();
        for row in rows {
            items.push(row?.try_into()?);
        }
        Ok(items)
    }
}

/// Internal row type for database mapping.
struct ItemRow {
    id: String,
    clinic_id: String,
    category_id: Option<String>,
    name: String,
    sku: Option<String>,
    description: Option<String>,
    unit: String,
    quantity: u32,
    min_quantity: u32,
    unit_cost: String,
    selling_price: String,
    expiry_date: Option<NaiveDate>,
    supplier_name: Option<String>,
    supplier_contact: Option<String>,
    location: Option<String>,
    is_active: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn read_item_row(row: &Row<'_>) -> rusqlite::Result<ItemRow> {
    Ok(ItemRow {
        id: row.get(0)?,
        clinic_id: row.get(1)?,
        category_id: row.get(2)?,
        name: row.get(3)?,
        sku: row.get(4)?,
        description: row.get(5)?,
        unit: row.get(6)?,
        quantity: row.get(7)?,
        min_quantity: row.get(8)?,
        unit_cost: row.get(9)?,
        selling_price: row.get(10)?,
        expiry_date: row.get(11)?,
        supplier_name: row.get(12)?,
        supplier_contact: row.get(13)?,
        location: row.get(14)?,
        is_active: row.get(15)?,
        version: row.get(16)?,
        created_at: row.get(17)?,
        updated_at: row.get(18)?,
    })
}

impl TryFrom<ItemRow> for InventoryItem {
    type Error = DbError;

    fn try_from(row: ItemRow) -> Result<Self, Self::Error> {
        Ok(InventoryItem {
            id: row.id,
            clinic_id: row.clinic_id,
            category_id: row.category_id,
            name: row.name,
            sku: row.sku,
            description: row.description,
            unit: row.unit,
            quantity: row.quantity,
            min_quantity: row.min_quantity,
            unit_cost: money_from_sql("unit_cost", &row.unit_cost)?,
            selling_price: money_from_sql("selling_price", &row.selling_price)?,
            expiry_date: row.expiry_date,
            supplier_name: row.supplier_name,
            supplier_contact: row.supplier_contact,
            location: row.location,
            is_active: row.is_active,
            version: row.version,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
