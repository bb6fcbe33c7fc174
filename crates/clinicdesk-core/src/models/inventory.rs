//! Inventory models.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryCategory {
    pub id: String,
    pub clinic_id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A stocked item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InventoryItem {
    pub id: String,
    pub clinic_id: String,
    pub category_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    /// Unit of measure (e.g., "box", "vial")
    pub unit: String,
    pub quantity: u32,
    /// Reorder threshold
    pub min_quantity: u32,
    pub unit_cost: Decimal,
    pub selling_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub location: Option<String>,
    pub is_active: bool,
    /// Optimistic concurrency counter, bumped on every quantity write
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl InventoryItem {
    pub fn new(clinic_id: String, new: NewInventoryItem, now: DateTime<Utc>) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id,
            category_id: new.category_id,
            name: new.name,
            sku: new.sku,
            description: new.description,
            unit: new.unit,
            quantity: new.quantity,
            min_quantity: new.min_quantity,
            unit_cost: new.unit_cost,
            selling_price: new.selling_price,
            expiry_date: new.expiry_date,
            supplier_name: new.supplier_name,
            supplier_contact: new.supplier_contact,
            location: new.location,
            is_active: true,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_low_stock(&self) -> bool {
        crate::inventory::is_low_stock(self.quantity, self.min_quantity)
    }

    pub fn is_expiring(&self, today: NaiveDate, days_ahead: u32) -> bool {
        crate::inventory::is_expiring(self.expiry_date, today, days_ahead)
    }

    /// Value of the stock on hand at cost.
    pub fn stock_value(&self) -> Decimal {
        Decimal::from(self.quantity) * self.unit_cost
    }

    /// Apply a partial update. Quantity changes go through the stock ledger.
    pub fn apply(&mut self, update: &InventoryItemUpdate) {
        if let Some(v) = &update.category_id {
            self.category_id = Some(v.clone());
        }
        if let Some(v) = &update.name {
            self.name = v.clone();
        }
        if let Some(v) = &update.sku {
            self.sku = Some(v.clone());
        }
        if let Some(v) = &update.description {
            self.description = Some(v.clone());
        }
        if let Some(v) = &update.unit {
            self.unit = v.clone();
        }
        if let Some(v) = update.min_quantity {
            self.min_quantity = v;
        }
        if let Some(v) = update.unit_cost {
            self.unit_cost = v;
        }
        if let Some(v) = update.selling_price {
            self.selling_price = v;
        }
        if let Some(v) = update.expiry_date {
            self.expiry_date = Some(v);
        }
        if let Some(v) = &update.supplier_name {
            self.supplier_name = Some(v.clone());
        }
        if let Some(v) = &update.supplier_contact {
            self.supplier_contact = Some(v.clone());
        }
        if let Some(v) = &update.location {
            self.location = Some(v.clone());
        }
    }
}

/// Input for a new inventory item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewInventoryItem {
    pub category_id: Option<String>,
    pub name: String,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub quantity: u32,
    pub min_quantity: u32,
    pub unit_cost: Decimal,
    pub selling_price: Decimal,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub location: Option<String>,
}

impl NewInventoryItem {
    /// Minimal item with zero prices and no optional details.
    pub fn basic(name: impl Into<String>, unit: impl Into<String>, quantity: u32, min_quantity: u32) -> Self {
        Self {
            category_id: None,
            name: name.into(),
            sku: None,
            description: None,
            unit: unit.into(),
            quantity,
            min_quantity,
            unit_cost: Decimal::ZERO,
            selling_price: Decimal::ZERO,
            expiry_date: None,
            supplier_name: None,
            supplier_contact: None,
            location: None,
        }
    }
}

/// Partial inventory item update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InventoryItemUpdate {
    pub category_id: Option<String>,
    pub name: Option<String>,
    pub sku: Option<String>,
    pub description: Option<String>,
    pub unit: Option<String>,
    pub min_quantity: Option<u32>,
    pub unit_cost: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    pub expiry_date: Option<NaiveDate>,
    pub supplier_name: Option<String>,
    pub supplier_contact: Option<String>,
    pub location: Option<String>,
}

/// Stock ledger operation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StockOperation {
    Add,
    Subtract,
    Set,
}

impl StockOperation {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Set => "set",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "add" => Some(Self::Add),
            "subtract" => Some(Self::Subtract),
            "set" => Some(Self::Set),
            _ => None,
        }
    }
}
