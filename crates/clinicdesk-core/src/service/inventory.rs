//! Inventory items, categories and stock movements.

use tracing::info;

use super::{ClinicService, ServiceResult};
use crate::cache::QueryScope;
use crate::context::TenantContext;
use crate::db::DbError;
use crate::models::{InventoryCategory, InventoryItem, InventoryItemUpdate, NewInventoryItem, StockOperation};
use crate::validation::{validate_inventory_update, validate_new_inventory_item, ValidationError, ValidationErrors};

impl ClinicService {
    pub fn create_category(
        &self,
        ctx: &TenantContext,
        name: &str,
        description: Option<String>,
    ) -> ServiceResult<InventoryCategory> {
        if name.trim().is_empty() {
            return Err(ValidationErrors(vec![ValidationError::new("name", "is required")]).into());
        }
        let category = InventoryCategory {
            id: uuid::Uuid::new_v4().to_string(),
            clinic_id: ctx.clinic_id.clone(),
            name: name.trim().to_string(),
            description,
            created_at: self.clock.now(),
        };
        self.db.insert_category(ctx, &category)?;
        Ok(category)
    }

    pub fn list_categories(&self, ctx: &TenantContext) -> ServiceResult<Vec<InventoryCategory>> {
        Ok(self.db.list_categories(ctx)?)
    }

    pub fn create_inventory_item(&self, ctx: &TenantContext, new: &NewInventoryItem) -> ServiceResult<InventoryItem> {
        validate_new_inventory_item(new)?;
        let item = InventoryItem::new(ctx.clinic_id.clone(), new.clone(), self.clock.now());
        self.db.insert_inventory_item(ctx, &item)?;

        info!(clinic_id = %ctx.clinic_id, item_id = %item.id, quantity = item.quantity, "created inventory item");
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(item)
    }

    pub fn get_inventory_item(&self, ctx: &TenantContext, id: &str) -> ServiceResult<Option<InventoryItem>> {
        Ok(self.db.get_inventory_item(ctx, id)?)
    }

    /// Partial update. Quantity only changes through [`Self::adjust_stock`].
    pub fn update_inventory_item(
        &self,
        ctx: &TenantContext,
        id: &str,
        update: &InventoryItemUpdate,
    ) -> ServiceResult<InventoryItem> {
        validate_inventory_update(update)?;
        let mut item = self
            .db
            .get_inventory_item(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("inventory item {id}")))?;
        item.apply(update);
        item.updated_at = self.clock.now();
        self.db.update_inventory_item(ctx, &item)?;

        self.invalidate(ctx, &[QueryScope::Dashboard]);
        self.db
            .get_inventory_item(ctx, id)?
            .ok_or_else(|| DbError::NotFound(format!("inventory item {id}")).into())
    }

    pub fn deactivate_inventory_item(&self, ctx: &TenantContext, id: &str) -> ServiceResult<()> {
        self.db.deactivate_inventory_item(ctx, id, self.clock.now())?;
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(())
    }

    /// Active items ordered by name.
    pub fn list_inventory(&self, ctx: &TenantContext) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.db.list_inventory(ctx)?)
    }

    pub fn adjust_stock(
        &self,
        ctx: &TenantContext,
        id: &str,
        operation: StockOperation,
        amount: u32,
    ) -> ServiceResult<InventoryItem> {
        let item = self.db.adjust_stock(ctx, id, operation, amount, self.clock.now())?;
        self.invalidate(ctx, &[QueryScope::Dashboard]);
        Ok(item)
    }

    /// Items at or below their reorder threshold, read fresh every call.
    pub fn low_stock_items(&self, ctx: &TenantContext) -> ServiceResult<Vec<InventoryItem>> {
        Ok(self.db.low_stock_items(ctx)?)
    }

    /// Items expiring within `days_ahead` days (the configured lookahead when
    /// `None`), already expired ones included.
    pub fn expiring_items(&self, ctx: &TenantContext, days_ahead: Option<u32>) -> ServiceResult<Vec<InventoryItem>> {
        let days = days_ahead.unwrap_or(self.config.expiry_lookahead_days);
        Ok(self.db.expiring_items(ctx, self.clock.today(), days)?)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::super::ServiceError;
    use crate::db::DbError;
    use crate::models::{InventoryItemUpdate, NewInventoryItem, StockOperation};
    use chrono::Days;

    #[test]
    fn test_low_stock_clears_after_restock() {
        let service = service();
        let ctx = reception("clinic-1");
        let item = service
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Gloves", "box", 3, 10))
            .unwrap();
        assert_eq!(service.low_stock_items(&ctx).unwrap().len(), 1);

        let item = service.adjust_stock(&ctx, &item.id, StockOperation::Add, 10).unwrap();
        assert_eq!(item.quantity, 13);
        assert!(service.low_stock_items(&ctx).unwrap().is_empty());
    }

    #[test]
    fn test_subtract_floors_at_zero() {
        let service = service();
        let ctx = reception("clinic-1");
        let item = service
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Masks", "box", 4, 1))
            .unwrap();
        let item = service.adjust_stock(&ctx, &item.id, StockOperation::Subtract, 9).unwrap();
        assert_eq!(item.quantity, 0);
    }

    #[test]
    fn test_update_keeps_quantity() {
        let service = service();
        let ctx = reception("clinic-1");
        let item = service
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Syringes", "pack", 20, 5))
            .unwrap();
        let update = InventoryItemUpdate {
            min_quantity: Some(25),
            location: Some("Cabinet B".into()),
            ..Default::default()
        };
        let updated = service.update_inventory_item(&ctx, &item.id, &update).unwrap();
        assert_eq!(updated.quantity, 20);
        assert_eq!(updated.location.as_deref(), Some("Cabinet B"));
        assert!(updated.is_low_stock());

        let blank = InventoryItemUpdate {
            name: Some("  ".into()),
            ..Default::default()
        };
        assert!(matches!(
            service.update_inventory_item(&ctx, &item.id, &blank),
            Err(ServiceError::Validation(_))
        ));
    }

    #[test]
    fn test_expiring_uses_configured_lookahead() {
        let service = service();
        let ctx = reception("clinic-1");
        let mut soon = NewInventoryItem::basic("Vaccine", "vial", 5, 1);
        soon.expiry_date = today().checked_add_days(Days::new(10));
        let mut later = NewInventoryItem::basic("Saline", "bag", 5, 1);
        later.expiry_date = today().checked_add_days(Days::new(90));
        service.create_inventory_item(&ctx, &soon).unwrap();
        service.create_inventory_item(&ctx, &later).unwrap();

        let expiring = service.expiring_items(&ctx, None).unwrap();
        assert_eq!(expiring.len(), 1);
        assert_eq!(expiring[0].name, "Vaccine");
        assert_eq!(service.expiring_items(&ctx, Some(120)).unwrap().len(), 2);
    }

    #[test]
    fn test_categories_are_unique_per_clinic() {
        let service = service();
        let ctx = reception("clinic-1");
        service.create_category(&ctx, "Consumables", None).unwrap();
        let err = service.create_category(&ctx, "Consumables", None).unwrap_err();
        assert!(matches!(err, ServiceError::Database(DbError::Constraint(_))));

        service.create_category(&reception("clinic-2"), "Consumables", None).unwrap();
        assert_eq!(service.list_categories(&ctx).unwrap().len(), 1);
    }

    #[test]
    fn test_deactivated_items_leave_listing() {
        let service = service();
        let ctx = reception("clinic-1");
        let item = service
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Gauze", "roll", 2, 5))
            .unwrap();
        service.deactivate_inventory_item(&ctx, &item.id).unwrap();
        assert!(service.list_inventory(&ctx).unwrap().is_empty());
        assert!(service.low_stock_items(&ctx).unwrap().is_empty());
    }
}
