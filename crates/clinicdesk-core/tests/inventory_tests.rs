//! Stock ledger integration tests.

use chrono::{DateTime, Utc};
use clinicdesk_core::models::{InventoryItemUpdate, NewInventoryItem, StockOperation};
use clinicdesk_core::{ClinicConfig, ClinicService, Database, FixedClock, TenantContext};
use proptest::prelude::*;

fn now() -> DateTime<Utc> {
    "2024-06-03T10:00:00Z".parse().unwrap()
}

fn service() -> ClinicService {
    let db = Database::open_in_memory().unwrap();
    ClinicService::with_clock(db, ClinicConfig::default(), Box::new(FixedClock(now())))
}

fn desk() -> TenantContext {
    TenantContext::new("clinic-1", "desk-1", vec![])
}

fn low_stock_names(service: &ClinicService, ctx: &TenantContext) -> Vec<String> {
    let mut names: Vec<String> = service
        .low_stock_items(ctx)
        .unwrap()
        .into_iter()
        .map(|item| item.name)
        .collect();
    names.sort();
    names
}

#[test]
fn test_restock_takes_item_off_low_stock_list() {
    let service = service();
    let ctx = desk();
    let gloves = service
        .create_inventory_item(&ctx, &NewInventoryItem::basic("Gloves", "box", 3, 10))
        .unwrap();
    assert_eq!(low_stock_names(&service, &ctx), vec!["Gloves"]);
    assert_eq!(service.dashboard(&ctx).unwrap().low_stock_count, 1);

    let gloves = service.adjust_stock(&ctx, &gloves.id, StockOperation::Add, 10).unwrap();
    assert_eq!(gloves.quantity, 13);
    assert!(low_stock_names(&service, &ctx).is_empty());
    assert_eq!(service.dashboard(&ctx).unwrap().low_stock_count, 0);
}

#[test]
fn test_low_stock_tracks_threshold_edits() {
    let service = service();
    let ctx = desk();
    let masks = service
        .create_inventory_item(&ctx, &NewInventoryItem::basic("Masks", "box", 10, 5))
        .unwrap();
    service
        .create_inventory_item(&ctx, &NewInventoryItem::basic("Gauze", "roll", 50, 5))
        .unwrap();
    assert!(low_stock_names(&service, &ctx).is_empty());

    // Threshold reached exactly
    let raise = InventoryItemUpdate {
        min_quantity: Some(10),
        ..Default::default()
    };
    service.update_inventory_item(&ctx, &masks.id, &raise).unwrap();
    assert_eq!(low_stock_names(&service, &ctx), vec!["Masks"]);

    service.adjust_stock(&ctx, &masks.id, StockOperation::Set, 11).unwrap();
    assert!(low_stock_names(&service, &ctx).is_empty());
}

#[test]
fn test_stock_is_per_clinic() {
    let service = service();
    let ctx = desk();
    let other = TenantContext::new("clinic-2", "desk-9", vec![]);
    let item = service
        .create_inventory_item(&ctx, &NewInventoryItem::basic("Gloves", "box", 3, 10))
        .unwrap();

    assert!(service.adjust_stock(&other, &item.id, StockOperation::Add, 5).is_err());
    assert!(service.list_inventory(&other).unwrap().is_empty());
    assert!(service.low_stock_items(&other).unwrap().is_empty());
    assert_eq!(service.get_inventory_item(&ctx, &item.id).unwrap().unwrap().quantity, 3);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_subtract_never_goes_negative(start in 0u32..500, take in 0u32..1_000) {
        let service = service();
        let ctx = desk();
        let item = service
            .create_inventory_item(&ctx, &NewInventoryItem::basic("Swabs", "pack", start, 20))
            .unwrap();

        let item = service.adjust_stock(&ctx, &item.id, StockOperation::Subtract, take).unwrap();
        prop_assert_eq!(item.quantity, start.saturating_sub(take));

        let stored = service.get_inventory_item(&ctx, &item.id).unwrap().unwrap();
        prop_assert_eq!(stored.quantity, item.quantity);
        let listed_low = service.low_stock_items(&ctx).unwrap().iter().any(|i| i.id == item.id);
        prop_assert_eq!(listed_low, stored.quantity <= stored.min_quantity);
    }
}
