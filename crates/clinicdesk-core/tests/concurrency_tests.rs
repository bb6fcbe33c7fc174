//! Concurrent writers on a shared database file.
//!
//! Every thread opens its own connection, the way separate front-desk
//! terminals would.

use std::path::Path;
use std::thread;

use chrono::{DateTime, Utc};
use clinicdesk_core::models::{NewInventoryItem, NewInvoice, NewInvoiceItem, NewPayment, PaymentMethod, StockOperation};
use clinicdesk_core::{ClinicConfig, ClinicService, Database, FixedClock, TenantContext};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tempfile::TempDir;

const THREADS: usize = 8;
const ROUNDS: usize = 10;

fn now() -> DateTime<Utc> {
    "2024-06-03T10:00:00Z".parse().unwrap()
}

fn open_service(path: &Path) -> ClinicService {
    let db = Database::open(path).unwrap();
    ClinicService::with_clock(db, ClinicConfig::default(), Box::new(FixedClock(now())))
}

fn desk() -> TenantContext {
    TenantContext::new("clinic-1", "desk-1", vec![])
}

#[test]
fn test_concurrent_payments_all_land() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clinic.db");
    let ctx = desk();

    let invoice_id = {
        let service = open_service(&path);
        let patient = service
            .register_patient(&ctx, "Ada", "Lovelace", &Default::default())
            .unwrap();
        service
            .create_invoice(
                &ctx,
                &NewInvoice::with_items(&patient.id, vec![NewInvoiceItem::new("Braces", 1, dec!(1000))]),
            )
            .unwrap()
            .invoice
            .id
    };

    thread::scope(|scope| {
        for _ in 0..THREADS {
            scope.spawn(|| {
                let service = open_service(&path);
                for _ in 0..ROUNDS {
                    service
                        .record_payment(&ctx, &NewPayment::new(&invoice_id, dec!(5.00), PaymentMethod::Cash))
                        .unwrap();
                }
            });
        }
    });

    let service = open_service(&path);
    let invoice = service.get_invoice(&ctx, &invoice_id).unwrap().unwrap();
    let payments = service.payments_for_invoice(&ctx, &invoice_id).unwrap();
    let expected = dec!(5.00) * Decimal::from(THREADS * ROUNDS);

    assert_eq!(payments.len(), THREADS * ROUNDS);
    assert_eq!(payments.iter().map(|p| p.amount).sum::<Decimal>(), expected);
    assert_eq!(invoice.paid_amount, expected);
    assert_eq!(invoice.balance_due(), dec!(1000) - expected);
}

#[test]
fn test_concurrent_restocks_sum_exactly() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("clinic.db");
    let ctx = desk();

    let item_id = open_service(&path)
        .create_inventory_item(&ctx, &NewInventoryItem::basic("Gloves", "box", 0, 10))
        .unwrap()
        .id;

    thread::scope(|scope| {
        for n in 0..THREADS {
            let (ctx, item_id, path) = (&ctx, &item_id, &path);
            scope.spawn(move || {
                let service = open_service(path);
                for _ in 0..ROUNDS {
                    // Odd threads take stock back out after each add
                    service.adjust_stock(ctx, item_id, StockOperation::Add, 3).unwrap();
                    if n % 2 == 1 {
                        service.adjust_stock(ctx, item_id, StockOperation::Subtract, 1).unwrap();
                    }
                }
            });
        }
    });

    let item = open_service(&path).get_inventory_item(&ctx, &item_id).unwrap().unwrap();
    let adds = (THREADS * ROUNDS * 3) as u32;
    let takes = (THREADS / 2 * ROUNDS) as u32;
    assert_eq!(item.quantity, adds - takes);
}
