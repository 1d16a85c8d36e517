//! End-to-end scenarios driving the whole engine through its public API.

use std::sync::Arc;

use lojix_core::{
    CoreError, CreditOrigin, DiscountValue, Money, PaymentKind, ReturnCredit, SaleKind,
    SaleStatus, Settlement, StockDisposition,
};
use lojix_engine::{
    Actor, EngineError, InMemoryCatalog, MemoryTill, ReturnLine, SalesEngine, Till,
};

fn money(cents: i64) -> Money {
    Money::from_cents(cents)
}

struct Shop {
    engine: SalesEngine,
    till: Arc<MemoryTill>,
    clerk: Actor,
}

fn shop() -> Shop {
    let catalog = InMemoryCatalog::new()
        .with_product("product-a", "Product A", 10_000)
        .with_product("product-b", "Product B", 8_000)
        .with_product("product-c", "Product C", 12_500);
    let till = Arc::new(MemoryTill::new());
    let engine = SalesEngine::new(Arc::new(catalog), Arc::clone(&till) as Arc<dyn Till>);
    for product in ["product-a", "product-b", "product-c"] {
        engine
            .stock()
            .adjust(product, "loja1", 20, "intake")
            .unwrap();
    }
    Shop {
        engine,
        till,
        clerk: Actor::new("alice", 1500),
    }
}

#[test]
fn discounted_cash_sale_completes_when_fully_paid() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
        .unwrap();

    // qty 2 × R$ 100.00 → gross R$ 200.00
    shop.engine
        .add_item(&shop.clerk, &sale.id, "product-a", 2)
        .unwrap();
    let snapshot = shop.engine.sale(&sale.id).unwrap();
    assert_eq!(snapshot.gross_total().cents(), 20_000);

    // 10% sale discount → net R$ 180.00
    shop.engine
        .apply_sale_discount(
            &shop.clerk,
            &sale.id,
            DiscountValue::Percentage { bps: 1000 },
            "promo",
        )
        .unwrap();
    let snapshot = shop.engine.sale(&sale.id).unwrap();
    assert_eq!(snapshot.discount_total().cents(), 2_000);
    assert_eq!(snapshot.net_total().cents(), 18_000);

    shop.engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Cash, money(18_000), None)
        .unwrap();
    let snapshot = shop.engine.sale(&sale.id).unwrap();
    assert!(snapshot.balance_due().is_zero());

    let completed = shop.engine.complete_sale(&shop.clerk, &sale.id).unwrap();
    assert_eq!(completed.status, SaleStatus::Completed);
}

#[test]
fn payment_exceeding_balance_is_rejected() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
        .unwrap();
    shop.engine
        .add_item(&shop.clerk, &sale.id, "product-a", 2)
        .unwrap();

    // Balance due is R$ 200.00; R$ 250.00 bounces.
    let err = shop
        .engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Cash, money(25_000), None)
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InvalidAmount { .. })
    ));
    assert_eq!(shop.engine.sale(&sale.id).unwrap().paid_total().cents(), 0);
}

#[test]
fn overdrawn_reserve_is_rejected_and_level_unchanged() {
    let shop = shop();
    shop.engine
        .stock()
        .adjust("product-a", "loja2", 3, "intake")
        .unwrap();

    let err = shop
        .engine
        .stock()
        .reserve(
            "product-a",
            "loja2",
            5,
            "sold",
            lojix_engine::MovementLink::none(),
        )
        .unwrap_err();
    assert!(matches!(
        err,
        CoreError::InsufficientStock {
            available: 3,
            requested: 5,
            ..
        }
    ));
    assert_eq!(shop.engine.stock().quantity_of("product-a", "loja2"), 3);
}

#[test]
fn cheaper_exchange_issues_credit_and_lowers_net_total() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(
            &shop.clerk,
            SaleKind::Cash,
            Some("cust".to_string()),
            "loja1",
        )
        .unwrap();
    let item_id = shop
        .engine
        .add_item(&shop.clerk, &sale.id, "product-a", 1)
        .unwrap();
    shop.engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Cash, money(10_000), None)
        .unwrap();
    shop.engine.complete_sale(&shop.clerk, &sale.id).unwrap();

    // R$ 100.00 line fully exchanged for an R$ 80.00 product.
    let record = shop
        .engine
        .exchange_product(
            &shop.clerk,
            &sale.id,
            &item_id,
            1,
            "product-b",
            1,
            StockDisposition::Restock,
            Some(Settlement::Credit),
            "customer preferred product B",
        )
        .unwrap();
    assert_eq!(record.value_difference_cents, -2_000);

    let entries = shop.engine.credit().entries_for("cust");
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].total_cents, 2_000);
    assert_eq!(entries[0].balance().cents(), 2_000);
    assert!(matches!(entries[0].origin, CreditOrigin::Exchange { .. }));

    let snapshot = shop.engine.sale(&sale.id).unwrap();
    assert_eq!(snapshot.net_total().cents(), 8_000);
    assert_eq!(snapshot.items[0].product_id, "product-b");
}

#[test]
fn credit_consumption_is_fifo_across_entries() {
    let shop = shop();
    shop.engine
        .credit()
        .issue("cust", money(1_000), CreditOrigin::Manual, None, "alice")
        .unwrap();
    shop.engine
        .credit()
        .issue("cust", money(1_500), CreditOrigin::Manual, None, "alice")
        .unwrap();

    let draws = shop.engine.credit().consume("cust", money(2_000)).unwrap();
    assert_eq!(draws.len(), 2);
    assert_eq!(draws[0].amount_cents, 1_000);
    assert_eq!(draws[1].amount_cents, 1_000);

    let entries = shop.engine.credit().entries_for("cust");
    assert_eq!(entries[0].balance().cents(), 0);
    assert_eq!(entries[1].balance().cents(), 500);
    assert_eq!(shop.engine.credit().balance_of("cust").cents(), 500);
}

#[test]
fn discount_over_actor_ceiling_is_rejected() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
        .unwrap();
    shop.engine
        .add_item(&shop.clerk, &sale.id, "product-a", 1)
        .unwrap();

    // Clerk ceiling is 15%; 20% is refused.
    let err = shop
        .engine
        .apply_sale_discount(
            &shop.clerk,
            &sale.id,
            DiscountValue::Percentage { bps: 2000 },
            "friend discount",
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::DiscountExceedsCeiling {
            requested_bps: 2000,
            ceiling_bps: 1500,
        })
    ));
    assert_eq!(shop.engine.sale(&sale.id).unwrap().discount_total().cents(), 0);

    // A manager with a higher ceiling may grant it.
    let manager = Actor::new("bruna", 3000);
    shop.engine
        .apply_sale_discount(
            &manager,
            &sale.id,
            DiscountValue::Percentage { bps: 2000 },
            "friend discount",
        )
        .unwrap();
    assert_eq!(
        shop.engine.sale(&sale.id).unwrap().discount_total().cents(),
        2_000
    );
}

#[test]
fn conservation_of_value_holds_through_a_busy_sale() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
        .unwrap();

    let assert_conserved = |sale_id: &str| {
        let s = shop.engine.sale(sale_id).unwrap();
        assert_eq!(
            s.net_total().cents(),
            s.gross_total().cents() - s.discount_total().cents()
        );
        assert_eq!(
            s.balance_due().cents(),
            s.net_total().cents() - s.paid_total().cents() + s.refund_total().cents()
        );
    };

    let item_a = shop
        .engine
        .add_item(&shop.clerk, &sale.id, "product-a", 3)
        .unwrap();
    assert_conserved(&sale.id);

    shop.engine
        .add_item(&shop.clerk, &sale.id, "product-b", 2)
        .unwrap();
    assert_conserved(&sale.id);

    shop.engine
        .apply_item_discount(
            &shop.clerk,
            &sale.id,
            &item_a,
            DiscountValue::FixedAmount { amount_cents: 3_000 },
            "bundle",
        )
        .unwrap();
    assert_conserved(&sale.id);

    shop.engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Pix, money(10_000), None)
        .unwrap();
    assert_conserved(&sale.id);

    shop.engine
        .apply_sale_discount(
            &shop.clerk,
            &sale.id,
            DiscountValue::Percentage { bps: 500 },
            "loyal customer",
        )
        .unwrap();
    assert_conserved(&sale.id);

    shop.engine
        .remove_item(&shop.clerk, &sale.id, &item_a)
        .unwrap();
    assert_conserved(&sale.id);
}

#[test]
fn failed_exchange_leaves_no_net_stock_change() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
        .unwrap();
    let item_id = shop
        .engine
        .add_item(&shop.clerk, &sale.id, "product-a", 1)
        .unwrap();
    let a_before = shop.engine.stock().quantity_of("product-a", "loja1");

    // Drain the replacement product so the reserve step fails.
    shop.engine
        .stock()
        .adjust("product-c", "loja1", -20, "recount")
        .unwrap();

    let err = shop
        .engine
        .exchange_product(
            &shop.clerk,
            &sale.id,
            &item_id,
            1,
            "product-c",
            1,
            StockDisposition::Restock,
            None,
            "upgrade",
        )
        .unwrap_err();
    assert!(matches!(
        err,
        EngineError::Core(CoreError::InsufficientStock { .. })
    ));
    assert_eq!(
        shop.engine.stock().quantity_of("product-a", "loja1"),
        a_before
    );
    assert_eq!(shop.engine.stock().quantity_of("product-c", "loja1"), 0);
    assert_eq!(shop.engine.sale(&sale.id).unwrap().items[0].product_id, "product-a");
}

#[test]
fn return_credit_pays_for_the_next_sale() {
    let shop = shop();

    // First sale: completed and fully paid.
    let first = shop
        .engine
        .create_sale(
            &shop.clerk,
            SaleKind::Cash,
            Some("cust".to_string()),
            "loja1",
        )
        .unwrap();
    let item_id = shop
        .engine
        .add_item(&shop.clerk, &first.id, "product-b", 2)
        .unwrap();
    shop.engine
        .add_payment(&shop.clerk, &first.id, PaymentKind::Cash, money(16_000), None)
        .unwrap();
    shop.engine.complete_sale(&shop.clerk, &first.id).unwrap();

    // One unit comes back for store credit.
    let record = shop
        .engine
        .register_return(
            &shop.clerk,
            &first.id,
            &[ReturnLine {
                item_id,
                quantity: 1,
            }],
            ReturnCredit::WithCredit,
            StockDisposition::Restock,
            "wrong size",
        )
        .unwrap();
    assert_eq!(record.refund_cents, 8_000);
    assert_eq!(shop.engine.credit().balance_of("cust").cents(), 8_000);

    // Second sale, paid entirely with that credit.
    let second = shop
        .engine
        .create_sale(
            &shop.clerk,
            SaleKind::Cash,
            Some("cust".to_string()),
            "loja1",
        )
        .unwrap();
    shop.engine
        .add_item(&shop.clerk, &second.id, "product-b", 1)
        .unwrap();
    shop.engine
        .add_payment(
            &shop.clerk,
            &second.id,
            PaymentKind::StoreCredit,
            money(8_000),
            None,
        )
        .unwrap();
    shop.engine.complete_sale(&shop.clerk, &second.id).unwrap();

    assert_eq!(shop.engine.credit().balance_of("cust").cents(), 0);
    let entry = &shop.engine.credit().entries_for("cust")[0];
    assert_eq!(entry.used_cents + entry.balance().cents(), entry.total_cents);
}

#[test]
fn credit_term_sale_settles_over_time() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(
            &shop.clerk,
            SaleKind::CreditTerm,
            Some("cust".to_string()),
            "loja1",
        )
        .unwrap();
    shop.engine
        .add_item(&shop.clerk, &sale.id, "product-c", 2)
        .unwrap();
    shop.engine
        .set_due_date(
            &sale.id,
            Some(chrono::NaiveDate::from_ymd_opt(2026, 10, 15).unwrap()),
        )
        .unwrap();

    // Completes with the full R$ 250.00 still owing.
    let completed = shop.engine.complete_sale(&shop.clerk, &sale.id).unwrap();
    assert_eq!(completed.status, SaleStatus::Completed);
    assert_eq!(completed.balance_due().cents(), 25_000);

    // Two installments later it is square.
    shop.engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Pix, money(15_000), None)
        .unwrap();
    shop.engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Cash, money(10_000), None)
        .unwrap();
    assert!(shop.engine.sale(&sale.id).unwrap().balance_due().is_zero());
}

#[test]
fn manual_refund_settlement_reaches_the_till() {
    let shop = shop();
    let sale = shop
        .engine
        .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
        .unwrap();
    let item_id = shop
        .engine
        .add_item(&shop.clerk, &sale.id, "product-a", 1)
        .unwrap();
    shop.engine
        .add_payment(&shop.clerk, &sale.id, PaymentKind::Cash, money(10_000), None)
        .unwrap();
    shop.engine.complete_sale(&shop.clerk, &sale.id).unwrap();

    shop.engine
        .exchange_product(
            &shop.clerk,
            &sale.id,
            &item_id,
            1,
            "product-b",
            1,
            StockDisposition::Restock,
            Some(Settlement::ManualRefund {
                method: PaymentKind::Cash,
            }),
            "customer preferred product B",
        )
        .unwrap();

    let withdrawals = shop.till.withdrawals();
    assert_eq!(withdrawals.len(), 1);
    assert_eq!(withdrawals[0].amount_cents, 2_000);
    assert_eq!(withdrawals[0].sale_id, sale.id);
    assert!(shop.engine.sale(&sale.id).unwrap().balance_due().is_zero());
}

#[test]
fn concurrent_sales_never_oversell_a_product() {
    let shop = Arc::new(shop());
    // 20 units of product-a; 8 threads each try to sell 5.
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let shop = Arc::clone(&shop);
            std::thread::spawn(move || {
                let sale = shop
                    .engine
                    .create_sale(&shop.clerk, SaleKind::Cash, None, "loja1")
                    .unwrap();
                shop.engine
                    .add_item(&shop.clerk, &sale.id, "product-a", 5)
                    .is_ok()
            })
        })
        .collect();

    let wins = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(wins, 4);
    assert_eq!(shop.engine.stock().quantity_of("product-a", "loja1"), 0);
}
