mod common;

use accounting_service::{AccountingApi, CustomerId, InMemoryAccounting, InvoiceId};
use billing_service::settings::CustomerSettings;
use billing_service::{BillingConfig, BillingError, WriteOperation};
use common::{at, date, Harness, SlowCustomerWrites, LATE_FEE_PRODUCT};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::sync::Arc;
use std::time::Duration;

const CUSTOMER: CustomerId = 1;

fn fee_policy(next: NaiveDate) -> CustomerSettings {
    CustomerSettings {
        charge_late_fee: Some(true),
        next_late_fee_charge_date: Some(next),
        late_fee_percent_rate: Some(dec!(0.02)),
        late_fee_charge_above_balance: Some(dec!(340)),
        ..Default::default()
    }
}

/// Customer owing `balance` on an invoice that went overdue in February
fn seed(harness: &Harness, balance: Decimal, policy: &CustomerSettings) -> InvoiceId {
    harness.api.create_customer(CUSTOMER, "A101 DOE [JOHN DOE 01/02/1990]");
    harness.store_settings(CUSTOMER, policy);
    let invoice = harness
        .api
        .create_invoice(CUSTOMER, "1001", date(2024, 1, 20), date(2024, 2, 1));
    harness.api.add_item(invoice, 1, "Rent", dec!(1), balance);
    invoice
}

#[tokio::test]
async fn test_single_pass_adds_one_fee_and_moves_date_to_today() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    let invoice = seed(&harness, dec!(500.00), &fee_policy(date(2024, 3, 19)));

    let pass = harness.service.accrue_late_fees_once(None).await.unwrap();

    assert_eq!(pass.charged.len(), 1);
    assert_eq!(pass.charged[0].fee, dec!(10.00));
    assert_eq!(pass.charged[0].as_of, date(2024, 3, 19));

    let items = harness.api.items(invoice);
    assert_eq!(items.len(), 2);
    let fee_item = &items[1];
    assert_eq!(fee_item.price, dec!(10.00));
    assert_eq!(fee_item.quantity, Decimal::ONE);
    assert_eq!(fee_item.product.id, LATE_FEE_PRODUCT);
    assert!(fee_item
        .description
        .starts_with("Late Charge: 2% from PastDueAmount: 500.00 as of date: 03/19/2024 added on: 03/20/2024"));

    let stored = harness.stored_settings(CUSTOMER).unwrap();
    assert_eq!(stored.next_late_fee_charge_date, Some(today));
    // today is still due, so the customer needs another pass
    assert_eq!(pass.lagging, vec![CUSTOMER]);
}

#[tokio::test]
async fn test_no_fee_when_late_fees_are_off() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    let mut policy = fee_policy(date(2024, 3, 1));
    policy.charge_late_fee = Some(false);
    seed(&harness, dec!(5000), &policy);

    let report = harness.service.charge_late_fees(None).await.unwrap();

    assert!(report.charged.is_empty());
    assert_eq!(report.passes, 1);
    assert_eq!(harness.added_items(), 0);
}

#[tokio::test]
async fn test_no_fee_below_threshold() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    seed(&harness, dec!(339.99), &fee_policy(date(2024, 3, 19)));

    let report = harness.service.charge_late_fees(None).await.unwrap();

    assert!(report.charged.is_empty());
    assert_eq!(harness.added_items(), 0);
    assert_eq!(
        harness.stored_settings(CUSTOMER).unwrap().next_late_fee_charge_date,
        Some(date(2024, 3, 19))
    );
}

#[tokio::test]
async fn test_second_run_on_same_day_charges_nothing() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    seed(&harness, dec!(500), &fee_policy(today));

    let first = harness.service.charge_late_fees(None).await.unwrap();
    let second = harness.service.charge_late_fees(None).await.unwrap();

    assert_eq!(first.charged.len(), 1);
    assert!(second.charged.is_empty());
    assert_eq!(harness.added_items(), 1);
    assert_eq!(
        harness.stored_settings(CUSTOMER).unwrap().next_late_fee_charge_date,
        Some(date(2024, 3, 21))
    );
}

#[tokio::test]
async fn test_catch_up_charges_each_missed_day() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    seed(&harness, dec!(500), &fee_policy(date(2024, 3, 17)));

    let report = harness.service.charge_late_fees(None).await.unwrap();

    let days: Vec<NaiveDate> = report.charged.iter().map(|fee| fee.as_of).collect();
    assert_eq!(
        days,
        vec![date(2024, 3, 17), date(2024, 3, 18), date(2024, 3, 19), date(2024, 3, 20)]
    );
    assert_eq!(report.passes, 4);
    assert!(report.unresolved_catch_up.is_empty());
    assert_eq!(
        harness.stored_settings(CUSTOMER).unwrap().next_late_fee_charge_date,
        Some(date(2024, 3, 21))
    );
    // each pass charges on the balance left by the previous one
    assert_eq!(report.charged[1].base_amount, dec!(510));
}

#[tokio::test]
async fn test_catch_up_stops_at_pass_limit() {
    let today = date(2024, 3, 20);
    let config = BillingConfig {
        late_fee_product_id: LATE_FEE_PRODUCT,
        max_catch_up_passes: 2,
        ..Default::default()
    };
    let harness = Harness::with_config(at(today, 10), config);
    seed(&harness, dec!(500), &fee_policy(date(2024, 3, 10)));

    let report = harness.service.charge_late_fees(None).await.unwrap();

    assert_eq!(report.passes, 2);
    assert_eq!(report.charged.len(), 2);
    assert_eq!(report.unresolved_catch_up, vec![CUSTOMER]);
    assert_eq!(
        harness.stored_settings(CUSTOMER).unwrap().next_late_fee_charge_date,
        Some(date(2024, 3, 12))
    );
}

#[tokio::test]
async fn test_supplied_rate_applies_when_customer_has_none() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    let mut policy = fee_policy(today);
    policy.late_fee_percent_rate = None;
    seed(&harness, dec!(1000), &policy);

    let report = harness.service.charge_late_fees(Some(dec!(0.05))).await.unwrap();

    assert_eq!(report.charged.len(), 1);
    assert_eq!(report.charged[0].fee, dec!(50.00));
}

#[tokio::test]
async fn test_rejected_fee_write_aborts_the_run() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    seed(&harness, dec!(500), &fee_policy(date(2024, 3, 19)));
    harness.api.fail_writes_to("/items/");

    let result = harness.service.charge_late_fees(None).await;

    assert!(matches!(
        result,
        Err(BillingError::RemoteWriteFailed {
            operation: WriteOperation::AddLateFee,
            status: 500,
            ..
        })
    ));
    // the date only moves after a successful charge
    assert_eq!(
        harness.stored_settings(CUSTOMER).unwrap().next_late_fee_charge_date,
        Some(date(2024, 3, 19))
    );
}

#[tokio::test]
async fn test_failed_customer_does_not_cut_short_another_customers_charge() {
    let today = date(2024, 3, 20);
    let harness = Harness::wrapping(
        at(today, 10),
        BillingConfig {
            late_fee_product_id: LATE_FEE_PRODUCT,
            ..Default::default()
        },
        |api| -> Arc<dyn AccountingApi> {
            Arc::new(SlowCustomerWrites {
                inner: api,
                delay: Duration::from_millis(50),
            })
        },
    );

    harness.api.create_customer(1, "A101 DOE");
    harness.store_settings(1, &fee_policy(today));
    let first = harness.api.create_invoice(1, "1001", date(2024, 1, 20), date(2024, 2, 1));
    harness.api.add_item(first, 1, "Rent", dec!(1), dec!(500));

    harness.api.create_customer(2, "B202 ROE");
    harness.store_settings(2, &fee_policy(today));
    let second = harness.api.create_invoice(2, "1002", date(2024, 1, 20), date(2024, 2, 1));
    harness.api.add_item(second, 1, "Rent", dec!(1), dec!(500));
    harness.api.fail_writes_to(&InMemoryAccounting::items_url(second));

    let result = harness.service.accrue_late_fees_once(None).await;
    assert!(matches!(
        result,
        Err(BillingError::RemoteWriteFailed {
            operation: WriteOperation::AddLateFee,
            ..
        })
    ));

    // the fee that landed is paired with its date move
    assert_eq!(harness.api.items(first).len(), 2);
    assert_eq!(
        harness.stored_settings(1).unwrap().next_late_fee_charge_date,
        Some(date(2024, 3, 21))
    );
    assert_eq!(
        harness.stored_settings(2).unwrap().next_late_fee_charge_date,
        Some(today)
    );

    harness.api.restore_writes();
    let pass = harness.service.accrue_late_fees_once(None).await.unwrap();

    let charged: Vec<CustomerId> = pass.charged.iter().map(|fee| fee.customer_id).collect();
    assert_eq!(charged, vec![2]);
    assert_eq!(harness.api.items(first).len(), 2);
    assert_eq!(harness.api.items(second).len(), 2);
}
