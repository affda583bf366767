mod common;

use accounting_service::{
    EventInvoice, EventKind, InMemoryAccounting, TransactionEvent, TransactionSnapshot, WriteRecord,
};
use billing_service::settings::CustomerSettings;
use billing_service::{BillingConfig, BillingError, PropertyAddress, SettingsDefaults};
use common::{at, date, Harness};
use rust_decimal_macros::dec;

#[tokio::test]
async fn test_new_customer_gets_full_defaults() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    harness.api.create_customer(1, "A101 NEW");

    let report = harness.service.apply_customer_defaults().await.unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.messages, vec!["Creating new defaults for customer: A101 NEW".to_string()]);

    let customer = harness.api.customer(1).unwrap();
    let details = customer.shipping_details.unwrap();
    assert_eq!(details.ship_to_contact.as_deref(), Some("A101 NEW"));
    assert_eq!(details.city.as_deref(), Some(""));

    let stored = harness.stored_settings(1).unwrap();
    assert_eq!(stored, CustomerSettings::from_defaults(&SettingsDefaults::default(), today));
    assert_eq!(stored.late_fee_charge_above_balance, Some(dec!(340)));
    assert_eq!(stored.send_sms_alerts, Some(true));
}

#[tokio::test]
async fn test_partial_settings_are_completed_without_overwriting() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    harness.api.create_customer(2, "B202 PARTIAL");
    harness.store_settings(
        2,
        &CustomerSettings {
            charge_late_fee: Some(true),
            next_late_fee_charge_date: Some(date(2024, 3, 1)),
            late_fee_percent_rate: Some(dec!(0.05)),
            ..Default::default()
        },
    );

    let report = harness.service.apply_customer_defaults().await.unwrap();

    assert_eq!(report.updated.len(), 1);
    let stored = harness.stored_settings(2).unwrap();
    assert_eq!(stored.charge_late_fee, Some(true));
    assert_eq!(stored.next_late_fee_charge_date, Some(date(2024, 3, 1)));
    assert_eq!(stored.late_fee_percent_rate, Some(dec!(0.05)));
    assert_eq!(stored.late_fee_daily_amount, Some(dec!(10)));
    assert_eq!(stored.eviction_court_assigned_judge.as_deref(), Some("JUDGEJUDGEJUDGE"));
    assert!(report
        .messages
        .contains(&"Setting default value LateFeeDailyAmount to 10 for customer: B202 PARTIAL".to_string()));
    assert!(!report.messages.iter().any(|message| message.contains("LateFeePercentRate")));

    let again = harness.service.apply_customer_defaults().await.unwrap();
    assert!(again.updated.is_empty());
    assert!(again.messages.is_empty());
}

#[tokio::test]
async fn test_paused_customer_does_not_keep_a_backlog() {
    let today = date(2024, 3, 20);
    let harness = Harness::new(at(today, 10));
    harness.api.create_customer(3, "C303 PAUSED");
    let mut paused = CustomerSettings::from_defaults(&SettingsDefaults::default(), date(2024, 1, 1));
    paused.charge_late_fee = Some(false);
    harness.store_settings(3, &paused);

    harness.service.apply_customer_defaults().await.unwrap();

    assert_eq!(
        harness.stored_settings(3).unwrap().next_late_fee_charge_date,
        Some(today)
    );
}

#[tokio::test]
async fn test_defaults_skip_reserved_and_inactive_customers() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    harness.api.create_customer(1, "XX MOVED OUT");
    harness.api.create_customer(2, "??UNASSIGNED");
    harness.api.create_customer(3, "C303 GONE");
    harness.api.update_customer_with(3, |customer| customer.active = false);

    let report = harness.service.apply_customer_defaults().await.unwrap();

    assert!(report.updated.is_empty());
    assert!(harness.api.journal().is_empty());
}

#[tokio::test]
async fn test_payments_disabled_on_open_invoices() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    harness.api.create_customer(1, "A101 DOE");
    let open = harness.api.create_invoice(1, "501", date(2024, 3, 1), date(2024, 3, 15));
    harness.api.add_item(open, 1, "Rent", dec!(1), dec!(800));
    let settled = harness.api.create_invoice(1, "502", date(2024, 2, 1), date(2024, 2, 15));
    harness.api.add_item(settled, 1, "Rent", dec!(1), dec!(800));
    harness.api.add_payment(settled, dec!(800), date(2024, 2, 10));

    let report = harness.service.disable_invoice_payments().await.unwrap();

    assert_eq!(report.updated.len(), 1);
    assert_eq!(report.updated[0].id, open);
    assert_eq!(report.messages, vec!["Disabled payments on invoice_number: 501".to_string()]);

    let invoice = harness.api.invoice(open).unwrap();
    assert!(invoice.disable_bank_payments && invoice.disable_credit_card_payments);
    assert!(harness.api.invoice(settled).unwrap().accepts_payments());

    let again = harness.service.disable_invoice_payments().await.unwrap();
    assert!(again.updated.is_empty());
}

#[tokio::test]
async fn test_rejected_lockdown_is_fatal() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    harness.api.create_customer(1, "A101 DOE");
    let open = harness.api.create_invoice(1, "501", date(2024, 3, 1), date(2024, 3, 15));
    harness.api.add_item(open, 1, "Rent", dec!(1), dec!(800));
    harness.api.fail_writes_to(&InMemoryAccounting::invoice_url(open));

    let result = harness.service.disable_invoice_payments().await;
    assert!(matches!(result, Err(BillingError::RemoteWriteFailed { status: 500, .. })));
}

#[tokio::test]
async fn test_bank_refresh_reports_accepted_sites() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    harness.api.add_connected_site(11, "Checking");
    harness.api.add_connected_site(12, "Savings");
    harness.api.fail_writes_to("refresh-accounts/12");

    let report = harness.service.refresh_bank_connections().await.unwrap();

    let refreshed: Vec<i64> = report.refreshed.iter().map(|site| site.id).collect();
    assert_eq!(refreshed, vec![11]);
    assert_eq!(report.messages.len(), 2);
    assert!(report.messages[1].starts_with("Refresh not accepted for Savings: HTTP 404"));
    assert_eq!(harness.api.journal(), vec![WriteRecord::SiteRefreshed { site_id: 11 }]);
}

#[tokio::test]
async fn test_eviction_packet() {
    let config = BillingConfig {
        property_addresses: vec![PropertyAddress {
            id: "A101".to_string(),
            street: "1 Main St".to_string(),
            city: "Springfield".to_string(),
            state: "IL".to_string(),
            postal_code: "62701".to_string(),
        }],
        ..Default::default()
    };
    let harness = Harness::with_config(at(date(2024, 3, 20), 10), config);
    harness
        .api
        .create_customer(1, "A101 SMITH [JOHN SMITH 01/02/1990][JANE MARIE SMITH 03/04/1992]");
    let invoice = harness.api.create_invoice(1, "601", date(2024, 3, 1), date(2024, 3, 15));
    harness.api.add_item(invoice, 1, "Rent March", dec!(1), dec!(1200));
    harness.api.add_item(invoice, 2, "Late fee", dec!(1), dec!(24));
    harness.api.set_statement(
        1,
        TransactionSnapshot {
            ending_balance: dec!(1224),
            events: vec![TransactionEvent {
                event_type: EventKind::Invoice,
                date: date(2024, 3, 1),
                total: dec!(1224),
                invoice: Some(EventInvoice {
                    id: invoice,
                    invoice_number: "601".to_string(),
                    invoice_amount_due: dec!(1224),
                    items_url: InMemoryAccounting::items_url(invoice),
                }),
            }],
        },
    );

    let packet = harness.service.eviction_packet(1).await.unwrap();

    assert_eq!(packet.tenants.len(), 2);
    assert_eq!(packet.tenants[1].middle_name.as_deref(), Some("MARIE"));
    assert_eq!(packet.address.map(|address| address.city), Some("Springfield".to_string()));
    assert_eq!(packet.invoice.map(|invoice| invoice.id), Some(invoice));
    assert_eq!(packet.invoice_items.len(), 2);
    assert!(packet.settings.is_none());
}

#[tokio::test]
async fn test_eviction_packet_rejects_broken_tenant_names() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    harness.api.create_customer(1, "A101 SMITH [JOHN SMITH 01/02/1990");

    let result = harness.service.eviction_packet(1).await;
    assert!(matches!(result, Err(BillingError::MalformedTenantEncoding(_))));
}
