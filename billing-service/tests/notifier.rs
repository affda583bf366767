mod common;

use accounting_service::{CustomerId, EventInvoice, EventKind, TransactionEvent, TransactionSnapshot};
use billing_service::settings::CustomerSettings;
use billing_service::BillingError;
use chrono::NaiveDate;
use common::{at, date, Harness};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn reminders_on(last_alert: NaiveDate) -> CustomerSettings {
    CustomerSettings {
        send_sms_alerts: Some(true),
        last_sms_alert_sent: Some(at(last_alert, 0)),
        custom_days_between_sms_alerts: Some(5),
        late_fee_percent_rate: Some(dec!(0.02)),
        statement_url: Some("https://statements.example.com/c/7".to_string()),
        ..Default::default()
    }
}

fn statement(balance: Decimal, invoiced: NaiveDate, paid: Option<(NaiveDate, Decimal)>) -> TransactionSnapshot {
    let mut events = vec![TransactionEvent {
        event_type: EventKind::Invoice,
        date: invoiced,
        total: balance,
        invoice: Some(EventInvoice {
            id: 1,
            invoice_number: "1".to_string(),
            invoice_amount_due: balance,
            items_url: String::new(),
        }),
    }];
    if let Some((day, amount)) = paid {
        events.push(TransactionEvent {
            event_type: EventKind::Payment,
            date: day,
            total: amount,
            invoice: None,
        });
    }
    TransactionSnapshot {
        ending_balance: balance,
        events,
    }
}

fn late_customer(harness: &Harness, id: CustomerId, name: &str, balance: Decimal, last_alert: NaiveDate) {
    harness.api.create_customer(id, name);
    harness.store_settings(id, &reminders_on(last_alert));
    harness.api.set_statement(
        id,
        statement(balance, date(2024, 3, 1), Some((date(2024, 2, 1), dec!(200.00)))),
    );
}

#[tokio::test]
async fn test_late_customers_sorted_by_balance() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    late_customer(&harness, 1, "A101 SMALL", dec!(50), date(2024, 3, 1));
    late_customer(&harness, 2, "B202 LARGE", dec!(900), date(2024, 3, 1));
    late_customer(&harness, 3, "C303 PAID UP", dec!(0), date(2024, 3, 1));
    late_customer(&harness, 4, "D404 BROKEN", dec!(700), date(2024, 3, 1));
    harness.api.fail_statement_for(4);

    let late = harness
        .service
        .late_customers(at(date(2024, 3, 20), 10))
        .await
        .unwrap();

    let ids: Vec<CustomerId> = late.iter().map(|late| late.customer.id).collect();
    assert_eq!(ids, vec![2, 1]);
    assert_eq!(late[0].balance(), dec!(900));
}

#[tokio::test]
async fn test_reminder_goes_to_both_contacts_and_is_saved_once() {
    let now = at(date(2024, 3, 20), 10);
    let harness = Harness::new(now);
    late_customer(&harness, 7, "G707 LEE", dec!(500.00), date(2024, 3, 10));
    harness.api.update_customer_with(7, |customer| {
        customer.first_name = Some("Ann".to_string());
        customer.last_name = Some("Lee".to_string());
        customer.address1 = Some("cell 5551234567@vtext.com".to_string());
        customer.address2 = Some("5557654321@tmomail.net".to_string());
    });

    let report = harness.service.notify_late_customers().await.unwrap();

    assert_eq!(report.alerted, vec![7]);
    assert_eq!(report.sent.len(), 2);
    assert!(report.sent.iter().all(|alert| !alert.to.contains("5551234567")));

    let first = harness.outbox.sent_to("5551234567@VTEXT.COM");
    assert_eq!(first.len(), 1);
    assert!(first[0]
        .body
        .starts_with("Hello ANN, as of today 03/20/2024 your balance due is $500.00"));
    assert!(first[0].body.contains("your last payment of: $200.00 was received on: 02/01/2024."));
    assert!(first[0].body.contains("https://statements.example.com/c/7"));

    let second = harness.outbox.sent_to("5557654321@TMOMAIL.NET");
    assert!(second[0].body.starts_with("Hello LEE,"));

    let stored = harness.stored_settings(7).unwrap();
    assert_eq!(stored.last_sms_alert_sent, Some(now));
    assert!(report
        .messages
        .iter()
        .any(|message| message.starts_with("alerting late customer: ANN on ")));
}

#[tokio::test]
async fn test_recently_alerted_customer_is_skipped() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    late_customer(&harness, 8, "H808 SOON", dec!(400), date(2024, 3, 19));
    harness.api.update_customer_with(8, |customer| {
        customer.address1 = Some("5550001111@vtext.com".to_string());
    });

    let report = harness.service.notify_late_customers().await.unwrap();

    assert!(report.alerted.is_empty());
    assert_eq!(report.skipped, vec![8]);
    assert!(harness.outbox.sent().is_empty());
    assert!(report.messages[0].starts_with("Skipping SmsAlert LastSmsAlertSent: 03/19/2024"));
    assert!(report.messages[0].ends_with("for: H808 SOON."));
}

#[tokio::test]
async fn test_customer_without_settings_is_skipped() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    harness.api.create_customer(9, "I909 NEW");
    harness
        .api
        .set_statement(9, statement(dec!(300), date(2024, 3, 1), None));

    let report = harness.service.notify_late_customers().await.unwrap();

    assert_eq!(report.skipped, vec![9]);
    assert!(harness.api.journal().is_empty());
}

#[tokio::test]
async fn test_statement_failure_does_not_stop_reminders() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    late_customer(&harness, 1, "A101 OK", dec!(500), date(2024, 3, 1));
    late_customer(&harness, 2, "B202 DOWN", dec!(500), date(2024, 3, 1));
    harness.api.update_customer_with(1, |customer| {
        customer.address1 = Some("5551112222@vtext.com".to_string());
    });
    harness.api.fail_statement_for(2);

    let report = harness.service.notify_late_customers().await.unwrap();

    assert_eq!(report.alerted, vec![1]);
    assert_eq!(harness.outbox.sent().len(), 1);
}

#[tokio::test]
async fn test_gateway_failure_is_fatal() {
    let harness = Harness::new(at(date(2024, 3, 20), 10));
    late_customer(&harness, 1, "A101 OK", dec!(500), date(2024, 3, 1));
    harness.api.update_customer_with(1, |customer| {
        customer.address1 = Some("5551112222@vtext.com".to_string());
    });
    harness.outbox.reject("5551112222@VTEXT.COM");

    let result = harness.service.notify_late_customers().await;

    assert!(matches!(result, Err(BillingError::Notification(_))));
    assert_eq!(
        harness.stored_settings(1).unwrap().last_sms_alert_sent,
        Some(at(date(2024, 3, 1), 0))
    );
}
