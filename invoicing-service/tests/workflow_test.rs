//! Invoice creation and status transitions.

mod common;

use common::{acme_invoice, dec, item, TestApp, OTHER_USER_ID, PUBLIC_ORIGIN, TEST_USER_ID};
use invoicing_service::models::{InvoiceFilter, InvoiceStatus};
use invoicing_service::services::SendOptions;
use service_core::error::AppError;
use std::time::Duration;

#[tokio::test]
async fn create_invoice_computes_totals_and_first_number() {
    let app = TestApp::new();
    app.seed_profile(TEST_USER_ID, "8").await;

    let invoice = app
        .workflow()
        .create_invoice(TEST_USER_ID, acme_invoice())
        .await
        .unwrap();

    assert_eq!(invoice.invoice_number, "INV-00001");
    assert_eq!(invoice.status, InvoiceStatus::Draft);
    assert_eq!(invoice.subtotal, dec("100"));
    assert_eq!(invoice.tax, dec("8.00"));
    assert_eq!(invoice.total, dec("108.00"));
    assert_eq!(invoice.total.to_string(), "108.00");
    assert_eq!(invoice.company_profile.company_name, "Pixel Studio");
    assert_eq!(invoice.notes, "Thank you for your business");
    assert_eq!(invoice.terms, "Payment due within 30 days");
    assert!(invoice.payment_link.is_none());

    let stored = app
        .workflow()
        .get_invoice(TEST_USER_ID, &invoice.invoice_id)
        .await
        .unwrap();
    assert_eq!(stored.invoice_number, invoice.invoice_number);
}

#[tokio::test]
async fn create_invoice_requires_company_profile() {
    let app = TestApp::new();

    let err = app
        .workflow()
        .create_invoice(TEST_USER_ID, acme_invoice())
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(err.to_string().contains("company profile is required"));
    assert_eq!(app.store.invoice_count(), 0);
}

#[tokio::test]
async fn create_invoice_checks_client_before_items() {
    let app = TestApp::new();
    app.seed_profile(TEST_USER_ID, "0").await;

    let mut input = acme_invoice();
    input.client_name = "  ".to_string();
    input.items.clear();
    let err = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("client_name"));

    let mut input = acme_invoice();
    input.client_email = String::new();
    let err = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("client_email"));

    assert_eq!(app.store.invoice_count(), 0);
}

#[tokio::test]
async fn unbillable_items_are_dropped_and_all_unbillable_is_rejected() {
    let app = TestApp::new();
    app.seed_profile(TEST_USER_ID, "0").await;

    let mut input = acme_invoice();
    input.items = vec![
        item("Design", "2", "50"),
        item("", "1", "20"),
        item("Free consult", "1", "0"),
    ];
    let invoice = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap();
    assert_eq!(invoice.items.len(), 1);
    assert_eq!(invoice.total, dec("100"));

    let mut input = acme_invoice();
    input.items = vec![item(" ", "3", "10")];
    let err = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert_eq!(app.store.invoice_count(), 1);
}

#[tokio::test]
async fn sub_cent_line_amounts_are_rounded_to_cents() {
    let app = TestApp::new();
    app.seed_profile(TEST_USER_ID, "0").await;

    let mut input = acme_invoice();
    input.items = vec![item("Hours", "3", "1.333")];
    let invoice = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap();

    assert_eq!(invoice.items[0].amount.to_string(), "4.00");
    assert_eq!(invoice.subtotal.to_string(), "4.00");
    assert_eq!(invoice.total.to_string(), "4.00");
}

#[tokio::test]
async fn oversized_amounts_are_rejected_without_writing() {
    let app = TestApp::new();
    app.seed_profile(TEST_USER_ID, "8").await;

    let mut input = acme_invoice();
    input.items = vec![item("Big", "79228162514264337593543950335", "2")];
    let err = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(err.to_string().contains("too large"));
    assert_eq!(app.store.invoice_count(), 0);
}

#[tokio::test]
async fn explicit_notes_override_profile_defaults() {
    let app = TestApp::new();
    app.seed_profile(TEST_USER_ID, "0").await;

    let mut input = acme_invoice();
    input.notes = Some("PO 4471".to_string());
    input.terms = Some("Net 15".to_string());
    let invoice = app
        .workflow()
        .create_invoice(TEST_USER_ID, input)
        .await
        .unwrap();

    assert_eq!(invoice.notes, "PO 4471");
    assert_eq!(invoice.terms, "Net 15");
}

#[tokio::test]
async fn profile_edits_do_not_reach_existing_invoices() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    let mut profile = common::profile(TEST_USER_ID, "8");
    profile.company_name = "Renamed Co".to_string();
    app.repositories.profiles.upsert(&profile).await.unwrap();

    let stored = app
        .workflow()
        .get_invoice(TEST_USER_ID, &invoice.invoice_id)
        .await
        .unwrap();
    assert_eq!(stored.company_profile.company_name, "Pixel Studio");
}

#[tokio::test]
async fn invoices_are_scoped_to_their_owner() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    let err = app
        .workflow()
        .get_invoice(OTHER_USER_ID, &invoice.invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let err = app
        .workflow()
        .mark_paid(OTHER_USER_ID, &invoice.invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    let listed = app
        .workflow()
        .list_invoices(OTHER_USER_ID, InvoiceFilter::All)
        .await
        .unwrap();
    assert!(listed.is_empty());
}

#[tokio::test]
async fn list_is_newest_first_and_pending_means_unpaid() {
    let app = TestApp::new();
    let first = app.draft_invoice(TEST_USER_ID).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = app.draft_invoice(TEST_USER_ID).await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let third = app.draft_invoice(TEST_USER_ID).await;

    app.workflow()
        .mark_paid(TEST_USER_ID, &second.invoice_id)
        .await
        .unwrap();

    let all = app
        .workflow()
        .list_invoices(TEST_USER_ID, InvoiceFilter::All)
        .await
        .unwrap();
    let numbers: Vec<_> = all.iter().map(|i| i.invoice_number.as_str()).collect();
    assert_eq!(numbers, vec!["INV-00003", "INV-00002", "INV-00001"]);

    let outstanding = app
        .workflow()
        .list_invoices(TEST_USER_ID, InvoiceFilter::Outstanding)
        .await
        .unwrap();
    let ids: Vec<_> = outstanding.iter().map(|i| i.invoice_id.as_str()).collect();
    assert_eq!(ids, vec![third.invoice_id.as_str(), first.invoice_id.as_str()]);
}

#[tokio::test]
async fn send_marks_invoice_sent_with_payment_link() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    let outcome = app
        .workflow()
        .send_invoice(TEST_USER_ID, &invoice.invoice_id, SendOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.email_id, "mock-email-1");
    assert_eq!(outcome.invoice.status, InvoiceStatus::Sent);
    assert!(outcome.invoice.sent_at.is_some());
    assert_eq!(
        outcome.invoice.payment_link.as_deref(),
        Some(format!("{}/pay?invoice={}&amount=108.00", PUBLIC_ORIGIN, invoice.invoice_id).as_str())
    );
}

#[tokio::test]
async fn resending_a_sent_invoice_is_allowed() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    for _ in 0..2 {
        app.workflow()
            .send_invoice(TEST_USER_ID, &invoice.invoice_id, SendOptions::default())
            .await
            .unwrap();
    }
    assert_eq!(app.provider.send_count(), 2);
}

#[tokio::test]
async fn viewed_and_paid_invoices_cannot_be_sent() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;
    let id = invoice.invoice_id.as_str();

    app.workflow()
        .send_invoice(TEST_USER_ID, id, SendOptions::default())
        .await
        .unwrap();
    let viewed = app.workflow().mark_viewed(TEST_USER_ID, id).await.unwrap();
    assert_eq!(viewed.status, InvoiceStatus::Viewed);
    assert!(viewed.viewed_at.is_some());

    let err = app
        .workflow()
        .send_invoice(TEST_USER_ID, id, SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    app.workflow().mark_paid(TEST_USER_ID, id).await.unwrap();
    let err = app
        .workflow()
        .send_invoice(TEST_USER_ID, id, SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    // Only the first send reached the provider
    assert_eq!(app.provider.send_count(), 1);
}

#[tokio::test]
async fn only_sent_invoices_can_be_marked_viewed() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    let err = app
        .workflow()
        .mark_viewed(TEST_USER_ID, &invoice.invoice_id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));
    assert!(err.to_string().contains("cannot mark viewed an invoice that is draft"));
}

#[tokio::test]
async fn paid_is_terminal() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;
    let id = invoice.invoice_id.as_str();

    let settlement = app.workflow().mark_paid(TEST_USER_ID, id).await.unwrap();
    assert_eq!(settlement.invoice.status, InvoiceStatus::Paid);
    assert!(settlement.invoice.paid_at.is_some());

    let err = app.workflow().mark_viewed(TEST_USER_ID, id).await.unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)));

    let stored = app.workflow().get_invoice(TEST_USER_ID, id).await.unwrap();
    assert_eq!(stored.status, InvoiceStatus::Paid);
}
