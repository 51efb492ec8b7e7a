//! Emailing invoices through the notification gateway.

mod common;

use common::{TestApp, SENDER_ADDRESS, TEST_USER_ID};
use invoicing_service::models::{EmailLogStatus, InvoiceStatus};
use invoicing_service::services::notification::MockEmailProvider;
use invoicing_service::services::SendOptions;
use service_core::error::AppError;

#[tokio::test]
async fn email_carries_pdf_headers_and_link() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    app.workflow()
        .send_invoice(TEST_USER_ID, &invoice.invoice_id, SendOptions::default())
        .await
        .unwrap();

    let sent = app.provider.sent();
    assert_eq!(sent.len(), 1);
    let email = &sent[0];
    assert_eq!(email.to, "ap@acme.test");
    assert_eq!(email.from, format!("Pixel Studio <{}>", SENDER_ADDRESS));
    assert_eq!(email.subject, "Invoice INV-00001 from Pixel Studio");
    assert_eq!(email.header("X-Invoice-ID"), Some(invoice.invoice_id.as_str()));
    assert_eq!(email.header("X-Invoice-Number"), Some("INV-00001"));
    assert!(email.body_text.contains("Dear Acme,"));
    assert!(email.body_text.contains("Amount Due: $108.00"));
    assert!(email
        .body_html
        .contains(&format!("pay?invoice={}&amp;amount=108.00", invoice.invoice_id)));

    assert_eq!(email.attachments.len(), 1);
    let attachment = &email.attachments[0];
    assert_eq!(attachment.filename, "INV-00001.pdf");
    assert_eq!(attachment.content_type, "application/pdf");
    assert!(attachment.content.starts_with(b"%PDF"));
}

#[tokio::test]
async fn caller_subject_and_message_override_defaults() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    app.workflow()
        .send_invoice(
            TEST_USER_ID,
            &invoice.invoice_id,
            SendOptions {
                subject: Some("March design work".to_string()),
                message: Some("Hi team, invoice attached.".to_string()),
            },
        )
        .await
        .unwrap();

    let email = &app.provider.sent()[0];
    assert_eq!(email.subject, "March design work");
    assert!(email.body_text.starts_with("Hi team, invoice attached."));
}

#[tokio::test]
async fn delivery_failure_leaves_invoice_as_draft() {
    let app = TestApp::with_provider(MockEmailProvider::new(false));
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    let err = app
        .workflow()
        .send_invoice(TEST_USER_ID, &invoice.invoice_id, SendOptions::default())
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadGateway(_)));
    assert!(err.is_retryable());

    let stored = app
        .workflow()
        .get_invoice(TEST_USER_ID, &invoice.invoice_id)
        .await
        .unwrap();
    assert_eq!(stored.status, InvoiceStatus::Draft);
    assert!(stored.payment_link.is_none());
    assert!(stored.sent_at.is_none());
}

#[tokio::test]
async fn every_attempt_is_audited() {
    let app = TestApp::with_provider(MockEmailProvider::new(false));
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    let _ = app
        .workflow()
        .send_invoice(TEST_USER_ID, &invoice.invoice_id, SendOptions::default())
        .await;

    let logs = app
        .workflow()
        .delivery_history(TEST_USER_ID, &invoice.invoice_id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, EmailLogStatus::Failed);
    assert!(logs[0].email_id.is_none());
    assert!(logs[0].error.as_deref().unwrap_or_default().contains("not enabled"));
}

#[tokio::test]
async fn successful_send_is_audited_with_email_id() {
    let app = TestApp::new();
    let invoice = app.draft_invoice(TEST_USER_ID).await;

    app.workflow()
        .send_invoice(TEST_USER_ID, &invoice.invoice_id, SendOptions::default())
        .await
        .unwrap();

    let logs = app
        .workflow()
        .delivery_history(TEST_USER_ID, &invoice.invoice_id)
        .await
        .unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].status, EmailLogStatus::Sent);
    assert_eq!(logs[0].email_id.as_deref(), Some("mock-email-1"));
    assert_eq!(logs[0].invoice_number, "INV-00001");
}
