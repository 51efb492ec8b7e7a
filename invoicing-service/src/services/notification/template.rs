//! Subject, message and body templates for invoice email.

use super::InvoiceEmail;
use crate::models::format_amount;
use chrono::NaiveDate;
use rust_decimal::Decimal;

pub fn default_subject(invoice_number: &str, company_name: &str) -> String {
    format!("Invoice {} from {}", invoice_number, company_name)
}

pub fn default_message(
    client_name: &str,
    invoice_number: &str,
    amount_due: Decimal,
    due_date: NaiveDate,
    company_name: &str,
) -> String {
    format!(
        "Dear {client_name},

Thank you for your business. Please find attached your invoice {invoice_number}.

Amount Due: ${amount}
Due Date: {due_date}

You can pay this invoice online using the secure payment link below.

If you have any questions about this invoice, please don't hesitate to contact us.

Best regards,
{company_name}",
        amount = format_amount(amount_due),
    )
}

/// `Company <local@domain>`, quoting the display name when it holds
/// characters that are special in an address header.
pub fn sender_mailbox(company_name: &str, address: &str) -> String {
    let name = company_name.trim();
    if name.is_empty() {
        return address.to_string();
    }
    let needs_quotes = name
        .chars()
        .any(|c| matches!(c, ',' | ';' | ':' | '<' | '>' | '"' | '@' | '(' | ')' | '[' | ']' | '\\' | '.'));
    if needs_quotes {
        let escaped = name.replace('\\', "\\\\").replace('"', "\\\"");
        format!("\"{}\" <{}>", escaped, address)
    } else {
        format!("{} <{}>", name, address)
    }
}

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

pub fn text_body(email: &InvoiceEmail) -> String {
    format!(
        "{message}

Invoice Details:
- Invoice Number: {number}
- Amount Due: ${amount}
- Due Date: {due}

Pay this invoice online: {link}

{company}
Sent via IndiePilot",
        message = email.message.trim(),
        number = email.invoice_number,
        amount = format_amount(email.amount_due),
        due = email.due_date,
        link = email.payment_link,
        company = email.company_name,
    )
}

pub fn html_body(email: &InvoiceEmail) -> String {
    let company = escape_html(&email.company_name);
    let number = escape_html(&email.invoice_number);
    let link = escape_html(&email.payment_link);
    let message = escape_html(email.message.trim()).replace('\n', "<br>");

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <style>
    body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px; background-color: #f5f5f5; }}
    .email-container {{ background: white; border-radius: 10px; overflow: hidden; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }}
    .header {{ background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white; padding: 30px; text-align: center; }}
    .content {{ padding: 30px; }}
    .invoice-details {{ background: #f9fafb; padding: 20px; border-radius: 8px; margin: 20px 0; border-left: 4px solid #667eea; }}
    .detail-row {{ display: flex; justify-content: space-between; margin: 10px 0; padding: 5px 0; }}
    .button {{ display: block; width: 200px; padding: 14px 30px; margin: 20px auto; background: linear-gradient(135deg, #667eea 0%, #764ba2 100%); color: white !important; text-decoration: none; border-radius: 50px; font-weight: 600; text-align: center; }}
    .message-content {{ margin: 20px 0; line-height: 1.8; color: #4b5563; }}
    .footer {{ margin-top: 30px; padding-top: 20px; border-top: 1px solid #e5e7eb; text-align: center; color: #6b7280; font-size: 14px; }}
    .amount-due {{ font-size: 24px; color: #059669; font-weight: bold; }}
  </style>
</head>
<body>
  <div class="email-container">
    <div class="header">
      <h1 style="margin: 0; font-size: 28px;">{company}</h1>
      <p style="margin: 10px 0 0 0; opacity: 0.9;">Invoice {number}</p>
    </div>
    <div class="content">
      <div class="message-content">{message}</div>
      <div class="invoice-details">
        <h3 style="margin-top: 0; color: #4b5563;">Invoice Details</h3>
        <div class="detail-row"><span><strong>Invoice Number:</strong></span><span>{number}</span></div>
        <div class="detail-row"><span><strong>Amount Due:</strong></span><span class="amount-due">${amount}</span></div>
        <div class="detail-row"><span><strong>Due Date:</strong></span><span>{due}</span></div>
      </div>
      <a href="{link}" class="button">Pay Invoice Online</a>
      <p style="text-align: center; color: #6b7280; font-size: 14px;">
        Or copy this link:<br>
        <code style="background: #f3f4f6; padding: 5px 10px; border-radius: 4px; font-size: 12px;">{link}</code>
      </p>
      <div class="footer">
        <p><strong>{company}</strong></p>
        <p>This invoice was sent via IndiePilot</p>
        <p style="font-size: 12px; color: #9ca3af;">Your payment information is processed safely through our secure payment provider.</p>
      </div>
    </div>
  </div>
</body>
</html>"#,
        amount = format_amount(email.amount_due),
        due = email.due_date,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_subject_names_invoice_and_company() {
        assert_eq!(
            default_subject("INV-00001", "Acme Studio"),
            "Invoice INV-00001 from Acme Studio"
        );
    }

    #[test]
    fn default_message_shows_amount_with_cents() {
        let message = default_message(
            "Jane",
            "INV-00007",
            Decimal::new(108, 0),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
            "Acme",
        );
        assert!(message.starts_with("Dear Jane,"));
        assert!(message.contains("Amount Due: $108.00"));
        assert!(message.contains("Due Date: 2024-04-01"));
        assert!(message.ends_with("Best regards,\nAcme"));
    }

    #[test]
    fn sender_mailbox_quotes_special_names() {
        assert_eq!(
            sender_mailbox("Acme", "invoices@indiepilot.io"),
            "Acme <invoices@indiepilot.io>"
        );
        assert_eq!(
            sender_mailbox("Acme, Inc.", "invoices@indiepilot.io"),
            "\"Acme, Inc.\" <invoices@indiepilot.io>"
        );
    }

    #[test]
    fn html_is_escaped() {
        assert_eq!(escape_html("<b>Tom & Jerry</b>"), "&lt;b&gt;Tom &amp; Jerry&lt;/b&gt;");
    }
}
