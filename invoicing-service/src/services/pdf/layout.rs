//! Page layout for invoices and agreements.

use super::{Align, Block, Document, Page, Rgb, Weight, MARGIN, PAGE_HEIGHT, PAGE_WIDTH};
use crate::models::{format_amount, CompanySnapshot, ContractRequest, Invoice};

/// Lowest baseline body text may use before a page break.
const BOTTOM_LIMIT: f32 = PAGE_HEIGHT - 30.0;
const LINE_HEIGHT: f32 = 5.0;
const PT_TO_MM: f32 = 0.3528;
/// Average Helvetica glyph width as a fraction of the font size.
const AVG_GLYPH_WIDTH: f32 = 0.5;

const PANEL_FILL: Rgb = Rgb {
    r: 245,
    g: 247,
    b: 250,
};
const ZEBRA_FILL: Rgb = Rgb::grey(250);
const MUTED: Rgb = Rgb::grey(100);
const FOOTER: Rgb = Rgb::grey(150);

/// Approximate rendered width of `text` in millimetres.
pub fn text_width(text: &str, size: f32) -> f32 {
    text.chars().count() as f32 * size * PT_TO_MM * AVG_GLYPH_WIDTH
}

/// Greedy word wrap. Explicit newlines always break.
pub fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if !current.is_empty() && text_width(&candidate, size) > max_width {
                lines.push(std::mem::take(&mut current));
                current = word.to_string();
            } else {
                current = candidate;
            }
        }
        lines.push(current);
    }
    lines
}

struct Layout {
    title: String,
    pages: Vec<Page>,
    y: f32,
}

impl Layout {
    fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            pages: vec![Page::default()],
            y: MARGIN,
        }
    }

    fn push(&mut self, block: Block) {
        if let Some(page) = self.pages.last_mut() {
            page.blocks.push(block);
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn text(&mut self, x: f32, y: f32, text: &str, size: f32, weight: Weight, color: Rgb, align: Align) {
        if text.is_empty() {
            return;
        }
        self.push(Block::Text {
            x,
            y,
            text: text.to_string(),
            size,
            weight,
            color,
            align,
        });
    }

    fn body(&mut self, x: f32, y: f32, text: &str) {
        self.text(x, y, text, 10.0, Weight::Regular, Rgb::BLACK, Align::Left);
    }

    fn heading(&mut self, x: f32, y: f32, text: &str, size: f32) {
        self.text(x, y, text, size, Weight::Bold, Rgb::BLACK, Align::Left);
    }

    fn rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: Rgb) {
        self.push(Block::Rect {
            x,
            y,
            width,
            height,
            color,
        });
    }

    fn new_page(&mut self) {
        self.pages.push(Page::default());
        self.y = MARGIN;
    }

    fn ensure_space(&mut self, needed: f32) {
        if self.y + needed > BOTTOM_LIMIT {
            self.new_page();
        }
    }

    /// Wrapped body text at the left margin, breaking pages as needed.
    fn paragraph(&mut self, text: &str) {
        for line in wrap_text(text, PAGE_WIDTH - 2.0 * MARGIN, 10.0) {
            self.ensure_space(LINE_HEIGHT);
            self.body(MARGIN, self.y, &line);
            self.y += LINE_HEIGHT;
        }
    }

    /// Company name with a coloured badge on the right.
    fn header(&mut self, company_name: &str, badge: &str, badge_width: f32, brand: Rgb) {
        let y = self.y;
        let badge_x = PAGE_WIDTH - MARGIN - badge_width;
        self.rect(badge_x, y, badge_width, 20.0, brand);
        self.text(
            badge_x + badge_width / 2.0,
            y + 13.0,
            badge,
            14.0,
            Weight::Bold,
            Rgb::WHITE,
            Align::Center,
        );
        self.heading(MARGIN, y + 10.0, company_name, 20.0);
        self.y += 30.0;
    }

    /// Two shaded panels side by side; returns the x of the right panel text.
    fn party_panels(&mut self) -> f32 {
        let half = (PAGE_WIDTH - 2.0 * MARGIN) / 2.0;
        let y = self.y;
        self.rect(MARGIN, y, half - 5.0, 35.0, PANEL_FILL);
        self.rect(MARGIN + half + 5.0, y, half - 5.0, 35.0, PANEL_FILL);
        MARGIN + half + 10.0
    }

    fn company_panel(&mut self, label: &str, company: &CompanySnapshot) {
        let (x, y) = (MARGIN + 5.0, self.y);
        self.heading(x, y + 8.0, label, 11.0);
        self.body(x, y + 15.0, &company.company_name);
        self.body(x, y + 20.0, &company.address);
        self.body(x, y + 25.0, &contact_line(company));
    }

    fn finish(mut self, company_name: &str) -> Document {
        let footer = format!("{} • Generated with IndiePilot", company_name);
        for page in &mut self.pages {
            page.blocks.push(Block::Text {
                x: PAGE_WIDTH / 2.0,
                y: PAGE_HEIGHT - 10.0,
                text: footer.clone(),
                size: 9.0,
                weight: Weight::Regular,
                color: FOOTER,
                align: Align::Center,
            });
        }
        Document {
            title: self.title,
            pages: self.pages,
        }
    }
}

fn contact_line(company: &CompanySnapshot) -> String {
    match (company.email.is_empty(), company.phone.is_empty()) {
        (false, false) => format!("{} | {}", company.email, company.phone),
        (false, true) => company.email.clone(),
        (true, false) => company.phone.clone(),
        (true, true) => String::new(),
    }
}

fn money(amount: rust_decimal::Decimal) -> String {
    format!("${}", format_amount(amount))
}

pub fn invoice(invoice: &Invoice) -> Document {
    let company = &invoice.company_profile;
    let brand = Rgb::brand(company.brand_color.as_deref());
    let right = PAGE_WIDTH - MARGIN;
    let mut doc = Layout::new(format!("Invoice {}", invoice.invoice_number));

    doc.header(&company.company_name, "INVOICE", 50.0, brand);

    // Invoice details on the right, company contact on the left
    let y = doc.y;
    let details = [
        format!("Invoice No: {}", invoice.invoice_number),
        format!("Issue Date: {}", invoice.issue_date),
        format!("Due Date: {}", invoice.due_date),
    ];
    for (i, line) in details.iter().enumerate() {
        let line_y = y + i as f32 * LINE_HEIGHT;
        doc.text(right, line_y, line, 10.0, Weight::Regular, MUTED, Align::Right);
    }
    doc.body(MARGIN, y, &company.address);
    doc.body(MARGIN, y + 5.0, &company.email);
    doc.body(MARGIN, y + 10.0, &company.phone);
    doc.y += 30.0;

    let bill_to_x = doc.party_panels();
    doc.company_panel("BILL FROM", company);
    let y = doc.y;
    doc.heading(bill_to_x, y + 8.0, "BILL TO", 11.0);
    doc.body(bill_to_x, y + 15.0, &invoice.client_name);
    match invoice.client_address.as_deref().filter(|a| !a.is_empty()) {
        Some(address) => {
            doc.body(bill_to_x, y + 20.0, address);
            doc.body(bill_to_x, y + 25.0, &invoice.client_email);
        }
        None => doc.body(bill_to_x, y + 20.0, &invoice.client_email),
    }
    doc.y += 45.0;

    // Item table
    let (qty_x, rate_x, amount_x) = (PAGE_WIDTH - 80.0, PAGE_WIDTH - 60.0, right - 5.0);
    let y = doc.y;
    doc.rect(MARGIN, y, PAGE_WIDTH - 2.0 * MARGIN, 10.0, brand);
    for (x, label, align) in [
        (MARGIN + 5.0, "Description", Align::Left),
        (qty_x, "Qty", Align::Left),
        (rate_x, "Rate", Align::Left),
        (amount_x, "Amount", Align::Right),
    ] {
        doc.text(x, y + 7.0, label, 10.0, Weight::Bold, Rgb::WHITE, align);
    }
    doc.y += 10.0;

    for (index, item) in invoice.items.iter().enumerate() {
        doc.ensure_space(10.0);
        let y = doc.y;
        if index % 2 == 0 {
            doc.rect(MARGIN, y, PAGE_WIDTH - 2.0 * MARGIN, 10.0, ZEBRA_FILL);
        }
        doc.body(MARGIN + 5.0, y + 7.0, &item.description);
        doc.body(qty_x, y + 7.0, &item.quantity.normalize().to_string());
        doc.body(rate_x, y + 7.0, &money(item.rate));
        doc.text(
            amount_x,
            y + 7.0,
            &money(item.amount),
            10.0,
            Weight::Regular,
            Rgb::BLACK,
            Align::Right,
        );
        doc.y += 10.0;
    }

    // Totals
    doc.y += 5.0;
    doc.ensure_space(30.0);
    let totals_x = PAGE_WIDTH - 70.0;
    doc.body(totals_x, doc.y, "Subtotal:");
    let y = doc.y;
    doc.text(right, y, &money(invoice.subtotal), 10.0, Weight::Regular, Rgb::BLACK, Align::Right);
    doc.y += 7.0;

    if invoice.tax_rate > rust_decimal::Decimal::ZERO {
        let y = doc.y;
        doc.body(totals_x, y, &format!("Tax ({}%):", invoice.tax_rate.normalize()));
        doc.text(right, y, &money(invoice.tax), 10.0, Weight::Regular, Rgb::BLACK, Align::Right);
        doc.y += 7.0;
    }

    let y = doc.y;
    doc.push(Block::Line {
        from: (totals_x - 5.0, y - 2.0),
        to: (right, y - 2.0),
        thickness: 0.5,
        color: brand,
    });
    doc.heading(totals_x, y + 5.0, "Total:", 12.0);
    doc.text(right, y + 5.0, &money(invoice.total), 12.0, Weight::Bold, Rgb::BLACK, Align::Right);
    doc.y += 20.0;

    let notes = invoice.notes.trim();
    let terms = invoice.terms.trim();
    if !notes.is_empty() || !terms.is_empty() {
        doc.ensure_space(40.0);
        if !notes.is_empty() {
            doc.heading(MARGIN, doc.y, "Notes", 11.0);
            doc.y += LINE_HEIGHT;
            doc.paragraph(notes);
            doc.y += LINE_HEIGHT;
        }
        if !terms.is_empty() {
            doc.ensure_space(2.0 * LINE_HEIGHT);
            doc.heading(MARGIN, doc.y, "Terms & Conditions", 11.0);
            doc.y += LINE_HEIGHT;
            doc.paragraph(terms);
        }
    }

    doc.finish(&company.company_name)
}

pub fn contract(contract: &ContractRequest, company: &CompanySnapshot) -> Document {
    let brand = Rgb::brand(company.brand_color.as_deref());
    let right = PAGE_WIDTH - MARGIN;
    let mut doc = Layout::new(format!("Agreement {}", contract.contract_number));

    doc.header(&company.company_name, "AGREEMENT", 60.0, brand);

    let y = doc.y;
    doc.text(
        right,
        y,
        &format!("Contract No: {}", contract.contract_number),
        10.0,
        Weight::Regular,
        MUTED,
        Align::Right,
    );
    doc.text(
        right,
        y + LINE_HEIGHT,
        &format!("Issue Date: {}", contract.issue_date),
        10.0,
        Weight::Regular,
        MUTED,
        Align::Right,
    );
    doc.y += 20.0;

    let client_x = doc.party_panels();
    doc.company_panel("COMPANY", company);
    let y = doc.y;
    doc.heading(client_x, y + 8.0, "CLIENT", 11.0);
    doc.body(client_x, y + 15.0, &contract.client_name);
    if let Some(email) = &contract.client_email {
        doc.body(client_x, y + 20.0, email);
    }
    doc.y += 45.0;

    let sections = [
        ("SCOPE OF WORK", Some(contract.scope_of_work.as_str())),
        ("COMPENSATION", Some(contract.rate_label.as_str())),
        ("TERMS & CONDITIONS", contract.terms.as_deref()),
        ("ADDITIONAL NOTES", contract.notes.as_deref()),
    ];
    for (title, body) in sections {
        let Some(body) = body.map(str::trim).filter(|b| !b.is_empty()) else {
            continue;
        };
        doc.ensure_space(7.0 + LINE_HEIGHT);
        doc.heading(MARGIN, doc.y, title, 12.0);
        doc.y += 7.0;
        doc.paragraph(body);
        doc.y += 10.0;
    }

    doc.finish(&company.company_name)
}
