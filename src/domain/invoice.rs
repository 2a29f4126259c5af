//! Plain-text invoices for placed orders.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::i18n::{Locale, status_label};

use super::pricing::CartSummary;

#[derive(Debug, Clone)]
pub struct InvoiceLine {
    pub description: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

#[derive(Debug, Clone)]
pub struct InvoiceDocument {
    pub invoice_number: String,
    pub issued_at: DateTime<Utc>,
    pub customer_email: String,
    pub ship_to: Vec<String>,
    pub payment_method: String,
    pub status: String,
    pub coupon_code: Option<String>,
    pub lines: Vec<InvoiceLine>,
    pub totals: CartSummary,
}

/// Format whole pesos as `$ 1.234.567`.
pub fn format_cop(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-$ {grouped}")
    } else {
        format!("$ {grouped}")
    }
}

struct Labels {
    title: &'static str,
    number: &'static str,
    date: &'static str,
    customer: &'static str,
    ship_to: &'static str,
    payment: &'static str,
    status: &'static str,
    item: &'static str,
    qty: &'static str,
    unit: &'static str,
    amount: &'static str,
    subtotal: &'static str,
    discount: &'static str,
    points: &'static str,
    tax: &'static str,
    shipping: &'static str,
    total: &'static str,
    thanks: &'static str,
}

fn labels(locale: Locale) -> Labels {
    match locale {
        Locale::Es => Labels {
            title: "FACTURA",
            number: "Número",
            date: "Fecha",
            customer: "Cliente",
            ship_to: "Enviar a",
            payment: "Método de pago",
            status: "Estado",
            item: "Producto",
            qty: "Cant.",
            unit: "Precio",
            amount: "Importe",
            subtotal: "Subtotal",
            discount: "Descuento",
            points: "Puntos redimidos",
            tax: "IVA",
            shipping: "Envío",
            total: "Total",
            thanks: "Gracias por apoyar a los artesanos colombianos.",
        },
        Locale::En => Labels {
            title: "INVOICE",
            number: "Number",
            date: "Date",
            customer: "Customer",
            ship_to: "Ship to",
            payment: "Payment method",
            status: "Status",
            item: "Item",
            qty: "Qty",
            unit: "Price",
            amount: "Amount",
            subtotal: "Subtotal",
            discount: "Discount",
            points: "Points redeemed",
            tax: "VAT",
            shipping: "Shipping",
            total: "Total",
            thanks: "Thank you for supporting Colombian artisans.",
        },
    }
}

const RULE: &str = "------------------------------------------------------------------------";

impl InvoiceDocument {
    pub fn filename(&self) -> String {
        format!("{}.txt", self.invoice_number)
    }

    pub fn render(&self, locale: Locale) -> String {
        InvoiceText {
            document: self,
            locale,
        }
        .to_string()
    }
}

/// An invoice laid out in one language.
pub struct InvoiceText<'a> {
    document: &'a InvoiceDocument,
    locale: Locale,
}

impl fmt::Display for InvoiceText<'_> {
    fn fmt(&self, out: &mut fmt::Formatter<'_>) -> fmt::Result {
        let doc = self.document;
        let locale = self.locale;
        let l = labels(locale);

        writeln!(out, "ANCESTRAL HEARTBEAT - {}", l.title)?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "{}: {}", l.number, doc.invoice_number)?;
        writeln!(out, "{}: {}", l.date, doc.issued_at.format("%Y-%m-%d %H:%M UTC"))?;
        writeln!(out, "{}: {}", l.customer, doc.customer_email)?;
        writeln!(out, "{}: {}", l.payment, doc.payment_method)?;
        writeln!(out, "{}: {}", l.status, status_label(&doc.status, locale))?;
        writeln!(out, "{}:", l.ship_to)?;
        for line in &doc.ship_to {
            writeln!(out, "  {line}")?;
        }
        writeln!(out, "{RULE}")?;
        writeln!(
            out,
            "{:<34} {:>5} {:>14} {:>15}",
            l.item, l.qty, l.unit, l.amount
        )?;
        for line in &doc.lines {
            writeln!(
                out,
                "{:<34} {:>5} {:>14} {:>15}",
                truncate(&line.description, 34),
                line.quantity,
                format_cop(line.unit_price),
                format_cop(line.line_total)
            )?;
        }
        writeln!(out, "{RULE}")?;

        let t = &doc.totals;
        writeln!(out, "{:>54} {:>15}", l.subtotal, format_cop(t.subtotal))?;
        if t.discount > 0 {
            let label = match &doc.coupon_code {
                Some(code) => format!("{} ({code})", l.discount),
                None => l.discount.to_string(),
            };
            writeln!(out, "{:>54} {:>15}", label, format_cop(-t.discount))?;
        }
        if t.points_discount > 0 {
            writeln!(out, "{:>54} {:>15}", l.points, format_cop(-t.points_discount))?;
        }
        writeln!(out, "{:>54} {:>15}", l.tax, format_cop(t.tax))?;
        writeln!(out, "{:>54} {:>15}", l.shipping, format_cop(t.shipping))?;
        writeln!(out, "{:>54} {:>15}", l.total, format_cop(t.total))?;
        writeln!(out, "{RULE}")?;
        writeln!(out, "{}", l.thanks)?;
        Ok(())
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max - 1).collect();
        format!("{cut}…")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn document() -> InvoiceDocument {
        InvoiceDocument {
            invoice_number: "INV-20261017-1a2b3c4d".into(),
            issued_at: Utc.with_ymd_and_hms(2026, 10, 17, 15, 30, 0).unwrap(),
            customer_email: "cliente@example.com".into(),
            ship_to: vec!["Ana Pérez".into(), "Calle 10 # 5-20".into(), "Cartagena, Bolívar".into()],
            payment_method: "card".into(),
            status: "processing".into(),
            coupon_code: Some("ARTESANO20".into()),
            lines: vec![InvoiceLine {
                description: "Mochila wayuu (Grande)".into(),
                quantity: 2,
                unit_price: 185_000,
                line_total: 370_000,
            }],
            totals: CartSummary {
                item_count: 2,
                subtotal: 370_000,
                discount: 50_000,
                points_discount: 0,
                tax: 60_800,
                shipping: 0,
                total: 380_800,
            },
        }
    }

    #[test]
    fn formats_pesos_with_dot_grouping() {
        assert_eq!(format_cop(0), "$ 0");
        assert_eq!(format_cop(950), "$ 950");
        assert_eq!(format_cop(1_234_567), "$ 1.234.567");
        assert_eq!(format_cop(-50_000), "-$ 50.000");
    }

    #[test]
    fn renders_spanish_invoice() {
        let text = document().render(Locale::Es);
        assert!(text.contains("FACTURA"));
        assert!(text.contains("INV-20261017-1a2b3c4d"));
        assert!(text.contains("Descuento (ARTESANO20)"));
        assert!(text.contains("$ 380.800"));
        assert!(text.contains("en preparación"));
        assert!(!text.contains("Puntos redimidos"));
    }

    #[test]
    fn renders_english_labels() {
        let text = document().render(Locale::En);
        assert!(text.contains("INVOICE"));
        assert!(text.contains("VAT"));
        assert!(text.contains("Status: processing"));
    }

    #[test]
    fn long_descriptions_are_truncated() {
        assert_eq!(truncate("abcdef", 4), "abc…");
        assert_eq!(truncate("abc", 4), "abc");
    }
}
