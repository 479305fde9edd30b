//! Plain-text receipts and credit notes for printing or sharing.

use std::fmt::Write;

use crate::models::{CreditNote, Profile, SaleWithItems};

pub const DEFAULT_WIDTH: usize = 40;

/// Formats kwanzas the Angolan way: `1.234,50 Kz`.
pub fn format_kwanza(amount: f64) -> String {
    let cents = (amount.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let fraction = cents % 100;

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 && cents > 0 { "-" } else { "" };
    format!("{}{},{:02} Kz", sign, grouped, fraction)
}

fn center(text: &str, width: usize) -> String {
    let len = text.chars().count();
    if len >= width {
        return text.to_string();
    }
    let pad = (width - len) / 2;
    format!("{}{}", " ".repeat(pad), text)
}

/// Left text and right-aligned value on one line.
fn columns(left: &str, right: &str, width: usize) -> String {
    let used = left.chars().count() + right.chars().count();
    if used >= width {
        return format!("{} {}", left, right);
    }
    format!("{}{}{}", left, " ".repeat(width - used), right)
}

fn header(out: &mut String, profile: Option<&Profile>, width: usize) {
    match profile {
        Some(p) => {
            let _ = writeln!(out, "{}", center(&p.business_name, width));
            if let Some(address) = &p.address {
                let _ = writeln!(out, "{}", center(address, width));
            }
            if let Some(nif) = &p.nif {
                let _ = writeln!(out, "{}", center(&format!("NIF: {}", nif), width));
            }
            if let Some(phone) = &p.phone {
                let _ = writeln!(out, "{}", center(&format!("Tel: {}", phone), width));
            }
        }
        None => {
            let _ = writeln!(out, "{}", center("RECIBO", width));
        }
    }
    let _ = writeln!(out, "{}", "=".repeat(width));
}

fn quantity_label(quantity: f64) -> String {
    if quantity.fract() == 0.0 {
        format!("{}", quantity as i64)
    } else {
        format!("{:.3}", quantity)
    }
}

pub fn render_receipt(profile: Option<&Profile>, sale: &SaleWithItems, width: usize) -> String {
    let width = width.max(24);
    let mut out = String::new();
    header(&mut out, profile, width);

    let s = &sale.sale;
    let _ = writeln!(out, "Venda: {}", s.sale_number);
    let _ = writeln!(out, "Data: {}", s.created_at);
    if let Some(customer) = &s.customer_name {
        let _ = writeln!(out, "Cliente: {}", customer);
    }
    if let Some(nif) = &s.customer_nif {
        let _ = writeln!(out, "NIF cliente: {}", nif);
    }
    let _ = writeln!(out, "{}", "-".repeat(width));

    for item in &sale.items {
        let _ = writeln!(out, "{}", item.description);
        let detail = format!(
            "  {} x {}",
            quantity_label(item.quantity),
            format_kwanza(item.unit_price)
        );
        let _ = writeln!(out, "{}", columns(&detail, &format_kwanza(item.subtotal), width));
    }

    let _ = writeln!(out, "{}", "-".repeat(width));
    let _ = writeln!(out, "{}", columns("Subtotal", &format_kwanza(s.subtotal), width));
    if s.discount > 0.0 {
        let _ = writeln!(
            out,
            "{}",
            columns("Desconto", &format!("-{}", format_kwanza(s.discount)), width)
        );
    }
    let _ = writeln!(out, "{}", columns("TOTAL", &format_kwanza(s.total), width));
    let _ = writeln!(out, "{}", columns("Pagamento", s.payment_method.label(), width));
    let _ = writeln!(out, "{}", columns("Recebido", &format_kwanza(s.amount_received), width));
    let _ = writeln!(out, "{}", columns("Troco", &format_kwanza(s.change), width));
    let _ = writeln!(out, "{}", "=".repeat(width));
    let _ = writeln!(out, "{}", center("Obrigado pela preferência!", width));

    out
}

pub fn render_credit_note(
    profile: Option<&Profile>,
    note: &CreditNote,
    sale: &SaleWithItems,
    width: usize,
) -> String {
    let width = width.max(24);
    let mut out = String::new();
    header(&mut out, profile, width);

    let _ = writeln!(out, "{}", center("NOTA DE CRÉDITO", width));
    let _ = writeln!(out, "Número: {}", note.note_number);
    let _ = writeln!(out, "Data: {}", note.created_at);
    let _ = writeln!(out, "Ref. venda: {}", sale.sale.sale_number);
    let _ = writeln!(out, "Motivo: {}", note.reason);
    let _ = writeln!(out, "{}", "-".repeat(width));
    let _ = writeln!(out, "{}", columns("Total da venda", &format_kwanza(sale.sale.total), width));
    let _ = writeln!(out, "{}", columns("Valor creditado", &format_kwanza(note.amount), width));
    let _ = writeln!(out, "{}", "=".repeat(width));

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BusinessModule, PaymentMethod, Sale, SaleItem};

    fn sample_sale() -> SaleWithItems {
        SaleWithItems {
            sale: Sale {
                id: 1,
                sale_number: "VD-20240315-0001".to_string(),
                subtotal: 3750.0,
                discount: 250.0,
                total: 3500.0,
                payment_method: PaymentMethod::Cash,
                amount_received: 5000.0,
                change: 1500.0,
                customer_name: Some("João".to_string()),
                customer_nif: None,
                created_at: "2024-03-15 10:30:00".to_string(),
            },
            items: vec![
                SaleItem {
                    id: 1,
                    sale_id: 1,
                    product_id: Some(1),
                    meat_cut_id: None,
                    description: "Arroz 1kg".to_string(),
                    quantity: 3.0,
                    unit_price: 850.0,
                    subtotal: 2550.0,
                },
                SaleItem {
                    id: 2,
                    sale_id: 1,
                    product_id: None,
                    meat_cut_id: None,
                    description: "Óleo 1L".to_string(),
                    quantity: 1.0,
                    unit_price: 1200.0,
                    subtotal: 1200.0,
                },
            ],
        }
    }

    fn sample_profile() -> Profile {
        Profile {
            id: 1,
            full_name: "Maria Santos".to_string(),
            business_name: "Mercado Kianda".to_string(),
            business_module: BusinessModule::Supermarket,
            nif: Some("5417000000".to_string()),
            phone: None,
            address: Some("Luanda".to_string()),
            created_at: String::new(),
        }
    }

    #[test]
    fn test_format_kwanza() {
        assert_eq!(format_kwanza(0.0), "0,00 Kz");
        assert_eq!(format_kwanza(999.5), "999,50 Kz");
        assert_eq!(format_kwanza(1234.5), "1.234,50 Kz");
        assert_eq!(format_kwanza(1_500_000.0), "1.500.000,00 Kz");
        assert_eq!(format_kwanza(-2500.0), "-2.500,00 Kz");
    }

    #[test]
    fn test_receipt_contains_lines_and_totals() {
        let receipt = render_receipt(Some(&sample_profile()), &sample_sale(), DEFAULT_WIDTH);

        assert!(receipt.contains("Mercado Kianda"));
        assert!(receipt.contains("NIF: 5417000000"));
        assert!(receipt.contains("VD-20240315-0001"));
        assert!(receipt.contains("Cliente: João"));
        assert!(receipt.contains("3 x 850,00 Kz"));
        assert!(receipt.contains("-250,00 Kz"));
        assert!(receipt.contains("3.500,00 Kz"));
        assert!(receipt.contains("Numerário"));
        assert!(receipt.contains("1.500,00 Kz"));

        for line in receipt.lines() {
            assert!(line.chars().count() <= DEFAULT_WIDTH, "line too wide: {:?}", line);
        }
    }

    #[test]
    fn test_receipt_without_profile() {
        let receipt = render_receipt(None, &sample_sale(), DEFAULT_WIDTH);
        assert!(receipt.starts_with(&center("RECIBO", DEFAULT_WIDTH)));
    }

    #[test]
    fn test_credit_note() {
        let note = CreditNote {
            id: 1,
            sale_id: 1,
            note_number: "NC-20240315-0001".to_string(),
            reason: "Produto devolvido".to_string(),
            amount: 1200.0,
            created_at: "2024-03-15 12:00:00".to_string(),
        };
        let text = render_credit_note(None, &note, &sample_sale(), DEFAULT_WIDTH);
        assert!(text.contains("NOTA DE CRÉDITO"));
        assert!(text.contains("NC-20240315-0001"));
        assert!(text.contains("VD-20240315-0001"));
        assert!(text.contains("1.200,00 Kz"));
    }
}
