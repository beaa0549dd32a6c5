//! Printable order sheets.
//!
//! An [`OrderSheet`] is an order list resolved against the catalog: part
//! names and labels come from the catalog, not from the client. The
//! client renders its PDF from the same structure; the server offers a
//! plain-text rendering for download.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use super::order::{OrderError, OrderItem, validate_order};

/// Who the order is for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Customer {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// A measurement or collar-count line.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SheetLine {
    Measurement { label: String, value: f64 },
    Direction { label: String, count: u32 },
}

impl fmt::Display for SheetLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Measurement { label, value } => write!(f, "{label}: {value} cm"),
            Self::Direction { label, count } => write!(f, "{label}: {count} adet"),
        }
    }
}

/// A checkbox of the part and whether the customer ticked it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SheetOption {
    pub label: String,
    pub checked: bool,
}

/// One resolved order line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetItem {
    pub position: usize,
    pub part_name: String,
    pub image: String,
    pub quantity: u32,
    pub lines: Vec<SheetLine>,
    pub options: Vec<SheetOption>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A validated order list ready for printing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderSheet {
    pub customer: Customer,
    pub date: NaiveDate,
    pub items: Vec<SheetItem>,
}

impl OrderSheet {
    /// Title printed at the top of every sheet.
    pub const TITLE: &'static str = "RECTANGULAR DUCT SİPARİŞİ";

    /// Validate `items` and resolve them against the catalog.
    ///
    /// Measurements the customer left empty are printed as 0, and every
    /// direction of a collar measurement gets a line even when its count is 0.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderError`] from [`validate_order`].
    pub fn build(
        items: &[OrderItem],
        customer: Customer,
        date: NaiveDate,
    ) -> Result<Self, OrderError> {
        validate_order(items)?;

        let items = items
            .iter()
            .enumerate()
            .map(|(index, item)| {
                let position = index + 1;
                let part = item.validate(position)?;

                let mut lines = Vec::new();
                for measurement in part.measurements {
                    if measurement.directions.is_empty() {
                        lines.push(SheetLine::Measurement {
                            label: measurement.label.to_owned(),
                            value: item
                                .measurements
                                .get(measurement.key)
                                .copied()
                                .unwrap_or(0.0),
                        });
                    } else {
                        for direction in measurement.directions {
                            let key = format!("{}_{}", measurement.key, direction.key);
                            lines.push(SheetLine::Direction {
                                label: direction.label.to_owned(),
                                count: item.directions.get(&key).copied().unwrap_or(0),
                            });
                        }
                    }
                }

                let options = part
                    .checkboxes
                    .iter()
                    .map(|checkbox| SheetOption {
                        label: checkbox.label.to_owned(),
                        checked: item.checkboxes.get(checkbox.key).copied().unwrap_or(false),
                    })
                    .collect();

                Ok(SheetItem {
                    position,
                    part_name: part.name.to_owned(),
                    image: part.image.to_owned(),
                    quantity: item.quantity,
                    lines,
                    options,
                    notes: item
                        .notes
                        .as_deref()
                        .map(str::trim)
                        .filter(|n| !n.is_empty())
                        .map(str::to_owned),
                })
            })
            .collect::<Result<Vec<_>, OrderError>>()?;

        Ok(Self {
            customer,
            date,
            items,
        })
    }

    /// Sum of quantities over all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    /// Download file name, e.g. `siparis_2026-10-17.pdf`.
    #[must_use]
    pub fn file_name(&self, extension: &str) -> String {
        format!("siparis_{}.{extension}", self.date.format("%Y-%m-%d"))
    }

    /// Plain-text rendering of the sheet.
    #[must_use]
    pub fn to_text(&self) -> String {
        self.to_string()
    }

    /// Write the plain-text rendering to `out`.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by `out`.
    pub fn write_text(&self, out: &mut impl fmt::Write) -> fmt::Result {
        let date = self.date.format("%d.%m.%Y");

        writeln!(out, "{}", Self::TITLE)?;
        writeln!(out)?;
        writeln!(out, "Müşteri: {}", self.customer.name)?;
        if let Some(email) = &self.customer.email {
            writeln!(out, "E-posta: {email}")?;
        }
        if let Some(phone) = &self.customer.phone {
            writeln!(out, "Telefon: {phone}")?;
        }
        writeln!(out, "Sipariş Tarihi: {date}")?;

        for item in &self.items {
            writeln!(out)?;
            writeln!(out, "#{} - {}", item.position, item.part_name)?;
            writeln!(out, "Adet: {}", item.quantity)?;
            writeln!(out, "Ölçüler:")?;
            for line in &item.lines {
                writeln!(out, "  {line}")?;
            }
            if !item.options.is_empty() {
                writeln!(out, "Seçenekler:")?;
                for option in &item.options {
                    let mark = if option.checked { "[x]" } else { "[ ]" };
                    writeln!(out, "  {mark} {}", option.label)?;
                }
            }
            if let Some(notes) = &item.notes {
                writeln!(out, "Notlar: {notes}")?;
            }
        }

        writeln!(out)?;
        writeln!(
            out,
            "Toplam Parça Sayısı: {} | Toplam Adet: {}",
            self.items.len(),
            self.total_quantity()
        )?;
        writeln!(out, "Bu sipariş {date} tarihinde oluşturulmuştur.")
    }
}

impl fmt::Display for OrderSheet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.write_text(f)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn customer() -> Customer {
        Customer {
            name: "Ahmet Yılmaz".to_owned(),
            email: Some("ahmet@example.com".to_owned()),
            phone: None,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 17).unwrap()
    }

    fn reducer() -> OrderItem {
        OrderItem {
            id: "a".to_owned(),
            part_key: "3-reduksiyon.png".to_owned(),
            quantity: 2,
            measurements: BTreeMap::from([
                ("w1".to_owned(), 50.0),
                ("h1".to_owned(), 30.0),
                ("l".to_owned(), 40.0),
                ("w2".to_owned(), 40.0),
            ]),
            checkboxes: BTreeMap::from([("sol_duz".to_owned(), true)]),
            directions: BTreeMap::new(),
            notes: Some("  ".to_owned()),
        }
    }

    fn linear_box() -> OrderItem {
        OrderItem {
            id: "b".to_owned(),
            part_key: "lineer-menfez-kutusu.png".to_owned(),
            quantity: 3,
            measurements: BTreeMap::from([("w1".to_owned(), 100.0), ("h1".to_owned(), 12.5)]),
            checkboxes: BTreeMap::new(),
            directions: BTreeMap::from([("o_arka".to_owned(), 2)]),
            notes: Some("Acil".to_owned()),
        }
    }

    #[test]
    fn test_build_resolves_catalog_labels() {
        let sheet = OrderSheet::build(&[reducer(), linear_box()], customer(), date()).unwrap();
        assert_eq!(sheet.items.len(), 2);

        let first = &sheet.items[0];
        assert_eq!(first.part_name, "Redüksiyon");
        assert_eq!(first.lines.len(), 5);
        assert_eq!(first.lines[4].to_string(), "H2: 0 cm");
        assert_eq!(first.options.len(), 4);
        assert!(first.options[0].checked);
        assert!(!first.options[1].checked);
        assert_eq!(first.notes, None);

        let second = &sheet.items[1];
        assert_eq!(second.position, 2);
        // W1, H1, L and one line per collar direction.
        assert_eq!(second.lines.len(), 8);
        assert_eq!(second.lines[6].to_string(), "Arka: 2 adet");
        assert_eq!(second.lines[3].to_string(), "Sağ: 0 adet");
        assert_eq!(second.lines[1].to_string(), "H1: 12.5 cm");
    }

    #[test]
    fn test_build_rejects_invalid_order() {
        let mut item = reducer();
        item.quantity = 0;
        assert!(OrderSheet::build(&[item], customer(), date()).is_err());
        assert_eq!(
            OrderSheet::build(&[], customer(), date()),
            Err(OrderError::Empty)
        );
    }

    #[test]
    fn test_to_text() {
        let sheet = OrderSheet::build(&[reducer(), linear_box()], customer(), date()).unwrap();
        let text = sheet.to_text();
        assert!(text.starts_with("RECTANGULAR DUCT SİPARİŞİ\n"));
        assert!(text.contains("Müşteri: Ahmet Yılmaz\n"));
        assert!(text.contains("E-posta: ahmet@example.com\n"));
        assert!(text.contains("Sipariş Tarihi: 17.10.2026\n"));
        assert!(text.contains("#1 - Redüksiyon\nAdet: 2\n"));
        assert!(text.contains("  W1: 50 cm\n"));
        assert!(text.contains("  [x] Sol Düz\n  [ ] Sağ Düz\n"));
        assert!(text.contains("#2 - Lineer Menfez Kutusu\n"));
        assert!(text.contains("Notlar: Acil\n"));
        assert!(text.contains("Toplam Parça Sayısı: 2 | Toplam Adet: 5\n"));
        assert!(!text.contains("Telefon"));
    }

    #[test]
    fn test_write_text_stops_at_writer_error() {
        /// Accepts `limit` bytes, then fails.
        struct Budget {
            written: String,
            limit: usize,
        }

        impl fmt::Write for Budget {
            fn write_str(&mut self, s: &str) -> fmt::Result {
                if self.written.len() + s.len() > self.limit {
                    return Err(fmt::Error);
                }
                self.written.push_str(s);
                Ok(())
            }
        }

        let sheet = OrderSheet::build(&[reducer(), linear_box()], customer(), date()).unwrap();

        let mut unlimited = Budget {
            written: String::new(),
            limit: usize::MAX,
        };
        assert!(sheet.write_text(&mut unlimited).is_ok());
        assert_eq!(unlimited.written, sheet.to_text());

        let mut short = Budget {
            written: String::new(),
            limit: 40,
        };
        assert_eq!(sheet.write_text(&mut short), Err(fmt::Error));
        assert!(short.written.starts_with(OrderSheet::TITLE));
        assert!(!short.written.contains("Toplam"));
    }

    #[test]
    fn test_file_name() {
        let sheet = OrderSheet::build(&[reducer()], customer(), date()).unwrap();
        assert_eq!(sheet.file_name("txt"), "siparis_2026-10-17.txt");
    }
}
