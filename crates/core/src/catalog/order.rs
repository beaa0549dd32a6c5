//! Client-side order lists and their validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{PartDefinition, find_part};

/// One line of the customer's order list.
///
/// The client keeps the whole list in memory and sends it as a JSON array;
/// the server never persists it. Extra fields the client echoes back (part
/// name, image) are ignored in favor of the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItem {
    pub id: String,
    pub part_key: String,
    pub quantity: u32,
    #[serde(default)]
    pub measurements: BTreeMap<String, f64>,
    #[serde(default)]
    pub checkboxes: BTreeMap<String, bool>,
    /// Collar counts keyed `<measurement>_<direction>`, e.g. `o_sag`.
    #[serde(default)]
    pub directions: BTreeMap<String, u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Reasons an order list is rejected.
///
/// `position` is 1-based, matching the `#n` numbering on the order sheet.
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum OrderError {
    #[error("order list is empty")]
    Empty,
    #[error("order has {count} items, at most {max} allowed")]
    TooManyItems { count: usize, max: usize },
    #[error("item {position}: unknown part {key}")]
    UnknownPart { position: usize, key: String },
    #[error("item {position}: quantity {quantity} is outside 1..={max}")]
    InvalidQuantity {
        position: usize,
        quantity: u32,
        max: u32,
    },
    #[error("item {position}: unknown measurement {key}")]
    UnknownMeasurement { position: usize, key: String },
    #[error("item {position}: measurement {key} must be greater than 0 and at most {max}")]
    InvalidMeasurement {
        position: usize,
        key: String,
        max: f64,
    },
    #[error("item {position}: unknown option {key}")]
    UnknownCheckbox { position: usize, key: String },
    #[error("item {position}: unknown direction {key}")]
    UnknownDirection { position: usize, key: String },
    #[error("item {position}: direction {key} count exceeds {max}")]
    TooManyCollars {
        position: usize,
        key: String,
        max: u32,
    },
    #[error("item {position}: notes must be at most {max} characters")]
    NotesTooLong { position: usize, max: usize },
}

impl OrderItem {
    /// Largest quantity of a single line.
    pub const MAX_QUANTITY: u32 = 100;
    /// Largest accepted dimension, in centimetres.
    pub const MAX_MEASUREMENT: f64 = 100_000.0;
    /// Largest collar count for one direction.
    pub const MAX_DIRECTION_COUNT: u32 = 100;
    /// Longest accepted note.
    pub const MAX_NOTES_CHARS: usize = 500;
    /// Longest accepted order list.
    pub const MAX_ITEMS: usize = 200;

    /// Validate this item against the catalog, returning its part.
    ///
    /// # Errors
    ///
    /// Returns the first [`OrderError`] found for this item.
    pub fn validate(&self, position: usize) -> Result<&'static PartDefinition, OrderError> {
        let part = find_part(&self.part_key).ok_or_else(|| OrderError::UnknownPart {
            position,
            key: self.part_key.clone(),
        })?;

        if !(1..=Self::MAX_QUANTITY).contains(&self.quantity) {
            return Err(OrderError::InvalidQuantity {
                position,
                quantity: self.quantity,
                max: Self::MAX_QUANTITY,
            });
        }

        for (key, value) in &self.measurements {
            if part.measurement(key).is_none() {
                return Err(OrderError::UnknownMeasurement {
                    position,
                    key: key.clone(),
                });
            }
            if !value.is_finite() || *value <= 0.0 || *value > Self::MAX_MEASUREMENT {
                return Err(OrderError::InvalidMeasurement {
                    position,
                    key: key.clone(),
                    max: Self::MAX_MEASUREMENT,
                });
            }
        }

        if let Some(key) = self.checkboxes.keys().find(|k| part.checkbox(k).is_none()) {
            return Err(OrderError::UnknownCheckbox {
                position,
                key: key.clone(),
            });
        }

        for (key, count) in &self.directions {
            if !direction_exists(part, key) {
                return Err(OrderError::UnknownDirection {
                    position,
                    key: key.clone(),
                });
            }
            if *count > Self::MAX_DIRECTION_COUNT {
                return Err(OrderError::TooManyCollars {
                    position,
                    key: key.clone(),
                    max: Self::MAX_DIRECTION_COUNT,
                });
            }
        }

        if self
            .notes
            .as_deref()
            .is_some_and(|n| n.chars().count() > Self::MAX_NOTES_CHARS)
        {
            return Err(OrderError::NotesTooLong {
                position,
                max: Self::MAX_NOTES_CHARS,
            });
        }

        Ok(part)
    }
}

fn direction_exists(part: &PartDefinition, key: &str) -> bool {
    part.measurements.iter().any(|m| {
        key.strip_prefix(m.key)
            .and_then(|rest| rest.strip_prefix('_'))
            .is_some_and(|dir| m.directions.iter().any(|d| d.key == dir))
    })
}

/// Validate a whole order list.
///
/// # Errors
///
/// Returns [`OrderError::Empty`] for an empty list, otherwise the first
/// item-level error.
pub fn validate_order(items: &[OrderItem]) -> Result<(), OrderError> {
    if items.is_empty() {
        return Err(OrderError::Empty);
    }
    if items.len() > OrderItem::MAX_ITEMS {
        return Err(OrderError::TooManyItems {
            count: items.len(),
            max: OrderItem::MAX_ITEMS,
        });
    }

    for (index, item) in items.iter().enumerate() {
        item.validate(index + 1)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn elbow() -> OrderItem {
        OrderItem {
            id: "1".to_owned(),
            part_key: "2-dirsek.png".to_owned(),
            quantity: 2,
            measurements: BTreeMap::from([
                ("w1".to_owned(), 50.0),
                ("h1".to_owned(), 30.0),
                ("r1".to_owned(), 15.0),
                ("a1".to_owned(), 90.0),
            ]),
            checkboxes: BTreeMap::new(),
            directions: BTreeMap::new(),
            notes: None,
        }
    }

    fn plenum() -> OrderItem {
        OrderItem {
            id: "2".to_owned(),
            part_key: "plenum-box-kutu.png".to_owned(),
            quantity: 1,
            measurements: BTreeMap::from([("w1".to_owned(), 60.0), ("h1".to_owned(), 40.0)]),
            checkboxes: BTreeMap::new(),
            directions: BTreeMap::from([("o_sag".to_owned(), 2), ("o_ust".to_owned(), 1)]),
            notes: Some("Galvaniz".to_owned()),
        }
    }

    #[test]
    fn test_valid_order() {
        assert_eq!(validate_order(&[elbow(), plenum()]), Ok(()));
    }

    #[test]
    fn test_empty_order() {
        assert_eq!(validate_order(&[]), Err(OrderError::Empty));
    }

    #[test]
    fn test_unknown_part() {
        let mut item = elbow();
        item.part_key = "3-dirsek.png".to_owned();
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::UnknownPart { position: 1, .. })
        ));
    }

    #[test]
    fn test_quantity_bounds() {
        for quantity in [0, 101] {
            let mut item = elbow();
            item.quantity = quantity;
            assert!(matches!(
                validate_order(&[plenum(), item]),
                Err(OrderError::InvalidQuantity { position: 2, .. })
            ));
        }

        let mut item = elbow();
        item.quantity = 100;
        assert!(validate_order(&[item]).is_ok());
    }

    #[test]
    fn test_unknown_measurement_key() {
        let mut item = elbow();
        item.measurements.insert("w3".to_owned(), 10.0);
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::UnknownMeasurement { key, .. }) if key == "w3"
        ));
    }

    #[test]
    fn test_measurement_values() {
        for value in [0.0, -5.0, f64::NAN, f64::INFINITY, 100_000.5] {
            let mut item = elbow();
            item.measurements.insert("w1".to_owned(), value);
            assert!(
                matches!(
                    validate_order(&[item]),
                    Err(OrderError::InvalidMeasurement { .. })
                ),
                "value {value}"
            );
        }
    }

    #[test]
    fn test_checkbox_must_belong_to_part() {
        let mut item = elbow();
        item.checkboxes.insert("sol_duz".to_owned(), true);
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::UnknownCheckbox { .. })
        ));

        let mut item = elbow();
        item.part_key = "2-reduksiyonlu-dirsek.png".to_owned();
        item.checkboxes.insert("sol_duz".to_owned(), true);
        assert!(validate_order(&[item]).is_ok());
    }

    #[test]
    fn test_directions() {
        let mut item = plenum();
        item.directions.insert("o_alt".to_owned(), 1);
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::UnknownDirection { .. })
        ));

        let mut item = plenum();
        item.directions.insert("l_sag".to_owned(), 1);
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::UnknownDirection { .. })
        ));

        let mut item = plenum();
        item.directions.insert("o_on".to_owned(), 101);
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::TooManyCollars { .. })
        ));
    }

    #[test]
    fn test_notes_length_counts_characters() {
        let mut item = elbow();
        item.notes = Some("ş".repeat(500));
        assert!(validate_order(std::slice::from_ref(&item)).is_ok());

        item.notes = Some("ş".repeat(501));
        assert!(matches!(
            validate_order(&[item]),
            Err(OrderError::NotesTooLong { .. })
        ));
    }

    #[test]
    fn test_deserialize_client_payload() {
        let json = r#"{
            "id": "1718000000000",
            "partKey": "1-duz-kanal.png",
            "name": "Düz Kanal",
            "image": "images/1-duz-kanal.png",
            "measurements": {"w1": 50, "h1": 30, "l": 120},
            "checkboxes": {},
            "quantity": 3
        }"#;
        let item: OrderItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.part_key, "1-duz-kanal.png");
        assert_eq!(item.measurements.get("l"), Some(&120.0));
        assert!(item.directions.is_empty());
        assert!(validate_order(&[item]).is_ok());
    }
}
