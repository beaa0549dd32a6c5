//! The duct parts catalog.
//!
//! Every part the order form offers is described here once: its display
//! name, the image the client shows, the measurements the customer fills in
//! and the optional flat-side checkboxes. Order validation and order sheets
//! both resolve items against this table, so the server never trusts a part
//! name or label sent by the client.

mod order;
mod sheet;

use serde::Serialize;

pub use order::{OrderError, OrderItem, validate_order};
pub use sheet::{Customer, OrderSheet, SheetItem, SheetLine, SheetOption};

/// A direction in which a collar (manşon) can leave a box, with a count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Direction {
    pub key: &'static str,
    pub label: &'static str,
}

/// One dimension of a part, in centimetres unless it is an angle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Measurement {
    pub key: &'static str,
    pub label: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<u32>,
    /// When non-empty the customer enters a count per direction instead of
    /// a single value; the order item stores them as `<key>_<direction>`.
    #[serde(skip_serializing_if = "no_directions")]
    pub directions: &'static [Direction],
}

/// A yes/no option such as "Sol Düz".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Checkbox {
    pub key: &'static str,
    pub label: &'static str,
}

/// A configurable duct part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PartDefinition {
    pub key: &'static str,
    pub name: &'static str,
    pub image: &'static str,
    pub measurements: &'static [Measurement],
    pub checkboxes: &'static [Checkbox],
}

impl PartDefinition {
    /// Look up a measurement of this part by key.
    #[must_use]
    pub fn measurement(&self, key: &str) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.key == key)
    }

    /// Look up a checkbox of this part by key.
    #[must_use]
    pub fn checkbox(&self, key: &str) -> Option<&Checkbox> {
        self.checkboxes.iter().find(|c| c.key == key)
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
const fn no_directions(directions: &&'static [Direction]) -> bool {
    directions.is_empty()
}

const fn m(key: &'static str, label: &'static str) -> Measurement {
    Measurement {
        key,
        label,
        default: None,
        directions: &[],
    }
}

const fn md(key: &'static str, label: &'static str, default: u32) -> Measurement {
    Measurement {
        key,
        label,
        default: Some(default),
        directions: &[],
    }
}

const fn cb(key: &'static str, label: &'static str) -> Checkbox {
    Checkbox { key, label }
}

const BOX_DIRECTIONS: &[Direction] = &[
    Direction { key: "sag", label: "Sağ" },
    Direction { key: "sol", label: "Sol" },
    Direction { key: "on", label: "Ön" },
    Direction { key: "arka", label: "Arka" },
    Direction { key: "ust", label: "Üst" },
];

static PARTS: &[PartDefinition] = &[
    PartDefinition {
        key: "1-duz-kanal.png",
        name: "Düz Kanal",
        image: "images/1-duz-kanal.png",
        measurements: &[m("w1", "W1"), m("h1", "H1"), md("l", "L", 120)],
        checkboxes: &[],
    },
    PartDefinition {
        key: "2-dirsek.png",
        name: "Dirsek",
        image: "images/2-dirsek.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            md("r1", "R1", 15),
            md("a1", "A (Açı)", 90),
        ],
        checkboxes: &[],
    },
    PartDefinition {
        key: "2-reduksiyonlu-dirsek.png",
        name: "Redüksiyonlu Dirsek",
        image: "images/2-reduksiyonlu-dirsek.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            m("w2", "W2"),
            m("h2", "H2"),
            md("r1", "R1", 15),
            md("a1", "A (Açı)", 90),
        ],
        checkboxes: &[cb("sol_duz", "Sol Düz"), cb("sag_duz", "Sağ Düz")],
    },
    PartDefinition {
        key: "3-reduksiyon.png",
        name: "Redüksiyon",
        image: "images/3-reduksiyon.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            md("l", "L", 40),
            m("w2", "W2"),
            m("h2", "H2"),
        ],
        checkboxes: &[
            cb("sol_duz", "Sol Düz"),
            cb("sag_duz", "Sağ Düz"),
            cb("alt_duz", "Alt Düz"),
            cb("ust_duz", "Üst Düz"),
        ],
    },
    PartDefinition {
        key: "4-pantolon-tip1.png",
        name: "Pantolon Tip 1",
        image: "images/4-pantolon-tip1.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            md("l", "L", 40),
            m("h2", "H2"),
            m("w2", "W2"),
            m("w3", "W3"),
            m("h3", "H3"),
            md("r1", "R1", 15),
            md("a1", "A (Açı)", 90),
        ],
        checkboxes: &[cb("alt_duz", "Alt Düz"), cb("ust_duz", "Üst Düz")],
    },
    PartDefinition {
        key: "5-saplama-yaka.png",
        name: "Saplama (Yaka)",
        image: "images/5-saplama-yaka.png",
        measurements: &[m("w1", "W1"), m("h1", "H1"), md("l", "L", 10), m("w2", "W2")],
        checkboxes: &[],
    },
    PartDefinition {
        key: "kanal-kapagi-kor-tapa.png",
        name: "Kanal Kapağı (Kör Tapa)",
        image: "images/kanal-kapagi-kor-tapa.png",
        measurements: &[m("w1", "W1"), m("h1", "H1")],
        checkboxes: &[],
    },
    PartDefinition {
        key: "reduksiyon-dikdortgenden-yuvarlaga.png",
        name: "Redüksiyon (Dikdörtgenden Yuvarlağa)",
        image: "images/reduksiyon-dikdortgenden-yuvarlaga.png",
        measurements: &[m("w1", "W1"), m("h1", "H1"), md("l", "L", 40), m("o", "Ø")],
        checkboxes: &[],
    },
    PartDefinition {
        key: "s-parcasi.png",
        name: "S Parçası",
        image: "images/s-parcasi.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            md("l", "L", 100),
            m("w2", "W2"),
            m("h2", "H2"),
            m("es", "ES"),
        ],
        checkboxes: &[],
    },
    PartDefinition {
        key: "y-parcasi.png",
        name: "Y Parçası",
        image: "images/y-parcasi.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            m("h2", "H2"),
            m("w2", "W2"),
            m("w3", "W3"),
            m("h3", "H3"),
            md("r1", "R1", 15),
            md("a1", "A1 (Açı)", 90),
            md("r2", "R2", 15),
            md("a2", "A2 (Açı)", 90),
        ],
        checkboxes: &[
            cb("alt1_duz", "Alt-1 Düz"),
            cb("ust1_duz", "Üst-1 Düz"),
            cb("ortali1", "Ortali-1"),
            cb("alt2_duz", "Alt-2 Düz"),
            cb("ust2_duz", "Üst-2 Düz"),
            cb("ortali2", "Ortali-2"),
        ],
    },
    PartDefinition {
        key: "lineer-menfez-kutusu.png",
        name: "Lineer Menfez Kutusu",
        image: "images/lineer-menfez-kutusu.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            md("l", "L", 40),
            Measurement {
                key: "o",
                label: "Ø",
                default: None,
                directions: BOX_DIRECTIONS,
            },
        ],
        checkboxes: &[],
    },
    PartDefinition {
        key: "fancoil-vrv-ic-unite-kutusu.png",
        name: "Fancoil - VRV İç Ünite Kutusu",
        image: "images/fancoil-vrv-ic-unite-kutusu.png",
        measurements: &[m("w1", "W1"), m("h1", "H1"), md("l", "L", 40), m("o", "Ø")],
        checkboxes: &[],
    },
    PartDefinition {
        key: "plenum-box-kutu.png",
        name: "Plenum Box (Kutu)",
        image: "images/plenum-box-kutu.png",
        measurements: &[
            m("w1", "W1"),
            m("h1", "H1"),
            md("l", "L", 40),
            Measurement {
                key: "o",
                label: "Ø MANŞON YÖNÜ VE ADETİ",
                default: None,
                directions: BOX_DIRECTIONS,
            },
        ],
        checkboxes: &[],
    },
    PartDefinition {
        key: "tel-kafes.png",
        name: "Tel Kafes",
        image: "images/tel-kafes.png",
        measurements: &[m("w1", "W1"), m("h1", "H1")],
        checkboxes: &[],
    },
    PartDefinition {
        key: "manson.png",
        name: "Manşon",
        image: "images/manson.png",
        measurements: &[md("l", "L", 20), m("o", "Ø")],
        checkboxes: &[],
    },
];

/// All parts, in the order the form lists them.
#[must_use]
pub fn catalog() -> &'static [PartDefinition] {
    PARTS
}

/// Find a part by its key (e.g. `"2-dirsek.png"`).
#[must_use]
pub fn find_part(key: &str) -> Option<&'static PartDefinition> {
    PARTS.iter().find(|p| p.key == key)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_catalog_keys_are_unique() {
        let keys: HashSet<_> = catalog().iter().map(|p| p.key).collect();
        assert_eq!(keys.len(), catalog().len());
        assert_eq!(catalog().len(), 15);
    }

    #[test]
    fn test_measurement_keys_are_unique_per_part() {
        for part in catalog() {
            let keys: HashSet<_> = part.measurements.iter().map(|m| m.key).collect();
            assert_eq!(keys.len(), part.measurements.len(), "part {}", part.key);
        }
    }

    #[test]
    fn test_find_part() {
        let part = find_part("2-dirsek.png").unwrap();
        assert_eq!(part.name, "Dirsek");
        assert_eq!(part.measurement("a1").unwrap().default, Some(90));
        assert!(find_part("3-dirsek.png").is_none());
    }

    #[test]
    fn test_box_parts_have_directions() {
        let part = find_part("plenum-box-kutu.png").unwrap();
        let collar = part.measurement("o").unwrap();
        assert_eq!(collar.directions.len(), 5);
        assert_eq!(collar.directions[2].label, "Ön");
    }

    #[test]
    fn test_serialize_omits_empty_fields() {
        let json = serde_json::to_value(find_part("tel-kafes.png").unwrap()).unwrap();
        assert_eq!(json["measurements"][0], serde_json::json!({"key": "w1", "label": "W1"}));
        assert_eq!(json["checkboxes"], serde_json::json!([]));
    }
}
