use serde::{Deserialize, Serialize};
use std::fmt;

/// The closed set of waste categories the engine reports over.
///
/// Classification sources return free-form labels; [`WasteCategory::from_label`]
/// folds them into this fixed set so distributions are always comparable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum WasteCategory {
    Plastic,
    Metal,
    Glass,
    Paper,
    Organic,
    NonRecyclable,
    Hazardous,
    Unknown,
}

impl WasteCategory {
    /// All categories in canonical display order.
    pub const ALL: [WasteCategory; 8] = [
        WasteCategory::Plastic,
        WasteCategory::Metal,
        WasteCategory::Glass,
        WasteCategory::Paper,
        WasteCategory::Organic,
        WasteCategory::NonRecyclable,
        WasteCategory::Hazardous,
        WasteCategory::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WasteCategory::Plastic => "plastic",
            WasteCategory::Metal => "metal",
            WasteCategory::Glass => "glass",
            WasteCategory::Paper => "paper",
            WasteCategory::Organic => "organic",
            WasteCategory::NonRecyclable => "non-recyclable",
            WasteCategory::Hazardous => "hazardous",
            WasteCategory::Unknown => "unknown",
        }
    }

    /// Whether items in this category are commonly curbside-recyclable.
    pub fn recyclable(&self) -> bool {
        matches!(
            self,
            WasteCategory::Plastic
                | WasteCategory::Metal
                | WasteCategory::Glass
                | WasteCategory::Paper
        )
    }

    /// Map a raw model label onto the closed category set.
    ///
    /// Case-insensitive keyword matching; labels matching nothing fall into
    /// `Unknown`. Hazardous keywords are checked first so "battery pack"
    /// never lands in packaging-related categories.
    pub fn from_label(label: &str) -> WasteCategory {
        let l = label.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| l.contains(w));

        if has(&["battery", "hazard", "chemical", "electronic", "e-waste", "paint"]) {
            WasteCategory::Hazardous
        } else if has(&["plastic", "bottle", "pet", "polymer", "wrapper", "bag"]) {
            WasteCategory::Plastic
        } else if has(&["metal", "aluminium", "aluminum", "tin", "steel", "can"]) {
            WasteCategory::Metal
        } else if has(&["glass", "jar"]) {
            WasteCategory::Glass
        } else if has(&["paper", "cardboard", "carton", "newspaper", "magazine"]) {
            WasteCategory::Paper
        } else if has(&["organic", "food", "compost", "biological", "fruit", "vegetable"]) {
            WasteCategory::Organic
        } else if has(&["trash", "garbage", "non-recyclable", "styrofoam", "diaper"]) {
            WasteCategory::NonRecyclable
        } else {
            WasteCategory::Unknown
        }
    }
}

impl fmt::Display for WasteCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_keyword_mapping() {
        assert_eq!(WasteCategory::from_label("Plastic bottle"), WasteCategory::Plastic);
        assert_eq!(WasteCategory::from_label("aluminium can"), WasteCategory::Metal);
        assert_eq!(WasteCategory::from_label("GLASS jar"), WasteCategory::Glass);
        assert_eq!(WasteCategory::from_label("cardboard box"), WasteCategory::Paper);
        assert_eq!(WasteCategory::from_label("food scraps"), WasteCategory::Organic);
        assert_eq!(WasteCategory::from_label("styrofoam cup"), WasteCategory::NonRecyclable);
    }

    #[test]
    fn test_hazardous_wins_over_packaging() {
        assert_eq!(WasteCategory::from_label("battery pack"), WasteCategory::Hazardous);
        assert_eq!(
            WasteCategory::from_label("paint can"),
            WasteCategory::Hazardous
        );
    }

    #[test]
    fn test_unmapped_label_is_unknown() {
        assert_eq!(WasteCategory::from_label("zxqw"), WasteCategory::Unknown);
        assert_eq!(WasteCategory::from_label(""), WasteCategory::Unknown);
    }

    #[test]
    fn test_recyclable_flags() {
        assert!(WasteCategory::Glass.recyclable());
        assert!(!WasteCategory::Hazardous.recyclable());
        assert!(!WasteCategory::Unknown.recyclable());
    }

    #[test]
    fn test_display_matches_serde() {
        let json = serde_json::to_string(&WasteCategory::NonRecyclable).unwrap();
        assert_eq!(json, "\"non-recyclable\"");
        assert_eq!(WasteCategory::NonRecyclable.to_string(), "non-recyclable");
    }
}
