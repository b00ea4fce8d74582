//! Product catalog types.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::ProductId;
use super::money::{Kilograms, Money};

/// Meat category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.category", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Beef,
    Pork,
    Chicken,
    Lamb,
}

impl Category {
    pub const ALL: [Self; 4] = [Self::Beef, Self::Pork, Self::Chicken, Self::Lamb];

    /// Slug used in query strings and form values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Beef => "beef",
            Self::Pork => "pork",
            Self::Chicken => "chicken",
            Self::Lamb => "lamb",
        }
    }

    /// Label shown to shoppers.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Beef => "Vacuno",
            Self::Pork => "Cerdo",
            Self::Chicken => "Pollo",
            Self::Lamb => "Cordero",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("category", s))
    }
}

/// How a product may be bought.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.sellable_by", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum SellableBy {
    #[default]
    Unit,
    Kilogram,
    Both,
}

impl SellableBy {
    pub const ALL: [Self; 3] = [Self::Unit, Self::Kilogram, Self::Both];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unit => "unit",
            Self::Kilogram => "kilogram",
            Self::Both => "both",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Unit => "Por unidad",
            Self::Kilogram => "Por kilo",
            Self::Both => "Por unidad o por kilo",
        }
    }

    #[must_use]
    pub const fn allows_unit(self) -> bool {
        matches!(self, Self::Unit | Self::Both)
    }

    #[must_use]
    pub const fn allows_weight(self) -> bool {
        matches!(self, Self::Kilogram | Self::Both)
    }
}

impl FromStr for SellableBy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|v| v.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("sellable_by", s))
    }
}

/// The way a cut is prepared before delivery.
///
/// Stored as text: `whole`, `ground`, `sliced-<cm>`, `milanesa`,
/// `milanesa-breaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CutFormat {
    Whole,
    Ground,
    /// Sliced to the given thickness in centimetres.
    Sliced(u8),
    Milanesa,
    BreadedMilanesa,
}

impl CutFormat {
    #[must_use]
    pub fn label(self) -> String {
        match self {
            Self::Whole => "Entero".to_owned(),
            Self::Ground => "Picado".to_owned(),
            Self::Sliced(cm) => format!("En bifes de {cm} cm"),
            Self::Milanesa => "Milanesa".to_owned(),
            Self::BreadedMilanesa => "Milanesa empanada".to_owned(),
        }
    }
}

impl fmt::Display for CutFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Whole => f.write_str("whole"),
            Self::Ground => f.write_str("ground"),
            Self::Sliced(cm) => write!(f, "sliced-{cm}"),
            Self::Milanesa => f.write_str("milanesa"),
            Self::BreadedMilanesa => f.write_str("milanesa-breaded"),
        }
    }
}

impl FromStr for CutFormat {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "whole" => Ok(Self::Whole),
            "ground" => Ok(Self::Ground),
            "milanesa" => Ok(Self::Milanesa),
            "milanesa-breaded" => Ok(Self::BreadedMilanesa),
            other => other
                .strip_prefix("sliced-")
                .and_then(|cm| cm.parse::<u8>().ok())
                .filter(|cm| *cm > 0)
                .map(Self::Sliced)
                .ok_or_else(|| UnknownVariant::new("format", s)),
        }
    }
}

impl TryFrom<String> for CutFormat {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CutFormat> for String {
    fn from(format: CutFormat) -> Self {
        format.to_string()
    }
}

/// Whether the cut keeps its bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoneOption {
    WithBone,
    Boneless,
}

impl BoneOption {
    pub const ALL: [Self; 2] = [Self::WithBone, Self::Boneless];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WithBone => "with_bone",
            Self::Boneless => "boneless",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::WithBone => "Con hueso",
            Self::Boneless => "Sin hueso",
        }
    }
}

impl fmt::Display for BoneOption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BoneOption {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|b| b.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("bone", s))
    }
}

/// A value that did not match any variant of a text-backed enum.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unknown {field} value: {value:?}")]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl UnknownVariant {
    #[must_use]
    pub fn new(field: &'static str, value: &str) -> Self {
        Self {
            field,
            value: value.to_owned(),
        }
    }
}

/// How the shopper chose to buy one cart line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum SaleMode {
    /// Whole pieces at the unit price.
    Unit,
    /// A weighed portion at the per-kilogram price.
    Weight { kg: Kilograms },
}

impl SaleMode {
    /// The weight for weight-mode lines.
    #[must_use]
    pub const fn weight(self) -> Option<Kilograms> {
        match self {
            Self::Unit => None,
            Self::Weight { kg } => Some(kg),
        }
    }
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub category: Category,
    /// Price of one unit.
    pub price: Money,
    pub price_per_kilo: Option<Money>,
    /// Minimum weight accepted for weight-mode purchases.
    pub min_kg: Option<Kilograms>,
    pub sellable_by: SellableBy,
    pub formats: Vec<CutFormat>,
    pub bone_options: Vec<BoneOption>,
    pub featured: bool,
    pub in_stock: bool,
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Whether the product can be bought by weight.
    ///
    /// Requires both a weight-capable selling mode and a per-kilogram price.
    #[must_use]
    pub const fn sells_by_weight(&self) -> bool {
        self.sellable_by.allows_weight() && self.price_per_kilo.is_some()
    }

    #[must_use]
    pub const fn sells_by_unit(&self) -> bool {
        self.sellable_by.allows_unit()
    }

    /// The price used as the sort key and the "from" price on listings.
    ///
    /// Kilogram-only products list their per-kilogram price.
    #[must_use]
    pub fn display_price(&self) -> Money {
        match (self.sellable_by, self.price_per_kilo) {
            (SellableBy::Kilogram, Some(ppk)) => ppk,
            _ => self.price,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cut_format_text_form() {
        for (text, format) in [
            ("whole", CutFormat::Whole),
            ("ground", CutFormat::Ground),
            ("sliced-2", CutFormat::Sliced(2)),
            ("milanesa", CutFormat::Milanesa),
            ("milanesa-breaded", CutFormat::BreadedMilanesa),
        ] {
            assert_eq!(text.parse::<CutFormat>().unwrap(), format);
            assert_eq!(format.to_string(), text);
        }
        assert!("sliced-0".parse::<CutFormat>().is_err());
        assert!("sliced-".parse::<CutFormat>().is_err());
        assert!("diced".parse::<CutFormat>().is_err());
    }

    #[test]
    fn test_sale_mode_json_shape() {
        let mode = SaleMode::Weight {
            kg: "1.5".parse().unwrap(),
        };
        let json = serde_json::to_value(mode).unwrap();
        assert_eq!(json["mode"], "weight");
        assert_eq!(json["kg"], "1.5");
        assert_eq!(
            serde_json::to_value(SaleMode::Unit).unwrap(),
            serde_json::json!({"mode": "unit"})
        );
    }

    #[test]
    fn test_enum_slugs_parse() {
        assert_eq!("lamb".parse::<Category>(), Ok(Category::Lamb));
        assert_eq!("boneless".parse::<BoneOption>(), Ok(BoneOption::Boneless));
        assert_eq!("both".parse::<SellableBy>(), Ok(SellableBy::Both));
        assert!("fish".parse::<Category>().is_err());
    }

    #[test]
    fn test_weight_sale_requires_price_per_kilo() {
        assert!(SellableBy::Both.allows_weight());
        assert!(!SellableBy::Unit.allows_weight());
        assert!(SellableBy::Kilogram.allows_weight());
        assert!(!SellableBy::Kilogram.allows_unit());
    }
}
