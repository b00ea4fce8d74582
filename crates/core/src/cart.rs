//! The shopper's cart.
//!
//! A [`Cart`] is a list of line items. Each line is identified by the product
//! plus the shopper's choices (cut format, bone option, sale mode and weight):
//! adding the same combination again bumps the quantity of the existing line
//! instead of creating a duplicate.
//!
//! Quantities are always at least one. Setting a quantity to zero or below
//! removes the line.
//!
//! The cart is persisted between requests as a [`PersistedCart`] envelope.
//! Loading validates the envelope; anything unexpected is reported as a
//! [`CartLoadError`] so the caller can start over with an empty cart.

use core::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::pricing::{OrderTotals, PricingPolicy};
use crate::types::{BoneOption, CutFormat, Kilograms, Money, Product, ProductId, SaleMode};

/// Identifier of a cart line, stable across requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineId(Uuid);

impl LineId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LineId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LineId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl std::str::FromStr for LineId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// One line in the cart, with prices snapshotted when it was added.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: LineId,
    pub product_id: ProductId,
    pub name: String,
    pub image_url: Option<String>,
    pub format: Option<CutFormat>,
    pub bone: Option<BoneOption>,
    pub sale: SaleMode,
    pub quantity: u32,
    pub unit_price: Money,
    pub price_per_kilo: Option<Money>,
    pub vacuum_packed: bool,
}

impl CartItem {
    fn same_choice(&self, product_id: ProductId, selection: &Selection) -> bool {
        self.product_id == product_id
            && self.format == selection.format
            && self.bone == selection.bone
            && self.sale == selection.sale
    }
}

/// The shopper's choices when adding a product.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub sale: SaleMode,
    pub format: Option<CutFormat>,
    pub bone: Option<BoneOption>,
}

impl Selection {
    /// Buy one whole piece with no preparation choices.
    #[must_use]
    pub const fn unit() -> Self {
        Self {
            sale: SaleMode::Unit,
            format: None,
            bone: None,
        }
    }

    /// Buy a weighed portion with no preparation choices.
    #[must_use]
    pub const fn weight(kg: Kilograms) -> Self {
        Self {
            sale: SaleMode::Weight { kg },
            format: None,
            bone: None,
        }
    }

    #[must_use]
    pub const fn with_format(mut self, format: CutFormat) -> Self {
        self.format = Some(format);
        self
    }

    #[must_use]
    pub const fn with_bone(mut self, bone: BoneOption) -> Self {
        self.bone = Some(bone);
        self
    }
}

/// Why a cart mutation was rejected.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartError {
    #[error("{0} is out of stock")]
    OutOfStock(String),
    #[error("{0} is not sold by the unit")]
    UnitSaleNotAllowed(String),
    #[error("{0} is not sold by weight")]
    WeightSaleNotAllowed(String),
    #[error("format {format} is not offered for {product}")]
    FormatNotOffered { product: String, format: CutFormat },
    #[error("bone option {bone} is not offered for {product}")]
    BoneNotOffered { product: String, bone: BoneOption },
    #[error("minimum weight is {required}, requested {requested}")]
    BelowMinimumWeight {
        required: Kilograms,
        requested: Kilograms,
    },
    #[error("cart line not found")]
    LineNotFound,
}

impl CartError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::OutOfStock(_) => "out_of_stock",
            Self::UnitSaleNotAllowed(_) | Self::WeightSaleNotAllowed(_) => "sale_mode",
            Self::FormatNotOffered { .. } => "format",
            Self::BoneNotOffered { .. } => "bone",
            Self::BelowMinimumWeight { .. } => "below_minimum",
            Self::LineNotFound => "line_not_found",
        }
    }
}

/// Check a requested weight against the product's minimum.
///
/// # Errors
///
/// Returns [`CartError::BelowMinimumWeight`] when the product has a minimum
/// and `requested` is below it.
pub fn check_minimum(product: &Product, requested: Kilograms) -> Result<(), CartError> {
    match product.min_kg {
        Some(required) if requested < required => Err(CartError::BelowMinimumWeight {
            required,
            requested,
        }),
        _ => Ok(()),
    }
}

/// Version written into every persisted cart.
pub const CART_VERSION: u32 = 1;

/// Serialized form of a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedCart {
    pub version: u32,
    pub items: Vec<CartItem>,
}

/// Why a persisted cart could not be restored.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CartLoadError {
    #[error("unsupported cart version {0}")]
    UnsupportedVersion(u32),
    #[error("cart line {0} has zero quantity")]
    ZeroQuantity(LineId),
    #[error("cart line {0} is sold by weight without a per-kilogram price")]
    MissingPricePerKilo(LineId),
    #[error("cart line {0} appears twice")]
    DuplicateLine(LineId),
}

/// The shopper's cart.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Restore a cart from its persisted envelope.
    ///
    /// # Errors
    ///
    /// Returns [`CartLoadError`] if the version is unknown or any line breaks
    /// the cart's invariants.
    pub fn restore(persisted: PersistedCart) -> Result<Self, CartLoadError> {
        if persisted.version != CART_VERSION {
            return Err(CartLoadError::UnsupportedVersion(persisted.version));
        }
        let mut seen = std::collections::HashSet::new();
        for item in &persisted.items {
            if item.quantity == 0 {
                return Err(CartLoadError::ZeroQuantity(item.id));
            }
            if item.sale.weight().is_some() && item.price_per_kilo.is_none() {
                return Err(CartLoadError::MissingPricePerKilo(item.id));
            }
            if !seen.insert(item.id) {
                return Err(CartLoadError::DuplicateLine(item.id));
            }
        }
        Ok(Self {
            items: persisted.items,
        })
    }

    /// Snapshot the cart for persistence.
    #[must_use]
    pub fn persist(&self) -> PersistedCart {
        PersistedCart {
            version: CART_VERSION,
            items: self.items.clone(),
        }
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn get(&self, id: LineId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.id == id)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add one of `product` with the given choices.
    ///
    /// Bumps the quantity of an identical line if there is one.
    ///
    /// # Errors
    ///
    /// Rejects out-of-stock products, sale modes, formats and bone options
    /// the product does not offer, and weights below the product minimum.
    pub fn add_item(
        &mut self,
        product: &Product,
        selection: Selection,
    ) -> Result<LineId, CartError> {
        if !product.in_stock {
            return Err(CartError::OutOfStock(product.name.clone()));
        }
        match selection.sale {
            SaleMode::Unit if !product.sells_by_unit() => {
                return Err(CartError::UnitSaleNotAllowed(product.name.clone()));
            }
            SaleMode::Weight { .. } if !product.sells_by_weight() => {
                return Err(CartError::WeightSaleNotAllowed(product.name.clone()));
            }
            SaleMode::Weight { kg } => check_minimum(product, kg)?,
            SaleMode::Unit => {}
        }
        if let Some(format) = selection.format
            && !product.formats.contains(&format)
        {
            return Err(CartError::FormatNotOffered {
                product: product.name.clone(),
                format,
            });
        }
        if let Some(bone) = selection.bone
            && !product.bone_options.contains(&bone)
        {
            return Err(CartError::BoneNotOffered {
                product: product.name.clone(),
                bone,
            });
        }

        if let Some(existing) = self
            .items
            .iter_mut()
            .find(|item| item.same_choice(product.id, &selection))
        {
            existing.quantity = existing.quantity.saturating_add(1);
            return Ok(existing.id);
        }

        let id = LineId::new();
        self.items.push(CartItem {
            id,
            product_id: product.id,
            name: product.name.clone(),
            image_url: product.image_url.clone(),
            format: selection.format,
            bone: selection.bone,
            sale: selection.sale,
            quantity: 1,
            unit_price: product.price,
            price_per_kilo: product.price_per_kilo,
            vacuum_packed: false,
        });
        Ok(id)
    }

    /// Set the quantity of a line; zero or less removes it.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] for an unknown line.
    pub fn update_quantity(&mut self, id: LineId, quantity: i64) -> Result<(), CartError> {
        let Some(position) = self.items.iter().position(|item| item.id == id) else {
            return Err(CartError::LineNotFound);
        };
        if quantity <= 0 {
            self.items.remove(position);
        } else if let Some(item) = self.items.get_mut(position) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        Ok(())
    }

    /// Remove a line. Returns whether it existed.
    pub fn remove_item(&mut self, id: LineId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }

    /// Flip the vacuum-packing add-on of a line, returning the new value.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::LineNotFound`] for an unknown line.
    pub fn toggle_vacuum_packing(&mut self, id: LineId) -> Result<bool, CartError> {
        let item = self
            .items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(CartError::LineNotFound)?;
        item.vacuum_packed = !item.vacuum_packed;
        Ok(item.vacuum_packed)
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of pieces or portions across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.items.iter().map(|item| u64::from(item.quantity)).sum()
    }

    #[must_use]
    pub fn subtotal(&self, policy: &PricingPolicy) -> Money {
        self.items.iter().map(|item| policy.line_price(item)).sum()
    }

    #[must_use]
    pub fn totals(&self, policy: &PricingPolicy) -> OrderTotals {
        policy.totals(self.subtotal(policy))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::test_support::product;
    use crate::types::SellableBy;

    fn kg(s: &str) -> Kilograms {
        s.parse().unwrap()
    }

    fn asado() -> Product {
        let mut p = product(7, "Asado de Tira", 9000);
        p.sellable_by = SellableBy::Both;
        p.price_per_kilo = Some(Money::new(8500));
        p.min_kg = Some(kg("1"));
        p.formats = vec![CutFormat::Whole, CutFormat::Sliced(2)];
        p.bone_options = vec![BoneOption::WithBone, BoneOption::Boneless];
        p
    }

    fn assert_invariants(cart: &Cart) {
        let sum: u64 = cart.items().iter().map(|i| u64::from(i.quantity)).sum();
        assert_eq!(cart.item_count(), sum);
        assert!(cart.items().iter().all(|i| i.quantity > 0));
    }

    #[test]
    fn test_same_choice_merges_into_one_line() {
        let mut cart = Cart::new();
        let selection = Selection::unit()
            .with_format(CutFormat::Whole)
            .with_bone(BoneOption::WithBone);
        let first = cart.add_item(&asado(), selection).unwrap();
        let second = cart.add_item(&asado(), selection).unwrap();

        assert_eq!(first, second);
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_different_format_creates_new_line() {
        let mut cart = Cart::new();
        cart.add_item(&asado(), Selection::unit().with_format(CutFormat::Whole))
            .unwrap();
        cart.add_item(&asado(), Selection::unit().with_format(CutFormat::Sliced(2)))
            .unwrap();
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.item_count(), 2);
    }

    #[test]
    fn test_different_weight_creates_new_line() {
        let mut cart = Cart::new();
        cart.add_item(&asado(), Selection::weight(kg("1"))).unwrap();
        cart.add_item(&asado(), Selection::weight(kg("1.5"))).unwrap();
        cart.add_item(&asado(), Selection::weight(kg("1.0"))).unwrap();
        assert_eq!(cart.items().len(), 2);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_below_minimum_weight_is_rejected() {
        let mut cart = Cart::new();
        let err = cart
            .add_item(&asado(), Selection::weight(kg("0.5")))
            .unwrap_err();
        assert_eq!(
            err,
            CartError::BelowMinimumWeight {
                required: kg("1"),
                requested: kg("0.5"),
            }
        );
        assert!(cart.is_empty());

        let id = cart.add_item(&asado(), Selection::weight(kg("1.0"))).unwrap();
        let policy = PricingPolicy::default();
        assert_eq!(policy.line_price(cart.get(id).unwrap()), Money::new(8500));
    }

    #[test]
    fn test_rejects_options_not_offered() {
        let mut cart = Cart::new();
        let err = cart
            .add_item(&asado(), Selection::unit().with_format(CutFormat::Ground))
            .unwrap_err();
        assert_eq!(err.code(), "format");

        let mut chicken = product(3, "Pechuga", 5000);
        chicken.bone_options = vec![BoneOption::Boneless];
        let err = cart
            .add_item(&chicken, Selection::unit().with_bone(BoneOption::WithBone))
            .unwrap_err();
        assert_eq!(err.code(), "bone");

        let err = cart.add_item(&chicken, Selection::weight(kg("1"))).unwrap_err();
        assert_eq!(err, CartError::WeightSaleNotAllowed("Pechuga".into()));

        chicken.in_stock = false;
        assert_eq!(
            cart.add_item(&chicken, Selection::unit()).unwrap_err().code(),
            "out_of_stock"
        );
        assert!(cart.is_empty());
    }

    #[test]
    fn test_update_quantity_to_zero_removes() {
        let mut cart = Cart::new();
        let id = cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();
        cart.update_quantity(id, 5).unwrap();
        assert_eq!(cart.item_count(), 5);
        cart.update_quantity(id, 0).unwrap();
        assert!(cart.is_empty());

        let id = cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();
        cart.update_quantity(id, -3).unwrap();
        assert!(cart.is_empty());
        assert_eq!(cart.update_quantity(id, 1), Err(CartError::LineNotFound));
    }

    #[test]
    fn test_item_count_tracks_any_mutation_sequence() {
        let mut cart = Cart::new();
        let products = [
            product(1, "Vacío", 9000),
            product(2, "Matambre", 7000),
            product(3, "Chorizo", 1200),
        ];
        let mut ids = Vec::new();
        for step in 0_i64..60 {
            let p = &products[usize::try_from(step).unwrap() % products.len()];
            match step % 5 {
                0 | 1 => ids.push(cart.add_item(p, Selection::unit()).unwrap()),
                2 => {
                    if let Some(id) = ids.first() {
                        let _ = cart.update_quantity(*id, (step % 7) - 2);
                    }
                }
                3 => {
                    if let Some(id) = ids.pop() {
                        cart.remove_item(id);
                    }
                }
                _ => {
                    if let Some(id) = ids.last() {
                        let _ = cart.update_quantity(*id, step);
                    }
                }
            }
            assert_invariants(&cart);
        }
    }

    #[test]
    fn test_toggle_vacuum_flips_flag() {
        let mut cart = Cart::new();
        let id = cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();
        assert_eq!(cart.toggle_vacuum_packing(id), Ok(true));
        assert_eq!(cart.toggle_vacuum_packing(id), Ok(false));
        assert!(cart.remove_item(id));
        assert!(!cart.remove_item(id));
        assert_eq!(cart.toggle_vacuum_packing(id), Err(CartError::LineNotFound));
    }

    #[test]
    fn test_clear_empties_persisted_form() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();
        cart.clear();
        let persisted = cart.persist();
        assert!(persisted.items.is_empty());
        let reloaded = Cart::restore(persisted).unwrap();
        assert!(reloaded.is_empty());
        assert_eq!(reloaded.item_count(), 0);
    }

    #[test]
    fn test_restore_round_trips_through_json() {
        let mut cart = Cart::new();
        cart.add_item(&asado(), Selection::weight(kg("1.25")).with_bone(BoneOption::Boneless))
            .unwrap();
        let json = serde_json::to_string(&cart.persist()).unwrap();
        let restored = Cart::restore(serde_json::from_str(&json).unwrap()).unwrap();
        assert_eq!(restored, cart);
    }

    #[test]
    fn test_restore_rejects_corrupt_envelopes() {
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();

        let mut wrong_version = cart.persist();
        wrong_version.version = 2;
        assert_eq!(
            Cart::restore(wrong_version),
            Err(CartLoadError::UnsupportedVersion(2))
        );

        let mut zero = cart.persist();
        zero.items[0].quantity = 0;
        assert!(matches!(
            Cart::restore(zero),
            Err(CartLoadError::ZeroQuantity(_))
        ));

        let mut duplicated = cart.persist();
        duplicated.items.push(duplicated.items[0].clone());
        assert!(matches!(
            Cart::restore(duplicated),
            Err(CartLoadError::DuplicateLine(_))
        ));

        let mut no_ppk = cart.persist();
        no_ppk.items[0].sale = SaleMode::Weight { kg: kg("1") };
        assert!(matches!(
            Cart::restore(no_ppk),
            Err(CartLoadError::MissingPricePerKilo(_))
        ));
    }

    #[test]
    fn test_check_minimum_verdict() {
        assert!(check_minimum(&asado(), kg("1")).is_ok());
        assert!(check_minimum(&asado(), kg("0.999")).is_err());
        assert!(check_minimum(&product(1, "Vacío", 9000), kg("0.1")).is_ok());
    }
}
