//! Pricing rules.
//!
//! A line sold by the unit costs `unit_price × quantity`. A line sold by
//! weight costs the per-kilogram price times the weight, rounded half away
//! from zero to whole pesos, times the quantity. Vacuum packing adds a flat
//! surcharge per piece. Orders pay a fixed delivery fee unless the subtotal
//! reaches the free-shipping threshold.

use serde::{Deserialize, Serialize};

use crate::cart::CartItem;
use crate::types::{Money, SaleMode};

/// Invalid pricing configuration.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricingError {
    #[error("{field} cannot be negative (got {value})")]
    Negative { field: &'static str, value: i64 },
}

/// Shop-wide pricing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PricingPolicy {
    vacuum_surcharge: Money,
    free_shipping_threshold: Money,
    delivery_fee: Money,
}

impl Default for PricingPolicy {
    fn default() -> Self {
        Self {
            vacuum_surcharge: Money::new(500),
            free_shipping_threshold: Money::new(15_000),
            delivery_fee: Money::new(1_500),
        }
    }
}

impl PricingPolicy {
    /// Build a policy, rejecting negative amounts.
    ///
    /// # Errors
    ///
    /// Returns [`PricingError::Negative`] naming the first negative amount.
    pub fn new(
        vacuum_surcharge: Money,
        free_shipping_threshold: Money,
        delivery_fee: Money,
    ) -> Result<Self, PricingError> {
        for (field, value) in [
            ("vacuum surcharge", vacuum_surcharge),
            ("free shipping threshold", free_shipping_threshold),
            ("delivery fee", delivery_fee),
        ] {
            if value.amount() < 0 {
                return Err(PricingError::Negative {
                    field,
                    value: value.amount(),
                });
            }
        }
        Ok(Self {
            vacuum_surcharge,
            free_shipping_threshold,
            delivery_fee,
        })
    }

    #[must_use]
    pub const fn vacuum_surcharge(&self) -> Money {
        self.vacuum_surcharge
    }

    #[must_use]
    pub const fn free_shipping_threshold(&self) -> Money {
        self.free_shipping_threshold
    }

    #[must_use]
    pub const fn delivery_fee(&self) -> Money {
        self.delivery_fee
    }

    /// Price of one piece or one weighed portion, before add-ons.
    #[must_use]
    pub fn unit_amount(&self, item: &CartItem) -> Money {
        match item.sale {
            SaleMode::Unit => item.unit_price,
            SaleMode::Weight { kg } => item
                .price_per_kilo
                .map_or(Money::ZERO, |ppk| ppk.per_kilo_times(kg)),
        }
    }

    /// Total for one cart line including vacuum packing.
    #[must_use]
    pub fn line_price(&self, item: &CartItem) -> Money {
        let mut price = self.unit_amount(item).times(item.quantity);
        if item.vacuum_packed {
            price += self.vacuum_surcharge.times(item.quantity);
        }
        price
    }

    /// Delivery fee owed for a given subtotal. Nothing to deliver costs nothing.
    #[must_use]
    pub fn delivery_fee_for(&self, subtotal: Money) -> Money {
        if subtotal.is_zero() || subtotal >= self.free_shipping_threshold {
            Money::ZERO
        } else {
            self.delivery_fee
        }
    }

    /// How much more the shopper must add to get free shipping.
    #[must_use]
    pub fn missing_for_free_shipping(&self, subtotal: Money) -> Option<Money> {
        (subtotal < self.free_shipping_threshold)
            .then(|| Money::new(self.free_shipping_threshold.amount() - subtotal.amount()))
    }

    #[must_use]
    pub fn totals(&self, subtotal: Money) -> OrderTotals {
        let delivery_fee = self.delivery_fee_for(subtotal);
        OrderTotals {
            subtotal,
            delivery_fee,
            total: subtotal + delivery_fee,
        }
    }
}

/// Subtotal, delivery fee and grand total of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTotals {
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{Cart, Selection};
    use crate::test_support::product;

    #[test]
    fn test_free_shipping_threshold_is_inclusive() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.delivery_fee_for(Money::new(14_999)), Money::new(1_500));
        assert_eq!(policy.delivery_fee_for(Money::new(15_000)), Money::ZERO);
        assert_eq!(
            policy.missing_for_free_shipping(Money::new(14_000)),
            Some(Money::new(1_000))
        );
        assert_eq!(policy.missing_for_free_shipping(Money::new(15_000)), None);
    }

    #[test]
    fn test_empty_cart_owes_no_delivery_fee() {
        let policy = PricingPolicy::default();
        assert_eq!(policy.delivery_fee_for(Money::ZERO), Money::ZERO);

        let totals = Cart::new().totals(&policy);
        assert_eq!(totals.subtotal, Money::ZERO);
        assert_eq!(totals.delivery_fee, Money::ZERO);
        assert_eq!(totals.total, Money::ZERO);
    }

    #[test]
    fn test_two_item_scenario() {
        let policy = PricingPolicy::default();
        let mut cart = Cart::new();
        let a = cart.add_item(&product(1, "A", 1000), Selection::unit()).unwrap();
        cart.update_quantity(a, 2).unwrap();
        let b = cart.add_item(&product(2, "B", 2000), Selection::unit()).unwrap();
        cart.toggle_vacuum_packing(b).unwrap();

        let totals = cart.totals(&policy);
        assert_eq!(totals.subtotal, Money::new(4_500));
        assert_eq!(totals.delivery_fee, Money::new(1_500));
        assert_eq!(totals.total, Money::new(6_000));
    }

    #[test]
    fn test_vacuum_adds_surcharge_per_unit() {
        let policy = PricingPolicy::default();
        let mut cart = Cart::new();
        let id = cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();
        cart.update_quantity(id, 3).unwrap();

        let before = cart.subtotal(&policy);
        cart.toggle_vacuum_packing(id).unwrap();
        let after = cart.subtotal(&policy);
        assert_eq!(after.amount() - before.amount(), 3 * 500);
    }

    #[test]
    fn test_total_is_monotone_in_quantity() {
        let policy = PricingPolicy::default();
        let mut cart = Cart::new();
        let id = cart.add_item(&product(1, "Chorizo", 1200), Selection::unit()).unwrap();
        cart.toggle_vacuum_packing(id).unwrap();

        let mut previous = cart.totals(&policy).total;
        for qty in 2..30 {
            cart.update_quantity(id, qty).unwrap();
            let total = cart.totals(&policy).total;
            assert!(total >= previous, "total dropped at quantity {qty}");
            previous = total;
        }
    }

    #[test]
    fn test_weight_line_rounds_then_multiplies() {
        let policy = PricingPolicy::default();
        let mut p = product(5, "Bondiola", 0);
        p.sellable_by = crate::types::SellableBy::Kilogram;
        p.price_per_kilo = Some(Money::new(7_001));

        let mut cart = Cart::new();
        let id = cart
            .add_item(&p, Selection::weight("0.5".parse().unwrap()))
            .unwrap();
        cart.update_quantity(id, 2).unwrap();
        // 7001 × 0.5 = 3500.5 → 3501 per portion
        assert_eq!(policy.line_price(cart.get(id).unwrap()), Money::new(7_002));
    }

    #[test]
    fn test_policy_rejects_negative_amounts() {
        let err =
            PricingPolicy::new(Money::new(500), Money::new(-1), Money::new(1500)).unwrap_err();
        assert_eq!(
            err,
            PricingError::Negative {
                field: "free shipping threshold",
                value: -1
            }
        );
    }
}
