//! Orders and the order status machine.

use core::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::id::{OrderId, ProductId, ProfileId};
use super::money::{Kilograms, Money};
use super::product::{BoneOption, CutFormat, UnknownVariant};
use super::profile::UserProfile;
use crate::cart::Cart;
use crate::pricing::PricingPolicy;

/// Order lifecycle status.
///
/// `pending → confirmed → preparing → ready → delivered`, with `cancelled`
/// reachable from every non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "shop.order_status", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    Delivered,
    Cancelled,
}

/// Rejected status change.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("cannot move an order from {from} to {to}")]
pub struct StatusTransitionError {
    pub from: OrderStatus,
    pub to: OrderStatus,
}

impl OrderStatus {
    pub const ALL: [Self; 6] = [
        Self::Pending,
        Self::Confirmed,
        Self::Preparing,
        Self::Ready,
        Self::Delivered,
        Self::Cancelled,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Preparing => "preparing",
            Self::Ready => "ready",
            Self::Delivered => "delivered",
            Self::Cancelled => "cancelled",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pending => "Pendiente",
            Self::Confirmed => "Confirmado",
            Self::Preparing => "En preparación",
            Self::Ready => "Listo",
            Self::Delivered => "Entregado",
            Self::Cancelled => "Cancelado",
        }
    }

    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// The next status along the happy path, if any.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::Pending => Some(Self::Confirmed),
            Self::Confirmed => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    #[must_use]
    pub fn can_transition_to(self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Cancelled || self.next() == Some(to)
    }

    /// Statuses an admin may move this order to.
    #[must_use]
    pub fn allowed_transitions(self) -> Vec<Self> {
        Self::ALL
            .into_iter()
            .filter(|to| self.can_transition_to(*to))
            .collect()
    }

    /// Validate a status change.
    ///
    /// # Errors
    ///
    /// Returns [`StatusTransitionError`] for any move the lifecycle does not
    /// allow, including leaving a terminal status and staying in place.
    pub fn transition(self, to: Self) -> Result<Self, StatusTransitionError> {
        if self.can_transition_to(to) {
            Ok(to)
        } else {
            Err(StatusTransitionError { from: self, to })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("status", s))
    }
}

/// Who placed the order, as entered at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    pub name: String,
    pub phone: String,
    pub address: String,
}

/// One line of a placed order. Never modified after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLine {
    /// `None` once the product has been deleted from the catalog.
    pub product_id: Option<ProductId>,
    pub product_name: String,
    pub quantity: u32,
    pub weight_kg: Option<Kilograms>,
    /// Price of one piece or one weighed portion, without vacuum packing.
    pub unit_price: Money,
    pub line_total: Money,
    pub format: Option<CutFormat>,
    pub bone: Option<BoneOption>,
    pub vacuum_packed: bool,
}

/// A placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub profile_id: Option<ProfileId>,
    pub customer: CustomerSnapshot,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub status: OrderStatus,
    pub submission_key: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub items: Vec<OrderLine>,
}

/// Checkout form input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutDetails {
    pub name: String,
    pub phone: String,
    pub address: String,
    /// Defaults to `address` when blank.
    #[serde(default)]
    pub delivery_address: String,
    /// Defaults to `phone` when blank.
    #[serde(default)]
    pub delivery_phone: String,
    #[serde(default)]
    pub notes: String,
}

/// Required checkout form fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutField {
    Name,
    Phone,
    Address,
}

impl CheckoutField {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Phone => "phone",
            Self::Address => "address",
        }
    }
}

impl fmt::Display for CheckoutField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checkout validation failures, shown inline on the checkout form.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("the cart is empty")]
    EmptyCart,
    #[error("{0} is required")]
    MissingField(CheckoutField),
}

impl CheckoutError {
    /// Short code carried in `?error=` redirects.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::EmptyCart => "empty_cart",
            Self::MissingField(CheckoutField::Name) => "missing_name",
            Self::MissingField(CheckoutField::Phone) => "missing_phone",
            Self::MissingField(CheckoutField::Address) => "missing_address",
        }
    }
}

impl CheckoutDetails {
    /// Pre-fill the form from a signed-in shopper's profile.
    #[must_use]
    pub fn from_profile(profile: &UserProfile) -> Self {
        Self {
            name: profile.display_name.clone().unwrap_or_default(),
            phone: profile.phone.clone().unwrap_or_default(),
            address: profile.full_address().unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Trim every field and check the required ones.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError::MissingField`] for a blank name, phone or
    /// address.
    pub fn validate(&self) -> Result<ValidCheckout, CheckoutError> {
        let name = required(&self.name, CheckoutField::Name)?;
        let phone = required(&self.phone, CheckoutField::Phone)?;
        let address = required(&self.address, CheckoutField::Address)?;
        let delivery_address = non_blank(&self.delivery_address).unwrap_or_else(|| address.clone());
        let delivery_phone = non_blank(&self.delivery_phone).unwrap_or_else(|| phone.clone());

        Ok(ValidCheckout {
            customer: CustomerSnapshot {
                name,
                phone,
                address,
            },
            delivery_address,
            delivery_phone,
            notes: non_blank(&self.notes),
        })
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn required(value: &str, field: CheckoutField) -> Result<String, CheckoutError> {
    non_blank(value).ok_or(CheckoutError::MissingField(field))
}

/// Checkout input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidCheckout {
    pub customer: CustomerSnapshot,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub notes: Option<String>,
}

/// An order ready to be written, with prices frozen from the cart.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub profile_id: Option<ProfileId>,
    pub customer: CustomerSnapshot,
    pub delivery_address: String,
    pub delivery_phone: String,
    pub notes: Option<String>,
    pub subtotal: Money,
    pub delivery_fee: Money,
    pub total: Money,
    pub submission_key: Uuid,
    pub lines: Vec<OrderLine>,
}

impl NewOrder {
    /// Freeze a cart into an order.
    ///
    /// # Errors
    ///
    /// Returns [`CheckoutError`] when the cart is empty or a required
    /// field is blank.
    pub fn from_cart(
        cart: &Cart,
        details: &CheckoutDetails,
        profile_id: Option<ProfileId>,
        policy: &PricingPolicy,
        submission_key: Uuid,
    ) -> Result<Self, CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let valid = details.validate()?;
        let totals = cart.totals(policy);

        let lines = cart
            .items()
            .iter()
            .map(|item| OrderLine {
                product_id: Some(item.product_id),
                product_name: item.name.clone(),
                quantity: item.quantity,
                weight_kg: item.sale.weight(),
                unit_price: policy.unit_amount(item),
                line_total: policy.line_price(item),
                format: item.format,
                bone: item.bone,
                vacuum_packed: item.vacuum_packed,
            })
            .collect();

        Ok(Self {
            profile_id,
            customer: valid.customer,
            delivery_address: valid.delivery_address,
            delivery_phone: valid.delivery_phone,
            notes: valid.notes,
            subtotal: totals.subtotal,
            delivery_fee: totals.delivery_fee,
            total: totals.total,
            submission_key,
            lines,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::cart::{Cart, Selection};
    use crate::test_support::product;

    #[test]
    fn test_happy_path_transitions() {
        let mut status = OrderStatus::Pending;
        for expected in [
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
            OrderStatus::Delivered,
        ] {
            status = status.transition(expected).unwrap();
        }
        assert_eq!(status, OrderStatus::Delivered);
        assert!(status.allowed_transitions().is_empty());
    }

    #[test]
    fn test_illegal_transitions_rejected() {
        assert!(OrderStatus::Pending.transition(OrderStatus::Ready).is_err());
        assert!(OrderStatus::Ready.transition(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Pending.transition(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Cancelled.transition(OrderStatus::Pending).is_err());
        assert!(OrderStatus::Delivered.transition(OrderStatus::Cancelled).is_err());
    }

    #[test]
    fn test_cancel_from_any_open_status() {
        for status in [
            OrderStatus::Pending,
            OrderStatus::Confirmed,
            OrderStatus::Preparing,
            OrderStatus::Ready,
        ] {
            assert_eq!(
                status.transition(OrderStatus::Cancelled),
                Ok(OrderStatus::Cancelled)
            );
        }
    }

    #[test]
    fn test_checkout_requires_contact_fields() {
        let details = CheckoutDetails {
            name: "  ".into(),
            phone: "11 5555-0000".into(),
            address: "Av. Siempre Viva 742".into(),
            ..CheckoutDetails::default()
        };
        assert_eq!(
            details.validate().unwrap_err(),
            CheckoutError::MissingField(CheckoutField::Name)
        );
        assert_eq!(details.validate().unwrap_err().code(), "missing_name");
        assert_eq!(
            details.validate().unwrap_err().to_string(),
            "name is required"
        );
    }

    #[test]
    fn test_checkout_error_codes_per_field() {
        let details = CheckoutDetails {
            name: "Ana".into(),
            phone: " ".into(),
            address: String::new(),
            ..CheckoutDetails::default()
        };
        assert_eq!(details.validate().unwrap_err().code(), "missing_phone");

        let details = CheckoutDetails {
            phone: "11 5555-0000".into(),
            ..details
        };
        assert_eq!(details.validate().unwrap_err().code(), "missing_address");
        assert_eq!(CheckoutError::EmptyCart.code(), "empty_cart");
    }

    #[test]
    fn test_delivery_fields_default_to_customer_fields() {
        let details = CheckoutDetails {
            name: "Ana".into(),
            phone: "11 5555-0000".into(),
            address: "Av. Siempre Viva 742".into(),
            notes: "  ".into(),
            ..CheckoutDetails::default()
        };
        let valid = details.validate().unwrap();
        assert_eq!(valid.delivery_address, "Av. Siempre Viva 742");
        assert_eq!(valid.delivery_phone, "11 5555-0000");
        assert_eq!(valid.notes, None);
    }

    #[test]
    fn test_new_order_freezes_cart_prices() {
        let policy = PricingPolicy::default();
        let mut cart = Cart::new();
        cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();
        cart.add_item(&product(1, "Vacío", 9000), Selection::unit()).unwrap();

        let details = CheckoutDetails {
            name: "Ana".into(),
            phone: "11 5555-0000".into(),
            address: "Mitre 100".into(),
            ..CheckoutDetails::default()
        };
        let key = Uuid::new_v4();
        let order = NewOrder::from_cart(&cart, &details, None, &policy, key).unwrap();

        assert_eq!(order.subtotal, Money::new(18000));
        assert_eq!(order.delivery_fee, Money::ZERO);
        assert_eq!(order.total, Money::new(18000));
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.lines[0].quantity, 2);
        assert_eq!(order.lines[0].unit_price, Money::new(9000));
        assert_eq!(order.submission_key, key);
    }

    #[test]
    fn test_new_order_rejects_empty_cart() {
        let result = NewOrder::from_cart(
            &Cart::new(),
            &CheckoutDetails::default(),
            None,
            &PricingPolicy::default(),
            Uuid::new_v4(),
        );
        assert_eq!(result.unwrap_err(), CheckoutError::EmptyCart);
    }
}
