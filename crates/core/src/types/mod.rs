//! Domain types for the Carnicería storefront.
//!
//! This module provides type-safe wrappers and records for the shop's
//! domain concepts.

pub mod content;
pub mod delivery;
pub mod email;
pub mod id;
pub mod money;
pub mod order;
pub mod product;
pub mod profile;

pub use content::{Audience, ContactInfo, MessageKind, NewsArticle, SiteMessage, slugify};
pub use delivery::{
    DeliverySlot, DeliverySlotDraft, NextDelivery, ScheduleError, next_delivery, weekday_from_iso,
    weekday_label,
};
pub use email::{Email, EmailError};
pub use id::*;
pub use money::{Kilograms, Money, MoneyError, WeightError};
pub use order::{
    CheckoutDetails, CheckoutError, CheckoutField, CustomerSnapshot, NewOrder, Order, OrderLine,
    OrderStatus, StatusTransitionError, ValidCheckout,
};
pub use product::{BoneOption, Category, CutFormat, Product, SaleMode, SellableBy, UnknownVariant};
pub use profile::{AddressType, ProfileRole, ProfileUpdate, UserProfile};
