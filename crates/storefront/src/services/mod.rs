//! Business logic services for storefront.
//!
//! - `auth` - sign-in, registration and profile edits
//! - `cart` - cart persistence in the session
//! - `catalog` - cached catalog reads
//! - `delivery` - delivery schedule in shop time
//! - `orders` - order submission and the WhatsApp hand-off

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod delivery;
pub mod orders;

pub use auth::{AuthError, AuthService, ProfileSave, Registration};
pub use catalog::CatalogService;
pub use orders::OrderError;
