//! Order submission and the WhatsApp hand-off.

use std::fmt::Write as _;

use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use carniceria_core::{
    Cart, CheckoutDetails, CheckoutError, ContactInfo, NewOrder, Order, OrderId, PricingPolicy,
    ProfileId,
};

use crate::db::{OrderRepository, RepositoryError};

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// The form or cart failed validation.
    #[error(transparent)]
    Checkout(#[from] CheckoutError),

    /// The order could not be stored.
    #[error("failed to store order: {0}")]
    Repository(#[from] RepositoryError),
}

/// Freeze the cart into an order and store it.
///
/// Resubmitting with the same `submission_key` returns the order stored the
/// first time.
///
/// # Errors
///
/// Returns `OrderError::Checkout` for an empty cart or missing fields and
/// `OrderError::Repository` if the write fails.
#[instrument(skip(pool, cart, details, policy), fields(lines = cart.items().len()))]
pub async fn submit(
    pool: &PgPool,
    cart: &Cart,
    details: &CheckoutDetails,
    profile_id: Option<ProfileId>,
    policy: &PricingPolicy,
    submission_key: Uuid,
) -> Result<OrderId, OrderError> {
    let order = NewOrder::from_cart(cart, details, profile_id, policy, submission_key)?;
    let submission = OrderRepository::new(pool).create(&order).await?;
    let order_id = submission.order_id();

    info!(order_id = %order_id, total = %order.total, "Order placed");
    Ok(order_id)
}

/// Plain-text summary of an order, as sent over WhatsApp.
#[must_use]
pub fn summary(order: &Order) -> String {
    let mut text = format!("Hola! Quiero confirmar mi pedido #{}\n\n", order.id);

    for line in &order.items {
        let _ = write!(text, "- {} x{}", line.product_name, line.quantity);
        if let Some(kg) = line.weight_kg {
            let _ = write!(text, " ({kg})");
        }
        if let Some(format) = line.format {
            let _ = write!(text, ", {}", format.label());
        }
        if let Some(bone) = line.bone {
            let _ = write!(text, ", {}", bone.label().to_lowercase());
        }
        if line.vacuum_packed {
            text.push_str(", envasado al vacío");
        }
        let _ = writeln!(text, ": {}", line.line_total);
    }

    let _ = writeln!(text, "\nSubtotal: {}", order.subtotal);
    let _ = writeln!(text, "Envío: {}", order.delivery_fee);
    let _ = writeln!(text, "Total: {}", order.total);
    let _ = write!(
        text,
        "\nA nombre de {}, entregar en {} (tel. {})",
        order.customer.name, order.delivery_address, order.delivery_phone
    );
    if let Some(notes) = &order.notes {
        let _ = write!(text, "\nNotas: {notes}");
    }
    text
}

/// `wa.me` link that opens a chat with the shop carrying the order summary.
///
/// Returns `None` when the shop has no WhatsApp number configured.
#[must_use]
pub fn whatsapp_link(contact: &ContactInfo, order: &Order) -> Option<String> {
    let digits = contact.whatsapp_digits();
    if digits.is_empty() {
        return None;
    }
    Some(format!(
        "https://wa.me/{digits}?text={}",
        urlencoding::encode(&summary(order))
    ))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use carniceria_core::{
        BoneOption, CustomerSnapshot, CutFormat, Kilograms, Money, OrderLine, OrderStatus,
        ProductId,
    };

    use super::*;

    fn order() -> Order {
        Order {
            id: OrderId::new(42),
            profile_id: None,
            customer: CustomerSnapshot {
                name: "Ana".to_string(),
                phone: "11 5555-0000".to_string(),
                address: "Mitre 100".to_string(),
            },
            delivery_address: "Mitre 100".to_string(),
            delivery_phone: "11 5555-0000".to_string(),
            notes: Some("Tocar timbre".to_string()),
            subtotal: Money::new(14_500),
            delivery_fee: Money::new(1500),
            total: Money::new(16_000),
            status: OrderStatus::Pending,
            submission_key: Uuid::new_v4(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
            items: vec![
                OrderLine {
                    product_id: Some(ProductId::new(1)),
                    product_name: "Asado de Tira".to_string(),
                    quantity: 1,
                    weight_kg: Kilograms::new("1.5".parse().unwrap_or_default()).ok(),
                    unit_price: Money::new(12_750),
                    line_total: Money::new(12_750),
                    format: Some(CutFormat::Whole),
                    bone: Some(BoneOption::WithBone),
                    vacuum_packed: false,
                },
                OrderLine {
                    product_id: Some(ProductId::new(2)),
                    product_name: "Chorizo".to_string(),
                    quantity: 1,
                    weight_kg: None,
                    unit_price: Money::new(1750),
                    line_total: Money::new(1750),
                    format: None,
                    bone: None,
                    vacuum_packed: true,
                },
            ],
        }
    }

    #[test]
    fn test_summary_lists_lines_and_totals() {
        let text = summary(&order());
        assert!(text.contains("pedido #42"));
        assert!(text.contains("- Asado de Tira x1 (1.5 kg), Entero, con hueso: $12.750"));
        assert!(text.contains("- Chorizo x1, envasado al vacío: $1.750"));
        assert!(text.contains("Total: $16.000"));
        assert!(text.contains("Notas: Tocar timbre"));
    }

    #[test]
    fn test_whatsapp_link_uses_shop_number() {
        let contact = ContactInfo {
            whatsapp: "+54 9 11 5555-1234".to_string(),
            ..ContactInfo::default()
        };
        let link = whatsapp_link(&contact, &order());
        let Some(link) = link else {
            panic!("expected a link");
        };
        assert!(link.starts_with("https://wa.me/5491155551234?text=Hola%21"));
        assert!(!link.contains(' '));
    }

    #[test]
    fn test_whatsapp_link_requires_number() {
        assert!(whatsapp_link(&ContactInfo::default(), &order()).is_none());
    }
}
