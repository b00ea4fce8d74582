//! Cart route handlers.
//!
//! Cart operations use HTMX for dynamic updates without full page reloads.
//! The cart itself lives in the visitor's session; every mutation writes the
//! whole cart back.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    http::HeaderMap,
    response::{AppendHeaders, IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use carniceria_core::{
    BoneOption, Cart, CartItem, CutFormat, Kilograms, LineId, PricingPolicy, Product, ProductId,
    Selection,
};

use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::routes::layout::PageContext;
use crate::routes::products::lookup_product;
use crate::services::cart as cart_store;
use crate::state::AppState;

/// Spanish message for an `?error=` code.
#[must_use]
pub fn error_message(code: &str) -> String {
    match code {
        "out_of_stock" => "Ese producto no tiene stock en este momento",
        "sale_mode" => "Ese producto no se vende de esa forma",
        "format" => "Ese corte no se ofrece para este producto",
        "bone" => "Esa opción de hueso no se ofrece para este producto",
        "below_minimum" => "El peso pedido está por debajo del mínimo",
        "invalid_weight" => "Ingresá un peso válido, por ejemplo 1,5",
        "line_not_found" => "Ese artículo ya no está en tu carrito",
        "unavailable_product" => "Ese producto ya no está disponible",
        "empty_cart" => "Tu carrito está vacío",
        "missing_name" => "Completá tu nombre",
        "missing_phone" => "Completá tu teléfono",
        "missing_address" => "Completá la dirección de entrega",
        "order_failed" => "No pudimos registrar tu pedido, intentá de nuevo",
        _ => "Algo salió mal, intentá de nuevo",
    }
    .to_string()
}

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartItemView {
    pub id: String,
    pub product_id: i32,
    pub name: String,
    pub details: String,
    pub quantity: u32,
    pub unit_price: String,
    pub line_price: String,
    pub vacuum_packed: bool,
    pub image_url: Option<String>,
}

impl CartItemView {
    fn new(item: &CartItem, policy: &PricingPolicy) -> Self {
        let mut details = Vec::new();
        if let Some(kg) = item.sale.weight() {
            details.push(kg.to_string());
        }
        if let Some(format) = item.format {
            details.push(format.label());
        }
        if let Some(bone) = item.bone {
            details.push(bone.label().to_string());
        }

        Self {
            id: item.id.to_string(),
            product_id: item.product_id.as_i32(),
            name: item.name.clone(),
            details: details.join(" · "),
            quantity: item.quantity,
            unit_price: policy.unit_amount(item).to_string(),
            line_price: policy.line_price(item).to_string(),
            vacuum_packed: item.vacuum_packed,
            image_url: item.image_url.clone(),
        }
    }
}

/// Cart display data for templates.
#[derive(Clone)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub item_count: u64,
    pub subtotal: String,
    pub delivery_fee: String,
    pub free_delivery: bool,
    pub total: String,
    pub missing_for_free_shipping: Option<String>,
    pub vacuum_surcharge: String,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, policy: &PricingPolicy) -> Self {
        let totals = cart.totals(policy);
        Self {
            items: cart
                .items()
                .iter()
                .map(|item| CartItemView::new(item, policy))
                .collect(),
            item_count: cart.item_count(),
            subtotal: totals.subtotal.to_string(),
            delivery_fee: totals.delivery_fee.to_string(),
            free_delivery: totals.delivery_fee.is_zero(),
            total: totals.total.to_string(),
            missing_for_free_shipping: if cart.is_empty() {
                None
            } else {
                policy
                    .missing_for_free_shipping(totals.subtotal)
                    .map(|m| m.to_string())
            },
            vacuum_surcharge: policy.vacuum_surcharge().to_string(),
        }
    }
}

/// Add to cart form data.
#[derive(Debug, Deserialize)]
pub struct AddToCartForm {
    pub product_id: i32,
    /// `unit` (default) or `weight`.
    pub mode: Option<String>,
    pub kg: Option<String>,
    pub format: Option<String>,
    pub bone: Option<String>,
}

impl AddToCartForm {
    /// The shopper's choices, or an error code.
    fn selection(&self) -> Result<Selection, &'static str> {
        let mut selection = match self.mode.as_deref() {
            Some("weight") => {
                let kg: Kilograms = self
                    .kg
                    .as_deref()
                    .unwrap_or_default()
                    .parse()
                    .map_err(|_| "invalid_weight")?;
                Selection::weight(kg)
            }
            _ => Selection::unit(),
        };
        if let Some(format) = non_empty(self.format.as_deref()) {
            selection = selection.with_format(format.parse::<CutFormat>().map_err(|_| "format")?);
        }
        if let Some(bone) = non_empty(self.bone.as_deref()) {
            selection = selection.with_bone(bone.parse::<BoneOption>().map_err(|_| "bone")?);
        }
        Ok(selection)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Form data naming one cart line.
#[derive(Debug, Deserialize)]
pub struct LineForm {
    pub line_id: String,
}

/// Update cart form data.
#[derive(Debug, Deserialize)]
pub struct UpdateCartForm {
    pub line_id: String,
    pub quantity: i64,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/show.html")]
pub struct CartShowTemplate {
    pub page: PageContext,
    pub cart: CartView,
}

/// Cart items fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_items.html")]
pub struct CartItemsTemplate {
    pub cart: CartView,
}

/// Cart count badge fragment template (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/cart_count.html")]
pub struct CartCountTemplate {
    pub count: u64,
}

/// Add-to-cart result fragment (for HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/add_result.html")]
pub struct AddResultTemplate {
    pub ok: bool,
    pub message: String,
    pub count: u64,
}

fn is_htmx(headers: &HeaderMap) -> bool {
    headers.contains_key("hx-request")
}

/// Re-render the cart items after a mutation.
async fn items_response(
    state: &AppState,
    session: &Session,
    cart: &Cart,
) -> Result<Response, AppError> {
    cart_store::save(session, cart).await?;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::new(cart, state.pricing()),
        },
    )
        .into_response())
}

/// Display cart page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> impl IntoResponse {
    let cart = cart_store::load(&session).await;

    CartShowTemplate {
        page: PageContext::load(&state, &session, user.as_ref()).await,
        cart: CartView::new(&cart, state.pricing()),
    }
}

async fn add_to_cart(
    state: &AppState,
    cart: &mut Cart,
    form: &AddToCartForm,
) -> Result<Product, &'static str> {
    let product = lookup_product(state, ProductId::new(form.product_id))
        .await
        .unwrap_or_else(|e| {
            tracing::warn!(error = %e, product_id = form.product_id, "Product lookup failed");
            None
        });
    add_selection(cart, product, form)
}

/// Apply the form to the cart. Unknown products and cart rule violations
/// come back as error codes.
fn add_selection(
    cart: &mut Cart,
    product: Option<Product>,
    form: &AddToCartForm,
) -> Result<Product, &'static str> {
    let product = product.ok_or("unavailable_product")?;
    let selection = form.selection()?;
    cart.add_item(&product, selection).map_err(|e| e.code())?;
    Ok(product)
}

/// Add item to cart.
///
/// HTMX requests get a result fragment and a `cart-updated` trigger; plain
/// form posts are redirected to the cart, or back to the product on error.
#[instrument(skip(state, session, headers))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    headers: HeaderMap,
    Form(form): Form<AddToCartForm>,
) -> Result<Response, AppError> {
    let mut cart = cart_store::load(&session).await;

    match add_to_cart(&state, &mut cart, &form).await {
        Ok(product) => {
            cart_store::save(&session, &cart).await?;
            tracing::info!(product_id = %product.id, "Added to cart");

            if !is_htmx(&headers) {
                return Ok(Redirect::to("/cart").into_response());
            }
            Ok((
                AppendHeaders([("HX-Trigger", "cart-updated")]),
                AddResultTemplate {
                    ok: true,
                    message: format!("{} agregado al carrito", product.name),
                    count: cart.item_count(),
                },
            )
                .into_response())
        }
        Err(code) => {
            if !is_htmx(&headers) {
                return Ok(Redirect::to(&format!(
                    "/products/{}?error={code}",
                    form.product_id
                ))
                .into_response());
            }
            Ok(AddResultTemplate {
                ok: false,
                message: error_message(code),
                count: cart.item_count(),
            }
            .into_response())
        }
    }
}

/// Update cart item quantity (HTMX). Zero or less removes the line.
#[instrument(skip(state, session))]
pub async fn update(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<UpdateCartForm>,
) -> Result<Response, AppError> {
    let mut cart = cart_store::load(&session).await;
    if let Ok(id) = form.line_id.parse::<LineId>()
        && let Err(e) = cart.update_quantity(id, form.quantity)
    {
        tracing::debug!(error = %e, "Cart update ignored");
    }
    items_response(&state, &session, &cart).await
}

/// Remove item from cart (HTMX).
#[instrument(skip(state, session))]
pub async fn remove(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LineForm>,
) -> Result<Response, AppError> {
    let mut cart = cart_store::load(&session).await;
    if let Ok(id) = form.line_id.parse::<LineId>() {
        cart.remove_item(id);
    }
    items_response(&state, &session, &cart).await
}

/// Toggle vacuum packing for a line (HTMX).
#[instrument(skip(state, session))]
pub async fn vacuum(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LineForm>,
) -> Result<Response, AppError> {
    let mut cart = cart_store::load(&session).await;
    if let Ok(id) = form.line_id.parse::<LineId>()
        && let Err(e) = cart.toggle_vacuum_packing(id)
    {
        tracing::debug!(error = %e, "Vacuum toggle ignored");
    }
    items_response(&state, &session, &cart).await
}

/// Empty the cart (HTMX).
#[instrument(skip(state, session))]
pub async fn clear(State(state): State<AppState>, session: Session) -> Result<Response, AppError> {
    cart_store::clear(&session).await?;
    Ok((
        AppendHeaders([("HX-Trigger", "cart-updated")]),
        CartItemsTemplate {
            cart: CartView::new(&Cart::new(), state.pricing()),
        },
    )
        .into_response())
}

/// Get cart count badge (HTMX).
#[instrument(skip(session))]
pub async fn count(session: Session) -> impl IntoResponse {
    CartCountTemplate {
        count: cart_store::load(&session).await.item_count(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carniceria_core::{Category, Money, SaleMode, SellableBy};
    use chrono::Utc;

    use super::*;

    fn form(
        mode: Option<&str>,
        kg: Option<&str>,
        format: Option<&str>,
        bone: Option<&str>,
    ) -> AddToCartForm {
        AddToCartForm {
            product_id: 1,
            mode: mode.map(String::from),
            kg: kg.map(String::from),
            format: format.map(String::from),
            bone: bone.map(String::from),
        }
    }

    #[test]
    fn test_selection_defaults_to_unit() {
        let selection = form(None, None, Some(""), None).selection().unwrap();
        assert_eq!(selection, Selection::unit());
    }

    #[test]
    fn test_selection_parses_weight_and_choices() {
        let selection = form(Some("weight"), Some("1,5"), Some("sliced-2"), Some("boneless"))
            .selection()
            .unwrap();
        assert_eq!(
            selection.sale,
            SaleMode::Weight {
                kg: "1.5".parse().unwrap()
            }
        );
        assert_eq!(selection.format, Some(CutFormat::Sliced(2)));
        assert_eq!(selection.bone, Some(BoneOption::Boneless));
    }

    #[test]
    fn test_selection_rejects_bad_input() {
        assert_eq!(
            form(Some("weight"), Some("abc"), None, None).selection(),
            Err("invalid_weight")
        );
        assert_eq!(
            form(Some("weight"), Some("0"), None, None).selection(),
            Err("invalid_weight")
        );
        assert_eq!(
            form(None, None, Some("julienne"), None).selection(),
            Err("format")
        );
    }

    fn chorizo(in_stock: bool) -> Product {
        Product {
            id: ProductId::new(1),
            name: "Chorizo".to_string(),
            description: String::new(),
            category: Category::Pork,
            price: Money::new(1200),
            price_per_kilo: None,
            min_kg: None,
            sellable_by: SellableBy::Unit,
            formats: Vec::new(),
            bone_options: Vec::new(),
            featured: false,
            in_stock,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_add_out_of_stock_product_reports_stock() {
        let mut cart = Cart::new();
        let result = add_selection(&mut cart, Some(chorizo(false)), &form(None, None, None, None));
        assert_eq!(result.unwrap_err(), "out_of_stock");
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_unknown_product_is_unavailable() {
        let mut cart = Cart::new();
        let result = add_selection(&mut cart, None, &form(None, None, None, None));
        assert_eq!(result.unwrap_err(), "unavailable_product");
    }

    #[test]
    fn test_add_in_stock_product() {
        let mut cart = Cart::new();
        let product = add_selection(&mut cart, Some(chorizo(true)), &form(None, None, None, None))
            .unwrap();
        assert_eq!(product.name, "Chorizo");
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_cart_view_totals() {
        let policy =
            PricingPolicy::new(Money::new(500), Money::new(15_000), Money::new(1500)).unwrap();
        let view = CartView::new(&Cart::new(), &policy);
        assert_eq!(view.item_count, 0);
        assert_eq!(view.total, "$0");
        assert!(view.missing_for_free_shipping.is_none());
    }

    #[test]
    fn test_error_message_falls_back() {
        assert_eq!(error_message("below_minimum"), "El peso pedido está por debajo del mínimo");
        assert_eq!(error_message("???"), "Algo salió mal, intentá de nuevo");
    }
}
