//! Product route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::{instrument, warn};

use carniceria_core::cart::check_minimum;
use carniceria_core::{
    BoneOption, CatalogQuery, Category, Kilograms, Product, ProductId, SellableBy, SortOrder,
};

use crate::db::{ProductRepository, RepositoryError};
use crate::error::AppError;
use crate::filters;
use crate::middleware::OptionalAuth;
use crate::recipes::RecipeError;
use crate::routes::cart::error_message;
use crate::routes::layout::PageContext;
use crate::state::AppState;

/// Product card data for listings.
#[derive(Clone)]
pub struct ProductCard {
    pub id: i32,
    pub name: String,
    pub category: &'static str,
    pub price: String,
    pub per_kilo: bool,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductCard {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            category: product.category.label(),
            price: product.display_price().to_string(),
            per_kilo: product.sellable_by == SellableBy::Kilogram && product.sells_by_weight(),
            image_url: product.image_url.clone(),
        }
    }
}

/// A selectable option in a form.
#[derive(Clone)]
pub struct OptionView {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Product detail data for templates.
#[derive(Clone)]
pub struct ProductDetail {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: &'static str,
    pub unit_price: Option<String>,
    pub per_kilo_price: Option<String>,
    pub min_kg: Option<String>,
    pub formats: Vec<OptionView>,
    pub bone_options: Vec<OptionView>,
    pub in_stock: bool,
    pub image_url: Option<String>,
}

impl From<&Product> for ProductDetail {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.label(),
            unit_price: product
                .sells_by_unit()
                .then(|| product.price.to_string()),
            per_kilo_price: product
                .price_per_kilo
                .filter(|_| product.sells_by_weight())
                .map(|p| p.to_string()),
            min_kg: product.min_kg.map(|kg| kg.to_string()),
            formats: product
                .formats
                .iter()
                .map(|f| OptionView {
                    value: f.to_string(),
                    label: f.label(),
                    selected: false,
                })
                .collect(),
            bone_options: product
                .bone_options
                .iter()
                .map(|b| OptionView {
                    value: b.as_str().to_string(),
                    label: b.label().to_string(),
                    selected: false,
                })
                .collect(),
            in_stock: product.in_stock,
            image_url: product.image_url.clone(),
        }
    }
}

/// Catalog query parameters.
#[derive(Debug, Default, Deserialize)]
pub struct CatalogParams {
    pub q: Option<String>,
    pub category: Option<String>,
    pub bone: Option<String>,
    pub sort: Option<String>,
}

impl CatalogParams {
    fn to_query(&self) -> CatalogQuery {
        CatalogQuery::from_params(
            self.q.as_deref(),
            self.category.as_deref(),
            self.bone.as_deref(),
            self.sort.as_deref(),
        )
    }
}

/// Product listing page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/index.html")]
pub struct ProductsIndexTemplate {
    pub page: PageContext,
    pub products: Vec<ProductCard>,
    pub search: String,
    pub categories: Vec<OptionView>,
    pub bones: Vec<OptionView>,
    pub sorts: Vec<OptionView>,
}

/// Product detail page template.
#[derive(Template, WebTemplate)]
#[template(path = "products/show.html")]
pub struct ProductShowTemplate {
    pub page: PageContext,
    pub product: ProductDetail,
    pub error: Option<String>,
    pub recipes_enabled: bool,
}

/// Minimum-weight verdict fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/minimum.html")]
pub struct MinimumTemplate {
    pub ok: bool,
    pub message: String,
}

/// Recipe suggestion fragment (HTMX).
#[derive(Template, WebTemplate)]
#[template(path = "partials/recipe.html")]
pub struct RecipeTemplate {
    pub answer: Option<String>,
    pub error: Option<String>,
}

/// Display product listing page.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<CatalogParams>,
) -> impl IntoResponse {
    let query = params.to_query();
    let products = state.catalog().search(&query).await;

    let categories = Category::ALL
        .into_iter()
        .map(|c| OptionView {
            value: c.as_str().to_string(),
            label: c.label().to_string(),
            selected: query.category == Some(c),
        })
        .collect();
    let bones = BoneOption::ALL
        .into_iter()
        .map(|b| OptionView {
            value: b.as_str().to_string(),
            label: b.label().to_string(),
            selected: query.bone == Some(b),
        })
        .collect();
    let sorts = SortOrder::ALL
        .into_iter()
        .map(|s| OptionView {
            value: s.as_str().to_string(),
            label: s.label().to_string(),
            selected: query.sort == s,
        })
        .collect();

    ProductsIndexTemplate {
        page: PageContext::load(&state, &session, user.as_ref()).await,
        products: products.iter().map(ProductCard::from).collect(),
        search: query.search.unwrap_or_default(),
        categories,
        bones,
        sorts,
    }
}

/// Query parameters for the product page.
#[derive(Debug, Deserialize)]
pub struct ShowParams {
    pub error: Option<String>,
}

/// Look a product up, including ones that are out of stock.
///
/// The catalog cache only holds in-stock products, so a miss falls back to
/// the database.
pub(crate) async fn lookup_product(
    state: &AppState,
    id: ProductId,
) -> Result<Option<Product>, RepositoryError> {
    if let Some(product) = state.catalog().by_id(id).await {
        return Ok(Some(product));
    }
    ProductRepository::new(state.pool()).get_by_id(id).await
}

async fn find_product(state: &AppState, id: ProductId) -> Result<Product, AppError> {
    lookup_product(state, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Display product detail page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<i32>,
    Query(params): Query<ShowParams>,
) -> Result<impl IntoResponse, AppError> {
    let product = find_product(&state, ProductId::new(id)).await?;

    Ok(ProductShowTemplate {
        page: PageContext::load(&state, &session, user.as_ref()).await,
        product: ProductDetail::from(&product),
        error: params.error.as_deref().map(error_message),
        recipes_enabled: state.recipes().is_some(),
    })
}

/// Query parameters for the minimum-weight check.
///
/// The product form is sent whole, so `mode` tells whether the weight
/// applies at all.
#[derive(Debug, Default, Deserialize)]
pub struct MinimumParams {
    pub mode: Option<String>,
    pub kg: Option<String>,
}

/// Check a requested weight against the product's minimum (HTMX).
///
/// The fragment also swaps the add-to-cart button out of band, disabled
/// while the weight is invalid or below the minimum.
#[instrument(skip(state))]
pub async fn minimum(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Query(params): Query<MinimumParams>,
) -> Result<impl IntoResponse, AppError> {
    let product = find_product(&state, ProductId::new(id)).await?;
    Ok(minimum_verdict(&product, &params))
}

fn minimum_verdict(product: &Product, params: &MinimumParams) -> MinimumTemplate {
    if params.mode.as_deref() == Some("unit") {
        return MinimumTemplate {
            ok: true,
            message: String::new(),
        };
    }

    let raw = params.kg.as_deref().unwrap_or_default();
    match raw.parse::<Kilograms>() {
        Err(_) => MinimumTemplate {
            ok: false,
            message: "Ingresá un peso válido, por ejemplo 1,5".to_string(),
        },
        Ok(kg) => match check_minimum(product, kg) {
            Ok(()) => MinimumTemplate {
                ok: true,
                message: product.price_per_kilo.map_or_else(String::new, |ppk| {
                    format!("{kg}: {}", ppk.per_kilo_times(kg))
                }),
            },
            Err(e) => MinimumTemplate {
                ok: false,
                message: error_message_for(&e),
            },
        },
    }
}

fn error_message_for(error: &carniceria_core::CartError) -> String {
    match error {
        carniceria_core::CartError::BelowMinimumWeight { required, .. } => {
            format!("El mínimo para este corte es {required}")
        }
        other => error_message(other.code()),
    }
}

/// Recipe question form.
#[derive(Debug, Deserialize)]
pub struct RecipeForm {
    pub question: String,
}

/// Ask for a recipe suggestion (HTMX).
#[instrument(skip(state, form))]
pub async fn recipes(
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<RecipeForm>,
) -> Result<Response, AppError> {
    let Some(client) = state.recipes() else {
        return Ok((
            StatusCode::SERVICE_UNAVAILABLE,
            RecipeTemplate {
                answer: None,
                error: Some("Las recetas no están disponibles por ahora".to_string()),
            },
        )
            .into_response());
    };

    let product = find_product(&state, ProductId::new(id)).await?;

    let template = match client.suggest(&product, &form.question).await {
        Ok(answer) => RecipeTemplate {
            answer: Some(answer),
            error: None,
        },
        Err(RecipeError::EmptyQuestion) => RecipeTemplate {
            answer: None,
            error: Some("Contanos qué querés cocinar".to_string()),
        },
        Err(e) => {
            warn!(error = %e, product_id = id, "Recipe suggestion failed");
            RecipeTemplate {
                answer: None,
                error: Some("No pudimos generar una receta, probá de nuevo".to_string()),
            }
        }
    };
    Ok(template.into_response())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use carniceria_core::Money;
    use chrono::Utc;

    use super::*;

    fn entrana() -> Product {
        Product {
            id: ProductId::new(3),
            name: "Entraña".to_string(),
            description: String::new(),
            category: Category::Beef,
            price: Money::new(8500),
            price_per_kilo: Some(Money::new(8500)),
            min_kg: Some("1".parse().unwrap()),
            sellable_by: SellableBy::Both,
            formats: Vec::new(),
            bone_options: Vec::new(),
            featured: false,
            in_stock: true,
            image_url: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn params(mode: &str, kg: &str) -> MinimumParams {
        MinimumParams {
            mode: Some(mode.to_string()),
            kg: Some(kg.to_string()),
        }
    }

    #[test]
    fn test_below_minimum_disables_add_to_cart() {
        let verdict = minimum_verdict(&entrana(), &params("weight", "0,5"));
        assert!(!verdict.ok);

        let html = verdict.render().unwrap();
        assert!(html.contains("El mínimo para este corte es 1 kg"));
        assert!(html.contains(r#"id="add-to-cart""#));
        assert!(html.contains(r#"hx-swap-oob="true""#));
        assert!(html.contains("disabled"));
    }

    #[test]
    fn test_minimum_met_enables_add_to_cart() {
        let verdict = minimum_verdict(&entrana(), &params("weight", "1"));
        assert!(verdict.ok);
        assert_eq!(verdict.message, "1 kg: $8.500");
        assert!(!verdict.render().unwrap().contains("disabled"));
    }

    #[test]
    fn test_invalid_weight_disables_add_to_cart() {
        let verdict = minimum_verdict(&entrana(), &params("weight", "mucho"));
        assert!(!verdict.ok);
        assert!(verdict.render().unwrap().contains("disabled"));
    }

    #[test]
    fn test_unit_mode_ignores_weight() {
        let verdict = minimum_verdict(&entrana(), &params("unit", "0,1"));
        assert!(verdict.ok);
        assert!(verdict.message.is_empty());
    }
}
