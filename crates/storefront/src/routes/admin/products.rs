//! Product management route handlers.
//!
//! Every write invalidates the catalog cache so the storefront sees the
//! change on its next read.

use askama::Template;
use axum::{
    Form,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use tracing::instrument;

use carniceria_core::{
    BoneOption, Category, CutFormat, Kilograms, Money, Product, ProductId, SellableBy,
};

use crate::db::{ProductDraft, ProductRepository, RepositoryError};
use crate::middleware::RequireAdmin;
use crate::state::AppState;

use super::{AdminUserView, Fields, render};

/// Cut formats offered as checkboxes on the product form.
const FORMAT_CHOICES: [CutFormat; 7] = [
    CutFormat::Whole,
    CutFormat::Ground,
    CutFormat::Sliced(1),
    CutFormat::Sliced(2),
    CutFormat::Sliced(3),
    CutFormat::Milanesa,
    CutFormat::BreadedMilanesa,
];

/// Product row for the list page.
#[derive(Debug, Clone)]
pub struct ProductRowView {
    pub id: i32,
    pub name: String,
    pub category: &'static str,
    pub price: String,
    pub price_per_kilo: Option<String>,
    pub sellable_by: &'static str,
    pub featured: bool,
    pub in_stock: bool,
}

impl From<&Product> for ProductRowView {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.as_i32(),
            name: product.name.clone(),
            category: product.category.label(),
            price: product.price.to_string(),
            price_per_kilo: product.price_per_kilo.map(|p| p.to_string()),
            sellable_by: product.sellable_by.label(),
            featured: product.featured,
            in_stock: product.in_stock,
        }
    }
}

/// A checkbox or select choice.
#[derive(Debug, Clone)]
pub struct Choice {
    pub value: String,
    pub label: String,
    pub selected: bool,
}

/// Product form values, as typed.
#[derive(Debug, Clone, Default)]
pub struct ProductFormView {
    pub name: String,
    pub description: String,
    pub category: String,
    pub price: String,
    pub price_per_kilo: String,
    pub min_kg: String,
    pub sellable_by: String,
    pub formats: Vec<String>,
    pub bone_options: Vec<String>,
    pub featured: bool,
    pub in_stock: bool,
    pub image_url: String,
}

impl From<&Product> for ProductFormView {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            description: product.description.clone(),
            category: product.category.as_str().to_string(),
            price: product.price.amount().to_string(),
            price_per_kilo: product
                .price_per_kilo
                .map(|p| p.amount().to_string())
                .unwrap_or_default(),
            min_kg: product
                .min_kg
                .map(|kg| kg.value().to_string())
                .unwrap_or_default(),
            sellable_by: product.sellable_by.as_str().to_string(),
            formats: product.formats.iter().map(ToString::to_string).collect(),
            bone_options: product
                .bone_options
                .iter()
                .map(|b| b.as_str().to_string())
                .collect(),
            featured: product.featured,
            in_stock: product.in_stock,
            image_url: product.image_url.clone().unwrap_or_default(),
        }
    }
}

impl From<&Fields> for ProductFormView {
    fn from(fields: &Fields) -> Self {
        Self {
            name: fields.get("name").to_string(),
            description: fields.get("description").to_string(),
            category: fields.get("category").to_string(),
            price: fields.get("price").to_string(),
            price_per_kilo: fields.get("price_per_kilo").to_string(),
            min_kg: fields.get("min_kg").to_string(),
            sellable_by: fields.get("sellable_by").to_string(),
            formats: fields.all("formats").into_iter().map(String::from).collect(),
            bone_options: fields
                .all("bone_options")
                .into_iter()
                .map(String::from)
                .collect(),
            featured: fields.checked("featured"),
            in_stock: fields.checked("in_stock"),
            image_url: fields.get("image_url").to_string(),
        }
    }
}

impl ProductFormView {
    fn blank() -> Self {
        Self {
            category: Category::Beef.as_str().to_string(),
            sellable_by: SellableBy::Unit.as_str().to_string(),
            in_stock: true,
            ..Self::default()
        }
    }

    fn categories(&self) -> Vec<Choice> {
        Category::ALL
            .into_iter()
            .map(|c| Choice {
                value: c.as_str().to_string(),
                label: c.label().to_string(),
                selected: self.category == c.as_str(),
            })
            .collect()
    }

    fn selling_modes(&self) -> Vec<Choice> {
        SellableBy::ALL
            .into_iter()
            .map(|s| Choice {
                value: s.as_str().to_string(),
                label: s.label().to_string(),
                selected: self.sellable_by == s.as_str(),
            })
            .collect()
    }

    fn format_choices(&self) -> Vec<Choice> {
        FORMAT_CHOICES
            .into_iter()
            .map(|f| {
                let value = f.to_string();
                Choice {
                    selected: self.formats.contains(&value),
                    label: f.label(),
                    value,
                }
            })
            .collect()
    }

    fn bone_choices(&self) -> Vec<Choice> {
        BoneOption::ALL
            .into_iter()
            .map(|b| Choice {
                value: b.as_str().to_string(),
                label: b.label().to_string(),
                selected: self.bone_options.iter().any(|v| v == b.as_str()),
            })
            .collect()
    }
}

/// Validate the product form.
///
/// # Errors
///
/// Returns a Spanish message naming the first invalid field.
pub fn parse_product(fields: &Fields) -> Result<ProductDraft, String> {
    let name = fields
        .optional("name")
        .ok_or_else(|| "El nombre es obligatorio".to_string())?;
    let category: Category = fields
        .get("category")
        .parse()
        .map_err(|_| "Elegí una categoría".to_string())?;
    let sellable_by: SellableBy = fields
        .get("sellable_by")
        .parse()
        .map_err(|_| "Elegí cómo se vende".to_string())?;

    let price = match fields.get("price") {
        "" if !sellable_by.allows_unit() => Money::new(0),
        raw => raw
            .parse::<Money>()
            .map_err(|_| "El precio por unidad debe ser un número entero".to_string())?,
    };
    let price_per_kilo = match fields.get("price_per_kilo") {
        "" => None,
        raw => Some(
            raw.parse::<Money>()
                .map_err(|_| "El precio por kilo debe ser un número entero".to_string())?,
        ),
    };
    if sellable_by.allows_weight() && price_per_kilo.is_none() {
        return Err("Los productos por peso necesitan precio por kilo".to_string());
    }
    let min_kg = match fields.get("min_kg") {
        "" => None,
        raw => Some(raw.parse::<Kilograms>().map_err(|_| {
            "El mínimo debe ser un peso mayor a cero, por ejemplo 0,5".to_string()
        })?),
    };

    let formats = fields
        .all("formats")
        .into_iter()
        .map(str::parse::<CutFormat>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Formato desconocido: {e}"))?;
    let bone_options = fields
        .all("bone_options")
        .into_iter()
        .map(str::parse::<BoneOption>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("Opción de hueso desconocida: {e}"))?;

    Ok(ProductDraft {
        name,
        description: fields.get("description").to_string(),
        category,
        price,
        price_per_kilo,
        min_kg,
        sellable_by,
        formats,
        bone_options,
        featured: fields.checked("featured"),
        in_stock: fields.checked("in_stock"),
        image_url: fields.optional("image_url"),
    })
}

/// Products list page template.
#[derive(Template)]
#[template(path = "admin/products/index.html")]
pub struct ProductsIndexTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    pub products: Vec<ProductRowView>,
    pub error: Option<String>,
}

/// Product form page template.
#[derive(Template)]
#[template(path = "admin/products/form.html")]
pub struct ProductFormTemplate {
    pub admin_user: AdminUserView,
    pub current_path: String,
    /// `None` for a new product.
    pub product_id: Option<i32>,
    pub form: ProductFormView,
    pub categories: Vec<Choice>,
    pub selling_modes: Vec<Choice>,
    pub formats: Vec<Choice>,
    pub bones: Vec<Choice>,
    pub error: Option<String>,
}

impl ProductFormTemplate {
    fn new(
        admin: &carniceria_core::UserProfile,
        product_id: Option<i32>,
        form: ProductFormView,
        error: Option<String>,
    ) -> Self {
        Self {
            admin_user: AdminUserView::from(admin),
            current_path: "/admin/products".to_string(),
            product_id,
            categories: form.categories(),
            selling_modes: form.selling_modes(),
            formats: form.format_choices(),
            bones: form.bone_choices(),
            form,
            error,
        }
    }
}

/// Products list page handler.
#[instrument(skip(admin, state))]
pub async fn index(RequireAdmin(admin): RequireAdmin, State(state): State<AppState>) -> Response {
    let (products, error) = match ProductRepository::new(state.pool()).list_all().await {
        Ok(products) => (products.iter().map(ProductRowView::from).collect(), None),
        Err(e) => {
            tracing::error!("Failed to fetch products: {e}");
            (Vec::new(), Some("No se pudieron cargar los productos".to_string()))
        }
    };

    render(&ProductsIndexTemplate {
        admin_user: AdminUserView::from(&admin),
        current_path: "/admin/products".to_string(),
        products,
        error,
    })
}

/// New product form handler.
#[instrument(skip(admin))]
pub async fn new(RequireAdmin(admin): RequireAdmin) -> Response {
    render(&ProductFormTemplate::new(&admin, None, ProductFormView::blank(), None))
}

/// Create product handler.
#[instrument(skip(admin, state, fields))]
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let fields = Fields(fields);
    let draft = match parse_product(&fields) {
        Ok(draft) => draft,
        Err(message) => {
            let form = ProductFormView::from(&fields);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&ProductFormTemplate::new(&admin, None, form, Some(message))),
            )
                .into_response();
        }
    };

    match ProductRepository::new(state.pool()).create(&draft).await {
        Ok(product) => {
            state.catalog().invalidate().await;
            tracing::info!(product_id = %product.id, "Product created");
            Redirect::to("/admin/products").into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to create product");
            let form = ProductFormView::from(&fields);
            render(&ProductFormTemplate::new(
                &admin,
                None,
                form,
                Some("No se pudo guardar el producto".to_string()),
            ))
        }
    }
}

/// Edit product form handler.
#[instrument(skip(admin, state))]
pub async fn edit(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match ProductRepository::new(state.pool())
        .get_by_id(ProductId::new(id))
        .await
    {
        Ok(Some(product)) => render(&ProductFormTemplate::new(
            &admin,
            Some(id),
            ProductFormView::from(&product),
            None,
        )),
        Ok(None) => (StatusCode::NOT_FOUND, "Producto no encontrado").into_response(),
        Err(e) => {
            tracing::error!("Failed to fetch product: {e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo cargar el producto").into_response()
        }
    }
}

/// Update product handler.
#[instrument(skip(admin, state, fields))]
pub async fn update(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(fields): Form<Vec<(String, String)>>,
) -> Response {
    let fields = Fields(fields);
    let draft = match parse_product(&fields) {
        Ok(draft) => draft,
        Err(message) => {
            let form = ProductFormView::from(&fields);
            return (
                StatusCode::UNPROCESSABLE_ENTITY,
                render(&ProductFormTemplate::new(&admin, Some(id), form, Some(message))),
            )
                .into_response();
        }
    };

    match ProductRepository::new(state.pool())
        .update(ProductId::new(id), &draft)
        .await
    {
        Ok(_) => {
            state.catalog().invalidate().await;
            tracing::info!(product_id = id, "Product updated");
            Redirect::to("/admin/products").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Producto no encontrado").into_response()
        }
        Err(e) => {
            tracing::error!(product_id = id, error = %e, "Failed to update product");
            let form = ProductFormView::from(&fields);
            render(&ProductFormTemplate::new(
                &admin,
                Some(id),
                form,
                Some("No se pudo guardar el producto".to_string()),
            ))
        }
    }
}

/// Toggle stock handler.
#[instrument(skip(_admin, state))]
pub async fn toggle_stock(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match ProductRepository::new(state.pool())
        .toggle_stock(ProductId::new(id))
        .await
    {
        Ok(in_stock) => {
            state.catalog().invalidate().await;
            tracing::info!(product_id = id, in_stock, "Product stock toggled");
            Redirect::to("/admin/products").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Producto no encontrado").into_response()
        }
        Err(e) => {
            tracing::error!(product_id = id, error = %e, "Failed to toggle stock");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo cambiar el stock").into_response()
        }
    }
}

/// Delete product handler.
#[instrument(skip(_admin, state))]
pub async fn delete(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Response {
    match ProductRepository::new(state.pool())
        .delete(ProductId::new(id))
        .await
    {
        Ok(()) => {
            state.catalog().invalidate().await;
            tracing::info!(product_id = id, "Product deleted");
            Redirect::to("/admin/products").into_response()
        }
        Err(RepositoryError::NotFound) => {
            (StatusCode::NOT_FOUND, "Producto no encontrado").into_response()
        }
        Err(e) => {
            tracing::error!(product_id = id, error = %e, "Failed to delete product");
            (StatusCode::INTERNAL_SERVER_ERROR, "No se pudo borrar el producto").into_response()
        }
    }
}
