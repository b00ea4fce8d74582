//! Catalog search, filtering and sorting.
//!
//! Everything here works on an in-memory slice of products. The whole
//! catalog of a butcher shop fits comfortably in memory, so there is no
//! index and no pagination.

use std::cmp::Ordering;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::{BoneOption, Category, Product, UnknownVariant};

/// Listing order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortOrder {
    #[default]
    Name,
    PriceAsc,
    PriceDesc,
}

impl SortOrder {
    pub const ALL: [Self; 3] = [Self::Name, Self::PriceAsc, Self::PriceDesc];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
        }
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Name => "Nombre",
            Self::PriceAsc => "Menor precio",
            Self::PriceDesc => "Mayor precio",
        }
    }
}

impl FromStr for SortOrder {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|order| order.as_str() == s)
            .ok_or_else(|| UnknownVariant::new("sort", s))
    }
}

/// Shopper-supplied catalog criteria.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogQuery {
    pub search: Option<String>,
    pub category: Option<Category>,
    pub bone: Option<BoneOption>,
    pub sort: SortOrder,
}

impl CatalogQuery {
    /// Build a query from raw query-string values, ignoring anything that
    /// does not parse.
    #[must_use]
    pub fn from_params(
        search: Option<&str>,
        category: Option<&str>,
        bone: Option<&str>,
        sort: Option<&str>,
    ) -> Self {
        Self {
            search: search
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned),
            category: category.and_then(|c| c.parse().ok()),
            bone: bone.and_then(|b| b.parse().ok()),
            sort: sort.and_then(|s| s.parse().ok()).unwrap_or_default(),
        }
    }

    fn matches(&self, product: &Product, needle: Option<&str>) -> bool {
        if let Some(category) = self.category
            && product.category != category
        {
            return false;
        }
        if let Some(bone) = self.bone
            && !product.bone_options.contains(&bone)
        {
            return false;
        }
        needle.is_none_or(|needle| {
            fold(&product.name).contains(needle) || fold(&product.description).contains(needle)
        })
    }

    /// Filter and sort `products`.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let needle = self.search.as_deref().map(fold);
        let mut matched: Vec<&Product> = products
            .iter()
            .filter(|p| self.matches(p, needle.as_deref()))
            .collect();

        match self.sort {
            SortOrder::Name => matched.sort_by(|a, b| by_name(a, b)),
            SortOrder::PriceAsc => matched.sort_by(|a, b| by_price(a, b)),
            SortOrder::PriceDesc => {
                matched.sort_by(|a, b| by_price(a, b));
                matched.reverse();
            }
        }
        matched
    }
}

fn by_name(a: &Product, b: &Product) -> Ordering {
    fold(&a.name)
        .cmp(&fold(&b.name))
        .then_with(|| a.id.as_i32().cmp(&b.id.as_i32()))
}

fn by_price(a: &Product, b: &Product) -> Ordering {
    a.display_price()
        .cmp(&b.display_price())
        .then_with(|| by_name(a, b))
}

/// Featured products, in name order.
#[must_use]
pub fn featured(products: &[Product]) -> Vec<&Product> {
    let mut list: Vec<&Product> = products.iter().filter(|p| p.featured).collect();
    list.sort_by(|a, b| by_name(a, b));
    list
}

/// Products of one category, in name order.
#[must_use]
pub fn by_category(products: &[Product], category: Category) -> Vec<&Product> {
    CatalogQuery {
        category: Some(category),
        ..CatalogQuery::default()
    }
    .apply(products)
}

/// Lowercase and strip Spanish diacritics, for accent-insensitive matching.
///
/// ```
/// use carniceria_core::catalog::fold;
///
/// assert_eq!(fold("Ñandú a la PARRILLA"), "nandu a la parrilla");
/// ```
#[must_use]
pub fn fold(text: &str) -> String {
    text.chars()
        .flat_map(char::to_lowercase)
        .map(|ch| match ch {
            'á' | 'à' | 'ä' | 'â' => 'a',
            'é' | 'è' | 'ë' | 'ê' => 'e',
            'í' | 'ì' | 'ï' | 'î' => 'i',
            'ó' | 'ò' | 'ö' | 'ô' => 'o',
            'ú' | 'ù' | 'ü' | 'û' => 'u',
            'ñ' => 'n',
            'ç' => 'c',
            other => other,
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::test_support::product;

    fn catalog() -> Vec<Product> {
        let mut asado = product(1, "Asado de Tira", 9000);
        asado.bone_options = vec![BoneOption::WithBone];
        let mut bondiola = product(2, "Bondiola", 7500);
        bondiola.category = Category::Pork;
        bondiola.description = "Ideal para la parrilla".into();
        let mut pollo = product(3, "Pollo entero", 4000);
        pollo.category = Category::Chicken;
        pollo.featured = true;
        let mut matambre = product(4, "Matambre", 7500);
        matambre.description = "Para hacer arrollado".into();
        let mut cordero = product(5, "Ñandú de cordero", 12000);
        cordero.category = Category::Lamb;
        vec![asado, bondiola, pollo, matambre, cordero]
    }

    fn names(list: &[&Product]) -> Vec<String> {
        list.iter().map(|p| p.name.clone()).collect()
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let products = catalog();
        let query = CatalogQuery::from_params(Some("ASADO"), None, None, None);
        assert_eq!(names(&query.apply(&products)), ["Asado de Tira"]);
    }

    #[test]
    fn test_search_ignores_accents_and_reads_description() {
        let products = catalog();
        let query = CatalogQuery::from_params(Some("nandu"), None, None, None);
        assert_eq!(names(&query.apply(&products)), ["Ñandú de cordero"]);

        let query = CatalogQuery::from_params(Some("parrilla"), None, None, None);
        assert_eq!(names(&query.apply(&products)), ["Bondiola"]);
    }

    #[test]
    fn test_filters_by_category_and_bone() {
        let products = catalog();
        assert_eq!(names(&by_category(&products, Category::Pork)), ["Bondiola"]);

        let query = CatalogQuery::from_params(None, None, Some("with_bone"), None);
        assert_eq!(names(&query.apply(&products)), ["Asado de Tira"]);
    }

    #[test]
    fn test_default_sort_is_folded_name() {
        let products = catalog();
        let all = CatalogQuery::default().apply(&products);
        assert_eq!(
            names(&all),
            ["Asado de Tira", "Bondiola", "Matambre", "Ñandú de cordero", "Pollo entero"]
        );
    }

    #[test]
    fn test_price_orders_are_exact_reverses() {
        let products = catalog();
        let asc = CatalogQuery::from_params(None, None, None, Some("price-asc")).apply(&products);
        let mut desc =
            CatalogQuery::from_params(None, None, None, Some("price-desc")).apply(&products);
        assert_eq!(asc.first().unwrap().name, "Pollo entero");
        desc.reverse();
        assert_eq!(names(&asc), names(&desc));
    }

    #[test]
    fn test_unknown_params_are_ignored() {
        let query = CatalogQuery::from_params(Some("  "), Some("fish"), Some("x"), Some("random"));
        assert_eq!(query, CatalogQuery::default());
    }

    #[test]
    fn test_featured_only() {
        let products = catalog();
        assert_eq!(names(&featured(&products)), ["Pollo entero"]);
    }
}
