use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::Product;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct VariantInput {
    /// Existing variant to update in place. New variants leave it out.
    #[serde(default)]
    pub id: Option<Uuid>,
    pub name: String,
    #[serde(default)]
    pub price_modifier: i64,
    #[serde(default)]
    pub stock: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateProductRequest {
    pub name_es: String,
    pub name_en: Option<String>,
    pub description_es: Option<String>,
    pub description_en: Option<String>,
    pub category: String,
    pub color: Option<String>,
    pub price: i64,
    pub stock: i32,
    pub image_url: Option<String>,
    #[serde(default)]
    pub variants: Vec<VariantInput>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateProductRequest {
    pub name_es: Option<String>,
    pub name_en: Option<String>,
    pub description_es: Option<String>,
    pub description_en: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub price: Option<i64>,
    pub stock: Option<i32>,
    pub rating: Option<f64>,
    pub image_url: Option<String>,
    /// Syncs variants when present: entries with an id update in place, the rest are added,
    /// and variants left out are removed unless an order references them.
    pub variants: Option<Vec<VariantInput>>,
}

#[derive(Serialize, ToSchema)]
#[serde(transparent)]
pub struct ProductList {
    #[schema(value_type = Vec<Product>)]
    pub items: Vec<Product>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryCount {
    pub category: String,
    pub count: i64,
}
