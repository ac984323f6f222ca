//! Serde types matching the storefront GraphQL payloads.
//!
//! These types are separate from domain types so wire quirks (camelCase,
//! missing statuses, bookkeeping rows) stay out of the rest of the client.

use serde::{Deserialize, Serialize};

use super::types::{
  Address, CheckoutLine, Delivery, DeliveryStatus, NewProduct, Order, OrderLine, OrderStatus,
  PackagingLine, PackagingRequest, PackagingStatus, PresignedUpload, Product, ProductPackage,
};

/// Product id the backend uses for per-request bookkeeping rows.
const METADATA_PRODUCT_ID: &str = "__metadata";

fn money(value: f64) -> i64 {
  value.round() as i64
}

// ============================================================================
// Shared nested types
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiAddress {
  #[serde(default)]
  pub name: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub company_name: Option<String>,
  #[serde(default)]
  pub street_address: String,
  #[serde(default)]
  pub city: String,
  #[serde(default)]
  pub state: String,
  #[serde(default)]
  pub country: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub post_code: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct ApiPackage {
  #[serde(default)]
  pub weight: Option<f64>,
  #[serde(default)]
  pub width: Option<f64>,
  #[serde(default)]
  pub length: Option<f64>,
  #[serde(default)]
  pub height: Option<f64>,
}

#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct ApiPackageInput {
  pub weight: i64,
  pub width: i64,
  pub length: i64,
  pub height: i64,
}

// ============================================================================
// Products
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProduct {
  pub product_id: String,
  #[serde(default)]
  pub name: String,
  #[serde(default)]
  pub price: f64,
  pub category: Option<String>,
  #[serde(default)]
  pub pictures: Option<Vec<String>>,
  #[serde(default)]
  pub tags: Option<Vec<String>>,
  pub package: Option<ApiPackage>,
  pub quantity: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiProductPage {
  #[serde(default)]
  pub products: Vec<ApiProduct>,
  pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiPresignedUrl {
  #[serde(rename = "uploadUrl")]
  pub upload_url: String,
  #[serde(rename = "imageUrl")]
  pub image_url: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiCreateProductResponse {
  pub success: bool,
  pub message: Option<String>,
  pub product: Option<ApiProduct>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreateProductInput {
  pub name: String,
  pub category: String,
  pub price: i64,
  pub quantity: i64,
  pub package: ApiPackageInput,
  pub tags: Vec<String>,
  pub pictures: Vec<String>,
}

// ============================================================================
// Orders
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrderLine {
  pub product_id: String,
  pub name: Option<String>,
  #[serde(default)]
  pub price: f64,
  #[serde(default)]
  pub quantity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrder {
  pub order_id: String,
  #[serde(default)]
  pub user_id: String,
  #[serde(default)]
  pub status: String,
  #[serde(default)]
  pub total: f64,
  #[serde(default)]
  pub created_date: String,
  pub modified_date: Option<String>,
  #[serde(default)]
  pub products: Vec<ApiOrderLine>,
  #[serde(default)]
  pub address: ApiAddress,
  #[serde(default)]
  pub delivery_price: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrderPage {
  #[serde(default)]
  pub orders: Vec<ApiOrder>,
  pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ApiCreateOrderResponse {
  pub success: bool,
  pub message: Option<String>,
  pub errors: Option<Vec<String>>,
  pub order: Option<ApiOrder>,
}

impl ApiCreateOrderResponse {
  /// Joined rejection reasons, preferring the per-field errors.
  pub fn rejection(&self) -> String {
    match &self.errors {
      Some(errors) if !errors.is_empty() => errors.join(", "),
      _ => self
        .message
        .clone()
        .unwrap_or_else(|| "The order was not accepted".to_string()),
    }
  }
}

/// Product line of a shipping quote request.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPricingLine {
  pub product_id: String,
  pub name: String,
  pub price: i64,
  pub quantity: i64,
  pub package: ApiPackageInput,
}

/// Product line of a new order. Carries the catalog fields the backend
/// copies onto the order.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiOrderProductInput {
  pub product_id: String,
  pub created_date: String,
  pub modified_date: String,
  pub name: String,
  pub price: i64,
  pub quantity: i64,
  pub category: String,
  pub tags: Vec<String>,
  pub pictures: Vec<String>,
  pub package: ApiPackageInput,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiCreateOrderInput {
  pub products: Vec<ApiOrderProductInput>,
  pub address: ApiAddress,
  pub delivery_price: i64,
  pub payment_token: String,
}

#[derive(Debug, Deserialize)]
pub struct ApiPricing {
  #[serde(default)]
  pub pricing: f64,
}

// ============================================================================
// Deliveries
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDelivery {
  pub order_id: String,
  #[serde(default)]
  pub address: ApiAddress,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiDeliveryPage {
  #[serde(default)]
  pub deliveries: Vec<ApiDelivery>,
  pub next_token: Option<String>,
}

// ============================================================================
// Packaging
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiIdPage {
  #[serde(default)]
  pub packaging_request_ids: Vec<String>,
  pub next_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPackagingLine {
  pub product_id: String,
  #[serde(default)]
  pub quantity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPackagingRequest {
  pub order_id: String,
  pub status: Option<String>,
  #[serde(default)]
  pub products: Vec<ApiPackagingLine>,
}

/// Reply of the status mutations.
#[derive(Debug, Deserialize)]
pub struct ApiSuccess {
  #[serde(default)]
  pub success: bool,
}

// ============================================================================
// Conversions to domain types
// ============================================================================

impl From<ApiAddress> for Address {
  fn from(a: ApiAddress) -> Self {
    Address {
      name: a.name,
      company_name: a.company_name,
      street_address: a.street_address,
      city: a.city,
      state: a.state,
      country: a.country,
      post_code: a.post_code,
      phone_number: a.phone_number,
    }
  }
}

impl From<&Address> for ApiAddress {
  fn from(a: &Address) -> Self {
    ApiAddress {
      name: a.name.clone(),
      company_name: a.company_name.clone(),
      street_address: a.street_address.clone(),
      city: a.city.clone(),
      state: a.state.clone(),
      country: a.country.clone(),
      post_code: a.post_code.clone(),
      phone_number: a.phone_number.clone(),
    }
  }
}

impl From<ApiPackage> for ProductPackage {
  fn from(p: ApiPackage) -> Self {
    ProductPackage {
      weight: p.weight.map(money).unwrap_or_default(),
      width: p.width.map(money).unwrap_or_default(),
      length: p.length.map(money).unwrap_or_default(),
      height: p.height.map(money).unwrap_or_default(),
    }
  }
}

impl From<ProductPackage> for ApiPackageInput {
  fn from(p: ProductPackage) -> Self {
    ApiPackageInput {
      weight: p.weight,
      width: p.width,
      length: p.length,
      height: p.height,
    }
  }
}

impl From<ApiProduct> for Product {
  fn from(p: ApiProduct) -> Self {
    Product {
      product_id: p.product_id,
      name: p.name,
      price: money(p.price),
      category: p.category,
      pictures: p.pictures.unwrap_or_default(),
      tags: p.tags.unwrap_or_default(),
      package: p.package.map(ProductPackage::from),
      quantity: p.quantity.map(money),
    }
  }
}

impl From<ApiOrder> for Order {
  fn from(o: ApiOrder) -> Self {
    Order {
      order_id: o.order_id,
      user_id: o.user_id,
      status: OrderStatus::from_wire(&o.status),
      total: money(o.total),
      created_date: o.created_date,
      modified_date: o.modified_date,
      products: o
        .products
        .into_iter()
        .map(|l| OrderLine {
          product_id: l.product_id,
          name: l.name,
          price: money(l.price),
          quantity: money(l.quantity),
        })
        .collect(),
      address: o.address.into(),
      delivery_price: money(o.delivery_price),
    }
  }
}

impl ApiDelivery {
  /// Deliveries carry no status on the wire; the caller supplies it.
  pub fn into_delivery(self, status: DeliveryStatus) -> Delivery {
    Delivery {
      order_id: self.order_id,
      status,
      address: self.address.into(),
    }
  }
}

impl From<ApiPackagingRequest> for PackagingRequest {
  fn from(r: ApiPackagingRequest) -> Self {
    PackagingRequest {
      order_id: r.order_id,
      status: PackagingStatus::from_wire(r.status.as_deref()),
      products: r
        .products
        .into_iter()
        .filter(|l| l.product_id != METADATA_PRODUCT_ID)
        .map(|l| PackagingLine {
          product_id: l.product_id,
          quantity: money(l.quantity),
        })
        .collect(),
    }
  }
}

impl From<ApiPresignedUrl> for PresignedUpload {
  fn from(p: ApiPresignedUrl) -> Self {
    PresignedUpload {
      upload_url: p.upload_url,
      image_url: p.image_url,
    }
  }
}

// ============================================================================
// Conversions from domain input
// ============================================================================

impl From<&CheckoutLine> for ApiPricingLine {
  fn from(line: &CheckoutLine) -> Self {
    ApiPricingLine {
      product_id: line.product.product_id.clone(),
      name: line.product.name.clone(),
      price: line.product.price,
      quantity: line.quantity,
      package: line.product.package.unwrap_or_default().into(),
    }
  }
}

impl ApiOrderProductInput {
  /// `now` stands in for catalog timestamps the cart does not keep.
  pub fn from_line(line: &CheckoutLine, now: &str) -> Self {
    let product = &line.product;
    ApiOrderProductInput {
      product_id: product.product_id.clone(),
      created_date: now.to_string(),
      modified_date: now.to_string(),
      name: product.name.clone(),
      price: product.price,
      quantity: line.quantity,
      category: product
        .category
        .clone()
        .unwrap_or_else(|| "General".to_string()),
      tags: product.tags.clone(),
      pictures: product.pictures.clone(),
      package: product.package.unwrap_or_default().into(),
    }
  }
}

impl From<&NewProduct> for ApiCreateProductInput {
  fn from(p: &NewProduct) -> Self {
    ApiCreateProductInput {
      name: p.name.clone(),
      category: p.category.clone(),
      price: p.price,
      quantity: p.quantity,
      package: p.package.into(),
      tags: p.tags.clone(),
      pictures: p.pictures.clone(),
    }
  }
}
