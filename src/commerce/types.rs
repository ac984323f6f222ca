use serde::{Deserialize, Serialize};

/// Shipping address
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
  pub name: String,
  #[serde(default)]
  pub company_name: Option<String>,
  pub street_address: String,
  pub city: String,
  pub state: String,
  pub country: String,
  #[serde(default)]
  pub post_code: Option<String>,
  #[serde(default)]
  pub phone_number: Option<String>,
}

impl Address {
  /// Single-line form for lists.
  pub fn one_line(&self) -> String {
    [
      self.street_address.as_str(),
      self.city.as_str(),
      self.state.as_str(),
      self.country.as_str(),
    ]
    .iter()
    .filter(|part| !part.is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join(", ")
  }
}

/// Product dimensions used for shipping quotes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductPackage {
  pub weight: i64,
  pub width: i64,
  pub length: i64,
  pub height: i64,
}

/// Catalog product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub product_id: String,
  pub name: String,
  pub price: i64,
  #[serde(default)]
  pub category: Option<String>,
  #[serde(default)]
  pub pictures: Vec<String>,
  #[serde(default)]
  pub tags: Vec<String>,
  #[serde(default)]
  pub package: Option<ProductPackage>,
  /// Stock; only create-product selects it, so absence must not clear it
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub quantity: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
  Pending,
  Packaging,
  Packaged,
  InTransit,
  Delivered,
  Failed,
  Cancelled,
  Unknown,
}

impl OrderStatus {
  pub fn from_wire(value: &str) -> Self {
    match value {
      "PENDING" => Self::Pending,
      "PACKAGING" => Self::Packaging,
      "PACKAGED" => Self::Packaged,
      "IN_TRANSIT" => Self::InTransit,
      "DELIVERED" => Self::Delivered,
      "FAILED" => Self::Failed,
      "CANCELLED" => Self::Cancelled,
      _ => Self::Unknown,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::Pending => "Pending",
      Self::Packaging => "Packaging",
      Self::Packaged => "Packaged",
      Self::InTransit => "In transit",
      Self::Delivered => "Delivered",
      Self::Failed => "Failed",
      Self::Cancelled => "Cancelled",
      Self::Unknown => "Unknown",
    }
  }
}

/// One product line of an order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderLine {
  pub product_id: String,
  #[serde(default)]
  pub name: Option<String>,
  pub price: i64,
  pub quantity: i64,
}

/// Customer order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
  pub order_id: String,
  pub user_id: String,
  pub status: OrderStatus,
  pub total: i64,
  pub created_date: String,
  #[serde(default)]
  pub modified_date: Option<String>,
  pub products: Vec<OrderLine>,
  pub address: Address,
  pub delivery_price: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PackagingStatus {
  #[default]
  New,
  InProgress,
  Completed,
}

impl PackagingStatus {
  /// Missing or unrecognized statuses count as `New`.
  pub fn from_wire(value: Option<&str>) -> Self {
    match value {
      Some("IN_PROGRESS") => Self::InProgress,
      Some("COMPLETED") => Self::Completed,
      _ => Self::New,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      Self::New => "New",
      Self::InProgress => "In progress",
      Self::Completed => "Completed",
    }
  }
}

/// One product line of a packaging request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingLine {
  pub product_id: String,
  pub quantity: i64,
}

/// Warehouse work item for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackagingRequest {
  pub order_id: String,
  pub status: PackagingStatus,
  pub products: Vec<PackagingLine>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
  #[default]
  New,
  InProgress,
  Completed,
  Failed,
}

impl DeliveryStatus {
  pub fn label(self) -> &'static str {
    match self {
      Self::New => "New",
      Self::InProgress => "In progress",
      Self::Completed => "Completed",
      Self::Failed => "Failed",
    }
  }
}

/// Driver work item for one order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Delivery {
  pub order_id: String,
  pub status: DeliveryStatus,
  pub address: Address,
}

/// Product line sent for a shipping quote or a new order
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutLine {
  pub product: Product,
  pub quantity: i64,
}

/// Input for create-product
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewProduct {
  pub name: String,
  pub category: String,
  pub price: i64,
  pub quantity: i64,
  pub package: ProductPackage,
  pub tags: Vec<String>,
  pub pictures: Vec<String>,
}

/// Where a product image should be uploaded
#[derive(Debug, Clone, PartialEq)]
pub struct PresignedUpload {
  pub upload_url: String,
  pub image_url: String,
}

/// Format an integer price for display.
pub fn format_price(amount: i64) -> String {
  format!("${}", amount)
}
