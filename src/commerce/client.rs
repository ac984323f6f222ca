//! Storefront client: typed operations over the gateway, backed by the
//! normalized cache.

use chrono::Utc;
use serde_json::json;
use tracing::{debug, info};

use crate::cache::{CacheError, Cacheable, NormalizedCache, Page};
use crate::gateway::{Gateway, GatewayError, Operation};
use crate::sync::{self, ListId, ReconcileReport, StatusEntity, Transition};

use super::api_types::{
  ApiAddress, ApiCreateOrderInput, ApiCreateOrderResponse, ApiCreateProductInput,
  ApiCreateProductResponse, ApiDelivery, ApiDeliveryPage, ApiIdPage, ApiOrder, ApiOrderPage,
  ApiOrderProductInput, ApiPackagingRequest, ApiPresignedUrl, ApiPricing, ApiPricingLine,
  ApiProduct, ApiProductPage, ApiSuccess,
};
use super::keys::CommerceQueryKey;
use super::operations as ops;
use super::types::{
  Address, CheckoutLine, Delivery, DeliveryStatus, NewProduct, Order, PackagingRequest,
  PresignedUpload, Product,
};

fn cache_error(e: CacheError) -> GatewayError {
  GatewayError::Decode(e.to_string())
}

/// A product image read from disk, ready to upload.
#[derive(Debug, Clone)]
pub struct ImageUpload {
  pub filename: String,
  pub content_type: String,
  pub bytes: Vec<u8>,
}

/// Storefront client with a shared normalized cache.
///
/// Fetch methods write into the cache and return nothing; views read the
/// cache through the `cached_*` methods. Mutations return their result and,
/// on success only, reconcile the cache.
#[derive(Clone)]
pub struct CommerceClient {
  gateway: Gateway,
  cache: NormalizedCache,
}

impl CommerceClient {
  pub fn new(gateway: Gateway, cache: NormalizedCache) -> Self {
    Self { gateway, cache }
  }

  pub fn cache(&self) -> &NormalizedCache {
    &self.cache
  }

  // ==========================================================================
  // Products
  // ==========================================================================

  pub async fn fetch_products(&self, next_token: Option<String>) -> Result<(), GatewayError> {
    let page: ApiProductPage = self
      .gateway
      .execute(&ops::GET_PRODUCTS, &json!({ "nextToken": next_token }))
      .await?;

    let page = Page::new(
      page.products.into_iter().map(Product::from).collect(),
      page.next_token,
    );
    self
      .cache
      .write_page(&CommerceQueryKey::Products, &page, next_token.as_deref())
      .map_err(cache_error)
  }

  pub fn cached_products(&self) -> Option<Page<Product>> {
    self.cache.read_list(&CommerceQueryKey::Products)
  }

  pub async fn fetch_product(&self, product_id: &str) -> Result<(), GatewayError> {
    let product: Option<ApiProduct> = self
      .gateway
      .execute(&ops::GET_PRODUCT, &json!({ "productId": product_id }))
      .await?;

    let product = product
      .map(Product::from)
      .ok_or_else(|| GatewayError::Validation(format!("Product {} was not found", product_id)))?;

    self
      .cache
      .write_entity(
        &CommerceQueryKey::Product {
          product_id: product_id.to_string(),
        },
        &product,
      )
      .map_err(cache_error)
  }

  pub fn cached_product(&self, product_id: &str) -> Option<Product> {
    self.cache.read_entity(&CommerceQueryKey::Product {
      product_id: product_id.to_string(),
    })
  }

  pub async fn get_presigned_upload_url(
    &self,
    filename: &str,
    content_type: &str,
  ) -> Result<PresignedUpload, GatewayError> {
    let presigned: ApiPresignedUrl = self
      .gateway
      .execute(
        &ops::GET_PRESIGNED_URL,
        &json!({ "filename": filename, "contentType": content_type }),
      )
      .await?;
    Ok(presigned.into())
  }

  /// Create a product, uploading its image first when one is given.
  pub async fn create_product(
    &self,
    mut product: NewProduct,
    image: Option<ImageUpload>,
  ) -> Result<Option<Product>, GatewayError> {
    if let Some(image) = image {
      let presigned = self
        .get_presigned_upload_url(&image.filename, &image.content_type)
        .await?;
      self
        .gateway
        .upload(&presigned.upload_url, &image.content_type, image.bytes)
        .await?;
      product.pictures = vec![presigned.image_url];
    }

    let input = ApiCreateProductInput::from(&product);
    let response: ApiCreateProductResponse = self
      .gateway
      .execute(&ops::CREATE_PRODUCT, &json!({ "input": input }))
      .await?;

    if !response.success {
      return Err(GatewayError::Validation(
        response
          .message
          .unwrap_or_else(|| "Failed to create product".to_string()),
      ));
    }

    let created = response.product.map(Product::from);
    if let Some(created) = &created {
      info!(product_id = %created.product_id, "Product created");
      sync::record_created(&self.cache, ListId::Products, created);
    }
    Ok(created)
  }

  // ==========================================================================
  // Orders
  // ==========================================================================

  pub async fn fetch_orders(&self, next_token: Option<String>) -> Result<(), GatewayError> {
    let page: ApiOrderPage = self
      .gateway
      .execute(&ops::GET_ORDERS, &json!({ "nextToken": next_token }))
      .await?;

    let page = Page::new(
      page.orders.into_iter().map(Order::from).collect(),
      page.next_token,
    );
    self
      .cache
      .write_page(&CommerceQueryKey::Orders, &page, next_token.as_deref())
      .map_err(cache_error)
  }

  pub fn cached_orders(&self) -> Option<Page<Order>> {
    self.cache.read_list(&CommerceQueryKey::Orders)
  }

  pub async fn fetch_order(&self, order_id: &str) -> Result<(), GatewayError> {
    let order: Option<ApiOrder> = self
      .gateway
      .execute(&ops::GET_ORDER, &json!({ "orderId": order_id }))
      .await?;

    let order = order
      .map(Order::from)
      .ok_or_else(|| GatewayError::Validation(format!("Order {} was not found", order_id)))?;

    self
      .cache
      .write_entity(
        &CommerceQueryKey::Order {
          order_id: order_id.to_string(),
        },
        &order,
      )
      .map_err(cache_error)
  }

  pub fn cached_order(&self, order_id: &str) -> Option<Order> {
    self.cache.read_entity(&CommerceQueryKey::Order {
      order_id: order_id.to_string(),
    })
  }

  /// Shipping quote for the given cart lines.
  pub async fn fetch_delivery_pricing(
    &self,
    lines: &[CheckoutLine],
    address: &Address,
  ) -> Result<i64, GatewayError> {
    let products: Vec<ApiPricingLine> = lines.iter().map(ApiPricingLine::from).collect();
    let pricing: ApiPricing = self
      .gateway
      .execute(
        &ops::GET_DELIVERY_PRICING,
        &json!({ "input": { "products": products, "address": ApiAddress::from(address) } }),
      )
      .await?;
    Ok(pricing.pricing.round() as i64)
  }

  /// Place an order. `success: false` replies become validation errors
  /// carrying the server's reasons.
  pub async fn create_order(
    &self,
    lines: &[CheckoutLine],
    address: &Address,
    delivery_price: i64,
    payment_token: &str,
  ) -> Result<Order, GatewayError> {
    let now = Utc::now().to_rfc3339();
    let input = ApiCreateOrderInput {
      products: lines
        .iter()
        .map(|line| ApiOrderProductInput::from_line(line, &now))
        .collect(),
      address: address.into(),
      delivery_price,
      payment_token: payment_token.to_string(),
    };

    let response: ApiCreateOrderResponse = self
      .gateway
      .execute(&ops::CREATE_ORDER, &json!({ "order": input }))
      .await?;

    if !response.success {
      return Err(GatewayError::Validation(response.rejection()));
    }

    let order = response
      .order
      .map(Order::from)
      .ok_or_else(|| GatewayError::Decode("createOrder succeeded without an order".to_string()))?;

    info!(order_id = %order.order_id, "Order created");
    sync::record_created(&self.cache, ListId::Orders, &order);
    Ok(order)
  }

  // ==========================================================================
  // Deliveries
  // ==========================================================================

  async fn fetch_delivery_list(
    &self,
    operation: &Operation,
    list: ListId,
    status: DeliveryStatus,
    next_token: Option<String>,
  ) -> Result<(), GatewayError> {
    let page: ApiDeliveryPage = self
      .gateway
      .execute(operation, &json!({ "nextToken": next_token }))
      .await?;

    let page = Page::new(
      page
        .deliveries
        .into_iter()
        .map(|d| d.into_delivery(status))
        .collect(),
      page.next_token,
    );
    self
      .cache
      .write_page(&list.query_key(), &page, next_token.as_deref())
      .map_err(cache_error)
  }

  pub async fn fetch_new_deliveries(&self, next_token: Option<String>) -> Result<(), GatewayError> {
    self
      .fetch_delivery_list(
        &ops::GET_NEW_DELIVERIES,
        ListId::NewDeliveries,
        DeliveryStatus::New,
        next_token,
      )
      .await
  }

  pub async fn fetch_in_progress_deliveries(
    &self,
    next_token: Option<String>,
  ) -> Result<(), GatewayError> {
    self
      .fetch_delivery_list(
        &ops::GET_IN_PROGRESS_DELIVERIES,
        ListId::InProgressDeliveries,
        DeliveryStatus::InProgress,
        next_token,
      )
      .await
  }

  pub fn cached_deliveries(&self, list: ListId) -> Option<Page<Delivery>> {
    self.cache.read_list(&list.query_key())
  }

  /// Fetch one delivery. The payload has no status, so the cached status
  /// is kept, or `initial_status` when the delivery was never cached.
  pub async fn fetch_delivery(
    &self,
    order_id: &str,
    initial_status: DeliveryStatus,
  ) -> Result<(), GatewayError> {
    let delivery: Option<ApiDelivery> = self
      .gateway
      .execute(&ops::GET_DELIVERY, &json!({ "input": { "orderId": order_id } }))
      .await?;

    let delivery = delivery
      .ok_or_else(|| GatewayError::Validation(format!("Delivery {} was not found", order_id)))?;

    let status = self
      .cache
      .read_entity_by_key::<Delivery>(order_id)
      .map(|d| d.status)
      .unwrap_or(initial_status);

    self
      .cache
      .write_entity(
        &CommerceQueryKey::Delivery {
          order_id: order_id.to_string(),
        },
        &delivery.into_delivery(status),
      )
      .map_err(cache_error)
  }

  pub fn cached_delivery(&self, order_id: &str) -> Option<Delivery> {
    self.cache.read_entity(&CommerceQueryKey::Delivery {
      order_id: order_id.to_string(),
    })
  }

  pub async fn start_delivery(&self, order_id: &str) -> Result<ReconcileReport, GatewayError> {
    self
      .transition::<Delivery>(&ops::START_DELIVERY, &sync::START_DELIVERY, order_id)
      .await
  }

  pub async fn complete_delivery(&self, order_id: &str) -> Result<ReconcileReport, GatewayError> {
    self
      .transition::<Delivery>(&ops::COMPLETE_DELIVERY, &sync::COMPLETE_DELIVERY, order_id)
      .await
  }

  pub async fn fail_delivery(&self, order_id: &str) -> Result<ReconcileReport, GatewayError> {
    self
      .transition::<Delivery>(&ops::FAIL_DELIVERY, &sync::FAIL_DELIVERY, order_id)
      .await
  }

  // ==========================================================================
  // Packaging
  // ==========================================================================

  async fn fetch_id_list(
    &self,
    operation: &Operation,
    list: ListId,
    next_token: Option<String>,
  ) -> Result<(), GatewayError> {
    let page: ApiIdPage = self
      .gateway
      .execute(operation, &json!({ "nextToken": next_token }))
      .await?;

    self.cache.write_key_page(
      &list.query_key(),
      PackagingRequest::entity_type(),
      page.packaging_request_ids,
      page.next_token,
      next_token.as_deref(),
    );
    Ok(())
  }

  pub async fn fetch_new_packaging_ids(
    &self,
    next_token: Option<String>,
  ) -> Result<(), GatewayError> {
    self
      .fetch_id_list(&ops::GET_NEW_PACKAGING_REQUEST_IDS, ListId::NewPackaging, next_token)
      .await
  }

  pub async fn fetch_completed_packaging_ids(
    &self,
    next_token: Option<String>,
  ) -> Result<(), GatewayError> {
    self
      .fetch_id_list(
        &ops::GET_COMPLETED_PACKAGING_REQUEST_IDS,
        ListId::CompletedPackaging,
        next_token,
      )
      .await
  }

  pub fn cached_packaging_ids(&self, list: ListId) -> Option<Page<String>> {
    self.cache.read_list_keys(&list.query_key())
  }

  pub async fn fetch_packaging_request(&self, order_id: &str) -> Result<(), GatewayError> {
    let request: Option<ApiPackagingRequest> = self
      .gateway
      .execute(
        &ops::GET_PACKAGING_REQUEST,
        &json!({ "input": { "orderId": order_id } }),
      )
      .await?;

    let request = request.map(PackagingRequest::from).ok_or_else(|| {
      GatewayError::Validation(format!("Packaging request {} was not found", order_id))
    })?;

    self
      .cache
      .write_entity(
        &CommerceQueryKey::PackagingRequest {
          order_id: order_id.to_string(),
        },
        &request,
      )
      .map_err(cache_error)
  }

  pub fn cached_packaging_request(&self, order_id: &str) -> Option<PackagingRequest> {
    self.cache.read_entity(&CommerceQueryKey::PackagingRequest {
      order_id: order_id.to_string(),
    })
  }

  pub async fn start_packaging(&self, order_id: &str) -> Result<ReconcileReport, GatewayError> {
    self
      .transition::<PackagingRequest>(&ops::START_PACKAGING, &sync::START_PACKAGING, order_id)
      .await
  }

  pub async fn complete_packaging(&self, order_id: &str) -> Result<ReconcileReport, GatewayError> {
    self
      .transition::<PackagingRequest>(
        &ops::COMPLETE_PACKAGING,
        &sync::COMPLETE_PACKAGING,
        order_id,
      )
      .await
  }

  /// Record that `quantity` units of a product were packed.
  ///
  /// The backend declares this mutation without resolving it, so progress
  /// stays in the packaging screen and nothing is sent.
  pub fn record_packing_progress(&self, order_id: &str, product_id: &str, quantity: i64) {
    debug!(
      operation = ops::UPDATE_PACKAGING_PRODUCT.name,
      order_id, product_id, quantity, "Packing progress kept local"
    );
  }

  // ==========================================================================
  // Shared
  // ==========================================================================

  /// Run a status mutation and reconcile the cache if the server accepted it.
  async fn transition<E: StatusEntity>(
    &self,
    operation: &Operation,
    transition: &Transition<E::Status>,
    order_id: &str,
  ) -> Result<ReconcileReport, GatewayError> {
    let reply: ApiSuccess = self
      .gateway
      .execute(operation, &json!({ "input": { "orderId": order_id } }))
      .await?;

    if !reply.success {
      return Err(GatewayError::StateConflict(format!(
        "The server did not accept {} for order {}",
        transition.name, order_id
      )));
    }

    info!(transition = transition.name, order_id, "Transition accepted");
    Ok(sync::reconcile::<E>(&self.cache, transition, order_id))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::PatchOutcome;
  use crate::commerce::types::{PackagingStatus, ProductPackage};
  use crate::gateway::testing::{FixedCredential, ScriptedTransport};
  use crate::gateway::AuthScheme;
  use serde_json::Value;
  use std::sync::Arc;

  fn client(transport: &Arc<ScriptedTransport>) -> CommerceClient {
    let gateway = Gateway::new(
      transport.clone(),
      Arc::new(FixedCredential(Some("token".into()))),
      AuthScheme::Raw,
    );
    CommerceClient::new(gateway, NormalizedCache::new())
  }

  fn product_json(id: &str) -> Value {
    json!({ "productId": id, "name": format!("Product {}", id), "price": 10 })
  }

  fn delivery_json(id: &str) -> Value {
    json!({ "orderId": id, "address": { "name": "N", "streetAddress": "1 Main", "city": "C", "state": "S", "country": "USA" } })
  }

  #[tokio::test]
  async fn test_products_pages_replace_then_append() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getProducts": { "products": [product_json("a"), product_json("b")], "nextToken": "t1" } }));
    transport.reply_data(json!({ "getProducts": { "products": [product_json("c")], "nextToken": null } }));
    transport.reply_data(json!({ "getProducts": { "products": [product_json("z")], "nextToken": "t5" } }));

    let client = client(&transport);
    client.fetch_products(None).await.unwrap();
    client.fetch_products(Some("t1".into())).await.unwrap();

    let page = client.cached_products().unwrap();
    let ids: Vec<_> = page.items.iter().map(|p| p.product_id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
    assert_eq!(page.next_token, None);
    assert_eq!(transport.requests()[1].body["variables"]["nextToken"], "t1");

    client.fetch_products(None).await.unwrap();
    let page = client.cached_products().unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.next_token.as_deref(), Some("t5"));
  }

  #[tokio::test]
  async fn test_start_packaging_reconciles_on_success() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getNewPackagingRequestIds": { "packagingRequestIds": ["A", "B"], "nextToken": null } }));
    transport.reply_data(json!({ "getPackagingRequest": { "orderId": "A", "status": "NEW", "products": [
      { "productId": "__metadata", "quantity": 0 },
      { "productId": "p1", "quantity": 1 }
    ] } }));
    transport.reply_data(json!({ "startPackaging": { "success": true } }));

    let client = client(&transport);
    client.fetch_new_packaging_ids(None).await.unwrap();
    client.fetch_packaging_request("A").await.unwrap();
    assert_eq!(client.cached_packaging_request("A").unwrap().products.len(), 1);

    let report = client.start_packaging("A").await.unwrap();
    assert_eq!(report.entity, PatchOutcome::Applied);

    assert_eq!(
      client.cached_packaging_ids(ListId::NewPackaging).unwrap().items,
      vec!["B"]
    );
    assert_eq!(
      client.cached_packaging_request("A").unwrap().status,
      PackagingStatus::InProgress
    );
    assert_eq!(
      transport.requests()[2].body["variables"]["input"]["orderId"],
      "A"
    );
  }

  #[tokio::test]
  async fn test_rejected_mutation_leaves_cache_unchanged() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getInProgressDeliveries": { "deliveries": [delivery_json("X"), delivery_json("Y")], "nextToken": null } }));
    transport.reply_status(
      200,
      json!({ "data": { "failDelivery": null }, "errors": [{ "message": "Order status is not IN_PROGRESS" }] }),
    );
    transport.reply_data(json!({ "completeDelivery": { "success": false } }));

    let client = client(&transport);
    client.fetch_in_progress_deliveries(None).await.unwrap();
    let before = client.cache().snapshot();

    let err = client.fail_delivery("X").await.unwrap_err();
    assert!(matches!(err, GatewayError::StateConflict(_)));
    assert_eq!(client.cache().snapshot(), before);

    let err = client.complete_delivery("X").await.unwrap_err();
    assert!(matches!(err, GatewayError::StateConflict(_)));
    assert_eq!(client.cache().snapshot(), before);
  }

  #[tokio::test]
  async fn test_fail_delivery_scenario() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getInProgressDeliveries": { "deliveries": [delivery_json("X"), delivery_json("Y")], "nextToken": null } }));
    transport.reply_data(json!({ "getDelivery": delivery_json("X") }));
    transport.reply_data(json!({ "failDelivery": { "success": true } }));

    let client = client(&transport);
    client.fetch_in_progress_deliveries(None).await.unwrap();
    client
      .fetch_delivery("X", DeliveryStatus::New)
      .await
      .unwrap();
    // The cached status wins over the status the screen was opened with.
    assert_eq!(
      client.cached_delivery("X").unwrap().status,
      DeliveryStatus::InProgress
    );

    client.fail_delivery("X").await.unwrap();

    let remaining: Vec<_> = client
      .cached_deliveries(ListId::InProgressDeliveries)
      .unwrap()
      .items
      .into_iter()
      .map(|d| d.order_id)
      .collect();
    assert_eq!(remaining, vec!["Y"]);
    assert_eq!(client.cached_delivery("X").unwrap().status, DeliveryStatus::Failed);
  }

  #[tokio::test]
  async fn test_fetch_delivery_uses_initial_status_when_uncached() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getDelivery": delivery_json("Q") }));

    let client = client(&transport);
    client
      .fetch_delivery("Q", DeliveryStatus::InProgress)
      .await
      .unwrap();
    assert_eq!(
      client.cached_delivery("Q").unwrap().status,
      DeliveryStatus::InProgress
    );
  }

  #[tokio::test]
  async fn test_create_order_rejection_and_success() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getOrders": { "orders": [], "nextToken": null } }));
    transport.reply_data(json!({ "createOrder": { "success": false, "message": "Invalid", "errors": ["phone required"], "order": null } }));
    transport.reply_data(json!({ "createOrder": { "success": true, "order": {
      "orderId": "o9", "userId": "u1", "status": "PENDING", "total": 25,
      "createdDate": "2024-05-01T10:00:00Z", "products": [], "address": {}, "deliveryPrice": 5
    } } }));

    let client = client(&transport);
    client.fetch_orders(None).await.unwrap();

    let lines = vec![CheckoutLine {
      product: Product {
        product_id: "p1".into(),
        name: "Mug".into(),
        price: 10,
        category: None,
        pictures: Vec::new(),
        tags: Vec::new(),
        package: Some(ProductPackage {
          weight: 1,
          width: 2,
          length: 3,
          height: 4,
        }),
        quantity: None,
      },
      quantity: 2,
    }];
    let address = Address::default();

    let err = client
      .create_order(&lines, &address, 5, "mock_payment_token_1")
      .await
      .unwrap_err();
    assert_eq!(err, GatewayError::Validation("phone required".into()));
    assert!(client.cached_orders().unwrap().items.is_empty());

    let order = client
      .create_order(&lines, &address, 5, "mock_payment_token_1")
      .await
      .unwrap();
    assert_eq!(order.order_id, "o9");
    assert_eq!(client.cached_orders().unwrap().items[0].order_id, "o9");

    let sent = &transport.requests()[2].body["variables"]["order"];
    assert_eq!(sent["paymentToken"], "mock_payment_token_1");
    assert_eq!(sent["products"][0]["category"], "General");
    assert_eq!(sent["products"][0]["package"]["height"], 4);
  }

  #[tokio::test]
  async fn test_create_product_uploads_image_first() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getPresignedUrl": { "uploadUrl": "https://bucket/put", "imageUrl": "https://cdn/img.png" } }));
    transport.reply_data(json!({ "createProduct": { "success": true, "product": product_json("new") } }));

    let client = client(&transport);
    let created = client
      .create_product(
        NewProduct {
          name: "Lamp".into(),
          category: "Home".into(),
          price: 30,
          ..Default::default()
        },
        Some(ImageUpload {
          filename: "img.png".into(),
          content_type: "image/png".into(),
          bytes: vec![1, 2, 3],
        }),
      )
      .await
      .unwrap();

    assert_eq!(created.unwrap().product_id, "new");
    let uploads = transport.uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].url, "https://bucket/put");
    assert_eq!(uploads[0].size, 3);
    assert_eq!(
      transport.requests()[1].body["variables"]["input"]["pictures"][0],
      "https://cdn/img.png"
    );
  }

  #[tokio::test]
  async fn test_delivery_pricing_sends_lines_and_address() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getDeliveryPricing": { "pricing": 7 } }));

    let client = client(&transport);
    let price = client
      .fetch_delivery_pricing(&[], &Address::default())
      .await
      .unwrap();
    assert_eq!(price, 7);
    assert!(transport.requests()[0].body["variables"]["input"]["address"].is_object());
  }
}
