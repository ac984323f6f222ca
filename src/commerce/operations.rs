//! GraphQL documents consumed by the client.

use crate::gateway::Operation;

pub const GET_PRODUCTS: Operation = Operation {
  name: "GetProducts",
  root_field: "getProducts",
  document: r#"query GetProducts($nextToken: String) {
  getProducts(nextToken: $nextToken) {
    products {
      productId
      name
      price
      category
      pictures
      tags
      package { weight width length height }
    }
    nextToken
  }
}"#,
};

pub const GET_PRODUCT: Operation = Operation {
  name: "GetProduct",
  root_field: "getProduct",
  document: r#"query GetProduct($productId: ID!) {
  getProduct(productId: $productId) {
    productId
    name
    price
    category
    pictures
    tags
    package { weight width length height }
  }
}"#,
};

pub const CREATE_PRODUCT: Operation = Operation {
  name: "CreateProduct",
  root_field: "createProduct",
  document: r#"mutation CreateProduct($input: CreateProductInput!) {
  createProduct(input: $input) {
    success
    message
    product {
      productId
      name
      price
      category
      pictures
      tags
      quantity
      package { weight width length height }
    }
  }
}"#,
};

pub const GET_PRESIGNED_URL: Operation = Operation {
  name: "GetPresignedUrl",
  root_field: "getPresignedUrl",
  document: r#"query GetPresignedUrl($filename: String!, $contentType: String!) {
  getPresignedUrl(filename: $filename, contentType: $contentType) {
    uploadUrl
    imageUrl
  }
}"#,
};

pub const GET_ORDERS: Operation = Operation {
  name: "GetOrders",
  root_field: "getOrders",
  document: r#"query GetOrders($nextToken: String) {
  getOrders(nextToken: $nextToken) {
    orders {
      orderId
      userId
      status
      total
      createdDate
      modifiedDate
      products { productId name price quantity }
      address { name streetAddress city state country postCode }
      deliveryPrice
    }
    nextToken
  }
}"#,
};

pub const GET_ORDER: Operation = Operation {
  name: "GetOrder",
  root_field: "getOrder",
  document: r#"query GetOrder($orderId: ID!) {
  getOrder(orderId: $orderId) {
    orderId
    userId
    status
    total
    createdDate
    modifiedDate
    products { productId name price quantity }
    address { name streetAddress city state country postCode }
    deliveryPrice
  }
}"#,
};

pub const CREATE_ORDER: Operation = Operation {
  name: "CreateOrder",
  root_field: "createOrder",
  document: r#"mutation CreateOrder($order: CreateOrderRequest!) {
  createOrder(order: $order) {
    success
    message
    errors
    order {
      orderId
      userId
      status
      total
      createdDate
      products { productId name price quantity }
      address { name streetAddress city state country postCode }
      deliveryPrice
    }
  }
}"#,
};

pub const GET_DELIVERY_PRICING: Operation = Operation {
  name: "GetDeliveryPricing",
  root_field: "getDeliveryPricing",
  document: r#"query GetDeliveryPricing($input: DeliveryPricingInput!) {
  getDeliveryPricing(input: $input) {
    pricing
  }
}"#,
};

pub const GET_NEW_DELIVERIES: Operation = Operation {
  name: "GetNewDeliveries",
  root_field: "getNewDeliveries",
  document: r#"query GetNewDeliveries($nextToken: String) {
  getNewDeliveries(nextToken: $nextToken) {
    deliveries {
      orderId
      address { name streetAddress city state country phoneNumber }
    }
    nextToken
  }
}"#,
};

pub const GET_IN_PROGRESS_DELIVERIES: Operation = Operation {
  name: "GetInProgressDeliveries",
  root_field: "getInProgressDeliveries",
  document: r#"query GetInProgressDeliveries($nextToken: String) {
  getInProgressDeliveries(nextToken: $nextToken) {
    deliveries {
      orderId
      address { name streetAddress city state country phoneNumber }
    }
    nextToken
  }
}"#,
};

pub const GET_DELIVERY: Operation = Operation {
  name: "GetDelivery",
  root_field: "getDelivery",
  document: r#"query GetDelivery($input: DeliveryInput!) {
  getDelivery(input: $input) {
    orderId
    address {
      name
      companyName
      streetAddress
      city
      state
      country
      postCode
      phoneNumber
    }
  }
}"#,
};

pub const START_DELIVERY: Operation = Operation {
  name: "StartDelivery",
  root_field: "startDelivery",
  document: r#"mutation StartDelivery($input: DeliveryInput!) {
  startDelivery(input: $input) { success }
}"#,
};

pub const FAIL_DELIVERY: Operation = Operation {
  name: "FailDelivery",
  root_field: "failDelivery",
  document: r#"mutation FailDelivery($input: DeliveryInput!) {
  failDelivery(input: $input) { success }
}"#,
};

pub const COMPLETE_DELIVERY: Operation = Operation {
  name: "CompleteDelivery",
  root_field: "completeDelivery",
  document: r#"mutation CompleteDelivery($input: DeliveryInput!) {
  completeDelivery(input: $input) { success }
}"#,
};

pub const GET_NEW_PACKAGING_REQUEST_IDS: Operation = Operation {
  name: "GetNewPackagingRequestIds",
  root_field: "getNewPackagingRequestIds",
  document: r#"query GetNewPackagingRequestIds($nextToken: String) {
  getNewPackagingRequestIds(nextToken: $nextToken) {
    packagingRequestIds
    nextToken
  }
}"#,
};

pub const GET_COMPLETED_PACKAGING_REQUEST_IDS: Operation = Operation {
  name: "GetCompletedPackagingRequestIds",
  root_field: "getCompletedPackagingRequestIds",
  document: r#"query GetCompletedPackagingRequestIds($nextToken: String) {
  getCompletedPackagingRequestIds(nextToken: $nextToken) {
    packagingRequestIds
    nextToken
  }
}"#,
};

pub const GET_PACKAGING_REQUEST: Operation = Operation {
  name: "GetPackagingRequestV2",
  root_field: "getPackagingRequest",
  document: r#"query GetPackagingRequestV2($input: PackagingInput!) {
  getPackagingRequest(input: $input) {
    orderId
    status
    products { productId quantity }
  }
}"#,
};

pub const START_PACKAGING: Operation = Operation {
  name: "StartPackaging",
  root_field: "startPackaging",
  document: r#"mutation StartPackaging($input: PackagingInput!) {
  startPackaging(input: $input) { success }
}"#,
};

pub const COMPLETE_PACKAGING: Operation = Operation {
  name: "CompletePackaging",
  root_field: "completePackaging",
  document: r#"mutation CompletePackaging($input: PackagingInput!) {
  completePackaging(input: $input) { success }
}"#,
};

/// Declared by the schema but not resolved by the backend. Packing progress
/// is tracked locally and this document is never sent.
pub const UPDATE_PACKAGING_PRODUCT: Operation = Operation {
  name: "UpdatePackagingProduct",
  root_field: "updatePackagingProduct",
  document: r#"mutation UpdatePackagingProduct($input: UpdatePackagingProductInput!) {
  updatePackagingProduct(input: $input) { success }
}"#,
};
