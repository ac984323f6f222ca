mod api_types;
mod client;
mod keys;
mod operations;
pub mod types;

pub use client::{CommerceClient, ImageUpload};
pub use keys::CommerceQueryKey;
