mod oauth;
mod roles;
mod session;

pub use oauth::IdentityProvider;
pub use roles::{Access, ADMIN_ACCESS, DELIVERY_ACCESS, WAREHOUSE_ACCESS};
pub use session::{AuthTokens, Session, User};
