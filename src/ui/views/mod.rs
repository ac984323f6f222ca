mod admin;
mod cart;
mod checkout;
mod delivery;
mod delivery_detail;
mod login;
mod order_detail;
mod orders;
mod packaging_detail;
mod product_detail;
mod products;
mod warehouse;

pub use admin::CreateProductView;
pub use cart::CartView;
pub use checkout::CheckoutView;
pub use delivery::DeliveryView;
pub use delivery_detail::DeliveryDetailView;
pub use login::LoginView;
pub use order_detail::OrderDetailView;
pub use orders::OrderListView;
pub use packaging_detail::PackagingDetailView;
pub use product_detail::ProductDetailView;
pub use products::ProductListView;
pub use warehouse::WarehouseView;

use ratatui::prelude::*;
use ratatui::widgets::Tabs;

/// One-line tab strip for dashboards with several queues
pub fn draw_tabs(frame: &mut Frame, area: Rect, titles: &[&str], active: usize) {
  let tabs = Tabs::new(titles.iter().map(|t| format!(" {} ", t)))
    .select(active)
    .style(Style::default().fg(Color::DarkGray))
    .highlight_style(Style::default().fg(Color::Cyan).bold())
    .divider(Span::styled("│", Style::default().fg(Color::DarkGray)));
  frame.render_widget(tabs, area);
}
