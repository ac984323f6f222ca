use crate::commerce::types::{DeliveryStatus, OrderStatus, PackagingStatus};
use ratatui::prelude::Color;

/// Truncate to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

pub fn order_status_color(status: OrderStatus) -> Color {
  match status {
    OrderStatus::Delivered => Color::Green,
    OrderStatus::Packaging | OrderStatus::Packaged | OrderStatus::InTransit => Color::Yellow,
    OrderStatus::Failed | OrderStatus::Cancelled => Color::Red,
    OrderStatus::Pending | OrderStatus::Unknown => Color::White,
  }
}

pub fn packaging_status_color(status: PackagingStatus) -> Color {
  match status {
    PackagingStatus::New => Color::White,
    PackagingStatus::InProgress => Color::Yellow,
    PackagingStatus::Completed => Color::Green,
  }
}

pub fn delivery_status_color(status: DeliveryStatus) -> Color {
  match status {
    DeliveryStatus::New => Color::White,
    DeliveryStatus::InProgress => Color::Yellow,
    DeliveryStatus::Completed => Color::Green,
    DeliveryStatus::Failed => Color::Red,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_truncate() {
    assert_eq!(truncate("hello", 10), "hello");
    assert_eq!(truncate("hello", 5), "hello");
    assert_eq!(truncate("hello world", 8), "hello...");
    assert_eq!(truncate("Düsseldorf", 6), "Düs...");
  }

  #[test]
  fn test_status_colors() {
    assert_eq!(order_status_color(OrderStatus::Delivered), Color::Green);
    assert_eq!(order_status_color(OrderStatus::InTransit), Color::Yellow);
    assert_eq!(packaging_status_color(PackagingStatus::Completed), Color::Green);
    assert_eq!(delivery_status_color(DeliveryStatus::Failed), Color::Red);
  }
}
