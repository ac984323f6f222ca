use crate::app::AppContext;
use crate::cache::Page;
use crate::commerce::types::{format_price, Product};
use crate::query::{FetchPolicy, Query};
use crate::ui::components::{KeyResult, PageList, PageListEvent};
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::ProductDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{ListItem, Paragraph};

/// Distinct categories of `products`, in order of first appearance.
fn categories(products: &[Product]) -> Vec<&str> {
  let mut seen = Vec::new();
  for category in products.iter().filter_map(|p| p.category.as_deref()) {
    if !category.is_empty() && !seen.contains(&category) {
      seen.push(category);
    }
  }
  seen
}

/// The filter after `current` when cycling all, then each category, then all
/// again. `forward` false walks the other way.
fn cycle_category(current: Option<&str>, categories: &[&str], forward: bool) -> Option<String> {
  let position = current.and_then(|c| categories.iter().position(|x| *x == c));
  let next = match (position, forward) {
    (None, true) => categories.first(),
    (None, false) => categories.last(),
    (Some(i), true) => categories.get(i + 1),
    (Some(i), false) => i.checked_sub(1).and_then(|i| categories.get(i)),
  };
  next.map(|c| c.to_string())
}

/// Catalog, newest page first
pub struct ProductListView {
  ctx: AppContext,
  query: Query<Page<Product>>,
  list: PageList,
  /// Only products in this category are listed
  category: Option<String>,
  flash: Option<String>,
}

impl ProductListView {
  pub fn new(ctx: AppContext) -> Self {
    let fetch_client = ctx.commerce.clone();
    let read_client = ctx.commerce.clone();
    let mut query = Query::new(
      FetchPolicy::CacheAndNetwork,
      ctx.commerce.cache().subscribe(),
      move |token| {
        let client = fetch_client.clone();
        async move { client.fetch_products(token).await }
      },
      move || read_client.cached_products(),
    );
    query.fetch();

    Self {
      ctx,
      query,
      list: PageList::new(),
      category: None,
      flash: None,
    }
  }

  fn loaded(&self) -> &[Product] {
    self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[])
  }

  /// Loaded products that pass the category filter.
  fn products(&self) -> Vec<&Product> {
    self
      .loaded()
      .iter()
      .filter(|p| match &self.category {
        Some(category) => p.category.as_ref() == Some(category),
        None => true,
      })
      .collect()
  }

  /// Next server page. Filtering only covers what is already loaded.
  fn next_token(&self) -> Option<String> {
    if self.category.is_some() {
      return None;
    }
    self.query.data().and_then(|p| p.next_token.clone())
  }

  fn selected_product(&self) -> Option<&Product> {
    self.list.selected().and_then(|i| self.products().get(i).copied())
  }

  fn step_category(&mut self, forward: bool) {
    self.category = cycle_category(
      self.category.as_deref(),
      &categories(self.loaded()),
      forward,
    );
    self.list.reset();
  }

  fn add_selected_to_cart(&mut self) -> ViewAction {
    let Some(product) = self.selected_product().cloned() else {
      return ViewAction::None;
    };
    let name = product.name.clone();
    match self.ctx.cart.add(product, 1) {
      Ok(()) => self.flash = Some(format!("Added {} to cart", name)),
      Err(e) => self.flash = Some(format!("Could not update cart: {}", e)),
    }
    ViewAction::None
  }
}

impl View for ProductListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self.flash = None;

    match key.code {
      KeyCode::Char('a') => return self.add_selected_to_cart(),
      KeyCode::Char('f') => {
        self.step_category(true);
        return ViewAction::None;
      }
      KeyCode::Char('F') => {
        self.step_category(false);
        return ViewAction::None;
      }
      _ => {}
    }

    let len = self.products().len();
    let next = self.next_token();
    match self.list.handle_key(key, len, next.is_some()) {
      KeyResult::Event(PageListEvent::Selected(idx)) => match self.products().get(idx) {
        Some(product) => ViewAction::Push(Box::new(ProductDetailView::new(
          self.ctx.clone(),
          product.product_id.clone(),
        ))),
        None => ViewAction::None,
      },
      KeyResult::Event(PageListEvent::LoadMore) => {
        if let Some(token) = next {
          self.query.fetch_more(token);
        }
        ViewAction::None
      }
      KeyResult::Event(PageListEvent::RefreshRequested) => {
        self.query.refetch();
        ViewAction::None
      }
      KeyResult::Event(PageListEvent::Back) => ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(0), Constraint::Length(1)])
      .split(area);

    let rows: Vec<ListItem> = self
      .products()
      .iter()
      .map(|p| {
        let stock = match p.quantity {
          Some(q) if q <= 0 => Span::styled("sold out", Style::default().fg(Color::Red)),
          Some(q) => Span::styled(format!("{} left", q), Style::default().fg(Color::DarkGray)),
          None => Span::raw(""),
        };
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<10}", format_price(p.price)),
            Style::default().fg(Color::Green),
          ),
          Span::raw(format!("{:<40} ", truncate(&p.name, 40))),
          Span::styled(
            format!("{:<14} ", truncate(p.category.as_deref().unwrap_or("-"), 14)),
            Style::default().fg(Color::Magenta),
          ),
          stock,
        ]))
      })
      .collect();

    let has_more = self.next_token().is_some();
    let title = match &self.category {
      Some(category) => format!("Products in {}", category),
      None => "Products".to_string(),
    };
    self
      .list
      .render(frame, chunks[0], &title, rows, self.query.state(), has_more);

    if let Some(flash) = &self.flash {
      frame.render_widget(
        Paragraph::new(format!(" {}", flash)).style(Style::default().fg(Color::Green)),
        chunks[1],
      );
    }
  }

  fn breadcrumb_label(&self) -> String {
    "Products".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    self.query.take_error().map(ViewAction::Error).unwrap_or(ViewAction::None)
  }

  fn on_resume(&mut self) {
    self.query.refetch();
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "add to cart").with_priority(20),
      ShortcutInfo::new("f", "category").with_priority(21),
    ];
    shortcuts.extend(PageList::shortcuts(self.next_token().is_some()));
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::testing::ScriptedTransport;
  use serde_json::json;
  use std::sync::Arc;
  use std::time::Duration;

  fn product(id: &str, category: Option<&str>) -> Product {
    Product {
      product_id: id.into(),
      name: format!("Product {}", id),
      price: 100,
      category: category.map(String::from),
      pictures: Vec::new(),
      tags: Vec::new(),
      package: None,
      quantity: None,
    }
  }

  #[test]
  fn test_categories_are_distinct_in_first_seen_order() {
    let products = vec![
      product("a", Some("Toys")),
      product("b", None),
      product("c", Some("Books")),
      product("d", Some("Toys")),
      product("e", Some("")),
    ];
    assert_eq!(categories(&products), vec!["Toys", "Books"]);
    assert!(categories(&[]).is_empty());
  }

  #[test]
  fn test_cycle_category_wraps_through_all() {
    let cats = ["Toys", "Books"];
    assert_eq!(cycle_category(None, &cats, true).as_deref(), Some("Toys"));
    assert_eq!(cycle_category(Some("Toys"), &cats, true).as_deref(), Some("Books"));
    assert_eq!(cycle_category(Some("Books"), &cats, true), None);

    assert_eq!(cycle_category(None, &cats, false).as_deref(), Some("Books"));
    assert_eq!(cycle_category(Some("Toys"), &cats, false), None);

    // A category that vanished after a reload starts over
    assert_eq!(cycle_category(Some("Garden"), &cats, true).as_deref(), Some("Toys"));
    assert_eq!(cycle_category(None, &[], true), None);
  }

  #[tokio::test]
  async fn test_filter_by_category_stops_paging() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getProducts": { "products": [
      { "productId": "a", "name": "Kite", "price": 10, "category": "Toys" },
      { "productId": "b", "name": "Atlas", "price": 20, "category": "Books" },
      { "productId": "c", "name": "Yo-yo", "price": 5, "category": "Toys" }
    ], "nextToken": "t1" } }));

    let mut view = ProductListView::new(AppContext::scripted(transport.clone()));
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    assert_eq!(view.products().len(), 3);
    assert!(view.next_token().is_some());

    view.handle_key(KeyEvent::from(KeyCode::Char('f')));
    let ids: Vec<String> = view.products().iter().map(|p| p.product_id.clone()).collect();
    assert_eq!(ids, vec!["a", "c"]);
    assert_eq!(view.next_token(), None);
    assert_eq!(view.list.selected(), Some(0));

    view.handle_key(KeyEvent::from(KeyCode::Char('n')));
    assert_eq!(transport.requests().len(), 1);

    view.handle_key(KeyEvent::from(KeyCode::Char('f')));
    assert_eq!(view.category.as_deref(), Some("Books"));
    assert_eq!(view.selected_product().map(|p| p.name.as_str()), Some("Atlas"));

    view.handle_key(KeyEvent::from(KeyCode::Char('F')));
    view.handle_key(KeyEvent::from(KeyCode::Char('F')));
    assert_eq!(view.category, None);
    assert_eq!(view.products().len(), 3);
  }
}
