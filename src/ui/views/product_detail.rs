use crate::app::AppContext;
use crate::commerce::types::{format_price, Product};
use crate::query::{FetchPolicy, Query, QueryState};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

pub struct ProductDetailView {
  ctx: AppContext,
  product_id: String,
  query: Query<Product>,
  quantity: i64,
  flash: Option<String>,
}

impl ProductDetailView {
  pub fn new(ctx: AppContext, product_id: String) -> Self {
    let fetch_client = ctx.commerce.clone();
    let read_client = ctx.commerce.clone();
    let fetch_id = product_id.clone();
    let read_id = product_id.clone();

    let mut query = Query::new(
      FetchPolicy::NetworkOnly,
      ctx.commerce.cache().subscribe(),
      move |_| {
        let client = fetch_client.clone();
        let id = fetch_id.clone();
        async move { client.fetch_product(&id).await }
      },
      move || read_client.cached_product(&read_id),
    );
    query.fetch();

    Self {
      ctx,
      product_id,
      query,
      quantity: 1,
      flash: None,
    }
  }

  fn max_quantity(&self) -> i64 {
    self
      .query
      .data()
      .and_then(|p| p.quantity)
      .unwrap_or(i64::MAX)
  }

  fn render_product(&self, product: &Product) -> Vec<Line<'static>> {
    let label = |s: &'static str| Span::styled(s, Style::default().fg(Color::DarkGray));

    let mut lines = vec![
      Line::from(Span::styled(
        product.name.clone(),
        Style::default().fg(Color::White).bold(),
      )),
      Line::from(""),
      Line::from(vec![
        label("Price     "),
        Span::styled(format_price(product.price), Style::default().fg(Color::Green)),
      ]),
      Line::from(vec![
        label("Category  "),
        Span::raw(product.category.clone().unwrap_or_else(|| "-".into())),
      ]),
    ];

    if let Some(stock) = product.quantity {
      lines.push(Line::from(vec![label("In stock  "), Span::raw(stock.to_string())]));
    }
    if !product.tags.is_empty() {
      lines.push(Line::from(vec![
        label("Tags      "),
        Span::styled(product.tags.join(", "), Style::default().fg(Color::Magenta)),
      ]));
    }
    if let Some(package) = product.package {
      lines.push(Line::from(vec![
        label("Package   "),
        Span::raw(format!(
          "{} x {} x {}, {} g",
          package.length, package.width, package.height, package.weight
        )),
      ]));
    }
    for picture in &product.pictures {
      lines.push(Line::from(vec![label("Image     "), Span::raw(picture.clone())]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(vec![
      label("Quantity  "),
      Span::styled(
        format!("< {} >", self.quantity),
        Style::default().fg(Color::Cyan).bold(),
      ),
    ]));
    lines
  }
}

impl View for ProductDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self.flash = None;
    match key.code {
      KeyCode::Char('+') | KeyCode::Char('l') | KeyCode::Right => {
        self.quantity = (self.quantity + 1).min(self.max_quantity().max(1));
      }
      KeyCode::Char('-') | KeyCode::Char('h') | KeyCode::Left => {
        self.quantity = (self.quantity - 1).max(1);
      }
      KeyCode::Char('a') => {
        if let Some(product) = self.query.data().cloned() {
          self.flash = Some(match self.ctx.cart.add(product, self.quantity) {
            Ok(()) => format!("Added {} to cart", self.quantity),
            Err(e) => format!("Could not update cart: {}", e),
          });
        }
      }
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Product {} ", self.product_id))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let mut lines = match (self.query.data(), self.query.state()) {
      (Some(product), _) => self.render_product(product),
      (None, QueryState::Error(_)) => vec![Line::from("Failed to load product. Press 'r' to retry.")],
      (None, QueryState::Settled) => vec![Line::from("Product not found.")],
      _ => vec![Line::from("Loading...")],
    };

    if let Some(flash) = &self.flash {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(
        flash.clone(),
        Style::default().fg(Color::Green),
      )));
    }

    let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false });
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self
      .query
      .data()
      .map(|p| p.name.clone())
      .unwrap_or_else(|| self.product_id.clone())
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    self.query.take_error().map(ViewAction::Error).unwrap_or(ViewAction::None)
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("+/-", "quantity").with_priority(20),
      ShortcutInfo::new("a", "add to cart").with_priority(21),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
