use crate::app::AppContext;
use crate::commerce::types::{format_price, Order};
use crate::query::{FetchPolicy, Query, QueryState};
use crate::ui::renderfns::order_status_color;
use crate::ui::view::{View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table};

pub struct OrderDetailView {
  order_id: String,
  query: Query<Order>,
}

impl OrderDetailView {
  pub fn new(ctx: AppContext, order_id: String) -> Self {
    let fetch_client = ctx.commerce.clone();
    let read_client = ctx.commerce;
    let fetch_id = order_id.clone();
    let read_id = order_id.clone();

    let mut query = Query::new(
      FetchPolicy::NetworkOnly,
      read_client.cache().subscribe(),
      move |_| {
        let client = fetch_client.clone();
        let id = fetch_id.clone();
        async move { client.fetch_order(&id).await }
      },
      move || read_client.cached_order(&read_id),
    );
    query.fetch();

    Self { order_id, query }
  }

  fn render_order(&self, frame: &mut Frame, area: Rect, order: &Order) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(6), Constraint::Min(0)])
      .split(area);

    let dim = Style::default().fg(Color::DarkGray);
    let summary = vec![
      Line::from(vec![
        Span::styled(" Status    ", dim),
        Span::styled(
          order.status.label(),
          Style::default().fg(order_status_color(order.status)).bold(),
        ),
      ]),
      Line::from(vec![Span::styled(" Placed    ", dim), Span::raw(order.created_date.clone())]),
      Line::from(vec![
        Span::styled(" Ship to   ", dim),
        Span::raw(format!("{}, {}", order.address.name, order.address.one_line())),
      ]),
      Line::from(vec![
        Span::styled(" Shipping  ", dim),
        Span::raw(format_price(order.delivery_price)),
      ]),
      Line::from(vec![
        Span::styled(" Total     ", dim),
        Span::styled(format_price(order.total), Style::default().fg(Color::Green).bold()),
      ]),
    ];
    frame.render_widget(Paragraph::new(summary), chunks[0]);

    let rows: Vec<Row> = order
      .products
      .iter()
      .map(|line| {
        Row::new(vec![
          line.name.clone().unwrap_or_else(|| line.product_id.clone()),
          line.quantity.to_string(),
          format_price(line.price),
          format_price(line.price * line.quantity),
        ])
      })
      .collect();

    let table = Table::new(
      rows,
      [
        Constraint::Min(20),
        Constraint::Length(6),
        Constraint::Length(10),
        Constraint::Length(10),
      ],
    )
    .header(Row::new(vec!["Product", "Qty", "Price", "Subtotal"]).style(dim))
    .block(Block::default().borders(Borders::TOP).title(" Items "));
    frame.render_widget(table, chunks[1]);
  }
}

impl View for OrderDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => {
        self.query.refetch();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(format!(" Order {} ", self.order_id))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match (self.query.data(), self.query.state()) {
      (Some(order), _) => self.render_order(frame, inner, order),
      (None, state) => {
        let text = match state {
          QueryState::Error(_) => "Failed to load order. Press 'r' to retry.",
          QueryState::Settled => "Order not found.",
          _ => "Loading...",
        };
        frame.render_widget(
          Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
          inner,
        );
      }
    }
  }

  fn breadcrumb_label(&self) -> String {
    format!("Order {}", crate::ui::renderfns::truncate(&self.order_id, 12))
  }

  fn tick(&mut self) -> ViewAction {
    self.query.poll();
    self.query.take_error().map(ViewAction::Error).unwrap_or(ViewAction::None)
  }

  fn refresh(&mut self) {
    self.query.refetch();
  }
}
