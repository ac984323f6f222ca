use crate::app::AppContext;
use crate::cache::Page;
use crate::commerce::types::{format_price, Order};
use crate::query::{FetchPolicy, Query};
use crate::ui::components::{KeyResult, PageList, PageListEvent};
use crate::ui::renderfns::{order_status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::OrderDetailView;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::ListItem;

/// The signed-in customer's orders
pub struct OrderListView {
  ctx: AppContext,
  query: Query<Page<Order>>,
  list: PageList,
}

impl OrderListView {
  pub fn new(ctx: AppContext) -> Self {
    let fetch_client = ctx.commerce.clone();
    let read_client = ctx.commerce.clone();
    let mut query = Query::new(
      FetchPolicy::CacheAndNetwork,
      ctx.commerce.cache().subscribe(),
      move |token| {
        let client = fetch_client.clone();
        async move { client.fetch_orders(token).await }
      },
      move || read_client.cached_orders(),
    );
    query.fetch();

    Self {
      ctx,
      query,
      list: PageList::new(),
    }
  }

  fn orders(&self) -> &[Order] {
    self.query.data().map(|p| p.items.as_slice()).unwrap_or(&[])
  }

  fn next_token(&self) -> Option<String> {
    self.query.data().and_then(|p| p.next_token.clone())
  }
}

impl View for OrderListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let next = self.next_token();
    match self.list.handle_key(key, self.orders().len(), next.is_some()) {
      KeyResult::Event(PageListEvent::Selected(idx)) => match self.orders().get(idx) {
        Some(order) => ViewAction::Push(Box::new(OrderDetailView::new(
          self.ctx.clone(),
          order.order_id.clone(),
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
    let rows: Vec<ListItem> = self
      .orders()
      .iter()
      .map(|order| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<38}", truncate(&order.order_id, 36)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<12}", order.status.label()),
            Style::default().fg(order_status_color(order.status)),
          ),
          Span::styled(
            format!("{:>10}  ", format_price(order.total)),
            Style::default().fg(Color::Green),
          ),
          Span::styled(
            truncate(&order.created_date, 19),
            Style::default().fg(Color::DarkGray),
          ),
        ]))
      })
      .collect();

    let has_more = self.next_token().is_some();
    self
      .list
      .render(frame, area, "Orders", rows, self.query.state(), has_more);
  }

  fn breadcrumb_label(&self) -> String {
    "Orders".to_string()
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
      ShortcutInfo::new("q", "back").with_priority(30),
    ];
    shortcuts.extend(PageList::shortcuts(self.next_token().is_some()));
    shortcuts
  }
}
