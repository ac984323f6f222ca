use crate::app::AppContext;
use crate::cache::Page;
use crate::commerce::types::{Delivery, DeliveryStatus};
use crate::commerce::CommerceClient;
use crate::query::{FetchPolicy, Query, QueryState};
use crate::sync::ListId;
use crate::ui::components::{KeyResult, PageList, PageListEvent};
use crate::ui::renderfns::{delivery_status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{draw_tabs, DeliveryDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::ListItem;

const TABS: [(ListId, DeliveryStatus, &str); 2] = [
  (ListId::NewDeliveries, DeliveryStatus::New, "New"),
  (ListId::InProgressDeliveries, DeliveryStatus::InProgress, "In progress"),
];

fn delivery_query(client: &CommerceClient, list: ListId) -> Query<Page<Delivery>> {
  let fetch_client = client.clone();
  let read_client = client.clone();
  Query::new(
    FetchPolicy::CacheAndNetwork,
    client.cache().subscribe(),
    move |token| {
      let client = fetch_client.clone();
      async move {
        match list {
          ListId::InProgressDeliveries => client.fetch_in_progress_deliveries(token).await,
          _ => client.fetch_new_deliveries(token).await,
        }
      }
    },
    move || read_client.cached_deliveries(list),
  )
}

/// Delivery queues for drivers
pub struct DeliveryView {
  ctx: AppContext,
  queries: Vec<Query<Page<Delivery>>>,
  lists: Vec<PageList>,
  active: usize,
}

impl DeliveryView {
  pub fn new(ctx: AppContext) -> Self {
    let queries = TABS
      .iter()
      .map(|(list, _, _)| delivery_query(&ctx.commerce, *list))
      .collect();
    let lists = TABS.iter().map(|_| PageList::new()).collect();

    let mut view = Self {
      ctx,
      queries,
      lists,
      active: 0,
    };
    view.queries[0].fetch();
    view
  }

  fn deliveries(&self) -> &[Delivery] {
    self.queries[self.active]
      .data()
      .map(|p| p.items.as_slice())
      .unwrap_or(&[])
  }

  fn next_token(&self) -> Option<String> {
    self.queries[self.active]
      .data()
      .and_then(|p| p.next_token.clone())
  }

  fn switch_tab(&mut self, index: usize) {
    self.active = index % TABS.len();
    let query = &mut self.queries[self.active];
    if matches!(query.state(), QueryState::Idle) {
      query.fetch();
    }
  }
}

impl View for DeliveryView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Right | KeyCode::Left => {
        self.switch_tab(self.active + 1);
        return ViewAction::None;
      }
      KeyCode::Char(c @ '1'..='2') => {
        self.switch_tab(c as usize - '1' as usize);
        return ViewAction::None;
      }
      _ => {}
    }

    let len = self.deliveries().len();
    let next = self.next_token();
    match self.lists[self.active].handle_key(key, len, next.is_some()) {
      KeyResult::Event(PageListEvent::Selected(idx)) => {
        let status = TABS[self.active].1;
        match self.deliveries().get(idx) {
          Some(delivery) => ViewAction::Push(Box::new(DeliveryDetailView::new(
            self.ctx.clone(),
            delivery.order_id.clone(),
            status,
          ))),
          None => ViewAction::None,
        }
      }
      KeyResult::Event(PageListEvent::LoadMore) => {
        if let Some(token) = next {
          self.queries[self.active].fetch_more(token);
        }
        ViewAction::None
      }
      KeyResult::Event(PageListEvent::RefreshRequested) => {
        self.queries[self.active].refetch();
        ViewAction::None
      }
      KeyResult::Event(PageListEvent::Back) => ViewAction::Pop,
      KeyResult::Handled | KeyResult::NotHandled => ViewAction::None,
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(1), Constraint::Min(0)])
      .split(area);

    let titles: Vec<&str> = TABS.iter().map(|(_, _, title)| *title).collect();
    draw_tabs(frame, chunks[0], &titles, self.active);

    let rows: Vec<ListItem> = self
      .deliveries()
      .iter()
      .map(|delivery| {
        ListItem::new(Line::from(vec![
          Span::styled(
            format!("{:<38}", truncate(&delivery.order_id, 36)),
            Style::default().fg(Color::Cyan),
          ),
          Span::styled(
            format!("{:<12}", delivery.status.label()),
            Style::default().fg(delivery_status_color(delivery.status)),
          ),
          Span::raw(truncate(&delivery.address.one_line(), 60)),
        ]))
      })
      .collect();

    let has_more = self.next_token().is_some();
    let title = format!("Deliveries: {}", TABS[self.active].2);
    let active = self.active;
    self.lists[active].render(
      frame,
      chunks[1],
      &title,
      rows,
      self.queries[active].state(),
      has_more,
    );
  }

  fn breadcrumb_label(&self) -> String {
    "Deliveries".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    let mut error = None;
    for query in &mut self.queries {
      query.poll();
      if let Some(e) = query.take_error() {
        error = Some(e);
      }
    }
    error.map(ViewAction::Error).unwrap_or(ViewAction::None)
  }

  fn on_resume(&mut self) {
    self.queries[self.active].refetch();
  }

  fn refresh(&mut self) {
    self.queries[self.active].refetch();
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("tab", "switch queue").with_priority(20),
    ];
    shortcuts.extend(PageList::shortcuts(self.next_token().is_some()));
    shortcuts
  }
}
