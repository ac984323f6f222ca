use crate::app::AppContext;
use crate::cache::Page;
use crate::commerce::CommerceClient;
use crate::query::{FetchPolicy, Query};
use crate::sync::ListId;
use crate::ui::components::{KeyResult, PageList, PageListEvent};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::{draw_tabs, PackagingDetailView};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::ListItem;

// The backend lists in-progress requests nowhere; started ones only show up
// again once completed.
const TABS: [(ListId, &str); 2] = [
  (ListId::NewPackaging, "New"),
  (ListId::CompletedPackaging, "Completed"),
];

fn id_query(client: &CommerceClient, list: ListId) -> Query<Page<String>> {
  let fetch_client = client.clone();
  let read_client = client.clone();
  Query::new(
    FetchPolicy::CacheAndNetwork,
    client.cache().subscribe(),
    move |token| {
      let client = fetch_client.clone();
      async move {
        match list {
          ListId::CompletedPackaging => client.fetch_completed_packaging_ids(token).await,
          _ => client.fetch_new_packaging_ids(token).await,
        }
      }
    },
    move || read_client.cached_packaging_ids(list),
  )
}

/// Packaging request queues for warehouse staff
pub struct WarehouseView {
  ctx: AppContext,
  queries: Vec<Query<Page<String>>>,
  lists: Vec<PageList>,
  active: usize,
}

impl WarehouseView {
  pub fn new(ctx: AppContext) -> Self {
    let queries: Vec<_> = TABS
      .iter()
      .map(|(list, _)| id_query(&ctx.commerce, *list))
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

  fn ids(&self) -> &[String] {
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
    // Each tab loads on first visit, then stays live through the cache
    let query = &mut self.queries[self.active];
    if matches!(query.state(), crate::query::QueryState::Idle) {
      query.fetch();
    }
  }
}

impl View for WarehouseView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => {
        self.switch_tab(self.active + 1);
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => {
        self.switch_tab(self.active + TABS.len() - 1);
        return ViewAction::None;
      }
      KeyCode::Char(c @ '1'..='2') => {
        self.switch_tab(c as usize - '1' as usize);
        return ViewAction::None;
      }
      _ => {}
    }

    let len = self.ids().len();
    let next = self.next_token();
    match self.lists[self.active].handle_key(key, len, next.is_some()) {
      KeyResult::Event(PageListEvent::Selected(idx)) => match self.ids().get(idx) {
        Some(order_id) => ViewAction::Push(Box::new(PackagingDetailView::new(
          self.ctx.clone(),
          order_id.clone(),
        ))),
        None => ViewAction::None,
      },
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

    let titles: Vec<&str> = TABS.iter().map(|(_, title)| *title).collect();
    draw_tabs(frame, chunks[0], &titles, self.active);

    let rows: Vec<ListItem> = self
      .ids()
      .iter()
      .map(|id| ListItem::new(Span::styled(id.clone(), Style::default().fg(Color::Cyan))))
      .collect();
    let has_more = self.next_token().is_some();
    let title = format!("Packaging requests: {}", TABS[self.active].1);
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
    "Warehouse".to_string()
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
