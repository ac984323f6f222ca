use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::app::AppContext;
use crate::commerce::types::{PackagingRequest, PackagingStatus};
use crate::query::{FetchPolicy, Query, QueryState, Task};
use crate::sync::ReconcileReport;
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{packaging_status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

const CLOSE_DELAY: Duration = Duration::from_millis(500);

/// One packaging request: start it, tick off products, complete it
pub struct PackagingDetailView {
  ctx: AppContext,
  order_id: String,
  query: Query<PackagingRequest>,
  list_state: ListState,
  /// Products ticked off locally; the server keeps no per-line progress
  packed: HashSet<String>,
  mutation: Task<ReconcileReport>,
  /// `mutation` is saving the completion
  completing: bool,
  close_at: Option<Instant>,
}

impl PackagingDetailView {
  pub fn new(ctx: AppContext, order_id: String) -> Self {
    let fetch_client = ctx.commerce.clone();
    let read_client = ctx.commerce.clone();
    let fetch_id = order_id.clone();
    let read_id = order_id.clone();

    let mut query = Query::new(
      FetchPolicy::NetworkOnly,
      ctx.commerce.cache().subscribe(),
      move |_| {
        let client = fetch_client.clone();
        let id = fetch_id.clone();
        async move { client.fetch_packaging_request(&id).await }
      },
      move || read_client.cached_packaging_request(&read_id),
    );
    query.fetch();

    Self {
      ctx,
      order_id,
      query,
      list_state: ListState::default(),
      packed: HashSet::new(),
      mutation: Task::new(),
      completing: false,
      close_at: None,
    }
  }

  fn idle(&self) -> bool {
    !self.mutation.is_pending() && self.close_at.is_none()
  }

  fn status(&self) -> Option<PackagingStatus> {
    self.query.data().map(|r| r.status)
  }

  fn all_packed(&self) -> bool {
    self
      .query
      .data()
      .map(|r| r.products.iter().all(|p| self.packed.contains(&p.product_id)))
      .unwrap_or(false)
  }

  fn toggle_selected(&mut self) {
    let Some(request) = self.query.data() else {
      return;
    };
    let Some(line) = self.list_state.selected().and_then(|i| request.products.get(i)) else {
      return;
    };
    let product_id = line.product_id.clone();
    let quantity = line.quantity;

    if self.packed.remove(&product_id) {
      self.ctx.commerce.record_packing_progress(&self.order_id, &product_id, 0);
    } else {
      self.ctx.commerce.record_packing_progress(&self.order_id, &product_id, quantity);
      self.packed.insert(product_id);
    }
  }

  fn start(&mut self) {
    let client = self.ctx.commerce.clone();
    let order_id = self.order_id.clone();
    self.completing = false;
    self.mutation.run(async move { client.start_packaging(&order_id).await });
  }

  fn complete(&mut self) {
    let client = self.ctx.commerce.clone();
    let order_id = self.order_id.clone();
    self.completing = true;
    self.mutation.run(async move { client.complete_packaging(&order_id).await });
  }

  fn render_request(&mut self, frame: &mut Frame, area: Rect) {
    let Some(request) = self.query.data() else {
      return;
    };

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(2), Constraint::Min(0)])
      .split(area);

    let status = Line::from(vec![
      Span::styled(" Status  ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        request.status.label(),
        Style::default().fg(packaging_status_color(request.status)).bold(),
      ),
      Span::styled(
        format!(
          "   {}/{} packed",
          request
            .products
            .iter()
            .filter(|p| self.packed.contains(&p.product_id))
            .count(),
          request.products.len()
        ),
        Style::default().fg(Color::DarkGray),
      ),
    ]);
    frame.render_widget(Paragraph::new(status), chunks[0]);

    let can_pack = request.status == PackagingStatus::InProgress;
    let rows: Vec<ListItem> = request
      .products
      .iter()
      .map(|line| {
        let checked = self.packed.contains(&line.product_id);
        let mark = if checked { "[x] " } else { "[ ] " };
        let name = self
          .ctx
          .commerce
          .cached_product(&line.product_id)
          .map(|p| p.name)
          .unwrap_or_else(|| line.product_id.clone());
        let style = if !can_pack {
          Style::default().fg(Color::DarkGray)
        } else if checked {
          Style::default().fg(Color::Green)
        } else {
          Style::default()
        };
        ListItem::new(Line::from(vec![
          Span::styled(mark, style),
          Span::styled(format!("{:>4} x ", line.quantity), Style::default().fg(Color::Cyan)),
          Span::styled(truncate(&name, 50), style),
        ]))
      })
      .collect();

    ensure_valid_selection(&mut self.list_state, rows.len());
    let list = List::new(rows)
      .block(Block::default().borders(Borders::TOP).title(" Products "))
      .highlight_style(Style::default().bg(Color::DarkGray))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, chunks[1], &mut self.list_state);
  }
}

impl View for PackagingDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let idle = self.idle();
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char(' ') | KeyCode::Enter
        if idle && self.status() == Some(PackagingStatus::InProgress) =>
      {
        self.toggle_selected()
      }
      KeyCode::Char('s') if idle && self.status() == Some(PackagingStatus::New) => self.start(),
      KeyCode::Char('c') if idle && self.status() == Some(PackagingStatus::InProgress) => {
        if !self.all_packed() {
          return ViewAction::Notice("Pack every product before completing".to_string());
        }
        self.complete();
      }
      KeyCode::Char('r') if idle => {
        self.packed.clear();
        self.query.refetch();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.mutation.is_pending() {
      format!(" Packaging {} (saving...) ", self.order_id)
    } else {
      format!(" Packaging {} ", self.order_id)
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if self.query.data().is_some() {
      self.render_request(frame, inner);
      return;
    }

    let text = match self.query.state() {
      QueryState::Error(_) => "Failed to load packaging request. Press 'r' to retry.",
      _ => "Loading...",
    };
    frame.render_widget(
      Paragraph::new(text).style(Style::default().fg(Color::DarkGray)),
      inner,
    );
  }

  fn breadcrumb_label(&self) -> String {
    format!("Packaging {}", truncate(&self.order_id, 12))
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(close_at) = self.close_at {
      if Instant::now() >= close_at {
        return ViewAction::Pop;
      }
    }

    self.query.poll();
    if let Some(e) = self.query.take_error() {
      return ViewAction::Error(e);
    }

    match self.mutation.poll() {
      Some(Ok(_)) => {
        if std::mem::take(&mut self.completing) {
          self.close_at = Some(Instant::now() + CLOSE_DELAY);
        }
        ViewAction::None
      }
      Some(Err(e)) => {
        self.completing = false;
        ViewAction::Error(e)
      }
      None => ViewAction::None,
    }
  }

  fn refresh(&mut self) {
    if self.idle() {
      self.packed.clear();
      self.query.refetch();
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![ShortcutInfo::new("q", "back").with_priority(30)];
    match self.status() {
      Some(PackagingStatus::New) => {
        shortcuts.push(ShortcutInfo::new("s", "start").with_priority(20));
      }
      Some(PackagingStatus::InProgress) => {
        shortcuts.push(ShortcutInfo::new("space", "pack").with_priority(20));
        shortcuts.push(ShortcutInfo::new("c", "complete").with_priority(21));
      }
      _ => {}
    }
    shortcuts
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::gateway::testing::ScriptedTransport;
  use serde_json::json;
  use std::sync::Arc;

  async fn loaded_view(transport: &Arc<ScriptedTransport>, status: &str) -> PackagingDetailView {
    transport.reply_data(json!({ "getPackagingRequest": { "orderId": "A", "status": status, "products": [
      { "productId": "p1", "quantity": 2 }
    ] } }));

    let ctx = AppContext::scripted(transport.clone());
    let mut view = PackagingDetailView::new(ctx, "A".into());
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    assert!(view.status().is_some());
    view
  }

  #[tokio::test]
  async fn test_complete_requires_every_product_packed() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut view = loaded_view(&transport, "IN_PROGRESS").await;

    let action = view.handle_key(KeyEvent::from(KeyCode::Char('c')));
    assert!(matches!(action, ViewAction::Notice(_)));
    assert!(!view.mutation.is_pending());
  }

  #[tokio::test]
  async fn test_closes_after_completion_while_reloading() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut view = loaded_view(&transport, "IN_PROGRESS").await;
    transport.reply_data(json!({ "completePackaging": { "success": true } }));

    view.list_state.select(Some(0));
    view.handle_key(KeyEvent::from(KeyCode::Char(' ')));
    assert!(view.all_packed());

    view.handle_key(KeyEvent::from(KeyCode::Char('c')));
    view.handle_key(KeyEvent::from(KeyCode::Char('r')));
    tokio::time::sleep(Duration::from_millis(20)).await;

    // The key above was ignored; a reload started now still hides the status
    assert_eq!(transport.requests().len(), 2);
    view.query.refetch();
    assert_eq!(view.status(), None);

    view.tick();
    assert!(view.close_at.is_some());
  }

  #[tokio::test]
  async fn test_start_keeps_the_view_open() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut view = loaded_view(&transport, "NEW").await;
    transport.reply_data(json!({ "startPackaging": { "success": true } }));

    view.handle_key(KeyEvent::from(KeyCode::Char('s')));
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    assert_eq!(view.status(), Some(PackagingStatus::InProgress));
    assert!(view.close_at.is_none());
  }
}
