use std::time::{Duration, Instant};

use crate::app::AppContext;
use crate::commerce::types::{Delivery, DeliveryStatus};
use crate::query::{FetchPolicy, Query, QueryState, Task};
use crate::sync::ReconcileReport;
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::renderfns::{delivery_status_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

const CLOSE_DELAY: Duration = Duration::from_millis(1000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
  Start,
  Complete,
  Fail,
}

impl Step {
  /// Whether the screen closes once this step has been saved.
  fn closes_view(self) -> bool {
    matches!(self, Step::Complete | Step::Fail)
  }
}

/// Which steps a driver may take from `status`.
fn available_steps(status: DeliveryStatus) -> &'static [Step] {
  match status {
    DeliveryStatus::New => &[Step::Start],
    DeliveryStatus::InProgress => &[Step::Complete, Step::Fail],
    DeliveryStatus::Completed | DeliveryStatus::Failed => &[],
  }
}

pub struct DeliveryDetailView {
  ctx: AppContext,
  order_id: String,
  query: Query<Delivery>,
  confirm: ConfirmDialog,
  mutation: Task<ReconcileReport>,
  /// The step `mutation` is saving
  running: Option<Step>,
  close_at: Option<Instant>,
}

impl DeliveryDetailView {
  pub fn new(ctx: AppContext, order_id: String, initial_status: DeliveryStatus) -> Self {
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
        async move { client.fetch_delivery(&id, initial_status).await }
      },
      move || read_client.cached_delivery(&read_id),
    );
    query.fetch();

    Self {
      ctx,
      order_id,
      query,
      confirm: ConfirmDialog::new(),
      mutation: Task::new(),
      running: None,
      close_at: None,
    }
  }

  fn status(&self) -> Option<DeliveryStatus> {
    self.query.data().map(|d| d.status)
  }

  fn idle(&self) -> bool {
    !self.mutation.is_pending() && self.close_at.is_none()
  }

  fn can(&self, step: Step) -> bool {
    self.idle()
      && self
        .status()
        .map(|s| available_steps(s).contains(&step))
        .unwrap_or(false)
  }

  fn run(&mut self, step: Step) {
    let client = self.ctx.commerce.clone();
    let order_id = self.order_id.clone();
    self.running = Some(step);
    self.mutation.run(async move {
      match step {
        Step::Start => client.start_delivery(&order_id).await,
        Step::Complete => client.complete_delivery(&order_id).await,
        Step::Fail => client.fail_delivery(&order_id).await,
      }
    });
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => {
        self.run(Step::Fail);
        Some(ViewAction::None)
      }
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match key.code {
      KeyCode::Char('s') if self.can(Step::Start) => self.run(Step::Start),
      KeyCode::Char('c') if self.can(Step::Complete) => self.run(Step::Complete),
      KeyCode::Char('f') if self.can(Step::Fail) => {
        self.confirm.show("Mark this delivery as failed?");
      }
      KeyCode::Char('r') if self.idle() => self.query.refetch(),
      KeyCode::Char('q') | KeyCode::Esc => return Some(ViewAction::Pop),
      _ => return None,
    }
    Some(ViewAction::None)
  }

  fn render_delivery(&self, frame: &mut Frame, area: Rect, delivery: &Delivery) {
    let dim = Style::default().fg(Color::DarkGray);
    let address = &delivery.address;
    let mut lines = vec![
      Line::from(vec![
        Span::styled(" Status   ", dim),
        Span::styled(
          delivery.status.label(),
          Style::default()
            .fg(delivery_status_color(delivery.status))
            .bold(),
        ),
      ]),
      Line::from(""),
      Line::from(vec![Span::styled(" Deliver to", dim)]),
      Line::from(format!("   {}", address.name)),
    ];
    if let Some(company) = &address.company_name {
      lines.push(Line::from(format!("   {}", company)));
    }
    lines.push(Line::from(format!("   {}", address.street_address)));
    lines.push(Line::from(format!(
      "   {}, {} {}",
      address.city,
      address.state,
      address.post_code.as_deref().unwrap_or("")
    )));
    lines.push(Line::from(format!("   {}", address.country)));
    if let Some(phone) = &address.phone_number {
      lines.push(Line::from(""));
      lines.push(Line::from(vec![
        Span::styled(" Phone    ", dim),
        Span::raw(phone.clone()),
      ]));
    }
    if self.close_at.is_some() {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(
        format!(" Delivery {}.", delivery.status.label().to_lowercase()),
        Style::default().fg(Color::Green),
      )));
    }

    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), area);
  }
}

impl View for DeliveryDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = if self.mutation.is_pending() {
      format!(" Delivery {} (saving...) ", truncate(&self.order_id, 36))
    } else {
      format!(" Delivery {} ", truncate(&self.order_id, 36))
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    match self.query.data() {
      Some(delivery) => self.render_delivery(frame, inner, delivery),
      None => {
        let text = match self.query.state() {
          QueryState::Error(_) => "Failed to load delivery. Press 'r' to retry.",
          _ => "Loading...",
        };
        frame.render_widget(Paragraph::new(text).style(Style::default().fg(Color::DarkGray)), inner);
      }
    }

    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Delivery {}", truncate(&self.order_id, 12))
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
        if self.running.take().map(Step::closes_view).unwrap_or(false) {
          self.close_at = Some(Instant::now() + CLOSE_DELAY);
        }
        ViewAction::None
      }
      Some(Err(e)) => {
        self.running = None;
        ViewAction::Error(e)
      }
      None => ViewAction::None,
    }
  }

  fn refresh(&mut self) {
    if self.idle() {
      self.query.refetch();
    }
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![ShortcutInfo::new("q", "back").with_priority(30)];
    for step in self.status().map(available_steps).unwrap_or(&[]) {
      shortcuts.push(match step {
        Step::Start => ShortcutInfo::new("s", "start").with_priority(20),
        Step::Complete => ShortcutInfo::new("c", "delivered").with_priority(21),
        Step::Fail => ShortcutInfo::new("f", "failed").with_priority(22),
      });
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

  fn delivery_json(id: &str) -> serde_json::Value {
    json!({ "orderId": id, "address": { "name": "N", "streetAddress": "1 Main", "city": "C", "state": "S", "country": "USA" } })
  }

  /// An in-progress delivery view, loaded, with a completion reply queued.
  async fn loaded_view(transport: &Arc<ScriptedTransport>) -> DeliveryDetailView {
    transport.reply_data(json!({ "getDelivery": delivery_json("o1") }));
    transport.reply_data(json!({ "completeDelivery": { "success": true } }));

    let ctx = AppContext::scripted(transport.clone());
    let mut view = DeliveryDetailView::new(ctx, "o1".into(), DeliveryStatus::InProgress);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();
    assert_eq!(view.status(), Some(DeliveryStatus::InProgress));
    view
  }

  #[test]
  fn test_available_steps() {
    assert_eq!(available_steps(DeliveryStatus::New), &[Step::Start]);
    assert_eq!(
      available_steps(DeliveryStatus::InProgress),
      &[Step::Complete, Step::Fail]
    );
    assert!(available_steps(DeliveryStatus::Completed).is_empty());
    assert!(available_steps(DeliveryStatus::Failed).is_empty());
  }

  #[test]
  fn test_only_final_steps_close_the_view() {
    assert!(!Step::Start.closes_view());
    assert!(Step::Complete.closes_view());
    assert!(Step::Fail.closes_view());
  }

  #[tokio::test]
  async fn test_reload_is_ignored_while_a_step_is_saving() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut view = loaded_view(&transport).await;

    view.handle_key(KeyEvent::from(KeyCode::Char('c')));
    view.handle_key(KeyEvent::from(KeyCode::Char('r')));
    view.refresh();
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    assert_eq!(transport.requests().len(), 2);
    assert!(view.close_at.is_some());
  }

  #[tokio::test]
  async fn test_closes_after_completion_while_reloading() {
    let transport = Arc::new(ScriptedTransport::new());
    let mut view = loaded_view(&transport).await;

    view.handle_key(KeyEvent::from(KeyCode::Char('c')));
    tokio::time::sleep(Duration::from_millis(20)).await;

    // A reload started before the completion is observed hides the status
    transport.reply_data(json!({ "getDelivery": delivery_json("o1") }));
    view.query.refetch();
    assert_eq!(view.status(), None);

    assert!(matches!(view.tick(), ViewAction::None));
    assert!(view.close_at.is_some());
  }

  #[tokio::test]
  async fn test_start_keeps_the_view_open() {
    let transport = Arc::new(ScriptedTransport::new());
    transport.reply_data(json!({ "getDelivery": delivery_json("o1") }));
    transport.reply_data(json!({ "startDelivery": { "success": true } }));

    let ctx = AppContext::scripted(transport.clone());
    let mut view = DeliveryDetailView::new(ctx, "o1".into(), DeliveryStatus::New);
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    view.handle_key(KeyEvent::from(KeyCode::Char('s')));
    tokio::time::sleep(Duration::from_millis(20)).await;
    view.tick();

    assert_eq!(view.status(), Some(DeliveryStatus::InProgress));
    assert!(view.close_at.is_none());
  }
}
