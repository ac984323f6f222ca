use chrono::Utc;

use crate::app::AppContext;
use crate::commerce::types::{format_price, Address, Order};
use crate::query::Task;
use crate::ui::components::{Form, FormEvent, KeyResult};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::OrderDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const NAME: usize = 0;
const COMPANY: usize = 1;
const STREET: usize = 2;
const CITY: usize = 3;
const STATE: usize = 4;
const POST_CODE: usize = 5;
const COUNTRY: usize = 6;
const PHONE: usize = 7;

const FIELDS: &[&str] = &[
  "Name",
  "Company",
  "Street",
  "City",
  "State",
  "Post code",
  "Country",
  "Phone",
];

const DEFAULT_COUNTRY: &str = "USA";

pub struct CheckoutView {
  ctx: AppContext,
  form: Form,
  /// Shipping quote for the address as currently entered
  quote: Option<i64>,
  pricing: Task<i64>,
  submit: Task<Order>,
}

impl CheckoutView {
  pub fn new(ctx: AppContext) -> Self {
    let mut form = Form::new(FIELDS);
    form.set_value(COUNTRY, DEFAULT_COUNTRY);
    if let Some(user) = ctx.session.user() {
      if let Some(name) = user.name.as_deref().or(user.username.as_deref()) {
        form.set_value(NAME, name);
      }
    }

    Self {
      ctx,
      form,
      quote: None,
      pricing: Task::new(),
      submit: Task::new(),
    }
  }

  fn address(&self) -> Address {
    let optional = |index| {
      let value = self.form.value(index);
      (!value.is_empty()).then(|| value.to_string())
    };
    let country = match self.form.value(COUNTRY) {
      "" => DEFAULT_COUNTRY.to_string(),
      value => value.to_string(),
    };

    Address {
      name: self.form.value(NAME).to_string(),
      company_name: optional(COMPANY),
      street_address: self.form.value(STREET).to_string(),
      city: self.form.value(CITY).to_string(),
      state: self.form.value(STATE).to_string(),
      country,
      post_code: optional(POST_CODE),
      phone_number: optional(PHONE),
    }
  }

  fn request_quote(&mut self) -> ViewAction {
    let address = self.address();
    let missing = missing_for_quote(&address);
    if !missing.is_empty() {
      return ViewAction::Notice(format!("Fill in: {}", missing.join(", ")));
    }

    let client = self.ctx.commerce.clone();
    let lines = self.ctx.cart.lines();
    self.pricing.run(async move { client.fetch_delivery_pricing(&lines, &address).await });
    ViewAction::None
  }

  fn place_order(&mut self) -> ViewAction {
    let address = self.address();
    let Some(delivery_price) = self.quote else {
      return ViewAction::Notice("Calculate shipping first (p)".to_string());
    };
    if address.phone_number.is_none() {
      return ViewAction::Notice("A phone number is required for delivery".to_string());
    }

    let client = self.ctx.commerce.clone();
    let lines = self.ctx.cart.lines();
    let payment_token = format!("mock_payment_token_{}", Utc::now().timestamp_millis());
    self.submit.run(async move {
      client
        .create_order(&lines, &address, delivery_price, &payment_token)
        .await
    });
    ViewAction::None
  }

  fn busy(&self) -> bool {
    self.pricing.is_pending() || self.submit.is_pending()
  }
}

/// Fields a shipping quote cannot be computed without.
fn missing_for_quote(address: &Address) -> Vec<&'static str> {
  let mut missing = Vec::new();
  if address.street_address.is_empty() {
    missing.push("street");
  }
  if address.city.is_empty() {
    missing.push("city");
  }
  if address.state.is_empty() {
    missing.push("state");
  }
  if address.post_code.is_none() {
    missing.push("post code");
  }
  missing
}

impl View for CheckoutView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.form.handle_key(key) {
      KeyResult::Event(FormEvent::Changed(_)) => {
        // Any address edit invalidates the quote
        self.quote = None;
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('p') if !self.busy() => self.request_quote(),
      KeyCode::Char('o') if !self.busy() => self.place_order(),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn handle_paste(&mut self, text: &str) -> ViewAction {
    if self.form.handle_paste(text).is_some() {
      self.quote = None;
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(FIELDS.len() as u16 + 2), Constraint::Min(0)])
      .split(area);

    self.form.render(frame, chunks[0], "Shipping address");

    let subtotal = self.ctx.cart.total_price();
    let dim = Style::default().fg(Color::DarkGray);
    let shipping = if self.pricing.is_pending() {
      Span::styled("calculating...", Style::default().fg(Color::Yellow))
    } else {
      match self.quote {
        Some(price) => Span::styled(format_price(price), Style::default().fg(Color::Green)),
        None => Span::styled("press p to calculate", dim),
      }
    };

    let mut lines = vec![
      Line::from(vec![
        Span::styled(" Items     ", dim),
        Span::raw(self.ctx.cart.total_items().to_string()),
      ]),
      Line::from(vec![
        Span::styled(" Subtotal  ", dim),
        Span::styled(format_price(subtotal), Style::default().fg(Color::Green)),
      ]),
      Line::from(vec![Span::styled(" Shipping  ", dim), shipping]),
    ];
    if let Some(quote) = self.quote {
      lines.push(Line::from(vec![
        Span::styled(" Total     ", dim),
        Span::styled(
          format_price(subtotal + quote),
          Style::default().fg(Color::Green).bold(),
        ),
      ]));
    }
    if self.submit.is_pending() {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(
        " Placing order...",
        Style::default().fg(Color::Yellow),
      )));
    }

    frame.render_widget(Paragraph::new(lines), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "Checkout".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    if let Some(result) = self.pricing.poll() {
      match result {
        Ok(price) => self.quote = Some(price),
        Err(e) => return ViewAction::Error(e),
      }
    }

    match self.submit.poll() {
      Some(Ok(order)) => {
        if let Err(e) = self.ctx.cart.clear() {
          tracing::warn!(error = %e, "Failed to clear cart after order");
        }
        ViewAction::Replace(Box::new(OrderDetailView::new(self.ctx.clone(), order.order_id)))
      }
      Some(Err(e)) => ViewAction::Error(e),
      None => ViewAction::None,
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_editing()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "edit field").with_priority(20),
      ShortcutInfo::new("p", "shipping quote").with_priority(21),
      ShortcutInfo::new("o", "place order").with_priority(22),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_missing_for_quote() {
    let mut address = Address {
      name: "Kim".into(),
      street_address: "1 Main St".into(),
      city: "Springfield".into(),
      country: "USA".into(),
      ..Default::default()
    };
    assert_eq!(missing_for_quote(&address), vec!["state", "post code"]);

    address.state = "IL".into();
    address.post_code = Some("62701".into());
    assert!(missing_for_quote(&address).is_empty());
  }
}
