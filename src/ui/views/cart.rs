use crate::app::AppContext;
use crate::auth::Access;
use crate::cart::CartItem;
use crate::commerce::types::format_price;
use crate::ui::components::{ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::ui::views::CheckoutView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

pub struct CartView {
  ctx: AppContext,
  list_state: ListState,
  confirm: ConfirmDialog,
}

impl CartView {
  pub fn new(ctx: AppContext) -> Self {
    Self {
      ctx,
      list_state: ListState::default(),
      confirm: ConfirmDialog::new(),
    }
  }

  fn selected_item(&self) -> Option<CartItem> {
    let items = self.ctx.cart.items();
    self.list_state.selected().and_then(|i| items.get(i).cloned())
  }

  fn change_quantity(&mut self, delta: i64) -> ViewAction {
    let Some(item) = self.selected_item() else {
      return ViewAction::None;
    };
    let mut quantity = item.quantity + delta;
    if let Some(stock) = item.product.quantity {
      quantity = quantity.min(stock.max(1));
    }
    // Decrementing stops at one; removal is explicit
    let quantity = quantity.max(1);
    self.update(|ctx| ctx.cart.update_quantity(&item.product.product_id, quantity))
  }

  fn update(&mut self, f: impl FnOnce(&AppContext) -> color_eyre::Result<()>) -> ViewAction {
    match f(&self.ctx) {
      Ok(()) => ViewAction::None,
      Err(e) => ViewAction::Notice(format!("Could not update cart: {}", e)),
    }
  }

  fn handle_overlays(&mut self, key: KeyEvent) -> Option<ViewAction> {
    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed) => Some(self.update(|ctx| ctx.cart.clear())),
      KeyResult::Event(ConfirmEvent::Cancelled) | KeyResult::Handled => Some(ViewAction::None),
      KeyResult::NotHandled => None,
    }
  }

  fn handle_actions(&mut self, key: KeyEvent) -> Option<ViewAction> {
    let action = match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
        ViewAction::None
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        ViewAction::None
      }
      KeyCode::Char('+') | KeyCode::Char('l') | KeyCode::Right => self.change_quantity(1),
      KeyCode::Char('-') | KeyCode::Char('h') | KeyCode::Left => self.change_quantity(-1),
      KeyCode::Char('d') | KeyCode::Delete => match self.selected_item() {
        Some(item) => self.update(|ctx| ctx.cart.remove(&item.product.product_id)),
        None => ViewAction::None,
      },
      KeyCode::Char('C') if !self.ctx.cart.is_empty() => {
        self.confirm.show("Remove everything from the cart?");
        ViewAction::None
      }
      KeyCode::Char('c') | KeyCode::Enter if !self.ctx.cart.is_empty() => {
        let user = self.ctx.session.user();
        if Access::SignedIn.allows(user.as_ref()) {
          ViewAction::Push(Box::new(CheckoutView::new(self.ctx.clone())))
        } else {
          ViewAction::Notice(Access::SignedIn.denial(None))
        }
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => return None,
    };
    Some(action)
  }
}

impl View for CartView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    self
      .handle_overlays(key)
      .or_else(|| self.handle_actions(key))
      .unwrap_or(ViewAction::None)
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let items = self.ctx.cart.items();
    ensure_valid_selection(&mut self.list_state, items.len());

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(0), Constraint::Length(2)])
      .split(area);

    let block = Block::default()
      .title(format!(" Cart ({}) ", self.ctx.cart.total_items()))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if items.is_empty() {
      let paragraph = Paragraph::new("Your cart is empty. Add products from :products.")
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, chunks[0]);
    } else {
      let rows: Vec<ListItem> = items
        .iter()
        .map(|item| {
          ListItem::new(Line::from(vec![
            Span::styled(format!("{:>4} x ", item.quantity), Style::default().fg(Color::Cyan)),
            Span::raw(format!("{:<40} ", truncate(&item.product.name, 40))),
            Span::styled(
              format!("{:>10}", format_price(item.product.price * item.quantity)),
              Style::default().fg(Color::Green),
            ),
          ]))
        })
        .collect();

      let list = List::new(rows)
        .block(block)
        .highlight_style(
          Style::default()
            .bg(Color::DarkGray)
            .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");
      frame.render_stateful_widget(list, chunks[0], &mut self.list_state);
    }

    let total = Line::from(vec![
      Span::styled(" Total ", Style::default().fg(Color::DarkGray)),
      Span::styled(
        format_price(self.ctx.cart.total_price()),
        Style::default().fg(Color::Green).bold(),
      ),
      Span::styled("  (shipping calculated at checkout)", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(total), chunks[1]);

    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Cart".to_string()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("+/-", "quantity").with_priority(20),
      ShortcutInfo::new("d", "remove").with_priority(21),
      ShortcutInfo::new("C", "clear").with_priority(22),
      ShortcutInfo::new("c", "checkout").with_priority(23),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
