use crate::auth::{IdentityProvider, Session};
use crate::cart::Cart;
use crate::commands;
use crate::commerce::CommerceClient;
use crate::event::{Event, EventHandler};
use crate::ui::components::{CommandEvent, CommandInput, KeyResult, MessageBox, MessageEvent};
use crate::ui::renderfns::{draw_footer, draw_header, HeaderInfo};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{
  CartView, CreateProductView, DeliveryView, LoginView, OrderListView, ProductListView,
  WarehouseView,
};
use color_eyre::Result;
use crossterm::event::{DisableBracketedPaste, EnableBracketedPaste, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Everything a view needs to talk to the outside world.
#[derive(Clone)]
pub struct AppContext {
  pub commerce: CommerceClient,
  pub session: Arc<Session>,
  pub identity: Arc<IdentityProvider>,
  pub cart: Cart,
}

/// Main application state
pub struct App {
  ctx: AppContext,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command_input: CommandInput,

  /// Error and notice overlay
  message_box: MessageBox,

  /// Header title
  title: String,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(ctx: AppContext, title: String) -> Self {
    let root: Box<dyn View> = Box::new(ProductListView::new(ctx.clone()));
    Self {
      ctx,
      view_stack: vec![root],
      command_input: CommandInput::new(),
      message_box: MessageBox::new(),
      title,
      should_quit: false,
    }
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    stdout().execute(EnableBracketedPaste)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    self.refresh_session();
    let result = self.event_loop(&mut terminal).await;

    // Cleanup terminal, even when the loop failed
    stdout().execute(DisableBracketedPaste)?;
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>) -> Result<()> {
    let mut events = EventHandler::new(Duration::from_millis(250));

    while !self.should_quit {
      terminal.draw(|frame| self.draw(frame))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }

    Ok(())
  }

  /// Renew tokens in the background; a stale session only shows up as an
  /// authorization error later.
  fn refresh_session(&self) {
    let has_refresh_token = self
      .ctx
      .session
      .tokens()
      .map(|t| t.refresh_token.is_some())
      .unwrap_or(false);
    if !has_refresh_token {
      return;
    }

    let identity = self.ctx.identity.clone();
    let session = self.ctx.session.clone();
    tokio::spawn(async move {
      if let Err(e) = identity.refresh(&session).await {
        warn!(error = %e, "Token refresh failed");
      }
    });
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Paste(text) => {
        if !self.command_input.is_active() && !self.message_box.is_active() {
          if let Some(view) = self.view_stack.last_mut() {
            let action = view.handle_paste(&text);
            self.apply_action(action);
          }
        }
      }
      Event::Tick => {}
    }

    // Poll on every event; ticks stop arriving while keys are held down
    if let Some(view) = self.view_stack.last_mut() {
      let action = view.tick();
      self.apply_action(action);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    match self.message_box.handle_key(key) {
      KeyResult::Event(MessageEvent::SessionExpired) => {
        self.logout();
        self.apply_action(ViewAction::Reset(Box::new(ProductListView::new(self.ctx.clone()))));
        self.apply_action(ViewAction::Push(Box::new(LoginView::new(self.ctx.clone()))));
        return;
      }
      KeyResult::Event(MessageEvent::Dismissed) | KeyResult::Handled => return,
      KeyResult::NotHandled => {}
    }

    let captures_input = self
      .view_stack
      .last()
      .map(|v| v.captures_input())
      .unwrap_or(false);
    if !captures_input {
      match self.command_input.handle_key(key) {
        KeyResult::Event(CommandEvent::Submitted(cmd)) => {
          self.execute_command(&cmd);
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let Some(view) = self.view_stack.last_mut() else {
      return;
    };
    let action = view.handle_key(key);

    // Esc never quits from the root view; q does
    if matches!(action, ViewAction::Pop) && self.view_stack.len() == 1 && key.code == KeyCode::Esc {
      return;
    }
    self.apply_action(action);
  }

  fn apply_action(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
          if let Some(view) = self.view_stack.last_mut() {
            view.on_resume();
          }
        } else {
          self.should_quit = true;
        }
      }
      ViewAction::Replace(view) => {
        self.view_stack.pop();
        self.view_stack.push(view);
      }
      ViewAction::Reset(view) => {
        self.view_stack.clear();
        self.view_stack.push(view);
      }
      ViewAction::Error(error) => {
        warn!(error = %error, "Request failed");
        self.message_box.show_error(error);
      }
      ViewAction::Notice(text) => self.message_box.show_notice(text),
      ViewAction::SignedIn => {
        let name = self
          .ctx
          .session
          .user()
          .map(|u| u.display_name().to_string())
          .unwrap_or_default();
        self.apply_action(ViewAction::Reset(Box::new(ProductListView::new(self.ctx.clone()))));
        self.message_box.show_notice(format!("Signed in as {}", name));
      }
      ViewAction::Logout => {
        self.logout();
        self.apply_action(ViewAction::Reset(Box::new(ProductListView::new(self.ctx.clone()))));
        let text = match self.ctx.identity.logout_url() {
          Ok(Some(url)) => format!("Signed out. To end the browser session too, open:\n{}", url),
          _ => "Signed out".to_string(),
        };
        self.message_box.show_notice(text);
      }
    }
  }

  /// Forget the user and everything fetched or chosen on their behalf.
  fn logout(&mut self) {
    if let Err(e) = self.ctx.session.clear() {
      warn!(error = %e, "Failed to clear session");
    }
    self.ctx.commerce.cache().clear();
    if let Err(e) = self.ctx.cart.clear() {
      warn!(error = %e, "Failed to clear cart");
    }
    info!("Signed out");
  }

  fn execute_command(&mut self, input: &str) {
    let Some(cmd) = commands::find(input.trim()) else {
      self
        .message_box
        .show_notice(format!("Unknown command: {}", input.trim()));
      return;
    };

    let user = self.ctx.session.user();
    if !cmd.access.allows(user.as_ref()) {
      self.message_box.show_notice(cmd.access.denial(user.as_ref()));
      return;
    }

    let ctx = self.ctx.clone();
    let action = match cmd.name {
      "products" => ViewAction::Reset(Box::new(ProductListView::new(ctx))),
      "cart" => ViewAction::Reset(Box::new(CartView::new(ctx))),
      "orders" => ViewAction::Reset(Box::new(OrderListView::new(ctx))),
      "warehouse" => ViewAction::Reset(Box::new(WarehouseView::new(ctx))),
      "delivery" => ViewAction::Reset(Box::new(DeliveryView::new(ctx))),
      "admin" => ViewAction::Reset(Box::new(CreateProductView::new(ctx))),
      "login" => match user {
        Some(user) => ViewAction::Notice(format!("Already signed in as {}", user.display_name())),
        None => ViewAction::Push(Box::new(LoginView::new(ctx))),
      },
      "logout" => ViewAction::Logout,
      "refresh" => {
        if let Some(view) = self.view_stack.last_mut() {
          view.refresh();
        }
        ViewAction::None
      }
      "quit" => {
        self.should_quit = true;
        ViewAction::None
      }
      _ => ViewAction::None,
    };
    self.apply_action(action);
  }

  fn draw(&mut self, frame: &mut Frame) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
      ])
      .split(frame.area());

    let user = self.ctx.session.user();
    let shortcuts = self
      .view_stack
      .last()
      .map(|v| v.shortcuts())
      .unwrap_or_default();
    draw_header(
      frame,
      chunks[0],
      HeaderInfo {
        title: &self.title,
        user: user.as_ref(),
        cart_items: self.ctx.cart.total_items(),
        shortcuts,
      },
    );

    if let Some(view) = self.view_stack.last_mut() {
      view.render(frame, chunks[1]);
    }

    let breadcrumb: Vec<String> = self
      .view_stack
      .iter()
      .map(|v| v.breadcrumb_label())
      .collect();
    draw_footer(frame, chunks[2], &breadcrumb);

    self.command_input.render_overlay(frame, chunks[1], user.as_ref());
    self.message_box.render_overlay(frame, chunks[1]);
  }
}

#[cfg(test)]
impl AppContext {
  /// Context over scripted backend replies and an in-memory store.
  pub(crate) fn scripted(transport: Arc<crate::gateway::testing::ScriptedTransport>) -> Self {
    use crate::cache::NormalizedCache;
    use crate::config::IdentityConfig;
    use crate::gateway::{AuthScheme, Gateway};
    use crate::store::{KeyValueStore, SqliteStore};

    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::open_in_memory().unwrap());
    let session = Arc::new(Session::load(store.clone()).unwrap());
    let gateway = Gateway::new(transport, session.clone(), AuthScheme::Raw);
    let identity = IdentityProvider::new(IdentityConfig {
      domain: "auth.example.com".into(),
      client_id: "client".into(),
      redirect_uri: "http://localhost:3000/callback".into(),
      logout_uri: None,
      scopes: vec!["openid".into()],
    })
    .unwrap();

    Self {
      commerce: CommerceClient::new(gateway, NormalizedCache::new()),
      session,
      identity: Arc::new(identity),
      cart: Cart::load(store).unwrap(),
    }
  }
}
