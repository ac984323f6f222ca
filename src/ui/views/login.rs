use crate::app::AppContext;
use crate::auth::User;
use crate::query::Task;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};

/// Hosted sign-in: open the URL in a browser, then paste back the address
/// the browser was redirected to.
pub struct LoginView {
  ctx: AppContext,
  authorize_url: Result<String, String>,
  input: TextInput,
  editing: bool,
  exchange: Task<User, color_eyre::Report>,
}

impl LoginView {
  pub fn new(ctx: AppContext) -> Self {
    let authorize_url = ctx
      .identity
      .begin_login(&ctx.session)
      .map_err(|e| e.to_string());
    if let Err(e) = &authorize_url {
      tracing::error!(error = %e, "Could not start sign-in");
    }

    Self {
      ctx,
      authorize_url,
      input: TextInput::new(),
      editing: true,
      exchange: Task::new(),
    }
  }

  fn restart(&mut self) {
    self.authorize_url = self
      .ctx
      .identity
      .begin_login(&self.ctx.session)
      .map_err(|e| e.to_string());
    self.input.clear();
    self.editing = true;
  }

  fn submit(&mut self, redirect: String) -> ViewAction {
    let redirect = redirect.trim().to_string();
    if redirect.is_empty() {
      return ViewAction::Notice("Paste the address your browser was sent to".to_string());
    }

    let identity = self.ctx.identity.clone();
    let session = self.ctx.session.clone();
    self
      .exchange
      .run(async move { identity.complete_login(&session, &redirect).await });
    ViewAction::None
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.exchange.is_pending() {
      return ViewAction::None;
    }

    if self.editing {
      return match self.input.handle_key(key) {
        InputResult::Submitted(value) => self.submit(value),
        InputResult::Cancelled => {
          self.editing = false;
          ViewAction::None
        }
        InputResult::Consumed | InputResult::NotHandled => ViewAction::None,
      };
    }

    match key.code {
      KeyCode::Enter | KeyCode::Char('i') => {
        self.editing = true;
        ViewAction::None
      }
      KeyCode::Char('n') => {
        self.restart();
        ViewAction::None
      }
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn handle_paste(&mut self, text: &str) -> ViewAction {
    if !self.exchange.is_pending() {
      self.editing = true;
      self.input.insert_str(text);
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let block = Block::default()
      .title(" Sign in ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(0), Constraint::Length(3), Constraint::Length(1)])
      .split(inner);

    let dim = Style::default().fg(Color::DarkGray);
    let mut lines = vec![
      Line::from(" 1. Open this address in a browser and sign in:"),
      Line::from(""),
    ];
    match &self.authorize_url {
      Ok(url) => lines.push(Line::from(Span::styled(
        url.clone(),
        Style::default().fg(Color::Cyan),
      ))),
      Err(e) => lines.push(Line::from(Span::styled(
        format!("Could not start sign-in: {}", e),
        Style::default().fg(Color::Red),
      ))),
    }
    lines.push(Line::from(""));
    lines.push(Line::from(
      " 2. Copy the address the browser lands on and paste it below.",
    ));
    frame.render_widget(Paragraph::new(lines).wrap(Wrap { trim: false }), chunks[0]);

    let border = if self.editing {
      Style::default().fg(Color::Yellow)
    } else {
      dim
    };
    let input = Paragraph::new(self.input.value()).block(
      Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(" Redirect URL "),
    );
    frame.render_widget(input, chunks[1]);
    if self.editing {
      let x = chunks[1].x + 1 + self.input.cursor_position() as u16;
      frame.set_cursor_position((x.min(chunks[1].right().saturating_sub(2)), chunks[1].y + 1));
    }

    let status = if self.exchange.is_pending() {
      Span::styled(" Signing in...", Style::default().fg(Color::Yellow))
    } else {
      Span::styled(" enter: submit  esc: stop editing  n: new link", dim)
    };
    frame.render_widget(Paragraph::new(Line::from(status)), chunks[2]);
  }

  fn breadcrumb_label(&self) -> String {
    "Sign in".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    match self.exchange.poll() {
      Some(Ok(user)) => {
        tracing::info!(user = %user.display_name(), "Signed in");
        ViewAction::SignedIn
      }
      Some(Err(e)) => {
        tracing::warn!(error = %e, "Sign-in failed");
        // The state value is single use, so a retry needs a fresh link
        self.restart();
        ViewAction::Notice(format!("Sign-in failed: {}", e))
      }
      None => ViewAction::None,
    }
  }

  fn captures_input(&self) -> bool {
    self.editing
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "submit").with_priority(20),
      ShortcutInfo::new("n", "new link").with_priority(21),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
