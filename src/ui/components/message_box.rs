use super::KeyResult;
use crate::gateway::GatewayError;
use crate::ui::centered_rect;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

#[derive(Debug, Clone, PartialEq)]
enum Message {
  Error(GatewayError),
  Notice(String),
}

/// Emitted when the user dismisses a message
#[derive(Debug, Clone, PartialEq)]
pub enum MessageEvent {
  Dismissed,
  /// An authorization error was acknowledged; the session must end
  SessionExpired,
}

/// Modal message overlay. Any of Enter, Esc, q or Space dismisses it.
#[derive(Debug, Clone, Default)]
pub struct MessageBox {
  message: Option<Message>,
}

impl MessageBox {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.message.is_some()
  }

  pub fn show_error(&mut self, error: GatewayError) {
    self.message = Some(Message::Error(error));
  }

  pub fn show_notice(&mut self, text: impl Into<String>) {
    self.message = Some(Message::Notice(text.into()));
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<MessageEvent> {
    let Some(message) = &self.message else {
      return KeyResult::NotHandled;
    };

    match key.code {
      KeyCode::Enter | KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char(' ') => {
        let expired = matches!(message, Message::Error(e) if e.is_authorization());
        self.message = None;
        if expired {
          KeyResult::Event(MessageEvent::SessionExpired)
        } else {
          KeyResult::Event(MessageEvent::Dismissed)
        }
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some(message) = &self.message else {
      return;
    };

    let (title, text, color) = match message {
      Message::Error(e) => (" Error ", e.user_message(), Color::Red),
      Message::Notice(text) => (" Notice ", text.clone(), Color::Green),
    };

    let overlay_area = centered_rect(area, 60, 9);
    frame.render_widget(Clear, overlay_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(color))
      .title(title)
      .title_bottom(Line::from(" <enter> ok ").right_aligned());

    let paragraph = Paragraph::new(text)
      .block(block)
      .wrap(Wrap { trim: true })
      .style(Style::default().fg(Color::White));
    frame.render_widget(paragraph, overlay_area);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_inactive_box_passes_keys() {
    let mut mb = MessageBox::new();
    assert_eq!(mb.handle_key(key(KeyCode::Enter)), KeyResult::NotHandled);
  }

  #[test]
  fn test_acknowledging_authorization_error_expires_session() {
    let mut mb = MessageBox::new();
    mb.show_error(GatewayError::Authorization("Token has expired".into()));
    assert_eq!(mb.handle_key(key(KeyCode::Char('x'))), KeyResult::Handled);
    assert_eq!(
      mb.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(MessageEvent::SessionExpired)
    );
    assert!(!mb.is_active());
  }

  #[test]
  fn test_other_errors_just_dismiss() {
    let mut mb = MessageBox::new();
    mb.show_error(GatewayError::Validation("Out of stock".into()));
    assert_eq!(mb.handle_key(key(KeyCode::Esc)), KeyResult::Event(MessageEvent::Dismissed));

    mb.show_notice("Order placed");
    assert_eq!(mb.handle_key(key(KeyCode::Enter)), KeyResult::Event(MessageEvent::Dismissed));
  }
}
