use crossterm::event::KeyEvent;
use ratatui::prelude::*;

use crate::gateway::GatewayError;

/// A keyboard shortcut hint for display in the header
#[derive(Debug, Clone)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
  pub priority: u8, // Lower = shown first
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self {
      key,
      label,
      priority: 100,
    }
  }

  pub const fn with_priority(mut self, priority: u8) -> Self {
    self.priority = priority;
    self
  }
}

/// Actions that a view can request in response to user input
pub enum ViewAction {
  /// No action needed
  None,
  /// Push a new view onto the stack
  Push(Box<dyn View>),
  /// Pop current view from stack (go back)
  Pop,
  /// Replace the current view
  Replace(Box<dyn View>),
  /// Replace the whole stack with a new root
  Reset(Box<dyn View>),
  /// Show a failed remote call; authorization failures end the session
  Error(GatewayError),
  /// Show an informational message
  Notice(String),
  /// Sign-in finished
  SignedIn,
  /// End the session
  Logout,
}

/// Trait for view behavior
///
/// Views handle their own input modes (forms, confirmations) and return
/// actions for the App to execute: App → View → Components.
///
/// Views that load data use `Query<T>` internally and poll it in `tick()`.
pub trait View {
  /// Handle a key event, returning an action for App to execute
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction;

  /// Handle pasted text. Most views ignore it.
  fn handle_paste(&mut self, _text: &str) -> ViewAction {
    ViewAction::None
  }

  /// Render the view to the frame
  fn render(&mut self, frame: &mut Frame, area: Rect);

  /// Get the breadcrumb label for this view
  fn breadcrumb_label(&self) -> String;

  /// Called on each tick to poll queries and tasks
  fn tick(&mut self) -> ViewAction {
    ViewAction::None
  }

  /// Called when the view becomes the top of the stack again
  fn on_resume(&mut self) {}

  /// Refetch everything the view shows
  fn refresh(&mut self) {}

  /// Whether the view is capturing text input (command palette stays closed)
  fn captures_input(&self) -> bool {
    false
  }

  /// Get keyboard shortcuts to display in the header
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}
