use super::KeyResult;
use crate::query::QueryState;
use crate::ui::ensure_valid_selection;
use crate::ui::view::ShortcutInfo;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};

/// Events emitted by a paged list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageListEvent {
  /// Enter on a row
  Selected(usize),
  /// The next page was requested
  LoadMore,
  RefreshRequested,
  Back,
}

/// Selectable list over paginated data.
///
/// Moving past the last row, or pressing `n`, requests the next page when
/// there is one.
#[derive(Debug, Default)]
pub struct PageList {
  list_state: ListState,
}

impl PageList {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn selected(&self) -> Option<usize> {
    self.list_state.selected()
  }

  pub fn reset(&mut self) {
    self.list_state.select(Some(0));
  }

  pub fn handle_key(&mut self, key: KeyEvent, len: usize, has_more: bool) -> KeyResult<PageListEvent> {
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        let at_end = self.selected().map(|i| i + 1 >= len).unwrap_or(true);
        if at_end && has_more {
          return KeyResult::Event(PageListEvent::LoadMore);
        }
        self.list_state.select_next();
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
        KeyResult::Handled
      }
      KeyCode::Char('g') | KeyCode::Home => {
        self.list_state.select_first();
        KeyResult::Handled
      }
      KeyCode::Char('n') if has_more => KeyResult::Event(PageListEvent::LoadMore),
      KeyCode::Char('r') => KeyResult::Event(PageListEvent::RefreshRequested),
      KeyCode::Enter => match self.selected() {
        Some(idx) if idx < len => KeyResult::Event(PageListEvent::Selected(idx)),
        _ => KeyResult::Handled,
      },
      KeyCode::Char('q') | KeyCode::Esc => KeyResult::Event(PageListEvent::Back),
      _ => KeyResult::NotHandled,
    }
  }

  pub fn render(
    &mut self,
    frame: &mut Frame,
    area: Rect,
    title: &str,
    rows: Vec<ListItem>,
    state: &QueryState,
    has_more: bool,
  ) {
    let len = rows.len();
    ensure_valid_selection(&mut self.list_state, len);

    let more = if has_more { "+" } else { "" };
    let display_title = match state {
      QueryState::Loading if len == 0 => format!(" {} (loading...) ", title),
      QueryState::Loading | QueryState::LoadingMore => {
        format!(" {} ({}{}, loading...) ", title, len, more)
      }
      QueryState::Error(_) => format!(" {} ({}{}, failed) ", title, len, more),
      _ => format!(" {} ({}{}) ", title, len, more),
    };

    let block = Block::default()
      .title(display_title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 {
      let content = match state {
        QueryState::Loading | QueryState::Idle => "",
        QueryState::Error(_) => "Failed to load. Press 'r' to retry.",
        _ => "Nothing here.",
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let list = List::new(rows)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  pub fn shortcuts(has_more: bool) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new("enter", "open").with_priority(40),
      ShortcutInfo::new("r", "refresh").with_priority(60),
    ];
    if has_more {
      shortcuts.push(ShortcutInfo::new("n", "more").with_priority(61));
    }
    shortcuts
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
  fn test_moving_past_end_requests_next_page() {
    let mut list = PageList::new();
    list.reset();
    assert_eq!(list.handle_key(key(KeyCode::Char('j')), 2, true), KeyResult::Handled);
    assert_eq!(
      list.handle_key(key(KeyCode::Char('j')), 2, true),
      KeyResult::Event(PageListEvent::LoadMore)
    );
  }

  #[test]
  fn test_no_more_pages() {
    let mut list = PageList::new();
    list.reset();
    assert_eq!(list.handle_key(key(KeyCode::Char('n')), 1, false), KeyResult::NotHandled);
    assert_eq!(list.handle_key(key(KeyCode::Char('j')), 1, false), KeyResult::Handled);
  }

  #[test]
  fn test_enter_selects_row() {
    let mut list = PageList::new();
    list.reset();
    assert_eq!(
      list.handle_key(key(KeyCode::Enter), 3, false),
      KeyResult::Event(PageListEvent::Selected(0))
    );
    let mut empty = PageList::new();
    assert_eq!(empty.handle_key(key(KeyCode::Enter), 0, false), KeyResult::Handled);
  }
}
