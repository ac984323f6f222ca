use super::input::{InputResult, TextInput};
use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

/// Emitted when a field's value was edited
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormEvent {
  Changed(usize),
}

#[derive(Debug, Clone)]
struct Field {
  label: &'static str,
  input: TextInput,
}

/// A column of labelled text fields.
///
/// Navigation mode: j/k or Tab move between fields, Enter or `i` edits.
/// Edit mode: keys go to the field, Enter or Esc return to navigation.
#[derive(Debug, Clone)]
pub struct Form {
  fields: Vec<Field>,
  focused: usize,
  editing: bool,
}

impl Form {
  pub fn new(labels: &[&'static str]) -> Self {
    Self {
      fields: labels
        .iter()
        .map(|&label| Field {
          label,
          input: TextInput::new(),
        })
        .collect(),
      focused: 0,
      editing: false,
    }
  }

  pub fn is_editing(&self) -> bool {
    self.editing
  }

  pub fn value(&self, index: usize) -> &str {
    self
      .fields
      .get(index)
      .map(|f| f.input.value().trim())
      .unwrap_or("")
  }

  pub fn set_value(&mut self, index: usize, value: &str) {
    if let Some(field) = self.fields.get_mut(index) {
      field.input.set_value(value);
    }
  }

  fn move_focus(&mut self, forward: bool) {
    let len = self.fields.len();
    if len == 0 {
      return;
    }
    self.focused = if forward {
      (self.focused + 1) % len
    } else {
      (self.focused + len - 1) % len
    };
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<FormEvent> {
    if self.editing {
      return match key.code {
        KeyCode::Tab => {
          self.move_focus(true);
          KeyResult::Handled
        }
        KeyCode::BackTab => {
          self.move_focus(false);
          KeyResult::Handled
        }
        _ => match self.fields[self.focused].input.handle_key(key) {
          InputResult::Submitted(_) | InputResult::Cancelled => {
            self.editing = false;
            KeyResult::Handled
          }
          InputResult::Consumed => KeyResult::Event(FormEvent::Changed(self.focused)),
          // Swallow so view shortcuts do not fire mid-edit
          InputResult::NotHandled => KeyResult::Handled,
        },
      };
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down | KeyCode::Tab => {
        self.move_focus(true);
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up | KeyCode::BackTab => {
        self.move_focus(false);
        KeyResult::Handled
      }
      KeyCode::Enter | KeyCode::Char('i') if !self.fields.is_empty() => {
        self.editing = true;
        KeyResult::Handled
      }
      _ => KeyResult::NotHandled,
    }
  }

  /// Paste into the focused field, entering edit mode.
  pub fn handle_paste(&mut self, text: &str) -> Option<FormEvent> {
    let field = self.fields.get_mut(self.focused)?;
    field.input.insert_str(text);
    self.editing = true;
    Some(FormEvent::Changed(self.focused))
  }

  pub fn render(&self, frame: &mut Frame, area: Rect, title: &str) {
    let border = if self.editing { Color::Yellow } else { Color::Blue };
    let block = Block::default()
      .title(format!(" {} ", title))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(border));

    let label_width = self.fields.iter().map(|f| f.label.len()).max().unwrap_or(0);

    let lines: Vec<Line> = self
      .fields
      .iter()
      .enumerate()
      .map(|(i, field)| {
        let focused = i == self.focused;
        let marker = if focused { "> " } else { "  " };
        let label_style = if focused {
          Style::default().fg(Color::Cyan).bold()
        } else {
          Style::default().fg(Color::DarkGray)
        };
        let mut spans = vec![
          Span::raw(marker),
          Span::styled(format!("{:<width$} ", field.label, width = label_width), label_style),
          Span::raw(field.input.value().to_string()),
        ];
        if focused && self.editing {
          spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
        }
        Line::from(spans)
      })
      .collect();

    frame.render_widget(Paragraph::new(lines).block(block), area);
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
  fn test_navigate_then_edit() {
    let mut form = Form::new(&["Name", "City"]);
    assert_eq!(form.handle_key(key(KeyCode::Char('x'))), KeyResult::NotHandled);

    form.handle_key(key(KeyCode::Char('j')));
    form.handle_key(key(KeyCode::Enter));
    assert!(form.is_editing());

    assert_eq!(
      form.handle_key(key(KeyCode::Char('O'))),
      KeyResult::Event(FormEvent::Changed(1))
    );
    form.handle_key(key(KeyCode::Char('z')));
    form.handle_key(key(KeyCode::Esc));
    assert!(!form.is_editing());
    assert_eq!(form.value(1), "Oz");
    assert_eq!(form.value(0), "");
  }

  #[test]
  fn test_edit_mode_swallows_shortcuts() {
    let mut form = Form::new(&["Name"]);
    form.handle_key(key(KeyCode::Char('i')));
    assert_eq!(
      form.handle_key(key(KeyCode::Char('q'))),
      KeyResult::Event(FormEvent::Changed(0))
    );
    assert_eq!(form.value(0), "q");
  }

  #[test]
  fn test_paste_and_trimmed_values() {
    let mut form = Form::new(&["Image"]);
    form.handle_paste("  /tmp/shoe.png ");
    assert!(form.is_editing());
    assert_eq!(form.value(0), "/tmp/shoe.png");
    assert_eq!(form.value(7), "");
  }
}
