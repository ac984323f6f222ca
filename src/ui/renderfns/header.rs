use crate::auth::User;
use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Header context, gathered by the app each frame
pub struct HeaderInfo<'a> {
  pub title: &'a str,
  pub user: Option<&'a User>,
  pub cart_items: i64,
  pub shortcuts: Vec<ShortcutInfo>,
}

/// Draw the header bar with logo, user, cart and shortcuts
pub fn draw_header(frame: &mut Frame, area: Rect, info: HeaderInfo) {
  let separator = Span::styled("│", Style::default().fg(Color::DarkGray));

  let mut spans = vec![
    Span::styled(" shopterm ", Style::default().fg(Color::Cyan).bold()),
    separator.clone(),
    Span::styled(format!(" {} ", info.title), Style::default().fg(Color::White)),
    separator.clone(),
  ];

  match info.user {
    Some(user) => {
      spans.push(Span::styled(
        format!(" {} ", user.display_name()),
        Style::default().fg(Color::Yellow).bold(),
      ));
      if !user.groups.is_empty() {
        spans.push(Span::styled(
          format!("[{}] ", user.groups.join(",")),
          Style::default().fg(Color::Magenta),
        ));
      }
    }
    None => spans.push(Span::styled(" guest ", Style::default().fg(Color::DarkGray))),
  }

  spans.push(separator);
  spans.push(Span::styled(
    format!(" cart: {} ", info.cart_items),
    Style::default().fg(Color::Green),
  ));
  spans.push(Span::raw(" "));
  spans.extend(shortcut_spans(info.shortcuts));

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Keys and brackets highlighted, descriptions dimmed
fn shortcut_spans(mut shortcuts: Vec<ShortcutInfo>) -> Vec<Span<'static>> {
  shortcuts.sort_by_key(|s| s.priority);
  shortcuts
    .into_iter()
    .flat_map(|s| {
      [
        Span::styled(format!(" <{}>", s.key), Style::default().fg(Color::Cyan)),
        Span::styled(format!(" {} ", s.label), Style::default().fg(Color::DarkGray)),
      ]
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_shortcuts_sorted_by_priority() {
    let spans = shortcut_spans(vec![
      ShortcutInfo::new("q", "back").with_priority(30),
      ShortcutInfo::new(":", "command").with_priority(10),
    ]);
    let text: String = spans.iter().map(|s| s.content.as_ref()).collect();
    assert_eq!(text, " <:> command  <q> back ");
  }
}
