pub mod components;
pub mod renderfns;
pub mod view;
pub mod views;

use ratatui::prelude::*;
use ratatui::widgets::ListState;

/// Keep a list selection inside `0..len`, selecting the first row when
/// nothing is selected yet.
pub fn ensure_valid_selection(state: &mut ListState, len: usize) {
  if len == 0 {
    state.select(None);
    return;
  }
  match state.selected() {
    Some(i) if i >= len => state.select(Some(len - 1)),
    None => state.select(Some(0)),
    _ => {}
  }
}

/// A rectangle of `percent_width` and fixed `height`, centered in `area`.
pub fn centered_rect(area: Rect, percent_width: u16, height: u16) -> Rect {
  let width = (area.width * percent_width / 100).max(20).min(area.width);
  let height = height.min(area.height);
  Rect::new(
    area.x + (area.width - width) / 2,
    area.y + (area.height - height) / 2,
    width,
    height,
  )
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_ensure_valid_selection() {
    let mut state = ListState::default();
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(0));

    state.select(Some(7));
    ensure_valid_selection(&mut state, 3);
    assert_eq!(state.selected(), Some(2));

    ensure_valid_selection(&mut state, 0);
    assert_eq!(state.selected(), None);
  }

  #[test]
  fn test_centered_rect_fits_small_areas() {
    let area = Rect::new(0, 0, 10, 4);
    let rect = centered_rect(area, 60, 9);
    assert_eq!(rect, Rect::new(0, 0, 10, 4));

    let rect = centered_rect(Rect::new(0, 0, 100, 40), 50, 10);
    assert_eq!(rect, Rect::new(25, 15, 50, 10));
  }
}
