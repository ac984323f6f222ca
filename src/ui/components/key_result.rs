/// What a component did with a key press.
///
/// Views try their components in order and stop at the first one that
/// does not answer `NotHandled`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyResult<T> {
  /// Consumed with nothing to report
  Handled,
  /// Consumed, and the view has something to react to
  Event(T),
  /// Not for this component
  NotHandled,
}

impl<T> KeyResult<T> {
  /// Whether the component took the key, with or without an event.
  pub fn consumed(&self) -> bool {
    !matches!(self, KeyResult::NotHandled)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_consumed() {
    assert!(KeyResult::<()>::Handled.consumed());
    assert!(KeyResult::Event(1).consumed());
    assert!(!KeyResult::<()>::NotHandled.consumed());
  }
}
