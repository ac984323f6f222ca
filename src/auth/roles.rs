use super::session::User;

/// Who may open a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
  Anyone,
  SignedIn,
  /// Signed in and a member of at least one of these groups.
  Groups(&'static [&'static str]),
}

pub const WAREHOUSE_ACCESS: Access = Access::Groups(&["admin", "warehouse"]);
pub const DELIVERY_ACCESS: Access = Access::Groups(&["admin", "delivery"]);
pub const ADMIN_ACCESS: Access = Access::Groups(&["admin"]);

impl Access {
  pub fn allows(&self, user: Option<&User>) -> bool {
    match (self, user) {
      (Access::Anyone, _) => true,
      (_, None) => false,
      (Access::SignedIn, Some(_)) => true,
      (Access::Groups(groups), Some(user)) => {
        user.groups.iter().any(|g| groups.contains(&g.as_str()))
      }
    }
  }

  /// Message shown when access is refused.
  pub fn denial(&self, user: Option<&User>) -> String {
    match (self, user) {
      (_, None) => "Sign in first (:login)".to_string(),
      (Access::Groups(groups), Some(_)) => {
        format!("Requires group: {}", groups.join(" or "))
      }
      _ => "Not allowed".to_string(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn user(groups: &[&str]) -> User {
    User {
      sub: "u".into(),
      groups: groups.iter().map(|g| g.to_string()).collect(),
      ..Default::default()
    }
  }

  #[test]
  fn test_group_gating() {
    let courier = user(&["delivery"]);
    let admin = user(&["admin"]);
    let shopper = user(&[]);

    assert!(DELIVERY_ACCESS.allows(Some(&courier)));
    assert!(!WAREHOUSE_ACCESS.allows(Some(&courier)));
    assert!(WAREHOUSE_ACCESS.allows(Some(&admin)));
    assert!(DELIVERY_ACCESS.allows(Some(&admin)));
    assert!(!ADMIN_ACCESS.allows(Some(&shopper)));
    assert!(Access::SignedIn.allows(Some(&shopper)));
    assert!(!Access::SignedIn.allows(None));
    assert!(Access::Anyone.allows(None));
  }

  #[test]
  fn test_denial_messages() {
    assert_eq!(ADMIN_ACCESS.denial(None), "Sign in first (:login)");
    assert_eq!(
      WAREHOUSE_ACCESS.denial(Some(&user(&[]))),
      "Requires group: admin or warehouse"
    );
  }
}
