/// Available commands and autocomplete logic
use crate::auth::{Access, ADMIN_ACCESS, DELIVERY_ACCESS, WAREHOUSE_ACCESS};

#[derive(Debug, Clone)]
pub struct Command {
  pub name: &'static str,
  pub aliases: &'static [&'static str],
  pub description: &'static str,
  pub access: Access,
}

/// All available commands
pub const COMMANDS: &[Command] = &[
  Command {
    name: "products",
    aliases: &["p", "shop", "catalog"],
    description: "Browse the catalog",
    access: Access::Anyone,
  },
  Command {
    name: "cart",
    aliases: &["c", "basket"],
    description: "Review your cart",
    access: Access::Anyone,
  },
  Command {
    name: "orders",
    aliases: &["o", "order"],
    description: "Your orders",
    access: Access::SignedIn,
  },
  Command {
    name: "warehouse",
    aliases: &["w", "packaging"],
    description: "Packaging requests",
    access: WAREHOUSE_ACCESS,
  },
  Command {
    name: "delivery",
    aliases: &["d", "deliveries"],
    description: "Delivery queue",
    access: DELIVERY_ACCESS,
  },
  Command {
    name: "admin",
    aliases: &["new-product"],
    description: "Create a product",
    access: ADMIN_ACCESS,
  },
  Command {
    name: "login",
    aliases: &["signin"],
    description: "Sign in",
    access: Access::Anyone,
  },
  Command {
    name: "logout",
    aliases: &["signout"],
    description: "Sign out",
    access: Access::SignedIn,
  },
  Command {
    name: "refresh",
    aliases: &["r", "reload"],
    description: "Reload the current screen",
    access: Access::Anyone,
  },
  Command {
    name: "quit",
    aliases: &["q", "exit"],
    description: "Exit shopterm",
    access: Access::Anyone,
  },
];

/// Look up a command by exact name
pub fn find(name: &str) -> Option<&'static Command> {
  COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Get autocomplete suggestions for a given input
pub fn get_suggestions(input: &str) -> Vec<&'static Command> {
  let input_lower = input.to_lowercase();

  if input_lower.is_empty() {
    return COMMANDS.iter().collect();
  }

  let mut matches: Vec<(&Command, u32)> = Vec::new();

  for cmd in COMMANDS {
    let priority = if cmd.name == input_lower {
      0
    } else if cmd.aliases.contains(&input_lower.as_str()) {
      1
    } else if cmd.name.starts_with(&input_lower) {
      2
    } else if cmd.aliases.iter().any(|a| a.starts_with(&input_lower)) {
      3
    } else if cmd.name.contains(&input_lower) {
      4
    } else if cmd.aliases.iter().any(|a| a.contains(&input_lower)) {
      5
    } else {
      continue;
    };
    matches.push((cmd, priority));
  }

  // Stable sort keeps declaration order within a priority
  matches.sort_by_key(|(_, priority)| *priority);

  matches.into_iter().map(|(cmd, _)| cmd).collect()
}
