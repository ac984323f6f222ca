use std::path::Path;

use crate::app::AppContext;
use crate::commerce::types::{NewProduct, Product, ProductPackage};
use crate::commerce::ImageUpload;
use crate::query::Task;
use crate::ui::components::Form;
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

const NAME: usize = 0;
const CATEGORY: usize = 1;
const PRICE: usize = 2;
const QUANTITY: usize = 3;
const WIDTH: usize = 4;
const LENGTH: usize = 5;
const HEIGHT: usize = 6;
const WEIGHT: usize = 7;
const TAGS: usize = 8;
const IMAGE: usize = 9;

const FIELDS: &[&str] = &[
  "Name",
  "Category",
  "Price",
  "Quantity",
  "Width",
  "Length",
  "Height",
  "Weight",
  "Tags",
  "Image path",
];

/// Catalog entry form for admins
pub struct CreateProductView {
  ctx: AppContext,
  form: Form,
  submit: Task<Option<Product>>,
}

impl CreateProductView {
  pub fn new(ctx: AppContext) -> Self {
    Self {
      ctx,
      form: Form::new(FIELDS),
      submit: Task::new(),
    }
  }

  fn build(&self) -> Result<(NewProduct, Option<ImageUpload>), String> {
    let name = self.form.value(NAME);
    if name.is_empty() {
      return Err("Name is required".to_string());
    }

    let product = NewProduct {
      name: name.to_string(),
      category: self.form.value(CATEGORY).to_string(),
      price: parse_amount("Price", self.form.value(PRICE))?,
      quantity: parse_amount("Quantity", self.form.value(QUANTITY))?,
      package: ProductPackage {
        width: parse_amount("Width", self.form.value(WIDTH))?,
        length: parse_amount("Length", self.form.value(LENGTH))?,
        height: parse_amount("Height", self.form.value(HEIGHT))?,
        weight: parse_amount("Weight", self.form.value(WEIGHT))?,
      },
      tags: parse_tags(self.form.value(TAGS)),
      pictures: Vec::new(),
    };

    let image = match self.form.value(IMAGE) {
      "" => None,
      path => Some(read_image(Path::new(path))?),
    };

    Ok((product, image))
  }

  fn create(&mut self) -> ViewAction {
    let (product, image) = match self.build() {
      Ok(parts) => parts,
      Err(message) => return ViewAction::Notice(message),
    };

    let client = self.ctx.commerce.clone();
    self
      .submit
      .run(async move { client.create_product(product, image).await });
    ViewAction::None
  }
}

/// Parse a non-negative whole number; empty means zero.
fn parse_amount(label: &str, value: &str) -> Result<i64, String> {
  if value.is_empty() {
    return Ok(0);
  }
  match value.parse::<i64>() {
    Ok(n) if n >= 0 => Ok(n),
    _ => Err(format!("{} must be a whole number, got '{}'", label, value)),
  }
}

fn parse_tags(value: &str) -> Vec<String> {
  value
    .split(',')
    .map(str::trim)
    .filter(|t| !t.is_empty())
    .map(String::from)
    .collect()
}

fn content_type_for(path: &Path) -> Option<&'static str> {
  let ext = path.extension()?.to_str()?.to_ascii_lowercase();
  match ext.as_str() {
    "jpg" | "jpeg" => Some("image/jpeg"),
    "png" => Some("image/png"),
    "gif" => Some("image/gif"),
    "webp" => Some("image/webp"),
    _ => None,
  }
}

fn read_image(path: &Path) -> Result<ImageUpload, String> {
  let content_type = content_type_for(path)
    .ok_or_else(|| format!("Unsupported image type: {}", path.display()))?;
  let filename = path
    .file_name()
    .and_then(|n| n.to_str())
    .ok_or_else(|| format!("Invalid image path: {}", path.display()))?
    .to_string();
  let bytes = std::fs::read(path)
    .map_err(|e| format!("Could not read {}: {}", path.display(), e))?;

  Ok(ImageUpload {
    filename,
    content_type: content_type.to_string(),
    bytes,
  })
}

impl View for CreateProductView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.form.handle_key(key).consumed() {
      return ViewAction::None;
    }

    match key.code {
      KeyCode::Char('s') if !self.submit.is_pending() => self.create(),
      KeyCode::Char('q') | KeyCode::Esc => ViewAction::Pop,
      _ => ViewAction::None,
    }
  }

  fn handle_paste(&mut self, text: &str) -> ViewAction {
    self.form.handle_paste(text);
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Length(FIELDS.len() as u16 + 2), Constraint::Min(0)])
      .split(area);

    self.form.render(frame, chunks[0], "New product");

    let status = if self.submit.is_pending() {
      Span::styled(" Creating product...", Style::default().fg(Color::Yellow))
    } else {
      Span::styled(
        " Tags are comma separated. The image is uploaded before the product is created.",
        Style::default().fg(Color::DarkGray),
      )
    };
    frame.render_widget(Paragraph::new(Line::from(status)), chunks[1]);
  }

  fn breadcrumb_label(&self) -> String {
    "New product".to_string()
  }

  fn tick(&mut self) -> ViewAction {
    match self.submit.poll() {
      Some(Ok(created)) => {
        let name = created
          .map(|p| p.name)
          .unwrap_or_else(|| self.form.value(NAME).to_string());
        self.form = Form::new(FIELDS);
        ViewAction::Notice(format!("Created {}", name))
      }
      Some(Err(e)) => ViewAction::Error(e),
      None => ViewAction::None,
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_editing()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("enter", "edit field").with_priority(20),
      ShortcutInfo::new("s", "create").with_priority(21),
      ShortcutInfo::new("q", "back").with_priority(30),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::io::Write;

  #[test]
  fn test_parse_amount() {
    assert_eq!(parse_amount("Price", ""), Ok(0));
    assert_eq!(parse_amount("Price", "25"), Ok(25));
    assert!(parse_amount("Price", "-1").is_err());
    assert!(parse_amount("Price", "2.5").unwrap_err().contains("Price"));
  }

  #[test]
  fn test_parse_tags() {
    assert_eq!(parse_tags(" red, ,blue ,"), vec!["red", "blue"]);
    assert!(parse_tags("").is_empty());
  }

  #[test]
  fn test_read_image() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Mug.PNG");
    std::fs::File::create(&path).unwrap().write_all(b"png").unwrap();

    let image = read_image(&path).unwrap();
    assert_eq!(image.filename, "Mug.PNG");
    assert_eq!(image.content_type, "image/png");
    assert_eq!(image.bytes, b"png");

    assert!(read_image(&dir.path().join("notes.txt")).is_err());
  }
}
