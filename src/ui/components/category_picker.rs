use super::KeyResult;
use crate::api::types::Category;
use crate::ui::renderfns::hex_color;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState};

/// Events emitted by the category picker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CategoryPickerEvent {
  /// A category, or `None` for "no category"
  Selected(Option<Category>),
  Cancelled,
}

/// Overlay for choosing the category of the next session
#[derive(Debug, Clone, Default)]
pub struct CategoryPicker {
  active: bool,
  categories: Vec<Category>,
  /// 0 is "no category", then one row per category
  selected: usize,
}

impl CategoryPicker {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_active(&self) -> bool {
    self.active
  }

  /// Show the picker with the current choice preselected
  pub fn show(&mut self, categories: Vec<Category>, current: Option<u64>) {
    self.selected = current
      .and_then(|id| categories.iter().position(|c| c.id == id))
      .map(|i| i + 1)
      .unwrap_or(0);
    self.categories = categories;
    self.active = true;
  }

  pub fn hide(&mut self) {
    self.active = false;
    self.categories.clear();
    self.selected = 0;
  }

  fn rows(&self) -> usize {
    self.categories.len() + 1
  }

  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<CategoryPickerEvent> {
    if !self.active {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Esc | KeyCode::Char('q') => {
        self.hide();
        KeyResult::Event(CategoryPickerEvent::Cancelled)
      }
      KeyCode::Enter => {
        let choice = self
          .selected
          .checked_sub(1)
          .and_then(|i| self.categories.get(i))
          .cloned();
        self.hide();
        KeyResult::Event(CategoryPickerEvent::Selected(choice))
      }
      KeyCode::Char('j') | KeyCode::Down => {
        self.selected = (self.selected + 1) % self.rows();
        KeyResult::Handled
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.selected = self.selected.checked_sub(1).unwrap_or(self.rows() - 1);
        KeyResult::Handled
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    if !self.active {
      return;
    }

    let max_name_len = self
      .categories
      .iter()
      .map(|c| c.name.chars().count())
      .max()
      .unwrap_or(0)
      .max(12);
    let width = (max_name_len as u16 + 10).min(area.width.saturating_sub(4)).max(20);
    let height = (self.rows() as u16 + 2).min(area.height.saturating_sub(2)).max(3);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay_area);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(" Category ");

    let mut items = vec![ListItem::new(Line::from(Span::styled(
      "   (none)",
      Style::default().fg(Color::DarkGray),
    )))];
    items.extend(self.categories.iter().map(|c| {
      ListItem::new(Line::from(vec![
        Span::styled("██ ", Style::default().fg(hex_color(&c.color_hex))),
        Span::styled(c.name.as_str(), Style::default().fg(Color::Cyan)),
      ]))
    }));

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).fg(Color::White));
    let mut state = ListState::default();
    state.select(Some(self.selected));
    frame.render_stateful_widget(list, overlay_area, &mut state);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn categories() -> Vec<Category> {
    ["Work", "Study"]
      .iter()
      .enumerate()
      .map(|(i, name)| Category {
        id: i as u64 + 1,
        name: name.to_string(),
        color_hex: "#112233".to_string(),
        owner_id: 1,
      })
      .collect()
  }

  #[test]
  fn test_preselects_current() {
    let mut picker = CategoryPicker::new();
    picker.show(categories(), Some(2));
    match picker.handle_key(key(KeyCode::Enter)) {
      KeyResult::Event(CategoryPickerEvent::Selected(Some(c))) => assert_eq!(c.name, "Study"),
      other => panic!("unexpected {:?}", other),
    }
  }

  #[test]
  fn test_none_row_and_wrap() {
    let mut picker = CategoryPicker::new();
    picker.show(categories(), None);
    picker.handle_key(key(KeyCode::Up));
    picker.handle_key(key(KeyCode::Down));
    assert_eq!(
      picker.handle_key(key(KeyCode::Enter)),
      KeyResult::Event(CategoryPickerEvent::Selected(None))
    );
    assert!(!picker.is_active());
  }
}
