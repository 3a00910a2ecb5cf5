use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::context::AppContext;
use crate::query::Mutation;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation;

const LABELS: [&str; 3] = ["Current password", "New password", "Confirm new password"];

/// Change the signed-in user's password
pub struct PasswordView {
  ctx: AppContext,
  fields: [TextInput; 3],
  focus: usize,
  request: Mutation<String>,
  message: Option<String>,
  error: Option<String>,
}

impl PasswordView {
  pub fn new(ctx: AppContext) -> Self {
    Self {
      ctx,
      fields: [TextInput::masked(), TextInput::masked(), TextInput::masked()],
      focus: 0,
      request: Mutation::new(),
      message: None,
      error: None,
    }
  }

  fn submit(&mut self) {
    if self.request.is_pending() {
      return;
    }
    let [old, new, confirm] = &self.fields;
    if let Err(e) = validation::password_change(old.value(), new.value(), confirm.value()) {
      self.error = Some(e.to_string());
      return;
    }

    self.error = None;
    self.message = None;
    let old = old.value().to_string();
    let new = new.value().to_string();
    let api = self.ctx.api.clone();
    self
      .request
      .spawn(async move { api.auth().change_password(&old, &new).await });
  }
}

impl View for PasswordView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Tab | KeyCode::Down => {
        self.focus = (self.focus + 1) % self.fields.len();
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.focus = self.focus.checked_sub(1).unwrap_or(self.fields.len() - 1);
        return ViewAction::None;
      }
      _ => {}
    }

    match self.fields[self.focus].handle_key(key) {
      InputResult::Submitted(_) if self.focus + 1 < self.fields.len() => self.focus += 1,
      InputResult::Submitted(_) => self.submit(),
      InputResult::Cancelled => return ViewAction::Pop,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let width = 56.min(area.width.saturating_sub(2));
    let height = 14.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let form_area = Rect::new(x, y, width, height);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue))
      .title(" Change password ")
      .title_alignment(Alignment::Center);
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(1),
      ])
      .split(inner);

    for (i, (field, label)) in self.fields.iter().zip(LABELS).enumerate() {
      field.render_field(frame, rows[i], label, i == self.focus);
    }

    let status = if self.request.is_pending() {
      Span::styled("Saving...", Style::default().fg(Color::DarkGray))
    } else if let Some(error) = &self.error {
      Span::styled(error.as_str(), Style::default().fg(Color::Red))
    } else if let Some(message) = &self.message {
      Span::styled(message.as_str(), Style::default().fg(Color::Green))
    } else {
      Span::styled("Enter save, Esc back", Style::default().fg(Color::DarkGray))
    };
    frame.render_widget(Paragraph::new(Line::from(status)), rows[3]);
  }

  fn breadcrumb_label(&self) -> String {
    "Password".to_string()
  }

  fn tick(&mut self) {
    if let Some(result) = self.request.poll() {
      match result {
        Ok(message) => {
          self.fields.iter_mut().for_each(TextInput::clear);
          self.focus = 0;
          self.message = Some(message);
        }
        Err(e) => self.error = Some(e.to_string()),
      }
    }
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Tab", "next field").with_priority(20),
      ShortcutInfo::new("Enter", "save").with_priority(30),
      ShortcutInfo::new("Esc", "back").with_priority(90),
    ]
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::Config;
  use crate::credentials::CredentialStore;
  use crossterm::event::KeyModifiers;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn view() -> PasswordView {
    let ctx = AppContext::new(&Config::default(), CredentialStore::memory_only()).unwrap();
    PasswordView::new(ctx)
  }

  #[test]
  fn test_mismatch_rejected_without_request() {
    let mut view = view();
    for (i, text) in ["oldpassword", "newpassword1", "newpassword2"].iter().enumerate() {
      for c in text.chars() {
        view.handle_key(key(KeyCode::Char(c)));
      }
      if i < 2 {
        view.handle_key(key(KeyCode::Enter));
      }
    }
    assert_eq!(view.focus, 2);
    view.handle_key(key(KeyCode::Enter));

    assert_eq!(view.error.as_deref(), Some("Passwords do not match"));
    assert!(!view.request.is_pending());
  }

  #[test]
  fn test_escape_goes_back() {
    let mut view = view();
    assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewAction::Pop));
  }
}
