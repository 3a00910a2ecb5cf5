use super::KeyResult;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, Paragraph, Wrap};

/// Yes/no overlay. `T` identifies what is being confirmed.
#[derive(Debug, Clone)]
pub struct ConfirmDialog<T> {
  pending: Option<(T, String)>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmEvent<T> {
  Confirmed(T),
  Declined(T),
}

impl<T: Clone> ConfirmDialog<T> {
  pub fn new() -> Self {
    Self { pending: None }
  }

  pub fn is_active(&self) -> bool {
    self.pending.is_some()
  }

  pub fn show(&mut self, subject: T, question: impl Into<String>) {
    self.pending = Some((subject, question.into()));
  }

  /// `y`/Enter confirms, `n`/Esc declines; other keys are swallowed.
  pub fn handle_key(&mut self, key: KeyEvent) -> KeyResult<ConfirmEvent<T>> {
    if self.pending.is_none() {
      return KeyResult::NotHandled;
    }

    match key.code {
      KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => match self.pending.take() {
        Some((subject, _)) => KeyResult::Event(ConfirmEvent::Confirmed(subject)),
        None => KeyResult::Handled,
      },
      KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc | KeyCode::Char('q') => {
        match self.pending.take() {
          Some((subject, _)) => KeyResult::Event(ConfirmEvent::Declined(subject)),
          None => KeyResult::Handled,
        }
      }
      _ => KeyResult::Handled,
    }
  }

  pub fn render_overlay(&self, frame: &mut Frame, area: Rect) {
    let Some((_, question)) = &self.pending else {
      return;
    };

    let width = (question.len() as u16 + 6).clamp(30, area.width.saturating_sub(4).max(30));
    let height = 5;
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay_area = Rect::new(x, y, width.min(area.width), height.min(area.height));

    frame.render_widget(Clear, overlay_area);
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Red))
      .title(" Confirm ");

    let text = vec![
      Line::from(question.as_str()),
      Line::from(""),
      Line::from(vec![
        Span::styled("<y>", Style::default().fg(Color::Cyan)),
        Span::styled(" yes   ", Style::default().fg(Color::DarkGray)),
        Span::styled("<n>", Style::default().fg(Color::Cyan)),
        Span::styled(" no", Style::default().fg(Color::DarkGray)),
      ]),
    ];
    let paragraph = Paragraph::new(text)
      .block(block)
      .alignment(Alignment::Center)
      .wrap(Wrap { trim: true });
    frame.render_widget(paragraph, overlay_area);
  }
}

impl<T: Clone> Default for ConfirmDialog<T> {
  fn default() -> Self {
    Self::new()
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
  fn test_confirm() {
    let mut dialog = ConfirmDialog::new();
    assert_eq!(dialog.handle_key(key(KeyCode::Char('y'))), KeyResult::NotHandled);

    dialog.show(7u64, "Delete?");
    assert_eq!(dialog.handle_key(key(KeyCode::Char('x'))), KeyResult::Handled);
    assert_eq!(
      dialog.handle_key(key(KeyCode::Char('y'))),
      KeyResult::Event(ConfirmEvent::Confirmed(7))
    );
    assert!(!dialog.is_active());
  }

  #[test]
  fn test_decline() {
    let mut dialog = ConfirmDialog::new();
    dialog.show("stop", "Stop?");
    assert_eq!(
      dialog.handle_key(key(KeyCode::Esc)),
      KeyResult::Event(ConfirmEvent::Declined("stop"))
    );
  }
}
