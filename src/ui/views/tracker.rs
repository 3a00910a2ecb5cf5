use chrono::{Local, Utc};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::{Category, TimeSession};
use crate::context::AppContext;
use crate::query::{Mutation, Query};
use crate::stats::format_duration;
use crate::tracker::{format_hms, elapsed_seconds, SessionTracker, TimerState, Transition};
use crate::ui::components::{CategoryPicker, CategoryPickerEvent, ConfirmDialog, ConfirmEvent, KeyResult};
use crate::ui::renderfns::{hex_color, state_color};
use crate::ui::view::{ShortcutInfo, View, ViewAction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
  Stop,
  Delete,
}

/// The running session: big timer, state, category and controls
pub struct TrackerView {
  ctx: AppContext,
  tracker: SessionTracker,
  status: Mutation<Option<TimeSession>>,
  action: Mutation<TimeSession>,
  deletion: Mutation<String>,
  deleting: Option<u64>,
  categories: Query<Vec<Category>>,
  category: Option<Category>,
  picker: CategoryPicker,
  confirm: ConfirmDialog<Pending>,
  notice: Option<String>,
}

impl TrackerView {
  pub fn new(ctx: AppContext) -> Self {
    let api = ctx.api.categories();
    let mut categories = Query::new(move || {
      let api = api.clone();
      async move { api.list(false).await }
    })
    .with_stale_time(ctx.api.ttl().categories());
    categories.fetch();

    let mut view = Self {
      ctx,
      tracker: SessionTracker::new(),
      status: Mutation::new(),
      action: Mutation::new(),
      deletion: Mutation::new(),
      deleting: None,
      categories,
      category: None,
      picker: CategoryPicker::new(),
      confirm: ConfirmDialog::new(),
      notice: None,
    };
    view.reload(false);
    view
  }

  fn reload(&mut self, force: bool) {
    if self.tracker.begin_load().is_err() {
      return;
    }
    let api = self.ctx.api.time();
    self.status.spawn(async move { api.status(force).await });
  }

  fn start(&mut self) {
    if let Err(e) = self.tracker.begin_start() {
      self.notice = Some(e.to_string());
      return;
    }
    let api = self.ctx.api.time();
    let category_id = self.category.as_ref().map(|c| c.id);
    self.action.spawn(async move { api.start(category_id).await });
  }

  fn toggle_pause(&mut self) {
    let api = self.ctx.api.time();
    match self.tracker.state() {
      TimerState::Paused => match self.tracker.begin_resume() {
        Ok(id) => self.action.spawn(async move { api.resume(id).await }),
        Err(e) => self.notice = Some(e.to_string()),
      },
      _ => match self.tracker.begin_pause() {
        Ok(id) => self.action.spawn(async move { api.pause(id).await }),
        Err(e) => self.notice = Some(e.to_string()),
      },
    }
  }

  fn ask_stop(&mut self) {
    match self.tracker.request_stop() {
      Ok(()) => self.confirm.show(Pending::Stop, "Stop the current session?"),
      Err(e) => self.notice = Some(e.to_string()),
    }
  }

  fn stop(&mut self) {
    let id = match self
      .tracker
      .confirm_stop()
      .and_then(|confirmation| self.tracker.begin_stop(confirmation))
    {
      Ok(id) => id,
      Err(e) => {
        self.notice = Some(e.to_string());
        return;
      }
    };
    let api = self.ctx.api.time();
    self.action.spawn(async move { api.stop(id).await });
  }

  fn delete(&mut self) {
    match self.tracker.begin_delete() {
      Ok(id) => {
        let api = self.ctx.api.time();
        self.deleting = Some(id);
        self.deletion.spawn(async move { api.delete(id).await });
      }
      Err(e) => self.notice = Some(e.to_string()),
    }
  }

  fn handle_confirm(&mut self, event: ConfirmEvent<Pending>) {
    match event {
      ConfirmEvent::Confirmed(Pending::Stop) => self.stop(),
      ConfirmEvent::Declined(Pending::Stop) => self.tracker.cancel_stop(),
      ConfirmEvent::Confirmed(Pending::Delete) => self.delete(),
      ConfirmEvent::Declined(Pending::Delete) => {}
    }
  }

  fn render_timer(&self, frame: &mut Frame, area: Rect) {
    let state = self.tracker.state();
    let color = state_color(state);

    let status = match self.tracker.in_flight() {
      Some(transition) => transition.progress_label().to_string(),
      None if self.tracker.is_stop_pending() => "Stop requested".to_string(),
      None => state.label().to_string(),
    };
    let marker = if self.tracker.is_ticking() { "● " } else { "" };

    let mut lines = vec![
      Line::from(""),
      Line::from(Span::styled(
        format!("{}{}", marker, self.tracker.elapsed_hms()),
        Style::default().fg(color).add_modifier(Modifier::BOLD),
      )),
      Line::from(Span::styled(status, Style::default().fg(color))),
      Line::from(""),
    ];

    let category_line = match self.session_category() {
      Some((name, hex)) => Line::from(vec![
        Span::styled("Category  ", Style::default().fg(Color::DarkGray)),
        Span::styled("██ ", Style::default().fg(hex_color(&hex))),
        Span::raw(name),
      ]),
      None => Line::from(Span::styled("No category", Style::default().fg(Color::DarkGray))),
    };
    lines.push(category_line);

    if let Some(session) = self.tracker.session() {
      let started = session.start_time.with_timezone(&Local).format("%Y-%m-%d %H:%M");
      lines.push(Line::from(vec![
        Span::styled("Started   ", Style::default().fg(Color::DarkGray)),
        Span::raw(started.to_string()),
      ]));
      if session.total_paused_seconds > 0 {
        lines.push(Line::from(vec![
          Span::styled("Paused    ", Style::default().fg(Color::DarkGray)),
          Span::raw(format_duration(session.total_paused_seconds)),
        ]));
      }
    }

    if let Some(done) = self.tracker.last_completed() {
      lines.push(Line::from(""));
      lines.push(Line::from(vec![
        Span::styled("Last session  ", Style::default().fg(Color::DarkGray)),
        Span::raw(format_hms(elapsed_seconds(done, Utc::now()))),
      ]));
    }

    if let Some(notice) = &self.notice {
      lines.push(Line::from(""));
      lines.push(Line::from(Span::styled(notice.as_str(), Style::default().fg(Color::Yellow))));
    }

    let block = Block::default()
      .title(" Tracker ")
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));
    frame.render_widget(
      Paragraph::new(lines).alignment(Alignment::Center).block(block),
      area,
    );
  }

  /// Category of the running session, or the one chosen for the next start
  fn session_category(&self) -> Option<(String, String)> {
    let from_list = |id: u64| {
      self
        .categories
        .data()
        .and_then(|list| list.iter().find(|c| c.id == id))
    };
    match self.tracker.session() {
      Some(session) if session.is_open() => {
        if let Some(c) = &session.category {
          return Some((c.name.clone(), c.color_hex.clone()));
        }
        session
          .category_id
          .and_then(from_list)
          .map(|c| (c.name.clone(), c.color_hex.clone()))
      }
      _ => self
        .category
        .as_ref()
        .map(|c| (format!("{} (next)", c.name), c.color_hex.clone())),
    }
  }
}

impl View for TrackerView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.confirm.handle_key(key) {
      KeyResult::Event(event) => {
        self.handle_confirm(event);
        return ViewAction::None;
      }
      KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match self.picker.handle_key(key) {
      KeyResult::Event(CategoryPickerEvent::Selected(category)) => {
        self.category = category;
        return ViewAction::None;
      }
      KeyResult::Event(CategoryPickerEvent::Cancelled) | KeyResult::Handled => {
        return ViewAction::None;
      }
      KeyResult::NotHandled => {}
    }

    self.notice = None;
    match key.code {
      KeyCode::Char('s') => self.start(),
      KeyCode::Char('p') | KeyCode::Char(' ') => self.toggle_pause(),
      KeyCode::Char('x') => self.ask_stop(),
      KeyCode::Char('d') => {
        if self.tracker.session().is_some() {
          self.confirm.show(Pending::Delete, "Delete this session permanently?");
        } else {
          self.notice = Some("There is no session to delete".to_string());
        }
      }
      KeyCode::Char('c') => {
        if self.tracker.state().is_running() {
          self.notice = Some("The category is chosen before starting".to_string());
        } else {
          if self.categories.is_stale() {
            self.categories.refetch();
          }
          let list = self.categories.data().cloned().unwrap_or_default();
          self.picker.show(list, self.category.as_ref().map(|c| c.id));
        }
      }
      KeyCode::Char('r') => {
        self.tracker.clear_error();
        self.categories.refetch();
        self.reload(true);
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_timer(frame, area);
    self.picker.render_overlay(frame, area);
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Tracker".to_string()
  }

  fn tick(&mut self) {
    self.tracker.tick();
    self.categories.poll();

    if let Some(result) = self.status.poll() {
      // Failures stay on the tracker for display
      let _ = self.tracker.finish_load(result, Utc::now());
    }
    if let Some(result) = self.action.poll() {
      if let Some(transition) = self.tracker.in_flight() {
        let _ = self.tracker.finish(transition, result, Utc::now());
        if transition == Transition::Stop && self.tracker.error().is_none() {
          self.notice = Some("Session saved".to_string());
        }
      }
    }
    if let Some(result) = self.deletion.poll() {
      if let Some(id) = self.deleting.take() {
        if let Ok(message) = self.tracker.finish_delete(id, result) {
          self.notice = Some(message);
        }
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.confirm.is_active() || self.picker.is_active()
  }

  fn error(&self) -> Option<String> {
    self
      .tracker
      .error()
      .map(str::to_string)
      .or_else(|| self.categories.error().map(|e| format!("Categories: {}", e)))
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("s", "start").with_priority(20),
      ShortcutInfo::new("p", "pause/resume").with_priority(21),
      ShortcutInfo::new("x", "stop").with_priority(22),
      ShortcutInfo::new("c", "category").with_priority(30),
      ShortcutInfo::new("d", "delete").with_priority(40),
      ShortcutInfo::new("r", "reload").with_priority(50),
      ShortcutInfo::new("q", "quit").with_priority(90),
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

  #[tokio::test]
  async fn test_open_picker_captures_input() {
    let ctx = AppContext::new(&Config::default(), CredentialStore::memory_only()).unwrap();
    let mut view = TrackerView::new(ctx);
    assert!(!view.captures_input());

    view.handle_key(key(KeyCode::Char('c')));
    assert!(view.captures_input());

    view.handle_key(key(KeyCode::Esc));
    assert!(!view.captures_input());
  }
}
