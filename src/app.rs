use crate::config::Config;
use crate::context::AppContext;
use crate::event::{Event, EventHandler};
use crate::ui;
use crate::ui::components::{CommandEvent, CommandInput, KeyResult};
use crate::ui::view::{View, ViewAction};
use crate::ui::views::{CategoriesView, LoginView, PasswordView, StatsView, TrackerView};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;

const SESSION_EXPIRED: &str = "Session expired. Please sign in again";

/// Main application state
pub struct App {
  ctx: AppContext,

  /// Navigation stack - root is always at index 0
  view_stack: Vec<Box<dyn View>>,

  /// `:` command palette
  command: CommandInput,

  /// True while the root is the sign-in form
  showing_login: bool,

  /// One-shot status line text, cleared on the next key
  message: Option<String>,

  tick_rate: Duration,

  /// Whether to quit
  should_quit: bool,
}

impl App {
  pub fn new(ctx: AppContext, config: &Config) -> Self {
    let mut app = Self {
      ctx,
      view_stack: Vec::new(),
      command: CommandInput::new(),
      showing_login: false,
      message: None,
      tick_rate: config.ui.tick_rate(),
      should_quit: false,
    };
    if app.ctx.auth.is_authenticated() {
      app.set_root(Box::new(TrackerView::new(app.ctx.clone())));
    } else {
      app.show_login(None);
    }
    app
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    let mut events = EventHandler::new(self.tick_rate);
    let tx = events.sender();
    self.ctx.auth.on_auth_required(move || {
      let _ = tx.send(Event::AuthRequired);
    });
    let tx = events.sender();
    self.ctx.auth.add_listener(move || {
      let _ = tx.send(Event::AuthChanged);
    });

    let result = self.event_loop(&mut terminal, &mut events).await;

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
    events: &mut EventHandler,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      match events.next().await {
        Some(event) => self.handle_event(event),
        None => break,
      }
    }
    Ok(())
  }

  pub fn ctx(&self) -> &AppContext {
    &self.ctx
  }

  pub fn command(&self) -> &CommandInput {
    &self.command
  }

  pub fn current_view(&self) -> Option<&dyn View> {
    self.view_stack.last().map(|v| v.as_ref())
  }

  pub fn current_view_mut(&mut self) -> Option<&mut Box<dyn View>> {
    self.view_stack.last_mut()
  }

  pub fn breadcrumb(&self) -> Vec<String> {
    self.view_stack.iter().map(|v| v.breadcrumb_label()).collect()
  }

  /// App message first, then the top view's latest error
  pub fn status_message(&self) -> Option<String> {
    self
      .message
      .clone()
      .or_else(|| self.current_view().and_then(|v| v.error()))
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Tick => {
        // Views below the top keep polling, so a running timer stays current
        for view in self.view_stack.iter_mut() {
          view.tick();
        }
      }
      Event::AuthRequired => {
        tracing::info!("sign-in required, showing login");
        if !self.showing_login {
          self.show_login(Some(SESSION_EXPIRED));
        }
      }
      Event::AuthChanged => self.sync_auth(),
    }
  }

  fn sync_auth(&mut self) {
    let signed_in = self.ctx.auth.is_authenticated();
    if signed_in && self.showing_login {
      self.message = self.ctx.user_label().map(|u| format!("Signed in as {}", u));
      self.set_root(Box::new(TrackerView::new(self.ctx.clone())));
    } else if !signed_in && !self.showing_login {
      self.show_login(None);
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }
    self.message = None;

    let captures = self.current_view().is_some_and(|v| v.captures_input());
    if self.command.is_active() || !captures {
      match self.command.handle_key(key) {
        KeyResult::Event(CommandEvent::Run(name)) => {
          self.run_command(name);
          return;
        }
        KeyResult::Event(CommandEvent::Unknown(input)) => {
          if !input.is_empty() {
            self.message = Some(format!("Unknown command: {}", input));
          }
          return;
        }
        KeyResult::Event(CommandEvent::Cancelled) | KeyResult::Handled => return,
        KeyResult::NotHandled => {}
      }
    }

    let action = match self.view_stack.last_mut() {
      Some(view) => view.handle_key(key),
      None => ViewAction::None,
    };
    self.apply(action);
  }

  fn apply(&mut self, action: ViewAction) {
    match action {
      ViewAction::None => {}
      ViewAction::Push(view) => self.view_stack.push(view),
      ViewAction::Pop => {
        if self.view_stack.len() > 1 {
          self.view_stack.pop();
        } else {
          self.should_quit = true;
        }
      }
    }
  }

  fn run_command(&mut self, name: &str) {
    tracing::debug!(command = name, "running command");
    if name == "quit" {
      self.should_quit = true;
      return;
    }
    if self.showing_login {
      self.message = Some("Sign in first".to_string());
      return;
    }

    match name {
      "tracker" => self.set_root(Box::new(TrackerView::new(self.ctx.clone()))),
      "categories" => self.set_root(Box::new(CategoriesView::new(self.ctx.clone()))),
      "stats" => self.set_root(Box::new(StatsView::new(self.ctx.clone()))),
      "password" => self.apply(ViewAction::Push(Box::new(PasswordView::new(self.ctx.clone())))),
      "logout" => {
        self.ctx.auth.logout();
        self.show_login(None);
        self.message = Some("Signed out".to_string());
      }
      other => self.message = Some(format!("Unknown command: {}", other)),
    }
  }

  fn set_root(&mut self, view: Box<dyn View>) {
    self.view_stack.clear();
    self.view_stack.push(view);
    self.showing_login = false;
  }

  fn show_login(&mut self, notice: Option<&str>) {
    let mut login = LoginView::new(self.ctx.clone());
    if let Some(notice) = notice {
      login = login.with_notice(notice);
    }
    self.set_root(Box::new(login));
    self.showing_login = true;
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::credentials::CredentialStore;

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  fn signed_out_app() -> App {
    let config = Config::default();
    let ctx = AppContext::new(&config, CredentialStore::memory_only()).unwrap();
    App::new(ctx, &config)
  }

  #[test]
  fn test_starts_on_login_when_signed_out() {
    let app = signed_out_app();
    assert!(app.showing_login);
    assert_eq!(app.breadcrumb(), vec!["Sign in".to_string()]);
  }

  #[test]
  fn test_login_form_keeps_colon_for_typing() {
    let mut app = signed_out_app();
    app.handle_key(key(KeyCode::Char(':')));
    assert!(!app.command.is_active());
  }

  #[test]
  fn test_ctrl_c_quits() {
    let mut app = signed_out_app();
    app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
    assert!(app.should_quit);
  }

  #[test]
  fn test_commands_need_sign_in() {
    let mut app = signed_out_app();
    app.run_command("stats");
    assert_eq!(app.status_message().as_deref(), Some("Sign in first"));
    assert!(app.showing_login);

    app.run_command("quit");
    assert!(app.should_quit);
  }
}
