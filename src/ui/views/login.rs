use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph};

use crate::api::types::User;
use crate::context::AppContext;
use crate::query::Mutation;
use crate::ui::components::{InputResult, TextInput};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
  SignIn,
  Register,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
  Email,
  Name,
  Password,
  Confirm,
}

impl Mode {
  fn fields(self) -> &'static [Field] {
    match self {
      Mode::SignIn => &[Field::Email, Field::Password],
      Mode::Register => &[Field::Email, Field::Name, Field::Password, Field::Confirm],
    }
  }

  fn title(self) -> &'static str {
    match self {
      Mode::SignIn => " Sign in ",
      Mode::Register => " Create account ",
    }
  }
}

/// Sign-in and registration form
pub struct LoginView {
  ctx: AppContext,
  mode: Mode,
  email: TextInput,
  name: TextInput,
  password: TextInput,
  confirm: TextInput,
  focus: usize,
  remember: bool,
  request: Mutation<User>,
  notice: Option<String>,
  error: Option<String>,
}

impl LoginView {
  pub fn new(ctx: AppContext) -> Self {
    let remember = ctx.remember_me;
    Self {
      ctx,
      mode: Mode::SignIn,
      email: TextInput::new(),
      name: TextInput::new(),
      password: TextInput::masked(),
      confirm: TextInput::masked(),
      focus: 0,
      remember,
      request: Mutation::new(),
      notice: None,
      error: None,
    }
  }

  /// Shown above the form, e.g. why the user was sent back here
  pub fn with_notice(mut self, notice: impl Into<String>) -> Self {
    self.notice = Some(notice.into());
    self
  }

  fn focused_field(&self) -> Field {
    let fields = self.mode.fields();
    fields[self.focus.min(fields.len() - 1)]
  }

  fn input_mut(&mut self, field: Field) -> &mut TextInput {
    match field {
      Field::Email => &mut self.email,
      Field::Name => &mut self.name,
      Field::Password => &mut self.password,
      Field::Confirm => &mut self.confirm,
    }
  }

  fn move_focus(&mut self, forward: bool) {
    let count = self.mode.fields().len();
    self.focus = if forward {
      (self.focus + 1) % count
    } else {
      self.focus.checked_sub(1).unwrap_or(count - 1)
    };
  }

  fn switch_mode(&mut self) {
    self.mode = match self.mode {
      Mode::SignIn => Mode::Register,
      Mode::Register => Mode::SignIn,
    };
    self.focus = 0;
    self.error = None;
    self.confirm.clear();
  }

  fn submit(&mut self) {
    if self.request.is_pending() {
      return;
    }

    let email = self.email.value().trim().to_string();
    let password = self.password.value().to_string();
    let remember = self.remember;

    let checked = match self.mode {
      Mode::SignIn => validation::sign_in(&email, &password),
      Mode::Register => validation::registration(&email, &password, self.confirm.value()),
    };
    if let Err(e) = checked {
      self.error = Some(e.to_string());
      return;
    }

    self.error = None;
    let api = self.ctx.api.clone();
    match self.mode {
      Mode::SignIn => self.request.spawn(async move {
        api.auth().login(&email, &password, remember).await
      }),
      Mode::Register => {
        let name = self.name.value().trim().to_string();
        self.request.spawn(async move {
          let name = (!name.is_empty()).then_some(name);
          api
            .auth()
            .register(&email, &password, name.as_deref(), remember)
            .await
        })
      }
    }
  }
}

impl View for LoginView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    match key.code {
      KeyCode::Char('r') if ctrl => {
        self.remember = !self.remember;
        return ViewAction::None;
      }
      KeyCode::Char('t') if ctrl => {
        self.switch_mode();
        return ViewAction::None;
      }
      KeyCode::Tab | KeyCode::Down => {
        self.move_focus(true);
        return ViewAction::None;
      }
      KeyCode::BackTab | KeyCode::Up => {
        self.move_focus(false);
        return ViewAction::None;
      }
      _ => {}
    }

    let field = self.focused_field();
    match self.input_mut(field).handle_key(key) {
      InputResult::Submitted(_) => {
        if self.focus + 1 < self.mode.fields().len() {
          self.move_focus(true);
        } else {
          self.submit();
        }
      }
      InputResult::Cancelled => self.error = None,
      InputResult::Consumed | InputResult::NotHandled => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let fields = self.mode.fields();
    let width = 56.min(area.width.saturating_sub(2));
    let height = (fields.len() as u16 * 3 + 7).min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let form_area = Rect::new(x, y, width, height);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue))
      .title(self.mode.title())
      .title_alignment(Alignment::Center);
    let inner = block.inner(form_area);
    frame.render_widget(block, form_area);

    let mut constraints = vec![Constraint::Length(1)];
    constraints.extend(fields.iter().map(|_| Constraint::Length(3)));
    constraints.extend([Constraint::Length(1), Constraint::Length(1), Constraint::Min(1)]);
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints(constraints)
      .split(inner);

    if let Some(notice) = &self.notice {
      frame.render_widget(
        Paragraph::new(notice.as_str()).style(Style::default().fg(Color::Yellow)),
        rows[0],
      );
    }

    let focused = self.focused_field();
    for (i, field) in fields.iter().enumerate() {
      let (input, label) = match field {
        Field::Email => (&self.email, "Email"),
        Field::Name => (&self.name, "Name (optional)"),
        Field::Password => (&self.password, "Password"),
        Field::Confirm => (&self.confirm, "Confirm password"),
      };
      input.render_field(frame, rows[i + 1], label, *field == focused);
    }

    let after = fields.len() + 1;
    let check = if self.remember { "[x]" } else { "[ ]" };
    frame.render_widget(
      Paragraph::new(Line::from(vec![
        Span::styled(format!("{} ", check), Style::default().fg(Color::Cyan)),
        Span::raw("Remember me"),
        Span::styled("  (Ctrl+R)", Style::default().fg(Color::DarkGray)),
      ])),
      rows[after],
    );

    let status = if self.request.is_pending() {
      Line::from(Span::styled("Contacting server...", Style::default().fg(Color::DarkGray)))
    } else if let Some(error) = &self.error {
      Line::from(Span::styled(error.as_str(), Style::default().fg(Color::Red)))
    } else {
      Line::from("")
    };
    frame.render_widget(Paragraph::new(status), rows[after + 1]);

    let other = match self.mode {
      Mode::SignIn => "Ctrl+T create an account",
      Mode::Register => "Ctrl+T back to sign in",
    };
    frame.render_widget(
      Paragraph::new(format!("Enter submit  Tab next field  {}", other))
        .style(Style::default().fg(Color::DarkGray)),
      rows[after + 2],
    );
  }

  fn breadcrumb_label(&self) -> String {
    match self.mode {
      Mode::SignIn => "Sign in".to_string(),
      Mode::Register => "Register".to_string(),
    }
  }

  fn tick(&mut self) {
    if let Some(result) = self.request.poll() {
      match result {
        Ok(user) => tracing::info!(user_id = user.id, "signed in"),
        Err(e) => {
          self.password.clear();
          self.confirm.clear();
          self.error = Some(e.to_string());
        }
      }
    }
  }

  fn captures_input(&self) -> bool {
    true
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new("Enter", "submit").with_priority(10),
      ShortcutInfo::new("Ctrl+T", "sign in/register").with_priority(20),
      ShortcutInfo::new("Ctrl+C", "quit").with_priority(90),
    ]
  }
}
