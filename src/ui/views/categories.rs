use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

use crate::api::types::Category;
use crate::context::AppContext;
use crate::error::ClientError;
use crate::query::{Mutation, Query, QueryState};
use crate::ui::components::{ConfirmDialog, ConfirmEvent, InputResult, KeyResult, TextInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{hex_color, truncate};
use crate::ui::view::{ShortcutInfo, View, ViewAction};
use crate::validation;

const DEFAULT_COLOR: &str = "#3b82f6";

/// Add/edit form shown as an overlay
struct CategoryForm {
  /// `None` when creating
  editing: Option<u64>,
  name: TextInput,
  color: TextInput,
  focus_color: bool,
  error: Option<String>,
}

impl CategoryForm {
  fn create() -> Self {
    Self {
      editing: None,
      name: TextInput::new(),
      color: TextInput::with_value(DEFAULT_COLOR),
      focus_color: false,
      error: None,
    }
  }

  fn edit(category: &Category) -> Self {
    Self {
      editing: Some(category.id),
      name: TextInput::with_value(category.name.clone()),
      color: TextInput::with_value(category.color_hex.clone()),
      focus_color: false,
      error: None,
    }
  }

  fn focused(&mut self) -> &mut TextInput {
    if self.focus_color {
      &mut self.color
    } else {
      &mut self.name
    }
  }

  fn render(&self, frame: &mut Frame, area: Rect) {
    let width = 50.min(area.width.saturating_sub(4));
    let height = 10.min(area.height);
    let x = area.x + area.width.saturating_sub(width) / 2;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let overlay = Rect::new(x, y, width, height);

    frame.render_widget(Clear, overlay);
    let title = if self.editing.is_some() {
      " Edit category "
    } else {
      " New category "
    };
    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Yellow))
      .title(title);
    let inner = block.inner(overlay);
    frame.render_widget(block, overlay);

    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(3),
        Constraint::Length(3),
        Constraint::Length(1),
        Constraint::Min(0),
      ])
      .split(inner);

    self.name.render_field(frame, rows[0], "Name", !self.focus_color);
    self.color.render_field(frame, rows[1], "Color #RRGGBB", self.focus_color);

    let swatch = Line::from(vec![
      Span::styled(" ██████ ", Style::default().fg(hex_color(self.color.value()))),
      Span::styled("Tab switch field, Enter save, Esc cancel", Style::default().fg(Color::DarkGray)),
    ]);
    frame.render_widget(Paragraph::new(swatch), rows[2]);

    if let Some(error) = &self.error {
      frame.render_widget(
        Paragraph::new(error.as_str()).style(Style::default().fg(Color::Red)),
        rows[3],
      );
    }
  }
}

/// Category list with create, edit and delete
pub struct CategoriesView {
  ctx: AppContext,
  query: Query<Vec<Category>>,
  list_state: ListState,
  form: Option<CategoryForm>,
  confirm: ConfirmDialog<u64>,
  saving: Mutation<String>,
  notice: Option<String>,
  error: Option<String>,
}

impl CategoriesView {
  pub fn new(ctx: AppContext) -> Self {
    let mut view = Self {
      query: Self::list_query(&ctx, false),
      ctx,
      list_state: ListState::default(),
      form: None,
      confirm: ConfirmDialog::new(),
      saving: Mutation::new(),
      notice: None,
      error: None,
    };
    view.query.fetch();
    view
  }

  fn list_query(ctx: &AppContext, force: bool) -> Query<Vec<Category>> {
    let api = ctx.api.categories();
    Query::new(move || {
      let api = api.clone();
      async move { api.list(force).await }
    })
  }

  fn categories(&self) -> &[Category] {
    self.query.data().map(|v| v.as_slice()).unwrap_or(&[])
  }

  fn selected(&self) -> Option<&Category> {
    self.list_state.selected().and_then(|i| self.categories().get(i))
  }

  fn refresh(&mut self, force: bool) {
    self.query = Self::list_query(&self.ctx, force);
    self.query.fetch();
  }

  fn submit_form(&mut self) {
    let Some(form) = self.form.as_mut() else {
      return;
    };
    let name = form.name.value().trim().to_string();
    let color = form.color.value().trim().to_string();
    if let Err(e) = validation::category(&name, &color) {
      form.error = Some(e.to_string());
      return;
    }

    let api = self.ctx.api.categories();
    match form.editing {
      Some(id) => self.saving.spawn(async move {
        let category = api.update(id, &name, &color).await?;
        Ok::<_, ClientError>(format!("Updated {}", category.name))
      }),
      None => self.saving.spawn(async move {
        let category = api.create(&name, &color).await?;
        Ok::<_, ClientError>(format!("Created {}", category.name))
      }),
    }
    self.form = None;
  }

  fn handle_form_key(&mut self, key: KeyEvent) {
    let Some(form) = self.form.as_mut() else {
      return;
    };
    match key.code {
      KeyCode::Tab | KeyCode::BackTab | KeyCode::Down | KeyCode::Up => {
        form.focus_color = !form.focus_color;
      }
      _ => match form.focused().handle_key(key) {
        InputResult::Submitted(_) => self.submit_form(),
        InputResult::Cancelled => self.form = None,
        InputResult::Consumed | InputResult::NotHandled => {}
      },
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let len = self.categories().len();
    ensure_valid_selection(&mut self.list_state, len);

    let title = match self.query.state() {
      QueryState::Loading => " Categories (loading...) ".to_string(),
      _ => format!(" Categories ({}) ", len),
    };
    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if len == 0 && !self.query.is_loading() {
      let content = if self.query.is_error() {
        "Failed to load categories. Press 'r' to retry."
      } else {
        "No categories yet. Press 'a' to add one."
      };
      frame.render_widget(
        Paragraph::new(content)
          .block(block)
          .style(Style::default().fg(Color::DarkGray)),
        area,
      );
      return;
    }

    let items: Vec<ListItem> = self
      .categories()
      .iter()
      .map(|c| {
        ListItem::new(Line::from(vec![
          Span::styled("██ ", Style::default().fg(hex_color(&c.color_hex))),
          Span::raw(format!("{:<32}", truncate(&c.name, 32))),
          Span::styled(c.color_hex.clone(), Style::default().fg(Color::DarkGray)),
        ]))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
      .highlight_symbol("> ");
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }
}

impl View for CategoriesView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if self.form.is_some() {
      self.handle_form_key(key);
      return ViewAction::None;
    }

    match self.confirm.handle_key(key) {
      KeyResult::Event(ConfirmEvent::Confirmed(id)) => {
        let api = self.ctx.api.categories();
        self.saving.spawn(async move { api.delete(id).await });
        return ViewAction::None;
      }
      KeyResult::Event(ConfirmEvent::Declined(_)) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    self.notice = None;
    match key.code {
      KeyCode::Char('j') | KeyCode::Down => self.list_state.select_next(),
      KeyCode::Char('k') | KeyCode::Up => self.list_state.select_previous(),
      KeyCode::Char('a') => self.form = Some(CategoryForm::create()),
      KeyCode::Char('e') | KeyCode::Enter => {
        if let Some(category) = self.selected() {
          self.form = Some(CategoryForm::edit(category));
        }
      }
      KeyCode::Char('D') => {
        if let Some(category) = self.selected() {
          let question = format!("Delete category '{}'?", category.name);
          let id = category.id;
          self.confirm.show(id, question);
        }
      }
      KeyCode::Char('r') => self.refresh(true),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let chunks = Layout::default()
      .direction(Direction::Vertical)
      .constraints([Constraint::Min(3), Constraint::Length(1)])
      .split(area);

    self.render_list(frame, chunks[0]);
    if let Some(notice) = &self.notice {
      frame.render_widget(
        Paragraph::new(format!(" {}", notice)).style(Style::default().fg(Color::Green)),
        chunks[1],
      );
    }

    if let Some(form) = &self.form {
      form.render(frame, area);
    }
    self.confirm.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    "Categories".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
    if let Some(result) = self.saving.poll() {
      match result {
        Ok(message) => {
          self.error = None;
          self.notice = Some(message);
          // The client already dropped its cached list
          self.refresh(false);
        }
        Err(e) => self.error = Some(e.to_string()),
      }
    }
  }

  fn captures_input(&self) -> bool {
    self.form.is_some() || self.confirm.is_active()
  }

  fn error(&self) -> Option<String> {
    self
      .error
      .clone()
      .or_else(|| self.query.error().map(str::to_string))
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("a", "add").with_priority(20),
      ShortcutInfo::new("e", "edit").with_priority(21),
      ShortcutInfo::new("D", "delete").with_priority(22),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
