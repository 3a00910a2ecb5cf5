use chrono::{Local, NaiveDate};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, Paragraph};

use crate::api::types::TimeStats;
use crate::context::AppContext;
use crate::query::{Query, QueryState};
use crate::stats::{self, DateRange};
use crate::ui::components::{InputResult, TextInput};
use crate::ui::renderfns::truncate;
use crate::ui::view::{ShortcutInfo, View, ViewAction};

/// Days shown in the daily bar chart
const DAILY_BARS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Edge {
  From,
  To,
}

/// Totals, daily chart, category breakdown and weekday averages
pub struct StatsView {
  ctx: AppContext,
  range: DateRange,
  query: Query<TimeStats>,
  editing: Option<(Edge, TextInput)>,
  input_error: Option<String>,
}

impl StatsView {
  pub fn new(ctx: AppContext) -> Self {
    let range = DateRange::month_to_date(Local::now().date_naive());
    let mut view = Self {
      query: Self::stats_query(&ctx, range, false),
      ctx,
      range,
      editing: None,
      input_error: None,
    };
    view.query.fetch();
    view
  }

  fn stats_query(ctx: &AppContext, range: DateRange, force: bool) -> Query<TimeStats> {
    let api = ctx.api.stats();
    Query::new(move || {
      let api = api.clone();
      async move { api.custom(range.start, range.end, force).await }
    })
  }

  fn load(&mut self, range: DateRange, force: bool) {
    self.range = range;
    self.query = Self::stats_query(&self.ctx, range, force);
    self.query.fetch();
  }

  fn apply_edit(&mut self, edge: Edge, value: &str) {
    let date = match NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
      Ok(date) => date,
      Err(_) => {
        self.input_error = Some(format!("'{}' is not a date (YYYY-MM-DD)", value.trim()));
        return;
      }
    };
    let (start, end) = match edge {
      Edge::From => (date, self.range.end),
      Edge::To => (self.range.start, date),
    };
    match DateRange::new(start, end) {
      Ok(range) => {
        self.input_error = None;
        self.load(range, false);
      }
      Err(e) => self.input_error = Some(e.to_string()),
    }
  }

  fn render_range(&self, frame: &mut Frame, area: Rect) {
    let mut spans = vec![
      Span::styled(" Range ", Style::default().fg(Color::DarkGray)),
      Span::styled(self.range.to_string(), Style::default().fg(Color::Yellow).bold()),
    ];
    if let Some((edge, input)) = &self.editing {
      let label = match edge {
        Edge::From => "  from: ",
        Edge::To => "  to: ",
      };
      spans.push(Span::styled(label, Style::default().fg(Color::Cyan)));
      spans.push(Span::raw(input.value().to_string()));
      spans.push(Span::styled("_", Style::default().fg(Color::Yellow)));
    } else if self.query.is_loading() {
      spans.push(Span::styled("  loading...", Style::default().fg(Color::DarkGray)));
    }
    frame.render_widget(Paragraph::new(Line::from(spans)), area);
  }

  fn render_summary(&self, frame: &mut Frame, area: Rect, data: &TimeStats) {
    let cards = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Ratio(1, 3); 3])
      .split(area);

    let longest_date = data
      .longest_session_date
      .get(..10)
      .unwrap_or(&data.longest_session_date)
      .to_string();
    let values = [
      ("Total", stats::format_duration(data.total_duration), String::new()),
      (
        "Average per day",
        stats::format_duration((data.average_daily_hours * 3600.0).round() as i64),
        String::new(),
      ),
      ("Longest session", stats::format_duration(data.longest_session), longest_date),
    ];

    for ((title, value, detail), card) in values.into_iter().zip(cards.iter()) {
      let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Blue))
        .title(format!(" {} ", title));
      let lines = vec![
        Line::from(Span::styled(value, Style::default().fg(Color::White).bold())),
        Line::from(Span::styled(detail, Style::default().fg(Color::DarkGray))),
      ];
      frame.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(block),
        *card,
      );
    }
  }

  fn render_daily(&self, frame: &mut Frame, area: Rect, data: &TimeStats) {
    let series = stats::daily_hours(&data.daily_stats, Some(DAILY_BARS));
    let bars: Vec<Bar> = series
      .iter()
      .map(|(date, hours)| {
        Bar::default()
          .value((hours * 100.0).round() as u64)
          .text_value(format!("{:.1}", hours))
          .label(Line::from(date.format("%d.%m").to_string()))
      })
      .collect();

    let chart = BarChart::default()
      .block(
        Block::default()
          .borders(Borders::ALL)
          .title(" Hours per day ")
          .border_style(Style::default().fg(Color::Blue)),
      )
      .data(BarGroup::default().bars(&bars))
      .bar_width(6)
      .bar_gap(1)
      .bar_style(Style::default().fg(Color::Green))
      .value_style(Style::default().fg(Color::Black).bg(Color::Green));
    frame.render_widget(chart, area);
  }

  fn render_breakdown(&self, frame: &mut Frame, area: Rect, data: &TimeStats) {
    let breakdown = stats::category_breakdown(&data.entries);
    let block = Block::default()
      .borders(Borders::ALL)
      .title(" By category ")
      .border_style(Style::default().fg(Color::Blue));

    if breakdown.is_empty() {
      frame.render_widget(
        Paragraph::new("No completed sessions in range")
          .style(Style::default().fg(Color::DarkGray))
          .block(block),
        area,
      );
      return;
    }

    let max = breakdown.first().map(|(_, h)| *h).unwrap_or(0.0).max(f64::EPSILON);
    let bar_room = area.width.saturating_sub(32) as f64;
    let items: Vec<ListItem> = breakdown
      .iter()
      .map(|(name, hours)| {
        let bar = "▇".repeat(((hours / max) * bar_room).round() as usize);
        ListItem::new(Line::from(vec![
          Span::raw(format!("{:<16}", truncate(name, 16))),
          Span::styled(format!("{:>7.2}h ", hours), Style::default().fg(Color::Yellow)),
          Span::styled(bar, Style::default().fg(Color::Cyan)),
        ]))
      })
      .collect();
    frame.render_widget(List::new(items).block(block), area);
  }

  fn render_weekdays(&self, frame: &mut Frame, area: Rect, data: &TimeStats) {
    let averages = stats::weekday_averages(&data.daily_stats);
    let bars: Vec<Bar> = averages
      .iter()
      .map(|(day, hours)| {
        Bar::default()
          .value((hours * 100.0).round() as u64)
          .text_value(format!("{:.1}", hours))
          .label(Line::from(*day))
      })
      .collect();

    let chart = BarChart::default()
      .block(
        Block::default()
          .borders(Borders::ALL)
          .title(" Average hours by weekday ")
          .border_style(Style::default().fg(Color::Blue)),
      )
      .data(BarGroup::default().bars(&bars))
      .bar_width(5)
      .bar_gap(2)
      .bar_style(Style::default().fg(Color::Magenta))
      .value_style(Style::default().fg(Color::Black).bg(Color::Magenta));
    frame.render_widget(chart, area);
  }
}

impl View for StatsView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    if let Some((edge, input)) = self.editing.as_mut() {
      let edge = *edge;
      match input.handle_key(key) {
        InputResult::Submitted(value) => {
          self.editing = None;
          self.apply_edit(edge, &value);
        }
        InputResult::Cancelled => self.editing = None,
        InputResult::Consumed | InputResult::NotHandled => {}
      }
      return ViewAction::None;
    }

    let today = Local::now().date_naive();
    match key.code {
      KeyCode::Char('m') => self.load(DateRange::month_to_date(today), false),
      KeyCode::Char('w') => self.load(DateRange::last_week(today), false),
      KeyCode::Char('l') => self.load(DateRange::last_month(today), false),
      KeyCode::Char('f') => {
        let current = self.range.start.format("%Y-%m-%d").to_string();
        self.editing = Some((Edge::From, TextInput::with_value(current)));
      }
      KeyCode::Char('t') => {
        let current = self.range.end.format("%Y-%m-%d").to_string();
        self.editing = Some((Edge::To, TextInput::with_value(current)));
      }
      KeyCode::Char('r') => self.load(self.range, true),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let rows = Layout::default()
      .direction(Direction::Vertical)
      .constraints([
        Constraint::Length(1),
        Constraint::Length(4),
        Constraint::Min(8),
        Constraint::Length(10),
      ])
      .split(area);

    self.render_range(frame, rows[0]);

    let data = match self.query.state() {
      QueryState::Success(data) => data,
      QueryState::Error(e) => {
        frame.render_widget(
          Paragraph::new(format!("Failed to load statistics: {}\nPress 'r' to retry.", e))
            .style(Style::default().fg(Color::Red))
            .block(Block::default().borders(Borders::ALL)),
          rows[2],
        );
        return;
      }
      QueryState::Idle | QueryState::Loading => return,
    };

    self.render_summary(frame, rows[1], data);
    let middle = Layout::default()
      .direction(Direction::Horizontal)
      .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
      .split(rows[2]);
    self.render_daily(frame, middle[0], data);
    self.render_breakdown(frame, middle[1], data);
    self.render_weekdays(frame, rows[3], data);
  }

  fn breadcrumb_label(&self) -> String {
    "Statistics".to_string()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn captures_input(&self) -> bool {
    self.editing.is_some()
  }

  fn error(&self) -> Option<String> {
    self.input_error.clone()
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![
      ShortcutInfo::new(":", "command").with_priority(10),
      ShortcutInfo::new("m", "month").with_priority(20),
      ShortcutInfo::new("w", "week").with_priority(21),
      ShortcutInfo::new("l", "last month").with_priority(22),
      ShortcutInfo::new("f/t", "from/to").with_priority(30),
      ShortcutInfo::new("r", "refresh").with_priority(50),
      ShortcutInfo::new("q", "back").with_priority(90),
    ]
  }
}
