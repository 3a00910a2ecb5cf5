use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer: view breadcrumb on the left, the latest error on the right
pub fn draw_footer(frame: &mut Frame, area: Rect, breadcrumb: &[String], error: Option<&str>) {
  let mut spans = vec![Span::raw(" ")];

  for (i, part) in breadcrumb.iter().enumerate() {
    if i > 0 {
      spans.push(Span::styled(" > ", Style::default().fg(Color::DarkGray)));
    }
    let style = if i == breadcrumb.len() - 1 {
      Style::default().fg(Color::Cyan).bold()
    } else {
      Style::default().fg(Color::White)
    };
    spans.push(Span::styled(part.clone(), style));
  }

  let chunks = Layout::default()
    .direction(Direction::Horizontal)
    .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
    .split(area);

  let background = Style::default().bg(Color::Black);
  frame.render_widget(Paragraph::new(Line::from(spans)).style(background), chunks[0]);

  let error_line = match error {
    Some(msg) => Line::from(Span::styled(format!("{} ", msg), Style::default().fg(Color::Red))),
    None => Line::from(""),
  };
  frame.render_widget(
    Paragraph::new(error_line)
      .alignment(Alignment::Right)
      .style(background),
    chunks[1],
  );
}
