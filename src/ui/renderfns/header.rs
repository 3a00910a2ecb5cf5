use crate::ui::view::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar: logo, server, signed-in user and shortcuts
pub fn draw_header(
  frame: &mut Frame,
  area: Rect,
  server_url: &str,
  user: Option<&str>,
  shortcuts: &[ShortcutInfo],
) {
  let host = extract_host(server_url);

  let mut spans = vec![
    Span::styled(" punch ", Style::default().fg(Color::Cyan).bold()),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    Span::styled(format!(" {} ", host), Style::default().fg(Color::White)),
    Span::styled("│", Style::default().fg(Color::DarkGray)),
    match user {
      Some(user) => Span::styled(format!(" {} ", user), Style::default().fg(Color::Yellow).bold()),
      None => Span::styled(" not signed in ", Style::default().fg(Color::DarkGray)),
    },
    Span::raw(" "),
  ];

  let mut visible: Vec<&ShortcutInfo> = shortcuts.iter().collect();
  visible.sort_by_key(|s| s.priority);
  for shortcut in visible {
    spans.push(Span::raw("  "));
    spans.push(Span::styled(format!("<{}>", shortcut.key), Style::default().fg(Color::Cyan)));
    spans.push(Span::styled(format!(" {}", shortcut.label), Style::default().fg(Color::DarkGray)));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::Black));
  frame.render_widget(paragraph, area);
}

/// Host and port of the server URL
fn extract_host(url: &str) -> &str {
  url
    .strip_prefix("https://")
    .or_else(|| url.strip_prefix("http://"))
    .unwrap_or(url)
    .split('/')
    .next()
    .unwrap_or(url)
}
