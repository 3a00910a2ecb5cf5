use crate::tracker::TimerState;
use ratatui::prelude::Color;

/// Truncate to `max_len` characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a timer state
pub fn state_color(state: TimerState) -> Color {
  match state {
    TimerState::Active => Color::Green,
    TimerState::Paused => Color::Yellow,
    TimerState::Completed => Color::Blue,
    TimerState::NoSession => Color::DarkGray,
  }
}

/// `#RRGGBB` to a terminal color; anything else renders gray.
pub fn hex_color(hex: &str) -> Color {
  let parse = |range: std::ops::Range<usize>| {
    hex
      .get(range)
      .and_then(|h| u8::from_str_radix(h, 16).ok())
  };
  match (hex.len(), hex.starts_with('#')) {
    (7, true) => match (parse(1..3), parse(3..5), parse(5..7)) {
      (Some(r), Some(g), Some(b)) => Color::Rgb(r, g, b),
      _ => Color::Gray,
    },
    _ => Color::Gray,
  }
}
