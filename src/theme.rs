use ratatui::style::Color;

/// A UI color theme. Cycled with Ctrl+T; the choice persists in prefs.toml.
pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub muted: Color,
  pub accent: Color,
  pub border: Color,
  pub status: Color,
  pub error: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "dusk",
    bg: Color::Rgb(24, 24, 32),
    fg: Color::Rgb(216, 216, 228),
    muted: Color::Rgb(120, 120, 140),
    accent: Color::Rgb(158, 134, 255),
    border: Color::Rgb(64, 64, 84),
    status: Color::Rgb(134, 192, 255),
    error: Color::Rgb(255, 121, 121),
    highlight_fg: Color::Rgb(24, 24, 32),
    highlight_bg: Color::Rgb(158, 134, 255),
    stripe_bg: Color::Rgb(30, 30, 40),
    key_fg: Color::Rgb(24, 24, 32),
    key_bg: Color::Rgb(120, 120, 140),
  },
  Theme {
    name: "moss",
    bg: Color::Rgb(22, 28, 22),
    fg: Color::Rgb(214, 222, 210),
    muted: Color::Rgb(110, 128, 108),
    accent: Color::Rgb(140, 200, 120),
    border: Color::Rgb(58, 74, 56),
    status: Color::Rgb(180, 210, 140),
    error: Color::Rgb(240, 120, 100),
    highlight_fg: Color::Rgb(22, 28, 22),
    highlight_bg: Color::Rgb(140, 200, 120),
    stripe_bg: Color::Rgb(28, 36, 28),
    key_fg: Color::Rgb(22, 28, 22),
    key_bg: Color::Rgb(110, 128, 108),
  },
  Theme {
    name: "paper",
    bg: Color::Rgb(246, 242, 233),
    fg: Color::Rgb(52, 48, 42),
    muted: Color::Rgb(150, 142, 128),
    accent: Color::Rgb(194, 102, 58),
    border: Color::Rgb(206, 196, 180),
    status: Color::Rgb(90, 122, 160),
    error: Color::Rgb(184, 62, 62),
    highlight_fg: Color::Rgb(246, 242, 233),
    highlight_bg: Color::Rgb(194, 102, 58),
    stripe_bg: Color::Rgb(238, 232, 220),
    key_fg: Color::Rgb(246, 242, 233),
    key_bg: Color::Rgb(150, 142, 128),
  },
];
