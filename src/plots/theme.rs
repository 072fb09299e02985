use ratatui::style::{Color, Modifier, Style};

/// Colors of the figures, close to the usual plotting defaults on a dark terminal.
pub struct Theme;

impl Theme {
    pub const BG: Color = Color::Rgb(12, 12, 16);
    pub const FG: Color = Color::Rgb(220, 220, 220);
    pub const FG_MUTED: Color = Color::Rgb(120, 120, 130);

    // series
    pub const TRAIN: Color = Color::Rgb(31, 119, 180);
    pub const VALIDATION: Color = Color::Rgb(255, 127, 14);
    pub const ROC: Color = Color::Rgb(255, 140, 0);
    pub const CHANCE: Color = Color::Rgb(80, 80, 200);

    /// Default full-screen style.
    pub fn base() -> Style {
        Style::default().fg(Self::FG).bg(Self::BG)
    }

    pub fn border() -> Style {
        Style::default().fg(Self::FG_MUTED)
    }

    pub fn title() -> Style {
        Style::default().fg(Self::FG).add_modifier(Modifier::BOLD)
    }

    pub fn muted() -> Style {
        Style::default().fg(Self::FG_MUTED)
    }

    pub fn series(color: Color) -> Style {
        Style::default().fg(color)
    }

    /// The style of a confusion matrix cell holding `fraction` of the largest count. Larger
    /// counts get a darker blue.
    pub fn heat(fraction: f64) -> Style {
        let t = fraction.clamp(0., 1.);
        let lerp = |from: f64, to: f64| (from + (to - from) * t).round() as u8;

        let bg = Color::Rgb(lerp(222., 8.), lerp(235., 48.), lerp(247., 107.));
        let fg = if t > 0.5 { Color::White } else { Color::Black };

        Style::default().fg(fg).bg(bg).add_modifier(Modifier::BOLD)
    }

    /// Footer hint.
    pub fn hint() -> Style {
        Style::default()
            .fg(Self::FG_MUTED)
            .add_modifier(Modifier::ITALIC)
    }
}
