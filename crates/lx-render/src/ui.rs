use lx_core::timeline::LoudnessTimeline;
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Clear, Paragraph};
use ratatui::Frame;

use crate::plot::TimeSeriesPlot;

/// État de la vue interactive, piloté par la boucle d'événements.
///
/// # Example
/// ```
/// use lx_render::ui::ViewState;
/// let state = ViewState::new(-0.064);
/// assert!(!state.help);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct ViewState {
    /// Instant inspecté (s), dans le repère des temps de frame.
    pub cursor: f64,
    /// Aide affichée.
    pub help: bool,
}

impl ViewState {
    /// Curseur placé à `start`.
    #[must_use]
    pub fn new(start: f64) -> Self {
        Self {
            cursor: start,
            help: false,
        }
    }

    /// Déplace le curseur de `delta` secondes, borné à `[lo, hi]`.
    pub fn move_cursor(&mut self, delta: f64, bounds: [f64; 2]) {
        self.cursor = (self.cursor + delta).clamp(bounds[0], bounds[1]);
    }
}

/// Draw the full UI: chart + sidebar.
pub fn draw(
    frame: &mut Frame,
    plot: &TimeSeriesPlot,
    timeline: &LoudnessTimeline,
    state: &ViewState,
) {
    let area = frame.area();

    // [chart | sidebar(26)]
    let chunks = Layout::horizontal([Constraint::Min(40), Constraint::Length(26)]).split(area);

    plot.draw(frame, chunks[0]);
    draw_sidebar(frame, chunks[1], plot, timeline, state);

    if state.help {
        draw_help_overlay(frame, area);
    }
}

/// Valeurs au curseur et statistiques de chaque série tracée.
fn draw_sidebar(
    frame: &mut Frame,
    area: Rect,
    plot: &TimeSeriesPlot,
    timeline: &LoudnessTimeline,
    state: &ViewState,
) {
    let heading = Style::default().fg(Color::Yellow);
    let mut lines = vec![
        Line::from(Span::styled("─ Curseur ──", heading)),
        Line::from(format!(" t = {:.3} s", state.cursor)),
        Line::from(format!(" {} frames", timeline.frame_count())),
        Line::from(format!(
            " hop {} @ {:.0} Hz",
            timeline.hop_size, timeline.sample_rate
        )),
    ];

    for (i, name) in plot.names().enumerate() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(
            format!("{} {}", i + 1, name),
            heading,
        )));

        let Ok(series) = timeline.series(name) else {
            continue;
        };
        if let Ok(Some(values)) = timeline.value_at_time(name, state.cursor) {
            let value: f32 = values.iter().sum();
            lines.push(Line::from(format!(" val  {value:.3}")));
        }
        if let Ok(Some(stats)) = timeline.stats(name) {
            lines.push(Line::from(format!(" max  {:.3}", stats.max)));
            lines.push(Line::from(format!(" moy  {:.3}", stats.mean)));
            lines.push(Line::from(format!(" pic  {:.3} s", stats.peak_time)));
        }
        if series.width() > 1 {
            lines.push(Line::from(Span::styled(
                format!(" Σ {} canaux", series.width()),
                Style::default().fg(Color::DarkGray),
            )));
        }
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        " ? = aide",
        Style::default().fg(Color::DarkGray),
    )));

    let sidebar =
        Paragraph::new(lines).block(Block::default().borders(Borders::LEFT).title(" Séries "));
    frame.render_widget(sidebar, area);
}

fn draw_help_overlay(frame: &mut Frame, area: Rect) {
    let help_text = vec![
        Line::from(Span::styled(" loudex ", Style::default().fg(Color::Yellow))),
        Line::from(""),
        Line::from(" q/Esc    Quitter"),
        Line::from(" ←/→      Curseur ± 1 hop"),
        Line::from(" PgUp/Dn  Curseur ± 100 hops"),
        Line::from(" Home/End Début / fin"),
        Line::from(" 1-9      Afficher/masquer série"),
        Line::from(" Tab      Entrée suivante"),
        Line::from(" ?        Aide"),
        Line::from(""),
        Line::from(Span::styled(
            " ? ou Esc pour fermer ",
            Style::default().fg(Color::DarkGray),
        )),
    ];

    let help_width = 34u16;
    let help_height = help_text.len() as u16 + 2;
    let x = area.x + area.width.saturating_sub(help_width) / 2;
    let y = area.y + area.height.saturating_sub(help_height) / 2;
    let help_area = Rect::new(x, y, help_width.min(area.width), help_height.min(area.height));

    let help = Paragraph::new(help_text).block(
        Block::default()
            .borders(Borders::ALL)
            .title(" Aide ")
            .style(Style::default().bg(Color::Black).fg(Color::White)),
    );

    frame.render_widget(Clear, help_area);
    frame.render_widget(help, help_area);
}
