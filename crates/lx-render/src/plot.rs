use lx_core::error::CoreError;
use lx_core::timeline::LoudnessTimeline;
use ratatui::buffer::Buffer;
use ratatui::layout::Rect;
use ratatui::style::{Color, Style};
use ratatui::symbols::Marker;
use ratatui::widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Widget};
use ratatui::Frame;

/// Couleurs des séries, dans l'ordre de la requête.
const PALETTE: [Color; 6] = [
    Color::Cyan,
    Color::Yellow,
    Color::Red,
    Color::Green,
    Color::Magenta,
    Color::Blue,
];

/// Une série prête à tracer : points (temps, valeur).
struct PlotSeries {
    name: String,
    points: Vec<(f64, f64)>,
    visible: bool,
}

/// Graphe des séries d'une timeline en fonction du temps de frame.
///
/// Construit à partir d'une référence partagée : le tracé ne modifie jamais la
/// timeline. Une série vectorielle est tracée par la somme de chaque ligne.
///
/// # Example
/// ```
/// use lx_core::timeline::LoudnessTimeline;
/// use lx_render::plot::TimeSeriesPlot;
///
/// let mut timeline = LoudnessTimeline::new(1000.0, 10, -0.064, &[("ShortTermLoudness", 1)]);
/// for v in [0.0, 0.5, 1.0] {
///     timeline.series[0].push_frame(&[v]).unwrap();
/// }
/// let plot = TimeSeriesPlot::from_timeline(&timeline, &["ShortTermLoudness"], "Loudness").unwrap();
/// let text = plot.render_to_string(60, 15);
/// assert!(text.contains("ShortTermLoudness"));
/// ```
pub struct TimeSeriesPlot {
    title: String,
    series: Vec<PlotSeries>,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
}

impl TimeSeriesPlot {
    /// Prépare les séries `names` de `timeline`, en secondes décalage inclus.
    ///
    /// # Errors
    /// Returns [`CoreError::UnknownOutput`] if a name is not in the timeline.
    pub fn from_timeline<S: AsRef<str>>(
        timeline: &LoudnessTimeline,
        names: &[S],
        title: &str,
    ) -> Result<Self, CoreError> {
        let times = timeline.times();
        let mut series = Vec::with_capacity(names.len());
        for name in names {
            let source = timeline.series(name.as_ref())?;
            let points = times
                .iter()
                .zip(source.scalars())
                .map(|(&t, v)| (t, f64::from(v)))
                .collect();
            series.push(PlotSeries {
                name: source.name().to_string(),
                points,
                visible: true,
            });
        }

        let x_bounds = match (times.first(), times.last()) {
            (Some(&first), Some(&last)) if last > first => [first, last],
            (Some(&first), _) => [first, first + timeline.hop_duration()],
            _ => [timeline.frame_time_offset, timeline.frame_time_offset + 1.0],
        };

        let mut plot = Self {
            title: title.to_string(),
            series,
            x_bounds,
            y_bounds: [0.0, 1.0],
        };
        plot.update_y_bounds();
        log::debug!(
            "Plot « {title} » : {} séries, x {:?}, y {:?}",
            plot.series.len(),
            plot.x_bounds,
            plot.y_bounds
        );
        Ok(plot)
    }

    /// Bornes verticales sur les séries visibles, 0 inclus, 5 % de marge.
    fn update_y_bounds(&mut self) {
        let (min, max) = self
            .series
            .iter()
            .filter(|s| s.visible)
            .flat_map(|s| s.points.iter().map(|&(_, v)| v))
            .filter(|v| v.is_finite())
            .fold((0.0f64, f64::MIN), |(lo, hi), v| (lo.min(v), hi.max(v)));

        self.y_bounds = if max <= min {
            [min, min + 1.0]
        } else {
            [min, max + (max - min) * 0.05]
        };
    }

    /// Affiche ou masque la série `index`. Sans effet hors bornes.
    pub fn toggle(&mut self, index: usize) {
        if let Some(series) = self.series.get_mut(index) {
            series.visible = !series.visible;
            self.update_y_bounds();
        }
    }

    /// Number of series (visible or not).
    #[must_use]
    pub fn series_count(&self) -> usize {
        self.series.len()
    }

    /// Names of the series, in request order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.series.iter().map(|s| s.name.as_str())
    }

    /// Horizontal bounds (s).
    #[must_use]
    pub fn x_bounds(&self) -> [f64; 2] {
        self.x_bounds
    }

    /// Vertical bounds.
    #[must_use]
    pub fn y_bounds(&self) -> [f64; 2] {
        self.y_bounds
    }

    /// Widget `Chart` des séries visibles.
    #[must_use]
    pub fn chart(&self) -> Chart<'_> {
        let datasets: Vec<Dataset<'_>> = self
            .series
            .iter()
            .enumerate()
            .filter(|(_, s)| s.visible)
            .map(|(i, s)| {
                Dataset::default()
                    .name(s.name.as_str())
                    .marker(Marker::Braille)
                    .graph_type(GraphType::Line)
                    .style(Style::default().fg(PALETTE[i % PALETTE.len()]))
                    .data(&s.points)
            })
            .collect();

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;

        Chart::new(datasets)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .title(format!(" {} ", self.title)),
            )
            .x_axis(
                Axis::default()
                    .title("Temps (s)")
                    .style(Style::default().fg(Color::Gray))
                    .bounds(self.x_bounds)
                    .labels([
                        format!("{x0:.2}"),
                        format!("{:.2}", (x0 + x1) / 2.0),
                        format!("{x1:.2}"),
                    ]),
            )
            .y_axis(
                Axis::default()
                    .title("Sonie (sone)")
                    .style(Style::default().fg(Color::Gray))
                    .bounds(self.y_bounds)
                    .labels([
                        format!("{y0:.2}"),
                        format!("{:.2}", (y0 + y1) / 2.0),
                        format!("{y1:.2}"),
                    ]),
            )
            .legend_position(Some(LegendPosition::TopRight))
    }

    /// Rendu dans une zone d'un `Frame` terminal.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        frame.render_widget(self.chart(), area);
    }

    /// Rendu hors-écran dans un `Buffer` de `width × height` cellules.
    #[must_use]
    pub fn render_to_buffer(&self, width: u16, height: u16) -> Buffer {
        let area = Rect::new(0, 0, width, height);
        let mut buffer = Buffer::empty(area);
        self.chart().render(area, &mut buffer);
        buffer
    }

    /// Rendu hors-écran converti en texte, une ligne par rangée de cellules.
    #[must_use]
    pub fn render_to_string(&self, width: u16, height: u16) -> String {
        let buffer = self.render_to_buffer(width, height);
        let area = buffer.area;
        let mut text = String::with_capacity(usize::from(width + 1) * usize::from(height));
        for y in area.top()..area.bottom() {
            for x in area.left()..area.right() {
                if let Some(cell) = buffer.cell((x, y)) {
                    text.push_str(cell.symbol());
                }
            }
            text.push('\n');
        }
        text
    }
}
