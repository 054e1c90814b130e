use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind};
use lx_core::config::PlotConfig;
use lx_render::plot::TimeSeriesPlot;
use lx_render::ui::{self, ViewState};
use ratatui::DefaultTerminal;

use crate::pipeline::Analysis;

/// Graphe interactif des analyses, une à la fois (Tab pour changer).
pub struct Viewer {
    analyses: Vec<Analysis>,
    plots: Vec<TimeSeriesPlot>,
    current: usize,
    state: ViewState,
    quitting: bool,
}

impl Viewer {
    /// Prépare un graphe par analyse.
    ///
    /// # Errors
    /// Returns an error if a timeline lacks one of its own series.
    pub fn new(analyses: Vec<Analysis>, config: &PlotConfig) -> Result<Self> {
        let plots = analyses
            .iter()
            .map(|a| {
                let names = a.timeline.names();
                TimeSeriesPlot::from_timeline(
                    &a.timeline,
                    names.as_slice(),
                    &format!("{} : {}", config.title, a.label),
                )
            })
            .collect::<Result<Vec<_>, _>>()?;
        let start = plots.first().map_or(0.0, |p| p.x_bounds()[0]);
        Ok(Self {
            analyses,
            plots,
            current: 0,
            state: ViewState::new(start),
            quitting: false,
        })
    }

    /// Boucle d'événements jusqu'à `q` ou Esc.
    ///
    /// # Errors
    /// Returns an error if terminal operations fail.
    pub fn run(&mut self, mut terminal: DefaultTerminal) -> Result<()> {
        while !self.quitting {
            if let (Some(plot), Some(analysis)) =
                (self.plots.get(self.current), self.analyses.get(self.current))
            {
                let state = &self.state;
                terminal.draw(|frame| ui::draw(frame, plot, &analysis.timeline, state))?;
            } else {
                break;
            }

            // Rendu statique : on attend simplement le prochain événement
            if event::poll(Duration::from_millis(250))? {
                self.handle_event(&event::read()?);
            }
        }
        Ok(())
    }

    fn handle_event(&mut self, event: &Event) {
        if let Event::Key(KeyEvent {
            code,
            kind: KeyEventKind::Press,
            ..
        }) = event
        {
            self.handle_key(*code);
        }
    }

    fn handle_key(&mut self, code: KeyCode) {
        let (hop, bounds) = match (self.analyses.get(self.current), self.plots.get(self.current)) {
            (Some(a), Some(p)) => (a.timeline.hop_duration(), p.x_bounds()),
            _ => {
                self.quitting = true;
                return;
            }
        };

        match code {
            KeyCode::Char('q') => self.quitting = true,
            KeyCode::Esc => {
                if self.state.help {
                    self.state.help = false;
                } else {
                    self.quitting = true;
                }
            }
            KeyCode::Char('?') => self.state.help = !self.state.help,
            KeyCode::Left => self.state.move_cursor(-hop, bounds),
            KeyCode::Right => self.state.move_cursor(hop, bounds),
            KeyCode::PageUp => self.state.move_cursor(-100.0 * hop, bounds),
            KeyCode::PageDown => self.state.move_cursor(100.0 * hop, bounds),
            KeyCode::Home => self.state.cursor = bounds[0],
            KeyCode::End => self.state.cursor = bounds[1],
            KeyCode::Char(c @ '1'..='9') => {
                if let (Some(digit), Some(plot)) = (c.to_digit(10), self.plots.get_mut(self.current)) {
                    plot.toggle(digit as usize - 1);
                }
            }
            KeyCode::Tab => {
                self.current = (self.current + 1) % self.plots.len().max(1);
                if let Some(plot) = self.plots.get(self.current) {
                    self.state.cursor = plot.x_bounds()[0];
                }
            }
            _ => {}
        }
    }
}
