use std::time::Duration;

use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Margin, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
};

use crate::app::App;
use crate::audio::ContextFactory;
use crate::controls::ControlId;
use crate::visualizers::canvas::{Canvas, term_color};
use crate::visualizers::color::Rgba;
use crate::visualizers::glow::Glow;

const TITLE: &str = "DJ AUDIO VISUALIZER DECK";
const SLIDER_WIDTH: usize = 24;
const CONSOLE_HEIGHT: u16 = 13;
const ACCENT: Color = Color::Rgb(56, 189, 248);
const MUTED: Color = Color::Rgb(100, 116, 139);
const HELP: &str = "Space play/pause · n next · ↑↓ select · ←→ adjust · 0 reset · q quit";

/// Screen regions of one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeckLayout {
    /// Glow rings, outermost first. Empty when the terminal is too small.
    pub halo: [Rect; 3],
    pub deck: Rect,
    pub visualizer: Rect,
    /// Cell area the canvas is painted into.
    pub canvas: Rect,
    pub console: Rect,
}

impl DeckLayout {
    pub fn compute(area: Rect) -> Self {
        let fits_halo = area.width > 24 && area.height > CONSOLE_HEIGHT + 10;
        let halo = if fits_halo {
            [0u16, 1, 2].map(|i| area.inner(Margin::new(i * 2, i)))
        } else {
            [Rect::default(); 3]
        };
        let deck = if fits_halo {
            area.inner(Margin::new(6, 3))
        } else {
            area
        };

        let inside = deck.inner(Margin::new(1, 1));
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(3), Constraint::Length(CONSOLE_HEIGHT)])
            .split(inside);
        let visualizer = chunks[0];
        let console = chunks[1];

        Self {
            halo,
            deck,
            visualizer,
            canvas: visualizer.inner(Margin::new(1, 1)),
            console,
        }
    }
}

fn opaque(color: Rgba) -> Color {
    term_color(color.over(Rgba::BLACK))
}

fn clock(t: Duration) -> String {
    let secs = t.as_secs();
    format!("{:02}:{:02}", secs / 60, secs % 60)
}

/// Text slider such as `████████░░░░` for `value` in `range`.
fn slider(value: f32, (lo, hi): (f32, f32)) -> String {
    let fraction = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    let filled = (fraction * SLIDER_WIDTH as f32).round() as usize;
    let mut bar = "█".repeat(filled);
    bar.push_str(&"░".repeat(SLIDER_WIDTH - filled));
    bar
}

fn readout(id: ControlId, value: f32) -> String {
    match id {
        ControlId::Volume => format!("{:>4}%", (value * 100.0).round() as i32),
        ControlId::Band(_) => format!("{} dB", value.round() as i32),
    }
}

fn console_lines<F: ContextFactory>(app: &App<F>) -> Vec<Line<'static>> {
    let session = app.session();
    let mut lines = vec![Line::from(vec![
        Span::styled(
            format!("[{}] ", session.state().label().to_uppercase()),
            Style::default().fg(ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::raw(session.status().to_string()),
    ])];

    let track = match app.now_playing() {
        Some((name, position, duration)) => format!(
            "Track {}/{}: {}  {} / {}",
            app.track_index() + 1,
            app.playlist().len(),
            name,
            clock(position),
            clock(duration)
        ),
        None => "No track loaded".to_string(),
    };
    lines.push(Line::from(Span::styled(track, Style::default().fg(MUTED))));
    lines.push(Line::default());

    for id in ControlId::ALL {
        let selected = app.selection() == id;
        let value = app.control_value(id);
        let style = if selected {
            Style::default().fg(Color::Black).bg(ACCENT)
        } else {
            Style::default()
        };
        lines.push(Line::from(vec![
            Span::styled(if selected { "▶ " } else { "  " }, style),
            Span::styled(format!("{:<9}", id.label()), style),
            Span::raw(" "),
            Span::styled(slider(value, id.range()), Style::default().fg(ACCENT)),
            Span::raw(" "),
            Span::raw(readout(id, value)),
        ]));
    }

    lines.push(Line::default());
    lines.push(Line::from(Span::styled(HELP, Style::default().fg(MUTED))));
    lines
}

/// Draws the whole deck for one frame.
pub fn draw<F: ContextFactory>(
    f: &mut Frame,
    app: &App<F>,
    visualizer: &str,
    canvas: &Canvas,
    glow: &Glow,
) {
    let layout = DeckLayout::compute(f.area());

    for (ring, layer) in layout.halo.iter().zip(glow.layers.iter().rev()) {
        if ring.area() > 0 {
            let block = Block::default().style(Style::default().bg(opaque(layer.color)));
            f.render_widget(block, *ring);
        }
    }

    let border = opaque(glow.border);
    let deck = Block::default()
        .title(format!(" {} ", TITLE))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(Color::Black));
    f.render_widget(deck, layout.deck);

    let panel = Block::default()
        .title(format!(
            " {} · {} ",
            visualizer.to_uppercase(),
            app.session().state().label()
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border));
    f.render_widget(panel, layout.visualizer);
    f.render_widget(canvas.view(), layout.canvas);

    let console = Paragraph::new(console_lines(app)).block(
        Block::default()
            .title(" DJ MIX CONSOLE ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(MUTED)),
    );
    f.render_widget(console, layout.console);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DeckSettings;
    use crate::audio::OfflineContextFactory;
    use ratatui::{Terminal, backend::TestBackend};

    #[test]
    fn layout_nests_inside_the_halo() {
        let layout = DeckLayout::compute(Rect::new(0, 0, 120, 40));
        assert_eq!(layout.halo[0], Rect::new(0, 0, 120, 40));
        assert_eq!(layout.deck, Rect::new(6, 3, 108, 34));
        assert_eq!(layout.console.height, CONSOLE_HEIGHT);
        assert!(layout.canvas.width > 0 && layout.canvas.height > 0);
    }

    #[test]
    fn small_terminals_drop_the_halo() {
        let layout = DeckLayout::compute(Rect::new(0, 0, 20, 10));
        assert_eq!(layout.deck, Rect::new(0, 0, 20, 10));
        assert!(layout.halo.iter().all(|r| r.area() == 0));
    }

    #[test]
    fn slider_fills_in_proportion() {
        assert_eq!(slider(0.0, (-15.0, 15.0)).chars().filter(|&c| c == '█').count(), 12);
        assert_eq!(slider(1.0, (0.0, 1.0)), "█".repeat(SLIDER_WIDTH));
        assert_eq!(readout(ControlId::Volume, 0.8), "  80%");
        assert_eq!(readout(ControlId::Band(1), -3.0), "-3 dB");
        assert_eq!(readout(ControlId::Band(2), 4.0), "4 dB");
        assert_eq!(readout(ControlId::Band(3), 0.0), "0 dB");
    }

    #[test]
    fn deck_draws_titles_and_sliders() {
        let app = App::new(OfflineContextFactory::new(48_000, 2), &DeckSettings::default());
        let area = Rect::new(0, 0, 100, 40);
        let mut canvas = Canvas::new(1);
        let layout = DeckLayout::compute(area);
        canvas.resize(layout.canvas.width, layout.canvas.height);

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal
            .draw(|f| draw(f, &app, "Spectrum Lights", &canvas, &Glow::idle()))
            .unwrap();

        let text: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(text.contains(TITLE));
        assert!(text.contains("DJ MIX CONSOLE"));
        assert!(text.contains("SPECTRUM LIGHTS"));
        assert!(text.contains("TREBLE"));
        assert!(text.contains("Press Space to start audio"));
    }
}
