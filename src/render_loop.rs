use std::io::{self, Stdout};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{Terminal, backend::CrosstermBackend, layout::Rect};
use tracing::{debug, info, warn};

use crate::app::{App, DeckCommand};
use crate::audio::ContextFactory;
use crate::ui::{self, DeckLayout};
use crate::visualizers::Visualizer;
use crate::visualizers::canvas::Canvas;

/// Shared flag that ends the render loop once raised.
#[derive(Debug, Clone, Default)]
pub struct StopSignal(Arc<AtomicBool>);

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stop(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Raw mode and alternate screen for as long as the guard lives.
pub struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    pub fn enter() -> Result<Self> {
        enable_raw_mode().context("Failed to enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("Failed to enter alternate screen")?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).context("Failed to open terminal")?;
        terminal.hide_cursor()?;
        Ok(Self { terminal })
    }

    pub fn terminal(&mut self) -> &mut Terminal<CrosstermBackend<Stdout>> {
        &mut self.terminal
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

/// Sizes `canvas` for a terminal of `cols × rows` cells.
pub fn fit_canvas(canvas: &mut Canvas, cols: u16, rows: u16) {
    let area = DeckLayout::compute(Rect::new(0, 0, cols, rows)).canvas;
    canvas.resize(area.width, area.height);
}

/// Fixed-rate cooperative loop: input, transport, one frame, then sleep
/// in `event::poll` for the rest of the frame budget.
pub struct RenderLoop {
    frame_budget: Duration,
    stop: StopSignal,
    canvas: Canvas,
    visualizer: Box<dyn Visualizer>,
}

impl RenderLoop {
    pub fn new<V: Visualizer + 'static>(fps: u32, canvas: Canvas, visualizer: V) -> Self {
        Self {
            frame_budget: Duration::from_secs(1) / fps.max(1),
            stop: StopSignal::new(),
            canvas,
            visualizer: Box::new(visualizer),
        }
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    /// Applies one terminal event. A resize reallocates the canvas once.
    pub fn handle_event<F: ContextFactory>(&mut self, app: &mut App<F>, event: Event) {
        match event {
            Event::Key(key) => {
                if let Some(command) = DeckCommand::from_key(key) {
                    debug!(?command, "key command");
                    if !app.handle(command) {
                        self.stop.stop();
                    }
                }
            }
            Event::Resize(cols, rows) => fit_canvas(&mut self.canvas, cols, rows),
            _ => {}
        }
    }

    pub fn run<F: ContextFactory>(
        &mut self,
        guard: &mut TerminalGuard,
        app: &mut App<F>,
    ) -> Result<()> {
        let size = guard.terminal().size()?;
        fit_canvas(&mut self.canvas, size.width, size.height);
        info!(
            fps = (1.0 / self.frame_budget.as_secs_f32()).round(),
            density = self.canvas.density(),
            visualizer = self.visualizer.name(),
            "render loop started"
        );

        while !self.stop.is_stopped() {
            let frame_start = Instant::now();

            app.poll_transport();
            let frame = self.visualizer.draw(app.tap(), &mut self.canvas);
            let glow = frame.glow();
            let canvas = &self.canvas;
            let name = self.visualizer.name();
            let view: &App<F> = app;
            let drawn = guard
                .terminal()
                .draw(|f| ui::draw(f, view, name, canvas, &glow));
            if let Err(err) = drawn {
                warn!("terminal draw failed, stopping: {}", err);
                self.stop.stop();
                break;
            }

            loop {
                let remaining = self.frame_budget.saturating_sub(frame_start.elapsed());
                if self.stop.is_stopped() || !event::poll(remaining)? {
                    break;
                }
                let event = event::read()?;
                self.handle_event(app, event);
            }
        }

        info!(resizes = self.canvas.resize_count(), "render loop stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::DeckSettings;
    use crate::audio::{AnalyserSettings, OfflineContextFactory};
    use crate::visualizers::FrameRenderer;
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

    fn fixture() -> (RenderLoop, App<OfflineContextFactory>) {
        let render_loop = RenderLoop::new(
            60,
            Canvas::new(2),
            FrameRenderer::new(AnalyserSettings::default()),
        );
        let app = App::new(OfflineContextFactory::new(48_000, 2), &DeckSettings::default());
        (render_loop, app)
    }

    #[test]
    fn each_resize_event_resizes_once() {
        let (mut render_loop, mut app) = fixture();
        render_loop.handle_event(&mut app, Event::Resize(120, 40));
        render_loop.handle_event(&mut app, Event::Resize(80, 30));
        render_loop.handle_event(&mut app, Event::FocusGained);
        assert_eq!(render_loop.canvas().resize_count(), 2);
        let expected = DeckLayout::compute(Rect::new(0, 0, 80, 30)).canvas;
        assert_eq!(render_loop.canvas().cells(), (expected.width, expected.height));
    }

    #[test]
    fn quit_key_raises_the_stop_signal() {
        let (mut render_loop, mut app) = fixture();
        let stop = render_loop.stop_signal();
        let key = |c| Event::Key(KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE));
        render_loop.handle_event(&mut app, key('0'));
        assert!(!stop.is_stopped());
        render_loop.handle_event(&mut app, key('q'));
        assert!(stop.is_stopped());
    }

    #[test]
    fn budget_follows_fps() {
        let (render_loop, _) = fixture();
        assert_eq!(render_loop.frame_budget, Duration::from_secs(1) / 60);
    }
}
