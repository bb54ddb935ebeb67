use anyhow::Result;
use clap::Parser;
use tracing::info;

use spectrum_deck::app::App;
use spectrum_deck::audio::CpalContextFactory;
use spectrum_deck::cli::Args;
use spectrum_deck::logging;
use spectrum_deck::render_loop::{RenderLoop, TerminalGuard};
use spectrum_deck::visualizers::FrameRenderer;
use spectrum_deck::visualizers::canvas::Canvas;

fn main() -> Result<()> {
    let args = Args::parse();

    // 1. Logging (file only, the terminal belongs to the UI)
    let _log_guard = logging::init(&args.log_config())?;

    // 2. Deck: chain builder, playlist and initial controls
    let settings = args.deck_settings();
    let mut app = App::new(CpalContextFactory, &settings);
    app.load_track(0, settings.autoplay);

    // 3. Terminal UI and main render loop
    let mut render_loop = RenderLoop::new(
        settings.fps,
        Canvas::new(settings.density),
        FrameRenderer::new(settings.analyser),
    );
    let mut terminal = TerminalGuard::enter()?;
    let result = render_loop.run(&mut terminal, &mut app);

    // Cleanup
    drop(terminal);
    app.pause();
    info!("deck closed");
    result
}
