//! spectrum_deck - terminal DJ deck with a five band EQ and a live spectrum
//! light show.

pub mod app;
pub mod audio;
pub mod cli;
pub mod controls;
pub mod error;
pub mod logging;
pub mod render_loop;
pub mod session;
pub mod ui;
pub mod visualizers;
