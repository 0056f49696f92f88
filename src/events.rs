//! Event delivery from the resolver to the outside world. The resolver only
//! knows the `EventSink` trait; the console sink forwards log events to
//! `tracing` and drives a spinner for progress events.

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, trace, warn};

use crate::problems::Problem;

pub trait EventSink: Send + Sync {
    fn info(&self, msg: &str);
    fn warn(&self, msg: &str);
    fn debug(&self, msg: &str);
    fn trace(&self, msg: &str);
    fn problem(&self, problem: &Problem);
    fn progress(&self, msg: &str);
}

pub struct ConsoleEventSink {
    spinner: Option<ProgressBar>,
}

impl ConsoleEventSink {
    pub fn new(show_progress: bool, indicators: &str) -> ConsoleEventSink {
        let spinner = if show_progress {
            let bar = ProgressBar::new_spinner();
            let glyphs = if indicators.chars().count() >= 2 {
                format!("{} ", indicators)
            } else {
                "|/-\\ ".to_string()
            };
            if let Ok(style) = ProgressStyle::with_template("{spinner} {msg}") {
                bar.set_style(style.tick_chars(&glyphs));
            }
            Some(bar)
        } else {
            None
        };
        ConsoleEventSink { spinner }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.spinner {
            bar.finish_and_clear();
        }
    }
}

impl EventSink for ConsoleEventSink {
    fn info(&self, msg: &str) {
        info!("{}", msg);
    }

    fn warn(&self, msg: &str) {
        warn!("{}", msg);
    }

    fn debug(&self, msg: &str) {
        debug!("{}", msg);
    }

    fn trace(&self, msg: &str) {
        trace!("{}", msg);
    }

    fn problem(&self, problem: &Problem) {
        warn!("{}", problem);
    }

    fn progress(&self, msg: &str) {
        match &self.spinner {
            Some(bar) => {
                bar.set_message(msg.to_string());
                bar.tick();
            }
            None => debug!("{}", msg),
        }
    }
}

/// Sink that swallows everything; test scaffolding.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn info(&self, _msg: &str) {}
    fn warn(&self, _msg: &str) {}
    fn debug(&self, _msg: &str) {}
    fn trace(&self, _msg: &str) {}
    fn problem(&self, _problem: &Problem) {}
    fn progress(&self, _msg: &str) {}
}
