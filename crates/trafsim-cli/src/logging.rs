//! # trafsim-cli::logging
//!
//! Log formatting for simulation runs. The human formatter prefixes each
//! line with wall-clock elapsed time and, where an event carries one, the
//! replication seed, so interleaved parallel replications stay readable.

use crate::args::LogFormat;
use std::fmt;
use tracing::field::Field;
use tracing::{Event, Subscriber};
use tracing_subscriber::{
    fmt::{format::Writer, FormatEvent, FormatFields},
    prelude::*,
    registry::LookupSpan,
    EnvFilter,
};

/// Installs the global subscriber for the selected format. Respects
/// `RUST_LOG`; defaults to `info`.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Human => {
            tracing_subscriber::registry()
                .with(
                    tracing_subscriber::fmt::layer()
                        .event_format(SimulationFormatter::new())
                        .with_ansi(true),
                )
                .with(filter)
                .init();
        }
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(tracing_subscriber::fmt::layer().json())
                .with(filter)
                .init();
        }
    }
}

/// A custom formatter for simulation activity.
pub struct SimulationFormatter {
    timer: std::time::Instant,
}

impl SimulationFormatter {
    pub fn new() -> Self {
        Self {
            timer: std::time::Instant::now(),
        }
    }

    fn extract_seed(event: &Event) -> Option<u64> {
        let mut visitor = SeedExtractor::default();
        event.record(&mut visitor);
        visitor.seed
    }
}

#[derive(Default)]
struct SeedExtractor {
    seed: Option<u64>,
}

impl tracing::field::Visit for SeedExtractor {
    fn record_u64(&mut self, field: &Field, value: u64) {
        if field.name() == "seed" {
            self.seed = Some(value);
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        if field.name() == "seed" && value >= 0 {
            self.seed = Some(value as u64);
        }
    }

    fn record_debug(&mut self, _field: &Field, _value: &dyn fmt::Debug) {}
    fn record_str(&mut self, _field: &Field, _value: &str) {}
    fn record_bool(&mut self, _field: &Field, _value: bool) {}
    fn record_error(&mut self, _field: &Field, _value: &(dyn std::error::Error + 'static)) {}
}

impl<S, N> FormatEvent<S, N> for SimulationFormatter
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let elapsed = self.timer.elapsed();
        let metadata = event.metadata();

        write!(writer, "\x1b[90m[{:>8.3}s]\x1b[0m ", elapsed.as_secs_f64())?;

        let level = metadata.level();
        let level_color = match *level {
            tracing::Level::ERROR => "\x1b[31m",
            tracing::Level::WARN => "\x1b[33m",
            tracing::Level::INFO => "\x1b[32m",
            tracing::Level::DEBUG => "\x1b[34m",
            tracing::Level::TRACE => "\x1b[90m",
        };
        write!(writer, "{}[{:>5}]\x1b[0m ", level_color, level)?;

        if let Some(seed) = Self::extract_seed(event) {
            write!(writer, "\x1b[35m[seed {}]\x1b[0m ", seed)?;
        }

        let target = metadata.target();
        if !target.starts_with("trafsim") {
            write!(writer, "\x1b[90m[{}]\x1b[0m ", target)?;
        }

        ctx.field_format().format_fields(writer.by_ref(), event)?;

        writeln!(writer)
    }
}
