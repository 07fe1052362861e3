//! Tracing subscriber: renders engine events to the console and the run log.
//!
//! Events are classified once by [`Kind`]; both outputs share the
//! classification and the step-aware text of [`EventFields`].
use std::fs;
use std::io::Write as _;
use std::sync::Mutex;

use tracing::Level;

use super::utils::{format_utc_datetime, format_utc_time, log_file_path, strip_ansi};

/// Target of stage header events.
pub(super) const STAGE_TARGET: &str = "provision::stage";
/// Target of dry-run action events.
pub(super) const DRY_RUN_TARGET: &str = "provision::dry_run";
/// Target of recorded step results; carries `step` and `status` fields.
pub(super) const STEP_TARGET: &str = "provision::step";

/// Rendering class of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Stage,
    DryRun,
    Step,
    Error,
    Warn,
    Info,
    Debug,
}

impl Kind {
    fn of(metadata: &tracing::Metadata<'_>) -> Self {
        match (*metadata.level(), metadata.target()) {
            (_, STAGE_TARGET) => Self::Stage,
            (_, DRY_RUN_TARGET) => Self::DryRun,
            (_, STEP_TARGET) => Self::Step,
            (Level::ERROR, _) => Self::Error,
            (Level::WARN, _) => Self::Warn,
            (Level::INFO, _) => Self::Info,
            _ => Self::Debug,
        }
    }

    const fn file_tag(self) -> &'static str {
        match self {
            Self::Stage => "==> ",
            Self::DryRun => "    [dry run] ",
            Self::Step => "    [step] ",
            Self::Error => "    [error] ",
            Self::Warn => "    [warn] ",
            Self::Info => "    ",
            Self::Debug => "    [debug] ",
        }
    }

    fn console_line(self, text: &str) -> String {
        match self {
            Self::Stage => format!("\x1b[1;34m==>\x1b[0m \x1b[1m{text}\x1b[0m"),
            Self::DryRun => format!("  \x1b[33m[DRY RUN]\x1b[0m {text}"),
            Self::Step => format!("  \x1b[2m· {text}\x1b[0m"),
            Self::Error => format!("\x1b[31mERROR\x1b[0m {text}"),
            Self::Warn => format!("\x1b[33mWARN\x1b[0m  {text}"),
            Self::Info => format!("  {text}"),
            Self::Debug => format!("  \x1b[2m{text}\x1b[0m"),
        }
    }
}

/// Fields the engine attaches to its events.
#[derive(Debug, Default)]
struct EventFields {
    message: String,
    step: Option<String>,
    status: Option<String>,
}

impl EventFields {
    fn of(event: &tracing::Event<'_>) -> Self {
        let mut fields = Self::default();
        event.record(&mut fields);
        fields
    }

    /// Display text; step results read `<step>: <status> (<detail>)`.
    fn text(&self) -> String {
        match (&self.step, &self.status) {
            (Some(step), Some(status)) if self.message.is_empty() => format!("{step}: {status}"),
            (Some(step), Some(status)) => format!("{step}: {status} ({})", self.message),
            _ => self.message.clone(),
        }
    }

    fn set(&mut self, name: &str, value: String) {
        match name {
            "message" => self.message = value,
            "step" => self.step = Some(value),
            "status" => self.status = Some(value),
            _ => {}
        }
    }
}

impl tracing::field::Visit for EventFields {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.set(field.name(), format!("{value:?}"));
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.set(field.name(), value.to_string());
    }
}

/// Layer appending every event to the run log, timestamped and without
/// ANSI codes.
#[derive(Debug)]
pub(super) struct FileLayer {
    file: Mutex<fs::File>,
}

impl FileLayer {
    /// Truncate the log of `command` to a fresh run header.
    ///
    /// Returns `None` if the log file cannot be written.
    pub(super) fn new(command: &str) -> Option<Self> {
        let path = log_file_path(command)?;
        let version =
            option_env!("PROVISION_VERSION").unwrap_or(concat!("dev-", env!("CARGO_PKG_VERSION")));
        fs::write(
            &path,
            format!("# provision {version} {command} {}\n", format_utc_datetime()),
        )
        .ok()?;
        let file = fs::OpenOptions::new().append(true).open(&path).ok()?;
        Some(Self {
            file: Mutex::new(file),
        })
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for FileLayer {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let kind = Kind::of(event.metadata());
        let text = strip_ansi(&EventFields::of(event).text());
        if let Ok(mut f) = self.file.lock() {
            writeln!(f, "[{}] {}{text}", format_utc_time(), kind.file_tag()).ok();
        }
    }
}

/// Console formatter.
struct ConsoleFormat;

impl<S, N> tracing_subscriber::fmt::FormatEvent<S, N> for ConsoleFormat
where
    S: tracing::Subscriber + for<'a> tracing_subscriber::registry::LookupSpan<'a>,
    N: for<'a> tracing_subscriber::fmt::FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &tracing_subscriber::fmt::FmtContext<'_, S, N>,
        mut writer: tracing_subscriber::fmt::format::Writer<'_>,
        event: &tracing::Event<'_>,
    ) -> std::fmt::Result {
        let kind = Kind::of(event.metadata());
        writeln!(writer, "{}", kind.console_line(&EventFields::of(event).text()))
    }
}

/// Install the global subscriber: console at INFO (DEBUG when `verbose`,
/// warnings and errors on stderr) plus the run log of `command` at DEBUG.
///
/// Must be called once, before any logging.
pub fn init_subscriber(verbose: bool, command: &str) {
    use tracing_subscriber::fmt::writer::MakeWriterExt as _;
    use tracing_subscriber::{
        Layer as _, filter::LevelFilter, fmt, layer::SubscriberExt as _,
        util::SubscriberInitExt as _,
    };

    let console_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let make_writer = std::io::stderr
        .with_max_level(Level::WARN)
        .and(std::io::stdout.with_min_level(Level::INFO));

    let console_layer = fmt::layer()
        .event_format(ConsoleFormat)
        .with_writer(make_writer)
        .with_filter(console_level);
    let file_layer = FileLayer::new(command).map(|l| l.with_filter(LevelFilter::DEBUG));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .init();
}
