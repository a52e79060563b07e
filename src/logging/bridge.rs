use std::fmt::{self, Write as _};

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use super::formatter::CallSite;
use super::registry::Registry;
use crate::verbosity::Verbosity;

/// Forwards `tracing` events to a [`Registry`].
///
/// The event target becomes the module name, with `::` turned into `.`, and is
/// registered so it shows up in [`Registry::module_levels`]. Events carry no
/// function name, so the record's function is the emitting module's path.
#[derive(Debug, Clone)]
pub struct RegistryLayer {
    registry: Registry,
}

impl RegistryLayer {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

impl<S: Subscriber> Layer<S> for RegistryLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let meta = event.metadata();
        let module = module_name(meta.target());
        let level = Verbosity::from(*meta.level());
        self.registry.register(&module);
        if !self.registry.is_enabled_for(level, &module) {
            return;
        }

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        let call_site = CallSite::new(
            meta.file().unwrap_or_default(),
            meta.line().unwrap_or_default(),
            meta.module_path().unwrap_or_default(),
        );
        self.registry
            .emit(&module, level, call_site, format_args!("{}", visitor.finish()));
    }
}

/// Collects the `message` field followed by the others as `key=value`.
#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.message.is_empty() {
            self.fields.trim_start().to_string()
        } else {
            self.message + &self.fields
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

/// Forwards `log` records to a [`Registry`].
///
/// As with [`RegistryLayer`], the record's function is its module path.
#[derive(Debug, Clone)]
pub struct LogBridge {
    registry: Registry,
}

impl LogBridge {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata<'_>) -> bool {
        self.registry
            .is_enabled_for(metadata.level().into(), &module_name(metadata.target()))
    }

    fn log(&self, record: &log::Record<'_>) {
        let module = module_name(record.target());
        let level = Verbosity::from(record.level());
        self.registry.register(&module);
        let call_site = CallSite::new(
            record.file_static().unwrap_or_default(),
            record.line().unwrap_or_default(),
            record.module_path_static().unwrap_or_default(),
        );
        self.registry.emit(&module, level, call_site, *record.args());
    }

    fn flush(&self) {}
}

fn module_name(target: &str) -> String {
    target.replace("::", ".")
}
