use std::{fmt::Write, time::SystemTime};

use log::{
    kv::{Error as KvError, Key, Value, VisitSource},
    LevelFilter, Log, Metadata, Record,
};
use serde_json::json;

use crate::{
    client::EntrySender,
    error::Result,
    labels::LabelSet,
};

/// Type definition of module level pair
pub type ModuleLevel = (String, LevelFilter);

type KvMap = serde_json::Map<String, serde_json::Value>;

/// Collects the structured key values of a record
struct KeyValues(KvMap);

impl<'k> VisitSource<'k> for KeyValues {
    fn visit_pair(&mut self, key: Key<'k>, value: Value<'k>) -> std::result::Result<(), KvError> {
        self.0.insert(key.as_str().to_owned(), json!(value));
        Ok(())
    }
}

fn key_values(record: &Record) -> KvMap {
    let mut kvs = KeyValues(KvMap::new());
    // visiting only fails when a value cannot be captured, keep what we got
    let _ = record.key_values().visit(&mut kvs);
    kvs.0
}

/// Trait to turn a `log::Record` into the line that gets pushed
pub trait FormatLine: Send + Sync + 'static {
    fn format_line(&self, record: &Record) -> Option<String>;
}

/// Message followed by `key=value` pairs, logfmt style
pub struct DefaultFormatter;

impl FormatLine for DefaultFormatter {
    fn format_line(&self, record: &Record) -> Option<String> {
        let mut line = record.args().to_string();
        for (key, value) in key_values(record) {
            match value {
                serde_json::Value::String(s) => write!(line, " {}={:?}", key, s).ok()?,
                value => write!(line, " {}={}", key, value).ok()?,
            }
        }
        Some(line)
    }
}

/// One JSON object per line with message, source location and key values
pub struct JsonFormatter;

impl FormatLine for JsonFormatter {
    fn format_line(&self, record: &Record) -> Option<String> {
        let mut object = key_values(record);
        object.insert("msg".to_owned(), json!(record.args().to_string()));
        if let Some(module) = record.module_path() {
            object.insert("module".to_owned(), json!(module));
        }
        if let (Some(file), Some(line)) = (record.file(), record.line()) {
            object.insert("caller".to_owned(), json!(format!("{}:{}", file, line)));
        }
        serde_json::to_string(&object).ok()
    }
}

/// `log` implementation that pushes every record through a client.
///
/// Each record becomes one entry labelled with its level and target plus
/// the static labels set with [`PushLogger::with_label`].
pub struct PushLogger {
    sender: EntrySender,
    max_level: LevelFilter,
    module_levels: Vec<ModuleLevel>,
    labels: LabelSet,
    formatter: Box<dyn FormatLine>,
}

impl PushLogger {
    pub fn new(sender: EntrySender) -> Self {
        Self {
            sender,
            max_level: LevelFilter::Info,
            module_levels: vec![],
            labels: LabelSet::new(),
            formatter: Box::new(DefaultFormatter),
        }
    }

    pub fn with_max_level(mut self, level: LevelFilter) -> Self {
        self.max_level = level;
        self
    }

    pub fn with_module_level(mut self, module_level: ModuleLevel) -> Self {
        let module_levels: &mut Vec<ModuleLevel> = self.module_levels.as_mut();
        module_levels.push(module_level);
        module_levels.sort_by_key(|l| l.0.len().wrapping_neg());
        self
    }

    /// Adds a label to every entry. The reserved tenant label routes the
    /// logger's entries to that tenant.
    pub fn with_label(mut self, name: &str, value: &str) -> Self {
        self.labels.insert(name, value);
        self
    }

    pub fn with_formatter<F: FormatLine>(mut self, formatter: F) -> Self {
        self.formatter = Box::new(formatter);
        self
    }

    /// Installs the logger as the global `log` implementation
    pub fn init(self) -> Result<()> {
        let max_level = self
            .module_levels
            .iter()
            .map(|(_, level)| *level)
            .fold(self.max_level, std::cmp::max);
        log::set_boxed_logger(Box::new(self))?;
        log::set_max_level(max_level);
        Ok(())
    }

    fn accepts(&self, record: &Record) -> bool {
        // Our own diagnostics would feed back into the queue they report on
        if record.target().starts_with(env!("CARGO_CRATE_NAME")) {
            return false;
        }
        let level = record.level().to_level_filter();
        let module = record.module_path().unwrap_or_default();
        match self
            .module_levels
            .iter()
            .find(|(m, _)| !module.is_empty() && module.starts_with(m.as_str()))
        {
            Some((_, module_level)) => level <= *module_level,
            None => level <= self.max_level,
        }
    }

    fn labels(&self, record: &Record) -> LabelSet {
        self.labels
            .clone()
            .with_label("level", &record.level().as_str().to_lowercase())
            .with_label("target", record.target())
    }
}

impl Log for PushLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) || !self.accepts(record) {
            return;
        }
        let Some(line) = self.formatter.format_line(record) else {
            return;
        };
        if let Err(e) = self
            .sender
            .handle(self.labels(record), SystemTime::now(), &line)
        {
            eprintln!("{}", e);
        }
    }

    fn flush(&self) {}
}
