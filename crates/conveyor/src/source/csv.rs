use super::{Source, SourcePorts};
use crate::channel::{send_item, ItemReceiver};
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::{LogEmitter, LogEvent};
use std::fmt;
use std::io::Read;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Reads CSV records as `Vec<String>` rows
///
/// Parsing runs on a blocking task. Malformed records are reported on the
/// log bus and skipped.
pub struct CsvSource<R> {
    reader: Option<R>,
    has_headers: bool,
    delimiter: u8,
    ports: SourcePorts,
}

impl<R: Read + Send + 'static> CsvSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            has_headers: false,
            delimiter: b',',
            ports: SourcePorts::new("csv-source"),
        }
    }

    /// Treat the first record as a header row and do not emit it
    pub fn with_headers(mut self, has_headers: bool) -> Self {
        self.has_headers = has_headers;
        self
    }

    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.ports.name = name.into();
        self
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.ports.capacity = capacity;
        self
    }
}

impl<R: Read + Send + 'static> Source for CsvSource<R> {
    fn name(&self) -> &str {
        &self.ports.name
    }

    fn take_output(&mut self) -> Option<ItemReceiver> {
        self.ports.take_output()
    }

    fn set_log_sink(&mut self, log: LogEmitter) {
        self.ports.log = log;
    }

    fn open(&mut self, cancel: CancellationToken) -> Result<()> {
        let reader = self.reader.take().ok_or(PipelineError::SourceInputUndefined)?;
        let output = self.ports.start()?;
        let log = self.ports.log.clone();
        let name = self.ports.name.clone();
        let handle = Handle::current();

        let mut records = ::csv::ReaderBuilder::new()
            .has_headers(self.has_headers)
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(reader);

        tokio::task::spawn_blocking(move || {
            let mut line = 0u64;
            for record in records.records() {
                line += 1;
                if cancel.is_cancelled() {
                    break;
                }
                let row: Vec<String> = match record {
                    Ok(record) => record.iter().map(str::to_string).collect(),
                    Err(err) => {
                        warn!(source = %name, line, error = %err, "skipping malformed record");
                        log.emit(
                            LogEvent::warn("malformed csv record")
                                .with_attr("record", line)
                                .with_attr("error", err.to_string()),
                        );
                        continue;
                    }
                };
                if !handle
                    .block_on(send_item(&output, Item::new(row), &cancel))
                    .is_sent()
                {
                    break;
                }
            }
            debug!(source = %name, records = line, "source finished");
        });

        Ok(())
    }
}

impl<R> fmt::Debug for CsvSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CsvSource")
            .field("has_headers", &self.has_headers)
            .field("delimiter", &(self.delimiter as char))
            .field("ports", &self.ports)
            .finish()
    }
}
