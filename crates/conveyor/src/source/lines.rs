use super::{Source, SourcePorts};
use crate::channel::{send_item, ItemReceiver};
use crate::error::{PipelineError, Result};
use crate::item::Item;
use crate::log::{LogEmitter, LogEvent};
use std::fmt;
use std::io::ErrorKind;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// How a [`LinesSource`] splits its input into items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Tokenize {
    /// One `String` item per line, without the line terminator
    #[default]
    Lines,
    /// One `String` item per whitespace-separated word
    Words,
}

/// Scanner source reading text from any buffered async reader
pub struct LinesSource<R> {
    reader: Option<R>,
    tokenize: Tokenize,
    skip_empty: bool,
    ports: SourcePorts,
}

impl<R> LinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            tokenize: Tokenize::Lines,
            skip_empty: false,
            ports: SourcePorts::new("lines-source"),
        }
    }

    /// Emit words instead of lines
    pub fn words(reader: R) -> Self {
        Self::new(reader).with_tokenize(Tokenize::Words)
    }

    pub fn with_tokenize(mut self, tokenize: Tokenize) -> Self {
        self.tokenize = tokenize;
        self
    }

    /// Drop blank lines instead of emitting empty strings
    pub fn skip_empty(mut self, skip: bool) -> Self {
        self.skip_empty = skip;
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

impl<R> Source for LinesSource<R>
where
    R: AsyncBufRead + Unpin + Send + 'static,
{
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
        let tokenize = self.tokenize;
        let skip_empty = self.skip_empty;

        tokio::spawn(async move {
            let mut lines = reader.lines();
            'read: loop {
                let line = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => break,
                    line = lines.next_line() => line,
                };

                let line = match line {
                    Ok(Some(line)) => line,
                    Ok(None) => break,
                    Err(err) if err.kind() == ErrorKind::InvalidData => {
                        warn!(source = %name, error = %err, "skipping undecodable line");
                        log.emit(
                            LogEvent::warn("undecodable line skipped")
                                .with_attr("error", err.to_string()),
                        );
                        continue;
                    }
                    Err(err) => {
                        warn!(source = %name, error = %err, "read failed");
                        log.emit(LogEvent::error("read failed").with_attr("error", err.to_string()));
                        break;
                    }
                };

                let tokens: Vec<String> = match tokenize {
                    Tokenize::Lines if skip_empty && line.trim().is_empty() => Vec::new(),
                    Tokenize::Lines => vec![line],
                    Tokenize::Words => line.split_whitespace().map(str::to_string).collect(),
                };

                for token in tokens {
                    if !send_item(&output, Item::new(token), &cancel).await.is_sent() {
                        break 'read;
                    }
                }
            }
            debug!(source = %name, "source finished");
        });

        Ok(())
    }
}

impl<R> fmt::Debug for LinesSource<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinesSource")
            .field("tokenize", &self.tokenize)
            .field("skip_empty", &self.skip_empty)
            .field("ports", &self.ports)
            .finish()
    }
}
