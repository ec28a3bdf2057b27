use std::io;

use futures::stream::{self, LocalBoxStream, Stream, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::error::{Error, Result};
use crate::reader::{IntoLine, LineParser};
use crate::record::Record;
use crate::types::HeaderRef;

/// Reads a VCF from an asynchronous line source.
///
/// Only pulling a line from the source suspends; parsing in between is synchronous.
pub struct AsyncVcfRecords<S> {
    parser: LineParser,
    lines: S,
}

impl<S> AsyncVcfRecords<S>
where
    S: Stream + Unpin,
    S::Item: IntoLine,
{
    pub fn new(source_name: impl Into<String>, lines: S) -> Self {
        Self {
            parser: LineParser::new(source_name.into()),
            lines,
        }
    }

    /// Returns the header, reading it from the source on the first call only.
    pub async fn meta(&mut self) -> Result<HeaderRef> {
        if let Some(header) = self.parser.header() {
            return Ok(header.clone());
        }
        loop {
            let line = self.lines.next().await;
            if let Some(header) = self.parser.push_header_line(line)? {
                return Ok(header);
            }
        }
    }

    /// Reads the next record, or `None` once the source is exhausted.
    pub async fn read_record(&mut self) -> Result<Option<Record>> {
        let header = self.meta().await?;
        let line = self.lines.next().await;
        self.parser.push_record_line(&header, line)
    }

    /// Returns a stream of the remaining records, ending after the first error.
    pub fn records(&mut self) -> impl Stream<Item = Result<Record>> + '_ {
        stream::try_unfold(self, |reader| async move {
            let record = reader.read_record().await?;
            Ok::<_, Error>(record.map(|record| (record, reader)))
        })
    }

    pub fn source_name(&self) -> &str {
        self.parser.source_name()
    }

    /// Number of lines pulled from the source so far, header lines included.
    pub fn line_number(&self) -> usize {
        self.parser.line_number()
    }
}

impl AsyncVcfRecords<LocalBoxStream<'static, io::Result<String>>> {
    /// Wraps a tokio reader, e.g. a `BufReader<File>` or a decompressing stream.
    pub fn from_async_reader<R>(source_name: impl Into<String>, reader: R) -> Self
    where
        R: AsyncBufRead + Unpin + 'static,
    {
        let lines = stream::try_unfold(reader.lines(), |mut lines| async move {
            Ok::<_, io::Error>(lines.next_line().await?.map(|line| (line, lines)))
        })
        .boxed_local();
        Self::new(source_name, lines)
    }
}
