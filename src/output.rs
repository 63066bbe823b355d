//! Line-oriented JSON result file.

use std::io;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{Formatter, Serializer};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

/// Snippets found for one taxonomy line; serialized as a JSON array of strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LineResult(pub Vec<String>);

/// Compact JSON, except array items are separated by `", "`.
struct ListFormatter;

impl Formatter for ListFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }
}

/// Encodes one result as a newline-terminated JSON line. Non-ASCII text is kept as is.
pub fn encode_line(result: &LineResult) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut buf, ListFormatter);
    result.serialize(&mut serializer)?;
    buf.push(b'\n');
    Ok(buf)
}

/// Exclusive writer for the output file. Every line is flushed as soon as it is
/// written, so whatever stops the run later, completed lines stay on disk.
pub struct ResultWriter {
    file: BufWriter<File>,
    lines: usize,
}

impl ResultWriter {
    /// Creates or truncates `path`.
    pub async fn create(path: &Path) -> io::Result<Self> {
        let file = File::create(path).await?;
        Ok(Self {
            file: BufWriter::new(file),
            lines: 0,
        })
    }

    pub async fn write_line(&mut self, result: &LineResult) -> io::Result<()> {
        let line = encode_line(result)?;
        self.file.write_all(&line).await?;
        self.file.flush().await?;
        self.lines += 1;
        Ok(())
    }

    pub async fn finish(mut self) -> io::Result<usize> {
        self.file.shutdown().await?;
        Ok(self.lines)
    }
}
