//! Taxonomy file reading: one word group per physical line.

use std::io;
use std::path::Path;

use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// Words of one taxonomy line, in order. May be empty for a blank line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct WordGroup(Vec<String>);

impl WordGroup {
    /// Splits on runs of spaces and tabs after trimming surrounding whitespace.
    pub fn from_line(line: &str) -> Self {
        Self(
            line.trim()
                .split([' ', '\t'])
                .filter(|w| !w.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    pub fn words(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Lazy line-by-line reader. Blank lines yield an empty group rather than being skipped.
pub struct TaxonomyReader {
    lines: Lines<BufReader<File>>,
}

impl TaxonomyReader {
    pub async fn open(path: &Path) -> io::Result<Self> {
        let file = File::open(path).await?;
        Ok(Self {
            lines: BufReader::new(file).lines(),
        })
    }

    pub async fn next_group(&mut self) -> io::Result<Option<WordGroup>> {
        Ok(self
            .lines
            .next_line()
            .await?
            .map(|line| WordGroup::from_line(&line)))
    }
}
