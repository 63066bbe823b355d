//! Line-by-line batch run: search every taxonomy line and write one JSON line
//! per result, halting at the first line that cannot be completed.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, error, info, warn};

use crate::output::{LineResult, ResultWriter};
use crate::passages::{extract_passages, find_provider_error};
use crate::taxonomy::{TaxonomyReader, WordGroup};
use crate::xml::parse_document;
use crate::yandex::{Query, RawResponse, SearchClient};

/// A progress event is reported after every line whose 0-based index is a multiple of this.
pub const PROGRESS_INTERVAL: usize = 1000;

/// Fatal I/O problems. Unlike a halt, these leave no meaningful run outcome.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("cannot open taxonomy file {}: {source}", path.display())]
    OpenTaxonomy { path: PathBuf, source: io::Error },

    #[error("cannot read taxonomy file {}: {source}", path.display())]
    ReadTaxonomy { path: PathBuf, source: io::Error },

    #[error("cannot create output file {}: {source}", path.display())]
    CreateOutput { path: PathBuf, source: io::Error },

    #[error("cannot write output file {}: {source}", path.display())]
    WriteOutput { path: PathBuf, source: io::Error },
}

/// Why a line could not be completed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HaltReason {
    /// The provider answered with something other than HTTP 200.
    Status(u16),
    /// The request never produced an HTTP status.
    Transport(String),
    /// The body was not a well-formed XML document.
    Malformed(String),
    /// The response carried an `error` element.
    Provider(String),
}

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HaltReason::Status(code) => write!(f, "status code {code}"),
            HaltReason::Transport(message) => write!(f, "transport error: {message}"),
            HaltReason::Malformed(message) => write!(f, "malformed response: {message}"),
            HaltReason::Provider(message) => write!(f, "provider error: {message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every input line has a matching output line.
    Completed { lines: usize },
    /// Stopped at 1-based `line`; the first `written` lines (= `line - 1`) are in the output.
    Halted {
        line: usize,
        written: usize,
        reason: HaltReason,
    },
}

/// Observable milestones of a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunEvent<'a> {
    Started { taxonomy: &'a Path, output: &'a Path },
    EmptyLine { line: usize },
    Progress { processed: usize },
    Halted { line: usize, reason: &'a HaltReason },
    Finished { lines: usize },
}

/// Sink for run events, handed to the pipeline instead of logging from inside it.
pub trait Reporter {
    fn report(&self, event: &RunEvent<'_>);
}

/// Renders run events as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn report(&self, event: &RunEvent<'_>) {
        match event {
            RunEvent::Started { taxonomy, output } => {
                info!("Searching Yandex for lines of {}", taxonomy.display());
                info!("Writing results into {}", output.display());
            }
            RunEvent::EmptyLine { line } => {
                warn!("Line {line} is empty, sending empty query");
            }
            RunEvent::Progress { processed } => info!("Processed {processed} lines"),
            RunEvent::Halted { line, reason } => {
                match reason {
                    HaltReason::Status(code) => {
                        error!("Request for line {line} failed, status code {code}");
                    }
                    HaltReason::Transport(message) => {
                        error!("Request for line {line} failed: {message}");
                    }
                    HaltReason::Malformed(message) => {
                        error!("Malformed response for line {line}: {message}");
                    }
                    HaltReason::Provider(message) => {
                        error!("An error occurred at line {line}: {message}");
                    }
                }
                info!("Exiting");
            }
            RunEvent::Finished { lines } => {
                debug!(lines, "all lines processed");
                info!("Done");
            }
        }
    }
}

pub struct Pipeline<C, R = TracingReporter> {
    client: C,
    reporter: R,
}

impl<C: SearchClient> Pipeline<C> {
    pub fn new(client: C) -> Self {
        Self::with_reporter(client, TracingReporter)
    }
}

impl<C: SearchClient, R: Reporter> Pipeline<C, R> {
    pub fn with_reporter(client: C, reporter: R) -> Self {
        Self { client, reporter }
    }

    /// Runs the whole taxonomy file. The output file is truncated first and
    /// grows by exactly one line per completed input line.
    pub async fn run(&self, taxonomy: &Path, output: &Path) -> Result<RunOutcome, PipelineError> {
        let mut reader =
            TaxonomyReader::open(taxonomy)
                .await
                .map_err(|source| PipelineError::OpenTaxonomy {
                    path: taxonomy.to_path_buf(),
                    source,
                })?;
        let mut writer =
            ResultWriter::create(output)
                .await
                .map_err(|source| PipelineError::CreateOutput {
                    path: output.to_path_buf(),
                    source,
                })?;
        let write_err = |source: io::Error| PipelineError::WriteOutput {
            path: output.to_path_buf(),
            source,
        };

        self.reporter.report(&RunEvent::Started { taxonomy, output });

        let mut index = 0;
        while let Some(group) =
            reader
                .next_group()
                .await
                .map_err(|source| PipelineError::ReadTaxonomy {
                    path: taxonomy.to_path_buf(),
                    source,
                })?
        {
            let line = index + 1;
            match self.process_line(line, &group).await {
                Ok(result) => {
                    debug!(line, passages = result.0.len(), "line complete");
                    writer.write_line(&result).await.map_err(write_err)?;
                }
                Err(reason) => {
                    self.reporter.report(&RunEvent::Halted {
                        line,
                        reason: &reason,
                    });
                    let written = writer.finish().await.map_err(write_err)?;
                    return Ok(RunOutcome::Halted {
                        line,
                        written,
                        reason,
                    });
                }
            }

            if index % PROGRESS_INTERVAL == 0 {
                self.reporter.report(&RunEvent::Progress { processed: index });
            }
            index += 1;
        }

        let lines = writer.finish().await.map_err(write_err)?;
        self.reporter.report(&RunEvent::Finished { lines });
        Ok(RunOutcome::Completed { lines })
    }

    async fn process_line(&self, line: usize, group: &WordGroup) -> Result<LineResult, HaltReason> {
        if group.is_empty() {
            self.reporter.report(&RunEvent::EmptyLine { line });
        }
        let query = Query::from_words(group);
        debug!(line, query = %query, "searching");

        let body = match self.client.search(&query).await {
            Ok(RawResponse::Body(body)) => body,
            Ok(RawResponse::Status(code)) => return Err(HaltReason::Status(code)),
            Err(e) => return Err(HaltReason::Transport(e.to_string())),
        };

        let tree = parse_document(&body).map_err(|e| HaltReason::Malformed(e.to_string()))?;
        if let Some(message) = find_provider_error(&tree) {
            return Err(HaltReason::Provider(message.to_string()));
        }

        Ok(LineResult(extract_passages(&tree)))
    }
}
