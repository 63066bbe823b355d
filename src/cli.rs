use std::path::PathBuf;

use clap::Parser;

/// Search Yandex for every line of a taxonomy file.
///
/// Each line of the taxonomy file is a group of words separated by spaces or
/// tabs. For every line, Yandex is searched for documents containing all of
/// its words, and the titles, headlines and passages of English results are
/// written to the output file as one JSON list per line, in the same order as
/// the taxonomy. Processing stops at the first failed request.
///
/// A Yandex XML username and key from https://xml.yandex.com/settings/ are
/// required. The search type there must be set to "Worldwide" and the current
/// IP address must be registered.
#[derive(Parser, Debug)]
#[command(name = "taxosearch", version)]
pub struct Cli {
    /// Input taxonomy file
    #[arg(short, long)]
    pub taxonomy: PathBuf,

    /// Output file to write search results into
    #[arg(short, long)]
    pub output: PathBuf,

    /// Yandex username
    #[arg(short, long, env = "YANDEX_USER")]
    pub username: String,

    /// Key provided by Yandex
    #[arg(short, long, env = "YANDEX_KEY", hide_env_values = true)]
    pub key: String,
}
