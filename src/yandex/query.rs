use std::fmt;

use crate::taxonomy::WordGroup;

/// Query text in Yandex syntax where every term is required (`+term0 +term1 ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    pub fn from_words(group: &WordGroup) -> Self {
        Self(
            group
                .words()
                .iter()
                .map(|word| format!("+{word}"))
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
