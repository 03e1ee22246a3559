//! Text rendering of the published fetch state.

use std::fmt;

use feed_core::{CombinedRecord, FetchState};

/// Render `state` as the block of text shown to the user.
///
/// An error replaces the listing entirely; `Idle` renders nothing.
pub fn render(state: &FetchState) -> String {
    View(state).to_string()
}

struct View<'a>(&'a FetchState);

impl fmt::Display for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            FetchState::Idle => Ok(()),
            FetchState::Loading => writeln!(f, "Loading..."),
            FetchState::Error(message) => writeln!(f, "{message}"),
            FetchState::Success(records) if records.is_empty() => writeln!(f, "No users found"),
            FetchState::Success(records) => {
                for record in records {
                    write_record(f, record)?;
                }
                Ok(())
            }
        }
    }
}

fn write_record(f: &mut fmt::Formatter<'_>, record: &CombinedRecord) -> fmt::Result {
    writeln!(f, "{}", record.user.name)?;
    match &record.post {
        Some(post) => {
            writeln!(f, "  {}", post.title)?;
            writeln!(f, "  {}", post.body)
        }
        None => writeln!(f, "  No post found"),
    }
}
