//! Search-term capture from a submitted form.
//!
//! A submission carries the whole form; only the `searchTerm` field matters.
//! The extracted value replaces the previous term wholesale, and the
//! orchestrator's sequence numbers make the most recent submission win.

use url::form_urlencoded;

/// Name of the form field holding the search term.
pub const SEARCH_FIELD: &str = "searchTerm";

/// The decoded fields of one form submission, in submission order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchForm {
    fields: Vec<(String, String)>,
}

impl SearchForm {
    /// Decode an `application/x-www-form-urlencoded` body.
    pub fn from_urlencoded(body: &str) -> Self {
        let fields = form_urlencoded::parse(body.as_bytes())
            .map(|(name, value)| (name.into_owned(), value.into_owned()))
            .collect();
        Self { fields }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, value)| (name.into(), value.into()))
                .collect(),
        }
    }

    /// Last value submitted under `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .rev()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// The search term of a submission; empty when the field is missing.
pub fn search_term(form: &SearchForm) -> String {
    form.get(SEARCH_FIELD).unwrap_or_default().to_string()
}
