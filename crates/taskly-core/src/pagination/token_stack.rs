//! Client-held navigation history for synthesizing "previous page" links.
//!
//! Each entry is the page token that was used to reach a page. The stack
//! travels with the client as comma-joined text and is parsed once here; the
//! server keeps no navigation state between requests.
//!
//! Going back one page means dropping the entries for the current page and
//! the page before it, then replaying the query from the entry that remains
//! on top (or with no cursor at all when the stack had a single entry).

/// Separator between tokens in the transported stack text.
const SEPARATOR: &str = ",";

/// An ordered history of page tokens, oldest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TokenStack {
    tokens: Vec<String>,
}

/// Where the "previous page" link of a page points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviousPage {
    /// This is the first page: no link should be rendered.
    None,
    /// The previous page is the first page: query without a cursor.
    First,
    /// Query from this token, carrying the remaining stack along.
    At { token: String, stack: TokenStack },
}

impl TokenStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse transported stack text. Absent, blank and empty segments are
    /// ignored.
    pub fn parse(text: Option<&str>) -> Self {
        let tokens = text
            .unwrap_or_default()
            .split(SEPARATOR)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect();
        Self { tokens }
    }

    /// Transport form, or `None` for an empty stack.
    pub fn to_text(&self) -> Option<String> {
        if self.tokens.is_empty() {
            None
        } else {
            Some(self.tokens.join(SEPARATOR))
        }
    }

    /// Record that a page was reached via `token`. An absent or empty token
    /// means no page boundary was crossed and the stack is unchanged.
    pub fn push(&mut self, token: Option<&str>) {
        if let Some(token) = token.map(str::trim).filter(|t| !t.is_empty()) {
            self.tokens.push(token.to_string());
        }
    }

    /// Work out the previous-page link for the page this stack leads to.
    pub fn previous(&self) -> PreviousPage {
        match self.tokens.len() {
            0 => PreviousPage::None,
            1 => PreviousPage::First,
            n => PreviousPage::At {
                token: self.tokens[n - 2].clone(),
                stack: Self {
                    tokens: self.tokens[..n - 2].to_vec(),
                },
            },
        }
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }
}

impl PreviousPage {
    /// Transport form: `(token, stack text)`.
    ///
    /// `(None, None)` means no link; `(Some(""), None)` links to the first
    /// page. Callers must keep those two apart.
    pub fn into_parts(self) -> (Option<String>, Option<String>) {
        match self {
            PreviousPage::None => (None, None),
            PreviousPage::First => (Some(String::new()), None),
            PreviousPage::At { token, stack } => (Some(token), stack.to_text()),
        }
    }
}

/// Append `new_token` to transported stack text.
pub fn advance(stack_text: Option<&str>, new_token: Option<&str>) -> Option<String> {
    let mut stack = TokenStack::parse(stack_text);
    stack.push(new_token);
    stack.to_text()
}

/// Previous-page token and stack text for transported stack text.
pub fn previous(stack_text: Option<&str>) -> (Option<String>, Option<String>) {
    TokenStack::parse(stack_text).previous().into_parts()
}
