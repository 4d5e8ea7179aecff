/// Marker appended by the input box when the user confirms by typing two spaces.
pub const CONFIRM_MARKER: &str = "  ";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuery {
    pub keyword: String,
    pub args: Vec<String>,
}

impl ParsedQuery {
    /// Splits raw input on whitespace. Returns `None` when there is no token.
    pub fn parse(raw: &str) -> Option<Self> {
        let mut tokens = raw.split_whitespace().map(str::to_string);
        let keyword = tokens.next()?;
        Some(Self {
            keyword,
            args: tokens.collect(),
        })
    }

    /// Canonical single-spaced form, as recorded in history.
    pub fn command_line(&self) -> String {
        if self.args.is_empty() {
            return self.keyword.clone();
        }
        format!("{} {}", self.keyword, self.args.join(" "))
    }
}

pub fn has_confirm_marker(raw: &str) -> bool {
    raw.ends_with(CONFIRM_MARKER)
}
