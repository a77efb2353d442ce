use crate::store::{StoreError, StoreResult};

/// Maximum number of characters in a file token
const MAX_TOKEN_CHARS: usize = 120;

/// Characters that may not appear in a file token
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Identifier under which a document is persisted
///
/// A key carries two forms of the same text:
/// - the *label*: the percent-decoded text, used for excluded-prefix checks (e.g. `File:Foo.jpg`)
/// - the *token*: the sanitized single path component written to disk (e.g. `File_Foo.jpg`)
///
/// A token never contains a path separator or a `..` sequence and never starts with a dot, so a
/// stored file cannot escape the output root.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StoreKey {
    label: String,
    token: String,
}

impl StoreKey {
    /// Derives a key from a URL path segment or a document title
    ///
    /// # Returns
    ///
    /// * `Ok(StoreKey)` - A usable key
    /// * `Err(StoreError::InvalidKey)` - The text sanitizes to nothing
    ///
    /// # Examples
    ///
    /// ```
    /// use sumi_harvest::store::StoreKey;
    ///
    /// let key = StoreKey::derive("File%3AFoo.jpg").unwrap();
    /// assert_eq!(key.label(), "File:Foo.jpg");
    /// assert_eq!(key.file_name(), "File_Foo.jpg.html");
    /// ```
    pub fn derive(text: &str) -> StoreResult<Self> {
        let label = urlencoding::decode(text)
            .map(|decoded| decoded.into_owned())
            .unwrap_or_else(|_| text.to_string());
        let label = label.trim().to_string();
        let token = sanitize(&label);

        if token.is_empty() {
            return Err(StoreError::InvalidKey(text.to_string()));
        }

        Ok(Self { label, token })
    }

    /// The decoded, human-readable form of the key
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The sanitized path component
    pub fn token(&self) -> &str {
        &self.token
    }

    /// Name of the file this key is stored under
    pub fn file_name(&self) -> String {
        format!("{}.html", self.token)
    }

    /// Returns a variant of this key with a numeric suffix (`Foo` -> `Foo-2`)
    pub fn with_discriminator(&self, n: u32) -> Self {
        Self {
            label: self.label.clone(),
            token: format!("{}-{}", self.token, n),
        }
    }
}

/// Reduces text to a single safe path component
fn sanitize(text: &str) -> String {
    let replaced: String = text
        .chars()
        .map(|c| {
            if c.is_control() || RESERVED_CHARS.contains(&c) {
                '_'
            } else {
                c
            }
        })
        .collect();

    let mut collapsed = replaced;
    while collapsed.contains("..") {
        collapsed = collapsed.replace("..", ".");
    }

    let trimmed = collapsed
        .trim_start_matches(|c: char| c == '.' || c == '_' || c.is_whitespace())
        .trim_end_matches(|c: char| c == '.' || c.is_whitespace());

    let capped: String = trimmed.chars().take(MAX_TOKEN_CHARS).collect();
    capped.trim_end_matches(|c: char| c == '.' || c.is_whitespace()).to_string()
}
