//! Self referencing data structures to store a template's
//! content as a raw string.
use self_cell::self_cell;
use std::fmt;
use std::fmt::Debug;
use std::ops::Range;

/// Front matter delimiter line.
const FRONT_MATTER_MARKER: &str = "---";

/// Alternative closing delimiter line.
const FRONT_MATTER_END_MARKER: &str = "...";

/// Byte positions of a front matter block inside a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct FrontMatterSpan {
    /// Text between the delimiter lines, newlines included.
    pub header: Range<usize>,
    /// Start of the content following the closing delimiter.
    pub body_start: usize,
}

/// Locates the front matter: the first line must be exactly `---`, the
/// block ends with the next line consisting of `---` (or `...`) and
/// optional trailing whitespace. Blank lines after the closing delimiter
/// belong to the front matter block. Without closing line, there is no
/// front matter.
pub(crate) fn locate_front_matter(content: &str) -> Option<FrontMatterSpan> {
    let first_line_end = content.find('\n')?;
    if content[..first_line_end].trim_end_matches('\r') != FRONT_MATTER_MARKER {
        return None;
    }
    let header_start = first_line_end + 1;

    // `header_start` is always a line start. An empty block is allowed.
    let mut line_start = header_start;
    loop {
        let line_end = content[line_start..]
            .find('\n')
            .map(|i| line_start + i)
            .unwrap_or(content.len());
        let line = &content[line_start..line_end];
        let after_marker = line
            .strip_prefix(FRONT_MATTER_MARKER)
            .or_else(|| line.strip_prefix(FRONT_MATTER_END_MARKER));
        if let Some(rest) = after_marker {
            if rest.trim().is_empty() {
                let header_end = line_start.saturating_sub(1).max(header_start);
                return Some(FrontMatterSpan {
                    header: header_start..header_end,
                    body_start: skip_blank_lines(content, line_start + FRONT_MATTER_MARKER.len()),
                });
            }
        }
        if line_end >= content.len() {
            return None;
        }
        line_start = line_end + 1;
    }
}

/// Skips the whitespace following the closing delimiter up to and
/// including the last newline of that whitespace run.
fn skip_blank_lines(content: &str, from: usize) -> usize {
    let run = &content[from..];
    let run_len = run.len() - run.trim_start().len();
    match run[..run_len].rfind('\n') {
        Some(i) => from + i + 1,
        None => from + run_len,
    }
}

/// This trait represents a template's content. The content is divided
/// into header and body. The header is the YAML front matter declaring the
/// template's variables, the body is the text to render.
///
/// ```rust
/// use notetmpl_lib::content::Content;
/// use notetmpl_lib::content::ContentString;
/// let input = "---\ntemplate_title: My note\n---\n\nMy body";
/// let c = ContentString::from_string(String::from(input));
///
/// assert_eq!(c.header(), "template_title: My note");
/// assert_eq!(c.body(), "My body");
/// assert_eq!(c.as_str(), input);
///
/// // A text without front matter leads to an empty header:
/// let c = ContentString::from_string(String::from("No header"));
///
/// assert_eq!(c.header(), "");
/// assert_eq!(c.body(), "No header");
/// ```
pub trait Content: AsRef<str> + Debug + Eq + PartialEq + Default {
    /// Constructor that splits the content in header and body.
    fn from_string(input: String) -> Self;

    /// Returns a reference to the inner part in between `---`.
    fn header(&self) -> &str;

    /// Returns the body below the second `---`.
    fn body(&self) -> &str;

    /// Accesses the whole content with all `---`.
    fn as_str(&self) -> &str {
        self.as_ref()
    }

    /// True if the header and body is empty.
    ///
    /// ```rust
    /// use notetmpl_lib::content::Content;
    /// use notetmpl_lib::content::ContentString;
    ///
    /// assert!(ContentString::default().is_empty());
    /// assert!(!ContentString::from_string("---\na: text\n---\n".to_string()).is_empty());
    /// ```
    fn is_empty(&self) -> bool {
        self.header().is_empty() && self.body().is_empty()
    }

    /// Helper function that splits the content into header and body.
    /// The header, if present, is trimmed (`trim()`), the body
    /// is kept as it is, except for leading blank lines.
    fn split(content: &str) -> (&str, &str) {
        match locate_front_matter(content) {
            Some(span) => (content[span.header].trim(), &content[span.body_start..]),
            None => ("", content),
        }
    }
}

#[derive(Debug, Eq, PartialEq)]
/// Pointers belonging to the self referential struct `ContentString`.
pub struct ContentRef<'a> {
    /// The text between the `---` lines. Empty without front matter.
    pub header: &'a str,
    /// The text to render.
    pub body: &'a str,
}

self_cell!(
/// Holds the template's content in a string and two string slices
/// `header` and `body`.
    pub struct ContentString {
        owner: String,

        #[covariant]
        dependent: ContentRef,
    }

    impl {Debug, Eq, PartialEq}
);

impl Content for ContentString {
    fn from_string(input: String) -> Self {
        ContentString::new(input, |owner: &String| {
            let (header, body) = ContentString::split(owner);
            ContentRef { header, body }
        })
    }

    /// Cheap access to the header.
    fn header(&self) -> &str {
        self.borrow_dependent().header
    }

    /// Cheap access to the body.
    fn body(&self) -> &str {
        self.borrow_dependent().body
    }
}

/// Default is the empty string.
impl Default for ContentString {
    fn default() -> Self {
        Self::from_string(String::new())
    }
}

impl AsRef<str> for ContentString {
    fn as_ref(&self) -> &str {
        self.borrow_owner()
    }
}

impl fmt::Display for ContentString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.borrow_owner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split() {
        let c = ContentString::from_string("first\nsecond\nthird".to_string());
        assert_eq!(c.header(), "");
        assert_eq!(c.body(), "first\nsecond\nthird");

        let c = ContentString::from_string("---\nfirst\n---\nsecond\nthird".to_string());
        assert_eq!(c.header(), "first");
        assert_eq!(c.body(), "second\nthird");

        // Without `\n` at the end.
        let c = ContentString::from_string("---\nfirst\n---".to_string());
        assert_eq!(c.header(), "first");
        assert_eq!(c.body(), "");

        // Blank lines after the closing line are skipped, indentation of
        // the first body line is kept.
        let c = ContentString::from_string("---\na: b\n---  \n\n \n  body\n".to_string());
        assert_eq!(c.header(), "a: b");
        assert_eq!(c.body(), "  body\n");

        // Empty front matter.
        let c = ContentString::from_string("---\n---\nbody".to_string());
        assert_eq!(c.header(), "");
        assert_eq!(c.body(), "body");

        // `...` closes too.
        let c = ContentString::from_string("---\na: b\n...\nbody".to_string());
        assert_eq!(c.header(), "a: b");
        assert_eq!(c.body(), "body");

        // Unclosed.
        let input = "---\na: b\nbody";
        let c = ContentString::from_string(input.to_string());
        assert_eq!(c.header(), "");
        assert_eq!(c.body(), input);

        // Not on the first line.
        let input = "\n---\na: b\n---\nbody";
        let c = ContentString::from_string(input.to_string());
        assert_eq!(c.header(), "");
        assert_eq!(c.body(), input);

        // The first line must be exactly `---`.
        let input = "----\na: b\n---\nbody";
        let c = ContentString::from_string(input.to_string());
        assert_eq!(c.header(), "");
        assert_eq!(c.body(), input);

        // A closing line must not carry more than whitespace.
        let c = ContentString::from_string("---\na: b\n--- x\n---\nbody".to_string());
        assert_eq!(c.header(), "a: b\n--- x");
        assert_eq!(c.body(), "body");
    }

    #[test]
    fn test_locate() {
        let s = "---\r\na: b\r\n---\r\nbody";
        let span = locate_front_matter(s).unwrap();
        assert_eq!(&s[span.header], "a: b\r");
        assert_eq!(&s[span.body_start..], "body");
        assert_eq!(locate_front_matter("---"), None);
        assert_eq!(locate_front_matter(""), None);
    }
}
