//! Stylesheet insertion

/// Host side of stylesheet management for registered element types
pub trait StyleHost {
    /// Insert `css` as a stylesheet tagged with `name`.
    ///
    /// The sheet goes directly after the sheet tagged `after` when that sheet
    /// exists, otherwise at the front of the document's sheets.
    fn insert_style(&self, name: &str, css: &str, after: Option<&str>);

    fn has_style(&self, name: &str) -> bool;
}
