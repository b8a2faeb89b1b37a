/// Byte offsets to 1-based line/column positions, built once per source.
/// Columns count characters, not bytes.
pub struct SourceMap<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> SourceMap<'src> {
    pub fn new(source: &'src str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceMap { source, line_starts }
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Returns `(line, col)`; a newline belongs to the line it ends.
    pub fn lookup(&self, offset: usize) -> (u32, usize) {
        let index = match self.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i.saturating_sub(1),
        };
        let start = self.line_starts[index];
        (index as u32 + 1, self.width(start, offset) + 1)
    }

    /// Number of characters in `source[start..end]`. Falls back to the byte
    /// count when the range is out of bounds or splits a character.
    pub fn width(&self, start: usize, end: usize) -> usize {
        match self.source.get(start..end) {
            Some(text) => text.chars().count(),
            None => end.saturating_sub(start),
        }
    }

    /// Text of a 1-based line without its line terminator, or `""` when out
    /// of range.
    pub fn line_text(&self, line: u32) -> &'src str {
        let index = line as usize;
        if index == 0 || index > self.line_starts.len() {
            return "";
        }
        let start = self.line_starts[index - 1];
        let end = self.line_starts.get(index).copied().unwrap_or(self.source.len());
        self.source[start..end].trim_end_matches('\n').trim_end_matches('\r')
    }
}
