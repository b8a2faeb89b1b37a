/// A run of consecutive code bytes emitted for the same source line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineRun {
    pub line: u32,
    pub len: usize,
}

/// Run-length encoded map from code offset to source line.
#[derive(Debug, Clone, Default)]
pub struct LineTable {
    runs: Vec<LineRun>,
}

impl LineTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one more byte for `line`, extending the last run when it matches.
    pub fn push(&mut self, line: u32) {
        match self.runs.last_mut() {
            Some(run) if run.line == line => run.len += 1,
            _ => self.runs.push(LineRun { line, len: 1 }),
        }
    }

    /// Line of the byte at `offset`, walking runs until the cumulative length
    /// passes it.
    pub fn line_for(&self, offset: usize) -> Option<u32> {
        let mut end = 0;
        for run in &self.runs {
            end += run.len;
            if end > offset {
                return Some(run.line);
            }
        }
        None
    }

    pub fn runs(&self) -> &[LineRun] {
        &self.runs
    }
}
