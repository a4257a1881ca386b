//! Restartable line sources.
//!
//! The enumerator walks the hostname source once per address chunk, so every
//! source has to be able to start over from its first line. Files do that by
//! reopening the handle, in-memory lists by iterating again.

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use vhunt_common::filter::LineFilter;

const READ_BUFFER: usize = 1024 * 1024;

pub type Lines<'a> = Box<dyn Iterator<Item = io::Result<String>> + Send + 'a>;

pub trait LineSource: Send + Sync {
    /// Starts a fresh pass over the source.
    fn lines(&self) -> io::Result<Lines<'_>>;

    /// Human readable name used in error messages.
    fn name(&self) -> &str;
}

/// A line-oriented file, reopened for every pass.
#[derive(Clone, Debug)]
pub struct FileSource {
    path: PathBuf,
    name: String,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        let name = path.display().to_string();
        Self { path, name }
    }
}

impl LineSource for FileSource {
    fn lines(&self) -> io::Result<Lines<'_>> {
        let file = File::open(&self.path)?;
        Ok(Box::new(BufReader::with_capacity(READ_BUFFER, file).lines()))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Lines already held in memory, e.g. an expanded address list.
#[derive(Clone, Debug)]
pub struct MemorySource {
    name: String,
    lines: Vec<String>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            name: name.into(),
            lines,
        }
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl LineSource for MemorySource {
    fn lines(&self) -> io::Result<Lines<'_>> {
        Ok(Box::new(self.lines.iter().map(|line| Ok(line.clone()))))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// One pass over a source yielding trimmed, non-blank lines that pass the
/// filter.
///
/// Both the counting pass and the generating pass read through this type so
/// they can never disagree on what a usable line is.
pub struct FilteredLines<'a> {
    inner: Lines<'a>,
    filter: &'a LineFilter,
}

impl<'a> FilteredLines<'a> {
    pub fn open<S: LineSource + ?Sized>(source: &'a S, filter: &'a LineFilter) -> io::Result<Self> {
        Ok(Self {
            inner: source.lines()?,
            filter,
        })
    }

    /// Reads up to `size` lines. An empty chunk means the pass is over.
    pub fn next_chunk(&mut self, size: usize) -> io::Result<Vec<String>> {
        let mut chunk = Vec::with_capacity(size);
        while chunk.len() < size {
            match self.next() {
                Some(line) => chunk.push(line?),
                None => break,
            }
        }
        Ok(chunk)
    }
}

impl Iterator for FilteredLines<'_> {
    type Item = io::Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.inner.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e)),
            };
            let trimmed = line.trim();
            if trimmed.is_empty() || !self.filter.passes(trimmed) {
                continue;
            }
            return Some(Ok(trimmed.to_string()));
        }
    }
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
