//! Filename patterns.
//!
//! `*` matches whatever follows and ends the comparison, so `AB*XY`
//! behaves like `AB*`. `?` matches exactly one character. Without a `*`
//! the lengths must agree.

use super::handler::{FileEntry, FileType};

/// True when `name` matches `pattern`.
pub fn name_matches(name: &str, pattern: &str) -> bool {
    let mut name = name.chars();
    for p in pattern.chars() {
        match p {
            '*' => return true,
            '?' => {
                if name.next().is_none() {
                    return false;
                }
            }
            _ => match name.next() {
                Some(c) if c.eq_ignore_ascii_case(&p) => {}
                _ => return false,
            },
        }
    }
    name.next().is_none()
}

/// True when `entry` matches `pattern` and, if given, `file_type`.
pub fn matches(entry: &FileEntry, pattern: &str, file_type: Option<FileType>) -> bool {
    file_type.map_or(true, |t| t == entry.file_type) && name_matches(&entry.name, pattern)
}

pub fn has_wildcards(pattern: &str) -> bool {
    pattern.contains(['*', '?'])
}

/// A pattern with an optional `,T` type suffix, as in `LOAD"GAME*,P",8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    pub name: String,
    pub file_type: Option<FileType>,
}

impl Pattern {
    pub fn parse(text: &str) -> Self {
        let mut parts = text.split(',');
        let name = parts.next().unwrap_or_default().to_string();
        let file_type = parts
            .next()
            .and_then(|t| t.trim().chars().next())
            .and_then(FileType::from_letter);
        Self { name, file_type }
    }

    pub fn matches(&self, entry: &FileEntry) -> bool {
        matches(entry, &self.name, self.file_type)
    }
}
