//! Filesystem result source: when the query text looks like a path,
//! matching directory entries are appended to the candidate list.

use crate::token::{TokenLabel, TokenSequence};
use directories::BaseDirs;
use quiver_types::{Candidate, CandidateSource};
use std::path::{MAIN_SEPARATOR, Path, PathBuf};
use tracing::debug;

/// Whether the query text should trigger the filesystem source:
/// it contains a path separator, starts with home-shorthand, or is a
/// two-character drive prefix.
#[must_use]
pub fn looks_like_path(text: &str) -> bool {
    if text.contains(MAIN_SEPARATOR) || text.contains('/') || text.starts_with('~') {
        return true;
    }

    let mut chars = text.chars();
    matches!(
        (chars.next(), chars.next(), chars.next()),
        (Some(letter), Some(':'), None) if letter.is_ascii_alphabetic()
    )
}

/// Append path matches for `query` and label the live token `File`.
/// Any filesystem error contributes zero candidates; this source
/// never aborts an aggregation pass.
pub fn search(query: &str, out: &mut Vec<Candidate>, tokens: &mut TokenSequence) {
    if let Some(token) = tokens.last_mut() {
        token.set_label(TokenLabel::File);
    }

    let expanded = expand_home(query);
    let (dir, prefix) = split_dir_prefix(&expanded);

    let Ok(entries) = std::fs::read_dir(&dir) else {
        debug!("File search: cannot read {}", dir.display());
        return;
    };

    let prefix_lower = prefix.to_lowercase();
    let mut matches: Vec<(bool, String, PathBuf)> = entries
        .filter_map(std::result::Result::ok)
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            if !name.to_lowercase().starts_with(&prefix_lower) {
                return None;
            }
            // Hidden entries only when explicitly asked for
            if name.starts_with('.') && !prefix.starts_with('.') {
                return None;
            }
            let is_dir = entry.file_type().is_ok_and(|t| t.is_dir());
            Some((is_dir, name, entry.path()))
        })
        .collect();

    matches.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    for (_, name, path) in matches {
        out.push(Candidate::new(
            &name,
            &path.to_string_lossy(),
            CandidateSource::File,
        ));
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_home(text: &str) -> String {
    if let Some(rest) = text.strip_prefix('~')
        && let Some(base) = BaseDirs::new()
    {
        return format!("{}{rest}", base.home_dir().to_string_lossy());
    }
    text.to_string()
}

/// Split a path fragment into the directory to list and the name
/// prefix to match inside it.
fn split_dir_prefix(text: &str) -> (PathBuf, String) {
    if text.ends_with(MAIN_SEPARATOR) || text.ends_with('/') {
        return (PathBuf::from(text), String::new());
    }

    let path = Path::new(text);
    let prefix = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
    (dir, prefix)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: &str = " | ";

    #[test]
    fn test_looks_like_path() {
        assert!(looks_like_path("/usr/bi"));
        assert!(looks_like_path("~"));
        assert!(looks_like_path("~/doc"));
        assert!(looks_like_path("c:"));
        assert!(!looks_like_path("firefox"));
        assert!(!looks_like_path("c:x"));
        assert!(!looks_like_path("1:"));
    }

    #[test]
    fn test_split_dir_prefix() {
        let (dir, prefix) = split_dir_prefix("/usr/bi");
        assert_eq!(dir, PathBuf::from("/usr"));
        assert_eq!(prefix, "bi");

        let (dir, prefix) = split_dir_prefix("/usr/");
        assert_eq!(dir, PathBuf::from("/usr/"));
        assert_eq!(prefix, "");
    }

    #[test]
    fn test_search_matches_prefix_and_labels_token() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("notes.txt"), "x").unwrap();
        std::fs::write(temp.path().join("nope.txt"), "x").unwrap();
        std::fs::create_dir(temp.path().join("notebooks")).unwrap();

        let query = format!("{}/not", temp.path().display());
        let mut tokens = TokenSequence::parse(&query, SEP);
        let mut out = Vec::new();
        search(&query, &mut out, &mut tokens);

        assert_eq!(out.len(), 2);
        // Directories sort before files
        assert_eq!(out[0].short_name, "notebooks");
        assert_eq!(out[1].short_name, "notes.txt");
        assert!(tokens.last().unwrap().has_label(TokenLabel::File));
    }

    #[test]
    fn test_search_skips_hidden_unless_requested() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join(".hidden"), "x").unwrap();
        std::fs::write(temp.path().join("shown"), "x").unwrap();

        let query = format!("{}/", temp.path().display());
        let mut tokens = TokenSequence::parse(&query, SEP);
        let mut out = Vec::new();
        search(&query, &mut out, &mut tokens);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].short_name, "shown");

        let query = format!("{}/.h", temp.path().display());
        let mut out = Vec::new();
        search(&query, &mut out, &mut tokens);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].short_name, ".hidden");
    }

    #[test]
    fn test_search_unreadable_dir_contributes_nothing() {
        let mut tokens = TokenSequence::parse("/no/such/dir/x", SEP);
        let mut out = Vec::new();
        search("/no/such/dir/x", &mut out, &mut tokens);
        assert!(out.is_empty());
    }
}
