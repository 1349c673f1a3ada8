//! Token model: the query as an ordered sequence of command tokens.
//!
//! A sequence is re-derived from the raw input text on every edit;
//! tokens whose text is unchanged at the same position keep their
//! annotations, so a committed token stays bound to its result while
//! the last token, the one currently being typed, churns. Labels and
//! top results are annotations applied by the aggregator (or a row
//! selection) after parsing.

use quiver_types::Candidate;
use serde::{Deserialize, Serialize};

/// Classification of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenLabel {
    #[default]
    None,

    /// First token of a recalled history record
    History,

    /// Live token whose text was rewritten from a drop-down row
    AutoSuggest,

    /// Live token that is a filesystem path fragment
    File,

    /// Token claimed by a plugin
    PluginOwned,
}

/// One separator-delimited unit of the composed query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Token {
    text: String,
    label: TokenLabel,
    top_result: Option<Candidate>,
    owner_plugin: Option<u32>,
}

impl Token {
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn set_text(&mut self, text: &str) {
        self.text = text.to_string();
    }

    #[must_use]
    pub fn label(&self) -> TokenLabel {
        self.label
    }

    #[must_use]
    pub fn has_label(&self, label: TokenLabel) -> bool {
        self.label == label
    }

    pub fn set_label(&mut self, label: TokenLabel) {
        self.label = label;
    }

    #[must_use]
    pub fn top_result(&self) -> Option<&Candidate> {
        self.top_result.as_ref()
    }

    pub fn set_top_result(&mut self, candidate: Candidate) {
        self.top_result = Some(candidate);
    }

    pub fn clear_top_result(&mut self) {
        self.top_result = None;
    }

    #[must_use]
    pub fn owner_plugin(&self) -> Option<u32> {
        self.owner_plugin
    }

    pub fn set_owner_plugin(&mut self, plugin_id: u32) {
        self.owner_plugin = Some(plugin_id);
        self.label = TokenLabel::PluginOwned;
    }
}

/// Ordered list of tokens representing one compound command.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenSequence(Vec<Token>);

impl TokenSequence {
    /// Parse raw input text into tokens. Never fails: text without a
    /// separator degrades to a single free-text token, and empty
    /// input yields an empty sequence. A trailing separator produces
    /// a trailing empty token (the fresh live-edit token after a
    /// commit).
    #[must_use]
    pub fn parse(raw: &str, separator: &str) -> Self {
        if raw.is_empty() {
            return Self(Vec::new());
        }
        if separator.is_empty() {
            return Self(vec![Token::new(raw)]);
        }
        Self(raw.split(separator).map(Token::new).collect())
    }

    /// Re-derive the sequence from edited text in place. A token
    /// whose text is unchanged at the same position keeps its
    /// annotations; everything else is replaced fresh.
    pub fn reparse(&mut self, raw: &str, separator: &str) {
        let fresh = Self::parse(raw, separator);
        self.0.truncate(fresh.0.len());
        for (i, token) in fresh.0.into_iter().enumerate() {
            match self.0.get_mut(i) {
                Some(existing) if existing.text() == token.text() => {}
                Some(existing) => *existing = token,
                None => self.0.push(token),
            }
        }
    }

    /// Reconstruct canonical text. With `exclude_last` the trailing
    /// in-progress token is omitted and every committed token keeps
    /// its trailing separator, giving the prefix a completion is
    /// appended to.
    #[must_use]
    pub fn to_string(&self, exclude_last: bool, separator: &str) -> String {
        if exclude_last {
            let committed = self.0.len().saturating_sub(1);
            self.0[..committed]
                .iter()
                .map(|t| format!("{}{separator}", t.text()))
                .collect()
        } else {
            self.0
                .iter()
                .map(Token::text)
                .collect::<Vec<_>>()
                .join(separator)
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn first(&self) -> Option<&Token> {
        self.0.first()
    }

    pub fn first_mut(&mut self) -> Option<&mut Token> {
        self.0.first_mut()
    }

    #[must_use]
    pub fn last(&self) -> Option<&Token> {
        self.0.last()
    }

    pub fn last_mut(&mut self) -> Option<&mut Token> {
        self.0.last_mut()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Token> {
        self.0.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Token> {
        self.0.iter()
    }

    /// Text of the last token, the one being typed. Empty when the
    /// sequence is empty.
    #[must_use]
    pub fn live_text(&self) -> &str {
        self.last().map_or("", Token::text)
    }
}

impl<'a> IntoIterator for &'a TokenSequence {
    type Item = &'a Token;
    type IntoIter = std::slice::Iter<'a, Token>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEP: &str = " | ";

    #[test]
    fn test_parse_empty_input_yields_empty_sequence() {
        let seq = TokenSequence::parse("", SEP);
        assert!(seq.is_empty());
        assert_eq!(seq.live_text(), "");
    }

    #[test]
    fn test_parse_single_token() {
        let seq = TokenSequence::parse("fire", SEP);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.live_text(), "fire");
    }

    #[test]
    fn test_parse_compound_command() {
        let seq = TokenSequence::parse("editor | notes.txt", SEP);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.first().unwrap().text(), "editor");
        assert_eq!(seq.live_text(), "notes.txt");
    }

    #[test]
    fn test_parse_trailing_separator_appends_empty_live_token() {
        let seq = TokenSequence::parse("editor | ", SEP);
        assert_eq!(seq.len(), 2);
        assert_eq!(seq.live_text(), "");
    }

    #[test]
    fn test_parse_never_fails_on_odd_input() {
        let seq = TokenSequence::parse("|||", SEP);
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.live_text(), "|||");
    }

    #[test]
    fn test_to_string_round_trip() {
        let raw = "editor | notes.txt | ";
        let seq = TokenSequence::parse(raw, SEP);
        assert_eq!(seq.to_string(false, SEP), raw);

        let reparsed = TokenSequence::parse(&seq.to_string(false, SEP), SEP);
        assert_eq!(reparsed.len(), seq.len());
        for (a, b) in reparsed.iter().zip(seq.iter()) {
            assert_eq!(a.text(), b.text());
        }
    }

    #[test]
    fn test_to_string_exclude_last_keeps_trailing_separator() {
        let seq = TokenSequence::parse("editor | notes", SEP);
        assert_eq!(seq.to_string(true, SEP), "editor | ");
    }

    #[test]
    fn test_to_string_exclude_last_single_token_is_empty() {
        let seq = TokenSequence::parse("fire", SEP);
        assert_eq!(seq.to_string(true, SEP), "");
    }

    #[test]
    fn test_label_annotations() {
        let mut seq = TokenSequence::parse("fire", SEP);
        seq.last_mut().unwrap().set_label(TokenLabel::AutoSuggest);
        assert!(seq.last().unwrap().has_label(TokenLabel::AutoSuggest));

        // Reparse drops annotations: the sequence is a pure function of text
        let seq = TokenSequence::parse("fire", SEP);
        assert!(seq.last().unwrap().has_label(TokenLabel::None));
    }

    #[test]
    fn test_reparse_preserves_unchanged_token_annotations() {
        let mut seq = TokenSequence::parse("editor | no", SEP);
        seq.first_mut().unwrap().set_top_result(Candidate::new(
            "Editor",
            "/usr/bin/editor",
            quiver_types::CandidateSource::Catalog,
        ));

        seq.reparse("editor | notes", SEP);
        assert_eq!(seq.len(), 2);
        assert!(seq.first().unwrap().top_result().is_some(), "kept");
        assert_eq!(seq.live_text(), "notes");

        seq.reparse("edit | notes", SEP);
        assert!(
            seq.first().unwrap().top_result().is_none(),
            "changed text drops annotations"
        );
    }

    #[test]
    fn test_reparse_shrinks_and_grows() {
        let mut seq = TokenSequence::parse("a | b | c", SEP);
        seq.reparse("a", SEP);
        assert_eq!(seq.len(), 1);
        seq.reparse("a | b | ", SEP);
        assert_eq!(seq.len(), 3);
        assert_eq!(seq.live_text(), "");
    }

    #[test]
    fn test_owner_plugin_sets_label() {
        let mut token = Token::new("calc");
        token.set_owner_plugin(7);
        assert_eq!(token.owner_plugin(), Some(7));
        assert!(token.has_label(TokenLabel::PluginOwned));
    }
}
