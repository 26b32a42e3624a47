//! Whole-word keyword matching with context-window suppression.
//!
//! Every keyword and term is compiled into a case-insensitive regex anchored
//! on word boundaries, so "mass" never fires inside "Massachusetts". Word
//! boundaries are only added on sides where the term itself starts or ends
//! with a word character; runs of whitespace inside a term match any
//! whitespace.

use regex::Regex;
use tracing::debug;

use crate::error::ConfigError;

/// Build the regex source for one term, without flags.
fn term_source(term: &str) -> Option<String> {
    let words: Vec<String> = term.split_whitespace().map(regex::escape).collect();
    if words.is_empty() {
        return None;
    }
    let body = words.join(r"\s+");
    let trimmed = term.trim();
    let lead = if trimmed.starts_with(is_word_char) { r"\b" } else { "" };
    let tail = if trimmed.ends_with(is_word_char) { r"\b" } else { "" };
    Some(format!("{lead}{body}{tail}"))
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

fn compile(term: &str, source: &str) -> Result<Regex, ConfigError> {
    Regex::new(&format!("(?i){source}")).map_err(|source| ConfigError::Pattern {
        term: term.to_string(),
        source,
    })
}

/// A set of terms tested together, e.g. negation phrases or suppression terms.
#[derive(Debug, Clone, Default)]
pub struct TermSet {
    terms: Vec<String>,
    regex: Option<Regex>,
}

impl TermSet {
    pub fn compile(terms: &[String]) -> Result<Self, ConfigError> {
        let mut kept = Vec::new();
        let mut sources = Vec::new();
        for term in terms {
            if let Some(src) = term_source(term) {
                kept.push(term.trim().to_string());
                sources.push(format!("(?:{src})"));
            }
        }
        if sources.is_empty() {
            return Ok(Self::default());
        }
        let label = kept.join(" | ");
        let regex = compile(&label, &sources.join("|"))?;
        Ok(Self {
            terms: kept,
            regex: Some(regex),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.regex.is_none()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// First term found in `text`, as it appears in the text.
    pub fn find<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.regex.as_ref()?.find(text).map(|m| m.as_str())
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.as_ref().is_some_and(|re| re.is_match(text))
    }

    fn find_around<'t>(&self, before: &'t str, after: &'t str) -> Option<&'t str> {
        self.find(before).or_else(|| self.find(after))
    }
}

/// Outcome of scanning one text for one keyword.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Occurrences {
    /// Occurrences that survived untouched.
    pub kept: usize,
    /// Occurrences demoted by a downweight term.
    pub demoted: usize,
    /// Occurrences dropped by a suppression term or a negation phrase.
    pub suppressed: usize,
}

impl Occurrences {
    pub fn any_surviving(&self) -> bool {
        self.kept > 0 || self.demoted > 0
    }
}

/// A compiled keyword with its own suppression and downweight terms.
#[derive(Debug, Clone)]
pub struct KeywordPattern {
    keyword: String,
    regex: Regex,
    suppress: TermSet,
    downweight: TermSet,
}

impl KeywordPattern {
    pub fn compile(
        keyword: &str,
        suppress_if_any: &[String],
        downweight_if_any: &[String],
    ) -> Result<Self, ConfigError> {
        let source = term_source(keyword)
            .ok_or_else(|| ConfigError::Invalid("empty keyword".to_string()))?;
        Ok(Self {
            keyword: keyword.trim().to_string(),
            regex: compile(keyword, &source)?,
            suppress: TermSet::compile(suppress_if_any)?,
            downweight: TermSet::compile(downweight_if_any)?,
        })
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Scan `text`, judging every occurrence by the `window` characters on
    /// either side of it.
    pub fn scan(&self, text: &str, negations: &TermSet, window: usize) -> Occurrences {
        let mut out = Occurrences::default();
        for m in self.regex.find_iter(text) {
            let (before, after) = context(text, m.start(), m.end(), window);

            if let Some(term) = self.suppress.find_around(before, after) {
                debug!(keyword = %self.keyword, term, "match suppressed by rule");
                out.suppressed += 1;
                continue;
            }
            if let Some(phrase) = negations.find_around(before, after) {
                debug!(keyword = %self.keyword, phrase, "match suppressed by negation");
                out.suppressed += 1;
                continue;
            }
            if let Some(term) = self.downweight.find_around(before, after) {
                debug!(keyword = %self.keyword, term, "match downweighted");
                out.demoted += 1;
                continue;
            }
            out.kept += 1;
        }
        out
    }
}

/// Up to `window` characters before `start` and after `end`, widened to whole
/// words at the outer edges.
fn context(text: &str, start: usize, end: usize, window: usize) -> (&str, &str) {
    if window == 0 {
        return ("", "");
    }
    let head = &text[..start];
    let from = head
        .char_indices()
        .rev()
        .nth(window - 1)
        .map(|(i, _)| i)
        .unwrap_or(0);
    let from = if head[from..].starts_with(char::is_whitespace) {
        from
    } else {
        head[..from]
            .char_indices()
            .rev()
            .take_while(|(_, c)| !c.is_whitespace())
            .last()
            .map_or(from, |(i, _)| i)
    };

    let tail = &text[end..];
    let to = tail
        .char_indices()
        .nth(window)
        .map(|(i, _)| i)
        .unwrap_or(tail.len());
    let to = if tail[..to].ends_with(char::is_whitespace) {
        to
    } else {
        tail[to..].find(char::is_whitespace).map_or(tail.len(), |i| to + i)
    };
    (&head[from..], &tail[..to])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn kw(keyword: &str) -> KeywordPattern {
        KeywordPattern::compile(keyword, &[], &[]).unwrap()
    }

    #[test]
    fn whole_word_only() {
        let mass = kw("mass");
        assert!(!mass.is_match("Governor of Massachusetts signs bill"));
        assert!(mass.is_match("Plans for mass removals"));
        assert!(mass.is_match("MASS layoffs"));

        let classification = kw("classification");
        assert!(!classification.is_match("Sweeping reclassification of federal staff"));
        assert!(classification.is_match("New classification guidance"));
    }

    #[test]
    fn multi_word_keyword_tolerates_whitespace() {
        let k = kw("schedule  f");
        assert!(k.is_match("Agency implements Schedule\nF conversions"));
        assert!(!k.is_match("schedule for fiscal year"));
    }

    #[test]
    fn punctuation_edges_skip_boundary() {
        let k = kw("u.s.");
        assert!(k.is_match("the u.s. attorney"));
    }

    #[test]
    fn empty_keyword_is_invalid() {
        assert!(KeywordPattern::compile("   ", &[], &[]).is_err());
    }

    #[test]
    fn window_edge_never_splits_a_word() {
        assert_eq!(context("metadata purge", 9, 14, 5), ("metadata ", ""));
        assert_eq!(context("purge of databases", 0, 5, 5), ("", " of databases"));
        assert_eq!(context("a purge b", 2, 7, 40), ("a ", " b"));
        assert_eq!(context("old news purge", 9, 14, 5), ("news ", ""));

        let k = KeywordPattern::compile("purge", &terms(&["data"]), &[]).unwrap();
        let out = k.scan("metadata purge ordered", &TermSet::default(), 5);
        assert_eq!(out.kept, 1);
    }

    #[test]
    fn suppression_term_in_window_drops_match() {
        let k = KeywordPattern::compile("purge", &terms(&["data", "cache"]), &[]).unwrap();
        let none = TermSet::default();
        let out = k.scan("Routine cache purge completed", &none, 40);
        assert_eq!(out, Occurrences { kept: 0, demoted: 0, suppressed: 1 });

        let out = k.scan("Officials announce purge of inspectors", &none, 40);
        assert_eq!(out.kept, 1);
    }

    #[test]
    fn suppression_term_outside_window_is_ignored() {
        let k = KeywordPattern::compile("purge", &terms(&["data"]), &[]).unwrap();
        let text = "data was mentioned long ago in this sentence and then a purge";
        let out = k.scan(text, &TermSet::default(), 10);
        assert_eq!(out.kept, 1);
    }

    #[test]
    fn downweight_demotes() {
        let k = KeywordPattern::compile("martial law", &[], &terms(&["historical"])).unwrap();
        let out = k.scan("A historical look at martial law", &TermSet::default(), 50);
        assert_eq!(out, Occurrences { kept: 0, demoted: 1, suppressed: 0 });
        assert!(out.any_surviving());
    }

    #[test]
    fn negation_phrase_suppresses() {
        let negations = TermSet::compile(&terms(&["no evidence of", "rejected"])).unwrap();
        let k = kw("voter purge");
        let out = k.scan("Court finds no evidence of voter purge", &negations, 60);
        assert_eq!(out.suppressed, 1);
        let out = k.scan("Voter purge proposal rejected by council", &negations, 60);
        assert_eq!(out.suppressed, 1);
        let out = k.scan("State begins voter purge", &negations, 60);
        assert_eq!(out.kept, 1);
    }

    #[test]
    fn counts_each_occurrence() {
        let out = kw("raid").scan("raid after raid", &TermSet::default(), 0);
        assert_eq!(out.kept, 2);
    }

    #[test]
    fn context_respects_char_boundaries() {
        let text = "ééé keyword ééé";
        let start = text.find("keyword").unwrap();
        let (before, after) = context(text, start, start + 7, 2);
        assert_eq!(before, "é ");
        assert_eq!(after, " é");
    }

    #[test]
    fn term_set_find_and_empty() {
        let set = TermSet::compile(&terms(&["did not", "  "])).unwrap();
        assert_eq!(set.terms(), &["did not".to_string()]);
        assert_eq!(set.find("They DID NOT comply"), Some("DID NOT"));
        assert!(TermSet::compile(&[]).unwrap().is_empty());
        assert!(!TermSet::default().is_match("anything"));
    }
}
