use crate::error::Result;
use lazy_static::lazy_static;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use std::collections::HashSet;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

lazy_static! {
    /// A word (letters/digits with inner apostrophes) or a single non-space symbol.
    static ref RE: Regex = Regex::new(r"(?u)[\p{L}\p{N}][\p{L}\p{N}_']*|[^\s\p{L}\p{N}]").expect("valid regex");
    static ref ENGLISH_STOPWORDS: HashSet<&'static str> = {
        let words: &[&str] = &[
            "a","about","above","after","again","against","ain","all","am","an","and","any","are","aren","aren't","as","at",
            "be","because","been","before","being","below","between","both","but","by",
            "can","couldn","couldn't",
            "d","did","didn","didn't","do","does","doesn","doesn't","doing","don","don't","down","during",
            "each","few","for","from","further",
            "had","hadn","hadn't","has","hasn","hasn't","have","haven","haven't","having","he","her","here","hers","herself","him","himself","his","how",
            "i","if","in","into","is","isn","isn't","it","it's","its","itself",
            "just","ll","m","ma","me","mightn","mightn't","more","most","mustn","mustn't","my","myself",
            "needn","needn't","no","nor","not","now",
            "o","of","off","on","once","only","or","other","our","ours","ourselves","out","over","own",
            "re","s","same","shan","shan't","she","she's","should","should've","shouldn","shouldn't","so","some","such",
            "t","than","that","that'll","the","their","theirs","them","themselves","then","there","these","they","this","those","through","to","too",
            "under","until","up","ve","very",
            "was","wasn","wasn't","we","were","weren","weren't","what","when","where","which","while","who","whom","why","will","with","won","won't","wouldn","wouldn't",
            "y","you","you'd","you'll","you're","you've","your","yours","yourself","yourselves"
        ];
        words.iter().copied().collect()
    };
}

/// Split raw text into word and punctuation tokens after NFKC normalization.
/// Surface case is preserved; folding happens in [`Normalizer::normalize`].
pub fn tokenize(text: &str) -> Vec<String> {
    let normalized = text.nfkc().collect::<String>();
    RE.find_iter(&normalized).map(|m| m.as_str().to_string()).collect()
}

/// A token made only of symbols, e.g. `.` or `"`.
pub fn is_punctuation(token: &str) -> bool {
    !token.is_empty() && token.chars().all(|c| !c.is_alphanumeric())
}

/// Stopword set and stemmer, built once and shared by the index build and
/// every query so both sides produce identical terms.
pub struct Normalizer {
    stopwords: HashSet<String>,
    stemmer: Stemmer,
}

impl Normalizer {
    pub fn english() -> Self {
        Self::with_stopwords(ENGLISH_STOPWORDS.iter().copied())
    }

    pub fn with_stopwords<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let stopwords = words
            .into_iter()
            .map(|w| w.as_ref().trim().to_lowercase())
            .filter(|w| !w.is_empty())
            .collect();
        Self { stopwords, stemmer: Stemmer::create(Algorithm::English) }
    }

    /// Load a stopword list with one word per line; `#` starts a comment line.
    pub fn from_stopword_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let words = raw.lines().map(str::trim).filter(|l| !l.starts_with('#'));
        let normalizer = Self::with_stopwords(words);
        tracing::info!(path = %path.as_ref().display(), stopwords = normalizer.stopwords.len(), "loaded stopword list");
        Ok(normalizer)
    }

    /// Membership test against lowercase, unstemmed forms.
    pub fn is_stopword(&self, lowered: &str) -> bool {
        self.stopwords.contains(lowered)
    }

    pub fn stem(&self, lowered: &str) -> String {
        self.stemmer.stem(lowered).into_owned()
    }

    /// Drop punctuation, fold case, drop stopwords, then stem, in that order.
    pub fn normalize<S: AsRef<str>>(&self, tokens: &[S]) -> Vec<String> {
        let mut terms = Vec::with_capacity(tokens.len());
        for token in tokens {
            let token: &str = token.as_ref();
            if is_punctuation(token) {
                continue;
            }
            let lowered = token.to_lowercase();
            if self.is_stopword(&lowered) {
                continue;
            }
            let stem = self.stem(&lowered);
            if !stem.is_empty() {
                terms.push(stem);
            }
        }
        terms
    }

    pub fn normalize_text(&self, text: &str) -> Vec<String> {
        self.normalize(&tokenize(text))
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::english()
    }
}
