use engagemint_types::{Post, ProcessingType, UserTally};

/// Punctuation stripped from word boundaries before keyword matching.
pub const STRIP_PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':', '(', ')', '@'];

/// Which form of the keyword matched, in ascending priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum KeywordForm {
    Plain,
    Hashtag,
    Cashtag,
}

/// Classifies post content against the configured keyword and accumulates
/// per-user tallies.
///
/// The keyword and the category caps are injected here rather than read from
/// module constants, so a deployment can score a different keyword without
/// touching this crate.
#[derive(Debug, Clone)]
pub struct ScoringEngine {
    keyword: String,
    hashtag_cap: u32,
    cashtag_cap: u32,
}

impl ScoringEngine {
    pub fn new(keyword: &str, hashtag_cap: u32, cashtag_cap: u32) -> Self {
        Self {
            keyword: keyword.to_ascii_lowercase(),
            hashtag_cap,
            cashtag_cap,
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    /// Find the highest-priority keyword form in the content.
    ///
    /// Words are split on whitespace and stripped of boundary punctuation
    /// before matching, case-insensitively. A cashtag form wins over a
    /// hashtag form wins over the bare word, regardless of where each
    /// appears in the text. The keyword embedded in a longer word does not
    /// match.
    pub fn classify(&self, content: &str) -> Option<KeywordForm> {
        let mut best: Option<KeywordForm> = None;
        for word in content.split_whitespace() {
            let trimmed = word.trim_matches(STRIP_PUNCTUATION).to_ascii_lowercase();
            let form = if trimmed
                .strip_prefix('$')
                .is_some_and(|rest| rest == self.keyword)
            {
                Some(KeywordForm::Cashtag)
            } else if trimmed
                .strip_prefix('#')
                .is_some_and(|rest| rest == self.keyword)
            {
                Some(KeywordForm::Hashtag)
            } else if trimmed == self.keyword {
                Some(KeywordForm::Plain)
            } else {
                None
            };

            if form > best {
                best = form;
            }
            if best == Some(KeywordForm::Cashtag) {
                break;
            }
        }
        best
    }

    /// Apply one classified post to the user's tally.
    ///
    /// Returns how the post was counted. Once a category's cap is reached,
    /// further posts of that category are skipped, not downgraded to simple.
    pub fn score(
        &self,
        tally: &mut UserTally,
        likes: u64,
        form: Option<KeywordForm>,
    ) -> ProcessingType {
        let processing = match form {
            None => ProcessingType::Skipped,
            Some(KeywordForm::Cashtag) if tally.cashtag_posts >= self.cashtag_cap => {
                ProcessingType::Skipped
            }
            Some(KeywordForm::Hashtag) if tally.hashtag_posts >= self.hashtag_cap => {
                ProcessingType::Skipped
            }
            Some(KeywordForm::Cashtag) => {
                tally.cashtag_posts += 1;
                ProcessingType::Cashtag
            }
            Some(KeywordForm::Hashtag) => {
                tally.hashtag_posts += 1;
                ProcessingType::Hashtag
            }
            Some(KeywordForm::Plain) => {
                tally.simple_posts += 1;
                ProcessingType::Simple
            }
        };

        if processing.counts() {
            tally.posts += 1;
            tally.likes += likes;
        }
        processing
    }

    /// Classify and score in one step.
    pub fn score_post(&self, tally: &mut UserTally, post: &Post) -> ProcessingType {
        self.score(tally, post.likes, self.classify(&post.content))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ScoringEngine {
        ScoringEngine::new("gm", 10, 10)
    }

    #[test]
    fn test_cashtag_beats_hashtag_regardless_of_position() {
        assert_eq!(
            engine().classify("Both #gm and $gm here"),
            Some(KeywordForm::Cashtag)
        );
        assert_eq!(
            engine().classify("$gm before #gm"),
            Some(KeywordForm::Cashtag)
        );
    }

    #[test]
    fn test_hashtag_beats_plain() {
        assert_eq!(
            engine().classify("#gm and then gm"),
            Some(KeywordForm::Hashtag)
        );
        assert_eq!(
            engine().classify("gm and then #gm"),
            Some(KeywordForm::Hashtag)
        );
    }

    #[test]
    fn test_no_substring_match() {
        assert_eq!(engine().classify("gmgm"), None);
        assert_eq!(engine().classify("program"), None);
        assert_eq!(engine().classify("$gmx"), None);
    }

    #[test]
    fn test_case_and_punctuation() {
        assert_eq!(engine().classify("GM!"), Some(KeywordForm::Plain));
        assert_eq!(engine().classify("(#gm)"), Some(KeywordForm::Hashtag));
        assert_eq!(engine().classify("$GM."), Some(KeywordForm::Cashtag));
        assert_eq!(engine().classify("good morning"), None);
    }

    #[test]
    fn test_score_accumulates() {
        let engine = engine();
        let mut tally = UserTally::new(1);

        assert_eq!(
            engine.score(&mut tally, 5, Some(KeywordForm::Plain)),
            ProcessingType::Simple
        );
        assert_eq!(
            engine.score(&mut tally, 2, Some(KeywordForm::Hashtag)),
            ProcessingType::Hashtag
        );
        assert_eq!(
            engine.score(&mut tally, 1, Some(KeywordForm::Cashtag)),
            ProcessingType::Cashtag
        );
        assert_eq!(engine.score(&mut tally, 99, None), ProcessingType::Skipped);

        assert_eq!(tally.posts, 3);
        assert_eq!(tally.simple_posts, 1);
        assert_eq!(tally.hashtag_posts, 1);
        assert_eq!(tally.cashtag_posts, 1);
        assert_eq!(tally.likes, 8);
    }

    #[test]
    fn test_hashtag_cap_skips_eleventh() {
        let engine = engine();
        let mut tally = UserTally::new(1);

        for _ in 0..10 {
            assert_eq!(
                engine.score(&mut tally, 1, Some(KeywordForm::Hashtag)),
                ProcessingType::Hashtag
            );
        }
        assert_eq!(
            engine.score(&mut tally, 1, Some(KeywordForm::Hashtag)),
            ProcessingType::Skipped
        );
        assert_eq!(tally.hashtag_posts, 10);
        assert_eq!(tally.likes, 10);

        // Capped posts are skipped, not reclassified to simple.
        assert_eq!(tally.simple_posts, 0);
    }

    #[test]
    fn test_cashtag_cap_independent_of_hashtag_cap() {
        let engine = engine();
        let mut tally = UserTally::new(1);

        for _ in 0..10 {
            engine.score(&mut tally, 0, Some(KeywordForm::Cashtag));
        }
        assert_eq!(
            engine.score(&mut tally, 0, Some(KeywordForm::Cashtag)),
            ProcessingType::Skipped
        );
        // Hashtag category still open.
        assert_eq!(
            engine.score(&mut tally, 0, Some(KeywordForm::Hashtag)),
            ProcessingType::Hashtag
        );
    }

    #[test]
    fn test_simple_posts_uncapped() {
        let engine = engine();
        let mut tally = UserTally::new(1);

        for _ in 0..25 {
            assert_eq!(
                engine.score(&mut tally, 1, Some(KeywordForm::Plain)),
                ProcessingType::Simple
            );
        }
        assert_eq!(tally.simple_posts, 25);
    }

    #[test]
    fn test_keyword_is_configurable() {
        let engine = ScoringEngine::new("WAGMI", 10, 10);
        assert_eq!(engine.classify("wagmi!"), Some(KeywordForm::Plain));
        assert_eq!(engine.classify("#WAGMI"), Some(KeywordForm::Hashtag));
        assert_eq!(engine.classify("gm"), None);
    }
}
