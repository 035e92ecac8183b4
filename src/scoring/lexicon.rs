use crate::models::BiasType;

/// A phrase that signals a bias, with its contribution to the screening score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cue {
    /// Normalized phrase: lowercase words separated by single spaces
    pub phrase: &'static str,
    pub weight: f64,
}

const fn cue(phrase: &'static str, weight: f64) -> Cue {
    Cue { phrase, weight }
}

const ANCHORING: &[Cue] = &[
    cue("anchor", 0.30),
    cue("first number", 0.30),
    cue("starting point", 0.30),
    cue("ballpark", 0.25),
    cue("based on last year", 0.30),
    cue("original estimate", 0.30),
    cue("stick with that figure", 0.35),
];

const CONFIRMATION: &[Cue] = &[
    cue("proves my point", 0.40),
    cue("as i expected", 0.35),
    cue("just as i said", 0.35),
    cue("confirms what", 0.35),
    cue("i knew it", 0.30),
    cue("only data that", 0.30),
    cue("ignore the", 0.25),
];

const GROUPTHINK: &[Cue] = &[
    cue("we all agree", 0.40),
    cue("everyone agrees", 0.40),
    cue("nobody disagrees", 0.35),
    cue("no need to discuss", 0.35),
    cue("let s not rock the boat", 0.40),
    cue("no objections", 0.30),
    cue("unanimous", 0.30),
];

const AVAILABILITY: &[Cue] = &[
    cue("i remember when", 0.30),
    cue("just last week", 0.30),
    cue("happened to a friend", 0.35),
    cue("saw it in the news", 0.35),
    cue("i heard about", 0.25),
    cue("that one time", 0.30),
];

const SUNK_COST: &[Cue] = &[
    cue("already invested", 0.40),
    cue("already spent", 0.40),
    cue("too far to stop", 0.40),
    cue("come this far", 0.35),
    cue("put so much into", 0.35),
    cue("can t waste", 0.30),
    cue("all that work", 0.25),
];

const AUTHORITY: &[Cue] = &[
    cue("the ceo said", 0.40),
    cue("because the boss", 0.35),
    cue("the expert says", 0.35),
    cue("knows best", 0.35),
    cue("leadership wants", 0.30),
    cue("came from the top", 0.35),
];

const RECENCY: &[Cue] = &[
    cue("latest numbers", 0.30),
    cue("yesterday s results", 0.30),
    cue("last quarter", 0.25),
    cue("most recent", 0.25),
    cue("just happened", 0.25),
    cue("this week s", 0.20),
];

const BANDWAGON: &[Cue] = &[
    cue("everyone is doing", 0.40),
    cue("all our competitors", 0.35),
    cue("everyone else", 0.30),
    cue("jump on", 0.30),
    cue("industry standard", 0.25),
    cue("the trend is", 0.25),
];

const STATUS_QUO: &[Cue] = &[
    cue("the way we ve always", 0.40),
    cue("always done it", 0.40),
    cue("if it ain t broke", 0.40),
    cue("if it isn t broken", 0.40),
    cue("why change", 0.35),
    cue("keep things as they are", 0.35),
    cue("stick with what", 0.30),
];

const FRAMING: &[Cue] = &[
    cue("spin it as", 0.35),
    cue("percent success", 0.30),
    cue("present it as", 0.30),
    cue("look at it as a win", 0.30),
    cue("only lose", 0.30),
    cue("chance of failure", 0.25),
];

const OVERCONFIDENCE: &[Cue] = &[
    cue("can t fail", 0.40),
    cue("cannot fail", 0.40),
    cue("hundred percent sure", 0.40),
    cue("guaranteed", 0.35),
    cue("absolutely certain", 0.35),
    cue("no doubt", 0.30),
    cue("definitely", 0.25),
];

const PLANNING_FALLACY: &[Cue] = &[
    cue("two weeks tops", 0.40),
    cue("easily done by", 0.35),
    cue("won t take long", 0.35),
    cue("plenty of time", 0.30),
    cue("quick fix", 0.30),
    cue("should be simple", 0.30),
    cue("no delays", 0.30),
];

/// Words that strengthen a claim
pub const INTENSIFIERS: &[&str] = &[
    "definitely",
    "clearly",
    "obviously",
    "absolutely",
    "certainly",
    "totally",
    "always",
    "never",
];

/// Words that soften a claim
pub const HEDGES: &[&str] = &[
    "maybe",
    "perhaps",
    "might",
    "possibly",
    "could be",
    "not sure",
    "i wonder",
    "on the other hand",
];

pub fn cues(bias_type: BiasType) -> &'static [Cue] {
    match bias_type {
        BiasType::Anchoring => ANCHORING,
        BiasType::Confirmation => CONFIRMATION,
        BiasType::Groupthink => GROUPTHINK,
        BiasType::Availability => AVAILABILITY,
        BiasType::SunkCost => SUNK_COST,
        BiasType::Authority => AUTHORITY,
        BiasType::Recency => RECENCY,
        BiasType::Bandwagon => BANDWAGON,
        BiasType::StatusQuo => STATUS_QUO,
        BiasType::Framing => FRAMING,
        BiasType::Overconfidence => OVERCONFIDENCE,
        BiasType::PlanningFallacy => PLANNING_FALLACY,
    }
}

/// Lowercase, replace punctuation with spaces and pad with a space on each
/// side, so phrases match on whole words with `contains(" phrase ")`.
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push(' ');
    for word in text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        out.push_str(&word.to_lowercase());
        out.push(' ');
    }
    out
}

pub fn contains_phrase(normalized: &str, phrase: &str) -> bool {
    normalized.contains(&format!(" {phrase} "))
}

/// Cues for `bias_type` present in already-normalized text
pub fn matched_cues(bias_type: BiasType, normalized: &str) -> impl Iterator<Item = &'static Cue> + '_ {
    cues(bias_type)
        .iter()
        .filter(move |c| contains_phrase(normalized, c.phrase))
}

pub fn count_markers(normalized: &str, markers: &[&str]) -> usize {
    markers
        .iter()
        .filter(|m| contains_phrase(normalized, m))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("We've ALWAYS done it, right?"), " we ve always done it right ");
        assert_eq!(normalize(""), " ");
    }

    #[test]
    fn test_phrase_matches_whole_words() {
        let text = normalize("Let's anchor on that.");
        assert!(contains_phrase(&text, "anchor"));
        let text = normalize("The anchored value");
        assert!(!contains_phrase(&text, "anchor"));
    }

    #[test]
    fn test_cue_phrases_are_normalized() {
        for bias in BiasType::ALL {
            assert!(!cues(bias).is_empty(), "{bias} has no cues");
            for c in cues(bias) {
                assert_eq!(normalize(c.phrase).trim(), c.phrase);
                assert!(c.weight > 0.0 && c.weight < 1.0);
            }
        }
    }

    #[test]
    fn test_matched_cues() {
        let text = normalize("We've already invested so much, we've come this far.");
        let matched: Vec<_> = matched_cues(BiasType::SunkCost, &text).map(|c| c.phrase).collect();
        assert_eq!(matched, vec!["already invested", "come this far"]);
        assert_eq!(count_markers(&normalize("maybe, possibly"), HEDGES), 2);
    }
}
