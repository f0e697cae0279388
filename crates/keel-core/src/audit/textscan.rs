//! Text heuristics shared by the style and staged-message rules.
//!
//! Deterministic, allocation-light scans over snapshot-carried response
//! text. Marker lists are matched case-insensitively on the whole text.

/// Most sentences one paragraph of an escalated response may hold.
pub(crate) const MAX_SENTENCES_PER_PARAGRAPH: usize = 3;

/// Most questions one escalated response (or staged message) may ask.
pub(crate) const MAX_QUESTIONS: usize = 1;

/// Rhetorical-question openers the escalated style must not use.
pub(crate) const RHETORICAL_OPENERS: &[&str] = &[
    "don't you think",
    "wouldn't you agree",
    "isn't it obvious",
    "who are you kidding",
];

/// Phrases and punctuation the escalated style must not use.
pub(crate) const FORBIDDEN_PHRASES: &[&str] = &[
    "you always",
    "you never",
    "everyone knows",
    "let's be real",
    "!!",
    "?!",
];

/// Markers of the closing line that offers a way out of the mode.
pub(crate) const EXIT_MARKERS: &[&str] = &[
    "say the word",
    "we can drop this",
    "we can go back",
    "ease off",
];

/// Advice-giving markers a third message must not contain.
pub(crate) const SOLUTION_MARKERS: &[&str] = &[
    "you should",
    "you could try",
    "my advice",
    "here's what to do",
    "the fix is",
];

/// Named-framework markers a third message must not contain.
pub(crate) const FRAMEWORK_MARKERS: &[&str] = &[
    "cbt",
    "cognitive behavioral",
    "internal family systems",
    "nonviolent communication",
    "gestalt",
    "attachment theory",
];

/// Service-tier markers a third message must not contain.
pub(crate) const TIER_MARKERS: &[&str] = &["free plan", "premium plan", "your plan", "your tier"];

/// Upgrade-language markers a third message must not contain.
pub(crate) const UPGRADE_MARKERS: &[&str] = &["upgrade", "unlock", "paywall", "go premium"];

const EMOJI_RANGES: &[(u32, u32)] = &[
    (0x1F300, 0x1F5FF),
    (0x1F600, 0x1F64F),
    (0x1F680, 0x1F6FF),
    (0x1F900, 0x1FAFF),
    (0x2600, 0x26FF),
    (0x2700, 0x27BF),
];

/// Splits text into paragraphs on blank lines.
pub(crate) fn paragraphs(text: &str) -> impl Iterator<Item = &str> {
    text.split("\n\n").map(str::trim).filter(|p| !p.is_empty())
}

/// Counts sentences in one paragraph. A run of terminators (`...`, `?!`)
/// closes a single sentence; trailing unterminated text counts as one.
pub(crate) fn sentence_count(paragraph: &str) -> usize {
    let mut count = 0;
    let mut in_sentence = false;
    for ch in paragraph.chars() {
        if matches!(ch, '.' | '!' | '?') {
            if in_sentence {
                count += 1;
                in_sentence = false;
            }
        } else if !ch.is_whitespace() {
            in_sentence = true;
        }
    }
    if in_sentence {
        count += 1;
    }
    count
}

/// Counts questions; a run of `?` counts once.
pub(crate) fn question_count(text: &str) -> usize {
    let mut count = 0;
    let mut prev_question = false;
    for ch in text.chars() {
        let question = ch == '?';
        if question && !prev_question {
            count += 1;
        }
        prev_question = question;
    }
    count
}

/// Whether the text contains any emoji codepoint.
pub(crate) fn contains_emoji(text: &str) -> bool {
    text.chars().any(|ch| {
        let cp = ch as u32;
        EMOJI_RANGES.iter().any(|&(lo, hi)| (lo..=hi).contains(&cp))
    })
}

/// First marker from the list found in the text, case-insensitive.
pub(crate) fn find_marker<'a>(text: &str, markers: &'a [&'a str]) -> Option<&'a str> {
    let lowered = text.to_lowercase();
    markers.iter().copied().find(|marker| lowered.contains(marker))
}

/// Whether the final paragraph contains a way-out line.
pub(crate) fn has_exit_line(text: &str) -> bool {
    paragraphs(text)
        .last()
        .is_some_and(|closing| find_marker(closing, EXIT_MARKERS).is_some())
}
