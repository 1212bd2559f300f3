//! Fixed word lists used by the heuristic intake fallback. These back up
//! the text-model path when generation is unavailable — never raised to
//! literary quality, just enough signal to route themes and tone.

pub const THEME_LEXICON: &[(&str, &[&str])] = &[
    ("creativity", &["create", "art", "design", "imagine", "build", "write", "paint", "compose"]),
    ("connection", &["friend", "family", "love", "together", "community", "relationship", "share"]),
    ("health", &["health", "body", "exercise", "sleep", "heal", "wellness", "fitness", "rest"]),
    ("growth", &["learn", "grow", "improve", "develop", "skill", "practice", "better"]),
    ("purpose", &["meaning", "purpose", "goal", "mission", "calling", "why", "matter"]),
    ("abundance", &["money", "wealth", "abundance", "prosper", "success", "career", "business"]),
    ("nature", &["nature", "garden", "outdoor", "forest", "ocean", "earth", "plant", "animal"]),
    ("love", &["love", "romance", "partner", "heart", "affection", "intimacy"]),
    ("freedom", &["freedom", "travel", "explore", "independent", "adventure", "escape"]),
    ("wisdom", &["wisdom", "understand", "knowledge", "truth", "insight", "reflect", "philosophy"]),
];

pub const POSITIVE_WORDS: &[&str] = &[
    "happy", "joy", "love", "hope", "excited", "grateful", "peace", "wonderful", "amazing",
    "beautiful", "good", "great", "delight", "bliss",
];

pub const NEGATIVE_WORDS: &[&str] = &[
    "sad", "angry", "afraid", "fear", "hate", "hurt", "pain", "worry", "anxious", "lonely",
    "terrible", "awful", "bad", "grief",
];

pub const HIGH_AROUSAL_WORDS: &[&str] = &[
    "excited", "urgent", "now", "immediately", "desperate", "thrilled", "panic", "rush", "intense",
];

pub const LOW_AROUSAL_WORDS: &[&str] = &[
    "calm", "slow", "quiet", "rest", "gentle", "peaceful", "someday", "eventually", "relax",
];

/// Per-dimension marker words that heuristically flag potential violations.
pub const ETHICAL_MARKERS: &[(&str, &[&str])] = &[
    ("harm", &["kill", "destroy", "attack", "hurt", "violence", "weapon", "abuse"]),
    ("fairness", &["discriminate", "unfair", "exploit", "cheat", "bias"]),
    ("sustainability", &["waste", "pollute", "deplete", "destroy environment"]),
    ("consent", &["force", "coerce", "manipulate", "without permission", "secretly"]),
    ("kindness", &["cruel", "mock", "humiliate", "bully"]),
    ("truthfulness", &["lie", "deceive", "fake", "fraud", "mislead"]),
];

pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        if ch.is_alphabetic() || ch == '\'' {
            current.push(ch.to_ascii_lowercase());
        } else if !current.is_empty() {
            tokens.push(std::mem::take(&mut current));
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}
