//! Rule-based intent extraction.
//!
//! Maps a normalized prompt to an intent key such as `DefineConcept:recursion`
//! so that different phrasings of the same request share a cache entry.
//! Rules are tried in priority order and the first match wins; within a rule,
//! patterns are tried in order as well. Every pattern is anchored against the
//! whole prompt.
//!
//! Extraction is deterministic and side-effect free. The rule table is
//! compiled once on first use.
//!
//! # Example
//!
//! ```
//! use evicta::cache::intent::extract_intent;
//!
//! let a = extract_intent("difference between tcp and udp").unwrap();
//! let b = extract_intent("compare udp and tcp").unwrap();
//! assert_eq!(a.key(), "DifferenceBetween:tcp udp");
//! assert_eq!(a.key(), b.key());
//! ```

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;

use super::normalize::collapse_whitespace;

/// Unicode decimal digits (`Nd`), not every numeric character.
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\d").expect("digit pattern must compile"));

/// Prompts longer than this (in characters) skip intent extraction.
pub const DEFAULT_MAX_INTENT_PROMPT_CHARS: usize = 80;

/// Base confidence for intents missing from [`BASE_CONFIDENCE`].
const DEFAULT_BASE_CONFIDENCE: f64 = 0.7;

/// Penalty applied when filler phrases were stripped from the subject.
const NOISE_PENALTY: f64 = 0.05;

/// Subjects too vague to identify a specific answer.
const VAGUE_SUBJECTS: &[&str] = &["it", "this", "that", "something", "error", "issue"];

const BASE_CONFIDENCE: &[(&str, f64)] = &[
    ("DifferenceBetween", 0.9),
    ("DefineConcept", 0.9),
    ("ExplainConcept", 0.85),
    ("HowToGuide", 0.85),
    ("DebugError", 0.8),
    ("TroubleshootIssue", 0.7),
    ("CreativeGeneration", 0.6),
    ("WriteCode", 0.75),
    ("FindResource", 0.7),
    ("InstallSetup", 0.85),
    ("ToolRecommendation", 0.65),
    ("SummarizeText", 0.65),
];

const SHARED_NOISE: &[&str] = &[
    r"in simple (?:terms|words)",
    r"in detail",
    r"briefly",
    r"for beginners",
    r"please",
    r"with (?:an )?examples?",
];
const PLATFORM_NOISE: &[&str] = &[r"on (?:ubuntu|linux|windows|macos|mac|debian|fedora)"];
const ELI5_NOISE: &[&str] = &[r"like (?:i'm|i am) five"];
const FOR_ME_NOISE: &[&str] = &[r"for me"];

/// How a rule's captures become a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureShape {
    /// One `subject` group.
    Single,
    /// Groups `a` and `b`, order-insensitive.
    Pair,
    /// A `subject` group plus an optional `context` joined with `connector`.
    WithContext { connector: &'static str },
}

/// Where a match came from. Only rules exist today.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentSource {
    Rule,
}

/// A successful extraction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IntentMatch {
    pub intent: &'static str,
    pub subject: String,
    pub confidence: f64,
    pub source: IntentSource,
    pub noise_removed: bool,
}

impl IntentMatch {
    /// Lookup key, `"{intent}:{subject}"`.
    pub fn key(&self) -> String {
        format!("{}:{}", self.intent, self.subject)
    }
}

/// One entry of the ordered rule table.
#[derive(Debug)]
pub struct IntentRule {
    pub label: &'static str,
    pub patterns: Vec<Regex>,
    pub shape: CaptureShape,
    noise: Option<Regex>,
}

struct RuleDef {
    label: &'static str,
    patterns: &'static [&'static str],
    shape: CaptureShape,
    noise: &'static [&'static [&'static str]],
}

// Order matters: the symmetric pair rule must run before the `compare`
// catch-all, and debug/creative rules before the generic ones they overlap.
// The bare "A vs B" form matches almost anything, so it runs last and only
// sees prompts no verb-led rule claimed.
const RULE_DEFS: &[RuleDef] = &[
    RuleDef {
        label: "DifferenceBetween",
        patterns: &[
            r"^(?:what is the |what's the )?(?:difference between|differences between)\s+(?P<a>.+?)\s+(?:and|vs\.?|versus)\s+(?P<b>.+)$",
            r"^compare\s+(?P<a>.+?)\s+(?:and|with|vs\.?|versus|to)\s+(?P<b>.+)$",
            r"^(?:what is|what's|what are|explain|describe)\s+(?:the\s+)?(?P<a>.+?)\s+(?:vs\.?|versus)\s+(?P<b>.+)$",
        ],
        shape: CaptureShape::Pair,
        noise: &[SHARED_NOISE],
    },
    RuleDef {
        label: "CompareOptions",
        patterns: &[r"^compare\s+(?P<subject>.+)$"],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE],
    },
    RuleDef {
        label: "DefineConcept",
        patterns: &[
            r"^(?:what is|what's|what are|define|meaning of)\s+(?:(?:a|an|the)\s+)?(?P<subject>.+)$",
        ],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, ELI5_NOISE],
    },
    RuleDef {
        label: "ExplainConcept",
        patterns: &[r"^(?:explain|describe)\s+(?P<subject>.+)$"],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, ELI5_NOISE],
    },
    RuleDef {
        label: "HowToGuide",
        patterns: &[
            r"^(?:how to|how do i|how can i|steps to|guide to|procedure to)\s+(?P<subject>.+)$",
        ],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, PLATFORM_NOISE],
    },
    RuleDef {
        label: "DebugError",
        patterns: &[
            r"^(?P<subject>traceback|stack trace|segfault|panic|exception)(?:\s+in\s+(?P<context>.+))?$",
        ],
        shape: CaptureShape::WithContext { connector: " " },
        noise: &[SHARED_NOISE],
    },
    RuleDef {
        label: "TroubleshootIssue",
        patterns: &[
            r"^(?P<subject>.+?)\s+(?:error|not working|failed|exception|issue|problem)$",
            r"^(?:error|not working|failed|exception|issue|problem)\s+(?P<subject>.+)$",
        ],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, PLATFORM_NOISE],
    },
    RuleDef {
        label: "CreativeGeneration",
        patterns: &[
            r"^(?:write|create)\s+(?:an?\s+)?(?P<subject>story|poem|caption|lyrics|dialogue)(?:\s+about\s+(?P<context>.+))?$",
        ],
        shape: CaptureShape::WithContext {
            connector: " about ",
        },
        noise: &[SHARED_NOISE],
    },
    RuleDef {
        label: "WriteCode",
        patterns: &[r"^(?:write code|write|implement)\s+(?P<subject>.+)$"],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, FOR_ME_NOISE],
    },
    RuleDef {
        label: "FindResource",
        patterns: &[r"^(?:find|search|link|resource|course)\s+(?:for\s+)?(?P<subject>.+)$"],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE],
    },
    RuleDef {
        label: "InstallSetup",
        patterns: &[r"^(?:install|setup|set up|configure|download)\s+(?P<subject>.+)$"],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, PLATFORM_NOISE],
    },
    RuleDef {
        label: "ToolRecommendation",
        patterns: &[r"^(?:which|best|better|recommend|suggest)\s+(?P<subject>.+)$"],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE],
    },
    RuleDef {
        label: "SummarizeText",
        patterns: &[
            r"^(?:summarize|rewrite|paraphrase|shorten|simplify|translate)\s+(?P<subject>.+)$",
        ],
        shape: CaptureShape::Single,
        noise: &[SHARED_NOISE, FOR_ME_NOISE],
    },
    RuleDef {
        label: "DifferenceBetween",
        patterns: &[r"^(?P<a>.+?)\s+(?:vs\.?|versus)\s+(?P<b>.+)$"],
        shape: CaptureShape::Pair,
        noise: &[SHARED_NOISE],
    },
];

static RULES: Lazy<Vec<IntentRule>> = Lazy::new(|| RULE_DEFS.iter().map(compile_rule).collect());

fn compile_rule(def: &RuleDef) -> IntentRule {
    let patterns = def
        .patterns
        .iter()
        .map(|p| Regex::new(p).expect("intent pattern must compile"))
        .collect();
    let fragments: Vec<&str> = def.noise.iter().flat_map(|list| list.iter().copied()).collect();
    let noise = (!fragments.is_empty()).then(|| {
        Regex::new(&format!(r"\b(?:{})\b", fragments.join("|")))
            .expect("noise pattern must compile")
    });
    IntentRule {
        label: def.label,
        patterns,
        shape: def.shape,
        noise,
    }
}

/// The compiled rule table, in priority order.
pub fn rules() -> &'static [IntentRule] {
    &RULES
}

/// Extract an intent from a normalized prompt.
///
/// Returns `None` when no rule matches, or when the matching rule leaves an
/// empty subject once filler phrases are stripped.
pub fn extract_intent(prompt: &str) -> Option<IntentMatch> {
    let text = prompt.trim();
    for rule in rules() {
        for pattern in &rule.patterns {
            let Some(caps) = pattern.captures(text) else {
                continue;
            };
            let (subject, noise_removed) = build_subject(rule, &caps)?;
            let confidence = score_confidence(rule.label, &subject, pattern.as_str(), noise_removed);
            return Some(IntentMatch {
                intent: rule.label,
                subject,
                confidence,
                source: IntentSource::Rule,
                noise_removed,
            });
        }
    }
    None
}

fn build_subject(rule: &IntentRule, caps: &Captures<'_>) -> Option<(String, bool)> {
    let group = |name: &str| caps.name(name).map(|m| m.as_str()).unwrap_or("");
    match rule.shape {
        CaptureShape::Single => finalize(rule, group("subject")),
        CaptureShape::Pair => {
            let (a, noisy_a) = finalize(rule, group("a"))?;
            let (b, noisy_b) = finalize(rule, group("b"))?;
            Some((canonical_pair(&a, &b), noisy_a || noisy_b))
        }
        CaptureShape::WithContext { connector } => {
            let (mut subject, mut noisy) = finalize(rule, group("subject"))?;
            if let Some(context) = caps.name("context") {
                if let Some((context, noisy_context)) = finalize(rule, context.as_str()) {
                    subject.push_str(connector);
                    subject.push_str(&context);
                    noisy |= noisy_context;
                }
            }
            Some((subject, noisy))
        }
    }
}

/// Strip filler phrases and trailing sentence punctuation from a captured
/// phrase. `None` if nothing meaningful is left.
fn finalize(rule: &IntentRule, raw: &str) -> Option<(String, bool)> {
    let (stripped, noise_removed) = match &rule.noise {
        Some(noise) if noise.is_match(raw) => (noise.replace_all(raw, " ").into_owned(), true),
        _ => (raw.to_string(), false),
    };
    let collapsed = collapse_whitespace(&stripped);
    let trimmed = collapsed
        .trim_end_matches(|c: char| matches!(c, '?' | '!' | '.') || c.is_whitespace())
        .to_string();
    if trimmed.is_empty() {
        None
    } else {
        Some((trimmed, noise_removed))
    }
}

/// Order-insensitive join of two phrases: sorted, single-space separated.
pub fn canonical_pair(a: &str, b: &str) -> String {
    let a = collapse_whitespace(a);
    let b = collapse_whitespace(b);
    if a <= b {
        format!("{a} {b}")
    } else {
        format!("{b} {a}")
    }
}

pub fn base_confidence(intent: &str) -> f64 {
    BASE_CONFIDENCE
        .iter()
        .find(|(label, _)| *label == intent)
        .map(|(_, base)| *base)
        .unwrap_or(DEFAULT_BASE_CONFIDENCE)
}

pub fn subject_specificity(subject: &str) -> f64 {
    if VAGUE_SUBJECTS.contains(&subject) {
        return 0.4;
    }
    let words = subject.split_whitespace().count() as f64;
    (0.6 + 0.1 * words).min(1.0)
}

/// Longer patterns encode more structure and earn more trust.
pub fn pattern_strength(pattern_text: &str) -> f64 {
    match pattern_text.len() {
        n if n > 70 => 1.0,
        n if n > 40 => 0.9,
        _ => 0.8,
    }
}

pub fn score_confidence(intent: &str, subject: &str, pattern_text: &str, noise_removed: bool) -> f64 {
    let mut score = base_confidence(intent);
    score *= subject_specificity(subject);
    score *= pattern_strength(pattern_text);
    if noise_removed {
        score -= NOISE_PENALTY;
    }
    (score.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

/// Cheap pre-check deciding whether a prompt is worth running through the
/// rule table. Long prompts, prompts with decimal digits, and multi-line prompts are
/// skipped to bound regex cost and avoid false matches on code or numeric
/// queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntentGuard {
    pub max_prompt_chars: usize,
}

impl Default for IntentGuard {
    fn default() -> Self {
        Self {
            max_prompt_chars: DEFAULT_MAX_INTENT_PROMPT_CHARS,
        }
    }
}

impl IntentGuard {
    pub fn new(max_prompt_chars: usize) -> Self {
        Self { max_prompt_chars }
    }

    pub fn allows(&self, prompt: &str) -> bool {
        if prompt.chars().count() > self.max_prompt_chars {
            return false;
        }
        if DIGIT.is_match(prompt) {
            return false;
        }
        !prompt.contains('\n')
    }
}

/// [`IntentGuard::allows`] with the default 80-character limit.
pub fn should_try_intent(prompt: &str) -> bool {
    IntentGuard::default().allows(prompt)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(prompt: &str) -> Option<String> {
        extract_intent(prompt).map(|m| m.key())
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_rule_table_compiles_in_order() {
        let labels: Vec<&str> = rules().iter().map(|r| r.label).collect();
        assert_eq!(labels.len(), RULE_DEFS.len());
        let pair = labels.iter().position(|l| *l == "DifferenceBetween").unwrap();
        let catch_all = labels.iter().position(|l| *l == "CompareOptions").unwrap();
        assert!(pair < catch_all);
    }

    #[test]
    fn test_define_variants_share_key() {
        assert_eq!(key("what is recursion").as_deref(), Some("DefineConcept:recursion"));
        assert_eq!(key("define recursion"), key("what is recursion"));
        assert_eq!(key("what's recursion"), key("what is recursion"));
        assert_eq!(key("what is a stack"), key("define stack"));
    }

    #[test]
    fn test_trailing_punctuation_ignored_in_subject() {
        assert_eq!(key("what is ai?").as_deref(), Some("DefineConcept:ai"));
    }

    #[test]
    fn test_symmetric_pair_canonicalized() {
        let expected = Some("DifferenceBetween:tcp udp".to_string());
        assert_eq!(key("difference between tcp and udp"), expected);
        assert_eq!(key("difference between udp and tcp"), expected);
        assert_eq!(key("compare udp and tcp"), expected);
        assert_eq!(key("tcp vs udp"), expected);
        assert_eq!(key("udp versus tcp"), expected);
        assert_eq!(key("what is the difference between tcp and udp"), expected);
    }

    #[test]
    fn test_versus_form_yields_to_verb_led_rules() {
        assert_eq!(
            key("write a story about cats vs dogs").as_deref(),
            Some("CreativeGeneration:story about cats vs dogs")
        );
        assert_eq!(
            key("how to choose tcp vs udp").as_deref(),
            Some("HowToGuide:choose tcp vs udp")
        );
        assert_eq!(key("install docker vs podman").as_deref(), Some("InstallSetup:docker vs podman"));
    }

    #[test]
    fn test_question_led_versus_drops_lead_words() {
        let expected = Some("DifferenceBetween:tcp udp".to_string());
        assert_eq!(key("what is tcp vs udp"), expected);
        assert_eq!(key("explain tcp vs udp"), expected);
        assert_eq!(key("what's the udp versus tcp"), expected);
        assert_eq!(key("tcp vs udp"), expected);
    }

    #[test]
    fn test_bare_versus_rule_runs_last() {
        let last = rules().last().unwrap();
        assert_eq!(last.label, "DifferenceBetween");
        assert_eq!(last.patterns.len(), 1);
        assert!(rules()[0].patterns.iter().all(|p| !p.as_str().starts_with("^(?P<a>")));
    }

    #[test]
    fn test_compare_catch_all_after_pair_rule() {
        assert_eq!(key("compare databases").as_deref(), Some("CompareOptions:databases"));
    }

    #[test]
    fn test_multiword_pair_sides_sorted() {
        assert_eq!(
            key("difference between recursion and iteration").as_deref(),
            Some("DifferenceBetween:iteration recursion")
        );
    }

    #[test]
    fn test_noise_stripped_and_flagged() {
        let m = extract_intent("explain recursion in simple terms").unwrap();
        assert_eq!(m.key(), "ExplainConcept:recursion");
        assert!(m.noise_removed);

        let m = extract_intent("how to install docker on ubuntu").unwrap();
        assert_eq!(m.key(), "HowToGuide:install docker");
        assert!(m.noise_removed);

        let clean = extract_intent("explain recursion").unwrap();
        assert!(!clean.noise_removed);
    }

    #[test]
    fn test_noise_penalty_applied() {
        let clean = extract_intent("explain recursion").unwrap();
        let noisy = extract_intent("explain recursion with examples").unwrap();
        assert_eq!(clean.key(), noisy.key());
        assert!(approx(clean.confidence - noisy.confidence, 0.05));
    }

    #[test]
    fn test_platform_noise_only_for_platform_intents() {
        // "on linux" is meaningful for a definition.
        assert_eq!(
            key("what is systemd on linux").as_deref(),
            Some("DefineConcept:systemd on linux")
        );
        assert_eq!(key("install docker on linux").as_deref(), Some("InstallSetup:docker"));
    }

    #[test]
    fn test_subject_only_noise_yields_none() {
        assert!(extract_intent("explain please").is_none());
    }

    #[test]
    fn test_debug_error_context_joined_with_space() {
        assert_eq!(key("traceback in django").as_deref(), Some("DebugError:traceback django"));
        assert_eq!(key("segfault").as_deref(), Some("DebugError:segfault"));
    }

    #[test]
    fn test_creative_context_joined_with_about() {
        assert_eq!(
            key("write a poem about the sea").as_deref(),
            Some("CreativeGeneration:poem about the sea")
        );
        assert_eq!(key("create story").as_deref(), Some("CreativeGeneration:story"));
    }

    #[test]
    fn test_write_code_after_creative() {
        assert_eq!(key("implement quicksort").as_deref(), Some("WriteCode:quicksort"));
        assert_eq!(key("write a parser").as_deref(), Some("WriteCode:a parser"));
    }

    #[test]
    fn test_troubleshoot_both_directions() {
        assert_eq!(key("nginx not working").as_deref(), Some("TroubleshootIssue:nginx"));
        assert_eq!(key("problem with nginx").as_deref(), Some("TroubleshootIssue:with nginx"));
    }

    #[test]
    fn test_remaining_rules() {
        assert_eq!(key("how to setup nginx").as_deref(), Some("HowToGuide:setup nginx"));
        assert_eq!(key("steps to setup nginx"), key("how to setup nginx"));
        assert_eq!(key("find for rust books").as_deref(), Some("FindResource:rust books"));
        assert_eq!(key("setup docker"), key("install docker"));
        assert_eq!(
            key("best database for analytics"),
            key("recommend database for analytics")
        );
        assert_eq!(key("summarize kubernetes").as_deref(), Some("SummarizeText:kubernetes"));
    }

    #[test]
    fn test_no_match() {
        assert!(extract_intent("tell me a joke").is_none());
        assert!(extract_intent("hello").is_none());
        assert!(extract_intent("").is_none());
    }

    #[test]
    fn test_extraction_deterministic() {
        let a = extract_intent("define load balancing").unwrap();
        let b = extract_intent("define load balancing").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.source, IntentSource::Rule);
    }

    #[test]
    fn test_confidence_examples() {
        // 0.9 base * 0.7 (one word) * 1.0 (long pattern)
        assert!(approx(extract_intent("what is recursion").unwrap().confidence, 0.63));
        // 0.9 * 0.8 (two words) * 1.0
        assert!(approx(
            extract_intent("difference between tcp and udp").unwrap().confidence,
            0.72
        ));
        // 0.9 * 0.8 * 0.9 = 0.648
        assert!(approx(extract_intent("compare udp and tcp").unwrap().confidence, 0.65));
        // 0.85 * 0.7 * 0.8 (pattern of exactly 40 chars)
        assert!(approx(extract_intent("explain recursion").unwrap().confidence, 0.48));
        // default base 0.7 * 0.7 * 0.8
        assert!(approx(extract_intent("compare databases").unwrap().confidence, 0.39));
    }

    #[test]
    fn test_score_confidence_formula() {
        assert!(approx(score_confidence("DefineConcept", "it", &"x".repeat(71), false), 0.36));
        assert!(approx(
            score_confidence("DefineConcept", "recursion", &"x".repeat(71), true),
            0.58
        ));
        assert!(approx(score_confidence("Unknown", "a b c d e", &"x".repeat(10), false), 0.56));
        assert!(approx(score_confidence("Unknown", "x", "", true), 0.34));
    }

    #[test]
    fn test_subject_specificity() {
        for vague in VAGUE_SUBJECTS {
            assert!(approx(subject_specificity(vague), 0.4));
        }
        assert!(approx(subject_specificity("recursion"), 0.7));
        assert!(approx(subject_specificity("deploy a python app"), 1.0));
        assert!(approx(subject_specificity("one two three four five six"), 1.0));
    }

    #[test]
    fn test_pattern_strength_thresholds() {
        assert!(approx(pattern_strength(&"x".repeat(71)), 1.0));
        assert!(approx(pattern_strength(&"x".repeat(70)), 0.9));
        assert!(approx(pattern_strength(&"x".repeat(41)), 0.9));
        assert!(approx(pattern_strength(&"x".repeat(40)), 0.8));
    }

    #[test]
    fn test_base_confidence_default() {
        assert!(approx(base_confidence("DefineConcept"), 0.9));
        assert!(approx(base_confidence("CompareOptions"), 0.7));
    }

    #[test]
    fn test_guard_rejects_long_numeric_multiline() {
        assert!(should_try_intent("what is recursion"));
        assert!(should_try_intent(&"a".repeat(80)));
        assert!(!should_try_intent(&"a".repeat(81)));
        assert!(!should_try_intent("what is http2"));
        assert!(!should_try_intent("line one\nline two"));
        assert!(IntentGuard::new(200).allows(&"a".repeat(120)));
    }

    #[test]
    fn test_guard_only_rejects_decimal_digits() {
        assert!(!should_try_intent("what is ipv\u{0666}"));
        assert!(should_try_intent("what is ½"));
        assert!(should_try_intent("what is the ⅷ numeral"));
    }

    #[test]
    fn test_guard_counts_characters_not_bytes() {
        let prompt = "é".repeat(80);
        assert!(prompt.len() > 80);
        assert!(should_try_intent(&prompt));
    }
}
