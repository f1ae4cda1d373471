//! Procedural poem generator and text statistics.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use unicode_normalization::UnicodeNormalization;

use crate::config::PoemStyleConfig;
use crate::genome::Genome;
use crate::numeric::{mean, round3};
use crate::rng::SeededRng;

pub const CONCRETE_BASE: &[&str] = &[
    "石", "扉", "硝子", "糸", "川", "塩", "手", "蝶番", "窓", "種", "雨", "縄",
];

pub const ABSTRACT_BASE: &[&str] = &[
    "記憶", "余白", "信号", "許し", "沈黙", "不在", "反響", "漂い", "意図", "影", "間隔", "息",
];

pub const ASSERTIVE_ENDINGS: &[&str] = &[
    "だ",
    "と決める",
    "である",
    "は動かない",
    "を選ぶ",
    "を掲げる",
    "と断つ",
    "と名づける",
];

pub const AFTERGLOW_ENDINGS: &[&str] = &[
    "まだ消えない",
    "薄れてゆく",
    "しばらく残る",
    "閉じきらない",
    "ほどけていく",
    "遠くで揺れる",
    "余熱を抱える",
    "名残になる",
];

pub const PARTICLE_TOKENS: &[&str] = &["の", "に", "へ", "で", "と"];
pub const CONJUNCTION_TOKENS: &[&str] = &["ただ", "そして"];

const MAX_CONJUNCTIONS_PER_POEM: usize = 1;
const LINE_REPEAT_WEIGHT: f64 = 0.55;
const CARRY_REPEAT_WEIGHT: f64 = 0.25;

/// Aggregate statistics of a generated text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub line_count: usize,
    /// Characters excluding line breaks.
    pub char_count: usize,
    pub average_line_length: f64,
    pub max_line_length: usize,
    pub token_count: usize,
    pub unique_token_ratio: f64,
    pub longest_repeat_run: usize,
}

/// Nutrient words the text used (first-use order) plus its statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoemUsage {
    pub used_nutrients: Vec<String>,
    pub stats: UsageStats,
}

/// Generator output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Poem {
    pub text: String,
    pub usage: PoemUsage,
}

/// Per-call vocabulary: base pools extended with the supplied nutrients.
struct Vocabulary<'a> {
    nutrients: Vec<&'a str>,
    nutrient_keys: HashMap<String, &'a str>,
    concrete: Vec<&'a str>,
    abstract_pool: Vec<&'a str>,
}

impl<'a> Vocabulary<'a> {
    fn new(nutrients: &'a [String]) -> Self {
        let nutrients: Vec<&'a str> = nutrients
            .iter()
            .map(|word| word.trim())
            .filter(|word| !word.is_empty())
            .collect();
        let mut nutrient_keys = HashMap::with_capacity(nutrients.len());
        for &word in &nutrients {
            nutrient_keys.insert(token_key(word), word);
        }
        Self {
            concrete: unique_words(CONCRETE_BASE, &nutrients),
            abstract_pool: unique_words(ABSTRACT_BASE, &nutrients),
            nutrients,
            nutrient_keys,
        }
    }

    fn nutrient_for(&self, token: &str) -> Option<&'a str> {
        self.nutrient_keys.get(&token_key(token)).copied()
    }
}

fn unique_words<'a>(base: &[&'a str], extra: &[&'a str]) -> Vec<&'a str> {
    let mut seen = HashSet::new();
    base.iter()
        .copied()
        .chain(extra.iter().copied())
        .filter(|word| seen.insert(*word))
        .collect()
}

/// Drives the generator for one genome. Draw order is fixed; see the module tests.
pub fn generate_poem(
    genome: &Genome,
    nutrients: &[String],
    style: &PoemStyleConfig,
    rng: &mut SeededRng,
) -> Poem {
    let vocabulary = Vocabulary::new(nutrients);
    let mut lines: Vec<String> = Vec::with_capacity(genome.lines as usize);
    let mut used_nutrients: Vec<&str> = Vec::new();
    let mut conjunctions_used = 0;
    let mut carried_token: Option<&str> = None;

    for line_index in 0..genome.lines as usize {
        let pool = if rng.chance(genome.concreteness) {
            &vocabulary.concrete
        } else {
            &vocabulary.abstract_pool
        };
        let base_tokens = build_line_tokens(genome, &vocabulary, pool, carried_token, rng);
        let mut tokens = insert_particles(&base_tokens, style.particle_rate, rng);
        let allow_conjunction = conjunctions_used < MAX_CONJUNCTIONS_PER_POEM && line_index > 0;
        if allow_conjunction && rng.chance(style.conjunction_rate) {
            if let Some(&conjunction) = rng.pick(CONJUNCTION_TOKENS) {
                tokens.insert(0, conjunction);
                conjunctions_used += 1;
            }
        }

        if let Some(&last) = base_tokens.last() {
            carried_token = Some(last);
        }
        for token in &tokens {
            if let Some(word) = vocabulary.nutrient_for(token) {
                if !used_nutrients.contains(&word) {
                    used_nutrients.push(word);
                }
            }
        }
        lines.push(tokens.join(" "));
    }

    if used_nutrients.is_empty() && !lines.is_empty() {
        if let Some(&forced) = rng.pick(&vocabulary.nutrients) {
            let target = rng.index(lines.len());
            lines[target] = inject_token(&lines[target], forced, rng);
            used_nutrients.push(forced);
        }
    }

    if let Some(last) = lines.last_mut() {
        let endings = if genome.assertiveness >= genome.afterglow {
            ASSERTIVE_ENDINGS
        } else {
            AFTERGLOW_ENDINGS
        };
        if let Some(ending) = rng.pick(endings) {
            *last = format!("{last} {ending}").trim().to_string();
        }
    }

    let text = lines.join("\n");
    let stats = poem_stats(&text);
    Poem {
        text,
        usage: PoemUsage {
            used_nutrients: used_nutrients.into_iter().map(str::to_string).collect(),
            stats,
        },
    }
}

fn build_line_tokens<'a>(
    genome: &Genome,
    vocabulary: &Vocabulary<'a>,
    pool: &[&'a str],
    carried_token: Option<&'a str>,
    rng: &mut SeededRng,
) -> Vec<&'a str> {
    let target_len = genome.line_len as usize;
    let max_tokens = (genome.line_len.div_ceil(3) as usize).max(3);
    let mut tokens: Vec<&'a str> = Vec::with_capacity(max_tokens);
    let mut joined_len = 0usize;

    while joined_len < target_len && tokens.len() < max_tokens {
        let mut token = rng.pick(pool).copied().unwrap_or_default();
        if !vocabulary.nutrients.is_empty() && rng.chance(genome.nutrient_mix) {
            token = rng.pick(&vocabulary.nutrients).copied().unwrap_or(token);
        }

        let line_repeat = genome.repetition * LINE_REPEAT_WEIGHT;
        let carry_repeat = genome.repetition * CARRY_REPEAT_WEIGHT;
        match (tokens.last().copied(), carried_token) {
            (Some(previous), carried) => {
                if rng.chance(line_repeat) {
                    token = previous;
                } else if let Some(carried) = carried {
                    if rng.chance(carry_repeat) {
                        token = carried;
                    }
                }
            }
            (None, Some(carried)) => {
                if rng.chance(carry_repeat) {
                    token = carried;
                }
            }
            (None, None) => {}
        }

        if !tokens.is_empty() {
            joined_len += 1;
        }
        joined_len += token.chars().count();
        tokens.push(token);
    }

    if tokens.is_empty() {
        tokens.push(rng.pick(pool).copied().unwrap_or_default());
    }
    tokens
}

fn insert_particles<'a>(
    tokens: &[&'a str],
    particle_rate: f64,
    rng: &mut SeededRng,
) -> Vec<&'a str> {
    if tokens.len() <= 1 || particle_rate <= 0.0 {
        return tokens.to_vec();
    }
    let mut output = Vec::with_capacity(tokens.len() * 2);
    output.push(tokens[0]);
    for &token in &tokens[1..] {
        if rng.chance(particle_rate) {
            if let Some(&particle) = rng.pick(PARTICLE_TOKENS) {
                output.push(particle);
            }
        }
        output.push(token);
    }
    output
}

/// Inserts `token` at a random segment boundary of `line` (appending is allowed).
fn inject_token(line: &str, token: &str, rng: &mut SeededRng) -> String {
    let mut segments: Vec<&str> = line.split(' ').filter(|segment| !segment.is_empty()).collect();
    let index = if segments.is_empty() {
        0
    } else {
        rng.int(0, segments.len() as i64) as usize
    };
    segments.insert(index.min(segments.len()), token);
    segments.join(" ")
}

fn edge_trim_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[\s\p{P}\p{S}]+|[\s\p{P}\p{S}]+$").expect("valid edge-trim pattern")
    })
}

/// Comparison key: NFKC width folding, lower case, leading/trailing punctuation removed.
#[must_use]
pub fn token_key(token: &str) -> String {
    let folded: String = token.nfkc().collect::<String>().to_lowercase();
    edge_trim_pattern().replace_all(&folded, "").into_owned()
}

/// Computes line, character and token statistics for `text`.
#[must_use]
pub fn poem_stats(text: &str) -> UsageStats {
    let line_lengths: Vec<usize> = text
        .split('\n')
        .filter(|line| !line.is_empty())
        .map(|line| line.chars().count())
        .collect();
    let keys: Vec<String> = text.split_whitespace().map(token_key).collect();
    let unique_token_ratio = if keys.is_empty() {
        1.0
    } else {
        let unique: HashSet<&str> = keys.iter().map(String::as_str).collect();
        round3(unique.len() as f64 / keys.len() as f64)
    };
    let lengths_f64: Vec<f64> = line_lengths.iter().map(|&len| len as f64).collect();

    UsageStats {
        line_count: line_lengths.len(),
        char_count: text.chars().filter(|&ch| ch != '\n').count(),
        average_line_length: round3(mean(&lengths_f64)),
        max_line_length: line_lengths.iter().copied().max().unwrap_or(0),
        token_count: keys.len(),
        unique_token_ratio,
        longest_repeat_run: longest_repeat_run(&keys),
    }
}

fn longest_repeat_run(keys: &[String]) -> usize {
    if keys.is_empty() {
        return 0;
    }
    let mut longest = 1;
    let mut current = 1;
    for pair in keys.windows(2) {
        if pair[0] == pair[1] {
            current += 1;
            longest = longest.max(current);
        } else {
            current = 1;
        }
    }
    longest
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words(list: &[&str]) -> Vec<String> {
        list.iter().map(|word| word.to_string()).collect()
    }

    fn style() -> PoemStyleConfig {
        PoemStyleConfig::default()
    }

    #[test]
    fn generates_requested_line_count_with_ending() {
        let genome = Genome {
            lines: 6,
            line_len: 12,
            assertiveness: 0.9,
            afterglow: 0.1,
            ..Genome::default()
        };
        let mut rng = SeededRng::new(3);
        let poem = generate_poem(&genome, &words(&["苔", "露"]), &style(), &mut rng);
        assert_eq!(poem.text.lines().count(), 6);
        let last = poem.text.lines().last().expect("last line");
        assert!(ASSERTIVE_ENDINGS.iter().any(|ending| last.ends_with(ending)));
        assert_eq!(poem.usage.stats.line_count, 6);
    }

    #[test]
    fn afterglow_genomes_end_softly() {
        let genome = Genome {
            assertiveness: 0.1,
            afterglow: 0.8,
            ..Genome::default()
        };
        let mut rng = SeededRng::new(4);
        let poem = generate_poem(&genome, &words(&["港"]), &style(), &mut rng);
        let last = poem.text.lines().last().expect("last line");
        assert!(AFTERGLOW_ENDINGS.iter().any(|ending| last.ends_with(ending)));
    }

    #[test]
    fn nutrient_is_forced_when_never_drawn() {
        let genome = Genome {
            nutrient_mix: 0.0,
            concreteness: 1.0,
            ..Genome::default()
        };
        for seed in 0..64 {
            let mut rng = SeededRng::new(seed);
            let poem = generate_poem(&genome, &words(&["ルッコラ"]), &style(), &mut rng);
            assert!(poem.text.contains("ルッコラ"), "seed {seed}: {}", poem.text);
            assert_eq!(poem.usage.used_nutrients, vec!["ルッコラ".to_string()]);
        }
    }

    #[test]
    fn without_nutrients_only_base_vocabulary_is_used() {
        let genome = Genome::default();
        let mut rng = SeededRng::new(12);
        let poem = generate_poem(&genome, &[], &style(), &mut rng);
        assert!(poem.usage.used_nutrients.is_empty());
        assert!(!poem.text.is_empty());
    }

    #[test]
    fn at_most_one_conjunction_and_never_on_first_line() {
        let genome = Genome {
            lines: 16,
            ..Genome::default()
        };
        let eager = PoemStyleConfig {
            particle_rate: 0.0,
            conjunction_rate: 1.0,
        };
        let mut rng = SeededRng::new(21);
        let poem = generate_poem(&genome, &words(&["灯"]), &eager, &mut rng);
        let starts: Vec<bool> = poem
            .text
            .lines()
            .map(|line| {
                let first = line.split(' ').next().unwrap_or_default();
                CONJUNCTION_TOKENS.contains(&first)
            })
            .collect();
        assert!(!starts[0]);
        assert_eq!(starts.iter().filter(|flag| **flag).count(), 1);
        assert!(starts[1]);
    }

    #[test]
    fn full_repetition_collapses_lines_onto_one_token() {
        let genome = Genome {
            lines: 4,
            line_len: 24,
            repetition: 1.0,
            nutrient_mix: 0.0,
            ..Genome::default()
        };
        let quiet = PoemStyleConfig {
            particle_rate: 0.0,
            conjunction_rate: 0.0,
        };
        let mut rng = SeededRng::new(30);
        let poem = generate_poem(&genome, &words(&["舟"]), &quiet, &mut rng);
        assert!(poem.usage.stats.longest_repeat_run >= 4);
        assert!(poem.usage.stats.unique_token_ratio < 0.45);
    }

    #[test]
    fn stats_fold_width_case_and_punctuation() {
        let stats = poem_stats("ＡＢＣ abc, 「abc」\n石 石");
        assert_eq!(stats.line_count, 2);
        assert_eq!(stats.token_count, 5);
        assert_eq!(stats.unique_token_ratio, 0.4);
        assert_eq!(stats.longest_repeat_run, 3);
        assert_eq!(stats.max_line_length, 14);
        assert_eq!(stats.char_count, 17);
        assert_eq!(stats.average_line_length, 8.5);
    }

    #[test]
    fn empty_text_has_neutral_stats() {
        let stats = poem_stats("");
        assert_eq!(stats.line_count, 0);
        assert_eq!(stats.token_count, 0);
        assert_eq!(stats.unique_token_ratio, 1.0);
        assert_eq!(stats.longest_repeat_run, 0);
        assert_eq!(stats.average_line_length, 0.0);
    }

    #[test]
    fn injected_token_can_land_anywhere() {
        let mut positions = HashSet::new();
        for seed in 0..200 {
            let mut rng = SeededRng::new(seed);
            let line = inject_token("a b", "x", &mut rng);
            positions.insert(line);
        }
        assert!(positions.contains("x a b"));
        assert!(positions.contains("a x b"));
        assert!(positions.contains("a b x"));
    }
}
