//! Fixed-shape genome driving one individual's poem generator.

use serde::{Deserialize, Serialize};

use crate::numeric::round3;
use crate::rng::SeededRng;

/// Inclusive bounds for the `lines` gene.
pub const LINES_RANGE: (u32, u32) = (4, 16);
/// Inclusive bounds for the `line_len` gene.
pub const LINE_LEN_RANGE: (u32, u32) = (8, 24);
/// Upper bound for `assertiveness + afterglow`.
pub const ASSERTIVE_AFTERGLOW_CAP: f64 = 1.2;

const LINES_STEP: i64 = 2;
const LINE_LEN_STEP: i64 = 3;
const REPETITION_SCALE: f64 = 0.8;
const IMMUNITY_SCALE: f64 = 0.7;

/// Mutation knobs taken from the evolution config.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationSettings {
    pub rate: f64,
    pub strength: f64,
}

/// Eight-gene parameter vector. Every constructor returns a normalized genome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Genome {
    pub lines: u32,
    pub line_len: u32,
    pub assertiveness: f64,
    pub afterglow: f64,
    pub concreteness: f64,
    pub repetition: f64,
    pub nutrient_mix: f64,
    pub immunity: f64,
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            lines: 8,
            line_len: 14,
            assertiveness: 0.5,
            afterglow: 0.5,
            concreteness: 0.5,
            repetition: 0.2,
            nutrient_mix: 0.3,
            immunity: 0.3,
        }
    }
}

impl Genome {
    /// Draws every gene uniformly within its range.
    pub fn random(rng: &mut SeededRng) -> Self {
        let lines = rng.int(i64::from(LINES_RANGE.0), i64::from(LINES_RANGE.1));
        let line_len = rng.int(i64::from(LINE_LEN_RANGE.0), i64::from(LINE_LEN_RANGE.1));
        let mut unit = || round3(rng.next_f64());
        let draft = GenomeDraft {
            lines,
            line_len,
            assertiveness: unit(),
            afterglow: unit(),
            concreteness: unit(),
            repetition: unit(),
            nutrient_mix: unit(),
            immunity: unit(),
        };
        draft.normalize()
    }

    /// Picks each gene from `self` or `other` with equal probability.
    #[must_use]
    pub fn crossover(&self, other: &Self, rng: &mut SeededRng) -> Self {
        let mut left_wins = || rng.chance(0.5);
        let lines = if left_wins() { self.lines } else { other.lines };
        let line_len = if left_wins() { self.line_len } else { other.line_len };
        let mut pick = |a: f64, b: f64| if left_wins() { a } else { b };
        let draft = GenomeDraft {
            lines: i64::from(lines),
            line_len: i64::from(line_len),
            assertiveness: pick(self.assertiveness, other.assertiveness),
            afterglow: pick(self.afterglow, other.afterglow),
            concreteness: pick(self.concreteness, other.concreteness),
            repetition: pick(self.repetition, other.repetition),
            nutrient_mix: pick(self.nutrient_mix, other.nutrient_mix),
            immunity: pick(self.immunity, other.immunity),
        };
        draft.normalize()
    }

    /// Perturbs each gene independently with probability `settings.rate`.
    #[must_use]
    pub fn mutate(&self, settings: MutationSettings, rng: &mut SeededRng) -> Self {
        let MutationSettings { rate, strength } = settings;
        let mut draft = GenomeDraft::from(*self);

        if rng.chance(rate) {
            draft.lines += rng.int(-LINES_STEP, LINES_STEP);
        }
        if rng.chance(rate) {
            draft.line_len += rng.int(-LINE_LEN_STEP, LINE_LEN_STEP);
        }
        if rng.chance(rate) {
            draft.assertiveness += rng.signed(strength);
        }
        if rng.chance(rate) {
            draft.afterglow += rng.signed(strength);
        }
        if rng.chance(rate) {
            draft.concreteness += rng.signed(strength);
        }
        if rng.chance(rate) {
            draft.repetition += rng.signed(strength * REPETITION_SCALE);
        }
        if rng.chance(rate) {
            draft.nutrient_mix += rng.signed(strength);
        }
        if rng.chance(rate) {
            draft.immunity += rng.signed(strength * IMMUNITY_SCALE);
        }

        draft.normalize()
    }

    /// Re-applies clamping, the assertiveness/afterglow cap and rounding. Idempotent.
    #[must_use]
    pub fn normalize(&self) -> Self {
        GenomeDraft::from(*self).normalize()
    }

    /// Returns `true` when every gene is in range and the cap holds.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        let unit = |value: f64| (0.0..=1.0).contains(&value);
        (LINES_RANGE.0..=LINES_RANGE.1).contains(&self.lines)
            && (LINE_LEN_RANGE.0..=LINE_LEN_RANGE.1).contains(&self.line_len)
            && unit(self.assertiveness)
            && unit(self.afterglow)
            && unit(self.concreteness)
            && unit(self.repetition)
            && unit(self.nutrient_mix)
            && unit(self.immunity)
            && self.assertiveness + self.afterglow <= ASSERTIVE_AFTERGLOW_CAP + 1e-9
    }
}

/// Unchecked gene values, e.g. mid-mutation or read from an untrusted source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenomeDraft {
    pub lines: i64,
    pub line_len: i64,
    pub assertiveness: f64,
    pub afterglow: f64,
    pub concreteness: f64,
    pub repetition: f64,
    pub nutrient_mix: f64,
    pub immunity: f64,
}

impl From<Genome> for GenomeDraft {
    fn from(genome: Genome) -> Self {
        Self {
            lines: i64::from(genome.lines),
            line_len: i64::from(genome.line_len),
            assertiveness: genome.assertiveness,
            afterglow: genome.afterglow,
            concreteness: genome.concreteness,
            repetition: genome.repetition,
            nutrient_mix: genome.nutrient_mix,
            immunity: genome.immunity,
        }
    }
}

impl GenomeDraft {
    /// Clamps every gene, scales down an over-cap assertiveness/afterglow pair, rounds to 3dp.
    #[must_use]
    pub fn normalize(&self) -> Genome {
        let mut assertiveness = clamp_unit(self.assertiveness);
        let mut afterglow = clamp_unit(self.afterglow);
        let sum = assertiveness + afterglow;
        if sum > ASSERTIVE_AFTERGLOW_CAP {
            let ratio = ASSERTIVE_AFTERGLOW_CAP / sum;
            assertiveness = round3(assertiveness * ratio);
            afterglow = round3(afterglow * ratio);
        }

        Genome {
            lines: clamp_gene(self.lines, LINES_RANGE),
            line_len: clamp_gene(self.line_len, LINE_LEN_RANGE),
            assertiveness: round3(assertiveness),
            afterglow: round3(afterglow),
            concreteness: round3(clamp_unit(self.concreteness)),
            repetition: round3(clamp_unit(self.repetition)),
            nutrient_mix: round3(clamp_unit(self.nutrient_mix)),
            immunity: round3(clamp_unit(self.immunity)),
        }
    }
}

fn clamp_gene(value: i64, (min, max): (u32, u32)) -> u32 {
    value.clamp(i64::from(min), i64::from(max)) as u32
}

fn clamp_unit(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        0.0
    }
}
