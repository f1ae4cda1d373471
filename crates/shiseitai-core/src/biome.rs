//! Nutrient presets, the toxic word pool and word-list parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::rng::SeededRng;
use crate::selection::sample_without_replacement;

/// Default number of toxic words drawn for a run.
pub const DEFAULT_TOXIC_WORD_COUNT: usize = 2;

/// Words that kill any poem containing them when chosen as toxic.
pub const TOXIC_WORD_POOL: [&str; 12] = [
    "腐食", "断線", "失効", "隔離", "停滞", "歪み", "飢餓", "麻痺", "崩落", "欠損", "過熱", "漏洩",
];

/// Named nutrient preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Biome {
    Garden,
    Work,
    Cosmic,
    Body,
    Harbor,
    Ritual,
}

impl Biome {
    pub const ALL: [Self; 6] = [
        Self::Garden,
        Self::Work,
        Self::Cosmic,
        Self::Body,
        Self::Harbor,
        Self::Ritual,
    ];

    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Garden => "garden",
            Self::Work => "work",
            Self::Cosmic => "cosmic",
            Self::Body => "body",
            Self::Harbor => "harbor",
            Self::Ritual => "ritual",
        }
    }

    /// The preset's ten nutrient words.
    #[must_use]
    pub const fn nutrients(self) -> &'static [&'static str] {
        match self {
            Self::Garden => &[
                "ルッコラ", "フェンネル", "瓶", "水", "風", "土", "苔", "種", "葉脈", "露",
            ],
            Self::Work => &[
                "注意", "許諾", "赤字", "待機", "期限", "議事録", "見積", "差戻し", "承認", "進捗",
            ],
            Self::Cosmic => &[
                "時間", "真空", "光", "境界", "余白", "重力", "軌道", "星図", "地平線", "夜明け",
            ],
            Self::Body => &["脈", "骨", "皮膚", "熱", "息", "血", "喉", "耳", "肩甲", "神経"],
            Self::Harbor => &[
                "港", "灯", "舟", "潮", "錨", "防波堤", "霧笛", "桟橋", "帆", "船影",
            ],
            Self::Ritual => &[
                "祈り", "盃", "灰", "鐘", "布", "焚火", "祝詞", "輪", "印", "沈香",
            ],
        }
    }

    #[must_use]
    pub fn nutrient_list(self) -> Vec<String> {
        self.nutrients().iter().map(|word| (*word).to_string()).collect()
    }

    /// Preset sharing the most words with `nutrients`; the earliest wins ties,
    /// garden when nothing overlaps.
    #[must_use]
    pub fn infer(nutrients: &[String]) -> Self {
        let mut best = (Self::Garden, 0_usize);
        for biome in Self::ALL {
            let overlap = biome
                .nutrients()
                .iter()
                .filter(|word| nutrients.iter().any(|nutrient| nutrient == *word))
                .count();
            if overlap > best.1 {
                best = (biome, overlap);
            }
        }
        best.0
    }
}

impl fmt::Display for Biome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown biome `{0}` (expected one of garden, work, cosmic, body, harbor, ritual)")]
pub struct UnknownBiome(pub String);

impl FromStr for Biome {
    type Err = UnknownBiome;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim();
        Self::ALL
            .into_iter()
            .find(|biome| biome.key().eq_ignore_ascii_case(key))
            .ok_or_else(|| UnknownBiome(value.to_string()))
    }
}

/// Draws up to `count` distinct toxic words.
pub fn draw_toxic_words(count: usize, rng: &mut SeededRng) -> Vec<String> {
    sample_without_replacement(&TOXIC_WORD_POOL, count, rng)
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Splits free-form input on commas, line breaks, `、` and `，`.
#[must_use]
pub fn parse_word_list(raw: &str) -> Vec<String> {
    raw.split(|c: char| matches!(c, ',' | '\n' | '\r' | '、' | '，'))
        .map(str::trim)
        .filter(|word| !word.is_empty())
        .map(str::to_string)
        .collect()
}
