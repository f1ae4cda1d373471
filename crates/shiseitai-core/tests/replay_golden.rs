//! Pinned record stream for a small seeded run. Any change to the order in
//! which the random stream is consumed shows up here first.

use shiseitai_core::{DiagnosisReason, SimulationOutput, SimulationRequest, run_simulation};

use shiseitai_core::DiagnosisReason::{
    OverRepetition as Over, RepetitionSeizure as Seizure, SameWordSpam as Spam,
    SeasonalHeadwind as Headwind, SeasonalTailwind as Tailwind,
};

struct Expected {
    id: &'static str,
    score: f64,
    energy_after: f64,
    reasons: &'static [DiagnosisReason],
    parents: [&'static str; 2],
}

const fn rec(
    id: &'static str,
    score: f64,
    energy_after: f64,
    reasons: &'static [DiagnosisReason],
    parents: [&'static str; 2],
) -> Expected {
    Expected {
        id,
        score,
        energy_after,
        reasons,
        parents,
    }
}

const NO_PARENTS: [&str; 2] = ["", ""];

const GENERATION_1: &[Expected] = &[
    rec("g1-i4", 70.28, 108.615, &[Tailwind, Over], NO_PARENTS),
    rec("g1-i1", 57.28, 104.195, &[Tailwind, Seizure], NO_PARENTS),
    rec("g1-i2", 47.28, 100.795, &[Tailwind, Seizure, Spam], NO_PARENTS),
    rec("g1-i3", 47.28, 100.795, &[Tailwind, Seizure, Spam], NO_PARENTS),
    rec("g1-i5", 47.28, 100.795, &[Tailwind, Seizure, Spam], NO_PARENTS),
    rec("g1-i6", 47.28, 100.795, &[Tailwind, Seizure, Spam], NO_PARENTS),
];

const GENERATION_2: &[Expected] = &[
    rec("g2-i3", 77.188, 91.301, &[Headwind], ["g1-i4", "g1-i4"]),
    rec("g2-i5", 77.188, 85.814, &[Headwind], ["g1-i4", "g1-i1"]),
    rec("g2-i8", 77.188, 91.532, &[Headwind], ["g1-i4", "g1-i4"]),
    rec("g2-i6", 55.188, 73.507, &[Headwind, Over, Spam], ["g1-i1", "g1-i1"]),
    rec("g2-i7", 55.188, 75.53, &[Headwind, Over, Spam], ["g1-i4", "g1-i2"]),
    rec("g2-i1", 42.188, 70.004, &[Headwind, Seizure, Spam], ["g1-i2", "g1-i1"]),
    rec("g2-i2", 42.188, 70.943, &[Headwind, Seizure, Spam], ["g1-i2", "g1-i2"]),
    rec("g2-i4", 42.188, 67.895, &[Headwind, Seizure, Spam], ["g1-i1", "g1-i2"]),
];

const GENERATION_3: &[Expected] = &[
    rec("g3-i2", 73.92, 59.865, &[Headwind], ["g2-i3", "g2-i4"]),
    rec("g3-i5", 73.92, 68.479, &[Headwind], ["g2-i3", "g2-i3"]),
    rec("g3-i8", 73.92, 62.172, &[Headwind], ["g2-i5", "g2-i4"]),
    rec("g3-i3", 61.92, 63.056, &[Headwind, Over], ["g2-i5", "g2-i3"]),
    rec("g3-i6", 61.92, 73.8, &[Headwind, Over], ["g2-i3", "g2-i3"]),
    rec("g3-i4", 48.92, 59.822, &[Headwind, Seizure], ["g2-i3", "g2-i4"]),
    rec("g3-i1", 38.92, 47.039, &[Headwind, Seizure, Spam], ["g2-i4", "g2-i5"]),
    rec("g3-i7", 38.92, 50.997, &[Headwind, Seizure, Spam], ["g2-i4", "g2-i3"]),
];

const FIRST_BEST_TEXT: &str = "蝶番 に 灯台 種\n港 霧笛 霧笛\n蝶番 に 灯台 に 錨\n川 扉 に 灯台\n石 錨 雨\n灯台 港 港\n潮 灯台 霧笛\n霧笛 霧笛 潮\n灯台 雨 灯台 を掲げる";

const FINAL_BEST_TEXT: &str = "不在 港 に 影\n余白 記憶 息\n許し 許し に 港\n糸 潮 窓\n蝶番 石 港\n縄 潮 雨\n港 間隔 錨\n潮 縄 手\n港 手 許し ほどけていく";

fn golden_run() -> SimulationOutput {
    let nutrients = ["港", "灯台", "潮", "錨", "霧笛"]
        .iter()
        .map(|word| (*word).to_string())
        .collect();
    let request = SimulationRequest::new("run-golden", 6, 3, nutrients)
        .with_seed(12_345_u32)
        .with_toxic_words(vec!["漏洩".to_string()]);
    run_simulation(&request)
}

#[test]
fn seeded_run_reproduces_pinned_records() {
    let output = golden_run();
    let expected = [GENERATION_1, GENERATION_2, GENERATION_3];
    assert_eq!(output.generations.len(), expected.len());

    for (summary, rows) in output.generations.iter().zip(expected) {
        assert_eq!(summary.records.len(), rows.len(), "generation {}", summary.generation);
        assert_eq!(summary.living_count, rows.len());
        for (record, row) in summary.records.iter().zip(rows) {
            assert_eq!(record.individual_id, row.id);
            assert_eq!(record.score, row.score, "{}", row.id);
            assert_eq!(record.energy.after, row.energy_after, "{}", row.id);
            assert_eq!(record.diagnosis.reasons, row.reasons, "{}", row.id);
            let parents: Vec<&str> = row
                .parents
                .into_iter()
                .filter(|id| !id.is_empty())
                .collect();
            assert_eq!(record.parent_ids, parents, "{}", row.id);
        }
    }
}

#[test]
fn seeded_run_reproduces_pinned_seasons_and_texts() {
    let output = golden_run();
    let seasons: Vec<(&str, Vec<&str>)> = output
        .generations
        .iter()
        .map(|summary| {
            let env = &summary.environment;
            (
                env.season_key.as_str(),
                env.active_nutrients.iter().map(String::as_str).collect(),
            )
        })
        .collect();
    assert_eq!(
        seasons,
        [
            ("spring", vec!["港", "灯台", "潮", "錨", "霧笛"]),
            ("summer", vec!["灯台", "潮", "錨", "霧笛"]),
            ("autumn", vec!["潮", "錨", "港"]),
        ]
    );

    assert_eq!(output.generations[0].records[0].text, FIRST_BEST_TEXT);
    let winner = output
        .final_generation()
        .and_then(|summary| summary.winners.first())
        .expect("final winner");
    assert_eq!(winner.individual_id, "g3-i2");
    assert_eq!(winner.text, FINAL_BEST_TEXT);
}
