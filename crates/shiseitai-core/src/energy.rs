//! Energy economy: per-generation balance, starvation and inherited birth energy.

use serde::{Deserialize, Serialize};

use crate::config::LifeConfig;
use crate::numeric::{clamp_or, round3};
use crate::rng::SeededRng;

/// Reported energy movement for one individual in one generation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EnergyBalance {
    pub before: f64,
    pub delta: f64,
    pub after: f64,
}

impl EnergyBalance {
    fn depleted(before: f64) -> Self {
        Self {
            before: round3(before),
            delta: round3(-before),
            after: 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySettlement {
    pub balance: EnergyBalance,
    /// Survived the diagnostic but ran out of energy.
    pub starved: bool,
}

impl EnergySettlement {
    /// Dead for any reason.
    #[must_use]
    pub const fn is_dead(&self, diagnosed_dead: bool) -> bool {
        diagnosed_dead || self.starved
    }
}

/// Energy change before clamping: score income, metabolic cost and seasonal drift.
#[must_use]
pub fn energy_delta(score: f64, metabolism_multiplier: f64, life: &LifeConfig) -> f64 {
    let drift = if metabolism_multiplier.is_finite() {
        metabolism_multiplier - 1.0
    } else {
        0.0
    };
    round3(
        score * life.score_to_energy_scale - life.base_metabolism_cost
            + drift * life.season_energy_scale,
    )
}

/// Settles one individual's energy after diagnosis.
#[must_use]
pub fn settle_energy(
    energy: f64,
    score: f64,
    diagnosed_dead: bool,
    metabolism_multiplier: f64,
    life: &LifeConfig,
) -> EnergySettlement {
    let before = clamp_or(Some(energy), 0.0, life.max_energy, life.initial_energy);
    if diagnosed_dead {
        return EnergySettlement {
            balance: EnergyBalance::depleted(before),
            starved: false,
        };
    }

    let delta = energy_delta(score, metabolism_multiplier, life);
    let after = (before + delta).clamp(0.0, life.max_energy);
    if after <= life.energy_death_threshold {
        return EnergySettlement {
            balance: EnergyBalance::depleted(before),
            starved: true,
        };
    }

    EnergySettlement {
        balance: EnergyBalance {
            before: round3(before),
            delta,
            after: round3(after),
        },
        starved: false,
    }
}

/// Energy handed to a child bred from parents that ended with `a` and `b`.
///
/// Draws exactly one value from `rng` for the jitter.
pub fn birth_energy(a: f64, b: f64, life: &LifeConfig, rng: &mut SeededRng) -> f64 {
    let inherited = (a + b) * 0.5 * life.energy_inheritance;
    let jitter = rng.range(-life.birth_energy_jitter, life.birth_energy_jitter);
    round3(clamp_or(
        Some(inherited + jitter),
        life.min_birth_energy,
        life.max_energy,
        life.initial_energy,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn income_minus_cost_plus_season() {
        let life = LifeConfig::default();
        // 80 * 0.34 - 16 + 0.06 * 12
        assert_eq!(energy_delta(80.0, 1.06, &life), 11.92);
        assert_eq!(energy_delta(0.0, f64::NAN, &life), -16.0);

        let settlement = settle_energy(100.0, 80.0, false, 1.06, &life);
        assert!(!settlement.starved);
        assert_eq!(settlement.balance.before, 100.0);
        assert_eq!(settlement.balance.delta, 11.92);
        assert_eq!(settlement.balance.after, 111.92);
    }

    #[test]
    fn income_is_capped_at_max_energy() {
        let life = LifeConfig::default();
        let settlement = settle_energy(149.0, 100.0, false, 1.0, &life);
        assert_eq!(settlement.balance.after, 150.0);
    }

    #[test]
    fn diagnosed_death_drains_everything() {
        let life = LifeConfig::default();
        let settlement = settle_energy(63.25, 0.0, true, 1.0, &life);
        assert!(!settlement.starved);
        assert!(settlement.is_dead(true));
        assert_eq!(settlement.balance.delta, -63.25);
        assert_eq!(settlement.balance.after, 0.0);
    }

    #[test]
    fn low_energy_starves() {
        let life = LifeConfig::default();
        // 10 + (0 - 16) clamps to 0, below the threshold.
        let settlement = settle_energy(10.0, 0.0, false, 1.0, &life);
        assert!(settlement.starved);
        assert!(settlement.is_dead(false));
        assert_eq!(settlement.balance.before, 10.0);
        assert_eq!(settlement.balance.delta, -10.0);
        assert_eq!(settlement.balance.after, 0.0);
    }

    #[test]
    fn non_finite_energy_starts_from_initial() {
        let life = LifeConfig::default();
        let settlement = settle_energy(f64::NAN, 50.0, false, 1.0, &life);
        assert_eq!(settlement.balance.before, 100.0);
        assert_eq!(settlement.balance.after, 101.0);
    }

    #[test]
    fn birth_energy_respects_bounds() {
        let life = LifeConfig::default();
        let mut rng = SeededRng::new(3);
        for _ in 0..200 {
            let low = birth_energy(0.0, 0.0, &life, &mut rng);
            assert_eq!(low, life.min_birth_energy);
            let high = birth_energy(150.0, 150.0, &life, &mut rng);
            // 150 * 0.72 = 108 ± 6
            assert!((102.0..=114.0).contains(&high), "{high}");
        }
    }

    #[test]
    fn birth_energy_consumes_one_draw() {
        let life = LifeConfig::default();
        let mut rng = SeededRng::new(17);
        let mut control = SeededRng::new(17);
        let _ = birth_energy(90.0, 70.0, &life, &mut rng);
        control.next_f64();
        assert_eq!(rng.next_f64().to_bits(), control.next_f64().to_bits());
    }
}
