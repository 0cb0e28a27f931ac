//! Deletion safety scoring.
//!
//! Fixed order over a finished [`FileAnalysis`]:
//! 1. critical package: `NeverDelete` floor plus a large weight
//! 2. forced signals: each adds its weight and a `Dangerous` floor
//! 3. continuous terms: size penalty, unreachable share, utility bonus
//! 4. level from the score, optionally bounded below by the floor from 1–2
//!
//! Weights come from [`ScoringConfig`], keyword tables from [`Heuristics`].

use crate::analysis::{FileAnalysis, SafetyLevel};
use crate::config::{Heuristics, ScoringConfig};

/// Files at or below this size with few functions earn the utility bonus.
const SMALL_FILE_LINES: usize = 50;
const SMALL_FILE_FUNCTIONS: usize = 5;

/// Piecewise-linear size penalty: 10/line up to 10 lines, 20/line up to 50,
/// 40/line up to 100, 80/line beyond. Continuous and non-decreasing.
pub fn size_penalty(lines: usize) -> i64 {
    let l = lines as i64;
    match lines {
        0..=10 => l * 10,
        11..=50 => 100 + (l - 10) * 20,
        51..=100 => 900 + (l - 50) * 40,
        _ => 2_900 + (l - 100) * 80,
    }
}

pub struct SafetyScorer {
    scoring: ScoringConfig,
    heuristics: Heuristics,
}

impl SafetyScorer {
    pub fn new(scoring: ScoringConfig, heuristics: Heuristics) -> Self {
        Self { scoring, heuristics }
    }

    /// Computes `safety_score` and `safety_level`, appending one reason per
    /// contributing term.
    pub fn score(&self, a: &mut FileAnalysis) {
        let w = &self.scoring;
        let h = &self.heuristics;
        let mut score: i64 = 0;
        let mut floor: Option<SafetyLevel> = None;

        if let Some(name) = h.critical_match(&a.package_dir) {
            a.is_critical = true;
            score += w.critical;
            floor = Some(SafetyLevel::NeverDelete);
            a.add_reason(format!("critical package ({}): +{}", name, w.critical));
        }

        let mut forced: Vec<(i64, String)> = Vec::new();
        if a.has_interfaces {
            forced.push((w.interfaces, "declares interfaces".into()));
        }
        if a.has_fx_usage {
            forced.push((w.fx_usage, "uses DI framework".into()));
        }
        if a.is_imported {
            forced.push((w.imported, "package imported elsewhere".into()));
        }
        if a.has_tests {
            forced.push((w.tests, "test code".into()));
        }
        if a.has_templates {
            forced.push((w.templates, "uses templates".into()));
        }
        if !a.exported_functions.is_empty() {
            let n = a.exported_functions.len() as i64;
            forced.push((w.exported_function * n, format!("{} exported functions", n)));
        }
        if a.has_init_function {
            forced.push((w.init_or_setup, "declares func init".into()));
        } else if let Some(k) = h.init_match(a.file_name()) {
            forced.push((w.init_or_setup, format!("init/setup file name ({})", k)));
        }
        if a.has_main_function {
            forced.push((w.entry_point, "declares func main".into()));
        } else if h.in_entry_dir(&a.path) {
            forced.push((w.entry_point, "in entry point directory".into()));
        }
        if a.has_global_state {
            forced.push((w.global_state, "package-level variables".into()));
        } else if let Some(k) = h.global_match(&a.path) {
            forced.push((w.global_state, format!("global state path ({})", k)));
        }
        if let Some(k) = h.state_match(&a.path) {
            forced.push((w.state_mutation, format!("state-mutating path ({})", k)));
        }
        for (weight, label) in forced {
            score += weight;
            floor = floor.max(Some(SafetyLevel::Dangerous));
            a.add_reason(format!("{}: +{}", label, weight));
        }

        let size = size_penalty(a.total_lines);
        score += size;
        a.add_reason(format!("size {} lines: +{}", a.total_lines, size));

        let percent = a.unreachable_percent();
        if percent > 0 {
            let bonus = percent * w.unreachable_percent;
            score -= bonus;
            a.add_reason(format!("{}% unreachable: -{}", percent, bonus));
        }

        if let Some(k) = h.utility_match(&a.path) {
            score -= w.utility_bonus;
            a.add_reason(format!("utility path ({}): -{}", k, w.utility_bonus));
        } else if a.total_lines <= SMALL_FILE_LINES && a.total_functions <= SMALL_FILE_FUNCTIONS {
            score -= w.utility_bonus;
            a.add_reason(format!("small file: -{}", w.utility_bonus));
        }

        let from_score = self.level_for(score, a);
        let level = match floor {
            Some(f) if w.preserve_level_floors && f > from_score => {
                a.add_reason(format!("level kept at {} (score alone gives {})", f, from_score));
                f
            }
            _ => from_score,
        };

        a.safety_score = score;
        a.safety_level = level;
    }

    fn level_for(&self, score: i64, a: &FileAnalysis) -> SafetyLevel {
        let all_unreachable = a.total_functions > 0 && a.unreachable_functions == a.total_functions;
        if score < self.scoring.ultra_safe_below && all_unreachable {
            SafetyLevel::UltraSafe
        } else if score < self.scoring.potentially_safe_below {
            SafetyLevel::PotentiallySafe
        } else {
            SafetyLevel::Dangerous
        }
    }
}
