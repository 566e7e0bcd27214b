//! Synthetic client traffic
//!
//! Every simulated client visits each configured experiment a few times over
//! the cookie transport, then converts with probability `finish_rate` and
//! finishes twice. Each response is checked against the lifecycle rules:
//! one first-time start, a stable alternative, one first-time finish.

use crate::error::SimError;
use cohort_core::{ExperimentManager, ManagerError};
use cohort_persistence::{CookieRequest, CookieResponse};
use cohort_registry::ExperimentStore;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;
use std::fmt;

/// Simulation parameters
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorConfig {
    /// Seed for conversion decisions
    pub seed: u64,
    /// Number of clients
    pub clients: u64,
    /// Start requests per client and experiment
    pub visits: u32,
    /// Share of clients that finish
    pub finish_rate: f64,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            clients: 10_000,
            visits: 3,
            finish_rate: 0.5,
        }
    }
}

/// Assignments observed for one alternative
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlternativeTally {
    /// Alternative name
    pub name: String,
    /// Declared weight
    pub weight: u64,
    /// Clients assigned
    pub assigned: u64,
    /// `weight / total`
    pub expected_share: f64,
}

/// Counters for one experiment
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExperimentTally {
    /// Experiment key
    pub key: String,
    /// Per-alternative counts, in declared order
    pub alternatives: Vec<AlternativeTally>,
    /// Starts reporting first time
    pub first_starts: u64,
    /// Starts resuming an assignment
    pub repeat_starts: u64,
    /// Finishes reporting `did_finish`
    pub finishes: u64,
    /// Finishes reporting first time
    pub first_finishes: u64,
}

impl ExperimentTally {
    /// Observed share of `assigned` over all assignments
    #[allow(clippy::cast_precision_loss)]
    #[must_use]
    pub fn share(&self, assigned: u64) -> f64 {
        let total: u64 = self.alternatives.iter().map(|a| a.assigned).sum();
        if total == 0 {
            0.0
        } else {
            assigned as f64 / total as f64
        }
    }
}

/// Lifecycle rule broken by a response
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    /// Client index
    pub client: u64,
    /// Experiment key
    pub key: String,
    /// What went wrong
    pub detail: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "client {} / {}: {}", self.client, self.key, self.detail)
    }
}

/// Simulation outcome
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulatorReport {
    /// Parameters used
    pub config: SimulatorConfig,
    /// Per-experiment counters, in config order
    pub experiments: Vec<ExperimentTally>,
    /// Rules broken
    pub violations: Vec<Violation>,
}

impl SimulatorReport {
    /// No violations observed
    #[inline]
    #[must_use]
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }

    /// Human-readable report
    #[must_use]
    pub fn generate_text(&self) -> String {
        let mut report = String::new();
        report.push_str("=== Cohort Simulator Report ===\n\n");
        report.push_str(&format!("Seed: {}\n", self.config.seed));
        report.push_str(&format!("Clients: {}\n", self.config.clients));
        report.push_str(&format!("Visits per client: {}\n", self.config.visits));
        report.push_str(&format!("Finish rate: {:.2}\n", self.config.finish_rate));

        for tally in &self.experiments {
            report.push_str(&format!("\n[{}]\n", tally.key));
            for alt in &tally.alternatives {
                report.push_str(&format!(
                    "  {:<16} {:>8}  {:>6.2}%  (expected {:.2}%)\n",
                    alt.name,
                    alt.assigned,
                    tally.share(alt.assigned) * 100.0,
                    alt.expected_share * 100.0
                ));
            }
            report.push_str(&format!(
                "  starts: {} first-time, {} repeat\n",
                tally.first_starts, tally.repeat_starts
            ));
            report.push_str(&format!(
                "  finishes: {} reported, {} first-time\n",
                tally.finishes, tally.first_finishes
            ));
        }

        if !self.violations.is_empty() {
            report.push_str("\n=== Violations ===\n");
            for (i, v) in self.violations.iter().enumerate() {
                report.push_str(&format!("{}. {v}\n", i + 1));
            }
        }

        report.push_str(&format!(
            "\n=== Result: {} ===\n",
            if self.passed() { "PASS" } else { "FAIL" }
        ));
        report
    }
}

/// Run simulated clients against every experiment in the manager's config
///
/// # Errors
/// - `InvalidFinishRate` if the rate is outside `[0, 1]`
/// - `Manager` if a configured experiment is missing or a call fails
pub fn run_simulator<S, R>(
    manager: &ExperimentManager<S, R>,
    config: SimulatorConfig,
) -> Result<SimulatorReport, SimError>
where
    S: ExperimentStore,
    R: Rng,
{
    if !(0.0..=1.0).contains(&config.finish_rate) {
        return Err(SimError::InvalidFinishRate(config.finish_rate));
    }

    let mut tallies = manager
        .config()
        .experiments
        .iter()
        .map(|definition| new_tally(manager, &definition.key))
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut violations = Vec::new();

    for client in 0..config.clients {
        let mut request = CookieRequest::empty();
        for tally in &mut tallies {
            let finishing = rng.gen_bool(config.finish_rate);
            let problems = simulate_client(manager, tally, &mut request, config.visits, finishing)?;
            violations.extend(problems.into_iter().map(|detail| Violation {
                client,
                key: tally.key.clone(),
                detail,
            }));
        }
    }

    tracing::info!(
        clients = config.clients,
        experiments = tallies.len(),
        violations = violations.len(),
        "simulation complete"
    );

    Ok(SimulatorReport {
        config,
        experiments: tallies,
        violations,
    })
}

/// One client's visits to one experiment; returns the rules it saw broken
fn simulate_client<S, R>(
    manager: &ExperimentManager<S, R>,
    tally: &mut ExperimentTally,
    request: &mut CookieRequest,
    visits: u32,
    finishing: bool,
) -> Result<Vec<String>, ManagerError>
where
    S: ExperimentStore,
    R: Rng,
{
    let mut problems = Vec::new();
    let mut assigned: Option<String> = None;

    for visit in 0..visits {
        let mut response = manager.cookie_response();
        let res = manager.start_experiment(&tally.key, &*request, &mut response)?;
        carry(request, &response);

        if res.did_start_first_time {
            tally.first_starts += 1;
        } else {
            tally.repeat_starts += 1;
        }
        if !res.did_start {
            problems.push("start did not report did_start".to_string());
        }
        if res.did_start_first_time != (visit == 0) {
            problems.push(format!("first-time start flag wrong on visit {}", visit + 1));
        }

        match &assigned {
            Some(previous) if *previous != res.alternative => {
                problems.push(format!("alternative changed from `{previous}` to `{}`", res.alternative));
            }
            Some(_) => {}
            None => {
                match tally.alternatives.iter_mut().find(|a| a.name == res.alternative) {
                    Some(slot) => slot.assigned += 1,
                    None => problems.push(format!("undeclared alternative `{}`", res.alternative)),
                }
                assigned = Some(res.alternative);
            }
        }
    }

    if !finishing {
        return Ok(problems);
    }

    for attempt in 0..2 {
        let mut response = manager.cookie_response();
        let res = manager.finish_experiment(&tally.key, &*request, &mut response)?;
        carry(request, &response);

        tally.finishes += u64::from(res.did_finish);
        tally.first_finishes += u64::from(res.did_finish_first_time);

        let expected_first = attempt == 0 && assigned.is_some();
        if res.did_finish != assigned.is_some() || res.did_finish_first_time != expected_first {
            problems.push(format!("unexpected finish flags on attempt {}", attempt + 1));
        }
        if assigned.as_ref().is_some_and(|a| *a != res.alternative) {
            problems.push(format!("finish reported `{}`", res.alternative));
        }
    }

    Ok(problems)
}

#[allow(clippy::cast_precision_loss)]
fn new_tally<S, R>(manager: &ExperimentManager<S, R>, key: &str) -> Result<ExperimentTally, ManagerError>
where
    S: ExperimentStore,
    R: Rng,
{
    let experiment = manager.lookup_experiment(key)?;
    let total = experiment.total_weight() as f64;
    let alternatives = experiment
        .alternatives()
        .iter()
        .map(|alt| AlternativeTally {
            name: alt.name().to_string(),
            weight: alt.weight(),
            assigned: 0,
            expected_share: alt.weight() as f64 / total,
        })
        .collect();

    Ok(ExperimentTally {
        key: key.to_string(),
        alternatives,
        first_starts: 0,
        repeat_starts: 0,
        finishes: 0,
        first_finishes: 0,
    })
}

/// Replace `request` with the cookies a browser sends after `response`
fn carry(request: &mut CookieRequest, response: &CookieResponse) {
    if response.headers().next().is_some() {
        *request = response.to_request();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::with_demo_experiment;
    use cohort_core::ManagerConfig;
    use pretty_assertions::assert_eq;

    fn manager(config: ManagerConfig, seed: u64) -> ExperimentManager {
        let manager = ExperimentManager::seeded(with_demo_experiment(config), seed);
        manager.register_configured().unwrap();
        manager
    }

    #[test]
    fn demo_run_passes() {
        let config = SimulatorConfig {
            clients: 500,
            ..SimulatorConfig::default()
        };
        let report = run_simulator(&manager(ManagerConfig::default(), 1), config).unwrap();

        assert!(report.passed(), "{}", report.generate_text());
        let tally = &report.experiments[0];
        assert_eq!(tally.key, "demo");
        assert_eq!(tally.first_starts, 500);
        assert_eq!(tally.repeat_starts, 1000);
        assert_eq!(tally.alternatives.iter().map(|a| a.assigned).sum::<u64>(), 500);
        assert_eq!(tally.finishes, tally.first_finishes * 2);
    }

    #[test]
    fn weighted_shares_converge() {
        let config = ManagerConfig::from_toml_str(
            r#"
            [[experiments]]
            key = "pricing"
            alternatives = [{ name = "A", weight = 1 }, { name = "B", weight = 3 }]
            "#,
        )
        .unwrap();
        let sim = SimulatorConfig {
            clients: 20_000,
            visits: 1,
            finish_rate: 0.0,
            ..SimulatorConfig::default()
        };
        let report = run_simulator(&manager(config, 9), sim).unwrap();

        let tally = &report.experiments[0];
        let b = &tally.alternatives[1];
        assert!((b.expected_share - 0.75).abs() < f64::EPSILON);
        let share = tally.share(b.assigned);
        assert!((0.73..0.77).contains(&share), "B share was {share}");
        assert_eq!(tally.finishes, 0);
    }

    #[test]
    fn every_finishing_client_finishes_once() {
        let sim = SimulatorConfig {
            clients: 200,
            finish_rate: 1.0,
            ..SimulatorConfig::default()
        };
        let report = run_simulator(&manager(ManagerConfig::default(), 3), sim).unwrap();

        let tally = &report.experiments[0];
        assert_eq!(tally.first_finishes, 200);
        assert_eq!(tally.finishes, 400);
        assert!(report.passed());
    }

    #[test]
    fn zero_visits_never_finish() {
        let sim = SimulatorConfig {
            clients: 50,
            visits: 0,
            finish_rate: 1.0,
            ..SimulatorConfig::default()
        };
        let report = run_simulator(&manager(ManagerConfig::default(), 3), sim).unwrap();

        let tally = &report.experiments[0];
        assert_eq!(tally.first_starts, 0);
        assert_eq!(tally.finishes, 0);
        assert!(report.passed());
    }

    #[test]
    fn rejects_bad_finish_rate() {
        let sim = SimulatorConfig {
            finish_rate: 1.5,
            ..SimulatorConfig::default()
        };
        let err = run_simulator(&manager(ManagerConfig::default(), 3), sim).unwrap_err();
        assert!(matches!(err, SimError::InvalidFinishRate(_)));
    }

    #[test]
    fn text_report_lists_alternatives() {
        let sim = SimulatorConfig {
            clients: 10,
            ..SimulatorConfig::default()
        };
        let text = run_simulator(&manager(ManagerConfig::default(), 3), sim)
            .unwrap()
            .generate_text();
        assert!(text.contains("[demo]"));
        assert!(text.contains("control"));
        assert!(text.contains("=== Result: PASS ==="));
    }
}
