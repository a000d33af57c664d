//! Configuration for the aoi-sim application.
//!
//! Handles parsing command-line arguments and generating sensible defaults
//! (including a randomized arrival rate that is reproducible with a seed).
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments, using intelligent defaults.
//! All defaults are printed so runs are reproducible.

use aoi_sim_core::policy::PolicyKind;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Complete configuration for a comparison run.
#[derive(Debug, Clone)]
pub struct Config {
    /// Seed for the workload of trial 0; trial `k` uses `seed + k`
    pub seed: u64,

    // === Workload ===
    /// Number of independent sources
    pub sources: usize,

    /// Packets generated per source per trial
    pub packets_per_source: usize,

    /// Poisson arrival rate of each source
    pub arrival_rate: f64,

    /// Exponential service rate of the server
    pub service_rate: f64,

    // === Experiment ===
    /// Policies to compare
    pub policies: Vec<PolicyKind>,

    /// Number of independent trials per policy
    pub trials: u64,

    /// Worker threads sharing the trials
    pub jobs: usize,

    // === Behavior ===
    /// Print the completion log and age trace of the first trial
    pub trace: bool,

    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print detailed metrics summary
    pub print_metrics: bool,

    /// Whether to print metrics in `key=value` form
    pub export: bool,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If no arguments provided, generates a randomized arrival rate using a time-based seed.
    /// If --seed is provided, uses that seed for all randomness (fully deterministic).
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut seed: Option<u64> = None;
        let mut sources: Option<usize> = None;
        let mut packets_per_source: Option<usize> = None;
        let mut arrival_rate: Option<f64> = None;
        let mut service_rate: Option<f64> = None;
        let mut policies: Option<Vec<PolicyKind>> = None;
        let mut trials: Option<u64> = None;
        let mut jobs: Option<usize> = None;
        let mut trace = false;
        let mut print_config = false;
        let mut print_metrics = true;
        let mut export = false;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--seed" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--seed requires a number".to_string());
                    }
                    seed = Some(args[i].parse().map_err(|_| "invalid seed")?);
                }
                "--sources" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--sources requires a number".to_string());
                    }
                    sources = Some(args[i].parse().map_err(|_| "invalid sources")?);
                }
                "--packets" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--packets requires a number".to_string());
                    }
                    packets_per_source = Some(args[i].parse().map_err(|_| "invalid packets")?);
                }
                "--arrival-rate" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--arrival-rate requires a number".to_string());
                    }
                    arrival_rate = Some(args[i].parse().map_err(|_| "invalid arrival-rate")?);
                }
                "--service-rate" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--service-rate requires a number".to_string());
                    }
                    service_rate = Some(args[i].parse().map_err(|_| "invalid service-rate")?);
                }
                "--policy" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--policy requires a name".to_string());
                    }
                    policies = Some(parse_policies(&args[i])?);
                }
                "--trials" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--trials requires a number".to_string());
                    }
                    trials = Some(args[i].parse().map_err(|_| "invalid trials")?);
                }
                "--jobs" => {
                    i += 1;
                    if i >= args.len() {
                        return Err("--jobs requires a number".to_string());
                    }
                    jobs = Some(args[i].parse().map_err(|_| "invalid jobs")?);
                }
                "--trace" => {
                    trace = true;
                }
                "--print-config" => {
                    print_config = true;
                }
                "--no-metrics" => {
                    print_metrics = false;
                }
                "--export" => {
                    export = true;
                }
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|elapsed| elapsed.as_millis() as u64)
                .unwrap_or_default()
        });

        // Generate defaults using seed
        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let config = Config {
            seed,
            sources: sources.unwrap_or(2),
            packets_per_source: packets_per_source.unwrap_or(1000),
            arrival_rate: arrival_rate.unwrap_or_else(|| {
                // Keep total offered load below one for the default two sources
                let r: f64 = rng.gen_range(0.1..0.45);
                (r * 100.0).round() / 100.0
            }),
            service_rate: service_rate.unwrap_or(1.0),
            policies: policies.unwrap_or_else(|| PolicyKind::ALL.to_vec()),
            trials: trials.unwrap_or(100),
            jobs: jobs.unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            }),
            trace,
            print_config,
            print_metrics,
            export,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values no simulation can run with.
    pub fn validate(&self) -> Result<(), String> {
        if self.sources == 0 {
            return Err("--sources must be at least 1".to_string());
        }
        if self.packets_per_source == 0 {
            return Err("--packets must be at least 1".to_string());
        }
        if self.trials == 0 {
            return Err("--trials must be at least 1".to_string());
        }
        if self.jobs == 0 {
            return Err("--jobs must be at least 1".to_string());
        }
        if !(self.arrival_rate.is_finite() && self.arrival_rate > 0.0) {
            return Err(format!("--arrival-rate must be positive, got {}", self.arrival_rate));
        }
        if !(self.service_rate.is_finite() && self.service_rate > 0.0) {
            return Err(format!("--service-rate must be positive, got {}", self.service_rate));
        }
        Ok(())
    }

    /// Worker threads actually started: never more than there are trials.
    pub fn workers(&self) -> usize {
        self.jobs.min(usize::try_from(self.trials).unwrap_or(usize::MAX))
    }

    /// Total offered load: arrival rate of all sources over the service rate.
    pub fn offered_load(&self) -> f64 {
        self.sources as f64 * self.arrival_rate / self.service_rate
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        let policies: Vec<&str> = self.policies.iter().map(|policy| policy.name()).collect();

        println!("=== Configuration ===");
        println!("Seed: {}", self.seed);
        println!("Policies: {}", policies.join(", "));
        println!("Trials: {}", self.trials);
        println!("Workers: {}", self.workers());
        println!();
        println!("=== Workload ===");
        println!("Sources: {}", self.sources);
        println!("Packets per source: {}", self.packets_per_source);
        println!("Arrival rate (per source): {}", self.arrival_rate);
        println!("Service rate: {}", self.service_rate);
        println!("Offered load: {:.2}", self.offered_load());
        println!();
    }

    #[cfg(test)]
    pub fn for_tests(seed: u64) -> Self {
        Self {
            seed,
            sources: 2,
            packets_per_source: 50,
            arrival_rate: 0.3,
            service_rate: 1.0,
            policies: PolicyKind::ALL.to_vec(),
            trials: 3,
            jobs: 1,
            trace: false,
            print_config: false,
            print_metrics: false,
            export: false,
        }
    }
}

/// Parse `all` or a comma-separated list of policy names.
fn parse_policies(value: &str) -> Result<Vec<PolicyKind>, String> {
    if value == "all" {
        return Ok(PolicyKind::ALL.to_vec());
    }

    let mut policies = Vec::new();
    for name in value.split(',').map(str::trim).filter(|name| !name.is_empty()) {
        let kind: PolicyKind = name.parse().map_err(|err| format!("{}", err))?;
        if !policies.contains(&kind) {
            policies.push(kind);
        }
    }

    if policies.is_empty() {
        return Err("--policy requires at least one name".to_string());
    }
    Ok(policies)
}

fn print_help() {
    println!("aoi-sim: Age of Information under LCFS-W, LCFS-S and the proposed policy");
    println!();
    println!("USAGE:");
    println!("    aoi-sim [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("    --seed <N>              Random seed for determinism");
    println!();
    println!("    --sources <N>           Number of sources (default: 2)");
    println!("    --packets <N>           Packets per source per trial (default: 1000)");
    println!("    --arrival-rate <RATE>   Arrival rate per source (default: random 0.10-0.45)");
    println!("    --service-rate <RATE>   Service rate (default: 1.0)");
    println!();
    println!("    --policy <LIST>         lcfs-w, lcfs-s, proposed, comma list or all (default: all)");
    println!("    --trials <N>            Independent trials per policy (default: 100)");
    println!("    --jobs <N>              Worker threads (default: available cores)");
    println!();
    println!("    --trace                 Print the delivery log and age trace of trial 0");
    println!("    --print-config          Print resolved configuration");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --export                Print metrics as key=value lines");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    aoi-sim                                   # Run with random defaults");
    println!("    aoi-sim --seed 42                         # Deterministic run");
    println!("    aoi-sim --policy lcfs-s,proposed --trials 10");
    println!("    aoi-sim --seed 42 --jobs 4 --export");
    println!("    aoi-sim --arrival-rate 0.4 --trace --trials 1 --packets 5");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_defaults_with_seed() {
        let config = Config::from_args(&args(&["--seed", "42"])).unwrap();

        assert_eq!(config.seed, 42);
        assert_eq!(config.sources, 2);
        assert_eq!(config.packets_per_source, 1000);
        assert_eq!(config.service_rate, 1.0);
        assert_eq!(config.policies, PolicyKind::ALL.to_vec());
        assert!(config.arrival_rate >= 0.1 && config.arrival_rate <= 0.45);
        assert!(config.print_metrics);
        assert!(!config.trace);
        assert!(!config.export);
        assert!(config.jobs >= 1);
    }

    #[test]
    fn test_seeded_defaults_are_reproducible() {
        let a = Config::from_args(&args(&["--seed", "7"])).unwrap();
        let b = Config::from_args(&args(&["--seed", "7"])).unwrap();
        assert_eq!(a.arrival_rate, b.arrival_rate);
    }

    #[test]
    fn test_explicit_values() {
        let config = Config::from_args(&args(&[
            "--seed",
            "1",
            "--sources",
            "3",
            "--packets",
            "20",
            "--arrival-rate",
            "0.25",
            "--service-rate",
            "2",
            "--policy",
            "lcfs-s,proposed",
            "--trials",
            "5",
            "--jobs",
            "8",
            "--trace",
            "--no-metrics",
            "--export",
        ]))
        .unwrap();

        assert_eq!(config.sources, 3);
        assert_eq!(config.packets_per_source, 20);
        assert_eq!(config.arrival_rate, 0.25);
        assert_eq!(config.service_rate, 2.0);
        assert_eq!(config.policies, vec![PolicyKind::LcfsS, PolicyKind::Proposed]);
        assert_eq!(config.trials, 5);
        assert_eq!(config.jobs, 8);
        assert_eq!(config.workers(), 5);
        assert!(config.trace);
        assert!(!config.print_metrics);
        assert!(config.export);
        assert_eq!(config.offered_load(), 0.375);
    }

    #[test]
    fn test_missing_value() {
        assert!(Config::from_args(&args(&["--trials"])).is_err());
        assert!(Config::from_args(&args(&["--seed"])).is_err());
    }

    #[test]
    fn test_unknown_argument() {
        let err = Config::from_args(&args(&["--bogus"])).unwrap_err();
        assert_eq!(err, "unknown argument: --bogus");
    }

    #[test]
    fn test_invalid_values() {
        assert!(Config::from_args(&args(&["--seed", "1", "--sources", "0"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "1", "--jobs", "0"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "1", "--arrival-rate", "-1"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "1", "--service-rate", "0"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "1", "--policy", "fifo"])).is_err());
        assert!(Config::from_args(&args(&["--seed", "1", "--policy", ","])).is_err());
    }
}
