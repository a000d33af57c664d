//! aoi-sim: compare scheduling policies by Age of Information.
//!
//! For every trial a fresh workload is generated from `seed + trial` and run
//! through each selected policy. Trials are shared out between worker threads;
//! per-policy metrics are merged across workers and printed, followed by a
//! one-line-per-policy comparison.

mod config;
mod packet_gen;

use aoi_sim_core::aoi;
use aoi_sim_core::metrics::Metrics;
use aoi_sim_core::packet::SourceId;
use aoi_sim_core::policy::{Outcome, Policy, PolicyKind};
use aoi_sim_core::{Error, Result};
use config::Config;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {}", err);
            eprintln!("run with --help for usage");
            std::process::exit(2);
        }
    };

    if config.print_config {
        config.print();
    }

    if let Err(err) = run(&config) {
        tracing::error!(%err, "simulation failed");
        std::process::exit(1);
    }
}

/// Engine shared by reference between trial workers.
type Engine = Box<dyn Policy + Send + Sync>;

fn run(config: &Config) -> Result<()> {
    tracing::info!(
        seed = config.seed,
        sources = config.sources,
        trials = config.trials,
        workers = config.workers(),
        load = config.offered_load(),
        "starting comparison"
    );

    let engines = config
        .policies
        .iter()
        .map(|kind| Ok((*kind, kind.engine(config.sources)?)))
        .collect::<Result<Vec<(PolicyKind, Engine)>>>()?;

    let mut metrics = run_trials(config, &engines)?;

    for metrics in &mut metrics {
        metrics.complete();
        if config.print_metrics {
            metrics.print_summary();
        }
        if config.export {
            print!("{}", metrics.export_text());
        }
    }

    print_comparison(&metrics);
    tracing::info!("comparison finished");
    Ok(())
}

/// Spread the trials over `config.workers()` threads and merge their metrics.
///
/// Worker `w` runs trials `w`, `w + workers`, `w + 2 * workers` and so on.
/// The returned metrics are in `engines` order.
fn run_trials(config: &Config, engines: &[(PolicyKind, Engine)]) -> Result<Vec<Metrics>> {
    let mut totals: Vec<Metrics> = engines
        .iter()
        .map(|(kind, _)| Metrics::new(kind.name(), config.sources))
        .collect();
    let workers = config.workers();

    let parts = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| scope.spawn(move || run_worker(config, engines, worker, workers)))
            .collect();

        handles
            .into_iter()
            .enumerate()
            .map(|(worker, handle)| {
                handle
                    .join()
                    .map_err(|_| Error::Worker { worker })
                    .and_then(|part| part)
            })
            .collect::<Result<Vec<Vec<Metrics>>>>()
    })?;

    for part in &parts {
        for (total, metrics) in totals.iter_mut().zip(part) {
            total.merge(metrics);
        }
    }
    Ok(totals)
}

fn run_worker(
    config: &Config,
    engines: &[(PolicyKind, Engine)],
    worker: usize,
    workers: usize,
) -> Result<Vec<Metrics>> {
    let mut metrics: Vec<Metrics> = engines
        .iter()
        .map(|(kind, _)| Metrics::new(kind.name(), config.sources))
        .collect();

    for trial in (worker as u64..config.trials).step_by(workers) {
        let packets = packet_gen::generate_trial(config, trial)?;
        tracing::debug!(worker, trial, packets = packets.len(), "generated workload");

        for ((kind, engine), metrics) in engines.iter().zip(metrics.iter_mut()) {
            let outcome = engine.run(&packets)?;
            if config.trace && trial == 0 {
                print_trace(*kind, config.sources, &outcome);
            }
            metrics.record(&outcome);
        }
    }

    Ok(metrics)
}

/// Print the delivery log and age sawtooth of one run.
fn print_trace(kind: PolicyKind, sources: usize, outcome: &Outcome) {
    println!("\n=== Trace: {} (trial 0) ===", kind);
    println!("{:>6}  {:>12}  {:>12}  {:>10}", "source", "arrival", "end", "delay");
    for record in &outcome.completions {
        println!(
            "{:>6}  {:>12.4}  {:>12.4}  {:>10.4}",
            record.source,
            record.arrival_time,
            record.service_end_time,
            record.system_time()
        );
    }

    for source in 0..sources as SourceId {
        let updates = aoi::age_updates(&outcome.completions, source);
        let corners: Vec<String> = updates
            .iter()
            .map(|update| format!("({:.2}, {:.2})", update.time, update.age))
            .collect();
        println!("Source {} age: {}", source, corners.join(" "));
    }
}

fn print_comparison(metrics: &[Metrics]) {
    println!("\n=== Comparison ===");
    println!("{:<10}  {:>12}  {:>12}  {:>10}", "policy", "system AoI", "delivered", "util");
    for m in metrics {
        let age = m
            .system_average_age()
            .map(|age| format!("{:.4}", age))
            .unwrap_or_else(|| "n/a".to_string());
        println!(
            "{:<10}  {:>12}  {:>11.2}%  {:>9.2}%",
            m.policy,
            age,
            m.delivery_ratio() * 100.0,
            m.utilization() * 100.0
        );
    }

    let best = metrics
        .iter()
        .filter_map(|m| m.system_average_age().map(|age| (m.policy, age)))
        .min_by(|a, b| a.1.total_cmp(&b.1));
    if let Some((policy, age)) = best {
        println!("\nLowest AoI: {} ({:.4})", policy, age);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engines(config: &Config) -> Vec<(PolicyKind, Engine)> {
        config
            .policies
            .iter()
            .map(|kind| (*kind, kind.engine(config.sources).unwrap()))
            .collect()
    }

    #[test]
    fn test_workers_cover_every_trial() {
        let mut config = Config::for_tests(11);
        config.trials = 7;
        config.jobs = 3;

        let metrics = run_trials(&config, &engines(&config)).unwrap();

        assert_eq!(metrics.len(), PolicyKind::ALL.len());
        for m in &metrics {
            assert_eq!(m.trials, 7);
            assert_eq!(m.packets_offered, 7 * 2 * 50);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut sequential = Config::for_tests(5);
        sequential.trials = 6;
        let mut parallel = sequential.clone();
        parallel.jobs = 4;

        let one = run_trials(&sequential, &engines(&sequential)).unwrap();
        let many = run_trials(&parallel, &engines(&parallel)).unwrap();

        for (a, b) in one.iter().zip(&many) {
            assert_eq!(a.policy, b.policy);
            assert_eq!(a.packets_delivered, b.packets_delivered);
            assert_eq!(a.packets_superseded, b.packets_superseded);
            assert_eq!(a.aoi_samples, b.aoi_samples);
            // Sums are folded in a different order, so allow rounding.
            let (x, y) = (a.system_average_age().unwrap(), b.system_average_age().unwrap());
            assert!((x - y).abs() < 1e-9, "{} vs {}", x, y);
        }
    }
}
