//! basel-runner: headless Basel backtesting simulation runner.
//!
//! Usage:
//!   basel-runner --config sim.json --out ./results
//!   basel-runner --years 100 --paths 30 --disclosure 1.2 --seed 7
//!   basel-runner --config sim.json --table policy.json --json
//!   basel-runner --config sim.json --years 10   (flags override the file)

use anyhow::{anyhow, Context, Result};
use basel_core::{
    config::SimConfig,
    distribution::{ContinuousDistribution, DiscreteDistribution, DistributionProvider},
    engine::{RunSummary, SimEngine},
    record::RecordCategory,
};
use std::env;
use std::path::Path;

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    let json_mode = args.iter().any(|a| a == "--json");
    let config_path = arg_value(&args, "--config");
    let table_path = arg_value(&args, "--table");
    let out_dir = arg_value(&args, "--out");
    let delimiter = arg_value(&args, "--delimiter")
        .and_then(|d| d.bytes().next())
        .unwrap_or(b',');
    let disclosure = parse_arg(&args, "--disclosure", 1.0f64);

    let mut config = match config_path {
        Some(path) => SimConfig::load(path)?,
        None => SimConfig { simulation_number: 100, ..SimConfig::default() },
    };
    let resized = apply_dimension_overrides(&mut config, &args)?;
    config.seed = parse_arg(&args, "--seed", config.seed);
    if resized || config.basel_records.is_none() {
        config.basel_records = Some(config.sized_records());
    }

    let distribution: Box<dyn DistributionProvider> = match table_path {
        Some(path) => Box::new(
            DiscreteDistribution::from_json_file(path)
                .with_context(|| format!("Cannot load policy table {path}"))?,
        ),
        None => Box::new(ContinuousDistribution::constant(disclosure)),
    };

    if !json_mode {
        println!("Basel backtesting — basel-runner");
        println!("  seed:        {}", config.seed);
        println!("  years:       {}", config.simulation_number);
        println!("  days/year:   {}", config.trading_days);
        println!("  paths:       {}", config.simulation_years);
        println!("  VaR level:   {}", config.returns_distribution.confidence_level);
        println!("  normal VaR:  {:.4}", config.normal_var());
        println!("  10-day VaR:  {:.4}", config.normal_var10());
        match table_path {
            Some(path) => println!("  policy:      table {path}"),
            None => println!("  policy:      constant {disclosure}"),
        }
        println!();
    }

    let run_id = format!("run-{}-{}", config.seed, chrono::Utc::now().format("%Y%m%dT%H%M%S"));
    let mut engine = SimEngine::build(run_id, config, distribution)?;
    let summary = engine.run()?;

    if let Some(dir) = out_dir {
        dump_records(&engine, Path::new(dir), delimiter)?;
    }

    if json_mode {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        print_summary(&summary);
        if let Some(dir) = out_dir {
            println!();
            println!("  records written to {dir}");
        }
    }

    Ok(())
}

fn dump_records(engine: &SimEngine, dir: &Path, delimiter: u8) -> Result<()> {
    std::fs::create_dir_all(dir).with_context(|| format!("Cannot create {}", dir.display()))?;
    for name in engine.profile_names() {
        let Some(profile) = engine.profile(name) else { continue };
        for category in RecordCategory::ALL {
            let file = dir.join(format!("{name}_{}.csv", category.name()));
            profile.records().dump(&file, category, delimiter)?;
            log::debug!("wrote {}", file.display());
        }
    }
    Ok(())
}

fn print_summary(summary: &RunSummary) {
    println!("=== RUN SUMMARY ===");
    println!("  run_id:        {}", summary.run_id);
    println!("  years:         {}", summary.years);
    println!("  trading days:  {}", summary.trading_days);
    println!("  paths:         {}", summary.paths);

    for profile in &summary.profiles {
        println!();
        println!("=== PROFILE {} ===", profile.name);
        println!("  bankrupt paths:        {}", profile.bankrupt_paths);
        println!("  mean final multiplier: {:.3}", profile.mean_final_multiplier);
        println!("  mean effective return: {:.4}%", profile.mean_effective_return * 100.0);
    }
}

fn arg_value<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.windows(2)
        .find(|w| w[0] == flag)
        .map(|w| w[1].as_str())
}

/// `--years`, `--paths` and `--days` override the loaded configuration.
/// Returns whether any of them was given.
fn apply_dimension_overrides(config: &mut SimConfig, args: &[String]) -> Result<bool> {
    let years = parse_flag::<u64>(args, "--years")?;
    let paths = parse_flag::<usize>(args, "--paths")?;
    let days = parse_flag::<u32>(args, "--days")?;

    if let Some(years) = years {
        config.simulation_number = years;
    }
    if let Some(paths) = paths {
        config.simulation_years = paths;
    }
    if let Some(days) = days {
        config.trading_days = days;
    }
    Ok(years.is_some() || paths.is_some() || days.is_some())
}

fn parse_flag<T: std::str::FromStr>(args: &[String], flag: &str) -> Result<Option<T>> {
    arg_value(args, flag)
        .map(|v| v.parse().map_err(|_| anyhow!("invalid value '{v}' for {flag}")))
        .transpose()
}

fn parse_arg<T: std::str::FromStr + Copy>(args: &[String], flag: &str, default: T) -> T {
    arg_value(args, flag)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("basel-runner").chain(list.iter().copied()).map(String::from).collect()
    }

    #[test]
    fn dimension_flags_override_loaded_config() {
        let mut config = SimConfig::default_test();
        let resized =
            apply_dimension_overrides(&mut config, &args(&["--config", "sim.json", "--years", "7", "--days", "20"]))
                .unwrap();

        assert!(resized);
        assert_eq!(config.simulation_number, 7);
        assert_eq!(config.trading_days, 20);
        assert_eq!(config.simulation_years, SimConfig::default_test().simulation_years);
    }

    #[test]
    fn no_dimension_flags_leave_config_untouched() {
        let mut config = SimConfig::default_test();
        let before = config.clone();
        assert!(!apply_dimension_overrides(&mut config, &args(&["--seed", "3"])).unwrap());
        assert_eq!(config.simulation_number, before.simulation_number);
        assert_eq!(config.trading_days, before.trading_days);
        assert_eq!(config.simulation_years, before.simulation_years);
    }

    #[test]
    fn malformed_dimension_flag_is_rejected() {
        let mut config = SimConfig::default_test();
        assert!(apply_dimension_overrides(&mut config, &args(&["--paths", "many"])).is_err());
    }
}
