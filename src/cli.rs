//! The command line interface for heatplan.
use crate::log;
use crate::optimize;
use crate::parameters::{
    DrawOff, ForecastPoint, HeatPumpSpec, HotWaterSpec, IndoorSpec, OptimizationParameters,
    PowerTier, PriceSpec, RadiatorSpec, TankSpec,
};
use ::log::warn;
use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::{Path, PathBuf};

/// The command line interface for heatplan.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Commands,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Compute a plan from a parameters file.
    Run {
        /// Path to the parameters file (JSON).
        parameters: PathBuf,
        /// Write the result to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a complete example parameters file.
    Example,
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Run { parameters, output } => handle_run_command(&parameters, output.as_deref()),
            Self::Example => handle_example_command(),
        }
    }
}

/// Parse CLI arguments and start heatplan
pub fn run_cli() -> Result<()> {
    log::init().context("Failed to initialise logging")?;
    Cli::parse().command.execute()
}

/// Handle the `run` command.
pub fn handle_run_command(parameters_path: &Path, output_path: Option<&Path>) -> Result<()> {
    let text = fs::read_to_string(parameters_path)
        .with_context(|| format!("Failed to read {}", parameters_path.display()))?;
    let parameters: OptimizationParameters =
        serde_json::from_str(&text).context("Failed to parse parameters")?;

    let result = optimize(&parameters)?;
    if !result.ok {
        warn!("No feasible plan found: {}", result.solver_status);
    }

    let json = serde_json::to_string_pretty(&result).context("Failed to serialise result")?;
    match output_path {
        Some(path) => fs::write(path, json)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        None => println!("{json}"),
    }

    Ok(())
}

/// Handle the `example` command.
pub fn handle_example_command() -> Result<()> {
    let json = serde_json::to_string_pretty(&example_parameters())
        .context("Failed to serialise example parameters")?;
    println!("{json}");

    Ok(())
}

/// A complete, realistic parameter set: a 500 litre tank on a four-tier air/water heat pump,
/// planned over 24 hours at 20 minute resolution with an evening shower scheduled.
///
/// Printed by the `example` command as a starting point for real parameter files; also used as a
/// test fixture.
pub fn example_parameters() -> OptimizationParameters {
    let day = NaiveDate::from_ymd_opt(2023, 11, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();

    OptimizationParameters {
        time: day,
        slots_per_hour: 3,
        horizon_hours: 24,
        heat_pump: HeatPumpSpec {
            max_temp: 55.0,
            tiers: vec![
                PowerTier {
                    below_degrees: Some(35.0),
                    heating_power_watt: 8200.0,
                    consumed_power_watt: 1980.0,
                },
                PowerTier {
                    below_degrees: Some(45.0),
                    heating_power_watt: 7900.0,
                    consumed_power_watt: 2200.0,
                },
                PowerTier {
                    below_degrees: Some(50.0),
                    heating_power_watt: 7850.0,
                    consumed_power_watt: 2700.0,
                },
                PowerTier {
                    below_degrees: None,
                    heating_power_watt: 7200.0,
                    consumed_power_watt: 3000.0,
                },
            ],
        },
        tank: TankSpec {
            volume_litres: 500.0,
            loss_degrees_per_hour: 0.02189,
            current_temp: 30.0,
            min_temp: 20.0,
            max_temp: 60.0,
            radiator_flow_offset: None,
        },
        indoor: IndoorSpec {
            current_temp: None,
            target_temp: 21.0,
            passive_heating_degrees: 0.1,
        },
        radiator: RadiatorSpec {
            flow_gain: 0.45,
            power_per_degree: 400.0,
        },
        hot_water: HotWaterSpec {
            min_temp: 20.0,
            average_power_watt: 50.0,
        },
        prices: PriceSpec {
            today: vec![
                1.281, 1.208, 1.204, 1.202, 1.256, 1.677, 1.721, 3.232, 3.644, 3.001, 2.653,
                2.385, 2.288, 2.302, 2.048, 2.29, 2.303, 2.787, 2.744, 1.985, 1.818, 1.766,
                1.313, 1.198,
            ],
            tomorrow: None,
        },
        outdoor: (0..24)
            .map(|hour| ForecastPoint {
                time: forecast_time(day, hour),
                temp: f64::from(hour),
            })
            .collect(),
        draw_offs: vec![DrawOff {
            start: forecast_time(day, 22),
            end: forecast_time(day, 23),
            temp: 50.0,
            power_watt: 1000.0,
        }],
    }
}

/// The example day offset by a number of hours
fn forecast_time(day: NaiveDateTime, hours: u32) -> NaiveDateTime {
    day + TimeDelta::hours(i64::from(hours))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_example_parameters_are_valid() {
        example_parameters().validate().unwrap();
    }

    #[test]
    fn test_example_parameters_round_trip() {
        let parameters = example_parameters();
        let json = serde_json::to_string(&parameters).unwrap();
        let parsed: OptimizationParameters = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, parameters);
    }
}
