use std::io::{self, Read};
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use thiserror::Error;

use crate::api::{
    ApiError, PlanPayload, compare_request, parse_payload, plan_request, run_http_server,
    solve_request,
};
use crate::config::AppConfig;
use crate::core::{ExtraPaymentSolveConfig, MAX_SOLVER_ITERATIONS, PlanMonth};

#[derive(Parser, Debug)]
#[command(
    name = "payoff",
    about = "Debt repayment planner (snowball and avalanche amortization schedules)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Serve(ServeArgs),
    Plan(RequestArgs),
    Compare(RequestArgs),
    Solve(SolveArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[arg(long, env = "PAYOFF_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
    #[arg(long, env = "PAYOFF_PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(
        long,
        env = "PAYOFF_START_MONTH",
        help = "Pin the first schedule month (YYYY-MM); defaults to the current month"
    )]
    pub start_month: Option<PlanMonth>,
    #[arg(long, default_value_t = 10_000.0, help = "Default upper bound for solve requests")]
    pub search_max: f64,
    #[arg(long, default_value_t = 1.0, help = "Default solver tolerance in currency units")]
    pub tolerance: f64,
    #[arg(long, default_value_t = 40)]
    pub max_iterations: u32,
}

#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    #[arg(long, help = "JSON request file; reads stdin when omitted")]
    pub input: Option<PathBuf>,
    #[arg(long, help = "First schedule month (YYYY-MM) when the request has none")]
    pub start_month: Option<PlanMonth>,
}

#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    #[command(flatten)]
    pub request: RequestArgs,
    #[arg(long)]
    pub target_months: Option<u32>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    InvalidArgs(String),
    #[error("failed to read {source_name}: {source}")]
    Input {
        source_name: String,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
    #[error("server error: {0}")]
    Server(#[source] io::Error),
}

pub async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Command::Serve(args) => {
            let config = build_config(&args).map_err(CliError::InvalidArgs)?;
            run_http_server(config).await.map_err(CliError::Server)
        }
        Command::Plan(args) => {
            let (payload, config) = load_request(&args)?;
            print_json(&plan_request(payload, &config)?)
        }
        Command::Compare(args) => {
            let (payload, config) = load_request(&args)?;
            print_json(&compare_request(payload, &config)?)
        }
        Command::Solve(args) => {
            let (mut payload, config) = load_request(&args.request)?;
            if let Some(months) = args.target_months {
                payload.set_target_months(months);
            }
            print_json(&solve_request(payload, &config)?)
        }
    }
}

pub fn build_config(args: &ServeArgs) -> Result<AppConfig, String> {
    if !args.search_max.is_finite() || args.search_max <= 0.0 {
        return Err("--search-max must be > 0".to_string());
    }
    if !args.tolerance.is_finite() || args.tolerance <= 0.0 {
        return Err("--tolerance must be > 0".to_string());
    }
    if args.max_iterations == 0 || args.max_iterations > MAX_SOLVER_ITERATIONS {
        return Err(format!(
            "--max-iterations must be between 1 and {MAX_SOLVER_ITERATIONS}"
        ));
    }

    Ok(AppConfig {
        addr: SocketAddr::new(args.host, args.port),
        start_month: args.start_month,
        solver: ExtraPaymentSolveConfig {
            search_max: args.search_max,
            tolerance: args.tolerance,
            max_iterations: args.max_iterations,
            ..ExtraPaymentSolveConfig::default()
        },
    })
}

fn load_request(args: &RequestArgs) -> Result<(PlanPayload, AppConfig), CliError> {
    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path).map_err(|source| CliError::Input {
            source_name: path.display().to_string(),
            source,
        })?,
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .map_err(|source| CliError::Input {
                    source_name: "stdin".to_string(),
                    source,
                })?;
            buf
        }
    };

    let payload = parse_payload(&raw)?;
    let config = AppConfig {
        start_month: args.start_month,
        ..AppConfig::default()
    };
    Ok((payload, config))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), CliError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).expect("args should parse")
    }

    fn serve_args() -> ServeArgs {
        match parse(&["payoff", "serve"]).command {
            Command::Serve(args) => args,
            other => panic!("expected serve, got {other:?}"),
        }
    }

    #[test]
    fn serve_defaults_build_config() {
        let args = serve_args();
        let config = build_config(&args).expect("valid config");
        assert_eq!(config.addr.port(), args.port);
        assert_eq!(config.solver.search_max, args.search_max);
        assert_eq!(config.solver.target_months, ExtraPaymentSolveConfig::default().target_months);
    }

    #[test]
    fn serve_accepts_explicit_flags() {
        let cli = parse(&[
            "payoff",
            "serve",
            "--host",
            "127.0.0.1",
            "--port",
            "9090",
            "--start-month",
            "2025-03",
        ]);
        let Command::Serve(args) = cli.command else {
            panic!("expected serve");
        };
        let config = build_config(&args).expect("valid config");
        assert_eq!(config.addr.to_string(), "127.0.0.1:9090");
        assert_eq!(config.start_month, PlanMonth::new(2025, 3));
    }

    #[test]
    fn build_config_rejects_bad_solver_defaults() {
        let mut args = serve_args();
        args.tolerance = 0.0;
        let err = build_config(&args).expect_err("must reject");
        assert!(err.contains("--tolerance"));

        for iterations in [0, MAX_SOLVER_ITERATIONS + 1] {
            let mut args = serve_args();
            args.max_iterations = iterations;
            let err = build_config(&args).expect_err("must reject");
            assert!(err.contains("--max-iterations"));
        }
    }

    #[test]
    fn rejects_malformed_start_month() {
        assert!(Cli::try_parse_from(["payoff", "plan", "--start-month", "2025-13"]).is_err());
    }

    #[test]
    fn solve_subcommand_parses_target() {
        let cli = parse(&[
            "payoff",
            "solve",
            "--input",
            "debts.json",
            "--target-months",
            "24",
        ]);
        let Command::Solve(args) = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(args.target_months, Some(24));
        assert_eq!(args.request.input, Some(PathBuf::from("debts.json")));
    }

    #[test]
    fn load_request_reports_missing_file() {
        let args = RequestArgs {
            input: Some(PathBuf::from("/nonexistent/payoff-request.json")),
            start_month: None,
        };
        let err = load_request(&args).expect_err("must fail");
        assert!(err.to_string().contains("payoff-request.json"));
    }
}
