use anyhow::{anyhow, Context, Result};
use church_bridge::config::Limits;
use church_bridge::core_loader;
use church_bridge::runtime::{run_program, RunOptions};
use church_bridge::{trace, Program};
use clap::{value_parser, Arg, ArgAction, ArgMatches, Command};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;
use tracing::info;

fn program_arg() -> Arg {
    Arg::new("program")
        .help("Compiled program (.json)")
        .value_name("PROGRAM")
        .required(true)
        .value_parser(value_parser!(PathBuf))
}

fn cli() -> Command {
    Command::new("church-bridge")
        .about("Runs Church-encoded lambda programs and prints the numerals they show")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(
            Command::new("run")
                .about("Evaluate a program; every `show` prints one decimal line")
                .arg(program_arg())
                .arg(
                    Arg::new("max-steps")
                        .long("max-steps")
                        .help("Machine transitions allowed before giving up [env: CHURCH_MAX_STEPS]")
                        .value_name("N")
                        .value_parser(value_parser!(u64)),
                )
                .arg(
                    Arg::new("max-depth")
                        .long("max-depth")
                        .help("Pending continuation frames allowed before giving up [env: CHURCH_MAX_DEPTH]")
                        .value_name("N")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("max-nesting")
                        .long("max-nesting")
                        .help("Nested runs started by natives such as `show` [env: CHURCH_MAX_NESTING]")
                        .value_name("N")
                        .value_parser(value_parser!(usize)),
                )
                .arg(
                    Arg::new("prelude")
                        .long("prelude")
                        .help("Bind the standard Church constructions before the program")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("inspect")
                .about("Print a summary of a program without running it")
                .arg(program_arg()),
        )
}

fn main() -> ExitCode {
    trace::init();
    match execute(&cli().get_matches()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(matches: &ArgMatches) -> Result<()> {
    match matches.subcommand() {
        Some(("run", args)) => run(args),
        Some(("inspect", args)) => inspect(args),
        Some((other, _)) => Err(anyhow!("unknown command `{}`", other)),
        None => Err(anyhow!("no command given")),
    }
}

fn load(args: &ArgMatches) -> Result<Program> {
    let path = args
        .get_one::<PathBuf>("program")
        .ok_or_else(|| anyhow!("missing program path"))?;
    let started = Instant::now();
    let program = core_loader::load_program(path)
        .with_context(|| format!("failed to load {}", path.display()))?;
    info!(
        phase = "load",
        ms = started.elapsed().as_millis() as u64,
        definitions = program.definitions.len(),
        "phase complete"
    );
    Ok(program)
}

fn run(args: &ArgMatches) -> Result<()> {
    let program = load(args)?;

    let mut limits = Limits::from_env().context("invalid budget in the environment")?;
    if let Some(&max_steps) = args.get_one::<u64>("max-steps") {
        limits = limits.with_max_steps(max_steps);
    }
    if let Some(&max_depth) = args.get_one::<usize>("max-depth") {
        limits = limits.with_max_depth(max_depth);
    }
    if let Some(&max_nesting) = args.get_one::<usize>("max-nesting") {
        limits = limits.with_max_nesting(max_nesting);
    }
    let options = RunOptions {
        limits,
        prelude: args.get_flag("prelude"),
    };

    let started = Instant::now();
    let report = run_program(&program, &options, io::stdout()).context("program failed")?;
    info!(
        phase = "run",
        ms = started.elapsed().as_millis() as u64,
        steps = report.steps,
        shown = report.shown.len(),
        "phase complete"
    );
    Ok(())
}

fn inspect(args: &ArgMatches) -> Result<()> {
    let program = load(args)?;
    print!("{}", program.summary());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        cli().debug_assert();
    }

    #[test]
    fn run_accepts_budgets_and_prelude() {
        let matches = cli()
            .try_get_matches_from([
                "church-bridge",
                "run",
                "prog.json",
                "--max-steps",
                "500",
                "--max-depth",
                "20",
                "--max-nesting",
                "4",
                "--prelude",
            ])
            .unwrap();
        let (name, args) = matches.subcommand().unwrap();
        assert_eq!(name, "run");
        assert_eq!(args.get_one::<u64>("max-steps"), Some(&500));
        assert_eq!(args.get_one::<usize>("max-depth"), Some(&20));
        assert_eq!(args.get_one::<usize>("max-nesting"), Some(&4));
        assert!(args.get_flag("prelude"));
    }

    #[test]
    fn negative_budgets_are_rejected() {
        assert!(cli()
            .try_get_matches_from(["church-bridge", "run", "prog.json", "--max-steps", "-1"])
            .is_err());
    }
}
