//! Command-line evaluator
//!
//! Reads one formula line from standard input, seeds any `name=re[,im]`
//! values given on the command line, and prints the evaluated result.
//! With `--compile` the formula runs through the JIT instead of the
//! interpreter.

use std::io::{self, BufRead};
use std::process::ExitCode;

use clap::Parser;

use fractal_formula::{create_formula, Complex, Options, Section};

#[derive(Debug, Parser)]
#[command(name = "ffc", about = "Evaluate a fractal formula from stdin")]
struct Args {
    /// JIT-compile the formula instead of interpreting it
    #[arg(long)]
    compile: bool,

    /// Initial symbol values, as name=re or name=re,im
    #[arg(value_name = "NAME=RE[,IM]")]
    values: Vec<String>,
}

fn parse_value(input: &str) -> Option<(String, Complex)> {
    let (name, value) = input.split_once('=')?;
    let (re, im) = match value.split_once(',') {
        Some((re, im)) => (re.parse().ok()?, im.parse().ok()?),
        None => (value.parse().ok()?, 0.0),
    };
    Some((name.to_string(), Complex::new(re, im)))
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut values = Vec::new();
    for value in &args.values {
        match parse_value(value) {
            Some(parsed) => values.push(parsed),
            None => {
                eprintln!("invalid value '{value}', expected name=re[,im]");
                return ExitCode::FAILURE;
            }
        }
    }

    println!("Enter an expression:");
    let mut line = String::new();
    if let Err(err) = io::stdin().lock().read_line(&mut line) {
        eprintln!("failed to read input: {err}");
        return ExitCode::FAILURE;
    }

    let options = Options {
        allow_builtin_assignment: true,
        recognize_extensions: false,
    };
    let Some(mut formula) = create_formula(line.trim_end(), &options) else {
        eprintln!("error: invalid formula");
        return ExitCode::FAILURE;
    };
    for (name, value) in values {
        formula.set_value(&name, value);
    }

    // a one-line expression parses into the bailout slot
    let result = if args.compile {
        formula
            .compile()
            .and_then(|()| formula.run(Section::Bailout))
    } else {
        formula.interpret(Section::Bailout)
    };

    match result {
        Ok(value) => {
            println!("Evaluated: {value}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
