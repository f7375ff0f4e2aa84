use std::io::{IsTerminal, Read, Write};
use std::process;

use clap::Parser;
use jim::diagnostic::{Diagnostic, ansi::AnsiRenderer, json};
use jim::{Code, Config, EvalResult, Exception, Interp, Obj};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "jim", version, about = "Run a jim script from a file, the command line or stdin")]
struct Cli {
    /// Evaluate SCRIPT and print its result
    #[arg(short = 'e', value_name = "SCRIPT")]
    script: Option<String>,

    /// Report an uncaught error as a single JSON object
    #[arg(long)]
    json: bool,

    /// Maximum nesting depth of procedure calls
    #[arg(long, value_name = "N")]
    max_depth: Option<usize>,

    /// Seed for `rand` and `expr {rand()}`
    #[arg(long, value_name = "N")]
    seed: Option<u64>,

    /// Script file followed by its arguments (only arguments with -e)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "FILE ARGS")]
    args: Vec<String>,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let mut config = Config::default();
    if let Some(depth) = cli.max_depth {
        config = config.max_call_depth(depth);
    }
    if let Some(seed) = cli.seed {
        config = config.rand_seed(seed);
    }
    let mut interp = Interp::with_config(config);
    interp.create_command("puts", puts);

    let result = match &cli.script {
        Some(script) => {
            let argv0 = std::env::args().next().unwrap_or_else(|| "jim".to_string());
            set_args(&mut interp, &argv0, &cli.args).and_then(|()| interp.eval(script))
        }
        None => match cli.args.split_first() {
            Some((file, rest)) => set_args(&mut interp, file, rest).and_then(|()| interp.eval_file(file)),
            None => set_args(&mut interp, "jim", &[]).and_then(|()| {
                let mut text = String::new();
                std::io::stdin()
                    .read_to_string(&mut text)
                    .map_err(|e| Exception::error(format!("couldn't read stdin: {e}")))?;
                interp.eval(&text)
            }),
        },
    };

    let code = report(&interp, result, cli.script.is_some(), cli.json);
    let _ = std::io::stdout().flush();
    process::exit(code);
}

fn init_tracing() {
    if std::env::var_os("RUST_LOG").is_none() {
        return;
    }
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
}

fn set_args(interp: &mut Interp, argv0: &str, args: &[String]) -> EvalResult<()> {
    interp.set_global_var("argv0", argv0)?;
    interp.set_global_var("argv", Obj::from_list(args.iter().map(Obj::from).collect()))?;
    interp.set_global_var("argc", Obj::from_int(args.len() as i64))
}

/// Prints the outcome and returns the process exit status.
fn report(interp: &Interp, result: EvalResult, print: bool, as_json: bool) -> i32 {
    let value = match result {
        Ok(v) => v,
        Err(e) if e.code == Code::Return => e.value,
        Err(e) if e.code == Code::Exit => return interp.exit_code(),
        Err(e) => {
            let d = Diagnostic::from_exception(interp, &e);
            if as_json {
                eprintln!("{}", json::render(&d));
            } else {
                let renderer = AnsiRenderer { use_color: std::io::stderr().is_terminal() };
                eprint!("{}", renderer.render(&d));
            }
            return 1;
        }
    };
    if print && !value.is_empty() {
        println!("{value}");
    }
    0
}

/// `puts ?-nonewline? ?stdout|stderr? string`
fn puts(_interp: &mut Interp, argv: &[Obj]) -> EvalResult {
    let mut words = &argv[1..];
    let mut newline = true;
    if words.len() > 1 && words[0].as_str() == "-nonewline" {
        newline = false;
        words = &words[1..];
    }
    let (channel, text) = match words {
        [text] => ("stdout", text),
        [channel, text] => (channel.as_str(), text),
        _ => return Err(Exception::wrong_args(&argv[..1], "?-nonewline? ?channel? string")),
    };
    let written = match channel {
        "stdout" => write_text(&mut std::io::stdout().lock(), text, newline),
        "stderr" => write_text(&mut std::io::stderr().lock(), text, newline),
        other => return Err(Exception::error(format!("can not find channel named \"{other}\""))),
    };
    written.map_err(|e| Exception::error(format!("error writing \"{channel}\": {e}")))?;
    Ok(Obj::empty())
}

fn write_text(out: &mut impl Write, text: &Obj, newline: bool) -> std::io::Result<()> {
    if newline { writeln!(out, "{text}") } else { write!(out, "{text}") }
}
