use std::io::{self, BufRead, IsTerminal, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use loxvm::diagnostic::{self, ansi::AnsiRenderer, json, registry};
use loxvm::{InterpretError, Vm, VmConfig};

const EXIT_USAGE: u8 = 64;
const EXIT_IO: u8 = 74;

#[derive(Parser, Debug)]
#[command(name = "loxvm", version, about = "Compile and run Lox scripts on a bytecode VM")]
struct Cli {
    /// Script to run. Starts an interactive prompt when omitted.
    path: Option<PathBuf>,

    /// Print the stack and each instruction to stderr while running.
    #[arg(long)]
    trace: bool,

    /// Print the compiled chunk to stderr before running it.
    #[arg(long)]
    print_code: bool,

    /// Compile the script and print its bytecode listing without running it.
    #[arg(long, requires = "path")]
    disassemble: bool,

    /// Report errors as one JSON object per line.
    #[arg(long)]
    json: bool,

    /// Never colour error output.
    #[arg(long)]
    no_color: bool,

    /// Maximum operand stack depth.
    #[arg(long, value_name = "N")]
    max_stack: Option<usize>,

    /// Explain an error code, e.g. LOX-R004, and exit.
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

/// How errors reach stderr: JSON lines, a coloured snippet for terminals,
/// or the plain `[line N] Error ...` form otherwise.
struct Reporter {
    json: bool,
    pretty: bool,
    color: bool,
}

impl Reporter {
    fn from_cli(cli: &Cli) -> Self {
        let terminal = io::stderr().is_terminal();
        Reporter { json: cli.json, pretty: terminal, color: terminal && !cli.no_color }
    }

    fn report(&self, err: &InterpretError, source: &str) {
        if !self.json && !self.pretty {
            eprintln!("{err}");
            return;
        }
        let renderer = AnsiRenderer { use_color: self.color };
        for d in diagnostic::from_interpret_error(err, source) {
            if self.json {
                eprintln!("{}", json::render(&d));
            } else {
                eprint!("{}", renderer.render(&d));
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(code) = &cli.explain {
        return explain(code);
    }

    let mut config = VmConfig::new().with_trace(cli.trace).with_print_code(cli.print_code);
    if let Some(max_stack) = cli.max_stack {
        config = config.with_max_stack(max_stack);
    }
    let reporter = Reporter::from_cli(&cli);
    let mut vm = Vm::new(config);

    match &cli.path {
        Some(path) => run_file(&mut vm, path, cli.disassemble, &reporter),
        None => repl(&mut vm, &reporter),
    }
}

fn explain(code: &str) -> ExitCode {
    match registry::lookup(&code.to_ascii_uppercase()) {
        Some(entry) => {
            print!("{}", entry.long);
            ExitCode::SUCCESS
        }
        None => {
            eprintln!("error: unknown error code '{code}'");
            ExitCode::from(EXIT_USAGE)
        }
    }
}

fn run_file(vm: &mut Vm, path: &Path, disassemble: bool, reporter: &Reporter) -> ExitCode {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not read file \"{}\": {e}", path.display());
            return ExitCode::from(EXIT_IO);
        }
    };

    let result = if disassemble {
        let name = path.display().to_string();
        vm.disassemble(&source, &name).map(|listing| print!("{listing}"))
    } else {
        vm.interpret(&source)
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            reporter.report(&err, &source);
            ExitCode::from(err.exit_code() as u8)
        }
    }
}

/// Read-eval-print loop: one `interpret` per line, globals carry over,
/// errors are reported and the loop continues. Ends cleanly at EOF.
fn repl(vm: &mut Vm, reporter: &Reporter) -> ExitCode {
    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut line = String::new();

    loop {
        print!("> ");
        if io::stdout().flush().is_err() {
            return ExitCode::from(EXIT_IO);
        }

        line.clear();
        match input.read_line(&mut line) {
            Ok(0) => {
                println!();
                return ExitCode::SUCCESS;
            }
            Ok(_) => {
                if let Err(err) = vm.interpret(&line) {
                    reporter.report(&err, &line);
                }
            }
            Err(e) => {
                eprintln!("error: could not read input: {e}");
                return ExitCode::from(EXIT_IO);
            }
        }
    }
}
