use std::path::PathBuf;

use clap::Parser as _;
use codesnake::{Block, CodeWidth, Label, LineIndex};
use lambdac::{
    compile_program,
    lexer::{Span, Token, TokenKind},
    Parser, Program, Scanner, SyntaxError,
};
use tracing_subscriber::EnvFilter;
use yansi::Paint;

/// Parse and compile lambda calculus, either from a file or line by line.
#[derive(clap::Parser, Debug)]
#[command(version)]
struct Args {
    /// Source file to compile; starts an interactive session when left out (where `:symbols`
    /// lists the bindings made so far)
    file: Option<PathBuf>,
    /// Show the token stream of every input
    #[arg(long)]
    tokens: bool,
    /// Log what the parser and compiler do (filtered by RUST_LOG)
    #[arg(long)]
    trace: bool,
}

/// Zero-width spans (end of input) are widened to the last character so they can be labelled.
fn visible(span: &Span) -> Span {
    if span.is_empty() {
        span.start.saturating_sub(1)..span.end
    } else {
        span.clone()
    }
}

fn make_block<'a>(
    idx: &'a LineIndex,
    labels: impl IntoIterator<Item = (Span, String, bool)>,
) -> Option<Block<&'a str, String>> {
    Block::new(
        idx,
        labels.into_iter().map(|(range, text, ok)| {
            Label::new(range)
                .with_text(if ok {
                    text.green().to_string()
                } else {
                    text.red().to_string()
                })
                .with_style(move |s| {
                    if ok {
                        s.blue().to_string()
                    } else {
                        s.red().to_string()
                    }
                })
        }),
    )
}

fn print_block(name: &str, block: Block<&str, String>) {
    let block = block.map_code(|c| CodeWidth::new(c, c.len()));
    println!("{}[{name}]", block.prologue());
    print!("{block}");
    println!("{}", block.epilogue());
}

fn show_tokens(name: &str, src: &str) {
    let idx = LineIndex::new(src);
    let mut lines: Vec<Vec<Token>> = vec![];
    for token in Scanner::new(src).filter(|token| token.kind != TokenKind::EndOfInput) {
        match lines.last_mut() {
            Some(line) if line.first().is_some_and(|first| first.line == token.line) => {
                line.push(token)
            }
            _ => lines.push(vec![token]),
        }
    }
    for line in lines {
        let block = make_block(
            &idx,
            line.into_iter().map(|token| {
                let ok = token.kind != TokenKind::Error;
                (token.span, token.kind.to_string(), ok)
            }),
        );
        if let Some(block) = block {
            print_block(name, block);
        }
    }
}

fn show_errors(name: &str, src: &str, errors: &[SyntaxError]) {
    let idx = LineIndex::new(src);
    for error in errors {
        match make_block(&idx, [(visible(&error.span), error.to_string(), false)]) {
            Some(block) => print_block(name, block),
            None => println!("{}", error.red()),
        }
    }
}

/// Every global binding, in the order the names were first declared.
fn show_symbols(program: &Program) {
    for (name, value) in program.symbols.iter() {
        println!("{} = {}", name.blue(), program.expressions.display(value));
    }
}

/// Output already shown for the session's program, so each input only prints what it added.
#[derive(Default)]
struct Shown {
    instructions: usize,
    bytecode: usize,
}

fn run(
    name: &str,
    src: &str,
    program: &mut Program,
    shown: &mut Shown,
    tokens: bool,
) -> anyhow::Result<()> {
    if tokens {
        show_tokens(name, src);
    }

    let mut parser = Parser::resume(Scanner::new(src), program.clone());
    match parser.parse() {
        Ok(true) => {}
        Ok(false) => {
            show_errors(name, src, parser.errors());
            return Ok(());
        }
        Err(err) => {
            println!("{}", format!("parse aborted: {err}").red());
            return Ok(());
        }
    }

    let parsed = parser.finish();
    let listing = compile_program(&parsed)?.disassemble()?;
    *program = parsed;
    tracing::debug!(
        instructions = program.instructions.len(),
        symbols = program.symbols.len(),
        "program extended"
    );

    for line in program.dump().lines().skip(shown.instructions) {
        println!("{}", line.cyan());
    }
    for line in listing.lines().skip(shown.bytecode) {
        println!("{}", line.yellow());
    }
    shown.instructions = program.instructions.len();
    shown.bytecode = listing.lines().count();
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.trace {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("lambdac=trace")),
            )
            .with_writer(std::io::stderr)
            .init();
    }

    let mut program = Program::new();
    let mut shown = Shown::default();

    if let Some(path) = &args.file {
        let src = std::fs::read_to_string(path)?;
        let name = path.display().to_string();
        run(&name, &src, &mut program, &mut shown, args.tokens)?;
        show_symbols(&program);
        return Ok(());
    }

    let mut readline = rustyline::DefaultEditor::new()?;
    while let Ok(input) = readline.readline("λ> ") {
        if input.trim().is_empty() {
            continue;
        }
        _ = readline.add_history_entry(input.as_str());
        if input.trim() == ":symbols" {
            show_symbols(&program);
            continue;
        }
        if let Err(err) = run("input", &input, &mut program, &mut shown, args.tokens) {
            println!("{}", err.red());
        }
    }

    Ok(())
}
