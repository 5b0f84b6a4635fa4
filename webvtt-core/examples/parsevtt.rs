//! Parse a WebVTT file (or stdin) in fixed-size chunks and print its cues.
//!
//! Usage: cargo run --example parsevtt -- [FILE] [CHUNK_SIZE]
//!
//! Set RUST_LOG=webvtt_core=trace to watch the parser work.

use std::io::Read;
use std::num::NonZeroUsize;
use std::ops::ControlFlow;
use std::path::PathBuf;

use clap::Parser as _;
use tracing_subscriber::EnvFilter;
use webvtt_core::{handler_fn, Parser};

#[derive(clap::Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// WebVTT file to read; stdin when absent or `-`
    file: Option<PathBuf>,

    /// Bytes handed to the parser per feed call
    #[arg(default_value = "4096")]
    chunk_size: NonZeroUsize,
}

fn main() {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let mut input = Vec::new();
    let read = match &args.file {
        Some(path) if path.as_os_str() != "-" => std::fs::read(path).map(|bytes| input = bytes),
        _ => std::io::stdin().read_to_end(&mut input).map(|_| ()),
    };
    if let Err(e) = read {
        let source = args.file.as_deref().map_or("stdin".into(), |p| p.display().to_string());
        eprintln!("cannot read {}: {}", source, e);
        std::process::exit(2);
    }

    let mut parser = Parser::new(handler_fn(
        |cue| {
            if !cue.id.is_empty() {
                println!("{}", cue.id);
            }
            println!("{} --> {}", cue.start, cue.end);
            println!("{}\n", cue.body);
        },
        |diag| {
            eprintln!("{}", diag);
            ControlFlow::Continue(())
        },
    ));

    let mut status = Ok(());
    for chunk in input.chunks(args.chunk_size.get()) {
        status = parser.feed(chunk).map(|_| ());
        if status.is_err() {
            break;
        }
    }
    if status.is_ok() {
        status = parser.finish().map(|_| ());
    }

    eprintln!("{} cues, {} diagnostics", parser.cues_emitted(), parser.diagnostics());
    if let Err(err) = status {
        eprintln!("error: {}", err);
        std::process::exit(1);
    }
}
