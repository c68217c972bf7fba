use std::fmt;
use std::path::{Path, PathBuf};

use clap::{App, Arg, ArgMatches};
use slog::{info, o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use vack::{
    assembly,
    emulator::{self, Emulator, StdIo},
    translator::{self, Prologue, Translator},
    vm,
};

enum Error {
    IO(PathBuf, std::io::Error),
    Parse(PathBuf, String),
    Translate(translator::Error),
    Assembly(assembly::Error),
    Execution(emulator::Error),
    MixedInput,
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(path, err) => write!(f, "{}: {}", path.display(), err),
            Error::Parse(path, err) => write!(f, "{}: {}", path.display(), err),
            Error::Translate(err) => write!(f, "{}", err),
            Error::Assembly(err) => write!(f, "{}", err),
            Error::Execution(err) => write!(f, "{}", err),
            Error::MixedInput => write!(f, "expected either a single .asm file or only .vm files"),
        }
    }
}

impl From<translator::Error> for Error {
    fn from(err: translator::Error) -> Error {
        Error::Translate(err)
    }
}

impl From<assembly::Error> for Error {
    fn from(err: assembly::Error) -> Error {
        Error::Assembly(err)
    }
}

impl From<emulator::Error> for Error {
    fn from(err: emulator::Error) -> Error {
        Error::Execution(err)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("vackrun")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Executes assembly or stack machine programs on the emulator")
        .arg(Arg::with_name("source")
             .help("A single .asm file, or any number of .vm files")
             .value_name("FILE")
             .required(true)
             .multiple(true)
             .index(1))
        .arg(Arg::with_name("test-prologue")
             .help("Translates .vm files with the fixed register test prologue")
             .long("test-prologue")
             .short("t"))
        .arg(Arg::with_name("max-steps")
             .help("Stops with an error if the program has not halted after this many instructions")
             .long("max-steps")
             .takes_value(true)
             .value_name("N"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

fn read(path: &Path) -> Result<String, Error> {
    std::fs::read_to_string(path)
        .map_err(|err| Error::IO(path.to_owned(), err))
}

fn load(sources: &[&Path], prologue: Prologue, logger: &Logger) -> Result<assembly::Rom, Error> {
    let is_vm = |path: &&Path| path.extension().map(|ext| ext == "vm").unwrap_or(false);

    let listing = match sources {
        [path] if !is_vm(path) => {
            let source = read(path)?;

            assembly::Program::parse(&source)
                .map_err(|err| match err {
                    assembly::Error::Parse(err) => Error::Parse(path.to_path_buf(), err.verbose(&source).to_string()),
                    err => Error::Assembly(err),
                })?
        },
        _ if sources.iter().all(is_vm) => {
            let mut translator = Translator::with_logger(prologue, logger.clone());

            for path in sources {
                let program = vm::Program::parse(&read(path)?)
                    .map_err(|err| Error::Parse(path.to_path_buf(), err.to_string()))?;

                let stem = path.file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
                    .unwrap_or_default();

                translator.translate_file(&stem, &program)?;
            }

            translator.finish()
        },
        _ => return Err(Error::MixedInput),
    };

    Ok(listing.resolve()?)
}

fn run(sources: &[&Path], prologue: Prologue, max_steps: Option<u64>, logger: &Logger) -> Result<(), Error> {
    let rom = load(sources, prologue, logger)?;
    let mut emulator = Emulator::with_logger(rom, StdIo, logger.clone());

    match max_steps {
        Some(max_steps) => emulator.run_limited(max_steps)?,
        None => emulator.run()?,
    }

    info!(logger, "halted";
        "steps" => emulator.steps,
        "sp" => emulator.ram(0),
        "top" => emulator.ram((emulator.ram(0) as u16).wrapping_sub(1)));

    Ok(())
}

fn main() {
    let args = parse_arguments();

    let logger = match args.is_present("verbose") {
        true => {
            let decorator = TermDecorator::new().build();
            let drain = FullFormat::new(decorator).build().fuse();
            let drain = slog_async::Async::new(drain).build().fuse();
            Logger::root(drain, o!())
        },
        false => Logger::root(Discard, o!()),
    };

    let prologue = match args.is_present("test-prologue") {
        true => Prologue::Test,
        false => Prologue::Runtime,
    };

    let max_steps = match args.value_of("max-steps").map(str::parse::<u64>) {
        None => None,
        Some(Ok(max_steps)) => Some(max_steps),
        Some(Err(err)) => {
            eprintln!("error: invalid --max-steps: {}", err);
            std::process::exit(1);
        },
    };

    let sources: Vec<&Path> = args.values_of("source")
        .into_iter()
        .flatten()
        .map(Path::new)
        .collect();

    if let Err(err) = run(&sources, prologue, max_steps, &logger) {
        eprintln!("error: {}", err);
        drop(logger);
        std::process::exit(1);
    }
}
