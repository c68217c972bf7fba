use std::fmt;
use std::path::{Path, PathBuf};

use clap::{App, Arg, ArgMatches};
use slog::{info, o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use vack::{
    translator::{self, Prologue, Translator},
    vm,
};

enum Error {
    IO(PathBuf, std::io::Error),
    Parse(PathBuf, vm::Error),
    Translate(translator::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(path, err) => write!(f, "{}: {}", path.display(), err),
            Error::Parse(path, err) => write!(f, "{}: {}", path.display(), err),
            Error::Translate(err) => write!(f, "{}", err),
        }
    }
}

impl From<translator::Error> for Error {
    fn from(err: translator::Error) -> Error {
        Error::Translate(err)
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("vacktrans")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Translates stack machine programs into assembly")
        .arg(Arg::with_name("source")
             .help("Stack machine program files")
             .value_name("VM")
             .required(true)
             .multiple(true)
             .index(1))
        .arg(Arg::with_name("test-prologue")
             .help("Initializes the segment registers to fixed addresses instead of calling Sys.init")
             .long("test-prologue")
             .short("t"))
        .arg(Arg::with_name("output")
             .help("Output file, defaults to the first input with an .asm extension")
             .long("output")
             .short("o")
             .takes_value(true)
             .value_name("FILE"))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

/// Reads and translates the given files, returning the assembly listing.
fn translate_files<'a, I>(sources: I, prologue: Prologue, logger: &Logger) -> Result<String, Error>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut translator = Translator::with_logger(prologue, logger.clone());

    for path in sources {
        let source = std::fs::read_to_string(path)
            .map_err(|err| Error::IO(path.to_owned(), err))?;

        let program = vm::Program::parse(&source)
            .map_err(|err| Error::Parse(path.to_owned(), err))?;

        let stem = path.file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        translator.translate_file(&stem, &program)?;
    }

    Ok(translator.finish().to_string())
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

    let sources: Vec<&Path> = args.values_of("source")
        .into_iter()
        .flatten()
        .map(Path::new)
        .collect();

    let output = match args.value_of("output") {
        Some(output) => PathBuf::from(output),
        None => sources[0].with_extension("asm"),
    };

    let result = translate_files(sources.iter().cloned(), prologue, &logger)
        .and_then(|assembly| {
            std::fs::write(&output, assembly)
                .map_err(|err| Error::IO(output.clone(), err))
        });

    match result {
        Ok(()) => info!(logger, "translated"; "output" => output.display().to_string()),
        Err(err) => {
            eprintln!("error: {}", err);
            drop(logger);
            std::process::exit(1);
        },
    }
}
