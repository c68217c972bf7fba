use std::fmt;
use std::path::{Path, PathBuf};

use clap::{App, Arg, ArgMatches};
use slog::{info, o, Discard, Drain, Logger};
use slog_term::{FullFormat, TermDecorator};

use vack::{
    compiler,
    jack::{self, xml, Class},
    parsing::LineLocation,
};

enum Error {
    IO(PathBuf, std::io::Error),
    Parse(PathBuf, LineLocation, jack::ParseError),
    Compile(PathBuf, compiler::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::IO(path, err) => write!(f, "{}: {}", path.display(), err),
            Error::Parse(path, location, err) => write!(f, "{}:{}: {}", path.display(), location, err),
            Error::Compile(path, err) => write!(f, "{}: {}", path.display(), err),
        }
    }
}

fn parse_arguments() -> ArgMatches<'static> {
    App::new("vackc")
        .version(env!("CARGO_PKG_VERSION"))
        .author("Mitja Karhusaari <mitja@karhusaari.me>")
        .about("Compiles class sources into stack machine code")
        .arg(Arg::with_name("source")
             .help("Class source files")
             .value_name("SOURCE")
             .required(true)
             .multiple(true)
             .index(1))
        .arg(Arg::with_name("verbose")
             .help("Enables verbose logging")
             .long("verbose")
             .short("v"))
        .get_matches()
}

fn output_path(source: &Path, suffix: &str, extension: &str) -> PathBuf {
    let stem = source.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default();

    source.with_file_name(format!("{}{}.{}", stem, suffix, extension))
}

fn write(path: PathBuf, contents: String) -> Result<(), Error> {
    std::fs::write(&path, contents)
        .map_err(|err| Error::IO(path, err))
}

fn compile_file(path: &Path, logger: &Logger) -> Result<(), Error> {
    let source = std::fs::read_to_string(path)
        .map_err(|err| Error::IO(path.to_owned(), err))?;

    let tokens = jack::tokenize(&source);
    write(output_path(path, "T", "xml"), xml::tokens_to_xml(&tokens))?;

    let class = jack::parser::parse_tokens(&tokens)
        .map_err(|err| {
            let offset = err.span().map(|span| span.start).unwrap_or(source.len());
            Error::Parse(path.to_owned(), LineLocation::of(&source, offset), err)
        })?;

    write(output_path(path, "", "xml"), xml::class_to_xml(&class))?;

    let program = compile_class(&class, path, logger)?;
    write(output_path(path, "", "vm"), program.to_string())?;

    info!(logger, "compiled"; "source" => path.display().to_string(), "commands" => program.len());

    Ok(())
}

fn compile_class(class: &Class, path: &Path, logger: &Logger) -> Result<vack::vm::Program, Error> {
    compiler::compile_with_logger(class, logger.clone())
        .map_err(|err| Error::Compile(path.to_owned(), err))
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

    let sources = args.values_of("source").into_iter().flatten();

    for source in sources {
        if let Err(err) = compile_file(Path::new(source), &logger) {
            eprintln!("error: {}", err);
            drop(logger);
            std::process::exit(1);
        }
    }
}
