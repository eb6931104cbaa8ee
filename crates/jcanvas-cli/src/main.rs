use jcanvas::render::{Conversion, Converter, HeadlessError};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

const LOG_ENV: &str = "JCANVAS_LOG";
const DEFAULT_LOG_FILTER: &str = "warn,jcanvas_render=error";
const DEFAULT_MARGIN: u32 = 50;

#[derive(Debug)]
enum CliError {
    Usage(&'static str),
    Io(std::io::Error),
    Canvas(HeadlessError),
    RootDir(PathBuf),
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CliError::Usage(msg) => write!(f, "{msg}"),
            CliError::Io(err) => write!(f, "I/O error: {err}"),
            CliError::Canvas(err) => write!(f, "{err}"),
            CliError::RootDir(path) => {
                write!(f, "root directory does not exist: {}", path.display())
            }
        }
    }
}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<HeadlessError> for CliError {
    fn from(value: HeadlessError) -> Self {
        Self::Canvas(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Command {
    #[default]
    Convert,
    Manifest,
    Validate,
}

#[derive(Debug, Default)]
struct Args {
    command: Command,
    input: Option<String>,
    output: Option<String>,
    root_dir: Option<PathBuf>,
    margin: u32,
    title: Option<String>,
    pretty: bool,
    sequential: bool,
    quiet: bool,
    static_html: bool,
}

fn usage() -> &'static str {
    "jcanvas-cli\n\
\n\
USAGE:\n\
  jcanvas-cli [convert] [--root-dir <dir>] [--margin <n>] [--title <text>] [--static] [--sequential] [--quiet] [--out <path>|-] <input>|- [<output>]\n\
  jcanvas-cli manifest [--root-dir <dir>] [--margin <n>] [--pretty] [--sequential] [--quiet] [--out <path>] <input>|-\n\
  jcanvas-cli validate [--quiet] <input>|-\n\
\n\
NOTES:\n\
  - '-' reads the canvas from stdin; assets are then resolved against the working directory.\n\
  - convert writes <input>.html next to the input by default (./out.html for stdin); '--out -' prints to stdout.\n\
  - convert embeds a pan/zoom viewer (inline script); --static leaves it out.\n\
  - manifest prints the render manifest JSON to stdout unless --out is given.\n\
  - Missing files are reported as warnings and do not change the exit code.\n\
  - Set JCANVAS_LOG (e.g. JCANVAS_LOG=debug) to control diagnostics on stderr.\n\
"
}

fn parse_args(argv: &[String]) -> Result<Args, CliError> {
    let mut args = Args {
        command: Command::Convert,
        margin: DEFAULT_MARGIN,
        ..Default::default()
    };
    let mut positional: Vec<String> = Vec::new();

    let mut it = argv.iter().skip(1);
    while let Some(a) = it.next() {
        match a.as_str() {
            "--help" | "-h" => return Err(CliError::Usage(usage())),
            "convert" if positional.is_empty() => args.command = Command::Convert,
            "manifest" if positional.is_empty() => args.command = Command::Manifest,
            "validate" if positional.is_empty() => args.command = Command::Validate,
            "--pretty" => args.pretty = true,
            "--sequential" => args.sequential = true,
            "--static" => args.static_html = true,
            "--quiet" | "-q" => args.quiet = true,
            "--root-dir" | "-r" => {
                let Some(dir) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.root_dir = Some(PathBuf::from(dir));
            }
            "--margin" => {
                let Some(margin) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.margin = margin.parse::<u32>().map_err(|_| CliError::Usage(usage()))?;
            }
            "--title" => {
                let Some(title) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.title = Some(title.clone());
            }
            "--out" | "-o" => {
                let Some(out) = it.next() else {
                    return Err(CliError::Usage(usage()));
                };
                args.output = Some(out.clone());
            }
            "--" => positional.extend(it.by_ref().cloned()),
            "-" => positional.push(a.clone()),
            other if other.starts_with('-') => return Err(CliError::Usage(usage())),
            path => positional.push(path.to_string()),
        }
    }

    let mut positional = positional.into_iter();
    args.input = positional.next();
    if let Some(output) = positional.next() {
        if args.command != Command::Convert || args.output.is_some() {
            return Err(CliError::Usage(usage()));
        }
        args.output = Some(output);
    }
    if positional.next().is_some() || args.input.is_none() {
        return Err(CliError::Usage(usage()));
    }

    Ok(args)
}

fn init_tracing(quiet: bool) {
    let default = if quiet { "error" } else { DEFAULT_LOG_FILTER };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .try_init();
}

fn is_stdin(input: &str) -> bool {
    input == "-"
}

fn read_stdin() -> Result<String, CliError> {
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    Ok(buf)
}

fn default_html_out_path(input: &str) -> PathBuf {
    if is_stdin(input) {
        PathBuf::from("out.html")
    } else {
        Path::new(input).with_extension("html")
    }
}

fn write_text(text: &str, out: Option<&Path>) -> Result<(), CliError> {
    match out {
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(text.as_bytes())?;
            stdout.flush()?;
            Ok(())
        }
        Some(path) => {
            std::fs::write(path, text)?;
            Ok(())
        }
    }
}

fn build_converter(args: &Args) -> Result<Converter, CliError> {
    let mut converter = Converter::new()
        .with_margin(args.margin)
        .with_interactive(!args.static_html);
    converter.options.parallel_assets = !args.sequential;
    if let Some(dir) = &args.root_dir {
        if !dir.is_dir() {
            return Err(CliError::RootDir(dir.clone()));
        }
        converter = converter.with_root_dir(dir);
    }
    if let Some(title) = &args.title {
        converter = converter.with_title(title.as_str());
    }
    Ok(converter)
}

fn convert_input(converter: &Converter, input: &str) -> Result<Conversion, CliError> {
    if is_stdin(input) {
        let text = read_stdin()?;
        Ok(converter.convert_str(&text)?)
    } else {
        Ok(converter.convert_file(input)?)
    }
}

fn report_warnings(conversion: &Conversion, quiet: bool) {
    if quiet || conversion.warnings.is_empty() {
        return;
    }
    eprintln!(
        "warning: {} referenced file(s) could not be found:",
        conversion.warnings.len()
    );
    for warning in &conversion.warnings {
        eprintln!("  - {warning}");
    }
}

fn run(args: Args) -> Result<(), CliError> {
    let input = args.input.clone().ok_or(CliError::Usage(usage()))?;

    match args.command {
        Command::Validate => {
            let text = if is_stdin(&input) {
                read_stdin()?
            } else {
                std::fs::read_to_string(&input)?
            };
            let canvas = Converter::new().validate_str(&text)?;
            if !args.quiet {
                println!(
                    "valid: {} node(s), {} edge(s)",
                    canvas.nodes.len(),
                    canvas.edges.len()
                );
            }
            Ok(())
        }
        Command::Manifest => {
            let converter = build_converter(&args)?;
            let conversion = convert_input(&converter, &input)?;
            report_warnings(&conversion, args.quiet);
            let mut json = conversion
                .manifest
                .to_json(args.pretty)
                .map_err(HeadlessError::from)?;
            json.push('\n');
            let out = args.output.as_deref().filter(|o| !is_stdin(o)).map(Path::new);
            write_text(&json, out)
        }
        Command::Convert => {
            let converter = build_converter(&args)?;
            let conversion = convert_input(&converter, &input)?;
            report_warnings(&conversion, args.quiet);
            let html = converter.render_html(&conversion);

            let out = match args.output.as_deref() {
                Some(o) if is_stdin(o) => None,
                Some(o) => Some(PathBuf::from(o)),
                None => Some(default_html_out_path(&input)),
            };
            write_text(&html, out.as_deref())?;
            if let Some(path) = &out {
                tracing::info!(
                    out = %path.display(),
                    nodes = conversion.manifest.nodes.len(),
                    "wrote HTML"
                );
            }
            Ok(())
        }
    }
}

fn main() {
    let args = match parse_args(&std::env::args().collect::<Vec<_>>()) {
        Ok(v) => v,
        Err(CliError::Usage(msg)) => {
            eprintln!("{msg}");
            std::process::exit(2);
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    };
    init_tracing(args.quiet);

    if let Err(err) = run(args) {
        match err {
            CliError::Usage(msg) => {
                eprintln!("{msg}");
                std::process::exit(2);
            }
            err => {
                eprintln!("error: {err}");
                std::process::exit(1);
            }
        }
    }
}
