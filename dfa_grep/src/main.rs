use dfa_regex::{Regex, RegexError};
use log::LevelFilter;
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::borrow::Cow;
use std::env;
use std::io::{self, BufRead, Write};
use std::process::exit;

const USAGE: &str = "usage: dfa_grep [--dump] [--debug] [--] <pattern>";

const EXIT_MATCHED: i32 = 0;
const EXIT_NO_MATCH: i32 = 1;
const EXIT_ERROR: i32 = 2;

#[derive(Debug, PartialEq)]
struct Options {
    dump: bool,
    debug: bool,
    pattern: String,
}

fn parse_args(args: &[String]) -> Result<Options, String> {
    let mut dump = false;
    let mut debug = false;
    let mut pattern = None;
    let mut options_done = false;

    for arg in args {
        match arg.as_str() {
            "--dump" if !options_done => dump = true,
            "--debug" if !options_done => debug = true,
            "--" if !options_done => options_done = true,
            flag if !options_done && flag.starts_with("--") => {
                return Err(format!("unknown option '{flag}'"));
            }
            _ if pattern.is_some() => return Err("the program takes exactly one pattern".to_string()),
            _ => pattern = Some(arg.clone()),
        }
    }

    let pattern = pattern.ok_or_else(|| "missing pattern".to_string())?;
    Ok(Options { dump, debug, pattern })
}

/// Message followed by the pattern, with a caret under the offending character when known.
pub fn format_regex_error(error: &RegexError, pattern: &str) -> String {
    let mut message = format!("error: {error}\n");
    message.push_str(&format!("  {pattern}\n"));
    if let Some(position) = error.position() {
        message.push_str(&format!("  {}^\n", " ".repeat(position)));
    }
    message
}

fn setup_logging(debug: bool) {
    let level = if debug { LevelFilter::Debug } else { LevelFilter::Warn };

    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{l} {M} {m}{n}")))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(level));

    match config {
        Ok(config) => {
            if let Err(err) = log4rs::init_config(config) {
                eprintln!("Can't set up logging: {err}");
            }
        }
        Err(err) => eprintln!("Can't set up logging: {err}"),
    }
}

fn dump(regex: &Regex) -> io::Result<()> {
    let mut out = io::stdout().lock();
    writeln!(out, "#states: {}", regex.state_count())?;
    writeln!(out, "{regex}")
}

/// Copies every line of `input` matched as a whole to `out`, returns whether
/// any was. Lines that are not valid UTF-8 are matched on their lossy decoding
/// and printed as they came.
fn filter_lines(regex: &Regex, input: impl BufRead, mut out: impl Write) -> io::Result<bool> {
    let mut matched = 0usize;
    let mut total = 0usize;

    for line in input.split(b'\n') {
        let mut line = line?;
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        total += 1;

        let decoded = String::from_utf8_lossy(&line);
        if matches!(decoded, Cow::Owned(_)) {
            log::warn!("line {total} is not valid UTF-8");
        }
        if regex.matches(&decoded) {
            matched += 1;
            out.write_all(&line)?;
            out.write_all(b"\n")?;
        }
    }

    log::debug!("{matched} of {total} lines matched");
    Ok(matched > 0)
}

fn main() {
    let args: Vec<String> = env::args().skip(1).collect();
    let options = match parse_args(&args) {
        Ok(options) => options,
        Err(msg) => {
            eprintln!("{msg}\n{USAGE}");
            exit(EXIT_ERROR);
        }
    };
    setup_logging(options.debug);

    let regex = match Regex::new(&options.pattern) {
        Ok(regex) => regex,
        Err(err) => {
            eprint!("{}", format_regex_error(&err, &options.pattern));
            exit(EXIT_ERROR);
        }
    };

    let res = if options.dump {
        dump(&regex).map(|_| true)
    } else {
        filter_lines(&regex, io::stdin().lock(), io::stdout().lock())
    };

    match res {
        Ok(true) => exit(EXIT_MATCHED),
        Ok(false) => exit(EXIT_NO_MATCH),
        Err(err) => {
            eprintln!("I/O error: {err}");
            exit(EXIT_ERROR);
        }
    }
}
