use std::{
    fs,
    io::{self, stdin, stdout, BufRead, Write},
    path::PathBuf,
    process::ExitCode,
    thread,
};

use clap::{ArgAction, Parser};
use intcode::{parse_program, Channel, IntcodeComputer, Network, OutputSink};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about = "Runs Intcode programs", long_about = None)]
struct Arguments {
    /// File holding the program, as comma separated integers.
    program_file: PathBuf,

    /// Values queued as input before the program starts.
    #[arg(short, long, value_delimiter = ',', allow_hyphen_values = true)]
    input: Vec<i64>,

    /// Read more input from stdin whenever the program waits for it.
    #[arg(long)]
    interactive: bool,

    /// Exchange ASCII text with the program instead of integers.
    #[arg(long)]
    ascii: bool,

    /// Patch memory before running, e.g. `--patch 1=12 --patch 2=2`.
    #[arg(long = "patch", value_parser = parse_patch)]
    patches: Vec<(usize, i64)>,

    /// Run one amplifier per phase setting instead of a single machine.
    #[arg(
        long,
        value_delimiter = ',',
        conflicts_with_all = ["interactive", "ascii"]
    )]
    amplify: Option<Vec<i64>>,

    /// Wire the amplifiers in a feedback loop.
    #[arg(long, requires = "amplify")]
    feedback: bool,

    /// Signal sent to the first amplifier.
    #[arg(
        long,
        default_value_t = 0,
        requires = "amplify",
        allow_negative_numbers = true
    )]
    signal: i64,

    /// Log every executed instruction.
    #[arg(long)]
    trace: bool,

    /// Log more, can be repeated.
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn parse_patch(patch: &str) -> Result<(usize, i64), String> {
    let (address, value) = patch
        .split_once('=')
        .ok_or_else(|| format!("expected ADDRESS=VALUE, got {patch:?}"))?;
    let address = address
        .trim()
        .parse()
        .map_err(|e| format!("invalid address {address:?}: {e}"))?;
    let value = value
        .trim()
        .parse()
        .map_err(|e| format!("invalid value {value:?}: {e}"))?;
    Ok((address, value))
}

/// Writes an output value as a character, or as an integer on its own line.
fn write_value(output: &mut impl Write, value: i64, ascii: bool) -> io::Result<()> {
    match u8::try_from(value) {
        Ok(byte) if ascii && byte.is_ascii() => write!(output, "{}", byte as char)?,
        _ => writeln!(output, "{value}")?,
    }
    output.flush()
}

/// Prints outputs as they come. The program keeps running if stdout goes away,
/// which only gets reported once.
fn terminal_sink(ascii: bool) -> OutputSink {
    let mut reported = false;
    OutputSink::interactive(move |value| {
        if let Err(e) = write_value(&mut stdout().lock(), value, ascii) {
            if !reported {
                log::warn!("could not write output {value} to stdout: {e}");
                reported = true;
            }
        }
    })
}

/// Listens to stdin on another thread, queueing what is read on `channel`.
/// The channel gets closed when stdin is.
fn listen_to_stdin(channel: Channel, ascii: bool) {
    thread::spawn(move || {
        for line in stdin().lock().lines() {
            let line = match line {
                Ok(line) => line,
                Err(e) => {
                    log::error!("could not read stdin: {e}");
                    break;
                }
            };
            if ascii {
                channel.extend_from_text(&line);
                continue;
            }
            for token in line.split(|c: char| c == ',' || c.is_whitespace()) {
                if token.is_empty() {
                    continue;
                }
                match token.parse() {
                    Ok(value) => channel.push(value),
                    Err(e) => log::warn!("ignoring {token:?}: {e}"),
                }
            }
        }
        channel.close()
    });
}

/// Text input for ASCII programs, one line at a time.
trait AsciiChannel {
    fn extend_from_text(&self, line: &str);
}
impl AsciiChannel for Channel {
    fn extend_from_text(&self, line: &str) {
        for byte in line.bytes().chain([b'\n']) {
            self.push(i64::from(byte))
        }
    }
}

fn main() -> ExitCode {
    let args = Arguments::parse();

    let level = match (args.trace, args.verbose) {
        (true, _) => LevelFilter::Trace,
        (false, 0) => LevelFilter::Warn,
        (false, 1) => LevelFilter::Info,
        (false, 2) => LevelFilter::Debug,
        (false, _) => LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    // Read/parse program
    let program = match fs::read_to_string(&args.program_file)
        .map_err(|e| e.to_string())
        .and_then(|text| parse_program(&text).map_err(|e| e.to_string()))
    {
        Ok(program) => program,
        Err(e) => {
            log::error!("could not load {}: {e}", args.program_file.display());
            return ExitCode::FAILURE;
        }
    };
    log::info!("loaded {} values", program.len());

    if let Some(phases) = &args.amplify {
        return match Network::amplify(&program, phases, args.signal, args.feedback) {
            Ok(signal) => {
                println!("{signal}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                log::error!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    // Create our computer
    let mut computer = IntcodeComputer::new(&program);
    for &(address, value) in &args.patches {
        computer.poke_memory(address, value)
    }
    computer.set_output_sink(terminal_sink(args.ascii));
    computer.provide_inputs(args.input.iter().copied());
    if args.interactive {
        listen_to_stdin(computer.input_channel(), args.ascii)
    } else {
        computer.close_input()
    }

    match computer.run_blocking() {
        Ok(()) => {
            log::info!(
                "halted after {} cycles, address 0 holds {}",
                computer.cycles(),
                computer.peek_memory(0)
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!(
                "{e} (instruction pointer {}, relative base {})",
                computer.peek_instruction_pointer(),
                computer.peek_relative_base()
            );
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn try_parse(args: &[&str]) -> Result<Arguments, clap::Error> {
        let args = ["intcode-cli"].iter().chain(args).copied();
        Arguments::try_parse_from(args)
    }
    fn parse(args: &[&str]) -> Arguments {
        try_parse(args).unwrap()
    }

    #[test]
    fn test_parse_patch() {
        assert_eq!(parse_patch("1=12"), Ok((1, 12)));
        assert_eq!(parse_patch(" 2 = -3 "), Ok((2, -3)));
        assert!(parse_patch("12").is_err());
        assert!(parse_patch("-1=2").is_err());
    }

    #[test]
    fn test_arguments() {
        let args = parse(&["day7.txt", "--amplify", "9,8,7,6,5", "--feedback"]);
        assert_eq!(args.amplify, Some(vec![9, 8, 7, 6, 5]));
        assert!(args.feedback);

        let args = parse(&["day5.txt", "--input=-5,1", "-vv"]);
        assert_eq!(args.input, vec![-5, 1]);
        assert_eq!(args.verbose, 2);

        assert!(try_parse(&["day9.txt", "--feedback"]).is_err());
        assert!(try_parse(&["day9.txt", "--amplify", "0,1", "--ascii"]).is_err());
    }

    /// Fails every write, like a closed pipe.
    struct ClosedPipe;
    impl Write for ClosedPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::ErrorKind::BrokenPipe.into())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_write_values() {
        let mut output = Vec::<u8>::new();
        for value in [72, 105, 10, 1_000_000] {
            write_value(&mut output, value, true).unwrap();
        }
        write_value(&mut output, 72, false).unwrap();
        assert_eq!(String::from_utf8(output).unwrap(), "Hi\n1000000\n72\n");

        let error = write_value(&mut ClosedPipe, 42, false).unwrap_err();
        assert_eq!(error.kind(), io::ErrorKind::BrokenPipe);
    }

    #[test]
    fn test_ascii_lines() {
        let channel = Channel::new();
        channel.extend_from_text("A,B");
        assert_eq!(channel.drain(), vec![65, 44, 66, 10]);
    }
}
