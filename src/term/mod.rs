extern crate ansi_term;
extern crate ctrlc;
extern crate linefeed;
use crate::error;
use crate::lang::Error;
use crate::mach::{Config, Event, Runtime};
use ansi_term::Style;
use linefeed::{DefaultTerminal, Interface, ReadResult, Signal};
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

pub fn main(config: Config, file: Option<PathBuf>) {
    let interrupted = Arc::new(AtomicBool::new(false));
    let int_moved = interrupted.clone();
    if let Err(error) = ctrlc::set_handler(move || {
        int_moved.store(true, Ordering::SeqCst);
    }) {
        warn!(target: "basic::exec", "no Ctrl-C handler: {}", error);
    }
    if let Err(error) = main_loop(config, file, interrupted) {
        eprintln!("{}", error);
    }
}

fn main_loop(config: Config, file: Option<PathBuf>, interrupted: Arc<AtomicBool>) -> std::io::Result<()> {
    let mut runtime = Runtime::new(config);
    runtime.reseed(rand::thread_rng().gen_range(1..u32::max_value()) as f64);
    let command = Interface::new("BASIC")?;
    let input = Arc::new(Interface::new("INPUT")?);
    input.set_report_signal(Signal::Interrupt, true);
    install_reader(&mut runtime, input);

    let mut print_ready = true;
    if let Some(path) = file {
        match load(&mut runtime, &path) {
            Ok(()) => {
                runtime.enter("RUN");
            }
            Err(error) => report(&command, &error)?,
        }
    }

    loop {
        if interrupted.swap(false, Ordering::SeqCst) {
            runtime.interrupt();
        }
        match runtime.execute(5000) {
            Event::Stopped => {
                if print_ready {
                    command.write_fmt(format_args!("READY.\n"))?;
                }
                print_ready = match command.read_line()? {
                    ReadResult::Input(string) => {
                        if runtime.enter(&string) {
                            command.add_history_unique(string);
                        }
                        runtime.is_running()
                    }
                    ReadResult::Signal(_) | ReadResult::Eof => break,
                };
            }
            Event::Running => {}
            Event::Print(s) => {
                command.write_fmt(format_args!("{}", s))?;
            }
            Event::Errors(errors) => {
                for error in errors.iter() {
                    report(&command, error)?;
                }
                print_ready = true;
            }
            Event::Load(name) => {
                if let Err(error) = load(&mut runtime, Path::new(&name)) {
                    report(&command, &error)?;
                }
                print_ready = true;
            }
            Event::Save(name) => {
                if let Err(error) = save(&runtime, Path::new(&name)) {
                    report(&command, &error)?;
                }
            }
        }
    }
    Ok(())
}

/// INPUT reads through its own interface so the prompt is
/// whatever the program printed last.
fn install_reader(runtime: &mut Runtime, input: Arc<Interface<DefaultTerminal>>) {
    runtime.set_reader(Some(Box::new(move |prompt: &str| {
        input.set_prompt(prompt).ok()?;
        match input.read_line() {
            Ok(ReadResult::Input(string)) => Some(string),
            _ => None,
        }
    })));
}

fn report(command: &Interface<DefaultTerminal>, error: &Error) -> std::io::Result<()> {
    command.write_fmt(format_args!(
        "{}\n",
        Style::new().bold().paint(error.to_string())
    ))
}

fn is_image(path: &Path) -> bool {
    path.extension().map_or(false, |e| e.eq_ignore_ascii_case("bin"))
}

/// Files ending in `.bin` hold a program image, anything else a listing.
fn load(runtime: &mut Runtime, path: &Path) -> Result<(), Error> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(error) => {
            warn!(target: "basic::program", "{}: {}", path.display(), error);
            return Err(error!(File; "CAN'T OPEN"));
        }
    };
    info!(target: "basic::program", "loading {}", path.display());
    if is_image(path) {
        runtime.load_image(&bytes)
    } else {
        runtime.load_listing(&String::from_utf8_lossy(&bytes))
    }
}

fn save(runtime: &Runtime, path: &Path) -> Result<(), Error> {
    let bytes = if is_image(path) {
        runtime.image()
    } else {
        runtime.listing().into_bytes()
    };
    if let Err(error) = fs::write(path, bytes) {
        warn!(target: "basic::program", "{}: {}", path.display(), error);
        return Err(error!(File; "CAN'T WRITE"));
    }
    Ok(())
}
