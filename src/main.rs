use std::{
    io::{self, BufRead},
    path::PathBuf,
    rc::Rc,
    sync::mpsc::{self, Receiver, RecvTimeoutError},
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Context};
use bytes::BytesMut;
use clap::{Parser, Subcommand};

use gree::{
    Climate, ClimateCall, Component, ConfigError, GreeClimate, HostConfig, IoUart,
    LogDiagnostics, PollingComponent, Uart, UartRegistry,
};

#[derive(Parser, Debug)]
#[command(about = "Drive Gree climate units over UART")]
struct Args {
    /// JSON file declaring the UARTs and climates
    #[arg(short, long)]
    config: PathBuf,

    /// Write to in-memory buffers instead of the serial ports and print them as hex on exit
    #[arg(long)]
    dry_run: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read JSON control calls from stdin, one per line, and apply them
    Run {
        /// Id of the climate to control, defaults to the first one declared
        #[arg(long)]
        climate: Option<String>,

        /// Keep refreshing state after stdin is closed, until killed
        #[arg(long)]
        keep_alive: bool,
    },
    /// Print each climate's configuration
    Dump,
    /// Print the Home Assistant discovery payload of each climate
    Hass,
}

const SERIAL_TIMEOUT: Duration = Duration::from_millis(100);

// Bounds for a single wait of the run loop
const MIN_WAIT: Duration = Duration::from_millis(1);
const IDLE_WAIT: Duration = Duration::from_secs(60);

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let config = HostConfig::load(&args.config)
        .with_context(|| format!("loading {}", args.config.display()))?;

    if args.dry_run {
        let mut registry = UartRegistry::new();
        for uart in &config.uart {
            registry.declare(uart.id.clone(), BytesMut::new());
        }

        // Whatever was written before a failure is still worth seeing
        let result = execute(&config, &registry, &args.command);
        for (id, uart) in registry.iter() {
            println!("{}: {}", id, hex::encode(&uart.borrow()[..]));
        }
        result?;
    } else {
        let mut registry = UartRegistry::new();
        for uart in &config.uart {
            let port = serialport::new(&uart.port, uart.baud_rate)
                .timeout(SERIAL_TIMEOUT)
                .open()
                .with_context(|| format!("opening {} for uart '{}'", uart.port, uart.id))?;
            registry.declare(uart.id.clone(), IoUart::new(port));
        }

        execute(&config, &registry, &args.command)?;
    }

    Ok(())
}

fn execute<U>(
    config: &HostConfig,
    registry: &UartRegistry<U>,
    command: &Command,
) -> anyhow::Result<()>
where
    U: Uart,
    U::Error: std::fmt::Display,
{
    let ids: Vec<String> = config.climate.iter().map(|c| c.id.clone()).collect();
    let mut climates = config
        .climate
        .iter()
        .map(|c| {
            let diagnostics = Rc::new(LogDiagnostics::new(format!("gree::{}", c.id)));
            GreeClimate::from_config(c, registry, diagnostics)
        })
        .collect::<Result<Vec<_>, ConfigError>>()?;

    match command {
        Command::Dump => {
            for climate in &climates {
                climate.dump_config();
            }
        }
        Command::Hass => {
            for climate in &climates {
                println!("{}", serde_json::to_string_pretty(&climate.hass_config())?);
            }
        }
        Command::Run {
            climate,
            keep_alive,
        } => {
            let target = match climate {
                Some(id) => ids
                    .iter()
                    .position(|c| c == id)
                    .ok_or_else(|| anyhow!("no climate with id '{}'", id))?,
                None if climates.is_empty() => return Err(anyhow!("no climate configured")),
                None => 0,
            };

            for (id, climate) in ids.iter().zip(climates.iter_mut()) {
                let id = id.clone();
                climate.add_on_state_callback(move |state| match serde_json::to_string(state) {
                    Ok(json) => println!("{} {}", id, json),
                    Err(e) => log::warn!("failed to encode state of '{}': {}", id, e),
                });
                climate.setup();
            }

            let lines = spawn_stdin_reader();
            let mut poller = Poller::new(climates.len());
            loop {
                match poller.step(&mut climates, &lines) {
                    Step::Line(line) => {
                        apply_line(&mut climates[target], &line);
                        poller.run_due(&mut climates);
                    }
                    Step::Refreshed => {}
                    Step::Closed => break,
                }
            }

            if *keep_alive {
                loop {
                    thread::sleep(poller.until_next(&climates));
                    poller.run_due(&mut climates);
                }
            }
        }
    }

    Ok(())
}

fn apply_line<C>(climate: &mut C, line: &str)
where
    C: Climate,
    C::Error: std::fmt::Display,
{
    if line.trim().is_empty() {
        return;
    }

    match serde_json::from_str::<ClimateCall>(line) {
        Ok(call) => {
            if let Err(e) = climate.control(&call) {
                log::error!("uart write failed: {}", e);
            }
        }
        Err(e) => log::warn!("ignoring malformed call {:?}: {}", line, e),
    }
}

// Stdin blocks, so it is read on its own thread and handed over line by line
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            match line {
                Ok(line) => {
                    if tx.send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    log::error!("failed to read stdin: {}", e);
                    break;
                }
            }
        }
    });
    rx
}

#[derive(Debug, PartialEq, Eq)]
enum Step {
    Line(String),
    Refreshed,
    Closed,
}

/// Calls `update` on each component once its interval has elapsed
struct Poller {
    last_update: Vec<Instant>,
}

impl Poller {
    fn new(count: usize) -> Self {
        Self {
            last_update: vec![Instant::now(); count],
        }
    }

    fn until_next<P: PollingComponent>(&self, components: &[P]) -> Duration {
        components
            .iter()
            .zip(&self.last_update)
            .map(|(c, last)| c.update_interval().saturating_sub(last.elapsed()))
            .min()
            .unwrap_or(IDLE_WAIT)
            .max(MIN_WAIT)
    }

    fn run_due<P: PollingComponent>(&mut self, components: &mut [P]) {
        for (component, last) in components.iter_mut().zip(self.last_update.iter_mut()) {
            if last.elapsed() >= component.update_interval() {
                component.update();
                *last = Instant::now();
            }
        }
    }

    /// Waits for the next input line, running refreshes that fall due in the meantime.
    fn step<P: PollingComponent>(
        &mut self,
        components: &mut [P],
        lines: &Receiver<String>,
    ) -> Step {
        match lines.recv_timeout(self.until_next(components)) {
            Ok(line) => Step::Line(line),
            Err(RecvTimeoutError::Timeout) => {
                self.run_due(components);
                Step::Refreshed
            }
            Err(RecvTimeoutError::Disconnected) => Step::Closed,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use gree::SwingMode;

    use super::*;

    fn climate(interval: Duration) -> (GreeClimate<BytesMut>, Rc<Cell<usize>>) {
        let mut climate = GreeClimate::new("test", Rc::new(LogDiagnostics::new("gree::test")));
        climate.set_update_interval(interval);
        let published = Rc::new(Cell::new(0));
        let counter = published.clone();
        climate.add_on_state_callback(move |_| counter.set(counter.get() + 1));
        (climate, published)
    }

    #[test]
    fn test_refresh_without_input() {
        let (climate, published) = climate(Duration::from_millis(10));
        let mut climates = vec![climate];
        let mut poller = Poller::new(climates.len());

        // Sender stays open but never sends
        let (_tx, rx) = mpsc::channel::<String>();
        assert_eq!(poller.step(&mut climates, &rx), Step::Refreshed);
        assert_eq!(published.get(), 1);
        assert_eq!(poller.step(&mut climates, &rx), Step::Refreshed);
        assert_eq!(published.get(), 2);
    }

    #[test]
    fn test_lines_and_close() {
        let (climate, published) = climate(Duration::from_secs(3600));
        let mut climates = vec![climate];
        let mut poller = Poller::new(climates.len());

        let (tx, rx) = mpsc::channel();
        tx.send(r#"{"swing_mode": "on"}"#.to_string()).unwrap();
        drop(tx);

        match poller.step(&mut climates, &rx) {
            Step::Line(line) => apply_line(&mut climates[0], &line),
            step => panic!("expected a line, got {:?}", step),
        }
        // No uart is set, so only the control call publishes
        assert_eq!(published.get(), 1);
        assert_eq!(climates[0].state().swing_mode, SwingMode::Off);

        assert_eq!(poller.step(&mut climates, &rx), Step::Closed);
    }

    #[test]
    fn test_until_next() {
        let (fast, _) = climate(Duration::from_millis(50));
        let (slow, _) = climate(Duration::from_secs(60));
        let poller = Poller::new(2);

        assert!(poller.until_next(&[fast, slow]) <= Duration::from_millis(50));
        assert_eq!(Poller::new(0).until_next::<GreeClimate<BytesMut>>(&[]), IDLE_WAIT);
    }
}
