//! Companion command-line tool: attach to a running emulator's link region,
//! inspect its status, or run inspector commands against it.

use std::time::{Duration, Instant};

use clap::{Parser, Subcommand};
use gamelink_shared::{Error, LinkNames, LinkView};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "gamelink")]
#[command(about = "Companion tool for the gamelink shared memory bridge")]
struct Cli {
    /// Override the link mutex name
    #[arg(long, global = true)]
    mutex: Option<String>,

    /// Override the shared memory mapping name
    #[arg(long, global = true)]
    map: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the emulator's published identity and frame state
    Status,
    /// Send one inspector command line and print the response
    Send {
        /// The command line, e.g. `findb 41 42` or `:pause`
        line: Vec<String>,

        /// Seconds to wait for a response before giving up
        #[arg(long, default_value_t = 5)]
        timeout: u64,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let names = link_names(&cli);

    let view = match LinkView::attach(&names) {
        Ok(view) => view,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Status => status(&view),
        Commands::Send { ref line, timeout } => {
            send(&view, &line.join(" "), Duration::from_secs(timeout))
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn link_names(cli: &Cli) -> LinkNames {
    let mut names = LinkNames::default();
    if let Some(mutex) = &cli.mutex {
        names.mutex = mutex.clone();
    }
    if let Some(map) = &cli.map {
        names.map = map.clone();
    }
    debug!(mutex = %names.mutex, map = %names.map, "using link object names");
    names
}

fn status(view: &LinkView) -> Result<(), Error> {
    let status = view.status()?;
    println!("System:   {}", status.system);
    println!("Program:  {}", status.program);
    println!(
        "Hash:     {:08x}{:08x}{:08x}{:08x}",
        status.program_hash[0], status.program_hash[1], status.program_hash[2],
        status.program_hash[3]
    );
    println!("Version:  {}", status.version);
    println!("Flags:    {:?}", status.flags);
    println!("Paused:   {}", status.paused());
    println!(
        "Frame:    #{} {}x{}",
        status.frame_seq, status.frame_width, status.frame_height
    );
    println!("RAM:      {} bytes", status.ram_size);
    Ok(())
}

/// Queue the command and poll for the reply. Mechanical commands (leading
/// `:`) never produce one, so those return as soon as the line is consumed.
fn send(view: &LinkView, line: &str, timeout: Duration) -> Result<(), Error> {
    if line.is_empty() {
        eprintln!("Error: empty command");
        std::process::exit(1);
    }

    view.send_command(line)?;
    let mechanical = line.starts_with(':');

    let deadline = Instant::now() + timeout;
    loop {
        if mechanical {
            let consumed = view.channels(|to_guest, _| to_guest.is_empty())?;
            if consumed {
                return Ok(());
            }
        } else if let Some(reply) = view.take_response()? {
            print!("{}", reply);
            return Ok(());
        }

        if Instant::now() >= deadline {
            eprintln!("Error: no response from the emulator (is it running?)");
            std::process::exit(1);
        }
        std::thread::sleep(Duration::from_millis(20));
    }
}
