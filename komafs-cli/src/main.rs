//! komafs CLI - mount an in-memory filesystem and poke at it.
//!
//! Usage:
//!   komafs [--type islenefs|komafs] [--image seed.zip] [-- command args]
//!
//! Examples:
//!   komafs                                   # Interactive session on komafs
//!   komafs --type islenefs                   # Flat, unobfuscated variant
//!   komafs --image seed.zip -- ls /docs      # Seed from a ZIP, run one command
//!   komafs --config mount.json               # Mount options from JSON

use std::io::{BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use crossterm::style::Stylize;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use komafs_core::{
    load_image_from_path, FsError, FsResult, FsTypeRegistry, InodeId, KomaFs, MountOptions,
};

/// In-memory filesystem session
#[derive(Parser, Debug)]
#[command(name = "komafs")]
#[command(about = "Mount an in-memory filesystem and run commands against it")]
struct Args {
    /// Filesystem type to mount
    #[arg(short = 't', long = "type")]
    fs_type: Option<String>,

    /// JSON file with mount options
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bytes per file buffer
    #[arg(long)]
    capacity: Option<usize>,

    /// ZIP images to load after mounting
    #[arg(short, long)]
    image: Vec<PathBuf>,

    /// Log every filesystem operation
    #[arg(short, long)]
    verbose: bool,

    /// Single command to run instead of an interactive session
    #[arg(last = true)]
    command: Vec<String>,
}

/// Split "/a/b/c" into ("/a/b", "c").
fn split_path(path: &str) -> FsResult<(&str, &str)> {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rsplit_once('/') {
        Some((parent, name)) if !name.is_empty() => Ok((parent, name)),
        None if !trimmed.is_empty() => Ok(("", trimmed)),
        _ => Err(FsError::InvalidArgument(format!("no file name in {:?}", path))),
    }
}

fn resolve_parent<'a>(fs: &KomaFs, path: &'a str) -> FsResult<(InodeId, &'a str)> {
    let (parent, name) = split_path(path)?;
    Ok((fs.resolve(parent)?, name))
}

const HELP: &str = "\
commands:
  ls [path]            list a directory
  cat <path>           print a file
  write <path> <text>  replace a file's content (creates it if missing)
  touch <path>         create an empty file
  mkdir <path>         create a directory
  rmdir <path>         remove an empty directory
  mv <from> <to>       rename
  rm <path>            remove a file
  stat <path>          show attributes
  df                   filesystem statistics
  help                 this text
  exit                 unmount and quit";

/// Run one command line. Returns false when the session should end.
fn run_command(fs: &KomaFs, line: &str, out: &mut impl Write) -> FsResult<bool> {
    let mut words = line.split_whitespace();
    let Some(cmd) = words.next() else {
        return Ok(true);
    };
    let args: Vec<&str> = words.collect();
    let arg = |i: usize| {
        args.get(i)
            .copied()
            .ok_or_else(|| FsError::InvalidArgument(format!("{} needs more arguments", cmd)))
    };

    match cmd {
        "ls" => {
            let dir = fs.resolve(args.first().copied().unwrap_or("/"))?;
            for entry in fs.readdir(dir)? {
                let attr = fs.getattr(entry.ino)?;
                let name = if attr.kind.is_dir() {
                    format!("{}/", entry.name).blue().to_string()
                } else {
                    entry.name
                };
                writeln!(out, "{:>6} {:>6o} {:>6} {}", entry.ino, attr.mode, attr.size, name)?;
            }
        }
        "cat" => {
            let ino = fs.resolve(arg(0)?)?;
            let data = fs.open(ino)?.read_to_end()?;
            out.write_all(&data)?;
            if !data.ends_with(b"\n") {
                writeln!(out)?;
            }
        }
        "write" => {
            let (parent, name) = resolve_parent(fs, arg(0)?)?;
            let text = args.get(1..).unwrap_or_default().join(" ");
            let ino = match fs.lookup(parent, name) {
                Ok(ino) => ino,
                Err(FsError::NoEntry(_)) => fs.create(parent, name, 0o644)?,
                Err(e) => return Err(e),
            };
            let size = fs.open(ino)?.write(text.as_bytes())?;
            writeln!(out, "{} bytes stored", size)?;
        }
        "touch" => {
            let (parent, name) = resolve_parent(fs, arg(0)?)?;
            fs.create(parent, name, 0o644)?;
        }
        "mkdir" => {
            let (parent, name) = resolve_parent(fs, arg(0)?)?;
            fs.mkdir(parent, name, 0o755)?;
        }
        "rmdir" => {
            let (parent, name) = resolve_parent(fs, arg(0)?)?;
            fs.rmdir(parent, name)?;
        }
        "mv" => {
            let (old_parent, old_name) = resolve_parent(fs, arg(0)?)?;
            let (new_parent, new_name) = resolve_parent(fs, arg(1)?)?;
            fs.rename(old_parent, old_name, new_parent, new_name)?;
        }
        "rm" => {
            let (parent, name) = resolve_parent(fs, arg(0)?)?;
            fs.unlink(parent, name)?;
        }
        "stat" => {
            let attr = fs.getattr(fs.resolve(arg(0)?)?)?;
            writeln!(
                out,
                "inode {}  {:?}  mode {:o}  links {}  size {}",
                attr.ino, attr.kind, attr.mode, attr.nlink, attr.size
            )?;
        }
        "df" => {
            let st = fs.statfs()?;
            writeln!(
                out,
                "{} magic 0x{:08X}  buffer {} bytes  inodes {}  files {}",
                fs.fs_type().name,
                st.magic,
                st.bsize,
                st.files,
                st.file_records
            )?;
        }
        "help" => writeln!(out, "{}", HELP)?,
        "exit" | "quit" => return Ok(false),
        other => {
            return Err(FsError::InvalidArgument(format!(
                "unknown command: {} (try help)",
                other
            )))
        }
    }
    Ok(true)
}

/// Read commands from stdin until EOF or `exit`.
fn interactive(fs: &KomaFs) -> FsResult<()> {
    let stdin = std::io::stdin();
    let mut stdout = std::io::stdout();
    let prompt = format!("{}> ", fs.fs_type().name);

    loop {
        write!(stdout, "{}", prompt.as_str().green())?;
        stdout.flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        match run_command(fs, line.trim(), &mut stdout) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) => {
                let msg = format!("error ({}): {}", e.errno(), e);
                writeln!(stdout, "{}", msg.red())?;
            }
        }
    }
    Ok(())
}

/// Wait for the event log task. Returns false if it panicked or was cancelled.
async fn join_event_log(handle: tokio::task::JoinHandle<()>) -> bool {
    match handle.await {
        Ok(()) => true,
        Err(e) => {
            warn!(error = %e, "event log task failed");
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut options = match &args.config {
        Some(path) => MountOptions::from_path(path)?,
        None => MountOptions::default(),
    };
    if let Some(fs_type) = &args.fs_type {
        options.fs_type = fs_type.clone();
    }
    if let Some(capacity) = args.capacity {
        options.capacity = capacity;
    }

    let fs = FsTypeRegistry::with_builtin().mount(&options)?;

    // Forward change notifications to the log
    let events = fs.subscribe();
    let event_handle = tokio::task::spawn_blocking(move || {
        for event in events {
            info!(?event, "filesystem event");
        }
    });

    for path in &args.image {
        match load_image_from_path(&fs, path) {
            Ok(summary) => eprintln!(
                "Loaded image: {} ({} files, {} directories)",
                path.display(),
                summary.files,
                summary.directories
            ),
            Err(e) => {
                eprintln!("Failed to load {}: {}", path.display(), e);
                return Err(e.into());
            }
        }
    }

    // Run the session off the async runtime; it blocks on stdin
    let session_fs = fs.clone();
    let command = args.command.join(" ");
    let result = tokio::task::spawn_blocking(move || {
        if command.is_empty() {
            interactive(&session_fs)
        } else {
            run_command(&session_fs, &command, &mut std::io::stdout()).map(|_| ())
        }
    })
    .await?;

    let released = fs.unmount()?;
    info!(released, "session finished");
    join_event_log(event_handle).await;

    if let Err(e) = result {
        eprintln!("{}", format!("Error: {}", e).red());
        std::process::exit(1);
    }
    Ok(())
}
