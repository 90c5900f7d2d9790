use std::path::{Path, PathBuf};

use anyhow::Context;
use colored::Colorize;
use serde_json::{json, Value};
use shelf_core::{
    Codec, DirGroup, Group, ObjectShelf, OpenMode, Rack, ShelfConfig, Storage, DEFAULT_RACK,
};
use shelf_store::Dataset;
use shelf_stream::BufferedDatasetReader;

use crate::cli::*;

/// Shared state for one invocation.
struct Env {
    store: PathBuf,
    format: OutputFormat,
    config: ShelfConfig,
}

impl Env {
    fn open(&self, mode: OpenMode) -> anyhow::Result<Storage<DirGroup>> {
        open_storage(&self.store, mode, self.config.clone())
    }

    /// Print `value` as JSON, or run `text` for human output.
    fn emit(&self, value: Value, text: impl FnOnce()) -> anyhow::Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&value)?),
            OutputFormat::Text => text(),
        }
        Ok(())
    }
}

fn open_storage(
    path: &Path,
    mode: OpenMode,
    config: ShelfConfig,
) -> anyhow::Result<Storage<DirGroup>> {
    Storage::open(path, mode, config)
        .with_context(|| format!("cannot open storage at {}", path.display()))
}

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = match &cli.config {
        Some(path) => ShelfConfig::load(path)?,
        None => ShelfConfig::default(),
    };
    let env = Env {
        store: cli.store,
        format: cli.format,
        config,
    };
    match cli.command {
        Command::Init(args) => cmd_init(&env, args),
        Command::Info(_) => cmd_info(&env),
        Command::Ls(args) => cmd_ls(&env, args),
        Command::Put(args) => cmd_put(&env, args),
        Command::Get(args) => cmd_get(&env, args),
        Command::Rm(args) => cmd_rm(&env, args),
        Command::Dump(args) => cmd_dump(&env, args),
    }
}

fn rack_of(storage: &Storage<DirGroup>, rack: Option<&str>) -> anyhow::Result<Rack<DirGroup>> {
    let name = rack.unwrap_or(DEFAULT_RACK);
    storage
        .rack_named(name)
        .with_context(|| format!("no rack named {name:?}"))
}

fn blob_size<G: Group>(shelf: &ObjectShelf<G>) -> anyhow::Result<Option<u64>> {
    if !shelf.exists()? {
        return Ok(None);
    }
    Ok(Some(shelf.blob()?.len()?))
}

fn cmd_init(env: &Env, args: InitArgs) -> anyhow::Result<()> {
    let path = args.path.unwrap_or_else(|| env.store.clone());
    let mode = if args.force {
        OpenMode::Create
    } else {
        OpenMode::CreateNew
    };
    let storage = open_storage(&path, mode, env.config.clone())?;
    let stamp = storage.version_stamp().clone();
    storage.close()?;

    env.emit(
        json!({
            "path": path.display().to_string(),
            "storage_version": stamp.storage_version.to_string(),
            "library_version": stamp.library_version.to_string(),
        }),
        || {
            println!(
                "{} Initialized shelf storage in {}",
                "✓".green().bold(),
                path.display().to_string().bold()
            );
            println!("  Storage format: {}", stamp.storage_version.to_string().cyan());
            println!("  Library: {}", stamp.library_version.to_string().cyan());
        },
    )
}

fn cmd_info(env: &Env) -> anyhow::Result<()> {
    let storage = env.open(OpenMode::Read)?;
    let stamp = storage.version_stamp();
    let mut racks = Vec::new();
    for name in storage.rack_names()? {
        let len = storage.rack_named(&name)?.len()?;
        racks.push((name, len));
    }
    let slots = storage.slot_names()?;

    env.emit(
        json!({
            "path": env.store.display().to_string(),
            "storage_version": stamp.storage_version.to_string(),
            "library_version": stamp.library_version.to_string(),
            "racks": racks
                .iter()
                .map(|(n, l)| json!({"name": n, "entries": l}))
                .collect::<Vec<_>>(),
            "slots": slots,
        }),
        || {
            println!("Storage {}", env.store.display().to_string().bold());
            println!("  Storage format: {}", stamp.storage_version.to_string().cyan());
            println!(
                "  Written by library: {}",
                stamp.library_version.to_string().cyan()
            );
            if racks.is_empty() {
                println!("  Racks: none");
            }
            for (name, len) in &racks {
                println!("  Rack {}: {} entries", name.yellow(), len.to_string().bold());
            }
            let slots = if slots.is_empty() {
                "none".to_string()
            } else {
                slots.join(", ")
            };
            println!("  Slots: {slots}");
        },
    )
}

fn cmd_ls(env: &Env, args: LsArgs) -> anyhow::Result<()> {
    let storage = env.open(OpenMode::Read)?;
    let mut rows = Vec::new();
    if args.slots {
        for name in storage.slot_names()? {
            let slot = storage.slot(&name)?;
            rows.push((name, blob_size(&slot)?, slot.stored_codec()?));
        }
    } else {
        let rack = rack_of(&storage, args.rack.as_deref())?;
        for key in rack.keys()? {
            let shelf = rack.shelf(&key)?;
            rows.push((key, blob_size(shelf.shelf())?, shelf.shelf().stored_codec()?));
        }
    }

    env.emit(
        Value::Array(
            rows.iter()
                .map(|(key, size, codec)| json!({"key": key, "bytes": size, "codec": codec.name()}))
                .collect(),
        ),
        || {
            if rows.is_empty() {
                println!("No entries.");
            }
            for (key, size, codec) in &rows {
                let size = size.map_or_else(|| "-".to_string(), |s| s.to_string());
                println!("{:<32} {:>12}  {}", key.yellow(), size, codec.to_string().dimmed());
            }
        },
    )
}

fn cmd_put(env: &Env, args: PutArgs) -> anyhow::Result<()> {
    let value: Value = serde_json::from_str(&args.value).context("value is not valid JSON")?;
    // JSON values can only be decoded again from a self-describing codec
    let storage = open_storage(
        &env.store,
        OpenMode::ReadWrite,
        env.config.clone().with_codec(Codec::Json),
    )?;
    rack_of(&storage, args.rack.as_deref())?.set(&args.key, &value)?;
    storage.close()?;

    env.emit(json!({"stored": args.key}), || {
        println!("{} Stored {}", "✓".green(), args.key.yellow());
    })
}

fn cmd_get(env: &Env, args: KeyArgs) -> anyhow::Result<()> {
    let storage = env.open(OpenMode::Read)?;
    let shelf = rack_of(&storage, args.rack.as_deref())?.shelf(&args.key)?;
    let codec = shelf.shelf().stored_codec()?;
    if codec != Codec::Json {
        anyhow::bail!("{} is {codec}-encoded; use `shelf dump` to inspect it", args.key);
    }
    let value: Value = shelf.load()?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}

fn cmd_rm(env: &Env, args: KeyArgs) -> anyhow::Result<()> {
    let storage = env.open(OpenMode::ReadWrite)?;
    rack_of(&storage, args.rack.as_deref())?.delete(&args.key)?;
    storage.close()?;

    env.emit(json!({"removed": args.key}), || {
        println!("Removed {}", args.key.yellow());
    })
}

fn cmd_dump(env: &Env, args: DumpArgs) -> anyhow::Result<()> {
    let storage = env.open(OpenMode::Read)?;
    let shelf = if args.slot {
        storage.slot(&args.key)?
    } else {
        rack_of(&storage, args.rack.as_deref())?.shelf(&args.key)?.shelf().clone()
    };
    let codec = shelf.stored_codec()?;
    let blob = shelf.blob()?;
    let total = blob.len()?;
    let mut reader = BufferedDatasetReader::new(&blob, env.config.read_buffer)?;
    let head = reader.read_bytes(Some(args.limit))?;

    env.emit(
        json!({
            "key": args.key,
            "codec": codec.name(),
            "bytes": total,
            "head": hex::encode(&head),
        }),
        || {
            println!("{} ({} bytes, {})", args.key.yellow().bold(), total, codec);
            for line in hexdump(&head) {
                println!("{line}");
            }
            if (head.len() as u64) < total {
                println!("{}", format!("... {} more bytes", total - head.len() as u64).dimmed());
            }
        },
    )
}

/// Render `bytes` as offset, hex and printable-ASCII columns, 16 bytes per line.
fn hexdump(bytes: &[u8]) -> Vec<String> {
    bytes
        .chunks(16)
        .enumerate()
        .map(|(i, chunk)| {
            let ascii: String = chunk
                .iter()
                .map(|&b| {
                    if b.is_ascii_graphic() || b == b' ' {
                        b as char
                    } else {
                        '.'
                    }
                })
                .collect();
            format!("{:08x}  {:<32}  |{}|", i * 16, hex::encode(chunk), ascii)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    fn run(store: &Path, args: &[&str]) -> anyhow::Result<()> {
        let store = store.to_str().unwrap();
        let mut argv = vec!["shelf", "-C", store];
        argv.extend_from_slice(args);
        run_command(Cli::try_parse_from(argv)?)
    }

    #[test]
    fn hexdump_layout() {
        let lines = hexdump(b"hello, shelf!\n\x00\x01more");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000  68656c6c6f"));
        assert!(lines[0].ends_with("|hello, shelf!...|"));
        assert!(lines[1].starts_with("00000010  6d6f7265"));
        assert!(hexdump(&[]).is_empty());
    }

    #[test]
    fn init_put_get_rm_flow() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");

        run(&store, &["init"]).unwrap();
        assert!(run(&store, &["init"]).is_err());
        run(&store, &["init", "--force"]).unwrap();

        run(&store, &["put", "k", r#"{"a": [1, 2]}"#]).unwrap();
        run(&store, &["put", "m", "3", "--rack", "other"]).unwrap();
        run(&store, &["get", "k"]).unwrap();
        run(&store, &["ls"]).unwrap();
        run(&store, &["--format", "json", "info"]).unwrap();
        run(&store, &["dump", "k", "-n", "4"]).unwrap();

        let s = Storage::open(&store, OpenMode::Read, ShelfConfig::default()).unwrap();
        let v: Value = s.rack().unwrap().get("k").unwrap();
        assert_eq!(v, json!({"a": [1, 2]}));
        assert_eq!(s.rack_names().unwrap(), vec!["objects", "other"]);
        drop(s);

        run(&store, &["rm", "k"]).unwrap();
        assert!(run(&store, &["rm", "k"]).is_err());
        assert!(run(&store, &["get", "k"]).is_err());
    }

    #[test]
    fn fresh_store_lists_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = dir.path().join("store");
        run(&store, &["init"]).unwrap();

        run(&store, &["ls"]).unwrap();
        run(&store, &["ls", "--slots"]).unwrap();
        run(&store, &["info"]).unwrap();
        let err = run(&store, &["get", "k"]).unwrap_err();
        assert!(err.to_string().contains("\"k\""), "{err}");
    }

    #[test]
    fn get_refuses_binary_entries() {
        let dir = tempfile::tempdir().unwrap();
        let storage =
            Storage::open(dir.path().join("s"), OpenMode::Create, ShelfConfig::default()).unwrap();
        storage.rack().unwrap().set("bin", &vec![1u32, 2]).unwrap();
        storage.slot("only").unwrap().save(&7u8, false).unwrap();
        storage.close().unwrap();

        let store = dir.path().join("s");
        assert!(run(&store, &["get", "bin"]).is_err());
        run(&store, &["dump", "bin"]).unwrap();
        run(&store, &["dump", "only", "--slot"]).unwrap();
        run(&store, &["ls", "--slots"]).unwrap();
    }

    #[test]
    fn missing_storage_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(run(&dir.path().join("nope"), &["info"]).is_err());
    }

    #[test]
    fn config_file_is_applied() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("shelf.toml");
        std::fs::write(&config, "read_buffer = 0\n").unwrap();
        let store = dir.path().join("store");
        let err = run(&store, &["--config", config.to_str().unwrap(), "init"]).unwrap_err();
        assert!(err.to_string().contains("read_buffer"));
    }
}
