use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use rres::archive::ResourceArchive;
use rres::chunk::ResourceDataType;
use rres::data;
use rres::password::CipherContext;
use rres::unpack::unpack_chunk;

#[derive(Parser)]
#[command(name = "rres", about = "Inspect and extract rres resource archives")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the central directory entries
    List { input: PathBuf },
    /// Show the file header and every chunk record
    Info { input: PathBuf },
    /// Extract one resource's decoded bytes
    Extract {
        input: PathBuf,
        /// Resource name (resolved via the central directory) or
        /// numeric id (decimal, or hex with an 0x prefix)
        resource: String,
        /// Output file (defaults to stdout for text, <id>.bin otherwise)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Password for encrypted chunks
        #[arg(short, long)]
        password: Option<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    match Cli::parse().command {

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let archive = ResourceArchive::open(&input)?;
            let dir = archive.central_directory()?;
            if dir.is_empty() {
                println!("{}: no central directory", input.display());
                return Ok(());
            }
            println!("{:<40} {:>12} {:>12}", "Name", "Id", "Offset");
            for entry in &dir.entries {
                println!(
                    "{:<40} {:>#12x} {:>#12x}",
                    entry.name(),
                    entry.id,
                    entry.offset
                );
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input } => {
            let archive = ResourceArchive::open(&input)?;
            let header = archive.header();
            println!("── rres archive ────────────────────────────────────────");
            println!("  Path        {}", input.display());
            println!("  Version     {}", header.version);
            println!("  Chunks      {}", header.chunk_count);
            println!("  CDIR offset {:#x}", header.cd_offset);
            println!();
            println!(
                "{:<6} {:>12} {:>6} {:>6} {:>10} {:>10} {:>10}",
                "Type", "Id", "Comp", "Ciph", "Packed", "Base", "Next"
            );
            for info in archive.chunk_info_all()? {
                println!(
                    "{:<6} {:>#12x} {:>6} {:>6} {:>10} {:>10} {:>#10x}",
                    info.type_str(),
                    info.id,
                    info.comp_type.code(),
                    info.cipher_type.code(),
                    info.packed_size,
                    info.base_size,
                    info.next_offset
                );
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract {
            input,
            resource,
            output,
            password,
        } => {
            let archive = ResourceArchive::open(&input)?;
            let id = resolve_id(&archive, &resource)?;

            let mut chunk = archive.load_chunk(id)?;
            if chunk.info.is_packed() {
                let ctx = match password {
                    Some(ref pass) => CipherContext::with_password(pass),
                    None => CipherContext::new(),
                };
                unpack_chunk(&mut chunk, &ctx)?;
            }

            match chunk.info.data_type() {
                Some(ResourceDataType::Text) if output.is_none() => {
                    print!("{}", data::load_text(&chunk)?);
                }
                _ => {
                    let bytes = match chunk.info.data_type() {
                        Some(ResourceDataType::Raw) => data::load_raw(&chunk)?,
                        _ => chunk.data.raw.clone(),
                    };
                    let path = output.unwrap_or_else(|| PathBuf::from(format!("{id:08x}.bin")));
                    std::fs::write(&path, bytes)?;
                    println!("Extracted {:#010x} → {}", id, path.display());
                }
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn resolve_id(
    archive: &ResourceArchive,
    resource: &str,
) -> Result<u32, Box<dyn std::error::Error>> {
    if let Some(hex) = resource.strip_prefix("0x") {
        return Ok(u32::from_str_radix(hex, 16)?);
    }
    if let Ok(id) = resource.parse::<u32>() {
        return Ok(id);
    }
    let dir = archive.central_directory()?;
    match dir.resource_id(resource) {
        0 => Err(format!("resource not found in central directory: {resource}").into()),
        id => Ok(id),
    }
}
