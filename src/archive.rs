//! High-level [`ResourceArchive`] API — the primary embedding surface.
//!
//! ```no_run
//! use rres::archive::ResourceArchive;
//! use rres::password::CipherContext;
//! use rres::unpack::unpack_chunk;
//!
//! let archive = ResourceArchive::open("resources.rres")?;
//! let dir = archive.central_directory()?;
//! let id = dir.resource_id("player.png");
//! let mut chunk = archive.load_chunk(id)?;
//! if chunk.info.is_packed() {
//!     let ctx = CipherContext::with_password("secret");
//!     unpack_chunk(&mut chunk, &ctx)?;
//! }
//! // chunk.data.props / chunk.data.raw now hold the decoded resource
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Every operation opens its own file handle, scoped to that call and
//! released on every exit path; nothing is cached or shared between
//! calls. A failed operation never yields a partially filled result.

use std::fs::File;
use std::io::{Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::chunk::{ChunkData, ChunkInfo, ResourceChunk};
use crate::directory::CentralDir;
use crate::error::{Error, Result};
use crate::header::FileHeader;

/// Read-only handle on an rres archive.
pub struct ResourceArchive {
    path: PathBuf,
    header: FileHeader,
}

impl ResourceArchive {
    // ── Constructor ──────────────────────────────────────────────────────────

    /// Open an archive and validate its header. Signature or version
    /// mismatch rejects the file immediately.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_owned();
        let mut file = File::open(&path)?;
        let header = FileHeader::read(&mut file)?;
        debug!(
            "opened rres archive {} ({} chunks)",
            path.display(),
            header.chunk_count
        );
        Ok(Self { path, header })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Header captured at [`open`](Self::open) time.
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Open a fresh handle and re-validate the header for one
    /// operation.
    fn begin(&self) -> Result<(File, FileHeader)> {
        let mut file = File::open(&self.path)?;
        let header = FileHeader::read(&mut file)?;
        Ok((file, header))
    }

    // ── Chunk loading ────────────────────────────────────────────────────────

    /// Load the first chunk whose record matches `id`, with its payload.
    ///
    /// Records that do not match are skipped by seeking forward exactly
    /// `packed_size` bytes; the on-disk size of a record's payload never
    /// has to match its decoded size. The payload comes back decoded to
    /// properties + raw bytes when the record declares no compression
    /// and no cipher, opaque otherwise.
    pub fn load_chunk(&self, id: u32) -> Result<ResourceChunk> {
        let (mut file, header) = self.begin()?;

        for _ in 0..header.chunk_count {
            let info = ChunkInfo::read(&mut file)?;
            if info.id != id {
                file.seek(SeekFrom::Current(info.packed_size as i64))?;
                continue;
            }

            debug!(
                "found requested resource id {:#010x}: {} | base size {} | packed size {}",
                info.id,
                info.type_str(),
                info.base_size,
                info.packed_size
            );
            if info.next_offset != 0 {
                warn!(
                    "resource {:#010x} spans multiple linked chunks, only the first is returned",
                    id
                );
            }
            let data = ChunkData::read_from(&mut file, &info)?;
            return Ok(ResourceChunk { info, data });
        }

        warn!("requested resource not found: {id:#010x}");
        Err(Error::ResourceNotFound(id))
    }

    /// Load every chunk of a linked resource, in chain order.
    ///
    /// The head record is located by the usual scan; the chain is then
    /// counted first so the result is allocated at its exact size, the
    /// reader rewinds to the head's payload, and every linked record is
    /// rematerialized with its payload. Any mid-chain failure aborts the
    /// whole load; a partially filled result is never returned.
    pub fn load_multi(&self, id: u32) -> Result<Vec<ResourceChunk>> {
        let (mut file, header) = self.begin()?;

        for _ in 0..header.chunk_count {
            let head = ChunkInfo::read(&mut file)?;
            if head.id != id {
                file.seek(SeekFrom::Current(head.packed_size as i64))?;
                continue;
            }

            let head_payload_pos = file.stream_position()?;

            // First pass: measure the chain.
            let mut count = 1usize;
            let mut walk = head.clone();
            while walk.next_offset != 0 {
                let offset = walk.next_offset;
                file.seek(SeekFrom::Start(offset as u64))?;
                walk = ChunkInfo::read(&mut file)?;
                if walk.id != id {
                    return Err(Error::BrokenChain {
                        offset,
                        found: walk.id,
                        expected: id,
                    });
                }
                count += 1;
            }
            debug!("resource {id:#010x} spans {count} linked chunk(s)");

            // Second pass: rematerialize every record with its payload.
            let mut chunks = Vec::with_capacity(count);
            file.seek(SeekFrom::Start(head_payload_pos))?;
            let data = ChunkData::read_from(&mut file, &head)?;
            let mut next_offset = head.next_offset;
            chunks.push(ResourceChunk { info: head, data });

            while next_offset != 0 {
                file.seek(SeekFrom::Start(next_offset as u64))?;
                let info = ChunkInfo::read(&mut file)?;
                let data = ChunkData::read_from(&mut file, &info)?;
                next_offset = info.next_offset;
                chunks.push(ResourceChunk { info, data });
            }
            return Ok(chunks);
        }

        warn!("requested resource not found: {id:#010x}");
        Err(Error::ResourceNotFound(id))
    }

    // ── Metadata ─────────────────────────────────────────────────────────────

    /// Record metadata for the first chunk matching `id`, no payload.
    pub fn chunk_info(&self, id: u32) -> Result<ChunkInfo> {
        let (mut file, header) = self.begin()?;

        for _ in 0..header.chunk_count {
            let info = ChunkInfo::read(&mut file)?;
            if info.id == id {
                return Ok(info);
            }
            file.seek(SeekFrom::Current(info.packed_size as i64))?;
        }
        warn!("requested resource not found: {id:#010x}");
        Err(Error::ResourceNotFound(id))
    }

    /// Every top-level chunk record in file order, no payloads.
    ///
    /// Diagnostic enumeration: records are visited strictly
    /// sequentially, skipping each payload by `packed_size`;
    /// `next_offset` chains are reported as stored, never followed.
    pub fn chunk_info_all(&self) -> Result<Vec<ChunkInfo>> {
        let (mut file, header) = self.begin()?;

        let mut infos = Vec::with_capacity(header.chunk_count as usize);
        for _ in 0..header.chunk_count {
            let info = ChunkInfo::read(&mut file)?;
            file.seek(SeekFrom::Current(info.packed_size as i64))?;
            infos.push(info);
        }
        Ok(infos)
    }

    // ── Central directory ────────────────────────────────────────────────────

    /// Load and decode the central directory. An archive without one
    /// yields an empty directory (informational, not an error).
    pub fn central_directory(&self) -> Result<CentralDir> {
        let (mut file, header) = self.begin()?;
        CentralDir::read(&mut file, &header)
    }
}
