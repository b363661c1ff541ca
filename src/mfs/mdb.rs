//! The Master Directory Block's volume information.
//!
//! The MDB occupies sectors 2–3 of the volume. Its first 64 bytes are the
//! volume information decoded here; the rest holds the packed allocation
//! block map ([map](super::map)).

use crate::binary::read::{ReadBinary, ReadCtxt};
use crate::binary::write::{WriteBinary, WriteCtxt};
use crate::date;
use crate::error::Error;

/// `drSigWord` value identifying an MFS volume.
pub const SIGNATURE: u16 = 0xD2D7;

/// Bytes per sector.
pub const SECTOR_SIZE: usize = 512;

/// Byte offset of the MDB within the volume image (sector 2).
pub const MDB_OFFSET: usize = 2 * SECTOR_SIZE;

/// Total size of the MDB (two sectors).
pub const MDB_LEN: usize = 2 * SECTOR_SIZE;

/// Size of the volume information prefix.
pub const VOLUME_INFO_LEN: usize = 64;

/// Longest permitted volume name.
pub const VOLUME_NAME_MAX: usize = 27;

/// Default geometry, fixed for 400 KB floppies: directory at sector 4 for
/// 12 sectors, 1024-byte allocation blocks from sector 16.
pub const DIR_START: u16 = 4;
pub const DIR_SECTORS: u16 = 12;
pub const ALLOC_START: u16 = 16;
pub const ALLOC_BLOCK_SIZE: u32 = 1024;

/// The decoded 64-byte volume information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeInfo {
    /// `drCrDate` — when the volume was initialised
    pub creation_date: Option<u32>,
    /// `drLsBkUp` — last modification
    pub modification_date: Option<u32>,
    /// `drAtrb` — volume attribute flags
    pub attributes: u16,
    /// `drNmFls` — number of files in the directory
    pub file_count: u16,
    /// `drDirSt` — first sector of the file directory
    pub dir_start: u16,
    /// `drBlLen` — length of the directory in sectors
    pub dir_len: u16,
    /// `drNmAlBlks` — number of allocation blocks
    pub alloc_blocks: u16,
    /// `drAlBlkSiz` — allocation block size in bytes
    pub alloc_block_size: u32,
    /// `drClpSiz` — bytes to allocate when growing a file
    pub clump_size: u32,
    /// `drAlBlSt` — first sector of the allocation-block region
    pub alloc_start: u16,
    /// `drNxtFNum` — next file number to assign
    pub next_file_num: u32,
    /// `drFreeBks` — free allocation blocks
    pub free_blocks: u16,
    /// `drVN` — volume name, raw Mac OS Roman bytes
    pub name: Vec<u8>,
}

impl VolumeInfo {
    /// Volume information for a freshly formatted volume of
    /// `total_sectors` sectors under the default geometry.
    pub fn format(total_sectors: usize, name: &[u8], now: u32) -> VolumeInfo {
        let block_sectors = ALLOC_BLOCK_SIZE as usize / SECTOR_SIZE;
        let alloc_blocks = ((total_sectors - ALLOC_START as usize) / block_sectors) as u16;
        VolumeInfo {
            creation_date: Some(now),
            modification_date: Some(now),
            attributes: 0,
            file_count: 0,
            dir_start: DIR_START,
            dir_len: DIR_SECTORS,
            alloc_blocks,
            alloc_block_size: ALLOC_BLOCK_SIZE,
            clump_size: ALLOC_BLOCK_SIZE * 8,
            alloc_start: ALLOC_START,
            next_file_num: 1,
            free_blocks: alloc_blocks,
            name: name.to_vec(),
        }
    }

    /// Byte offset of the file directory within the image.
    pub fn dir_offset(&self) -> usize {
        usize::from(self.dir_start) * SECTOR_SIZE
    }

    /// Length of the file directory in bytes.
    pub fn dir_byte_len(&self) -> usize {
        usize::from(self.dir_len) * SECTOR_SIZE
    }

    /// Physical byte offset of an allocation block. Block numbers start
    /// at 2: block 2 sits at the start of the allocation-block region.
    pub fn block_offset(&self, block: u16) -> usize {
        usize::from(self.alloc_start) * SECTOR_SIZE
            + usize::from(block - 2) * self.alloc_block_size as usize
    }

    /// The volume name decoded for display.
    pub fn display_name(&self) -> String {
        crate::macroman::decode(&self.name)
    }
}

impl ReadBinary for VolumeInfo {
    fn read(ctxt: &mut ReadCtxt<'_>) -> Result<VolumeInfo, Error> {
        let signature = ctxt.read_u16be()?;
        if signature != SIGNATURE {
            return Err(Error::InvalidSignature);
        }
        let creation_date = date::from_field(ctxt.read_u32be()?);
        let modification_date = date::from_field(ctxt.read_u32be()?);
        let attributes = ctxt.read_u16be()?;
        let file_count = ctxt.read_u16be()?;
        let dir_start = ctxt.read_u16be()?;
        let dir_len = ctxt.read_u16be()?;
        let alloc_blocks = ctxt.read_u16be()?;
        let alloc_block_size = ctxt.read_u32be()?;
        let clump_size = ctxt.read_u32be()?;
        let alloc_start = ctxt.read_u16be()?;
        let next_file_num = ctxt.read_u32be()?;
        let free_blocks = ctxt.read_u16be()?;
        let name = ctxt.read_pstring_slot(VOLUME_NAME_MAX + 1)?.to_vec();

        Ok(VolumeInfo {
            creation_date,
            modification_date,
            attributes,
            file_count,
            dir_start,
            dir_len,
            alloc_blocks,
            alloc_block_size,
            clump_size,
            alloc_start,
            next_file_num,
            free_blocks,
            name,
        })
    }
}

impl WriteBinary for VolumeInfo {
    fn write(&self, ctxt: &mut WriteCtxt<'_>) -> Result<(), Error> {
        ctxt.write_u16be(SIGNATURE)?;
        ctxt.write_u32be(date::to_field(self.creation_date))?;
        ctxt.write_u32be(date::to_field(self.modification_date))?;
        ctxt.write_u16be(self.attributes)?;
        ctxt.write_u16be(self.file_count)?;
        ctxt.write_u16be(self.dir_start)?;
        ctxt.write_u16be(self.dir_len)?;
        ctxt.write_u16be(self.alloc_blocks)?;
        ctxt.write_u32be(self.alloc_block_size)?;
        ctxt.write_u32be(self.clump_size)?;
        ctxt.write_u16be(self.alloc_start)?;
        ctxt.write_u32be(self.next_file_num)?;
        ctxt.write_u16be(self.free_blocks)?;
        ctxt.write_pstring_slot(&self.name, VOLUME_NAME_MAX + 1)?;
        Ok(())
    }
}
