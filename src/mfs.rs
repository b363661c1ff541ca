//! The Macintosh File System volume engine.
//!
//! A volume is a contiguous in-memory image: boot sectors, the Master
//! Directory Block (volume info plus allocation block map), the file
//! directory, then the allocation-block region. [MfsVolume] owns the
//! image and keeps decoded copies of the MDB structures coherent with it
//! across file operations.
//!
//! ### Reference:
//!
//! [Inside Macintosh Volume II](https://archive.org/details/inside-macintosh-1992-1994/1985-inside_macintosh_ii/),
//! File Manager chapter — Data Organization on Volumes (pp. 119)

pub mod dir;
pub mod map;
pub mod mdb;

use log::warn;

use crate::binary::read::ReadScope;
use crate::binary::write::{WriteBinary, WriteCtxt};
use crate::date;
use crate::error::Error;
use crate::macroman;
use crate::FourCC;

use dir::{DirEntry, ForkInfo, FLAG_IN_USE};
use map::{AllocMap, ChainWarning};
use mdb::{VolumeInfo, MDB_LEN, MDB_OFFSET, SECTOR_SIZE, VOLUME_INFO_LEN, VOLUME_NAME_MAX};

/// Which fork of a file an operation addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fork {
    /// The data fork
    #[default]
    Data,
    /// The resource fork
    Resource,
}

/// Options for formatting a new volume.
#[derive(Debug, Clone)]
pub struct FormatOptions {
    /// Image size in kilobytes
    pub size_kb: u32,
    /// Volume name, truncated to 27 characters
    pub volume_name: String,
}

impl Default for FormatOptions {
    fn default() -> FormatOptions {
        FormatOptions {
            size_kb: 400,
            volume_name: String::from("Untitled"),
        }
    }
}

/// Metadata supplied when creating a file.
#[derive(Debug, Clone)]
pub struct FileMeta {
    /// Finder type code
    pub file_type: FourCC,
    /// Finder creator code
    pub creator: FourCC,
    /// Window or folder number
    pub folder_num: i16,
    /// Finder flags
    pub finder_flags: u16,
    /// Creation date (Mac epoch seconds); defaults to the wall clock
    pub created: Option<u32>,
    /// Modification date (Mac epoch seconds); defaults to the wall clock
    pub modified: Option<u32>,
}

impl FileMeta {
    /// Metadata with the given type and creator and default Finder state.
    pub fn new(file_type: FourCC, creator: FourCC) -> FileMeta {
        FileMeta {
            file_type,
            creator,
            folder_num: 0,
            finder_flags: 0,
            created: None,
            modified: None,
        }
    }
}

/// Everything a directory entry records about a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// File name decoded from Mac OS Roman for display
    pub name: String,
    /// File name as stored, raw Mac OS Roman bytes
    pub raw_name: Vec<u8>,
    /// Finder type code
    pub file_type: FourCC,
    /// Finder creator code
    pub creator: FourCC,
    /// Data fork length in bytes
    pub data_len: u32,
    /// Resource fork length in bytes
    pub rsrc_len: u32,
    /// Creation date, seconds since the Mac epoch
    pub created: Option<u32>,
    /// Modification date, seconds since the Mac epoch
    pub modified: Option<u32>,
    /// Volume-unique file number
    pub file_num: u32,
    /// Window or folder number
    pub folder_num: i16,
    /// Finder flags
    pub finder_flags: u16,
    /// Icon coordinates
    pub icon_position: (i16, i16),
}

impl FileInfo {
    fn from_entry(entry: &DirEntry) -> FileInfo {
        FileInfo {
            name: macroman::decode(&entry.name),
            raw_name: entry.name.clone(),
            file_type: entry.file_type,
            creator: entry.creator,
            data_len: entry.data_fork.logical_len,
            rsrc_len: entry.rsrc_fork.logical_len,
            created: entry.created,
            modified: entry.modified,
            file_num: entry.file_num,
            folder_num: entry.folder_num,
            finder_flags: entry.finder_flags,
            icon_position: entry.icon_position,
        }
    }
}

/// An MFS volume held in memory.
///
/// Operations happen strictly in call order; the image buffer is owned by
/// the handle until [into_image](MfsVolume::into_image) releases it.
#[derive(Debug, PartialEq, Eq)]
pub struct MfsVolume {
    image: Vec<u8>,
    info: VolumeInfo,
    map: AllocMap,
    entries: Vec<DirEntry>,
    warnings: Vec<ChainWarning>,
}

impl MfsVolume {
    /// Format a blank volume.
    pub fn format(options: &FormatOptions) -> Result<MfsVolume, Error> {
        let size = options.size_kb as usize * 1024;
        let total_sectors = size / SECTOR_SIZE;
        let block_sectors = mdb::ALLOC_BLOCK_SIZE as usize / SECTOR_SIZE;
        let min_sectors = usize::from(mdb::ALLOC_START) + block_sectors;
        if options.size_kb == 0 || total_sectors < min_sectors {
            return Err(Error::InvalidArgument(
                "volume too small for boot blocks, MDB, directory and one allocation block",
            ));
        }

        let alloc_blocks = (total_sectors - usize::from(mdb::ALLOC_START)) / block_sectors;
        if map::packed_len(alloc_blocks) > MDB_LEN - VOLUME_INFO_LEN {
            return Err(Error::InvalidArgument(
                "volume too large for a single-MDB allocation map",
            ));
        }

        let mut name = macroman::encode(&options.volume_name)
            .ok_or(Error::InvalidArgument("volume name is not Mac OS Roman"))?;
        name.truncate(VOLUME_NAME_MAX);

        let info = VolumeInfo::format(total_sectors, &name, date::now());
        let map = AllocMap::new(info.alloc_blocks);
        let mut volume = MfsVolume {
            image: vec![0u8; size],
            info,
            map,
            entries: Vec::new(),
            warnings: Vec::new(),
        };
        volume.write_mdb()?;
        Ok(volume)
    }

    /// Load a volume from an existing image.
    pub fn parse(image: Vec<u8>) -> Result<MfsVolume, Error> {
        if image.is_empty() || image.len() % SECTOR_SIZE != 0 {
            return Err(Error::InvalidArgument(
                "image size must be a positive multiple of 512",
            ));
        }
        let mdb_scope = ReadScope::new(&image)
            .offset_length(MDB_OFFSET, MDB_LEN)
            .map_err(|_| Error::InvalidArgument("image too small to hold an MDB"))?;
        let info = mdb_scope.read::<VolumeInfo>()?;

        if info.alloc_block_size == 0 || info.alloc_block_size as usize % SECTOR_SIZE != 0 {
            return Err(Error::Corrupted("allocation block size is not sector-aligned"));
        }
        if map::packed_len(usize::from(info.alloc_blocks)) > MDB_LEN - VOLUME_INFO_LEN {
            return Err(Error::Corrupted("allocation map overruns the MDB"));
        }
        if info.dir_offset() + info.dir_byte_len() > image.len() {
            return Err(Error::Corrupted("directory extends past the image"));
        }
        if info.alloc_blocks > 0
            && info.block_offset(info.alloc_blocks + 1) + info.alloc_block_size as usize
                > image.len()
        {
            return Err(Error::Corrupted("allocation blocks extend past the image"));
        }

        let map = AllocMap::unpack(&mdb_scope.data()[VOLUME_INFO_LEN..], info.alloc_blocks)?;
        if map.free_count() != info.free_blocks {
            warn!(
                "volume info counts {} free blocks but the map holds {}",
                info.free_blocks,
                map.free_count()
            );
        }

        let entries = dir::scan(&image, &info)?;

        Ok(MfsVolume {
            image,
            info,
            map,
            entries,
            warnings: Vec::new(),
        })
    }

    /// The decoded volume information.
    pub fn volume_info(&self) -> &VolumeInfo {
        &self.info
    }

    /// The full volume image.
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Release the volume image.
    pub fn into_image(self) -> Vec<u8> {
        self.image
    }

    /// Chain-corruption observations accumulated by delete operations,
    /// draining them from the handle.
    pub fn take_warnings(&mut self) -> Vec<ChainWarning> {
        std::mem::take(&mut self.warnings)
    }

    /// All files in directory order.
    pub fn list_files(&self) -> Vec<FileInfo> {
        self.entries.iter().map(FileInfo::from_entry).collect()
    }

    /// Look up one file by name.
    pub fn file_info(&self, name: &str) -> Option<FileInfo> {
        let name = macroman::encode(name)?;
        dir::find_by_name(&self.entries, &name).map(FileInfo::from_entry)
    }

    /// Create an empty file: both forks zero-length, no blocks allocated.
    pub fn create_file(&mut self, name: &str, meta: &FileMeta) -> Result<FileInfo, Error> {
        self.write_file(name, None, None, meta)
    }

    /// Write a file with the given fork contents, replacing any existing
    /// file of the same name (delete-then-create).
    pub fn write_file(
        &mut self,
        name: &str,
        data: Option<&[u8]>,
        rsrc: Option<&[u8]>,
        meta: &FileMeta,
    ) -> Result<FileInfo, Error> {
        let raw_name = encode_file_name(name)?;
        let data = data.unwrap_or(&[]);
        let rsrc = rsrc.unwrap_or(&[]);

        if dir::find_by_name(&self.entries, &raw_name).is_some() {
            self.delete_file(name)?;
        }

        let block_size = self.info.alloc_block_size as usize;
        let needed = data.len().div_ceil(block_size) + rsrc.len().div_ceil(block_size);
        if needed > usize::from(self.info.free_blocks) {
            return Err(Error::DiskFull {
                needed: needed.min(usize::from(u16::MAX)) as u16,
                free: self.info.free_blocks,
            });
        }
        let data_blocks = data.len().div_ceil(block_size) as u16;
        let rsrc_blocks = rsrc.len().div_ceil(block_size) as u16;

        let (data_start, data_chain) = self.map.allocate_chain(data_blocks)?;
        let (rsrc_start, rsrc_chain) = match self.map.allocate_chain(rsrc_blocks) {
            Ok(allocated) => allocated,
            Err(error) => {
                let mut discard = Vec::new();
                self.map.free_chain(data_start, &mut discard);
                return Err(error);
            }
        };
        self.info.free_blocks -= data_blocks + rsrc_blocks;

        let now = date::now();
        let entry = DirEntry {
            flags: FLAG_IN_USE,
            version: 0,
            file_type: meta.file_type,
            creator: meta.creator,
            finder_flags: meta.finder_flags,
            icon_position: (0, 0),
            folder_num: meta.folder_num,
            file_num: self.info.next_file_num,
            data_fork: ForkInfo {
                start_block: data_start,
                logical_len: data.len() as u32,
                alloc_len: data_chain.len() as u32 * block_size as u32,
            },
            rsrc_fork: ForkInfo {
                start_block: rsrc_start,
                logical_len: rsrc.len() as u32,
                alloc_len: rsrc_chain.len() as u32 * block_size as u32,
            },
            created: meta.created.or(Some(now)),
            modified: meta.modified.or(Some(now)),
            name: raw_name,
            offset: 0,
        };

        let offset = match dir::find_slot(&self.entries, &self.info, entry.on_disk_len()) {
            Ok(offset) => offset,
            Err(error) => {
                // Roll back both chains so the failed write leaves the
                // volume exactly as it found it.
                let mut discard = Vec::new();
                let freed = self.map.free_chain(data_start, &mut discard)
                    + self.map.free_chain(rsrc_start, &mut discard);
                self.info.free_blocks += freed;
                return Err(error);
            }
        };
        let entry = DirEntry { offset, ..entry };

        let end = offset + entry.on_disk_len();
        entry.write(&mut WriteCtxt::new(&mut self.image[offset..end]))?;

        self.write_fork(&data_chain, data);
        self.write_fork(&rsrc_chain, rsrc);

        self.info.next_file_num += 1;
        self.info.file_count += 1;
        self.info.modification_date = Some(now);
        self.write_mdb()?;

        let info = FileInfo::from_entry(&entry);
        self.entries.push(entry);
        Ok(info)
    }

    /// Read one fork of a file.
    pub fn read_file(&self, name: &str, fork: Fork) -> Result<Vec<u8>, Error> {
        let raw_name =
            macroman::encode(name).ok_or(Error::InvalidArgument("name is not Mac OS Roman"))?;
        let entry = dir::find_by_name(&self.entries, &raw_name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let fork_info = match fork {
            Fork::Data => &entry.data_fork,
            Fork::Resource => &entry.rsrc_fork,
        };
        if fork_info.start_block == 0 || fork_info.logical_len == 0 {
            return Ok(Vec::new());
        }

        let block_size = self.info.alloc_block_size as usize;
        let logical_len = fork_info.logical_len as usize;
        let mut out = vec![0u8; logical_len];
        let mut block = fork_info.start_block;
        let mut read = 0usize;
        let mut visited = 0u16;
        loop {
            if block < map::FIRST_BLOCK || block > self.map.max_block() {
                return Err(Error::Corrupted("chain block out of range"));
            }
            visited += 1;
            if visited > self.map.len() {
                return Err(Error::Corrupted("chain does not terminate"));
            }

            let chunk = (logical_len - read).min(block_size);
            let offset = self.info.block_offset(block);
            out[read..read + chunk].copy_from_slice(&self.image[offset..offset + chunk]);
            read += chunk;
            if read == logical_len {
                return Ok(out);
            }

            block = match self.map.get(block) {
                Some(map::END_OF_CHAIN) => {
                    return Err(Error::Corrupted("chain ended before logical length"));
                }
                Some(map::FREE) | None => {
                    return Err(Error::Corrupted("chain ran into a free entry"));
                }
                Some(map::DIRECTORY) => {
                    return Err(Error::Corrupted("chain ran into a directory block"));
                }
                Some(next) => next,
            };
        }
    }

    /// Delete a file: free its chains, clear the entry's in-use flag, and
    /// update the volume info. The entry's other bytes stay in place.
    pub fn delete_file(&mut self, name: &str) -> Result<(), Error> {
        let raw_name =
            macroman::encode(name).ok_or(Error::InvalidArgument("name is not Mac OS Roman"))?;
        let index = self
            .entries
            .iter()
            .position(|entry| entry.name == raw_name)
            .ok_or_else(|| Error::NotFound(name.to_string()))?;
        let entry = self.entries.remove(index);

        let freed = self.map.free_chain(entry.data_fork.start_block, &mut self.warnings)
            + self.map.free_chain(entry.rsrc_fork.start_block, &mut self.warnings);
        self.info.free_blocks += freed;

        self.image[entry.offset] &= !FLAG_IN_USE;

        self.info.file_count -= 1;
        self.info.modification_date = Some(date::now());
        self.write_mdb()
    }

    /// Copy fork contents into the blocks of a freshly allocated chain.
    fn write_fork(&mut self, chain: &[u16], contents: &[u8]) {
        let block_size = self.info.alloc_block_size as usize;
        for (index, &block) in chain.iter().enumerate() {
            let source =
                &contents[index * block_size..contents.len().min((index + 1) * block_size)];
            let offset = self.info.block_offset(block);
            self.image[offset..offset + source.len()].copy_from_slice(source);
        }
    }

    /// Serialise the volume info and the repacked map into the MDB.
    fn write_mdb(&mut self) -> Result<(), Error> {
        let mdb = &mut self.image[MDB_OFFSET..MDB_OFFSET + MDB_LEN];
        self.info.write(&mut WriteCtxt::new(&mut mdb[..VOLUME_INFO_LEN]))?;
        self.map.pack(&mut mdb[VOLUME_INFO_LEN..])
    }
}

fn encode_file_name(name: &str) -> Result<Vec<u8>, Error> {
    let raw = macroman::encode(name).ok_or(Error::InvalidArgument("name is not Mac OS Roman"))?;
    if raw.len() > 255 {
        return Err(Error::InvalidArgument("name longer than 255 bytes"));
    }
    Ok(raw)
}
