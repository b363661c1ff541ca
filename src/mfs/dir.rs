//! The flat file directory.
//!
//! Directory sectors hold packed variable-length entries: 50 fixed header
//! bytes, a Pascal-string name, and a padding byte when needed so the
//! next entry starts on an even offset. Entries never span a sector
//! boundary; an entry whose flag byte has bit 7 clear ends scanning of
//! its sector (later sectors are still scanned).

use crate::binary::read::{ReadCtxt, ReadScope};
use crate::binary::write::WriteCtxt;
use crate::date;
use crate::error::Error;
use crate::mfs::mdb::{SECTOR_SIZE, VolumeInfo};
use crate::FourCC;

/// Fixed bytes of an entry before the name.
pub const ENTRY_HEADER_LEN: usize = 50;

/// Smallest entry on disk: header, empty name's length byte, padding.
pub const MIN_ENTRY_LEN: usize = 52;

/// Flag bit marking an entry as in use.
pub const FLAG_IN_USE: u8 = 0x80;

/// One fork's allocation as recorded in a directory entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ForkInfo {
    /// First allocation block, 0 when the fork is empty
    pub start_block: u16,
    /// Logical length in bytes
    pub logical_len: u32,
    /// Space held by the chain in bytes
    pub alloc_len: u32,
}

/// A decoded directory entry plus its byte offset within the image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    /// `flFlags` — bit 7 set while the entry is in use
    pub flags: u8,
    /// `flTyp` — entry version, always 0
    pub version: u8,
    /// Finder type code
    pub file_type: FourCC,
    /// Finder creator code
    pub creator: FourCC,
    /// `fdFlags` from the Finder info
    pub finder_flags: u16,
    /// Icon coordinates within the Finder window
    pub icon_position: (i16, i16),
    /// Window or folder the file appears in
    pub folder_num: i16,
    /// `flFNum` — the volume-unique file number
    pub file_num: u32,
    /// Data fork allocation
    pub data_fork: ForkInfo,
    /// Resource fork allocation
    pub rsrc_fork: ForkInfo,
    /// Creation date, seconds since the Mac epoch
    pub created: Option<u32>,
    /// Modification date, seconds since the Mac epoch
    pub modified: Option<u32>,
    /// File name, raw Mac OS Roman bytes
    pub name: Vec<u8>,
    /// Byte offset of this entry within the volume image
    pub offset: usize,
}

impl DirEntry {
    /// Bytes this entry occupies on disk, including the even-offset pad.
    pub fn on_disk_len(&self) -> usize {
        let len = ENTRY_HEADER_LEN + 1 + self.name.len();
        len + (len & 1)
    }

    fn read(ctxt: &mut ReadCtxt<'_>, offset: usize) -> Result<DirEntry, Error> {
        let flags = ctxt.read_u8()?;
        let version = ctxt.read_u8()?;
        let file_type = FourCC(ctxt.read_u32be()?);
        let creator = FourCC(ctxt.read_u32be()?);
        let finder_flags = ctxt.read_u16be()?;
        let icon_position = (ctxt.read_i16be()?, ctxt.read_i16be()?);
        let folder_num = ctxt.read_i16be()?;
        let file_num = ctxt.read_u32be()?;
        let data_fork = ForkInfo {
            start_block: ctxt.read_u16be()?,
            logical_len: ctxt.read_u32be()?,
            alloc_len: ctxt.read_u32be()?,
        };
        let rsrc_fork = ForkInfo {
            start_block: ctxt.read_u16be()?,
            logical_len: ctxt.read_u32be()?,
            alloc_len: ctxt.read_u32be()?,
        };
        let created = date::from_field(ctxt.read_u32be()?);
        let modified = date::from_field(ctxt.read_u32be()?);
        let name = ctxt.read_pstring()?.to_vec();
        if ctxt.consumed() & 1 == 1 {
            let _ = ctxt.read_u8()?;
        }

        Ok(DirEntry {
            flags,
            version,
            file_type,
            creator,
            finder_flags,
            icon_position,
            folder_num,
            file_num,
            data_fork,
            rsrc_fork,
            created,
            modified,
            name,
            offset,
        })
    }

    /// Serialise this entry, padding to an even length.
    pub fn write(&self, ctxt: &mut WriteCtxt<'_>) -> Result<(), Error> {
        ctxt.write_u8(self.flags)?;
        ctxt.write_u8(self.version)?;
        ctxt.write_u32be(self.file_type.0)?;
        ctxt.write_u32be(self.creator.0)?;
        ctxt.write_u16be(self.finder_flags)?;
        ctxt.write_i16be(self.icon_position.0)?;
        ctxt.write_i16be(self.icon_position.1)?;
        ctxt.write_i16be(self.folder_num)?;
        ctxt.write_u32be(self.file_num)?;
        for fork in [&self.data_fork, &self.rsrc_fork] {
            ctxt.write_u16be(fork.start_block)?;
            ctxt.write_u32be(fork.logical_len)?;
            ctxt.write_u32be(fork.alloc_len)?;
        }
        ctxt.write_u32be(date::to_field(self.created))?;
        ctxt.write_u32be(date::to_field(self.modified))?;
        ctxt.write_pstring(&self.name)?;
        if ctxt.written() & 1 == 1 {
            ctxt.write_u8(0)?;
        }
        Ok(())
    }
}

/// Scan the directory sectors of `image`, sector by sector. Within each
/// sector, the first flag byte without bit 7 ends that sector's entries.
pub fn scan(image: &[u8], info: &VolumeInfo) -> Result<Vec<DirEntry>, Error> {
    let mut entries = Vec::new();
    for sector in 0..usize::from(info.dir_len) {
        let sector_start = info.dir_offset() + sector * SECTOR_SIZE;
        let sector_end = sector_start + SECTOR_SIZE;
        if sector_end > image.len() {
            return Err(Error::Corrupted("directory extends past the image"));
        }
        let mut offset = sector_start;
        while offset < sector_end {
            if image[offset] & FLAG_IN_USE == 0 {
                break;
            }
            let scope = ReadScope::new(&image[offset..sector_end]);
            let mut ctxt = scope.ctxt();
            let entry = DirEntry::read(&mut ctxt, offset)
                .map_err(|_| Error::Corrupted("directory entry spans a sector boundary"))?;
            offset += entry.on_disk_len();
            entries.push(entry);
        }
    }
    Ok(entries)
}

/// Find the byte offset for a new entry of `entry_len` bytes: directly
/// after the last in-use entry, bumped to the next sector when the entry
/// would straddle a boundary.
pub fn find_slot(
    entries: &[DirEntry],
    info: &VolumeInfo,
    entry_len: usize,
) -> Result<usize, Error> {
    let dir_start = info.dir_offset();
    let dir_end = dir_start + info.dir_byte_len();
    let mut slot = match entries.last() {
        Some(last) => last.offset + last.on_disk_len(),
        None => dir_start,
    };
    // Entries never span a sector boundary
    let sector_end = (slot / SECTOR_SIZE + 1) * SECTOR_SIZE;
    if slot + entry_len > sector_end {
        slot = sector_end;
    }
    if slot + entry_len > dir_end {
        return Err(Error::DirectoryFull);
    }
    Ok(slot)
}

/// Locate an in-use entry by raw name bytes.
pub fn find_by_name<'e>(entries: &'e [DirEntry], name: &[u8]) -> Option<&'e DirEntry> {
    entries.iter().find(|entry| entry.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mfs::mdb;

    fn entry(name: &[u8], file_num: u32) -> DirEntry {
        DirEntry {
            flags: FLAG_IN_USE,
            version: 0,
            file_type: FourCC::try_from("TEXT").unwrap(),
            creator: FourCC::try_from("EDIT").unwrap(),
            finder_flags: 0,
            icon_position: (0, 0),
            folder_num: 0,
            file_num,
            data_fork: ForkInfo {
                start_block: 2,
                logical_len: 10,
                alloc_len: 1024,
            },
            rsrc_fork: ForkInfo::default(),
            created: Some(0x1000),
            modified: Some(0x2000),
            name: name.to_vec(),
            offset: 0,
        }
    }

    #[test]
    fn test_on_disk_len_is_even() {
        // 50 + 1 + 9 = 60, already even
        assert_eq!(entry(b"Hello.txt", 1).on_disk_len(), 60);
        // 50 + 1 + 4 = 55, padded to 56
        assert_eq!(entry(b"Test", 1).on_disk_len(), 56);
        assert_eq!(entry(b"", 1).on_disk_len(), MIN_ENTRY_LEN);
    }

    #[test]
    fn test_entry_roundtrip() {
        let original = entry(b"Hello.txt", 7);
        let mut buf = vec![0u8; original.on_disk_len()];
        original.write(&mut WriteCtxt::new(&mut buf)).unwrap();
        assert_eq!(buf[0], FLAG_IN_USE);

        let scope = ReadScope::new(&buf);
        let decoded = DirEntry::read(&mut scope.ctxt(), 0).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_scan_stops_per_sector() {
        let info = mdb::VolumeInfo::format(800, b"T", 1);
        let mut image = vec![0u8; 800 * SECTOR_SIZE];

        // One entry at the start of the first directory sector, another at
        // the start of the second; the gap after the first terminates only
        // sector one's scan.
        let first = entry(b"First", 1);
        let mut second = entry(b"Second", 2);
        let mut buf = vec![0u8; first.on_disk_len()];
        first.write(&mut WriteCtxt::new(&mut buf)).unwrap();
        image[info.dir_offset()..info.dir_offset() + buf.len()].copy_from_slice(&buf);

        let second_offset = info.dir_offset() + SECTOR_SIZE;
        let mut buf = vec![0u8; second.on_disk_len()];
        second.write(&mut WriteCtxt::new(&mut buf)).unwrap();
        image[second_offset..second_offset + buf.len()].copy_from_slice(&buf);

        let entries = scan(&image, &info).unwrap();
        second.offset = second_offset;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].name, b"First");
        assert_eq!(entries[1], second);
    }

    #[test]
    fn test_find_slot_appends() {
        let info = mdb::VolumeInfo::format(800, b"T", 1);
        let mut first = entry(b"First", 1);
        first.offset = info.dir_offset();
        let slot = find_slot(&[first.clone()], &info, 60).unwrap();
        assert_eq!(slot, info.dir_offset() + first.on_disk_len());
    }

    #[test]
    fn test_find_slot_respects_sector_boundary() {
        let info = mdb::VolumeInfo::format(800, b"T", 1);
        // Last entry ends 10 bytes before its sector does
        let mut last = entry(b"Near end", 1);
        last.offset = info.dir_offset() + SECTOR_SIZE - 10 - last.on_disk_len();
        let slot = find_slot(&[last], &info, 60).unwrap();
        assert_eq!(slot, info.dir_offset() + SECTOR_SIZE);
    }

    #[test]
    fn test_find_slot_directory_full() {
        let info = mdb::VolumeInfo::format(800, b"T", 1);
        let mut last = entry(b"Last", 1);
        last.offset = info.dir_offset() + info.dir_byte_len() - last.on_disk_len();
        assert_eq!(find_slot(&[last], &info, 60), Err(Error::DirectoryFull));
    }
}
