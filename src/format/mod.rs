//! ZIP format constants, record layouts and low-level parsing.
//!
//! Values follow PKWARE's APPNOTE. All multi-byte integers are little-endian.

pub mod directory;
pub mod extra;
pub mod header;
pub mod name;
pub mod reader;

/// Record signatures.
pub mod signature {
    /// Local file header.
    pub const LOCAL_HEADER: u32 = 0x0403_4b50;
    /// Central directory file header.
    pub const CENTRAL_HEADER: u32 = 0x0201_4b50;
    /// End of central directory record.
    pub const END_OF_CENTRAL_DIR: u32 = 0x0605_4b50;
    /// Zip64 end of central directory locator.
    pub const ZIP64_LOCATOR: u32 = 0x0706_4b50;
    /// Zip64 end of central directory record.
    pub const ZIP64_END_OF_CENTRAL_DIR: u32 = 0x0606_4b50;
}

/// Compression methods.
pub mod method {
    /// No compression.
    pub const STORED: u16 = 0;
    /// Dynamic LZW.
    pub const SHRUNK: u16 = 1;
    /// Reduce with compression factor 1.
    pub const REDUCED1: u16 = 2;
    /// Reduce with compression factor 4.
    pub const REDUCED4: u16 = 5;
    /// Shannon-Fano coded sliding dictionary.
    pub const IMPLODED: u16 = 6;
    /// Deflate.
    pub const DEFLATED: u16 = 8;
    /// Enhanced deflate with a 64 KiB window.
    pub const DEFLATE64: u16 = 9;
    /// BZip2.
    pub const BZIP2: u16 = 12;
    /// WinZip AES wrapper, the real method sits in the AES extra field.
    pub const AES: u16 = 99;

    /// Returns a short human-readable name.
    pub fn name(method: u16) -> &'static str {
        match method {
            STORED => "stored",
            SHRUNK => "shrunk",
            REDUCED1..=REDUCED4 => "reduced",
            IMPLODED => "imploded",
            DEFLATED => "deflated",
            DEFLATE64 => "deflate64",
            BZIP2 => "bzip2",
            AES => "aes",
            _ => "unknown",
        }
    }
}

/// General purpose bit flags.
pub mod flags {
    /// Entry is encrypted.
    pub const ENCRYPTED: u16 = 0x0001;
    /// Implode: 8 KiB dictionary instead of 4 KiB.
    pub const IMPLODE_8K_DICTIONARY: u16 = 0x0002;
    /// Implode: three Shannon-Fano trees (literal tree present).
    pub const IMPLODE_LITERAL_TREE: u16 = 0x0004;
    /// CRC and sizes follow the data in a data descriptor.
    pub const DATA_DESCRIPTOR: u16 = 0x0008;
    /// Name and comment are UTF-8.
    pub const UTF8: u16 = 0x0800;
}

/// Host systems from the high byte of "version made by".
pub mod host {
    /// MS-DOS and OS/2 FAT.
    pub const FAT: u8 = 0;
    /// Unix.
    pub const UNIX: u8 = 3;
    /// VM/CMS.
    pub const VM_CMS: u8 = 4;
    /// MVS.
    pub const MVS: u8 = 5;
    /// OS/2 HPFS.
    pub const HPFS: u8 = 6;
    /// Windows NTFS.
    pub const NTFS: u8 = 11;
    /// Acorn RISC OS.
    pub const ACORN: u8 = 13;
    /// Windows 95 VFAT.
    pub const VFAT: u8 = 14;

    /// Returns `true` for hosts whose external attributes carry DOS bits.
    pub fn is_fat_family(host: u8) -> bool {
        matches!(host, FAT | VM_CMS | MVS | HPFS | NTFS | ACORN | VFAT)
    }
}

/// DOS attribute marking a directory.
pub const ATTRIBUTE_DIRECTORY: u16 = 0x10;

/// Extra field header IDs.
pub mod extra_id {
    /// Zip64 extended information.
    pub const ZIP64: u16 = 0x0001;
    /// WinZip AES.
    pub const AES: u16 = 0x9901;
}

/// Fixed size of the local file header.
pub const LOCAL_HEADER_SIZE: usize = 30;
/// Fixed size of the central directory header.
pub const CENTRAL_HEADER_SIZE: usize = 46;
/// Fixed size of the end of central directory record.
pub const END_OF_CENTRAL_DIR_SIZE: usize = 22;
/// Fixed size of the Zip64 locator.
pub const ZIP64_LOCATOR_SIZE: usize = 20;
/// Fixed size of the Zip64 end of central directory record.
pub const ZIP64_END_OF_CENTRAL_DIR_SIZE: usize = 56;
/// Size of the classic ZIP encryption header.
pub const ZIPCRYPTO_HEADER_SIZE: u64 = 12;
/// Size of the WinZip AES password verifier.
pub const AES_VERIFIER_SIZE: u64 = 2;
/// Size of the WinZip AES authentication code.
pub const AES_MAC_SIZE: u64 = 10;
