//! Symbol resolution from an ELF image.
//!
//! The image is read piecewise from a seekable stream (normally
//! `/proc/<pid>/exe`): file header, section header table, the section name
//! table and finally the first symbol table together with its string table.
//! Every function symbol that lives in `.text`, has a name and a non-zero
//! size becomes a [`SymbolRecord`].

use std::io::{Read, Seek, SeekFrom};
use std::mem::size_of;

use log::{debug, trace};
use zerocopy::{AsBytes, FromBytes};

use crate::error::{Error, Result};

/// Name of the section holding executable code.
pub const CODE_SECTION: &str = ".text";

const ELF_MAGIC: &[u8] = b"\x7fELF";
const EI_NIDENT: usize = 16;
const EI_CLASS: usize = 4;
const EI_DATA: usize = 5;
const ELFCLASS32: u8 = 1;
const ELFCLASS64: u8 = 2;
const ELFDATA2LSB: u8 = 1;
const ELFDATA2MSB: u8 = 2;
const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;
const SHT_SYMTAB: u32 = 2;
const SHN_LORESERVE: u16 = 0xff00;
const SHN_XINDEX: u16 = 0xffff;

const ELFDATA_NATIVE: u8 = if cfg!(target_endian = "little") {
    ELFDATA2LSB
} else {
    ELFDATA2MSB
};

/// One candidate trace point: a named function entry in the code section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolRecord {
    pub name: String,
    pub address: u64,
}

impl SymbolRecord {
    pub fn new(name: impl Into<String>, address: u64) -> Self {
        SymbolRecord {
            name: name.into(),
            address,
        }
    }

    /// The same record with its address moved by the load bias of the image.
    pub fn rebased(&self, bias: u64) -> Self {
        SymbolRecord {
            name: self.name.clone(),
            address: self.address.wrapping_add(bias),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Class {
    Elf32,
    Elf64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    /// `ET_EXEC`: symbol values are absolute addresses.
    Executable,
    /// `ET_DYN`: symbol values are relative to the load address.
    PositionIndependent,
    Other(u16),
}

impl From<u16> for ObjectKind {
    fn from(kind: u16) -> Self {
        match kind {
            ET_EXEC => ObjectKind::Executable,
            ET_DYN => ObjectKind::PositionIndependent,
            other => ObjectKind::Other(other),
        }
    }
}

/// Everything the resolver learned about an image.
#[derive(Debug, Clone)]
pub struct Image {
    pub class: Class,
    pub kind: ObjectKind,
    pub symbols: Vec<SymbolRecord>,
}

// On-disk layouts. Only the fields the resolver needs are read.

#[allow(dead_code)]
#[derive(FromBytes, AsBytes, Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct Elf32Header {
    pub ident: [u8; EI_NIDENT],
    pub kind: u16,
    pub machine: u16,
    pub version: u32,
    pub entry: u32,
    pub phoff: u32,
    pub shoff: u32,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

#[allow(dead_code)]
#[derive(FromBytes, AsBytes, Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct Elf64Header {
    pub ident: [u8; EI_NIDENT],
    pub kind: u16,
    pub machine: u16,
    pub version: u32,
    pub entry: u64,
    pub phoff: u64,
    pub shoff: u64,
    pub flags: u32,
    pub ehsize: u16,
    pub phentsize: u16,
    pub phnum: u16,
    pub shentsize: u16,
    pub shnum: u16,
    pub shstrndx: u16,
}

#[allow(dead_code)]
#[derive(FromBytes, AsBytes, Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct Elf32Section {
    pub name: u32,
    pub kind: u32,
    pub flags: u32,
    pub addr: u32,
    pub offset: u32,
    pub size: u32,
    pub link: u32,
    pub info: u32,
    pub addralign: u32,
    pub entsize: u32,
}

#[allow(dead_code)]
#[derive(FromBytes, AsBytes, Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct Elf64Section {
    pub name: u32,
    pub kind: u32,
    pub flags: u64,
    pub addr: u64,
    pub offset: u64,
    pub size: u64,
    pub link: u32,
    pub info: u32,
    pub addralign: u64,
    pub entsize: u64,
}

#[allow(dead_code)]
#[derive(FromBytes, AsBytes, Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct Elf32Symbol {
    pub name: u32,
    pub value: u32,
    pub size: u32,
    pub info: u8,
    pub other: u8,
    pub shndx: u16,
}

#[allow(dead_code)]
#[derive(FromBytes, AsBytes, Clone, Copy, Debug, Default)]
#[repr(C)]
pub(crate) struct Elf64Symbol {
    pub name: u32,
    pub info: u8,
    pub other: u8,
    pub shndx: u16,
    pub value: u64,
    pub size: u64,
}

struct FileHeader {
    kind: u16,
    shoff: u64,
    shnum: u16,
    shstrndx: u16,
}

struct Section {
    name: u32,
    kind: u32,
    offset: u64,
    size: u64,
    link: u32,
}

struct Symbol {
    name: u32,
    shndx: u16,
    value: u64,
    size: u64,
}

impl Class {
    fn from_ident(ident: &[u8]) -> Result<Self> {
        if &ident[..ELF_MAGIC.len()] != ELF_MAGIC {
            return Err(Error::malformed("not an ELF image"));
        }
        let class = match ident[EI_CLASS] {
            ELFCLASS32 => Class::Elf32,
            ELFCLASS64 => Class::Elf64,
            other => return Err(Error::malformed(format!("unknown ELF class {}", other))),
        };
        if ident[EI_DATA] != ELFDATA_NATIVE {
            return Err(Error::malformed(format!(
                "byte order {} differs from the host",
                ident[EI_DATA]
            )));
        }
        Ok(class)
    }

    pub(crate) fn header_size(self) -> usize {
        match self {
            Class::Elf32 => size_of::<Elf32Header>(),
            Class::Elf64 => size_of::<Elf64Header>(),
        }
    }

    pub(crate) fn section_size(self) -> usize {
        match self {
            Class::Elf32 => size_of::<Elf32Section>(),
            Class::Elf64 => size_of::<Elf64Section>(),
        }
    }

    pub(crate) fn symbol_size(self) -> usize {
        match self {
            Class::Elf32 => size_of::<Elf32Symbol>(),
            Class::Elf64 => size_of::<Elf64Symbol>(),
        }
    }

    fn header(self, bytes: &[u8]) -> Option<FileHeader> {
        Some(match self {
            Class::Elf32 => {
                let h = Elf32Header::read_from(bytes)?;
                FileHeader {
                    kind: h.kind,
                    shoff: u64::from(h.shoff),
                    shnum: h.shnum,
                    shstrndx: h.shstrndx,
                }
            }
            Class::Elf64 => {
                let h = Elf64Header::read_from(bytes)?;
                FileHeader {
                    kind: h.kind,
                    shoff: h.shoff,
                    shnum: h.shnum,
                    shstrndx: h.shstrndx,
                }
            }
        })
    }

    fn section(self, bytes: &[u8]) -> Option<Section> {
        Some(match self {
            Class::Elf32 => {
                let s = Elf32Section::read_from(bytes)?;
                Section {
                    name: s.name,
                    kind: s.kind,
                    offset: u64::from(s.offset),
                    size: u64::from(s.size),
                    link: s.link,
                }
            }
            Class::Elf64 => {
                let s = Elf64Section::read_from(bytes)?;
                Section {
                    name: s.name,
                    kind: s.kind,
                    offset: s.offset,
                    size: s.size,
                    link: s.link,
                }
            }
        })
    }

    fn symbol(self, bytes: &[u8]) -> Option<Symbol> {
        Some(match self {
            Class::Elf32 => {
                let s = Elf32Symbol::read_from(bytes)?;
                Symbol {
                    name: s.name,
                    shndx: s.shndx,
                    value: u64::from(s.value),
                    size: u64::from(s.size),
                }
            }
            Class::Elf64 => {
                let s = Elf64Symbol::read_from(bytes)?;
                Symbol {
                    name: s.name,
                    shndx: s.shndx,
                    value: s.value,
                    size: s.size,
                }
            }
        })
    }
}

/// Reads exactly `len` bytes at `offset`; anything less is a malformed image.
fn read_at<R: Read + Seek>(reader: &mut R, offset: u64, len: u64, what: &str) -> Result<Vec<u8>> {
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| Error::MalformedImage {
            what: format!("cannot seek to {} at {:#x}", what, offset),
            source: Some(e),
        })?;
    let mut buf = Vec::new();
    reader
        .by_ref()
        .take(len)
        .read_to_end(&mut buf)
        .map_err(|e| Error::MalformedImage {
            what: format!("cannot read {}", what),
            source: Some(e),
        })?;
    if (buf.len() as u64) < len {
        return Err(Error::malformed(format!(
            "short read of {}: {} of {} bytes",
            what,
            buf.len(),
            len
        )));
    }
    Ok(buf)
}

/// Section count and name table index, taken from section 0 when the file
/// header uses extended numbering.
fn section_numbering<R: Read + Seek>(
    reader: &mut R,
    class: Class,
    header: &FileHeader,
) -> Result<(u64, u32)> {
    let extended = header.shnum == 0 || header.shstrndx == SHN_XINDEX;
    if !extended || header.shoff == 0 {
        return Ok((u64::from(header.shnum), u32::from(header.shstrndx)));
    }
    let raw = read_at(
        reader,
        header.shoff,
        class.section_size() as u64,
        "initial section header",
    )?;
    let first = class
        .section(&raw)
        .ok_or_else(|| Error::malformed("initial section header"))?;
    let shnum = match header.shnum {
        0 => first.size,
        n => u64::from(n),
    };
    let shstrndx = match header.shstrndx {
        SHN_XINDEX => first.link,
        n => u32::from(n),
    };
    debug!("Extended numbering: {} sections, names in {}", shnum, shstrndx);
    Ok((shnum, shstrndx))
}

/// NUL-terminated string at `offset`; empty when the offset is out of range.
fn c_str(table: &[u8], offset: u32) -> &[u8] {
    let rest = table.get(offset as usize..).unwrap_or(&[]);
    let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
    &rest[..end]
}

/// Resolves the code section symbols of the image behind `reader`.
pub fn resolve<R: Read + Seek>(reader: &mut R) -> Result<Vec<SymbolRecord>> {
    inspect(reader).map(|image| image.symbols)
}

/// Like [`resolve`], but also reports the class and object type of the image.
pub fn inspect<R: Read + Seek>(reader: &mut R) -> Result<Image> {
    let ident = read_at(reader, 0, EI_NIDENT as u64, "ELF identification")?;
    let class = Class::from_ident(&ident)?;
    let raw_header = read_at(reader, 0, class.header_size() as u64, "ELF header")?;
    let header = class
        .header(&raw_header)
        .ok_or_else(|| Error::malformed("ELF header"))?;
    let kind = ObjectKind::from(header.kind);
    debug!(
        "{:?} {:?} image with {} sections at {:#x}",
        class, kind, header.shnum, header.shoff
    );

    let section_size = class.section_size();
    let (shnum, shstrndx) = section_numbering(reader, class, &header)?;
    let table_size = (section_size as u64)
        .checked_mul(shnum)
        .ok_or_else(|| Error::malformed(format!("section count {} too large", shnum)))?;
    let raw_sections = read_at(reader, header.shoff, table_size, "section header table")?;
    let sections: Vec<Section> = raw_sections
        .chunks_exact(section_size)
        .filter_map(|chunk| class.section(chunk))
        .collect();

    let names_section = sections.get(shstrndx as usize).ok_or_else(|| {
        Error::malformed(format!(
            "section name table index {} out of range",
            shstrndx
        ))
    })?;
    let section_names = read_at(
        reader,
        names_section.offset,
        names_section.size,
        "section name table",
    )?;

    let mut symbols = Vec::new();
    // only the first symbol table is consulted
    if let Some(symtab) = sections.iter().find(|s| s.kind == SHT_SYMTAB) {
        let strtab = sections.get(symtab.link as usize).ok_or_else(|| {
            Error::malformed(format!("symbol string table index {} out of range", symtab.link))
        })?;
        let names = read_at(reader, strtab.offset, strtab.size, "symbol string table")?;
        let raw_symbols = read_at(reader, symtab.offset, symtab.size, "symbol table")?;

        for (index, entry) in raw_symbols
            .chunks_exact(class.symbol_size())
            .filter_map(|chunk| class.symbol(chunk))
            .enumerate()
        {
            let section = match sections
                .get(usize::from(entry.shndx))
                .filter(|_| entry.shndx < SHN_LORESERVE)
            {
                Some(section) => section,
                None => {
                    trace!("Symbol {} references section {}, skipping", index, entry.shndx);
                    continue;
                }
            };
            if c_str(&section_names, section.name) != CODE_SECTION.as_bytes() {
                continue;
            }
            let name = c_str(&names, entry.name);
            if name.is_empty() || entry.size == 0 {
                trace!("Symbol {} at {:#x} is unnamed or empty, skipping", index, entry.value);
                continue;
            }
            symbols.push(SymbolRecord::new(
                String::from_utf8_lossy(name).into_owned(),
                entry.value,
            ));
        }
    } else {
        debug!("Image has no symbol table");
    }
    debug!("Resolved {} symbols in {}", symbols.len(), CODE_SECTION);

    Ok(Image {
        class,
        kind,
        symbols,
    })
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    const SHT_PROGBITS: u32 = 1;
    const SHT_STRTAB: u32 = 3;
    const TEXT: u16 = 1;
    const DATA: u16 = 2;
    const SECTION_COUNT: u16 = 6;

    fn ident(class: u8) -> [u8; EI_NIDENT] {
        let mut ident = [0u8; EI_NIDENT];
        ident[..4].copy_from_slice(ELF_MAGIC);
        ident[EI_CLASS] = class;
        ident[EI_DATA] = ELFDATA_NATIVE;
        ident[6] = 1;
        ident
    }

    fn push_symbol(class: Class, out: &mut Vec<u8>, name: u32, shndx: u16, value: u64, size: u64) {
        match class {
            Class::Elf32 => out.extend_from_slice(
                Elf32Symbol {
                    name,
                    value: value as u32,
                    size: size as u32,
                    info: 0x12,
                    shndx,
                    ..Default::default()
                }
                .as_bytes(),
            ),
            Class::Elf64 => out.extend_from_slice(
                Elf64Symbol {
                    name,
                    info: 0x12,
                    shndx,
                    value,
                    size,
                    ..Default::default()
                }
                .as_bytes(),
            ),
        }
    }

    fn push_section(class: Class, out: &mut Vec<u8>, name: u32, kind: u32, offset: usize, size: usize, link: u32) {
        match class {
            Class::Elf32 => out.extend_from_slice(
                Elf32Section {
                    name,
                    kind,
                    offset: offset as u32,
                    size: size as u32,
                    link,
                    ..Default::default()
                }
                .as_bytes(),
            ),
            Class::Elf64 => out.extend_from_slice(
                Elf64Section {
                    name,
                    kind,
                    offset: offset as u64,
                    size: size as u64,
                    link,
                    ..Default::default()
                }
                .as_bytes(),
            ),
        }
    }

    /// Sections: null, .text, .data, .symtab, .strtab, .shstrtab.
    fn build(class: Class, with_symtab: bool, symbols: &[(&str, u16, u64, u64)]) -> Vec<u8> {
        let section_names = ["", ".text", ".data", ".symtab", ".strtab", ".shstrtab"];
        let mut shstrtab = vec![0u8];
        let mut name_offsets = vec![0u32];
        for name in &section_names[1..] {
            name_offsets.push(shstrtab.len() as u32);
            shstrtab.extend_from_slice(name.as_bytes());
            shstrtab.push(0);
        }

        let mut strtab = vec![0u8];
        let mut symtab = Vec::new();
        push_symbol(class, &mut symtab, 0, 0, 0, 0);
        for &(name, shndx, value, size) in symbols {
            let offset = if name.is_empty() {
                0
            } else {
                let offset = strtab.len() as u32;
                strtab.extend_from_slice(name.as_bytes());
                strtab.push(0);
                offset
            };
            push_symbol(class, &mut symtab, offset, shndx, value, size);
        }

        let shstrtab_off = class.header_size();
        let strtab_off = shstrtab_off + shstrtab.len();
        let symtab_off = strtab_off + strtab.len();
        let shoff = symtab_off + symtab.len();

        let mut out = match class {
            Class::Elf32 => Elf32Header {
                ident: ident(ELFCLASS32),
                kind: ET_EXEC,
                version: 1,
                shoff: shoff as u32,
                ehsize: class.header_size() as u16,
                shentsize: class.section_size() as u16,
                shnum: SECTION_COUNT,
                shstrndx: 5,
                ..Default::default()
            }
            .as_bytes()
            .to_vec(),
            Class::Elf64 => Elf64Header {
                ident: ident(ELFCLASS64),
                kind: ET_DYN,
                version: 1,
                shoff: shoff as u64,
                ehsize: class.header_size() as u16,
                shentsize: class.section_size() as u16,
                shnum: SECTION_COUNT,
                shstrndx: 5,
                ..Default::default()
            }
            .as_bytes()
            .to_vec(),
        };
        out.extend_from_slice(&shstrtab);
        out.extend_from_slice(&strtab);
        out.extend_from_slice(&symtab);

        let symtab_kind = if with_symtab { SHT_SYMTAB } else { SHT_PROGBITS };
        push_section(class, &mut out, 0, 0, 0, 0, 0);
        push_section(class, &mut out, name_offsets[1], SHT_PROGBITS, 0, 0x100, 0);
        push_section(class, &mut out, name_offsets[2], SHT_PROGBITS, 0, 0x10, 0);
        push_section(class, &mut out, name_offsets[3], symtab_kind, symtab_off, symtab.len(), 4);
        push_section(class, &mut out, name_offsets[4], SHT_STRTAB, strtab_off, strtab.len(), 0);
        push_section(class, &mut out, name_offsets[5], SHT_STRTAB, shstrtab_off, shstrtab.len(), 0);
        out
    }

    fn scenario() -> Vec<(&'static str, u16, u64, u64)> {
        vec![
            ("main", TEXT, 0x8048400, 42),
            ("g_buf", DATA, 0x804a000, 4),
            ("helper", TEXT, 0x8048450, 10),
        ]
    }

    fn expected() -> Vec<SymbolRecord> {
        vec![
            SymbolRecord::new("main", 0x8048400),
            SymbolRecord::new("helper", 0x8048450),
        ]
    }

    #[test]
    fn resolves_code_symbols_of_32_bit_image() {
        let image = build(Class::Elf32, true, &scenario());
        let symbols = resolve(&mut Cursor::new(image)).unwrap();
        assert_eq!(symbols, expected());
    }

    #[test]
    fn resolves_code_symbols_of_64_bit_image() {
        let image = build(Class::Elf64, true, &scenario());
        let image = inspect(&mut Cursor::new(image)).unwrap();
        assert_eq!(image.class, Class::Elf64);
        assert_eq!(image.kind, ObjectKind::PositionIndependent);
        assert_eq!(image.symbols, expected());
    }

    #[test]
    fn skips_non_qualifying_entries() {
        let symbols = [
            ("", TEXT, 0x1000, 8),
            ("empty", TEXT, 0x1010, 0),
            ("past_end", SECTION_COUNT, 0x1020, 8),
            ("absolute", 0xfff1, 0x1030, 8),
            ("undefined", 0, 0, 8),
            ("kept", TEXT, 0x1040, 8),
        ];
        for class in &[Class::Elf32, Class::Elf64] {
            let image = build(*class, true, &symbols);
            let resolved = resolve(&mut Cursor::new(image)).unwrap();
            assert_eq!(resolved, vec![SymbolRecord::new("kept", 0x1040)]);
        }
    }

    #[test]
    fn no_code_symbols_is_empty_not_error() {
        let image = build(Class::Elf64, true, &[("g_buf", DATA, 0x804a000, 4)]);
        assert!(resolve(&mut Cursor::new(image)).unwrap().is_empty());
    }

    #[test]
    fn missing_symbol_table_is_empty() {
        let image = build(Class::Elf64, false, &scenario());
        assert!(resolve(&mut Cursor::new(image)).unwrap().is_empty());
    }

    #[test]
    fn truncated_header_is_malformed() {
        let image = build(Class::Elf64, true, &scenario());
        let err = resolve(&mut Cursor::new(image[..40].to_vec())).unwrap_err();
        assert!(matches!(err, Error::MalformedImage { .. }));
    }

    #[test]
    fn truncated_section_table_is_malformed() {
        let mut image = build(Class::Elf32, true, &scenario());
        let len = image.len();
        image.truncate(len - 10);
        let err = resolve(&mut Cursor::new(image)).unwrap_err();
        assert!(matches!(err, Error::MalformedImage { .. }));
    }

    /// Rewrites the size and link fields of section `index` in a built image.
    fn edit_section(class: Class, image: &mut [u8], index: usize, edit: impl FnOnce(&mut u64, &mut u32)) {
        let shoff = class.header(&image[..class.header_size()]).unwrap().shoff as usize;
        let at = shoff + index * class.section_size();
        let raw = &mut image[at..at + class.section_size()];
        match class {
            Class::Elf32 => {
                let mut section = Elf32Section::read_from(&*raw).unwrap();
                let mut size = u64::from(section.size);
                edit(&mut size, &mut section.link);
                section.size = size as u32;
                raw.copy_from_slice(section.as_bytes());
            }
            Class::Elf64 => {
                let mut section = Elf64Section::read_from(&*raw).unwrap();
                edit(&mut section.size, &mut section.link);
                raw.copy_from_slice(section.as_bytes());
            }
        }
    }

    fn edit_numbering(class: Class, image: &mut [u8], shnum: u16, shstrndx: u16) {
        let raw = &mut image[..class.header_size()];
        match class {
            Class::Elf32 => {
                let mut header = Elf32Header::read_from(&*raw).unwrap();
                header.shnum = shnum;
                header.shstrndx = shstrndx;
                raw.copy_from_slice(header.as_bytes());
            }
            Class::Elf64 => {
                let mut header = Elf64Header::read_from(&*raw).unwrap();
                header.shnum = shnum;
                header.shstrndx = shstrndx;
                raw.copy_from_slice(header.as_bytes());
            }
        }
    }

    fn short_read_of(err: Error, table: &str) -> bool {
        match err {
            Error::MalformedImage { what, .. } => what.starts_with(&format!("short read of {}:", table)),
            _ => false,
        }
    }

    #[test]
    fn symbol_table_past_end_of_file_is_malformed() {
        for class in &[Class::Elf32, Class::Elf64] {
            let mut image = build(*class, true, &scenario());
            edit_section(*class, &mut image, 3, |size, _| *size += 0x1000);
            let err = resolve(&mut Cursor::new(image)).unwrap_err();
            assert!(short_read_of(err, "symbol table"));
        }
    }

    #[test]
    fn symbol_string_table_past_end_of_file_is_malformed() {
        for class in &[Class::Elf32, Class::Elf64] {
            let mut image = build(*class, true, &scenario());
            edit_section(*class, &mut image, 4, |size, _| *size += 0x1000);
            let err = resolve(&mut Cursor::new(image)).unwrap_err();
            assert!(short_read_of(err, "symbol string table"));
        }
    }

    #[test]
    fn extended_section_numbering_is_read_from_section_zero() {
        for class in &[Class::Elf32, Class::Elf64] {
            let mut image = build(*class, true, &scenario());
            edit_section(*class, &mut image, 0, |size, link| {
                *size = u64::from(SECTION_COUNT);
                *link = 5;
            });
            edit_numbering(*class, &mut image, 0, SHN_XINDEX);
            let symbols = resolve(&mut Cursor::new(image)).unwrap();
            assert_eq!(symbols, expected());
        }
    }

    #[test]
    fn extended_name_table_index_alone() {
        let mut image = build(Class::Elf64, true, &scenario());
        edit_section(Class::Elf64, &mut image, 0, |_, link| *link = 5);
        edit_numbering(Class::Elf64, &mut image, SECTION_COUNT, SHN_XINDEX);
        assert_eq!(resolve(&mut Cursor::new(image)).unwrap(), expected());
    }

    #[test]
    fn rejects_non_elf_input() {
        let err = resolve(&mut Cursor::new(vec![0u8; 128])).unwrap_err();
        assert!(matches!(err, Error::MalformedImage { .. }));
    }

    #[test]
    fn string_lookup_stops_at_nul_and_table_end() {
        let table = b"\0main\0tail";
        assert_eq!(c_str(table, 1), b"main");
        assert_eq!(c_str(table, 6), b"tail");
        assert_eq!(c_str(table, 0), b"");
        assert_eq!(c_str(table, 99), b"");
    }

    #[test]
    fn rebased_record_keeps_name() {
        let record = SymbolRecord::new("main", 0x1140).rebased(0x5555_5555_4000);
        assert_eq!(record, SymbolRecord::new("main", 0x5555_5555_5140));
    }
}
