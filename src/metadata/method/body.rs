//! Method body headers and exception-handling sections (II.25.4).
//!
//! Both header forms are supported: the one-byte tiny header for small bodies without locals
//! or handlers, and the 12-byte fat header optionally followed by extra data sections.

use bitflags::bitflags;

use crate::{
    file::io::{read_le, read_le_at},
    metadata::token::Token,
    Result,
};

bitflags! {
    /// Flags in the low bits of a method header
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct MethodBodyFlags: u16 {
        /// Tiny header, code size in the upper six bits
        const TINY_FORMAT = 0x2;
        /// Fat header
        const FAT_FORMAT = 0x3;
        /// Extra data sections follow the code
        const MORE_SECTS = 0x8;
        /// Zero-initialize all locals
        const INIT_LOCALS = 0x10;
    }
}

bitflags! {
    /// Flags of an extra data section
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct SectionFlags: u8 {
        /// Exception handling table
        const EHTABLE = 0x1;
        /// Reserved, must be zero
        const OPT_ILTABLE = 0x2;
        /// Fat (24 bytes per clause) section layout
        const FAT_FORMAT = 0x40;
        /// Another section follows this one
        const MORE_SECTS = 0x80;
    }
}

bitflags! {
    /// Kind of an exception clause
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct ExceptionHandlerFlags: u16 {
        /// Typed catch clause
        const EXCEPTION = 0x0000;
        /// Filtered catch clause
        const FILTER = 0x0001;
        /// Finally clause
        const FINALLY = 0x0002;
        /// Fault clause
        const FAULT = 0x0004;
    }
}

/// One protected region and its handler
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionHandler {
    /// Clause kind
    pub flags: ExceptionHandlerFlags,
    /// Start of the try block, relative to the first instruction
    pub try_offset: u32,
    /// Length of the try block in bytes
    pub try_length: u32,
    /// Start of the handler block
    pub handler_offset: u32,
    /// Length of the handler block
    pub handler_length: u32,
    /// Catch type token for typed clauses
    pub class_token: Option<Token>,
    /// Start of the filter block for filtered clauses
    pub filter_offset: Option<u32>,
}

impl ExceptionHandler {
    fn new(flags: ExceptionHandlerFlags, ranges: [u32; 4], class_or_filter: u32) -> Self {
        let (class_token, filter_offset) = if flags.contains(ExceptionHandlerFlags::FILTER) {
            (None, Some(class_or_filter))
        } else if flags.intersects(ExceptionHandlerFlags::FINALLY | ExceptionHandlerFlags::FAULT) {
            (None, None)
        } else {
            (Some(Token::new(class_or_filter)), None)
        };

        ExceptionHandler {
            flags,
            try_offset: ranges[0],
            try_length: ranges[1],
            handler_offset: ranges[2],
            handler_length: ranges[3],
            class_token,
            filter_offset,
        }
    }
}

/// A decoded method body
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodBody {
    /// Length of the instruction stream in bytes
    pub size_code: usize,
    /// Length of the header in bytes
    pub size_header: usize,
    /// `StandAloneSig` token of the locals signature, null if the method has no locals
    pub local_var_sig_token: Token,
    /// Maximum operand stack depth
    pub max_stack: usize,
    /// True for a fat header
    pub is_fat: bool,
    /// True if locals are zero-initialized
    pub is_init_local: bool,
    /// Exception clauses in declaration order
    pub exception_handlers: Vec<ExceptionHandler>,
    /// The instruction stream
    pub code: Vec<u8>,
}

impl MethodBody {
    /// Decode the body starting at `data[0]`; `data` may extend past the body's end.
    ///
    /// # Errors
    /// Returns an error if the header is of neither form or the body runs past `data`.
    pub fn read(data: &[u8]) -> Result<MethodBody> {
        let first_byte = read_le::<u8>(data)?;

        match MethodBodyFlags::from_bits_truncate(u16::from(first_byte & 0b11)) {
            MethodBodyFlags::TINY_FORMAT => {
                let size_code = usize::from(first_byte >> 2);
                let Some(code) = data.get(1..1 + size_code) else {
                    return Err(out_of_bounds_error!());
                };

                Ok(MethodBody {
                    size_code,
                    size_header: 1,
                    local_var_sig_token: Token::new(0),
                    max_stack: 8,
                    is_fat: false,
                    is_init_local: false,
                    exception_handlers: Vec::new(),
                    code: code.to_vec(),
                })
            }
            MethodBodyFlags::FAT_FORMAT => Self::read_fat(data),
            _ => Err(malformed_error!(
                "Method header is neither fat nor tiny - {}",
                first_byte
            )),
        }
    }

    fn read_fat(data: &[u8]) -> Result<MethodBody> {
        if data.len() < 12 {
            return Err(out_of_bounds_error!());
        }

        let first_duo = read_le::<u16>(data)?;
        let flags = MethodBodyFlags::from_bits_truncate(first_duo & 0x0FFF);
        let size_header = usize::from(first_duo >> 12) * 4;
        if size_header < 12 {
            return Err(malformed_error!("Fat method header too small - {}", size_header));
        }

        let max_stack = usize::from(read_le::<u16>(&data[2..])?);
        let size_code = read_le::<u32>(&data[4..])? as usize;
        let local_var_sig_token = Token::new(read_le::<u32>(&data[8..])?);

        let Some(code) = size_header
            .checked_add(size_code)
            .and_then(|end| data.get(size_header..end))
        else {
            return Err(out_of_bounds_error!());
        };

        let mut exception_handlers = Vec::new();
        if flags.contains(MethodBodyFlags::MORE_SECTS) {
            let cursor = (size_header + size_code + 3) & !3;
            Self::read_sections(data, cursor, &mut exception_handlers)?;
        }

        Ok(MethodBody {
            size_code,
            size_header,
            local_var_sig_token,
            max_stack,
            is_fat: true,
            is_init_local: flags.contains(MethodBodyFlags::INIT_LOCALS),
            exception_handlers,
            code: code.to_vec(),
        })
    }

    fn read_sections(
        data: &[u8],
        mut cursor: usize,
        handlers: &mut Vec<ExceptionHandler>,
    ) -> Result<()> {
        loop {
            let section = SectionFlags::from_bits_truncate(read_le_at::<u8>(data, &mut cursor)?);
            let fat = section.contains(SectionFlags::FAT_FORMAT);
            let data_size = if fat {
                let low = u32::from(read_le_at::<u8>(data, &mut cursor)?);
                let high = u32::from(read_le_at::<u16>(data, &mut cursor)?);
                (low | (high << 8)) as usize
            } else {
                let size = usize::from(read_le_at::<u8>(data, &mut cursor)?);
                cursor += 2;
                size
            };

            if data_size < 4 {
                return Err(malformed_error!("Method data section too small - {}", data_size));
            }

            let section_end = cursor - 4 + data_size;
            if section_end > data.len() {
                return Err(out_of_bounds_error!());
            }

            if section.contains(SectionFlags::EHTABLE) {
                let clause_size = if fat { 24 } else { 12 };
                for _ in 0..(data_size - 4) / clause_size {
                    handlers.push(if fat {
                        Self::read_fat_clause(data, &mut cursor)?
                    } else {
                        Self::read_small_clause(data, &mut cursor)?
                    });
                }
            }

            cursor = (section_end + 3) & !3;
            if !section.contains(SectionFlags::MORE_SECTS) {
                return Ok(());
            }
        }
    }

    fn read_fat_clause(data: &[u8], cursor: &mut usize) -> Result<ExceptionHandler> {
        // Clause flags are stored as u32 but only the low bits are defined
        let flags = ExceptionHandlerFlags::from_bits_truncate(read_le_at::<u32>(data, cursor)? as u16);
        let ranges = [
            read_le_at::<u32>(data, cursor)?,
            read_le_at::<u32>(data, cursor)?,
            read_le_at::<u32>(data, cursor)?,
            read_le_at::<u32>(data, cursor)?,
        ];
        Ok(ExceptionHandler::new(flags, ranges, read_le_at::<u32>(data, cursor)?))
    }

    fn read_small_clause(data: &[u8], cursor: &mut usize) -> Result<ExceptionHandler> {
        let flags = ExceptionHandlerFlags::from_bits_truncate(read_le_at::<u16>(data, cursor)?);
        let ranges = [
            u32::from(read_le_at::<u16>(data, cursor)?),
            u32::from(read_le_at::<u8>(data, cursor)?),
            u32::from(read_le_at::<u16>(data, cursor)?),
            u32::from(read_le_at::<u8>(data, cursor)?),
        ];
        Ok(ExceptionHandler::new(flags, ranges, read_le_at::<u32>(data, cursor)?))
    }

    /// Header plus code length
    #[must_use]
    pub fn size(&self) -> usize {
        self.size_code + self.size_header
    }
}
