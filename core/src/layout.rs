//! Memory layout planner.
//!
//! The bytecode and the interpreter stack are carved out of static memory, right
//! after the original data:
//!
//! ```text
//! static_base
//! │
//! ▼
//! ┌──────────────────────────┬─────┬──────────┬─────┬──────────────────┐
//! │ data (+ zeros up to the  │ pad │ bytecode │ pad │ stack (reserved, │
//! │ declared static size)    │     │          │     │ not in the blob) │
//! └──────────────────────────┴─────┴──────────┴─────┴──────────────────┘
//!                                  ▲                ▲
//!                             code_offset      stack_offset
//! ```
//!
//! Both pads align to 8 bytes so interpreter frames can hold doubles.

use crate::Vec;
use crate::api::{Error, TransformOptions};

/// Alignment of the bytecode and stack regions.
pub const ALIGNMENT: u32 = 8;

/// Where everything ended up. Offsets are relative to the static base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryLayout {
    pub static_base: u32,
    /// Static size before the transform.
    pub data_len: u32,
    pub code_offset: u32,
    pub code_len: u32,
    pub stack_offset: u32,
    pub stack_capacity: u32,
    /// Static size after the transform, stack included.
    pub static_size: u32,
}

impl MemoryLayout {
    /// Plan the layout for `code_len` bytes of bytecode after `data_len` bytes of data.
    pub fn plan(data_len: u32, code_len: usize, options: &TransformOptions) -> Result<Self, Error> {
        if options.static_base % ALIGNMENT != 0 {
            return Err(Error::MisalignedStaticBase {
                base: options.static_base,
            });
        }

        let code_offset = align_up(data_len as u64);
        let stack_offset = align_up(code_offset + code_len as u64);
        let static_size = stack_offset + options.stack_capacity as u64;
        let end = options.static_base as u64 + static_size;
        if end > u32::MAX as u64 {
            return Err(Error::AddressSpaceExhausted { size: end });
        }

        // `end` fits in u32, so every smaller quantity does too.
        Ok(Self {
            static_base: options.static_base,
            data_len,
            code_offset: code_offset as u32,
            code_len: code_len as u32,
            stack_offset: stack_offset as u32,
            stack_capacity: options.stack_capacity,
            static_size: static_size as u32,
        })
    }

    /// Absolute address of the first bytecode byte.
    pub fn code_start(&self) -> u32 {
        self.static_base + self.code_offset
    }

    /// Absolute address of the interpreter stack.
    pub fn stack_start(&self) -> u32 {
        self.static_base + self.stack_offset
    }

    /// Absolute address one past the interpreter stack.
    pub fn stack_max(&self) -> u32 {
        self.stack_start() + self.stack_capacity
    }

    /// Length of the emitted memory blob (the stack is not materialized).
    pub fn blob_len(&self) -> usize {
        self.stack_offset as usize
    }

    /// Static bytes the transform adds, stack included.
    pub fn growth(&self) -> u32 {
        self.static_size - self.data_len
    }
}

/// The planned layout together with the new static memory contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryImage {
    pub layout: MemoryLayout,
    pub blob: Vec<u8>,
}

impl MemoryImage {
    /// Place `code` after `data` inside a static region of `static_size` bytes.
    ///
    /// `data` may be shorter than `static_size`; the rest is zero-initialized and is
    /// kept zero in the blob so the bytecode never overlaps it.
    pub fn build(
        data: &[u8],
        static_size: u32,
        code: &[u8],
        options: &TransformOptions,
    ) -> Result<Self, Error> {
        if data.len() > static_size as usize {
            return Err(Error::MemoryBudgetExceeded {
                data_len: data.len(),
                static_size,
            });
        }
        let layout = MemoryLayout::plan(static_size, code.len(), options)?;

        let mut blob = Vec::with_capacity(layout.blob_len());
        blob.extend_from_slice(data);
        blob.resize(layout.code_offset as usize, 0);
        blob.extend_from_slice(code);
        blob.resize(layout.blob_len(), 0);

        tracing::info!(
            data = layout.data_len,
            code_start = layout.code_start(),
            code_len = layout.code_len,
            stack_start = layout.stack_start(),
            static_size = layout.static_size,
            "planned memory layout"
        );
        Ok(Self { layout, blob })
    }

    /// The bytecode as placed in the blob.
    pub fn code(&self) -> &[u8] {
        let start = self.layout.code_offset as usize;
        &self.blob[start..start + self.layout.code_len as usize]
    }
}

fn align_up(n: u64) -> u64 {
    n.next_multiple_of(ALIGNMENT as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vec;
    use pretty_assertions::assert_eq;

    fn options(stack_capacity: u32) -> TransformOptions {
        TransformOptions {
            stack_capacity,
            ..TransformOptions::default()
        }
    }

    #[test]
    fn test_layout_regions_are_aligned() {
        let image = MemoryImage::build(&[1; 13], 13, &[7; 20], &options(64)).unwrap();
        let layout = image.layout;

        assert_eq!(layout.code_offset, 16);
        assert_eq!(layout.stack_offset, 40);
        assert_eq!(layout.code_start(), 24);
        assert_eq!(layout.stack_start(), 48);
        assert_eq!(layout.stack_max(), 112);
        assert_eq!(layout.static_size, 13 + 3 + 20 + 4 + 64);
        assert_eq!(layout.growth(), 3 + 20 + 4 + 64);
        assert_eq!(image.blob.len(), 40);
        assert_eq!(&image.blob[13..16], &[0, 0, 0]);
        assert_eq!(image.code(), &[7; 20]);
        assert_eq!(&image.blob[36..], &[0; 4]);
    }

    #[test]
    fn test_zero_tail_is_preserved() {
        let image = MemoryImage::build(&[9, 9], 10, &[1, 2, 3, 4], &options(8)).unwrap();
        assert_eq!(image.layout.code_offset, 16);
        assert_eq!(&image.blob[..16], &[9, 9, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
        assert_eq!(image.code(), &[1, 2, 3, 4]);
    }

    #[test]
    fn test_image_length_formula() {
        for (data_len, code_len) in [(0, 0), (8, 4), (5, 12), (17, 100)] {
            let data = vec![0xAA; data_len];
            let code = vec![0x55; code_len];
            let layout = MemoryImage::build(&data, data_len as u32, &code, &options(1024))
                .unwrap()
                .layout;

            let aligned = data_len.next_multiple_of(8);
            let pad = (aligned + code_len).next_multiple_of(8) - (aligned + code_len);
            assert_eq!(
                layout.stack_offset as usize + layout.stack_capacity as usize,
                aligned + code_len + pad + 1024
            );
            assert_eq!(layout.code_start() % 8, 0);
            assert_eq!(layout.stack_start() % 8, 0);
        }
    }

    #[test]
    fn test_default_stack_capacity() {
        let layout = MemoryLayout::plan(0, 0, &TransformOptions::default()).unwrap();
        assert_eq!(layout.stack_capacity, 1 << 20);
        assert_eq!(layout.code_start(), 8);
    }

    #[test]
    fn test_data_larger_than_static_size() {
        let err = MemoryImage::build(&[0; 20], 16, &[], &options(8)).unwrap_err();
        assert_eq!(
            err,
            Error::MemoryBudgetExceeded {
                data_len: 20,
                static_size: 16
            }
        );
    }

    #[test]
    fn test_misaligned_static_base() {
        let options = TransformOptions {
            static_base: 12,
            ..TransformOptions::default()
        };
        assert_eq!(
            MemoryLayout::plan(0, 0, &options).unwrap_err(),
            Error::MisalignedStaticBase { base: 12 }
        );
    }

    #[test]
    fn test_address_space_exhausted() {
        let err = MemoryLayout::plan(u32::MAX - 64, 0, &options(1024)).unwrap_err();
        assert!(matches!(err, Error::AddressSpaceExhausted { .. }));
    }
}
