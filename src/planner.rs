// Copyright 2024-2026 exram Contributors
// SPDX-License-Identifier: Apache-2.0

//! Overhead planner for a paged virtual address space kept in external
//! memory.
//!
//! Page table entries are sized to the next power-of-two byte width that
//! holds a page index. Each table level fills one page, and the first level
//! takes whatever index bits are left over. The worst case is every table
//! page allocated.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Largest address width the planner accepts.
pub const MAX_ADDRESS_BITS: u32 = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("Address width must be between 1 and 32 bits, got {0}")]
    AddressBits(u32),

    #[error("Page size must be a power of two, got {0}")]
    PageSizeNotPowerOfTwo(u64),

    #[error("Page size {page_size} must be smaller than the address space of {address_space} bytes")]
    PageTooLarge { page_size: u64, address_space: u64 },

    #[error("Page size {page_size} cannot hold two {index_bytes}-byte table entries")]
    PageTooSmall { page_size: u64, index_bytes: u64 },
}

/// Page table layout and its worst-case cost.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PagingPlan {
    pub address_bits: u32,
    /// Size of the full virtual address space.
    pub absolute_bytes_total: u64,
    /// Bytes covered by whole pages.
    pub bytes_total: u64,
    pub page_size: u64,
    pub page_count: u64,
    /// Bits addressing a byte within a page.
    pub byte_address_bits: u32,
    /// Bits identifying a page.
    pub page_index_bits: u32,
    /// Width of one page table entry.
    pub page_index_bytes: u64,
    pub page_indices_per_page: u64,
    /// Index bits resolved by one full table level.
    pub bits_per_indirection: u32,
    pub indirection_count: u32,
    pub first_level_pages: u64,
    /// Table pages in use when every page is mapped, plus the root.
    pub max_pages_used: u64,
    pub overhead_bytes: u64,
    /// Overhead relative to `bytes_total`, rounded up.
    pub overhead_percentage: u64,
}

impl PagingPlan {
    pub fn calculate(address_bits: u32, page_size: u64) -> Result<Self, PlanError> {
        if address_bits == 0 || address_bits > MAX_ADDRESS_BITS {
            return Err(PlanError::AddressBits(address_bits));
        }
        if !page_size.is_power_of_two() {
            return Err(PlanError::PageSizeNotPowerOfTwo(page_size));
        }
        let absolute_bytes_total = 1u64 << address_bits;
        if page_size >= absolute_bytes_total {
            return Err(PlanError::PageTooLarge {
                page_size,
                address_space: absolute_bytes_total,
            });
        }

        let page_count = absolute_bytes_total / page_size;
        let bytes_total = page_size * page_count;
        let byte_address_bits = page_size.ilog2();
        let page_index_bits = address_bits - byte_address_bits;

        // 1, 2 or 4 bytes; 24-bit entries are not used.
        let page_index_bytes = u64::from(page_index_bits.next_power_of_two()).div_ceil(8);
        let page_indices_per_page = page_size / page_index_bytes;
        if page_indices_per_page < 2 {
            return Err(PlanError::PageTooSmall {
                page_size,
                index_bytes: page_index_bytes,
            });
        }

        let bits_per_indirection = page_indices_per_page.ilog2();
        let indirection_count = page_index_bits.div_ceil(bits_per_indirection);
        let first_level_bits = match page_index_bits % bits_per_indirection {
            0 => bits_per_indirection,
            rest => rest,
        };
        let first_level_pages = 1u64 << first_level_bits;

        let lower_levels: u64 = (0..indirection_count.saturating_sub(1))
            .map(|level| page_indices_per_page.saturating_pow(level))
            .fold(0u64, u64::saturating_add);
        let max_pages_used = lower_levels
            .saturating_mul(first_level_pages)
            .saturating_add(1);

        let overhead_bytes = max_pages_used
            .saturating_mul(page_size)
            .saturating_add(absolute_bytes_total - bytes_total);
        let overhead_percentage = overhead_bytes.saturating_mul(100).div_ceil(bytes_total);

        Ok(Self {
            address_bits,
            absolute_bytes_total,
            bytes_total,
            page_size,
            page_count,
            byte_address_bits,
            page_index_bits,
            page_index_bytes,
            page_indices_per_page,
            bits_per_indirection,
            indirection_count,
            first_level_pages,
            max_pages_used,
            overhead_bytes,
            overhead_percentage,
        })
    }
}

impl fmt::Display for PagingPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Address size:      {} bits", self.address_bits)?;
        writeln!(f, "Total bytes:       {}", self.bytes_total)?;
        writeln!(f, "Page size:         {}", self.page_size)?;
        writeln!(f, "Page count:        {}", self.page_count)?;
        writeln!(f, "Byte address:      {} bits", self.byte_address_bits)?;
        writeln!(f, "Page index:        {} bits", self.page_index_bits)?;
        writeln!(f, "Index size:        {} bytes", self.page_index_bytes)?;
        writeln!(f, "Per page:          {} indices", self.page_indices_per_page)?;
        writeln!(f, "Per indirection:   {} bits", self.bits_per_indirection)?;
        writeln!(f, "Indirection count: {}", self.indirection_count)?;
        writeln!(f, "First level count: {}", self.first_level_pages)?;
        write!(
            f,
            "Maximum overhead:  {} pages ({} bytes, {}%)",
            self.max_pages_used, self.overhead_bytes, self.overhead_percentage
        )
    }
}
