//! Byte-exact comparison of an original packet with its decompressed copy.
//!
//! Equal packets produce nothing. Different packets produce a [`DiffReport`]
//! whose `Display` output is a two-column hex dump of the leading bytes,
//! with every differing byte marked so the first divergence is easy to spot.

use std::fmt;

use crate::constants::{COMPARE_BYTES_PER_ROW, COMPARE_MAX_BYTES};

/// Result of comparing a reference packet with a candidate packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketComparison {
    /// Same length, same bytes.
    Equal,
    /// The packets differ; the report describes how.
    Different(DiffReport),
}

impl PacketComparison {
    /// Returns `true` for [`PacketComparison::Equal`].
    pub fn is_equal(&self) -> bool {
        matches!(self, PacketComparison::Equal)
    }
}

/// Description of a mismatch between two packets.
///
/// Holds copies of at most [`COMPARE_MAX_BYTES`] leading bytes of each side
/// so the report can outlive the buffers it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffReport {
    reference_len: usize,
    candidate_len: usize,
    first_difference: usize,
    reference_head: Vec<u8>,
    candidate_head: Vec<u8>,
}

impl DiffReport {
    /// Length of the original packet.
    pub fn reference_len(&self) -> usize {
        self.reference_len
    }

    /// Length of the reconstructed packet.
    pub fn candidate_len(&self) -> usize {
        self.candidate_len
    }

    /// Offset of the first differing byte, or the shorter length when one
    /// packet is a prefix of the other.
    pub fn first_difference(&self) -> usize {
        self.first_difference
    }

    /// Number of leading bytes rendered in the dump.
    pub fn compared_len(&self) -> usize {
        self.reference_head.len()
    }

    /// Offsets, within the rendered window, of bytes that differ.
    pub fn differing_offsets(&self) -> impl Iterator<Item = usize> + '_ {
        self.reference_head
            .iter()
            .zip(&self.candidate_head)
            .enumerate()
            .filter(|(_, (reference, candidate))| reference != candidate)
            .map(|(offset, _)| offset)
    }
}

/// Compares `reference` (the original packet) with `candidate` (the
/// decompressed packet).
///
/// # Parameters
/// - `reference`: The packet handed to the compressor.
/// - `candidate`: The packet returned by the decompressor.
///
/// # Returns
/// [`PacketComparison::Equal`] when lengths and bytes match, otherwise a
/// [`DiffReport`] bounded to the first [`COMPARE_MAX_BYTES`] bytes of the
/// overlapping region.
pub fn compare_packets(reference: &[u8], candidate: &[u8]) -> PacketComparison {
    if reference == candidate {
        return PacketComparison::Equal;
    }

    let overlap = reference.len().min(candidate.len());
    let first_difference = reference
        .iter()
        .zip(candidate)
        .position(|(a, b)| a != b)
        .unwrap_or(overlap);
    let shown = overlap.min(COMPARE_MAX_BYTES);

    PacketComparison::Different(DiffReport {
        reference_len: reference.len(),
        candidate_len: candidate.len(),
        first_difference,
        reference_head: reference[..shown].to_vec(),
        candidate_head: candidate[..shown].to_vec(),
    })
}

/// Width of one rendered byte cell, e.g. `[0x45]`.
const CELL_WIDTH: usize = 6;

fn write_cell(f: &mut fmt::Formatter<'_>, byte: u8, differs: bool) -> fmt::Result {
    if differs {
        write!(f, "#0x{byte:02x}#  ")
    } else {
        write!(f, "[0x{byte:02x}]  ")
    }
}

impl fmt::Display for DiffReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "------------------------------ Compare ------------------------------"
        )?;
        writeln!(
            f,
            "--------- reference ----------         ----------- new --------------"
        )?;

        if self.reference_len != self.candidate_len {
            writeln!(
                f,
                "packets have different sizes ({} != {}), compare only the {} first bytes",
                self.reference_len,
                self.candidate_len,
                self.compared_len()
            )?;
        }

        let rows = self
            .reference_head
            .chunks(COMPARE_BYTES_PER_ROW)
            .zip(self.candidate_head.chunks(COMPARE_BYTES_PER_ROW));
        for (reference_row, candidate_row) in rows {
            for (reference, candidate) in reference_row.iter().zip(candidate_row) {
                write_cell(f, *reference, reference != candidate)?;
            }
            // Pad short final rows so the second column stays aligned.
            let missing = COMPARE_BYTES_PER_ROW - reference_row.len();
            write!(f, "{:width$}", "", width = missing * (CELL_WIDTH + 2))?;
            write!(f, "      ")?;
            for (reference, candidate) in reference_row.iter().zip(candidate_row) {
                write_cell(f, *candidate, reference != candidate)?;
            }
            writeln!(f)?;
        }

        writeln!(
            f,
            "----------------------- packets are different -----------------------"
        )
    }
}
