//! Auxiliary tag lookup on raw BAM bytes.

use crate::fields::{aux_data_slice, tag_value_size};

/// Read group tag.
pub const READ_GROUP_TAG: [u8; 2] = *b"RG";

/// Find a string (Z-type) tag in auxiliary data, returning value bytes without null terminator.
///
/// Returns `None` if the tag is absent, is not `Z`-typed, or the aux data is malformed
/// before the tag is reached.
#[must_use]
pub fn find_string_tag<'a>(aux_data: &'a [u8], tag: &[u8; 2]) -> Option<&'a [u8]> {
    let mut p = 0;
    while p + 3 <= aux_data.len() {
        let t = &aux_data[p..p + 2];
        let val_type = aux_data[p + 2];

        if t == tag {
            return match val_type {
                b'Z' => {
                    let start = p + 3;
                    let end = aux_data[start..].iter().position(|&b| b == 0)?;
                    Some(&aux_data[start..start + end])
                }
                _ => None,
            };
        }

        if let Some(size) = tag_value_size(val_type, &aux_data[p + 3..]) {
            p += 3 + size;
        } else {
            break;
        }
    }
    None
}

/// Find a string tag in a complete BAM record.
#[must_use]
pub fn find_string_tag_in_record<'a>(bam: &'a [u8], tag: &[u8; 2]) -> Option<&'a [u8]> {
    let aux = aux_data_slice(bam);
    if aux.is_empty() {
        return None;
    }
    find_string_tag(aux, tag)
}

/// Find the read group (`RG:Z`) of a complete BAM record.
#[inline]
#[must_use]
pub fn read_group(bam: &[u8]) -> Option<&[u8]> {
    find_string_tag_in_record(bam, &READ_GROUP_TAG)
}
