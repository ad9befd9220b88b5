//! Raw record construction helpers for tests.

/// Build raw BAM record bytes (without the `block_size` prefix).
///
/// Sequence and quality bytes are zero-filled; `aux_data` is appended verbatim.
///
/// # Panics
///
/// Panics if `name` is 255 bytes or longer, or if there are more than `u16::MAX` CIGAR ops.
#[allow(clippy::too_many_arguments)]
#[must_use]
pub fn make_bam_bytes(
    tid: i32,
    pos: i32,
    flag: u16,
    name: &[u8],
    cigar_ops: &[u32],
    seq_len: usize,
    mate_tid: i32,
    mate_pos: i32,
    aux_data: &[u8],
) -> Vec<u8> {
    let l_read_name = u8::try_from(name.len() + 1).unwrap(); // +1 for null terminator
    let n_cigar_op = u16::try_from(cigar_ops.len()).unwrap();
    let seq_bytes = seq_len.div_ceil(2);
    let total =
        32 + l_read_name as usize + cigar_ops.len() * 4 + seq_bytes + seq_len + aux_data.len();
    let mut buf = vec![0u8; total];

    buf[0..4].copy_from_slice(&tid.to_le_bytes());
    buf[4..8].copy_from_slice(&pos.to_le_bytes());
    buf[8] = l_read_name;
    buf[9] = 0; // mapq
    buf[10..12].copy_from_slice(&0u16.to_le_bytes()); // bin
    buf[12..14].copy_from_slice(&n_cigar_op.to_le_bytes());
    buf[14..16].copy_from_slice(&flag.to_le_bytes());
    buf[16..20].copy_from_slice(&u32::try_from(seq_len).unwrap().to_le_bytes());
    buf[20..24].copy_from_slice(&mate_tid.to_le_bytes());
    buf[24..28].copy_from_slice(&mate_pos.to_le_bytes());
    buf[28..32].copy_from_slice(&0i32.to_le_bytes()); // tlen

    let name_start = 32;
    buf[name_start..name_start + name.len()].copy_from_slice(name);
    buf[name_start + name.len()] = 0;

    let cigar_start = name_start + l_read_name as usize;
    for (i, &op) in cigar_ops.iter().enumerate() {
        let offset = cigar_start + i * 4;
        buf[offset..offset + 4].copy_from_slice(&op.to_le_bytes());
    }

    let aux_start = total - aux_data.len();
    buf[aux_start..].copy_from_slice(aux_data);
    buf
}

/// Build a raw record placed on `tid` carrying an `RG:Z` tag (or none when `rg` is `None`).
#[must_use]
pub fn make_rg_record(name: &[u8], tid: i32, pos: i32, rg: Option<&[u8]>) -> Vec<u8> {
    let mut aux = Vec::new();
    if let Some(rg) = rg {
        aux.extend_from_slice(b"RGZ");
        aux.extend_from_slice(rg);
        aux.push(0);
    }
    let flag = if tid < 0 { 0x4 } else { 0 };
    make_bam_bytes(tid, pos, flag, name, &[], 0, -1, -1, &aux)
}
