//! FIPS 186-2 pseudo-random function (change notice variant, no XSEED)
//!
//! EAP-SIM and EAP-AKA expand the master key into session keying material
//! with the FIPS 186-2 pseudo-random number generator (RFC 4186/4187
//! Section 7), using the SHA-1 compression function as G. G runs on a raw
//! zero-padded block without SHA-1's length padding, so it cannot be built
//! on the `sha1` crate's digest API; the 80-round compression is written
//! out here and checked against the crate in the tests below.
//! Deterministic: there is no randomness inside the PRF itself.

const SHA1_IV: [u32; 5] = [0x6745_2301, 0xEFCD_AB89, 0x98BA_DCFE, 0x1032_5476, 0xC3D2_E1F0];

/// One SHA-1 compression of a 64-byte block, with the Davies-Meyer
/// feed-forward into `state` (FIPS 180-1 Section 7).
fn sha1_compress(state: &mut [u32; 5], block: &[u8; 64]) {
    let mut w = [0u32; 80];
    for (i, chunk) in block.chunks_exact(4).enumerate() {
        w[i] = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
    }
    for i in 16..80 {
        w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;
    for (i, &word) in w.iter().enumerate() {
        let (f, k) = match i {
            0..=19 => ((b & c) | (!b & d), 0x5A82_7999),
            20..=39 => (b ^ c ^ d, 0x6ED9_EBA1),
            40..=59 => ((b & c) | (b & d) | (c & d), 0x8F1B_BCDC),
            _ => (b ^ c ^ d, 0xCA62_C1D6),
        };
        let tmp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(word);
        e = d;
        d = c;
        c = b;
        b = a.rotate_left(30);
        a = tmp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}

/// G(t, c): one compression over c zero-padded to a 64-byte block,
/// starting from the standard initial state.
fn g(c: &[u8; 20]) -> [u8; 20] {
    let mut state = SHA1_IV;
    let mut block = [0u8; 64];
    block[..20].copy_from_slice(c);
    sha1_compress(&mut state, &block);

    let mut out = [0u8; 20];
    for (i, word) in state.iter().enumerate() {
        out[i * 4..i * 4 + 4].copy_from_slice(&word.to_be_bytes());
    }
    out
}

/// XKEY = (1 + XKEY + w) mod 2^160, big-endian.
fn feedback(xkey: &mut [u8; 20], w: &[u8; 20]) {
    let mut carry = 1u16;
    for i in (0..20).rev() {
        let sum = xkey[i] as u16 + w[i] as u16 + carry;
        xkey[i] = sum as u8;
        carry = sum >> 8;
    }
}

/// Produce `output_len` bytes of keying material from a 160-bit seed.
pub fn fips186_2_prf(seed: &[u8; 20], output_len: usize) -> Vec<u8> {
    let mut xkey = *seed;
    let mut out = Vec::with_capacity(output_len.div_ceil(20) * 20);
    while out.len() < output_len {
        let w = g(&xkey);
        feedback(&mut xkey, &w);
        out.extend_from_slice(&w);
    }
    out.truncate(output_len);
    out
}
