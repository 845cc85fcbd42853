//! LZO1X-style bitstream decoder.
//!
//! The stream interleaves literal runs and back-reference matches. The first
//! byte selects the initial mode; afterwards each command byte encodes the
//! match class in its high bits and carries the next literal-run count in
//! its low two bits:
//!
//! * `>= 64` — short match, 3-bit length in bits 5–7 (minus one), 11-bit
//!   distance from bits 2–4 and the next byte.
//! * `32..=63` — 5-bit length (zero-run extended when zero), 14-bit distance
//!   in the next two little-endian bytes shifted right by two.
//! * `16..=31` — 3-bit length (zero-run extended), a high distance bit from
//!   bit 3, a 14-bit distance, then a fixed 16 KiB window offset. A raw
//!   distance of zero lands the reference on the current output position
//!   and marks end-of-stream.
//! * `< 16` — a two-byte near match after a match, or a three-byte match
//!   past the 2 KiB window after a literal run.
//!
//! Length extensions accumulate 255 per `0x00` byte. Every read is
//! bounds-checked against both buffers; an overrun ends the stream with the
//! bytes produced so far, which is what the legacy asset callers expect.

enum Step {
    /// Expect a literal-run command.
    Command,
    /// Expect the command that follows a literal run.
    AfterLiteral,
    /// Decode a match from this command byte.
    Match(usize),
    /// Copy this many trailing literals, then decode the next match.
    MatchNext(usize),
}

/// Decompress `src` into `dst`, returning the number of bytes produced.
///
/// Truncated or malformed input is not an error: the decoder stops at the
/// offending command and reports the prefix length. Callers that know the
/// expected size treat a mismatch as corruption.
#[must_use]
pub fn decompress(src: &[u8], dst: &mut [u8]) -> usize {
    let in_len = src.len();
    let out_len = dst.len();
    if in_len == 0 {
        return 0;
    }

    let mut ip = 0usize;
    let mut op = 0usize;

    let mut step = if src[0] > 17 {
        ip = 1;
        let t = usize::from(src[0]) - 17;
        if t < 4 {
            Step::MatchNext(t)
        } else {
            if op + t > out_len || ip + t > in_len {
                return op;
            }
            dst[op..op + t].copy_from_slice(&src[ip..ip + t]);
            op += t;
            ip += t;
            Step::AfterLiteral
        }
    } else {
        Step::Command
    };

    loop {
        match step {
            Step::Command => {
                let Some(&cmd) = src.get(ip) else { return op };
                ip += 1;
                let mut t = usize::from(cmd);
                if t >= 16 {
                    step = Step::Match(t);
                    continue;
                }
                if t == 0 {
                    while ip < in_len && src[ip] == 0 {
                        t += 255;
                        ip += 1;
                    }
                    let Some(&ext) = src.get(ip) else { return op };
                    ip += 1;
                    t += 15 + usize::from(ext);
                }
                let run = t + 4;
                if op + run > out_len || ip + run > in_len {
                    return op;
                }
                dst[op..op + run].copy_from_slice(&src[ip..ip + run]);
                op += run;
                ip += run;
                step = Step::AfterLiteral;
            }

            Step::AfterLiteral => {
                let Some(&cmd) = src.get(ip) else { return op };
                ip += 1;
                let t = usize::from(cmd);
                if t >= 16 {
                    step = Step::Match(t);
                    continue;
                }
                // Three-byte match reaching past the 2 KiB window.
                let Some(&low) = src.get(ip) else { return op };
                ip += 1;
                let dist = 0x801 + (t >> 2) + (usize::from(low) << 2);
                if dist > op || op + 3 > out_len {
                    return op;
                }
                let from = op - dist;
                dst[op] = dst[from];
                dst[op + 1] = dst[from + 1];
                dst[op + 2] = dst[from + 2];
                op += 3;
                step = next_command(src, ip);
            }

            Step::Match(t) => {
                if t >= 64 {
                    let Some(&low) = src.get(ip) else { return op };
                    ip += 1;
                    let dist = 1 + ((t >> 2) & 7) + (usize::from(low) << 3);
                    let len = (t >> 5) - 1;
                    if !copy_match(dst, &mut op, dist, len + 2) {
                        return op;
                    }
                } else if t >= 32 {
                    let mut len = t & 31;
                    if len == 0 {
                        while ip < in_len && src[ip] == 0 {
                            len += 255;
                            ip += 1;
                        }
                        let Some(&ext) = src.get(ip) else { return op };
                        ip += 1;
                        len += 31 + usize::from(ext);
                    }
                    if ip + 1 >= in_len {
                        return op;
                    }
                    let d16 = usize::from(src[ip]) | (usize::from(src[ip + 1]) << 8);
                    ip += 2;
                    let dist = 1 + (d16 >> 2);
                    if !copy_match(dst, &mut op, dist, len + 2) {
                        return op;
                    }
                } else if t >= 16 {
                    let base = (t & 8) << 11;
                    let mut len = t & 7;
                    if len == 0 {
                        while ip < in_len && src[ip] == 0 {
                            len += 255;
                            ip += 1;
                        }
                        let Some(&ext) = src.get(ip) else { return op };
                        ip += 1;
                        len += 7 + usize::from(ext);
                    }
                    if ip + 1 >= in_len {
                        return op;
                    }
                    let d16 = usize::from(src[ip]) | (usize::from(src[ip + 1]) << 8);
                    ip += 2;
                    let d = base + (d16 >> 2);
                    if d == 0 {
                        // End-of-stream: the reference lands exactly on the
                        // current output position.
                        return op;
                    }
                    if !copy_match(dst, &mut op, d + 0x4000, len + 2) {
                        return op;
                    }
                } else {
                    // Two-byte near match.
                    let Some(&low) = src.get(ip) else { return op };
                    ip += 1;
                    let dist = 1 + (t >> 2) + (usize::from(low) << 2);
                    if dist > op || op + 2 > out_len {
                        return op;
                    }
                    let from = op - dist;
                    dst[op] = dst[from];
                    dst[op + 1] = dst[from + 1];
                    op += 2;
                }
                step = next_command(src, ip);
            }

            Step::MatchNext(t) => {
                if op + t > out_len || ip + t > in_len {
                    return op;
                }
                dst[op..op + t].copy_from_slice(&src[ip..ip + t]);
                op += t;
                ip += t;
                let Some(&cmd) = src.get(ip) else { return op };
                ip += 1;
                step = Step::Match(usize::from(cmd));
            }
        }
    }
}

/// The low two bits of the previous command byte carry the literal count
/// consumed before the next command.
fn next_command(src: &[u8], ip: usize) -> Step {
    let lits = usize::from(src[ip - 2]) & 3;
    if lits == 0 {
        Step::Command
    } else {
        Step::MatchNext(lits)
    }
}

/// Copy `count` bytes from `dist` behind the write position. Byte-at-a-time
/// so overlapping forward references replicate the run as they go.
fn copy_match(dst: &mut [u8], op: &mut usize, dist: usize, count: usize) -> bool {
    if dist > *op || *op + count > dst.len() {
        return false;
    }
    let mut from = *op - dist;
    for _ in 0..count {
        dst[*op] = dst[from];
        *op += 1;
        from += 1;
    }
    true
}
