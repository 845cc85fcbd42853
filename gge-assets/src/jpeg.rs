//! Repair pass for the proprietary JPEG variant.
//!
//! Some M1.0 map tiles carry JPEG bodies written by an old exporter that
//! inserts a bare `FF A0` marker after SOI, stores a bogus SOS length, and
//! strips the `FF 00` byte stuffing from the scan. Standard decoders refuse
//! such streams, so they are rewritten first:
//!
//! 1. the `FF A0` marker is dropped,
//! 2. SOS is re-emitted as `FF DA 00 0C` followed by the original scan
//!    parameters,
//! 3. every `FF` inside the scan gains a `00` stuffing byte,
//! 4. the stream is terminated with `FF D9`.
//!
//! All other marker segments pass through via their big-endian length word.

/// Whether `data` is shaped like the proprietary variant (`FF D8 FF A0 …`).
#[must_use]
pub fn needs_repair(data: &[u8]) -> bool {
    data.len() >= 4 && data[2] == 0xFF && data[3] == 0xA0
}

/// Rewrite the proprietary stream into a standards-compliant one.
///
/// The input's final two bytes are dropped in favor of a clean `FF D9`
/// terminator, matching the exporter's trailer.
#[must_use]
pub fn repair(input: &[u8]) -> Vec<u8> {
    let len = input.len();
    let mut out = Vec::with_capacity(len + len / 8 + 4);
    let mut pos = 0usize;

    while pos + 1 < len && input[pos] == 0xFF {
        out.push(0xFF);
        pos += 1;
        match input[pos] {
            0xD8 => {
                out.push(0xD8);
                pos += 1;
            }
            0xA0 => {
                pos += 1;
                out.pop();
            }
            0xDA => {
                out.extend_from_slice(&[0xDA, 0x00, 0x0C]);
                pos += 1;
                // Skip the stored (incorrect) SOS length word.
                pos += 2;

                while pos < len - 2 {
                    if input[pos] == 0xFF {
                        out.push(0xFF);
                        out.push(0x00);
                    } else {
                        out.push(input[pos]);
                    }
                    pos += 1;
                }

                out.push(0xFF);
                out.push(0xD9);
                return out;
            }
            _ => {
                out.push(input[pos]);
                pos += 1;
                if pos + 1 < len {
                    let seg_len =
                        (usize::from(input[pos]) << 8) | usize::from(input[pos + 1]);
                    for _ in 0..seg_len {
                        if pos >= len {
                            break;
                        }
                        out.push(input[pos]);
                        pos += 1;
                    }
                }
            }
        }
    }

    out
}
