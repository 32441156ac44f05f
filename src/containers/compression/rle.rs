use super::Decoded;
use crate::error::DecodeIssue;

// Control bytes with the high bit set are runs, anything else is a literal count
const RUN_FLAG: u8 = 0x80;
const RUN_LENGTH_MASK: u8 = 0x7F;

/// Decompress a byte-run encoded screen plane.
///
/// Decoding stops as soon as `expected` bytes were produced or the input runs
/// out. The output is truncated to `expected`, never padded.
pub fn decompress(data: &[u8], expected: usize) -> Decoded {
    let mut output = Vec::with_capacity(expected.min(data.len().saturating_mul(8)));
    let mut pos = 0;

    while pos < data.len() && output.len() < expected {
        let control = data[pos];
        pos += 1;

        if control & RUN_FLAG != 0 {
            let count = (control & RUN_LENGTH_MASK) as usize;
            let Some(&value) = data.get(pos) else {
                break;
            };
            pos += 1;
            output.resize(output.len() + count, value);
        } else {
            let count = control as usize;
            let end = (pos + count).min(data.len());
            output.extend_from_slice(&data[pos..end]);
            pos = end;
        }
    }

    output.truncate(expected);
    if output.len() < expected {
        let produced = output.len();
        return Decoded::partial(
            output,
            DecodeIssue::StreamExhausted {
                position: pos,
                produced,
            },
        );
    }
    Decoded::complete(output)
}
