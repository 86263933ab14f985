//! FIX 4.2 wire encoding
//!
//! Minimal zero-allocation encoder for the two messages the execution
//! stage sends: NewOrderSingle (35=D) and OrderCancelRequest (35=F).
//! Everything formats directly into a caller-provided buffer; prices and
//! quantities render through the fixed-point `Display` (8 decimals), so no
//! floating point touches the wire path.
//!
//! BodyLength (9) counts the bytes between its own field separator and the
//! start of the checksum field; CheckSum (10) is the byte sum of everything
//! before it, mod 256, zero-padded to three digits.

use std::fmt::{self, Write as _};

use chrono::Utc;

use crate::core::fixed::FixedPoint;

/// FIX field separator.
pub const SOH: u8 = 0x01;

/// Offset of the three BodyLength digits in the output ("8=FIX.4.2" + SOH
/// + "9=" puts them at 12..15).
const BODY_LEN_DIGITS: usize = 12;
/// First byte after the BodyLength field's separator.
const BODY_START: usize = 16;

struct FixWriter<'a> {
    buf: &'a mut [u8],
    pos: usize,
    overflow: bool,
}

impl<'a> FixWriter<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            overflow: false,
        }
    }

    #[inline]
    fn soh(&mut self) {
        if self.pos < self.buf.len() {
            self.buf[self.pos] = SOH;
            self.pos += 1;
        } else {
            self.overflow = true;
        }
    }

    /// Write a complete field (content + separator).
    #[inline]
    fn field(&mut self, args: fmt::Arguments) {
        let _ = self.write_fmt(args);
        self.soh();
    }
}

impl fmt::Write for FixWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let bytes = s.as_bytes();
        if self.pos + bytes.len() > self.buf.len() {
            self.overflow = true;
            return Ok(());
        }
        self.buf[self.pos..self.pos + bytes.len()].copy_from_slice(bytes);
        self.pos += bytes.len();
        Ok(())
    }
}

/// Backfill the three BodyLength digits and append the checksum trailer.
/// Returns the final message length, or 0 on overflow.
fn seal(mut w: FixWriter<'_>) -> usize {
    if w.overflow || w.pos < BODY_START {
        return 0;
    }
    let body_len = w.pos - BODY_START;
    if body_len > 999 {
        return 0;
    }

    let digits = [
        b'0' + (body_len / 100) as u8,
        b'0' + (body_len / 10 % 10) as u8,
        b'0' + (body_len % 10) as u8,
    ];
    w.buf[BODY_LEN_DIGITS..BODY_LEN_DIGITS + 3].copy_from_slice(&digits);

    let checksum: u32 = w.buf[..w.pos].iter().map(|&b| b as u32).sum::<u32>() % 256;
    w.field(format_args!("10={:03}", checksum));

    if w.overflow {
        0
    } else {
        w.pos
    }
}

/// Encode a NewOrderSingle. Returns bytes written, 0 on overflow.
pub fn encode_new_order(
    buf: &mut [u8],
    order_id: u64,
    symbol_id: u64,
    side: i8,
    price: FixedPoint,
    quantity: FixedPoint,
) -> usize {
    let mut w = FixWriter::new(buf);

    w.field(format_args!("8=FIX.4.2"));
    w.field(format_args!("9=000")); // backfilled by seal()

    w.field(format_args!("35=D"));
    w.field(format_args!("11={}", order_id));
    w.field(format_args!("55={}", symbol_id));
    w.field(format_args!("54={}", if side > 0 { 1 } else { 2 }));
    w.field(format_args!(
        "60={}",
        Utc::now().format("%Y%m%d-%H:%M:%S%.3f")
    ));
    w.field(format_args!("38={}", quantity));
    w.field(format_args!("40=2"));
    w.field(format_args!("44={}", price));
    w.field(format_args!("59=0"));

    seal(w)
}

/// Encode an OrderCancelRequest. Returns bytes written, 0 on overflow.
pub fn encode_cancel_order(buf: &mut [u8], order_id: u64, orig_order_id: u64) -> usize {
    let mut w = FixWriter::new(buf);

    w.field(format_args!("8=FIX.4.2"));
    w.field(format_args!("9=000"));

    w.field(format_args!("35=F"));
    w.field(format_args!("11={}", order_id));
    w.field(format_args!("41={}", orig_order_id));

    seal(w)
}
