//! Certificate serial number allocation.

use std::sync::atomic::{AtomicU64, Ordering};

use rand_core::{OsRng, RngCore};

use crate::error::{PqCertKitError, Result};

/// Length of a random serial number in bytes.
pub const RANDOM_SERIAL_LEN: usize = 16;
/// Length of a sequential serial number in bytes.
pub const SEQUENTIAL_SERIAL_LEN: usize = 9;

/// Hands out serial numbers for issued certificates.
///
/// Serials are returned as big-endian two's complement bytes and are always
/// positive. Every serial an allocator hands out has the same length, so an
/// issued certificate's encoded size does not depend on which serial it got.
pub trait SerialNumberAllocator: Send + Sync {
    fn next_serial(&self) -> Result<Vec<u8>>;

    /// Returns a serial whose certificate was never handed to anyone.
    ///
    /// Allocators that cannot reuse serials ignore it.
    fn release(&self, _serial: &[u8]) {}
}

/// Random positive 128-bit serials.
///
/// The top bits of the first byte are fixed to `01`, so every serial is
/// positive and encodes to exactly 16 bytes.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomSerial;

impl SerialNumberAllocator for RandomSerial {
    fn next_serial(&self) -> Result<Vec<u8>> {
        let mut serial = vec![0u8; RANDOM_SERIAL_LEN];
        OsRng
            .try_fill_bytes(&mut serial)
            .map_err(|e| PqCertKitError::primitive(format!("serial number randomness: {e}")))?;
        serial[0] = (serial[0] & 0x3f) | 0x40;
        Ok(serial)
    }
}

/// Monotonically increasing serials from an atomic counter.
///
/// A serial is a `0x01` byte followed by the 8-byte big-endian counter, which
/// keeps it positive, minimally encoded and always [`SEQUENTIAL_SERIAL_LEN`]
/// bytes long.
#[derive(Debug)]
pub struct SequentialSerial {
    next: AtomicU64,
}

impl SequentialSerial {
    /// Starts counting at `start`. Zero is not a valid serial and is bumped to one.
    pub fn new(start: u64) -> Self {
        Self {
            next: AtomicU64::new(start.max(1)),
        }
    }
}

impl Default for SequentialSerial {
    fn default() -> Self {
        Self::new(1)
    }
}

impl SerialNumberAllocator for SequentialSerial {
    fn next_serial(&self) -> Result<Vec<u8>> {
        let value = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |value| {
                (value < u64::MAX).then(|| value + 1)
            })
            .map_err(|_| {
                PqCertKitError::InvalidInput("sequential serial numbers exhausted".to_string())
            })?;
        Ok(encode_sequential(value))
    }

    /// Rewinds the counter when `serial` is the most recent one handed out.
    fn release(&self, serial: &[u8]) {
        if let Some(value) = decode_sequential(serial) {
            let _ = self.next.compare_exchange(
                value + 1,
                value,
                Ordering::AcqRel,
                Ordering::Relaxed,
            );
        }
    }
}

fn encode_sequential(value: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(SEQUENTIAL_SERIAL_LEN);
    out.push(0x01);
    out.extend_from_slice(&value.to_be_bytes());
    out
}

fn decode_sequential(serial: &[u8]) -> Option<u64> {
    match serial {
        [0x01, counter @ ..] => {
            let counter = <[u8; 8]>::try_from(counter).ok()?;
            Some(u64::from_be_bytes(counter)).filter(|value| *value < u64::MAX)
        }
        _ => None,
    }
}

/// Lower-case hex rendering used in log fields.
pub(crate) fn to_hex(serial: &[u8]) -> String {
    serial.iter().map(|b| format!("{b:02x}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_random_serials_are_positive_and_distinct() {
        let mut seen = HashSet::new();
        for _ in 0..64 {
            let serial = RandomSerial.next_serial().unwrap();
            assert_eq!(serial.len(), RANDOM_SERIAL_LEN);
            assert_eq!(serial[0] & 0xc0, 0x40);
            assert!(seen.insert(serial));
        }
    }

    #[test]
    fn test_sequential_serials_keep_their_width() {
        let serials = SequentialSerial::new(0x7f);
        assert_eq!(
            serials.next_serial().unwrap(),
            vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0x7f]
        );
        assert_eq!(
            serials.next_serial().unwrap(),
            vec![0x01, 0, 0, 0, 0, 0, 0, 0, 0x80]
        );
        assert_eq!(
            to_hex(&serials.next_serial().unwrap()),
            "010000000000000081"
        );
    }

    #[test]
    fn test_sequential_zero_start() {
        assert_eq!(
            decode_sequential(&SequentialSerial::new(0).next_serial().unwrap()),
            Some(1)
        );
        assert_eq!(
            decode_sequential(&SequentialSerial::default().next_serial().unwrap()),
            Some(1)
        );
    }

    #[test]
    fn test_sequential_release() {
        let serials = SequentialSerial::new(5);
        let first = serials.next_serial().unwrap();
        serials.release(&first);
        assert_eq!(serials.next_serial().unwrap(), first);

        // only the latest serial can be handed back
        let second = serials.next_serial().unwrap();
        serials.release(&first);
        assert_eq!(decode_sequential(&second), Some(6));
        assert_eq!(decode_sequential(&serials.next_serial().unwrap()), Some(7));

        serials.release(&[0x7f]);
        assert_eq!(decode_sequential(&serials.next_serial().unwrap()), Some(8));
    }

    #[test]
    fn test_sequential_exhausted() {
        let serials = SequentialSerial::new(u64::MAX - 1);
        assert_eq!(serials.next_serial().unwrap().len(), SEQUENTIAL_SERIAL_LEN);
        for _ in 0..2 {
            assert!(matches!(
                serials.next_serial(),
                Err(PqCertKitError::InvalidInput(_))
            ));
        }
    }
}
