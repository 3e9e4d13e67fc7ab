//! Chunk planning: split an object of known size into fixed-size byte ranges.

use crate::errors::{CopyError, CopyResult};

/// One contiguous byte range of the source object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkSpec {
    pub index: usize,
    pub offset: u64,
    pub length: u64,
}

impl ChunkSpec {
    /// Exclusive end of the range.
    pub fn end(&self) -> u64 {
        self.offset + self.length
    }
}

/// Produce the ordered chunk ranges covering `[0, size)`.
///
/// Every chunk except possibly the last is exactly `chunk_size` bytes; the
/// last one holds the remainder (or a full chunk when `size` divides evenly).
pub fn plan_chunks(size: u64, chunk_size: u64) -> CopyResult<Vec<ChunkSpec>> {
    if size == 0 || chunk_size == 0 {
        return Err(CopyError::InvalidSize { size, chunk_size });
    }

    let count = size.div_ceil(chunk_size);
    let specs = (0..count)
        .map(|i| {
            let offset = i * chunk_size;
            ChunkSpec {
                index: i as usize,
                offset,
                length: chunk_size.min(size - offset),
            }
        })
        .collect();
    Ok(specs)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn assert_partition(size: u64, chunk_size: u64) {
        let specs = plan_chunks(size, chunk_size).unwrap();
        assert_eq!(specs.len() as u64, size.div_ceil(chunk_size));
        let mut expected_offset = 0;
        for (i, spec) in specs.iter().enumerate() {
            assert_eq!(spec.index, i);
            assert_eq!(spec.offset, expected_offset, "gap or overlap at chunk {i}");
            assert!(spec.length > 0);
            if i + 1 < specs.len() {
                assert_eq!(spec.length, chunk_size);
            }
            expected_offset = spec.end();
        }
        assert_eq!(expected_offset, size);

        let last = specs.last().unwrap();
        let rem = size % chunk_size;
        assert_eq!(last.length, if rem == 0 { chunk_size } else { rem });
    }

    #[test]
    fn partitions_exactly() {
        for size in [1, 2, 7, 8, 9, 63, 64, 65, 1000, 4096] {
            for chunk_size in [1, 2, 3, 8, 64, 5000] {
                assert_partition(size, chunk_size);
            }
        }
    }

    #[test]
    fn one_gib_in_quarter_gib_chunks() {
        let specs = plan_chunks(1_073_741_824, 256 * MIB).unwrap();
        assert_eq!(specs.len(), 4);
        assert!(specs.iter().all(|s| s.length == 268_435_456));
        assert_eq!(specs[3].offset, 3 * 268_435_456);
    }

    #[test]
    fn remainder_goes_to_last_chunk() {
        let specs = plan_chunks(300_000_000, 256 * MIB).unwrap();
        assert_eq!(
            specs,
            vec![
                ChunkSpec {
                    index: 0,
                    offset: 0,
                    length: 268_435_456,
                },
                ChunkSpec {
                    index: 1,
                    offset: 268_435_456,
                    length: 31_564_544,
                },
            ]
        );
    }

    #[test]
    fn object_smaller_than_chunk() {
        let specs = plan_chunks(10, 256 * MIB).unwrap();
        assert_eq!(specs.len(), 1);
        assert_eq!(specs[0].length, 10);
    }

    #[test]
    fn rejects_zero_sizes() {
        assert!(matches!(
            plan_chunks(0, MIB),
            Err(CopyError::InvalidSize { size: 0, .. })
        ));
        assert!(matches!(
            plan_chunks(MIB, 0),
            Err(CopyError::InvalidSize { chunk_size: 0, .. })
        ));
    }
}
