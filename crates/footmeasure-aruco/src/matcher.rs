//! Dictionary lookup of observed bit codes, including the four marker rotations.

use crate::Dictionary;
use serde::{Deserialize, Serialize};

/// A dictionary hit for an observed marker code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    /// Marker id in the dictionary.
    pub id: u32,
    /// Quarter turns `0..=3` (clockwise) such that `observed == rotate(dict_code, rotation)`.
    pub rotation: u8,
    /// Bits that differ between the observed and the rotated dictionary code.
    pub hamming: u8,
}

impl Match {
    /// Reorder corners sampled in observation order so that index 0 is the
    /// marker's own top-left and the rest follow clockwise.
    ///
    /// A clockwise turn by `rotation` moves pattern corner `i` to observed
    /// corner `i + rotation`.
    #[inline]
    pub fn marker_corners<T: Copy>(&self, observed: [T; 4]) -> [T; 4] {
        let r = self.rotation as usize;
        [0usize, 1, 2, 3].map(|i| observed[(i + r) % 4])
    }
}

/// Brute-force matcher over every id and rotation of a fixed dictionary.
///
/// Rotated codes are stored flat, `table[4 * id + rotation]`.
#[derive(Clone, Debug)]
pub struct Matcher {
    dict: Dictionary,
    max_hamming: u8,
    table: Vec<u64>,
}

impl Matcher {
    /// Build a matcher accepting codes within `max_hamming` bits of a dictionary entry.
    ///
    /// `dict.bit_count()` must not exceed 64.
    pub fn new(dict: Dictionary, max_hamming: u8) -> Self {
        debug_assert!(dict.bit_count() <= 64);
        let n = dict.marker_size;
        let table = dict
            .codes
            .iter()
            .flat_map(|&code| (0u8..4).map(move |rot| rotate_code_u64(code, n, rot)))
            .collect();

        Self {
            dict,
            max_hamming,
            table,
        }
    }

    #[inline]
    pub fn dictionary(&self) -> Dictionary {
        self.dict
    }

    #[inline]
    pub fn max_hamming(&self) -> u8 {
        self.max_hamming
    }

    /// Closest dictionary entry within `max_hamming`.
    ///
    /// An exact hit wins immediately. Otherwise the nearest entry is returned
    /// only if no other id is equally near; ambiguous reads give `None`.
    pub fn match_code(&self, observed: u64) -> Option<Match> {
        let mut best: Option<Match> = None;
        let mut ambiguous = false;

        for (i, &cand) in self.table.iter().enumerate() {
            let hamming = (observed ^ cand).count_ones();
            if hamming > self.max_hamming as u32 {
                continue;
            }
            let m = Match {
                id: (i / 4) as u32,
                rotation: (i % 4) as u8,
                hamming: hamming as u8,
            };
            if hamming == 0 {
                return Some(m);
            }
            match best {
                Some(b) if b.hamming < m.hamming => {}
                Some(b) if b.hamming == m.hamming => ambiguous |= b.id != m.id,
                _ => {
                    best = Some(m);
                    ambiguous = false;
                }
            }
        }

        if ambiguous {
            None
        } else {
            best
        }
    }
}

/// Rotate an `n × n` code (row-major, `idx = y * n + x`) clockwise by `rot` quarter turns.
pub fn rotate_code_u64(code: u64, n: usize, rot: u8) -> u64 {
    let rot = rot & 3;
    if rot == 0 {
        return code;
    }

    let mut out = 0u64;
    for y in 0..n {
        for x in 0..n {
            let (sx, sy) = match rot {
                1 => (y, n - 1 - x),
                2 => (n - 1 - x, n - 1 - y),
                _ => (n - 1 - y, x),
            };
            out |= ((code >> (sy * n + sx)) & 1) << (y * n + x);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtins;

    fn dict() -> Dictionary {
        builtins::builtin_dictionary("DICT_4X4_50").expect("builtin dict")
    }

    #[test]
    fn four_quarter_turns_are_identity() {
        let code = 0x0123_4567_89ab_cdef_u64;
        let r = (0..4).fold(code, |c, _| rotate_code_u64(c, 8, 1));
        assert_eq!(code, r);
        assert_eq!(
            rotate_code_u64(rotate_code_u64(code, 8, 1), 8, 1),
            rotate_code_u64(code, 8, 2)
        );
    }

    #[test]
    fn quarter_turn_is_clockwise() {
        // top-left bit set -> top-right bit after one clockwise turn
        assert_eq!(rotate_code_u64(0b1, 4, 1), 1 << 3);
        assert_eq!(rotate_code_u64(0b1, 4, 2), 1 << 15);
        assert_eq!(rotate_code_u64(0b1, 4, 3), 1 << 12);
    }

    #[test]
    fn finds_rotated_code() {
        let dict = dict();
        let matcher = Matcher::new(dict, 0);

        for (id, rot) in [(0u32, 1u8), (17, 2), (49, 3)] {
            let observed = rotate_code_u64(dict.codes[id as usize], dict.marker_size, rot);
            let m = matcher.match_code(observed).expect("match");
            assert_eq!(
                m,
                Match {
                    id,
                    rotation: rot,
                    hamming: 0
                }
            );
        }
    }

    #[test]
    fn hamming_budget_is_respected() {
        let dict = dict();
        let observed = dict.codes[5] ^ (1 << 6);

        assert!(Matcher::new(dict, 0).match_code(observed).is_none());

        let m = Matcher::new(dict, 1).match_code(observed).expect("within 1 bit");
        assert_eq!(m.hamming, 1);
        assert_eq!(m.id, 5);
    }

    #[test]
    fn equally_near_ids_are_ambiguous() {
        // 2x2 codes: 0b0001 is one bit away from both entries
        static CODES: [u64; 2] = [0b0000, 0b0011];
        let dict = Dictionary {
            name: "TWO_BY_TWO",
            marker_size: 2,
            max_correction_bits: 1,
            codes: &CODES,
        };
        let matcher = Matcher::new(dict, 1);
        assert!(matcher.match_code(0b0001).is_none());
        assert_eq!(matcher.match_code(0b0011).map(|m| m.id), Some(1));
    }

    #[test]
    fn marker_corners_undo_the_rotation() {
        let m = Match {
            id: 0,
            rotation: 1,
            hamming: 0,
        };
        assert_eq!(m.marker_corners(['a', 'b', 'c', 'd']), ['b', 'c', 'd', 'a']);
        let upright = Match { rotation: 0, ..m };
        assert_eq!(upright.marker_corners([1, 2, 3, 4]), [1, 2, 3, 4]);
    }
}
