//! Hybrid Split Oracle
//!
//! Decides, for every number of poles, whether the 2-way or the 4-way
//! construction yields the smaller universal graph. The table is built once
//! by dynamic programming from the per-shape switch counts of the block
//! families and then consulted at every recursion level of the hybrid
//! construction.
//!
//! The body-block terms use wrapping arithmetic on purpose: for pole counts
//! with fewer than one body block the negative block count cancels against
//! the lone body constant exactly when the two constants agree, and
//! otherwise produces an astronomically large cost that the comparison
//! discards.

const HEAD_2: u64 = 3;
const BODY_2_1: u64 = 5;
const BODY_2_2: u64 = 5;
const HEAD_4: u64 = 13;

const TAIL_1: u64 = 1;
const TAIL_2: u64 = 4;
const TAIL_3: u64 = 9;
const TAIL_4: u64 = 14;

const BODY_4_1: u64 = 17;
const BODY_4_2: u64 = 18;

/// Size-indexed table of the cheaper split per pole count.
#[derive(Debug, Clone)]
pub struct HybridChoice {
    choices: Vec<u32>,
    options: Vec<(u64, u64)>,
}

impl HybridChoice {
    /// Calculate for each number of poles up to `n` whether the 2-way or
    /// the 4-way construction is the better choice.
    ///
    /// # Arguments
    /// * `n` - maximum number of poles the table must cover
    /// * `zhao` - true if Zhao's optimised 4-way body blocks are counted
    pub fn build(n: usize, zhao: bool) -> Self {
        let body_4_3: u64 = if zhao { 18 } else { 19 };
        let body_4_4: u64 = if zhao { 18 } else { 19 };

        let mut sizes: Vec<u64> = vec![0; n.max(4) + 1];
        sizes[1] = 1;
        sizes[2] = 2;
        sizes[3] = 3;
        sizes[4] = 6;

        let mut choices: Vec<u32> = vec![2, 2, 2, 2, 2];
        let mut options: Vec<(u64, u64)> = vec![(0, 0); 5];

        for j in 5..=n {
            let q4 = (j / 4) as u64;
            let q2 = (j / 2) as u64;
            let option_4way: u64;
            let option_2way: u64;
            match j % 4 {
                0 => {
                    option_4way = (4 * sizes[j / 4 - 1])
                        .wrapping_add(body_4_4.wrapping_mul(q4.wrapping_sub(3)))
                        .wrapping_add(body_4_4 + HEAD_4 + TAIL_4);
                    option_2way = (2 * sizes[j / 2 - 1])
                        .wrapping_add(BODY_2_2.wrapping_mul(q2.wrapping_sub(3)))
                        .wrapping_add(BODY_2_2 + TAIL_2 + HEAD_2);
                }
                3 => {
                    option_4way = (sizes[j / 4 - 1] + 3 * sizes[j / 4])
                        .wrapping_add(body_4_4.wrapping_mul((q4 + 1).wrapping_sub(3)))
                        .wrapping_add(body_4_3 + HEAD_4 + TAIL_3);
                    option_2way = (sizes[j / 2 - 1] + sizes[j / 2])
                        .wrapping_add(BODY_2_2.wrapping_mul((q2 + 1).wrapping_sub(3)))
                        .wrapping_add(BODY_2_1 + HEAD_2 + TAIL_1);
                }
                2 => {
                    option_4way = (2 * sizes[j / 4 - 1] + 2 * sizes[j / 4])
                        .wrapping_add(body_4_4.wrapping_mul((q4 + 1).wrapping_sub(3)))
                        .wrapping_add(BODY_4_2 + HEAD_4 + TAIL_2);
                    option_2way = (2 * sizes[j / 2 - 1])
                        .wrapping_add(BODY_2_2.wrapping_mul(q2.wrapping_sub(3)))
                        .wrapping_add(BODY_2_2 + TAIL_2 + HEAD_2);
                }
                _ => {
                    option_4way = (3 * sizes[j / 4 - 1] + sizes[j / 4])
                        .wrapping_add(body_4_4.wrapping_mul((q4 + 1).wrapping_sub(3)))
                        .wrapping_add(BODY_4_1 + HEAD_4 + TAIL_1);
                    option_2way = (sizes[j / 2 - 1] + sizes[j / 2])
                        .wrapping_add(BODY_2_2.wrapping_mul((q2 + 1).wrapping_sub(3)))
                        .wrapping_add(BODY_2_1 + HEAD_2 + TAIL_1);
                }
            }
            if option_2way < option_4way {
                sizes[j] = option_2way;
                choices.push(2);
            } else {
                sizes[j] = option_4way;
                choices.push(4);
            }
            options.push((option_2way, option_4way));
        }

        Self { choices, options }
    }

    /// The cheaper split for the given pole count.
    #[inline]
    pub fn next_k(&self, size: usize) -> u32 {
        self.choices[size]
    }

    /// The `(2-way, 4-way)` option costs computed for the given pole count,
    /// as seen by the dynamic program. Only defined for sizes above 4.
    #[inline]
    pub fn options(&self, size: usize) -> (u64, u64) {
        self.options[size]
    }

    /// Largest size the table covers.
    #[inline]
    pub fn limit(&self) -> usize {
        self.choices.len() - 1
    }
}
