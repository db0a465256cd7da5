// SPDX-License-Identifier: Apache-2.0

//! Up-to-6-input single-output Boolean function truth tables packed in a `u64`.
//!
//! Bit `i` of the word is the function value on the input assignment encoded
//! by `i`, where input 0 is the least-significant selector bit and toggles
//! fastest. A function over `n < 6` inputs is kept "stretched": its low `2^n`
//! bits are replicated across the whole word, so functions over different
//! input counts compare and combine as if they had 6 inputs.

use serde::{Deserialize, Serialize};

/// Maximum number of inputs a `Truth6` can describe.
pub const MAX_VARS: usize = 6;

const VAR_MASKS: [u64; MAX_VARS] = [
    0xAAAA_AAAA_AAAA_AAAA,
    0xCCCC_CCCC_CCCC_CCCC,
    0xF0F0_F0F0_F0F0_F0F0,
    0xFF00_FF00_FF00_FF00,
    0xFFFF_0000_FFFF_0000,
    0xFFFF_FFFF_0000_0000,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Truth6(pub u64);

impl Truth6 {
    pub const fn const0() -> Self {
        Self(0)
    }

    pub const fn const1() -> Self {
        Self(!0)
    }

    /// Returns the (stretched) truth table of input `index`.
    pub const fn var(index: usize) -> Self {
        assert!(index < MAX_VARS, "Truth6::var index out of range");
        Self(VAR_MASKS[index])
    }

    #[inline]
    pub const fn not(self) -> Self {
        Self(!self.0)
    }

    #[inline]
    pub const fn and(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    #[inline]
    pub const fn or(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// `self & other` when `positive`, `self & !other` otherwise.
    #[inline]
    pub const fn and_sharp(self, other: Self, positive: bool) -> Self {
        if positive {
            Self(self.0 & other.0)
        } else {
            Self(self.0 & !other.0)
        }
    }

    #[inline]
    pub fn is_const0(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub fn is_const1(self) -> bool {
        self.0 == !0
    }

    #[inline]
    pub fn get_bit(self, index: usize) -> bool {
        debug_assert!(index < 64);
        (self.0 >> index) & 1 != 0
    }

    #[inline]
    pub fn set_bit(&mut self, index: usize) {
        debug_assert!(index < 64);
        self.0 |= 1u64 << index;
    }

    #[inline]
    pub fn xor_bit(&mut self, index: usize) {
        debug_assert!(index < 64);
        self.0 ^= 1u64 << index;
    }

    pub fn count_ones(self) -> u32 {
        self.0.count_ones()
    }

    /// Replicates the low `2^var_count` bits across the word.
    pub fn stretch(self, var_count: usize) -> Self {
        assert!(var_count <= MAX_VARS);
        let mut t = self.0;
        for v in var_count..MAX_VARS {
            let width = 1u32 << v;
            let low = t & ((1u64 << width) - 1);
            t = low | (low << width);
        }
        Self(t)
    }

    /// Returns whether the function depends on input `var`.
    pub fn has_var(self, var: usize) -> bool {
        let shift = 1u32 << var;
        let neg = !VAR_MASKS[var];
        ((self.0 >> shift) & neg) != (self.0 & neg)
    }

    pub fn cofactor0(self, var: usize) -> Self {
        let shift = 1u32 << var;
        let low = self.0 & !VAR_MASKS[var];
        Self(low | (low << shift))
    }

    pub fn cofactor1(self, var: usize) -> Self {
        let shift = 1u32 << var;
        let high = self.0 & VAR_MASKS[var];
        Self(high | (high >> shift))
    }

    /// Evaluates the function on the given input values, input 0 first.
    pub fn eval(self, inputs: &[bool]) -> bool {
        debug_assert!(inputs.len() <= MAX_VARS);
        self.get_bit(minterm_index(inputs))
    }
}

/// Packs input values into a minterm index, input 0 in the least-significant
/// bit.
pub fn minterm_index(values: &[bool]) -> usize {
    values
        .iter()
        .enumerate()
        .fold(0, |acc, (i, &v)| acc | ((v as usize) << i))
}

/// A product term over up to 6 inputs.
///
/// Input `i` appears in the cube when bit `i` of `mask` is set; its literal is
/// positive when bit `i` of `values` is also set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Cube {
    pub mask: u8,
    pub values: u8,
}

impl Cube {
    /// The empty cube, i.e. constant true.
    pub const fn tautology() -> Self {
        Self { mask: 0, values: 0 }
    }

    #[must_use]
    pub fn with_literal(self, var: usize, positive: bool) -> Self {
        debug_assert!(var < MAX_VARS);
        let bit = 1u8 << var;
        Self {
            mask: self.mask | bit,
            values: if positive {
                self.values | bit
            } else {
                self.values & !bit
            },
        }
    }

    pub fn literal(&self, var: usize) -> Option<bool> {
        let bit = 1u8 << var;
        if self.mask & bit == 0 {
            None
        } else {
            Some(self.values & bit != 0)
        }
    }

    pub fn literal_count(&self) -> u32 {
        self.mask.count_ones()
    }

    pub fn truth(&self) -> Truth6 {
        (0..MAX_VARS).fold(Truth6::const1(), |acc, var| match self.literal(var) {
            Some(positive) => acc.and_sharp(Truth6::var(var), positive),
            None => acc,
        })
    }
}

impl std::fmt::Display for Cube {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.mask == 0 {
            return write!(f, "1");
        }
        let mut first = true;
        for var in 0..MAX_VARS {
            if let Some(positive) = self.literal(var) {
                if !first {
                    write!(f, "&")?;
                }
                first = false;
                if !positive {
                    write!(f, "!")?;
                }
                write!(f, "d{}", var)?;
            }
        }
        Ok(())
    }
}

/// An irredundant sum-of-products cover.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Isop {
    pub truth: Truth6,
    pub cubes: Vec<Cube>,
}

impl Isop {
    pub fn cube_count(&self) -> usize {
        self.cubes.len()
    }
}

/// Computes an irredundant sum-of-products `f` with `on <= f <= on_dc`
/// (Minato-Morreale), over the first `var_count` inputs.
///
/// Both bounds must be stretched to `var_count` inputs.
pub fn isop(on: Truth6, on_dc: Truth6, var_count: usize) -> Isop {
    assert!(var_count <= MAX_VARS);
    assert_eq!(on.0 & !on_dc.0, 0, "isop: onset must be contained in upper bound");
    let mut cubes = Vec::new();
    let truth = isop_rec(on.0, on_dc.0, var_count, &mut cubes);
    Isop {
        truth: Truth6(truth),
        cubes,
    }
}

fn isop_rec(on: u64, on_dc: u64, var_count: usize, cubes: &mut Vec<Cube>) -> u64 {
    if on == 0 {
        return 0;
    }
    if on_dc == !0 {
        cubes.push(Cube::tautology());
        return !0;
    }
    assert!(var_count > 0);
    let Some(var) = (0..var_count)
        .rev()
        .find(|&v| Truth6(on).has_var(v) || Truth6(on_dc).has_var(v))
    else {
        unreachable!("isop: non-constant bounds must depend on some input");
    };
    let on0 = Truth6(on).cofactor0(var).0;
    let on1 = Truth6(on).cofactor1(var).0;
    let dc0 = Truth6(on_dc).cofactor0(var).0;
    let dc1 = Truth6(on_dc).cofactor1(var).0;

    let start0 = cubes.len();
    let res0 = isop_rec(on0 & !dc1, dc0, var, cubes);
    for cube in &mut cubes[start0..] {
        *cube = cube.with_literal(var, false);
    }
    let start1 = cubes.len();
    let res1 = isop_rec(on1 & !dc0, dc1, var, cubes);
    for cube in &mut cubes[start1..] {
        *cube = cube.with_literal(var, true);
    }
    let res2 = isop_rec((on0 & !res0) | (on1 & !res1), dc0 & dc1, var, cubes);

    res2 | (res0 & !VAR_MASKS[var]) | (res1 & VAR_MASKS[var])
}
