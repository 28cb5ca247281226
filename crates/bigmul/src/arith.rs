//! Word-vector arithmetic kernels with one-time CPU dispatch.
//!
//! All vector operations take equal-length slices and return the carry (or
//! borrow) out of the top word. Two implementations exist behind the
//! [`WordKernel`] trait: a portable scalar loop and a 4-word unrolled carry
//! chain that lets the CPU overlap the multiplies and adds of neighbouring
//! words. [`Arith`] picks one at first use from the detected [`CpuFeatures`].

use std::fmt;
use std::sync::OnceLock;

use tracing::debug;

use crate::constants::MIN_UNROLLED_LEN;

/// One digit of a magnitude.
pub type Word = u64;

/// Add with carry: a + b + carry -> (sum, `new_carry`)
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn add_with_carry(a: Word, b: Word, carry: Word) -> (Word, Word) {
    let sum = u128::from(a) + u128::from(b) + u128::from(carry);
    (sum as Word, (sum >> 64) as Word)
}

/// Subtract with borrow: a - b - borrow -> (diff, `new_borrow`)
#[inline]
#[must_use]
pub fn sub_with_borrow(a: Word, b: Word, borrow: Word) -> (Word, Word) {
    let (d1, b1) = a.overflowing_sub(b);
    let (d2, b2) = d1.overflowing_sub(borrow);
    (d2, Word::from(b1 | b2))
}

/// Multiply: a * b -> (low, high)
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mul_wide(a: Word, b: Word) -> (Word, Word) {
    let prod = u128::from(a) * u128::from(b);
    (prod as Word, (prod >> 64) as Word)
}

/// x * y + add + carry -> (low, high). Cannot overflow 128 bits.
#[inline]
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn mul_add_wide(x: Word, y: Word, add: Word, carry: Word) -> (Word, Word) {
    let t = u128::from(x) * u128::from(y) + u128::from(add) + u128::from(carry);
    (t as Word, (t >> 64) as Word)
}

/// Add a scalar to a word slice in place, returning the carry out.
pub fn add_scalar(data: &mut [Word], scalar: Word) -> Word {
    let mut carry = scalar;
    for limb in data.iter_mut() {
        if carry == 0 {
            break;
        }
        let (sum, c) = limb.overflowing_add(carry);
        *limb = sum;
        carry = Word::from(c);
    }
    carry
}

/// Subtract a scalar from a word slice in place, returning the borrow out.
pub fn sub_scalar(data: &mut [Word], scalar: Word) -> Word {
    let mut borrow = scalar;
    for limb in data.iter_mut() {
        if borrow == 0 {
            break;
        }
        let (diff, b) = limb.overflowing_sub(borrow);
        *limb = diff;
        borrow = Word::from(b);
    }
    borrow
}

/// Carry-propagating vector primitives.
///
/// Implementations may assume `z`, `x` and `y` have equal length; [`Arith`]
/// checks this in debug builds.
pub trait WordKernel: Send + Sync {
    /// Short name for logs and benchmarks.
    fn name(&self) -> &'static str;

    /// z = x + y, returns carry.
    fn add_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word;

    /// z = x - y, returns borrow.
    fn sub_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word;

    /// z += y, returns carry.
    fn add_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word;

    /// z -= y, returns borrow.
    fn sub_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word;

    /// z += x * y, returns the high word carried out.
    fn add_mul_vvw(&self, z: &mut [Word], x: &[Word], y: Word) -> Word;
}

fn scalar_add(z: &mut [Word], x: &[Word], y: &[Word], mut carry: Word) -> Word {
    for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
        (*zi, carry) = add_with_carry(xi, yi, carry);
    }
    carry
}

fn scalar_sub(z: &mut [Word], x: &[Word], y: &[Word], mut borrow: Word) -> Word {
    for ((zi, &xi), &yi) in z.iter_mut().zip(x).zip(y) {
        (*zi, borrow) = sub_with_borrow(xi, yi, borrow);
    }
    borrow
}

fn scalar_add_assign(z: &mut [Word], y: &[Word], mut carry: Word) -> Word {
    for (zi, &yi) in z.iter_mut().zip(y) {
        (*zi, carry) = add_with_carry(*zi, yi, carry);
    }
    carry
}

fn scalar_sub_assign(z: &mut [Word], y: &[Word], mut borrow: Word) -> Word {
    for (zi, &yi) in z.iter_mut().zip(y) {
        (*zi, borrow) = sub_with_borrow(*zi, yi, borrow);
    }
    borrow
}

fn scalar_add_mul(z: &mut [Word], x: &[Word], y: Word, mut carry: Word) -> Word {
    for (zi, &xi) in z.iter_mut().zip(x) {
        (*zi, carry) = mul_add_wide(xi, y, *zi, carry);
    }
    carry
}

/// Portable one-word-at-a-time loops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScalarKernel;

impl WordKernel for ScalarKernel {
    fn name(&self) -> &'static str {
        "scalar"
    }

    fn add_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
        scalar_add(z, x, y, 0)
    }

    fn sub_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
        scalar_sub(z, x, y, 0)
    }

    fn add_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word {
        scalar_add_assign(z, y, 0)
    }

    fn sub_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word {
        scalar_sub_assign(z, y, 0)
    }

    fn add_mul_vvw(&self, z: &mut [Word], x: &[Word], y: Word) -> Word {
        scalar_add_mul(z, x, y, 0)
    }
}

/// Four words per iteration; the tail goes through the scalar loops.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnrolledKernel;

impl WordKernel for UnrolledKernel {
    fn name(&self) -> &'static str {
        "unrolled"
    }

    fn add_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
        let mut carry = 0;
        let mut zc = z.chunks_exact_mut(4);
        let mut xc = x.chunks_exact(4);
        let mut yc = y.chunks_exact(4);
        for ((zs, xs), ys) in (&mut zc).zip(&mut xc).zip(&mut yc) {
            let (s0, c0) = add_with_carry(xs[0], ys[0], carry);
            let (s1, c1) = add_with_carry(xs[1], ys[1], c0);
            let (s2, c2) = add_with_carry(xs[2], ys[2], c1);
            let (s3, c3) = add_with_carry(xs[3], ys[3], c2);
            zs.copy_from_slice(&[s0, s1, s2, s3]);
            carry = c3;
        }
        scalar_add(zc.into_remainder(), xc.remainder(), yc.remainder(), carry)
    }

    fn sub_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
        let mut borrow = 0;
        let mut zc = z.chunks_exact_mut(4);
        let mut xc = x.chunks_exact(4);
        let mut yc = y.chunks_exact(4);
        for ((zs, xs), ys) in (&mut zc).zip(&mut xc).zip(&mut yc) {
            let (d0, b0) = sub_with_borrow(xs[0], ys[0], borrow);
            let (d1, b1) = sub_with_borrow(xs[1], ys[1], b0);
            let (d2, b2) = sub_with_borrow(xs[2], ys[2], b1);
            let (d3, b3) = sub_with_borrow(xs[3], ys[3], b2);
            zs.copy_from_slice(&[d0, d1, d2, d3]);
            borrow = b3;
        }
        scalar_sub(zc.into_remainder(), xc.remainder(), yc.remainder(), borrow)
    }

    fn add_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word {
        let mut carry = 0;
        let mut zc = z.chunks_exact_mut(4);
        let mut yc = y.chunks_exact(4);
        for (zs, ys) in (&mut zc).zip(&mut yc) {
            let (s0, c0) = add_with_carry(zs[0], ys[0], carry);
            let (s1, c1) = add_with_carry(zs[1], ys[1], c0);
            let (s2, c2) = add_with_carry(zs[2], ys[2], c1);
            let (s3, c3) = add_with_carry(zs[3], ys[3], c2);
            zs.copy_from_slice(&[s0, s1, s2, s3]);
            carry = c3;
        }
        scalar_add_assign(zc.into_remainder(), yc.remainder(), carry)
    }

    fn sub_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word {
        let mut borrow = 0;
        let mut zc = z.chunks_exact_mut(4);
        let mut yc = y.chunks_exact(4);
        for (zs, ys) in (&mut zc).zip(&mut yc) {
            let (d0, b0) = sub_with_borrow(zs[0], ys[0], borrow);
            let (d1, b1) = sub_with_borrow(zs[1], ys[1], b0);
            let (d2, b2) = sub_with_borrow(zs[2], ys[2], b1);
            let (d3, b3) = sub_with_borrow(zs[3], ys[3], b2);
            zs.copy_from_slice(&[d0, d1, d2, d3]);
            borrow = b3;
        }
        scalar_sub_assign(zc.into_remainder(), yc.remainder(), borrow)
    }

    fn add_mul_vvw(&self, z: &mut [Word], x: &[Word], y: Word) -> Word {
        let mut carry = 0;
        let mut zc = z.chunks_exact_mut(4);
        let mut xc = x.chunks_exact(4);
        for (zs, xs) in (&mut zc).zip(&mut xc) {
            // The four products are independent; only the carry chains them.
            let p0 = mul_wide(xs[0], y);
            let p1 = mul_wide(xs[1], y);
            let p2 = mul_wide(xs[2], y);
            let p3 = mul_wide(xs[3], y);
            let (r0, c0) = mul_add_wide(1, p0.0, zs[0], carry);
            let (r1, c1) = mul_add_wide(1, p1.0, zs[1], c0 + p0.1);
            let (r2, c2) = mul_add_wide(1, p2.0, zs[2], c1 + p1.1);
            let (r3, c3) = mul_add_wide(1, p3.0, zs[3], c2 + p2.1);
            zs.copy_from_slice(&[r0, r1, r2, r3]);
            carry = c3 + p3.1;
        }
        scalar_add_mul(zc.into_remainder(), xc.remainder(), y, carry)
    }
}

/// Which kernel family is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelLevel {
    /// Portable scalar loops.
    Scalar,
    /// 4-word unrolled carry chains.
    Unrolled,
}

impl fmt::Display for KernelLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Scalar => write!(f, "scalar"),
            Self::Unrolled => write!(f, "unrolled"),
        }
    }
}

/// Capability flags relevant to multi-word arithmetic.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CpuFeatures {
    /// 256-bit vector extensions.
    pub avx2: bool,
    /// Flag-free wide multiply (MULX).
    pub bmi2: bool,
    /// Dual carry chains (ADCX/ADOX).
    pub adx: bool,
}

impl CpuFeatures {
    /// Probe the running CPU.
    #[must_use]
    pub fn detect() -> Self {
        #[cfg(target_arch = "x86_64")]
        {
            Self {
                avx2: std::arch::is_x86_feature_detected!("avx2"),
                bmi2: std::arch::is_x86_feature_detected!("bmi2"),
                adx: std::arch::is_x86_feature_detected!("adx"),
            }
        }
        #[cfg(not(target_arch = "x86_64"))]
        {
            Self::default()
        }
    }

    /// Best kernel family for these features.
    ///
    /// The unrolled kernel only pays off where the wide multiply does not
    /// clobber the carry flag; every aarch64 core qualifies.
    #[must_use]
    pub fn best_level(&self) -> KernelLevel {
        if cfg!(target_arch = "aarch64") || (self.bmi2 && self.adx) {
            KernelLevel::Unrolled
        } else {
            KernelLevel::Scalar
        }
    }
}

impl fmt::Display for CpuFeatures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [(self.avx2, "avx2"), (self.bmi2, "bmi2"), (self.adx, "adx")]
            .into_iter()
            .filter_map(|(on, name)| on.then_some(name))
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(","))
        }
    }
}

static SCALAR: ScalarKernel = ScalarKernel;
static UNROLLED: UnrolledKernel = UnrolledKernel;
static DETECTED: OnceLock<Arith> = OnceLock::new();

/// The selected kernel, plus the short-vector scalar fallback.
#[derive(Clone, Copy)]
pub struct Arith {
    kernel: &'static dyn WordKernel,
    level: KernelLevel,
}

impl fmt::Debug for Arith {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arith")
            .field("kernel", &self.kernel.name())
            .field("level", &self.level)
            .finish()
    }
}

impl Default for Arith {
    fn default() -> Self {
        Self::detect()
    }
}

impl Arith {
    /// Kernel chosen for this CPU, probed once per process.
    pub fn detect() -> Self {
        *DETECTED.get_or_init(|| {
            let features = CpuFeatures::detect();
            let arith = Self::for_level(features.best_level());
            debug!(kernel = arith.kernel.name(), %features, "word kernel selected");
            arith
        })
    }

    /// Force a kernel family.
    #[must_use]
    pub fn for_level(level: KernelLevel) -> Self {
        let kernel: &'static dyn WordKernel = match level {
            KernelLevel::Scalar => &SCALAR,
            KernelLevel::Unrolled => &UNROLLED,
        };
        Self { kernel, level }
    }

    /// Always-scalar kernels.
    #[must_use]
    pub fn scalar() -> Self {
        Self::for_level(KernelLevel::Scalar)
    }

    /// Always-unrolled kernels (short vectors still go scalar).
    #[must_use]
    pub fn unrolled() -> Self {
        Self::for_level(KernelLevel::Unrolled)
    }

    /// Active kernel family.
    #[must_use]
    pub fn level(&self) -> KernelLevel {
        self.level
    }

    #[inline]
    fn pick(&self, len: usize) -> &'static dyn WordKernel {
        if len < MIN_UNROLLED_LEN {
            &SCALAR
        } else {
            self.kernel
        }
    }

    /// z = x + y, returns carry.
    #[inline]
    pub fn add_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
        debug_assert!(x.len() == z.len() && y.len() == z.len());
        self.pick(z.len()).add_vv(z, x, y)
    }

    /// z = x - y, returns borrow.
    #[inline]
    pub fn sub_vv(&self, z: &mut [Word], x: &[Word], y: &[Word]) -> Word {
        debug_assert!(x.len() == z.len() && y.len() == z.len());
        self.pick(z.len()).sub_vv(z, x, y)
    }

    /// z += y, returns carry.
    #[inline]
    pub fn add_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word {
        debug_assert_eq!(y.len(), z.len());
        self.pick(z.len()).add_assign_vv(z, y)
    }

    /// z -= y, returns borrow.
    #[inline]
    pub fn sub_assign_vv(&self, z: &mut [Word], y: &[Word]) -> Word {
        debug_assert_eq!(y.len(), z.len());
        self.pick(z.len()).sub_assign_vv(z, y)
    }

    /// z += x * y, returns the carried-out word.
    #[inline]
    pub fn add_mul_vvw(&self, z: &mut [Word], x: &[Word], y: Word) -> Word {
        debug_assert_eq!(x.len(), z.len());
        self.pick(z.len()).add_mul_vvw(z, x, y)
    }
}
