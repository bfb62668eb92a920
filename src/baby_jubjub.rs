//! EIP-2494 Baby Jubjub Curve
//!
//! This is an append to the `ark-ed-on-bn254` crate to use the EIP-2494 defined Baby Jubjub curve parameters.
//!
//! - https://eips.ethereum.org/EIPS/eip-2494
//!
//! - Base field: q = 21888242871839275222246405745257275088548364400416034343698204186575808495617
//! - Scalar field: r = 2736030358979909402780800718157159386076813972158567259200215660948447373041
//! - Order: n = l * cofactor = 21888242871839275222246405745257275088614511777268538073601725287587578984328
//! - Cofactor: 8
//! - Subgroup order: l = 2736030358979909402780800718157159386076813972158567259200215660948447373041
//! - Curve equation: ax² + y² = 1 + d·x²y², where
//!    - a = 168700
//!    - d = 168696
//! - Generator point:
//!    (995203441582195749578291179787384436505546430278305826713579947235728471134,
//!     5472060717959818805561601436314318772137091100104008585924551046643952123905)
//! - Base point:
//!    (5299619240641551281634865583518297030282874472190772894086521144482721001553,
//!     16950150798460657717958625567821834550301663161624707787222815936182638968203)

use crate::error::{AmaciError, Result};
use ark_ec::{
    models::CurveConfig,
    twisted_edwards::{Affine, MontCurveConfig, Projective, TECurveConfig},
    CurveGroup,
};
use ark_ed_on_bn254::{Fq, Fr};
use ark_ff::{AdditiveGroup, BigInteger, Field, MontFp, PrimeField};
use num_bigint::BigUint;
use rand::Rng;
use std::ops::Mul;

pub type EdwardsAffine = Affine<BabyJubjubConfig>;
pub type EdwardsProjective = Projective<BabyJubjubConfig>;

#[derive(Clone, Default, PartialEq, Eq)]
pub struct BabyJubjubConfig;

impl CurveConfig for BabyJubjubConfig {
    type BaseField = Fq;
    type ScalarField = Fr;

    // h = 8
    const COFACTOR: &'static [u64] = &[8];

    // h^(-1) (mod r)
    const COFACTOR_INV: Fr =
        MontFp!("2394026564107420727433200628387514462817212225638746351800188703329891451411");
}

// Twisted Edwards form
// ax^2 + y^2 = 1 + dx^2y^2
impl TECurveConfig for BabyJubjubConfig {
    // a = 168700
    const COEFF_A: Fq = MontFp!("168700");

    #[inline(always)]
    fn mul_by_a(elem: Self::BaseField) -> Self::BaseField {
        elem * <BabyJubjubConfig as TECurveConfig>::COEFF_A
    }

    // d = 168696
    const COEFF_D: Fq = MontFp!("168696");

    // Base point is used as generator to operate in subgroup
    const GENERATOR: EdwardsAffine = EdwardsAffine::new_unchecked(BASE_X, BASE_Y);

    type MontCurveConfig = BabyJubjubConfig;
}

// Montgomery form
// By^2 = x^3 + A x^2 + x
impl MontCurveConfig for BabyJubjubConfig {
    // A = 168698
    const COEFF_A: Fq = MontFp!("168698");
    // B = 1
    const COEFF_B: Fq = Fq::ONE;

    type TECurveConfig = BabyJubjubConfig;
}

/// Generator point x-coordinate
pub const GENERATOR_X: Fq =
    MontFp!("995203441582195749578291179787384436505546430278305826713579947235728471134");
/// Generator point y-coordinate
pub const GENERATOR_Y: Fq =
    MontFp!("5472060717959818805561601436314318772137091100104008585924551046643952123905");

/// Subgroup order `l`
pub const SUBGROUP_ORDER: Fr =
    MontFp!("2736030358979909402780800718157159386076813972158567259200215660948447373041");

// Subgroup generator
// Generates subgroup l * P = O

/// Base point x-coordinate
pub const BASE_X: Fq =
    MontFp!("5299619240641551281634865583518297030282874472190772894086521144482721001553");
/// Base point y-coordinate
pub const BASE_Y: Fq =
    MontFp!("16950150798460657717958625567821834550301663161624707787222815936182638968203");

/// Returns the Baby Jubjub subgroup generator `B8`.
pub fn base8() -> EdwardsAffine {
    EdwardsAffine::new_unchecked(BASE_X, BASE_Y)
}

/// Returns the curve identity point `(0, 1)`.
pub fn identity() -> EdwardsAffine {
    EdwardsAffine::new_unchecked(Fq::ZERO, Fq::ONE)
}

/// Twisted-Edwards point addition `P + Q`.
pub fn add_point(p: &EdwardsAffine, q: &EdwardsAffine) -> EdwardsAffine {
    (*p + *q).into_affine()
}

/// Scalar multiplication `k · P` via arkworks' constant-time double-and-add.
pub fn mul_point_escalar(p: &EdwardsAffine, k: Fr) -> EdwardsAffine {
    p.mul(k).into_affine()
}

/// Point negation: `-P = (-x, y)` on a twisted-Edwards curve.
pub fn negate_point(p: &EdwardsAffine) -> EdwardsAffine {
    EdwardsAffine::new_unchecked(-p.x, p.y)
}

/// Point subtraction `P - Q`.
pub fn sub_point(p: &EdwardsAffine, q: &EdwardsAffine) -> EdwardsAffine {
    add_point(p, &negate_point(q))
}

/// Checks the twisted-Edwards curve equation `a·x² + y² = 1 + d·x²·y²`.
pub fn in_curve(p: &EdwardsAffine) -> bool {
    use ark_ec::twisted_edwards::TECurveConfig as _;
    let x2 = p.x * p.x;
    let y2 = p.y * p.y;
    let lhs = BabyJubjubConfig::mul_by_a(x2) + y2;
    let rhs = Fq::ONE + BabyJubjubConfig::COEFF_D * x2 * y2;
    lhs == rhs
}

/// Checks that `P` lies in the prime-order subgroup (`l · P = O`).
pub fn in_subgroup(p: &EdwardsAffine) -> bool {
    in_curve(p) && mul_point_escalar(p, SUBGROUP_ORDER) == identity()
}

/// Packs a point into its 32-byte little-endian canonical form: the `y`
/// coordinate with the sign of `x` folded into the top bit.
pub fn pack_point(p: &EdwardsAffine) -> BigUint {
    let mut bytes = p.y.into_bigint().to_bytes_le();
    bytes.resize(32, 0);
    if is_negative_x(&p.x) {
        bytes[31] |= 0x80;
    }
    BigUint::from_bytes_le(&bytes)
}

/// Unpacks a 32-byte little-endian point, recovering `x` from the curve
/// equation and the sign bit. Fails if `y ≥ p` or no `x` exists for `y`.
pub fn unpack_point(packed: &BigUint) -> Result<EdwardsAffine> {
    let mut bytes = packed.to_bytes_le();
    bytes.resize(32, 0);
    let sign = bytes[31] & 0x80 != 0;
    bytes[31] &= 0x7f;

    let y_big = BigUint::from_bytes_le(&bytes);
    if y_big >= crate::field::snark_field_size() {
        return Err(AmaciError::InvalidPoint);
    }
    let y = Fq::from_le_bytes_mod_order(&bytes);

    // a*x^2 + y^2 = 1 + d*x^2*y^2  =>  x^2 = (1 - y^2) / (a - d*y^2)
    use ark_ec::twisted_edwards::TECurveConfig as _;
    let y2 = y * y;
    let num = Fq::ONE - y2;
    let den = BabyJubjubConfig::COEFF_A - BabyJubjubConfig::COEFF_D * y2;
    let den_inv = den.inverse().ok_or(AmaciError::InvalidPoint)?;
    let x2 = num * den_inv;
    let mut x = x2.sqrt().ok_or(AmaciError::InvalidPoint)?;

    if is_negative_x(&x) != sign {
        x = -x;
    }

    let point = EdwardsAffine::new_unchecked(x, y);
    if !in_curve(&point) {
        return Err(AmaciError::InvalidPoint);
    }
    Ok(point)
}

/// Canonical sign convention for packing: `x` is "negative" when its
/// canonical big-endian representative is greater than `p/2`.
fn is_negative_x(x: &Fq) -> bool {
    let bytes = x.into_bigint().to_bytes_le();
    let as_int = BigUint::from_bytes_le(&bytes);
    as_int > (crate::field::snark_field_size() - BigUint::from(1u64)) / BigUint::from(2u64)
}

/// Samples a uniformly random value suitable for a Baby Jubjub scalar
/// (salts, blinding factors): 253 random bits, matching the subgroup's bit
/// length.
pub fn gen_random_babyjub_value() -> BigUint {
    let mut rng = rand::thread_rng();
    let mut bytes = [0u8; 32];
    rng.fill(&mut bytes);
    bytes[31] &= 0x1f; // keep it well under 2^253
    BigUint::from_bytes_le(&bytes)
}
