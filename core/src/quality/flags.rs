use crate::prelude::{ToolkitError, ToolkitResult};
use log::debug;
use ndarray::{Array2, Array3, ArrayView2, ArrayView3, Axis};

/// Number of flag bits carried by one DQ value.
pub const DQ_BITS: usize = 32;

/// Named bit positions of the JWST data-quality convention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DqFlag {
    DoNotUse = 0,
    Saturated = 1,
    JumpDet = 2,
    Dropout = 3,
    Outlier = 4,
    Persistence = 5,
    AdFloor = 6,
    ChargeLoss = 7,
    UnreliableError = 8,
    NonScience = 9,
    Dead = 10,
    Hot = 11,
    Warm = 12,
    LowQe = 13,
    Rc = 14,
    Telegraph = 15,
    NonLinear = 16,
    BadRefPixel = 17,
    NoFlatField = 18,
    NoGainValue = 19,
    NoLinCorr = 20,
    NoSatCheck = 21,
    UnreliableBias = 22,
    UnreliableDark = 23,
    UnreliableSlope = 24,
    UnreliableFlat = 25,
    Open = 26,
    AdjOpen = 27,
    UnreliableReset = 28,
    MsaFailedOpen = 29,
    OtherBadPixel = 30,
    ReferencePixel = 31,
}

impl DqFlag {
    pub const ALL: [DqFlag; DQ_BITS] = [
        DqFlag::DoNotUse,
        DqFlag::Saturated,
        DqFlag::JumpDet,
        DqFlag::Dropout,
        DqFlag::Outlier,
        DqFlag::Persistence,
        DqFlag::AdFloor,
        DqFlag::ChargeLoss,
        DqFlag::UnreliableError,
        DqFlag::NonScience,
        DqFlag::Dead,
        DqFlag::Hot,
        DqFlag::Warm,
        DqFlag::LowQe,
        DqFlag::Rc,
        DqFlag::Telegraph,
        DqFlag::NonLinear,
        DqFlag::BadRefPixel,
        DqFlag::NoFlatField,
        DqFlag::NoGainValue,
        DqFlag::NoLinCorr,
        DqFlag::NoSatCheck,
        DqFlag::UnreliableBias,
        DqFlag::UnreliableDark,
        DqFlag::UnreliableSlope,
        DqFlag::UnreliableFlat,
        DqFlag::Open,
        DqFlag::AdjOpen,
        DqFlag::UnreliableReset,
        DqFlag::MsaFailedOpen,
        DqFlag::OtherBadPixel,
        DqFlag::ReferencePixel,
    ];

    pub fn bit(self) -> u32 {
        self as u32
    }

    /// Packed value, `2^bit`.
    pub fn value(self) -> i64 {
        1_i64 << self.bit()
    }

    pub fn from_bit(bit: u32) -> Option<Self> {
        Self::ALL.get(bit as usize).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            DqFlag::DoNotUse => "DO_NOT_USE",
            DqFlag::Saturated => "SATURATED",
            DqFlag::JumpDet => "JUMP_DET",
            DqFlag::Dropout => "DROPOUT",
            DqFlag::Outlier => "OUTLIER",
            DqFlag::Persistence => "PERSISTENCE",
            DqFlag::AdFloor => "AD_FLOOR",
            DqFlag::ChargeLoss => "CHARGELOSS",
            DqFlag::UnreliableError => "UNRELIABLE_ERROR",
            DqFlag::NonScience => "NON_SCIENCE",
            DqFlag::Dead => "DEAD",
            DqFlag::Hot => "HOT",
            DqFlag::Warm => "WARM",
            DqFlag::LowQe => "LOW_QE",
            DqFlag::Rc => "RC",
            DqFlag::Telegraph => "TELEGRAPH",
            DqFlag::NonLinear => "NONLINEAR",
            DqFlag::BadRefPixel => "BAD_REF_PIXEL",
            DqFlag::NoFlatField => "NO_FLAT_FIELD",
            DqFlag::NoGainValue => "NO_GAIN_VALUE",
            DqFlag::NoLinCorr => "NO_LIN_CORR",
            DqFlag::NoSatCheck => "NO_SAT_CHECK",
            DqFlag::UnreliableBias => "UNRELIABLE_BIAS",
            DqFlag::UnreliableDark => "UNRELIABLE_DARK",
            DqFlag::UnreliableSlope => "UNRELIABLE_SLOPE",
            DqFlag::UnreliableFlat => "UNRELIABLE_FLAT",
            DqFlag::Open => "OPEN",
            DqFlag::AdjOpen => "ADJ_OPEN",
            DqFlag::UnreliableReset => "UNRELIABLE_RESET",
            DqFlag::MsaFailedOpen => "MSA_FAILED_OPEN",
            DqFlag::OtherBadPixel => "OTHER_BAD_PIXEL",
            DqFlag::ReferencePixel => "REFERENCE_PIXEL",
        }
    }
}

/// Narrows a packed DQ value to the 32 bits it may use.
fn checked_value(value: i64) -> ToolkitResult<u32> {
    u32::try_from(value).map_err(|_| {
        ToolkitError::Domain(format!(
            "DQ value {} is outside 0..={}",
            value,
            u32::MAX
        ))
    })
}

fn checked_pixel(value: i64, (y, x): (usize, usize)) -> ToolkitResult<u32> {
    checked_value(value).map_err(|_| {
        ToolkitError::Domain(format!(
            "DQ value {} at (y={}, x={}) is outside 0..={}",
            value,
            y,
            x,
            u32::MAX
        ))
    })
}

fn set_bits(value: u32) -> impl Iterator<Item = u32> {
    (0..DQ_BITS as u32).filter(move |bit| (value >> bit) & 1 == 1)
}

/// Powers of two whose sum is `value`, smallest first.
pub fn decompose_status(value: i64) -> ToolkitResult<Vec<u32>> {
    let value = checked_value(value)?;
    Ok(set_bits(value).map(|bit| 1_u32 << bit).collect())
}

/// Indices of the bits set in `value`, smallest first.
pub fn decompose_bits(value: i64) -> ToolkitResult<Vec<u32>> {
    let value = checked_value(value)?;
    Ok(set_bits(value).collect())
}

/// Splits a DQ array into a `(ny, nx, 32)` cube of 0/1 flag planes.
pub fn decompose_array(dq: ArrayView2<i64>) -> ToolkitResult<Array3<u8>> {
    let (ny, nx) = dq.dim();
    let mut planes = Array3::<u8>::zeros((ny, nx, DQ_BITS));
    for ((y, x), &value) in dq.indexed_iter() {
        let value = checked_pixel(value, (y, x))?;
        for bit in set_bits(value) {
            planes[[y, x, bit as usize]] = 1;
        }
    }
    debug!("decompose_array: {}x{} DQ array into {} planes", ny, nx, DQ_BITS);
    Ok(planes)
}

/// Packs a `(ny, nx, 32)` cube of 0/1 planes back into DQ values.
pub fn recompose_array(planes: ArrayView3<u8>) -> ToolkitResult<Array2<i64>> {
    let (ny, nx, nbits) = planes.dim();
    if nbits != DQ_BITS {
        return Err(ToolkitError::Configuration(format!(
            "flag cube has {} planes, expected {}",
            nbits, DQ_BITS
        )));
    }
    let mut dq = Array2::<i64>::zeros((ny, nx));
    for (bit, plane) in planes.axis_iter(Axis(2)).enumerate() {
        for ((y, x), &flag) in plane.indexed_iter() {
            match flag {
                0 => {}
                1 => dq[[y, x]] |= 1_i64 << bit,
                other => {
                    return Err(ToolkitError::Domain(format!(
                        "flag plane {} holds {} at (y={}, x={})",
                        bit, other, y, x
                    )))
                }
            }
        }
    }
    Ok(dq)
}

/// Pixels whose bit `flag` (0-indexed) is set, regardless of other bits.
pub fn extract_flag(dq: ArrayView2<i64>, flag: u32) -> ToolkitResult<Array2<bool>> {
    if flag as usize >= DQ_BITS {
        return Err(ToolkitError::Domain(format!(
            "flag bit {} is outside 0..{}",
            flag, DQ_BITS
        )));
    }
    let mut out = Array2::from_elem(dq.raw_dim(), false);
    for (index, &value) in dq.indexed_iter() {
        let value = checked_pixel(value, index)?;
        out[index] = (value >> flag) & 1 == 1;
    }
    Ok(out)
}

/// Pixels carrying every bit of the packed `flag_value`.
pub fn extract_flag_value(dq: ArrayView2<i64>, flag_value: i64) -> ToolkitResult<Array2<bool>> {
    let wanted = checked_value(flag_value)?;
    let mut out = Array2::from_elem(dq.raw_dim(), false);
    for (index, &value) in dq.indexed_iter() {
        let value = checked_pixel(value, index)?;
        out[index] = value & wanted == wanted;
    }
    Ok(out)
}
