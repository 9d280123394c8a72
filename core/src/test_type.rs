//! Imaging test catalogue and price table.
//!
//! Prices are whole units of the booking currency. The workflow converts them to
//! minor units only when talking to the payment gateway.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A diagnostic imaging procedure that can be booked.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TestType {
    /// Plain radiograph
    Xray,
    /// Computed tomography
    CtScan,
    /// Magnetic resonance imaging
    Mri,
    /// Ultrasound / sonography
    Ultrasound,
    /// Breast screening
    Mammogram,
    /// Bone density scan
    Dexa,
    /// Positron emission tomography
    PetScan,
    /// Vessel imaging with contrast
    Angiography,
    /// Real-time x-ray
    Fluoroscopy,
    /// Radiotracer imaging
    NuclearMedicine,
}

impl TestType {
    /// Every bookable test type, in catalogue order.
    pub const ALL: [Self; 10] = [
        Self::Xray,
        Self::CtScan,
        Self::Mri,
        Self::Ultrasound,
        Self::Mammogram,
        Self::Dexa,
        Self::PetScan,
        Self::Angiography,
        Self::Fluoroscopy,
        Self::NuclearMedicine,
    ];

    /// Wire key used in requests, responses and storage.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Self::Xray => "xray",
            Self::CtScan => "ct-scan",
            Self::Mri => "mri",
            Self::Ultrasound => "ultrasound",
            Self::Mammogram => "mammogram",
            Self::Dexa => "dexa",
            Self::PetScan => "pet-scan",
            Self::Angiography => "angiography",
            Self::Fluoroscopy => "fluoroscopy",
            Self::NuclearMedicine => "nuclear-medicine",
        }
    }

    /// Human readable name for emails and the catalogue endpoint.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Xray => "X-Ray",
            Self::CtScan => "CT Scan",
            Self::Mri => "MRI",
            Self::Ultrasound => "Ultrasound",
            Self::Mammogram => "Mammogram",
            Self::Dexa => "DEXA Scan",
            Self::PetScan => "PET Scan",
            Self::Angiography => "Angiography",
            Self::Fluoroscopy => "Fluoroscopy",
            Self::NuclearMedicine => "Nuclear Medicine",
        }
    }

    /// Fixed price in whole currency units.
    #[must_use]
    pub const fn price(self) -> u32 {
        match self {
            Self::Xray => 1000,
            Self::CtScan => 3500,
            Self::Mri => 6000,
            Self::Ultrasound => 1500,
            Self::Mammogram => 2000,
            Self::Dexa => 2500,
            Self::PetScan => 15000,
            Self::Angiography => 12000,
            Self::Fluoroscopy => 3000,
            Self::NuclearMedicine => 8000,
        }
    }
}

impl fmt::Display for TestType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error returned when a string is not a catalogue key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown test type: {0}")]
pub struct UnknownTestType(pub String);

impl FromStr for TestType {
    type Err = UnknownTestType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|test_type| test_type.key() == s)
            .ok_or_else(|| UnknownTestType(s.to_string()))
    }
}
