//! Architecturally visible register and flag identifiers.

/// The five 8-bit registers a host or scenario can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Reg {
    G0,
    G1,
    G2,
    Sp,
    Pc,
}

impl Reg {
    /// Resolves an (uppercase) register name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "G0" => Some(Self::G0),
            "G1" => Some(Self::G1),
            "G2" => Some(Self::G2),
            "SP" => Some(Self::Sp),
            "PC" => Some(Self::Pc),
            _ => None,
        }
    }
}

/// The three condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum Flag {
    C,
    S,
    Z,
}

impl Flag {
    /// Resolves an (uppercase) flag name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "C" => Some(Self::C),
            "S" => Some(Self::S),
            "Z" => Some(Self::Z),
            _ => None,
        }
    }
}
