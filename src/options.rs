//! Device configuration choices, each a closed set of numeric codes.
//!
//! The codes are what travels on the wire: commands embed them as decimal
//! arguments (`DGS,1`) and setters confirm against the same decimal text.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DriverError;

macro_rules! device_option {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $code:literal, )+
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $( $(#[$vmeta])* $variant, )+
        }

        impl $name {
            /// Every value of this option, in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Numeric code sent to and received from the device.
            pub fn code(self) -> u8 {
                match self {
                    $( $name::$variant => $code, )+
                }
            }
        }

        impl TryFrom<u8> for $name {
            type Error = DriverError;

            fn try_from(code: u8) -> Result<Self, Self::Error> {
                match code {
                    $( $code => Ok($name::$variant), )+
                    other => Err(DriverError::Protocol(format!(
                        "{other} is not a valid {}",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.code())
            }
        }
    };
}

device_option! {
    /// Two-state switch used by degassing and emission.
    Status {
        Off = 0,
        On = 1,
        /// No state reported.
        NotSet = 2,
    }
}

device_option! {
    /// Offset correction of an ionization gauge channel.
    Offset {
        Ignore = 0,
        Apply = 1,
        /// The device is currently measuring the offset.
        IsRunning = 2,
    }
}

device_option! {
    /// Error groups that can be cleared; codes are bit masks and may be combined
    /// with [`ResetOptions::mask`].
    ResetOptions {
        VoltageSupplyErrors = 0b0000_0001,
        VoltageSupplyWarnings = 0b0000_0010,
        IonivacSupplyErrors = 0b0000_0100,
        IonivacSupplyWarnings = 0b0000_1000,
        PendingSupplyErrors = 0b0001_0000,
        EmissionOff = 0b0010_0000,
        AllErrors = 0b1000_0000,
    }
}

impl ResetOptions {
    /// Combine several groups into one reset mask.
    pub fn mask(options: &[ResetOptions]) -> u8 {
        options.iter().fold(0, |acc, o| acc | o.code())
    }
}

device_option! {
    /// Bayard-Alpert emission current selection.
    BayardCurrent {
        Auto = 0,
        Micro100 = 1,
        Milli1 = 2,
        Milli10 = 3,
        NotSet = 4,
    }
}

device_option! {
    AutoOffset {
        On = 0,
        Off = 1,
        NotSet = 2,
    }
}

device_option! {
    /// Full-scale range of a capacitance (CTR) gauge.
    Ctr {
        Mbar0_01 = 0,
        Torr0_01 = 1,
        Torr0_02 = 2,
        Torr0_05 = 3,
        Mbar0_10 = 4,
        Torr0_10 = 5,
        Torr0_25 = 6,
        Torr0_50 = 7,
        Mbar1_00 = 8,
        Torr1_00 = 9,
        Torr2_00 = 10,
        Mbar10 = 11,
        Torr10 = 12,
        Mbar100 = 13,
        Torr100 = 14,
        Mbar1000 = 15,
        Mbar1100 = 16,
        Torr1000 = 17,
        NotSet = 18,
    }
}

device_option! {
    AnodeVoltage {
        Auto = 0,
        Volt220 = 1,
        Volt480 = 2,
        NotSet = 3,
    }
}

device_option! {
    /// Ion current amplifier range. Note that 2 pA was added after the other
    /// ranges and carries code 11.
    AmplifierRange {
        Auto = 0,
        FemtoAmp100 = 1,
        PicoAmp1 = 2,
        PicoAmp2 = 11,
        PicoAmp10 = 3,
        PicoAmp100 = 4,
        NanoAmp1 = 5,
        NanoAmp10 = 6,
        NanoAmp100 = 7,
        MicroAmp1 = 8,
        MicroAmp10 = 9,
        MicroAmp100 = 10,
        NotSet = 12,
    }
}

device_option! {
    /// ADC resolution.
    Resolution {
        Auto = 0,
        Bit6 = 1,
        Bit8 = 2,
        Bit10 = 3,
        Bit11 = 4,
        Bit12 = 5,
        Bit14 = 6,
        NotSet = 7,
    }
}

device_option! {
    CathodeVoltage {
        Auto = 0,
        Volt10 = 1,
        Volt20 = 2,
        Volt80 = 3,
        Volt100 = 4,
        NotSet = 5,
    }
}

device_option! {
    EmissionCurrent {
        Auto = 0,
        MilliAmp0_1 = 1,
        MilliAmp1 = 2,
        MilliAmp1_6 = 3,
        MilliAmp10 = 4,
        MilliAmp45 = 5,
        MilliAmp90 = 6,
        NotSet = 7,
    }
}

device_option! {
    /// IF540x interface board detection.
    InterfaceBoard {
        Auto = 0,
        Installed = 1,
        NotInstalled = 2,
        NotSet = 3,
    }
}

device_option! {
    /// Mains frequency used for noise suppression.
    MainFrequency {
        Auto = 0,
        Hz50 = 1,
        Hz60 = 2,
        NotSet = 3,
    }
}
