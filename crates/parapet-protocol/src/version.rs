use std::fmt;

macro_rules! protocol_versions {
    ($($variant:ident => ($id:literal, $name:literal)),* $(,)?) => {
        /// A wire-protocol revision. Ordered by release; `Unknown` sorts first.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ProtocolVersion {
            Unknown,
            $($variant),*
        }

        impl ProtocolVersion {
            /// Every supported revision, oldest first.
            pub const ALL: &'static [ProtocolVersion] = &[$(ProtocolVersion::$variant),*];

            /// The numeric identifier sent in the handshake. `-1` for `Unknown`.
            pub fn protocol(self) -> i32 {
                match self {
                    ProtocolVersion::Unknown => -1,
                    $(ProtocolVersion::$variant => $id),*
                }
            }

            pub fn name(self) -> &'static str {
                match self {
                    ProtocolVersion::Unknown => "Unknown",
                    $(ProtocolVersion::$variant => $name),*
                }
            }

            /// Resolve a handshake protocol number. Unsupported numbers map to `Unknown`.
            pub fn from_id(id: i32) -> Self {
                match id {
                    $($id => ProtocolVersion::$variant,)*
                    _ => ProtocolVersion::Unknown,
                }
            }
        }
    };
}

protocol_versions! {
    V1_7_2 => (4, "1.7.2"),
    V1_7_6 => (5, "1.7.6"),
    V1_8 => (47, "1.8"),
    V1_9 => (107, "1.9"),
    V1_9_1 => (108, "1.9.1"),
    V1_9_2 => (109, "1.9.2"),
    V1_9_4 => (110, "1.9.4"),
    V1_10 => (210, "1.10"),
    V1_11 => (315, "1.11"),
    V1_11_1 => (316, "1.11.1"),
    V1_12 => (335, "1.12"),
    V1_12_1 => (338, "1.12.1"),
    V1_12_2 => (340, "1.12.2"),
    V1_13 => (393, "1.13"),
    V1_13_1 => (401, "1.13.1"),
    V1_13_2 => (404, "1.13.2"),
    V1_14 => (477, "1.14"),
    V1_14_1 => (480, "1.14.1"),
    V1_14_2 => (485, "1.14.2"),
    V1_14_3 => (490, "1.14.3"),
    V1_14_4 => (498, "1.14.4"),
    V1_15 => (573, "1.15"),
    V1_15_1 => (575, "1.15.1"),
    V1_15_2 => (578, "1.15.2"),
    V1_16 => (735, "1.16"),
    V1_16_1 => (736, "1.16.1"),
    V1_16_2 => (751, "1.16.2"),
    V1_16_3 => (753, "1.16.3"),
    V1_16_4 => (754, "1.16.4"),
    V1_17 => (755, "1.17"),
    V1_17_1 => (756, "1.17.1"),
    V1_18 => (757, "1.18"),
    V1_18_2 => (758, "1.18.2"),
    V1_19 => (759, "1.19"),
    V1_19_1 => (760, "1.19.1"),
    V1_19_3 => (761, "1.19.3"),
    V1_19_4 => (762, "1.19.4"),
    V1_20 => (763, "1.20"),
    V1_20_2 => (764, "1.20.2"),
    V1_20_3 => (765, "1.20.3"),
    V1_20_5 => (766, "1.20.5"),
    V1_21 => (767, "1.21"),
    V1_21_2 => (768, "1.21.2"),
    V1_21_4 => (769, "1.21.4"),
    V1_21_5 => (770, "1.21.5"),
    V1_21_6 => (771, "1.21.6"),
    V1_21_7 => (772, "1.21.7"),
    V1_21_9 => (773, "1.21.9"),
}

impl ProtocolVersion {
    pub const OLDEST: ProtocolVersion = ProtocolVersion::V1_7_2;
    pub const LATEST: ProtocolVersion = ProtocolVersion::V1_21_9;

    pub fn is_unknown(self) -> bool {
        self == ProtocolVersion::Unknown
    }

    /// Inclusive range test: `low <= self <= high`.
    pub fn in_between(self, low: ProtocolVersion, high: ProtocolVersion) -> bool {
        low <= self && self <= high
    }

    /// Position in [`ProtocolVersion::ALL`]. `None` for `Unknown`.
    pub fn index(self) -> Option<usize> {
        match self {
            ProtocolVersion::Unknown => None,
            // Declaration order matches ALL, offset by the Unknown sentinel
            v => Some(v as usize - 1),
        }
    }

    /// Whether this revision has the configuration phase.
    pub fn has_configuration(self) -> bool {
        self >= ProtocolVersion::V1_20_2
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.protocol())
    }
}
